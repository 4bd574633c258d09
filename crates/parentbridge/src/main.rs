//! `pbnotify` - CLI for parentbridge
//!
//! This binary manages notification preferences, evaluates the delivery
//! policy and inspects the notification log.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Local, NaiveTime, Utc};
use clap::Parser;

use parentbridge::cli::{
    CheckCommand, Cli, Command, ConfigCommand, InboxCommand, NotifyCommand, PrefsCommand,
};
use parentbridge::clock::format_clock_time;
use parentbridge::notification::DATA_TYPE;
use parentbridge::{
    group_notifications, init_logging, Config, Decision, Dispatcher, Error, NotificationEvent,
    NotificationPreferences, NotificationPreferencesService, SharedVolume, Storage,
};

type Service = NotificationPreferencesService<Storage, SharedVolume>;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone()).context("failed to load configuration")?;

    let command = match cli.command {
        Command::Config(config_cmd) => return handle_config(&config, config_cmd),
        command => command,
    };

    let storage = Arc::new(
        Storage::open(config.database_path())
            .context("failed to open notification database")?
            .with_defaults(config.defaults.clone()),
    );
    let audio = Arc::new(SharedVolume::new(config.defaults.sound_volume));
    let service = NotificationPreferencesService::new(Arc::clone(&storage), audio);

    match command {
        Command::Prefs(prefs_cmd) => handle_prefs(&service, prefs_cmd).await,
        Command::Check(check_cmd) => handle_check(&service, &check_cmd).await,
        Command::Notify(notify_cmd) => handle_notify(&service, &notify_cmd).await,
        Command::Inbox(inbox_cmd) => handle_inbox(&service, &inbox_cmd).await,
        Command::Read(read_cmd) => handle_read(&storage, read_cmd.id),
        Command::Prune => handle_prune(&config, &storage),
        Command::Status(status_cmd) => handle_status(&config, &storage, status_cmd.json),
        Command::Config(_) => Ok(()),
    }
}

fn local_time(at: Option<NaiveTime>) -> NaiveTime {
    at.unwrap_or_else(|| Local::now().time())
}

async fn handle_prefs(service: &Service, cmd: PrefsCommand) -> Result<()> {
    match cmd {
        PrefsCommand::Show { user, json } => {
            let prefs = service.get_preferences(&user).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&prefs)?);
            } else {
                print_preferences(&prefs);
            }
        }
        PrefsCommand::Set(set_cmd) => {
            let current = service.get_preferences(&set_cmd.user).await?;
            let update = set_cmd.to_update(&current);
            if update.is_empty() {
                println!("Nothing to change.");
                return Ok(());
            }
            service
                .update_preferences(&set_cmd.user, &update)
                .await
                .with_context(|| format!("failed to update preferences for {}", set_cmd.user))?;
            println!("Preferences updated for {}.", set_cmd.user);
        }
    }
    Ok(())
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

fn print_preferences(prefs: &NotificationPreferences) {
    println!("Notification preferences for {}", prefs.user_id);
    println!("------------------------------");
    println!("Notifications:  {}", on_off(prefs.enabled));
    println!(
        "Quiet hours:    {} ({} - {})",
        on_off(prefs.quiet_hours.enabled),
        prefs.quiet_hours.start_time,
        prefs.quiet_hours.end_time
    );
    println!(
        "Sound:          {} (volume {:.0}%)",
        on_off(prefs.sound.enabled),
        prefs.sound.volume * 100.0
    );
    println!("Haptic:         {}", on_off(prefs.haptic.enabled));
    println!(
        "Grouping:       {} (by type: {}, by date: {})",
        on_off(prefs.grouping.enabled),
        on_off(prefs.grouping.by_type),
        on_off(prefs.grouping.by_date)
    );
    println!();
    println!("[Categories]");
    for category in parentbridge::NotificationCategory::ALL {
        println!("  {:<12} {}", category.as_str(), on_off(prefs.types.get(category)));
    }
}

fn describe(decision: &Decision) -> String {
    match decision {
        Decision::Deliver(p) if p.play_sound => format!(
            "deliver (sound at {:.0}%, haptic {})",
            p.volume * 100.0,
            on_off(p.haptic)
        ),
        Decision::Deliver(p) => format!("deliver (silent, haptic {})", on_off(p.haptic)),
        Decision::Suppress(reason) => format!("suppress ({reason})"),
    }
}

async fn handle_check(service: &Service, cmd: &CheckCommand) -> Result<()> {
    let now = local_time(cmd.at);
    let decision = service.evaluate_user(&cmd.user, cmd.category, now).await?;

    if cmd.json {
        let report = serde_json::json!({
            "user_id": cmd.user,
            "category": cmd.category,
            "at": format_clock_time(now),
            "deliver": decision.is_deliver(),
            "decision": decision,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "{} notification for {} at {}: {}",
            cmd.category,
            cmd.user,
            format_clock_time(now),
            describe(&decision)
        );
    }
    Ok(())
}

async fn handle_notify(service: &Service, cmd: &NotifyCommand) -> Result<()> {
    let dispatcher = Dispatcher::from_service(service.clone());
    let event = NotificationEvent::new(
        cmd.user.as_str(),
        cmd.category,
        cmd.title.as_str(),
        cmd.body.as_str(),
        Utc::now(),
    )
    .with_data(DATA_TYPE, cmd.category.as_str());

    let outcome = dispatcher.dispatch(&event, local_time(cmd.at)).await?;
    match outcome.id {
        Some(id) => println!("Delivered notification {id}: {}", describe(&outcome.decision)),
        None => println!("Not delivered: {}", describe(&outcome.decision)),
    }
    Ok(())
}

fn print_event(event: &NotificationEvent) {
    println!(
        "{:>6}  {}  {:<10} {}{}",
        event.id.unwrap_or_default(),
        event.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
        event.category.as_str(),
        if event.read { "" } else { "* " },
        event.title
    );
    if !event.body.is_empty() {
        println!("        {}", event.body);
    }
}

async fn handle_inbox(service: &Service, cmd: &InboxCommand) -> Result<()> {
    let storage = service.store();
    let events = if cmd.all {
        storage.recent_for_user(&cmd.user, cmd.limit)?
    } else {
        storage.unread_for_user(&cmd.user, cmd.limit)?
    };

    if cmd.grouped {
        let prefs = service.get_preferences(&cmd.user).await?;
        let groups = group_notifications(&prefs.grouping, events);
        if cmd.json {
            println!("{}", serde_json::to_string_pretty(&groups)?);
            return Ok(());
        }
        for group in &groups {
            println!("== {} ({} unread) ==", group.key, group.unread_count());
            for event in &group.events {
                print_event(event);
            }
        }
        return Ok(());
    }

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&events)?);
    } else if events.is_empty() {
        println!("No notifications.");
    } else {
        for event in &events {
            print_event(event);
        }
    }
    Ok(())
}

fn handle_read(storage: &Storage, id: i64) -> Result<()> {
    if !storage.mark_read(id)? {
        return Err(Error::NotificationNotFound { id }.into());
    }
    println!("Marked notification {id} as read.");
    Ok(())
}

fn handle_prune(config: &Config, storage: &Storage) -> Result<()> {
    let Some(max_age) = config.retention() else {
        println!("Retention is unlimited; nothing pruned.");
        return Ok(());
    };

    let pruned = storage
        .prune_older_than(Utc::now(), max_age)
        .context("failed to prune notifications")?;
    println!(
        "Pruned {pruned} notifications older than {} days.",
        config.storage.notification_retention_days
    );
    Ok(())
}

fn handle_status(config: &Config, storage: &Storage, json: bool) -> Result<()> {
    let stats = storage.stats()?;

    if json {
        let status = serde_json::json!({
            "database_path": storage.path(),
            "database_size_bytes": stats.db_size_bytes,
            "preference_records": stats.preference_records,
            "total_notifications": stats.total_notifications,
            "unread_notifications": stats.unread_notifications,
            "oldest_notification": stats.oldest_notification,
            "newest_notification": stats.newest_notification,
            "retention_days": config.storage.notification_retention_days,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("pbnotify status");
        println!("---------------");
        println!("Database:       {}", storage.path().display());
        println!("Size:           {} bytes", stats.db_size_bytes);
        println!("Preferences:    {}", stats.preference_records);
        println!(
            "Notifications:  {} ({} unread)",
            stats.total_notifications, stats.unread_notifications
        );
        if let (Some(oldest), Some(newest)) = (stats.oldest_notification, stats.newest_notification)
        {
            println!("Oldest:         {}", oldest.with_timezone(&Local));
            println!("Newest:         {}", newest.with_timezone(&Local));
        }
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                match config.storage.notification_retention_days {
                    0 => println!("  Retention (days):   unlimited"),
                    days => println!("  Retention (days):   {days}"),
                }
                println!();
                println!("[Defaults]");
                println!("  Sound volume:       {}", config.defaults.sound_volume);
                println!("  Quiet hours start:  {}", config.defaults.quiet_hours_start);
                println!("  Quiet hours end:    {}", config.defaults.quiet_hours_end);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            Config::load_from(Some(path)).context("configuration is invalid")?;
            println!("Configuration is valid.");
        }
    }
    Ok(())
}
