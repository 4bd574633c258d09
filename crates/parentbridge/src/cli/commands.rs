//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands and the value
//! parsers they share.

use std::path::PathBuf;

use chrono::NaiveTime;
use clap::{Args, Subcommand, ValueEnum};

use crate::category::NotificationCategory;
use crate::clock::parse_clock_time;
use crate::preferences::{NotificationPreferences, PreferencesUpdate, QuietHours, SoundSettings};

/// Preference commands.
#[derive(Debug, Subcommand)]
pub enum PrefsCommand {
    /// Show a user's notification preferences
    Show {
        /// User whose preferences to show
        #[arg(short, long)]
        user: String,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Change a user's notification preferences
    Set(SetPrefsCommand),
}

/// Arguments for `prefs set`.
///
/// Each flag changes one field. The handler reads the current record and
/// sends every touched section in full.
#[derive(Debug, Args)]
pub struct SetPrefsCommand {
    /// User whose preferences to change
    #[arg(short, long)]
    pub user: String,

    /// Turn all notifications on or off
    #[arg(long, value_enum, value_name = "on|off")]
    pub enabled: Option<Switch>,

    /// Enable quiet hours for a window such as 22:00-07:00
    #[arg(long, value_name = "START-END", value_parser = parse_quiet_range, conflicts_with = "quiet_hours_off")]
    pub quiet_hours: Option<(String, String)>,

    /// Disable quiet hours, keeping the stored window
    #[arg(long)]
    pub quiet_hours_off: bool,

    /// Notification volume between 0 and 1
    #[arg(long, value_name = "LEVEL")]
    pub volume: Option<f64>,

    /// Turn notification sounds on or off
    #[arg(long, value_enum, value_name = "on|off")]
    pub sound: Option<Switch>,

    /// Turn vibration on or off
    #[arg(long, value_enum, value_name = "on|off")]
    pub haptic: Option<Switch>,

    /// Opt a category in or out, e.g. grade=off (repeatable)
    #[arg(long = "category", value_name = "NAME=on|off", value_parser = parse_category_toggle)]
    pub categories: Vec<(NotificationCategory, bool)>,

    /// Turn grouping on or off
    #[arg(long, value_enum, value_name = "on|off")]
    pub grouping: Option<Switch>,
}

impl SetPrefsCommand {
    /// Build a shallow-merge update against the user's current record.
    ///
    /// Sections without a flag are left out of the update.
    #[must_use]
    pub fn to_update(&self, current: &NotificationPreferences) -> PreferencesUpdate {
        let mut update = PreferencesUpdate::new();

        if let Some(enabled) = self.enabled {
            update = update.enabled(enabled.is_on());
        }

        if let Some((start, end)) = &self.quiet_hours {
            update = update.quiet_hours(QuietHours::new(true, start.clone(), end.clone()));
        } else if self.quiet_hours_off {
            update = update.quiet_hours(QuietHours {
                enabled: false,
                ..current.quiet_hours.clone()
            });
        }

        if self.volume.is_some() || self.sound.is_some() {
            update = update.sound(SoundSettings {
                enabled: self.sound.map_or(current.sound.enabled, Switch::is_on),
                volume: self.volume.unwrap_or(current.sound.volume),
            });
        }

        if let Some(haptic) = self.haptic {
            let mut section = current.haptic;
            section.enabled = haptic.is_on();
            update = update.haptic(section);
        }

        if !self.categories.is_empty() {
            let mut types = current.types;
            for (category, enabled) in &self.categories {
                types.set(*category, *enabled);
            }
            update = update.types(types);
        }

        if let Some(grouping) = self.grouping {
            let mut section = current.grouping;
            section.enabled = grouping.is_on();
            update = update.grouping(section);
        }

        update
    }
}

/// Check command arguments.
#[derive(Debug, Args)]
pub struct CheckCommand {
    /// Recipient
    #[arg(short, long)]
    pub user: String,

    /// Notification category
    #[arg(long, value_parser = parse_category)]
    pub category: NotificationCategory,

    /// Local time to evaluate at (HH:mm); defaults to now
    #[arg(long, value_name = "HH:mm", value_parser = parse_clock)]
    pub at: Option<NaiveTime>,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Notify command arguments.
#[derive(Debug, Args)]
pub struct NotifyCommand {
    /// Recipient
    #[arg(short, long)]
    pub user: String,

    /// Notification category
    #[arg(long, value_parser = parse_category)]
    pub category: NotificationCategory,

    /// Headline
    #[arg(short, long)]
    pub title: String,

    /// Body text
    #[arg(short, long)]
    pub body: String,

    /// Local time to evaluate at (HH:mm); defaults to now
    #[arg(long, value_name = "HH:mm", value_parser = parse_clock)]
    pub at: Option<NaiveTime>,
}

/// Inbox command arguments.
#[derive(Debug, Args)]
pub struct InboxCommand {
    /// Recipient
    #[arg(short, long)]
    pub user: String,

    /// Maximum number of notifications
    #[arg(short, long, default_value = "20")]
    pub limit: usize,

    /// Include notifications already read
    #[arg(short, long)]
    pub all: bool,

    /// Group according to the user's grouping preferences
    #[arg(short, long)]
    pub grouped: bool,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Read command arguments.
#[derive(Debug, Args)]
pub struct ReadCommand {
    /// Notification id
    pub id: i64,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// An on/off flag value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Switch {
    /// Enabled
    #[value(alias = "true")]
    On,
    /// Disabled
    #[value(alias = "false")]
    Off,
}

impl Switch {
    /// Whether the switch is on.
    #[must_use]
    pub fn is_on(self) -> bool {
        self == Self::On
    }
}

fn parse_category(value: &str) -> Result<NotificationCategory, String> {
    value.parse().map_err(|e: crate::Error| e.to_string())
}

fn parse_clock(value: &str) -> Result<NaiveTime, String> {
    parse_clock_time(value).map_err(|e| e.to_string())
}

fn parse_quiet_range(value: &str) -> Result<(String, String), String> {
    let (start, end) = value
        .split_once('-')
        .ok_or_else(|| format!("expected START-END, got '{value}'"))?;
    parse_clock(start)?;
    parse_clock(end)?;
    Ok((start.to_string(), end.to_string()))
}

fn parse_category_toggle(value: &str) -> Result<(NotificationCategory, bool), String> {
    let (name, state) = value
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=on|off, got '{value}'"))?;
    let enabled = match state {
        "on" | "true" => true,
        "off" | "false" => false,
        other => return Err(format!("expected on or off, got '{other}'")),
    };
    Ok((parse_category(name)?, enabled))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preferences::CategoryToggles;

    fn set_command() -> SetPrefsCommand {
        SetPrefsCommand {
            user: "u".to_string(),
            enabled: None,
            quiet_hours: None,
            quiet_hours_off: false,
            volume: None,
            sound: None,
            haptic: None,
            categories: Vec::new(),
            grouping: None,
        }
    }

    #[test]
    fn test_parse_quiet_range() {
        assert_eq!(
            parse_quiet_range("22:00-07:00").unwrap(),
            ("22:00".to_string(), "07:00".to_string())
        );
        assert!(parse_quiet_range("22:00").is_err());
        assert!(parse_quiet_range("22:00-7pm").is_err());
    }

    #[test]
    fn test_parse_category_toggle() {
        assert_eq!(
            parse_category_toggle("grade=off").unwrap(),
            (NotificationCategory::Grade, false)
        );
        assert_eq!(
            parse_category_toggle("event=on").unwrap(),
            (NotificationCategory::Event, true)
        );
        assert!(parse_category_toggle("grade").is_err());
        assert!(parse_category_toggle("grade=maybe").is_err());
        assert!(parse_category_toggle("homework=on").is_err());
    }

    #[test]
    fn test_parse_category_is_case_sensitive() {
        assert!(parse_category("message").is_ok());
        assert!(parse_category("Message").is_err());
    }

    #[test]
    fn test_switch() {
        assert!(Switch::On.is_on());
        assert!(!Switch::Off.is_on());
    }

    #[test]
    fn test_to_update_empty() {
        let current = NotificationPreferences::default_for("u");
        assert!(set_command().to_update(&current).is_empty());
    }

    #[test]
    fn test_to_update_volume_keeps_sound_flag() {
        let mut current = NotificationPreferences::default_for("u");
        current.sound.enabled = false;

        let cmd = SetPrefsCommand {
            volume: Some(0.3),
            ..set_command()
        };
        let update = cmd.to_update(&current);

        assert_eq!(
            update.sound,
            Some(SoundSettings {
                enabled: false,
                volume: 0.3
            })
        );
        assert!(update.quiet_hours.is_none());
        assert!(update.types.is_none());
    }

    #[test]
    fn test_to_update_sound_without_volume_has_sound_section() {
        let current = NotificationPreferences::default_for("u");
        let cmd = SetPrefsCommand {
            sound: Some(Switch::Off),
            ..set_command()
        };
        let update = cmd.to_update(&current);
        assert_eq!(
            update.sound,
            Some(SoundSettings {
                enabled: false,
                volume: current.sound.volume
            })
        );
    }

    #[test]
    fn test_to_update_quiet() {
        let current = NotificationPreferences::default_for("u");

        let on = SetPrefsCommand {
            quiet_hours: Some(("21:00".to_string(), "06:00".to_string())),
            ..set_command()
        };
        assert_eq!(
            on.to_update(&current).quiet_hours,
            Some(QuietHours::new(true, "21:00", "06:00"))
        );

        let mut quiet_current = current.clone();
        quiet_current.quiet_hours = QuietHours::new(true, "23:00", "05:00");
        let off = SetPrefsCommand {
            quiet_hours_off: true,
            ..set_command()
        };
        assert_eq!(
            off.to_update(&quiet_current).quiet_hours,
            Some(QuietHours::new(false, "23:00", "05:00"))
        );
    }

    #[test]
    fn test_to_update_categories_apply_to_current() {
        let mut current = NotificationPreferences::default_for("u");
        current.types.message = false;

        let cmd = SetPrefsCommand {
            categories: vec![
                (NotificationCategory::Grade, false),
                (NotificationCategory::Message, true),
            ],
            ..set_command()
        };

        assert_eq!(
            cmd.to_update(&current).types,
            Some(CategoryToggles {
                attendance: true,
                grade: false,
                message: true,
                event: true,
            })
        );
    }

    #[test]
    fn test_to_update_grouping_keeps_dimensions() {
        let mut current = NotificationPreferences::default_for("u");
        current.grouping.by_date = false;

        let cmd = SetPrefsCommand {
            grouping: Some(Switch::Off),
            ..set_command()
        };
        let grouping = cmd.to_update(&current).grouping.unwrap();
        assert!(!grouping.enabled);
        assert!(grouping.by_type);
        assert!(!grouping.by_date);
    }

    #[test]
    fn test_config_command_debug() {
        let cmd = ConfigCommand::Show { json: false };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Show"));
    }
}
