//! End-to-end notification policy testing
//!
//! Exercises the delivery policy through the public API: preferences are
//! written through the service into a real `SQLite` store, then evaluated
//! and dispatched at fixed local times.

use std::sync::{Arc, Mutex};

use chrono::{NaiveTime, TimeZone, Utc};
use parentbridge::{
    policy, AudioOutput, CategoryToggles, Decision, Dispatcher, GroupingSettings, HapticSettings,
    NotificationCategory, NotificationEvent, NotificationPreferences,
    NotificationPreferencesService, PreferencesUpdate, QuietHours, SoundSettings, Storage,
    SuppressReason,
};

/// Audio double that records volume changes and plays.
#[derive(Debug, Default)]
struct RecordingAudio {
    volumes: Mutex<Vec<f64>>,
    played: Mutex<Vec<(NotificationCategory, f64)>>,
}

impl AudioOutput for RecordingAudio {
    fn set_volume(&self, level: f64) {
        self.volumes.lock().unwrap().push(level);
    }

    fn play(&self, category: NotificationCategory, volume: f64) {
        self.played.lock().unwrap().push((category, volume));
    }
}

/// Test fixture wiring a service and a dispatcher to one in-memory database
struct PolicyHarness {
    service: NotificationPreferencesService<Storage, RecordingAudio>,
    dispatcher: Dispatcher<RecordingAudio>,
}

impl PolicyHarness {
    fn new() -> Self {
        let storage = Arc::new(Storage::open_in_memory().expect("in-memory storage"));
        let audio = Arc::new(RecordingAudio::default());
        let service = NotificationPreferencesService::new(storage, audio);
        let dispatcher = Dispatcher::from_service(service.clone());
        Self {
            service,
            dispatcher,
        }
    }

    async fn update(&self, user: &str, update: PreferencesUpdate) {
        self.service
            .update_preferences(user, &update)
            .await
            .expect("update preferences");
    }

    async fn allowed(&self, user: &str, category: NotificationCategory, now: NaiveTime) -> bool {
        self.service
            .should_notify_user(user, category, now)
            .await
            .expect("evaluate")
    }

    fn volumes(&self) -> Vec<f64> {
        self.service.audio().volumes.lock().unwrap().clone()
    }
}

fn at(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
}

#[tokio::test]
async fn kill_switch_overrides_everything() {
    let harness = PolicyHarness::new();
    harness
        .update(
            "parent",
            PreferencesUpdate::new()
                .enabled(false)
                .quiet_hours(QuietHours::new(false, "22:00", "07:00"))
                .types(CategoryToggles::all(true)),
        )
        .await;

    for category in NotificationCategory::ALL {
        for now in [at(0, 0), at(9, 30), at(12, 0), at(23, 59)] {
            assert!(!harness.allowed("parent", category, now).await);
        }
    }
}

#[test]
fn kill_switch_skips_malformed_quiet_hours() {
    let mut prefs = NotificationPreferences::default_for("parent");
    prefs.enabled = false;
    prefs.quiet_hours = QuietHours::new(true, "bogus", "07:00");

    let decision = policy::evaluate(&prefs, NotificationCategory::Grade, at(12, 0)).unwrap();
    assert_eq!(decision, Decision::Suppress(SuppressReason::Disabled));
}

#[tokio::test]
async fn daytime_window_bounds_are_inclusive() {
    let harness = PolicyHarness::new();
    harness
        .update(
            "parent",
            PreferencesUpdate::new().quiet_hours(QuietHours::new(true, "09:00", "17:00")),
        )
        .await;

    let category = NotificationCategory::Message;
    assert!(!harness.allowed("parent", category, at(12, 0)).await);
    assert!(harness.allowed("parent", category, at(8, 59)).await);
    assert!(!harness.allowed("parent", category, at(17, 0)).await);
    assert!(harness.allowed("parent", category, at(17, 1)).await);
}

#[tokio::test]
async fn overnight_window_wraps_midnight() {
    let harness = PolicyHarness::new();
    harness
        .update(
            "parent",
            PreferencesUpdate::new().quiet_hours(QuietHours::new(true, "22:00", "07:00")),
        )
        .await;

    let category = NotificationCategory::Event;
    assert!(!harness.allowed("parent", category, at(23, 30)).await);
    assert!(!harness.allowed("parent", category, at(3, 0)).await);
    assert!(harness.allowed("parent", category, at(12, 0)).await);
    assert!(!harness.allowed("parent", category, at(7, 0)).await);
    assert!(harness.allowed("parent", category, at(7, 1)).await);
}

#[tokio::test]
async fn per_category_gating() {
    let harness = PolicyHarness::new();
    harness
        .update(
            "parent",
            PreferencesUpdate::new().types(CategoryToggles {
                grade: false,
                ..CategoryToggles::all(true)
            }),
        )
        .await;

    assert!(!harness.allowed("parent", NotificationCategory::Grade, at(12, 0)).await);
    assert!(harness.allowed("parent", NotificationCategory::Attendance, at(12, 0)).await);
    assert!(harness.allowed("parent", NotificationCategory::Message, at(12, 0)).await);
    assert!(harness.allowed("parent", NotificationCategory::Event, at(12, 0)).await);
}

#[tokio::test]
async fn missing_record_yields_defaults() {
    let harness = PolicyHarness::new();
    let prefs = harness.service.get_preferences("stranger").await.unwrap();

    assert!(prefs.enabled);
    assert!(!prefs.quiet_hours.enabled);
    assert_eq!(prefs.types, CategoryToggles::all(true));
    assert!(prefs.sound.enabled);
    assert!(prefs.haptic.enabled);
    assert!(harness.service.store().get_preferences("stranger").unwrap().is_none());
}

#[tokio::test]
async fn quiet_hours_update_is_a_shallow_merge() {
    let harness = PolicyHarness::new();
    harness
        .update(
            "parent",
            PreferencesUpdate::new()
                .types(CategoryToggles {
                    message: false,
                    ..CategoryToggles::all(true)
                })
                .sound(SoundSettings {
                    enabled: true,
                    volume: 0.4,
                })
                .haptic(HapticSettings { enabled: false })
                .grouping(GroupingSettings {
                    enabled: true,
                    by_type: false,
                    by_date: true,
                }),
        )
        .await;
    let before = harness.service.get_preferences("parent").await.unwrap();

    harness
        .update(
            "parent",
            PreferencesUpdate::new().quiet_hours(QuietHours::new(true, "20:00", "06:00")),
        )
        .await;
    let after = harness.service.get_preferences("parent").await.unwrap();

    assert_eq!(after.quiet_hours, QuietHours::new(true, "20:00", "06:00"));
    assert_eq!(after.types, before.types);
    assert_eq!(after.sound, before.sound);
    assert_eq!(after.haptic, before.haptic);
    assert_eq!(after.grouping, before.grouping);
    assert_eq!(after.enabled, before.enabled);
}

#[tokio::test]
async fn sound_update_sets_volume_exactly_once() {
    let harness = PolicyHarness::new();
    harness
        .update(
            "parent",
            PreferencesUpdate::new().sound(SoundSettings {
                enabled: true,
                volume: 0.3,
            }),
        )
        .await;
    assert_eq!(harness.volumes(), vec![0.3]);

    harness
        .update("parent", PreferencesUpdate::new().enabled(true))
        .await;
    assert_eq!(harness.volumes(), vec![0.3]);
}

#[tokio::test]
async fn dispatch_logs_only_delivered_notifications() {
    let harness = PolicyHarness::new();
    harness
        .update(
            "night-owl",
            PreferencesUpdate::new().quiet_hours(QuietHours::new(true, "22:00", "07:00")),
        )
        .await;

    let created = Utc.with_ymd_and_hms(2024, 9, 2, 21, 0, 0).unwrap();
    let late = NotificationEvent::new(
        "night-owl",
        NotificationCategory::Message,
        "Late message",
        "Can we talk tomorrow?",
        created,
    );
    let early = NotificationEvent::new(
        "early-bird",
        NotificationCategory::Message,
        "Late message",
        "Can we talk tomorrow?",
        created,
    );

    let outcomes = harness
        .dispatcher
        .dispatch_all(&[late, early], at(23, 0))
        .await
        .unwrap();

    assert_eq!(
        outcomes[0].decision,
        Decision::Suppress(SuppressReason::QuietHours)
    );
    assert!(outcomes[0].id.is_none());
    assert!(outcomes[1].id.is_some());

    let storage = harness.service.store();
    assert!(storage.unread_for_user("night-owl", 10).unwrap().is_empty());
    assert_eq!(storage.unread_for_user("early-bird", 10).unwrap().len(), 1);
    assert_eq!(
        *harness.service.audio().played.lock().unwrap(),
        vec![(NotificationCategory::Message, 0.8)]
    );
}

#[tokio::test]
async fn classroom_fan_out_plays_each_recipient_at_their_volume() {
    let harness = PolicyHarness::new();
    for (user, volume) in [("quiet-parent", 0.2), ("loud-parent", 1.0)] {
        harness
            .update(
                user,
                PreferencesUpdate::new().sound(SoundSettings {
                    enabled: true,
                    volume,
                }),
            )
            .await;
    }

    let events = parentbridge::notification::classroom_notifications(
        &["quiet-parent", "loud-parent"],
        "class-7",
        NotificationCategory::Event,
        "Field trip",
        "Permission slips due Friday",
        Utc.with_ymd_and_hms(2024, 9, 4, 15, 0, 0).unwrap(),
    );
    harness.dispatcher.dispatch_all(&events, at(15, 0)).await.unwrap();

    assert_eq!(
        *harness.service.audio().played.lock().unwrap(),
        vec![
            (NotificationCategory::Event, 0.2),
            (NotificationCategory::Event, 1.0),
        ]
    );
}
