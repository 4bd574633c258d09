//! `parentbridge` - Notification delivery policy for the `ParentBridge` classroom app
//!
//! This library decides whether a notification to a parent fires right now,
//! based on that parent's stored preferences: a global switch, a daily
//! quiet-hours window and per-category opt-in. It also manages those
//! preferences and keeps a log of delivered notifications.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod audio;
pub mod category;
pub mod cli;
pub mod clock;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod grouping;
pub mod logging;
pub mod notification;
pub mod policy;
pub mod preferences;
pub mod service;
pub mod storage;
pub mod store;

pub use audio::{AudioOutput, SharedVolume};
pub use category::NotificationCategory;
pub use config::Config;
pub use dispatch::{DispatchOutcome, Dispatcher};
pub use error::{Error, Result};
pub use grouping::{group_notifications, NotificationGroup};
pub use logging::init_logging;
pub use notification::NotificationEvent;
pub use policy::{should_notify, Decision, SuppressReason};
pub use preferences::{
    CategoryToggles, GroupingSettings, HapticSettings, NotificationPreferences, PreferencesUpdate,
    QuietHours, SoundSettings,
};
pub use service::NotificationPreferencesService;
pub use storage::{Storage, StorageStats};
pub use store::{MemoryPreferenceStore, PreferenceStore};
