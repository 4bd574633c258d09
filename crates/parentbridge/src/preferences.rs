//! Notification preference records and updates.
//!
//! A [`NotificationPreferences`] record exists once per user. It is changed
//! through a [`PreferencesUpdate`], which is a shallow merge: each top-level
//! section present in the update replaces the stored section wholesale, and
//! absent sections are left untouched. Nested sections are complete structs,
//! so a caller cannot send half of a section by accident; to change one
//! sub-field the caller sends the whole section with that field modified.

use serde::{Deserialize, Serialize};

use crate::category::NotificationCategory;
use crate::clock::parse_clock_time;
use crate::error::{Error, Result};

/// Default sound volume for new records.
pub const DEFAULT_VOLUME: f64 = 0.8;

/// Default quiet-hours start for new records.
pub const DEFAULT_QUIET_START: &str = "22:00";

/// Default quiet-hours end for new records.
pub const DEFAULT_QUIET_END: &str = "07:00";

/// A user's notification preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPreferences {
    /// Owner of this record.
    pub user_id: String,
    /// Global switch. When false, no notification of any kind fires.
    pub enabled: bool,
    /// Daily recurring suppression window.
    pub quiet_hours: QuietHours,
    /// Per-category opt-in.
    pub types: CategoryToggles,
    /// Sound playback settings.
    pub sound: SoundSettings,
    /// Haptic feedback settings.
    pub haptic: HapticSettings,
    /// Presentation hints for batching notifications.
    pub grouping: GroupingSettings,
}

/// A daily quiet-hours window.
///
/// `start_time` and `end_time` are `HH:mm` strings. When `end_time` is
/// earlier than `start_time` the window wraps past midnight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuietHours {
    /// Whether the window is active.
    pub enabled: bool,
    /// Start of the window, inclusive.
    pub start_time: String,
    /// End of the window, inclusive.
    pub end_time: String,
}

/// Per-category opt-in flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryToggles {
    /// Attendance notifications.
    pub attendance: bool,
    /// Grade notifications.
    pub grade: bool,
    /// Message notifications.
    pub message: bool,
    /// Calendar event notifications.
    pub event: bool,
}

/// Sound playback settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SoundSettings {
    /// Whether notifications play a sound.
    pub enabled: bool,
    /// Playback volume in `[0, 1]`.
    pub volume: f64,
}

/// Haptic feedback settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HapticSettings {
    /// Whether notifications vibrate.
    pub enabled: bool,
}

/// Grouping hints for presenting notification lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupingSettings {
    /// Whether grouping is applied at all.
    pub enabled: bool,
    /// Group notifications of the same category together.
    pub by_type: bool,
    /// Group notifications from the same calendar day together.
    pub by_date: bool,
}

/// Values used to build the record returned for users with no stored
/// preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreferenceDefaults {
    /// Sound volume for new records.
    pub sound_volume: f64,
    /// Quiet-hours start for new records (quiet hours start disabled).
    pub quiet_hours_start: String,
    /// Quiet-hours end for new records.
    pub quiet_hours_end: String,
}

impl Default for PreferenceDefaults {
    fn default() -> Self {
        Self {
            sound_volume: DEFAULT_VOLUME,
            quiet_hours_start: DEFAULT_QUIET_START.to_string(),
            quiet_hours_end: DEFAULT_QUIET_END.to_string(),
        }
    }
}

impl PreferenceDefaults {
    /// Build the default record for a user.
    ///
    /// Every category is enabled, quiet hours are disabled, and sound,
    /// haptics and grouping are on.
    #[must_use]
    pub fn record_for(&self, user_id: &str) -> NotificationPreferences {
        NotificationPreferences {
            user_id: user_id.to_string(),
            enabled: true,
            quiet_hours: QuietHours {
                enabled: false,
                start_time: self.quiet_hours_start.clone(),
                end_time: self.quiet_hours_end.clone(),
            },
            types: CategoryToggles::all(true),
            sound: SoundSettings {
                enabled: true,
                volume: self.sound_volume,
            },
            haptic: HapticSettings { enabled: true },
            grouping: GroupingSettings {
                enabled: true,
                by_type: true,
                by_date: true,
            },
        }
    }

    /// Validate the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the volume is out of range or either time is
    /// malformed.
    pub fn validate(&self) -> Result<()> {
        validate_volume(self.sound_volume)?;
        parse_clock_time(&self.quiet_hours_start)?;
        parse_clock_time(&self.quiet_hours_end)?;
        Ok(())
    }
}

impl NotificationPreferences {
    /// The built-in default record for a user.
    #[must_use]
    pub fn default_for(user_id: &str) -> Self {
        PreferenceDefaults::default().record_for(user_id)
    }

    /// Apply a shallow-merge update in place.
    pub fn apply(&mut self, update: &PreferencesUpdate) {
        if let Some(enabled) = update.enabled {
            self.enabled = enabled;
        }
        if let Some(quiet_hours) = &update.quiet_hours {
            self.quiet_hours = quiet_hours.clone();
        }
        if let Some(types) = update.types {
            self.types = types;
        }
        if let Some(sound) = update.sound {
            self.sound = sound;
        }
        if let Some(haptic) = update.haptic {
            self.haptic = haptic;
        }
        if let Some(grouping) = update.grouping {
            self.grouping = grouping;
        }
    }

    /// Return a copy of this record with the update applied.
    #[must_use]
    pub fn merged(mut self, update: &PreferencesUpdate) -> Self {
        self.apply(update);
        self
    }
}

impl QuietHours {
    /// A window between two `HH:mm` bounds.
    #[must_use]
    pub fn new(enabled: bool, start_time: impl Into<String>, end_time: impl Into<String>) -> Self {
        Self {
            enabled,
            start_time: start_time.into(),
            end_time: end_time.into(),
        }
    }

    /// Check that both bounds parse as `HH:mm`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedTimeString`] naming the first bad bound.
    pub fn validate(&self) -> Result<()> {
        parse_clock_time(&self.start_time)?;
        parse_clock_time(&self.end_time)?;
        Ok(())
    }
}

impl CategoryToggles {
    /// Every category set to `enabled`.
    #[must_use]
    pub fn all(enabled: bool) -> Self {
        Self {
            attendance: enabled,
            grade: enabled,
            message: enabled,
            event: enabled,
        }
    }

    /// Whether a category is opted in.
    #[must_use]
    pub fn get(&self, category: NotificationCategory) -> bool {
        match category {
            NotificationCategory::Attendance => self.attendance,
            NotificationCategory::Grade => self.grade,
            NotificationCategory::Message => self.message,
            NotificationCategory::Event => self.event,
        }
    }

    /// Opt a category in or out.
    pub fn set(&mut self, category: NotificationCategory, enabled: bool) {
        match category {
            NotificationCategory::Attendance => self.attendance = enabled,
            NotificationCategory::Grade => self.grade = enabled,
            NotificationCategory::Message => self.message = enabled,
            NotificationCategory::Event => self.event = enabled,
        }
    }
}

impl SoundSettings {
    /// Check that the volume lies in `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidVolume`] otherwise.
    pub fn validate(&self) -> Result<()> {
        validate_volume(self.volume)
    }
}

fn validate_volume(volume: f64) -> Result<()> {
    if volume.is_finite() && (0.0..=1.0).contains(&volume) {
        Ok(())
    } else {
        Err(Error::InvalidVolume { value: volume })
    }
}

/// A shallow-merge update to a [`NotificationPreferences`] record.
///
/// Each field is one top-level section. `None` leaves the stored section
/// untouched; `Some` replaces it entirely.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct PreferencesUpdate {
    /// New global switch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Replacement quiet-hours section.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quiet_hours: Option<QuietHours>,
    /// Replacement per-category flags.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub types: Option<CategoryToggles>,
    /// Replacement sound section.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sound: Option<SoundSettings>,
    /// Replacement haptic section.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub haptic: Option<HapticSettings>,
    /// Replacement grouping section.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grouping: Option<GroupingSettings>,
}

impl PreferencesUpdate {
    /// An update that changes nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the global switch.
    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    /// Replace the quiet-hours section.
    #[must_use]
    pub fn quiet_hours(mut self, quiet_hours: QuietHours) -> Self {
        self.quiet_hours = Some(quiet_hours);
        self
    }

    /// Replace the per-category flags.
    #[must_use]
    pub fn types(mut self, types: CategoryToggles) -> Self {
        self.types = Some(types);
        self
    }

    /// Replace the sound section.
    #[must_use]
    pub fn sound(mut self, sound: SoundSettings) -> Self {
        self.sound = Some(sound);
        self
    }

    /// Replace the haptic section.
    #[must_use]
    pub fn haptic(mut self, haptic: HapticSettings) -> Self {
        self.haptic = Some(haptic);
        self
    }

    /// Replace the grouping section.
    #[must_use]
    pub fn grouping(mut self, grouping: GroupingSettings) -> Self {
        self.grouping = Some(grouping);
        self
    }

    /// Whether the update has no sections.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Validate the sections present in this update.
    ///
    /// Quiet-hours bounds must parse as `HH:mm` and the volume must lie in
    /// `[0, 1]`. Bounds are checked even when quiet hours are disabled so a
    /// later enable cannot expose a bad value.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure.
    pub fn validate(&self) -> Result<()> {
        if let Some(quiet_hours) = &self.quiet_hours {
            quiet_hours.validate()?;
        }
        if let Some(sound) = &self.sound {
            sound.validate()?;
        }
        Ok(())
    }
}
