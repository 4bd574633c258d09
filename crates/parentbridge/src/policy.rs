//! Notification delivery policy.
//!
//! Given a user's [`NotificationPreferences`], a category and the caller's
//! local wall-clock time, decide whether a notification fires now and how it
//! is presented. The checks run in a fixed order and the first failing check
//! wins:
//!
//! 1. the global switch,
//! 2. the quiet-hours window,
//! 3. the per-category opt-in.
//!
//! Every function here is pure. The current time is always a parameter.
//!
//! # Example
//!
//! ```
//! use chrono::NaiveTime;
//! use parentbridge::policy::{self, Decision, SuppressReason};
//! use parentbridge::{NotificationCategory, NotificationPreferences, QuietHours};
//!
//! let mut prefs = NotificationPreferences::default_for("parent-1");
//! prefs.quiet_hours = QuietHours::new(true, "22:00", "07:00");
//!
//! let late = NaiveTime::from_hms_opt(23, 30, 0).unwrap();
//! let decision = policy::evaluate(&prefs, NotificationCategory::Grade, late).unwrap();
//! assert_eq!(decision, Decision::Suppress(SuppressReason::QuietHours));
//! ```

use chrono::NaiveTime;
use serde::Serialize;

use crate::category::NotificationCategory;
use crate::clock::parse_clock_time;
use crate::error::Result;
use crate::preferences::NotificationPreferences;

/// Why a notification was not delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuppressReason {
    /// The user turned notifications off globally.
    Disabled,
    /// The current time falls inside the user's quiet hours.
    QuietHours,
    /// The user opted out of this category.
    CategoryDisabled,
}

impl std::fmt::Display for SuppressReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disabled => write!(f, "notifications disabled"),
            Self::QuietHours => write!(f, "inside quiet hours"),
            Self::CategoryDisabled => write!(f, "category disabled"),
        }
    }
}

/// How a delivered notification is presented.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Presentation {
    /// Whether to play the category sound.
    pub play_sound: bool,
    /// Playback volume; zero when sound is off.
    pub volume: f64,
    /// Whether to vibrate.
    pub haptic: bool,
}

/// The outcome of evaluating a candidate notification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum Decision {
    /// Deliver now with the given presentation.
    Deliver(Presentation),
    /// Do not deliver.
    Suppress(SuppressReason),
}

impl Decision {
    /// Whether the notification should be delivered.
    #[must_use]
    pub fn is_deliver(&self) -> bool {
        matches!(self, Self::Deliver(_))
    }

    /// The presentation, if delivered.
    #[must_use]
    pub fn presentation(&self) -> Option<Presentation> {
        match self {
            Self::Deliver(presentation) => Some(*presentation),
            Self::Suppress(_) => None,
        }
    }

    /// The suppression reason, if suppressed.
    #[must_use]
    pub fn suppress_reason(&self) -> Option<SuppressReason> {
        match self {
            Self::Deliver(_) => None,
            Self::Suppress(reason) => Some(*reason),
        }
    }
}

/// Decide whether a notification of `category` should fire at `now`.
///
/// # Errors
///
/// Returns [`Error::MalformedTimeString`](crate::Error::MalformedTimeString)
/// if quiet hours are enabled and a bound does not parse. Quiet hours are not
/// consulted when the global switch is off.
pub fn should_notify(
    preferences: &NotificationPreferences,
    category: NotificationCategory,
    now: NaiveTime,
) -> Result<bool> {
    Ok(evaluate(preferences, category, now)?.is_deliver())
}

/// Evaluate a candidate notification and report why it was or was not sent.
///
/// # Errors
///
/// Same as [`should_notify`].
pub fn evaluate(
    preferences: &NotificationPreferences,
    category: NotificationCategory,
    now: NaiveTime,
) -> Result<Decision> {
    if !preferences.enabled {
        return Ok(Decision::Suppress(SuppressReason::Disabled));
    }
    if is_within_quiet_hours(preferences, now)? {
        return Ok(Decision::Suppress(SuppressReason::QuietHours));
    }
    if !preferences.types.get(category) {
        return Ok(Decision::Suppress(SuppressReason::CategoryDisabled));
    }
    Ok(Decision::Deliver(presentation(preferences)))
}

/// Check whether `now` falls inside the user's quiet hours.
///
/// Both bounds are inclusive and carry zero seconds, so with an end of
/// `17:00` the instant `17:00:00` is inside and `17:00:30` is not. When the
/// end is earlier than the start the window wraps past midnight.
///
/// # Errors
///
/// Returns [`Error::MalformedTimeString`](crate::Error::MalformedTimeString)
/// if quiet hours are enabled and a bound does not parse.
pub fn is_within_quiet_hours(preferences: &NotificationPreferences, now: NaiveTime) -> Result<bool> {
    let quiet_hours = &preferences.quiet_hours;
    if !quiet_hours.enabled {
        return Ok(false);
    }

    let start = parse_clock_time(&quiet_hours.start_time)?;
    let end = parse_clock_time(&quiet_hours.end_time)?;
    Ok(window_contains(start, end, now))
}

/// Membership test on the circular 24-hour axis.
fn window_contains(start: NaiveTime, end: NaiveTime, now: NaiveTime) -> bool {
    if end < start {
        now >= start || now <= end
    } else {
        start <= now && now <= end
    }
}

/// Presentation parameters for a notification that passed the policy.
#[must_use]
pub fn presentation(preferences: &NotificationPreferences) -> Presentation {
    let play_sound = preferences.sound.enabled;
    Presentation {
        play_sound,
        volume: if play_sound {
            preferences.sound.volume
        } else {
            0.0
        },
        haptic: preferences.haptic.enabled,
    }
}
