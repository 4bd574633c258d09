//! Notification categories.
//!
//! Every notification belongs to exactly one of four categories. The set is
//! closed: code that receives a [`NotificationCategory`] never has to handle
//! an unknown category, and strings from the outside world are checked once
//! at the boundary through [`FromStr`].

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// The category of a notification, used for per-type opt-in gating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    /// A child's attendance was recorded.
    Attendance,
    /// A grade was posted.
    Grade,
    /// A chat message arrived.
    Message,
    /// A calendar event was created or changed.
    Event,
}

impl NotificationCategory {
    /// All categories, in declaration order.
    pub const ALL: [Self; 4] = [Self::Attendance, Self::Grade, Self::Message, Self::Event];

    /// The lowercase wire name of this category.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Attendance => "attendance",
            Self::Grade => "grade",
            Self::Message => "message",
            Self::Event => "event",
        }
    }
}

impl std::fmt::Display for NotificationCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "attendance" => Ok(Self::Attendance),
            "grade" => Ok(Self::Grade),
            "message" => Ok(Self::Message),
            "event" => Ok(Self::Event),
            other => Err(Error::invalid_category(other)),
        }
    }
}
