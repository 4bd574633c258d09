//! Notification events and the producers that build them.
//!
//! A [`NotificationEvent`] is created by a producer (attendance recording,
//! grading, messaging, calendar) and afterwards only changes by its `read`
//! flag going from false to true.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::category::NotificationCategory;

/// Data key linking a notification to an attendance record.
pub const DATA_ATTENDANCE_ID: &str = "attendanceId";

/// Data key linking a notification to a classroom.
pub const DATA_CLASSROOM_ID: &str = "classroomId";

/// Data key repeating the notification category for push payloads.
pub const DATA_TYPE: &str = "type";

/// A notification delivered to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEvent {
    /// Unique identifier (assigned by the storage layer).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    /// Recipient.
    pub user_id: String,

    /// Short headline.
    pub title: String,

    /// Body text.
    pub body: String,

    /// Category used for gating and grouping.
    #[serde(rename = "type")]
    pub category: NotificationCategory,

    /// When the producer created the notification.
    pub timestamp: DateTime<Utc>,

    /// Whether the user has seen it.
    pub read: bool,

    /// Deep-link payload.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, String>,
}

impl NotificationEvent {
    /// Create an unread notification.
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        category: NotificationCategory,
        title: impl Into<String>,
        body: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            user_id: user_id.into(),
            title: title.into(),
            body: body.into(),
            category,
            timestamp,
            read: false,
            data: BTreeMap::new(),
        }
    }

    /// Attach a data entry.
    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

/// Attendance outcome recorded for a student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    /// Arrived on time.
    Present,
    /// Did not arrive.
    Absent,
    /// Arrived late.
    Late,
}

impl std::fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Present => write!(f, "present"),
            Self::Absent => write!(f, "absent"),
            Self::Late => write!(f, "late"),
        }
    }
}

/// An attendance record produced by check-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    /// Record identifier.
    pub id: String,
    /// The student checked in.
    pub student_id: String,
    /// Where check-in happened.
    pub location: String,
    /// The outcome.
    pub status: AttendanceStatus,
    /// When check-in happened.
    pub timestamp: DateTime<Utc>,
}

/// Build the notification sent to a parent when attendance is recorded.
#[must_use]
pub fn attendance_notification(
    user_id: &str,
    record: &AttendanceRecord,
    now: DateTime<Utc>,
) -> NotificationEvent {
    NotificationEvent::new(
        user_id,
        NotificationCategory::Attendance,
        "Attendance Recorded",
        format!(
            "Your child's attendance was recorded as {} at {}",
            record.status, record.location
        ),
        now,
    )
    .with_data(DATA_ATTENDANCE_ID, record.id.clone())
    .with_data(DATA_TYPE, NotificationCategory::Attendance.as_str())
}

/// Build one notification per classroom member.
#[must_use]
pub fn classroom_notifications<S: AsRef<str>>(
    member_ids: &[S],
    classroom_id: &str,
    category: NotificationCategory,
    title: &str,
    body: &str,
    now: DateTime<Utc>,
) -> Vec<NotificationEvent> {
    member_ids
        .iter()
        .map(|member| {
            NotificationEvent::new(member.as_ref(), category, title, body, now)
                .with_data(DATA_CLASSROOM_ID, classroom_id)
        })
        .collect()
}
