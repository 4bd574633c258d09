//! Grouping of notification lists for presentation.
//!
//! Grouping follows a user's [`GroupingSettings`]. Input lists are expected
//! newest first, as the inbox queries return them. Groups appear in the
//! order of their first member, and members keep their input order.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::category::NotificationCategory;
use crate::notification::NotificationEvent;
use crate::preferences::GroupingSettings;

/// What the members of a group share.
///
/// A `None` component means the group is not split on that dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct GroupKey {
    /// Shared category.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<NotificationCategory>,
    /// Shared UTC calendar date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
}

impl std::fmt::Display for GroupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.category, self.date) {
            (Some(category), Some(date)) => write!(f, "{category} on {date}"),
            (Some(category), None) => write!(f, "{category}"),
            (None, Some(date)) => write!(f, "{date}"),
            (None, None) => write!(f, "all"),
        }
    }
}

/// A run of notifications presented together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationGroup {
    /// What the members share.
    pub key: GroupKey,
    /// Members, in input order.
    pub events: Vec<NotificationEvent>,
}

impl NotificationGroup {
    /// Number of unread members.
    #[must_use]
    pub fn unread_count(&self) -> usize {
        self.events.iter().filter(|e| !e.read).count()
    }
}

/// Group notifications according to `settings`.
///
/// With grouping disabled every event forms its own group. Otherwise events
/// are split by category when `by_type` is set and by date when `by_date` is
/// set; with neither set everything lands in one group.
#[must_use]
pub fn group_notifications(
    settings: &GroupingSettings,
    events: Vec<NotificationEvent>,
) -> Vec<NotificationGroup> {
    if !settings.enabled {
        return events
            .into_iter()
            .map(|event| NotificationGroup {
                key: GroupKey {
                    category: Some(event.category),
                    date: Some(event.timestamp.date_naive()),
                },
                events: vec![event],
            })
            .collect();
    }

    let mut groups: Vec<NotificationGroup> = Vec::new();
    let mut index: HashMap<GroupKey, usize> = HashMap::new();
    for event in events {
        let key = GroupKey {
            category: settings.by_type.then_some(event.category),
            date: settings.by_date.then(|| event.timestamp.date_naive()),
        };

        match index.get(&key) {
            Some(&position) => groups[position].events.push(event),
            None => {
                index.insert(key, groups.len());
                groups.push(NotificationGroup {
                    key,
                    events: vec![event],
                });
            }
        }
    }
    groups
}
