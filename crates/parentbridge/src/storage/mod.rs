//! Storage layer for parentbridge.
//!
//! This module provides `SQLite`-based persistent storage for notification
//! preferences and the notification log. Preferences are kept as one JSON
//! document per user, mirroring the document store the mobile app talks to.

pub mod migrations;
pub mod schema;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::category::NotificationCategory;
use crate::error::{Error, Result};
use crate::notification::NotificationEvent;
use crate::preferences::{NotificationPreferences, PreferenceDefaults, PreferencesUpdate};
use crate::store::PreferenceStore;

/// Columns selected for a notification row, in `row_to_notification` order.
const NOTIFICATION_COLUMNS: &str = "id, user_id, title, body, category, data, timestamp, read";

/// Storage engine for preferences and notifications.
///
/// Provides persistent storage using `SQLite` with support for:
/// - Merge-updates of per-user preference documents
/// - An append-only notification log with a read flag
/// - Per-user inbox queries, newest first
/// - Pruning of old notifications
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Mutex<Connection>,
    /// Defaults for users with no stored preferences.
    defaults: PreferenceDefaults,
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    /// Initializes the schema if this is a new database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self {
            path,
            conn: Mutex::new(conn),
            defaults: PreferenceDefaults::default(),
        })
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn: Mutex::new(conn),
            defaults: PreferenceDefaults::default(),
        })
    }

    /// Use custom defaults for users with no stored preferences.
    #[must_use]
    pub fn with_defaults(mut self, defaults: PreferenceDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::internal("database connection lock poisoned"))
    }

    // === Preferences ===

    /// Get a user's stored preferences, or `None` if there is no record.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the stored document is corrupt.
    pub fn get_preferences(&self, user_id: &str) -> Result<Option<NotificationPreferences>> {
        let conn = self.conn()?;
        read_preferences(&conn, user_id)
    }

    /// Merge an update into a user's preferences and return the new record.
    ///
    /// The read and the write happen in one transaction. A user without a
    /// record starts from the configured defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn merge_preferences(
        &self,
        user_id: &str,
        update: &PreferencesUpdate,
    ) -> Result<NotificationPreferences> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let record = read_preferences(&tx, user_id)?
            .unwrap_or_else(|| self.defaults.record_for(user_id))
            .merged(update);

        tx.execute(
            r"
            INSERT INTO notification_preferences (user_id, document, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(user_id) DO UPDATE SET
                document = excluded.document,
                updated_at = excluded.updated_at
            ",
            params![user_id, serde_json::to_string(&record)?, format_timestamp(Utc::now())],
        )?;
        tx.commit()?;

        debug!(user_id, "Preferences merged");
        Ok(record)
    }

    /// Count stored preference records.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn preference_count(&self) -> Result<i64> {
        let count: i64 = self.conn()?.query_row(
            "SELECT COUNT(*) FROM notification_preferences",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // === Notifications ===

    /// Append a notification to the log and return its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn insert_notification(&self, event: &NotificationEvent) -> Result<i64> {
        let data = serde_json::to_string(&event.data)?;
        let conn = self.conn()?;

        conn.execute(
            r"
            INSERT INTO notifications (user_id, title, body, category, data, timestamp, read)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
            params![
                event.user_id,
                event.title,
                event.body,
                event.category.as_str(),
                data,
                format_timestamp(event.timestamp),
                event.read,
            ],
        )?;

        let id = conn.last_insert_rowid();
        debug!(id, user_id = %event.user_id, category = %event.category, "Inserted notification");
        Ok(id)
    }

    /// Get a notification by its ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_notification(&self, id: i64) -> Result<Option<NotificationEvent>> {
        let result = self
            .conn()?
            .query_row(
                &format!("SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = ?1"),
                [id],
                row_to_notification,
            )
            .optional()?;
        Ok(result)
    }

    /// Mark a notification as read.
    ///
    /// Returns `true` if the notification exists. Marking an already-read
    /// notification is a no-op that still returns `true`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn mark_read(&self, id: i64) -> Result<bool> {
        let affected = self
            .conn()?
            .execute("UPDATE notifications SET read = 1 WHERE id = ?1", [id])?;
        Ok(affected > 0)
    }

    /// Get a user's unread notifications, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn unread_for_user(&self, user_id: &str, limit: usize) -> Result<Vec<NotificationEvent>> {
        self.query_for_user(
            &format!(
                "SELECT {NOTIFICATION_COLUMNS} FROM notifications
                 WHERE user_id = ?1 AND read = 0
                 ORDER BY timestamp DESC, id DESC LIMIT ?2"
            ),
            user_id,
            limit,
        )
    }

    /// Get a user's most recent notifications, read or not, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn recent_for_user(&self, user_id: &str, limit: usize) -> Result<Vec<NotificationEvent>> {
        self.query_for_user(
            &format!(
                "SELECT {NOTIFICATION_COLUMNS} FROM notifications
                 WHERE user_id = ?1
                 ORDER BY timestamp DESC, id DESC LIMIT ?2"
            ),
            user_id,
            limit,
        )
    }

    fn query_for_user(&self, sql: &str, user_id: &str, limit: usize) -> Result<Vec<NotificationEvent>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;

        let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);
        let events = stmt
            .query_map(params![user_id, limit_i64], row_to_notification)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(events)
    }

    /// Prune notifications older than `max_age` relative to `now`.
    ///
    /// Returns the number of notifications deleted. A `max_age` reaching past
    /// the earliest representable time prunes nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn prune_older_than(&self, now: DateTime<Utc>, max_age: Duration) -> Result<usize> {
        let Some(cutoff) = now.checked_sub_signed(max_age) else {
            debug!(days = max_age.num_days(), "Retention cutoff out of range, nothing to prune");
            return Ok(0);
        };
        let cutoff = format_timestamp(cutoff);

        let affected = self
            .conn()?
            .execute("DELETE FROM notifications WHERE timestamp < ?1", [cutoff])?;

        if affected > 0 {
            info!("Pruned {} old notifications", affected);
        }
        Ok(affected)
    }

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let preference_records = self.preference_count()?;
        let conn = self.conn()?;

        let (total_notifications, unread_notifications): (i64, i64) = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(CASE WHEN read = 0 THEN 1 ELSE 0 END), 0) FROM notifications",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let (oldest, newest): (Option<String>, Option<String>) = conn.query_row(
            "SELECT MIN(timestamp), MAX(timestamp) FROM notifications",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let oldest_notification = oldest
            .map(|s| parse_timestamp(&s).map_err(|e| conversion_error(0, e)))
            .transpose()?;
        let newest_notification = newest
            .map(|s| parse_timestamp(&s).map_err(|e| conversion_error(1, e)))
            .transpose()?;

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            preference_records,
            total_notifications,
            unread_notifications,
            oldest_notification,
            newest_notification,
            db_size_bytes,
        })
    }
}

#[async_trait]
impl PreferenceStore for Storage {
    fn defaults(&self) -> &PreferenceDefaults {
        &self.defaults
    }

    async fn get(&self, user_id: &str) -> Result<Option<NotificationPreferences>> {
        self.get_preferences(user_id)
    }

    async fn set(&self, user_id: &str, update: &PreferencesUpdate) -> Result<()> {
        self.merge_preferences(user_id, update).map(|_| ())
    }
}

/// Statistics about the storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageStats {
    /// Number of users with stored preferences.
    pub preference_records: i64,
    /// Total number of logged notifications.
    pub total_notifications: i64,
    /// Number of unread notifications.
    pub unread_notifications: i64,
    /// Timestamp of the oldest notification.
    pub oldest_notification: Option<DateTime<Utc>>,
    /// Timestamp of the newest notification.
    pub newest_notification: Option<DateTime<Utc>>,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}

fn read_preferences(conn: &Connection, user_id: &str) -> Result<Option<NotificationPreferences>> {
    let document: Option<String> = conn
        .query_row(
            "SELECT document FROM notification_preferences WHERE user_id = ?1",
            [user_id],
            |row| row.get(0),
        )
        .optional()?;

    document
        .map(|doc| serde_json::from_str(&doc).map_err(Error::from))
        .transpose()
}

/// Fixed-width UTC timestamps so text ordering matches time ordering.
fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(s: &str) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc))
}

fn conversion_error(
    index: usize,
    err: impl std::fmt::Display,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(index, Type::Text, err.to_string().into())
}

/// Convert a database row to a `NotificationEvent`.
fn row_to_notification(row: &rusqlite::Row) -> rusqlite::Result<NotificationEvent> {
    let id: i64 = row.get(0)?;
    let user_id: String = row.get(1)?;
    let title: String = row.get(2)?;
    let body: String = row.get(3)?;
    let category_str: String = row.get(4)?;
    let data_str: String = row.get(5)?;
    let timestamp_str: String = row.get(6)?;
    let read: bool = row.get(7)?;

    let category: NotificationCategory =
        category_str.parse().map_err(|e| conversion_error(4, e))?;
    let data: BTreeMap<String, String> =
        serde_json::from_str(&data_str).map_err(|e| conversion_error(5, e))?;
    let timestamp = parse_timestamp(&timestamp_str).map_err(|e| conversion_error(6, e))?;

    Ok(NotificationEvent {
        id: Some(id),
        user_id,
        title,
        body,
        category,
        timestamp,
        read,
        data,
    })
}
