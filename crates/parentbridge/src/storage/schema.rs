//! `SQLite` schema definitions for parentbridge.
//!
//! This module contains the SQL statements for creating and managing
//! the database schema.

/// SQL statement to create the preferences table.
///
/// Each row holds one user's complete record as a JSON document.
pub const CREATE_PREFERENCES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS notification_preferences (
    user_id TEXT PRIMARY KEY,
    document TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
";

/// SQL statement to create the notification log table.
pub const CREATE_NOTIFICATIONS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS notifications (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    title TEXT NOT NULL,
    body TEXT NOT NULL,
    category TEXT NOT NULL,
    data TEXT NOT NULL DEFAULT '{}',
    timestamp TEXT NOT NULL,
    read INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
)
";

/// SQL statement to create an index for per-user inbox queries.
pub const CREATE_USER_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_notifications_user ON notifications(user_id, read, timestamp DESC)
";

/// SQL statement to create an index on timestamp for pruning.
pub const CREATE_TIMESTAMP_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_notifications_timestamp ON notifications(timestamp)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_PREFERENCES_TABLE,
    CREATE_NOTIFICATIONS_TABLE,
    CREATE_USER_INDEX,
    CREATE_TIMESTAMP_INDEX,
    CREATE_METADATA_TABLE,
];
