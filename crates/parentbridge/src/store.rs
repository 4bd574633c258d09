//! Preference store abstraction.
//!
//! A [`PreferenceStore`] keeps one [`NotificationPreferences`] record per
//! user and applies [`PreferencesUpdate`]s with merge semantics. A store
//! must give read-after-write consistency for a single user. Concurrent
//! writers are last-write-wins; stores do not version records.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{Error, Result};
use crate::preferences::{NotificationPreferences, PreferenceDefaults, PreferencesUpdate};

/// Storage backend for notification preferences.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Defaults used for users with no stored record.
    fn defaults(&self) -> &PreferenceDefaults;

    /// Fetch the stored record for a user, or `None` if there is none.
    ///
    /// # Errors
    ///
    /// Returns the underlying storage error.
    async fn get(&self, user_id: &str) -> Result<Option<NotificationPreferences>>;

    /// Merge an update into the user's record.
    ///
    /// When the user has no record yet, the update is merged onto
    /// [`PreferenceStore::defaults`] so the stored record is always complete.
    ///
    /// # Errors
    ///
    /// Returns the underlying storage error.
    async fn set(&self, user_id: &str, update: &PreferencesUpdate) -> Result<()>;
}

/// In-process preference store.
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    defaults: PreferenceDefaults,
    records: Mutex<HashMap<String, NotificationPreferences>>,
}

impl MemoryPreferenceStore {
    /// Create an empty store with built-in defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store with custom defaults.
    #[must_use]
    pub fn with_defaults(defaults: PreferenceDefaults) -> Self {
        Self {
            defaults,
            records: Mutex::default(),
        }
    }

    /// Replace a user's record outright.
    ///
    /// # Errors
    ///
    /// Returns an error if the store lock is poisoned.
    pub fn insert(&self, record: NotificationPreferences) -> Result<()> {
        self.lock()?.insert(record.user_id.clone(), record);
        Ok(())
    }

    /// Number of stored records.
    ///
    /// # Errors
    ///
    /// Returns an error if the store lock is poisoned.
    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    /// Whether no records are stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the store lock is poisoned.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.lock()?.is_empty())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, NotificationPreferences>>> {
        self.records
            .lock()
            .map_err(|_| Error::internal("preference store lock poisoned"))
    }
}

#[async_trait]
impl PreferenceStore for MemoryPreferenceStore {
    fn defaults(&self) -> &PreferenceDefaults {
        &self.defaults
    }

    async fn get(&self, user_id: &str) -> Result<Option<NotificationPreferences>> {
        Ok(self.lock()?.get(user_id).cloned())
    }

    async fn set(&self, user_id: &str, update: &PreferencesUpdate) -> Result<()> {
        let mut records = self.lock()?;
        let record = records
            .entry(user_id.to_string())
            .or_insert_with(|| self.defaults.record_for(user_id));
        record.apply(update);
        debug!(user_id, "Preferences merged");
        Ok(())
    }
}
