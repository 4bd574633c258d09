//! Preference operations exposed to the app.
//!
//! [`NotificationPreferencesService`] ties a [`PreferenceStore`] to an
//! [`AudioOutput`]. Reads fall back to the default record, updates are
//! validated before they reach the store, and a sound update pushes the new
//! volume to the audio subsystem once the write has succeeded.

use std::sync::Arc;

use chrono::NaiveTime;
use tracing::{debug, info};

use crate::audio::AudioOutput;
use crate::category::NotificationCategory;
use crate::error::Result;
use crate::policy::{self, Decision};
use crate::preferences::{NotificationPreferences, PreferencesUpdate};
use crate::store::PreferenceStore;

/// Reads, updates and evaluates notification preferences.
#[derive(Debug)]
pub struct NotificationPreferencesService<S, A> {
    store: Arc<S>,
    audio: Arc<A>,
}

impl<S, A> Clone for NotificationPreferencesService<S, A> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            audio: Arc::clone(&self.audio),
        }
    }
}

impl<S: PreferenceStore, A: AudioOutput> NotificationPreferencesService<S, A> {
    /// Create a service over a store and an audio output.
    pub fn new(store: Arc<S>, audio: Arc<A>) -> Self {
        Self { store, audio }
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// The audio output.
    #[must_use]
    pub fn audio(&self) -> &Arc<A> {
        &self.audio
    }

    /// Get a user's preferences.
    ///
    /// A user with no stored record gets the default record; that is not an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns the store's error unchanged.
    pub async fn get_preferences(&self, user_id: &str) -> Result<NotificationPreferences> {
        match self.store.get(user_id).await? {
            Some(record) => Ok(record),
            None => {
                debug!(user_id, "No stored preferences, using defaults");
                Ok(self.store.defaults().record_for(user_id))
            }
        }
    }

    /// Merge an update into a user's preferences.
    ///
    /// When the update carries a sound section, the audio volume is set to
    /// its level exactly once after the write succeeds.
    ///
    /// # Errors
    ///
    /// Returns a validation error before anything is written, or the store's
    /// error unchanged. A failed write leaves the volume untouched.
    pub async fn update_preferences(&self, user_id: &str, update: &PreferencesUpdate) -> Result<()> {
        update.validate()?;
        self.store.set(user_id, update).await?;

        if let Some(sound) = update.sound {
            self.audio.set_volume(sound.volume);
        }

        info!(user_id, "Notification preferences updated");
        Ok(())
    }

    /// Decide whether a notification of `category` should reach the user at `now`.
    ///
    /// # Errors
    ///
    /// Returns the store's error or a malformed quiet-hours bound.
    pub async fn should_notify_user(
        &self,
        user_id: &str,
        category: NotificationCategory,
        now: NaiveTime,
    ) -> Result<bool> {
        Ok(self.evaluate_user(user_id, category, now).await?.is_deliver())
    }

    /// Evaluate a candidate notification for a user, with the reason.
    ///
    /// # Errors
    ///
    /// Same as [`Self::should_notify_user`].
    pub async fn evaluate_user(
        &self,
        user_id: &str,
        category: NotificationCategory,
        now: NaiveTime,
    ) -> Result<Decision> {
        let preferences = self.get_preferences(user_id).await?;
        let decision = policy::evaluate(&preferences, category, now)?;

        match decision.suppress_reason() {
            Some(reason) => debug!(user_id, %category, %reason, "Notification suppressed"),
            None => debug!(user_id, %category, "Notification allowed"),
        }
        Ok(decision)
    }
}
