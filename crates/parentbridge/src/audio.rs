//! Audio output for notification sounds.
//!
//! The audio subsystem is an external collaborator. The policy layer only
//! needs two things from it: set the process-wide notification volume and
//! play the sound for a category at a recipient's volume. Concurrent volume
//! setters race and the last call wins.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, trace};

use crate::category::NotificationCategory;

/// Sound asset name for a category.
#[must_use]
pub fn sound_asset(category: NotificationCategory) -> &'static str {
    match category {
        NotificationCategory::Attendance => "notification_attendance.mp3",
        NotificationCategory::Grade => "notification_grade.mp3",
        NotificationCategory::Message => "notification_message.mp3",
        NotificationCategory::Event => "notification_event.mp3",
    }
}

/// A sink for notification sounds.
pub trait AudioOutput: Send + Sync {
    /// Set the volume used for subsequent playback, in `[0, 1]`.
    fn set_volume(&self, level: f64);

    /// Play the sound for a category at `volume`, in `[0, 1]`.
    fn play(&self, category: NotificationCategory, volume: f64);
}

/// Process-wide volume holder.
///
/// Cloning yields a handle to the same volume. Playback is reported through
/// `tracing` since no audio device is attached in this process.
#[derive(Debug, Clone)]
pub struct SharedVolume {
    bits: Arc<AtomicU64>,
}

impl SharedVolume {
    /// Create a holder starting at `level`.
    #[must_use]
    pub fn new(level: f64) -> Self {
        Self {
            bits: Arc::new(AtomicU64::new(level.to_bits())),
        }
    }

    /// The current volume.
    #[must_use]
    pub fn volume(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::SeqCst))
    }
}

impl Default for SharedVolume {
    fn default() -> Self {
        Self::new(crate::preferences::DEFAULT_VOLUME)
    }
}

impl AudioOutput for SharedVolume {
    fn set_volume(&self, level: f64) {
        self.bits.store(level.to_bits(), Ordering::SeqCst);
        debug!(level, "Notification volume set");
    }

    fn play(&self, category: NotificationCategory, volume: f64) {
        trace!(
            %category,
            asset = sound_asset(category),
            volume,
            device_volume = self.volume(),
            "Playing notification sound"
        );
    }
}
