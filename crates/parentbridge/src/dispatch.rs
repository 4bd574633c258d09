//! Producer-side delivery.
//!
//! A [`Dispatcher`] runs every candidate notification through the
//! recipient's preferences. Delivered notifications are appended to the
//! notification log and their category sound is played at the recipient's
//! volume; suppressed ones are dropped.

use std::sync::Arc;

use chrono::NaiveTime;
use serde::Serialize;
use tracing::{debug, info};

use crate::audio::AudioOutput;
use crate::error::Result;
use crate::notification::NotificationEvent;
use crate::policy::Decision;
use crate::service::NotificationPreferencesService;
use crate::storage::Storage;

/// What happened to one dispatched notification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DispatchOutcome {
    /// The policy decision.
    pub decision: Decision,
    /// Log id of the stored notification, when delivered.
    pub id: Option<i64>,
}

/// Delivers notifications according to each recipient's preferences.
#[derive(Debug)]
pub struct Dispatcher<A> {
    service: NotificationPreferencesService<Storage, A>,
}

impl<A: AudioOutput> Dispatcher<A> {
    /// Create a dispatcher over a storage and an audio output.
    pub fn new(storage: Arc<Storage>, audio: Arc<A>) -> Self {
        Self {
            service: NotificationPreferencesService::new(storage, audio),
        }
    }

    /// Create a dispatcher sharing an existing service.
    pub fn from_service(service: NotificationPreferencesService<Storage, A>) -> Self {
        Self { service }
    }

    /// The preference service used for decisions.
    #[must_use]
    pub fn service(&self) -> &NotificationPreferencesService<Storage, A> {
        &self.service
    }

    /// Dispatch one notification at the recipient's local time `now`.
    ///
    /// # Errors
    ///
    /// Returns preference lookup, evaluation or log write failures. Nothing
    /// is stored or played when an error is returned.
    pub async fn dispatch(&self, event: &NotificationEvent, now: NaiveTime) -> Result<DispatchOutcome> {
        let decision = self
            .service
            .evaluate_user(&event.user_id, event.category, now)
            .await?;

        let Decision::Deliver(presentation) = decision else {
            return Ok(DispatchOutcome { decision, id: None });
        };

        let id = self.service.store().insert_notification(event)?;
        if presentation.play_sound {
            self.service
                .audio()
                .play(event.category, presentation.volume);
        }

        info!(
            id,
            user_id = %event.user_id,
            category = %event.category,
            haptic = presentation.haptic,
            "Notification delivered"
        );
        Ok(DispatchOutcome {
            decision,
            id: Some(id),
        })
    }

    /// Dispatch a batch, such as a classroom fan-out, in order.
    ///
    /// # Errors
    ///
    /// Stops at the first failure. Notifications dispatched before it stay
    /// delivered.
    pub async fn dispatch_all(
        &self,
        events: &[NotificationEvent],
        now: NaiveTime,
    ) -> Result<Vec<DispatchOutcome>> {
        let mut outcomes = Vec::with_capacity(events.len());
        for event in events {
            outcomes.push(self.dispatch(event, now).await?);
        }

        let delivered = outcomes.iter().filter(|o| o.id.is_some()).count();
        debug!(total = events.len(), delivered, "Batch dispatched");
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::NotificationCategory;
    use crate::notification::{attendance_notification, classroom_notifications, AttendanceRecord, AttendanceStatus};
    use crate::policy::SuppressReason;
    use crate::preferences::{CategoryToggles, PreferencesUpdate, QuietHours, SoundSettings};
    use crate::service::tests::RecordingAudio;
    use chrono::{TimeZone, Utc};

    fn dispatcher() -> Dispatcher<RecordingAudio> {
        Dispatcher::new(
            Arc::new(Storage::open_in_memory().unwrap()),
            Arc::new(RecordingAudio::default()),
        )
    }

    fn noon() -> NaiveTime {
        NaiveTime::from_hms_opt(12, 0, 0).unwrap()
    }

    fn grade_event(user: &str) -> NotificationEvent {
        NotificationEvent::new(
            user,
            NotificationCategory::Grade,
            "New grade",
            "Science: B+",
            Utc.with_ymd_and_hms(2024, 9, 2, 12, 0, 0).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_delivered_event_is_logged_and_played() {
        let d = dispatcher();
        let outcome = d.dispatch(&grade_event("u"), noon()).await.unwrap();

        assert!(outcome.decision.is_deliver());
        let id = outcome.id.unwrap();
        let stored = d.service().store().get_notification(id).unwrap().unwrap();
        assert_eq!(stored.title, "New grade");
        assert_eq!(
            *d.service().audio().played.lock().unwrap(),
            vec![(NotificationCategory::Grade, 0.8)]
        );
    }

    #[tokio::test]
    async fn test_suppressed_event_is_dropped() {
        let d = dispatcher();
        d.service()
            .update_preferences(
                "u",
                &PreferencesUpdate::new().types(CategoryToggles {
                    grade: false,
                    ..CategoryToggles::all(true)
                }),
            )
            .await
            .unwrap();

        let outcome = d.dispatch(&grade_event("u"), noon()).await.unwrap();
        assert_eq!(
            outcome.decision,
            Decision::Suppress(SuppressReason::CategoryDisabled)
        );
        assert!(outcome.id.is_none());
        assert_eq!(d.service().store().stats().unwrap().total_notifications, 0);
        assert!(d.service().audio().played.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_silent_delivery_skips_sound() {
        let d = dispatcher();
        d.service()
            .update_preferences(
                "u",
                &PreferencesUpdate::new().sound(SoundSettings {
                    enabled: false,
                    volume: 0.5,
                }),
            )
            .await
            .unwrap();

        let outcome = d.dispatch(&grade_event("u"), noon()).await.unwrap();
        assert!(outcome.id.is_some());
        assert!(d.service().audio().played.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_batch_plays_at_each_recipient_volume() {
        let d = dispatcher();
        for (user, volume) in [("p1", 0.3), ("p2", 0.9)] {
            d.service()
                .update_preferences(
                    user,
                    &PreferencesUpdate::new().sound(SoundSettings {
                        enabled: true,
                        volume,
                    }),
                )
                .await
                .unwrap();
        }

        let outcomes = d
            .dispatch_all(&[grade_event("p1"), grade_event("p2")], noon())
            .await
            .unwrap();

        assert_eq!(
            *d.service().audio().played.lock().unwrap(),
            vec![
                (NotificationCategory::Grade, 0.3),
                (NotificationCategory::Grade, 0.9),
            ]
        );
        for (outcome, expected) in outcomes.iter().zip([0.3, 0.9]) {
            let Decision::Deliver(presentation) = outcome.decision else {
                panic!("expected delivery");
            };
            assert!((presentation.volume - expected).abs() < f64::EPSILON);
        }
    }

    #[tokio::test]
    async fn test_attendance_dispatch_inside_quiet_hours() {
        let d = dispatcher();
        d.service()
            .update_preferences(
                "parent",
                &PreferencesUpdate::new().quiet_hours(QuietHours::new(true, "07:00", "09:00")),
            )
            .await
            .unwrap();

        let now = Utc.with_ymd_and_hms(2024, 9, 2, 8, 5, 0).unwrap();
        let record = AttendanceRecord {
            id: "att-3".to_string(),
            student_id: "s-1".to_string(),
            location: "Gym".to_string(),
            status: AttendanceStatus::Present,
            timestamp: now,
        };
        let event = attendance_notification("parent", &record, now);

        let outcome = d
            .dispatch(&event, NaiveTime::from_hms_opt(8, 5, 0).unwrap())
            .await
            .unwrap();
        assert_eq!(outcome.decision, Decision::Suppress(SuppressReason::QuietHours));
    }

    #[tokio::test]
    async fn test_dispatch_all_respects_each_recipient() {
        let d = dispatcher();
        d.service()
            .update_preferences("p2", &PreferencesUpdate::new().enabled(false))
            .await
            .unwrap();

        let events = classroom_notifications(
            &["p1", "p2", "p3"],
            "class-1",
            NotificationCategory::Event,
            "Picture day",
            "Wear your best smile",
            Utc.with_ymd_and_hms(2024, 9, 3, 9, 0, 0).unwrap(),
        );
        let outcomes = d.dispatch_all(&events, noon()).await.unwrap();

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].id.is_some());
        assert_eq!(outcomes[1].decision, Decision::Suppress(SuppressReason::Disabled));
        assert!(outcomes[2].id.is_some());
        assert!(d.service().store().unread_for_user("p2", 10).unwrap().is_empty());
        assert_eq!(d.service().store().unread_for_user("p3", 10).unwrap().len(), 1);
    }
}
