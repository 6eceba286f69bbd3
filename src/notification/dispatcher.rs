use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, info, warn};

use crate::campaign::CampaignId;
use crate::engagement::{Engagement, EngagementType};

use super::{NotificationMetadata, NotificationScheduler, NotificationTopic, Outbox, StoreEvent};

/// How long before an engagement its reminder goes off.
pub const REMINDER_LEAD_HOURS: i64 = 2;

pub fn thank_you_message(
    engagement_type: EngagementType,
    campaign_title: &str,
) -> (String, String) {
    (
        "💚 Merci pour votre générosité !".to_string(),
        format!(
            "Votre {} pour \"{}\" a bien été enregistré. Baraka Allahou fik !",
            engagement_type.noun(),
            campaign_title
        ),
    )
}

pub fn reminder_message(campaign_title: &str, need_label: &str) -> (String, String) {
    (
        "⏰ Rappel d'engagement".to_string(),
        format!(
            "N'oubliez pas votre engagement pour \"{}\" - {}",
            campaign_title, need_label
        ),
    )
}

pub fn update_message(campaign_title: &str, update_title: &str) -> (String, String) {
    (format!("📢 {}", campaign_title), update_title.to_string())
}

/// Consumes the outbox and turns store events into scheduler calls. A failed
/// call is logged and the event is still considered handled.
pub struct NotificationDispatcher {
    scheduler: Arc<dyn NotificationScheduler>,
}

impl NotificationDispatcher {
    pub fn new(scheduler: Arc<dyn NotificationScheduler>) -> NotificationDispatcher {
        NotificationDispatcher { scheduler }
    }

    /// Dispatches every event waiting in the outbox and acknowledges them.
    /// Returns how many were handled.
    pub async fn dispatch_pending(&self, outbox: &Outbox) -> usize {
        let events = outbox.pending().await;
        for event in &events {
            self.dispatch(event).await;
        }
        outbox.acknowledge(events.len()).await;

        events.len()
    }

    pub async fn run(self, outbox: Arc<Outbox>) {
        info!("notification dispatcher started");
        loop {
            outbox.wait().await;
            let count = self.dispatch_pending(&outbox).await;
            debug!("dispatched {} store events", count);
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn dispatch(&self, event: &StoreEvent) {
        match event {
            StoreEvent::EngagementCreated {
                engagement,
                campaign_title,
                need_label,
            } => {
                self.thank(engagement, campaign_title).await;
                self.remind(engagement, campaign_title, need_label).await;
            }
            StoreEvent::CampaignUpdatePosted {
                campaign_id,
                campaign_title,
                update_title,
            } => {
                self.announce(*campaign_id, campaign_title, update_title)
                    .await;
            }
        }
    }

    async fn thank(&self, engagement: &Engagement, campaign_title: &str) {
        let (title, body) = thank_you_message(engagement.engagement_type, campaign_title);
        let metadata = NotificationMetadata {
            campaign_id: Some(engagement.campaign_id),
            user_id: Some(engagement.user_id),
            topic: None,
        };

        if let Err(err) = self.scheduler.send_immediate(&title, &body, metadata).await {
            warn!(engagement_id = %engagement.id, "failed to send thank you notification: {}", err);
        }
    }

    async fn remind(&self, engagement: &Engagement, campaign_title: &str, need_label: &str) {
        let reminder_time = match engagement.reminder_time {
            Some(reminder_time) if engagement.reminder_set => reminder_time,
            _ => return,
        };

        let (title, body) = reminder_message(campaign_title, need_label);
        let metadata = NotificationMetadata {
            campaign_id: Some(engagement.campaign_id),
            user_id: Some(engagement.user_id),
            topic: Some(NotificationTopic::EngagementReminder),
        };
        let trigger_at = reminder_time - Duration::hours(REMINDER_LEAD_HOURS);

        match self
            .scheduler
            .schedule_reminder(&title, &body, trigger_at, metadata)
            .await
        {
            Ok(Some(notification_id)) => {
                info!(
                    engagement_id = %engagement.id,
                    %notification_id,
                    "scheduled engagement reminder"
                )
            }
            Ok(None) => {
                debug!(
                    engagement_id = %engagement.id,
                    "engagement reminder time already passed"
                )
            }
            Err(err) => {
                warn!(
                    engagement_id = %engagement.id,
                    "failed to schedule engagement reminder: {}",
                    err
                )
            }
        }
    }

    async fn announce(&self, campaign_id: CampaignId, campaign_title: &str, update_title: &str) {
        let (title, body) = update_message(campaign_title, update_title);
        let metadata = NotificationMetadata {
            campaign_id: Some(campaign_id),
            user_id: None,
            topic: Some(NotificationTopic::CampaignUpdate),
        };

        if let Err(err) = self.scheduler.send_immediate(&title, &body, metadata).await {
            warn!(%campaign_id, "failed to send update notification: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::Utc;

    use super::*;
    use crate::cache::MemoryCache;
    use crate::campaign::NeedId;
    use crate::engagement::{EngagementId, EngagementStatus, NewEngagement};
    use crate::error::Error;
    use crate::notification::test::MockScheduler;
    use crate::notification::NotificationId;
    use crate::user::UserId;

    fn engagement(reminder_time: Option<chrono::DateTime<Utc>>) -> Engagement {
        NewEngagement {
            campaign_id: CampaignId::new(),
            user_id: UserId::new(),
            need_id: NeedId::new(),
            engagement_type: EngagementType::Donation,
            quantity: 20,
            time_slot_id: None,
            status: EngagementStatus::Pending,
            reminder_set: reminder_time.is_some(),
            reminder_time,
        }
        .into_engagement(EngagementId::new(), Utc::now())
    }

    fn created(engagement: Engagement) -> StoreEvent {
        StoreEvent::EngagementCreated {
            engagement,
            campaign_title: "Iftar Solidaire 2024".to_string(),
            need_label: "Repas complets".to_string(),
        }
    }

    #[tokio::test]
    async fn engagement_without_reminder_only_thanks() {
        let mut scheduler = MockScheduler::new();
        let called_send = Arc::new(Mutex::new(false));
        let called_send_clone = Arc::clone(&called_send);
        scheduler.on_send_immediate = Box::new(move |title, body, metadata| {
            *called_send_clone.lock().unwrap() = true;
            assert_eq!(title, "💚 Merci pour votre générosité !");
            assert_eq!(
                body,
                "Votre don pour \"Iftar Solidaire 2024\" a bien été enregistré. Baraka Allahou fik !"
            );
            assert!(metadata.campaign_id.is_some());
            Ok(())
        });

        NotificationDispatcher::new(Arc::new(scheduler))
            .dispatch(&created(engagement(None)))
            .await;

        assert!(
            *called_send.lock().unwrap(),
            "scheduler.send_immediate was not called"
        );
    }

    #[tokio::test]
    async fn reminder_fires_two_hours_early() {
        let reminder_time = Utc::now() + Duration::days(1);
        let mut scheduler = MockScheduler::new();
        scheduler.on_send_immediate = Box::new(|_, _, _| Ok(()));
        let called_schedule = Arc::new(Mutex::new(false));
        let called_schedule_clone = Arc::clone(&called_schedule);
        scheduler.on_schedule_reminder = Box::new(move |title, body, trigger_at, metadata| {
            *called_schedule_clone.lock().unwrap() = true;
            assert_eq!(title, "⏰ Rappel d'engagement");
            assert_eq!(
                body,
                "N'oubliez pas votre engagement pour \"Iftar Solidaire 2024\" - Repas complets"
            );
            assert_eq!(trigger_at, reminder_time - Duration::hours(2));
            assert_eq!(metadata.topic, Some(NotificationTopic::EngagementReminder));
            Ok(Some(NotificationId::new()))
        });

        NotificationDispatcher::new(Arc::new(scheduler))
            .dispatch(&created(engagement(Some(reminder_time))))
            .await;

        assert!(
            *called_schedule.lock().unwrap(),
            "scheduler.schedule_reminder was not called"
        );
    }

    #[tokio::test]
    async fn failing_thank_you_still_schedules_reminder() {
        let mut scheduler = MockScheduler::new();
        scheduler.on_send_immediate = Box::new(|_, _, _| Err(Error::DataSourceUnavailable));
        let called_schedule = Arc::new(Mutex::new(false));
        let called_schedule_clone = Arc::clone(&called_schedule);
        scheduler.on_schedule_reminder = Box::new(move |_, _, _, _| {
            *called_schedule_clone.lock().unwrap() = true;
            Ok(None)
        });

        NotificationDispatcher::new(Arc::new(scheduler))
            .dispatch(&created(engagement(Some(Utc::now()))))
            .await;

        assert!(
            *called_schedule.lock().unwrap(),
            "scheduler.schedule_reminder was not called"
        );
    }

    #[tokio::test]
    async fn update_posted_is_announced() {
        let campaign_id = CampaignId::new();
        let mut scheduler = MockScheduler::new();
        let called_send = Arc::new(Mutex::new(false));
        let called_send_clone = Arc::clone(&called_send);
        scheduler.on_send_immediate = Box::new(move |title, body, metadata| {
            *called_send_clone.lock().unwrap() = true;
            assert_eq!(title, "📢 Hiver au Chaud");
            assert_eq!(body, "Distribution réussie");
            assert_eq!(metadata.campaign_id, Some(campaign_id));
            assert_eq!(metadata.topic, Some(NotificationTopic::CampaignUpdate));
            Ok(())
        });

        NotificationDispatcher::new(Arc::new(scheduler))
            .dispatch(&StoreEvent::CampaignUpdatePosted {
                campaign_id,
                campaign_title: "Hiver au Chaud".to_string(),
                update_title: "Distribution réussie".to_string(),
            })
            .await;

        assert!(
            *called_send.lock().unwrap(),
            "scheduler.send_immediate was not called"
        );
    }

    #[tokio::test]
    async fn pending_events_are_acknowledged_even_when_delivery_fails() {
        let mut scheduler = MockScheduler::new();
        scheduler.on_send_immediate = Box::new(|_, _, _| Err(Error::DataSourceUnavailable));
        let outbox = Outbox::open(Arc::new(MemoryCache::new())).await;
        outbox.push(created(engagement(None))).await;
        outbox.push(created(engagement(None))).await;

        let count = NotificationDispatcher::new(Arc::new(scheduler))
            .dispatch_pending(&outbox)
            .await;

        assert_eq!(count, 2);
        assert!(outbox.pending().await.is_empty());
    }

    #[test]
    fn volunteer_thank_you_names_the_engagement() {
        let (_, body) = thank_you_message(EngagementType::Volunteer, "Nettoyage Quartier Al Fida");

        assert_eq!(
            body,
            "Votre engagement bénévole pour \"Nettoyage Quartier Al Fida\" a bien été enregistré. Baraka Allahou fik !"
        );
    }
}
