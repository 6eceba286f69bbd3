use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::{self, LocalCache, NOTIFICATIONS_KEY};
use crate::error::Error;

use super::{
    Notification, NotificationId, NotificationKind, NotificationMetadata, NotificationScheduler,
    NotificationTopic,
};

/// Most recent entries kept in the notification log.
pub const NOTIFICATION_LOG_CAPACITY: usize = 50;

/// Delivers notifications through the process log and keeps reminders on
/// tokio timers. Every scheduled reminder is also recorded in a log persisted
/// in the local cache, newest first.
pub struct LocalScheduler {
    cache: Arc<dyn LocalCache>,
    timers: Mutex<HashMap<NotificationId, JoinHandle<()>>>,
    // serializes read-modify-write cycles of the persisted log
    log: Mutex<()>,
}

impl LocalScheduler {
    pub fn new(cache: Arc<dyn LocalCache>) -> LocalScheduler {
        LocalScheduler {
            cache,
            timers: Mutex::new(HashMap::new()),
            log: Mutex::new(()),
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn stored_notifications(&self) -> Result<Vec<Notification>, Error> {
        let notifications = cache::load(&*self.cache, NOTIFICATIONS_KEY).await?;

        Ok(notifications.unwrap_or_default())
    }

    /// Returns `false` if the notification is not in the log.
    #[tracing::instrument(skip(self))]
    pub async fn mark_as_read(&self, notification_id: NotificationId) -> Result<bool, Error> {
        let _guard = self.log.lock().await;
        let mut notifications = self.stored_notifications().await?;

        let notification = match notifications
            .iter_mut()
            .find(|notification| notification.id == notification_id)
        {
            Some(notification) => notification,
            None => return Ok(false),
        };
        notification.read = true;
        cache::save(&*self.cache, NOTIFICATIONS_KEY, &notifications).await?;

        Ok(true)
    }

    /// Cancels the reminder and drops it from the log. Returns `false` if the
    /// notification was not in the log.
    #[tracing::instrument(skip(self))]
    pub async fn remove(&self, notification_id: NotificationId) -> Result<bool, Error> {
        if let Some(timer) = self.timers.lock().await.remove(&notification_id) {
            timer.abort();
        }

        let _guard = self.log.lock().await;
        let mut notifications = self.stored_notifications().await?;

        let before = notifications.len();
        notifications.retain(|notification| notification.id != notification_id);
        if notifications.len() == before {
            return Ok(false);
        }
        cache::save(&*self.cache, NOTIFICATIONS_KEY, &notifications).await?;

        Ok(true)
    }

    #[tracing::instrument(skip(self))]
    pub async fn cancel_all(&self) -> Result<(), Error> {
        for (_, timer) in self.timers.lock().await.drain() {
            timer.abort();
        }

        let _guard = self.log.lock().await;
        self.cache.remove(NOTIFICATIONS_KEY).await
    }

    /// Number of reminders whose timer has not fired yet.
    pub async fn pending_reminders(&self) -> usize {
        let mut timers = self.timers.lock().await;
        timers.retain(|_, timer| !timer.is_finished());
        timers.len()
    }

    /// Arms a timer for every reminder in the log that is still in the
    /// future and not already armed. Timers do not outlive the process, so
    /// this is run once at startup. Returns the number of timers armed.
    #[tracing::instrument(skip(self))]
    pub async fn rearm(&self) -> Result<usize, Error> {
        let now = Utc::now();
        let notifications = {
            let _guard = self.log.lock().await;
            self.stored_notifications().await?
        };

        let mut armed = 0;
        for notification in notifications {
            if notification.kind != NotificationKind::Reminder {
                continue;
            }
            let delay = match notification.scheduled_for.map(|at| (at - now).to_std()) {
                Some(Ok(delay)) if !delay.is_zero() => delay,
                _ => continue,
            };
            if self.timers.lock().await.contains_key(&notification.id) {
                continue;
            }

            let metadata = NotificationMetadata {
                campaign_id: notification.campaign_id,
                user_id: notification.user_id,
                topic: Some(NotificationTopic::EngagementReminder),
            };
            self.arm(
                notification.id,
                notification.title,
                notification.body,
                delay,
                metadata,
            )
            .await;
            armed += 1;
        }

        if armed > 0 {
            info!("re-armed {} reminders", armed);
        }
        Ok(armed)
    }

    async fn arm(
        &self,
        notification_id: NotificationId,
        title: String,
        body: String,
        delay: std::time::Duration,
        metadata: NotificationMetadata,
    ) {
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            deliver(&title, &body, &metadata);
        });

        let mut timers = self.timers.lock().await;
        timers.retain(|_, timer| !timer.is_finished());
        timers.insert(notification_id, timer);
    }

    async fn record(&self, notification: Notification) -> Result<(), Error> {
        let _guard = self.log.lock().await;
        let mut notifications = self.stored_notifications().await?;

        notifications.insert(0, notification);
        notifications.truncate(NOTIFICATION_LOG_CAPACITY);
        cache::save(&*self.cache, NOTIFICATIONS_KEY, &notifications).await
    }
}

fn deliver(title: &str, body: &str, metadata: &NotificationMetadata) {
    info!(
        target: "waqt_lkhair::notifications",
        campaign_id = ?metadata.campaign_id,
        topic = ?metadata.topic,
        "{}: {}",
        title,
        body
    );
}

#[async_trait]
impl NotificationScheduler for LocalScheduler {
    #[tracing::instrument(skip(self, metadata))]
    async fn schedule_reminder(
        &self,
        title: &str,
        body: &str,
        trigger_at: DateTime<Utc>,
        metadata: NotificationMetadata,
    ) -> Result<Option<NotificationId>, Error> {
        let now = Utc::now();
        let delay = match (trigger_at - now).to_std() {
            Ok(delay) if trigger_at > now => delay,
            _ => {
                debug!("reminder time already passed");
                return Ok(None);
            }
        };

        let notification_id = NotificationId::new();
        self.record(Notification {
            id: notification_id,
            user_id: metadata.user_id,
            title: title.to_owned(),
            body: body.to_owned(),
            kind: NotificationKind::Reminder,
            campaign_id: metadata.campaign_id,
            read: false,
            scheduled_for: Some(trigger_at),
            created_at: now,
        })
        .await?;

        self.arm(notification_id, title.to_owned(), body.to_owned(), delay, metadata)
            .await;

        Ok(Some(notification_id))
    }

    #[tracing::instrument(skip(self, metadata))]
    async fn send_immediate(
        &self,
        title: &str,
        body: &str,
        metadata: NotificationMetadata,
    ) -> Result<(), Error> {
        deliver(title, body, &metadata);
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn cancel(&self, notification_id: NotificationId) -> Result<(), Error> {
        self.remove(notification_id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::cache::MemoryCache;

    fn scheduler() -> LocalScheduler {
        LocalScheduler::new(Arc::new(MemoryCache::new()))
    }

    #[tokio::test]
    async fn past_trigger_schedules_nothing() {
        let scheduler = scheduler();

        let id = scheduler
            .schedule_reminder(
                "⏰ Rappel d'engagement",
                "N'oubliez pas",
                Utc::now() - Duration::minutes(5),
                NotificationMetadata::default(),
            )
            .await
            .unwrap();

        assert_eq!(id, None);
        assert!(scheduler.stored_notifications().await.unwrap().is_empty());
        assert_eq!(scheduler.pending_reminders().await, 0);
    }

    #[tokio::test]
    async fn future_trigger_is_logged_and_armed() {
        let scheduler = scheduler();
        let trigger_at = Utc::now() + Duration::hours(3);

        let id = scheduler
            .schedule_reminder(
                "⏰ Rappel d'engagement",
                "N'oubliez pas",
                trigger_at,
                NotificationMetadata {
                    topic: Some(NotificationTopic::EngagementReminder),
                    ..NotificationMetadata::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        let stored = scheduler.stored_notifications().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, id);
        assert_eq!(stored[0].kind, NotificationKind::Reminder);
        assert_eq!(stored[0].scheduled_for, Some(trigger_at));
        assert!(!stored[0].read);
        assert_eq!(scheduler.pending_reminders().await, 1);
    }

    #[tokio::test]
    async fn logged_reminders_are_rearmed_after_restart() {
        let cache: Arc<dyn LocalCache> = Arc::new(MemoryCache::new());
        let before = LocalScheduler::new(cache.clone());
        for offset in [Duration::hours(2), Duration::hours(5)].iter() {
            before
                .schedule_reminder(
                    "rappel",
                    "",
                    Utc::now() + *offset,
                    NotificationMetadata::default(),
                )
                .await
                .unwrap();
        }
        let mut notifications = before.stored_notifications().await.unwrap();
        notifications[0].scheduled_for = Some(Utc::now() - Duration::minutes(1));
        cache::save(&*cache, NOTIFICATIONS_KEY, &notifications).await.unwrap();

        let after = LocalScheduler::new(cache);
        assert_eq!(after.pending_reminders().await, 0);

        assert_eq!(after.rearm().await.unwrap(), 1);
        assert_eq!(after.pending_reminders().await, 1);
        assert_eq!(after.rearm().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn log_keeps_most_recent_entries() {
        let scheduler = scheduler();
        let trigger_at = Utc::now() + Duration::hours(1);

        let mut last = None;
        for i in 0..(NOTIFICATION_LOG_CAPACITY + 5) {
            last = scheduler
                .schedule_reminder(
                    &format!("rappel {}", i),
                    "",
                    trigger_at,
                    NotificationMetadata::default(),
                )
                .await
                .unwrap();
        }

        let stored = scheduler.stored_notifications().await.unwrap();
        assert_eq!(stored.len(), NOTIFICATION_LOG_CAPACITY);
        assert_eq!(Some(stored[0].id), last);
        assert_eq!(stored[NOTIFICATION_LOG_CAPACITY - 1].title, "rappel 5");
    }

    #[tokio::test]
    async fn cancel_disarms_and_forgets() {
        let scheduler = scheduler();
        let id = scheduler
            .schedule_reminder(
                "rappel",
                "",
                Utc::now() + Duration::hours(1),
                NotificationMetadata::default(),
            )
            .await
            .unwrap()
            .unwrap();

        scheduler.cancel(id).await.unwrap();

        assert!(scheduler.stored_notifications().await.unwrap().is_empty());
        assert_eq!(scheduler.pending_reminders().await, 0);
        assert!(!scheduler.remove(id).await.unwrap());
    }

    #[tokio::test]
    async fn mark_as_read_reports_unknown_ids() {
        let scheduler = scheduler();
        let id = scheduler
            .schedule_reminder(
                "rappel",
                "",
                Utc::now() + Duration::hours(1),
                NotificationMetadata::default(),
            )
            .await
            .unwrap()
            .unwrap();

        assert!(scheduler.mark_as_read(id).await.unwrap());
        assert!(!scheduler.mark_as_read(NotificationId::new()).await.unwrap());
        assert!(scheduler.stored_notifications().await.unwrap()[0].read);
    }

    #[tokio::test]
    async fn cancel_all_clears_everything() {
        let scheduler = scheduler();
        for _ in 0..3 {
            scheduler
                .schedule_reminder(
                    "rappel",
                    "",
                    Utc::now() + Duration::hours(1),
                    NotificationMetadata::default(),
                )
                .await
                .unwrap();
        }

        scheduler.cancel_all().await.unwrap();

        assert!(scheduler.stored_notifications().await.unwrap().is_empty());
        assert_eq!(scheduler.pending_reminders().await, 0);
    }
}
