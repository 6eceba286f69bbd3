use std::collections::VecDeque;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, Notify};
use tracing::warn;

use crate::cache::{self, LocalCache, OUTBOX_KEY};
use crate::campaign::CampaignId;
use crate::engagement::Engagement;

/// Something the campaign store did that users should hear about.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StoreEvent {
    EngagementCreated {
        engagement: Engagement,
        campaign_title: String,
        need_label: String,
    },
    CampaignUpdatePosted {
        campaign_id: CampaignId,
        campaign_title: String,
        update_title: String,
    },
}

/// Queue of store events awaiting dispatch, mirrored to the local cache so
/// that events recorded before a restart are still delivered. An event stays
/// queued until the consumer acknowledges it.
pub struct Outbox {
    cache: Arc<dyn LocalCache>,
    events: Mutex<VecDeque<StoreEvent>>,
    notify: Notify,
}

impl Outbox {
    /// Opens the outbox, picking up events left over from a previous run.
    pub async fn open(cache: Arc<dyn LocalCache>) -> Outbox {
        let events: VecDeque<StoreEvent> = match cache::load(&*cache, OUTBOX_KEY).await {
            Ok(events) => events.unwrap_or_default(),
            Err(err) => {
                warn!("failed to restore pending store events: {}", err);
                VecDeque::new()
            }
        };

        let outbox = Outbox {
            cache,
            events: Mutex::new(events),
            notify: Notify::new(),
        };

        if !outbox.events.lock().await.is_empty() {
            outbox.notify.notify_one();
        }

        outbox
    }

    #[tracing::instrument(skip(self, event))]
    pub async fn push(&self, event: StoreEvent) {
        let mut events = self.events.lock().await;
        events.push_back(event);
        self.persist(&events).await;
        drop(events);

        self.notify.notify_one();
    }

    /// Snapshot of the queued events, oldest first.
    pub async fn pending(&self) -> Vec<StoreEvent> {
        self.events.lock().await.iter().cloned().collect()
    }

    /// Drops the `count` oldest events once they have been handled.
    #[tracing::instrument(skip(self))]
    pub async fn acknowledge(&self, count: usize) {
        let mut events = self.events.lock().await;
        let count = count.min(events.len());
        events.drain(..count);
        self.persist(&events).await;
    }

    /// Waits until an event is pushed. Returns immediately if one was pushed
    /// since the last wait.
    pub async fn wait(&self) {
        self.notify.notified().await;
    }

    async fn persist(&self, events: &VecDeque<StoreEvent>) {
        if let Err(err) = cache::save(&*self.cache, OUTBOX_KEY, events).await {
            warn!("failed to persist pending store events: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::cache::MemoryCache;
    use crate::campaign::NeedId;
    use crate::engagement::{EngagementId, EngagementStatus, EngagementType, NewEngagement};
    use crate::user::UserId;

    fn posted(title: &str) -> StoreEvent {
        StoreEvent::CampaignUpdatePosted {
            campaign_id: CampaignId::from_u128(1),
            campaign_title: "Iftar Solidaire 2024".to_string(),
            update_title: title.to_string(),
        }
    }

    #[tokio::test]
    async fn events_survive_reopening() {
        let cache: Arc<dyn LocalCache> = Arc::new(MemoryCache::new());

        let outbox = Outbox::open(Arc::clone(&cache)).await;
        outbox.push(posted("Distribution réussie")).await;
        drop(outbox);

        let reopened = Outbox::open(cache).await;
        assert_eq!(reopened.pending().await, vec![posted("Distribution réussie")]);
    }

    #[tokio::test]
    async fn acknowledged_events_are_dropped_in_order() {
        let outbox = Outbox::open(Arc::new(MemoryCache::new())).await;
        outbox.push(posted("premier")).await;
        outbox.push(posted("second")).await;

        outbox.acknowledge(1).await;
        assert_eq!(outbox.pending().await, vec![posted("second")]);

        outbox.acknowledge(10).await;
        assert!(outbox.pending().await.is_empty());
    }

    #[tokio::test]
    async fn wait_returns_after_push() {
        let outbox = Outbox::open(Arc::new(MemoryCache::new())).await;
        outbox.push(posted("premier")).await;

        tokio::time::timeout(std::time::Duration::from_secs(1), outbox.wait())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn engagement_event_keeps_its_nested_type_tag() {
        let engagement = NewEngagement {
            campaign_id: CampaignId::new(),
            user_id: UserId::new(),
            need_id: NeedId::new(),
            engagement_type: EngagementType::Volunteer,
            quantity: 2,
            time_slot_id: None,
            status: EngagementStatus::Pending,
            reminder_set: false,
            reminder_time: None,
        }
        .into_engagement(EngagementId::new(), Utc::now());
        let event = StoreEvent::EngagementCreated {
            engagement,
            campaign_title: "Hiver au Chaud".to_string(),
            need_label: "Accompagnateurs".to_string(),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "engagement_created");
        assert_eq!(json["engagement"]["type"], "volunteer");

        let back: StoreEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }
}
