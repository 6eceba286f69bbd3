//! User-facing follow-ups to store mutations. The store never calls a
//! scheduler directly: it records `StoreEvent`s in the `Outbox`, and the
//! `NotificationDispatcher` turns them into `NotificationScheduler` calls.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::campaign::CampaignId;
use crate::error::Error;
use crate::typedid::{TypedId, TypedIdMarker};
use crate::user::UserId;

pub mod dispatcher;
pub mod endpoints;
pub mod outbox;
pub mod scheduler;

pub use dispatcher::NotificationDispatcher;
pub use outbox::{Outbox, StoreEvent};
pub use scheduler::LocalScheduler;

pub type NotificationId = TypedId<Notification>;

/// An entry of the notification log.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Notification {
    pub id: NotificationId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    pub title: String,
    pub body: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<CampaignId>,
    pub read: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_for: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl TypedIdMarker for Notification {
    fn tag() -> &'static str {
        "NTF"
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Reminder,
    Update,
    ThankYou,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationTopic {
    EngagementReminder,
    CampaignUpdate,
}

/// What a notification is about, carried along so that opening it can lead
/// back to the campaign.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct NotificationMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<CampaignId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<NotificationTopic>,
}

#[async_trait]
pub trait NotificationScheduler: Send + Sync {
    /// Arranges for a notification to be delivered at `trigger_at`. Returns
    /// `None` without scheduling anything if `trigger_at` is not in the future.
    async fn schedule_reminder(
        &self,
        title: &str,
        body: &str,
        trigger_at: DateTime<Utc>,
        metadata: NotificationMetadata,
    ) -> Result<Option<NotificationId>, Error>;

    async fn send_immediate(
        &self,
        title: &str,
        body: &str,
        metadata: NotificationMetadata,
    ) -> Result<(), Error>;

    /// Cancels a scheduled reminder. Unknown ids are ignored.
    async fn cancel(&self, notification_id: NotificationId) -> Result<(), Error>;
}
