use actix_web::web::{Data, Json, Path};
use actix_web::{get, post};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::campaign::{CampaignId, NeedId, TimeSlotId};
use crate::error::Error;
use crate::store::CampaignStore;
use crate::user::UserId;

use super::{Engagement, EngagementId, EngagementStatus, EngagementType, NewEngagement};

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct EngagementBody {
    pub id: EngagementId,
    pub campaign_id: CampaignId,
    pub user_id: UserId,
    pub need_id: NeedId,
    #[serde(rename = "type")]
    pub engagement_type: EngagementType,
    pub quantity: u32,
    pub time_slot_id: Option<TimeSlotId>,
    pub status: EngagementStatus,
    pub reminder_set: bool,
    pub reminder_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl EngagementBody {
    pub fn render(engagement: Engagement) -> EngagementBody {
        EngagementBody {
            id: engagement.id,
            campaign_id: engagement.campaign_id,
            user_id: engagement.user_id,
            need_id: engagement.need_id,
            engagement_type: engagement.engagement_type,
            quantity: engagement.quantity,
            time_slot_id: engagement.time_slot_id,
            status: engagement.status,
            reminder_set: engagement.reminder_set,
            reminder_time: engagement.reminder_time,
            created_at: engagement.created_at,
        }
    }
}

#[post("/engagements")]
#[tracing::instrument(skip(store, body))]
pub async fn create_engagement(
    store: Data<CampaignStore>,
    body: Json<NewEngagement>,
) -> Result<Json<EngagementBody>, Error> {
    let engagement = store.try_create_engagement(body.into_inner()).await?;

    Ok(Json(EngagementBody::render(engagement)))
}

#[get("/users/{user_id}/engagements")]
#[tracing::instrument(skip(store))]
pub async fn get_user_engagements(
    store: Data<CampaignStore>,
    params: Path<UserId>,
) -> Result<Json<Vec<EngagementBody>>, Error> {
    let user_id = params.into_inner();

    let engagements = store.try_fetch_user_engagements(user_id).await?;

    let body = engagements.into_iter().map(EngagementBody::render).collect();

    Ok(Json(body))
}
