use async_trait::async_trait;
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::bson;
use mongodb::Collection;
use tracing::{debug, warn};

use crate::campaign::{Campaign, Need};
use crate::error::Error;
use crate::user::UserId;

use super::{Engagement, EngagementId, NewEngagement};

#[async_trait]
pub trait EngagementDataSource: Send + Sync {
    /// Records the engagement and applies it to the targeted need: the need's
    /// fulfilled quantity grows by `quantity` and the campaign's engagement
    /// counter by one. The capacity check and the increment happen together,
    /// so an engagement that no longer fits is refused with
    /// `EngagementExceedsRemaining` and nothing is recorded.
    async fn create_engagement(&self, engagement: NewEngagement) -> Result<Engagement, Error>;
    async fn list_user_engagements(&self, user_id: UserId) -> Result<Vec<Engagement>, Error>;
}

#[derive(Clone, Debug)]
pub struct MongoEngagementSource {
    pub(crate) engagements: Collection<Engagement>,
    pub(crate) campaigns: Collection<Campaign>,
}

// conditional increments retried when the need moved underneath
const APPLY_ATTEMPTS: usize = 3;

impl MongoEngagementSource {
    /// Applies the engagement to its need only if the need still holds the
    /// quantities `check_against` saw. Returns false when it moved since.
    async fn apply_if_unchanged(
        &self,
        engagement: &NewEngagement,
        need: &Need,
    ) -> Result<bool, Error> {
        let result = self
            .campaigns
            .update_one(
                bson::doc! {
                    "_id": engagement.campaign_id,
                    "needs": {
                        "$elemMatch": {
                            "id": engagement.need_id,
                            "quantity_required": i64::from(need.quantity_required),
                            "quantity_fulfilled": i64::from(need.quantity_fulfilled),
                        }
                    },
                },
                increment(engagement.quantity, 1),
                None,
            )
            .await?;

        Ok(result.modified_count == 1)
    }

    async fn revert(&self, engagement: &Engagement) -> Result<(), Error> {
        self.campaigns
            .update_one(
                bson::doc! {
                    "_id": engagement.campaign_id,
                    "needs.id": engagement.need_id,
                },
                increment(engagement.quantity, -1),
                None,
            )
            .await?;

        Ok(())
    }
}

fn increment(quantity: u32, sign: i64) -> bson::Document {
    bson::doc! {
        "$inc": {
            "needs.$.quantity_fulfilled": sign * i64::from(quantity),
            "total_engagements": sign,
        }
    }
}

#[async_trait]
impl EngagementDataSource for MongoEngagementSource {
    #[tracing::instrument(skip(self))]
    async fn create_engagement(&self, engagement: NewEngagement) -> Result<Engagement, Error> {
        let campaign_id = engagement.campaign_id;

        let mut applied = false;
        for attempt in 1..=APPLY_ATTEMPTS {
            let campaign = self
                .campaigns
                .find_one(bson::doc! { "_id": campaign_id }, None)
                .await?
                .ok_or(Error::CampaignDoesNotExist { campaign_id })?;
            engagement.check_against(&campaign)?;

            let need = campaign
                .need(engagement.need_id)
                .ok_or(Error::NeedDoesNotExist {
                    campaign_id,
                    need_id: engagement.need_id,
                })?;
            if self.apply_if_unchanged(&engagement, need).await? {
                applied = true;
                break;
            }
            debug!(attempt, "need changed while applying engagement");
        }

        if !applied {
            return Err(Error::ExistentialState(format!(
                "need {} kept changing while applying an engagement",
                engagement.need_id
            )));
        }

        let engagement = engagement.into_engagement(EngagementId::new(), Utc::now());
        if let Err(err) = self.engagements.insert_one(&engagement, None).await {
            if let Err(revert_err) = self.revert(&engagement).await {
                warn!(
                    campaign_id = %engagement.campaign_id,
                    need_id = %engagement.need_id,
                    "failed to revert engagement that could not be recorded: {}",
                    revert_err
                );
            }
            return Err(err.into());
        }

        Ok(engagement)
    }

    #[tracing::instrument(skip(self))]
    async fn list_user_engagements(&self, user_id: UserId) -> Result<Vec<Engagement>, Error> {
        let engagements: Vec<Engagement> = self
            .engagements
            .find(bson::doc! { "user_id": user_id }, None)
            .await?
            .try_collect()
            .await?;

        Ok(engagements)
    }
}
