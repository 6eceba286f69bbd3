use async_trait::async_trait;
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::bson;
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument};
use mongodb::Collection;

use crate::error::Error;

use super::{
    Campaign, CampaignId, CampaignPatch, CampaignStatus, CampaignUpdate, CampaignUpdateId,
    Category, NewCampaign, NewCampaignUpdate,
};

/// Campaign half of the data source gateway. A missing record is reported as
/// `Ok(None)`/`Ok(false)`; `Err` is reserved for the source itself failing.
#[async_trait]
pub trait CampaignDataSource: Send + Sync {
    async fn list_campaigns(&self) -> Result<Vec<Campaign>, Error>;
    async fn get_campaign(&self, campaign_id: CampaignId) -> Result<Option<Campaign>, Error>;
    async fn list_active_campaigns(&self) -> Result<Vec<Campaign>, Error>;
    async fn list_campaigns_by_category(&self, category: Category)
        -> Result<Vec<Campaign>, Error>;
    async fn search_campaigns(&self, query: &str) -> Result<Vec<Campaign>, Error>;
    async fn create_campaign(&self, campaign: NewCampaign) -> Result<Campaign, Error>;
    async fn update_campaign(
        &self,
        campaign_id: CampaignId,
        patch: CampaignPatch,
    ) -> Result<Option<Campaign>, Error>;
    async fn delete_campaign(&self, campaign_id: CampaignId) -> Result<bool, Error>;
    async fn add_campaign_update(
        &self,
        campaign_id: CampaignId,
        update: NewCampaignUpdate,
    ) -> Result<Option<CampaignUpdate>, Error>;
}

pub type MongoCampaignSource = Collection<Campaign>;

#[async_trait]
impl CampaignDataSource for MongoCampaignSource {
    #[tracing::instrument(skip(self))]
    async fn list_campaigns(&self) -> Result<Vec<Campaign>, Error> {
        let options = FindOptions::builder()
            .sort(bson::doc! { "created_at": -1 })
            .build();
        let campaigns: Vec<Campaign> = self
            .find(bson::doc! {}, options)
            .await?
            .try_collect()
            .await?;

        Ok(campaigns)
    }

    #[tracing::instrument(skip(self))]
    async fn get_campaign(&self, campaign_id: CampaignId) -> Result<Option<Campaign>, Error> {
        let campaign = self
            .find_one(bson::doc! { "_id": campaign_id }, None)
            .await?;

        Ok(campaign)
    }

    #[tracing::instrument(skip(self))]
    async fn list_active_campaigns(&self) -> Result<Vec<Campaign>, Error> {
        let campaigns: Vec<Campaign> = self
            .find(
                bson::doc! { "status": CampaignStatus::Active.as_str() },
                None,
            )
            .await?
            .try_collect()
            .await?;

        Ok(campaigns)
    }

    #[tracing::instrument(skip(self))]
    async fn list_campaigns_by_category(
        &self,
        category: Category,
    ) -> Result<Vec<Campaign>, Error> {
        let campaigns: Vec<Campaign> = self
            .find(bson::doc! { "category": category.as_str() }, None)
            .await?
            .try_collect()
            .await?;

        Ok(campaigns)
    }

    #[tracing::instrument(skip(self))]
    async fn search_campaigns(&self, query: &str) -> Result<Vec<Campaign>, Error> {
        let campaigns = self.list_campaigns().await?;

        Ok(campaigns
            .into_iter()
            .filter(|campaign| campaign.matches_query(query))
            .collect())
    }

    #[tracing::instrument(skip(self))]
    async fn create_campaign(&self, campaign: NewCampaign) -> Result<Campaign, Error> {
        let campaign = campaign.into_campaign(CampaignId::new(), Utc::now());
        self.insert_one(&campaign, None).await?;

        Ok(campaign)
    }

    #[tracing::instrument(skip(self))]
    async fn update_campaign(
        &self,
        campaign_id: CampaignId,
        patch: CampaignPatch,
    ) -> Result<Option<Campaign>, Error> {
        if patch.is_empty() {
            return self.get_campaign(campaign_id).await;
        }

        let fields = bson::to_document(&patch)?;
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        let campaign = self
            .find_one_and_update(
                bson::doc! { "_id": campaign_id },
                bson::doc! { "$set": fields },
                options,
            )
            .await?;

        Ok(campaign)
    }

    #[tracing::instrument(skip(self))]
    async fn delete_campaign(&self, campaign_id: CampaignId) -> Result<bool, Error> {
        let result = self
            .delete_one(bson::doc! { "_id": campaign_id }, None)
            .await?;

        Ok(result.deleted_count > 0)
    }

    #[tracing::instrument(skip(self))]
    async fn add_campaign_update(
        &self,
        campaign_id: CampaignId,
        update: NewCampaignUpdate,
    ) -> Result<Option<CampaignUpdate>, Error> {
        let update = update.into_update(CampaignUpdateId::new(), campaign_id, Utc::now());
        let document = bson::to_bson(&update)?;

        let result = self
            .update_one(
                bson::doc! { "_id": campaign_id },
                bson::doc! {
                    "$push": {
                        "updates": { "$each": [document], "$position": 0 }
                    }
                },
                None,
            )
            .await?;

        if result.matched_count == 0 {
            return Ok(None);
        }

        Ok(Some(update))
    }
}
