use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use tokio::sync::Mutex;
use tracing::debug;

use crate::campaign::db::CampaignDataSource;
use crate::campaign::{
    Campaign, CampaignId, CampaignPatch, CampaignStatus, CampaignUpdate, CampaignUpdateId,
    Category, NewCampaign, NewCampaignUpdate,
};
use crate::collection_point::db::CollectionPointDataSource;
use crate::collection_point::CollectionPoint;
use crate::engagement::db::EngagementDataSource;
use crate::engagement::{Engagement, EngagementId, NewEngagement};
use crate::error::Error;
use crate::seed::Fixtures;
use crate::user::db::UserDataSource;
use crate::user::{User, UserId};

use super::DataSource;

#[derive(Debug, Default)]
struct Records {
    campaigns: Vec<Campaign>,
    engagements: Vec<Engagement>,
    collection_points: Vec<CollectionPoint>,
    users: Vec<User>,
}

/// Mock API kept entirely in process. Every call waits a random delay of up
/// to `latency` and may fail with `DataSourceUnavailable`, either because it
/// was switched off or by drawing against `failure_rate`.
#[derive(Debug)]
pub struct MemoryDataSource {
    records: Mutex<Records>,
    latency: Duration,
    failure_rate: f64,
    available: AtomicBool,
}

impl MemoryDataSource {
    pub fn new() -> MemoryDataSource {
        MemoryDataSource {
            records: Mutex::new(Records::default()),
            latency: Duration::from_millis(0),
            failure_rate: 0.0,
            available: AtomicBool::new(true),
        }
    }

    pub fn seeded(fixtures: Fixtures) -> MemoryDataSource {
        MemoryDataSource {
            records: Mutex::new(Records {
                campaigns: fixtures.campaigns,
                engagements: fixtures.engagements,
                collection_points: fixtures.collection_points,
                users: fixtures.users,
            }),
            ..MemoryDataSource::new()
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> MemoryDataSource {
        self.latency = latency;
        self
    }

    pub fn with_failure_rate(mut self, failure_rate: f64) -> MemoryDataSource {
        self.failure_rate = failure_rate.clamp(0.0, 1.0);
        self
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    async fn round_trip(&self) -> Result<(), Error> {
        if !self.latency.is_zero() {
            let millis = self.latency.as_millis() as u64;
            let delay = rand::thread_rng().gen_range(millis / 2..=millis);
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if !self.available.load(Ordering::SeqCst) {
            return Err(Error::DataSourceUnavailable);
        }

        if self.failure_rate > 0.0 && rand::thread_rng().gen_bool(self.failure_rate) {
            debug!("simulated data source failure");
            return Err(Error::DataSourceUnavailable);
        }

        Ok(())
    }
}

impl Default for MemoryDataSource {
    fn default() -> MemoryDataSource {
        MemoryDataSource::new()
    }
}

impl DataSource for MemoryDataSource {
    fn campaigns(&self) -> &dyn CampaignDataSource {
        self
    }

    fn engagements(&self) -> &dyn EngagementDataSource {
        self
    }

    fn collection_points(&self) -> &dyn CollectionPointDataSource {
        self
    }

    fn users(&self) -> &dyn UserDataSource {
        self
    }
}

#[async_trait]
impl CampaignDataSource for MemoryDataSource {
    #[tracing::instrument(skip(self))]
    async fn list_campaigns(&self) -> Result<Vec<Campaign>, Error> {
        self.round_trip().await?;
        Ok(self.records.lock().await.campaigns.clone())
    }

    #[tracing::instrument(skip(self))]
    async fn get_campaign(&self, campaign_id: CampaignId) -> Result<Option<Campaign>, Error> {
        self.round_trip().await?;
        let records = self.records.lock().await;

        Ok(records
            .campaigns
            .iter()
            .find(|campaign| campaign.id == campaign_id)
            .cloned())
    }

    #[tracing::instrument(skip(self))]
    async fn list_active_campaigns(&self) -> Result<Vec<Campaign>, Error> {
        self.round_trip().await?;
        let records = self.records.lock().await;

        Ok(records
            .campaigns
            .iter()
            .filter(|campaign| campaign.status == CampaignStatus::Active)
            .cloned()
            .collect())
    }

    #[tracing::instrument(skip(self))]
    async fn list_campaigns_by_category(
        &self,
        category: Category,
    ) -> Result<Vec<Campaign>, Error> {
        self.round_trip().await?;
        let records = self.records.lock().await;

        Ok(records
            .campaigns
            .iter()
            .filter(|campaign| campaign.category == category)
            .cloned()
            .collect())
    }

    #[tracing::instrument(skip(self))]
    async fn search_campaigns(&self, query: &str) -> Result<Vec<Campaign>, Error> {
        self.round_trip().await?;
        let records = self.records.lock().await;

        Ok(records
            .campaigns
            .iter()
            .filter(|campaign| campaign.matches_query(query))
            .cloned()
            .collect())
    }

    #[tracing::instrument(skip(self))]
    async fn create_campaign(&self, campaign: NewCampaign) -> Result<Campaign, Error> {
        self.round_trip().await?;
        let campaign = campaign.into_campaign(CampaignId::new(), Utc::now());
        self.records.lock().await.campaigns.push(campaign.clone());

        Ok(campaign)
    }

    #[tracing::instrument(skip(self))]
    async fn update_campaign(
        &self,
        campaign_id: CampaignId,
        patch: CampaignPatch,
    ) -> Result<Option<Campaign>, Error> {
        self.round_trip().await?;
        let mut records = self.records.lock().await;

        let campaign = match records
            .campaigns
            .iter_mut()
            .find(|campaign| campaign.id == campaign_id)
        {
            Some(campaign) => campaign,
            None => return Ok(None),
        };
        patch.apply(campaign);

        Ok(Some(campaign.clone()))
    }

    #[tracing::instrument(skip(self))]
    async fn delete_campaign(&self, campaign_id: CampaignId) -> Result<bool, Error> {
        self.round_trip().await?;
        let mut records = self.records.lock().await;

        let before = records.campaigns.len();
        records.campaigns.retain(|campaign| campaign.id != campaign_id);

        Ok(records.campaigns.len() != before)
    }

    #[tracing::instrument(skip(self))]
    async fn add_campaign_update(
        &self,
        campaign_id: CampaignId,
        update: NewCampaignUpdate,
    ) -> Result<Option<CampaignUpdate>, Error> {
        self.round_trip().await?;
        let mut records = self.records.lock().await;

        let campaign = match records
            .campaigns
            .iter_mut()
            .find(|campaign| campaign.id == campaign_id)
        {
            Some(campaign) => campaign,
            None => return Ok(None),
        };
        let update = update.into_update(CampaignUpdateId::new(), campaign_id, Utc::now());
        campaign.updates.insert(0, update.clone());

        Ok(Some(update))
    }
}

#[async_trait]
impl EngagementDataSource for MemoryDataSource {
    #[tracing::instrument(skip(self))]
    async fn create_engagement(&self, engagement: NewEngagement) -> Result<Engagement, Error> {
        self.round_trip().await?;
        let mut records = self.records.lock().await;

        let campaign_id = engagement.campaign_id;
        let campaign = records
            .campaigns
            .iter_mut()
            .find(|campaign| campaign.id == campaign_id)
            .ok_or(Error::CampaignDoesNotExist { campaign_id })?;
        engagement.check_against(campaign)?;

        let engagement = engagement.into_engagement(EngagementId::new(), Utc::now());
        campaign.apply_engagement(engagement.need_id, engagement.quantity);
        records.engagements.push(engagement.clone());

        Ok(engagement)
    }

    #[tracing::instrument(skip(self))]
    async fn list_user_engagements(&self, user_id: UserId) -> Result<Vec<Engagement>, Error> {
        self.round_trip().await?;
        let records = self.records.lock().await;

        Ok(records
            .engagements
            .iter()
            .filter(|engagement| engagement.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CollectionPointDataSource for MemoryDataSource {
    #[tracing::instrument(skip(self))]
    async fn list_collection_points(&self) -> Result<Vec<CollectionPoint>, Error> {
        self.round_trip().await?;
        Ok(self.records.lock().await.collection_points.clone())
    }
}

#[async_trait]
impl UserDataSource for MemoryDataSource {
    #[tracing::instrument(skip(self, _password))]
    async fn login(&self, email: &str, _password: &str) -> Result<User, Error> {
        self.round_trip().await?;
        let records = self.records.lock().await;

        Ok(records
            .users
            .iter()
            .find(|user| user.email.eq_ignore_ascii_case(email))
            .cloned()
            .unwrap_or_else(|| User::guest(email)))
    }

    #[tracing::instrument(skip(self))]
    async fn quick_login(&self) -> Result<User, Error> {
        self.round_trip().await?;
        let records = self.records.lock().await;

        records
            .users
            .iter()
            .find(|user| user.is_creator)
            .cloned()
            .ok_or_else(|| Error::ExistentialState("no creator account is registered".to_string()))
    }
}
