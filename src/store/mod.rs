//! The campaign store: the in-memory view of campaigns, the current user's
//! engagements and the collection points, kept in step with the data source
//! and mirrored to the local cache.
//!
//! Every operation awaits the data source first and only then applies its
//! result to memory in a single critical section. A failure leaves memory as
//! it was and records a message in `error`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::cache::{self, LocalCache, CAMPAIGNS_KEY, ENGAGEMENTS_KEY};
use crate::campaign::{
    Campaign, CampaignId, CampaignPatch, CampaignUpdate, Category, NewCampaign, NewCampaignUpdate,
};
use crate::collection_point::CollectionPoint;
use crate::datasource::DataSource;
use crate::engagement::{Engagement, NewEngagement};
use crate::error::Error;
use crate::notification::{Outbox, StoreEvent};
use crate::user::UserId;


#[derive(Clone, Debug, PartialEq)]
pub enum LoadState {
    Idle,
    Loading,
    Ready,
    Error(String),
}

impl Default for LoadState {
    fn default() -> LoadState {
        LoadState::Idle
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct StoreState {
    pub campaigns: Vec<Campaign>,
    pub selected_campaign: Option<Campaign>,
    pub user_engagements: Vec<Engagement>,
    pub collection_points: Vec<CollectionPoint>,
    pub load_state: LoadState,
    pub error: Option<String>,
    pub search_query: String,
    pub selected_category: Option<Category>,
}

pub struct CampaignStore {
    db: Arc<dyn DataSource>,
    cache: Arc<dyn LocalCache>,
    outbox: Arc<Outbox>,
    state: RwLock<StoreState>,
    fetch_generation: AtomicU64,
    // serializes writes to the cache, including read-modify-write cycles
    cache_writes: Mutex<()>,
}

impl CampaignStore {
    pub fn new(
        db: Arc<dyn DataSource>,
        cache: Arc<dyn LocalCache>,
        outbox: Arc<Outbox>,
    ) -> CampaignStore {
        CampaignStore {
            db,
            cache,
            outbox,
            state: RwLock::new(StoreState::default()),
            fetch_generation: AtomicU64::new(0),
            cache_writes: Mutex::new(()),
        }
    }

    pub fn snapshot(&self) -> StoreState {
        self.read().clone()
    }

    pub fn campaigns(&self) -> Vec<Campaign> {
        self.read().campaigns.clone()
    }

    pub fn selected_campaign(&self) -> Option<Campaign> {
        self.read().selected_campaign.clone()
    }

    pub fn user_engagements(&self) -> Vec<Engagement> {
        self.read().user_engagements.clone()
    }

    pub fn collection_points(&self) -> Vec<CollectionPoint> {
        self.read().collection_points.clone()
    }

    pub fn load_state(&self) -> LoadState {
        self.read().load_state.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.read().load_state == LoadState::Loading
    }

    /// Message describing the last failure, if it has not been cleared.
    pub fn error(&self) -> Option<String> {
        self.read().error.clone()
    }

    pub fn search_query(&self) -> String {
        self.read().search_query.clone()
    }

    pub fn selected_category(&self) -> Option<Category> {
        self.read().selected_category
    }

    pub fn set_search_query(&self, query: impl Into<String>) {
        self.write().search_query = query.into();
    }

    pub fn set_selected_category(&self, category: Option<Category>) {
        self.write().selected_category = category;
    }

    pub fn clear_error(&self) {
        let mut state = self.write();
        state.error = None;
        if let LoadState::Error(_) = state.load_state {
            state.load_state = LoadState::Idle;
        }
    }

    /// The campaigns matching both the search query and the selected
    /// category, in collection order.
    pub fn filtered_campaigns(&self) -> Vec<Campaign> {
        let state = self.read();
        state
            .campaigns
            .iter()
            .filter(|campaign| campaign.matches_query(&state.search_query))
            .filter(|campaign| match state.selected_category {
                Some(category) => campaign.category == category,
                None => true,
            })
            .cloned()
            .collect()
    }

    pub async fn fetch_campaigns(&self) {
        let _ = self.try_fetch_campaigns().await;
    }

    /// Shows the cached list right away, then replaces it with the list from
    /// the data source. A fetch overtaken by a newer one leaves memory and
    /// cache alone and returns what memory holds.
    #[tracing::instrument(skip(self))]
    pub async fn try_fetch_campaigns(&self) -> Result<Vec<Campaign>, Error> {
        let generation = self.fetch_generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.begin();

        match cache::load::<Vec<Campaign>>(&*self.cache, CAMPAIGNS_KEY).await {
            Ok(Some(cached)) => {
                let mut state = self.write();
                if self.is_current(generation) {
                    state.campaigns = cached;
                }
            }
            Ok(None) => {}
            Err(err) => warn!("failed to read cached campaigns: {}", err),
        }

        let campaigns = match self.db.campaigns().list_campaigns().await {
            Ok(campaigns) => campaigns,
            Err(err) => {
                if self.is_current(generation) {
                    self.fail("Failed to load campaigns", &err);
                }
                return Err(err);
            }
        };

        {
            let mut state = self.write();
            if !self.is_current(generation) {
                debug!(generation, "discarding campaigns from a superseded fetch");
                return Ok(state.campaigns.clone());
            }
            state.campaigns = campaigns.clone();
            state.load_state = LoadState::Ready;
        }
        self.save_campaigns().await;

        info!("loaded {} campaigns", campaigns.len());
        Ok(campaigns)
    }

    pub async fn fetch_campaign_by_id(&self, campaign_id: CampaignId) -> Option<Campaign> {
        self.try_fetch_campaign_by_id(campaign_id)
            .await
            .ok()
            .flatten()
    }

    /// Loads one campaign into the selection slot. The bulk list is left
    /// untouched.
    #[tracing::instrument(skip(self))]
    pub async fn try_fetch_campaign_by_id(
        &self,
        campaign_id: CampaignId,
    ) -> Result<Option<Campaign>, Error> {
        self.begin();

        match self.db.campaigns().get_campaign(campaign_id).await {
            Ok(campaign) => {
                let mut state = self.write();
                state.selected_campaign = campaign.clone();
                state.load_state = LoadState::Ready;
                Ok(campaign)
            }
            Err(err) => {
                self.write().selected_campaign = None;
                self.fail("Failed to load campaign", &err);
                Err(err)
            }
        }
    }

    pub async fn create_campaign(&self, campaign: NewCampaign) -> Option<Campaign> {
        self.try_create_campaign(campaign).await.ok()
    }

    #[tracing::instrument(skip(self, campaign))]
    pub async fn try_create_campaign(&self, campaign: NewCampaign) -> Result<Campaign, Error> {
        self.begin();

        let campaign = self
            .db
            .campaigns()
            .create_campaign(campaign)
            .await
            .map_err(|err| self.fail_with("Failed to create campaign", err))?;

        {
            let mut state = self.write();
            state.campaigns.insert(0, campaign.clone());
            state.load_state = LoadState::Ready;
        }
        self.save_campaigns().await;

        info!(campaign_id = %campaign.id, "created campaign");
        Ok(campaign)
    }

    pub async fn update_campaign(&self, campaign_id: CampaignId, patch: CampaignPatch) -> bool {
        matches!(
            self.try_update_campaign(campaign_id, patch).await,
            Ok(Some(_))
        )
    }

    #[tracing::instrument(skip(self))]
    pub async fn try_update_campaign(
        &self,
        campaign_id: CampaignId,
        patch: CampaignPatch,
    ) -> Result<Option<Campaign>, Error> {
        self.begin();

        let updated = self
            .db
            .campaigns()
            .update_campaign(campaign_id, patch)
            .await
            .map_err(|err| self.fail_with("Failed to update campaign", err))?;

        let updated = match updated {
            Some(updated) => updated,
            None => {
                self.write().load_state = LoadState::Ready;
                return Ok(None);
            }
        };

        {
            let mut state = self.write();
            if let Some(campaign) = state.campaigns.iter_mut().find(|c| c.id == campaign_id) {
                *campaign = updated.clone();
            }
            if let Some(selected) = state.selected_campaign.as_mut() {
                if selected.id == campaign_id {
                    *selected = updated.clone();
                }
            }
            state.load_state = LoadState::Ready;
        }
        self.save_campaigns().await;

        Ok(Some(updated))
    }

    pub async fn delete_campaign(&self, campaign_id: CampaignId) -> bool {
        self.try_delete_campaign(campaign_id).await.unwrap_or(false)
    }

    /// Returns `false`, leaving memory untouched, if the campaign does not
    /// exist.
    #[tracing::instrument(skip(self))]
    pub async fn try_delete_campaign(&self, campaign_id: CampaignId) -> Result<bool, Error> {
        self.begin();

        let deleted = self
            .db
            .campaigns()
            .delete_campaign(campaign_id)
            .await
            .map_err(|err| self.fail_with("Failed to delete campaign", err))?;

        if !deleted {
            self.write().load_state = LoadState::Ready;
            return Ok(false);
        }

        {
            let mut state = self.write();
            state.campaigns.retain(|campaign| campaign.id != campaign_id);
            if matches!(&state.selected_campaign, Some(selected) if selected.id == campaign_id) {
                state.selected_campaign = None;
            }
            state.load_state = LoadState::Ready;
        }
        self.save_campaigns().await;

        info!(%campaign_id, "deleted campaign");
        Ok(true)
    }

    pub async fn create_engagement(&self, engagement: NewEngagement) -> Option<Engagement> {
        self.try_create_engagement(engagement).await.ok()
    }

    /// Records an engagement and applies it to its campaign. The engagement
    /// is checked against the campaign's remaining capacity before anything
    /// is submitted; nothing changes if the check or the data source fails.
    /// Notifications are queued on the outbox and cannot undo the engagement.
    #[tracing::instrument(skip(self, engagement))]
    pub async fn try_create_engagement(
        &self,
        engagement: NewEngagement,
    ) -> Result<Engagement, Error> {
        const CONTEXT: &str = "Failed to create engagement";
        self.begin();

        let campaign = self
            .find_campaign(engagement.campaign_id)
            .await
            .map_err(|err| self.fail_with(CONTEXT, err))?;
        engagement
            .check_against(&campaign)
            .map_err(|err| self.fail_with(CONTEXT, err))?;
        let need_label = campaign
            .need(engagement.need_id)
            .map(|need| need.label.clone())
            .unwrap_or_default();

        let engagement = self
            .db
            .engagements()
            .create_engagement(engagement)
            .await
            .map_err(|err| self.fail_with(CONTEXT, err))?;

        {
            let mut state = self.write();
            state.user_engagements.push(engagement.clone());
            if let Some(campaign) = state
                .campaigns
                .iter_mut()
                .find(|c| c.id == engagement.campaign_id)
            {
                campaign.apply_engagement(engagement.need_id, engagement.quantity);
            }
            if let Some(selected) = state.selected_campaign.as_mut() {
                if selected.id == engagement.campaign_id {
                    selected.apply_engagement(engagement.need_id, engagement.quantity);
                }
            }
            state.load_state = LoadState::Ready;
        }
        self.append_cached_engagement(&engagement).await;
        self.save_campaigns().await;

        info!(
            engagement_id = %engagement.id,
            campaign_id = %engagement.campaign_id,
            quantity = engagement.quantity,
            "recorded engagement"
        );

        self.outbox
            .push(StoreEvent::EngagementCreated {
                engagement: engagement.clone(),
                campaign_title: campaign.title,
                need_label,
            })
            .await;

        Ok(engagement)
    }

    pub async fn fetch_user_engagements(&self, user_id: UserId) {
        let _ = self.try_fetch_user_engagements(user_id).await;
    }

    /// Loads the user's engagements from the data source, refreshing that
    /// user's slice of the cache. If the data source fails the cached
    /// engagements are served instead and the failure is recorded.
    #[tracing::instrument(skip(self))]
    pub async fn try_fetch_user_engagements(
        &self,
        user_id: UserId,
    ) -> Result<Vec<Engagement>, Error> {
        match self.db.engagements().list_user_engagements(user_id).await {
            Ok(engagements) => {
                self.write().user_engagements = engagements.clone();
                self.replace_cached_engagements(user_id, &engagements).await;
                Ok(engagements)
            }
            Err(err) => {
                self.record_error("Failed to load engagements", &err);

                let engagements: Vec<Engagement> = self
                    .cached_engagements()
                    .await
                    .into_iter()
                    .filter(|engagement| engagement.user_id == user_id)
                    .collect();
                debug!("serving {} cached engagements", engagements.len());
                self.write().user_engagements = engagements.clone();

                Ok(engagements)
            }
        }
    }

    pub async fn fetch_collection_points(&self) {
        let _ = self.try_fetch_collection_points().await;
    }

    #[tracing::instrument(skip(self))]
    pub async fn try_fetch_collection_points(&self) -> Result<Vec<CollectionPoint>, Error> {
        let points = self
            .db
            .collection_points()
            .list_collection_points()
            .await
            .map_err(|err| self.record_error_with("Failed to load collection points", err))?;

        self.write().collection_points = points.clone();

        Ok(points)
    }

    pub async fn add_campaign_update(
        &self,
        campaign_id: CampaignId,
        update: NewCampaignUpdate,
    ) -> bool {
        matches!(
            self.try_add_campaign_update(campaign_id, update).await,
            Ok(Some(_))
        )
    }

    /// Posts an update and prepends it to the campaign's updates. Subscribers
    /// are only told about it when the campaign is loaded, since the
    /// announcement carries its title.
    #[tracing::instrument(skip(self, update))]
    pub async fn try_add_campaign_update(
        &self,
        campaign_id: CampaignId,
        update: NewCampaignUpdate,
    ) -> Result<Option<CampaignUpdate>, Error> {
        let update = self
            .db
            .campaigns()
            .add_campaign_update(campaign_id, update)
            .await
            .map_err(|err| self.record_error_with("Failed to add update", err))?;

        let update = match update {
            Some(update) => update,
            None => return Ok(None),
        };

        let campaign_title = {
            let mut state = self.write();
            let mut campaign_title = None;
            if let Some(campaign) = state.campaigns.iter_mut().find(|c| c.id == campaign_id) {
                campaign.updates.insert(0, update.clone());
                campaign_title = Some(campaign.title.clone());
            }
            if let Some(selected) = state.selected_campaign.as_mut() {
                if selected.id == campaign_id {
                    selected.updates.insert(0, update.clone());
                    campaign_title = campaign_title.or_else(|| Some(selected.title.clone()));
                }
            }
            campaign_title
        };
        self.save_campaigns().await;

        match campaign_title {
            Some(campaign_title) => {
                self.outbox
                    .push(StoreEvent::CampaignUpdatePosted {
                        campaign_id,
                        campaign_title,
                        update_title: update.title.clone(),
                    })
                    .await
            }
            None => debug!(%campaign_id, "campaign not loaded, update not announced"),
        }

        Ok(Some(update))
    }

    /// The campaign as memory knows it, falling back to the data source.
    async fn find_campaign(&self, campaign_id: CampaignId) -> Result<Campaign, Error> {
        let known = {
            let state = self.read();
            state
                .campaigns
                .iter()
                .find(|campaign| campaign.id == campaign_id)
                .or_else(|| {
                    state
                        .selected_campaign
                        .as_ref()
                        .filter(|campaign| campaign.id == campaign_id)
                })
                .cloned()
        };

        if let Some(campaign) = known {
            return Ok(campaign);
        }

        self.db
            .campaigns()
            .get_campaign(campaign_id)
            .await?
            .ok_or(Error::CampaignDoesNotExist { campaign_id })
    }

    fn is_current(&self, generation: u64) -> bool {
        self.fetch_generation.load(Ordering::SeqCst) == generation
    }

    fn begin(&self) {
        let mut state = self.write();
        state.load_state = LoadState::Loading;
        state.error = None;
    }

    fn fail(&self, context: &str, err: &Error) {
        let message = format!("{}: {}", context, err.error_message());
        warn!("{} ({})", message, err);

        let mut state = self.write();
        state.load_state = LoadState::Error(message.clone());
        state.error = Some(message);
    }

    fn fail_with(&self, context: &str, err: Error) -> Error {
        self.fail(context, &err);
        err
    }

    // leaves the load state alone
    fn record_error(&self, context: &str, err: &Error) {
        let message = format!("{}: {}", context, err.error_message());
        warn!("{} ({})", message, err);

        self.write().error = Some(message);
    }

    fn record_error_with(&self, context: &str, err: Error) -> Error {
        self.record_error(context, &err);
        err
    }

    /// Persists the campaigns memory holds when the write lock is taken, so a
    /// late writer never stores an older list over a newer one.
    async fn save_campaigns(&self) {
        let _guard = self.cache_writes.lock().await;
        let campaigns = self.read().campaigns.clone();
        if let Err(err) = cache::save(&*self.cache, CAMPAIGNS_KEY, &campaigns).await {
            warn!("failed to cache campaigns: {}", err);
        }
    }

    async fn cached_engagements(&self) -> Vec<Engagement> {
        match cache::load(&*self.cache, ENGAGEMENTS_KEY).await {
            Ok(engagements) => engagements.unwrap_or_default(),
            Err(err) => {
                warn!("failed to read cached engagements: {}", err);
                Vec::new()
            }
        }
    }

    async fn append_cached_engagement(&self, engagement: &Engagement) {
        let _guard = self.cache_writes.lock().await;
        let mut engagements = self.cached_engagements().await;
        engagements.push(engagement.clone());
        self.save_engagements(&engagements).await;
    }

    async fn replace_cached_engagements(&self, user_id: UserId, fresh: &[Engagement]) {
        let _guard = self.cache_writes.lock().await;
        let mut engagements = self.cached_engagements().await;
        engagements.retain(|engagement| engagement.user_id != user_id);
        engagements.extend(fresh.iter().cloned());
        self.save_engagements(&engagements).await;
    }

    async fn save_engagements(&self, engagements: &[Engagement]) {
        if let Err(err) = cache::save(&*self.cache, ENGAGEMENTS_KEY, engagements).await {
            warn!("failed to cache engagements: {}", err);
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}
