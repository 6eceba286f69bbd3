use actix_web::web::{Data, Json, Path};
use actix_web::{delete, get, patch, post, put, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::collection_point::CollectionPoint;
use crate::error::Error;
use crate::store::CampaignStore;
use crate::user::UserId;

use super::{
    Campaign, CampaignId, CampaignPatch, CampaignStatus, CampaignUpdate, Category, NeedId,
    NeedType, NewCampaign, NewCampaignUpdate, TimeSlot,
};

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct NeedBody {
    pub id: NeedId,
    #[serde(rename = "type")]
    pub need_type: NeedType,
    pub label: String,
    pub unit: String,
    pub quantity_required: u32,
    pub quantity_fulfilled: u32,
    pub remaining: u32,
    pub progress: f64,
    pub time_slots: Vec<TimeSlot>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CampaignBody {
    pub id: CampaignId,
    pub title: String,
    pub description: String,
    pub objective: String,
    pub category: Category,
    pub category_label: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: CampaignStatus,
    pub status_label: String,
    // status implied by the campaign window at render time
    pub window_status: CampaignStatus,
    pub creator_id: UserId,
    pub creator_name: String,
    pub image_uri: Option<String>,
    pub progress: f64,
    pub needs: Vec<NeedBody>,
    pub collection_points: Vec<CollectionPoint>,
    pub updates: Vec<CampaignUpdate>,
    pub total_engagements: u32,
    pub created_at: DateTime<Utc>,
}

impl CampaignBody {
    pub fn render(campaign: Campaign, now: DateTime<Utc>) -> CampaignBody {
        let progress = campaign.progress();
        let window_status = campaign.window_status(now);

        CampaignBody {
            id: campaign.id,
            title: campaign.title,
            description: campaign.description,
            objective: campaign.objective,
            category: campaign.category,
            category_label: campaign.category.label().to_string(),
            start_date: campaign.start_date,
            end_date: campaign.end_date,
            status: campaign.status,
            status_label: campaign.status.label().to_string(),
            window_status,
            creator_id: campaign.creator_id,
            creator_name: campaign.creator_name,
            image_uri: campaign.image_uri,
            progress,
            needs: campaign
                .needs
                .into_iter()
                .map(|need| NeedBody {
                    id: need.id,
                    need_type: need.need_type,
                    remaining: need.remaining(),
                    progress: need.progress(),
                    label: need.label,
                    unit: need.unit,
                    quantity_required: need.quantity_required,
                    quantity_fulfilled: need.quantity_fulfilled,
                    time_slots: need.time_slots,
                })
                .collect(),
            collection_points: campaign.collection_points,
            updates: campaign.updates,
            total_engagements: campaign.total_engagements,
            created_at: campaign.created_at,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct FiltersBody {
    #[serde(default)]
    pub search_query: String,
    #[serde(default)]
    pub category: Option<Category>,
}

fn render_all(campaigns: Vec<Campaign>) -> Vec<CampaignBody> {
    let now = Utc::now();
    campaigns
        .into_iter()
        .map(|campaign| CampaignBody::render(campaign, now))
        .collect()
}

#[get("/campaigns")]
#[tracing::instrument(skip(store))]
pub async fn get_campaigns(store: Data<CampaignStore>) -> Result<Json<Vec<CampaignBody>>, Error> {
    store.try_fetch_campaigns().await?;

    Ok(Json(render_all(store.filtered_campaigns())))
}

#[put("/campaigns/filters")]
#[tracing::instrument(skip(store))]
pub async fn set_campaign_filters(
    store: Data<CampaignStore>,
    body: Json<FiltersBody>,
) -> Result<Json<Vec<CampaignBody>>, Error> {
    let body = body.into_inner();

    store.set_search_query(body.search_query);
    store.set_selected_category(body.category);

    Ok(Json(render_all(store.filtered_campaigns())))
}

#[post("/campaigns")]
#[tracing::instrument(skip(store, body))]
pub async fn create_campaign(
    store: Data<CampaignStore>,
    body: Json<NewCampaign>,
) -> Result<Json<CampaignBody>, Error> {
    let campaign = store.try_create_campaign(body.into_inner()).await?;

    Ok(Json(CampaignBody::render(campaign, Utc::now())))
}

#[get("/campaigns/{campaign_id}")]
#[tracing::instrument(skip(store))]
pub async fn get_campaign_by_id(
    store: Data<CampaignStore>,
    params: Path<CampaignId>,
) -> Result<Json<CampaignBody>, Error> {
    let campaign_id = params.into_inner();

    let campaign = store
        .try_fetch_campaign_by_id(campaign_id)
        .await?
        .ok_or(Error::CampaignDoesNotExist { campaign_id })?;

    Ok(Json(CampaignBody::render(campaign, Utc::now())))
}

#[patch("/campaigns/{campaign_id}")]
#[tracing::instrument(skip(store, body))]
pub async fn update_campaign(
    store: Data<CampaignStore>,
    params: Path<CampaignId>,
    body: Json<CampaignPatch>,
) -> Result<Json<CampaignBody>, Error> {
    let campaign_id = params.into_inner();

    let campaign = store
        .try_update_campaign(campaign_id, body.into_inner())
        .await?
        .ok_or(Error::CampaignDoesNotExist { campaign_id })?;

    Ok(Json(CampaignBody::render(campaign, Utc::now())))
}

#[delete("/campaigns/{campaign_id}")]
#[tracing::instrument(skip(store))]
pub async fn delete_campaign(
    store: Data<CampaignStore>,
    params: Path<CampaignId>,
) -> Result<HttpResponse, Error> {
    let campaign_id = params.into_inner();

    if !store.try_delete_campaign(campaign_id).await? {
        return Err(Error::CampaignDoesNotExist { campaign_id });
    }

    Ok(HttpResponse::NoContent().finish())
}

#[post("/campaigns/{campaign_id}/updates")]
#[tracing::instrument(skip(store, body))]
pub async fn add_campaign_update(
    store: Data<CampaignStore>,
    params: Path<CampaignId>,
    body: Json<NewCampaignUpdate>,
) -> Result<Json<CampaignUpdate>, Error> {
    let campaign_id = params.into_inner();

    let update = store
        .try_add_campaign_update(campaign_id, body.into_inner())
        .await?
        .ok_or(Error::CampaignDoesNotExist { campaign_id })?;

    Ok(Json(update))
}
