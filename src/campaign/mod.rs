use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::collection_point::CollectionPoint;
use crate::typedid::{TypedId, TypedIdMarker};
use crate::user::UserId;

pub mod db;
pub mod endpoints;
pub mod labels;

pub type CampaignId = TypedId<Campaign>;
pub type NeedId = TypedId<Need>;
pub type TimeSlotId = TypedId<TimeSlot>;
pub type CampaignUpdateId = TypedId<CampaignUpdate>;

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Campaign {
    #[serde(rename = "_id")]
    pub id: CampaignId,
    pub title: String,
    pub description: String,
    pub objective: String,
    pub category: Category,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: CampaignStatus,
    pub creator_id: UserId,
    pub creator_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_uri: Option<String>,
    pub needs: Vec<Need>,
    pub collection_points: Vec<CollectionPoint>,
    // newest first
    pub updates: Vec<CampaignUpdate>,
    pub total_engagements: u32,
    pub created_at: DateTime<Utc>,
}

impl Campaign {
    /// Mean of the progress of every need, or `0` for a campaign without needs.
    pub fn progress(&self) -> f64 {
        campaign_progress(self)
    }

    /// The status implied by the campaign window at `now`. The stored `status`
    /// is left untouched; callers decide which one to trust.
    pub fn window_status(&self, now: DateTime<Utc>) -> CampaignStatus {
        derive_status_from_window(now, self.start_date, self.end_date)
    }

    pub fn need(&self, need_id: NeedId) -> Option<&Need> {
        self.needs.iter().find(|need| need.id == need_id)
    }

    /// Adds an engagement's quantity to one of the needs. The campaign counts
    /// the engagement once regardless of the quantity.
    pub fn apply_engagement(&mut self, need_id: NeedId, quantity: u32) {
        if let Some(need) = self.needs.iter_mut().find(|need| need.id == need_id) {
            need.quantity_fulfilled = need.quantity_fulfilled.saturating_add(quantity);
        }
        self.total_engagements = self.total_engagements.saturating_add(1);
    }

    /// Case-insensitive substring match of `query` against the title or the
    /// description. An empty query matches everything.
    pub fn matches_query(&self, query: &str) -> bool {
        if query.is_empty() {
            return true;
        }

        let query = query.to_lowercase();
        self.title.to_lowercase().contains(&query)
            || self.description.to_lowercase().contains(&query)
    }
}

impl TypedIdMarker for Campaign {
    fn tag() -> &'static str {
        "CPN"
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Ramadan,
    Eid,
    Winter,
    Neighborhood,
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Ramadan => "ramadan",
            Category::Eid => "eid",
            Category::Winter => "winter",
            Category::Neighborhood => "neighborhood",
            Category::Other => "other",
        }
    }

    pub fn label(&self) -> &'static str {
        labels::category_label(self.as_str())
    }

    pub fn color(&self) -> &'static str {
        labels::category_color(self.as_str())
    }

    pub fn icon(&self) -> &'static str {
        labels::category_icon(self.as_str())
    }
}

impl FromStr for Category {
    type Err = UnknownKey;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ramadan" => Ok(Category::Ramadan),
            "eid" => Ok(Category::Eid),
            "winter" => Ok(Category::Winter),
            "neighborhood" => Ok(Category::Neighborhood),
            "other" => Ok(Category::Other),
            _ => Err(UnknownKey(s.to_owned())),
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    Upcoming,
    Active,
    Completed,
}

impl CampaignStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignStatus::Upcoming => "upcoming",
            CampaignStatus::Active => "active",
            CampaignStatus::Completed => "completed",
        }
    }

    pub fn label(&self) -> &'static str {
        labels::status_label(self.as_str())
    }

    pub fn color(&self) -> &'static str {
        labels::status_color(self.as_str())
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UnknownKey(pub String);

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Need {
    pub id: NeedId,
    #[serde(rename = "type")]
    pub need_type: NeedType,
    pub label: String,
    pub unit: String,
    pub quantity_required: u32,
    pub quantity_fulfilled: u32,
    // only meaningful for volunteer needs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub time_slots: Vec<TimeSlot>,
}

impl Need {
    pub fn progress(&self) -> f64 {
        progress(self)
    }

    /// How much is still required, never negative even if the need was
    /// overfilled.
    pub fn remaining(&self) -> u32 {
        self.quantity_required.saturating_sub(self.quantity_fulfilled)
    }

    pub fn time_slot(&self, time_slot_id: TimeSlotId) -> Option<&TimeSlot> {
        self.time_slots.iter().find(|slot| slot.id == time_slot_id)
    }
}

impl TypedIdMarker for Need {
    fn tag() -> &'static str {
        "NED"
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NeedType {
    Material,
    Volunteer,
}

impl NeedType {
    pub fn label(&self) -> &'static str {
        match self {
            NeedType::Material => "Don matériel",
            NeedType::Volunteer => "Bénévolat",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            NeedType::Material => "cube",
            NeedType::Volunteer => "people",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct TimeSlot {
    pub id: TimeSlotId,
    // ex. "2024-03-15"
    pub date: String,
    // ex. "18:00"
    pub start_time: String,
    pub end_time: String,
    pub volunteers_needed: u32,
    pub volunteers_assigned: u32,
}

impl TypedIdMarker for TimeSlot {
    fn tag() -> &'static str {
        "TSL"
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct CampaignUpdate {
    pub id: CampaignUpdateId,
    pub campaign_id: CampaignId,
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_uri: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TypedIdMarker for CampaignUpdate {
    fn tag() -> &'static str {
        "UPD"
    }
}

/// A campaign as submitted by its creator, before the data source assigns
/// its id, creation time and engagement counter.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct NewCampaign {
    pub title: String,
    pub description: String,
    pub objective: String,
    pub category: Category,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: CampaignStatus,
    pub creator_id: UserId,
    pub creator_name: String,
    #[serde(default)]
    pub image_uri: Option<String>,
    pub needs: Vec<Need>,
    #[serde(default)]
    pub collection_points: Vec<CollectionPoint>,
}

impl NewCampaign {
    pub fn into_campaign(self, id: CampaignId, created_at: DateTime<Utc>) -> Campaign {
        Campaign {
            id,
            title: self.title,
            description: self.description,
            objective: self.objective,
            category: self.category,
            start_date: self.start_date,
            end_date: self.end_date,
            status: self.status,
            creator_id: self.creator_id,
            creator_name: self.creator_name,
            image_uri: self.image_uri,
            needs: self.needs,
            collection_points: self.collection_points,
            updates: vec![],
            total_engagements: 0,
            created_at,
        }
    }
}

/// A partial update of a campaign. Needs, updates and the engagement counter
/// are only changed through engagements and posted updates.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct CampaignPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objective: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<CampaignStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_points: Option<Vec<CollectionPoint>>,
}

impl CampaignPatch {
    pub fn is_empty(&self) -> bool {
        *self == CampaignPatch::default()
    }

    pub fn apply(self, campaign: &mut Campaign) {
        if let Some(title) = self.title {
            campaign.title = title;
        }
        if let Some(description) = self.description {
            campaign.description = description;
        }
        if let Some(objective) = self.objective {
            campaign.objective = objective;
        }
        if let Some(category) = self.category {
            campaign.category = category;
        }
        if let Some(start_date) = self.start_date {
            campaign.start_date = start_date;
        }
        if let Some(end_date) = self.end_date {
            campaign.end_date = end_date;
        }
        if let Some(status) = self.status {
            campaign.status = status;
        }
        if let Some(image_uri) = self.image_uri {
            campaign.image_uri = Some(image_uri);
        }
        if let Some(collection_points) = self.collection_points {
            campaign.collection_points = collection_points;
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct NewCampaignUpdate {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub image_uri: Option<String>,
}

impl NewCampaignUpdate {
    pub fn into_update(
        self,
        id: CampaignUpdateId,
        campaign_id: CampaignId,
        created_at: DateTime<Utc>,
    ) -> CampaignUpdate {
        CampaignUpdate {
            id,
            campaign_id,
            title: self.title,
            content: self.content,
            image_uri: self.image_uri,
            created_at,
        }
    }
}

/// Percentage of a need that is fulfilled, clamped to `[0, 100]`. A need
/// that requires nothing reports `0`.
pub fn progress(need: &Need) -> f64 {
    if need.quantity_required == 0 {
        return 0.0;
    }

    let ratio = f64::from(need.quantity_fulfilled) / f64::from(need.quantity_required) * 100.0;
    f64::min(ratio, 100.0)
}

pub fn campaign_progress(campaign: &Campaign) -> f64 {
    if campaign.needs.is_empty() {
        return 0.0;
    }

    let total: f64 = campaign.needs.iter().map(progress).sum();
    total / campaign.needs.len() as f64
}

pub fn derive_status_from_window(
    now: DateTime<Utc>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> CampaignStatus {
    if now < start {
        CampaignStatus::Upcoming
    } else if now > end {
        CampaignStatus::Completed
    } else {
        CampaignStatus::Active
    }
}

#[cfg(test)]
pub(crate) mod test {
    use chrono::{Duration, TimeZone};

    use super::*;

    pub fn need(required: u32, fulfilled: u32) -> Need {
        Need {
            id: NeedId::new(),
            need_type: NeedType::Material,
            label: "Repas complets".to_string(),
            unit: "repas".to_string(),
            quantity_required: required,
            quantity_fulfilled: fulfilled,
            time_slots: vec![],
        }
    }

    pub fn new_campaign(title: &str, category: Category, needs: Vec<Need>) -> NewCampaign {
        let start = Utc.with_ymd_and_hms(2024, 3, 11, 0, 0, 0).unwrap();
        NewCampaign {
            title: title.to_string(),
            description: format!("{} description", title),
            objective: "Nourrir 500 personnes".to_string(),
            category,
            start_date: start,
            end_date: start + Duration::days(30),
            status: CampaignStatus::Active,
            creator_id: UserId::new(),
            creator_name: "Ahmed Bennani".to_string(),
            image_uri: None,
            needs,
            collection_points: vec![],
        }
    }

    pub fn campaign(title: &str, category: Category, needs: Vec<Need>) -> Campaign {
        new_campaign(title, category, needs).into_campaign(CampaignId::new(), Utc::now())
    }
}
