use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::campaign::{Campaign, CampaignId, NeedId, TimeSlotId};
use crate::error::Error;
use crate::typedid::{TypedId, TypedIdMarker};
use crate::user::UserId;

pub mod db;
pub mod endpoints;

pub type EngagementId = TypedId<Engagement>;

/// A user's commitment toward one need. Engagements are never edited or
/// removed once recorded.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Engagement {
    #[serde(rename = "_id")]
    pub id: EngagementId,
    pub campaign_id: CampaignId,
    pub user_id: UserId,
    pub need_id: NeedId,
    #[serde(rename = "type")]
    pub engagement_type: EngagementType,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_slot_id: Option<TimeSlotId>,
    pub status: EngagementStatus,
    pub reminder_set: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminder_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl TypedIdMarker for Engagement {
    fn tag() -> &'static str {
        "ENG"
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EngagementType {
    Donation,
    Volunteer,
}

impl EngagementType {
    /// How the engagement is called in acknowledgements.
    pub fn noun(&self) -> &'static str {
        match self {
            EngagementType::Donation => "don",
            EngagementType::Volunteer => "engagement bénévole",
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EngagementStatus {
    Pending,
    Confirmed,
    Completed,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct NewEngagement {
    pub campaign_id: CampaignId,
    pub user_id: UserId,
    pub need_id: NeedId,
    #[serde(rename = "type")]
    pub engagement_type: EngagementType,
    pub quantity: u32,
    #[serde(default)]
    pub time_slot_id: Option<TimeSlotId>,
    pub status: EngagementStatus,
    #[serde(default)]
    pub reminder_set: bool,
    #[serde(default)]
    pub reminder_time: Option<DateTime<Utc>>,
}

impl NewEngagement {
    /// Checks that the engagement can be applied to `campaign`: a positive
    /// quantity, an existing need and time slot, and no more than the need
    /// still requires.
    pub fn check_against(&self, campaign: &Campaign) -> Result<(), Error> {
        if self.quantity == 0 {
            return Err(Error::InvalidEngagementQuantity {
                quantity: self.quantity,
            });
        }

        let need = campaign.need(self.need_id).ok_or(Error::NeedDoesNotExist {
            campaign_id: campaign.id,
            need_id: self.need_id,
        })?;

        if let Some(time_slot_id) = self.time_slot_id {
            need.time_slot(time_slot_id)
                .ok_or(Error::TimeSlotDoesNotExist {
                    need_id: need.id,
                    time_slot_id,
                })?;
        }

        let remaining = need.remaining();
        if self.quantity > remaining {
            return Err(Error::EngagementExceedsRemaining {
                need_id: need.id,
                requested: self.quantity,
                remaining,
            });
        }

        Ok(())
    }

    pub fn into_engagement(self, id: EngagementId, created_at: DateTime<Utc>) -> Engagement {
        Engagement {
            id,
            campaign_id: self.campaign_id,
            user_id: self.user_id,
            need_id: self.need_id,
            engagement_type: self.engagement_type,
            quantity: self.quantity,
            time_slot_id: self.time_slot_id,
            status: self.status,
            reminder_set: self.reminder_set,
            reminder_time: self.reminder_time,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaign::test::{campaign, need};
    use crate::campaign::{Category, TimeSlot};

    fn engagement_for(campaign: &Campaign, quantity: u32) -> NewEngagement {
        NewEngagement {
            campaign_id: campaign.id,
            user_id: UserId::new(),
            need_id: campaign.needs[0].id,
            engagement_type: EngagementType::Donation,
            quantity,
            time_slot_id: None,
            status: EngagementStatus::Pending,
            reminder_set: false,
            reminder_time: None,
        }
    }

    #[test]
    fn engagement_up_to_remaining_is_accepted() {
        let campaign = campaign("Hiver au Chaud", Category::Winter, vec![need(100, 75)]);

        assert_eq!(engagement_for(&campaign, 25).check_against(&campaign), Ok(()));
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let campaign = campaign("Hiver au Chaud", Category::Winter, vec![need(100, 75)]);

        assert_eq!(
            engagement_for(&campaign, 0).check_against(&campaign),
            Err(Error::InvalidEngagementQuantity { quantity: 0 })
        );
    }

    #[test]
    fn quantity_beyond_remaining_is_rejected() {
        let campaign = campaign("Hiver au Chaud", Category::Winter, vec![need(100, 75)]);

        assert_eq!(
            engagement_for(&campaign, 26).check_against(&campaign),
            Err(Error::EngagementExceedsRemaining {
                need_id: campaign.needs[0].id,
                requested: 26,
                remaining: 25,
            })
        );
    }

    #[test]
    fn unknown_need_is_rejected() {
        let campaign = campaign("Hiver au Chaud", Category::Winter, vec![need(100, 75)]);
        let mut engagement = engagement_for(&campaign, 1);
        engagement.need_id = NeedId::new();

        assert_eq!(
            engagement.check_against(&campaign),
            Err(Error::NeedDoesNotExist {
                campaign_id: campaign.id,
                need_id: engagement.need_id,
            })
        );
    }

    #[test]
    fn time_slot_must_belong_to_the_need() {
        let mut campaign = campaign("Iftar", Category::Ramadan, vec![need(50, 35)]);
        let slot = TimeSlot {
            id: TimeSlotId::new(),
            date: "2024-03-15".to_string(),
            start_time: "18:00".to_string(),
            end_time: "21:00".to_string(),
            volunteers_needed: 20,
            volunteers_assigned: 15,
        };
        campaign.needs[0].time_slots.push(slot.clone());

        let mut engagement = engagement_for(&campaign, 1);
        engagement.time_slot_id = Some(slot.id);
        assert_eq!(engagement.check_against(&campaign), Ok(()));

        let unknown = TimeSlotId::new();
        engagement.time_slot_id = Some(unknown);
        assert_eq!(
            engagement.check_against(&campaign),
            Err(Error::TimeSlotDoesNotExist {
                need_id: campaign.needs[0].id,
                time_slot_id: unknown,
            })
        );
    }
}
