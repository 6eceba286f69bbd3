use chrono::{DateTime, Utc};
use tracing::info;

use crate::campaign::{
    Campaign, CampaignId, CampaignStatus, CampaignUpdate, CampaignUpdateId, Category, Need,
    NeedId, NeedType, TimeSlot, TimeSlotId,
};
use crate::collection_point::{
    CollectionPoint, CollectionPointId, CollectionPointType, Coordinates,
};
use crate::datasource::MongoDataSource;
use crate::engagement::{Engagement, EngagementId, EngagementStatus, EngagementType};
use crate::error::Error;
use crate::user::{User, UserId};

pub const AHMED_ID: UserId = UserId::from_u128(0x33957EB6_0EE7_487F_A087_E55C335BD601);
pub const FATIMA_ID: UserId = UserId::from_u128(0x33957EB6_0EE7_487F_A087_E55C335BD602);

pub const IFTAR_ID: CampaignId = CampaignId::from_u128(0x16E77539_8873_4C8A_BCA3_203601047401);
pub const WINTER_ID: CampaignId = CampaignId::from_u128(0x16E77539_8873_4C8A_BCA3_203601047402);
pub const EID_ID: CampaignId = CampaignId::from_u128(0x16E77539_8873_4C8A_BCA3_203601047403);
pub const CLEANUP_ID: CampaignId = CampaignId::from_u128(0x16E77539_8873_4C8A_BCA3_203601047404);

pub const MEALS_NEED_ID: NeedId = NeedId::from_u128(0x5EA81D0A_9788_4B8A_82D9_1A0D636B5301);

/// Everything the demo data source starts with.
#[derive(Clone, Debug, Default)]
pub struct Fixtures {
    pub campaigns: Vec<Campaign>,
    pub collection_points: Vec<CollectionPoint>,
    pub users: Vec<User>,
    pub engagements: Vec<Engagement>,
}

fn at(timestamp: &str) -> Result<DateTime<Utc>, Error> {
    timestamp
        .parse()
        .map_err(|_| Error::ExistentialState(format!("invalid fixture timestamp {}", timestamp)))
}

fn need_id(n: u128) -> NeedId {
    NeedId::from_u128(0x5EA81D0A_9788_4B8A_82D9_1A0D636B5300 + n)
}

fn time_slot_id(n: u128) -> TimeSlotId {
    TimeSlotId::from_u128(0x5C903E93_2524_4876_B4C8_816B98D0C700 + n)
}

fn collection_point_id(n: u128) -> CollectionPointId {
    CollectionPointId::from_u128(0xDE3168FD_2730_47A2_BFE0_E53C79DD5700 + n)
}

fn update_id(n: u128) -> CampaignUpdateId {
    CampaignUpdateId::from_u128(0x7A1C0B22_41F0_4E55_9C3A_0B5D1E6F2200 + n)
}

fn material(n: u128, label: &str, unit: &str, required: u32, fulfilled: u32) -> Need {
    Need {
        id: need_id(n),
        need_type: NeedType::Material,
        label: label.to_string(),
        unit: unit.to_string(),
        quantity_required: required,
        quantity_fulfilled: fulfilled,
        time_slots: vec![],
    }
}

fn volunteer(
    n: u128,
    label: &str,
    required: u32,
    fulfilled: u32,
    time_slots: Vec<TimeSlot>,
) -> Need {
    Need {
        id: need_id(n),
        need_type: NeedType::Volunteer,
        label: label.to_string(),
        unit: "personnes".to_string(),
        quantity_required: required,
        quantity_fulfilled: fulfilled,
        time_slots,
    }
}

fn slot(n: u128, date: &str, start: &str, end: &str, needed: u32, assigned: u32) -> TimeSlot {
    TimeSlot {
        id: time_slot_id(n),
        date: date.to_string(),
        start_time: start.to_string(),
        end_time: end.to_string(),
        volunteers_needed: needed,
        volunteers_assigned: assigned,
    }
}

fn collection_points() -> Vec<CollectionPoint> {
    vec![
        CollectionPoint {
            id: collection_point_id(1),
            name: "Mosquée Hassan II".to_string(),
            address: "Boulevard de la Corniche, Casablanca".to_string(),
            coordinates: Coordinates {
                latitude: 33.6065,
                longitude: -7.6325,
            },
            point_type: CollectionPointType::Collection,
            hours: "08:00 - 20:00".to_string(),
            phone: Some("+212 5 22 22 22 22".to_string()),
        },
        CollectionPoint {
            id: collection_point_id(2),
            name: "Centre Communautaire Al Fath".to_string(),
            address: "Rue Mohammed V, Rabat".to_string(),
            coordinates: Coordinates {
                latitude: 34.0209,
                longitude: -6.8416,
            },
            point_type: CollectionPointType::Distribution,
            hours: "09:00 - 18:00".to_string(),
            phone: Some("+212 5 37 37 37 37".to_string()),
        },
        CollectionPoint {
            id: collection_point_id(3),
            name: "Association Entraide".to_string(),
            address: "Avenue Hassan II, Marrakech".to_string(),
            coordinates: Coordinates {
                latitude: 31.6295,
                longitude: -7.9811,
            },
            point_type: CollectionPointType::Collection,
            hours: "10:00 - 19:00".to_string(),
            phone: None,
        },
        CollectionPoint {
            id: collection_point_id(4),
            name: "Dar Al Ihssan".to_string(),
            address: "Quartier Hay Mohammadi, Casablanca".to_string(),
            coordinates: Coordinates {
                latitude: 33.5731,
                longitude: -7.5898,
            },
            point_type: CollectionPointType::Distribution,
            hours: "07:00 - 21:00".to_string(),
            phone: Some("+212 5 22 33 44 55".to_string()),
        },
    ]
}

fn users() -> Result<Vec<User>, Error> {
    Ok(vec![
        User {
            id: AHMED_ID,
            name: "Ahmed Bennani".to_string(),
            email: "ahmed.bennani@email.com".to_string(),
            phone: Some("+212 6 12 34 56 78".to_string()),
            avatar: None,
            is_creator: true,
            created_at: at("2024-01-15T00:00:00Z")?,
        },
        User {
            id: FATIMA_ID,
            name: "Fatima Zahra".to_string(),
            email: "fatima.zahra@email.com".to_string(),
            phone: Some("+212 6 98 76 54 32".to_string()),
            avatar: None,
            is_creator: false,
            created_at: at("2024-02-20T00:00:00Z")?,
        },
    ])
}

fn update(
    n: u128,
    campaign_id: CampaignId,
    title: &str,
    content: &str,
    created_at: &str,
) -> Result<CampaignUpdate, Error> {
    Ok(CampaignUpdate {
        id: update_id(n),
        campaign_id,
        title: title.to_string(),
        content: content.to_string(),
        image_uri: None,
        created_at: at(created_at)?,
    })
}

pub fn fixtures() -> Result<Fixtures, Error> {
    let points = collection_points();

    let campaigns = vec![
        Campaign {
            id: IFTAR_ID,
            title: "Iftar Solidaire 2024".to_string(),
            description: "Distribution de repas aux personnes dans le besoin pendant le mois sacré du Ramadan.".to_string(),
            objective: "Nourrir 500 personnes chaque jour du Ramadan dans les quartiers défavorisés de Casablanca.".to_string(),
            category: Category::Ramadan,
            start_date: at("2024-03-11T00:00:00Z")?,
            end_date: at("2024-04-10T00:00:00Z")?,
            status: CampaignStatus::Active,
            creator_id: AHMED_ID,
            creator_name: "Ahmed Bennani".to_string(),
            image_uri: None,
            needs: vec![
                material(1, "Repas complets", "repas", 500, 320),
                material(2, "Bouteilles d'eau", "bouteilles", 1000, 750),
                volunteer(
                    3,
                    "Bénévoles distribution",
                    50,
                    35,
                    vec![
                        slot(1, "2024-03-15", "18:00", "21:00", 20, 15),
                        slot(2, "2024-03-16", "18:00", "21:00", 30, 20),
                    ],
                ),
            ],
            collection_points: vec![points[0].clone(), points[3].clone()],
            updates: vec![
                update(
                    1,
                    IFTAR_ID,
                    "Merci pour votre générosité !",
                    "Grâce à vous, nous avons déjà collecté plus de 300 repas. Continuons ensemble !",
                    "2024-03-10T00:00:00Z",
                )?,
                update(
                    2,
                    IFTAR_ID,
                    "Nouveau point de collecte",
                    "Un nouveau point de collecte a été ajouté à Hay Mohammadi pour faciliter vos dons.",
                    "2024-03-08T00:00:00Z",
                )?,
            ],
            total_engagements: 45,
            created_at: at("2024-02-15T00:00:00Z")?,
        },
        Campaign {
            id: WINTER_ID,
            title: "Hiver au Chaud".to_string(),
            description: "Collecte de vêtements et couvertures pour les sans-abris.".to_string(),
            objective: "Distribuer 500 couvertures et 1000 vêtements chauds aux personnes vulnérables.".to_string(),
            category: Category::Winter,
            start_date: at("2024-01-01T00:00:00Z")?,
            end_date: at("2024-03-31T00:00:00Z")?,
            status: CampaignStatus::Active,
            creator_id: AHMED_ID,
            creator_name: "Ahmed Bennani".to_string(),
            image_uri: None,
            needs: vec![
                material(4, "Couvertures", "couvertures", 200, 85),
                material(5, "Vêtements chauds", "pièces", 300, 180),
                volunteer(
                    6,
                    "Accompagnateurs",
                    30,
                    12,
                    vec![slot(3, "2024-03-20", "09:00", "12:00", 15, 8)],
                ),
            ],
            collection_points: vec![points[1].clone(), points[2].clone()],
            updates: vec![update(
                3,
                WINTER_ID,
                "Distribution réussie",
                "150 familles ont été aidées ce week-end. Votre soutien fait la différence !",
                "2024-03-05T00:00:00Z",
            )?],
            total_engagements: 28,
            created_at: at("2023-12-20T00:00:00Z")?,
        },
        Campaign {
            id: EID_ID,
            title: "Aïd El Fitr - Joie Partagée".to_string(),
            description: "Distribution de cadeaux et vêtements neufs aux enfants défavorisés pour l'Aïd.".to_string(),
            objective: "Offrir un Aïd joyeux à 200 enfants avec des vêtements neufs et des jouets.".to_string(),
            category: Category::Eid,
            start_date: at("2024-04-05T00:00:00Z")?,
            end_date: at("2024-04-12T00:00:00Z")?,
            status: CampaignStatus::Upcoming,
            creator_id: FATIMA_ID,
            creator_name: "Fatima Zahra".to_string(),
            image_uri: None,
            needs: vec![
                material(7, "Vêtements enfants", "ensembles", 200, 45),
                material(8, "Jouets", "jouets", 200, 60),
            ],
            collection_points: vec![points[0].clone()],
            updates: vec![],
            total_engagements: 12,
            created_at: at("2024-03-01T00:00:00Z")?,
        },
        Campaign {
            id: CLEANUP_ID,
            title: "Nettoyage Quartier Al Fida".to_string(),
            description: "Journée de nettoyage et d'embellissement du quartier Al Fida.".to_string(),
            objective: "Mobiliser 100 bénévoles pour nettoyer et embellir notre quartier.".to_string(),
            category: Category::Neighborhood,
            start_date: at("2024-03-25T00:00:00Z")?,
            end_date: at("2024-03-25T00:00:00Z")?,
            status: CampaignStatus::Upcoming,
            creator_id: AHMED_ID,
            creator_name: "Ahmed Bennani".to_string(),
            image_uri: None,
            needs: vec![
                volunteer(
                    9,
                    "Bénévoles nettoyage",
                    100,
                    42,
                    vec![slot(4, "2024-03-25", "08:00", "14:00", 100, 42)],
                ),
                material(10, "Sacs poubelle", "sacs", 500, 200),
            ],
            collection_points: vec![points[3].clone()],
            updates: vec![],
            total_engagements: 42,
            created_at: at("2024-03-10T00:00:00Z")?,
        },
    ];

    let engagements = vec![Engagement {
        id: EngagementId::from_u128(0xA0B1C2D3_E4F5_4A6B_8C7D_8E9F00112201),
        campaign_id: IFTAR_ID,
        user_id: FATIMA_ID,
        need_id: MEALS_NEED_ID,
        engagement_type: EngagementType::Donation,
        quantity: 20,
        time_slot_id: None,
        status: EngagementStatus::Confirmed,
        reminder_set: true,
        reminder_time: Some(at("2024-03-15T16:00:00Z")?),
        created_at: at("2024-03-05T00:00:00Z")?,
    }];

    Ok(Fixtures {
        campaigns,
        collection_points: points,
        users: users()?,
        engagements,
    })
}

/// Replaces everything in the database with the demo fixtures.
pub async fn seed(db: &MongoDataSource) -> Result<(), Error> {
    db.drop().await?;
    db.create_indexes().await?;
    db.insert_fixtures(fixtures()?).await?;

    info!("seeded database with demo fixtures");

    Ok(())
}
