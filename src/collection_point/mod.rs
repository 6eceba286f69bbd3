use serde::{Deserialize, Serialize};

use crate::typedid::{TypedId, TypedIdMarker};

pub mod db;
pub mod endpoints;

pub type CollectionPointId = TypedId<CollectionPoint>;

/// A physical site where donations are dropped off or handed out. Reference
/// data: never modified once created.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct CollectionPoint {
    pub id: CollectionPointId,
    pub name: String,
    pub address: String,
    pub coordinates: Coordinates,
    #[serde(rename = "type")]
    pub point_type: CollectionPointType,
    // ex. "Après chaque prière"
    pub hours: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl TypedIdMarker for CollectionPoint {
    fn tag() -> &'static str {
        "CPT"
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionPointType {
    Collection,
    Distribution,
}
