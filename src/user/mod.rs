use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::typedid::{TypedId, TypedIdMarker};

pub mod db;
pub mod endpoints;

pub type UserId = TypedId<User>;

/// The signed-in person as handed over by the authentication collaborator.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub is_creator: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// A fresh non-creator account for an email that matched no known user.
    pub fn guest(email: &str) -> User {
        User {
            id: UserId::new(),
            name: "Utilisateur".to_string(),
            email: email.to_string(),
            phone: Some("+212 6 00 00 00 00".to_string()),
            avatar: None,
            is_creator: false,
            created_at: Utc::now(),
        }
    }
}

impl TypedIdMarker for User {
    fn tag() -> &'static str {
        "USR"
    }
}
