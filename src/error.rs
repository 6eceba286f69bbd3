use std::fmt::{Debug, Display};
use std::io::Error as IoError;

use actix_web::error::{JsonPayloadError, PathError, QueryPayloadError};
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use derivative::Derivative;
use mongodb::bson::ser::Error as BsonError;
use mongodb::error::Error as DatabaseError;
use serde::{Serialize, Serializer};
use serde_json::Error as JsonError;

use crate::campaign::{CampaignId, NeedId, TimeSlotId};
use crate::notification::NotificationId;

#[derive(Debug, Serialize, Derivative)]
#[derivative(PartialEq)]
#[serde(untagged)]
pub enum Error {
    // 400
    #[serde(serialize_with = "display")]
    InvalidJson(#[derivative(PartialEq = "ignore")] JsonPayloadError),
    #[serde(serialize_with = "display")]
    InvalidPath(#[derivative(PartialEq = "ignore")] PathError),
    #[serde(serialize_with = "display")]
    InvalidQuery(#[derivative(PartialEq = "ignore")] QueryPayloadError),

    // 404
    PathDoesNotExist,
    CampaignDoesNotExist {
        campaign_id: CampaignId,
    },
    NeedDoesNotExist {
        campaign_id: CampaignId,
        need_id: NeedId,
    },
    TimeSlotDoesNotExist {
        need_id: NeedId,
        time_slot_id: TimeSlotId,
    },
    NotificationDoesNotExist {
        notification_id: NotificationId,
    },

    // 409
    InvalidEngagementQuantity {
        quantity: u32,
    },
    EngagementExceedsRemaining {
        need_id: NeedId,
        requested: u32,
        remaining: u32,
    },

    // 503
    DataSourceUnavailable,

    // 500
    InvalidConfiguration {
        key: String,
        value: String,
    },
    ExistentialState(String),
    #[serde(serialize_with = "display")]
    FailedDatabaseCall(#[derivative(PartialEq = "ignore")] DatabaseError),
    #[serde(serialize_with = "display")]
    FailedToSerializeToBson(#[derivative(PartialEq = "ignore")] BsonError),
    #[serde(serialize_with = "display")]
    FailedToSerializeToJson(#[derivative(PartialEq = "ignore")] JsonError),
    #[serde(serialize_with = "display")]
    IoError(#[derivative(PartialEq = "ignore")] IoError),
}

impl Error {
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::InvalidJson(_) => "E4001000",
            Error::InvalidPath(_) => "E4001001",
            Error::InvalidQuery(_) => "E4001003",
            Error::PathDoesNotExist => "E4041000",
            Error::CampaignDoesNotExist { .. } => "E4041001",
            Error::NeedDoesNotExist { .. } => "E4041002",
            Error::TimeSlotDoesNotExist { .. } => "E4041003",
            Error::NotificationDoesNotExist { .. } => "E4041004",
            Error::InvalidEngagementQuantity { .. } => "E4091000",
            Error::EngagementExceedsRemaining { .. } => "E4091001",
            Error::DataSourceUnavailable => "E5031000",
            Error::InvalidConfiguration { .. } => "E5001000",
            Error::ExistentialState(_) => "E5001001",
            Error::FailedDatabaseCall(_) => "E5001002",
            Error::FailedToSerializeToBson(_) => "E5001003",
            Error::FailedToSerializeToJson(_) => "E5001004",
            Error::IoError(_) => "E5001005",
        }
    }

    pub fn error_message(&self) -> &'static str {
        match self {
            Error::InvalidJson(_) => "The given json could not be parsed",
            Error::InvalidPath(_) => "The given path could not be parsed",
            Error::InvalidQuery(_) => "The given query could not be parsed",
            Error::PathDoesNotExist => "The requested path does not exist",
            Error::CampaignDoesNotExist { .. } => "The requested campaign does not exist",
            Error::NeedDoesNotExist { .. } => {
                "The requested need does not exist in the campaign"
            }
            Error::TimeSlotDoesNotExist { .. } => {
                "The requested time slot does not exist in the need"
            }
            Error::NotificationDoesNotExist { .. } => {
                "The requested notification does not exist"
            }
            Error::InvalidEngagementQuantity { .. } => {
                "The engagement quantity must be greater than zero"
            }
            Error::EngagementExceedsRemaining { .. } => {
                "The engagement quantity exceeds what the need still requires"
            }
            Error::DataSourceUnavailable => "The data source is currently unavailable",
            Error::InvalidConfiguration { .. } => "The server configuration is invalid",
            Error::ExistentialState(_) => "The server detected an invalid state",
            Error::FailedDatabaseCall(_) => {
                "An error occurred when communicating with the database"
            }
            Error::FailedToSerializeToBson(_) => {
                "An error occurred when serializing an object to bson"
            }
            Error::FailedToSerializeToJson(_) => {
                "An error occurred when converting an object to or from json"
            }
            Error::IoError(_) => "An error occurred during an I/O operation",
        }
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidJson(_) => StatusCode::BAD_REQUEST,
            Error::InvalidPath(_) => StatusCode::BAD_REQUEST,
            Error::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            Error::PathDoesNotExist => StatusCode::NOT_FOUND,
            Error::CampaignDoesNotExist { .. } => StatusCode::NOT_FOUND,
            Error::NeedDoesNotExist { .. } => StatusCode::NOT_FOUND,
            Error::TimeSlotDoesNotExist { .. } => StatusCode::NOT_FOUND,
            Error::NotificationDoesNotExist { .. } => StatusCode::NOT_FOUND,
            Error::InvalidEngagementQuantity { .. } => StatusCode::CONFLICT,
            Error::EngagementExceedsRemaining { .. } => StatusCode::CONFLICT,
            Error::DataSourceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Error::InvalidConfiguration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::ExistentialState(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::FailedDatabaseCall(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::FailedToSerializeToBson(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::FailedToSerializeToJson(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::IoError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        #[derive(Serialize)]
        struct Dummy<'a> {
            error_code: &'static str,
            error_message: &'static str,
            error_meta: &'a Error,
        }

        HttpResponse::build(self.status_code()).json(&Dummy {
            error_code: self.error_code(),
            error_message: self.error_message(),
            error_meta: self,
        })
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        Debug::fmt(self, f)
    }
}

impl From<DatabaseError> for Error {
    fn from(error: DatabaseError) -> Error {
        Error::FailedDatabaseCall(error)
    }
}

impl From<BsonError> for Error {
    fn from(error: BsonError) -> Error {
        Error::FailedToSerializeToBson(error)
    }
}

impl From<JsonError> for Error {
    fn from(error: JsonError) -> Error {
        Error::FailedToSerializeToJson(error)
    }
}

impl From<IoError> for Error {
    fn from(error: IoError) -> Error {
        Error::IoError(error)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::InvalidJson(err) => Some(err),
            Error::InvalidPath(err) => Some(err),
            Error::InvalidQuery(err) => Some(err),
            Error::FailedDatabaseCall(err) => Some(err),
            Error::FailedToSerializeToBson(err) => Some(err),
            Error::FailedToSerializeToJson(err) => Some(err),
            Error::IoError(err) => Some(err),
            _ => None,
        }
    }
}

fn display<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    T: Display,
    S: Serializer,
{
    serializer.collect_str(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_errors_map_to_404() {
        let error = Error::CampaignDoesNotExist {
            campaign_id: CampaignId::new(),
        };

        assert_eq!(error.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(error.error_code(), "E4041001");
    }

    #[test]
    fn capacity_errors_map_to_409() {
        let error = Error::EngagementExceedsRemaining {
            need_id: NeedId::new(),
            requested: 30,
            remaining: 25,
        };

        assert_eq!(error.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn wrapped_errors_compare_by_variant() {
        let a = Error::IoError(IoError::new(std::io::ErrorKind::Other, "a"));
        let b = Error::IoError(IoError::new(std::io::ErrorKind::NotFound, "b"));

        assert_eq!(a, b);
        assert_ne!(a, Error::DataSourceUnavailable);
    }
}
