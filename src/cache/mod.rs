//! Best-effort key/value persistence for the last known campaign list, the
//! engagement list, the notification log and the pending store events. The
//! cache never has authority: whatever the data source says wins.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Error;

mod file;
mod memory;

pub use file::FileCache;
pub use memory::MemoryCache;

pub const CAMPAIGNS_KEY: &str = "@waqt_lkhair_campaigns";
pub const ENGAGEMENTS_KEY: &str = "@waqt_lkhair_engagements";
pub const NOTIFICATIONS_KEY: &str = "@waqt_lkhair_notifications";
pub const OUTBOX_KEY: &str = "@waqt_lkhair_outbox";

#[async_trait]
pub trait LocalCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, Error>;
    async fn set(&self, key: &str, value: String) -> Result<(), Error>;
    async fn remove(&self, key: &str) -> Result<(), Error>;
}

/// Reads and decodes the JSON snapshot stored under `key`.
pub async fn load<T: DeserializeOwned>(
    cache: &dyn LocalCache,
    key: &str,
) -> Result<Option<T>, Error> {
    match cache.get(key).await? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Encodes `value` as JSON and stores it under `key`, replacing what was there.
pub async fn save<T: Serialize + Sync + ?Sized>(
    cache: &dyn LocalCache,
    key: &str,
    value: &T,
) -> Result<(), Error> {
    let raw = serde_json::to_string(value)?;
    cache.set(key, raw).await
}
