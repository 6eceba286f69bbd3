//! The data source gateway: the system of record behind the campaign store.
//! Each record kind has its own trait next to its type; `DataSource` groups
//! them so the store takes a single dependency.

use crate::campaign::db::CampaignDataSource;
use crate::collection_point::db::CollectionPointDataSource;
use crate::engagement::db::EngagementDataSource;
use crate::user::db::UserDataSource;

mod memory;
mod mongo;

pub use memory::MemoryDataSource;
pub use mongo::MongoDataSource;

pub trait DataSource: Send + Sync {
    fn campaigns(&self) -> &dyn CampaignDataSource;
    fn engagements(&self) -> &dyn EngagementDataSource;
    fn collection_points(&self) -> &dyn CollectionPointDataSource;
    fn users(&self) -> &dyn UserDataSource;
}
