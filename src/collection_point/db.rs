use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson;
use mongodb::Collection;

use crate::error::Error;

use super::CollectionPoint;

#[async_trait]
pub trait CollectionPointDataSource: Send + Sync {
    async fn list_collection_points(&self) -> Result<Vec<CollectionPoint>, Error>;
}

pub type MongoCollectionPointSource = Collection<CollectionPoint>;

#[async_trait]
impl CollectionPointDataSource for MongoCollectionPointSource {
    #[tracing::instrument(skip(self))]
    async fn list_collection_points(&self) -> Result<Vec<CollectionPoint>, Error> {
        let points: Vec<CollectionPoint> =
            self.find(bson::doc! {}, None).await?.try_collect().await?;

        Ok(points)
    }
}
