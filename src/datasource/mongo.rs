use mongodb::options::IndexOptions;
use mongodb::{bson, Client, Collection, Database, IndexModel};
use tracing::info;

use crate::campaign::db::{CampaignDataSource, MongoCampaignSource};
use crate::campaign::Campaign;
use crate::collection_point::db::{CollectionPointDataSource, MongoCollectionPointSource};
use crate::collection_point::CollectionPoint;
use crate::engagement::db::{EngagementDataSource, MongoEngagementSource};
use crate::engagement::Engagement;
use crate::error::Error;
use crate::seed::Fixtures;
use crate::user::db::{MongoUserSource, UserDataSource};
use crate::user::User;

use super::DataSource;

#[derive(Debug, Clone)]
pub struct MongoDataSource {
    campaigns: MongoCampaignSource,
    engagements: MongoEngagementSource,
    collection_points: MongoCollectionPointSource,
    users: MongoUserSource,
    db: Database,
}

impl MongoDataSource {
    pub async fn connect(uri: &str, database: &str) -> Result<MongoDataSource, Error> {
        info!("connecting to db: {}", uri);
        let db = Client::with_uri_str(uri).await?.database(database);

        // ping the database to ensure connection is established
        db.run_command(bson::doc! { "ping": 1 }, None).await?;

        MongoDataSource::initialize(db).await
    }

    pub async fn initialize(db: Database) -> Result<MongoDataSource, Error> {
        let campaigns: Collection<Campaign> = db.collection("campaigns");
        let source = MongoDataSource {
            campaigns: campaigns.clone(),
            engagements: MongoEngagementSource {
                engagements: db.collection::<Engagement>("engagements"),
                campaigns,
            },
            collection_points: db.collection::<CollectionPoint>("collection_points"),
            users: db.collection::<User>("users"),
            db,
        };

        source.create_indexes().await?;

        Ok(source)
    }

    pub async fn create_indexes(&self) -> Result<(), Error> {
        let index = IndexModel::builder()
            .keys(bson::doc! { "user_id": 1 })
            .options(IndexOptions::builder().name("user_id".to_string()).build())
            .build();
        self.engagements
            .engagements
            .create_index(index, None)
            .await?;

        Ok(())
    }

    pub async fn insert_fixtures(&self, fixtures: Fixtures) -> Result<(), Error> {
        if !fixtures.campaigns.is_empty() {
            self.campaigns.insert_many(fixtures.campaigns, None).await?;
        }
        if !fixtures.engagements.is_empty() {
            self.engagements
                .engagements
                .insert_many(fixtures.engagements, None)
                .await?;
        }
        if !fixtures.collection_points.is_empty() {
            self.collection_points
                .insert_many(fixtures.collection_points, None)
                .await?;
        }
        if !fixtures.users.is_empty() {
            self.users.insert_many(fixtures.users, None).await?;
        }

        Ok(())
    }

    pub async fn drop(&self) -> Result<(), Error> {
        self.db.drop(None).await?;
        Ok(())
    }
}

impl DataSource for MongoDataSource {
    fn campaigns(&self) -> &dyn CampaignDataSource {
        &self.campaigns
    }

    fn engagements(&self) -> &dyn EngagementDataSource {
        &self.engagements
    }

    fn collection_points(&self) -> &dyn CollectionPointDataSource {
        &self.collection_points
    }

    fn users(&self) -> &dyn UserDataSource {
        &self.users
    }
}
