use actix_web::get;
use actix_web::web::{Data, Json};

use crate::error::Error;
use crate::store::CampaignStore;

use super::CollectionPoint;

#[get("/collection-points")]
#[tracing::instrument(skip(store))]
pub async fn get_collection_points(
    store: Data<CampaignStore>,
) -> Result<Json<Vec<CollectionPoint>>, Error> {
    let points = store.try_fetch_collection_points().await?;

    Ok(Json(points))
}
