use actix_web::post;
use actix_web::web::{Data, Json};
use serde::{Deserialize, Serialize};

use crate::datasource::DataSource;
use crate::error::Error;

use super::User;

#[derive(Clone, Deserialize, Serialize)]
pub struct LoginBody {
    pub email: String,
    pub password: String,
}

#[post("/login")]
#[tracing::instrument(skip(db, body))]
pub async fn login(db: Data<dyn DataSource>, body: Json<LoginBody>) -> Result<Json<User>, Error> {
    let body = body.into_inner();
    let user = db.users().login(&body.email, &body.password).await?;

    Ok(Json(user))
}

#[post("/login/quick")]
#[tracing::instrument(skip(db))]
pub async fn quick_login(db: Data<dyn DataSource>) -> Result<Json<User>, Error> {
    let user = db.users().quick_login().await?;

    Ok(Json(user))
}
