use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson;
use mongodb::Collection;

use crate::error::Error;

use super::User;

/// Stand-in for the authentication collaborator. Credentials are not checked.
#[async_trait]
pub trait UserDataSource: Send + Sync {
    /// Returns the user registered under `email` (case-insensitive), or a
    /// guest account when there is none.
    async fn login(&self, email: &str, password: &str) -> Result<User, Error>;

    /// Returns the first creator account.
    async fn quick_login(&self) -> Result<User, Error>;
}

pub type MongoUserSource = Collection<User>;

#[async_trait]
impl UserDataSource for MongoUserSource {
    #[tracing::instrument(skip(self, _password))]
    async fn login(&self, email: &str, _password: &str) -> Result<User, Error> {
        let users: Vec<User> = self.find(bson::doc! {}, None).await?.try_collect().await?;

        let user = users
            .into_iter()
            .find(|user| user.email.eq_ignore_ascii_case(email))
            .unwrap_or_else(|| User::guest(email));

        Ok(user)
    }

    #[tracing::instrument(skip(self))]
    async fn quick_login(&self) -> Result<User, Error> {
        self.find_one(bson::doc! { "is_creator": true }, None)
            .await?
            .ok_or_else(|| Error::ExistentialState("no creator account is registered".to_string()))
    }
}
