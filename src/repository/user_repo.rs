use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{error, info, instrument};

use crate::model::user::{NewUser, Role, User, UserUpdate};
use crate::repository::file_store::{decode_records, from_record, to_record, FileStore};
use crate::repository::repository_error::RepositoryResult;

pub const USERS_COLLECTION: &str = "users";

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn insert(&self, user: NewUser) -> RepositoryResult<User>;
    async fn update(&self, id: &str, changes: UserUpdate) -> RepositoryResult<Option<User>>;
    /// Exact, case-sensitive match on the stored email.
    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>>;
    async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<User>>;
    async fn remove(&self, id: &str) -> RepositoryResult<bool>;
    async fn list(&self) -> RepositoryResult<Vec<User>>;
    async fn count_active_admins(&self) -> RepositoryResult<usize>;
}

pub struct UserRepositoryImpl {
    store: Arc<FileStore>,
}

impl UserRepositoryImpl {
    pub fn new(store: Arc<FileStore>) -> Self {
        UserRepositoryImpl { store }
    }
}

#[async_trait]
impl UserRepository for UserRepositoryImpl {
    #[instrument(skip(self, user), fields(email = %user.email))]
    async fn insert(&self, user: NewUser) -> RepositoryResult<User> {
        let record = self.store.create(USERS_COLLECTION, to_record(&user)?).await;
        match record {
            Ok(record) => {
                let user: User = from_record(record)?;
                info!(user_id = %user.id, "User stored");
                Ok(user)
            }
            Err(e) => {
                error!("Failed to insert user: {}", e);
                Err(e)
            }
        }
    }

    #[instrument(skip(self, changes))]
    async fn update(&self, id: &str, changes: UserUpdate) -> RepositoryResult<Option<User>> {
        let updated = self.store.update(USERS_COLLECTION, id, to_record(&changes)?).await?;
        updated.map(from_record).transpose()
    }

    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        let value = Value::String(email.to_string());
        self.store
            .get_by_field(USERS_COLLECTION, "email", &value)
            .await
            .map(from_record)
            .transpose()
    }

    async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<User>> {
        self.store.get_by_id(USERS_COLLECTION, id).await.map(from_record).transpose()
    }

    #[instrument(skip(self))]
    async fn remove(&self, id: &str) -> RepositoryResult<bool> {
        self.store.remove(USERS_COLLECTION, id).await
    }

    async fn list(&self) -> RepositoryResult<Vec<User>> {
        let records = self.store.list_all(USERS_COLLECTION).await;
        Ok(decode_records(USERS_COLLECTION, records))
    }

    async fn count_active_admins(&self) -> RepositoryResult<usize> {
        Ok(self
            .list()
            .await?
            .iter()
            .filter(|user| user.role == Role::Admin && user.is_active)
            .count())
    }
}
