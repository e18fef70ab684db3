use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{info, instrument};

use crate::model::health_tip::{HealthTip, HealthTipPatch, NewHealthTip};
use crate::repository::file_store::{decode_records, from_record, to_record, FileStore};
use crate::repository::repository_error::RepositoryResult;

pub const HEALTH_TIPS_COLLECTION: &str = "healthtips";

#[async_trait]
pub trait HealthTipRepository: Send + Sync {
    async fn create(&self, tip: NewHealthTip) -> RepositoryResult<HealthTip>;
    async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<HealthTip>>;
    async fn list(&self) -> RepositoryResult<Vec<HealthTip>>;
    /// Number of stored tips. Fails when the collection cannot be read.
    async fn count(&self) -> RepositoryResult<usize>;
    async fn update(&self, id: &str, patch: HealthTipPatch) -> RepositoryResult<Option<HealthTip>>;
    async fn record_view(&self, tip: &HealthTip, at: DateTime<Utc>) -> RepositoryResult<Option<HealthTip>>;
    async fn remove(&self, id: &str) -> RepositoryResult<bool>;
}

pub struct HealthTipRepositoryImpl {
    store: Arc<FileStore>,
}

impl HealthTipRepositoryImpl {
    pub fn new(store: Arc<FileStore>) -> Self {
        HealthTipRepositoryImpl { store }
    }
}

#[async_trait]
impl HealthTipRepository for HealthTipRepositoryImpl {
    #[instrument(skip(self, tip), fields(category = %tip.category))]
    async fn create(&self, tip: NewHealthTip) -> RepositoryResult<HealthTip> {
        let mut record = to_record(&tip)?;
        record.insert("isActive".to_string(), true.into());
        record.insert("views".to_string(), 0.into());
        record.insert("lastDisplayed".to_string(), serde_json::Value::Null);
        let tip: HealthTip = from_record(self.store.create(HEALTH_TIPS_COLLECTION, record).await?)?;
        info!(tip_id = %tip.id, "Health tip stored");
        Ok(tip)
    }

    async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<HealthTip>> {
        self.store.get_by_id(HEALTH_TIPS_COLLECTION, id).await.map(from_record).transpose()
    }

    async fn list(&self) -> RepositoryResult<Vec<HealthTip>> {
        let records = self.store.list_all(HEALTH_TIPS_COLLECTION).await;
        Ok(decode_records(HEALTH_TIPS_COLLECTION, records))
    }

    async fn count(&self) -> RepositoryResult<usize> {
        Ok(self.store.try_list_all(HEALTH_TIPS_COLLECTION).await?.len())
    }

    async fn update(&self, id: &str, patch: HealthTipPatch) -> RepositoryResult<Option<HealthTip>> {
        let updated = self.store.update(HEALTH_TIPS_COLLECTION, id, to_record(&patch)?).await?;
        updated.map(from_record).transpose()
    }

    async fn record_view(&self, tip: &HealthTip, at: DateTime<Utc>) -> RepositoryResult<Option<HealthTip>> {
        let changes = to_record(&serde_json::json!({
            "views": tip.views + 1,
            "lastDisplayed": at,
        }))?;
        let updated = self.store.update(HEALTH_TIPS_COLLECTION, &tip.id, changes).await?;
        updated.map(from_record).transpose()
    }

    async fn remove(&self, id: &str) -> RepositoryResult<bool> {
        self.store.remove(HEALTH_TIPS_COLLECTION, id).await
    }
}
