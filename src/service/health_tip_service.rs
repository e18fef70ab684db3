use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rand::seq::SliceRandom;
use tracing::{error, info, instrument, warn};

use crate::model::health_tip::{default_tips, HealthTip, HealthTipPatch, NewHealthTip, TipOfTheDay};
use crate::model::principal::Principal;
use crate::repository::health_tip_repo::HealthTipRepository;
use crate::util::error::ServiceError;

#[async_trait]
pub trait HealthTipService: Send + Sync {
    /// A uniformly random active tip, or the built-in fallback when none is active.
    async fn random_tip(&self) -> Result<TipOfTheDay, ServiceError>;
    async fn list(&self, principal: &Principal) -> Result<Vec<HealthTip>, ServiceError>;
    async fn create(&self, principal: &Principal, tip: NewHealthTip) -> Result<HealthTip, ServiceError>;
    async fn update(&self, principal: &Principal, id: &str, patch: HealthTipPatch) -> Result<HealthTip, ServiceError>;
    async fn delete(&self, principal: &Principal, id: &str) -> Result<(), ServiceError>;
    /// Write the default tips when the collection is empty. Returns how many were written.
    async fn seed_defaults(&self) -> Result<usize, ServiceError>;
}

pub struct HealthTipServiceImpl {
    pub repo: Arc<dyn HealthTipRepository>,
}

impl HealthTipServiceImpl {
    pub fn new(repo: Arc<dyn HealthTipRepository>) -> Self {
        Self { repo }
    }
}

fn not_found() -> ServiceError {
    ServiceError::NotFound("Health tip not found".to_string())
}

#[async_trait]
impl HealthTipService for HealthTipServiceImpl {
    async fn random_tip(&self) -> Result<TipOfTheDay, ServiceError> {
        let active: Vec<HealthTip> = self.repo.list().await?.into_iter().filter(|tip| tip.is_active).collect();
        let picked = active.choose(&mut rand::thread_rng()).cloned();
        let Some(tip) = picked else {
            warn!("No active health tips, serving fallback");
            return Ok(TipOfTheDay::fallback());
        };
        // view counting is best effort
        if let Err(e) = self.repo.record_view(&tip, Utc::now()).await {
            error!(tip_id = %tip.id, "Failed to record tip view: {}", e);
        }
        Ok(TipOfTheDay::from(&tip))
    }

    async fn list(&self, principal: &Principal) -> Result<Vec<HealthTip>, ServiceError> {
        principal.require_admin()?;
        let mut tips = self.repo.list().await?;
        tips.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tips)
    }

    #[instrument(skip(self, principal, tip), fields(category = %tip.category))]
    async fn create(&self, principal: &Principal, tip: NewHealthTip) -> Result<HealthTip, ServiceError> {
        principal.require_admin()?;
        if tip.content.trim().is_empty() || tip.category.trim().is_empty() {
            return Err(ServiceError::Validation("Tip text and category are required".to_string()));
        }
        let created = self.repo.create(tip).await?;
        info!(tip_id = %created.id, "Health tip created");
        Ok(created)
    }

    #[instrument(skip(self, principal, patch))]
    async fn update(&self, principal: &Principal, id: &str, patch: HealthTipPatch) -> Result<HealthTip, ServiceError> {
        principal.require_admin()?;
        if patch.content.as_deref().is_some_and(|c| c.trim().is_empty()) {
            return Err(ServiceError::Validation("Tip text cannot be empty".to_string()));
        }
        self.repo.update(id, patch).await?.ok_or_else(not_found)
    }

    #[instrument(skip(self, principal))]
    async fn delete(&self, principal: &Principal, id: &str) -> Result<(), ServiceError> {
        principal.require_admin()?;
        if !self.repo.remove(id).await? {
            return Err(not_found());
        }
        info!("Health tip deleted");
        Ok(())
    }

    async fn seed_defaults(&self) -> Result<usize, ServiceError> {
        if self.repo.count().await? > 0 {
            return Ok(0);
        }
        let mut seeded = 0;
        for tip in default_tips() {
            self.repo.create(tip).await?;
            seeded += 1;
        }
        info!(seeded, "Default health tips seeded");
        Ok(seeded)
    }
}
