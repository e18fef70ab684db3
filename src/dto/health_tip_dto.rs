use serde::Deserialize;
use validator::Validate;

use crate::model::health_tip::{HealthTipPatch, NewHealthTip};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateHealthTipRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 1000, message = "Tip text is required"))]
    pub tip: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 50, message = "Category is required"))]
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub source: Option<String>,
}

impl From<CreateHealthTipRequest> for NewHealthTip {
    fn from(req: CreateHealthTipRequest) -> Self {
        NewHealthTip { content: req.tip, category: req.category, tags: req.tags, source: req.source }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateHealthTipRequest {
    #[validate(length(min = 1, max = 1000))]
    pub tip: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub source: Option<String>,
    pub is_active: Option<bool>,
}

impl From<UpdateHealthTipRequest> for HealthTipPatch {
    fn from(req: UpdateHealthTipRequest) -> Self {
        HealthTipPatch {
            content: req.tip,
            category: req.category,
            tags: req.tags,
            source: req.source,
            is_active: req.is_active,
        }
    }
}
