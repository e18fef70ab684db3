use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const FALLBACK_TIP_ID: &str = "fallback";
pub const DEFAULT_TIP_SOURCE: &str = "Healthcare Plus Medical Team";

fn default_active() -> bool {
    true
}

/// Stored health tip. The text is persisted under `tip`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthTip {
    pub id: String,
    #[serde(rename = "tip")]
    pub content: String,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub views: u64,
    #[serde(default)]
    pub last_displayed: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewHealthTip {
    #[serde(rename = "tip")]
    pub content: String,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthTipPatch {
    #[serde(rename = "tip", default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

/// What the public endpoint hands out.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TipOfTheDay {
    pub id: String,
    pub content: String,
    pub category: String,
    pub source: String,
    pub tags: Vec<String>,
}

impl From<&HealthTip> for TipOfTheDay {
    fn from(tip: &HealthTip) -> Self {
        TipOfTheDay {
            id: tip.id.clone(),
            content: tip.content.clone(),
            category: tip.category.clone(),
            source: tip
                .source
                .clone()
                .unwrap_or_else(|| DEFAULT_TIP_SOURCE.to_string()),
            tags: tip.tags.clone(),
        }
    }
}

impl TipOfTheDay {
    pub fn fallback() -> Self {
        TipOfTheDay {
            id: FALLBACK_TIP_ID.to_string(),
            content: "Stay healthy and drink plenty of water!".to_string(),
            category: "general".to_string(),
            source: "Healthcare Plus".to_string(),
            tags: Vec::new(),
        }
    }
}

/// Tips written into an empty collection at startup.
pub fn default_tips() -> Vec<NewHealthTip> {
    let tip = |content: &str, category: &str, tags: &[&str]| NewHealthTip {
        content: content.to_string(),
        category: category.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        source: Some(DEFAULT_TIP_SOURCE.to_string()),
    };
    vec![
        tip(
            "An apple a day keeps the doctor away - they're packed with fiber and antioxidants!",
            "nutrition",
            &["fruits", "antioxidants", "fiber"],
        ),
        tip(
            "Bananas are rich in potassium, vital for heart health and muscle function.",
            "nutrition",
            &["potassium", "heart health", "muscles"],
        ),
        tip(
            "Drinking 8 glasses of water daily helps maintain proper body function.",
            "general",
            &["hydration", "water", "wellness"],
        ),
        tip(
            "Regular exercise for 30 minutes a day can reduce the risk of chronic diseases.",
            "exercise",
            &["exercise", "prevention", "fitness"],
        ),
        tip(
            "Getting 7-9 hours of sleep each night is essential for physical and mental health.",
            "mental-health",
            &["sleep", "mental health", "rest"],
        ),
    ]
}
