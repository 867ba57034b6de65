//! System settings: a key/JSON store partitioned by category.
//!
//! Each category has its own typed payload. Values are decoded and validated
//! when they cross the store boundary, not at every call site.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;
use validator::Validate;

use super::reward::RewardConfig;

/// Key of the single row holding the reward configuration.
pub const REWARD_CONFIG_KEY: &str = "reward_config";

/// Key of the row holding the FAQ list.
pub const FAQ_KEY: &str = "faqs";

/// Settings category discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SettingCategory {
    Rewards,
    Cms,
    Faq,
    Legal,
    #[default]
    General,
}

impl SettingCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingCategory::Rewards => "rewards",
            SettingCategory::Cms => "cms",
            SettingCategory::Faq => "faq",
            SettingCategory::Legal => "legal",
            SettingCategory::General => "general",
        }
    }
}

impl FromStr for SettingCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rewards" => Ok(SettingCategory::Rewards),
            "cms" => Ok(SettingCategory::Cms),
            "faq" => Ok(SettingCategory::Faq),
            "legal" => Ok(SettingCategory::Legal),
            "general" => Ok(SettingCategory::General),
            _ => Err(format!("Unknown setting category: {}", s)),
        }
    }
}

impl std::fmt::Display for SettingCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row of the `system_settings` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemSetting {
    pub key: String,
    pub value: serde_json::Value,
    #[serde(default)]
    pub category: SettingCategory,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A content page managed through the CMS screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct PageContent {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub sections: Vec<PageSection>,
    #[serde(default)]
    pub published: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSection {
    pub heading: String,
    #[serde(default)]
    pub body: String,
}

/// A single FAQ entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct FaqEntry {
    #[validate(length(min = 1, message = "Question must not be empty"))]
    pub question: String,
    #[validate(length(min = 1, message = "Answer must not be empty"))]
    pub answer: String,
    #[serde(default)]
    pub order: i32,
}

/// Which legal document a row holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LegalKind {
    Terms,
    Privacy,
    Cookies,
}

impl LegalKind {
    pub fn setting_key(&self) -> &'static str {
        match self {
            LegalKind::Terms => "legal_terms",
            LegalKind::Privacy => "legal_privacy",
            LegalKind::Cookies => "legal_cookies",
        }
    }
}

impl FromStr for LegalKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "terms" => Ok(LegalKind::Terms),
            "privacy" => Ok(LegalKind::Privacy),
            "cookies" => Ok(LegalKind::Cookies),
            _ => Err(format!("Unknown legal document: {}", s)),
        }
    }
}

/// A versioned legal document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct LegalDocument {
    #[validate(length(min = 1, message = "Title must not be empty"))]
    pub title: String,
    #[validate(length(min = 1, message = "Content must not be empty"))]
    pub content: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub effective_date: Option<NaiveDate>,
}

fn default_version() -> String {
    "1.0".to_string()
}

/// Error raised when a stored value does not match its category's schema.
#[derive(Debug, Error)]
pub enum SettingDecodeError {
    #[error("Setting value has the wrong shape: {0}")]
    Shape(#[from] serde_json::Error),

    #[error("Setting value is invalid: {0}")]
    Invalid(#[from] validator::ValidationErrors),
}

/// Typed view of a settings value, tagged by category.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingPayload {
    Rewards(RewardConfig),
    Cms(PageContent),
    Faq(Vec<FaqEntry>),
    Legal(LegalDocument),
    General(serde_json::Value),
}

impl SettingPayload {
    pub fn category(&self) -> SettingCategory {
        match self {
            SettingPayload::Rewards(_) => SettingCategory::Rewards,
            SettingPayload::Cms(_) => SettingCategory::Cms,
            SettingPayload::Faq(_) => SettingCategory::Faq,
            SettingPayload::Legal(_) => SettingCategory::Legal,
            SettingPayload::General(_) => SettingCategory::General,
        }
    }

    /// Decodes and validates a stored value according to its category.
    pub fn decode(
        category: SettingCategory,
        value: serde_json::Value,
    ) -> Result<Self, SettingDecodeError> {
        let payload = match category {
            SettingCategory::Rewards => SettingPayload::Rewards(serde_json::from_value(value)?),
            SettingCategory::Cms => SettingPayload::Cms(serde_json::from_value(value)?),
            SettingCategory::Faq => SettingPayload::Faq(serde_json::from_value(value)?),
            SettingCategory::Legal => SettingPayload::Legal(serde_json::from_value(value)?),
            SettingCategory::General => SettingPayload::General(value),
        };
        payload.validate()?;
        Ok(payload)
    }

    /// Validates the payload against its schema.
    pub fn validate(&self) -> Result<(), validator::ValidationErrors> {
        match self {
            SettingPayload::Rewards(config) => config.validate(),
            SettingPayload::Cms(page) => page.validate(),
            SettingPayload::Faq(entries) => entries.iter().try_for_each(|e| e.validate()),
            SettingPayload::Legal(doc) => doc.validate(),
            SettingPayload::General(_) => Ok(()),
        }
    }

    /// JSON value to store.
    pub fn to_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            SettingPayload::Rewards(config) => serde_json::to_value(config),
            SettingPayload::Cms(page) => serde_json::to_value(page),
            SettingPayload::Faq(entries) => serde_json::to_value(entries),
            SettingPayload::Legal(doc) => serde_json::to_value(doc),
            SettingPayload::General(value) => Ok(value.clone()),
        }
    }
}

/// Settings key of a CMS page.
pub fn page_key(page: &str) -> String {
    format!("page_{}", page.trim().to_lowercase().replace(['-', ' '], "_"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_rewards_payload() {
        let payload = SettingPayload::decode(
            SettingCategory::Rewards,
            json!({ "points_per_minute": 2.0, "daily_point_cap": 300 }),
        )
        .unwrap();
        match payload {
            SettingPayload::Rewards(config) => {
                assert_eq!(config.points_per_minute, 2.0);
                assert_eq!(config.daily_point_cap, 300);
            }
            other => panic!("Expected rewards payload, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_rejects_wrong_shape() {
        let err = SettingPayload::decode(SettingCategory::Cms, json!(["not", "a", "page"]))
            .unwrap_err();
        assert!(matches!(err, SettingDecodeError::Shape(_)));
    }

    #[test]
    fn test_decode_rejects_invalid_values() {
        let err = SettingPayload::decode(
            SettingCategory::Faq,
            json!([{ "question": "", "answer": "Yes" }]),
        )
        .unwrap_err();
        assert!(matches!(err, SettingDecodeError::Invalid(_)));
    }

    #[test]
    fn test_general_accepts_anything() {
        let payload =
            SettingPayload::decode(SettingCategory::General, json!({ "anything": [1, 2] }))
                .unwrap();
        assert_eq!(payload.category(), SettingCategory::General);
        assert_eq!(payload.to_value().unwrap(), json!({ "anything": [1, 2] }));
    }

    #[test]
    fn test_legal_defaults_version() {
        let payload = SettingPayload::decode(
            SettingCategory::Legal,
            json!({ "title": "Terms", "content": "Be nice." }),
        )
        .unwrap();
        match payload {
            SettingPayload::Legal(doc) => assert_eq!(doc.version, "1.0"),
            other => panic!("Expected legal payload, got {:?}", other),
        }
    }

    #[test]
    fn test_page_key() {
        assert_eq!(page_key("About-Us"), "page_about_us");
        assert_eq!(page_key(" home "), "page_home");
        assert_eq!(LegalKind::Privacy.setting_key(), "legal_privacy");
    }
}
