use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Provider id recorded for email/password accounts.
pub const PASSWORD_PROVIDER_ID: &str = "password";

/// Popup-style federated identity providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FederatedProvider {
    Google,
    Facebook,
}

impl FederatedProvider {
    pub fn provider_id(&self) -> &'static str {
        match self {
            FederatedProvider::Google => "google.com",
            FederatedProvider::Facebook => "facebook.com",
        }
    }
}

/// Snapshot of the signed-in user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub provider_ids: Vec<String>,
}

impl AuthUser {
    pub fn is_provider_linked(&self, provider_id: &str) -> bool {
        self.provider_ids.iter().any(|id| id == provider_id)
    }
}

/// Profile document stored per user (document id = uid).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub uid: String,
    pub email: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Editable profile fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProfileForm {
    #[validate(length(min = 1))]
    pub address: String,
    /// `YYYY-MM-DD`
    #[validate(length(min = 1))]
    pub birth_date: String,
}

impl ProfileForm {
    pub fn new(address: impl Into<String>, birth_date: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            birth_date: birth_date.into(),
        }
    }
}
