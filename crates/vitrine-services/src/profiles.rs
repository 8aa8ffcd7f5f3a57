//! User profile documents, keyed by uid.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use vitrine_core::constants::USERS_COLLECTION;
use vitrine_core::models::{ProfileForm, UserProfile};
use vitrine_core::validation::{calculate_age, parse_birth_date, validate_form};
use vitrine_core::AppError;
use vitrine_db::{Document, DocumentStore};

use crate::errors::{metadata_write_failed, query_failed, update_failed};

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    birth_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    age: Option<u32>,
}

fn profile_from_document(document: Document) -> Result<UserProfile, AppError> {
    let body: ProfileBody = serde_json::from_value(document.data)?;
    Ok(UserProfile {
        uid: body.uid.unwrap_or(document.id),
        email: body.email.unwrap_or_default(),
        display_name: body.display_name.unwrap_or_default(),
        address: body.address,
        birth_date: body.birth_date,
        age: body.age,
        created_at: document.created_at,
        updated_at: document.updated_at,
    })
}

/// Validated address, birth date, and derived age.
fn form_fields(form: &ProfileForm) -> Result<ProfileBody, AppError> {
    validate_form(form, &["address", "birth_date"])?;
    let birth_date = parse_birth_date(&form.birth_date)?;
    Ok(ProfileBody {
        address: Some(form.address.trim().to_string()),
        birth_date: Some(birth_date),
        age: Some(calculate_age(birth_date, Utc::now().date_naive())),
        ..ProfileBody::default()
    })
}

#[derive(Clone)]
pub struct UserProfileService {
    documents: Arc<dyn DocumentStore>,
}

impl UserProfileService {
    pub fn new(documents: Arc<dyn DocumentStore>) -> Self {
        Self { documents }
    }

    /// Create the profile or merge into it, then read it back.
    ///
    /// `created_at` is set on the first write only.
    #[tracing::instrument(skip(self, uid, email, display_name, form), fields(uid = %uid))]
    pub async fn create_or_update(
        &self,
        uid: &str,
        email: &str,
        display_name: &str,
        form: Option<&ProfileForm>,
    ) -> Result<UserProfile, AppError> {
        if uid.is_empty() {
            return Err(AppError::Unauthenticated);
        }

        let mut body = match form {
            Some(form) => form_fields(form)?,
            None => ProfileBody::default(),
        };
        body.uid = Some(uid.to_string());
        body.email = Some(email.to_string());
        body.display_name = Some(display_name.to_string());

        self.documents
            .upsert(USERS_COLLECTION, uid, serde_json::to_value(&body)?)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to write profile");
                metadata_write_failed(e)
            })?;

        self.get_profile(uid)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{}/{}", USERS_COLLECTION, uid)))
    }

    pub async fn get_profile(&self, uid: &str) -> Result<Option<UserProfile>, AppError> {
        let document = self
            .documents
            .get(USERS_COLLECTION, uid)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, uid = %uid, "Failed to load profile");
                query_failed(e)
            })?;
        document.map(profile_from_document).transpose()
    }

    /// Merge address, birth date, and age into an existing profile.
    #[tracing::instrument(skip(self, uid, form), fields(uid = %uid))]
    pub async fn update_profile_data(
        &self,
        uid: &str,
        form: &ProfileForm,
    ) -> Result<UserProfile, AppError> {
        let body = form_fields(form)?;
        let document = self
            .documents
            .update(USERS_COLLECTION, uid, serde_json::to_value(&body)?)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to update profile");
                update_failed(e)
            })?;
        profile_from_document(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitrine_core::ValidationError;
    use vitrine_db::MemoryDocumentStore;

    fn service() -> UserProfileService {
        UserProfileService::new(Arc::new(MemoryDocumentStore::new()))
    }

    #[tokio::test]
    async fn test_create_without_form() {
        let service = service();
        let profile = service
            .create_or_update("u1", "a@example.com", "Ana", None)
            .await
            .unwrap();
        assert_eq!(profile.uid, "u1");
        assert_eq!(profile.display_name, "Ana");
        assert!(profile.address.is_none());
        assert!(profile.age.is_none());
    }

    #[tokio::test]
    async fn test_create_with_form_computes_age() {
        let service = service();
        let form = ProfileForm::new("1 Main St", "1990-05-17");
        let profile = service
            .create_or_update("u1", "a@example.com", "Ana", Some(&form))
            .await
            .unwrap();

        let birth = NaiveDate::from_ymd_opt(1990, 5, 17).unwrap();
        assert_eq!(profile.birth_date, Some(birth));
        assert_eq!(
            profile.age,
            Some(calculate_age(birth, Utc::now().date_naive()))
        );
    }

    #[tokio::test]
    async fn test_second_write_keeps_created_at() {
        let service = service();
        let first = service
            .create_or_update("u1", "a@example.com", "Ana", None)
            .await
            .unwrap();
        let second = service
            .create_or_update("u1", "a@example.com", "Ana B", None)
            .await
            .unwrap();
        assert_eq!(first.created_at, second.created_at);
        assert_eq!(second.display_name, "Ana B");
    }

    #[tokio::test]
    async fn test_update_profile_data() {
        let service = service();
        service
            .create_or_update("u1", "a@example.com", "Ana", None)
            .await
            .unwrap();

        let updated = service
            .update_profile_data("u1", &ProfileForm::new("2 High St", "2000-01-01"))
            .await
            .unwrap();
        assert_eq!(updated.address.as_deref(), Some("2 High St"));
        assert_eq!(updated.email, "a@example.com");
    }

    #[tokio::test]
    async fn test_invalid_birth_date_rejected() {
        let service = service();
        let err = service
            .update_profile_data("u1", &ProfileForm::new("2 High St", "01/01/2000"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Validation(ValidationError::InvalidDate { .. })
        ));
    }

    #[tokio::test]
    async fn test_update_missing_profile() {
        let service = service();
        let err = service
            .update_profile_data("ghost", &ProfileForm::new("2 High St", "2000-01-01"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
