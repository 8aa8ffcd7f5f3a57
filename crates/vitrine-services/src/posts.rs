//! Text posts owned by one author.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use vitrine_core::constants::POSTS_COLLECTION;
use vitrine_core::models::{Post, PostForm};
use vitrine_core::validation::validate_form;
use vitrine_core::AppError;
use vitrine_db::{Document, DocumentStore};

use crate::errors::{document_delete_failed, metadata_write_failed, query_failed};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PostBody {
    title: String,
    content: String,
    author_uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    author_email: Option<String>,
}

impl PostBody {
    fn into_post(self, document: &Document) -> Post {
        Post {
            id: document.id.clone(),
            title: self.title,
            content: self.content,
            author_uid: self.author_uid,
            author_email: self.author_email,
            created_at: document.created_at,
        }
    }
}

#[derive(Clone)]
pub struct PostService {
    documents: Arc<dyn DocumentStore>,
}

impl PostService {
    pub fn new(documents: Arc<dyn DocumentStore>) -> Self {
        Self { documents }
    }

    #[tracing::instrument(skip(self, author_email, form), fields(author_uid = %author_uid))]
    pub async fn create_post(
        &self,
        author_uid: &str,
        author_email: Option<&str>,
        form: &PostForm,
    ) -> Result<Post, AppError> {
        if author_uid.is_empty() {
            return Err(AppError::Unauthenticated);
        }
        validate_form(form, &["title", "content"])?;

        let body = PostBody {
            title: form.title.clone(),
            content: form.content.clone(),
            author_uid: author_uid.to_string(),
            author_email: author_email.map(String::from),
        };
        let document = self
            .documents
            .insert(POSTS_COLLECTION, serde_json::to_value(&body)?)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to create post");
                metadata_write_failed(e)
            })?;

        Ok(body.into_post(&document))
    }

    /// Posts by `author_uid`, newest first. A failed query yields an empty list.
    pub async fn list_by_author(&self, author_uid: &str) -> Vec<Post> {
        self.try_list_by_author(author_uid).await.unwrap_or_default()
    }

    pub async fn try_list_by_author(&self, author_uid: &str) -> Result<Vec<Post>, AppError> {
        let documents = self
            .documents
            .query_by_field(POSTS_COLLECTION, "authorUid", author_uid)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, author_uid = %author_uid, "Failed to list posts");
                query_failed(e)
            })?;

        Ok(documents
            .into_iter()
            .filter_map(|document| {
                match serde_json::from_value::<PostBody>(document.data.clone()) {
                    Ok(body) => Some(body.into_post(&document)),
                    Err(e) => {
                        tracing::warn!(error = %e, post_id = %document.id, "Skipping malformed post");
                        None
                    }
                }
            })
            .collect())
    }

    pub async fn delete_post(&self, id: &str) -> Result<(), AppError> {
        self.documents
            .delete(POSTS_COLLECTION, id)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, post_id = %id, "Failed to delete post");
                document_delete_failed(e)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitrine_core::ValidationError;
    use vitrine_db::{MemoryDocumentStore, StoreOperation};

    fn service() -> (MemoryDocumentStore, PostService) {
        let store = MemoryDocumentStore::new();
        (store.clone(), PostService::new(Arc::new(store)))
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let (_, service) = service();
        let first = service
            .create_post("u1", Some("a@example.com"), &PostForm::new("One", "first"))
            .await
            .unwrap();
        let second = service
            .create_post("u1", None, &PostForm::new("Two", "second"))
            .await
            .unwrap();
        service
            .create_post("u2", None, &PostForm::new("Other", "not mine"))
            .await
            .unwrap();

        assert_eq!(first.author_email.as_deref(), Some("a@example.com"));
        let listed = service.list_by_author("u1").await;
        let ids: Vec<_> = listed.iter().map(|p| p.id.clone()).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[tokio::test]
    async fn test_invalid_form_is_not_written() {
        let (store, service) = service();
        let err = service
            .create_post("u1", None, &PostForm::new("x".repeat(101), "body"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Validation(ValidationError::TooLong { max: 100, .. })
        ));
        assert_eq!(store.count(POSTS_COLLECTION).await, 0);
    }

    #[tokio::test]
    async fn test_list_failure_degrades_to_empty() {
        let (store, service) = service();
        service
            .create_post("u1", None, &PostForm::new("One", "first"))
            .await
            .unwrap();
        store.fail_operation(StoreOperation::Query).await;
        assert!(service.list_by_author("u1").await.is_empty());
    }

    #[tokio::test]
    async fn test_delete() {
        let (store, service) = service();
        let post = service
            .create_post("u1", None, &PostForm::new("One", "first"))
            .await
            .unwrap();
        service.delete_post(&post.id).await.unwrap();
        assert!(service.list_by_author("u1").await.is_empty());

        store.fail_operation(StoreOperation::Delete).await;
        assert!(matches!(
            service.delete_post(&post.id).await,
            Err(AppError::DeleteFailed(_))
        ));
    }
}
