use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::constants::{POST_CONTENT_MAX_LENGTH, POST_TITLE_MAX_LENGTH};

/// A short text post owned by one author.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub title: String,
    pub content: String,
    pub author_uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_email: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct PostForm {
    #[validate(length(min = 1, max = POST_TITLE_MAX_LENGTH))]
    pub title: String,
    #[validate(length(min = 1, max = POST_CONTENT_MAX_LENGTH))]
    pub content: String,
}

impl PostForm {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }
}
