//! Posts of the signed-in user.

use std::sync::Arc;

use tokio::sync::watch;
use vitrine_core::models::{AuthUser, Post, PostForm};
use vitrine_core::{AppError, ErrorKind};
use vitrine_services::PostService;

const LOAD_FAILED: &str = "failed to load posts";
const CREATE_FAILED: &str = "failed to create post";
const DELETE_FAILED: &str = "failed to delete post";
const NOT_AUTHENTICATED: &str = "user not authenticated";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostsSnapshot {
    pub user: Option<AuthUser>,
    /// Newest first.
    pub posts: Vec<Post>,
    pub loading: bool,
    pub error: Option<String>,
}

/// Validation failures keep their own message; anything else gets a generic one.
fn failure_message(err: &AppError, fallback: &str) -> String {
    match err.kind() {
        ErrorKind::Validation => err.to_string(),
        _ => fallback.to_string(),
    }
}

#[derive(Clone)]
pub struct PostsState {
    service: PostService,
    state: Arc<watch::Sender<PostsSnapshot>>,
}

impl PostsState {
    pub fn new(service: PostService) -> Self {
        let (state, _) = watch::channel(PostsSnapshot::default());
        Self {
            service,
            state: Arc::new(state),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<PostsSnapshot> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> PostsSnapshot {
        self.state.borrow().clone()
    }

    pub fn set_user(&self, user: Option<AuthUser>) {
        self.state.send_if_modified(|s| {
            if s.user == user {
                return false;
            }
            s.user = user;
            s.posts.clear();
            s.error = None;
            true
        });
    }

    fn uid(&self) -> Option<String> {
        self.state.borrow().user.as_ref().map(|u| u.uid.clone())
    }

    fn begin(&self) {
        self.state.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });
    }

    /// Fetch the user's posts. Clears the list when nobody is signed in.
    pub async fn load(&self) {
        let Some(uid) = self.uid() else {
            self.state.send_modify(|s| s.posts.clear());
            return;
        };

        self.begin();
        let result = self.service.try_list_by_author(&uid).await;
        self.state.send_modify(|s| {
            match result {
                Ok(posts) => s.posts = posts,
                Err(_) => s.error = Some(LOAD_FAILED.to_string()),
            }
            s.loading = false;
        });
    }

    /// Create a post and put it at the top of the list. Needs a user with an email.
    pub async fn create(&self, form: &PostForm) -> bool {
        let author = self
            .state
            .borrow()
            .user
            .as_ref()
            .and_then(|u| Some((u.uid.clone(), u.email.clone()?)));
        let Some((uid, email)) = author else {
            self.state
                .send_modify(|s| s.error = Some(NOT_AUTHENTICATED.to_string()));
            return false;
        };

        self.begin();
        let result = self.service.create_post(&uid, Some(&email), form).await;
        let created = result.is_ok();
        self.state.send_modify(|s| {
            match result {
                Ok(post) => s.posts.insert(0, post),
                Err(e) => s.error = Some(failure_message(&e, CREATE_FAILED)),
            }
            s.loading = false;
        });
        created
    }

    /// Delete a post. The list changes only after the backend confirms.
    pub async fn delete(&self, id: &str) -> bool {
        self.begin();
        let deleted = self.service.delete_post(id).await.is_ok();
        self.state.send_modify(|s| {
            if deleted {
                s.posts.retain(|p| p.id != id);
            } else {
                s.error = Some(DELETE_FAILED.to_string());
            }
            s.loading = false;
        });
        deleted
    }
}
