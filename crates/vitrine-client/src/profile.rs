//! Profile of the signed-in user.

use std::sync::Arc;

use tokio::sync::watch;
use vitrine_core::constants::DEFAULT_DISPLAY_NAME;
use vitrine_core::models::{AuthUser, ProfileForm, UserProfile};
use vitrine_core::AppError;
use vitrine_services::UserProfileService;

const LOAD_FAILED: &str = "failed to load profile";
const CREATE_FAILED: &str = "failed to create profile";
const UPDATE_FAILED: &str = "failed to update profile";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileSnapshot {
    pub user: Option<AuthUser>,
    pub profile: Option<UserProfile>,
    pub loading: bool,
    pub error: Option<String>,
}

/// Unlike the list holders, write failures are also returned to the caller.
#[derive(Clone)]
pub struct ProfileState {
    service: UserProfileService,
    state: Arc<watch::Sender<ProfileSnapshot>>,
}

impl ProfileState {
    pub fn new(service: UserProfileService) -> Self {
        let (state, _) = watch::channel(ProfileSnapshot::default());
        Self {
            service,
            state: Arc::new(state),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ProfileSnapshot> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> ProfileSnapshot {
        self.state.borrow().clone()
    }

    pub fn set_user(&self, user: Option<AuthUser>) {
        self.state.send_if_modified(|s| {
            if s.user == user {
                return false;
            }
            s.user = user;
            s.profile = None;
            s.error = None;
            true
        });
    }

    fn user(&self) -> Option<AuthUser> {
        self.state.borrow().user.clone()
    }

    fn begin(&self) {
        self.state.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });
    }

    fn finish(&self, result: &Result<UserProfile, AppError>, failure: &str) {
        self.state.send_modify(|s| {
            match result {
                Ok(profile) => s.profile = Some(profile.clone()),
                Err(_) => s.error = Some(failure.to_string()),
            }
            s.loading = false;
        });
    }

    /// Fetch the profile. Without a user the profile is cleared.
    pub async fn load(&self) {
        let Some(user) = self.user() else {
            self.state.send_modify(|s| s.profile = None);
            return;
        };

        self.begin();
        let result = self.service.get_profile(&user.uid).await;
        self.state.send_modify(|s| {
            match result {
                Ok(profile) => s.profile = profile,
                Err(_) => {
                    s.profile = None;
                    s.error = Some(LOAD_FAILED.to_string());
                }
            }
            s.loading = false;
        });
    }

    /// Create (or overwrite) the profile from the identity plus `form`.
    ///
    /// Returns `Ok(None)` when nobody is signed in.
    pub async fn create_profile(
        &self,
        form: &ProfileForm,
    ) -> Result<Option<UserProfile>, AppError> {
        let Some(user) = self.user() else {
            return Ok(None);
        };

        self.begin();
        let result = self
            .service
            .create_or_update(
                &user.uid,
                user.email.as_deref().unwrap_or_default(),
                user.display_name.as_deref().unwrap_or(DEFAULT_DISPLAY_NAME),
                Some(form),
            )
            .await;
        self.finish(&result, CREATE_FAILED);
        result.map(Some)
    }

    pub async fn update_profile(
        &self,
        form: &ProfileForm,
    ) -> Result<Option<UserProfile>, AppError> {
        let Some(user) = self.user() else {
            return Ok(None);
        };

        self.begin();
        let result = self.service.update_profile_data(&user.uid, form).await;
        self.finish(&result, UPDATE_FAILED);
        result.map(Some)
    }
}
