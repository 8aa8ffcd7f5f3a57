//! Signed-in user session.

use std::sync::Arc;

use tokio::sync::watch;
use vitrine_core::models::{AuthUser, FederatedProvider};
use vitrine_core::AppError;
use vitrine_services::AuthService;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSnapshot {
    pub user: Option<AuthUser>,
    /// True until the first refresh has completed.
    pub loading: bool,
}

impl Default for AuthSnapshot {
    fn default() -> Self {
        Self {
            user: None,
            loading: true,
        }
    }
}

/// Wraps [`AuthService`] and re-reads the current user after every call, whether
/// it succeeded or not.
#[derive(Clone)]
pub struct AuthSession {
    service: AuthService,
    state: Arc<watch::Sender<AuthSnapshot>>,
}

impl AuthSession {
    pub fn new(service: AuthService) -> Self {
        let (state, _) = watch::channel(AuthSnapshot::default());
        Self {
            service,
            state: Arc::new(state),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> AuthSnapshot {
        self.state.borrow().clone()
    }

    pub fn user(&self) -> Option<AuthUser> {
        self.state.borrow().user.clone()
    }

    pub async fn refresh(&self) {
        let user = self.service.current_user().await;
        self.state.send_modify(|s| {
            s.user = user;
            s.loading = false;
        });
    }

    async fn settle<T>(&self, result: Result<T, AppError>) -> Result<(), AppError> {
        self.refresh().await;
        result.map(|_| ())
    }

    pub async fn sign_in_with_email(&self, email: &str, password: &str) -> Result<(), AppError> {
        let result = self.service.sign_in_with_email(email, password).await;
        self.settle(result).await
    }

    pub async fn sign_up_with_email(&self, email: &str, password: &str) -> Result<(), AppError> {
        let result = self.service.sign_up_with_email(email, password).await;
        self.settle(result).await
    }

    pub async fn sign_in_with_google(&self) -> Result<(), AppError> {
        self.sign_in_with_provider(FederatedProvider::Google).await
    }

    pub async fn sign_in_with_facebook(&self) -> Result<(), AppError> {
        self.sign_in_with_provider(FederatedProvider::Facebook).await
    }

    pub async fn sign_in_with_provider(&self, provider: FederatedProvider) -> Result<(), AppError> {
        let result = self.service.sign_in_with_provider(provider).await;
        self.settle(result).await
    }

    pub async fn link_provider(&self, provider: FederatedProvider) -> Result<(), AppError> {
        let result = self.service.link_provider(provider).await;
        self.settle(result).await
    }

    pub async fn sign_out(&self) -> Result<(), AppError> {
        let result = self.service.sign_out().await;
        self.settle(result).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitrine_core::{AuthErrorKind, ErrorKind};
    use vitrine_services::MemoryIdentityProvider;

    fn session() -> (MemoryIdentityProvider, AuthSession) {
        let idp = MemoryIdentityProvider::new().with_fast_hashing();
        let service = AuthService::new(Arc::new(idp.clone()));
        (idp, AuthSession::new(service))
    }

    #[tokio::test]
    async fn test_loading_until_first_refresh() {
        let (_, session) = session();
        assert!(session.snapshot().loading);
        session.refresh().await;
        assert_eq!(
            session.snapshot(),
            AuthSnapshot {
                user: None,
                loading: false
            }
        );
    }

    #[tokio::test]
    async fn test_sign_up_sign_out() {
        let (_, session) = session();
        let mut updates = session.subscribe();

        session
            .sign_up_with_email("ana@example.com", "secret1")
            .await
            .unwrap();
        assert!(updates.has_changed().unwrap());
        let user = updates.borrow_and_update().user.clone().unwrap();
        assert_eq!(user.email.as_deref(), Some("ana@example.com"));

        session.sign_out().await.unwrap();
        assert!(session.user().is_none());
    }

    #[tokio::test]
    async fn test_failed_sign_in_leaves_no_user() {
        let (_, session) = session();
        session
            .sign_up_with_email("ana@example.com", "secret1")
            .await
            .unwrap();
        session.sign_out().await.unwrap();

        let err = session
            .sign_in_with_email("ana@example.com", "wrong-one")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Auth);
        assert!(matches!(
            err,
            AppError::Auth(ref e) if e.kind == AuthErrorKind::WrongPassword
        ));
        assert!(session.user().is_none());
    }

    #[tokio::test]
    async fn test_link_updates_provider_ids() {
        let (idp, session) = session();
        session
            .sign_up_with_email("ana@example.com", "secret1")
            .await
            .unwrap();
        idp.register_federated_identity(FederatedProvider::Facebook, "ana@example.com", None)
            .await;

        session
            .link_provider(FederatedProvider::Facebook)
            .await
            .unwrap();
        let user = session.user().unwrap();
        assert!(user.is_provider_linked("facebook.com"));
        assert!(user.is_provider_linked("password"));
    }
}
