use async_trait::async_trait;
use vitrine_core::models::{AuthUser, FederatedProvider};

/// Raw identity provider failure, e.g. `auth/wrong-password`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("identity provider error: {code}")]
pub struct ProviderError {
    pub code: String,
}

impl ProviderError {
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in_with_email(&self, email: &str, password: &str)
        -> Result<AuthUser, ProviderError>;

    async fn sign_up_with_email(&self, email: &str, password: &str)
        -> Result<AuthUser, ProviderError>;

    /// Popup-style federated sign-in.
    async fn sign_in_with_provider(
        &self,
        provider: FederatedProvider,
    ) -> Result<AuthUser, ProviderError>;

    /// Attach a federated identity to an existing account.
    async fn link_provider(
        &self,
        uid: &str,
        provider: FederatedProvider,
    ) -> Result<AuthUser, ProviderError>;

    async fn sign_out(&self) -> Result<(), ProviderError>;

    async fn current_user(&self) -> Option<AuthUser>;
}
