use std::sync::Arc;

use vitrine_core::models::{AuthUser, FederatedProvider};
use vitrine_core::validation::validate_credentials;
use vitrine_core::{AppError, AuthError};

use super::provider::{IdentityProvider, ProviderError};

fn translate(operation: &'static str, err: ProviderError) -> AppError {
    let translated = AuthError::from_code(err.code);
    tracing::warn!(
        operation,
        code = %translated.code,
        kind = ?translated.kind,
        "Identity provider rejected request"
    );
    AppError::Auth(translated)
}

#[derive(Clone)]
pub struct AuthService {
    provider: Arc<dyn IdentityProvider>,
}

impl AuthService {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self { provider }
    }

    pub async fn sign_in_with_email(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthUser, AppError> {
        validate_credentials(email, password)?;
        self.provider
            .sign_in_with_email(email.trim(), password)
            .await
            .map_err(|e| translate("sign_in", e))
    }

    pub async fn sign_up_with_email(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthUser, AppError> {
        validate_credentials(email, password)?;
        let user = self
            .provider
            .sign_up_with_email(email.trim(), password)
            .await
            .map_err(|e| translate("sign_up", e))?;
        tracing::info!(uid = %user.uid, "User signed up");
        Ok(user)
    }

    pub async fn sign_in_with_provider(
        &self,
        provider: FederatedProvider,
    ) -> Result<AuthUser, AppError> {
        self.provider
            .sign_in_with_provider(provider)
            .await
            .map_err(|e| translate("federated_sign_in", e))
    }

    /// Link `provider` to the signed-in account.
    pub async fn link_provider(&self, provider: FederatedProvider) -> Result<AuthUser, AppError> {
        let current = self
            .provider
            .current_user()
            .await
            .ok_or(AppError::Unauthenticated)?;
        let user = self
            .provider
            .link_provider(&current.uid, provider)
            .await
            .map_err(|e| translate("link_provider", e))?;
        tracing::info!(uid = %user.uid, provider = provider.provider_id(), "Provider linked");
        Ok(user)
    }

    pub async fn sign_out(&self) -> Result<(), AppError> {
        self.provider
            .sign_out()
            .await
            .map_err(|e| translate("sign_out", e))
    }

    pub async fn current_user(&self) -> Option<AuthUser> {
        self.provider.current_user().await
    }
}
