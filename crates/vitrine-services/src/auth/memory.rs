//! Identity provider kept in process memory, for development and tests.
//!
//! Passwords are stored as argon2 hashes. Federated sign-in has no real popup; the
//! identity a provider would return is registered up front with
//! [`MemoryIdentityProvider::register_federated_identity`].

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use async_trait::async_trait;
use rand_core::OsRng;
use tokio::sync::RwLock;
use uuid::Uuid;
use vitrine_core::constants::PASSWORD_MIN_LENGTH;
use vitrine_core::models::{AuthUser, FederatedProvider, PASSWORD_PROVIDER_ID};
use vitrine_core::validation::validate_email;

use super::provider::{IdentityProvider, ProviderError};

/// Consecutive wrong passwords before sign-in is refused.
const MAX_FAILED_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone)]
struct Account {
    uid: String,
    email: String,
    display_name: Option<String>,
    password_hash: Option<String>,
    provider_ids: Vec<String>,
}

impl Account {
    fn to_user(&self) -> AuthUser {
        AuthUser {
            uid: self.uid.clone(),
            email: Some(self.email.clone()),
            display_name: self.display_name.clone(),
            provider_ids: self.provider_ids.clone(),
        }
    }
}

#[derive(Debug, Clone)]
struct FederatedIdentity {
    email: String,
    display_name: Option<String>,
}

#[derive(Default)]
struct State {
    accounts: HashMap<String, Account>,
    uid_by_email: HashMap<String, String>,
    federated: HashMap<FederatedProvider, FederatedIdentity>,
    failed_attempts: HashMap<String, u32>,
    disabled: HashSet<String>,
    current: Option<String>,
    offline: bool,
}

impl State {
    fn ensure_online(&self) -> Result<(), ProviderError> {
        if self.offline {
            return Err(ProviderError::new("auth/network-request-failed"));
        }
        Ok(())
    }

    fn account_by_email(&self, email: &str) -> Option<&Account> {
        self.uid_by_email
            .get(&email.to_lowercase())
            .and_then(|uid| self.accounts.get(uid))
    }

    fn insert_account(&mut self, account: Account) -> AuthUser {
        let user = account.to_user();
        self.uid_by_email
            .insert(account.email.to_lowercase(), account.uid.clone());
        self.current = Some(account.uid.clone());
        self.accounts.insert(account.uid.clone(), account);
        user
    }
}

#[derive(Clone)]
pub struct MemoryIdentityProvider {
    state: Arc<RwLock<State>>,
    hasher: Argon2<'static>,
}

impl Default for MemoryIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryIdentityProvider {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(State::default())),
            hasher: Argon2::default(),
        }
    }

    /// Minimum-cost argon2 parameters. Hashes stay valid argon2id, just cheap.
    pub fn with_fast_hashing(mut self) -> Self {
        let params = Params::new(
            Params::MIN_M_COST,
            Params::MIN_T_COST,
            Params::MIN_P_COST,
            None,
        )
        .unwrap_or_default();
        self.hasher = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        self
    }

    /// Identity returned by the next sign-in or link through `provider`.
    pub async fn register_federated_identity(
        &self,
        provider: FederatedProvider,
        email: impl Into<String>,
        display_name: Option<String>,
    ) {
        self.state.write().await.federated.insert(
            provider,
            FederatedIdentity {
                email: email.into(),
                display_name,
            },
        );
    }

    pub async fn disable_account(&self, email: &str) {
        let mut state = self.state.write().await;
        if let Some(uid) = state.uid_by_email.get(&email.to_lowercase()).cloned() {
            state.disabled.insert(uid);
        }
    }

    /// Simulate losing connectivity to the provider.
    pub async fn set_offline(&self, offline: bool) {
        self.state.write().await.offline = offline;
    }

    fn hash_password(&self, password: &str) -> Result<String, ProviderError> {
        let salt = SaltString::generate(&mut OsRng);
        self.hasher
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to hash password");
                ProviderError::new("auth/internal-error")
            })
    }

    fn verify_password(&self, password: &str, hash: &str) -> bool {
        match PasswordHash::new(hash) {
            Ok(parsed) => self
                .hasher
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn sign_in_with_email(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthUser, ProviderError> {
        let mut state = self.state.write().await;
        state.ensure_online()?;
        if validate_email(email).is_err() {
            return Err(ProviderError::new("auth/invalid-email"));
        }

        let account = state
            .account_by_email(email)
            .cloned()
            .ok_or_else(|| ProviderError::new("auth/user-not-found"))?;

        if state.disabled.contains(&account.uid) {
            return Err(ProviderError::new("auth/user-disabled"));
        }
        let failures = state.failed_attempts.get(&account.uid).copied().unwrap_or(0);
        if failures >= MAX_FAILED_ATTEMPTS {
            return Err(ProviderError::new("auth/too-many-requests"));
        }

        let verified = account
            .password_hash
            .as_deref()
            .is_some_and(|hash| self.verify_password(password, hash));
        if !verified {
            *state.failed_attempts.entry(account.uid.clone()).or_insert(0) += 1;
            return Err(ProviderError::new("auth/wrong-password"));
        }

        state.failed_attempts.remove(&account.uid);
        state.current = Some(account.uid.clone());
        Ok(account.to_user())
    }

    async fn sign_up_with_email(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthUser, ProviderError> {
        let mut state = self.state.write().await;
        state.ensure_online()?;
        if validate_email(email).is_err() {
            return Err(ProviderError::new("auth/invalid-email"));
        }
        if password.chars().count() < PASSWORD_MIN_LENGTH {
            return Err(ProviderError::new("auth/weak-password"));
        }
        if state.account_by_email(email).is_some() {
            return Err(ProviderError::new("auth/email-already-in-use"));
        }

        let password_hash = self.hash_password(password)?;
        let user = state.insert_account(Account {
            uid: Uuid::new_v4().to_string(),
            email: email.to_string(),
            display_name: None,
            password_hash: Some(password_hash),
            provider_ids: vec![PASSWORD_PROVIDER_ID.to_string()],
        });
        tracing::info!(uid = %user.uid, "Account created");
        Ok(user)
    }

    async fn sign_in_with_provider(
        &self,
        provider: FederatedProvider,
    ) -> Result<AuthUser, ProviderError> {
        let mut state = self.state.write().await;
        state.ensure_online()?;
        let identity = state
            .federated
            .get(&provider)
            .cloned()
            .ok_or_else(|| ProviderError::new("auth/popup-closed-by-user"))?;

        if let Some(account) = state.account_by_email(&identity.email).cloned() {
            if state.disabled.contains(&account.uid) {
                return Err(ProviderError::new("auth/user-disabled"));
            }
            if !account.provider_ids.iter().any(|id| id == provider.provider_id()) {
                return Err(ProviderError::new(
                    "auth/account-exists-with-different-credential",
                ));
            }
            state.current = Some(account.uid.clone());
            return Ok(account.to_user());
        }

        Ok(state.insert_account(Account {
            uid: Uuid::new_v4().to_string(),
            email: identity.email,
            display_name: identity.display_name,
            password_hash: None,
            provider_ids: vec![provider.provider_id().to_string()],
        }))
    }

    async fn link_provider(
        &self,
        uid: &str,
        provider: FederatedProvider,
    ) -> Result<AuthUser, ProviderError> {
        let mut state = self.state.write().await;
        state.ensure_online()?;
        let identity = state
            .federated
            .get(&provider)
            .cloned()
            .ok_or_else(|| ProviderError::new("auth/popup-closed-by-user"))?;

        if let Some(other) = state.account_by_email(&identity.email) {
            if other.uid != uid {
                return Err(ProviderError::new("auth/credential-already-in-use"));
            }
        }

        let account = state
            .accounts
            .get_mut(uid)
            .ok_or_else(|| ProviderError::new("auth/user-not-found"))?;
        if account.provider_ids.iter().any(|id| id == provider.provider_id()) {
            return Err(ProviderError::new("auth/provider-already-linked"));
        }
        account.provider_ids.push(provider.provider_id().to_string());
        if account.display_name.is_none() {
            account.display_name = identity.display_name;
        }
        Ok(account.to_user())
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        self.state.write().await.current = None;
        Ok(())
    }

    async fn current_user(&self) -> Option<AuthUser> {
        let state = self.state.read().await;
        state
            .current
            .as_ref()
            .and_then(|uid| state.accounts.get(uid))
            .map(Account::to_user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> MemoryIdentityProvider {
        MemoryIdentityProvider::new().with_fast_hashing()
    }

    #[tokio::test]
    async fn test_sign_up_then_sign_in() {
        let idp = provider();
        let created = idp
            .sign_up_with_email("ana@example.com", "secret1")
            .await
            .unwrap();
        assert!(created.is_provider_linked(PASSWORD_PROVIDER_ID));

        idp.sign_out().await.unwrap();
        assert!(idp.current_user().await.is_none());

        let signed_in = idp
            .sign_in_with_email("ANA@example.com", "secret1")
            .await
            .unwrap();
        assert_eq!(signed_in.uid, created.uid);
        assert_eq!(idp.current_user().await.map(|u| u.uid), Some(created.uid));
    }

    #[tokio::test]
    async fn test_error_codes() {
        let idp = provider();
        idp.sign_up_with_email("ana@example.com", "secret1")
            .await
            .unwrap();

        let code = |r: Result<AuthUser, ProviderError>| r.unwrap_err().code;
        assert_eq!(
            code(idp.sign_up_with_email("ana@example.com", "secret1").await),
            "auth/email-already-in-use"
        );
        assert_eq!(
            code(idp.sign_up_with_email("bob@example.com", "123").await),
            "auth/weak-password"
        );
        assert_eq!(
            code(idp.sign_in_with_email("nobody@example.com", "secret1").await),
            "auth/user-not-found"
        );
        assert_eq!(
            code(idp.sign_in_with_email("ana@example.com", "wrong!!").await),
            "auth/wrong-password"
        );
        assert_eq!(
            code(idp.sign_in_with_email("not-an-email", "secret1").await),
            "auth/invalid-email"
        );
    }

    #[tokio::test]
    async fn test_lockout_after_repeated_failures() {
        let idp = provider();
        idp.sign_up_with_email("ana@example.com", "secret1")
            .await
            .unwrap();
        for _ in 0..MAX_FAILED_ATTEMPTS {
            let _ = idp.sign_in_with_email("ana@example.com", "nope!!").await;
        }
        let err = idp
            .sign_in_with_email("ana@example.com", "secret1")
            .await
            .unwrap_err();
        assert_eq!(err.code, "auth/too-many-requests");
    }

    #[tokio::test]
    async fn test_federated_sign_in_and_conflict() {
        let idp = provider();
        idp.register_federated_identity(
            FederatedProvider::Google,
            "gina@example.com",
            Some("Gina".to_string()),
        )
        .await;
        let user = idp
            .sign_in_with_provider(FederatedProvider::Google)
            .await
            .unwrap();
        assert_eq!(user.display_name.as_deref(), Some("Gina"));
        assert!(user.is_provider_linked("google.com"));

        idp.register_federated_identity(FederatedProvider::Facebook, "gina@example.com", None)
            .await;
        let err = idp
            .sign_in_with_provider(FederatedProvider::Facebook)
            .await
            .unwrap_err();
        assert_eq!(err.code, "auth/account-exists-with-different-credential");
    }

    #[tokio::test]
    async fn test_link_provider() {
        let idp = provider();
        let user = idp
            .sign_up_with_email("ana@example.com", "secret1")
            .await
            .unwrap();
        idp.register_federated_identity(FederatedProvider::Facebook, "ana@example.com", None)
            .await;

        let linked = idp
            .link_provider(&user.uid, FederatedProvider::Facebook)
            .await
            .unwrap();
        assert!(linked.is_provider_linked("facebook.com"));
        assert!(linked.is_provider_linked(PASSWORD_PROVIDER_ID));
    }

    #[tokio::test]
    async fn test_offline() {
        let idp = provider();
        idp.set_offline(true).await;
        let err = idp
            .sign_up_with_email("ana@example.com", "secret1")
            .await
            .unwrap_err();
        assert_eq!(err.code, "auth/network-request-failed");
    }
}
