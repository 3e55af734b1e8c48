//! Credential verification against a user directory.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use keystone_access::Principal;
use keystone_core::{Result, RolePermissionResourceId, UserId};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::error::TokenError;

/// Hashes a password using Argon2id with a random salt.
///
/// # Errors
///
/// Returns `TokenError::Hashing` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, TokenError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| TokenError::Hashing {
            details: e.to_string(),
        })?;
    Ok(hash.to_string())
}

/// Verifies a password against a stored Argon2 hash.
///
/// # Errors
///
/// Returns `TokenError::Hashing` for a malformed hash and
/// `TokenError::InvalidCredentials` for a mismatch.
pub fn verify_password(password: &str, password_hash: &str) -> Result<(), TokenError> {
    let parsed = PasswordHash::new(password_hash).map_err(|e| TokenError::Hashing {
        details: e.to_string(),
    })?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| TokenError::InvalidCredentials)?;
    Ok(())
}

/// A principal together with its stored credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    password_hash: String,
    principal: Principal,
}

impl UserAccount {
    #[must_use]
    pub fn new(principal: Principal, password_hash: impl Into<String>) -> Self {
        Self {
            password_hash: password_hash.into(),
            principal,
        }
    }

    #[must_use]
    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    #[must_use]
    pub fn into_principal(self) -> Principal {
        self.principal
    }

    #[must_use]
    pub fn username(&self) -> &str {
        self.principal.username()
    }
}

/// Lookup of accounts by login name.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Finds the account for a username.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Directory` if the backing store fails.
    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserAccount>, TokenError>;

    /// Finds the account with the given user id.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Directory` if the backing store fails.
    async fn find_by_id(&self, id: UserId) -> Result<Option<UserAccount>, TokenError>;

    /// Removes a role-permission-resource binding from a user.
    ///
    /// Returns false when the user does not exist or does not hold the
    /// binding.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Directory` if the backing store fails.
    async fn revoke_role_permission_resource(
        &self,
        user_id: UserId,
        binding_id: RolePermissionResourceId,
    ) -> Result<bool, TokenError>;
}

/// A directory held in memory, optionally seeded from a JSON file.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    accounts: RwLock<HashMap<String, UserAccount>>,
}

fn poisoned<T>(_: T) -> TokenError {
    TokenError::Directory {
        details: "user directory lock poisoned".to_string(),
    }
}

impl InMemoryDirectory {
    #[must_use]
    pub fn new(accounts: impl IntoIterator<Item = UserAccount>) -> Self {
        Self {
            accounts: RwLock::new(
                accounts
                    .into_iter()
                    .map(|account| (account.username().to_string(), account))
                    .collect(),
            ),
        }
    }

    /// Loads accounts from a JSON array of `{passwordHash, principal}`.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Directory` if the file cannot be read or parsed.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, TokenError> {
        let path = path.as_ref();
        let contents =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|e| TokenError::Directory {
                    details: format!("{}: {e}", path.display()),
                })?;
        let accounts: Vec<UserAccount> =
            serde_json::from_str(&contents).map_err(|e| TokenError::Directory {
                details: format!("{}: {e}", path.display()),
            })?;
        info!(path = %path.display(), accounts = accounts.len(), "loaded user directory");
        Ok(Self::new(accounts))
    }

    /// Adds or replaces an account.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Directory` if the lock is poisoned.
    pub fn insert(&self, account: UserAccount) -> Result<(), TokenError> {
        self.accounts
            .write()
            .map_err(poisoned)?
            .insert(account.username().to_string(), account);
        Ok(())
    }

    /// Returns the number of accounts, zero if the lock is poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.accounts.read().map_or(0, |accounts| accounts.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl UserDirectory for InMemoryDirectory {
    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserAccount>, TokenError> {
        Ok(self.accounts.read().map_err(poisoned)?.get(username).cloned())
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<UserAccount>, TokenError> {
        Ok(self
            .accounts
            .read()
            .map_err(poisoned)?
            .values()
            .find(|account| account.principal.id() == id)
            .cloned())
    }

    async fn revoke_role_permission_resource(
        &self,
        user_id: UserId,
        binding_id: RolePermissionResourceId,
    ) -> Result<bool, TokenError> {
        let mut accounts = self.accounts.write().map_err(poisoned)?;
        let removed = accounts
            .values_mut()
            .find(|account| account.principal.id() == user_id)
            .and_then(|account| account.principal.remove_role_permission_resource(binding_id));
        Ok(removed.is_some())
    }
}

/// Verifies credentials and loads principals from a [`UserDirectory`].
#[derive(Clone)]
pub struct Authenticator {
    directory: Arc<dyn UserDirectory>,
}

impl Authenticator {
    #[must_use]
    pub fn new(directory: Arc<dyn UserDirectory>) -> Self {
        Self { directory }
    }

    /// Verifies a username and password.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::InvalidCredentials` for an unknown user or a
    /// wrong password, `TokenError::AccountDisabled` for a disabled account.
    #[instrument(skip(self, password))]
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Principal, TokenError> {
        let Some(account) = self.directory.find_by_username(username).await? else {
            debug!("unknown username");
            return Err(TokenError::InvalidCredentials.into());
        };

        verify_password(password, &account.password_hash)?;

        if !account.principal.is_enabled() {
            warn!("login attempt on disabled account");
            return Err(TokenError::AccountDisabled {
                username: username.to_string(),
            }
            .into());
        }

        info!(user_id = %account.principal.id(), "authenticated");
        Ok(account.into_principal())
    }

    /// Loads the principal for a username without checking credentials.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Directory` if the backing store fails.
    pub async fn load_principal(
        &self,
        username: &str,
    ) -> Result<Option<Principal>, TokenError> {
        Ok(self
            .directory
            .find_by_username(username)
            .await?
            .map(UserAccount::into_principal))
    }

    /// Loads the principal with the given user id.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Directory` if the backing store fails.
    pub async fn load_principal_by_id(
        &self,
        id: UserId,
    ) -> Result<Option<Principal>, TokenError> {
        Ok(self
            .directory
            .find_by_id(id)
            .await?
            .map(UserAccount::into_principal))
    }

    /// Removes a binding from a user's account.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Directory` if the backing store fails.
    #[instrument(skip(self))]
    pub async fn revoke_role_permission_resource(
        &self,
        user_id: UserId,
        binding_id: RolePermissionResourceId,
    ) -> Result<bool, TokenError> {
        let revoked = self
            .directory
            .revoke_role_permission_resource(user_id, binding_id)
            .await?;
        if revoked {
            info!("revoked role permission resource");
        } else {
            debug!("binding not held, nothing revoked");
        }
        Ok(revoked)
    }
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn account(id: i64, username: &str, password: &str, enabled: bool) -> UserAccount {
        let principal = Principal::new(UserId::new(id), username).with_enabled(enabled);
        UserAccount::new(principal, hash_password(password).expect("hash"))
    }

    fn authenticator() -> Authenticator {
        Authenticator::new(Arc::new(InMemoryDirectory::new([
            account(1, "alice", "correct horse", true),
            account(2, "bob", "battery staple", false),
        ])))
    }

    #[test]
    fn hash_and_verify_password() {
        let hash = hash_password("s3cret").expect("hash");
        assert!(verify_password("s3cret", &hash).is_ok());

        let err = verify_password("wrong", &hash).expect_err("mismatch");
        assert_eq!(err.current_context(), &TokenError::InvalidCredentials);
    }

    #[test]
    fn hashes_are_salted() {
        let first = hash_password("same").expect("hash");
        let second = hash_password("same").expect("hash");
        assert_ne!(first, second);
    }

    #[test]
    fn malformed_hash_is_a_hashing_error() {
        let err = verify_password("pw", "not-a-hash").expect_err("malformed");
        assert!(matches!(err.current_context(), TokenError::Hashing { .. }));
    }

    #[tokio::test]
    async fn valid_credentials_return_principal() {
        let principal = authenticator()
            .authenticate("alice", "correct horse")
            .await
            .expect("authenticated");
        assert_eq!(principal.id(), UserId::new(1));
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_look_the_same() {
        let auth = authenticator();

        let wrong = auth.authenticate("alice", "nope").await.expect_err("wrong password");
        let unknown = auth.authenticate("mallory", "nope").await.expect_err("unknown");

        assert_eq!(wrong.current_context(), &TokenError::InvalidCredentials);
        assert_eq!(unknown.current_context(), &TokenError::InvalidCredentials);
    }

    #[tokio::test]
    async fn disabled_account_is_refused() {
        let err = authenticator()
            .authenticate("bob", "battery staple")
            .await
            .expect_err("disabled");
        assert!(matches!(
            err.current_context(),
            TokenError::AccountDisabled { .. }
        ));
    }

    #[tokio::test]
    async fn load_principal_skips_credentials() {
        let auth = authenticator();
        assert!(auth.load_principal("bob").await.expect("lookup").is_some());
        assert!(auth.load_principal("mallory").await.expect("lookup").is_none());

        let bob = auth
            .load_principal_by_id(UserId::new(2))
            .await
            .expect("lookup")
            .expect("bob");
        assert_eq!(bob.username(), "bob");
        assert!(
            auth.load_principal_by_id(UserId::new(9))
                .await
                .expect("lookup")
                .is_none()
        );
    }

    #[tokio::test]
    async fn revoked_binding_is_gone_from_the_directory() {
        use keystone_access::RolePermissionResource;
        use keystone_core::{PermissionResourceId, RoleId};

        let binding = RolePermissionResourceId::new(12);
        let principal = Principal::new(UserId::new(1), "alice").with_role_permission_resources([
            RolePermissionResource::new(binding, RoleId::new(5), PermissionResourceId::new(2), "*"),
        ]);
        let directory = InMemoryDirectory::default();
        directory
            .insert(UserAccount::new(principal, hash_password("pw").expect("hash")))
            .expect("insert");
        let auth = Authenticator::new(Arc::new(directory));

        assert!(auth
            .revoke_role_permission_resource(UserId::new(1), binding)
            .await
            .expect("revoke"));
        let reloaded = auth.load_principal("alice").await.expect("lookup").expect("alice");
        assert!(!reloaded.holds_role_permission_resource(binding));

        assert!(!auth
            .revoke_role_permission_resource(UserId::new(1), binding)
            .await
            .expect("second revoke"));
        assert!(!auth
            .revoke_role_permission_resource(UserId::new(9), binding)
            .await
            .expect("unknown user"));
    }

    #[tokio::test]
    async fn directory_loads_from_seed_file() {
        let accounts = vec![account(1, "alice", "pw", true)];
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(serde_json::to_string(&accounts).expect("serialize").as_bytes())
            .expect("write");

        let directory = InMemoryDirectory::from_file(file.path()).await.expect("load");
        assert_eq!(directory.len(), 1);

        let found = directory.find_by_username("alice").await.expect("lookup");
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn missing_seed_file_is_a_directory_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let err = InMemoryDirectory::from_file(dir.path().join("missing.json"))
            .await
            .expect_err("missing file");
        assert!(matches!(err.current_context(), TokenError::Directory { .. }));
    }
}
