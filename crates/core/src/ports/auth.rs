//! Authentication provider port.

use crate::ports::StoreError;
use async_trait::async_trait;
use saude_types::EmailAddress;
use saude_uuid::RecordId;

/// An authenticated account and the opaque bearer token that proves it.
///
/// Sessions are explicit values handed to the services; there is no ambient "current user".
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    account_id: RecordId,
    token: String,
}

impl Session {
    pub fn new(account_id: RecordId, token: impl Into<String>) -> Self {
        Self {
            account_id,
            token: token.into(),
        }
    }

    pub fn account_id(&self) -> &RecordId {
        &self.account_id
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("an account already exists for {0}")]
    EmailInUse(String),
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("password must be at least {0} characters")]
    WeakPassword(usize),
    #[error("account {0} does not exist")]
    AccountNotFound(RecordId),
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error("auth storage error: {0}")]
    Store(#[from] StoreError),
}

pub type AuthResult<T> = std::result::Result<T, AuthError>;

/// Email/password credential management.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Creates a credential and signs it in. The returned session carries the new account id.
    async fn create_account(&self, email: &EmailAddress, password: &str) -> AuthResult<Session>;

    async fn sign_in(&self, email: &EmailAddress, password: &str) -> AuthResult<Session>;

    /// Revokes a session token. Unknown tokens are ignored.
    async fn sign_out(&self, token: &str) -> AuthResult<()>;

    /// Resolves a bearer token, `None` when it is unknown, revoked or expired.
    async fn verify(&self, token: &str) -> AuthResult<Option<Session>>;

    /// Removes a credential and all of its sessions.
    async fn delete_account(&self, account_id: &RecordId) -> AuthResult<()>;
}
