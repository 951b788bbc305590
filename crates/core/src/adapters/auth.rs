//! Email/password authentication persisted in a [`DocumentStore`].
//!
//! Credentials live in the private `credentials` collection, keyed by the account id the
//! provider hands out. Passwords are stored as Argon2id PHC strings, which carry their own salt
//! and parameters. Each sign-in creates a document in `sessions`; the document id is the bearer
//! token. Sessions expire [`SESSION_TTL_HOURS`] after sign-in.

use crate::constants::{ACCOUNT_ID_FIELD, EMAIL_FIELD, MIN_PASSWORD_LEN, SESSION_TTL_HOURS};
use crate::ports::{
    AuthError, AuthProvider, AuthResult, Collection, DocumentStore, Fields, Query, Session,
};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use saude_types::EmailAddress;
use saude_uuid::RecordId;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Mutex;

const PASSWORD_HASH_FIELD: &str = "password_hash";
const CREATED_AT_FIELD: &str = "created_at";

pub struct StoreAuthProvider {
    store: Arc<dyn DocumentStore>,
    session_ttl: Duration,
    // Serialises the email uniqueness check with the credential insert.
    create_lock: Mutex<()>,
}

impl StoreAuthProvider {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            session_ttl: Duration::hours(SESSION_TTL_HOURS),
            create_lock: Mutex::new(()),
        }
    }

    async fn find_credential(&self, email: &EmailAddress) -> AuthResult<Option<(RecordId, Fields)>> {
        let query = Query::new().where_eq(EMAIL_FIELD, email.as_str()).limit(1);
        let mut docs = self.store.query(Collection::Credentials, &query).await?;
        Ok(docs.pop().map(|doc| (doc.id, doc.fields)))
    }

    /// Sessions without a readable `created_at` count as expired.
    fn is_expired(&self, fields: &Fields, now_millis: i64) -> bool {
        match fields.get(CREATED_AT_FIELD).and_then(Value::as_i64) {
            Some(created) => now_millis - created >= self.session_ttl.num_milliseconds(),
            None => true,
        }
    }

    async fn prune_sessions(&self, account_id: &RecordId, now_millis: i64) -> AuthResult<()> {
        let sessions = self
            .store
            .query(
                Collection::Sessions,
                &Query::new().where_eq(ACCOUNT_ID_FIELD, account_id.to_string()),
            )
            .await?;

        for session in sessions {
            if self.is_expired(&session.fields, now_millis) {
                self.store.delete(Collection::Sessions, &session.id).await?;
            }
        }
        Ok(())
    }

    async fn open_session(&self, account_id: RecordId) -> AuthResult<Session> {
        let now = Utc::now().timestamp_millis();
        self.prune_sessions(&account_id, now).await?;

        let fields = object(json!({
            ACCOUNT_ID_FIELD: account_id.to_string(),
            CREATED_AT_FIELD: now,
        }));
        let token = self.store.add(Collection::Sessions, fields).await?;
        Ok(Session::new(account_id, token.to_string()))
    }
}

/// Runs Argon2id on the blocking pool.
async fn hash_password(password: &str) -> AuthResult<String> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::Hashing(e.to_string()))
    })
    .await
    .map_err(|e| AuthError::Hashing(e.to_string()))?
}

async fn password_matches(stored: &str, password: &str) -> AuthResult<bool> {
    let stored = stored.to_owned();
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || match PasswordHash::new(&stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!("unreadable password hash: {}", e);
            false
        }
    })
    .await
    .map_err(|e| AuthError::Hashing(e.to_string()))
}

fn object(value: Value) -> Fields {
    match value {
        Value::Object(map) => map,
        _ => Fields::new(),
    }
}

fn str_field<'a>(fields: &'a Fields, name: &str) -> Option<&'a str> {
    fields.get(name).and_then(Value::as_str)
}

#[async_trait]
impl AuthProvider for StoreAuthProvider {
    async fn create_account(&self, email: &EmailAddress, password: &str) -> AuthResult<Session> {
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword(MIN_PASSWORD_LEN));
        }
        let password_hash = hash_password(password).await?;

        let account_id = {
            let _guard = self.create_lock.lock().await;

            if self.find_credential(email).await?.is_some() {
                return Err(AuthError::EmailInUse(email.to_string()));
            }

            let fields = object(json!({
                EMAIL_FIELD: email.as_str(),
                PASSWORD_HASH_FIELD: password_hash,
                CREATED_AT_FIELD: Utc::now().timestamp_millis(),
            }));
            self.store.add(Collection::Credentials, fields).await?
        };

        tracing::info!("created credential {}", account_id);
        self.open_session(account_id).await
    }

    async fn sign_in(&self, email: &EmailAddress, password: &str) -> AuthResult<Session> {
        let (account_id, fields) = self
            .find_credential(email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let stored = str_field(&fields, PASSWORD_HASH_FIELD).unwrap_or_default();
        if !password_matches(stored, password).await? {
            return Err(AuthError::InvalidCredentials);
        }

        self.open_session(account_id).await
    }

    async fn sign_out(&self, token: &str) -> AuthResult<()> {
        let Ok(id) = RecordId::parse(token) else {
            return Ok(());
        };
        self.store.delete(Collection::Sessions, &id).await?;
        Ok(())
    }

    async fn verify(&self, token: &str) -> AuthResult<Option<Session>> {
        let Ok(id) = RecordId::parse(token) else {
            return Ok(None);
        };

        let Some(doc) = self.store.get(Collection::Sessions, &id).await? else {
            return Ok(None);
        };

        if self.is_expired(&doc.fields, Utc::now().timestamp_millis()) {
            self.store.delete(Collection::Sessions, &id).await?;
            tracing::debug!("session {} expired", id);
            return Ok(None);
        }

        let account_id = str_field(&doc.fields, ACCOUNT_ID_FIELD)
            .and_then(|raw| RecordId::parse(raw).ok());
        Ok(account_id.map(|account_id| Session::new(account_id, token)))
    }

    async fn delete_account(&self, account_id: &RecordId) -> AuthResult<()> {
        if self
            .store
            .get(Collection::Credentials, account_id)
            .await?
            .is_none()
        {
            return Err(AuthError::AccountNotFound(account_id.clone()));
        }

        let sessions = self
            .store
            .query(
                Collection::Sessions,
                &Query::new().where_eq(ACCOUNT_ID_FIELD, account_id.to_string()),
            )
            .await?;
        for session in sessions {
            self.store.delete(Collection::Sessions, &session.id).await?;
        }

        self.store.delete(Collection::Credentials, account_id).await?;
        tracing::info!("deleted credential {}", account_id);
        Ok(())
    }
}
