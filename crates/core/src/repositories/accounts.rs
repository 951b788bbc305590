//! Credentials and profiles.
//!
//! Sign-up is two steps against two collaborators: the auth provider creates the credential,
//! then the profile document is written to `users` under the id the provider assigned. When the
//! profile write fails the credential is deleted again so no orphaned login survives. This is a
//! compensating action, not a transaction: a crash between the two steps can still leave a
//! credential without a profile.

use crate::models::{Doctor, Patient, Profile, Role};
use crate::ports::store::encode;
use crate::ports::{AuthProvider, Collection, DocumentStore, Session};
use crate::repositories::profiles;
use crate::{ServiceError, ServiceResult};
use saude_types::{EmailAddress, NonEmptyText};
use saude_uuid::RecordId;
use std::sync::Arc;

/// Input to [`AccountService::sign_up`].
#[derive(Clone, Debug)]
pub struct SignUp {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    /// Doctors only; ignored for patients.
    pub license_id: Option<String>,
    /// Doctors only; ignored for patients.
    pub specialties: Option<Vec<String>>,
}

#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn DocumentStore>,
    auth: Arc<dyn AuthProvider>,
}

impl AccountService {
    pub fn new(store: Arc<dyn DocumentStore>, auth: Arc<dyn AuthProvider>) -> Self {
        Self { store, auth }
    }

    /// Creates a credential and its profile, returning the signed-in session and the profile.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for an empty name or malformed email
    /// - `Auth` when the provider rejects the credential (email taken, weak password)
    /// - `Store` when the profile write fails and the credential was removed again
    /// - `CompensationFailed` when the profile write fails and the credential could not be removed
    pub async fn sign_up(&self, input: SignUp) -> ServiceResult<(Session, Profile)> {
        let name = NonEmptyText::new(&input.name)?;
        let email = EmailAddress::parse(&input.email)?;

        let session = self.auth.create_account(&email, &input.password).await?;
        let account_id = session.account_id().clone();

        let profile = match input.role {
            Role::Patient => Profile::Patient(Patient {
                id: account_id.clone(),
                name: name.into_inner(),
                email: email.to_string(),
                sharing_code: account_id.to_string(),
            }),
            Role::Doctor => Profile::Doctor(Doctor {
                id: account_id.clone(),
                name: name.into_inner(),
                email: email.to_string(),
                license_id: input.license_id.unwrap_or_default().trim().to_string(),
                specialties: input
                    .specialties
                    .unwrap_or_default()
                    .into_iter()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                linked_patient_ids: Vec::new(),
            }),
        };

        let written = match encode(&profile) {
            Ok(fields) => self.store.set(Collection::Users, &account_id, fields).await,
            Err(e) => Err(e),
        };

        if let Err(write_error) = written {
            tracing::warn!(
                "profile write failed for {}, removing credential: {}",
                account_id,
                write_error
            );
            return match self.auth.delete_account(&account_id).await {
                Ok(()) => Err(ServiceError::Store(write_error)),
                Err(cleanup_error) => {
                    tracing::error!(
                        "could not remove credential {} after failed sign-up: {}",
                        account_id,
                        cleanup_error
                    );
                    Err(ServiceError::CompensationFailed {
                        account_id,
                        write_error,
                        cleanup_error,
                    })
                }
            };
        }

        tracing::info!("signed up {} {}", profile.role(), account_id);
        Ok((session, profile))
    }

    /// Authenticates and reports the account's role so the caller can pick a home screen.
    ///
    /// A credential without a profile is reported as not found and its new session is revoked.
    pub async fn login(&self, email: &str, password: &str) -> ServiceResult<(Session, Role)> {
        let email = EmailAddress::parse(email)?;
        let session = self.auth.sign_in(&email, password).await?;

        match profiles::load_profile(self.store.as_ref(), session.account_id()).await {
            Ok(Some(profile)) => Ok((session, profile.role())),
            Ok(None) => {
                self.revoke_quietly(&session).await;
                Err(ServiceError::NotFound(format!(
                    "profile for account {}",
                    session.account_id()
                )))
            }
            Err(e) => {
                self.revoke_quietly(&session).await;
                Err(e)
            }
        }
    }

    pub async fn logout(&self, session: &Session) -> ServiceResult<()> {
        self.auth.sign_out(session.token()).await?;
        Ok(())
    }

    /// Maps a bearer token to its session.
    pub async fn resolve_session(&self, token: &str) -> ServiceResult<Session> {
        self.auth
            .verify(token)
            .await?
            .ok_or(ServiceError::NotAuthenticated)
    }

    pub async fn current_profile(&self, session: &Session) -> ServiceResult<Profile> {
        let account_id = profiles::authenticate(self.auth.as_ref(), session).await?;
        profiles::require_profile(self.store.as_ref(), &account_id).await
    }

    pub async fn current_doctor(&self, session: &Session) -> ServiceResult<Doctor> {
        let account_id = profiles::authenticate(self.auth.as_ref(), session).await?;
        profiles::require_doctor(self.store.as_ref(), &account_id).await
    }

    pub async fn current_patient(&self, session: &Session) -> ServiceResult<Patient> {
        let account_id = profiles::authenticate(self.auth.as_ref(), session).await?;
        profiles::require_patient(self.store.as_ref(), &account_id).await
    }

    /// Reads any patient's profile. Used by doctors to resolve names of linked patients.
    pub async fn patient_details(&self, id: &RecordId) -> ServiceResult<Patient> {
        profiles::find_patient(self.store.as_ref(), id).await
    }

    async fn revoke_quietly(&self, session: &Session) {
        if let Err(e) = self.auth.sign_out(session.token()).await {
            tracing::warn!("failed to revoke session for {}: {}", session.account_id(), e);
        }
    }
}
