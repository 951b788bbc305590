//! Profile lookups shared by the services.

use crate::models::{Doctor, Patient, Profile, Role};
use crate::ports::{AuthProvider, Collection, DocumentStore, Session};
use crate::{ServiceError, ServiceResult};
use saude_uuid::RecordId;

/// Confirms that `session` is still live and returns its account id.
///
/// A revoked or unknown token, or one that now resolves to a different account, yields
/// [`ServiceError::NotAuthenticated`].
pub async fn authenticate(auth: &dyn AuthProvider, session: &Session) -> ServiceResult<RecordId> {
    match auth.verify(session.token()).await? {
        Some(live) if live.account_id() == session.account_id() => Ok(live.account_id().clone()),
        _ => Err(ServiceError::NotAuthenticated),
    }
}

pub async fn load_profile(
    store: &dyn DocumentStore,
    account_id: &RecordId,
) -> ServiceResult<Option<Profile>> {
    match store.get(Collection::Users, account_id).await? {
        Some(doc) => Ok(Some(doc.decode()?)),
        None => Ok(None),
    }
}

pub async fn require_profile(
    store: &dyn DocumentStore,
    account_id: &RecordId,
) -> ServiceResult<Profile> {
    load_profile(store, account_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("profile for account {account_id}")))
}

pub async fn require_patient(
    store: &dyn DocumentStore,
    account_id: &RecordId,
) -> ServiceResult<Patient> {
    match require_profile(store, account_id).await? {
        Profile::Patient(patient) => Ok(patient),
        Profile::Doctor(_) => Err(ServiceError::WrongRole {
            account_id: account_id.clone(),
            expected: Role::Patient,
        }),
    }
}

pub async fn require_doctor(
    store: &dyn DocumentStore,
    account_id: &RecordId,
) -> ServiceResult<Doctor> {
    match require_profile(store, account_id).await? {
        Profile::Doctor(doctor) => Ok(doctor),
        Profile::Patient(_) => Err(ServiceError::WrongRole {
            account_id: account_id.clone(),
            expected: Role::Doctor,
        }),
    }
}

/// Reads a patient profile by id. A missing id and a doctor id are both reported as not found.
pub async fn find_patient(store: &dyn DocumentStore, id: &RecordId) -> ServiceResult<Patient> {
    match load_profile(store, id).await? {
        Some(Profile::Patient(patient)) => Ok(patient),
        _ => Err(ServiceError::NotFound(format!("patient {id}"))),
    }
}
