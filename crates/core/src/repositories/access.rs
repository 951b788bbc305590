//! Who may read or change which records.
//!
//! The data services operate on ids directly. The REST API and CLI run these checks first:
//! a patient sees and edits only their own data, a doctor reads data of linked patients.

use crate::models::{Role, Vital};
use crate::ports::{AuthProvider, DocumentStore, Session};
use crate::repositories::profiles;
use crate::repositories::vitals::VitalsService;
use crate::{ServiceError, ServiceResult};
use saude_uuid::RecordId;
use std::sync::Arc;

#[derive(Clone)]
pub struct AccessPolicy {
    store: Arc<dyn DocumentStore>,
    auth: Arc<dyn AuthProvider>,
    vitals: VitalsService,
}

impl AccessPolicy {
    pub fn new(store: Arc<dyn DocumentStore>, auth: Arc<dyn AuthProvider>) -> Self {
        let vitals = VitalsService::new(store.clone(), auth.clone());
        Self {
            store,
            auth,
            vitals,
        }
    }

    /// Allows the patient themself or a doctor linked to them.
    pub async fn read_patient(&self, session: &Session, patient_id: &RecordId) -> ServiceResult<()> {
        let account_id = profiles::authenticate(self.auth.as_ref(), session).await?;
        if &account_id == patient_id {
            return Ok(());
        }

        let doctor = profiles::require_doctor(self.store.as_ref(), &account_id).await?;
        if doctor.linked_patient_ids.contains(patient_id) {
            Ok(())
        } else {
            Err(ServiceError::NotLinked(patient_id.clone()))
        }
    }

    /// Loads a vital the session may read.
    ///
    /// A record the caller may not read is reported as not found, the same as a missing one.
    pub async fn read_vital(&self, session: &Session, vital_id: &RecordId) -> ServiceResult<Vital> {
        profiles::authenticate(self.auth.as_ref(), session).await?;
        let vital = self.vitals.vital_by_id(vital_id).await?;
        match self.read_patient(session, &vital.patient_id).await {
            Ok(()) => Ok(vital),
            Err(ServiceError::NotLinked(_) | ServiceError::WrongRole { .. }) => {
                Err(vital_not_found(vital_id))
            }
            Err(e) => Err(e),
        }
    }

    /// Loads a vital owned by the signed-in patient.
    ///
    /// A linked doctor gets `NotOwner`; anyone else gets not found.
    pub async fn own_vital(&self, session: &Session, vital_id: &RecordId) -> ServiceResult<Vital> {
        let account_id = profiles::authenticate(self.auth.as_ref(), session).await?;
        let vital = self.vitals.vital_by_id(vital_id).await?;
        if vital.patient_id == account_id {
            return Ok(vital);
        }

        self.read_vital(session, vital_id).await?;
        Err(ServiceError::NotOwner(vital.id))
    }

    /// Fails unless the session's profile has `role`.
    pub async fn require_role(&self, session: &Session, role: Role) -> ServiceResult<RecordId> {
        let account_id = profiles::authenticate(self.auth.as_ref(), session).await?;
        let profile = profiles::require_profile(self.store.as_ref(), &account_id).await?;
        if profile.role() != role {
            return Err(ServiceError::WrongRole {
                account_id,
                expected: role,
            });
        }
        Ok(account_id)
    }
}

fn vital_not_found(id: &RecordId) -> ServiceError {
    ServiceError::NotFound(format!("vital record {id}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::test_support::{vital_at, Fixture};

    fn policy(fx: &Fixture) -> AccessPolicy {
        let store: Arc<dyn DocumentStore> = fx.store.clone();
        AccessPolicy::new(store, fx.auth.clone())
    }

    #[tokio::test]
    async fn test_patient_reads_own_data_only() {
        let fx = Fixture::new();
        let ana = fx.patient("Ana", "ana@example.com").await;
        let bia = fx.patient("Bia", "bia@example.com").await;
        let access = policy(&fx);

        access.read_patient(&ana, ana.account_id()).await.unwrap();
        let err = access
            .read_patient(&ana, bia.account_id())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::WrongRole { .. }));
    }

    #[tokio::test]
    async fn test_linked_doctor_reads_patient_vitals() {
        let fx = Fixture::new();
        let (doctor, patient) = fx.linked_pair().await;
        let stranger = fx.doctor("Dr. Costa", "costa@example.com").await;
        let vital = fx
            .vitals
            .add_vital(&patient, vital_at(1_000))
            .await
            .unwrap();
        let access = policy(&fx);

        assert_eq!(access.read_vital(&doctor, &vital.id).await.unwrap(), vital);
        let err = access.read_vital(&stranger, &vital.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_unreadable_vital_looks_missing() {
        let fx = Fixture::new();
        let ana = fx.patient("Ana", "ana@example.com").await;
        let bia = fx.patient("Bia", "bia@example.com").await;
        let vital = fx.vitals.add_vital(&ana, vital_at(1_000)).await.unwrap();
        let access = policy(&fx);

        let existing = access.read_vital(&bia, &vital.id).await.unwrap_err();
        let missing = access.read_vital(&bia, &RecordId::new()).await.unwrap_err();
        assert!(matches!(existing, ServiceError::NotFound(_)));
        assert!(matches!(missing, ServiceError::NotFound(_)));

        let err = access.own_vital(&bia, &vital.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        fx.accounts.logout(&bia).await.unwrap();
        let err = access.read_vital(&bia, &RecordId::new()).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotAuthenticated));
    }

    #[tokio::test]
    async fn test_only_owner_may_change_vital() {
        let fx = Fixture::new();
        let (doctor, patient) = fx.linked_pair().await;
        let vital = fx
            .vitals
            .add_vital(&patient, vital_at(1_000))
            .await
            .unwrap();
        let access = policy(&fx);

        access.own_vital(&patient, &vital.id).await.unwrap();
        let err = access.own_vital(&doctor, &vital.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotOwner(_)));
    }

    #[tokio::test]
    async fn test_require_role() {
        let fx = Fixture::new();
        let (doctor, patient) = fx.linked_pair().await;
        let access = policy(&fx);

        assert_eq!(
            &access.require_role(&doctor, Role::Doctor).await.unwrap(),
            doctor.account_id()
        );
        assert!(matches!(
            access.require_role(&patient, Role::Doctor).await,
            Err(ServiceError::WrongRole { .. })
        ));
    }
}
