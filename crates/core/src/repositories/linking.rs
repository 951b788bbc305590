//! Doctor to patient links.
//!
//! A patient hands their sharing code to a doctor; the doctor enters it and the patient's id is
//! added to the doctor's `linked_patient_ids` with a set-union update. Links are never removed.

use crate::constants::{LINKED_PATIENTS_FIELD, ROLE_FIELD, SHARING_CODE_FIELD};
use crate::models::{Patient, Role};
use crate::ports::{AuthProvider, Collection, DocumentStore, Query, Session};
use crate::repositories::profiles;
use crate::{ServiceError, ServiceResult};
use saude_uuid::RecordId;
use serde_json::Value;
use std::sync::Arc;

#[derive(Clone)]
pub struct LinkingService {
    store: Arc<dyn DocumentStore>,
    auth: Arc<dyn AuthProvider>,
}

impl LinkingService {
    pub fn new(store: Arc<dyn DocumentStore>, auth: Arc<dyn AuthProvider>) -> Self {
        Self { store, auth }
    }

    /// Links the patient whose sharing code is `code` to the signed-in doctor.
    ///
    /// The union update is issued even when the patient is already linked; set semantics keep
    /// the linked list free of duplicates.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when no patient has this code. The doctor's links are untouched.
    pub async fn link_patient(&self, session: &Session, code: &str) -> ServiceResult<RecordId> {
        let account_id = profiles::authenticate(self.auth.as_ref(), session).await?;
        let doctor = profiles::require_doctor(self.store.as_ref(), &account_id).await?;

        let code = code.trim();
        let query = Query::new()
            .where_eq(SHARING_CODE_FIELD, code)
            .where_eq(ROLE_FIELD, Role::Patient.as_str())
            .limit(1);

        let patient_id = self
            .store
            .query(Collection::Users, &query)
            .await?
            .into_iter()
            .next()
            .map(|doc| doc.id)
            .ok_or_else(|| ServiceError::NotFound(format!("patient with code '{code}'")))?;

        self.store
            .array_union(
                Collection::Users,
                &doctor.id,
                LINKED_PATIENTS_FIELD,
                vec![Value::String(patient_id.to_string())],
            )
            .await?;

        tracing::info!("linked patient {} to doctor {}", patient_id, doctor.id);
        Ok(patient_id)
    }

    /// Profiles of the signed-in doctor's linked patients, in link order.
    ///
    /// Ids whose profile can no longer be read are skipped.
    pub async fn linked_patients(&self, session: &Session) -> ServiceResult<Vec<Patient>> {
        let account_id = profiles::authenticate(self.auth.as_ref(), session).await?;
        let doctor = profiles::require_doctor(self.store.as_ref(), &account_id).await?;

        let mut patients = Vec::with_capacity(doctor.linked_patient_ids.len());
        for id in &doctor.linked_patient_ids {
            match profiles::find_patient(self.store.as_ref(), id).await {
                Ok(patient) => patients.push(patient),
                Err(e) => tracing::warn!("skipping linked patient {}: {}", id, e),
            }
        }

        Ok(patients)
    }
}
