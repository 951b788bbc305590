//! Free-text recommendations from a doctor to a linked patient.

use crate::constants::{MAX_RECOMMENDATION_LEN, PATIENT_ID_FIELD, SENT_AT_FIELD};
use crate::models::Recommendation;
use crate::ports::store::encode;
use crate::ports::{AuthProvider, Collection, Direction, DocumentStore, Query, Session};
use crate::repositories::profiles;
use crate::{ServiceError, ServiceResult};
use chrono::{DateTime, Utc};
use saude_types::NonEmptyText;
use saude_uuid::RecordId;
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
struct StoredRecommendation<'a> {
    patient_id: &'a RecordId,
    doctor_id: &'a RecordId,
    text: &'a str,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    sent_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct RecommendationService {
    store: Arc<dyn DocumentStore>,
    auth: Arc<dyn AuthProvider>,
}

impl RecommendationService {
    pub fn new(store: Arc<dyn DocumentStore>, auth: Arc<dyn AuthProvider>) -> Self {
        Self { store, auth }
    }

    /// Sends `text` from the signed-in doctor to `patient_id`, stamped with the current time.
    ///
    /// # Errors
    ///
    /// - `NotAuthenticated` when the session is no longer valid
    /// - `WrongRole` when the session belongs to a patient
    /// - `InvalidInput` for blank or oversized text
    /// - `NotLinked` when the doctor has not linked this patient
    pub async fn send_recommendation(
        &self,
        session: &Session,
        patient_id: &RecordId,
        text: &str,
    ) -> ServiceResult<Recommendation> {
        let account_id = profiles::authenticate(self.auth.as_ref(), session).await?;
        let doctor = profiles::require_doctor(self.store.as_ref(), &account_id).await?;

        let text = NonEmptyText::new(text)?;
        if text.as_str().chars().count() > MAX_RECOMMENDATION_LEN {
            return Err(ServiceError::InvalidInput(format!(
                "recommendation must be at most {MAX_RECOMMENDATION_LEN} characters"
            )));
        }

        if !doctor.linked_patient_ids.contains(patient_id) {
            return Err(ServiceError::NotLinked(patient_id.clone()));
        }

        let sent_at = Utc::now();
        let fields = encode(&StoredRecommendation {
            patient_id,
            doctor_id: &doctor.id,
            text: text.as_str(),
            sent_at,
        })?;
        let id = self.store.add(Collection::Recommendations, fields).await?;

        tracing::info!(
            "doctor {} sent recommendation {} to patient {}",
            doctor.id,
            id,
            patient_id
        );
        Ok(Recommendation {
            id,
            patient_id: patient_id.clone(),
            doctor_id: doctor.id,
            text: text.into_inner(),
            sent_at,
        })
    }

    pub async fn recommendations_for_patient(
        &self,
        patient_id: &RecordId,
    ) -> ServiceResult<Vec<Recommendation>> {
        let query = Query::new()
            .where_eq(PATIENT_ID_FIELD, patient_id.to_string())
            .order_by(SENT_AT_FIELD, Direction::Descending);

        let docs = self.store.query(Collection::Recommendations, &query).await?;
        docs.iter()
            .map(|doc| doc.decode().map_err(ServiceError::from))
            .collect()
    }
}
