//! Vital sign records.
//!
//! Records live in the `vitals` collection and reference their patient through `patient_id`.
//! Every list is ordered by `recorded_at`, most recent first.

use crate::constants::{PATIENT_ID_FIELD, RECORDED_AT_FIELD};
use crate::models::{NewVital, Vital};
use crate::ports::store::encode;
use crate::ports::{AuthProvider, Collection, Direction, DocumentStore, Query, Session};
use crate::repositories::profiles;
use crate::{ServiceError, ServiceResult};
use saude_uuid::RecordId;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Clone)]
pub struct VitalsService {
    store: Arc<dyn DocumentStore>,
    auth: Arc<dyn AuthProvider>,
}

impl VitalsService {
    pub fn new(store: Arc<dyn DocumentStore>, auth: Arc<dyn AuthProvider>) -> Self {
        Self { store, auth }
    }

    /// Stores `vital` for the signed-in patient.
    pub async fn add_vital(&self, session: &Session, vital: NewVital) -> ServiceResult<Vital> {
        let account_id = profiles::authenticate(self.auth.as_ref(), session).await?;
        let patient = profiles::require_patient(self.store.as_ref(), &account_id).await?;
        vital.validate()?;

        let mut fields = encode(&vital)?;
        fields.insert(
            PATIENT_ID_FIELD.to_string(),
            Value::String(patient.id.to_string()),
        );

        let id = self.store.add(Collection::Vitals, fields).await?;
        tracing::info!("recorded vital {} for patient {}", id, patient.id);
        Ok(vital.into_vital(id, patient.id))
    }

    pub async fn vitals_for_patient(&self, patient_id: &RecordId) -> ServiceResult<Vec<Vital>> {
        let query = Query::new()
            .where_eq(PATIENT_ID_FIELD, patient_id.to_string())
            .order_by(RECORDED_AT_FIELD, Direction::Descending);

        let docs = self.store.query(Collection::Vitals, &query).await?;
        docs.iter()
            .map(|doc| doc.decode().map_err(ServiceError::from))
            .collect()
    }

    /// Vitals of every patient linked to the signed-in doctor, one entry per linked patient.
    ///
    /// Patients are fetched one after another. A patient whose vitals cannot be read gets an
    /// empty list instead of failing the whole call.
    pub async fn vitals_for_doctor(
        &self,
        session: &Session,
    ) -> ServiceResult<BTreeMap<RecordId, Vec<Vital>>> {
        let account_id = profiles::authenticate(self.auth.as_ref(), session).await?;
        let doctor = profiles::require_doctor(self.store.as_ref(), &account_id).await?;

        let mut by_patient = BTreeMap::new();
        for patient_id in doctor.linked_patient_ids {
            let vitals = match self.vitals_for_patient(&patient_id).await {
                Ok(vitals) => vitals,
                Err(e) => {
                    tracing::warn!("failed to load vitals for patient {}: {}", patient_id, e);
                    Vec::new()
                }
            };
            by_patient.insert(patient_id, vitals);
        }

        Ok(by_patient)
    }

    /// Replaces the stored record with `vital`. The record must already exist.
    pub async fn update_vital(&self, vital: &Vital) -> ServiceResult<()> {
        vital.validate()?;
        if self.store.get(Collection::Vitals, &vital.id).await?.is_none() {
            return Err(ServiceError::NotFound(format!("vital record {}", vital.id)));
        }

        self.store
            .set(Collection::Vitals, &vital.id, encode(vital)?)
            .await?;
        tracing::info!("updated vital {}", vital.id);
        Ok(())
    }

    /// Removes a record. Deleting an absent record succeeds.
    pub async fn delete_vital(&self, id: &RecordId) -> ServiceResult<()> {
        self.store.delete(Collection::Vitals, id).await?;
        tracing::info!("deleted vital {}", id);
        Ok(())
    }

    pub async fn vital_by_id(&self, id: &RecordId) -> ServiceResult<Vital> {
        match self.store.get(Collection::Vitals, id).await? {
            Some(doc) => Ok(doc.decode()?),
            None => Err(ServiceError::NotFound(format!("vital record {id}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::test_support::{at, vital_at, Fixture};

    #[tokio::test]
    async fn test_add_vital_stamps_patient() {
        let fx = Fixture::new();
        let patient = fx.patient("Ana", "ana@example.com").await;

        let vital = fx
            .vitals
            .add_vital(&patient, vital_at(1_000))
            .await
            .expect("add should succeed");
        assert_eq!(&vital.patient_id, patient.account_id());

        let stored = fx.vitals.vital_by_id(&vital.id).await.unwrap();
        assert_eq!(stored, vital);
    }

    #[tokio::test]
    async fn test_doctor_cannot_add_vital() {
        let fx = Fixture::new();
        let doctor = fx.doctor("Dr. Silva", "silva@example.com").await;

        let err = fx
            .vitals
            .add_vital(&doctor, vital_at(1_000))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::WrongRole { .. }));
        assert_eq!(fx.store.len(Collection::Vitals).await, 0);
    }

    #[tokio::test]
    async fn test_vitals_for_patient_most_recent_first() {
        let fx = Fixture::new();
        let patient = fx.patient("Ana", "ana@example.com").await;
        let other = fx.patient("Bia", "bia@example.com").await;

        for millis in [2_000, 5_000, 3_000] {
            fx.vitals
                .add_vital(&patient, vital_at(millis))
                .await
                .unwrap();
        }
        fx.vitals.add_vital(&other, vital_at(4_000)).await.unwrap();

        let vitals = fx
            .vitals
            .vitals_for_patient(patient.account_id())
            .await
            .unwrap();
        let times: Vec<i64> = vitals
            .iter()
            .map(|v| v.recorded_at.timestamp_millis())
            .collect();
        assert_eq!(times, vec![5_000, 3_000, 2_000]);

        // An earlier record than all others lands last.
        fx.vitals.add_vital(&patient, vital_at(1_000)).await.unwrap();
        let vitals = fx
            .vitals
            .vitals_for_patient(patient.account_id())
            .await
            .unwrap();
        assert_eq!(vitals.last().unwrap().recorded_at, at(1_000));
        assert_eq!(vitals.len(), 4);
    }

    #[tokio::test]
    async fn test_delete_then_get_is_not_found() {
        let fx = Fixture::new();
        let patient = fx.patient("Ana", "ana@example.com").await;
        let vital = fx
            .vitals
            .add_vital(&patient, vital_at(1_000))
            .await
            .unwrap();

        fx.vitals.delete_vital(&vital.id).await.unwrap();

        let err = fx.vitals.vital_by_id(&vital.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
        fx.vitals
            .delete_vital(&vital.id)
            .await
            .expect("second delete should succeed");
    }

    #[tokio::test]
    async fn test_update_vital_replaces_measurements() {
        let fx = Fixture::new();
        let patient = fx.patient("Ana", "ana@example.com").await;
        let vital = fx
            .vitals
            .add_vital(&patient, vital_at(1_000))
            .await
            .unwrap();

        let mut changed = vital_at(2_000);
        changed.heart_rate = 99;
        let updated = vital.clone().with_measurements(changed);
        fx.vitals.update_vital(&updated).await.unwrap();

        let stored = fx.vitals.vital_by_id(&vital.id).await.unwrap();
        assert_eq!(stored.heart_rate, 99);
        assert_eq!(stored.recorded_at, at(2_000));
        assert_eq!(stored.patient_id, vital.patient_id);
    }

    #[tokio::test]
    async fn test_update_missing_vital_is_not_found() {
        let fx = Fixture::new();
        let patient = fx.patient("Ana", "ana@example.com").await;
        let ghost = vital_at(1_000).into_vital(RecordId::new(), patient.account_id().clone());

        let err = fx.vitals.update_vital(&ghost).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
        assert_eq!(fx.store.len(Collection::Vitals).await, 0);
    }

    #[tokio::test]
    async fn test_vitals_for_doctor_without_links_is_empty() {
        let fx = Fixture::new();
        let doctor = fx.doctor("Dr. Silva", "silva@example.com").await;

        let map = fx.vitals.vitals_for_doctor(&doctor).await.unwrap();
        assert!(map.is_empty());
    }

    #[tokio::test]
    async fn test_vitals_for_doctor_has_entry_per_linked_patient() {
        let fx = Fixture::new();
        let (doctor, ana) = fx.linked_pair().await;
        let bia = fx.patient("Bia", "bia@example.com").await;
        fx.linking
            .link_patient(&doctor, &bia.account_id().to_string())
            .await
            .unwrap();

        fx.vitals.add_vital(&ana, vital_at(1_000)).await.unwrap();
        fx.vitals.add_vital(&ana, vital_at(2_000)).await.unwrap();

        let map = fx.vitals.vitals_for_doctor(&doctor).await.unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map[ana.account_id()].len(), 2);
        assert!(map[bia.account_id()].is_empty());
    }

    #[tokio::test]
    async fn test_vitals_for_doctor_isolates_unreadable_patient() {
        let fx = Fixture::new();
        let (doctor, ana) = fx.linked_pair().await;
        fx.vitals.add_vital(&ana, vital_at(1_000)).await.unwrap();

        // A record whose fields no longer decode makes this patient's fetch fail.
        let broken = match serde_json::json!({
            "patient_id": ana.account_id().to_string(),
            "recorded_at": 5_000,
        }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        fx.store.add(Collection::Vitals, broken).await.unwrap();

        let map = fx.vitals.vitals_for_doctor(&doctor).await.unwrap();
        assert_eq!(map.len(), 1);
        assert!(map[ana.account_id()].is_empty());
    }

    #[tokio::test]
    async fn test_non_finite_measurements_are_never_stored() {
        let fx = Fixture::new();
        let patient = fx.patient("Ana", "ana@example.com").await;
        let kept = fx
            .vitals
            .add_vital(&patient, vital_at(1_000))
            .await
            .unwrap();

        let mut nan = vital_at(2_000);
        nan.temperature = f64::NAN;
        let err = fx.vitals.add_vital(&patient, nan).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));

        let mut infinite = vital_at(2_000);
        infinite.weight = f64::INFINITY;
        let err = fx
            .vitals
            .update_vital(&kept.clone().with_measurements(infinite))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));

        let vitals = fx
            .vitals
            .vitals_for_patient(patient.account_id())
            .await
            .expect("patient list should stay readable");
        assert_eq!(vitals, vec![kept]);
    }
}
