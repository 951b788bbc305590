//! A doctor's view of one linked patient: vitals plus the recommendation form.

use crate::backend::Backend;
use crate::models::Vital;
use crate::ports::Session;
use crate::screens::{ScreenEvent, ScreenState};
use saude_uuid::RecordId;

/// Shown once a recommendation was stored.
pub const RECOMMENDATION_SENT: &str = "Recommendation sent";

pub struct PatientVitalsViewModel {
    backend: Backend,
    state: ScreenState<Vec<Vital>>,
    recommendation_state: ScreenState<String>,
}

impl PatientVitalsViewModel {
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            state: ScreenState::Idle,
            recommendation_state: ScreenState::Idle,
        }
    }

    pub fn state(&self) -> &ScreenState<Vec<Vital>> {
        &self.state
    }

    pub fn recommendation_state(&self) -> &ScreenState<String> {
        &self.recommendation_state
    }

    pub async fn load(&mut self, session: &Session, patient_id: &RecordId) {
        self.state.apply(ScreenEvent::Started);
        let result = match self.backend.access.read_patient(session, patient_id).await {
            Ok(()) => self.backend.vitals.vitals_for_patient(patient_id).await,
            Err(e) => Err(e),
        };
        self.state.apply(ScreenEvent::from_result(result));
    }

    pub async fn send_recommendation(&mut self, session: &Session, patient_id: &RecordId, text: &str) {
        self.recommendation_state.apply(ScreenEvent::Started);
        let result = self
            .backend
            .recommendations
            .send_recommendation(session, patient_id, text)
            .await
            .map(|_| RECOMMENDATION_SENT.to_string());
        self.recommendation_state
            .apply(ScreenEvent::from_result(result));
    }

    pub fn reset_recommendation_state(&mut self) {
        self.recommendation_state.apply(ScreenEvent::Reset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::test_support::{doctor_sign_up, patient_sign_up, vital_at};

    #[tokio::test]
    async fn test_doctor_views_vitals_and_recommends() {
        let backend = Backend::in_memory();
        let (doctor, _) = backend
            .accounts
            .sign_up(doctor_sign_up("Dr. Silva", "silva@example.com"))
            .await
            .unwrap();
        let (patient, _) = backend
            .accounts
            .sign_up(patient_sign_up("Ana", "ana@example.com"))
            .await
            .unwrap();
        backend
            .linking
            .link_patient(&doctor, &patient.account_id().to_string())
            .await
            .unwrap();
        backend
            .vitals
            .add_vital(&patient, vital_at(1_000))
            .await
            .unwrap();

        let mut vm = PatientVitalsViewModel::new(backend.clone());
        vm.load(&doctor, patient.account_id()).await;
        assert_eq!(vm.state().success().map(Vec::len), Some(1));

        vm.send_recommendation(&doctor, patient.account_id(), "Walk daily")
            .await;
        assert_eq!(
            vm.recommendation_state().success().map(String::as_str),
            Some(RECOMMENDATION_SENT)
        );

        vm.reset_recommendation_state();
        vm.send_recommendation(&doctor, patient.account_id(), "")
            .await;
        assert!(vm.recommendation_state().error().is_some());
    }

    #[tokio::test]
    async fn test_unlinked_doctor_cannot_view() {
        let backend = Backend::in_memory();
        let (doctor, _) = backend
            .accounts
            .sign_up(doctor_sign_up("Dr. Silva", "silva@example.com"))
            .await
            .unwrap();
        let (patient, _) = backend
            .accounts
            .sign_up(patient_sign_up("Ana", "ana@example.com"))
            .await
            .unwrap();

        let mut vm = PatientVitalsViewModel::new(backend);
        vm.load(&doctor, patient.account_id()).await;
        assert!(vm.state().error().is_some());
    }
}
