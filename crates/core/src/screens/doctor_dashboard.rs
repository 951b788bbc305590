//! Doctor home screen: linked patients and their vitals, plus the link form.

use crate::backend::Backend;
use crate::models::{Doctor, Patient, Vital};
use crate::ports::Session;
use crate::screens::{ScreenEvent, ScreenState};
use crate::ServiceResult;
use saude_uuid::RecordId;
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq)]
pub struct DoctorDashboard {
    pub doctor: Doctor,
    pub patients: BTreeMap<RecordId, Patient>,
    pub vitals_by_patient: BTreeMap<RecordId, Vec<Vital>>,
}

pub struct DoctorDashboardViewModel {
    backend: Backend,
    state: ScreenState<DoctorDashboard>,
    link_state: ScreenState<RecordId>,
}

impl DoctorDashboardViewModel {
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            state: ScreenState::Idle,
            link_state: ScreenState::Idle,
        }
    }

    pub fn state(&self) -> &ScreenState<DoctorDashboard> {
        &self.state
    }

    pub fn link_state(&self) -> &ScreenState<RecordId> {
        &self.link_state
    }

    /// Loads the doctor, the details of each linked patient and their vitals.
    ///
    /// Only a failure to load the doctor fails the screen. Patients whose details cannot be read
    /// are left out, and a failed vitals fetch shows no vitals.
    pub async fn load(&mut self, session: &Session) {
        self.state.apply(ScreenEvent::Started);
        let result = self.fetch(session).await;
        self.state.apply(ScreenEvent::from_result(result));
    }

    async fn fetch(&self, session: &Session) -> ServiceResult<DoctorDashboard> {
        let doctor = self.backend.accounts.current_doctor(session).await?;

        let mut patients = BTreeMap::new();
        for id in &doctor.linked_patient_ids {
            match self.backend.accounts.patient_details(id).await {
                Ok(patient) => {
                    patients.insert(id.clone(), patient);
                }
                Err(e) => tracing::warn!("leaving out linked patient {}: {}", id, e),
            }
        }

        let vitals_by_patient = match self.backend.vitals.vitals_for_doctor(session).await {
            Ok(map) => map,
            Err(e) => {
                tracing::warn!("failed to load vitals for doctor {}: {}", doctor.id, e);
                BTreeMap::new()
            }
        };

        Ok(DoctorDashboard {
            doctor,
            patients,
            vitals_by_patient,
        })
    }

    /// Links a patient by sharing code and refreshes the dashboard on success.
    pub async fn link_patient(&mut self, session: &Session, code: &str) {
        self.link_state.apply(ScreenEvent::Started);
        let result = self.backend.linking.link_patient(session, code).await;
        let linked = result.is_ok();
        self.link_state.apply(ScreenEvent::from_result(result));

        if linked {
            self.load(session).await;
        }
    }

    pub fn reset_link_state(&mut self) {
        self.link_state.apply(ScreenEvent::Reset);
    }
}
