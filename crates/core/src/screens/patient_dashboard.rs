//! Patient home screen: profile, own vitals, received recommendations.

use crate::backend::Backend;
use crate::models::{Patient, Recommendation, Vital};
use crate::ports::Session;
use crate::screens::{ScreenEvent, ScreenState};
use crate::ServiceResult;
use saude_uuid::RecordId;

#[derive(Clone, Debug, PartialEq)]
pub struct PatientDashboard {
    pub patient: Patient,
    pub vitals: Vec<Vital>,
    pub recommendations: Vec<Recommendation>,
}

pub struct PatientDashboardViewModel {
    backend: Backend,
    state: ScreenState<PatientDashboard>,
    notice: Option<String>,
}

impl PatientDashboardViewModel {
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            state: ScreenState::Idle,
            notice: None,
        }
    }

    pub fn state(&self) -> &ScreenState<PatientDashboard> {
        &self.state
    }

    /// Transient message for failures that do not replace the dashboard.
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    /// Loads profile, then vitals, then recommendations. The first failure ends the load.
    pub async fn load(&mut self, session: &Session) {
        self.state.apply(ScreenEvent::Started);
        let result = self.fetch(session).await;
        self.state.apply(ScreenEvent::from_result(result));
    }

    async fn fetch(&self, session: &Session) -> ServiceResult<PatientDashboard> {
        let patient = self.backend.accounts.current_patient(session).await?;
        let vitals = self.backend.vitals.vitals_for_patient(&patient.id).await?;
        let recommendations = self
            .backend
            .recommendations
            .recommendations_for_patient(&patient.id)
            .await?;

        Ok(PatientDashboard {
            patient,
            vitals,
            recommendations,
        })
    }

    /// Deletes one of the patient's vitals and reloads. A failed delete leaves the dashboard as
    /// it was and sets a notice.
    pub async fn delete_vital(&mut self, session: &Session, vital_id: &RecordId) {
        let result = match self.backend.access.own_vital(session, vital_id).await {
            Ok(vital) => self.backend.vitals.delete_vital(&vital.id).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => self.load(session).await,
            Err(e) => self.notice = Some(e.to_string()),
        }
    }
}
