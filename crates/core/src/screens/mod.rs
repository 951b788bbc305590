//! Per-screen view-models.
//!
//! Every screen's state is a [`ScreenState`] driven only by [`ScreenEvent`]s, so each transition
//! is an explicit step that can be tested without a UI. View-models own their state and expose it
//! read-only; the presentation layer renders whatever state it finds.

pub mod auth;
pub mod doctor_dashboard;
pub mod log_vitals;
pub mod patient_dashboard;
pub mod patient_vitals;

pub use auth::{AuthOutcome, AuthViewModel};
pub use doctor_dashboard::{DoctorDashboard, DoctorDashboardViewModel};
pub use log_vitals::{LogVitalsViewModel, VitalForm};
pub use patient_dashboard::{PatientDashboard, PatientDashboardViewModel};
pub use patient_vitals::PatientVitalsViewModel;

use crate::ServiceResult;

#[derive(Clone, Debug, PartialEq)]
pub enum ScreenState<T> {
    Idle,
    Loading,
    Success(T),
    Error(String),
}

impl<T> Default for ScreenState<T> {
    fn default() -> Self {
        ScreenState::Idle
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ScreenEvent<T> {
    Started,
    Succeeded(T),
    Failed(String),
    Reset,
}

impl<T> ScreenEvent<T> {
    /// The event that settles a finished operation.
    pub fn from_result(result: ServiceResult<T>) -> Self {
        match result {
            Ok(value) => ScreenEvent::Succeeded(value),
            Err(e) => ScreenEvent::Failed(e.to_string()),
        }
    }
}

impl<T> ScreenState<T> {
    /// Applies `event` and returns the next state.
    ///
    /// `Started` and `Reset` are accepted from any state. `Succeeded` and `Failed` only settle a
    /// `Loading` state; anywhere else they are stale and the state is kept.
    #[must_use]
    pub fn next(self, event: ScreenEvent<T>) -> Self {
        match (self, event) {
            (_, ScreenEvent::Started) => ScreenState::Loading,
            (_, ScreenEvent::Reset) => ScreenState::Idle,
            (ScreenState::Loading, ScreenEvent::Succeeded(value)) => ScreenState::Success(value),
            (ScreenState::Loading, ScreenEvent::Failed(message)) => ScreenState::Error(message),
            (state, _) => {
                tracing::debug!("ignoring screen event outside of a load");
                state
            }
        }
    }

    /// In-place form of [`ScreenState::next`].
    pub fn apply(&mut self, event: ScreenEvent<T>) {
        *self = std::mem::replace(self, ScreenState::Idle).next(event);
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, ScreenState::Loading)
    }

    pub fn success(&self) -> Option<&T> {
        match self {
            ScreenState::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ScreenState::Error(message) => Some(message),
            _ => None,
        }
    }
}
