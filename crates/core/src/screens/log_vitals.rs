//! Vital entry form.

use crate::backend::Backend;
use crate::models::{finite_measurement, NewVital, Vital};
use crate::ports::Session;
use crate::screens::{ScreenEvent, ScreenState};
use crate::{ServiceError, ServiceResult};
use chrono::{DateTime, Utc};
use std::str::FromStr;

/// Raw text of the entry form.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VitalForm {
    pub heart_rate: String,
    pub blood_pressure: String,
    pub temperature: String,
    pub glucose: String,
    pub weight: String,
}

fn parse_field<T: FromStr>(label: &str, raw: &str) -> ServiceResult<T> {
    let raw = raw.trim().replace(',', ".");
    raw.parse()
        .map_err(|_| ServiceError::InvalidInput(format!("{label} is not a valid number: '{raw}'")))
}

fn parse_decimal(label: &str, raw: &str) -> ServiceResult<f64> {
    finite_measurement(label, parse_field(label, raw)?)
}

impl VitalForm {
    /// Parses the form into measurements taken at `recorded_at`.
    ///
    /// A decimal comma is accepted for the decimal fields.
    pub fn parse(&self, recorded_at: DateTime<Utc>) -> ServiceResult<NewVital> {
        let blood_pressure = self.blood_pressure.trim();
        if blood_pressure.is_empty() {
            return Err(ServiceError::InvalidInput(
                "blood pressure cannot be empty".into(),
            ));
        }

        Ok(NewVital {
            recorded_at,
            heart_rate: parse_field("heart rate", &self.heart_rate)?,
            blood_pressure: blood_pressure.to_string(),
            temperature: parse_decimal("temperature", &self.temperature)?,
            glucose: parse_field("glucose", &self.glucose)?,
            weight: parse_decimal("weight", &self.weight)?,
        })
    }
}

pub struct LogVitalsViewModel {
    backend: Backend,
    state: ScreenState<Vital>,
}

impl LogVitalsViewModel {
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            state: ScreenState::Idle,
        }
    }

    pub fn state(&self) -> &ScreenState<Vital> {
        &self.state
    }

    pub async fn submit(&mut self, session: &Session, form: &VitalForm) {
        self.state.apply(ScreenEvent::Started);
        let result = match form.parse(Utc::now()) {
            Ok(vital) => self.backend.vitals.add_vital(session, vital).await,
            Err(e) => Err(e),
        };
        self.state.apply(ScreenEvent::from_result(result));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::test_support::{at, patient_sign_up};

    fn form() -> VitalForm {
        VitalForm {
            heart_rate: "72".into(),
            blood_pressure: "120/80".into(),
            temperature: "36,6".into(),
            glucose: "95".into(),
            weight: " 70.5 ".into(),
        }
    }

    #[test]
    fn test_parse_accepts_decimal_comma() {
        let vital = form().parse(at(1_000)).expect("form should parse");
        assert_eq!(vital.heart_rate, 72);
        assert!((vital.temperature - 36.6).abs() < f64::EPSILON);
        assert!((vital.weight - 70.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_rejects_bad_numbers() {
        let mut bad = form();
        bad.heart_rate = "fast".into();
        let err = bad.parse(at(1_000)).unwrap_err();
        assert!(err.to_string().contains("heart rate"));

        let mut bad = form();
        bad.blood_pressure = " ".into();
        assert!(bad.parse(at(1_000)).is_err());
    }

    #[test]
    fn test_parse_rejects_non_finite_decimals() {
        for raw in ["NaN", "inf", "-infinity"] {
            let mut bad = form();
            bad.temperature = raw.into();
            let err = bad.parse(at(1_000)).expect_err("non-finite temperature should fail");
            assert!(matches!(err, ServiceError::InvalidInput(_)));
            assert!(err.to_string().contains("temperature"));

            let mut bad = form();
            bad.weight = raw.into();
            assert!(bad.parse(at(1_000)).is_err());
        }
    }

    #[tokio::test]
    async fn test_submit_stores_vital() {
        let backend = Backend::in_memory();
        let (session, _) = backend
            .accounts
            .sign_up(patient_sign_up("Ana", "ana@example.com"))
            .await
            .unwrap();

        let mut vm = LogVitalsViewModel::new(backend.clone());
        vm.submit(&session, &form()).await;

        let saved = vm.state().success().expect("submit should succeed").clone();
        assert_eq!(backend.vitals.vital_by_id(&saved.id).await.unwrap(), saved);
    }

    #[tokio::test]
    async fn test_submit_invalid_form_shows_error() {
        let backend = Backend::in_memory();
        let (session, _) = backend
            .accounts
            .sign_up(patient_sign_up("Ana", "ana@example.com"))
            .await
            .unwrap();

        let mut vm = LogVitalsViewModel::new(backend);
        let mut bad = form();
        bad.glucose = String::new();
        vm.submit(&session, &bad).await;

        assert!(vm.state().error().is_some());
    }

    #[tokio::test]
    async fn test_submit_nan_keeps_patient_list_readable() {
        let backend = Backend::in_memory();
        let (session, _) = backend
            .accounts
            .sign_up(patient_sign_up("Ana", "ana@example.com"))
            .await
            .unwrap();

        let mut vm = LogVitalsViewModel::new(backend.clone());
        vm.submit(&session, &form()).await;
        let mut bad = form();
        bad.temperature = "NaN".into();
        vm.submit(&session, &bad).await;
        assert!(vm.state().error().is_some());

        let vitals = backend
            .vitals
            .vitals_for_patient(session.account_id())
            .await
            .expect("stored vitals should still decode");
        assert_eq!(vitals.len(), 1);
    }
}
