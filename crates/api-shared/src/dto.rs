//! Wire types of the REST API.
//!
//! Identifiers travel as canonical 32-character lowercase hex strings and timestamps as epoch
//! milliseconds.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SignUpReq {
    pub name: String,
    pub email: String,
    pub password: String,
    /// `patient` or `doctor`.
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialties: Option<Vec<String>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LoginReq {
    pub email: String,
    pub password: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SessionRes {
    pub token: String,
    pub account_id: String,
    pub role: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PatientRes {
    pub id: String,
    pub name: String,
    pub email: String,
    pub sharing_code: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DoctorRes {
    pub id: String,
    pub name: String,
    pub email: String,
    pub license_id: String,
    pub specialties: Vec<String>,
    pub linked_patient_ids: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LinkPatientReq {
    pub code: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LinkPatientRes {
    pub patient_id: String,
}

/// Vital measurements as submitted by a patient.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VitalReq {
    /// Epoch milliseconds; the server time is used when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recorded_at: Option<i64>,
    pub heart_rate: i32,
    /// Free text such as `120/80`.
    pub blood_pressure: String,
    pub temperature: f64,
    pub glucose: i32,
    pub weight: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VitalRes {
    pub id: String,
    pub patient_id: String,
    pub recorded_at: i64,
    pub heart_rate: i32,
    pub blood_pressure: String,
    pub temperature: f64,
    pub glucose: i32,
    pub weight: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ListVitalsRes {
    pub vitals: Vec<VitalRes>,
}

/// Vitals of every linked patient, keyed by patient id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DoctorVitalsRes {
    pub patients: BTreeMap<String, Vec<VitalRes>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ListPatientsRes {
    pub patients: Vec<PatientRes>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RecommendationReq {
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RecommendationRes {
    pub id: String,
    pub patient_id: String,
    pub doctor_id: String,
    pub text: String,
    pub sent_at: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ListRecommendationsRes {
    pub recommendations: Vec<RecommendationRes>,
}
