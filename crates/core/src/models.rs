//! Domain records stored in the document store.
//!
//! Every record carries its storage identifier as `id`. The identifier is not part of the stored
//! fields (see [`crate::ports::store::encode`]) and is injected again when a document is decoded.
//! Timestamps are stored as epoch milliseconds.

use crate::{ServiceError, ServiceResult};
use api_shared::dto;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use saude_uuid::RecordId;
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Patient,
    Doctor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Patient => "patient",
            Role::Doctor => "doctor",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "patient" => Ok(Role::Patient),
            "doctor" => Ok(Role::Doctor),
            other => Err(ServiceError::InvalidInput(format!(
                "unknown role '{other}' (expected patient or doctor)"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: RecordId,
    pub name: String,
    pub email: String,
    pub sharing_code: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: RecordId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub license_id: String,
    #[serde(default)]
    pub specialties: Vec<String>,
    #[serde(default)]
    pub linked_patient_ids: Vec<RecordId>,
}

/// A profile document in the `users` collection, tagged by its `role` field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Profile {
    Patient(Patient),
    Doctor(Doctor),
}

impl Profile {
    pub fn id(&self) -> &RecordId {
        match self {
            Profile::Patient(p) => &p.id,
            Profile::Doctor(d) => &d.id,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Profile::Patient(_) => Role::Patient,
            Profile::Doctor(_) => Role::Doctor,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Profile::Patient(p) => &p.name,
            Profile::Doctor(d) => &d.name,
        }
    }
}

/// Measurements submitted by a patient, before the store assigns an id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewVital {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub recorded_at: DateTime<Utc>,
    pub heart_rate: i32,
    pub blood_pressure: String,
    pub temperature: f64,
    pub glucose: i32,
    pub weight: f64,
}

impl NewVital {
    /// Attaches the storage id and owner, producing the stored record.
    pub fn into_vital(self, id: RecordId, patient_id: RecordId) -> Vital {
        Vital {
            id,
            patient_id,
            recorded_at: self.recorded_at,
            heart_rate: self.heart_rate,
            blood_pressure: self.blood_pressure,
            temperature: self.temperature,
            glucose: self.glucose,
            weight: self.weight,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vital {
    pub id: RecordId,
    pub patient_id: RecordId,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub recorded_at: DateTime<Utc>,
    pub heart_rate: i32,
    pub blood_pressure: String,
    pub temperature: f64,
    pub glucose: i32,
    pub weight: f64,
}

impl Vital {
    /// Replaces the measurements, keeping id and owner.
    pub fn with_measurements(self, new: NewVital) -> Vital {
        new.into_vital(self.id, self.patient_id)
    }

    pub fn validate(&self) -> ServiceResult<()> {
        finite_measurement("temperature", self.temperature)?;
        finite_measurement("weight", self.weight)?;
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: RecordId,
    pub patient_id: RecordId,
    pub doctor_id: RecordId,
    pub text: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub sent_at: DateTime<Utc>,
}

/// Converts wire epoch milliseconds, rejecting values chrono cannot represent.
pub fn timestamp_from_millis(millis: i64) -> ServiceResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| ServiceError::InvalidInput(format!("timestamp {millis} is out of range")))
}

/// Fails unless `value` is a finite number. NaN and infinities cannot be stored as JSON.
pub fn finite_measurement(label: &str, value: f64) -> ServiceResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ServiceError::InvalidInput(format!(
            "{label} must be a finite number, got {value}"
        )))
    }
}

impl NewVital {
    /// Checks the decimal measurements before they are written.
    pub fn validate(&self) -> ServiceResult<()> {
        finite_measurement("temperature", self.temperature)?;
        finite_measurement("weight", self.weight)?;
        Ok(())
    }

    /// Builds measurements from a request, stamping `now` when no time was supplied.
    pub fn from_request(req: dto::VitalReq, now: DateTime<Utc>) -> ServiceResult<Self> {
        let recorded_at = match req.recorded_at {
            Some(millis) => timestamp_from_millis(millis)?,
            None => now,
        };

        Ok(Self {
            recorded_at,
            heart_rate: req.heart_rate,
            blood_pressure: req.blood_pressure,
            temperature: req.temperature,
            glucose: req.glucose,
            weight: req.weight,
        })
    }
}

impl From<Patient> for dto::PatientRes {
    fn from(p: Patient) -> Self {
        Self {
            id: p.id.to_string(),
            name: p.name,
            email: p.email,
            sharing_code: p.sharing_code,
        }
    }
}

impl From<Doctor> for dto::DoctorRes {
    fn from(d: Doctor) -> Self {
        Self {
            id: d.id.to_string(),
            name: d.name,
            email: d.email,
            license_id: d.license_id,
            specialties: d.specialties,
            linked_patient_ids: d.linked_patient_ids.iter().map(ToString::to_string).collect(),
        }
    }
}

impl From<Vital> for dto::VitalRes {
    fn from(v: Vital) -> Self {
        Self {
            id: v.id.to_string(),
            patient_id: v.patient_id.to_string(),
            recorded_at: v.recorded_at.timestamp_millis(),
            heart_rate: v.heart_rate,
            blood_pressure: v.blood_pressure,
            temperature: v.temperature,
            glucose: v.glucose,
            weight: v.weight,
        }
    }
}

impl From<Recommendation> for dto::RecommendationRes {
    fn from(r: Recommendation) -> Self {
        Self {
            id: r.id.to_string(),
            patient_id: r.patient_id.to_string(),
            doctor_id: r.doctor_id.to_string(),
            text: r.text,
            sent_at: r.sent_at.timestamp_millis(),
        }
    }
}
