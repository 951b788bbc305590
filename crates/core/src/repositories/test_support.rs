//! Fixtures shared by the service tests.

use crate::adapters::{MemoryStore, StoreAuthProvider};
use crate::models::{NewVital, Role};
use crate::ports::{
    AuthProvider, Collection, Document, DocumentStore, Fields, Query, Session, StoreError,
    StoreResult,
};
use crate::repositories::accounts::{AccountService, SignUp};
use crate::repositories::linking::LinkingService;
use crate::repositories::recommendations::RecommendationService;
use crate::repositories::vitals::VitalsService;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use saude_uuid::RecordId;
use serde_json::Value;
use std::sync::Arc;

/// All services over one in-memory store.
pub(crate) struct Fixture {
    pub store: Arc<MemoryStore>,
    pub auth: Arc<dyn AuthProvider>,
    pub accounts: AccountService,
    pub linking: LinkingService,
    pub vitals: VitalsService,
    pub recommendations: RecommendationService,
}

impl Fixture {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let dyn_store: Arc<dyn DocumentStore> = store.clone();
        let auth: Arc<dyn AuthProvider> = Arc::new(StoreAuthProvider::new(dyn_store.clone()));

        Self {
            store,
            accounts: AccountService::new(dyn_store.clone(), auth.clone()),
            linking: LinkingService::new(dyn_store.clone(), auth.clone()),
            vitals: VitalsService::new(dyn_store.clone(), auth.clone()),
            recommendations: RecommendationService::new(dyn_store, auth.clone()),
            auth,
        }
    }

    pub async fn patient(&self, name: &str, email: &str) -> Session {
        self.accounts
            .sign_up(patient_sign_up(name, email))
            .await
            .expect("patient sign up should succeed")
            .0
    }

    pub async fn doctor(&self, name: &str, email: &str) -> Session {
        self.accounts
            .sign_up(doctor_sign_up(name, email))
            .await
            .expect("doctor sign up should succeed")
            .0
    }

    /// Signs up a doctor and a patient and links them.
    pub async fn linked_pair(&self) -> (Session, Session) {
        let doctor = self.doctor("Dr. Silva", "silva@example.com").await;
        let patient = self.patient("Ana", "ana@example.com").await;
        self.linking
            .link_patient(&doctor, &patient.account_id().to_string())
            .await
            .expect("link should succeed");
        (doctor, patient)
    }
}

pub(crate) fn patient_sign_up(name: &str, email: &str) -> SignUp {
    SignUp {
        name: name.into(),
        email: email.into(),
        password: "secret1".into(),
        role: Role::Patient,
        license_id: None,
        specialties: None,
    }
}

pub(crate) fn doctor_sign_up(name: &str, email: &str) -> SignUp {
    SignUp {
        role: Role::Doctor,
        license_id: Some("CRM-0001".into()),
        ..patient_sign_up(name, email)
    }
}

pub(crate) fn at(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).expect("valid test timestamp")
}

pub(crate) fn vital_at(millis: i64) -> NewVital {
    NewVital {
        recorded_at: at(millis),
        heart_rate: 70,
        blood_pressure: "120/80".into(),
        temperature: 36.5,
        glucose: 90,
        weight: 68.0,
    }
}

/// Memory store whose writes to `users` always fail.
pub(crate) struct FailingUsersStore {
    inner: MemoryStore,
}

impl FailingUsersStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
        }
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }
}

#[async_trait]
impl DocumentStore for FailingUsersStore {
    async fn get(&self, collection: Collection, id: &RecordId) -> StoreResult<Option<Document>> {
        self.inner.get(collection, id).await
    }

    async fn set(&self, collection: Collection, id: &RecordId, fields: Fields) -> StoreResult<()> {
        if collection == Collection::Users {
            return Err(StoreError::Unavailable("users collection is read-only".into()));
        }
        self.inner.set(collection, id, fields).await
    }

    async fn add(&self, collection: Collection, fields: Fields) -> StoreResult<RecordId> {
        self.inner.add(collection, fields).await
    }

    async fn delete(&self, collection: Collection, id: &RecordId) -> StoreResult<()> {
        self.inner.delete(collection, id).await
    }

    async fn query(&self, collection: Collection, query: &Query) -> StoreResult<Vec<Document>> {
        self.inner.query(collection, query).await
    }

    async fn array_union(
        &self,
        collection: Collection,
        id: &RecordId,
        field: &str,
        values: Vec<Value>,
    ) -> StoreResult<()> {
        self.inner.array_union(collection, id, field, values).await
    }
}
