//! Wiring of ports, adapters and services.

use crate::adapters::{FileStore, MemoryStore, StoreAuthProvider};
use crate::config::{CoreConfig, StoreKind};
use crate::ports::{AuthProvider, DocumentStore};
use crate::repositories::access::AccessPolicy;
use crate::repositories::accounts::AccountService;
use crate::repositories::linking::LinkingService;
use crate::repositories::recommendations::RecommendationService;
use crate::repositories::vitals::VitalsService;
use crate::ServiceResult;
use std::sync::Arc;

/// Every service, sharing one store and one auth provider.
///
/// Cheap to clone; the REST state and the CLI both hold one.
#[derive(Clone)]
pub struct Backend {
    pub accounts: AccountService,
    pub linking: LinkingService,
    pub vitals: VitalsService,
    pub recommendations: RecommendationService,
    pub access: AccessPolicy,
}

impl Backend {
    pub fn new(store: Arc<dyn DocumentStore>, auth: Arc<dyn AuthProvider>) -> Self {
        Self {
            accounts: AccountService::new(store.clone(), auth.clone()),
            linking: LinkingService::new(store.clone(), auth.clone()),
            vitals: VitalsService::new(store.clone(), auth.clone()),
            recommendations: RecommendationService::new(store.clone(), auth.clone()),
            access: AccessPolicy::new(store, auth),
        }
    }

    /// Builds the store selected by `cfg` and the auth provider on top of it.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Store` if the filesystem store cannot be opened.
    pub fn from_config(cfg: &CoreConfig) -> ServiceResult<Self> {
        let store: Arc<dyn DocumentStore> = match cfg.store_kind() {
            StoreKind::Memory => Arc::new(MemoryStore::new()),
            StoreKind::Files => Arc::new(FileStore::open(cfg.data_dir())?),
        };
        tracing::info!(
            "using {:?} store at {}",
            cfg.store_kind(),
            cfg.data_dir().display()
        );

        let auth: Arc<dyn AuthProvider> = Arc::new(StoreAuthProvider::new(store.clone()));
        Ok(Self::new(store, auth))
    }

    pub fn in_memory() -> Self {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let auth: Arc<dyn AuthProvider> = Arc::new(StoreAuthProvider::new(store.clone()));
        Self::new(store, auth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::accounts::SignUp;
    use crate::models::{NewVital, Role};
    use crate::settings::Settings;
    use tempfile::TempDir;

    fn sign_up(email: &str) -> SignUp {
        SignUp {
            name: "Ana".into(),
            email: email.into(),
            password: "secret1".into(),
            role: Role::Patient,
            license_id: None,
            specialties: None,
        }
    }

    #[tokio::test]
    async fn test_files_backend_persists_accounts() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cfg = CoreConfig::new(
            temp_dir.path().to_path_buf(),
            StoreKind::Files,
            Settings::default(),
        )
        .unwrap();

        let backend = Backend::from_config(&cfg).expect("backend should open");
        backend
            .accounts
            .sign_up(sign_up("ana@example.com"))
            .await
            .unwrap();

        let reopened = Backend::from_config(&cfg).unwrap();
        let (_, role) = reopened
            .accounts
            .login("ana@example.com", "secret1")
            .await
            .expect("account should survive reopening");
        assert_eq!(role, Role::Patient);
    }

    #[tokio::test]
    async fn test_memory_backends_are_independent() {
        let a = Backend::in_memory();
        let b = Backend::in_memory();
        a.accounts.sign_up(sign_up("ana@example.com")).await.unwrap();

        assert!(b.accounts.login("ana@example.com", "secret1").await.is_err());
    }

    #[tokio::test]
    async fn test_files_backend_link_and_vitals_flow() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cfg = CoreConfig::new(
            temp_dir.path().to_path_buf(),
            StoreKind::Files,
            Settings::default(),
        )
        .unwrap();
        let backend = Backend::from_config(&cfg).unwrap();

        let (doctor, _) = backend
            .accounts
            .sign_up(SignUp {
                role: Role::Doctor,
                license_id: Some("CRM-0001".into()),
                ..sign_up("silva@example.com")
            })
            .await
            .unwrap();
        let (patient, _) = backend
            .accounts
            .sign_up(sign_up("ana@example.com"))
            .await
            .unwrap();
        backend
            .linking
            .link_patient(&doctor, &patient.account_id().to_string())
            .await
            .expect("link should succeed");

        for millis in [2_000, 5_000, 1_000] {
            let vital = NewVital {
                recorded_at: chrono::DateTime::from_timestamp_millis(millis).unwrap(),
                heart_rate: 70,
                blood_pressure: "120/80".into(),
                temperature: 36.5,
                glucose: 90,
                weight: 68.0,
            };
            backend.vitals.add_vital(&patient, vital).await.unwrap();
        }

        let reopened = Backend::from_config(&cfg).unwrap();
        let times: Vec<i64> = reopened
            .vitals
            .vitals_for_patient(patient.account_id())
            .await
            .unwrap()
            .iter()
            .map(|v| v.recorded_at.timestamp_millis())
            .collect();
        assert_eq!(times, vec![5_000, 2_000, 1_000]);

        let by_patient = reopened.vitals.vitals_for_doctor(&doctor).await.unwrap();
        assert_eq!(by_patient.len(), 1);
        assert_eq!(by_patient[patient.account_id()].len(), 3);
    }
}
