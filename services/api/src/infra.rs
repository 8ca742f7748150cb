use doc_intake::auth::AuthService;
use doc_intake::config::{AppConfig, AuthConfig, StorageConfig};
use doc_intake::intake::{IntakeService, KvSubmissionRepository};
use doc_intake::store::{StoreBackend, StoreError};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type SubmissionStore = KvSubmissionRepository<StoreBackend>;

/// Services sharing one key-value store.
pub(crate) struct Services {
    pub(crate) auth: Arc<AuthService<StoreBackend>>,
    pub(crate) intake: Arc<IntakeService<SubmissionStore>>,
}

impl Services {
    pub(crate) fn from_config(config: &AppConfig) -> Result<Self, StoreError> {
        let store = open_store(&config.storage)?;
        Ok(Self::with_store(store, config.auth.clone()))
    }

    pub(crate) fn with_store(store: Arc<StoreBackend>, auth: AuthConfig) -> Self {
        let repository = Arc::new(KvSubmissionRepository::new(store.clone()));
        Self {
            auth: Arc::new(AuthService::new(store, auth)),
            intake: Arc::new(IntakeService::new(repository)),
        }
    }
}

pub(crate) fn open_store(storage: &StorageConfig) -> Result<Arc<StoreBackend>, StoreError> {
    let store = StoreBackend::from_config(storage)?;
    info!(backend = %store.describe(), "key-value store opened");
    Ok(Arc::new(store))
}
