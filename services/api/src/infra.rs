use metrics_exporter_prometheus::PrometheusHandle;
use site_risk::config::RiskConfig;
use site_risk::error::AppError;
use site_risk::resources::{FileArtifactSource, GoogleDriveFetcher, ResourceStore};
use site_risk::workflows::risk::RiskAssessmentService;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::info;

pub(crate) type ArtifactStore = ResourceStore<FileArtifactSource>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) resources: Arc<ArtifactStore>,
}

/// Builds the artifact store, attaching a Drive fetcher when file ids are configured.
pub(crate) async fn artifact_store(config: &RiskConfig) -> Result<Arc<ArtifactStore>, AppError> {
    let mut source = FileArtifactSource::from_config(config);

    if let Some(credentials) = config.drive_credentials.as_deref() {
        if !config.drive_file_ids.is_empty() {
            let fetcher =
                GoogleDriveFetcher::from_service_account(credentials, Handle::current()).await?;
            info!(
                files = config.drive_file_ids.len(),
                "drive fetcher attached for missing artifacts"
            );
            source = source.with_fetcher(Box::new(fetcher));
        }
    }

    Ok(Arc::new(ResourceStore::new(source)))
}

/// Loads the store on a blocking thread, then builds the assessment service over it.
pub(crate) async fn load_service(
    store: &Arc<ArtifactStore>,
    config: &RiskConfig,
) -> Result<RiskAssessmentService, AppError> {
    let loader = Arc::clone(store);
    let resources = tokio::task::spawn_blocking(move || loader.load())
        .await
        .map_err(|err| AppError::Io(std::io::Error::other(err)))??;

    Ok(RiskAssessmentService::new(
        resources,
        config.strategy,
        config.default_score,
    )?)
}
