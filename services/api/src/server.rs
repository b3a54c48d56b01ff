use crate::cli::ServeArgs;
use crate::infra::{artifact_store, load_service, AppState};
use crate::routes::with_risk_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use site_risk::config::AppConfig;
use site_risk::error::AppError;
use site_risk::telemetry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let store = artifact_store(&config.risk).await?;
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        resources: Arc::clone(&store),
    };

    let service = Arc::new(load_service(&store, &config.risk).await?);
    info!(
        strategy = service.strategy().label(),
        artifact_dir = %config.risk.artifact_dir.display(),
        default_score = config.risk.default_score,
        "risk assessment service initialised"
    );

    let app = with_risk_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "site risk service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
