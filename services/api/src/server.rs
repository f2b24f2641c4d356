use crate::cli::ServeArgs;
use crate::infra::{load_catalog, AppState};
use crate::routes::with_import_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use competency_import::config::AppConfig;
use competency_import::error::AppError;
use competency_import::outcomes::OutcomeImportService;
use competency_import::telemetry;
use std::sync::atomic::Ordering;
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
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let catalog = Arc::new(load_catalog(&config.catalog, &args.catalog)?);
    let import_service = Arc::new(OutcomeImportService::new(
        catalog.clone(),
        catalog,
        config.import.options(),
    ));

    let app = with_import_routes(import_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        order = %config.import.idnumber_order,
        "outcome importer ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
