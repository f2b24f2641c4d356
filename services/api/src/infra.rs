use crate::cli::CatalogArgs;
use competency_import::config::{CatalogConfig, ConfigError};
use competency_import::error::AppError;
use competency_import::outcomes::InMemoryCatalog;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Loads the catalog from the CSV exports, command-line paths taking precedence.
pub(crate) fn load_catalog(
    config: &CatalogConfig,
    overrides: &CatalogArgs,
) -> Result<InMemoryCatalog, AppError> {
    let outcomes = overrides
        .outcomes_csv
        .as_ref()
        .or(config.outcomes_csv.as_ref());
    let scales = overrides.scales_csv.as_ref().or(config.scales_csv.as_ref());

    match (outcomes, scales) {
        (Some(outcomes), Some(scales)) => {
            let catalog = InMemoryCatalog::from_paths(outcomes, scales)?;
            info!(
                outcomes = catalog.outcome_count(),
                scales = catalog.scale_count(),
                path = %outcomes.display(),
                "outcome catalog loaded"
            );
            Ok(catalog)
        }
        (None, None) => {
            warn!("no outcome exports configured, starting with an empty catalog");
            Ok(InMemoryCatalog::default())
        }
        _ => Err(ConfigError::IncompleteCatalog.into()),
    }
}
