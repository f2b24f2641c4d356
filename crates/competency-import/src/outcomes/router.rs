use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::domain::{ImportResult, Outcome, OutcomeId, ScaleSummaryEntry};
use super::repository::{OutcomeRepository, PersistenceService};
use super::service::OutcomeImportService;
use super::setup::{FrameworkSetup, SetupErrors};
use crate::error::AppError;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SelectionRequest {
    pub outcome_ids: Vec<OutcomeId>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SelectionValidity {
    pub valid: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImportRequest {
    pub outcome_ids: Vec<OutcomeId>,
    pub framework: FrameworkSetup,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SetupReport {
    pub valid: bool,
    pub errors: SetupErrors,
}

/// Router exposing outcome selection and import endpoints.
pub fn import_router<R, P>(service: Arc<OutcomeImportService<R, P>>) -> Router
where
    R: OutcomeRepository + 'static,
    P: PersistenceService + 'static,
{
    Router::new()
        .route("/api/v1/outcomes", get(list_handler::<R, P>))
        .route("/api/v1/outcomes/validate", post(validate_handler::<R, P>))
        .route("/api/v1/outcomes/scales", post(scales_handler::<R, P>))
        .route("/api/v1/imports", post(import_handler::<R, P>))
        .route("/api/v1/imports/validate", post(setup_handler::<R, P>))
        .with_state(service)
}

pub(crate) async fn list_handler<R, P>(
    State(service): State<Arc<OutcomeImportService<R, P>>>,
) -> Result<Json<Vec<Outcome>>, AppError>
where
    R: OutcomeRepository + 'static,
    P: PersistenceService + 'static,
{
    Ok(Json(service.get_all_importable_outcomes()?))
}

pub(crate) async fn validate_handler<R, P>(
    State(service): State<Arc<OutcomeImportService<R, P>>>,
    Json(request): Json<SelectionRequest>,
) -> Result<Json<SelectionValidity>, AppError>
where
    R: OutcomeRepository + 'static,
    P: PersistenceService + 'static,
{
    let valid = service.validate_outcomes(&request.outcome_ids)?;
    Ok(Json(SelectionValidity { valid }))
}

pub(crate) async fn scales_handler<R, P>(
    State(service): State<Arc<OutcomeImportService<R, P>>>,
    Json(request): Json<SelectionRequest>,
) -> Result<Json<Vec<ScaleSummaryEntry>>, AppError>
where
    R: OutcomeRepository + 'static,
    P: PersistenceService + 'static,
{
    Ok(Json(service.get_scale_summary(&request.outcome_ids)?))
}

pub(crate) async fn setup_handler<R, P>(
    State(service): State<Arc<OutcomeImportService<R, P>>>,
    Json(request): Json<ImportRequest>,
) -> Result<Json<SetupReport>, AppError>
where
    R: OutcomeRepository + 'static,
    P: PersistenceService + 'static,
{
    let errors = service.validate_setup(&request.framework, &request.outcome_ids)?;
    Ok(Json(SetupReport {
        valid: errors.is_empty(),
        errors,
    }))
}

pub(crate) async fn import_handler<R, P>(
    State(service): State<Arc<OutcomeImportService<R, P>>>,
    Json(request): Json<ImportRequest>,
) -> Result<(StatusCode, Json<ImportResult>), AppError>
where
    R: OutcomeRepository + 'static,
    P: PersistenceService + 'static,
{
    let result = service.run_import(&request.framework, &request.outcome_ids)?;
    Ok((StatusCode::CREATED, Json(result)))
}
