use std::sync::Arc;

use axum::response::Response;
use serde_json::Value;

use crate::outcomes::{
    import_router, AllocationOrder, Competency, CompetencySpec, ContextId, DescriptionFormat,
    Framework, FrameworkSetup, FrameworkSpec, ImportOptions, ImportTransaction, InMemoryCatalog,
    Outcome, OutcomeId, OutcomeImportService, OutcomeRepository, PersistenceError,
    PersistenceService, RepositoryError, Scale, ScaleConfiguration, ScaleId, ScaleItemSetting,
    ScaleSelection,
};

pub(super) type CatalogService = OutcomeImportService<InMemoryCatalog, InMemoryCatalog>;

pub(super) fn build_service() -> (CatalogService, Arc<InMemoryCatalog>) {
    build_service_with_order(AllocationOrder::Selection)
}

pub(super) fn build_service_with_order(
    order: AllocationOrder,
) -> (CatalogService, Arc<InMemoryCatalog>) {
    let catalog = Arc::new(InMemoryCatalog::default());
    let service = OutcomeImportService::new(
        catalog.clone(),
        catalog.clone(),
        ImportOptions {
            idnumber_order: order,
        },
    );
    (service, catalog)
}

pub(super) fn rating_scale(catalog: &InMemoryCatalog, name: &str) -> Scale {
    catalog.add_scale(name, &["Not yet competent", "Competent"])
}

/// Configuration flagging item 1 as both default and proficient.
pub(super) fn first_item_config(scale_id: ScaleId) -> ScaleConfiguration {
    ScaleConfiguration::build(
        scale_id,
        &[ScaleItemSetting {
            id: 1,
            scale_default: true,
            proficient: true,
        }],
    )
}

pub(super) fn selection_for(scale: &Scale) -> ScaleSelection {
    ScaleSelection {
        scale_id: scale.id,
        configuration: first_item_config(scale.id),
    }
}

pub(super) fn framework_setup(scale: &Scale, extra: &[&Scale]) -> FrameworkSetup {
    FrameworkSetup {
        context_id: ContextId(1),
        shortname: "Framework 1".to_string(),
        idnumber: "F1".to_string(),
        description: String::new(),
        description_format: DescriptionFormat::Html,
        scale: selection_for(scale),
        visible: true,
        extra_scales: extra.iter().map(|scale| selection_for(scale)).collect(),
    }
}

pub(super) fn ids(outcomes: &[&Outcome]) -> Vec<OutcomeId> {
    outcomes.iter().map(|outcome| outcome.id).collect()
}

pub(super) fn idnumbers(competencies: &[Competency]) -> Vec<String> {
    competencies
        .iter()
        .map(|competency| competency.idnumber.clone())
        .collect()
}

/// Store whose transactions fail on the n-th competency (1-based).
pub(super) struct FailingStore {
    pub(super) inner: Arc<InMemoryCatalog>,
    pub(super) fail_on: usize,
}

impl PersistenceService for FailingStore {
    fn begin(&self) -> Result<Box<dyn ImportTransaction + '_>, PersistenceError> {
        Ok(Box::new(FailingTransaction {
            inner: self.inner.begin()?,
            remaining: self.fail_on,
        }))
    }
}

struct FailingTransaction<'a> {
    inner: Box<dyn ImportTransaction + 'a>,
    remaining: usize,
}

impl ImportTransaction for FailingTransaction<'_> {
    fn create_framework(&mut self, spec: FrameworkSpec) -> Result<Framework, PersistenceError> {
        self.inner.create_framework(spec)
    }

    fn create_competency(&mut self, spec: CompetencySpec) -> Result<Competency, PersistenceError> {
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            return Err(PersistenceError::Unavailable("disk full".to_string()));
        }
        self.inner.create_competency(spec)
    }

    fn commit(self: Box<Self>) -> Result<(), PersistenceError> {
        self.inner.commit()
    }

    fn rollback(self: Box<Self>) {
        self.inner.rollback()
    }
}

pub(super) struct UnavailableRepository;

impl OutcomeRepository for UnavailableRepository {
    fn find_by_ids(&self, _ids: &[OutcomeId]) -> Result<Vec<Outcome>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn find_all_global(&self) -> Result<Vec<Outcome>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn count_global_matching(&self, _ids: &[OutcomeId]) -> Result<usize, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn find_scales(&self, _ids: &[ScaleId]) -> Result<Vec<Scale>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) fn router_with_service(service: CatalogService) -> axum::Router {
    import_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
