//! Import of legacy grading outcomes into a competency framework.
//!
//! Selected site-wide outcomes are validated, their scales summarized, and
//! each one becomes a competency of a new framework. Competency idnumbers are
//! derived from outcome shortnames and made unique within the batch.

pub mod builder;
pub mod catalog;
pub mod domain;
pub mod idnumber;
pub mod repository;
pub mod router;
pub mod scale_config;
pub mod scales;
pub mod service;
pub mod setup;
pub mod validation;

#[cfg(test)]
mod tests;

pub use builder::{build_framework, draft_competency};
pub use catalog::{CatalogLoadError, InMemoryCatalog, MemoryTransaction, NewOutcome};
pub use domain::{
    CompetencyDraft, Competency, CompetencyId, CompetencySpec, ContextId, DescriptionFormat,
    Framework, FrameworkId, FrameworkSpec, ImportResult, Outcome, OutcomeId, Scale, ScaleId,
    ScaleSummaryEntry, Taxonomy, FRAMEWORK_TAXONOMY_DEPTH,
};
pub use idnumber::{allocate_idnumbers, AllocationOrder, IdnumberAllocation};
pub use repository::{
    ImportTransaction, OutcomeRepository, PersistenceError, PersistenceService, RepositoryError,
};
pub use router::import_router;
pub use scale_config::{ScaleConfigError, ScaleConfiguration, ScaleItemSetting};
pub use scales::summarize_scales;
pub use service::{ImportError, ImportOptions, OutcomeImportService};
pub use setup::{FrameworkSetup, ScaleSelection, SetupErrors};
pub use validation::{dedupe_selection, selection_is_importable};
