use std::sync::Arc;

use tracing::{info, warn};

use super::builder::build_framework;
use super::domain::{ImportResult, Outcome, OutcomeId, ScaleId, ScaleSummaryEntry};
use super::idnumber::AllocationOrder;
use super::repository::{OutcomeRepository, PersistenceError, PersistenceService, RepositoryError};
use super::scales::summarize_scales;
use super::setup::{FrameworkSetup, SetupErrors};
use super::validation::{dedupe_selection, selection_is_importable};

/// Tunables for the import service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportOptions {
    pub idnumber_order: AllocationOrder,
}

/// Entry point used by the wizard, the HTTP API and the CLI.
pub struct OutcomeImportService<R, P> {
    repository: Arc<R>,
    store: Arc<P>,
    options: ImportOptions,
}

impl<R, P> OutcomeImportService<R, P>
where
    R: OutcomeRepository + 'static,
    P: PersistenceService + 'static,
{
    pub fn new(repository: Arc<R>, store: Arc<P>, options: ImportOptions) -> Self {
        Self {
            repository,
            store,
            options,
        }
    }

    pub fn options(&self) -> ImportOptions {
        self.options
    }

    /// Whether every id refers to an existing site-wide outcome.
    pub fn validate_outcomes(&self, ids: &[OutcomeId]) -> Result<bool, ImportError> {
        Ok(selection_is_importable(self.repository.as_ref(), ids)?)
    }

    /// Scales used by the selected outcomes, most used first.
    pub fn get_scale_summary(
        &self,
        ids: &[OutcomeId],
    ) -> Result<Vec<ScaleSummaryEntry>, ImportError> {
        let outcomes = self.repository.find_by_ids(&dedupe_selection(ids))?;
        let scale_ids = distinct_scales(&outcomes);
        let scales = self.repository.find_scales(&scale_ids)?;
        Ok(summarize_scales(&outcomes, &scales))
    }

    /// Site-wide outcomes available for selection, sorted by shortname.
    pub fn get_all_importable_outcomes(&self) -> Result<Vec<Outcome>, ImportError> {
        Ok(self.repository.find_all_global()?)
    }

    /// Per-field problems with `setup` for the given selection.
    pub fn validate_setup(
        &self,
        setup: &FrameworkSetup,
        ids: &[OutcomeId],
    ) -> Result<SetupErrors, ImportError> {
        if !self.validate_outcomes(ids)? {
            let mut errors = SetupErrors::default();
            errors.insert("outcomes", "the selection contains an invalid outcome");
            return Ok(errors);
        }

        let outcomes = self.repository.find_by_ids(&dedupe_selection(ids))?;
        let scale_ids = distinct_scales(&outcomes);
        let scales = self.repository.find_scales(&scale_ids)?;
        let summary = summarize_scales(&outcomes, &scales);
        let mut errors = setup.validate(&summary, &scales);

        let missing: Vec<String> = scale_ids
            .iter()
            .filter(|scale_id| !scales.iter().any(|scale| scale.id == **scale_id))
            .map(ToString::to_string)
            .collect();
        if !missing.is_empty() {
            errors.insert(
                "outcomes",
                format!(
                    "the selection uses scales that do not exist: {}",
                    missing.join(", ")
                ),
            );
        }
        Ok(errors)
    }

    /// Validates the selection and setup, then creates the framework and competencies.
    ///
    /// Repeated ids are imported once, at their first position.
    pub fn run_import(
        &self,
        setup: &FrameworkSetup,
        ids: &[OutcomeId],
    ) -> Result<ImportResult, ImportError> {
        let selection = dedupe_selection(ids);
        if !self.validate_outcomes(&selection)? {
            warn!(selected = selection.len(), "import rejected: invalid outcome selection");
            return Err(ImportError::InvalidSelection);
        }

        let errors = self.validate_setup(setup, &selection)?;
        if !errors.is_empty() {
            warn!(%errors, "import rejected: invalid framework setup");
            return Err(ImportError::Setup(errors));
        }

        info!(
            selected = selection.len(),
            framework_idnumber = %setup.idnumber,
            order = %self.options.idnumber_order,
            "importing outcomes"
        );

        build_framework(
            self.repository.as_ref(),
            self.store.as_ref(),
            setup.framework_spec(),
            &setup.scale_configs(),
            &selection,
            self.options.idnumber_order,
        )
    }
}

fn distinct_scales(outcomes: &[Outcome]) -> Vec<ScaleId> {
    let mut scale_ids: Vec<ScaleId> = outcomes.iter().map(|outcome| outcome.scale_id).collect();
    scale_ids.sort_unstable();
    scale_ids.dedup();
    scale_ids
}

/// Error raised by the import service.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("one or more selected outcomes do not exist or belong to a course")]
    InvalidSelection,
    #[error("framework setup is invalid: {0}")]
    Setup(SetupErrors),
    #[error("outcome {0} could not be loaded")]
    UnknownOutcome(OutcomeId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}
