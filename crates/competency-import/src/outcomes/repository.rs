use super::domain::{
    Competency, CompetencySpec, Framework, FrameworkId, FrameworkSpec, Outcome, OutcomeId, Scale,
    ScaleId,
};
use super::scale_config::ScaleConfigError;

/// Read-only access to legacy outcomes and their scales.
pub trait OutcomeRepository: Send + Sync {
    /// Outcomes matching `ids` in repository order (ascending id). Unknown ids are skipped.
    fn find_by_ids(&self, ids: &[OutcomeId]) -> Result<Vec<Outcome>, RepositoryError>;
    /// Every site-wide outcome, sorted by shortname.
    fn find_all_global(&self) -> Result<Vec<Outcome>, RepositoryError>;
    /// How many of `ids` exist and are not scoped to a course.
    fn count_global_matching(&self, ids: &[OutcomeId]) -> Result<usize, RepositoryError>;
    fn find_scales(&self, ids: &[ScaleId]) -> Result<Vec<Scale>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("outcome repository unavailable: {0}")]
    Unavailable(String),
}

/// Storage boundary creating frameworks and competencies.
///
/// All records of one import are created through a single transaction so the
/// batch is either published in full or not at all.
pub trait PersistenceService: Send + Sync {
    fn begin(&self) -> Result<Box<dyn ImportTransaction + '_>, PersistenceError>;
}

/// Unit of work opened by [`PersistenceService::begin`].
///
/// Dropping a transaction without committing discards everything it staged.
pub trait ImportTransaction {
    fn create_framework(&mut self, spec: FrameworkSpec) -> Result<Framework, PersistenceError>;
    fn create_competency(&mut self, spec: CompetencySpec) -> Result<Competency, PersistenceError>;
    fn commit(self: Box<Self>) -> Result<(), PersistenceError>;
    fn rollback(self: Box<Self>);
}

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("a framework with idnumber '{0}' already exists")]
    DuplicateFrameworkIdnumber(String),
    #[error("framework {framework_id} already has a competency with idnumber '{idnumber}'")]
    DuplicateCompetencyIdnumber {
        framework_id: FrameworkId,
        idnumber: String,
    },
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("scale {0} does not exist")]
    UnknownScale(ScaleId),
    #[error("framework {0} does not exist")]
    UnknownFramework(FrameworkId),
    #[error("invalid configuration for scale {scale_id}: {source}")]
    InvalidScaleConfiguration {
        scale_id: ScaleId,
        #[source]
        source: ScaleConfigError,
    },
    #[error("persistence unavailable: {0}")]
    Unavailable(String),
}
