//! In-memory outcome catalog and competency store.

mod loader;

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::Utc;
use tracing::debug;

use super::domain::{
    Competency, CompetencyId, CompetencySpec, DescriptionFormat, Framework, FrameworkId,
    FrameworkSpec, Outcome, OutcomeId, Scale, ScaleId,
};
use super::repository::{
    ImportTransaction, OutcomeRepository, PersistenceError, PersistenceService, RepositoryError,
};
use super::scale_config::ScaleConfiguration;

pub use loader::CatalogLoadError;

/// Fields for an outcome added through [`InMemoryCatalog::add_outcome`].
#[derive(Debug, Clone, Default)]
pub struct NewOutcome {
    pub shortname: Option<String>,
    pub fullname: Option<String>,
    pub description: Option<String>,
    pub description_format: Option<DescriptionFormat>,
    pub scale_id: ScaleId,
    pub course_id: Option<u64>,
}

impl NewOutcome {
    pub fn on_scale(scale_id: ScaleId) -> Self {
        Self {
            scale_id,
            ..Self::default()
        }
    }

    pub fn shortname(mut self, shortname: impl Into<String>) -> Self {
        self.shortname = Some(shortname.into());
        self
    }

    pub fn in_course(mut self, course_id: u64) -> Self {
        self.course_id = Some(course_id);
        self
    }
}

#[derive(Default)]
struct CatalogState {
    scales: BTreeMap<ScaleId, Scale>,
    outcomes: BTreeMap<OutcomeId, Outcome>,
    frameworks: BTreeMap<FrameworkId, Framework>,
    competencies: BTreeMap<CompetencyId, Competency>,
}

impl CatalogState {
    fn framework_idnumber_taken(&self, idnumber: &str) -> bool {
        self.frameworks
            .values()
            .any(|framework| framework.idnumber == idnumber)
    }

    fn competency_idnumber_taken(&self, framework_id: FrameworkId, idnumber: &str) -> bool {
        self.competencies.values().any(|competency| {
            competency.framework_id == framework_id && competency.idnumber == idnumber
        })
    }
}

/// Outcome repository and competency store backed by process memory.
///
/// Imports run through [`MemoryTransaction`], which stages records and only
/// publishes them on commit.
#[derive(Default)]
pub struct InMemoryCatalog {
    state: Mutex<CatalogState>,
    outcome_sequence: AtomicU64,
    scale_sequence: AtomicU64,
    framework_sequence: AtomicU64,
    competency_sequence: AtomicU64,
}

fn next_id(sequence: &AtomicU64) -> u64 {
    sequence.fetch_add(1, Ordering::Relaxed) + 1
}

impl InMemoryCatalog {
    /// Loads outcome and scale CSV exports from disk.
    pub fn from_paths<P: AsRef<Path>, Q: AsRef<Path>>(
        outcomes: P,
        scales: Q,
    ) -> Result<Self, CatalogLoadError> {
        let outcomes = std::fs::File::open(outcomes)?;
        let scales = std::fs::File::open(scales)?;
        Self::from_readers(outcomes, scales)
    }

    pub fn from_readers<O: Read, S: Read>(outcomes: O, scales: S) -> Result<Self, CatalogLoadError> {
        let catalog = Self::default();
        for scale in loader::parse_scales(scales)? {
            catalog.insert_scale(scale)?;
        }
        for outcome in loader::parse_outcomes(outcomes)? {
            catalog.insert_outcome(outcome)?;
        }
        Ok(catalog)
    }

    /// Adds a scale with the next free id.
    pub fn add_scale(&self, name: impl Into<String>, items: &[&str]) -> Scale {
        let mut state = self.state.lock().expect("catalog mutex poisoned");
        let id = ScaleId(next_id(&self.scale_sequence));
        let scale = Scale {
            id,
            name: name.into(),
            items: items.iter().map(|item| item.to_string()).collect(),
        };
        state.scales.insert(id, scale.clone());
        scale
    }

    /// Adds an outcome with the next free id, filling in generated names.
    pub fn add_outcome(&self, outcome: NewOutcome) -> Outcome {
        let mut state = self.state.lock().expect("catalog mutex poisoned");
        let id = OutcomeId(next_id(&self.outcome_sequence));
        let now = Utc::now();
        let outcome = Outcome {
            id,
            shortname: outcome
                .shortname
                .unwrap_or_else(|| format!("outcome{id}")),
            fullname: outcome.fullname.unwrap_or_else(|| format!("Outcome {id}")),
            description: outcome
                .description
                .unwrap_or_else(|| format!("Description of outcome {id}")),
            description_format: outcome
                .description_format
                .unwrap_or(DescriptionFormat::Plain),
            scale_id: outcome.scale_id,
            course_id: outcome.course_id,
            time_created: Some(now),
            time_modified: Some(now),
            user_modified: None,
        };
        state.outcomes.insert(id, outcome.clone());
        outcome
    }

    /// Inserts a scale with a fixed id.
    pub fn insert_scale(&self, scale: Scale) -> Result<(), CatalogLoadError> {
        let mut state = self.state.lock().expect("catalog mutex poisoned");
        if state.scales.contains_key(&scale.id) {
            return Err(CatalogLoadError::DuplicateScale(scale.id));
        }
        self.scale_sequence.fetch_max(scale.id.0, Ordering::Relaxed);
        state.scales.insert(scale.id, scale);
        Ok(())
    }

    /// Inserts an outcome with a fixed id.
    pub fn insert_outcome(&self, outcome: Outcome) -> Result<(), CatalogLoadError> {
        let mut state = self.state.lock().expect("catalog mutex poisoned");
        if state.outcomes.contains_key(&outcome.id) {
            return Err(CatalogLoadError::DuplicateOutcome(outcome.id));
        }
        self.outcome_sequence.fetch_max(outcome.id.0, Ordering::Relaxed);
        state.outcomes.insert(outcome.id, outcome);
        Ok(())
    }

    pub fn find_scale(&self, id: ScaleId) -> Option<Scale> {
        let state = self.state.lock().expect("catalog mutex poisoned");
        state.scales.get(&id).cloned()
    }

    pub fn scale_count(&self) -> usize {
        self.state.lock().expect("catalog mutex poisoned").scales.len()
    }

    pub fn outcome_count(&self) -> usize {
        self.state
            .lock()
            .expect("catalog mutex poisoned")
            .outcomes
            .len()
    }

    pub fn frameworks(&self) -> Vec<Framework> {
        let state = self.state.lock().expect("catalog mutex poisoned");
        state.frameworks.values().cloned().collect()
    }

    /// Competencies of a framework in sort order.
    pub fn competencies(&self, framework_id: FrameworkId) -> Vec<Competency> {
        let state = self.state.lock().expect("catalog mutex poisoned");
        let mut competencies: Vec<Competency> = state
            .competencies
            .values()
            .filter(|competency| competency.framework_id == framework_id)
            .cloned()
            .collect();
        competencies.sort_by_key(|competency| competency.sort_order);
        competencies
    }
}

impl OutcomeRepository for InMemoryCatalog {
    fn find_by_ids(&self, ids: &[OutcomeId]) -> Result<Vec<Outcome>, RepositoryError> {
        let state = self.state.lock().expect("catalog mutex poisoned");
        let mut wanted = ids.to_vec();
        wanted.sort_unstable();
        wanted.dedup();
        Ok(wanted
            .iter()
            .filter_map(|id| state.outcomes.get(id).cloned())
            .collect())
    }

    fn find_all_global(&self) -> Result<Vec<Outcome>, RepositoryError> {
        let state = self.state.lock().expect("catalog mutex poisoned");
        let mut outcomes: Vec<Outcome> = state
            .outcomes
            .values()
            .filter(|outcome| outcome.is_importable())
            .cloned()
            .collect();
        outcomes.sort_by(|a, b| a.shortname.cmp(&b.shortname).then(a.id.cmp(&b.id)));
        Ok(outcomes)
    }

    fn count_global_matching(&self, ids: &[OutcomeId]) -> Result<usize, RepositoryError> {
        let state = self.state.lock().expect("catalog mutex poisoned");
        let mut wanted = ids.to_vec();
        wanted.sort_unstable();
        wanted.dedup();
        Ok(wanted
            .iter()
            .filter(|id| {
                state
                    .outcomes
                    .get(*id)
                    .is_some_and(Outcome::is_importable)
            })
            .count())
    }

    fn find_scales(&self, ids: &[ScaleId]) -> Result<Vec<Scale>, RepositoryError> {
        let state = self.state.lock().expect("catalog mutex poisoned");
        Ok(ids
            .iter()
            .filter_map(|id| state.scales.get(id).cloned())
            .collect())
    }
}

impl PersistenceService for InMemoryCatalog {
    fn begin(&self) -> Result<Box<dyn ImportTransaction + '_>, PersistenceError> {
        Ok(Box::new(MemoryTransaction {
            catalog: self,
            frameworks: Vec::new(),
            competencies: Vec::new(),
        }))
    }
}

/// Staged frameworks and competencies awaiting commit.
pub struct MemoryTransaction<'a> {
    catalog: &'a InMemoryCatalog,
    frameworks: Vec<Framework>,
    competencies: Vec<Competency>,
}

impl MemoryTransaction<'_> {
    fn check_scale_configuration(
        state: &CatalogState,
        scale_id: ScaleId,
        configuration: &ScaleConfiguration,
    ) -> Result<(), PersistenceError> {
        let scale = state
            .scales
            .get(&scale_id)
            .ok_or(PersistenceError::UnknownScale(scale_id))?;
        configuration
            .validate_against(scale)
            .map_err(|source| PersistenceError::InvalidScaleConfiguration { scale_id, source })
    }
}

impl ImportTransaction for MemoryTransaction<'_> {
    fn create_framework(&mut self, spec: FrameworkSpec) -> Result<Framework, PersistenceError> {
        if spec.shortname.trim().is_empty() {
            return Err(PersistenceError::MissingField("shortname"));
        }
        if spec.idnumber.trim().is_empty() {
            return Err(PersistenceError::MissingField("idnumber"));
        }

        let state = self.catalog.state.lock().expect("catalog mutex poisoned");
        let staged = self
            .frameworks
            .iter()
            .any(|framework| framework.idnumber == spec.idnumber);
        if staged || state.framework_idnumber_taken(&spec.idnumber) {
            return Err(PersistenceError::DuplicateFrameworkIdnumber(spec.idnumber));
        }
        Self::check_scale_configuration(&state, spec.scale_id, &spec.scale_configuration)?;
        drop(state);

        let id = FrameworkId(next_id(&self.catalog.framework_sequence));
        let framework = Framework::from_spec(id, spec, Utc::now());
        self.frameworks.push(framework.clone());
        Ok(framework)
    }

    fn create_competency(&mut self, spec: CompetencySpec) -> Result<Competency, PersistenceError> {
        if spec.idnumber.trim().is_empty() {
            return Err(PersistenceError::MissingField("idnumber"));
        }
        if spec.shortname.trim().is_empty() {
            return Err(PersistenceError::MissingField("shortname"));
        }

        let state = self.catalog.state.lock().expect("catalog mutex poisoned");
        let framework_known = self
            .frameworks
            .iter()
            .any(|framework| framework.id == spec.framework_id)
            || state.frameworks.contains_key(&spec.framework_id);
        if !framework_known {
            return Err(PersistenceError::UnknownFramework(spec.framework_id));
        }

        let siblings = self
            .competencies
            .iter()
            .chain(state.competencies.values())
            .filter(|competency| competency.framework_id == spec.framework_id);
        let mut sort_order = 0u32;
        for sibling in siblings {
            if sibling.idnumber == spec.idnumber {
                return Err(PersistenceError::DuplicateCompetencyIdnumber {
                    framework_id: spec.framework_id,
                    idnumber: spec.idnumber,
                });
            }
            sort_order += 1;
        }

        match (spec.scale_id, spec.scale_configuration.as_ref()) {
            (Some(scale_id), Some(configuration)) => {
                Self::check_scale_configuration(&state, scale_id, configuration)?;
            }
            (Some(_), None) => return Err(PersistenceError::MissingField("scaleconfiguration")),
            (None, Some(_)) => return Err(PersistenceError::MissingField("scaleid")),
            (None, None) => {}
        }
        drop(state);

        let id = CompetencyId(next_id(&self.catalog.competency_sequence));
        let competency = Competency::from_spec(id, spec, sort_order, Utc::now());
        self.competencies.push(competency.clone());
        Ok(competency)
    }

    fn commit(self: Box<Self>) -> Result<(), PersistenceError> {
        let MemoryTransaction {
            catalog,
            frameworks,
            competencies,
        } = *self;

        let mut state = catalog.state.lock().expect("catalog mutex poisoned");
        // Another transaction may have committed since these records were staged.
        if let Some(conflict) = frameworks
            .iter()
            .find(|framework| state.framework_idnumber_taken(&framework.idnumber))
        {
            return Err(PersistenceError::DuplicateFrameworkIdnumber(
                conflict.idnumber.clone(),
            ));
        }
        if let Some(conflict) = competencies.iter().find(|competency| {
            state.competency_idnumber_taken(competency.framework_id, &competency.idnumber)
        }) {
            return Err(PersistenceError::DuplicateCompetencyIdnumber {
                framework_id: conflict.framework_id,
                idnumber: conflict.idnumber.clone(),
            });
        }

        debug!(
            frameworks = frameworks.len(),
            competencies = competencies.len(),
            "committing staged records"
        );
        for framework in frameworks {
            state.frameworks.insert(framework.id, framework);
        }
        for competency in competencies {
            state.competencies.insert(competency.id, competency);
        }
        Ok(())
    }

    fn rollback(self: Box<Self>) {
        debug!(
            frameworks = self.frameworks.len(),
            competencies = self.competencies.len(),
            "discarding staged records"
        );
    }
}
