use std::collections::HashMap;

use tracing::{debug, info};

use super::domain::{
    CompetencyDraft, FrameworkSpec, ImportResult, Outcome, OutcomeId, ScaleId,
};
use super::idnumber::{allocate_idnumbers, AllocationOrder, IdnumberAllocation};
use super::repository::{ImportTransaction, OutcomeRepository, PersistenceService};
use super::scale_config::ScaleConfiguration;
use super::service::ImportError;

/// Derives the competency fields for one outcome.
///
/// Competencies on the framework scale inherit it and carry no scale fields.
/// Others keep the outcome scale and the configuration supplied for it, if any.
pub fn draft_competency(
    outcome: &Outcome,
    idnumber: &str,
    framework_scale: ScaleId,
    scale_configs: &HashMap<ScaleId, ScaleConfiguration>,
) -> CompetencyDraft {
    let (scale_id, scale_configuration) = if outcome.scale_id == framework_scale {
        (None, None)
    } else {
        (
            Some(outcome.scale_id),
            scale_configs.get(&outcome.scale_id).cloned(),
        )
    };

    CompetencyDraft {
        idnumber: idnumber.to_string(),
        shortname: outcome.fullname.clone(),
        description: outcome.description.clone(),
        description_format: outcome.description_format,
        scale_id,
        scale_configuration,
    }
}

/// Creates a framework and one competency per selected outcome.
///
/// The selection is expected to be validated already. Competencies are created
/// in selection order inside a single transaction; the transaction is rolled
/// back on the first failure.
pub fn build_framework<R, P>(
    repository: &R,
    store: &P,
    framework: FrameworkSpec,
    scale_configs: &HashMap<ScaleId, ScaleConfiguration>,
    selection: &[OutcomeId],
    order: AllocationOrder,
) -> Result<ImportResult, ImportError>
where
    R: OutcomeRepository + ?Sized,
    P: PersistenceService + ?Sized,
{
    let fetched = repository.find_by_ids(selection)?;
    let outcomes: HashMap<OutcomeId, &Outcome> =
        fetched.iter().map(|outcome| (outcome.id, outcome)).collect();

    let mut ordered = Vec::with_capacity(selection.len());
    for id in selection {
        let outcome = outcomes
            .get(id)
            .copied()
            .ok_or(ImportError::UnknownOutcome(*id))?;
        ordered.push(outcome);
    }

    let idnumbers = match order {
        AllocationOrder::Selection => allocate_idnumbers(ordered.iter().copied()),
        AllocationOrder::Repository => allocate_idnumbers(&fetched),
    };

    let mut transaction = store.begin()?;
    match create_records(
        transaction.as_mut(),
        framework,
        scale_configs,
        &ordered,
        &idnumbers,
    ) {
        Ok(result) => {
            transaction.commit()?;
            info!(
                framework_id = %result.framework.id,
                framework_idnumber = %result.framework.idnumber,
                competencies = result.competencies.len(),
                %order,
                "outcomes imported as competencies"
            );
            Ok(result)
        }
        Err(err) => {
            transaction.rollback();
            Err(err)
        }
    }
}

fn create_records(
    transaction: &mut (dyn ImportTransaction + '_),
    framework: FrameworkSpec,
    scale_configs: &HashMap<ScaleId, ScaleConfiguration>,
    outcomes: &[&Outcome],
    idnumbers: &IdnumberAllocation,
) -> Result<ImportResult, ImportError> {
    let framework = transaction.create_framework(framework)?;
    let mut competencies = Vec::with_capacity(outcomes.len());

    for outcome in outcomes {
        let idnumber = idnumbers
            .get(outcome.id)
            .ok_or(ImportError::UnknownOutcome(outcome.id))?;
        let draft = draft_competency(outcome, idnumber, framework.scale_id, scale_configs);
        let competency = transaction.create_competency(draft.bind(framework.id))?;
        debug!(
            outcome_id = %outcome.id,
            competency_id = %competency.id,
            idnumber = %competency.idnumber,
            "competency created"
        );
        competencies.push(competency);
    }

    Ok(ImportResult {
        framework,
        competencies,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcomes::domain::DescriptionFormat;

    fn outcome(id: u64, scale_id: u64) -> Outcome {
        Outcome {
            id: OutcomeId(id),
            shortname: format!("oc{id}"),
            fullname: format!("Outcome {id}"),
            description: format!("Description of outcome {id}"),
            description_format: DescriptionFormat::Markdown,
            scale_id: ScaleId(scale_id),
            course_id: None,
            time_created: None,
            time_modified: None,
            user_modified: Some(2),
        }
    }

    #[test]
    fn outcomes_on_the_framework_scale_inherit_it() {
        let mut configs = HashMap::new();
        configs.insert(ScaleId(1), ScaleConfiguration::new("[{\"scaleid\":1}]"));

        let draft = draft_competency(&outcome(3, 1), "oc3", ScaleId(1), &configs);
        assert_eq!(draft.scale_id, None);
        assert_eq!(draft.scale_configuration, None);
    }

    #[test]
    fn outcomes_on_other_scales_keep_scale_and_configuration() {
        let config = ScaleConfiguration::new("[{\"scaleid\":2}]");
        let mut configs = HashMap::new();
        configs.insert(ScaleId(2), config.clone());

        let draft = draft_competency(&outcome(3, 2), "oc3", ScaleId(1), &configs);
        assert_eq!(draft.scale_id, Some(ScaleId(2)));
        assert_eq!(draft.scale_configuration, Some(config));
    }

    #[test]
    fn missing_configuration_leaves_it_empty() {
        let draft = draft_competency(&outcome(3, 2), "oc3", ScaleId(1), &HashMap::new());
        assert_eq!(draft.scale_id, Some(ScaleId(2)));
        assert_eq!(draft.scale_configuration, None);
    }

    #[test]
    fn draft_uses_fullname_and_copies_description() {
        let source = outcome(8, 1);
        let draft = draft_competency(&source, "custom-id", ScaleId(1), &HashMap::new());
        assert_eq!(draft.idnumber, "custom-id");
        assert_eq!(draft.shortname, source.fullname);
        assert_eq!(draft.description, source.description);
        assert_eq!(draft.description_format, DescriptionFormat::Markdown);
    }
}
