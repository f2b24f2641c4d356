use std::collections::HashSet;

use super::domain::OutcomeId;
use super::repository::{OutcomeRepository, RepositoryError};

/// Removes repeated ids, keeping the first occurrence of each.
pub fn dedupe_selection(ids: &[OutcomeId]) -> Vec<OutcomeId> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

/// True when every selected outcome exists and is site-wide.
///
/// An empty selection is never importable.
pub fn selection_is_importable<R>(repository: &R, ids: &[OutcomeId]) -> Result<bool, RepositoryError>
where
    R: OutcomeRepository + ?Sized,
{
    let unique = dedupe_selection(ids);
    if unique.is_empty() {
        return Ok(false);
    }

    let matching = repository.count_global_matching(&unique)?;
    Ok(matching == unique.len())
}
