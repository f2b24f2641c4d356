use std::collections::HashMap;

use super::domain::{Outcome, Scale, ScaleId, ScaleSummaryEntry};

/// Groups outcomes by scale, most used scale first.
///
/// Ties are ordered by scale name, then by scale id. Outcomes whose scale is
/// not in `scales` are left out of the summary.
pub fn summarize_scales(outcomes: &[Outcome], scales: &[Scale]) -> Vec<ScaleSummaryEntry> {
    let names: HashMap<ScaleId, &str> = scales
        .iter()
        .map(|scale| (scale.id, scale.name.as_str()))
        .collect();

    let mut counts: HashMap<ScaleId, usize> = HashMap::new();
    for outcome in outcomes {
        if names.contains_key(&outcome.scale_id) {
            *counts.entry(outcome.scale_id).or_default() += 1;
        }
    }

    let mut summary: Vec<ScaleSummaryEntry> = counts
        .into_iter()
        .map(|(scale_id, outcome_count)| ScaleSummaryEntry {
            scale_id,
            scale_name: names[&scale_id].to_string(),
            outcome_count,
        })
        .collect();

    summary.sort_by(|a, b| {
        b.outcome_count
            .cmp(&a.outcome_count)
            .then_with(|| a.scale_name.cmp(&b.scale_name))
            .then_with(|| a.scale_id.cmp(&b.scale_id))
    });
    summary
}
