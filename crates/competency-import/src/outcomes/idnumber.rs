use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::domain::{Outcome, OutcomeId};

/// Order in which outcomes claim idnumbers.
///
/// The first outcome to claim a shortname keeps it verbatim, so the order
/// decides which outcomes receive a `_<id>` suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationOrder {
    /// The order in which the caller selected the outcomes.
    #[default]
    Selection,
    /// Repository fetch order (ascending outcome id), as legacy imports did.
    Repository,
}

impl AllocationOrder {
    pub fn label(self) -> &'static str {
        match self {
            AllocationOrder::Selection => "selection",
            AllocationOrder::Repository => "repository",
        }
    }
}

impl fmt::Display for AllocationOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AllocationOrder {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "selection" => Ok(Self::Selection),
            "repository" | "legacy" => Ok(Self::Repository),
            other => Err(format!(
                "unknown idnumber order '{other}' (expected 'selection' or 'repository')"
            )),
        }
    }
}

/// Idnumbers assigned to a batch of outcomes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdnumberAllocation {
    assigned: HashMap<OutcomeId, String>,
}

impl IdnumberAllocation {
    pub fn get(&self, id: OutcomeId) -> Option<&str> {
        self.assigned.get(&id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.assigned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assigned.is_empty()
    }
}

/// Derives a unique idnumber for each outcome from its shortname.
///
/// Outcomes are processed in iteration order. While the candidate is taken,
/// `_<outcome id>` is appended to it.
pub fn allocate_idnumbers<'a, I>(outcomes: I) -> IdnumberAllocation
where
    I: IntoIterator<Item = &'a Outcome>,
{
    let mut used: HashSet<String> = HashSet::new();
    let mut assigned = HashMap::new();

    for outcome in outcomes {
        if assigned.contains_key(&outcome.id) {
            continue;
        }

        let mut candidate = outcome.shortname.clone();
        while used.contains(&candidate) {
            candidate = format!("{candidate}_{}", outcome.id);
        }

        used.insert(candidate.clone());
        assigned.insert(outcome.id, candidate);
    }

    IdnumberAllocation { assigned }
}
