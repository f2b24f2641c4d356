use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::scale_config::ScaleConfiguration;

/// Number of taxonomy levels carried by every competency framework.
pub const FRAMEWORK_TAXONOMY_DEPTH: usize = 4;

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

record_id!(
    /// Identifier of a legacy grading outcome.
    OutcomeId
);
record_id!(
    /// Identifier of a rating scale.
    ScaleId
);
record_id!(
    /// Identifier assigned to a framework by the persistence service.
    FrameworkId
);
record_id!(
    /// Identifier assigned to a competency by the persistence service.
    CompetencyId
);
record_id!(
    /// Context the framework is created in (the system context for imports).
    ContextId
);

/// Text format tag attached to descriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptionFormat {
    Moodle,
    #[default]
    Html,
    Plain,
    Markdown,
}

impl DescriptionFormat {
    /// Maps the numeric format codes used by legacy exports.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Moodle),
            1 => Some(Self::Html),
            2 => Some(Self::Plain),
            4 => Some(Self::Markdown),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Self::Moodle => 0,
            Self::Html => 1,
            Self::Plain => 2,
            Self::Markdown => 4,
        }
    }
}

/// Vocabulary used to name each level of a framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Taxonomy {
    Behaviour,
    Competency,
    Concept,
    Domain,
    Indicator,
    Level,
    Outcome,
    Practice,
    Proficiency,
    Skill,
    Value,
}

/// Legacy grading outcome. Read-only input to the import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub id: OutcomeId,
    pub shortname: String,
    pub fullname: String,
    pub description: String,
    pub description_format: DescriptionFormat,
    pub scale_id: ScaleId,
    /// `None` for site-wide outcomes; course outcomes cannot be imported.
    pub course_id: Option<u64>,
    pub time_created: Option<DateTime<Utc>>,
    pub time_modified: Option<DateTime<Utc>>,
    pub user_modified: Option<u64>,
}

impl Outcome {
    pub fn is_importable(&self) -> bool {
        self.course_id.is_none()
    }
}

/// Rating scale referenced by outcomes and competencies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scale {
    pub id: ScaleId,
    pub name: String,
    /// Ordered rating levels; configuration items refer to them by 1-based position.
    #[serde(default)]
    pub items: Vec<String>,
}

/// One row of the scale usage summary for a selection of outcomes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleSummaryEntry {
    pub scale_id: ScaleId,
    pub scale_name: String,
    pub outcome_count: usize,
}

/// Everything needed to create a framework.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameworkSpec {
    pub context_id: ContextId,
    pub shortname: String,
    pub idnumber: String,
    pub description: String,
    pub description_format: DescriptionFormat,
    pub scale_id: ScaleId,
    pub scale_configuration: ScaleConfiguration,
    pub visible: bool,
    pub taxonomies: [Taxonomy; FRAMEWORK_TAXONOMY_DEPTH],
}

/// Framework as created by the persistence service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Framework {
    pub id: FrameworkId,
    pub context_id: ContextId,
    pub shortname: String,
    pub idnumber: String,
    pub description: String,
    pub description_format: DescriptionFormat,
    pub scale_id: ScaleId,
    pub scale_configuration: ScaleConfiguration,
    pub visible: bool,
    pub taxonomies: [Taxonomy; FRAMEWORK_TAXONOMY_DEPTH],
    pub time_created: DateTime<Utc>,
}

impl Framework {
    pub fn from_spec(id: FrameworkId, spec: FrameworkSpec, time_created: DateTime<Utc>) -> Self {
        let FrameworkSpec {
            context_id,
            shortname,
            idnumber,
            description,
            description_format,
            scale_id,
            scale_configuration,
            visible,
            taxonomies,
        } = spec;

        Self {
            id,
            context_id,
            shortname,
            idnumber,
            description,
            description_format,
            scale_id,
            scale_configuration,
            visible,
            taxonomies,
            time_created,
        }
    }
}

/// Competency fields derived from an outcome before a framework exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetencyDraft {
    pub idnumber: String,
    pub shortname: String,
    pub description: String,
    pub description_format: DescriptionFormat,
    pub scale_id: Option<ScaleId>,
    pub scale_configuration: Option<ScaleConfiguration>,
}

impl CompetencyDraft {
    pub fn bind(self, framework_id: FrameworkId) -> CompetencySpec {
        CompetencySpec {
            framework_id,
            idnumber: self.idnumber,
            shortname: self.shortname,
            description: self.description,
            description_format: self.description_format,
            scale_id: self.scale_id,
            scale_configuration: self.scale_configuration,
        }
    }
}

/// Everything needed to create a competency inside a framework.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetencySpec {
    pub framework_id: FrameworkId,
    pub idnumber: String,
    pub shortname: String,
    pub description: String,
    pub description_format: DescriptionFormat,
    pub scale_id: Option<ScaleId>,
    pub scale_configuration: Option<ScaleConfiguration>,
}

/// Competency as created by the persistence service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Competency {
    pub id: CompetencyId,
    pub framework_id: FrameworkId,
    pub idnumber: String,
    pub shortname: String,
    pub description: String,
    pub description_format: DescriptionFormat,
    /// `None` when the competency inherits the framework scale.
    pub scale_id: Option<ScaleId>,
    pub scale_configuration: Option<ScaleConfiguration>,
    pub sort_order: u32,
    pub time_created: DateTime<Utc>,
}

impl Competency {
    pub fn from_spec(
        id: CompetencyId,
        spec: CompetencySpec,
        sort_order: u32,
        time_created: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            framework_id: spec.framework_id,
            idnumber: spec.idnumber,
            shortname: spec.shortname,
            description: spec.description,
            description_format: spec.description_format,
            scale_id: spec.scale_id,
            scale_configuration: spec.scale_configuration,
            sort_order,
            time_created,
        }
    }
}

/// Result of a completed import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportResult {
    pub framework: Framework,
    pub competencies: Vec<Competency>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn description_format_codes_round_trip_known_values() {
        for code in [0, 1, 2, 4] {
            let format = DescriptionFormat::from_code(code).expect("known code");
            assert_eq!(format.code(), code);
        }
        assert!(DescriptionFormat::from_code(3).is_none());
    }

    #[test]
    fn only_global_outcomes_are_importable() {
        let mut outcome = Outcome {
            id: OutcomeId(1),
            shortname: "OC1".to_string(),
            fullname: "Outcome 1".to_string(),
            description: String::new(),
            description_format: DescriptionFormat::Plain,
            scale_id: ScaleId(1),
            course_id: None,
            time_created: None,
            time_modified: None,
            user_modified: None,
        };
        assert!(outcome.is_importable());

        outcome.course_id = Some(12);
        assert!(!outcome.is_importable());
    }
}
