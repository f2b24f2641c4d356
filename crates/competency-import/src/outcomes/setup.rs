use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::domain::{
    ContextId, DescriptionFormat, FrameworkSpec, Scale, ScaleId, ScaleSummaryEntry, Taxonomy,
    FRAMEWORK_TAXONOMY_DEPTH,
};
use super::scale_config::ScaleConfiguration;

/// A scale together with the configuration chosen for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleSelection {
    pub scale_id: ScaleId,
    pub configuration: ScaleConfiguration,
}

/// Framework details and scale configurations collected before an import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameworkSetup {
    pub context_id: ContextId,
    pub shortname: String,
    pub idnumber: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub description_format: DescriptionFormat,
    /// Default scale of the framework.
    pub scale: ScaleSelection,
    #[serde(default = "default_visible")]
    pub visible: bool,
    /// Configurations for every other scale used by the selected outcomes.
    #[serde(default)]
    pub extra_scales: Vec<ScaleSelection>,
}

fn default_visible() -> bool {
    true
}

impl FrameworkSetup {
    /// Framework spec with every taxonomy level set to `competency`.
    pub fn framework_spec(&self) -> FrameworkSpec {
        FrameworkSpec {
            context_id: self.context_id,
            shortname: self.shortname.trim().to_string(),
            idnumber: self.idnumber.trim().to_string(),
            description: self.description.clone(),
            description_format: self.description_format,
            scale_id: self.scale.scale_id,
            scale_configuration: self.scale.configuration.clone(),
            visible: self.visible,
            taxonomies: [Taxonomy::Competency; FRAMEWORK_TAXONOMY_DEPTH],
        }
    }

    /// Configuration per scale id, the framework scale included.
    pub fn scale_configs(&self) -> HashMap<ScaleId, ScaleConfiguration> {
        std::iter::once(&self.scale)
            .chain(self.extra_scales.iter())
            .map(|selection| (selection.scale_id, selection.configuration.clone()))
            .collect()
    }

    /// Checks the setup against the scale usage of the selected outcomes.
    ///
    /// `summary` is the usage summary of the selection, most used first;
    /// `scales` resolves scale ids to their items.
    pub fn validate(&self, summary: &[ScaleSummaryEntry], scales: &[Scale]) -> SetupErrors {
        let mut errors = SetupErrors::default();

        if self.shortname.trim().is_empty() {
            errors.insert("shortname", "required");
        }
        if self.idnumber.trim().is_empty() {
            errors.insert("idnumber", "required");
        }

        let Some(most_used) = summary.first() else {
            errors.insert("outcomes", "no outcomes with a known scale were selected");
            return errors;
        };

        if self.scale.scale_id != most_used.scale_id {
            errors.insert(
                "scaleid",
                format!(
                    "the framework scale must be '{}', the scale used by most outcomes",
                    most_used.scale_name
                ),
            );
        } else if let Err(err) = check_configuration(&self.scale, scales) {
            errors.insert("scaleconfiguration", err);
        }

        let mut configured: BTreeMap<ScaleId, &ScaleSelection> = BTreeMap::new();
        for selection in &self.extra_scales {
            let field = extra_scale_field(selection.scale_id);
            if selection.scale_id == self.scale.scale_id || configured.contains_key(&selection.scale_id)
            {
                errors.insert(field, "scale is configured more than once");
                continue;
            }
            if !summary.iter().any(|entry| entry.scale_id == selection.scale_id) {
                errors.insert(field, "scale is not used by the selected outcomes");
                continue;
            }
            if let Err(err) = check_configuration(selection, scales) {
                errors.insert(field, err);
            }
            configured.insert(selection.scale_id, selection);
        }

        for entry in summary.iter().skip(1) {
            if entry.scale_id != self.scale.scale_id && !configured.contains_key(&entry.scale_id) {
                let field = extra_scale_field(entry.scale_id);
                if !errors.contains(&field) {
                    errors.insert(
                        field,
                        format!("scale '{}' must be configured", entry.scale_name),
                    );
                }
            }
        }

        errors
    }
}

fn extra_scale_field(scale_id: ScaleId) -> String {
    format!("extrascales_{scale_id}")
}

fn check_configuration(selection: &ScaleSelection, scales: &[Scale]) -> Result<(), String> {
    let result = match scales.iter().find(|scale| scale.id == selection.scale_id) {
        Some(scale) => selection.configuration.validate_against(scale),
        None => selection
            .configuration
            .validate_for(selection.scale_id)
            .map(|_| ()),
    };
    result.map_err(|err| err.to_string())
}

/// Validation messages keyed by setup field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SetupErrors(BTreeMap<String, String>);

impl SetupErrors {
    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.insert(field.into(), message.into());
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .map(|(field, message)| (field.as_str(), message.as_str()))
    }
}

impl fmt::Display for SetupErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in self.iter() {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}
