use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::domain::{Scale, ScaleId};

/// Serialized proficiency settings for one scale.
///
/// The payload is a JSON array whose first element names the scale
/// (`{"scaleid": 3}`) and whose remaining elements flag individual scale items
/// (`{"id": 1, "scaledefault": 1, "proficient": 1}`). The importer passes the
/// blob through untouched; it is only parsed to validate it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScaleConfiguration(String);

/// Per-item flags inside a scale configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaleItemSetting {
    pub id: u32,
    pub scale_default: bool,
    pub proficient: bool,
}

/// Decoded view of a scale configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedScaleConfiguration {
    pub scale_id: ScaleId,
    pub items: Vec<ScaleItemSetting>,
}

impl ParsedScaleConfiguration {
    pub fn default_item(&self) -> Option<u32> {
        self.items
            .iter()
            .find(|item| item.scale_default)
            .map(|item| item.id)
    }

    pub fn proficient_items(&self) -> impl Iterator<Item = u32> + '_ {
        self.items
            .iter()
            .filter(|item| item.proficient)
            .map(|item| item.id)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ScaleConfigError {
    #[error("scale configuration is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("scale configuration must be a non-empty array")]
    NotAnArray,
    #[error("scale configuration does not start with a scale reference")]
    MissingScaleReference,
    #[error("scale configuration targets scale {found}, expected scale {expected}")]
    ScaleMismatch { expected: ScaleId, found: ScaleId },
    #[error("scale configuration item {position} is invalid")]
    InvalidItem { position: usize },
    #[error("scale configuration must select a default value and at least one proficient value")]
    MissingDefaultOrProficient,
    #[error("scale configuration references item {item} but the scale only has {available} items")]
    UnknownItem { item: u32, available: usize },
}

impl ScaleConfiguration {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Serializes the given item flags for `scale_id`.
    pub fn build(scale_id: ScaleId, items: &[ScaleItemSetting]) -> Self {
        let mut entries = Vec::with_capacity(items.len() + 1);
        entries.push(json!({ "scaleid": scale_id.0 }));
        for item in items {
            entries.push(json!({
                "id": item.id,
                "scaledefault": u8::from(item.scale_default),
                "proficient": u8::from(item.proficient),
            }));
        }
        Self(Value::Array(entries).to_string())
    }

    /// First item as the default, last item as the only proficient level.
    pub fn standard(scale: &Scale) -> Self {
        let last = u32::try_from(scale.items.len()).unwrap_or(u32::MAX).max(1);
        let mut items = vec![ScaleItemSetting {
            id: 1,
            scale_default: true,
            proficient: last == 1,
        }];
        if last > 1 {
            items.push(ScaleItemSetting {
                id: last,
                scale_default: false,
                proficient: true,
            });
        }
        Self::build(scale.id, &items)
    }

    pub fn parse(&self) -> Result<ParsedScaleConfiguration, ScaleConfigError> {
        let value: Value = serde_json::from_str(&self.0)?;
        let entries = match value {
            Value::Array(entries) if !entries.is_empty() => entries,
            _ => return Err(ScaleConfigError::NotAnArray),
        };

        let scale_id = entries[0]
            .get("scaleid")
            .and_then(as_u64)
            .map(ScaleId)
            .ok_or(ScaleConfigError::MissingScaleReference)?;

        let mut items = Vec::with_capacity(entries.len() - 1);
        for (position, entry) in entries.iter().enumerate().skip(1) {
            let id = entry
                .get("id")
                .and_then(as_u64)
                .and_then(|id| u32::try_from(id).ok())
                .ok_or(ScaleConfigError::InvalidItem { position })?;
            items.push(ScaleItemSetting {
                id,
                scale_default: entry.get("scaledefault").is_some_and(as_flag),
                proficient: entry.get("proficient").is_some_and(as_flag),
            });
        }

        Ok(ParsedScaleConfiguration { scale_id, items })
    }

    /// Parses and checks the configuration is usable for `scale_id`.
    pub fn validate_for(
        &self,
        scale_id: ScaleId,
    ) -> Result<ParsedScaleConfiguration, ScaleConfigError> {
        let parsed = self.parse()?;
        if parsed.scale_id != scale_id {
            return Err(ScaleConfigError::ScaleMismatch {
                expected: scale_id,
                found: parsed.scale_id,
            });
        }

        let has_default = parsed.default_item().is_some();
        let has_proficient = parsed.proficient_items().next().is_some();
        if !has_default || !has_proficient {
            return Err(ScaleConfigError::MissingDefaultOrProficient);
        }

        Ok(parsed)
    }

    /// Like [`validate_for`](Self::validate_for), also checking item ids against the scale.
    pub fn validate_against(&self, scale: &Scale) -> Result<(), ScaleConfigError> {
        let parsed = self.validate_for(scale.id)?;
        if scale.items.is_empty() {
            return Ok(());
        }

        let available = scale.items.len();
        match parsed
            .items
            .iter()
            .find(|item| item.id == 0 || item.id as usize > available)
        {
            Some(item) => Err(ScaleConfigError::UnknownItem {
                item: item.id,
                available,
            }),
            None => Ok(()),
        }
    }
}

fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number.as_u64(),
        Value::String(raw) => raw.trim().parse().ok(),
        _ => None,
    }
}

fn as_flag(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_u64().is_some_and(|n| n != 0),
        Value::String(raw) => matches!(raw.trim(), "1" | "true"),
        _ => false,
    }
}
