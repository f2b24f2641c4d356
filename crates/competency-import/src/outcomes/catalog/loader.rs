use std::io::Read;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};

use crate::outcomes::domain::{DescriptionFormat, Outcome, OutcomeId, Scale, ScaleId};

#[derive(Debug, thiserror::Error)]
pub enum CatalogLoadError {
    #[error("failed to read catalog export: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid catalog CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("outcome {outcome_id} has unknown description format {code}")]
    UnknownDescriptionFormat { outcome_id: OutcomeId, code: u8 },
    #[error("outcome {outcome_id} has an unreadable course id '{value}'")]
    InvalidCourseId { outcome_id: OutcomeId, value: String },
    #[error("outcome {outcome_id} has an unreadable user id '{value}'")]
    InvalidUserId { outcome_id: OutcomeId, value: String },
    #[error("outcome {outcome_id} has an unreadable timestamp '{value}'")]
    InvalidTimestamp { outcome_id: OutcomeId, value: String },
    #[error("outcome {0} appears more than once")]
    DuplicateOutcome(OutcomeId),
    #[error("scale {0} appears more than once")]
    DuplicateScale(ScaleId),
}

#[derive(Debug, Deserialize)]
struct OutcomeRow {
    id: u64,
    shortname: String,
    fullname: String,
    #[serde(default)]
    description: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    descriptionformat: Option<String>,
    scaleid: u64,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    courseid: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    timecreated: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    timemodified: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    usermodified: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ScaleRow {
    id: u64,
    name: String,
    #[serde(default)]
    scale: String,
}

pub(crate) fn parse_outcomes<R: Read>(reader: R) -> Result<Vec<Outcome>, CatalogLoadError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut outcomes = Vec::new();

    for record in csv_reader.deserialize::<OutcomeRow>() {
        outcomes.push(record?.into_outcome()?);
    }

    Ok(outcomes)
}

pub(crate) fn parse_scales<R: Read>(reader: R) -> Result<Vec<Scale>, CatalogLoadError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut scales = Vec::new();

    for record in csv_reader.deserialize::<ScaleRow>() {
        let row = record?;
        let items = row
            .scale
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect();
        scales.push(Scale {
            id: ScaleId(row.id),
            name: row.name,
            items,
        });
    }

    Ok(scales)
}

impl OutcomeRow {
    fn into_outcome(self) -> Result<Outcome, CatalogLoadError> {
        let outcome_id = OutcomeId(self.id);

        let description_format = match self.descriptionformat.as_deref() {
            None => DescriptionFormat::default(),
            Some(raw) => {
                let code = raw.parse::<u8>().unwrap_or(u8::MAX);
                DescriptionFormat::from_code(code)
                    .ok_or(CatalogLoadError::UnknownDescriptionFormat { outcome_id, code })?
            }
        };

        let course_id = reference(self.courseid).map_err(|value| {
            CatalogLoadError::InvalidCourseId { outcome_id, value }
        })?;
        let user_modified = reference(self.usermodified)
            .map_err(|value| CatalogLoadError::InvalidUserId { outcome_id, value })?;

        Ok(Outcome {
            id: outcome_id,
            shortname: self.shortname,
            fullname: self.fullname,
            description: self.description,
            description_format,
            scale_id: ScaleId(self.scaleid),
            course_id,
            time_created: timestamp(outcome_id, self.timecreated)?,
            time_modified: timestamp(outcome_id, self.timemodified)?,
            user_modified,
        })
    }
}

/// Parses an optional record reference; 0 means "none" in legacy exports.
///
/// Returns the raw value when it is not an unsigned id.
fn reference(value: Option<String>) -> Result<Option<u64>, String> {
    match value {
        None => Ok(None),
        Some(raw) => match raw.parse::<u64>() {
            Ok(0) => Ok(None),
            Ok(id) => Ok(Some(id)),
            Err(_) => Err(raw),
        },
    }
}

fn timestamp(
    outcome_id: OutcomeId,
    value: Option<String>,
) -> Result<Option<DateTime<Utc>>, CatalogLoadError> {
    match value {
        None => Ok(None),
        Some(raw) => parse_timestamp(&raw)
            .map(Some)
            .ok_or(CatalogLoadError::InvalidTimestamp {
                outcome_id,
                value: raw,
            }),
    }
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(seconds) = trimmed.parse::<i64>() {
        return DateTime::from_timestamp(seconds, 0);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }

    None
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
