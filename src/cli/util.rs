use std::path::Path;

use crate::config::DataSourceSettings;
use crate::errors::DsError;
use crate::types::ResultKind;

/// `@path` reads the argument from a file; anything else is taken literally.
pub fn read_arg(s: &str) -> Result<String, DsError> {
    match s.strip_prefix('@') {
        Some(path) => Ok(std::fs::read_to_string(path)?),
        None => Ok(s.to_string()),
    }
}

pub fn parse_kind_input(s: &Option<String>) -> Result<ResultKind, DsError> {
    match s.as_ref().map(|x| x.to_lowercase()).as_deref() {
        None => Ok(ResultKind::default()),
        Some(k) => k.parse(),
    }
}

/// Epoch milliseconds, or an RFC 3339 timestamp such as `2024-01-01T00:00:00Z`.
pub fn parse_time_input(s: &str) -> Result<i64, DsError> {
    let s = s.trim();
    if let Ok(ms) = s.parse::<i64>() {
        return Ok(ms);
    }
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|t| t.timestamp_millis())
        .map_err(|e| DsError::Config(format!("invalid time '{s}': {e}")))
}

pub fn load_settings(path: Option<&Path>) -> Result<DataSourceSettings, DsError> {
    match path {
        Some(p) => DataSourceSettings::from_json(&std::fs::read_to_string(p)?),
        None => Ok(DataSourceSettings::default()),
    }
}
