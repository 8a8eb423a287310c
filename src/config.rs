//! Data-source settings.
//!
//! Settings arrive as the host's per-datasource JSON blob. Absent keys take defaults; keys
//! that are present but unusable are a configuration error.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

use crate::errors::DsError;
use crate::json;
use crate::types::StageTemplate;

pub const DEFAULT_URI: &str = "mongodb://localhost:27017";
pub const DEFAULT_DATABASE: &str = "test";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSourceSettings {
    pub uri: String,
    pub database: String,
    pub stages: Vec<StageTemplate>,
}

impl Default for DataSourceSettings {
    fn default() -> Self {
        Self { uri: DEFAULT_URI.to_string(), database: DEFAULT_DATABASE.to_string(), stages: Vec::new() }
    }
}

impl DataSourceSettings {
    /// Parse the `jsonData` blob (`mongodb_url`, `mongodb_db`, `stages`).
    ///
    /// # Errors
    /// `Config` for malformed JSON, an unusable URI or database name, or duplicate template
    /// names.
    pub fn from_json(json_data: &str) -> Result<Self, DsError> {
        let val = json::parse_or_empty(json_data)
            .map_err(|e| DsError::Config(format!("invalid datasource settings: {e}")))?;
        Self::from_value(&val)
    }

    /// # Errors
    /// See [`DataSourceSettings::from_json`].
    pub fn from_value(val: &Value) -> Result<Self, DsError> {
        let uri = json::str_or(val, "mongodb_url", DEFAULT_URI).trim().to_string();
        if uri.is_empty() || !uri.contains("://") {
            return Err(DsError::Config(format!("invalid mongodb_url: '{uri}'")));
        }
        let database = json::str_or(val, "mongodb_db", DEFAULT_DATABASE).trim().to_string();
        if database.is_empty() {
            return Err(DsError::Config("mongodb_db must not be empty".into()));
        }
        let stages = parse_stages(json::array_or(val, "stages"))?;
        Ok(Self { uri, database, stages })
    }
}

fn parse_stages(entries: &[Value]) -> Result<Vec<StageTemplate>, DsError> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(entries.len());
    for (i, entry) in entries.iter().enumerate() {
        if !entry.is_object() {
            log::warn!("ignoring stage template #{i}: not an object");
            continue;
        }
        let name = json::str_or(entry, "name", "").trim();
        let stage = json::str_or(entry, "stage", "");
        if name.is_empty() || stage.trim().is_empty() {
            log::warn!("ignoring stage template #{i}: missing name or stage");
            continue;
        }
        if !seen.insert(name.to_string()) {
            return Err(DsError::Config(format!("duplicate stage template name: {name}")));
        }
        out.push(StageTemplate::new(name, stage));
    }
    Ok(out)
}
