use serde_json::Value;

use crate::errors::DsError;
use crate::json;
use crate::types::{RefId, ResultKind};

/// How a batch should be routed, taken from the first query's `queryType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryType {
    #[default]
    TimeSeries,
    Metrics,
    TestConnection,
}

impl QueryType {
    /// Unknown values fall back to the time-series route.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "metricsQuery" => Self::Metrics,
            "testConnection" => Self::TestConnection,
            _ => Self::TimeSeries,
        }
    }
}

/// One dashboard query, read from its free-form model JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDescription {
    pub ref_id: RefId,
    pub target: String,
    pub result_type: String,
    pub collection: Option<String>,
    pub max_data_points: i64,
    pub query_type: QueryType,
    /// Set when the model text could not be read; compiling such a query fails with this reason.
    pub rejected: Option<String>,
}

impl QueryDescription {
    /// Build from a parsed model. `max_data_points_hint` is the host-supplied sample budget and
    /// wins over the model's own `maxDataPoints` when positive; anything below 1 becomes 1.
    #[must_use]
    pub fn from_value(ref_id: impl Into<String>, model: Value, max_data_points_hint: i64) -> Self {
        let requested = if max_data_points_hint > 0 {
            max_data_points_hint
        } else {
            json::i64_or(&model, "maxDataPoints", 0)
        };
        Self {
            ref_id: ref_id.into(),
            target: json::str_or(&model, "target", "").to_string(),
            result_type: json::str_or(&model, "type", ResultKind::Timeserie.as_str()).to_string(),
            collection: json::opt_str(&model, "collection")
                .filter(|c| !c.is_empty())
                .map(str::to_string),
            max_data_points: requested.max(1),
            query_type: QueryType::from_name(json::str_or(&model, "queryType", "")),
            rejected: None,
        }
    }

    /// Parse model JSON text.
    ///
    /// # Errors
    /// Returns `MalformedQuery` when the text is not valid JSON.
    pub fn from_json(
        ref_id: impl Into<String>,
        model_json: &str,
        max_data_points_hint: i64,
    ) -> Result<Self, DsError> {
        let model = json::parse_or_empty(model_json).map_err(|e| DsError::MalformedQuery(invalid_model(&e)))?;
        Ok(Self::from_value(ref_id, model, max_data_points_hint))
    }

    /// Like [`Self::from_json`], but unreadable model text yields a description that fails when
    /// compiled, so one bad query does not take the rest of its batch down.
    #[must_use]
    pub fn from_json_or_rejected(ref_id: impl Into<String>, model_json: &str, max_data_points_hint: i64) -> Self {
        match json::parse_or_empty(model_json) {
            Ok(model) => Self::from_value(ref_id, model, max_data_points_hint),
            Err(e) => Self {
                rejected: Some(invalid_model(&e)),
                ..Self::from_value(ref_id, Value::Null, max_data_points_hint)
            },
        }
    }

    /// # Errors
    /// Returns `MalformedQuery` for an unknown `type`.
    pub fn kind(&self) -> Result<ResultKind, DsError> {
        self.result_type.parse()
    }
}

fn invalid_model(e: &serde_json::Error) -> String {
    format!("invalid query model: {e}")
}
