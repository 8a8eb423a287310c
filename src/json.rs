//! Total accessors over loosely-typed JSON and extended-JSON helpers.
//!
//! Query descriptions and data-source settings arrive as free-form JSON. Every accessor here
//! takes an explicit default and never coerces between types: a number stored as a string is
//! treated as absent, not parsed.

use bson::{Bson, Document};
use serde_json::Value;

/// String at `key`, or `default` when absent or not a string.
#[must_use]
pub fn str_or<'a>(val: &'a Value, key: &str, default: &'a str) -> &'a str {
    val.get(key).and_then(Value::as_str).unwrap_or(default)
}

/// Optional string at `key`; `None` when absent or not a string.
#[must_use]
pub fn opt_str<'a>(val: &'a Value, key: &str) -> Option<&'a str> {
    val.get(key).and_then(Value::as_str)
}

/// Integer at `key`, or `default` when absent or not an integer.
#[must_use]
pub fn i64_or(val: &Value, key: &str, default: i64) -> i64 {
    val.get(key).and_then(Value::as_i64).unwrap_or(default)
}

/// Array at `key`, or an empty slice.
#[must_use]
pub fn array_or<'a>(val: &'a Value, key: &str) -> &'a [Value] {
    val.get(key).and_then(Value::as_array).map_or(&[], Vec::as_slice)
}

/// Parse JSON text, treating empty/whitespace text as an empty object.
///
/// # Errors
/// Returns the serde error for malformed, non-empty input.
pub fn parse_or_empty(text: &str) -> Result<Value, serde_json::Error> {
    if text.trim().is_empty() {
        return Ok(Value::Object(serde_json::Map::new()));
    }
    serde_json::from_str(text)
}

/// Parse extended-JSON text that must be a top-level array into BSON values.
///
/// `$date`, `$numberLong` and the other canonical/relaxed wrappers become typed BSON values.
///
/// # Errors
/// Returns a description of the failure when the text is not JSON or not an array.
pub fn parse_extjson_array(text: &str) -> Result<Vec<Bson>, String> {
    let val: Value = serde_json::from_str(text).map_err(|e| e.to_string())?;
    if !val.is_array() {
        return Err("expected a JSON array of pipeline stages".into());
    }
    match Bson::try_from(val).map_err(|e| e.to_string())? {
        Bson::Array(items) => Ok(items),
        other => Err(format!("expected array, found {}", type_name(&other))),
    }
}

/// Parse one line of extended JSON into a BSON document.
///
/// # Errors
/// Returns a description of the failure when the text is not a JSON object.
pub fn parse_extjson_document(text: &str) -> Result<Document, String> {
    let val: Value = serde_json::from_str(text).map_err(|e| e.to_string())?;
    match Bson::try_from(val).map_err(|e| e.to_string())? {
        Bson::Document(d) => Ok(d),
        other => Err(format!("expected object, found {}", type_name(&other))),
    }
}

/// Relaxed extended-JSON text of a single value.
#[must_use]
pub fn to_extjson_text(val: &Bson) -> String {
    val.clone().into_relaxed_extjson().to_string()
}

/// Canonical extended-JSON text of a single value. Numeric types survive a re-parse.
#[must_use]
pub fn to_canonical_extjson_text(val: &Bson) -> String {
    val.clone().into_canonical_extjson().to_string()
}

/// Relaxed extended-JSON text of a stage list, for logs and CLI output.
#[must_use]
pub fn pipeline_to_extjson(stages: &[Document]) -> String {
    let parts: Vec<String> =
        stages.iter().map(|d| to_extjson_text(&Bson::Document(d.clone()))).collect();
    format!("[{}]", parts.join(","))
}

/// MongoDB `$type` alias for a BSON value.
#[must_use]
pub fn type_name(val: &Bson) -> &'static str {
    match val {
        Bson::Double(_) => "double",
        Bson::String(_) => "string",
        Bson::Document(_) => "object",
        Bson::Array(_) => "array",
        Bson::Binary(_) => "binData",
        Bson::Undefined => "undefined",
        Bson::ObjectId(_) => "objectId",
        Bson::Boolean(_) => "bool",
        Bson::DateTime(_) => "date",
        Bson::Null => "null",
        Bson::RegularExpression(_) => "regex",
        Bson::DbPointer(_) => "dbPointer",
        Bson::JavaScriptCode(_) => "javascript",
        Bson::Symbol(_) => "symbol",
        Bson::JavaScriptCodeWithScope(_) => "javascriptWithScope",
        Bson::Int32(_) => "int",
        Bson::Timestamp(_) => "timestamp",
        Bson::Int64(_) => "long",
        Bson::Decimal128(_) => "decimal",
        Bson::MinKey => "minKey",
        Bson::MaxKey => "maxKey",
    }
}
