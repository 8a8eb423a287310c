use bson::Document;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::DsError;

pub type CollectionName = String;
pub type RefId = String;

/// Reference id used when a failure cannot be attributed to a single query.
pub const FALLBACK_REF_ID: &str = "A";

/// Requested dashboard window, shared by every query in a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    #[serde(rename = "fromEpochMs")]
    pub from_ms: i64,
    #[serde(rename = "toEpochMs")]
    pub to_ms: i64,
}

impl TimeRange {
    #[must_use]
    pub fn new(from_ms: i64, to_ms: i64) -> Self {
        Self { from_ms, to_ms }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultKind {
    #[default]
    Timeserie,
    Table,
}

impl ResultKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Timeserie => "timeserie",
            Self::Table => "table",
        }
    }
}

impl fmt::Display for ResultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResultKind {
    type Err = DsError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "timeserie" => Ok(Self::Timeserie),
            "table" => Ok(Self::Table),
            other => Err(DsError::MalformedQuery(format!("unknown result type: {other}"))),
        }
    }
}

/// A named, reusable pipeline fragment. `stage` holds comma-joined stage literals with one or
/// more `$QUERY` splice points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTemplate {
    pub name: String,
    pub stage: String,
}

impl StageTemplate {
    #[must_use]
    pub fn new(name: impl Into<String>, stage: impl Into<String>) -> Self {
        Self { name: name.into(), stage: stage.into() }
    }

    /// Operator key a pipeline stage must carry to be expanded by this template.
    #[must_use]
    pub fn operator(&self) -> String {
        format!("${}", self.name)
    }
}

/// Output of the compiler: where to run, what to run, how to decode.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub collection: CollectionName,
    pub pipeline: Vec<Document>,
    pub kind: ResultKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub timestamp: i64,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub name: String,
    pub points: Vec<Point>,
}

/// A decoded table cell. Date values keep their own variant even though they carry epoch
/// milliseconds like `Int64`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum CellValue {
    Double(f64),
    Int64(i64),
    String(String),
    Bool(bool),
    DateTime(i64),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    /// Each row is as wide as the column list was when the row was built.
    pub rows: Vec<Vec<Option<CellValue>>>,
}

impl Table {
    /// Cell at `(row, col)`; out-of-range columns of a short row read as absent.
    #[must_use]
    pub fn cell(&self, row: usize, col: usize) -> Option<&CellValue> {
        self.rows.get(row).and_then(|r| r.get(col)).and_then(Option::as_ref)
    }

    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Payload {
    Series(Vec<Series>),
    Table(Table),
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub ref_id: RefId,
    #[serde(flatten)]
    pub payload: Payload,
}

impl QueryResult {
    #[must_use]
    pub fn series(ref_id: impl Into<String>, series: Vec<Series>) -> Self {
        Self { ref_id: ref_id.into(), payload: Payload::Series(series) }
    }

    #[must_use]
    pub fn table(ref_id: impl Into<String>, table: Table) -> Self {
        Self { ref_id: ref_id.into(), payload: Payload::Table(table) }
    }

    #[must_use]
    pub fn error(ref_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self { ref_id: ref_id.into(), payload: Payload::Error(message.into()) }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self.payload, Payload::Error(_))
    }

    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        match &self.payload {
            Payload::Error(m) => Some(m),
            _ => None,
        }
    }
}

/// Ordered per-query results; index `i` answers query `i` of the batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub results: Vec<QueryResult>,
}

impl Response {
    /// Envelope carrying one error under the fallback reference id.
    #[must_use]
    pub fn fallback_error(message: impl Into<String>) -> Self {
        Self { results: vec![QueryResult::error(FALLBACK_REF_ID, message)] }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_kind_parses_known_values_only() {
        assert_eq!("timeserie".parse::<ResultKind>().unwrap(), ResultKind::Timeserie);
        assert_eq!("table".parse::<ResultKind>().unwrap(), ResultKind::Table);
        assert!(matches!("graph".parse::<ResultKind>(), Err(DsError::MalformedQuery(_))));
    }

    #[test]
    fn query_result_serializes_flat() {
        let r = QueryResult::error("B", "boom");
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v, serde_json::json!({"refId": "B", "error": "boom"}));

        let t = Table { columns: vec!["a".into()], rows: vec![vec![Some(CellValue::Int64(3)), None]] };
        let v = serde_json::to_value(QueryResult::table("A", t)).unwrap();
        assert_eq!(v["table"]["columns"], serde_json::json!(["a"]));
        assert_eq!(v["table"]["rows"][0][0], serde_json::json!({"kind": "int64", "value": 3}));
        assert!(v["table"]["rows"][0][1].is_null());
    }

    #[test]
    fn short_rows_read_absent() {
        let t = Table { columns: vec!["a".into(), "b".into()], rows: vec![vec![Some(CellValue::Bool(true))]] };
        assert_eq!(t.cell(0, 0), Some(&CellValue::Bool(true)));
        assert_eq!(t.cell(0, 1), None);
        assert_eq!(t.cell(5, 0), None);
        assert_eq!(t.column_index("b"), Some(1));
    }
}
