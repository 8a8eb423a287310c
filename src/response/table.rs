use bson::{Bson, Document};
use std::collections::HashMap;

use crate::errors::DsError;
use crate::json::type_name;
use crate::types::{CellValue, Table};

/// Classify a field value into a table cell.
///
/// # Errors
/// `UnsupportedType` naming the field and the observed BSON type for anything outside the
/// double/int/string/bool/date set.
pub fn classify(field: &str, value: &Bson) -> Result<CellValue, DsError> {
    match value {
        Bson::Double(f) => Ok(CellValue::Double(*f)),
        Bson::Int64(i) => Ok(CellValue::Int64(*i)),
        Bson::Int32(i) => Ok(CellValue::Int64(i64::from(*i))),
        Bson::String(s) => Ok(CellValue::String(s.clone())),
        Bson::Boolean(b) => Ok(CellValue::Bool(*b)),
        Bson::DateTime(dt) => Ok(CellValue::DateTime(dt.timestamp_millis())),
        other => Err(DsError::UnsupportedType {
            field: field.to_string(),
            type_name: type_name(other).to_string(),
        }),
    }
}

/// Columns discovered in first-seen order plus the rows built so far.
#[derive(Debug, Default)]
pub struct TableAccumulator {
    columns: Vec<String>,
    index: HashMap<String, usize>,
    rows: Vec<Vec<Option<CellValue>>>,
}

impl TableAccumulator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn column(&mut self, name: &str) -> usize {
        if let Some(&i) = self.index.get(name) {
            return i;
        }
        self.columns.push(name.to_string());
        self.index.insert(name.to_string(), self.columns.len() - 1);
        self.columns.len() - 1
    }

    /// Append one document as a row sized to the columns known after it was read.
    ///
    /// # Errors
    /// `UnsupportedType` for a field value outside the supported set. Columns registered by
    /// the failing document stay registered; callers abandon the accumulator on error.
    pub fn push_document(&mut self, doc: &Document) -> Result<(), DsError> {
        let mut cells = Vec::with_capacity(doc.len());
        for (key, value) in doc {
            let idx = self.column(key);
            cells.push((idx, classify(key, value)?));
        }
        let mut row = vec![None; self.columns.len()];
        for (idx, cell) in cells {
            row[idx] = Some(cell);
        }
        self.rows.push(row);
        Ok(())
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn finish(self) -> Table {
        Table { columns: self.columns, rows: self.rows }
    }
}

/// Decode arbitrary documents into a table.
///
/// # Errors
/// `UnsupportedType` on the first unrecognized field value, or the first error the stream
/// yields.
pub fn decode_table<I>(docs: I) -> Result<Table, DsError>
where
    I: IntoIterator<Item = Result<Document, DsError>>,
{
    let mut acc = TableAccumulator::new();
    for doc in docs {
        acc.push_document(&doc?)?;
    }
    Ok(acc.finish())
}
