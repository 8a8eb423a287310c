use bson::{Bson, Document};
use std::collections::HashMap;

use crate::errors::DsError;
use crate::json::type_name;
use crate::types::{Point, Series};

/// Groups points by series name, keeping each series' points in arrival order.
#[derive(Debug, Default)]
pub struct SeriesAccumulator {
    index: HashMap<String, usize>,
    series: Vec<Series>,
}

impl SeriesAccumulator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: &str, point: Point) {
        let idx = match self.index.get(name) {
            Some(&i) => i,
            None => {
                self.series.push(Series { name: name.to_string(), points: Vec::new() });
                self.index.insert(name.to_string(), self.series.len() - 1);
                self.series.len() - 1
            }
        };
        self.series[idx].points.push(point);
    }

    /// Decode `name`, `value` and `ts` from one result document and append the point.
    ///
    /// # Errors
    /// `Decode` when a field is missing or has the wrong type.
    pub fn push_document(&mut self, doc: &Document) -> Result<(), DsError> {
        let name = match doc.get("name") {
            Some(Bson::String(s)) => s.as_str(),
            other => return Err(field_error("name", "string", other)),
        };
        #[allow(clippy::cast_precision_loss)]
        let value = match doc.get("value") {
            Some(Bson::Double(f)) => *f,
            Some(Bson::Int32(i)) => f64::from(*i),
            Some(Bson::Int64(i)) => *i as f64,
            other => return Err(field_error("value", "number", other)),
        };
        let timestamp = match doc.get("ts") {
            Some(Bson::DateTime(dt)) => dt.timestamp_millis(),
            other => return Err(field_error("ts", "date", other)),
        };
        self.push(name, Point { timestamp, value });
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.series.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Series in first-seen order.
    #[must_use]
    pub fn finish(self) -> Vec<Series> {
        self.series
    }
}

fn field_error(field: &str, expected: &str, found: Option<&Bson>) -> DsError {
    match found {
        None => DsError::Decode(format!("missing field '{field}'")),
        Some(v) => DsError::Decode(format!("field '{field}': expected {expected}, found {}", type_name(v))),
    }
}

/// Decode a stream of `{name, value, ts}` documents into named series.
///
/// # Errors
/// `Decode` on the first malformed document, or the first error the stream yields.
pub fn decode_timeseries<I>(docs: I) -> Result<Vec<Series>, DsError>
where
    I: IntoIterator<Item = Result<Document, DsError>>,
{
    let mut acc = SeriesAccumulator::new();
    for doc in docs {
        acc.push_document(&doc?)?;
    }
    Ok(acc.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::{DateTime, doc};

    fn ts(ms: i64) -> DateTime {
        DateTime::from_millis(ms)
    }

    #[test]
    fn groups_interleaved_names() {
        let docs = vec![
            doc! {"name": "x", "value": 1.0, "ts": ts(10)},
            doc! {"name": "y", "value": 2, "ts": ts(20)},
            doc! {"name": "x", "value": 3_i64, "ts": ts(30)},
        ];
        let series = decode_timeseries(docs.into_iter().map(Ok)).unwrap();
        assert_eq!(series.len(), 2);
        let x = series.iter().find(|s| s.name == "x").unwrap();
        let y = series.iter().find(|s| s.name == "y").unwrap();
        assert_eq!(x.points, vec![Point { timestamp: 10, value: 1.0 }, Point { timestamp: 30, value: 3.0 }]);
        assert_eq!(y.points, vec![Point { timestamp: 20, value: 2.0 }]);
    }

    #[test]
    fn arrival_order_is_kept_within_a_series() {
        let docs = vec![
            doc! {"name": "x", "value": 1.0, "ts": ts(50)},
            doc! {"name": "x", "value": 2.0, "ts": ts(10)},
        ];
        let series = decode_timeseries(docs.into_iter().map(Ok)).unwrap();
        let stamps: Vec<i64> = series[0].points.iter().map(|p| p.timestamp).collect();
        assert_eq!(stamps, vec![50, 10]);
    }

    #[test]
    fn missing_and_mistyped_fields_fail() {
        let cases = vec![
            doc! {"value": 1.0, "ts": ts(1)},
            doc! {"name": 5, "value": 1.0, "ts": ts(1)},
            doc! {"name": "x", "value": "1", "ts": ts(1)},
            doc! {"name": "x", "value": 1.0},
            doc! {"name": "x", "value": 1.0, "ts": 12_i64},
        ];
        for d in cases {
            let e = decode_timeseries(vec![Ok(d.clone())]).unwrap_err();
            assert!(matches!(e, DsError::Decode(_)), "{d}");
        }
    }

    #[test]
    fn error_message_names_field_and_type() {
        let e = decode_timeseries(vec![Ok(doc! {"name": "x", "value": true, "ts": ts(1)})]).unwrap_err();
        assert_eq!(e.to_string(), "Decode error: field 'value': expected number, found bool");
    }

    #[test]
    fn accumulator_reports_size() {
        let mut acc = SeriesAccumulator::new();
        assert!(acc.is_empty());
        acc.push("a", Point { timestamp: 1, value: 1.0 });
        acc.push("a", Point { timestamp: 2, value: 2.0 });
        acc.push("b", Point { timestamp: 1, value: 1.0 });
        assert_eq!(acc.len(), 2);
        assert_eq!(acc.finish()[0].points.len(), 2);
    }
}
