use bson::{Bson, DateTime, Document, doc};
use mongo_datasource::errors::DsError;
use mongo_datasource::response::{decode, decode_table, decode_timeseries};
use mongo_datasource::types::{CellValue, Payload, QueryResult, Response, ResultKind};
use serde_json::json;
use std::cell::Cell;

fn point(name: &str, value: impl Into<Bson>, ms: i64) -> Document {
    doc! {"name": name, "value": value.into(), "ts": DateTime::from_millis(ms)}
}

#[test]
fn interleaved_points_group_by_name() {
    let docs = vec![point("a", 1.0, 1), point("b", 2, 1), point("a", 3_i64, 2), point("b", 4.5, 2)];
    let series = decode_timeseries(docs.into_iter().map(Ok)).unwrap();
    let names: Vec<&str> = series.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b"]);
    let a: Vec<(i64, f64)> = series[0].points.iter().map(|p| (p.timestamp, p.value)).collect();
    assert_eq!(a, vec![(1, 1.0), (2, 3.0)]);
    assert_eq!(series[1].points[1].value, 4.5);
}

#[test]
fn table_columns_follow_first_appearance() {
    let docs = vec![doc! {"b": 1, "a": 2}, doc! {"a": 3, "c": 4}];
    let t = decode_table(docs.into_iter().map(Ok)).unwrap();
    assert_eq!(t.columns, vec!["b", "a", "c"]);
    assert_eq!(t.rows[0].len(), 2);
    assert_eq!(t.cell(0, 0), Some(&CellValue::Int64(1)));
    assert_eq!(t.cell(0, 1), Some(&CellValue::Int64(2)));
    assert_eq!(t.cell(0, 2), None);
    assert_eq!(t.cell(1, 0), None);
    assert_eq!(t.cell(1, 1), Some(&CellValue::Int64(3)));
    assert_eq!(t.cell(1, 2), Some(&CellValue::Int64(4)));
}

#[test]
fn unsupported_table_type_names_field_and_type() {
    let docs = vec![doc! {"ok": true, "tags": ["x"]}];
    match decode_table(docs.into_iter().map(Ok)) {
        Err(DsError::UnsupportedType { field, type_name }) => {
            assert_eq!(field, "tags");
            assert_eq!(type_name, "array");
        }
        other => panic!("unexpected {other:?}"),
    }
    let e = decode_table(vec![Ok(doc! {"n": Bson::Null})]).unwrap_err();
    assert_eq!(e.to_string(), "Could not handle type null of n");
}

#[test]
fn decoding_stops_at_first_failure() {
    let pulled = Cell::new(0);
    let docs = (0..10).map(|i| {
        pulled.set(pulled.get() + 1);
        if i == 2 { Ok(doc! {"name": "x", "value": "bad", "ts": DateTime::from_millis(0)}) } else { Ok(point("x", 1.0, i)) }
    });
    let e = decode(ResultKind::Timeserie, "A", docs).unwrap_err();
    assert!(matches!(e, DsError::Decode(_)));
    assert_eq!(pulled.get(), 3);
}

#[test]
fn cursor_errors_propagate() {
    let docs = vec![Ok(doc! {"a": 1}), Err(DsError::Execution("cursor killed".into()))];
    let e = decode(ResultKind::Table, "A", docs).unwrap_err();
    assert!(matches!(e, DsError::Execution(m) if m == "cursor killed"));
}

#[test]
fn response_wire_shape() {
    let series = decode(ResultKind::Timeserie, "A", vec![Ok(point("cpu", 0.5, 1_000))]).unwrap();
    let table = decode(
        ResultKind::Table,
        "B",
        vec![Ok(doc! {"host": "web", "up": true, "at": DateTime::from_millis(7)})],
    )
    .unwrap();
    let failed = QueryResult::error("C", "boom");
    let response = Response { results: vec![series, table, failed] };
    let v = serde_json::to_value(&response).unwrap();
    assert_eq!(
        v,
        json!({"results": [
            {"refId": "A", "series": [{"name": "cpu", "points": [{"timestamp": 1000, "value": 0.5}]}]},
            {"refId": "B", "table": {
                "columns": ["host", "up", "at"],
                "rows": [[
                    {"kind": "string", "value": "web"},
                    {"kind": "bool", "value": true},
                    {"kind": "dateTime", "value": 7}
                ]]
            }},
            {"refId": "C", "error": "boom"}
        ]})
    );
    let back: Response = serde_json::from_value(v).unwrap();
    assert_eq!(back, response);
}

#[test]
fn empty_cursor_gives_empty_payloads() {
    let r = decode(ResultKind::Table, "A", std::iter::empty()).unwrap();
    assert_eq!(r.payload, Payload::Table(Default::default()));
    let r = decode(ResultKind::Timeserie, "A", std::iter::empty()).unwrap();
    assert_eq!(r.payload, Payload::Series(vec![]));
}
