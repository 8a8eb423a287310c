use bson::{Bson, Document};

use super::description::QueryDescription;
use super::macros::expand;
use super::placeholder::substitute;
use super::target::parse_target;
use crate::errors::DsError;
use crate::json::{parse_extjson_array, pipeline_to_extjson, type_name};
use crate::types::{CompiledQuery, ResultKind, StageTemplate, TimeRange};

/// Compile one query description into a collection, a pipeline and a result kind.
///
/// Placeholders are substituted on the raw target text, the text is parsed as extended JSON,
/// and configured stage templates are expanded over the top-level stages.
///
/// # Errors
/// `MalformedQuery`, `UnsupportedOperation` or `MacroExpansion`; see [`compile_text`].
pub fn compile(
    description: &QueryDescription,
    range: TimeRange,
    templates: &[StageTemplate],
) -> Result<CompiledQuery, DsError> {
    if let Some(reason) = &description.rejected {
        return Err(DsError::MalformedQuery(reason.clone()));
    }
    let kind = description.kind()?;
    compile_text(
        &description.target,
        description.collection.as_deref(),
        kind,
        range,
        description.max_data_points,
        templates,
    )
}

/// Compile from loose parts; used by [`compile`] and the CLI.
///
/// # Errors
/// - `MalformedQuery` when no collection resolves or the target is not a stage array.
/// - `UnsupportedOperation` for a `db.<c>.<method>(...)` target whose method is not `aggregate`.
/// - `MacroExpansion` when a matched template renders to invalid stages.
pub fn compile_text(
    target: &str,
    collection: Option<&str>,
    kind: ResultKind,
    range: TimeRange,
    max_data_points: i64,
    templates: &[StageTemplate],
) -> Result<CompiledQuery, DsError> {
    let max_data_points = max_data_points.max(1);
    let text = substitute(target, range.from_ms, range.to_ms, max_data_points);
    log::debug!("Target: {text}");
    let target = parse_target(&text, collection)?;
    let stages = parse_stages(&target.source)?;
    let pipeline = expand(stages, templates, range.from_ms, range.to_ms, max_data_points)?;
    log::debug!("Compiled {} stage(s) for {}: {}", pipeline.len(), target.collection, pipeline_to_extjson(&pipeline));
    Ok(CompiledQuery { collection: target.collection, pipeline, kind })
}

fn parse_stages(source: &str) -> Result<Vec<Document>, DsError> {
    let items = parse_extjson_array(source).map_err(DsError::MalformedQuery)?;
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Bson::Document(d) => Ok(d),
            other => Err(DsError::MalformedQuery(format!(
                "stage {i} must be an object, found {}",
                type_name(&other)
            ))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use serde_json::json;

    fn range() -> TimeRange {
        TimeRange::new(1_000, 2_000)
    }

    #[test]
    fn array_target_with_collection() {
        let d = QueryDescription::from_value(
            "A",
            json!({"target": r#"[{"$match": {"ts": {"$gte": "$from"}}}, {"$limit": "$maxDataPoints"}]"#, "collection": "cpu", "type": "table"}),
            0,
        );
        let c = compile(&d, range(), &[]).unwrap();
        assert_eq!(c.collection, "cpu");
        assert_eq!(c.kind, ResultKind::Table);
        assert_eq!(c.pipeline.len(), 2);
        assert_eq!(c.pipeline[1], doc! {"$limit": 1});
        let ts = c.pipeline[0].get_document("$match").unwrap().get_document("ts").unwrap();
        assert_eq!(ts.get_datetime("$gte").unwrap().timestamp_millis(), 1_000);
    }

    #[test]
    fn call_target() {
        let d = QueryDescription::from_value("A", json!({"target": r#"db.metrics.aggregate([{"$match":{}}])"#}), 0);
        let c = compile(&d, range(), &[]).unwrap();
        assert_eq!(c.collection, "metrics");
        assert_eq!(c.pipeline, vec![doc! {"$match": {}}]);
        assert_eq!(c.kind, ResultKind::Timeserie);
    }

    #[test]
    fn missing_collection_is_malformed() {
        let d = QueryDescription::from_value("A", json!({"target": "[]"}), 0);
        assert!(matches!(compile(&d, range(), &[]), Err(DsError::MalformedQuery(_))));
    }

    #[test]
    fn non_array_target_is_malformed() {
        let d = QueryDescription::from_value("A", json!({"target": r#"{"$match": {}}"#, "collection": "c"}), 0);
        assert!(matches!(compile(&d, range(), &[]), Err(DsError::MalformedQuery(_))));
        let d = QueryDescription::from_value("A", json!({"target": "[1, 2]", "collection": "c"}), 0);
        assert!(matches!(compile(&d, range(), &[]), Err(DsError::MalformedQuery(_))));
    }

    #[test]
    fn unknown_type_is_malformed() {
        let d = QueryDescription::from_value("A", json!({"target": "[]", "collection": "c", "type": "graph"}), 0);
        assert!(matches!(compile(&d, range(), &[]), Err(DsError::MalformedQuery(_))));
    }

    #[test]
    fn templates_expand_after_parse() {
        let t = StageTemplate::new("recent", r#"{"$sort": {"ts": -1}}, {"$limit": "$maxDataPoints"}"#);
        let d = QueryDescription::from_value(
            "A",
            json!({"target": r#"db.cpu.aggregate([{"$match": {}}, {"$recent": ""}])"#}),
            12,
        );
        let c = compile(&d, range(), &[t]).unwrap();
        assert_eq!(
            c.pipeline,
            vec![doc! {"$match": {}}, doc! {"$sort": {"ts": -1}}, doc! {"$limit": 12}]
        );
    }
}
