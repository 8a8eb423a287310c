use crate::errors::DsError;

const DSL_PREFIX: &str = "db.";
const AGGREGATE: &str = "aggregate";

/// A query target split into the collection to run against and the stage-array source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub collection: String,
    pub source: String,
}

/// Split a target into collection and pipeline source.
///
/// Accepted shapes:
/// - a bare JSON array of stages, with the collection supplied separately;
/// - `db.<collection>.aggregate(<array>)`, where the call names the collection itself.
///
/// # Errors
/// `MalformedQuery` when no collection can be resolved or the call is not well formed;
/// `UnsupportedOperation` when the call names a method other than `aggregate`.
pub fn parse_target(text: &str, collection: Option<&str>) -> Result<Target, DsError> {
    let trimmed = text.trim();
    if trimmed.starts_with(DSL_PREFIX) {
        return parse_call(trimmed);
    }
    let collection = collection
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| DsError::MalformedQuery("No collection specified".into()))?;
    Ok(Target { collection: collection.to_string(), source: trimmed.to_string() })
}

fn parse_call(text: &str) -> Result<Target, DsError> {
    let open = text
        .find('(')
        .ok_or_else(|| DsError::MalformedQuery(format!("expected a call, found: {text}")))?;
    let callee = text[..open].trim();
    let rest = &text[open + 1..];
    let close = rest
        .rfind(')')
        .ok_or_else(|| DsError::MalformedQuery("unbalanced parentheses in target".into()))?;
    let trailing = rest[close + 1..].trim();
    if !(trailing.is_empty() || trailing == ";") {
        return Err(DsError::MalformedQuery(format!("unexpected text after call: {trailing}")));
    }
    let (collection, method) = callee[DSL_PREFIX.len()..].rsplit_once('.').ok_or_else(|| {
        DsError::MalformedQuery(format!("expected db.<collection>.{AGGREGATE}(...), found: {callee}"))
    })?;
    let method = method.trim();
    if method != AGGREGATE {
        return Err(DsError::UnsupportedOperation(format!(
            "{method}: only {AGGREGATE} is supported"
        )));
    }
    let collection = collection.trim();
    if collection.is_empty() {
        return Err(DsError::MalformedQuery("No collection specified".into()));
    }
    Ok(Target { collection: collection.to_string(), source: rest[..close].trim().to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_form_extracts_collection_and_body() {
        let t = parse_target(r#"db.metrics.aggregate([{"$match":{}}])"#, None).unwrap();
        assert_eq!(t.collection, "metrics");
        assert_eq!(t.source, r#"[{"$match":{}}]"#);
    }

    #[test]
    fn call_form_ignores_collection_field() {
        let t = parse_target("  db.cpu.aggregate( [] );  ", Some("other")).unwrap();
        assert_eq!(t.collection, "cpu");
        assert_eq!(t.source, "[]");
    }

    #[test]
    fn dotted_collection_names_survive() {
        let t = parse_target("db.system.profile.aggregate([])", None).unwrap();
        assert_eq!(t.collection, "system.profile");
    }

    #[test]
    fn other_methods_are_unsupported() {
        let e = parse_target(r#"db.metrics.find({"a": 1})"#, None).unwrap_err();
        assert!(matches!(e, DsError::UnsupportedOperation(_)));
    }

    #[test]
    fn malformed_calls_are_rejected() {
        for bad in ["db.metrics.aggregate", "db.metrics.aggregate([]", "db.aggregate([])", "db..aggregate([])", "db.m.aggregate([]) extra"] {
            let e = parse_target(bad, None).unwrap_err();
            assert!(matches!(e, DsError::MalformedQuery(_)), "{bad}: {e}");
        }
    }

    #[test]
    fn array_form_requires_collection() {
        let t = parse_target(" [] ", Some("cpu")).unwrap();
        assert_eq!(t, Target { collection: "cpu".into(), source: "[]".into() });
        assert!(matches!(parse_target("[]", None), Err(DsError::MalformedQuery(_))));
        assert!(matches!(parse_target("[]", Some("  ")), Err(DsError::MalformedQuery(_))));
    }
}
