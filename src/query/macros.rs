//! Stage-template expansion.
//!
//! A stage whose operator is `$<name>` for a configured template is replaced by the template's
//! stages, with the stage argument spliced in wherever `$QUERY` appears. Expansion is a single
//! left-to-right pass over the top-level stages: nested stages are not inspected and expander
//! output is never expanded again.

use bson::{Bson, Document};
use serde_json::Value;

use super::placeholder::substitute;
use crate::errors::DsError;
use crate::json::{parse_extjson_array, to_canonical_extjson_text, type_name};
use crate::types::StageTemplate;

pub const QUERY_TOKEN: &str = "$QUERY";

/// Text spliced into a template for a stage argument.
///
/// Strings go in verbatim. Documents and arrays contribute their members without the
/// enclosing braces or brackets, so `{"$m": {"host": "a"}}` splices `"host":"a"`. Other
/// values render as canonical extended JSON so their numeric types are kept.
#[must_use]
pub fn render_argument(arg: &Bson) -> String {
    match arg {
        Bson::String(s) => s.clone(),
        Bson::Document(d) => d
            .iter()
            .map(|(k, v)| format!("{}:{}", Value::String(k.clone()), to_canonical_extjson_text(v)))
            .collect::<Vec<_>>()
            .join(","),
        Bson::Array(items) => items.iter().map(to_canonical_extjson_text).collect::<Vec<_>>().join(","),
        other => to_canonical_extjson_text(other),
    }
}

/// Replace every `$QUERY` in `template` with `argument`.
#[must_use]
pub fn render_template(template: &str, argument: &str) -> String {
    template.replace(QUERY_TOKEN, argument)
}

fn find_template<'t>(stage: &Document, templates: &'t [StageTemplate]) -> Option<(&'t StageTemplate, String)> {
    if stage.len() != 1 {
        return None;
    }
    let (key, arg) = stage.iter().next()?;
    templates.iter().find(|t| *key == t.operator()).map(|t| (t, render_argument(arg)))
}

/// Expand template stages in place.
///
/// # Errors
/// `MacroExpansion` naming the template when its rendered text is not a list of stage objects.
pub fn expand(
    stages: Vec<Document>,
    templates: &[StageTemplate],
    from: i64,
    to: i64,
    max_data_points: i64,
) -> Result<Vec<Document>, DsError> {
    if templates.is_empty() {
        return Ok(stages);
    }
    let mut out = Vec::with_capacity(stages.len());
    for stage in stages {
        let Some((template, argument)) = find_template(&stage, templates) else {
            out.push(stage);
            continue;
        };
        let rendered = substitute(&render_template(&template.stage, &argument), from, to, max_data_points);
        log::debug!("stage {} ==> {}", template.name, rendered);
        let replacement = parse_extjson_array(&format!("[{rendered}]"))
            .map_err(|reason| DsError::MacroExpansion { name: template.name.clone(), reason })?;
        for item in replacement {
            match item {
                Bson::Document(d) => out.push(d),
                other => {
                    return Err(DsError::MacroExpansion {
                        name: template.name.clone(),
                        reason: format!("expected a stage object, found {}", type_name(&other)),
                    });
                }
            }
        }
    }
    Ok(out)
}
