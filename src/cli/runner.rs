use bson::Bson;
use std::io::Write;
use std::path::Path;

use crate::api::{DatasourceRequest, Plugin};
use crate::config::DataSourceSettings;
use crate::errors::DsError;
use crate::query::compile_text;
use crate::response::decode;
use crate::service::QueryService;
use crate::store::{MemoryStore, read_ndjson};
use crate::types::TimeRange;

use super::command::Command;
use super::util::{load_settings, read_arg};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OutputMode {
    Human,
    Json,
}

/// Run a command, writing compact JSON to `out`.
///
/// # Errors
/// Any error the command produces; see [`run_with_format`].
pub fn run(cmd: Command, out: &mut impl Write) -> Result<(), DsError> {
    run_with_format(cmd, OutputMode::Json, out)
}

/// # Errors
/// - `Io` when an input file cannot be read or output cannot be written.
/// - Compile or decode errors from `compile` and `map`.
/// - `Connection` when `test-connection` fails.
pub fn run_with_format(cmd: Command, mode: OutputMode, out: &mut impl Write) -> Result<(), DsError> {
    match cmd {
        Command::Compile { target, collection, kind, from_ms, to_ms, max_data_points, settings } => {
            let target = read_arg(&target)?;
            let settings = load_settings(settings.as_deref())?;
            let compiled = compile_text(
                &target,
                collection.as_deref(),
                kind,
                TimeRange::new(from_ms, to_ms),
                max_data_points,
                &settings.stages,
            )?;
            let pipeline =
                Bson::Array(compiled.pipeline.into_iter().map(Bson::Document).collect()).into_relaxed_extjson();
            match mode {
                OutputMode::Json => {
                    let json = serde_json::json!({
                        "collection": compiled.collection,
                        "kind": compiled.kind.as_str(),
                        "pipeline": pipeline,
                    });
                    writeln!(out, "{json}")?;
                }
                OutputMode::Human => {
                    writeln!(out, "collection={} kind={}", compiled.collection, compiled.kind)?;
                    writeln!(out, "{}", serde_json::to_string_pretty(&pipeline)?)?;
                }
            }
            Ok(())
        }
        Command::Map { kind, input, ref_id } => {
            let docs = read_ndjson(&input)?;
            log::debug!("decoding {} document(s) from {}", docs.len(), input.display());
            let result = decode(kind, &ref_id, docs.into_iter().map(Ok))?;
            write_json(out, mode, &result)
        }
        Command::Query { request, fixtures } => {
            let text = std::fs::read_to_string(&request)?;
            let request: DatasourceRequest = serde_json::from_str(&text)?;
            let settings = DataSourceSettings::from_json(&request.datasource.json_data)?;
            let store = fixture_store(&settings.database, fixtures.as_deref())?;
            let response = Plugin::new(store).query(&request);
            write_json(out, mode, &response)
        }
        Command::TestConnection { settings, fixtures } => {
            let settings = load_settings(settings.as_deref())?;
            let store = fixture_store(&settings.database, fixtures.as_deref())?;
            let status = QueryService::new(store, settings).test_connection();
            write_json(out, mode, &status)?;
            if status.is_success() { Ok(()) } else { Err(DsError::Connection(status.message)) }
        }
    }
}

fn fixture_store(database: &str, fixtures: Option<&Path>) -> Result<MemoryStore, DsError> {
    let store = MemoryStore::new();
    if let Some(dir) = fixtures {
        let n = store.load_dir(database, dir)?;
        log::info!("loaded {n} fixture collection(s) from {}", dir.display());
    }
    Ok(store)
}

fn write_json<T: serde::Serialize>(out: &mut impl Write, mode: OutputMode, value: &T) -> Result<(), DsError> {
    let text = match mode {
        OutputMode::Json => serde_json::to_string(value)?,
        OutputMode::Human => serde_json::to_string_pretty(value)?,
    };
    writeln!(out, "{text}")?;
    Ok(())
}
