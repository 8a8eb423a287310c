use std::path::PathBuf;

use crate::types::ResultKind;

pub enum Command {
    /// Compile a target and print the pipeline.
    Compile {
        /// Target text, or `@path` to read it from a file.
        target: String,
        collection: Option<String>,
        kind: ResultKind,
        from_ms: i64,
        to_ms: i64,
        max_data_points: i64,
        /// Data-source settings JSON supplying stage templates.
        settings: Option<PathBuf>,
    },
    /// Decode NDJSON documents as if an aggregation had returned them.
    Map {
        kind: ResultKind,
        input: PathBuf,
        ref_id: String,
    },
    /// Run a full request against fixture collections.
    Query {
        request: PathBuf,
        fixtures: Option<PathBuf>,
    },
    TestConnection {
        settings: Option<PathBuf>,
        fixtures: Option<PathBuf>,
    },
}
