use thiserror::Error;

#[derive(Debug, Error)]
pub enum DsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serde JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Malformed query: {0}")]
    MalformedQuery(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Failed to parse stage macro {name}: {reason}")]
    MacroExpansion { name: String, reason: String },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Could not handle type {type_name} of {field}")]
    UnsupportedType { field: String, type_name: String },

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Execution error: {0}")]
    Execution(String),
}

impl DsError {
    /// Short machine-readable kind, used in log lines and CLI JSON output.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::Json(_) => "json",
            Self::Config(_) => "config",
            Self::MalformedQuery(_) => "malformed_query",
            Self::UnsupportedOperation(_) => "unsupported_operation",
            Self::MacroExpansion { .. } => "macro_expansion",
            Self::Decode(_) => "decode",
            Self::UnsupportedType { .. } => "unsupported_type",
            Self::Connection(_) => "connection",
            Self::Execution(_) => "execution",
        }
    }
}
