pub mod api;
pub mod cli;
pub mod config;
pub mod errors;
pub mod json;
pub mod logger;
pub mod query;
pub mod response;
pub mod service;
pub mod store;
pub mod types;

pub use api::{DatasourceInfo, DatasourceRequest, Plugin, QueryModel};
pub use config::DataSourceSettings;
pub use errors::DsError;
pub use query::{QueryDescription, compile};
pub use service::QueryService;
pub use types::{CompiledQuery, QueryResult, Response, ResultKind, TimeRange};

/// Initializes the data source.
///
/// Sets up logging from the `MONGO_DS_LOG_*` environment variables. Call it once, before
/// serving any request.
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    logger::configure_from_env()?;
    Ok(())
}
