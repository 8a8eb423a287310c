//! Host-facing entry point.
//!
//! The host sends one [`DatasourceRequest`] per dashboard refresh. [`Plugin`] builds a
//! [`QueryService`] for the request's data source and forwards the batch to it. Nothing is
//! kept between requests.

use serde::{Deserialize, Serialize};

use crate::config::DataSourceSettings;
use crate::errors::DsError;
use crate::query::QueryDescription;
use crate::service::{ConnectionStatus, QueryService, Status};
use crate::store::Connector;
use crate::types::{Response, TimeRange};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasourceInfo {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub name: String,
    /// Data-source settings as JSON text.
    #[serde(default)]
    pub json_data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryModel {
    pub ref_id: String,
    #[serde(default)]
    pub max_data_points: i64,
    #[serde(default)]
    pub interval_ms: i64,
    /// The free-form query description as JSON text.
    #[serde(default)]
    pub model_json: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasourceRequest {
    pub time_range: TimeRange,
    #[serde(default)]
    pub datasource: DatasourceInfo,
    pub queries: Vec<QueryModel>,
}

pub struct Plugin<C> {
    connector: C,
}

impl<C: Connector + Clone> Plugin<C> {
    #[must_use]
    pub fn new(connector: C) -> Self {
        Self { connector }
    }

    /// Build the service for one data source.
    ///
    /// # Errors
    /// `Config` when the data source's settings are unusable.
    pub fn service(&self, datasource: &DatasourceInfo) -> Result<QueryService<C>, DsError> {
        let settings = DataSourceSettings::from_json(&datasource.json_data)?;
        Ok(QueryService::new(self.connector.clone(), settings))
    }

    /// Answer a request. Always returns a well-formed response; failures are carried as
    /// error results.
    #[must_use]
    pub fn query(&self, request: &DatasourceRequest) -> Response {
        log::debug!(
            "Query datasource={} range={}..{} queries={}",
            request.datasource.name,
            request.time_range.from_ms,
            request.time_range.to_ms,
            request.queries.len()
        );
        let service = match self.service(&request.datasource) {
            Ok(s) => s,
            Err(e) => {
                log::error!("{e}");
                return Response::fallback_error(e.to_string());
            }
        };
        let descriptions: Vec<QueryDescription> = request
            .queries
            .iter()
            .map(|q| QueryDescription::from_json_or_rejected(&q.ref_id, &q.model_json, q.max_data_points))
            .collect();
        service.query(request.time_range, &descriptions)
    }

    /// Decode a JSON request, answer it, and encode the response.
    ///
    /// # Errors
    /// `Json` when the request itself cannot be decoded; this is the only transport-level
    /// failure.
    pub fn query_json(&self, request_json: &str) -> Result<String, DsError> {
        let request: DatasourceRequest = serde_json::from_str(request_json)?;
        let response = self.query(&request);
        Ok(serde_json::to_string(&response)?)
    }

    #[must_use]
    pub fn test_connection(&self, datasource: &DatasourceInfo) -> ConnectionStatus {
        match self.service(datasource) {
            Ok(service) => service.test_connection(),
            Err(e) => ConnectionStatus { status: Status::Error, message: e.to_string() },
        }
    }
}
