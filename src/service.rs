//! Batch orchestration: connect, compile, execute and decode each query, disconnect.
//!
//! Failures inside one query become an error result for that query and the batch carries on.
//! Failures that prevent the batch from starting, or that happen while disconnecting, replace
//! the whole response with a single error result under [`crate::types::FALLBACK_REF_ID`].

use serde::{Deserialize, Serialize};

use crate::config::DataSourceSettings;
use crate::errors::DsError;
use crate::json::pipeline_to_extjson;
use crate::query::{QueryDescription, QueryType, compile};
use crate::response::decode;
use crate::store::{Connection, Connector};
use crate::types::{CellValue, QueryResult, Response, Table, TimeRange};

pub const METRIC_PING: &str = "ping";
pub const METRIC_LIST_COLLECTIONS: &str = "list_collections";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// Outcome of [`QueryService::test_connection`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub status: Status,
    pub message: String,
}

impl ConnectionStatus {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }
}

/// One configured data source bound to a store connector.
pub struct QueryService<C: Connector> {
    connector: C,
    settings: DataSourceSettings,
}

impl<C: Connector> QueryService<C> {
    #[must_use]
    pub fn new(connector: C, settings: DataSourceSettings) -> Self {
        Self { connector, settings }
    }

    #[must_use]
    pub fn settings(&self) -> &DataSourceSettings {
        &self.settings
    }

    fn connect(&self) -> Result<Connection<C::Handle>, DsError> {
        Connection::open(&self.connector, &self.settings.uri, &self.settings.database)
    }

    /// Run a batch. The first query's `queryType` routes the whole batch; results keep input
    /// order.
    #[must_use]
    pub fn query(&self, range: TimeRange, queries: &[QueryDescription]) -> Response {
        let Some(first) = queries.first() else {
            return Response::default();
        };
        match first.query_type {
            QueryType::Metrics => self.metrics_query(first),
            QueryType::TestConnection => {
                let status = self.test_connection();
                let result = if status.is_success() {
                    QueryResult::series(&first.ref_id, Vec::new())
                } else {
                    QueryResult::error(&first.ref_id, status.message)
                };
                Response { results: vec![result] }
            }
            QueryType::TimeSeries => self.timeseries_query(range, queries),
        }
    }

    fn timeseries_query(&self, range: TimeRange, queries: &[QueryDescription]) -> Response {
        let conn = match self.connect() {
            Ok(c) => c,
            Err(e) => {
                log::error!("{e}");
                return Response::fallback_error(e.to_string());
            }
        };
        let mut results = Vec::with_capacity(queries.len());
        for q in queries {
            let result = self.run_query(&conn, range, q).unwrap_or_else(|e| {
                log::error!("query {} failed ({}): {e}", q.ref_id, e.kind());
                QueryResult::error(&q.ref_id, e.to_string())
            });
            results.push(result);
        }
        if let Err(e) = conn.release() {
            log::error!("{e}");
            return Response::fallback_error(e.to_string());
        }
        Response { results }
    }

    /// Compile, execute and decode a single query on an open connection.
    ///
    /// # Errors
    /// Any compile, execution or decode error for this query.
    pub fn run_query(
        &self,
        conn: &Connection<C::Handle>,
        range: TimeRange,
        query: &QueryDescription,
    ) -> Result<QueryResult, DsError> {
        let compiled = compile(query, range, &self.settings.stages)?;
        log::debug!("Sending to {}: {}", compiled.collection, pipeline_to_extjson(&compiled.pipeline));
        let cursor = conn.aggregate(&compiled.collection, &compiled.pipeline)?;
        log::debug!("{} query for {}", compiled.kind, query.ref_id);
        decode(compiled.kind, &query.ref_id, cursor)
    }

    fn metrics_query(&self, query: &QueryDescription) -> Response {
        let result = self.run_metric(query).unwrap_or_else(|e| {
            log::error!("metric {} failed: {e}", query.target);
            QueryResult::error(&query.ref_id, e.to_string())
        });
        Response { results: vec![result] }
    }

    fn run_metric(&self, query: &QueryDescription) -> Result<QueryResult, DsError> {
        let target = query.target.as_str();
        log::debug!("Got Metrics Target: {target}");
        if target != METRIC_PING && target != METRIC_LIST_COLLECTIONS {
            return Err(DsError::UnsupportedOperation(format!("Unsupported Metric: {target}")));
        }
        let conn = self.connect()?;
        let mut table = Table { columns: vec!["value".to_string()], rows: Vec::new() };
        if target == METRIC_PING {
            conn.ping()?;
        } else {
            let mut names = conn.list_collection_names()?;
            names.sort();
            log::debug!("List Collections: ({}) -> {names:?}", conn.database());
            table.rows = names.into_iter().map(|n| vec![Some(CellValue::String(n))]).collect();
        }
        conn.release()?;
        Ok(QueryResult::table(&query.ref_id, table))
    }

    /// Connect, ping and disconnect without running anything.
    #[must_use]
    pub fn test_connection(&self) -> ConnectionStatus {
        match self.connect().and_then(Connection::release) {
            Ok(()) => ConnectionStatus {
                status: Status::Success,
                message: format!("Connected to database {}", self.settings.database),
            },
            Err(e) => {
                log::error!("test connection failed: {e}");
                ConnectionStatus { status: Status::Error, message: e.to_string() }
            }
        }
    }
}
