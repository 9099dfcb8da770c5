//! Request and response envelopes
//!
//! These are the JSON bodies exchanged on `/query` and `/database-info`.

use crate::database::schema::TableInfo;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// One result row, column name to value, in column order
pub type JsonRow = Map<String, JsonValue>;

/// Body of `POST /query`
///
/// Missing fields deserialize to empty values so that they are reported by
/// validation instead of as a malformed body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub database_url: String,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub params: Option<Vec<JsonValue>>,
}

impl QueryRequest {
    pub fn new(database_url: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            query: query.into(),
            params: None,
        }
    }

    pub fn with_params(mut self, params: Vec<JsonValue>) -> Self {
        self.params = Some(params);
        self
    }
}

/// Body of `POST /database-info`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseInfoRequest {
    #[serde(default)]
    pub database_url: String,
}

impl DatabaseInfoRequest {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
        }
    }
}

/// What a successful statement produced
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// The statement returned a row-set (possibly empty)
    Rows(Vec<JsonRow>),
    /// The statement only reported an affected-row count
    Affected(u64),
}

/// Response of `POST /query`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<JsonRow>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affected_rows: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time_ms: Option<u64>,
}

impl QueryResponse {
    /// Successful response carrying `outcome`
    pub fn completed(outcome: QueryOutcome, execution_time_ms: u64) -> Self {
        let (data, affected_rows) = match outcome {
            QueryOutcome::Rows(rows) => (Some(rows), None),
            QueryOutcome::Affected(count) => (None, Some(count)),
        };
        Self {
            success: true,
            data,
            affected_rows,
            execution_time_ms: Some(execution_time_ms),
            ..Default::default()
        }
    }

    /// Failure; validation failures carry no timing
    pub fn failed(error: impl Into<String>, execution_time_ms: Option<u64>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            execution_time_ms,
            ..Default::default()
        }
    }
}

/// Response of `POST /database-info`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseInfoResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tables: Option<Vec<TableInfo>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DatabaseInfoResponse {
    pub fn completed(tables: Vec<TableInfo>) -> Self {
        Self {
            success: true,
            tables: Some(tables),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            tables: None,
            error: Some(error.into()),
        }
    }
}
