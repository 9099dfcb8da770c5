//! Query Executor
//!
//! Runs one statement and converts the outcome to JSON. Parameters are bound
//! positionally, never spliced into the text. Statements are never kept
//! prepared between requests, so schema changes and differently shaped
//! parameters never meet a stale plan.

use crate::database::cells::row_to_json;
use crate::database::params::bind_params;
use crate::database::types::QueryOutcome;
use crate::error::{PluginError, Result};
use futures::TryStreamExt;
use serde_json::Value as JsonValue;
use sqlx::postgres::{PgConnection, PgPool, PgTypeInfo, Postgres};
use sqlx::{Connection, Either, Executor, Statement};

/// Run `sql` with `params` on one session from `pool`
///
/// The statement is described first so PostgreSQL infers the parameter
/// types; if the description has result columns the rows are fetched,
/// otherwise the affected-row count is reported. Multi-statement text
/// without parameters runs as a script.
pub async fn execute_statement(
    pool: &PgPool,
    sql: &str,
    params: &[JsonValue],
) -> Result<QueryOutcome> {
    let mut conn = pool.acquire().await?;

    let (param_types, returns_rows) = match describe(&mut conn, sql).await {
        Ok(description) => description,
        Err(e) if params.is_empty() && is_multi_statement(&e) => {
            return run_script(&mut conn, sql).await;
        }
        Err(e) => return Err(e),
    };

    let query = bind_params(&param_types, params)?
        .into_iter()
        .fold(sqlx::query::<Postgres>(sql).persistent(false), |query, param| {
            query.bind(param)
        });

    if returns_rows {
        let rows = query.fetch_all(&mut *conn).await?;
        Ok(QueryOutcome::Rows(rows.iter().map(row_to_json).collect()))
    } else {
        let result = query.execute(&mut *conn).await?;
        Ok(QueryOutcome::Affected(result.rows_affected()))
    }
}

/// Inferred parameter types and whether the statement returns rows
async fn describe(conn: &mut PgConnection, sql: &str) -> Result<(Vec<PgTypeInfo>, bool)> {
    let statement = (&mut *conn).prepare(sql).await?;
    let param_types = match statement.parameters() {
        Some(Either::Left(types)) => types.to_vec(),
        _ => Vec::new(),
    };
    let returns_rows = !statement.columns().is_empty();

    // `prepare` caches by SQL text; a cached entry would be reused by the
    // unnamed execution below
    conn.clear_cached_statements().await?;

    Ok((param_types, returns_rows))
}

fn is_multi_statement(error: &PluginError) -> bool {
    match error {
        PluginError::Database(sqlx::Error::Database(e)) => {
            e.message().contains("cannot insert multiple commands")
        }
        _ => false,
    }
}

/// Run several statements over the simple query protocol
///
/// Only the last statement's outcome is reported.
async fn run_script(conn: &mut PgConnection, sql: &str) -> Result<QueryOutcome> {
    let mut results = sqlx::raw_sql(sql).fetch_many(conn);
    let mut rows = Vec::new();
    let mut outcome = QueryOutcome::Affected(0);

    while let Some(step) = results.try_next().await? {
        match step {
            Either::Left(done) => {
                outcome = if rows.is_empty() {
                    QueryOutcome::Affected(done.rows_affected())
                } else {
                    QueryOutcome::Rows(std::mem::take(&mut rows))
                };
            }
            Either::Right(row) => rows.push(row_to_json(&row)),
        }
    }
    Ok(outcome)
}
