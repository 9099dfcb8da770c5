//! Tests against a live PostgreSQL server
//!
//! Set TEST_DATABASE_URL (postgresql://...) to run them; otherwise each test
//! returns early.

use postgresql_plugin::database::{
    ConnectionCache, DatabaseInfoRequest, PostgresService, QueryRequest, QueryService,
};
use postgresql_plugin::database::{JsonRow, QueryResponse};
use serde_json::{json, Value};
use std::sync::Arc;

fn database_url() -> Option<String> {
    std::env::var("TEST_DATABASE_URL")
        .ok()
        .filter(|url| url.starts_with("postgresql://"))
}

fn service() -> PostgresService {
    PostgresService::new(Arc::new(ConnectionCache::new()))
}

/// The single row of a successful response
fn only_row(response: QueryResponse) -> JsonRow {
    assert!(response.success, "{:?}", response.error);
    let mut rows = response.data.expect("row-set response");
    assert_eq!(rows.len(), 1);
    rows.remove(0)
}

#[tokio::test]
async fn test_select_one() {
    let Some(url) = database_url() else { return };
    let service = service();

    let response = service.execute_query(QueryRequest::new(&url, "SELECT 1 AS one")).await;
    assert!(response.success, "{:?}", response.error);
    assert_eq!(response.data, Some(vec![json!({"one": 1}).as_object().unwrap().clone()]));
    assert!(response.affected_rows.is_none());
    assert!(response.execution_time_ms.is_some());

    service.shutdown().await;
}

#[tokio::test]
async fn test_parameters_and_writes() {
    let Some(url) = database_url() else { return };
    let service = service();
    let run = |sql: &str, params: Vec<serde_json::Value>| {
        service.execute_query(QueryRequest::new(&url, sql).with_params(params))
    };

    let response = run("CREATE TEMP TABLE plugin_items (id int, name text, meta jsonb)", vec![]).await;
    assert!(response.success, "{:?}", response.error);
    assert!(response.data.is_none());

    let response = run(
        "INSERT INTO plugin_items VALUES ($1, $2, $3), ($4, $5, NULL)",
        vec![json!(1), json!("a"), json!({"k": true}), json!(2), json!("b")],
    )
    .await;
    assert!(response.success, "{:?}", response.error);
    assert_eq!(response.affected_rows, Some(2));
    assert!(response.data.is_none());

    let response = run("SELECT id, name, meta FROM plugin_items ORDER BY id", vec![]).await;
    let rows = response.data.unwrap();
    assert_eq!(rows.len(), 2);
    let keys: Vec<&String> = rows[0].keys().collect();
    assert_eq!(keys, ["id", "name", "meta"]);
    assert_eq!(rows[0]["meta"], json!({"k": true}));
    assert_eq!(rows[1]["meta"], serde_json::Value::Null);

    // Empty result sets are still row-sets
    let response = run("SELECT id FROM plugin_items WHERE id = $1", vec![json!(42)]).await;
    assert_eq!(response.data, Some(vec![]));

    let response = run("SELECT * FROM no_such_table", vec![]).await;
    assert!(!response.success);
    assert!(response.error.unwrap().contains("no_such_table"));
    assert!(response.execution_time_ms.is_some());

    service.shutdown().await;
}

#[tokio::test]
async fn test_database_info_ordering() {
    let Some(url) = database_url() else { return };
    let service = service();
    let run = |sql: &str| service.execute_query(QueryRequest::new(&url, sql));

    run("DROP TABLE IF EXISTS plugin_zeta, plugin_alpha").await;
    run("CREATE TABLE plugin_zeta (b text, a int NOT NULL DEFAULT 5)").await;
    run("CREATE TABLE plugin_alpha (id serial PRIMARY KEY)").await;

    let response = service.database_info(DatabaseInfoRequest::new(&url)).await;
    assert!(response.success, "{:?}", response.error);
    let tables = response.tables.unwrap();

    let names: Vec<&str> = tables.iter().map(|t| t.table_name.as_str()).collect();
    let alpha = names.iter().position(|n| *n == "plugin_alpha").unwrap();
    let zeta = names.iter().position(|n| *n == "plugin_zeta").unwrap();
    assert!(alpha < zeta);

    let zeta = &tables[zeta];
    assert_eq!(zeta.columns[0].column_name, "b");
    assert!(zeta.columns[0].is_nullable);
    assert_eq!(zeta.columns[0].column_default, None);
    assert_eq!(zeta.columns[1].column_name, "a");
    assert!(!zeta.columns[1].is_nullable);
    assert_eq!(zeta.columns[1].column_default.as_deref(), Some("5"));

    run("DROP TABLE plugin_zeta, plugin_alpha").await;
    service.shutdown().await;
}

#[tokio::test]
async fn test_one_pool_per_url_under_sequential_use() {
    let Some(url) = database_url() else { return };
    let cache = Arc::new(ConnectionCache::new());
    let service = PostgresService::new(cache.clone());

    for _ in 0..3 {
        let response = service.execute_query(QueryRequest::new(&url, "SELECT 1")).await;
        assert!(response.success);
    }
    assert_eq!(cache.len().await, 1);
    let pool = cache.acquire(&url).await.unwrap();
    assert!(pool.size() <= 1);

    cache.release_all().await;
}

#[tokio::test]
async fn test_parameters_take_inferred_types() {
    let Some(url) = database_url() else { return };
    let service = service();
    let run = |sql: &str, params: Vec<Value>| {
        service.execute_query(QueryRequest::new(&url, sql).with_params(params))
    };

    let response = run(
        "CREATE TEMP TABLE typed_items (id int, ts timestamp, price numeric, tags text[], active bool)",
        vec![],
    )
    .await;
    assert!(response.success, "{:?}", response.error);

    let insert = "INSERT INTO typed_items VALUES ($1, $2, $3, $4, $5)";
    let response = run(insert, vec![Value::Null; 5]).await;
    assert!(response.success, "{:?}", response.error);
    assert_eq!(response.affected_rows, Some(1));

    let response = run(
        insert,
        vec![json!(1), json!("2024-01-01 10:00:00"), json!("9.99"), json!(["a", "b"]), json!("true")],
    )
    .await;
    assert!(response.success, "{:?}", response.error);

    // A string parameter compared against an integer column
    let row = only_row(run("SELECT * FROM typed_items WHERE id = $1", vec![json!("1")]).await);
    assert_eq!(row["ts"], "2024-01-01T10:00:00");
    assert_eq!(row["price"], "9.99");
    assert_eq!(row["tags"], json!(["a", "b"]));
    assert_eq!(row["active"], true);

    let row = only_row(run("SELECT count(*) AS n FROM typed_items WHERE id IS NULL", vec![]).await);
    assert_eq!(row["n"], 1);

    service.shutdown().await;
}

#[tokio::test]
async fn test_reused_sql_with_other_parameter_kinds() {
    let Some(url) = database_url() else { return };
    let service = service();
    let run = |params: Vec<Value>| {
        service.execute_query(QueryRequest::new(&url, "SELECT $1::text AS v").with_params(params))
    };

    assert_eq!(only_row(run(vec![json!(12345678)]).await)["v"], "12345678");
    assert_eq!(only_row(run(vec![json!("abc")]).await)["v"], "abc");
    assert_eq!(only_row(run(vec![Value::Null]).await)["v"], Value::Null);

    service.shutdown().await;
}

#[tokio::test]
async fn test_select_star_after_schema_change() {
    let Some(url) = database_url() else { return };
    let service = service();
    let run = |sql: &str| service.execute_query(QueryRequest::new(&url, sql));

    run("CREATE TEMP TABLE evolving (id int)").await;
    run("INSERT INTO evolving VALUES (1)").await;
    let row = only_row(run("SELECT * FROM evolving").await);
    assert_eq!(row.len(), 1);

    let response = run("ALTER TABLE evolving ADD COLUMN extra int").await;
    assert!(response.success, "{:?}", response.error);

    let row = only_row(run("SELECT * FROM evolving").await);
    let keys: Vec<&String> = row.keys().collect();
    assert_eq!(keys, ["id", "extra"]);
    assert_eq!(row["extra"], Value::Null);

    service.shutdown().await;
}

#[tokio::test]
async fn test_parameter_errors() {
    let Some(url) = database_url() else { return };
    let service = service();
    let run = |sql: &str, params: Vec<Value>| {
        service.execute_query(QueryRequest::new(&url, sql).with_params(params))
    };

    let response = run("SELECT $1::int + $2::int AS n", vec![json!(1)]).await;
    assert!(!response.success);
    assert!(response.error.unwrap().contains("requires 2"));

    let response = run("SELECT $1::int AS n", vec![json!("one")]).await;
    assert!(!response.success);
    assert!(response.error.unwrap().starts_with("Invalid value for parameter $1"));

    let row = only_row(run("SELECT $1::bytea AS b", vec![json!("\\xdead")]).await);
    assert_eq!(row["b"], "\\xdead");

    service.shutdown().await;
}

#[tokio::test]
async fn test_multi_statement_script() {
    let Some(url) = database_url() else { return };
    let service = service();
    let run = |sql: &str| service.execute_query(QueryRequest::new(&url, sql));

    let response = run(
        "DROP TABLE IF EXISTS script_items; \
         CREATE TEMP TABLE script_items (id int); \
         INSERT INTO script_items VALUES (1), (2)",
    )
    .await;
    assert!(response.success, "{:?}", response.error);
    assert_eq!(response.affected_rows, Some(2));

    let response = run("UPDATE script_items SET id = id + 10; SELECT id FROM script_items ORDER BY id").await;
    assert!(response.success, "{:?}", response.error);
    assert_eq!(response.data.unwrap(), vec![
        json!({"id": 11}).as_object().unwrap().clone(),
        json!({"id": 12}).as_object().unwrap().clone(),
    ]);

    // Scripts cannot take parameters
    let response = service
        .execute_query(
            QueryRequest::new(&url, "SELECT 1; SELECT $1::int").with_params(vec![json!(1)]),
        )
        .await;
    assert!(!response.success);

    service.shutdown().await;
}

const EXTENDED_TYPES_QUERY: &str = "SELECT interval '1 day 2 hours' AS iv, \
    '10.0.0.1'::inet AS ip, '192.168.0.0/16'::cidr AS net, ARRAY[1.5::numeric] AS na, \
    '10:00:00+02'::timetz AS tz, '08:00:2b:01:02:03'::macaddr AS mac, \
    ARRAY['2024-01-01'::date] AS dates, ARRAY[NULL, 'x']::text[] AS sparse";

#[tokio::test]
async fn test_extended_types_decode() {
    let Some(url) = database_url() else { return };
    let service = service();
    let run = |sql: &str| service.execute_query(QueryRequest::new(&url, sql));

    let expected = json!({
        "iv": "1 day 02:00:00",
        "ip": "10.0.0.1",
        "net": "192.168.0.0/16",
        "na": ["1.5"],
        "tz": "10:00:00+02",
        "mac": "08:00:2b:01:02:03",
        "dates": ["2024-01-01"],
        "sparse": [null, "x"],
    });

    let row = only_row(run(EXTENDED_TYPES_QUERY).await);
    assert_eq!(Value::Object(row), expected);

    // Same values through the text protocol
    let script = format!("SELECT 1; {}", EXTENDED_TYPES_QUERY);
    let row = only_row(run(&script).await);
    assert_eq!(Value::Object(row), expected);

    let row = only_row(run("SELECT 12.34::money AS m, 'a b'::tsvector AS tv").await);
    assert_eq!(row["m"], "12.34");
    assert_eq!(row["tv"], "<unsupported type tsvector>");

    service.shutdown().await;
}
