//! Integration tests for the MySQL connection and completion store
//!
//! These need Docker and are ignored by default:
//! `cargo test -p ts-sync-mysql -- --ignored`
#![allow(clippy::uninlined_format_args)]

use anyhow::Result;
use chrono::NaiveDate;
use sync_core::{Connection, RowSet, Value};
use sync_state::CompletionStore;
use ts_sync_mysql::testing::MySqlContainer;
use ts_sync_mysql::{MySqlCompletionStore, StateTables};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const TEST_PORT: u16 = 13319;

fn init_logging() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_mysql_backend_round_trip() -> Result<()> {
    init_logging();

    let container = MySqlContainer::new("ts-sync-mysql-backend", TEST_PORT);
    container.start()?;
    container.wait_until_ready(90).await?;

    container
        .seed(
            "CREATE TABLE sales (date DATE, region VARCHAR(20), amount DOUBLE);
             INSERT INTO sales VALUES ('2024-01-01', 'north', 1.5), ('2024-01-02', 'south', 2.5);
             CREATE TABLE to_update_tables (table_name VARCHAR(50));
             INSERT INTO to_update_tables VALUES ('sales_job')",
        )
        .await?;

    let db = container.connection()?;

    // ==== query ====
    let rows = db.query("SELECT * FROM sales ORDER BY date").await?;
    assert_eq!(rows.columns(), &["date", "region", "amount"]);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows.rows()[0][0], Value::Date(d("2024-01-01")));
    assert_eq!(rows.rows()[1][2], Value::Float(2.5));

    // ==== overwrite_by_index replaces only the supplied dates ====
    let replacement = RowSet::new(["date", "region", "amount"])
        .with_row(vec![
            Value::Date(d("2024-01-02")),
            Value::text("east"),
            Value::Float(9.0),
        ])?;
    db.overwrite_by_index("sales", "date", &replacement).await?;
    let rows = db.query("SELECT region FROM sales ORDER BY date").await?;
    assert_eq!(
        rows.column_values("region")?,
        vec![&Value::text("north"), &Value::text("east")]
    );

    // ==== upsert ====
    container
        .seed("CREATE TABLE dim (id INT PRIMARY KEY, name VARCHAR(20))")
        .await?;
    let first = RowSet::new(["id", "name"]).with_row(vec![Value::Int(1), Value::text("a")])?;
    let second = RowSet::new(["id", "name"]).with_row(vec![Value::Int(1), Value::text("b")])?;
    db.upsert("dim", &["id".to_string()], &first).await?;
    db.upsert("dim", &["id".to_string()], &second).await?;
    let rows = db.query("SELECT name FROM dim").await?;
    assert_eq!(rows.column_values("name")?, vec![&Value::text("b")]);

    // ==== shard helpers ====
    assert!(db.table_exists("sales").await?);
    assert!(!db.table_exists("sales2099").await?);
    db.create_table_like("sales2099", "sales").await?;
    assert!(db.table_exists("sales2099").await?);

    // ==== completion store ====
    let store = MySqlCompletionStore::new(container.get_pool()?, StateTables::default());
    store.ensure_schema().await?;
    store
        .commit("sales_job", &[d("2024-01-01"), d("2024-01-02")])
        .await?;
    // Recommitting the same dates must not violate the unique key
    store.commit("sales_job", &[d("2024-01-02")]).await?;

    let records = store.load_since(d("2024-01-01"), d("2024-01-31")).await?;
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.job_name == "sales_job"));

    assert_eq!(
        store.registered_jobs().await?,
        Some(vec!["sales_job".to_string()])
    );

    Ok(())
}
