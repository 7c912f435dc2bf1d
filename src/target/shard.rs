//! Year-sharded target tables.
//!
//! A sharded target named `sales` is physically stored as `sales2023`,
//! `sales2024`, ... with the year taken from each row's index date.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use sync_core::{date_from_value, year_of, Connection, Result, RowSet, SyncError};
use tracing::info;

/// Physical table holding `year`'s rows.
pub fn shard_name(base: &str, year: i32) -> String {
    format!("{base}{year}")
}

/// Split `rows` into one row set per calendar year of `index_field`.
pub fn split_by_year(rows: &RowSet, index_field: &str) -> Result<BTreeMap<i32, RowSet>> {
    let index = rows.require_column(index_field)?;
    let mut groups: BTreeMap<i32, Vec<sync_core::Row>> = BTreeMap::new();
    for row in rows.rows() {
        let date = date_from_value(&row[index])
            .map_err(|e| SyncError::Shape(format!("index column '{index_field}': {e}")))?;
        groups.entry(year_of(date)).or_default().push(row.clone());
    }
    Ok(groups
        .into_iter()
        .map(|(year, group)| (year, rows.with_same_columns(group)))
        .collect())
}

/// Whether `today` falls within `precreate_days` of 31 December.
pub fn near_year_end(today: NaiveDate, precreate_days: u32) -> bool {
    let Some(year_end) = NaiveDate::from_ymd_opt(today.year(), 12, 31) else {
        return false;
    };
    (year_end - today).num_days() <= i64::from(precreate_days)
}

/// Create next year's shard from this year's when the year is about to end.
///
/// Returns the name of the table created, if any.
pub async fn ensure_next_shard(
    db: &dyn Connection,
    base: &str,
    today: NaiveDate,
    precreate_days: u32,
) -> Result<Option<String>> {
    if !near_year_end(today, precreate_days) {
        return Ok(None);
    }

    let current = shard_name(base, today.year());
    let next = shard_name(base, today.year() + 1);
    if db.table_exists(&next).await? || !db.table_exists(&current).await? {
        return Ok(None);
    }

    db.create_table_like(&next, &current).await?;
    info!("Created shard {} from {} on {}", next, current, db.describe());
    Ok(Some(next))
}
