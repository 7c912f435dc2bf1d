//! SQL statement builders.

/// MySQL's limit on placeholders in one prepared statement.
const MAX_PLACEHOLDERS: usize = 65_535;

/// Quote an identifier, keeping `schema.table` qualification.
pub fn quote_ident(name: &str) -> String {
    name.split('.')
        .map(|part| format!("`{}`", part.replace('`', "``")))
        .collect::<Vec<_>>()
        .join(".")
}

fn column_list(columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ")
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// Rows per multi-row INSERT so that the statement stays under the
/// placeholder limit.
pub fn rows_per_statement(batch_size: usize, column_count: usize) -> usize {
    let cap = MAX_PLACEHOLDERS / column_count.max(1);
    batch_size.clamp(1, cap.max(1))
}

/// Generate a multi-row INSERT statement.
pub fn batch_insert(table: &str, columns: &[String], row_count: usize) -> String {
    let row_template = format!("({})", placeholders(columns.len()));
    let rows = vec![row_template.as_str(); row_count].join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES {}",
        quote_ident(table),
        column_list(columns),
        rows
    )
}

/// Generate a single-row REPLACE statement.
pub fn replace_row(table: &str, columns: &[String]) -> String {
    format!(
        "REPLACE INTO {} ({}) VALUES ({})",
        quote_ident(table),
        column_list(columns),
        placeholders(columns.len())
    )
}

/// Generate `DELETE ... WHERE column IN (?, ...)`.
pub fn delete_in(table: &str, column: &str, value_count: usize) -> String {
    format!(
        "DELETE FROM {} WHERE {} IN ({})",
        quote_ident(table),
        quote_ident(column),
        placeholders(value_count)
    )
}

/// Generate `CREATE TABLE IF NOT EXISTS new LIKE template`.
pub fn create_table_like(table: &str, template: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} LIKE {}",
        quote_ident(table),
        quote_ident(template)
    )
}

/// DDL for the completion-state table.
pub fn create_state_table(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} (
            `update_date` DATE DEFAULT NULL,
            `job_name` VARCHAR(50) NOT NULL,
            UNIQUE KEY `uk_update_date_job_name` (`update_date`, `job_name`)
        ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4",
        quote_ident(table)
    )
}

/// Delete a job's completion records for a set of dates.
pub fn delete_state(table: &str, date_count: usize) -> String {
    format!(
        "DELETE FROM {} WHERE `job_name` = ? AND `update_date` IN ({})",
        quote_ident(table),
        placeholders(date_count)
    )
}

/// Insert one completion record.
pub fn insert_state(table: &str) -> String {
    format!(
        "INSERT INTO {} (`update_date`, `job_name`) VALUES (?, ?)",
        quote_ident(table)
    )
}

/// Load completion records within a date range.
pub fn select_state(table: &str) -> String {
    format!(
        "SELECT DATE_FORMAT(`update_date`, '%Y-%m-%d'), `job_name` FROM {} \
         WHERE `update_date` >= ? AND `update_date` <= ?",
        quote_ident(table)
    )
}

/// Split `schema.table` into its optional schema and table name.
pub fn split_table(name: &str) -> (Option<&str>, &str) {
    match name.split_once('.') {
        Some((schema, table)) => (Some(schema), table),
        None => (None, name),
    }
}
