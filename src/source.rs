//! Source readers.
//!
//! A [`Source`] turns the pending dates of a job into one SQL query and
//! runs it on a source connection. The three variants differ only in how
//! the query is composed.

use chrono::NaiveDate;
use sync_core::{sql_date_list, Connection, Result, RowSet};
use tracing::debug;

/// Placeholder in raw query templates replaced by the pending-date list.
pub const DATES_PLACEHOLDER: &str = "{dates}";

/// One input of a job.
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    /// Connection alias; `None` reads from the default source connection
    pub db: Option<String>,
    /// When set and the fetch returns no rows, the whole job has no data
    /// for this run.
    pub empty_check: bool,
    pub kind: SourceKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SourceKind {
    Table(TableSource),
    RawQuery(RawQuerySource),
    Join(JoinSource),
}

/// Columns of one table, optionally restricted to the pending dates.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSource {
    pub table: String,
    /// Empty selects every column
    pub columns: Vec<String>,
    /// Extra predicate ANDed into the WHERE clause
    pub filter: Option<String>,
    /// Date column; `None` reads the whole table
    pub index_field: Option<String>,
}

/// A caller-written query containing [`DATES_PLACEHOLDER`].
#[derive(Debug, Clone, PartialEq)]
pub struct RawQuerySource {
    pub template: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
}

impl JoinKind {
    fn keyword(self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
        }
    }
}

/// One `left JOIN right ON ...` link of a join chain.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinRelation {
    pub left: String,
    pub right: String,
    pub kind: JoinKind,
    /// (left column, right column) equality pairs
    pub on: Vec<(String, String)>,
    pub left_columns: Vec<String>,
    pub right_columns: Vec<String>,
    pub left_filter: Option<String>,
    pub right_filter: Option<String>,
}

impl JoinRelation {
    pub fn new(
        left: impl Into<String>,
        right: impl Into<String>,
        kind: JoinKind,
        left_key: impl Into<String>,
        right_key: impl Into<String>,
    ) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
            kind,
            on: vec![(left_key.into(), right_key.into())],
            left_columns: Vec::new(),
            right_columns: Vec::new(),
            left_filter: None,
            right_filter: None,
        }
    }

    pub fn and_on(mut self, left_key: impl Into<String>, right_key: impl Into<String>) -> Self {
        self.on.push((left_key.into(), right_key.into()));
        self
    }

    pub fn select_left<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.left_columns.extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn select_right<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.right_columns.extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn filter_left(mut self, predicate: impl Into<String>) -> Self {
        self.left_filter = Some(predicate.into());
        self
    }

    pub fn filter_right(mut self, predicate: impl Into<String>) -> Self {
        self.right_filter = Some(predicate.into());
        self
    }
}

/// A chain of joins starting from the first relation's left table.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinSource {
    pub relations: Vec<JoinRelation>,
    /// Date column the pending-date filter applies to, usually qualified
    pub index_field: String,
}

impl Source {
    fn with_kind(kind: SourceKind) -> Self {
        Self {
            db: None,
            empty_check: true,
            kind,
        }
    }

    /// Every column of `table` for the pending dates of column `date`.
    pub fn table(table: impl Into<String>) -> Self {
        Self::with_kind(SourceKind::Table(TableSource {
            table: table.into(),
            columns: Vec::new(),
            filter: None,
            index_field: Some("date".to_string()),
        }))
    }

    pub fn raw_query(template: impl Into<String>) -> Self {
        Self::with_kind(SourceKind::RawQuery(RawQuerySource {
            template: template.into(),
        }))
    }

    pub fn join(relations: Vec<JoinRelation>, index_field: impl Into<String>) -> Self {
        Self::with_kind(SourceKind::Join(JoinSource {
            relations,
            index_field: index_field.into(),
        }))
    }

    pub fn db(mut self, alias: impl Into<String>) -> Self {
        self.db = Some(alias.into());
        self
    }

    pub fn empty_check(mut self, enabled: bool) -> Self {
        self.empty_check = enabled;
        self
    }

    /// Select specific columns. Only meaningful for table sources.
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let SourceKind::Table(t) = &mut self.kind {
            t.columns = columns.into_iter().map(Into::into).collect();
        }
        self
    }

    /// Extra predicate. Only meaningful for table sources.
    pub fn filter(mut self, predicate: impl Into<String>) -> Self {
        if let SourceKind::Table(t) = &mut self.kind {
            t.filter = Some(predicate.into());
        }
        self
    }

    /// Date column of a table source; `None` reads the whole table.
    pub fn index_field(mut self, field: Option<&str>) -> Self {
        if let SourceKind::Table(t) = &mut self.kind {
            t.index_field = field.map(str::to_string);
        }
        self
    }

    /// Short name for logs.
    pub fn describe(&self) -> String {
        match &self.kind {
            SourceKind::Table(t) => t.table.clone(),
            SourceKind::RawQuery(_) => "raw query".to_string(),
            SourceKind::Join(j) => j
                .relations
                .first()
                .map(|r| format!("join from {}", r.left))
                .unwrap_or_else(|| "empty join".to_string()),
        }
    }

    /// The SQL fetching `dates`.
    pub fn build_query(&self, dates: &[NaiveDate]) -> String {
        match &self.kind {
            SourceKind::Table(t) => table_query(t, dates),
            SourceKind::RawQuery(r) => r.template.replace(DATES_PLACEHOLDER, &sql_date_list(dates)),
            SourceKind::Join(j) => join_query(j, dates),
        }
    }

    /// Run the query on `db`.
    pub async fn fetch(&self, db: &dyn Connection, dates: &[NaiveDate]) -> Result<RowSet> {
        let sql = self.build_query(dates);
        debug!("Fetching {} from {}", self.describe(), db.describe());
        db.query(&sql).await
    }
}

fn select_list(columns: &[String]) -> String {
    if columns.is_empty() {
        "*".to_string()
    } else {
        columns.join(", ")
    }
}

fn table_query(source: &TableSource, dates: &[NaiveDate]) -> String {
    let mut sql = format!(
        "SELECT {} FROM {} WHERE 1=1",
        select_list(&source.columns),
        source.table
    );
    if let Some(filter) = &source.filter {
        sql.push_str(&format!(" AND ({filter})"));
    }
    if let Some(index) = &source.index_field {
        sql.push_str(&format!(
            " AND {index} IN ({}) ORDER BY {index}",
            sql_date_list(dates)
        ));
    }
    sql
}

fn join_query(source: &JoinSource, dates: &[NaiveDate]) -> String {
    let Some(first) = source.relations.first() else {
        return String::new();
    };

    let mut columns = Vec::new();
    let mut joins = Vec::new();
    let mut predicates = Vec::new();
    for rel in &source.relations {
        columns.extend(rel.left_columns.iter().map(|c| format!("{}.{c}", rel.left)));
        columns.extend(rel.right_columns.iter().map(|c| format!("{}.{c}", rel.right)));

        let on = rel
            .on
            .iter()
            .map(|(l, r)| format!("{}.{l} = {}.{r}", rel.left, rel.right))
            .collect::<Vec<_>>()
            .join(" AND ");
        joins.push(format!("{} {} ON {on}", rel.kind.keyword(), rel.right));

        if let Some(filter) = &rel.left_filter {
            predicates.push(format!(" AND {}.{filter}", rel.left));
        }
        if let Some(filter) = &rel.right_filter {
            predicates.push(format!(" AND {}.{filter}", rel.right));
        }
    }

    format!(
        "SELECT {} FROM {} {} WHERE 1=1{} AND {} IN ({})",
        select_list(&columns),
        first.left,
        joins.join(" "),
        predicates.concat(),
        source.index_field,
        sql_date_list(dates)
    )
}
