//! Query surface of the hosted store.
//!
//! Repositories describe reads with [`Query`] and writes with [`Mutation`];
//! a [`DataStore`] executes them and returns rows as JSON objects. Rows are
//! decoded into typed models at the repository boundary.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// A row as returned by the store.
pub type Row = Map<String, Value>;

lazy_static! {
    static ref IDENTIFIER: Regex = Regex::new(r"^[a-z_][a-z0-9_]{0,62}$").unwrap();
}

/// Errors raised by the store and object storage.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Failed to decode row: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<validator::ValidationErrors> for StoreError {
    fn from(errors: validator::ValidationErrors) -> Self {
        StoreError::Validation(errors.to_string())
    }
}

/// Checks that a table or column name is a plain lowercase identifier.
pub fn validate_identifier(name: &str) -> Result<(), StoreError> {
    if IDENTIFIER.is_match(name) {
        Ok(())
    } else {
        Err(StoreError::InvalidIdentifier(name.to_string()))
    }
}

/// Row filter.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    Neq(String, Value),
    Gt(String, Value),
    Gte(String, Value),
    Lt(String, Value),
    Lte(String, Value),
    /// Case-insensitive LIKE with `%` and `_` wildcards.
    ILike(String, String),
    In(String, Vec<Value>),
    /// `true` matches NULL, `false` matches NOT NULL.
    IsNull(String, bool),
    /// Matches when any inner filter matches.
    Or(Vec<Filter>),
}

impl Filter {
    /// Columns referenced by the filter.
    pub fn columns(&self) -> Vec<&str> {
        match self {
            Filter::Eq(c, _)
            | Filter::Neq(c, _)
            | Filter::Gt(c, _)
            | Filter::Gte(c, _)
            | Filter::Lt(c, _)
            | Filter::Lte(c, _)
            | Filter::ILike(c, _)
            | Filter::In(c, _)
            | Filter::IsNull(c, _) => vec![c.as_str()],
            Filter::Or(inner) => inner.iter().flat_map(Filter::columns).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

/// A filtered, ordered and ranged read of one table.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: String,
    pub columns: Vec<String>,
    pub filters: Vec<Filter>,
    pub order: Vec<(String, Direction)>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl Query {
    pub fn from(table: &str) -> Self {
        Self {
            table: table.to_string(),
            columns: Vec::new(),
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// Restrict the returned keys. An empty projection returns whole rows.
    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn eq(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(Filter::Eq(column.to_string(), value.into()))
    }

    pub fn neq(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(Filter::Neq(column.to_string(), value.into()))
    }

    pub fn gt(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(Filter::Gt(column.to_string(), value.into()))
    }

    pub fn gte(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(Filter::Gte(column.to_string(), value.into()))
    }

    pub fn lt(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(Filter::Lt(column.to_string(), value.into()))
    }

    pub fn lte(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(Filter::Lte(column.to_string(), value.into()))
    }

    pub fn ilike(self, column: &str, pattern: impl Into<String>) -> Self {
        self.filter(Filter::ILike(column.to_string(), pattern.into()))
    }

    pub fn is_in<V: Into<Value>>(self, column: &str, values: impl IntoIterator<Item = V>) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.filter(Filter::In(column.to_string(), values))
    }

    pub fn is_null(self, column: &str) -> Self {
        self.filter(Filter::IsNull(column.to_string(), true))
    }

    pub fn not_null(self, column: &str) -> Self {
        self.filter(Filter::IsNull(column.to_string(), false))
    }

    /// Case-insensitive substring match across several columns.
    pub fn search(self, columns: &[&str], term: &str) -> Self {
        let pattern = format!("%{}%", term);
        let any = columns
            .iter()
            .map(|c| Filter::ILike(c.to_string(), pattern.clone()))
            .collect();
        self.filter(Filter::Or(any))
    }

    pub fn order_by(mut self, column: &str, direction: Direction) -> Self {
        self.order.push((column.to_string(), direction));
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Apply a zero-based range.
    pub fn range(self, limit: Option<u32>, offset: Option<u32>) -> Self {
        let query = match limit {
            Some(limit) => self.limit(limit),
            None => self,
        };
        match offset {
            Some(offset) => query.offset(offset),
            None => query,
        }
    }

    /// Validate every identifier the query mentions.
    pub fn validate(&self) -> Result<(), StoreError> {
        validate_identifier(&self.table)?;
        for column in &self.columns {
            validate_identifier(column)?;
        }
        for filter in &self.filters {
            for column in filter.columns() {
                validate_identifier(column)?;
            }
        }
        for (column, _) in &self.order {
            validate_identifier(column)?;
        }
        Ok(())
    }
}

/// A single write.
#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    Insert {
        table: String,
        rows: Vec<Row>,
    },
    /// Apply `patch` to every row matching the query's filters.
    Update {
        query: Query,
        patch: Row,
    },
    /// Insert or update rows keyed on `on_conflict`.
    Upsert {
        table: String,
        rows: Vec<Row>,
        on_conflict: Vec<String>,
    },
    Delete {
        query: Query,
    },
}

impl Write {
    pub fn table(&self) -> &str {
        match self {
            Write::Insert { table, .. } | Write::Upsert { table, .. } => table,
            Write::Update { query, .. } | Write::Delete { query } => &query.table,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Write::Insert { .. } => "insert",
            Write::Update { .. } => "update",
            Write::Upsert { .. } => "upsert",
            Write::Delete { .. } => "delete",
        }
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        match self {
            Write::Insert { table, rows } => {
                validate_identifier(table)?;
                validate_row_keys(rows.iter())
            }
            Write::Update { query, patch } => {
                query.validate()?;
                if query.filters.is_empty() {
                    return Err(StoreError::Validation(
                        "update requires at least one filter".into(),
                    ));
                }
                validate_row_keys(std::iter::once(patch))
            }
            Write::Upsert {
                table,
                rows,
                on_conflict,
            } => {
                validate_identifier(table)?;
                if on_conflict.is_empty() {
                    return Err(StoreError::Validation(
                        "upsert requires conflict columns".into(),
                    ));
                }
                for column in on_conflict {
                    validate_identifier(column)?;
                }
                validate_row_keys(rows.iter())
            }
            Write::Delete { query } => {
                query.validate()?;
                if query.filters.is_empty() {
                    return Err(StoreError::Validation(
                        "delete requires at least one filter".into(),
                    ));
                }
                Ok(())
            }
        }
    }
}

fn validate_row_keys<'a>(rows: impl Iterator<Item = &'a Row>) -> Result<(), StoreError> {
    for row in rows {
        for key in row.keys() {
            validate_identifier(key)?;
        }
    }
    Ok(())
}

/// A write plus whether an empty result aborts the surrounding batch.
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation {
    pub write: Write,
    pub require_rows: bool,
}

impl Mutation {
    pub fn insert(table: &str, rows: Vec<Row>) -> Self {
        Write::Insert {
            table: table.to_string(),
            rows,
        }
        .into()
    }

    pub fn update(query: Query, patch: Row) -> Self {
        Write::Update { query, patch }.into()
    }

    pub fn upsert(table: &str, rows: Vec<Row>, on_conflict: &[&str]) -> Self {
        Write::Upsert {
            table: table.to_string(),
            rows,
            on_conflict: on_conflict.iter().map(|c| c.to_string()).collect(),
        }
        .into()
    }

    pub fn delete(query: Query) -> Self {
        Write::Delete { query }.into()
    }

    /// Abort the batch (rolling back earlier writes) if this write affects no rows.
    pub fn required(mut self) -> Self {
        self.require_rows = true;
        self
    }
}

impl From<Write> for Mutation {
    fn from(write: Write) -> Self {
        Self {
            write,
            require_rows: false,
        }
    }
}

/// Error returned by [`DataStore::batch`] when a required write matched nothing.
pub fn nothing_matched(write: &Write) -> StoreError {
    StoreError::NotFound(format!("{} on {} matched no rows", write.kind(), write.table()))
}

/// The hosted store's query surface.
#[async_trait]
pub trait DataStore: Send + Sync {
    async fn select(&self, query: &Query) -> Result<Vec<Row>, StoreError>;

    async fn count(&self, query: &Query) -> Result<i64, StoreError>;

    /// Execute one write and return the affected rows.
    async fn execute(&self, mutation: Mutation) -> Result<Vec<Row>, StoreError>;

    /// Execute writes atomically: either every write applies or none does.
    async fn batch(&self, mutations: Vec<Mutation>) -> Result<Vec<Vec<Row>>, StoreError>;

    async fn insert(&self, table: &str, rows: Vec<Row>) -> Result<Vec<Row>, StoreError> {
        self.execute(Mutation::insert(table, rows)).await
    }

    async fn update(&self, query: Query, patch: Row) -> Result<Vec<Row>, StoreError> {
        self.execute(Mutation::update(query, patch)).await
    }

    async fn upsert(
        &self,
        table: &str,
        rows: Vec<Row>,
        on_conflict: &[&str],
    ) -> Result<Vec<Row>, StoreError> {
        self.execute(Mutation::upsert(table, rows, on_conflict)).await
    }

    async fn delete(&self, query: Query) -> Result<Vec<Row>, StoreError> {
        self.execute(Mutation::delete(query)).await
    }
}

/// Serialize a model into a row.
pub fn to_row<T: Serialize>(value: &T) -> Result<Row, StoreError> {
    match serde_json::to_value(value)? {
        Value::Object(row) => Ok(row),
        other => Err(StoreError::Validation(format!(
            "expected an object, got {}",
            other
        ))),
    }
}

/// Decode rows into typed models.
pub fn decode_rows<T: DeserializeOwned>(rows: Vec<Row>) -> Result<Vec<T>, StoreError> {
    rows.into_iter().map(decode_row).collect()
}

pub fn decode_row<T: DeserializeOwned>(row: Row) -> Result<T, StoreError> {
    Ok(serde_json::from_value(Value::Object(row))?)
}

/// Read a string column from a row.
pub fn row_str<'a>(row: &'a Row, column: &str) -> Option<&'a str> {
    row.get(column).and_then(Value::as_str)
}

/// Read a numeric column from a row, accepting numbers and numeric strings.
pub fn row_f64(row: &Row, column: &str) -> f64 {
    match row.get(column) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("kyc_documents").is_ok());
        assert!(validate_identifier("_private").is_ok());
        assert!(validate_identifier("Robert'); DROP TABLE").is_err());
        assert!(validate_identifier("1abc").is_err());
        assert!(validate_identifier("").is_err());
    }

    #[test]
    fn test_search_builds_or_group() {
        let query = Query::from("profiles").search(&["email", "full_name"], "john");
        assert_eq!(
            query.filters,
            vec![Filter::Or(vec![
                Filter::ILike("email".into(), "%john%".into()),
                Filter::ILike("full_name".into(), "%john%".into()),
            ])]
        );
        assert!(query.validate().is_ok());
    }

    #[test]
    fn test_query_validate_rejects_bad_filter_column() {
        let query = Query::from("profiles").eq("email; --", "x");
        assert!(matches!(
            query.validate(),
            Err(StoreError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn test_unfiltered_update_is_rejected() {
        let write = Write::Update {
            query: Query::from("profiles"),
            patch: Row::new(),
        };
        assert!(matches!(write.validate(), Err(StoreError::Validation(_))));
    }

    #[test]
    fn test_range_applies_both_bounds() {
        let query = Query::from("transactions").range(Some(10), Some(20));
        assert_eq!(query.limit, Some(10));
        assert_eq!(query.offset, Some(20));
    }

    #[test]
    fn test_to_row_rejects_non_objects() {
        assert!(to_row(&json!({"a": 1})).is_ok());
        assert!(matches!(to_row(&json!([1, 2])), Err(StoreError::Validation(_))));
    }

    #[test]
    fn test_row_f64_accepts_numeric_strings() {
        let row = to_row(&json!({"a": 1.5, "b": "2.25", "c": null})).unwrap();
        assert_eq!(row_f64(&row, "a"), 1.5);
        assert_eq!(row_f64(&row, "b"), 2.25);
        assert_eq!(row_f64(&row, "c"), 0.0);
    }
}
