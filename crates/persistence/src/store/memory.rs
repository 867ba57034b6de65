//! In-memory implementation of [`DataStore`].
//!
//! Tables hold JSON rows shaped by [`crate::schema`]. Inserts fill column
//! defaults and enforce unique keys; batches apply to a copy of the tables
//! that replaces the original only when every write succeeds. Used by tests
//! and by the `memory` database backend.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use uuid::Uuid;

use super::{
    nothing_matched, DataStore, Direction, Filter, Mutation, Query, Row, StoreError, Write,
};
use crate::schema::{self, ColumnDefault, TableDef};

type Tables = HashMap<String, Vec<Row>>;

#[derive(Debug, Default)]
struct MemoryState {
    tables: Tables,
    failing: bool,
    reads: u64,
    writes: u64,
}

/// Store holding every table in process memory. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert fixture rows, bypassing failure simulation and write counting.
    pub fn seed(&self, table: &str, rows: Vec<Value>) -> Result<Vec<Row>, StoreError> {
        let rows = rows
            .into_iter()
            .map(|value| match value {
                Value::Object(row) => Ok(row),
                other => Err(StoreError::Validation(format!(
                    "fixture row must be an object, got {}",
                    other
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?;
        let mut state = self.write_state()?;
        insert_rows(&mut state.tables, table, &rows)
    }

    /// Snapshot of a table's rows in insertion order.
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.state
            .read()
            .map(|s| s.tables.get(table).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    /// Make every subsequent operation fail as if the store were unreachable.
    pub fn set_failing(&self, failing: bool) {
        if let Ok(mut state) = self.state.write() {
            state.failing = failing;
        }
    }

    /// Number of reads (selects and counts) served.
    pub fn read_count(&self) -> u64 {
        self.state.read().map(|s| s.reads).unwrap_or(0)
    }

    /// Number of writes applied, counting each write of a batch.
    pub fn write_count(&self) -> u64 {
        self.state.read().map(|s| s.writes).unwrap_or(0)
    }

    fn write_state(&self) -> Result<RwLockWriteGuard<'_, MemoryState>, StoreError> {
        self.state
            .write()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }

    fn checked_state(&self) -> Result<RwLockWriteGuard<'_, MemoryState>, StoreError> {
        let state = self.write_state()?;
        if state.failing {
            return Err(StoreError::Unavailable(
                "memory store is simulating an outage".into(),
            ));
        }
        Ok(state)
    }
}

fn table_def(name: &str) -> Result<&'static TableDef, StoreError> {
    schema::table(name).ok_or_else(|| StoreError::InvalidIdentifier(name.to_string()))
}

fn check_columns<'a>(
    def: &TableDef,
    columns: impl IntoIterator<Item = &'a str>,
) -> Result<(), StoreError> {
    for column in columns {
        if !def.has_column(column) {
            return Err(StoreError::InvalidIdentifier(format!(
                "{}.{}",
                def.name, column
            )));
        }
    }
    Ok(())
}

fn check_query(query: &Query) -> Result<&'static TableDef, StoreError> {
    query.validate()?;
    let def = table_def(&query.table)?;
    check_columns(def, query.columns.iter().map(String::as_str))?;
    check_columns(def, query.filters.iter().flat_map(Filter::columns))?;
    check_columns(def, query.order.iter().map(|(c, _)| c.as_str()))?;
    Ok(def)
}

fn now_value() -> Value {
    Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true))
}

fn default_value(default: ColumnDefault) -> Value {
    match default {
        ColumnDefault::Null => Value::Null,
        ColumnDefault::RandomUuid => Value::String(Uuid::new_v4().to_string()),
        ColumnDefault::Now => now_value(),
        ColumnDefault::Literal(literal) => serde_json::from_str(literal).unwrap_or(Value::Null),
    }
}

fn cell<'a>(row: &'a Row, column: &str) -> &'a Value {
    row.get(column).unwrap_or(&Value::Null)
}

fn parse_time(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Compare two cells the way the database would after casting.
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Null, _) | (_, Value::Null) => None,
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::String(x), Value::String(y)) => match (parse_time(x), parse_time(y)) {
            (Some(x), Some(y)) => Some(x.cmp(&y)),
            _ => Some(x.cmp(y)),
        },
        (Value::Number(x), Value::String(y)) => x.as_f64()?.partial_cmp(&y.parse::<f64>().ok()?),
        (Value::String(x), Value::Number(y)) => x.parse::<f64>().ok()?.partial_cmp(&y.as_f64()?),
        (Value::Bool(x), Value::String(y)) => Some(x.cmp(&y.parse::<bool>().ok()?)),
        (Value::String(x), Value::Bool(y)) => Some(x.parse::<bool>().ok()?.cmp(y)),
        (x, y) if x == y => Some(Ordering::Equal),
        _ => None,
    }
}

fn equals(a: &Value, b: &Value) -> bool {
    compare(a, b) == Some(Ordering::Equal)
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// SQL LIKE over chars: `%` matches any run, `_` matches one char.
fn like(text: &[char], pattern: &[char]) -> bool {
    // matches[j] = pattern[..j] matches text[..i]
    let mut matches = vec![false; pattern.len() + 1];
    matches[0] = true;
    for j in 1..=pattern.len() {
        matches[j] = matches[j - 1] && pattern[j - 1] == '%';
    }
    for &t in text {
        let mut next = vec![false; pattern.len() + 1];
        for j in 1..=pattern.len() {
            next[j] = match pattern[j - 1] {
                '%' => next[j - 1] || matches[j],
                '_' => matches[j - 1],
                p => matches[j - 1] && p == t,
            };
        }
        matches = next;
    }
    matches[pattern.len()]
}

fn ilike(value: &Value, pattern: &str) -> bool {
    match text_of(value) {
        Some(text) => {
            let text: Vec<char> = text.to_lowercase().chars().collect();
            let pattern: Vec<char> = pattern.to_lowercase().chars().collect();
            like(&text, &pattern)
        }
        None => false,
    }
}

fn matches(row: &Row, filter: &Filter) -> bool {
    let test = |column: &str, wanted: &[Ordering], value: &Value| {
        compare(cell(row, column), value).is_some_and(|o| wanted.contains(&o))
    };
    match filter {
        Filter::Eq(c, Value::Null) => cell(row, c).is_null(),
        Filter::Neq(c, Value::Null) => !cell(row, c).is_null(),
        Filter::Eq(c, v) => test(c, &[Ordering::Equal], v),
        Filter::Neq(c, v) => test(c, &[Ordering::Less, Ordering::Greater], v),
        Filter::Gt(c, v) => test(c, &[Ordering::Greater], v),
        Filter::Gte(c, v) => test(c, &[Ordering::Greater, Ordering::Equal], v),
        Filter::Lt(c, v) => test(c, &[Ordering::Less], v),
        Filter::Lte(c, v) => test(c, &[Ordering::Less, Ordering::Equal], v),
        Filter::ILike(c, pattern) => ilike(cell(row, c), pattern),
        Filter::In(c, values) => values.iter().any(|v| equals(cell(row, c), v)),
        Filter::IsNull(c, is_null) => cell(row, c).is_null() == *is_null,
        Filter::Or(inner) => inner.iter().any(|f| matches(row, f)),
    }
}

fn matches_all(row: &Row, filters: &[Filter]) -> bool {
    filters.iter().all(|f| matches(row, f))
}

/// Ordering with NULLs last ascending and first descending.
fn order_rows(rows: &mut [Row], order: &[(String, Direction)]) {
    rows.sort_by(|a, b| {
        for (column, direction) in order {
            let (x, y) = (cell(a, column), cell(b, column));
            let ordering = match (x.is_null(), y.is_null()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => compare(x, y).unwrap_or(Ordering::Equal),
            };
            let ordering = match direction {
                Direction::Asc => ordering,
                Direction::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

fn select_rows(tables: &Tables, query: &Query) -> Vec<Row> {
    let mut rows: Vec<Row> = tables
        .get(&query.table)
        .map(|rows| {
            rows.iter()
                .filter(|r| matches_all(r, &query.filters))
                .cloned()
                .collect()
        })
        .unwrap_or_default();
    order_rows(&mut rows, &query.order);

    let offset = query.offset.unwrap_or(0) as usize;
    let limit = query.limit.map(|l| l as usize).unwrap_or(usize::MAX);
    rows.into_iter()
        .skip(offset)
        .take(limit)
        .map(|row| {
            if query.columns.is_empty() {
                row
            } else {
                query
                    .columns
                    .iter()
                    .map(|c| (c.clone(), cell(&row, c).clone()))
                    .collect()
            }
        })
        .collect()
}

fn complete_row(def: &TableDef, row: &Row) -> Result<Row, StoreError> {
    check_columns(def, row.keys().map(String::as_str))?;
    Ok(def
        .columns
        .iter()
        .map(|column| {
            let value = row
                .get(column.name)
                .cloned()
                .unwrap_or_else(|| default_value(column.default));
            (column.name.to_string(), value)
        })
        .collect())
}

fn same_key(a: &Row, b: &Row, key: &[&str]) -> bool {
    key.iter().all(|c| {
        let (x, y) = (cell(a, c), cell(b, c));
        !x.is_null() && equals(x, y)
    })
}

fn insert_rows(tables: &mut Tables, table: &str, rows: &[Row]) -> Result<Vec<Row>, StoreError> {
    let def = table_def(table)?;
    let existing = tables.entry(table.to_string()).or_default();
    let mut inserted = Vec::with_capacity(rows.len());
    for row in rows {
        let row = complete_row(def, row)?;
        for key in def.unique {
            if existing.iter().any(|r| same_key(r, &row, key)) {
                return Err(StoreError::Conflict(format!(
                    "duplicate key ({}) in {}",
                    key.join(", "),
                    table
                )));
            }
        }
        existing.push(row.clone());
        inserted.push(row);
    }
    Ok(inserted)
}

fn apply(tables: &mut Tables, write: &Write) -> Result<Vec<Row>, StoreError> {
    write.validate()?;
    match write {
        Write::Insert { table, rows } => insert_rows(tables, table, rows),
        Write::Upsert {
            table,
            rows,
            on_conflict,
        } => {
            let def = table_def(table)?;
            check_columns(def, on_conflict.iter().map(String::as_str))?;
            let key: Vec<&str> = on_conflict.iter().map(String::as_str).collect();
            let mut affected = Vec::with_capacity(rows.len());
            for row in rows {
                check_columns(def, row.keys().map(String::as_str))?;
                let current = tables
                    .get_mut(table.as_str())
                    .and_then(|rows| rows.iter_mut().find(|r| same_key(r, row, &key)));
                if let Some(current) = current {
                    for (column, value) in row {
                        current.insert(column.clone(), value.clone());
                    }
                    affected.push(current.clone());
                } else {
                    affected.extend(insert_rows(tables, table, std::slice::from_ref(row))?);
                }
            }
            Ok(affected)
        }
        Write::Update { query, patch } => {
            let def = check_query(query)?;
            check_columns(def, patch.keys().map(String::as_str))?;
            let mut affected = Vec::new();
            if let Some(rows) = tables.get_mut(&query.table) {
                for row in rows.iter_mut().filter(|r| matches_all(r, &query.filters)) {
                    for (column, value) in patch {
                        row.insert(column.clone(), value.clone());
                    }
                    affected.push(row.clone());
                }
            }
            Ok(affected)
        }
        Write::Delete { query } => {
            check_query(query)?;
            let mut removed = Vec::new();
            if let Some(rows) = tables.get_mut(&query.table) {
                let (gone, kept): (Vec<Row>, Vec<Row>) = rows
                    .drain(..)
                    .partition(|r| matches_all(r, &query.filters));
                *rows = kept;
                removed = gone;
            }
            Ok(removed)
        }
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn select(&self, query: &Query) -> Result<Vec<Row>, StoreError> {
        check_query(query)?;
        let mut state = self.checked_state()?;
        state.reads += 1;
        Ok(select_rows(&state.tables, query))
    }

    async fn count(&self, query: &Query) -> Result<i64, StoreError> {
        check_query(query)?;
        let mut state = self.checked_state()?;
        state.reads += 1;
        let count = state
            .tables
            .get(&query.table)
            .map(|rows| {
                rows.iter()
                    .filter(|r| matches_all(r, &query.filters))
                    .count()
            })
            .unwrap_or(0);
        Ok(count as i64)
    }

    async fn execute(&self, mutation: Mutation) -> Result<Vec<Row>, StoreError> {
        let mut state = self.checked_state()?;
        let rows = apply(&mut state.tables, &mutation.write)?;
        state.writes += 1;
        Ok(rows)
    }

    async fn batch(&self, mutations: Vec<Mutation>) -> Result<Vec<Vec<Row>>, StoreError> {
        let mut state = self.checked_state()?;
        let mut staged = state.tables.clone();
        let mut results = Vec::with_capacity(mutations.len());
        for mutation in &mutations {
            let rows = apply(&mut staged, &mutation.write)?;
            if mutation.require_rows && rows.is_empty() {
                return Err(nothing_matched(&mutation.write));
            }
            results.push(rows);
        }
        state.tables = staged;
        state.writes += mutations.len() as u64;
        Ok(results)
    }
}
