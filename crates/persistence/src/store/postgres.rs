//! Postgres implementation of [`DataStore`].
//!
//! Statements are assembled with `sqlx::QueryBuilder`. Rows come back as
//! `to_jsonb(r.*)`; written rows go in as one JSON parameter expanded with
//! `jsonb_populate_recordset`, so column types are resolved by the database.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::Postgres;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool, QueryBuilder};

use super::{nothing_matched, DataStore, Filter, Mutation, Query, Row, StoreError, Write};
use crate::metrics::QueryTimer;
use crate::schema;

/// Store backed by a Postgres connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn run_batch(&self, mutations: &[Mutation]) -> Result<Vec<Vec<Row>>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut results = Vec::with_capacity(mutations.len());

        for mutation in mutations {
            let rows = execute_write(&mut *tx, &mutation.write).await?;
            if mutation.require_rows && rows.is_empty() {
                // Dropping the transaction rolls it back.
                return Err(nothing_matched(&mutation.write));
            }
            results.push(rows);
        }

        tx.commit().await?;
        Ok(results)
    }
}

fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier)
}

fn column_type(table: &str, column: &str) -> Result<&'static str, StoreError> {
    schema::table(table)
        .and_then(|t| t.column(column))
        .map(|c| c.sql_type)
        .ok_or_else(|| StoreError::InvalidIdentifier(format!("{}.{}", table, column)))
}

/// Bound representation of a filter value; the SQL casts it to the column type.
fn bind_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn push_compare(
    qb: &mut QueryBuilder<'_, Postgres>,
    table: &str,
    column: &str,
    op: &str,
    value: &Value,
) -> Result<(), StoreError> {
    let sql_type = column_type(table, column)?;
    match bind_text(value) {
        Some(text) => {
            qb.push(format!("r.{} {} ", quote(column), op));
            qb.push_bind(text);
            qb.push(format!("::{}", sql_type));
        }
        None if op == "=" => {
            qb.push(format!("r.{} IS NULL", quote(column)));
        }
        None if op == "<>" => {
            qb.push(format!("r.{} IS NOT NULL", quote(column)));
        }
        None => {
            qb.push("FALSE");
        }
    }
    Ok(())
}

fn push_filter(
    qb: &mut QueryBuilder<'_, Postgres>,
    table: &str,
    filter: &Filter,
) -> Result<(), StoreError> {
    match filter {
        Filter::Eq(c, v) => push_compare(qb, table, c, "=", v)?,
        Filter::Neq(c, v) => push_compare(qb, table, c, "<>", v)?,
        Filter::Gt(c, v) => push_compare(qb, table, c, ">", v)?,
        Filter::Gte(c, v) => push_compare(qb, table, c, ">=", v)?,
        Filter::Lt(c, v) => push_compare(qb, table, c, "<", v)?,
        Filter::Lte(c, v) => push_compare(qb, table, c, "<=", v)?,
        Filter::ILike(c, pattern) => {
            column_type(table, c)?;
            qb.push(format!("r.{}::text ILIKE ", quote(c)));
            qb.push_bind(pattern.clone());
        }
        Filter::In(c, values) => {
            let sql_type = column_type(table, c)?;
            let texts: Vec<String> = values.iter().filter_map(bind_text).collect();
            qb.push(format!("r.{} = ANY(", quote(c)));
            qb.push_bind(texts);
            qb.push(format!("::{}[])", sql_type));
        }
        Filter::IsNull(c, is_null) => {
            column_type(table, c)?;
            let op = if *is_null { "IS NULL" } else { "IS NOT NULL" };
            qb.push(format!("r.{} {}", quote(c), op));
        }
        Filter::Or(inner) => {
            if inner.is_empty() {
                qb.push("FALSE");
            } else {
                qb.push("(");
                for (i, f) in inner.iter().enumerate() {
                    if i > 0 {
                        qb.push(" OR ");
                    }
                    push_filter(qb, table, f)?;
                }
                qb.push(")");
            }
        }
    }
    Ok(())
}

fn push_where(qb: &mut QueryBuilder<'_, Postgres>, query: &Query) -> Result<(), StoreError> {
    for (i, filter) in query.filters.iter().enumerate() {
        qb.push(if i == 0 { " WHERE " } else { " AND " });
        push_filter(qb, &query.table, filter)?;
    }
    Ok(())
}

fn push_tail(qb: &mut QueryBuilder<'_, Postgres>, query: &Query) {
    if !query.order.is_empty() {
        let order: Vec<String> = query
            .order
            .iter()
            .map(|(c, d)| format!("r.{} {}", quote(c), d.as_sql()))
            .collect();
        qb.push(format!(" ORDER BY {}", order.join(", ")));
    }
    if let Some(limit) = query.limit {
        qb.push(" LIMIT ");
        qb.push_bind(limit as i64);
    }
    if let Some(offset) = query.offset {
        qb.push(" OFFSET ");
        qb.push_bind(offset as i64);
    }
}

fn projection(query: &Query) -> String {
    if query.columns.is_empty() {
        "to_jsonb(r.*)".to_string()
    } else {
        let pairs: Vec<String> = query
            .columns
            .iter()
            .map(|c| format!("'{}', r.{}", c, quote(c)))
            .collect();
        format!("jsonb_build_object({})", pairs.join(", "))
    }
}

/// Union of keys across rows, in first-seen order.
fn row_columns(rows: &[Row]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if !columns.iter().any(|c| c == key) {
                columns.push(key.clone());
            }
        }
    }
    columns
}

fn quoted_list(columns: &[String]) -> String {
    columns.iter().map(|c| quote(c)).collect::<Vec<_>>().join(", ")
}

async fn fetch_rows(
    qb: &mut QueryBuilder<'_, Postgres>,
    conn: &mut PgConnection,
) -> Result<Vec<Row>, StoreError> {
    let rows = qb
        .build_query_scalar::<Json<Row>>()
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows.into_iter().map(|Json(row)| row).collect())
}

async fn execute_write(conn: &mut PgConnection, write: &Write) -> Result<Vec<Row>, StoreError> {
    write.validate()?;
    let timer = QueryTimer::new(write.kind(), write.table());

    let result = match write {
        Write::Insert { table, rows } | Write::Upsert { table, rows, .. } if rows.is_empty() => {
            tracing::debug!(table = %table, "Skipping write with no rows");
            Ok(Vec::new())
        }
        Write::Insert { table, rows } => {
            let columns = quoted_list(&row_columns(rows));
            let mut qb = QueryBuilder::<Postgres>::new(format!(
                "INSERT INTO {table} AS r ({columns}) SELECT {columns} FROM jsonb_populate_recordset(NULL::{table}, ",
                table = quote(table),
                columns = columns,
            ));
            qb.push_bind(Json(Value::Array(
                rows.iter().cloned().map(Value::Object).collect(),
            )));
            qb.push(") RETURNING to_jsonb(r.*)");
            fetch_rows(&mut qb, conn).await
        }
        Write::Upsert {
            table,
            rows,
            on_conflict,
        } => {
            let names = row_columns(rows);
            let columns = quoted_list(&names);
            let mut qb = QueryBuilder::<Postgres>::new(format!(
                "INSERT INTO {table} AS r ({columns}) SELECT {columns} FROM jsonb_populate_recordset(NULL::{table}, ",
                table = quote(table),
                columns = columns,
            ));
            qb.push_bind(Json(Value::Array(
                rows.iter().cloned().map(Value::Object).collect(),
            )));
            let updates: Vec<String> = names
                .iter()
                .filter(|c| !on_conflict.contains(*c))
                .map(|c| format!("{col} = EXCLUDED.{col}", col = quote(c)))
                .collect();
            qb.push(format!(") ON CONFLICT ({}) ", quoted_list(on_conflict)));
            if updates.is_empty() {
                qb.push("DO NOTHING");
            } else {
                qb.push(format!("DO UPDATE SET {}", updates.join(", ")));
            }
            qb.push(" RETURNING to_jsonb(r.*)");
            fetch_rows(&mut qb, conn).await
        }
        Write::Update { query, patch } => {
            if patch.is_empty() {
                return Err(StoreError::Validation("update patch is empty".into()));
            }
            let sets: Vec<String> = patch
                .keys()
                .map(|c| format!("{col} = p.{col}", col = quote(c)))
                .collect();
            let table = quote(&query.table);
            let mut qb = QueryBuilder::<Postgres>::new(format!(
                "UPDATE {table} AS r SET {sets} FROM jsonb_populate_record(NULL::{table}, ",
                table = table,
                sets = sets.join(", "),
            ));
            qb.push_bind(Json(Value::Object(patch.clone())));
            qb.push(") AS p");
            push_where(&mut qb, query)?;
            qb.push(" RETURNING to_jsonb(r.*)");
            fetch_rows(&mut qb, conn).await
        }
        Write::Delete { query } => {
            let mut qb = QueryBuilder::<Postgres>::new(format!(
                "DELETE FROM {} AS r",
                quote(&query.table)
            ));
            push_where(&mut qb, query)?;
            qb.push(" RETURNING to_jsonb(r.*)");
            fetch_rows(&mut qb, conn).await
        }
    };

    timer.finish(&result);
    result
}

#[async_trait]
impl DataStore for PgStore {
    async fn select(&self, query: &Query) -> Result<Vec<Row>, StoreError> {
        query.validate()?;
        let timer = QueryTimer::new("select", query.table.as_str());
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM {} AS r",
            projection(query),
            quote(&query.table)
        ));
        push_where(&mut qb, query)?;
        push_tail(&mut qb, query);

        let mut conn = self.pool.acquire().await?;
        let result = fetch_rows(&mut qb, &mut *conn).await;
        timer.finish(&result);
        result
    }

    async fn count(&self, query: &Query) -> Result<i64, StoreError> {
        query.validate()?;
        let timer = QueryTimer::new("count", query.table.as_str());
        let mut qb =
            QueryBuilder::<Postgres>::new(format!("SELECT COUNT(*) FROM {} AS r", quote(&query.table)));
        push_where(&mut qb, query)?;

        let result = qb
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(StoreError::from);
        timer.finish(&result);
        result
    }

    async fn execute(&self, mutation: Mutation) -> Result<Vec<Row>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        execute_write(&mut *conn, &mutation.write).await
    }

    async fn batch(&self, mutations: Vec<Mutation>) -> Result<Vec<Vec<Row>>, StoreError> {
        let timer = QueryTimer::new("batch", "*");
        let result = self.run_batch(&mutations).await;
        timer.finish(&result);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Direction;
    use serde_json::json;

    #[test]
    fn test_select_sql_shape() {
        let query = Query::from("profiles")
            .search(&["email", "full_name"], "john")
            .eq("is_active", true)
            .order_by("created_at", Direction::Desc)
            .limit(10)
            .offset(20);
        let mut qb = QueryBuilder::<Postgres>::new("SELECT to_jsonb(r.*) FROM \"profiles\" AS r");
        push_where(&mut qb, &query).unwrap();
        push_tail(&mut qb, &query);

        assert_eq!(
            qb.sql(),
            "SELECT to_jsonb(r.*) FROM \"profiles\" AS r \
             WHERE (r.\"email\"::text ILIKE $1 OR r.\"full_name\"::text ILIKE $2) \
             AND r.\"is_active\" = $3::boolean \
             ORDER BY r.\"created_at\" DESC LIMIT $4 OFFSET $5"
        );
    }

    #[test]
    fn test_in_filter_casts_array() {
        let ids = vec![json!("a"), json!("b")];
        let query = Query::from("kyc_documents").is_in("user_id", ids);
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM \"kyc_documents\" AS r");
        push_where(&mut qb, &query).unwrap();
        assert!(qb.sql().ends_with("WHERE r.\"user_id\" = ANY($1::uuid[])"));
    }

    #[test]
    fn test_eq_null_becomes_is_null() {
        let query = Query::from("kyc_documents").eq("reviewed_by", Value::Null);
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM \"kyc_documents\" AS r");
        push_where(&mut qb, &query).unwrap();
        assert!(qb.sql().ends_with("WHERE r.\"reviewed_by\" IS NULL"));
    }

    #[test]
    fn test_unknown_column_is_rejected() {
        let query = Query::from("profiles").eq("password", "x");
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1");
        assert!(matches!(
            push_where(&mut qb, &query),
            Err(StoreError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn test_projection_builds_object() {
        let query = Query::from("transactions").columns(&["amount", "status"]);
        assert_eq!(
            projection(&query),
            "jsonb_build_object('amount', r.\"amount\", 'status', r.\"status\")"
        );
    }

    #[test]
    fn test_row_columns_union_keeps_order() {
        let a = crate::store::to_row(&json!({"name": "a", "artist": "x"})).unwrap();
        let b = crate::store::to_row(&json!({"name": "b", "album": "y"})).unwrap();
        let columns = row_columns(&[a, b]);
        assert_eq!(columns.len(), 3);
        assert!(columns.contains(&"album".to_string()));
    }
}
