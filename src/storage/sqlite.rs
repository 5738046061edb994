//! SQLite Row Store
//!
//! Provides a [`RowStore`] over a SQLite database with sqlx integration

use super::types::{Filter, OrderBy, Row, SortDirection, Value};
use super::RowStore;
use crate::error::StorageError;
use async_trait::async_trait;
use regex::Regex;
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Column, Row as _, TypeInfo, ValueRef};
use std::str::FromStr;
use std::sync::{Arc, LazyLock};
use tracing::debug;

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid")
});

/// SQLite row store
///
/// Manages a sqlx pool; every table and column name is validated before it
/// is spliced into SQL, values are always bound as parameters.
#[derive(Debug, Clone)]
pub struct SqliteRowStore {
    pool: Arc<SqlitePool>,
}

impl SqliteRowStore {
    /// Connect to `url` (e.g. `sqlite://privacy.db` or `sqlite::memory:`).
    ///
    /// In-memory databases are per connection, use `max_connections = 1`
    /// for them.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;

        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Get the underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Run raw DDL/DML, used for schema setup by hosts and tests
    pub async fn execute_script(&self, sql: &str) -> Result<(), StorageError> {
        sqlx::raw_sql(sql)
            .execute(self.pool.as_ref())
            .await
            .map_err(|e| StorageError::write_failed("<script>", e))?;
        Ok(())
    }

    fn quote_identifier(name: &str) -> Result<String, StorageError> {
        if IDENTIFIER.is_match(name) {
            Ok(format!("\"{}\"", name))
        } else {
            Err(StorageError::InvalidIdentifier(name.to_string()))
        }
    }

    /// Render a filter as a WHERE clause, appending bound values to `params`
    fn build_where(filter: &Filter, params: &mut Vec<Value>) -> Result<String, StorageError> {
        let clause = match filter {
            Filter::All => "1 = 1".to_string(),
            Filter::Eq(column, Value::Null) => {
                format!("{} IS NULL", Self::quote_identifier(column)?)
            }
            Filter::Eq(column, value) => {
                params.push(value.clone());
                format!("{} = ?", Self::quote_identifier(column)?)
            }
            Filter::In(_, values) if values.is_empty() => "1 = 0".to_string(),
            Filter::In(column, values) => {
                params.extend(values.iter().cloned());
                let placeholders = vec!["?"; values.len()].join(", ");
                format!("{} IN ({})", Self::quote_identifier(column)?, placeholders)
            }
            Filter::And(filters) if filters.is_empty() => "1 = 1".to_string(),
            Filter::Or(filters) if filters.is_empty() => "1 = 0".to_string(),
            Filter::And(filters) => Self::join_clauses(filters, " AND ", params)?,
            Filter::Or(filters) => Self::join_clauses(filters, " OR ", params)?,
        };
        Ok(clause)
    }

    fn join_clauses(
        filters: &[Filter],
        separator: &str,
        params: &mut Vec<Value>,
    ) -> Result<String, StorageError> {
        let parts = filters
            .iter()
            .map(|f| Self::build_where(f, params))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(format!("({})", parts.join(separator)))
    }

    fn bind_value<'q>(
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
        value: &Value,
    ) -> Query<'q, Sqlite, SqliteArguments<'q>> {
        match value {
            Value::Null => query.bind(None::<i64>),
            Value::Bool(b) => query.bind(*b as i64),
            Value::Int(i) => query.bind(*i),
            Value::Float(f) => query.bind(*f),
            Value::String(s) => query.bind(s.clone()),
            Value::Binary(b) => query.bind(b.clone()),
            Value::DateTime(_) => query.bind(value.to_display_string()),
            Value::Json(j) => query.bind(j.to_string()),
        }
    }

    /// Convert a sqlx row into a [`Row`], keeping the select order
    fn convert_row(row: &sqlx::sqlite::SqliteRow, table: &str) -> Result<Row, StorageError> {
        let mut converted = Row::new();
        for (idx, column) in row.columns().iter().enumerate() {
            let value = Self::extract_value(row, idx, table)?;
            converted.set(column.name(), value);
        }
        Ok(converted)
    }

    /// Extract value from SQLite row
    fn extract_value(
        row: &sqlx::sqlite::SqliteRow,
        idx: usize,
        table: &str,
    ) -> Result<Value, StorageError> {
        let value_ref = row.try_get_raw(idx).map_err(|e| {
            StorageError::query_failed(table, format!("failed to get value at index {}: {}", idx, e))
        })?;

        if value_ref.is_null() {
            return Ok(Value::Null);
        }

        // SQLite uses dynamic typing, so we check the stored type of the value
        let type_name = value_ref.type_info().name().to_string();
        drop(value_ref);

        let conversion = |e: sqlx::Error| {
            StorageError::ConversionError(format!("{}[{}] as {}: {}", table, idx, type_name, e))
        };

        match type_name.as_str() {
            "INTEGER" | "BOOLEAN" => Ok(Value::Int(row.try_get::<i64, _>(idx).map_err(conversion)?)),
            "REAL" => Ok(Value::Float(row.try_get::<f64, _>(idx).map_err(conversion)?)),
            "TEXT" | "DATETIME" | "DATE" | "TIME" => {
                Ok(Value::String(row.try_get::<String, _>(idx).map_err(conversion)?))
            }
            "BLOB" => Ok(Value::Binary(row.try_get::<Vec<u8>, _>(idx).map_err(conversion)?)),
            _ => {
                // Try as string first, then fallback to Null
                if let Ok(val) = row.try_get::<String, _>(idx) {
                    Ok(Value::String(val))
                } else if let Ok(val) = row.try_get::<i64, _>(idx) {
                    Ok(Value::Int(val))
                } else {
                    Ok(Value::Null)
                }
            }
        }
    }
}

#[async_trait]
impl RowStore for SqliteRowStore {
    async fn query(
        &self,
        table: &str,
        filter: &Filter,
        order_by: Option<&OrderBy>,
    ) -> Result<Vec<Row>, StorageError> {
        let mut params = Vec::new();
        let mut sql = format!(
            "SELECT * FROM {} WHERE {}",
            Self::quote_identifier(table)?,
            Self::build_where(filter, &mut params)?
        );

        if let Some(order_by) = order_by {
            let direction = match order_by.direction {
                SortDirection::Asc => "ASC",
                SortDirection::Desc => "DESC",
            };
            sql.push_str(&format!(
                " ORDER BY {} {}",
                Self::quote_identifier(&order_by.column)?,
                direction
            ));
        }

        debug!(table, sql = %sql, "sqlite query");

        let mut query = sqlx::query(&sql);
        for param in &params {
            query = Self::bind_value(query, param);
        }

        let rows = query
            .fetch_all(self.pool.as_ref())
            .await
            .map_err(|e| StorageError::query_failed(table, e))?;

        rows.iter().map(|row| Self::convert_row(row, table)).collect()
    }

    async fn delete(&self, table: &str, filter: &Filter) -> Result<u64, StorageError> {
        let mut params = Vec::new();
        let sql = format!(
            "DELETE FROM {} WHERE {}",
            Self::quote_identifier(table)?,
            Self::build_where(filter, &mut params)?
        );

        let mut query = sqlx::query(&sql);
        for param in &params {
            query = Self::bind_value(query, param);
        }

        let result = query
            .execute(self.pool.as_ref())
            .await
            .map_err(|e| StorageError::write_failed(table, e))?;

        Ok(result.rows_affected())
    }

    async fn insert(&self, table: &str, row: Row) -> Result<(), StorageError> {
        if row.is_empty() {
            return Err(StorageError::write_failed(table, "cannot insert an empty row"));
        }

        let columns = row
            .column_names()
            .into_iter()
            .map(Self::quote_identifier)
            .collect::<Result<Vec<_>, _>>()?;
        let placeholders = vec!["?"; columns.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            Self::quote_identifier(table)?,
            columns.join(", "),
            placeholders
        );

        let mut query = sqlx::query(&sql);
        for (_, value) in row.columns() {
            query = Self::bind_value(query, value);
        }

        query
            .execute(self.pool.as_ref())
            .await
            .map_err(|e| StorageError::write_failed(table, e))?;
        Ok(())
    }

    async fn update(&self, table: &str, filter: &Filter, values: &Row) -> Result<u64, StorageError> {
        if values.is_empty() {
            return Ok(0);
        }

        let assignments = values
            .column_names()
            .into_iter()
            .map(|column| Ok(format!("{} = ?", Self::quote_identifier(column)?)))
            .collect::<Result<Vec<_>, StorageError>>()?;

        let mut params: Vec<Value> = values.columns().map(|(_, value)| value.clone()).collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE {}",
            Self::quote_identifier(table)?,
            assignments.join(", "),
            Self::build_where(filter, &mut params)?
        );

        let mut query = sqlx::query(&sql);
        for param in &params {
            query = Self::bind_value(query, param);
        }

        let result = query
            .execute(self.pool.as_ref())
            .await
            .map_err(|e| StorageError::write_failed(table, e))?;

        Ok(result.rows_affected())
    }
}
