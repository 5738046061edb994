use super::types::{Filter, OrderBy, Row};
use super::RowStore;
use crate::error::StorageError;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Kind of operation recorded by [`MemoryRowStore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOperationKind {
    Query,
    Delete,
    Insert,
    Update,
}

/// One recorded call against the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOperation {
    pub kind: StoreOperationKind,
    pub table: String,
}

/// In-memory row store.
///
/// Tables are created on first insert. Every call is recorded so tests can
/// assert which tables were touched, and individual tables can be switched
/// into a failing state.
#[derive(Debug, Clone, Default)]
pub struct MemoryRowStore {
    tables: Arc<RwLock<HashMap<String, Vec<Row>>>>,
    failing: Arc<RwLock<HashSet<String>>>,
    operations: Arc<RwLock<Vec<StoreOperation>>>,
}

impl MemoryRowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert many rows at once
    pub async fn seed(&self, table: &str, rows: impl IntoIterator<Item = Row>) {
        let mut tables = self.tables.write().await;
        tables.entry(table.to_string()).or_default().extend(rows);
    }

    /// Make every subsequent call on `table` fail
    pub async fn fail_table(&self, table: &str) {
        self.failing.write().await.insert(table.to_string());
    }

    pub async fn recover_table(&self, table: &str) {
        self.failing.write().await.remove(table);
    }

    /// Snapshot of a table's rows in insertion order
    pub async fn rows(&self, table: &str) -> Vec<Row> {
        let tables = self.tables.read().await;
        tables.get(table).cloned().unwrap_or_default()
    }

    pub async fn operations(&self) -> Vec<StoreOperation> {
        self.operations.read().await.clone()
    }

    /// Number of recorded operations of `kind` on `table`
    pub async fn count_operations(&self, kind: StoreOperationKind, table: &str) -> usize {
        self.operations
            .read()
            .await
            .iter()
            .filter(|op| op.kind == kind && op.table == table)
            .count()
    }

    async fn record(&self, kind: StoreOperationKind, table: &str) -> Result<(), StorageError> {
        self.operations.write().await.push(StoreOperation {
            kind,
            table: table.to_string(),
        });

        if self.failing.read().await.contains(table) {
            return Err(match kind {
                StoreOperationKind::Query => {
                    StorageError::query_failed(table, "table is marked as failing")
                }
                _ => StorageError::write_failed(table, "table is marked as failing"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RowStore for MemoryRowStore {
    async fn query(
        &self,
        table: &str,
        filter: &Filter,
        order_by: Option<&OrderBy>,
    ) -> Result<Vec<Row>, StorageError> {
        self.record(StoreOperationKind::Query, table).await?;

        let tables = self.tables.read().await;
        let mut result: Vec<Row> = tables
            .get(table)
            .map(|rows| rows.iter().filter(|row| filter.matches(row)).cloned().collect())
            .unwrap_or_default();

        if let Some(order_by) = order_by {
            order_by.sort(&mut result);
        }

        Ok(result)
    }

    async fn delete(&self, table: &str, filter: &Filter) -> Result<u64, StorageError> {
        self.record(StoreOperationKind::Delete, table).await?;

        let mut tables = self.tables.write().await;
        let Some(rows) = tables.get_mut(table) else {
            return Ok(0);
        };

        let before = rows.len();
        rows.retain(|row| !filter.matches(row));
        Ok((before - rows.len()) as u64)
    }

    async fn insert(&self, table: &str, row: Row) -> Result<(), StorageError> {
        self.record(StoreOperationKind::Insert, table).await?;

        let mut tables = self.tables.write().await;
        tables.entry(table.to_string()).or_default().push(row);
        Ok(())
    }

    async fn update(&self, table: &str, filter: &Filter, values: &Row) -> Result<u64, StorageError> {
        self.record(StoreOperationKind::Update, table).await?;

        let mut tables = self.tables.write().await;
        let mut updated = 0;
        if let Some(rows) = tables.get_mut(table) {
            for row in rows.iter_mut().filter(|row| filter.matches(row)) {
                for (column, value) in values.columns() {
                    row.set(column, value.clone());
                }
                updated += 1;
            }
        }
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Value;

    #[tokio::test]
    async fn test_query_filters_and_orders() {
        let store = MemoryRowStore::new();
        store
            .seed(
                "user_profiles",
                vec![
                    Row::new().with("user_id", 42i64).with("ordering", 2i64),
                    Row::new().with("user_id", 7i64).with("ordering", 1i64),
                    Row::new().with("user_id", 42i64).with("ordering", 1i64),
                ],
            )
            .await;

        let rows = store
            .query(
                "user_profiles",
                &Filter::eq("user_id", 42i64),
                Some(&OrderBy::asc("ordering")),
            )
            .await
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("ordering"), Some(&Value::Int(1)));
    }

    #[tokio::test]
    async fn test_failing_table_reports_query_failure() {
        let store = MemoryRowStore::new();
        store.fail_table("messages").await;

        let result = store.query("messages", &Filter::All, None).await;
        assert!(matches!(result, Err(StorageError::QueryFailed { .. })));
        assert_eq!(store.count_operations(StoreOperationKind::Query, "messages").await, 1);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let store = MemoryRowStore::new();
        store
            .seed(
                "session",
                vec![
                    Row::new().with("session_id", "a").with("userid", 7i64),
                    Row::new().with("session_id", "b").with("userid", 8i64),
                ],
            )
            .await;

        let updated = store
            .update(
                "session",
                &Filter::eq("session_id", "a"),
                &Row::new().with("userid", 9i64),
            )
            .await
            .unwrap();
        assert_eq!(updated, 1);

        let deleted = store
            .delete("session", &Filter::is_in("session_id", vec!["a".into(), "b".into()]))
            .await
            .unwrap();
        assert_eq!(deleted, 2);
        assert!(store.rows("session").await.is_empty());
    }
}
