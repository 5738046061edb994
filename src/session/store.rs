//! Session store adapters used by the erasure executor.

use crate::error::SessionError;
use crate::session::storage::SessionStorage;
use crate::session::types::SessionId;
use crate::storage::{Filter, RowStore};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Destroys live session objects held by the session handler.
///
/// `destroy` returns `Ok(false)` when the session was already gone.
#[async_trait]
pub trait SessionStore: Send + Sync + std::fmt::Debug {
    async fn destroy(&self, id: &SessionId) -> Result<bool, SessionError>;
}

/// Session store over a [`SessionStorage`] backend
#[derive(Debug, Clone)]
pub struct BackendSessionStore {
    storage: Arc<dyn SessionStorage>,
}

impl BackendSessionStore {
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl SessionStore for BackendSessionStore {
    async fn destroy(&self, id: &SessionId) -> Result<bool, SessionError> {
        let removed = self.storage.delete(id).await?;
        debug!(session_id = %id, removed, "destroyed live session");
        Ok(removed)
    }
}

/// Session store for hosts whose session handler persists sessions in the
/// session table itself; destroying a session deletes its row.
#[derive(Debug, Clone)]
pub struct TableSessionStore {
    rows: Arc<dyn RowStore>,
    table: String,
}

impl TableSessionStore {
    pub fn new(rows: Arc<dyn RowStore>, table: impl Into<String>) -> Self {
        Self {
            rows,
            table: table.into(),
        }
    }
}

#[async_trait]
impl SessionStore for TableSessionStore {
    async fn destroy(&self, id: &SessionId) -> Result<bool, SessionError> {
        let deleted = self
            .rows
            .delete(&self.table, &Filter::eq("session_id", id.as_str()))
            .await?;
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::storage::MemorySessionStorage;
    use crate::session::types::Session;
    use crate::storage::{MemoryRowStore, Row};

    #[tokio::test]
    async fn test_backend_store_destroys_session() {
        let storage = Arc::new(MemorySessionStorage::new());
        let session = storage.create(Session::new(7)).await.unwrap();
        let other = storage.create(Session::new(8)).await.unwrap();
        let store = BackendSessionStore::new(storage.clone());

        assert!(store.destroy(&session.id).await.unwrap());
        assert!(!store.destroy(&session.id).await.unwrap());
        assert!(storage.delete(&other.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_table_store_deletes_row() {
        let rows = MemoryRowStore::new();
        rows.seed(
            "session",
            vec![Row::new().with("session_id", "abc").with("userid", 7i64)],
        )
        .await;
        let store = TableSessionStore::new(Arc::new(rows.clone()), "session");

        assert!(store.destroy(&SessionId::from("abc")).await.unwrap());
        assert!(rows.rows("session").await.is_empty());
    }
}
