//! Row Store
//!
//! ホストアプリケーションのテーブルへの汎用アクセス層。
//! Export and erasure only ever talk to storage through [`RowStore`], so the
//! core can run against SQLite in production and against memory in tests.

pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod types;

pub use memory::{MemoryRowStore, StoreOperation, StoreOperationKind};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteRowStore;
pub use types::{Filter, OrderBy, Row, SortDirection, Value};

use crate::error::StorageError;
use async_trait::async_trait;

/// Generic table access supplied by the host.
///
/// `query` must return rows in the requested order; when no order is given
/// the backend's natural (insertion) order is used.
#[async_trait]
pub trait RowStore: Send + Sync + std::fmt::Debug {
    async fn query(
        &self,
        table: &str,
        filter: &Filter,
        order_by: Option<&OrderBy>,
    ) -> Result<Vec<Row>, StorageError>;

    /// Delete every matching row, returning the number removed
    async fn delete(&self, table: &str, filter: &Filter) -> Result<u64, StorageError>;

    async fn insert(&self, table: &str, row: Row) -> Result<(), StorageError>;

    /// Overwrite the given columns on every matching row
    async fn update(&self, table: &str, filter: &Filter, values: &Row) -> Result<u64, StorageError>;
}
