//! Subject directory
//!
//! Loads, saves and capability-checks subjects. Every run loads the subject
//! fresh; nothing is cached across requests.

use crate::error::StorageError;
use crate::privacy::types::Subject;
use crate::storage::{Filter, Row, RowStore, Value};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Capability that marks a super-privileged account
pub const ADMIN_CAPABILITY: &str = "core.admin";

#[async_trait]
pub trait SubjectDirectory: Send + Sync + std::fmt::Debug {
    /// `Ok(None)` when no subject has this id
    async fn load_subject(&self, id: u64) -> Result<Option<Subject>, StorageError>;

    async fn save_subject(&self, subject: &Subject) -> Result<(), StorageError>;

    async fn has_capability(&self, subject: &Subject, capability: &str) -> Result<bool, StorageError>;
}

/// In-memory directory with failure injection for save paths
#[derive(Debug, Clone, Default)]
pub struct MemorySubjectDirectory {
    subjects: Arc<RwLock<HashMap<u64, Subject>>>,
    capabilities: Arc<RwLock<HashMap<u64, HashSet<String>>>>,
    fail_saves: Arc<AtomicBool>,
    loads: Arc<AtomicUsize>,
    saves: Arc<AtomicUsize>,
}

impl MemorySubjectDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, subject: Subject) {
        self.subjects.write().await.insert(subject.id, subject);
    }

    pub async fn grant(&self, id: u64, capability: &str) {
        self.capabilities
            .write()
            .await
            .entry(id)
            .or_default()
            .insert(capability.to_string());
    }

    /// Current stored state of a subject
    pub async fn get(&self, id: u64) -> Option<Subject> {
        self.subjects.read().await.get(&id).cloned()
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SubjectDirectory for MemorySubjectDirectory {
    async fn load_subject(&self, id: u64) -> Result<Option<Subject>, StorageError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(self.subjects.read().await.get(&id).cloned())
    }

    async fn save_subject(&self, subject: &Subject) -> Result<(), StorageError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StorageError::write_failed("users", "save rejected by directory"));
        }

        let mut subjects = self.subjects.write().await;
        match subjects.get_mut(&subject.id) {
            Some(stored) => {
                *stored = subject.clone();
                Ok(())
            }
            None => Err(StorageError::write_failed(
                "users",
                format!("subject {} does not exist", subject.id),
            )),
        }
    }

    async fn has_capability(&self, subject: &Subject, capability: &str) -> Result<bool, StorageError> {
        let capabilities = self.capabilities.read().await;
        Ok(capabilities
            .get(&subject.id)
            .is_some_and(|granted| granted.contains(capability)))
    }
}

/// Directory over the host's users table.
///
/// `core.admin` is held by members of any of the configured super user
/// groups (via the user/group map table); no other capability is granted.
#[derive(Debug, Clone)]
pub struct TableSubjectDirectory {
    rows: Arc<dyn RowStore>,
    users_table: String,
    group_map_table: String,
    super_user_groups: Vec<i64>,
}

impl TableSubjectDirectory {
    pub fn new(
        rows: Arc<dyn RowStore>,
        users_table: impl Into<String>,
        group_map_table: impl Into<String>,
        super_user_groups: Vec<i64>,
    ) -> Self {
        Self {
            rows,
            users_table: users_table.into(),
            group_map_table: group_map_table.into(),
            super_user_groups,
        }
    }
}

#[async_trait]
impl SubjectDirectory for TableSubjectDirectory {
    async fn load_subject(&self, id: u64) -> Result<Option<Subject>, StorageError> {
        let rows = self
            .rows
            .query(&self.users_table, &Filter::eq("id", id), None)
            .await?;

        rows.first().map(Subject::from_row).transpose()
    }

    /// Writes back the identity columns only; host columns are left as stored.
    async fn save_subject(&self, subject: &Subject) -> Result<(), StorageError> {
        let updated = self
            .rows
            .update(&self.users_table, &Filter::eq("id", subject.id), &subject.identity_row())
            .await?;

        if updated == 0 {
            return Err(StorageError::write_failed(
                &self.users_table,
                format!("subject {} does not exist", subject.id),
            ));
        }
        Ok(())
    }

    async fn has_capability(&self, subject: &Subject, capability: &str) -> Result<bool, StorageError> {
        if capability != ADMIN_CAPABILITY || self.super_user_groups.is_empty() {
            return Ok(false);
        }

        let memberships = self
            .rows
            .query(
                &self.group_map_table,
                &Filter::all_of(vec![
                    Filter::eq("user_id", subject.id),
                    Filter::is_in(
                        "group_id",
                        self.super_user_groups.iter().copied().map(Value::Int).collect(),
                    ),
                ]),
                None,
            )
            .await?;

        Ok(!memberships.is_empty())
    }
}

/// Row for the user/group map table
pub fn group_membership(user_id: u64, group_id: i64) -> Row {
    Row::new().with("user_id", user_id).with("group_id", group_id)
}
