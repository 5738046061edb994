use crate::error::SessionError;
use crate::session::types::{Session, SessionId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Backend holding live session objects
#[async_trait]
pub trait SessionStorage: Send + Sync + std::fmt::Debug {
    async fn create(&self, session: Session) -> Result<Session, SessionError>;
    /// `Ok(false)` when no session has this id
    async fn delete(&self, id: &SessionId) -> Result<bool, SessionError>;
}

/// In-process session backend
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStorage {
    sessions: Arc<RwLock<HashMap<SessionId, Session>>>,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStorage for MemorySessionStorage {
    async fn create(&self, session: Session) -> Result<Session, SessionError> {
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session.clone());
        Ok(session)
    }

    async fn delete(&self, id: &SessionId) -> Result<bool, SessionError> {
        Ok(self.sessions.write().await.remove(id).is_some())
    }
}
