//! Erasure Executor
//!
//! アカウントの仮名化とセッション破棄。取り消し不可。

use crate::config::ErasureConfig;
use crate::error::{Error, Result};
use crate::privacy::directory::SubjectDirectory;
use crate::privacy::types::Subject;
use crate::session::{SessionId, SessionStore};
use crate::storage::{Filter, RowStore, Value};
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

const ID_PLACEHOLDER: &str = "{id}";

/// What an erasure run did to the subject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErasureOutcome {
    /// No account attached to the request
    NotApplicable,
    /// No such subject, or a guest identity
    SubjectNotFound,
    /// Identity overwritten and sessions cleaned up
    Pseudonymized,
}

/// Summary of one erasure run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErasureReport {
    pub subject_id: u64,
    pub outcome: ErasureOutcome,
    /// Session rows owned by the subject when the run started
    pub sessions_found: usize,
    pub sessions_destroyed: usize,
    /// Live sessions whose destroy call failed; their rows are still deleted
    pub destroy_failures: usize,
    pub rows_deleted: u64,
}

impl ErasureReport {
    fn new(subject_id: u64, outcome: ErasureOutcome) -> Self {
        Self {
            subject_id,
            outcome,
            sessions_found: 0,
            sessions_destroyed: 0,
            destroy_failures: 0,
            rows_deleted: 0,
        }
    }

    pub fn is_pseudonymized(&self) -> bool {
        self.outcome == ErasureOutcome::Pseudonymized
    }
}

/// Pseudonymizes a subject and invalidates every session it owns
#[derive(Debug, Clone)]
pub struct ErasureExecutor {
    directory: Arc<dyn SubjectDirectory>,
    rows: Arc<dyn RowStore>,
    sessions: Arc<dyn SessionStore>,
    config: ErasureConfig,
    session_table: String,
    rng: SystemRandom,
}

impl ErasureExecutor {
    pub fn new(
        directory: Arc<dyn SubjectDirectory>,
        rows: Arc<dyn RowStore>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            directory,
            rows,
            sessions,
            config: ErasureConfig::default(),
            session_table: "session".to_string(),
            rng: SystemRandom::new(),
        }
    }

    pub fn with_config(mut self, config: ErasureConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_session_table(mut self, table: impl Into<String>) -> Self {
        self.session_table = table.into();
        self
    }

    /// Erase `subject_id`.
    ///
    /// The identity record is saved before any session is touched; if the
    /// save fails the run stops with [`Error::Persistence`]. A weak
    /// [`ErasureConfig`] is refused with [`Error::Config`] before the subject
    /// is loaded.
    pub async fn erase_subject(&self, subject_id: u64) -> Result<ErasureReport> {
        if subject_id == 0 {
            debug!("erasure request without subject, nothing to do");
            return Ok(ErasureReport::new(0, ErasureOutcome::NotApplicable));
        }
        self.config.validate()?;

        let subject = match self.directory.load_subject(subject_id).await? {
            Some(subject) if !subject.is_guest() => subject,
            _ => {
                info!(subject_id, "subject not found, nothing to erase");
                return Ok(ErasureReport::new(subject_id, ErasureOutcome::SubjectNotFound));
            }
        };

        let pseudonym = self.pseudonymize(subject)?;
        if let Err(e) = self.directory.save_subject(&pseudonym).await {
            error!(subject_id, error = %e, "failed to persist pseudonymized subject");
            return Err(Error::Persistence {
                subject_id,
                reason: e.to_string(),
            });
        }
        info!(subject_id, "subject pseudonymized");

        let mut report = ErasureReport::new(subject_id, ErasureOutcome::Pseudonymized);
        self.destroy_sessions(subject_id, &mut report).await?;

        info!(
            subject_id,
            sessions = report.sessions_found,
            destroy_failures = report.destroy_failures,
            "erasure complete"
        );
        Ok(report)
    }

    /// Overwrite every identifying field of `subject`
    fn pseudonymize(&self, mut subject: Subject) -> Result<Subject> {
        let id = subject.id.to_string();
        subject.name = self.config.name_template.replace(ID_PLACEHOLDER, &id);
        subject.username = self.login_token()?;
        subject.email = self.config.email_template.replace(ID_PLACEHOLDER, &id);
        subject.block = true;
        Ok(subject)
    }

    /// Random login rendered as lowercase hex
    fn login_token(&self) -> Result<String> {
        let mut bytes = vec![0u8; self.config.login_token_bytes];
        self.rng
            .fill(&mut bytes)
            .map_err(|_| Error::Crypto("failed to generate login token".into()))?;
        Ok(bytes.iter().map(|b| format!("{:02x}", b)).collect())
    }

    async fn destroy_sessions(&self, subject_id: u64, report: &mut ErasureReport) -> Result<()> {
        let rows = self
            .rows
            .query(&self.session_table, &Filter::eq("userid", subject_id), None)
            .await?;

        let ids: Vec<SessionId> = rows
            .iter()
            .filter_map(|row| row.get("session_id"))
            .filter(|value| !value.is_null())
            .map(|value| SessionId::from_string(value.to_display_string()))
            .collect();

        report.sessions_found = ids.len();
        if ids.is_empty() {
            return Ok(());
        }

        for id in &ids {
            match self.sessions.destroy(id).await {
                Ok(true) => report.sessions_destroyed += 1,
                Ok(false) => debug!(subject_id, session_id = %id, "live session already gone"),
                Err(e) => {
                    warn!(subject_id, session_id = %id, error = %e, "failed to destroy live session");
                    report.destroy_failures += 1;
                }
            }
        }

        let collected: Vec<Value> = ids.iter().map(|id| Value::from(id.as_str())).collect();
        report.rows_deleted = self
            .rows
            .delete(&self.session_table, &Filter::is_in("session_id", collected))
            .await?;
        Ok(())
    }
}
