//! Privacy request handler
//!
//! リクエスト単位の3つのイベント（削除可否・エクスポート・削除）を公開する。

use crate::config::PrivacyConfig;
use crate::error::{Error, Result};
use crate::privacy::directory::SubjectDirectory;
use crate::privacy::eligibility::EligibilityChecker;
use crate::privacy::erasure::{ErasureExecutor, ErasureReport};
use crate::privacy::export::ExportOrchestrator;
use crate::privacy::fields::CustomFieldResolver;
use crate::privacy::request::PrivacyRequest;
use crate::privacy::types::{ExportDomain, RemovalStatus};
use crate::session::SessionStore;
use crate::storage::RowStore;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

/// The three contracts invoked by the host's request workflow
#[async_trait]
pub trait PrivacyHandler: Send + Sync + std::fmt::Debug {
    /// Whether the request's account may be erased
    async fn can_remove_data(&self, request: &PrivacyRequest) -> Result<RemovalStatus>;

    /// Every domain held about the request's account, in emission order
    async fn export_request(&self, request: &PrivacyRequest) -> Result<Vec<ExportDomain>>;

    /// Pseudonymize the request's account
    async fn remove_data(&self, request: &PrivacyRequest) -> Result<ErasureReport>;
}

/// Handler for the host's user accounts
#[derive(Debug, Clone)]
pub struct UserPrivacyHandler {
    eligibility: EligibilityChecker,
    export: ExportOrchestrator,
    erasure: ErasureExecutor,
}

impl UserPrivacyHandler {
    pub fn new(
        eligibility: EligibilityChecker,
        export: ExportOrchestrator,
        erasure: ErasureExecutor,
    ) -> Self {
        Self {
            eligibility,
            export,
            erasure,
        }
    }

    /// Wire all three components over shared storage handles
    pub fn from_config(
        config: &PrivacyConfig,
        directory: Arc<dyn SubjectDirectory>,
        rows: Arc<dyn RowStore>,
        fields: Arc<dyn CustomFieldResolver>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        let eligibility = EligibilityChecker::new(directory.clone())
            .with_config(config.eligibility.clone());
        let export = ExportOrchestrator::new(directory.clone(), rows.clone(), fields)
            .with_config(config.export.clone())
            .with_tables(config.tables.clone());
        let erasure = ErasureExecutor::new(directory, rows, sessions)
            .with_config(config.erasure.clone())
            .with_session_table(config.tables.session.clone());

        Self::new(eligibility, export, erasure)
    }
}

#[async_trait]
impl PrivacyHandler for UserPrivacyHandler {
    async fn can_remove_data(&self, request: &PrivacyRequest) -> Result<RemovalStatus> {
        self.eligibility.can_erase(request).await
    }

    async fn export_request(&self, request: &PrivacyRequest) -> Result<Vec<ExportDomain>> {
        let subject_id = request.subject().unwrap_or(0);
        Ok(self.export.export_subject(subject_id).await?)
    }

    async fn remove_data(&self, request: &PrivacyRequest) -> Result<ErasureReport> {
        let subject_id = request.subject().unwrap_or(0);

        let status = self.eligibility.can_erase(request).await?;
        if !status.can_remove() {
            let reason = status.reason().unwrap_or_default().to_string();
            warn!(request_id = %request.id, subject_id, %reason, "removal refused");
            return Err(Error::RemovalDenied { subject_id, reason });
        }

        info!(request_id = %request.id, subject_id, "processing removal request");
        self.erasure.erase_subject(subject_id).await
    }
}
