//! Eligibility Checker
//!
//! 削除可否の判定。副作用なし。

use crate::config::EligibilityConfig;
use crate::error::Result;
use crate::privacy::directory::SubjectDirectory;
use crate::privacy::request::PrivacyRequest;
use crate::privacy::types::RemovalStatus;
use std::sync::Arc;
use tracing::{debug, info};

/// Decides whether an erasure request may proceed.
///
/// A request without an account, or whose account cannot be found, is
/// permitted: neither holds the admin capability. Directory failures are
/// returned as errors rather than read as "no capability".
#[derive(Debug, Clone)]
pub struct EligibilityChecker {
    directory: Arc<dyn SubjectDirectory>,
    config: EligibilityConfig,
}

impl EligibilityChecker {
    pub fn new(directory: Arc<dyn SubjectDirectory>) -> Self {
        Self {
            directory,
            config: EligibilityConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EligibilityConfig) -> Self {
        self.config = config;
        self
    }

    pub async fn can_erase(&self, request: &PrivacyRequest) -> Result<RemovalStatus> {
        let Some(subject_id) = request.subject() else {
            debug!(request_id = %request.id, "request has no subject, permitting");
            return Ok(RemovalStatus::permitted());
        };

        let Some(subject) = self.directory.load_subject(subject_id).await? else {
            debug!(subject_id, "subject not found, permitting");
            return Ok(RemovalStatus::permitted());
        };

        if self
            .directory
            .has_capability(&subject, &self.config.admin_capability)
            .await?
        {
            info!(subject_id, "erasure denied for super-privileged account");
            return Ok(RemovalStatus::denied(self.config.denial_reason.as_str()));
        }

        Ok(RemovalStatus::permitted())
    }
}
