use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PrivacyConfig {
    /// Host table names
    pub tables: TableConfig,

    /// Export orchestration settings
    pub export: ExportConfig,

    /// Pseudonymization settings
    pub erasure: ErasureConfig,

    /// Erasure eligibility settings
    pub eligibility: EligibilityConfig,

    /// Backing database
    pub database: DatabaseConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Names of the host tables read and written by the core
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    pub users: String,
    pub user_notes: String,
    pub user_profiles: String,
    pub messages: String,
    pub contacts: String,
    pub content: String,
    pub session: String,
    pub usergroup_map: String,
    pub fields: String,
    pub fields_values: String,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            users: "users".to_string(),
            user_notes: "user_notes".to_string(),
            user_profiles: "user_profiles".to_string(),
            messages: "messages".to_string(),
            contacts: "contact_details".to_string(),
            content: "content".to_string(),
            session: "session".to_string(),
            usergroup_map: "user_usergroup_map".to_string(),
            fields: "fields".to_string(),
            fields_values: "fields_values".to_string(),
        }
    }
}

/// Export configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Columns stripped from the identity domain. Credential columns are
    /// stripped regardless and must be listed here too.
    pub identity_redact: Vec<String>,

    /// Actor-tracking columns stripped from the notes domain
    pub notes_redact: Vec<String>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            identity_redact: vec!["password".into(), "otpKey".into(), "otep".into()],
            notes_redact: vec![
                "user_id".into(),
                "created_user_id".into(),
                "modified_user_id".into(),
            ],
        }
    }
}

/// Smallest accepted login token, in bytes
pub const MIN_LOGIN_TOKEN_BYTES: usize = 12;

/// Erasure configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ErasureConfig {
    /// Display name written over the subject's name; `{id}` is replaced
    pub name_template: String,

    /// Non-deliverable address written over the subject's email
    pub email_template: String,

    /// Random bytes in the replacement login, rendered as hex
    pub login_token_bytes: usize,
}

impl Default for ErasureConfig {
    fn default() -> Self {
        Self {
            name_template: "User ID {id}".to_string(),
            email_template: "UserID{id}removed@email.invalid".to_string(),
            login_token_bytes: MIN_LOGIN_TOKEN_BYTES,
        }
    }
}

impl ErasureConfig {
    /// Reject settings that would leave a pseudonymized account linkable
    /// or reachable
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.login_token_bytes < MIN_LOGIN_TOKEN_BYTES {
            return Err(Error::Config(format!(
                "erasure.login_token_bytes must be at least {} (got {})",
                MIN_LOGIN_TOKEN_BYTES, self.login_token_bytes
            )));
        }
        if !self.email_template.ends_with(".invalid") {
            return Err(Error::Config(format!(
                "erasure.email_template must use a .invalid domain (got '{}')",
                self.email_template
            )));
        }
        if !self.email_template.contains("{id}") || !self.name_template.contains("{id}") {
            return Err(Error::Config(
                "erasure templates must embed the subject id via {id}".to_string(),
            ));
        }
        Ok(())
    }
}

/// Eligibility configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EligibilityConfig {
    /// Capability that blocks erasure of its holder
    pub admin_capability: String,

    /// Reason returned when erasure is denied
    pub denial_reason: String,

    /// User groups granting the admin capability
    pub super_user_groups: Vec<i64>,
}

impl Default for EligibilityConfig {
    fn default() -> Self {
        Self {
            admin_capability: "core.admin".to_string(),
            denial_reason: "cannot remove a super-privileged account".to_string(),
            super_user_groups: vec![8],
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// sqlx connection URL
    pub url: String,

    /// Maximum pool connections
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://privacy.db".to_string(),
            max_connections: 5,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    pub json: bool,

    /// Directory for rolling log files; console only when unset
    pub directory: Option<PathBuf>,

    /// Rotation of the log file (daily, hourly, never)
    pub rotation: LogRotation,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            directory: None,
            rotation: LogRotation::Daily,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    /// 日次ローテーション
    Daily,
    /// 時間毎ローテーション
    Hourly,
    /// ローテーションなし
    Never,
}
