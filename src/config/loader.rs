use super::types::PrivacyConfig;
use crate::privacy::CREDENTIAL_COLUMNS;
use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};

/// Configuration loader with builder pattern
pub struct ConfigLoader {
    config_file: Option<String>,
    load_env: bool,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self {
            config_file: None,
            load_env: false,
        }
    }

    /// Load configuration from file
    pub fn load_from_file(mut self, path: Option<&str>) -> Self {
        self.config_file = path.map(String::from);
        self
    }

    /// Load configuration from `PRIVACY_` environment variables
    pub fn load_from_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    /// Build and validate the final configuration
    pub fn build(self) -> Result<PrivacyConfig> {
        let mut builder =
            Config::builder().add_source(Config::try_from(&PrivacyConfig::default())?);

        if let Some(config_path) = &self.config_file {
            builder = builder.add_source(File::with_name(config_path).required(false));
        } else {
            // Try to load from standard locations
            builder = builder
                .add_source(File::with_name("privacy-rs").required(false))
                .add_source(File::with_name("config/privacy-rs").required(false));
        }

        if self.load_env {
            builder = builder.add_source(
                Environment::with_prefix("PRIVACY")
                    .prefix_separator("_")
                    .separator("__"),
            );
        }

        let config: PrivacyConfig = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        validate(&config)?;
        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Reject settings that would weaken export redaction or pseudonymization
pub fn validate(config: &PrivacyConfig) -> Result<()> {
    let redact = &config.export.identity_redact;
    if let Some(missing) = CREDENTIAL_COLUMNS
        .iter()
        .find(|column| !redact.iter().any(|r| r.as_str() == **column))
    {
        bail!("export.identity_redact must include credential column '{}'", missing);
    }
    config.erasure.validate()?;
    if config.eligibility.admin_capability.is_empty() {
        bail!("eligibility.admin_capability must not be empty");
    }
    if config.database.max_connections == 0 {
        bail!("database.max_connections must be positive");
    }
    Ok(())
}
