//! Configuration
//!
//! 設定ファイル・環境変数からの設定読み込み

pub mod loader;
pub mod types;

pub use loader::{validate, ConfigLoader};
pub use types::{
    DatabaseConfig, EligibilityConfig, ErasureConfig, ExportConfig, LogRotation, LoggingConfig,
    PrivacyConfig, TableConfig, MIN_LOGIN_TOKEN_BYTES,
};
