//! # privacy-rs
//!
//! Subject data-rights orchestrator: decides whether an account may be
//! erased, assembles a complete domain-by-domain export of everything held
//! about it, and pseudonymizes it while invalidating its sessions.
//!
//! Storage is reached only through the traits in [`storage`],
//! [`privacy::directory`], [`privacy::fields`] and [`session::store`];
//! in-memory and SQLite adapters are provided.

pub mod config;
pub mod error;
pub mod logging;
pub mod privacy;
pub mod session;
pub mod storage;

pub use config::{ConfigLoader, PrivacyConfig};
pub use error::{Error, ExportFailure, Result, SessionError, StorageError};
pub use privacy::{
    EligibilityChecker, ErasureExecutor, ErasureReport, ExportDomain, ExportOrchestrator,
    PrivacyHandler, PrivacyRequest, RemovalStatus, UserPrivacyHandler,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = Error::InvalidInput("test".to_string());
        assert!(err.to_string().contains("test"));
    }
}
