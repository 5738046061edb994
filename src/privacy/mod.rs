//! Privacy Module
//!
//! データ主体の権利（アクセス・削除）を処理するオーケストレーター
//!
//! ## 構成
//!
//! - **Eligibility Checker**: 削除可否の判定
//! - **Export Orchestrator**: ドメイン単位のデータエクスポート（二次対象の推移的探索を含む）
//! - **Erasure Executor**: アカウントの仮名化とセッション破棄
//!
//! Storage handles are injected through constructors; no component holds
//! state across requests.

pub mod directory;
pub mod domain_builder;
pub mod eligibility;
pub mod erasure;
pub mod export;
pub mod fields;
pub mod handler;
pub mod request;
pub mod types;

// 公開API
pub use directory::{
    MemorySubjectDirectory, SubjectDirectory, TableSubjectDirectory, ADMIN_CAPABILITY,
};
pub use domain_builder::{DiscoveryList, DomainSpec};
pub use eligibility::EligibilityChecker;
pub use erasure::{ErasureExecutor, ErasureOutcome, ErasureReport};
pub use export::ExportOrchestrator;
pub use fields::{
    CustomField, CustomFieldResolver, FieldValue, MemoryFieldResolver, TableFieldResolver,
};
pub use handler::{PrivacyHandler, UserPrivacyHandler};
pub use request::{PrivacyRequest, RequestStatus, RequestType};
pub use types::{
    Credentials, ExportDomain, ExportField, ExportItem, RemovalStatus, SecondaryKind,
    SecondarySubject, Subject, CREDENTIAL_COLUMNS,
};
