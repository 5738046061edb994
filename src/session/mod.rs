//! Session Store Adapter
//!
//! 認証済みセッションの参照と破棄。
//! Erasure uses this layer to make sure no live session can still
//! authenticate as a pseudonymized subject.

pub mod storage;
pub mod store;
pub mod types;

// 公開API
pub use storage::{MemorySessionStorage, SessionStorage};
pub use store::{BackendSessionStore, SessionStore, TableSessionStore};
pub use types::{Session, SessionId};
