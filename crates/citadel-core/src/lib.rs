//! Citadel authority engine
//!
//! This crate holds the role-gated authority logic:
//! - Effective-role resolution (base role plus live Mantle elevation)
//! - Named authorization predicates
//! - The Mantle ledger (grant / revoke / sweep)
//! - The site state gate (shutdown / bring-online)
//! - The panic ledger
//!
//! Everything is expressed against the [`Storage`] trait so the HTTP layer
//! and the tests share the same engine over an in-memory store.

pub mod authz;
pub mod engine;
pub mod error;
pub mod resolver;
pub mod storage;

pub use engine::{
    AlertView, AuthorityEngine, MantleStatus, MantleView, PanicOutcome, ResolveOutcome,
};
pub use error::{CoreError, CoreResult, StorageError, StorageResult};
pub use storage::{
    AuditStorage, IdentityStorage, MantleStorage, MemoryStorage, NotificationStorage,
    PanicStorage, SiteStorage, Storage,
};
