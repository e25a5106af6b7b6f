//! Storage layer for the authority engine
//!
//! Trait definitions plus the in-memory implementation. The traits are the
//! seam where a SQL backend would attach; the engine never touches a
//! concrete store.

mod memory;
mod traits;

pub use memory::MemoryStorage;
pub use traits::{
    AuditStorage, IdentityStorage, MantleStorage, NotificationStorage, PanicStorage, SiteStorage,
    Storage,
};
