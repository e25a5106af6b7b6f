//! Authentication: password hashing, token issue/verify, request extraction
//!
//! The core trusts whatever identity this layer resolves; tokens carry the
//! persisted base role only, never Mantle elevation (which is time-dependent
//! and re-derived from storage on every request).

mod extract;
mod jwt;
mod password;

pub use extract::AuthUser;
pub(crate) use extract::bearer_token;
pub use jwt::{Claims, JwtKeys};
pub use password::{hash_password, verify_password};
