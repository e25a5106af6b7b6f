//! API layer
//!
//! REST API for accounts, Mantle delegation, panic alerts, and site state.

pub mod rest;

pub use rest::router::create_router;
