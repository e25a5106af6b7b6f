//! API request handlers

mod audit;
mod auth;
mod health;
mod mantles;
mod notifications;
mod panic;
mod site;
mod users;

pub use audit::*;
pub use auth::*;
pub use health::*;
pub use mantles::*;
pub use notifications::*;
pub use panic::*;
pub use site::*;
pub use users::*;
