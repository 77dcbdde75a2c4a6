//! Data models
//!
//! Shared between the server and its API clients.
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64` (PostgreSQL BIGSERIAL).

pub mod employee;
pub mod evaluation;
pub mod invitation;
pub mod template;

// Re-exports
pub use employee::*;
pub use evaluation::*;
pub use invitation::*;
pub use template::*;
