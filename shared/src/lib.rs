//! Shared types for the KPI service
//!
//! Domain models, the error system, the live message envelope and
//! pagination helpers used by the server and its clients.

pub mod error;
pub mod message;
pub mod models;
pub mod request;
pub mod response;
pub mod util;

// Re-exports
pub use axum::Json;
pub use http;
pub use serde::{Deserialize, Serialize};

pub use message::{EventType, LiveMessage, NotificationData};
pub use request::PaginationQuery;
pub use response::PaginatedResponse;
