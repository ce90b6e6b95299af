//! Shared building blocks for the database registry services.
//!
//! Holds configuration loading, the error type and response envelope,
//! request middleware, and the data models exchanged over the API.

pub mod config;
pub mod errors;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod response;

pub use errors::{AppError, AppResult};
pub use response::ApiResponse;
