//! Shared data models for the registry services.

pub mod database;
pub mod user;

// Re-export commonly used types
pub use database::{
    CreateDatabaseRequest, DatabaseItem, DbType, NewDatabase, UpdateDatabaseRequest,
};
pub use user::{NewUser, SystemRole, User};
