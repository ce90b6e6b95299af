//! Database registry models.
//!
//! A registered database is connection metadata (JDBC URL, credentials and
//! engine type) owned by exactly one organization.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

/// Database engine type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DbType {
    /// PostgreSQL.
    Postgres,
    /// MySQL.
    MySQL,
    /// MariaDB.
    MariaDB,
    /// Amazon Redshift.
    Redshift,
    /// Snowflake.
    Snowflake,
    /// Microsoft SQL Server.
    SqlServer,
    /// Oracle Database.
    Oracle,
    /// SQLite.
    SQLite,
}

impl DbType {
    /// Storage and wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            DbType::Postgres => "postgres",
            DbType::MySQL => "mysql",
            DbType::MariaDB => "mariadb",
            DbType::Redshift => "redshift",
            DbType::Snowflake => "snowflake",
            DbType::SqlServer => "sqlserver",
            DbType::Oracle => "oracle",
            DbType::SQLite => "sqlite",
        }
    }
}

impl fmt::Display for DbType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DbType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" => Ok(DbType::Postgres),
            "mysql" => Ok(DbType::MySQL),
            "mariadb" => Ok(DbType::MariaDB),
            "redshift" => Ok(DbType::Redshift),
            "snowflake" => Ok(DbType::Snowflake),
            "sqlserver" => Ok(DbType::SqlServer),
            "oracle" => Ok(DbType::Oracle),
            "sqlite" => Ok(DbType::SQLite),
            other => Err(format!("unknown database type '{other}'")),
        }
    }
}

/// A registered database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseItem {
    /// Unique database identifier.
    pub id: i64,
    /// JDBC connection URL.
    pub jdbc_url: String,
    /// Login user.
    pub user_name: String,
    /// Login password (never serialized in responses).
    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub password: String,
    /// Engine type.
    #[serde(rename = "type")]
    pub db_type: DbType,
    /// Owning organization.
    pub org_id: i64,
}

impl DatabaseItem {
    /// Applies a partial update.
    ///
    /// Fields present in the request replace the stored ones; absent fields
    /// keep their current value. `id` and `org_id` never change.
    pub fn merge(self, req: UpdateDatabaseRequest) -> Self {
        Self {
            id: self.id,
            jdbc_url: req.jdbc_url.unwrap_or(self.jdbc_url),
            user_name: req.user_name.unwrap_or(self.user_name),
            password: req.password.unwrap_or(self.password),
            db_type: req.db_type.unwrap_or(self.db_type),
            org_id: self.org_id,
        }
    }
}

/// A database record that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDatabase {
    pub jdbc_url: String,
    pub user_name: String,
    pub password: String,
    pub db_type: DbType,
    pub org_id: i64,
}

/// Request body for registering a database.
///
/// The owning organization always comes from the caller; an `orgId` sent in
/// the body is ignored.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateDatabaseRequest {
    /// JDBC connection URL, e.g. `jdbc:postgresql://db:5432/app`.
    #[validate(
        length(min = 1, max = 2048, message = "jdbcUrl must be 1-2048 characters"),
        custom(function = "validate_jdbc_url")
    )]
    pub jdbc_url: String,
    /// Login user.
    #[validate(length(min = 1, max = 128, message = "userName must be 1-128 characters"))]
    pub user_name: String,
    /// Login password.
    #[validate(length(max = 512, message = "password must be at most 512 characters"))]
    pub password: String,
    /// Engine type.
    #[serde(rename = "type")]
    pub db_type: DbType,
}

impl CreateDatabaseRequest {
    /// Converts the request into a record owned by `org_id`.
    pub fn into_new(self, org_id: i64) -> NewDatabase {
        NewDatabase {
            jdbc_url: self.jdbc_url,
            user_name: self.user_name,
            password: self.password,
            db_type: self.db_type,
            org_id,
        }
    }
}

/// Request body for a partial update. Omitted or null fields are left unchanged.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDatabaseRequest {
    /// New JDBC connection URL.
    #[validate(
        length(min = 1, max = 2048, message = "jdbcUrl must be 1-2048 characters"),
        custom(function = "validate_jdbc_url")
    )]
    pub jdbc_url: Option<String>,
    /// New login user.
    #[validate(length(min = 1, max = 128, message = "userName must be 1-128 characters"))]
    pub user_name: Option<String>,
    /// New login password.
    #[validate(length(max = 512, message = "password must be at most 512 characters"))]
    pub password: Option<String>,
    /// New engine type.
    #[serde(rename = "type")]
    pub db_type: Option<DbType>,
}

fn validate_jdbc_url(url: &str) -> Result<(), ValidationError> {
    let valid = url
        .strip_prefix("jdbc:")
        .and_then(|rest| rest.split_once(':'))
        .is_some_and(|(subprotocol, _)| !subprotocol.is_empty());
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("jdbc_url")
            .with_message("jdbcUrl must look like jdbc:<subprotocol>:<target>".into()))
    }
}
