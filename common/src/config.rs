//! Service configuration.
//!
//! Values are read from environment variables. Services load a local
//! `.env` file with `dotenvy` before calling [`AppConfig::load_with_service`].

use std::env;
use std::str::FromStr;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DATABASE_URL: &str = "sqlite:registry.db?mode=rwc";
const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;
const DEFAULT_BOOTSTRAP_ORG_ID: i64 = 1;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human readable lines.
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Runtime configuration shared by all services.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Name reported in logs, health checks and response metadata.
    pub service_name: String,
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Metadata store URL (`mysql://...` or `sqlite:...`).
    pub database_url: String,
    /// Maximum pooled connections to the metadata store.
    pub max_connections: u32,
    /// Pool acquire timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Log output format.
    pub log_format: LogFormat,
    /// Token for an ADMIN user created on startup when absent.
    pub bootstrap_admin_token: Option<String>,
    /// Organization of the bootstrap admin.
    pub bootstrap_admin_org_id: i64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service_name: "service".to_string(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            log_format: LogFormat::Pretty,
            bootstrap_admin_token: None,
            bootstrap_admin_org_id: DEFAULT_BOOTSTRAP_ORG_ID,
        }
    }
}

impl AppConfig {
    /// Loads configuration from the environment for the named service.
    ///
    /// Unset or unparsable variables fall back to defaults.
    pub fn load_with_service(service_name: &str) -> Self {
        Self::from_lookup(service_name, |key| env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(service_name: &str, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Self {
            service_name: service_name.to_string(),
            host: lookup("SERVER_HOST").unwrap_or(defaults.host),
            port: parse_var(&lookup, "SERVER_PORT").unwrap_or(defaults.port),
            database_url: lookup("DATABASE_URL").unwrap_or(defaults.database_url),
            max_connections: parse_var(&lookup, "DB_MAX_CONNECTIONS").unwrap_or(defaults.max_connections),
            connect_timeout_secs: parse_var(&lookup, "DB_CONNECT_TIMEOUT_SECS")
                .unwrap_or(defaults.connect_timeout_secs),
            log_format: match lookup("LOG_FORMAT").as_deref() {
                Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
            bootstrap_admin_token: lookup("BOOTSTRAP_ADMIN_TOKEN").filter(|t| !t.is_empty()),
            bootstrap_admin_org_id: parse_var(&lookup, "BOOTSTRAP_ADMIN_ORG_ID")
                .unwrap_or(defaults.bootstrap_admin_org_id),
        }
    }

    /// Returns the `host:port` bind address.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key).and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup("test-service", |key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_env_is_empty() {
        let config = config_from(&[]);
        assert_eq!(config.service_name, "test-service");
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(config.bootstrap_admin_token.is_none());
    }

    #[test]
    fn test_overrides_and_bad_values() {
        let config = config_from(&[
            ("SERVER_PORT", "9000"),
            ("DB_MAX_CONNECTIONS", "not-a-number"),
            ("LOG_FORMAT", "JSON"),
            ("BOOTSTRAP_ADMIN_TOKEN", ""),
            ("BOOTSTRAP_ADMIN_ORG_ID", "42"),
        ]);
        assert_eq!(config.port, 9000);
        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(config.bootstrap_admin_token.is_none());
        assert_eq!(config.bootstrap_admin_org_id, 42);
        assert_eq!(config.bind_addr(), "0.0.0.0:9000");
    }

    #[test]
    fn test_dotenv_file_feeds_config() {
        let content = "# local overrides\nexport SERVER_PORT=9100\nDATABASE_URL=\"sqlite::memory:\"\nLOG_FORMAT='json'\n";
        let vars: HashMap<String, String> = dotenvy::from_read_iter(content.as_bytes())
            .collect::<Result<_, _>>()
            .expect("valid .env content");
        let config = AppConfig::from_lookup("test-service", |key| vars.get(key).cloned());
        assert_eq!(config.port, 9100);
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.log_format, LogFormat::Json);
    }
}
