//! Connection settings for the analytics store.
//!
//! Built once at startup and handed to the query client. Nothing else in
//! the crate reads the environment.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use reqwest::Url;

use crate::error::ConfigError;

pub const DEFAULT_USER: &str = "default";
pub const DEFAULT_DATABASE: &str = "music_stats";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Clone)]
pub struct ClickHouseConfig {
    pub url: Url,
    pub user: String,
    pub password: String,
    pub database: String,
    pub timeout: Duration,
}

impl ClickHouseConfig {
    /// Reads `CLICKHOUSE_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads `CLICKHOUSE_*` variables from a dotenv file without touching
    /// the process environment.
    pub fn from_env_file(path: &Path) -> Result<Self, ConfigError> {
        let mut vars = HashMap::new();
        for item in dotenvy::from_path_iter(path)? {
            let (key, value) = item?;
            vars.insert(key, value);
        }
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let raw_url = get("CLICKHOUSE_URL").ok_or(ConfigError::Missing("CLICKHOUSE_URL"))?;
        let url = Url::parse(raw_url.trim()).map_err(|e| ConfigError::Invalid {
            name: "CLICKHOUSE_URL",
            reason: e.to_string(),
        })?;

        let password = get("CLICKHOUSE_PASSWORD").ok_or(ConfigError::Missing("CLICKHOUSE_PASSWORD"))?;

        let timeout_secs = match get("CLICKHOUSE_TIMEOUT_SECS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "CLICKHOUSE_TIMEOUT_SECS",
                        reason: format!("expected a positive number of seconds, got {raw:?}"),
                    })
                }
            },
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            url,
            user: get("CLICKHOUSE_USER").unwrap_or_else(|| DEFAULT_USER.to_string()),
            password,
            database: get("CLICKHOUSE_DATABASE").unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Query endpoint with the target database appended as a parameter.
    /// Existing query parameters on the configured URL are kept.
    pub fn endpoint(&self) -> Url {
        let mut url = self.url.clone();
        url.query_pairs_mut().append_pair("database", &self.database);
        url
    }
}

impl fmt::Debug for ClickHouseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClickHouseConfig")
            .field("url", &self.url.as_str())
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_applied() {
        let config = ClickHouseConfig::from_lookup(lookup(&[
            ("CLICKHOUSE_URL", "https://ch.example.com:8443"),
            ("CLICKHOUSE_PASSWORD", "secret"),
        ]))
        .unwrap();

        assert_eq!(config.user, "default");
        assert_eq!(config.database, "music_stats");
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(
            config.endpoint().as_str(),
            "https://ch.example.com:8443/?database=music_stats"
        );
    }

    #[test]
    fn test_missing_required_values() {
        let err = ClickHouseConfig::from_lookup(lookup(&[("CLICKHOUSE_PASSWORD", "secret")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("CLICKHOUSE_URL")));

        // empty counts as absent
        let err = ClickHouseConfig::from_lookup(lookup(&[
            ("CLICKHOUSE_URL", "http://localhost:8123"),
            ("CLICKHOUSE_PASSWORD", "  "),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("CLICKHOUSE_PASSWORD")));
    }

    #[test]
    fn test_invalid_values() {
        let err = ClickHouseConfig::from_lookup(lookup(&[
            ("CLICKHOUSE_URL", "not a url"),
            ("CLICKHOUSE_PASSWORD", "secret"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "CLICKHOUSE_URL", .. }));

        let err = ClickHouseConfig::from_lookup(lookup(&[
            ("CLICKHOUSE_URL", "http://localhost:8123"),
            ("CLICKHOUSE_PASSWORD", "secret"),
            ("CLICKHOUSE_TIMEOUT_SECS", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "CLICKHOUSE_TIMEOUT_SECS", .. }));
    }

    #[test]
    fn test_endpoint_keeps_existing_params() {
        let config = ClickHouseConfig::from_lookup(lookup(&[
            ("CLICKHOUSE_URL", "http://localhost:8123/?max_execution_time=30"),
            ("CLICKHOUSE_PASSWORD", "secret"),
            ("CLICKHOUSE_DATABASE", "mb snapshot"),
        ]))
        .unwrap();

        assert_eq!(
            config.endpoint().as_str(),
            "http://localhost:8123/?max_execution_time=30&database=mb+snapshot"
        );
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = ClickHouseConfig::from_lookup(lookup(&[
            ("CLICKHOUSE_URL", "http://localhost:8123"),
            ("CLICKHOUSE_PASSWORD", "hunter2"),
        ]))
        .unwrap();

        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_from_env_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "CLICKHOUSE_URL=http://localhost:8123").unwrap();
        writeln!(temp_file, "CLICKHOUSE_USER=reader").unwrap();
        writeln!(temp_file, "CLICKHOUSE_PASSWORD=secret").unwrap();
        writeln!(temp_file, "CLICKHOUSE_TIMEOUT_SECS=5").unwrap();

        let config = ClickHouseConfig::from_env_file(temp_file.path()).unwrap();
        assert_eq!(config.user, "reader");
        assert_eq!(config.password, "secret");
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_from_env_file_missing_password() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "CLICKHOUSE_URL=http://localhost:8123").unwrap();

        let err = ClickHouseConfig::from_env_file(temp_file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("CLICKHOUSE_PASSWORD")));
    }
}
