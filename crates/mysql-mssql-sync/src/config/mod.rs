//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::error::{Result, SyncError};
use std::path::Path;
use tracing::debug;

impl Config {
    /// Load configuration from a YAML file, then apply environment overrides.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = serde_yaml::from_str(&content)?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }

    /// Override connection settings from `MYSQL_*` and `SQLSERVER_*` variables.
    ///
    /// `lookup` is usually `std::env::var`; tests pass a map instead.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(v) = get("MYSQL_HOST") {
            self.primary.host = v;
        }
        if let Some(v) = get("MYSQL_PORT") {
            self.primary.port = parse_port("MYSQL_PORT", &v)?;
        }
        if let Some(v) = get("MYSQL_USER") {
            self.primary.user = v;
        }
        if let Some(v) = get("MYSQL_PASSWORD") {
            self.primary.password = v;
        }
        if let Some(v) = get("MYSQL_DATABASE") {
            self.primary.database = v;
        }

        if let Some(v) = get("SQLSERVER_SERVER") {
            self.secondary.host = v;
        }
        if let Some(v) = get("SQLSERVER_PORT") {
            self.secondary.port = parse_port("SQLSERVER_PORT", &v)?;
        }
        if let Some(v) = get("SQLSERVER_USER") {
            self.secondary.user = v;
        }
        if let Some(v) = get("SQLSERVER_PASSWORD") {
            self.secondary.password = v;
        }
        if let Some(v) = get("SQLSERVER_DATABASE") {
            self.secondary.database = v;
        }

        debug!("Applied environment overrides: {:?}", self.primary);
        Ok(())
    }
}

fn parse_port(key: &str, value: &str) -> Result<u16> {
    value.trim().parse::<u16>().map_err(|_| {
        SyncError::Config(format!(
            "Invalid {}: '{}' is not a valid port number",
            key, value
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    const YAML: &str = r#"
primary:
  host: mysql.local
  database: app
  user: app
  password: secret
secondary:
  host: mssql.local
  database: replica
  user: sa
  password: secret
"#;

    #[test]
    fn test_from_yaml_applies_defaults() {
        let config = Config::from_yaml(YAML).unwrap();
        assert_eq!(config.primary.r#type, "mysql");
        assert_eq!(config.primary.port, 3306);
        assert_eq!(config.primary.table, "records");
        assert_eq!(config.secondary.r#type, "mssql");
        assert_eq!(config.secondary.port, 1433);
        assert_eq!(config.secondary.schema, "dbo");
        assert_eq!(config.secondary.payload_width, Some(2000));
        assert_eq!(config.sync.default_page_size, 50);
        assert_eq!(config.server.bind, "127.0.0.1:3000");
    }

    #[test]
    fn test_null_payload_width_means_max() {
        let yaml = format!("{}  payload_width: null\n", YAML);
        let config = Config::from_yaml(&yaml).unwrap();
        assert_eq!(config.secondary.payload_width, None);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::from_yaml(YAML).unwrap();
        let env: HashMap<&str, &str> = [
            ("MYSQL_HOST", "db1"),
            ("MYSQL_PORT", "3307"),
            ("SQLSERVER_SERVER", "db2"),
            ("SQLSERVER_PORT", "14330"),
            ("SQLSERVER_PASSWORD", "from-env"),
            ("MYSQL_USER", ""),
        ]
        .into_iter()
        .collect();

        config
            .apply_env_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.primary.host, "db1");
        assert_eq!(config.primary.port, 3307);
        // Empty values are ignored
        assert_eq!(config.primary.user, "app");
        assert_eq!(config.secondary.host, "db2");
        assert_eq!(config.secondary.port, 14330);
        assert_eq!(config.secondary.password, "from-env");
    }

    #[test]
    fn test_invalid_port_override() {
        let mut config = Config::from_yaml(YAML).unwrap();
        let err = config
            .apply_env_overrides(|k| (k == "SQLSERVER_PORT").then(|| "abc".to_string()))
            .unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
        assert!(err.to_string().contains("SQLSERVER_PORT"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", YAML).unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.secondary.database, "replica");
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = Config::load("does-not-exist.yaml").unwrap_err();
        assert!(matches!(err, SyncError::Io(_)));
    }
}
