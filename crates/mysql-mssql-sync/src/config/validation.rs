//! Configuration validation.

use super::Config;
use crate::error::{Result, SyncError};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    // Primary validation
    match config.primary.r#type.as_str() {
        "mysql" => {
            if config.primary.host.is_empty() {
                return Err(SyncError::Config("primary.host is required".into()));
            }
            if config.primary.database.is_empty() {
                return Err(SyncError::Config("primary.database is required".into()));
            }
            if config.primary.user.is_empty() {
                return Err(SyncError::Config("primary.user is required".into()));
            }
        }
        "memory" => {}
        other => {
            return Err(SyncError::Config(format!(
                "primary.type must be 'mysql' or 'memory', got '{}'",
                other
            )));
        }
    }
    validate_identifier("primary.table", &config.primary.table)?;

    // Secondary validation
    match config.secondary.r#type.as_str() {
        "mssql" => {
            if config.secondary.host.is_empty() {
                return Err(SyncError::Config("secondary.host is required".into()));
            }
            if config.secondary.database.is_empty() {
                return Err(SyncError::Config("secondary.database is required".into()));
            }
            if config.secondary.user.is_empty() {
                return Err(SyncError::Config("secondary.user is required".into()));
            }
        }
        "memory" => {}
        other => {
            return Err(SyncError::Config(format!(
                "secondary.type must be 'mssql' or 'memory', got '{}'",
                other
            )));
        }
    }
    validate_identifier("secondary.schema", &config.secondary.schema)?;
    validate_identifier("secondary.table", &config.secondary.table)?;
    if let Some(0) = config.secondary.payload_width {
        return Err(SyncError::Config(
            "secondary.payload_width must be at least 1 (or null for MAX)".into(),
        ));
    }
    if let Some(width) = config.secondary.payload_width {
        if width > 4000 {
            return Err(SyncError::Config(format!(
                "secondary.payload_width must be at most 4000 (or null for MAX), got {}",
                width
            )));
        }
    }

    // Sync config validation
    let sync = &config.sync;
    if sync.default_page_size == 0 {
        return Err(SyncError::Config(
            "sync.default_page_size must be at least 1".into(),
        ));
    }
    if sync.default_page_size > sync.max_page_size {
        return Err(SyncError::Config(format!(
            "sync.default_page_size ({}) cannot exceed sync.max_page_size ({})",
            sync.default_page_size, sync.max_page_size
        )));
    }
    if sync.read_batch_size == 0 {
        return Err(SyncError::Config(
            "sync.read_batch_size must be at least 1".into(),
        ));
    }
    if sync.max_connections == 0 {
        return Err(SyncError::Config(
            "sync.max_connections must be at least 1".into(),
        ));
    }
    if sync.connect_timeout_secs == 0 || sync.query_timeout_secs == 0 {
        return Err(SyncError::Config(
            "sync timeouts must be at least 1 second".into(),
        ));
    }

    if config.server.bind.parse::<std::net::SocketAddr>().is_err() {
        return Err(SyncError::Config(format!(
            "server.bind must be a socket address (host:port), got '{}'",
            config.server.bind
        )));
    }

    Ok(())
}

/// Table and schema names are interpolated into DDL, so only plain
/// identifiers are accepted.
fn validate_identifier(field: &str, value: &str) -> Result<()> {
    let valid = !value.is_empty()
        && value.len() <= 128
        && value
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid {
        Ok(())
    } else {
        Err(SyncError::Config(format!(
            "{} must be a plain identifier (letters, digits, underscore), got '{}'",
            field, value
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PrimaryConfig, SecondaryConfig, ServerConfig, SyncConfig};

    fn valid_config() -> Config {
        Config {
            primary: PrimaryConfig {
                host: "localhost".to_string(),
                database: "app".to_string(),
                user: "root".to_string(),
                password: "password".to_string(),
                ..PrimaryConfig::default()
            },
            secondary: SecondaryConfig {
                host: "localhost".to_string(),
                database: "replica".to_string(),
                user: "sa".to_string(),
                password: "password".to_string(),
                ..SecondaryConfig::default()
            },
            sync: SyncConfig::default(),
            server: ServerConfig::default(),
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&valid_config()).is_ok());
    }

    #[test]
    fn test_memory_config_needs_no_hosts() {
        assert!(validate(&Config::memory()).is_ok());
    }

    #[test]
    fn test_missing_primary_host() {
        let mut config = valid_config();
        config.primary.host = "".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_missing_secondary_user() {
        let mut config = valid_config();
        config.secondary.user = "".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_wrong_store_types() {
        let mut config = valid_config();
        config.primary.r#type = "postgres".to_string();
        assert!(validate(&config).is_err());

        let mut config = valid_config();
        config.secondary.r#type = "mysql".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_table_name_must_be_identifier() {
        let mut config = valid_config();
        config.primary.table = "records; DROP TABLE x".to_string();
        assert!(validate(&config).is_err());

        let mut config = valid_config();
        config.secondary.schema = "1dbo".to_string();
        assert!(validate(&config).is_err());

        let mut config = valid_config();
        config.secondary.table = "image_paths_v2".to_string();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_page_size_bounds() {
        let mut config = valid_config();
        config.sync.default_page_size = 0;
        assert!(validate(&config).is_err());

        let mut config = valid_config();
        config.sync.default_page_size = 2000;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_payload_width_bounds() {
        let mut config = valid_config();
        config.secondary.payload_width = Some(0);
        assert!(validate(&config).is_err());

        config.secondary.payload_width = Some(5000);
        assert!(validate(&config).is_err());

        config.secondary.payload_width = None;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_bad_bind_address() {
        let mut config = valid_config();
        config.server.bind = "localhost".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_primary_config_debug_redacts_password() {
        let mut config = valid_config();
        config.primary.password = "super_secret_password_123".to_string();
        let debug_output = format!("{:?}", config.primary);
        assert!(
            debug_output.contains("[REDACTED]"),
            "Debug output should contain [REDACTED]"
        );
        assert!(
            !debug_output.contains("super_secret_password_123"),
            "Debug output should not contain actual password value"
        );
    }

    #[test]
    fn test_secondary_config_debug_redacts_password() {
        let mut config = valid_config();
        config.secondary.password = "super_secret_password_456".to_string();
        let debug_output = format!("{:?}", config.secondary);
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_password_456"));
    }
}
