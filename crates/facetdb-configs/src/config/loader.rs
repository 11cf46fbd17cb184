use super::types::FacetConfig;
use std::fs;
use std::path::Path;

const VALID_ENGINES: [&str; 2] = ["rocksdb", "memory"];
const VALID_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];
const VALID_FORMATS: [&str; 2] = ["compact", "json"];

impl FacetConfig {
    /// Load configuration from a TOML file, apply environment overrides and validate.
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text, apply environment overrides and validate.
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let mut config: FacetConfig = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file: {}", e))?;

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Apply environment variable overrides
    ///
    /// - FACETDB_DATA_PATH: Override storage.data_path
    /// - FACETDB_LOG_LEVEL: Override logging.level
    pub fn apply_env_overrides(&mut self) {
        use std::env;

        if let Ok(path) = env::var("FACETDB_DATA_PATH") {
            self.storage.data_path = path;
        }

        if let Ok(level) = env::var("FACETDB_LOG_LEVEL") {
            self.logging.level = level;
        }
    }

    /// Validate configuration settings
    pub fn validate(&self) -> anyhow::Result<()> {
        if !VALID_ENGINES.contains(&self.storage.engine.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid storage engine '{}'. Must be one of: {}",
                self.storage.engine,
                VALID_ENGINES.join(", ")
            ));
        }

        if self.limits.batch_write_ceiling == 0 {
            return Err(anyhow::anyhow!("batch_write_ceiling cannot be 0"));
        }

        if self.limits.transact_write_ceiling == 0 {
            return Err(anyhow::anyhow!("transact_write_ceiling cannot be 0"));
        }

        if self.limits.max_transaction_attempts == 0 {
            return Err(anyhow::anyhow!("max_transaction_attempts cannot be 0"));
        }

        if self.limits.maintenance_page_size == 0 {
            return Err(anyhow::anyhow!("maintenance_page_size cannot be 0"));
        }

        if !VALID_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                VALID_LEVELS.join(", ")
            ));
        }

        if !VALID_FORMATS.contains(&self.logging.format.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                VALID_FORMATS.join(", ")
            ));
        }

        for (target, level) in &self.logging.targets {
            if !VALID_LEVELS.contains(&level.as_str()) {
                return Err(anyhow::anyhow!(
                    "Invalid log level '{}' for target '{}'. Must be one of: {}",
                    level,
                    target,
                    VALID_LEVELS.join(", ")
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = FacetConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.limits.transact_write_ceiling, 100);
        assert_eq!(config.limits.max_transaction_attempts, 20);
    }

    #[test]
    fn test_parse_partial_toml() {
        let config = FacetConfig::from_toml_str(
            r#"
            [storage]
            engine = "memory"

            [limits]
            batch_write_ceiling = 10

            [logging.targets]
            facetdb_store = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.storage.engine, "memory");
        assert_eq!(config.limits.batch_write_ceiling, 10);
        assert_eq!(config.limits.max_retry_jitter_ms, 20);
        assert_eq!(config.logging.targets["facetdb_store"], "debug");
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[limits]\nmaintenance_page_size = 7").unwrap();

        let config = FacetConfig::from_file(file.path()).unwrap();
        assert_eq!(config.limits.maintenance_page_size, 7);
    }

    #[test]
    fn test_invalid_engine() {
        let mut config = FacetConfig::default();
        config.storage.engine = "dynamo".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let mut config = FacetConfig::default();
        config.limits.max_transaction_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_target_level() {
        let mut config = FacetConfig::default();
        config
            .logging
            .targets
            .insert("facetdb_views".to_string(), "loud".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_override_data_path() {
        std::env::set_var("FACETDB_DATA_PATH", "/tmp/facetdb-env");
        let mut config = FacetConfig::default();
        config.apply_env_overrides();
        assert_eq!(config.storage.data_path, "/tmp/facetdb-env");
        std::env::remove_var("FACETDB_DATA_PATH");
    }
}
