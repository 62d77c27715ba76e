//! Pipeline configuration

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Tunables for the change-set pipeline and its callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Maximum items per batch, and so concurrent applications in flight
    pub max_parallel: usize,
    /// How long a commit stays rate limited after a usage-limit failure
    pub commit_limit_ttl_secs: u64,
    /// Wall-clock limit imposed by caller operations
    pub operation_timeout_secs: u64,
    /// Folder that holds all configuration files
    pub setup_root: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_parallel: 20,
            commit_limit_ttl_secs: 30 * 60,
            operation_timeout_secs: 30,
            setup_root: "Setup".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With batch size cap
    #[inline]
    #[must_use]
    pub fn with_max_parallel(mut self, max: usize) -> Self {
        self.max_parallel = max;
        self
    }

    /// With commit rate-limit window
    #[inline]
    #[must_use]
    pub fn with_commit_limit_ttl(mut self, ttl: Duration) -> Self {
        self.commit_limit_ttl_secs = ttl.as_secs();
        self
    }

    /// With caller operation timeout
    #[inline]
    #[must_use]
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout_secs = timeout.as_secs();
        self
    }

    /// With setup root folder
    #[inline]
    #[must_use]
    pub fn with_setup_root(mut self, root: impl Into<String>) -> Self {
        self.setup_root = root.into();
        self
    }

    /// Rate-limit window as a duration
    #[inline]
    #[must_use]
    pub fn commit_limit_ttl(&self) -> Duration {
        Duration::from_secs(self.commit_limit_ttl_secs)
    }

    /// Operation timeout as a duration
    #[inline]
    #[must_use]
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }

    /// Check value ranges
    ///
    /// # Errors
    /// `ConfigError::Invalid` naming the offending field
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_parallel == 0 {
            return Err(ConfigError::Invalid("max_parallel must be at least 1".into()));
        }
        if self.commit_limit_ttl_secs == 0 {
            return Err(ConfigError::Invalid("commit_limit_ttl_secs must be positive".into()));
        }
        if self.setup_root.trim_matches('/').is_empty() {
            return Err(ConfigError::Invalid("setup_root must not be empty".into()));
        }
        Ok(())
    }

    /// Parse and validate TOML
    ///
    /// Missing keys take their default values.
    ///
    /// # Errors
    /// `ConfigError::Parse` or `ConfigError::Invalid`
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    ///
    /// # Errors
    /// `ConfigError::Io`, `ConfigError::Parse` or `ConfigError::Invalid`
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.max_parallel, 20);
        assert_eq!(config.commit_limit_ttl(), Duration::from_secs(1800));
        assert_eq!(config.operation_timeout(), Duration::from_secs(30));
        assert_eq!(config.setup_root, "Setup");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = PipelineConfig::from_toml_str("max_parallel = 4\n").unwrap();
        assert_eq!(config.max_parallel, 4);
        assert_eq!(config.setup_root, "Setup");
    }

    #[test]
    fn zero_parallelism_is_rejected() {
        let err = PipelineConfig::from_toml_str("max_parallel = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert!(matches!(
            PipelineConfig::from_toml_str("max_parallel = ["),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfgsync.toml");
        std::fs::write(&path, "setup_root = \"Config\"\noperation_timeout_secs = 5\n").unwrap();
        let config = PipelineConfig::load(&path).unwrap();
        assert_eq!(config.setup_root, "Config");
        assert_eq!(config.operation_timeout_secs, 5);

        assert!(matches!(
            PipelineConfig::load(dir.path().join("missing.toml")),
            Err(ConfigError::Io { .. })
        ));
    }
}
