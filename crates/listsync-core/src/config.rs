//! Sync configuration
//!
//! [`SyncConfig`] is plain serde data, loaded from TOML:
//!
//! ```toml
//! resync_on_desync = true
//! log_filter = "listsync=debug"
//! log_format = "json"
//!
//! [buffer_policy]
//! kind = "drop_oldest"
//! capacity = 64
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How much a subscriber may fall behind the writer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BufferPolicy {
    /// Keep every value until the subscriber reads it
    #[default]
    Unbounded,

    /// Keep at most `capacity` pending values, discarding the oldest
    DropOldest {
        /// Pending values kept per subscriber
        capacity: usize,
    },
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human readable lines
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

/// Sync configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Subscriber buffering
    pub buffer_policy: BufferPolicy,
    /// Ask upstream for a full reset after a malformed batch
    pub resync_on_desync: bool,
    /// Bound on queued scope commands (`None` = unbounded)
    pub command_queue_capacity: Option<usize>,
    /// Default tracing filter, overridden by `RUST_LOG`
    pub log_filter: String,
    /// Log output format
    pub log_format: LogFormat,
}

impl SyncConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With subscriber buffer policy
    #[inline]
    #[must_use]
    pub fn with_buffer_policy(mut self, policy: BufferPolicy) -> Self {
        self.buffer_policy = policy;
        self
    }

    /// With resync behavior
    #[inline]
    #[must_use]
    pub fn with_resync_on_desync(mut self, enabled: bool) -> Self {
        self.resync_on_desync = enabled;
        self
    }

    /// With bounded command queues
    #[inline]
    #[must_use]
    pub fn with_command_queue_capacity(mut self, capacity: usize) -> Self {
        self.command_queue_capacity = Some(capacity);
        self
    }

    /// With log filter
    #[inline]
    #[must_use]
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    /// With log format
    #[inline]
    #[must_use]
    pub fn with_log_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }

    /// Parse and validate a TOML document
    ///
    /// # Errors
    /// - `ConfigError::Parse` for malformed TOML or unknown values
    /// - `ConfigError::Invalid` if validation fails
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    ///
    /// # Errors
    /// Returns `ConfigError::Io` if the file cannot be read, otherwise as
    /// [`from_toml_str`](Self::from_toml_str).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Check values that parse but cannot work
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` for zero capacities.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let BufferPolicy::DropOldest { capacity: 0 } = self.buffer_policy {
            return Err(ConfigError::Invalid(
                "buffer_policy capacity must be at least 1".into(),
            ));
        }
        if self.command_queue_capacity == Some(0) {
            return Err(ConfigError::Invalid(
                "command_queue_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            buffer_policy: BufferPolicy::Unbounded,
            resync_on_desync: true,
            command_queue_capacity: None,
            log_filter: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = SyncConfig::new();
        assert_eq!(config.buffer_policy, BufferPolicy::Unbounded);
        assert!(config.resync_on_desync);
        assert_eq!(config.command_queue_capacity, None);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn empty_document_is_default() {
        let config = SyncConfig::from_toml_str("").unwrap();
        assert_eq!(config, SyncConfig::default());
    }

    #[test]
    fn parses_full_document() {
        let config = SyncConfig::from_toml_str(
            r#"
            resync_on_desync = false
            command_queue_capacity = 32
            log_filter = "listsync=debug"
            log_format = "json"

            [buffer_policy]
            kind = "drop_oldest"
            capacity = 8
            "#,
        )
        .unwrap();

        assert_eq!(
            config,
            SyncConfig::new()
                .with_resync_on_desync(false)
                .with_command_queue_capacity(32)
                .with_log_filter("listsync=debug")
                .with_log_format(LogFormat::Json)
                .with_buffer_policy(BufferPolicy::DropOldest { capacity: 8 })
        );
    }

    #[test]
    fn rejects_zero_capacity() {
        let err = SyncConfig::from_toml_str(
            r#"
            [buffer_policy]
            kind = "drop_oldest"
            capacity = 0
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = SyncConfig::from_toml_str("command_queue_capacity = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_unknown_format() {
        let err = SyncConfig::from_toml_str(r#"log_format = "xml""#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "resync_on_desync = false").unwrap();

        let config = SyncConfig::load(file.path()).unwrap();
        assert!(!config.resync_on_desync);
    }

    #[test]
    fn load_missing_file() {
        let err = SyncConfig::load("/nonexistent/listsync.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
