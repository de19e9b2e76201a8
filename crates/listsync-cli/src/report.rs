//! Effective configuration report

use listsync_core::{BufferPolicy, SyncConfig};
use serde::Serialize;
use std::fmt::Write as _;

/// Versions and configuration in effect
#[derive(Debug, Clone, Serialize)]
pub struct ConfigReport {
    pub cli_version: &'static str,
    pub core_version: &'static str,
    pub diff_version: &'static str,
    pub config: SyncConfig,
}

impl ConfigReport {
    /// Report for `config`
    #[must_use]
    pub fn new(config: SyncConfig) -> Self {
        Self {
            cli_version: crate::VERSION,
            core_version: listsync_core::VERSION,
            diff_version: listsync_diff::VERSION,
            config,
        }
    }

    /// Render as pretty JSON
    ///
    /// # Errors
    /// Returns the `serde_json` error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Render a text report
    #[must_use]
    pub fn generate_text(&self) -> String {
        let config = &self.config;
        let buffer = match config.buffer_policy {
            BufferPolicy::Unbounded => "unbounded".to_owned(),
            BufferPolicy::DropOldest { capacity } => format!("drop oldest beyond {capacity}"),
        };
        let queue = config
            .command_queue_capacity
            .map_or_else(|| "unbounded".to_owned(), |capacity| capacity.to_string());

        let mut report = String::new();
        let _ = writeln!(report, "listsync Configuration");
        let _ = writeln!(report, "======================\n");
        let _ = writeln!(report, "CLI Version: {}", self.cli_version);
        let _ = writeln!(report, "Core Version: {}", self.core_version);
        let _ = writeln!(report, "Diff Version: {}\n", self.diff_version);
        let _ = writeln!(report, "Subscriber Buffer: {buffer}");
        let _ = writeln!(report, "Command Queue: {queue}");
        let _ = writeln!(report, "Resync On Desync: {}", config.resync_on_desync);
        let _ = writeln!(report, "Log Filter: {}", config.log_filter);
        let _ = writeln!(report, "Log Format: {:?}", config.log_format);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_mentions_policy() {
        let config = SyncConfig::new()
            .with_buffer_policy(BufferPolicy::DropOldest { capacity: 16 })
            .with_command_queue_capacity(8);
        let text = ConfigReport::new(config).generate_text();

        assert!(text.contains("drop oldest beyond 16"));
        assert!(text.contains("Command Queue: 8"));
    }

    #[test]
    fn json_nests_config() {
        let json = ConfigReport::new(SyncConfig::default()).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["config"]["buffer_policy"]["kind"], "unbounded");
        assert_eq!(value["config"]["resync_on_desync"], true);
    }
}
