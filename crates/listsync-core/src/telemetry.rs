//! Tracing subscriber setup

use crate::config::{LogFormat, SyncConfig};
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber
///
/// Events go to stderr. `RUST_LOG` wins over `filter` when set. Returns
/// `false` if a global subscriber was already installed, in which case
/// nothing changes.
pub fn init(filter: &str, format: LogFormat) -> bool {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    let installed = match format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.is_ok()
}

/// Install the global tracing subscriber described by `config`
pub fn init_from_config(config: &SyncConfig) -> bool {
    init(&config.log_filter, config.log_format)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_refused() {
        let _ = init("warn", LogFormat::Pretty);
        assert!(!init("debug", LogFormat::Json));
    }
}
