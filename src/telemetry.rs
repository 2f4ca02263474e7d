//! Process-level logging hook.

use crate::config::LoggingConfig;
use tracing_subscriber::EnvFilter;

/// Install a `tracing` subscriber writing formatted events to stderr.
///
/// Returns `false` if a global subscriber was already installed, in which
/// case nothing changes. An unparsable filter falls back to `info`.
pub fn init_logging(config: &LoggingConfig) -> bool {
    let filter = EnvFilter::try_new(config.effective_filter())
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(config.ansi)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_a_no_op() {
        let config = LoggingConfig {
            filter: "not a [valid filter".to_string(),
            ansi: false,
        };

        let _ = init_logging(&config);
        assert!(!init_logging(&config));
    }
}
