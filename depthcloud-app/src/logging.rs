//! Tracing setup shared by both binaries.

use tracing_subscriber::EnvFilter;

/// Logging configuration.
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Install the global subscriber. Output goes to stderr so it stays out of
    /// the way of anything printed on stdout.
    pub fn init(&self) {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level)),
            )
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}
