//! # Structured Logging Module
//!
//! Environment-aware `tracing` initialization. All log output goes to
//! stderr: in stdio serving mode the process's stdout belongs to the wire
//! protocol, and in TCP mode it carries the announcement line.

use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize logging once; later calls are no-ops
///
/// The default level follows the `DROVER_ENV` environment; `RUST_LOG`
/// overrides it entirely. `try_init` is used so an embedding application's
/// subscriber wins without a panic.
pub fn init_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let default_level = get_log_level(&environment);

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_level));

        let initialized = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .try_init()
            .is_ok();

        if initialized {
            tracing::debug!(
                environment = %environment,
                pid = std::process::id(),
                "Logging initialized"
            );
        }
    });
}

/// Get current environment from environment variables
fn get_environment() -> String {
    std::env::var("DROVER_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

/// Get default log level based on environment
fn get_log_level(environment: &str) -> &'static str {
    match environment {
        "production" => "info",
        "test" => "debug",
        "development" => "debug",
        _ => "debug",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_detection() {
        std::env::set_var("DROVER_ENV", "test_override");
        assert_eq!(get_environment(), "test_override");
        std::env::remove_var("DROVER_ENV");
    }

    #[test]
    fn test_log_level_mapping() {
        assert_eq!(get_log_level("test"), "debug");
        assert_eq!(get_log_level("development"), "debug");
        assert_eq!(get_log_level("production"), "info");
        assert_eq!(get_log_level("unknown"), "debug");
    }
}
