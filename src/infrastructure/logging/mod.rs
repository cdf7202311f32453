// Logging module - Logging infrastructure
use crate::domain::error::{SerialTalkerError, SerialTalkerResult};
use std::io;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize logging system
///
/// `RUST_LOG` wins over `level` when set.
pub fn init_logging(level: &str) -> SerialTalkerResult<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(level)));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(true)
                .with_level(true)
                .with_thread_ids(true)
                .with_file(false)
                .with_line_number(false),
        )
        .try_init()
        .map_err(|e| SerialTalkerError::Config {
            message: format!("Failed to initialize logging: {}", e),
        })?;

    tracing::debug!("SerialTalker logging system initialized");
    Ok(())
}

fn default_directive(level: &str) -> String {
    let level = match level.to_ascii_lowercase().as_str() {
        "error" => "error",
        "warn" => "warn",
        "debug" => "debug",
        "trace" => "trace",
        _ => "info",
    };
    format!("serialtalker={},warn", level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive("DEBUG"), "serialtalker=debug,warn");
        assert_eq!(default_directive("nonsense"), "serialtalker=info,warn");
    }

    #[test]
    fn test_logging_init_twice_reports_error() {
        // The first call may lose to another test installing a subscriber
        let _ = init_logging("info");
        assert!(init_logging("info").is_err());
    }
}
