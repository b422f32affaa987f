// src/utils/logging.rs
//! Logging utilities for the application.
//!
//! This module provides functions for initializing and configuring
//! the logging system.

use std::io;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

fn env_filter(log_level: &str) -> EnvFilter {
    match EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => EnvFilter::new(log_level), // Use provided level as fallback
    }
}

/// Initialize the logging system with console output
pub fn init_logging(log_level: &str) -> io::Result<()> {
    // Logs go to stderr so stdout stays clean for command output
    let console_layer = fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_writer(io::stderr);

    tracing_subscriber::registry()
        .with(console_layer.with_filter(env_filter(log_level)))
        .try_init()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("Failed to initialize logging: {}", e)))?;

    Ok(())
}

/// Sets up daily-rotated file logging in addition to console output.
///
/// The returned guard flushes the file writer when dropped and must be
/// held for as long as the process logs.
pub fn init_file_logging(log_level: &str, log_file: &Path) -> io::Result<WorkerGuard> {
    let log_dir = log_file.parent().unwrap_or_else(|| Path::new("."));
    let file_name = log_file
        .file_name()
        .unwrap_or_else(|| std::ffi::OsStr::new("solidserver-ipam.log"))
        .to_os_string();

    let file_appender = rolling::daily(log_dir, file_name);
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_writer(non_blocking_writer)
        .with_ansi(false);

    let console_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_ansi(true);

    tracing_subscriber::registry()
        .with(file_layer.with_filter(env_filter(log_level)))
        .with(console_layer.with_filter(env_filter(log_level)))
        .try_init()
        .map_err(|e| io::Error::new(
            io::ErrorKind::Other,
            format!("Failed to set global default subscriber: {}", e)
        ))?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_init_logging_twice_is_an_error_not_a_panic() {
        let _ = init_logging("debug");
        tracing::info!("Console logging initialized (test)");
        assert!(init_logging("debug").is_err());
    }

    #[test]
    fn test_init_file_logging_does_not_panic() {
        let temp_dir = tempdir().unwrap();
        let log_file = temp_dir.path().join("ipam.log");

        // Another test may already own the global subscriber
        if let Ok(guard) = init_file_logging("trace", &log_file) {
            tracing::info!(subnet = "10.0.0.0/24", "Info message to file");
            drop(guard);
        }
    }
}
