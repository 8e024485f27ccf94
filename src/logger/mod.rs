//! Logger module
//!
//! Provides logging utilities for the server:
//! - Startup line
//! - Access logging in Common or Combined Log Format
//! - Warning, error and fatal messages
//! - Optional file-based targets

mod format;
pub mod writer;

pub use format::AccessLogEntry;

use crate::config::LoggingConfig;
use std::net::SocketAddr;
use std::path::Path;

/// Initialize the logger with configuration
///
/// Should be called once at application startup.
pub fn init(config: &LoggingConfig) -> std::io::Result<()> {
    writer::init(
        config.access_log_file.as_deref(),
        config.error_log_file.as_deref(),
    )
}

/// Write to info/access log
fn write_info(message: &str) {
    match writer::get() {
        Some(writer) => writer.write_info(message),
        None => println!("{message}"),
    }
}

/// Write to error log
fn write_error(message: &str) {
    match writer::get() {
        Some(writer) => writer.write_error(message),
        None => eprintln!("{message}"),
    }
}

/// Announce the bound address, printed once the socket is listening
pub fn log_server_start(addr: &SocketAddr, root: &Path) {
    write_info(&format!(
        "Serving HTTP on {} port {} (http://{addr}/) from {}",
        addr.ip(),
        addr.port(),
        root.display()
    ));
}

pub fn log_shutdown() {
    write_info("Shutdown requested, no longer accepting connections");
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    write_error(&format!("[ERROR] Failed to serve connection: {err:?}"));
}

pub fn log_error(message: &str) {
    write_error(&format!("[ERROR] {message}"));
}

pub fn log_warning(message: &str) {
    write_error(&format!("[WARN] {message}"));
}

/// Report an error that stops the process
pub fn log_fatal(err: &impl std::fmt::Display) {
    write_error(&format!("[FATAL] {err}"));
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    let line = entry.format(format);
    match writer::get() {
        Some(writer) => writer.write_access(&line),
        None => println!("{line}"),
    }
}
