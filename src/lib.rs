//! localserve
//!
//! A small static-file HTTP server for previewing a local directory in a
//! browser. Files are served read-only from a single document root; request
//! paths can never resolve outside of it.

pub mod cli;
pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod logger;
pub mod server;

#[cfg(test)]
mod test_support;
