//! Error types
//!
//! `StartupError` covers everything that can stop the process before the
//! accept loop runs. `ServeError` covers per-request failures; every variant
//! maps to an HTTP status and is turned into a response by the handler.

use hyper::{Method, StatusCode};
use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Fatal errors raised while starting the server
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    Config(#[from] config::ConfigError),

    #[error("cannot resolve bind address '{host}': {source}")]
    Address {
        host: String,
        #[source]
        source: io::Error,
    },

    #[error("document root '{}' is not accessible: {source}", .path.display())]
    DocumentRoot {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("document root '{}' is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("failed to open log files: {0}")]
    Logging(#[source] io::Error),

    #[error("failed to build runtime: {0}")]
    Runtime(#[source] io::Error),
}

/// Recoverable errors raised while handling a single request
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("bad request path: {0}")]
    BadRequest(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("method {0} not allowed")]
    MethodNotAllowed(Method),

    #[error("I/O error on '{}': {source}", .path.display())]
    Internal {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ServeError {
    /// HTTP status reported to the client
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Classify an error from looking a path up (`stat`, `read_dir`)
    pub fn from_lookup(path: &Path, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound | io::ErrorKind::NotADirectory => {
                Self::NotFound(path.display().to_string())
            }
            io::ErrorKind::PermissionDenied => Self::Forbidden(path.display().to_string()),
            _ => Self::Internal {
                path: path.to_path_buf(),
                source: err,
            },
        }
    }

    /// Classify an error from reading a file that was already found.
    ///
    /// A file vanishing between lookup and read is an internal error, not a 404.
    pub fn from_read(path: &Path, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::PermissionDenied => Self::Forbidden(path.display().to_string()),
            _ => Self::Internal {
                path: path.to_path_buf(),
                source: err,
            },
        }
    }

    /// Whether the error points at a server-side problem worth logging
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }
}
