// Application state module
// Immutable state shared by the accept loop and every request

use std::path::{Path, PathBuf};

use super::types::Config;
use crate::error::StartupError;

/// Application state
///
/// Built once before binding and shared read-only through an `Arc`.
#[derive(Debug)]
pub struct AppState {
    pub config: Config,
    /// Canonical document root; every served path must stay below it
    document_root: PathBuf,
}

impl AppState {
    /// Resolve and validate the document root
    pub fn new(config: Config) -> Result<Self, StartupError> {
        let requested = match config.server.root.as_deref() {
            Some(root) => PathBuf::from(root),
            None => std::env::current_dir().map_err(|source| StartupError::DocumentRoot {
                path: PathBuf::from("."),
                source,
            })?,
        };

        let document_root =
            requested
                .canonicalize()
                .map_err(|source| StartupError::DocumentRoot {
                    path: requested.clone(),
                    source,
                })?;
        if !document_root.is_dir() {
            return Err(StartupError::NotADirectory(document_root));
        }

        Ok(Self {
            config,
            document_root,
        })
    }

    pub fn document_root(&self) -> &Path {
        &self.document_root
    }
}
