//! Request path normalisation
//!
//! Turns a raw URI path into a list of plain segments relative to the
//! document root. Resolution happens purely on the segment list, so a path
//! that climbs above the root is rejected before the filesystem is touched.

use std::path::{Path, PathBuf};

use crate::error::ServeError;

/// A decoded request path, guaranteed to stay inside the document root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestPath {
    segments: Vec<String>,
    trailing_slash: bool,
}

impl RequestPath {
    /// Decode and normalise a raw URI path (without query string)
    pub fn parse(raw: &str) -> Result<Self, ServeError> {
        if !raw.starts_with('/') {
            return Err(ServeError::BadRequest(format!("not an origin path: {raw}")));
        }

        let decoded = urlencoding::decode(raw)
            .map_err(|_| ServeError::BadRequest(format!("path is not valid UTF-8: {raw}")))?;
        if decoded.contains('\0') || decoded.contains('\\') {
            return Err(ServeError::BadRequest(format!(
                "path contains forbidden characters: {raw}"
            )));
        }

        let mut segments: Vec<String> = Vec::new();
        for segment in decoded.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    if segments.pop().is_none() {
                        return Err(ServeError::Forbidden(format!(
                            "path escapes document root: {raw}"
                        )));
                    }
                }
                name => segments.push(name.to_string()),
            }
        }

        Ok(Self {
            segments,
            trailing_slash: decoded.len() > 1 && decoded.ends_with('/'),
        })
    }

    /// Join the segments onto the document root
    pub fn resolve(&self, root: &Path) -> PathBuf {
        let mut path = root.to_path_buf();
        path.extend(&self.segments);
        path
    }

    pub fn has_trailing_slash(&self) -> bool {
        self.trailing_slash
    }

    /// Normalised URL path of a directory, always ending in `/`
    pub fn directory_display(&self) -> String {
        let mut display = String::from("/");
        for segment in &self.segments {
            display.push_str(segment);
            display.push('/');
        }
        display
    }
}
