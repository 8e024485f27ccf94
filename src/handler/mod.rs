//! Request handler module
//!
//! Translates one HTTP request into a filesystem lookup under the document
//! root and an HTTP response.

pub mod listing;
pub mod path;
pub mod router;
pub mod static_files;

// Re-export main entry points
pub use router::{handle_request, respond};
