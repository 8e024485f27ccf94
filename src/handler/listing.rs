//! Directory listing
//!
//! Renders a minimal HTML index for directories without an index file.
//! Entries are sorted so the output is stable for a given directory.

use std::fmt::Write as _;
use std::path::Path;
use tokio::fs;

use crate::error::ServeError;

/// One entry of a directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub name: String,
    pub is_dir: bool,
    pub is_symlink: bool,
}

/// Read the entries of a directory
pub async fn read_entries(dir: &Path) -> Result<Vec<ListingEntry>, ServeError> {
    let mut reader = fs::read_dir(dir)
        .await
        .map_err(|e| ServeError::from_lookup(dir, e))?;

    let mut entries = Vec::new();
    while let Some(entry) = reader
        .next_entry()
        .await
        .map_err(|e| ServeError::from_read(dir, e))?
    {
        let is_symlink = entry
            .file_type()
            .await
            .is_ok_and(|file_type| file_type.is_symlink());
        // Follows symlinks, so a link to a directory is listed as one
        let is_dir = fs::metadata(entry.path())
            .await
            .is_ok_and(|metadata| metadata.is_dir());

        entries.push(ListingEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            is_dir,
            is_symlink,
        });
    }
    Ok(entries)
}

/// Render the listing page for `display_path`, e.g. `/img/`
pub fn render(display_path: &str, mut entries: Vec<ListingEntry>) -> String {
    entries.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name))
    });

    let title = format!("Directory listing for {}", escape_html(display_path));
    let mut html = String::new();
    html.push_str("<!DOCTYPE HTML>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(html, "<title>{title}</title>\n</head>\n<body>");
    let _ = writeln!(html, "<h1>{title}</h1>\n<hr>\n<ul>");

    for entry in &entries {
        let mut href = urlencoding::encode(&entry.name).into_owned();
        let mut label = escape_html(&entry.name);
        if entry.is_dir {
            href.push('/');
            label.push('/');
        }
        if entry.is_symlink {
            label.push('@');
        }
        let _ = writeln!(html, "<li><a href=\"{href}\">{label}</a></li>");
    }

    html.push_str("</ul>\n<hr>\n</body>\n</html>\n");
    html
}

/// Escape text for use in HTML content and attributes
fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
