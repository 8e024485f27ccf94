//! Static file serving module
//!
//! Maps a normalised request path onto the document root and builds the
//! file, index, listing or redirect response.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::config::AppState;
use crate::error::ServeError;
use crate::handler::listing;
use crate::handler::path::RequestPath;
use crate::handler::router::RequestContext;
use crate::http::{self, date, mime};
use crate::logger;

/// Serve the target of a GET/HEAD request
pub async fn serve(
    ctx: &RequestContext<'_>,
    state: &AppState,
) -> Result<Response<Full<Bytes>>, ServeError> {
    let request_path = RequestPath::parse(ctx.path)?;
    let root = state.document_root();
    let target = request_path.resolve(root);

    let metadata = fs::metadata(&target)
        .await
        .map_err(|e| ServeError::from_lookup(&target, e))?;
    ensure_within_root(&target, root, ctx.path).await?;

    if metadata.is_dir() {
        return serve_directory(ctx, state, &request_path, &target).await;
    }

    // A trailing slash names a directory; a file never matches it
    if request_path.has_trailing_slash() {
        return Err(ServeError::NotFound(target.display().to_string()));
    }
    if !metadata.is_file() {
        return Err(ServeError::Forbidden(format!(
            "not a regular file: {}",
            target.display()
        )));
    }

    serve_file(ctx, &target, &metadata).await
}

/// Serve a directory: redirect, index file, or generated listing
async fn serve_directory(
    ctx: &RequestContext<'_>,
    state: &AppState,
    request_path: &RequestPath,
    dir: &Path,
) -> Result<Response<Full<Bytes>>, ServeError> {
    if !ctx.path.ends_with('/') {
        return Ok(http::build_redirect_response(&redirect_location(ctx)));
    }

    let index_files = &state.config.http.index_files;
    if let Some((index_path, metadata)) = find_index_file(dir, index_files).await {
        ensure_within_root(&index_path, state.document_root(), ctx.path).await?;
        return serve_file(ctx, &index_path, &metadata).await;
    }

    if !state.config.http.directory_listing {
        return Err(ServeError::Forbidden(format!(
            "directory listing disabled: {}",
            dir.display()
        )));
    }

    let entries = listing::read_entries(dir).await?;
    let html = listing::render(&request_path.directory_display(), entries);
    Ok(http::build_html_response(html, ctx.is_head))
}

/// `Location` for a directory requested without its trailing slash
///
/// Leading slashes are collapsed to one: `//host/` would be read by a
/// browser as a network-path reference to another host.
fn redirect_location(ctx: &RequestContext<'_>) -> String {
    let path = ctx.path.trim_start_matches('/');
    match ctx.query {
        Some(query) => format!("/{path}/?{query}"),
        None => format!("/{path}/"),
    }
}

/// First configured index file that exists as a regular file
async fn find_index_file(dir: &Path, index_files: &[String]) -> Option<(PathBuf, Metadata)> {
    for index_file in index_files {
        let candidate = dir.join(index_file);
        if let Ok(metadata) = fs::metadata(&candidate).await {
            if metadata.is_file() {
                return Some((candidate, metadata));
            }
        }
    }
    None
}

/// Serve a regular file with content type, length and `Last-Modified`
async fn serve_file(
    ctx: &RequestContext<'_>,
    file_path: &Path,
    metadata: &Metadata,
) -> Result<Response<Full<Bytes>>, ServeError> {
    let last_modified = metadata.modified().ok();
    let last_modified_header = last_modified.map(date::format_http_date);

    // If-None-Match takes precedence; without ETags it can never match
    if ctx.if_none_match.is_none() {
        if let (Some(modified), Some(header)) = (last_modified, &last_modified_header) {
            if date::is_not_modified(ctx.if_modified_since, modified) {
                return Ok(http::build_304_response(header));
            }
        }
    }

    let (body, content_length) = if ctx.is_head {
        // Open anyway so HEAD reports the same 403 a GET would
        fs::File::open(file_path)
            .await
            .map_err(|e| ServeError::from_read(file_path, e))?;
        (Bytes::new(), metadata.len())
    } else {
        let content = fs::read(file_path)
            .await
            .map_err(|e| ServeError::from_read(file_path, e))?;
        let length = content.len() as u64;
        (Bytes::from(content), length)
    };

    Ok(http::build_file_response(
        body,
        content_length,
        mime::content_type_for(file_path),
        last_modified_header.as_deref(),
    ))
}

/// Security: the canonical target must be inside the canonical document root.
/// Catches symlinks that point out of the tree.
async fn ensure_within_root(target: &Path, root: &Path, raw_path: &str) -> Result<(), ServeError> {
    let canonical = fs::canonicalize(target)
        .await
        .map_err(|e| ServeError::from_lookup(target, e))?;
    if canonical.starts_with(root) {
        return Ok(());
    }

    logger::log_warning(&format!(
        "Path traversal attempt blocked: {} -> {}",
        raw_path,
        canonical.display()
    ));
    Err(ServeError::Forbidden(canonical.display().to_string()))
}
