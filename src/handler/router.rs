//! Request dispatch module
//!
//! Entry point for HTTP request processing: method validation, dispatch to
//! the static file handler, error conversion and access logging.

use http_body_util::Full;
use hyper::body::{Body as _, Bytes};
use hyper::header::{
    HeaderName, HeaderValue, IF_MODIFIED_SINCE, IF_NONE_MATCH, REFERER, SERVER, USER_AGENT,
};
use hyper::{Method, Request, Response};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use crate::config::AppState;
use crate::error::ServeError;
use crate::handler::static_files;
use crate::http;
use crate::logger::{self, AccessLogEntry};

/// Request context encapsulating information needed for request processing
pub struct RequestContext<'a> {
    /// Raw URI path, still percent-encoded
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub is_head: bool,
    pub if_modified_since: Option<&'a str>,
    pub if_none_match: Option<&'a str>,
}

impl<'a> RequestContext<'a> {
    pub fn from_request<B>(req: &'a Request<B>) -> Self {
        Self {
            path: req.uri().path(),
            query: req.uri().query(),
            is_head: req.method() == Method::HEAD,
            if_modified_since: header_str(req, &IF_MODIFIED_SINCE),
            if_none_match: header_str(req, &IF_NONE_MATCH),
        }
    }
}

/// Main entry point for HTTP request handling, used as the hyper service
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let started = Instant::now();
    // GET and HEAD carry no body worth reading; hyper discards whatever was sent
    let (parts, _body) = req.into_parts();
    let req = Request::from_parts(parts, ());
    let response = respond(&req, &state).await;

    if state.config.logging.access_log {
        logger::log_access(
            &access_entry(&req, &response, peer_addr, started),
            &state.config.logging.access_log_format,
        );
    }
    Ok(response)
}

/// Build the response for one request; never fails
///
/// Every `ServeError` is converted to its status response here, so nothing
/// propagates to the connection or the accept loop.
pub async fn respond<B>(req: &Request<B>, state: &AppState) -> Response<Full<Bytes>> {
    let result = match check_http_method(req.method()) {
        Ok(()) => static_files::serve(&RequestContext::from_request(req), state).await,
        Err(e) => Err(e),
    };

    let mut response = result.unwrap_or_else(|err| {
        if err.is_internal() {
            logger::log_error(&err.to_string());
        }
        http::build_error_response(&err)
    });

    if let Ok(server_name) = HeaderValue::from_str(&state.config.http.server_name) {
        response.headers_mut().insert(SERVER, server_name);
    }
    response
}

/// Only GET and HEAD are served
fn check_http_method(method: &Method) -> Result<(), ServeError> {
    match *method {
        Method::GET | Method::HEAD => Ok(()),
        _ => {
            logger::log_warning(&format!("Method not allowed: {method}"));
            Err(ServeError::MethodNotAllowed(method.clone()))
        }
    }
}

fn header_str<'a, B>(req: &'a Request<B>, name: &HeaderName) -> Option<&'a str> {
    req.headers().get(name).and_then(|v| v.to_str().ok())
}

fn access_entry<B>(
    req: &Request<B>,
    response: &Response<Full<Bytes>>,
    peer_addr: SocketAddr,
    started: Instant,
) -> AccessLogEntry {
    let mut entry = AccessLogEntry::new(
        peer_addr.ip().to_string(),
        req.method().to_string(),
        req.uri().path().to_string(),
    );
    entry.query = req.uri().query().map(ToString::to_string);
    entry.http_version = format!("{:?}", req.version())
        .trim_start_matches("HTTP/")
        .to_string();
    entry.status = response.status().as_u16();
    entry.body_bytes = if req.method() == Method::HEAD {
        0
    } else {
        response.body().size_hint().exact().unwrap_or(0)
    };
    entry.referer = header_str(req, &REFERER).map(ToString::to_string);
    entry.user_agent = header_str(req, &USER_AGENT).map(ToString::to_string);
    entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
    entry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fixture_state, TestDir};
    use http_body_util::BodyExt;
    use hyper::header::{ALLOW, CONTENT_LENGTH, CONTENT_TYPE, LAST_MODIFIED, LOCATION};
    use hyper::StatusCode;
    use std::fs;

    fn request(method: Method, uri: &str) -> Request<()> {
        Request::builder().method(method).uri(uri).body(()).unwrap()
    }

    async fn get(state: &AppState, uri: &str) -> Response<Full<Bytes>> {
        respond(&request(Method::GET, uri), state).await
    }

    async fn body_of(response: Response<Full<Bytes>>) -> Bytes {
        response.into_body().collect().await.unwrap().to_bytes()
    }

    #[tokio::test]
    async fn test_serves_file() {
        let dir = TestDir::with_site("serves_file");
        let state = fixture_state(&dir);

        let response = get(&state, "/index.html").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "text/html; charset=utf-8");
        assert_eq!(response.headers()[CONTENT_LENGTH], "5");
        assert!(response.headers().contains_key(LAST_MODIFIED));
        assert!(response.headers()[SERVER]
            .to_str()
            .unwrap()
            .starts_with("localserve/"));
        assert_eq!(body_of(response).await, "hello");
    }

    #[tokio::test]
    async fn test_serves_binary_exactly() {
        let dir = TestDir::with_site("serves_binary");
        let state = fixture_state(&dir);

        let response = get(&state, "/img/logo.png").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "image/png");
        assert_eq!(body_of(response).await.as_ref(), crate::test_support::LOGO_PNG);
    }

    #[tokio::test]
    async fn test_head_matches_get() {
        let dir = TestDir::with_site("head_matches_get");
        let state = fixture_state(&dir);

        let get_response = get(&state, "/img/logo.png").await;
        let head_response = respond(&request(Method::HEAD, "/img/logo.png"), &state).await;
        assert_eq!(head_response.status(), get_response.status());
        assert_eq!(head_response.headers(), get_response.headers());
        assert!(body_of(head_response).await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_file() {
        let dir = TestDir::with_site("missing_file");
        let state = fixture_state(&dir);

        let response = get(&state, "/missing.html").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_of(response).await, "404 Not Found");

        // Path component below a regular file
        let response = get(&state, "/index.html/child").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        // File addressed as a directory
        let response = get(&state, "/index.html/").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_traversal_never_reads_outside() {
        let dir = TestDir::with_site("traversal");
        dir.write_outside("secret.txt", b"top secret");
        let state = fixture_state(&dir);

        for uri in ["/../secret.txt", "/img/../../secret.txt", "/%2e%2e/secret.txt"] {
            let response = get(&state, uri).await;
            let status = response.status();
            assert!(
                status == StatusCode::FORBIDDEN || status == StatusCode::BAD_REQUEST,
                "{uri} answered {status}"
            );
            assert_ne!(body_of(response).await, "top secret");
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_escape_forbidden() {
        let dir = TestDir::with_site("symlink_escape");
        let outside = dir.write_outside("secret.txt", b"top secret");
        std::os::unix::fs::symlink(&outside, dir.root().join("leak.txt")).unwrap();
        let state = fixture_state(&dir);

        let response = get(&state, "/leak.txt").await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_directory_index() {
        let dir = TestDir::with_site("directory_index");
        let state = fixture_state(&dir);

        let response = get(&state, "/").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_of(response).await, "hello");

        dir.write("docs/index.htm", b"docs home");
        let response = get(&state, "/docs/").await;
        assert_eq!(body_of(response).await, "docs home");
    }

    #[tokio::test]
    async fn test_directory_redirect() {
        let dir = TestDir::with_site("directory_redirect");
        let state = fixture_state(&dir);

        let response = get(&state, "/img").await;
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.headers()[LOCATION], "/img/");

        let response = get(&state, "/img?v=2").await;
        assert_eq!(response.headers()[LOCATION], "/img/?v=2");
    }

    #[tokio::test]
    async fn test_directory_redirect_stays_on_host() {
        let dir = TestDir::with_site("redirect_same_host");
        fs::create_dir_all(dir.root().join("evil.example")).unwrap();
        let state = fixture_state(&dir);

        let response = get(&state, "//evil.example").await;
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.headers()[LOCATION], "/evil.example/");

        let response = get(&state, "///evil.example?q=1").await;
        assert_eq!(response.headers()[LOCATION], "/evil.example/?q=1");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_socket_file_forbidden() {
        let dir = TestDir::with_site("socket_file");
        let _listener = std::os::unix::net::UnixListener::bind(dir.root().join("sock")).unwrap();
        let state = fixture_state(&dir);

        let response = get(&state, "/sock").await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_directory_listing() {
        let dir = TestDir::with_site("directory_listing");
        dir.write("img/banner.jpg", b"jpg");
        dir.write("img/icons/star.svg", b"<svg/>");
        let state = fixture_state(&dir);

        let response = get(&state, "/img/").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "text/html; charset=utf-8");
        let html = String::from_utf8(body_of(response).await.to_vec()).unwrap();
        assert!(html.contains("Directory listing for /img/"));
        let banner = html.find("banner.jpg").unwrap();
        let icons = html.find("icons/").unwrap();
        let logo = html.find("logo.png").unwrap();
        assert!(banner < icons && icons < logo);
    }

    #[tokio::test]
    async fn test_directory_listing_disabled() {
        let dir = TestDir::with_site("listing_disabled");
        let mut state = fixture_state(&dir);
        state.config.http.directory_listing = false;

        let response = get(&state, "/img/").await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_method_not_allowed() {
        let dir = TestDir::with_site("method_not_allowed");
        let state = fixture_state(&dir);

        for method in [Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS] {
            let response = respond(&request(method, "/index.html"), &state).await;
            assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
            assert_eq!(response.headers()[ALLOW], "GET, HEAD");
        }
    }

    #[tokio::test]
    async fn test_if_modified_since() {
        let dir = TestDir::with_site("if_modified_since");
        let state = fixture_state(&dir);

        let first = get(&state, "/index.html").await;
        let last_modified = first.headers()[LAST_MODIFIED].clone();

        let conditional = Request::builder()
            .uri("/index.html")
            .header(IF_MODIFIED_SINCE, last_modified.clone())
            .body(())
            .unwrap();
        let response = respond(&conditional, &state).await;
        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
        assert!(body_of(response).await.is_empty());

        let stale = Request::builder()
            .uri("/index.html")
            .header(IF_MODIFIED_SINCE, "Sun, 06 Nov 1994 08:49:37 GMT")
            .body(())
            .unwrap();
        assert_eq!(respond(&stale, &state).await.status(), StatusCode::OK);

        // If-None-Match disables the date check
        let with_etag = Request::builder()
            .uri("/index.html")
            .header(IF_MODIFIED_SINCE, last_modified)
            .header(IF_NONE_MATCH, "\"abc\"")
            .body(())
            .unwrap();
        assert_eq!(respond(&with_etag, &state).await.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_percent_encoded_name() {
        let dir = TestDir::with_site("percent_encoded");
        dir.write("my page.txt", b"spaced");
        let state = fixture_state(&dir);

        let response = get(&state, "/my%20page.txt").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "text/plain; charset=utf-8");
        assert_eq!(body_of(response).await, "spaced");
    }

    #[tokio::test]
    async fn test_access_entry() {
        let dir = TestDir::with_site("access_entry");
        let state = fixture_state(&dir);
        let req = Request::builder()
            .uri("/index.html?x=1")
            .header(USER_AGENT, "curl/8.0")
            .body(())
            .unwrap();
        let response = respond(&req, &state).await;
        let peer = "127.0.0.1:5000".parse().unwrap();
        let entry = access_entry(&req, &response, peer, Instant::now());

        assert_eq!(entry.remote_addr, "127.0.0.1");
        assert_eq!(entry.path, "/index.html");
        assert_eq!(entry.query.as_deref(), Some("x=1"));
        assert_eq!(entry.http_version, "1.1");
        assert_eq!(entry.status, 200);
        assert_eq!(entry.body_bytes, 5);
        assert_eq!(entry.user_agent.as_deref(), Some("curl/8.0"));
    }
}
