// Server loop module
// Accepts connections until shutdown is requested

use std::io;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use super::connection::accept_connection;
use super::signal::Shutdown;
use crate::config::AppState;
use crate::logger;

/// Pause after a failed `accept`, so a persistent error (EMFILE) does not spin
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Accept connections and hand each one to its own task
///
/// Returns when `shutdown` is triggered; the listener is dropped (closed)
/// with it. Accept errors, such as running out of file descriptors, are
/// logged and the loop keeps going after a short pause.
#[allow(clippy::ignored_unit_patterns)]
pub async fn run_accept_loop(
    listener: TcpListener,
    state: Arc<AppState>,
    active_connections: Arc<AtomicUsize>,
    shutdown: Shutdown,
) {
    loop {
        tokio::select! {
            _ = shutdown.wait() => {
                logger::log_shutdown();
                break;
            }

            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state, &active_connections);
                    }
                    Err(e) => accept_failed(&e).await,
                }
            }
        }
    }

    drop(listener);
}

async fn accept_failed(err: &io::Error) {
    logger::log_error(&format!("Failed to accept connection: {err}"));
    tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
}
