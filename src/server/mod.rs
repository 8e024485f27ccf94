// Server module entry point
// Binds the listening socket and runs the accept loop

pub mod connection;
pub mod listener;
pub mod signal;

// `loop` is a keyword, so the module is renamed
#[path = "loop.rs"]
pub mod server_loop;

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::config::{AppState, Config};
use crate::error::StartupError;
use crate::logger;

// Re-export commonly used types
pub use listener::create_listener;
pub use signal::{start_signal_handler, Shutdown};

/// A bound server, ready to run
pub struct Server {
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: Shutdown,
}

impl Server {
    /// Validate the document root and bind the listening socket
    ///
    /// Must be called from within a Tokio runtime.
    pub fn bind(config: Config) -> Result<Self, StartupError> {
        let addr = config.socket_addr()?;
        let state = AppState::new(config)?;
        let listener =
            create_listener(addr).map_err(|source| StartupError::Bind { addr, source })?;

        Ok(Self {
            listener,
            state: Arc::new(state),
            shutdown: Shutdown::new(),
        })
    }

    /// Address actually bound, useful when the configured port is 0
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Handle that stops `run`
    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Announce the address and accept connections until shutdown
    pub async fn run(self) {
        match self.listener.local_addr() {
            Ok(addr) => logger::log_server_start(&addr, self.state.document_root()),
            Err(e) => logger::log_error(&format!("Failed to read bound address: {e}")),
        }

        server_loop::run_accept_loop(
            self.listener,
            self.state,
            Arc::new(AtomicUsize::new(0)),
            self.shutdown,
        )
        .await;
    }
}
