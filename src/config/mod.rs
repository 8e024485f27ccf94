// Configuration module entry point
// Builds the immutable process-wide configuration and the shared app state

mod state;
mod types;

use std::io;
use std::net::{IpAddr, SocketAddr, ToSocketAddrs};

use crate::cli::CliArgs;
use crate::error::StartupError;

// Re-export public types
pub use state::AppState;
pub use types::{Config, HttpConfig, LoggingConfig, PerformanceConfig, ServerConfig};

/// Prefix of environment variables, e.g. `LOCALSERVE_SERVER__PORT=9000`
pub const ENV_PREFIX: &str = "LOCALSERVE";

impl Config {
    /// Load configuration from defaults, `LOCALSERVE_*` variables and CLI flags
    ///
    /// Later sources win: a flag given on the command line overrides the
    /// environment, which overrides the defaults.
    pub fn load(args: &CliArgs) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8000)?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "common")?
            .set_default("performance.keep_alive", true)?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default(
                "http.server_name",
                format!("localserve/{}", env!("CARGO_PKG_VERSION")),
            )?
            .set_default("http.directory_listing", true)?
            .set_override_option("server.port", args.port.map(i64::from))?
            .set_override_option("server.host", args.bind.clone())?
            .set_override_option(
                "server.root",
                args.directory.as_ref().map(|p| p.display().to_string()),
            )?
            .build()?;

        settings.try_deserialize()
    }

    /// Socket address the server listens on
    ///
    /// IP literals are used as given; anything else is resolved and the first
    /// address returned by the resolver wins.
    pub fn socket_addr(&self) -> Result<SocketAddr, StartupError> {
        let host = self.server.host.trim_start_matches('[').trim_end_matches(']');
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(SocketAddr::new(ip, self.server.port));
        }

        let address_error = |source: io::Error| StartupError::Address {
            host: self.server.host.clone(),
            source,
        };
        (host, self.server.port)
            .to_socket_addrs()
            .map_err(address_error)?
            .next()
            .ok_or_else(|| {
                address_error(io::Error::new(
                    io::ErrorKind::NotFound,
                    "no addresses returned",
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_defaults() {
        let cfg = Config::load(&CliArgs::default()).unwrap();
        assert_eq!(cfg.server.port, 8000);
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert!(cfg.server.root.is_none());
        assert_eq!(cfg.http.index_files, vec!["index.html", "index.htm"]);
        assert!(cfg.http.directory_listing);
        assert!(cfg.http.server_name.starts_with("localserve/"));
        assert_eq!(cfg.logging.access_log_format, "common");
        assert!(cfg.performance.keep_alive);
    }

    #[test]
    fn test_cli_overrides() {
        let args = CliArgs {
            port: Some(9123),
            bind: Some("127.0.0.1".to_string()),
            directory: Some(PathBuf::from("/srv/site")),
        };
        let cfg = Config::load(&args).unwrap();
        assert_eq!(cfg.server.port, 9123);
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(cfg.server.root.as_deref(), Some("/srv/site"));
    }

    #[test]
    fn test_socket_addr() {
        let mut cfg = Config::load(&CliArgs::default()).unwrap();
        assert_eq!(cfg.socket_addr().unwrap(), "0.0.0.0:8000".parse().unwrap());

        cfg.server.host = "::1".to_string();
        assert_eq!(cfg.socket_addr().unwrap(), "[::1]:8000".parse().unwrap());

        cfg.server.host = "[::]".to_string();
        assert_eq!(cfg.socket_addr().unwrap(), "[::]:8000".parse().unwrap());

        cfg.server.host = "localhost".to_string();
        let addr = cfg.socket_addr().unwrap();
        assert!(addr.ip().is_loopback());
        assert_eq!(addr.port(), 8000);

        cfg.server.host = "not an address".to_string();
        assert!(matches!(
            cfg.socket_addr(),
            Err(StartupError::Address { .. })
        ));
    }
}
