//! Command-line interface
//!
//! Every flag is optional; anything left out falls back to the environment
//! and then to the built-in defaults (see `Config::load`).

use clap::Parser;
use std::path::PathBuf;

/// Serve a directory over HTTP for local previews
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "localserve", version, about)]
pub struct CliArgs {
    /// Port to listen on [default: 8000]
    #[arg(value_name = "PORT")]
    pub port: Option<u16>,

    /// Address to bind [default: all interfaces]
    #[arg(short, long, value_name = "ADDRESS")]
    pub bind: Option<String>,

    /// Directory to serve [default: current directory]
    #[arg(short, long, visible_alias = "root", value_name = "DIR")]
    pub directory: Option<PathBuf>,
}
