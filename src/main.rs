use clap::Parser;
use std::process::ExitCode;

use localserve::cli::CliArgs;
use localserve::config::Config;
use localserve::error::StartupError;
use localserve::logger;
use localserve::server::{self, Server};

fn main() -> ExitCode {
    let args = CliArgs::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            logger::log_fatal(&e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &CliArgs) -> Result<(), StartupError> {
    let cfg = Config::load(args)?;
    logger::init(&cfg.logging).map_err(StartupError::Logging)?;

    // Build the Tokio runtime, sized by the workers setting
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers.filter(|&n| n > 0) {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build().map_err(StartupError::Runtime)?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: Config) -> Result<(), StartupError> {
    let server = Server::bind(cfg)?;
    server::start_signal_handler(server.shutdown_handle());
    server.run().await;
    Ok(())
}
