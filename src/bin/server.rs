//! drover-server binary
//!
//! Serves the remote-object protocol over TCP, or over stdin/stdout when no
//! port is given. On TCP startup the announcement line is published to the
//! given file (atomically) or to stdout for launch tooling to pick up.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use drover_core::config::ServerConfig;
use drover_core::logging;
use drover_core::objects::ObjectFactory;
use drover_core::server::ConnectionListener;

#[derive(Parser, Debug)]
#[command(name = "drover-server")]
#[command(about = "Remote-object computation server")]
struct Args {
    /// TCP port to listen on (0 = OS-assigned); stdin/stdout mode when omitted
    port: Option<u16>,

    /// File to publish the announcement line to (stdout when omitted)
    outfile: Option<PathBuf>,

    /// Exit after serving exactly one client connection
    #[arg(long)]
    single_use: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_logging();
    let args = Args::parse();

    let factory = Arc::new(ObjectFactory::with_builtins());

    match args.port {
        None => {
            info!("Starting drover server on stdin/stdout");
            ConnectionListener::serve_stdio(factory).await?;
        }
        Some(port) => {
            let mut config = ServerConfig::from_env()?;
            config.port = port;
            config.single_use = config.single_use || args.single_use;
            if args.outfile.is_some() {
                config.announce_file = args.outfile;
            }

            info!(port, single_use = config.single_use, "Starting drover server");

            tokio::select! {
                result = ConnectionListener::serve_tcp(config, factory) => result?,
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received");
                }
            }
        }
    }

    info!("Server stopped");
    Ok(())
}
