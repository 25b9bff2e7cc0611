//! CLI for Senkyou

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, info_span};

use senkyou::broker::{Broker, InMemoryBroker};
use senkyou::config::load_config;
use senkyou::transport::SenkyouServer;
use senkyou::utils::error::ServerError;
use senkyou::utils::logging;

#[derive(Parser)]
#[command(name = "senkyou", about = "Publish/subscribe over HTTP")]
struct Cli {
    /// Configuration file, layered over config/default
    #[arg(long, env = "SENKYOU_CONFIG")]
    config: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set (overrides log.level)
    #[arg(long, env = "SENKYOU_LOG_LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // logging may not be initialised yet if loading the config failed
    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), ServerError> {
    let settings = load_config(cli.config.as_deref())?;
    logging::init(cli.log_level.as_deref().unwrap_or(&settings.log.level));

    let broker = Arc::new(InMemoryBroker::from_settings(&settings.broker)?);
    let span = info_span!("http", addr = %settings.listen_addr());
    let server = SenkyouServer::new(settings, broker.clone() as Arc<dyn Broker>, span);

    tokio::select! {
        result = server.start() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
        }
    }

    if let Err(e) = broker.flush() {
        error!("failed to flush message store: {e}");
    }
    Ok(())
}
