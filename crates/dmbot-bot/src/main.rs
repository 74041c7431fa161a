//! dmbot entry point

use anyhow::{Context, Result};
use clap::Parser;
use dmbot_bot::cli::{self, Args};
use dmbot_bot::{ConsoleTransport, Poller, PollerSettings};
use dmbot_commands::{
    spawn_housekeeping, DataProvider, HttpDataProvider, MemoryStore, OfflineProvider, Responder,
    SledStore,
};
use dmbot_common::{init_logging, UserId};
use dmbot_config::{Config, ConfigLoader};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Identity of the local console user
const CONSOLE_USER: UserId = UserId(1);

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ConfigLoader::load_from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => ConfigLoader::load().context("Failed to load configuration")?,
    };
    args.apply(&mut config);

    init_logging(cli::logging_config(&config)).context("Failed to initialize logging")?;
    println!("{}", cli::banner(&config));
    info!("Starting {}", config.bot.name);

    let provider = build_provider(&config)?;

    let sled = if config.database.ephemeral {
        None
    } else {
        Some(Arc::new(
            SledStore::open(&config.database.path).context("Failed to open the database")?,
        ))
    };
    let responder = Arc::new(match &sled {
        Some(store) => Responder::new(&config, store.clone(), provider),
        None => {
            info!("Running with an in-memory store; state is lost on exit");
            Responder::new(&config, Arc::new(MemoryStore::new()), provider)
        }
    });

    let housekeeping = spawn_housekeeping(
        responder.clone(),
        Duration::from_secs(config.bot.housekeeping_interval_secs),
    );

    let transport = Arc::new(ConsoleTransport::stdio(CONSOLE_USER, "konsol"));
    let mut poller = Poller::new(
        transport,
        responder,
        PollerSettings::from_config(&config.bot),
    );
    let outcome = poller.run(shutdown_signal()).await;

    housekeeping.abort();
    if let Some(store) = &sled {
        if let Err(e) = store.flush().await {
            error!("Failed to flush database on shutdown: {}", e);
        }
    }

    outcome.context("Poll loop failed")?;
    info!("dmbot stopped");
    Ok(())
}

fn build_provider(config: &Config) -> Result<Arc<dyn DataProvider>> {
    if config.providers.offline {
        info!("External providers disabled; using simulated data");
        return Ok(Arc::new(OfflineProvider));
    }
    let provider =
        HttpDataProvider::new(&config.providers).context("Failed to build HTTP data provider")?;
    Ok(Arc::new(provider))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {:?}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}
