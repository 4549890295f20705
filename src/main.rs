mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use mediabox::config::Config;
use mediabox::observability;
use mediabox::status::StatusStore;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    observability::init_tracing();

    let cli = Cli::parse();
    let mut config = Config::load_with_override(cli.config)?;

    match cli.command {
        Commands::Server(args) => {
            if let Some(address) = args.address {
                config.server.bind_addr = address;
            }
            mediabox::api::run(config).await?
        }
        Commands::Prune => {
            let store = StatusStore::open(config.server.status_dir())?;
            let stats = store.prune_expired(config.retention.status_ttl())?;
            info!(
                records = stats.records_pruned,
                orphans = stats.orphans_pruned,
                remaining = store.len(),
                "Prune complete"
            );
        }
    }

    Ok(())
}
