use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tributary::app::AppContext;
use tributary::cli::{commands, Cli, Commands};
use tributary::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    // RUST_LOG wins over the config file
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.level));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    if let Commands::Run { poll, workers } = &cli.command {
        if let Some(poll) = poll {
            config.engine.poll_interval_ms = poll.as_millis() as u64;
        }
        if let Some(workers) = workers {
            config.engine.worker_count = *workers;
        }
    }

    let ctx = AppContext::new(cli.db, config)?;

    match cli.command {
        Commands::Add {
            url,
            name,
            homepage,
            interval,
        } => {
            commands::add_feed(&ctx, &url, name, homepage, interval)?;
        }
        Commands::Remove { url } => {
            commands::remove_feed(&ctx, &url)?;
        }
        Commands::List { items, limit, json } => {
            if items {
                commands::list_items(&ctx, limit, json)?;
            } else {
                commands::list_feeds(&ctx, json)?;
            }
        }
        Commands::Pause { url } => {
            commands::set_active(&ctx, &url, false)?;
        }
        Commands::Resume { url } => {
            commands::set_active(&ctx, &url, true)?;
        }
        Commands::SetInterval { url, interval } => {
            commands::set_interval(&ctx, &url, interval)?;
        }
        Commands::Run { .. } => {
            commands::run(&ctx).await?;
        }
    }

    Ok(())
}
