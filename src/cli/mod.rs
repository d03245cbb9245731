pub mod commands;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use crate::config::parse_interval;

#[derive(Parser)]
#[command(name = "tributary")]
#[command(about = "Keeps a local store of feed items fresh", long_about = None)]
pub struct Cli {
    /// Path to the SQLite database (default: <data dir>/tributary/tributary.db)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Path to the config file (default: <config dir>/tributary/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a new feed
    Add {
        /// URL of the feed to add
        url: String,
        /// Display name (defaults to the URL)
        #[arg(long)]
        name: Option<String>,
        /// Site the feed belongs to
        #[arg(long)]
        homepage: Option<String>,
        /// Refresh interval (e.g., "30m", "1h", "1d")
        #[arg(short, long, value_parser = parse_interval)]
        interval: Option<Duration>,
    },
    /// Remove a feed and its items
    Remove {
        /// URL of the feed to remove
        url: String,
    },
    /// List feeds or items
    List {
        /// Show items instead of feeds
        #[arg(long)]
        items: bool,
        /// Number of items to show
        #[arg(long, default_value_t = 20)]
        limit: usize,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Stop refreshing a feed
    Pause {
        url: String,
    },
    /// Start refreshing a paused feed again
    Resume {
        url: String,
    },
    /// Change how often a feed is refreshed
    SetInterval {
        url: String,
        /// New interval (e.g., "30m", "1h", "1d")
        #[arg(value_parser = parse_interval)]
        interval: Duration,
    },
    /// Run the refresh engine until interrupted
    Run {
        /// How often to look for due feeds (overrides the config file)
        #[arg(long, value_parser = parse_interval)]
        poll: Option<Duration>,
        /// Number of concurrent fetchers (overrides the config file)
        #[arg(short, long)]
        workers: Option<usize>,
    },
}
