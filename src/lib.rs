//! # Tributary
//!
//! A feed-refresh engine: keeps a local SQLite store of RSS/Atom items
//! current by re-fetching each feed on its own interval.
//!
//! ## Architecture
//!
//! ```text
//! FeedStore → Scheduler → FetchWorker × N → Normalizer → IngestWorker → ItemStore
//! ```
//!
//! - [`engine`]: scheduler, worker pools, queues and lifecycle
//! - [`fetcher`]: HTTP download and feed parsing behind the `FeedSource` trait
//! - [`normalizer`]: turns raw entries into candidate items
//! - [`store`]: SQLite persistence for feeds and items
//!
//! ## Quick Start
//!
//! ```bash
//! # Add a feed, refreshed hourly
//! tributary add https://blog.rust-lang.org/feed.xml --interval 1h
//!
//! # Run the engine until Ctrl-C
//! tributary run
//!
//! # Show the newest items
//! tributary list --items --limit 10
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together the store,
/// the HTTP feed source and the loaded configuration.
pub mod app;

/// Command-line interface using clap.
///
/// - `add <url>` - Register a feed
/// - `remove <url>` - Remove a feed and its items
/// - `list [--items]` - List feeds or recent items
/// - `pause` / `resume` / `set-interval` - Per-feed scheduling
/// - `run` - Run the engine until interrupted
pub mod cli;

/// Configuration file handling.
///
/// Loads from `~/.config/tributary/config.toml`, creating a commented
/// default when missing.
pub mod config;

/// Core domain models.
///
/// - [`Feed`](domain::Feed): a subscription and its refresh schedule
/// - [`RawEntry`](domain::RawEntry): an entry as the parser saw it
/// - [`CandidateItem`](domain::CandidateItem) / [`Item`](domain::Item): normalized and stored entries
pub mod domain;

/// The refresh engine.
///
/// - [`Engine`](engine::Engine): start / stop / join / shutdown
/// - [`Scheduler`](engine::Scheduler): dispatches due feeds every poll period
/// - [`FetchWorker`](engine::FetchWorker) and [`IngestWorker`](engine::IngestWorker)
pub mod engine;

/// Feed download and parsing.
///
/// - [`FeedSource`](fetcher::FeedSource): async trait for fetching one feed
/// - [`HttpFeedSource`](fetcher::HttpFeedSource): reqwest + feed-rs implementation
pub mod fetcher;

/// Entry normalization: body and timestamp fallback chains.
pub mod normalizer;

/// SQLite persistence layer.
///
/// - [`FeedStore`](store::FeedStore) / [`FeedCatalog`](store::FeedCatalog): feeds
/// - [`ItemStore`](store::ItemStore): items, unique by URL
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation of all three
pub mod store;
