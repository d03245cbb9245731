use std::path::PathBuf;
use std::sync::Arc;

use crate::app::error::{Result, TributaryError};
use crate::config::Config;
use crate::engine::Engine;
use crate::fetcher::{FeedSource, HttpFeedSource};
use crate::store::SqliteStore;

pub struct AppContext {
    pub store: Arc<SqliteStore>,
    pub source: Arc<dyn FeedSource + Send + Sync>,
    pub config: Config,
}

impl AppContext {
    pub fn new(db_path: Option<PathBuf>, config: Config) -> Result<Self> {
        let db_path = match db_path {
            Some(p) => p,
            None => Self::default_db_path()?,
        };

        let store = Arc::new(SqliteStore::new(&db_path)?);
        Self::with_store(store, config)
    }

    pub fn in_memory(config: Config) -> Result<Self> {
        let store = Arc::new(SqliteStore::in_memory()?);
        Self::with_store(store, config)
    }

    fn with_store(store: Arc<SqliteStore>, config: Config) -> Result<Self> {
        let source: Arc<dyn FeedSource + Send + Sync> = Arc::new(HttpFeedSource::new(
            &config.http.user_agent,
            config.engine.fetch_timeout(),
        )?);

        Ok(Self {
            store,
            source,
            config,
        })
    }

    /// A stopped engine over this context's store and source.
    pub fn engine(&self) -> Result<Engine> {
        Engine::new(
            self.config.engine.clone(),
            self.store.clone(),
            self.store.clone(),
            self.source.clone(),
        )
    }

    fn default_db_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| TributaryError::Config("Could not find data directory".into()))?;
        let tributary_dir = data_dir.join("tributary");
        std::fs::create_dir_all(&tributary_dir)?;
        Ok(tributary_dir.join("tributary.db"))
    }
}
