use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use schoolcal_core::{EventStore, FeedProjector, Settings};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Authoritative event list, loaded once at startup
    pub store: Arc<EventStore>,
    pub feed: Arc<FeedProjector>,
    pub index_file: PathBuf,
    pub public_dir: PathBuf,
}

impl AppState {
    pub fn new(settings: &Settings) -> Result<Self> {
        let store = EventStore::load(&settings.data_file, settings.tz()?)?;
        let feed = FeedProjector::new(&settings.calendar_name, &settings.timezone);

        Ok(AppState {
            store: Arc::new(store),
            feed: Arc::new(feed),
            index_file: settings.index_file.clone(),
            public_dir: settings.public_dir.clone(),
        })
    }
}
