use std::path::Path;
use std::sync::Arc;
use std::time::{Instant, SystemTime};

use crate::config::Config;
use crate::services::sessions::SessionStore;

#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    started_at_system: SystemTime,
    config: Arc<Config>,
    sessions: Arc<SessionStore>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            started_at: Instant::now(),
            started_at_system: SystemTime::now(),
            config: Arc::new(config),
            sessions: Arc::new(SessionStore::new()),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn started_at_system(&self) -> SystemTime {
        self.started_at_system
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    pub fn sessions(&self) -> Arc<SessionStore> {
        Arc::clone(&self.sessions)
    }
}
