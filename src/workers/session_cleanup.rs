use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::services::sessions::SessionStore;

#[derive(Debug, Default)]
pub struct CleanupStats {
    pub evicted_sessions: usize,
    pub remaining_sessions: usize,
    pub duration_secs: f64,
}

/// Closes trainer sessions idle for longer than `ttl`, persisting each first.
pub async fn evict_idle_sessions(sessions: Arc<SessionStore>, ttl: Duration) -> CleanupStats {
    let start = Instant::now();
    debug!("Starting session cleanup cycle");

    let evicted_sessions = sessions.evict_idle(ttl).await;
    let stats = CleanupStats {
        evicted_sessions,
        remaining_sessions: sessions.len(),
        duration_secs: start.elapsed().as_secs_f64(),
    };

    if stats.evicted_sessions > 0 {
        info!(
            evicted_sessions = stats.evicted_sessions,
            remaining_sessions = stats.remaining_sessions,
            duration_secs = format!("{:.2}", stats.duration_secs),
            "Session cleanup completed"
        );
    }

    stats
}
