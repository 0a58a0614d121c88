mod session_cleanup;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, Mutex};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{info, warn};

use crate::services::sessions::SessionStore;

pub use session_cleanup::{evict_idle_sessions, CleanupStats};

pub struct WorkerManager {
    scheduler: Mutex<JobScheduler>,
    shutdown_tx: broadcast::Sender<()>,
    sessions: Arc<SessionStore>,
}

impl WorkerManager {
    pub async fn new(sessions: Arc<SessionStore>) -> Result<Self, WorkerError> {
        let scheduler = JobScheduler::new().await.map_err(WorkerError::Scheduler)?;
        let (shutdown_tx, _) = broadcast::channel(1);
        Ok(Self {
            scheduler: Mutex::new(scheduler),
            shutdown_tx,
            sessions,
        })
    }

    pub async fn start(&self, schedule: &str, idle_ttl: Duration) -> Result<(), WorkerError> {
        let scheduler = self.scheduler.lock().await;

        let sessions = Arc::clone(&self.sessions);
        let shutdown_rx = self.shutdown_tx.subscribe();
        let job = Job::new_async(schedule, move |_uuid, _lock| {
            let sessions = Arc::clone(&sessions);
            let mut rx = shutdown_rx.resubscribe();
            Box::pin(async move {
                tokio::select! {
                    _ = rx.recv() => {},
                    _ = evict_idle_sessions(sessions, idle_ttl) => {}
                }
            })
        })
        .map_err(WorkerError::Scheduler)?;
        scheduler.add(job).await.map_err(WorkerError::Scheduler)?;
        info!(
            schedule = %schedule,
            idle_ttl_secs = idle_ttl.as_secs(),
            "Session cleanup worker scheduled"
        );

        scheduler.start().await.map_err(WorkerError::Scheduler)?;
        info!("All workers started");

        Ok(())
    }

    pub async fn stop(&self) {
        info!("Stopping workers...");
        let _ = self.shutdown_tx.send(());

        let mut scheduler = self.scheduler.lock().await;
        if let Err(e) = scheduler.shutdown().await {
            warn!(error = %e, "Error shutting down scheduler");
        }

        info!("Workers stopped");
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] tokio_cron_scheduler::JobSchedulerError),
}
