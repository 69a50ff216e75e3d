// libs/calendar-sync-cell/src/services/dispatch.rs
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, warn};

use shared_config::AppConfig;

use crate::models::{CalendarSyncError, SyncOutcome, SyncTarget};
use crate::services::sync::CalendarSyncService;

#[derive(Debug, Clone, Copy)]
enum SyncJob {
    Sync,
    Remove,
}

/// Runs calendar work off the request path. The booking that triggered it has
/// already been stored; failures and timeouts end up in the log only.
#[derive(Clone)]
pub struct CalendarSyncDispatcher {
    config: Arc<AppConfig>,
}

impl CalendarSyncDispatcher {
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self { config }
    }

    /// `None` when calendar sync is not configured.
    pub fn dispatch(&self, target: SyncTarget, auth_token: &str) -> Option<JoinHandle<()>> {
        self.spawn(SyncJob::Sync, target, auth_token)
    }

    pub fn dispatch_removal(&self, target: SyncTarget, auth_token: &str) -> Option<JoinHandle<()>> {
        self.spawn(SyncJob::Remove, target, auth_token)
    }

    fn spawn(&self, job: SyncJob, target: SyncTarget, auth_token: &str) -> Option<JoinHandle<()>> {
        if !self.config.is_calendar_sync_configured() {
            debug!("Calendar sync not configured, skipping {:?} of {}", job, target);
            return None;
        }

        let config = Arc::clone(&self.config);
        let auth_token = auth_token.to_string();
        let limit = config.calendar_sync_timeout_secs;

        Some(tokio::spawn(async move {
            let result = match timeout(Duration::from_secs(limit), run(&config, job, target, &auth_token)).await {
                Ok(result) => result,
                Err(_) => Err(CalendarSyncError::Timeout(limit)),
            };

            match result {
                Ok(outcome) => debug!("Calendar {:?} of {} finished: {:?}", job, target, outcome.action),
                Err(e) => warn!("Calendar {:?} of {} failed: {}", job, target, e),
            }
        }))
    }
}

async fn run(
    config: &AppConfig,
    job: SyncJob,
    target: SyncTarget,
    auth_token: &str,
) -> Result<SyncOutcome, CalendarSyncError> {
    let service = CalendarSyncService::new(config)?;
    match job {
        SyncJob::Sync => service.sync(target, auth_token).await,
        SyncJob::Remove => service.remove(target, auth_token).await,
    }
}
