/// Background refresh loop
use crate::domain::CycleOutcome;
use crate::errors::ApiResult;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Anything that can run one fetch → persist → notify cycle
#[async_trait]
pub trait Pipeline: Send + Sync + 'static {
    async fn run_cycle(&self) -> ApiResult<CycleOutcome>;
}

/// Run `pipeline` every `interval`, starting one interval from now.
///
/// Errors are logged and the loop keeps going.
pub fn spawn_refresh_task<P: Pipeline>(pipeline: Arc<P>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            "Starting flight refresh task (interval: {}s)",
            interval.as_secs()
        );
        loop {
            tokio::time::sleep(interval).await;
            match pipeline.run_cycle().await {
                Ok(CycleOutcome::Completed(report)) => info!(
                    "Refresh cycle done: {} fetched from {:?}, {} delayed, {} notified",
                    report.fetched, report.source, report.delayed, report.notified
                ),
                Ok(CycleOutcome::Skipped) => {
                    warn!("Previous refresh cycle still running, skipping this tick")
                }
                Err(e) => error!("Refresh cycle error: {:?}", e),
            }
        }
    })
}
