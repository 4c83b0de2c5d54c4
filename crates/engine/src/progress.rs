use crate::error::ProgressError;
use async_trait::async_trait;
use tracing::info;

/// Reports job progress to the external job tracker.
///
/// The active chunk loop owns the job's 0-100 progress value for its
/// lifetime; phases of one job share the budget via divider/offset on
/// [`crate::chunk::ChunkLoop`].
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn update_status(&self, percent: u8) -> Result<(), ProgressError>;
}

/// Test configuration: progress updates are dropped.
pub struct NoopProgress;

#[async_trait]
impl ProgressSink for NoopProgress {
    async fn update_status(&self, _percent: u8) -> Result<(), ProgressError> {
        Ok(())
    }
}

/// Reports progress to the log stream. Used by the CLI runner, where no job
/// tracker is attached.
pub struct LogProgress;

#[async_trait]
impl ProgressSink for LogProgress {
    async fn update_status(&self, percent: u8) -> Result<(), ProgressError> {
        info!(percent, "Job progress");
        Ok(())
    }
}
