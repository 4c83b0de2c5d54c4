use model::chunk::Watermark;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProgressError {
    #[error("Failed to update job status: {0}")]
    UpdateStatus(String),
}

#[derive(Error, Debug)]
pub enum EngineError {
    /// The watermark returned by a chunk did not strictly increase. This is
    /// an invariant violation, not a retryable condition: continuing would
    /// re-process rows or loop forever.
    #[error("Watermark regressed from {prev} to {next}")]
    WatermarkRegression { prev: Watermark, next: Watermark },

    #[error("Chunk processing failed at watermark {watermark}: {source}")]
    Process {
        watermark: Watermark,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Chunk output sink failed: {source}")]
    Sink {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Progress reporting failed: {0}")]
    Progress(#[from] ProgressError),
}

impl EngineError {
    /// Wrap a task-level failure raised while processing one chunk.
    pub fn process(
        watermark: Watermark,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        EngineError::Process {
            watermark,
            source: Box::new(source),
        }
    }

    pub fn sink(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        EngineError::Sink {
            source: Box::new(source),
        }
    }
}
