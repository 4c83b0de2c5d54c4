use crate::{error::EngineError, progress::ProgressSink};
use model::chunk::{ChunkResult, Watermark};
use tracing::debug;

/// Totals observed by one chunk walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkStats {
    pub chunks: u64,
    /// Approximate rows processed: incremented by the configured chunk size
    /// per chunk, so the final chunk may be overcounted.
    pub processed: u64,
    pub last_watermark: Watermark,
}

/// Drives the fetch/process/advance loop over one record set.
///
/// The loop starts at watermark zero, invokes the processor once per chunk,
/// reports progress after each non-terminal chunk and stops on
/// [`ChunkResult::Done`]. Any error from the processor, the output sink or
/// the progress sink aborts the loop; effects of already-completed chunks
/// stay in place and retry, if any, happens at the whole-job level.
pub struct ChunkLoop<'a> {
    pub operation: &'a str,
    pub campaign_id: i64,
    pub chunk_size: u64,
    /// Captured once at job start, not refreshed mid-run.
    pub total_count: u64,
    /// Share of the 0-100 budget this walk owns (1 = all of it).
    pub status_divider: u64,
    pub status_offset: u8,
}

impl<'a> ChunkLoop<'a> {
    pub fn new(operation: &'a str, campaign_id: i64, chunk_size: u64, total_count: u64) -> Self {
        ChunkLoop {
            operation,
            campaign_id,
            chunk_size,
            total_count,
            status_divider: 1,
            status_offset: 0,
        }
    }

    pub fn with_status_share(mut self, divider: u64, offset: u8) -> Self {
        self.status_divider = divider;
        self.status_offset = offset;
        self
    }

    /// Run the loop, discarding chunk payloads.
    pub async fn run<P, F>(
        &self,
        progress: &dyn ProgressSink,
        process: F,
    ) -> Result<ChunkStats, EngineError>
    where
        F: AsyncFnMut(Watermark) -> Result<ChunkResult<P>, EngineError>,
    {
        self.run_with_writer(progress, process, async |_payload| Ok(()))
            .await
    }

    /// Run the loop, forwarding each chunk payload to an output sink.
    pub async fn run_with_writer<P, F, W>(
        &self,
        progress: &dyn ProgressSink,
        mut process: F,
        mut write: W,
    ) -> Result<ChunkStats, EngineError>
    where
        F: AsyncFnMut(Watermark) -> Result<ChunkResult<P>, EngineError>,
        W: AsyncFnMut(P) -> Result<(), EngineError>,
    {
        let mut watermark = Watermark::ZERO;
        let mut processed: u64 = 0;
        let mut chunks: u64 = 0;

        loop {
            let payload = match process(watermark).await? {
                ChunkResult::Done => break,
                ChunkResult::Continue {
                    watermark: next,
                    payload,
                } => {
                    if next <= watermark {
                        return Err(EngineError::WatermarkRegression {
                            prev: watermark,
                            next,
                        });
                    }
                    watermark = next;
                    payload
                }
            };

            chunks += 1;
            processed += self.chunk_size;
            debug!(
                operation = self.operation,
                campaign_id = self.campaign_id,
                watermark = %watermark,
                "Processed chunk"
            );

            progress.update_status(self.percent(processed)).await?;
            write(payload).await?;
        }

        Ok(ChunkStats {
            chunks,
            processed,
            last_watermark: watermark,
        })
    }

    // Fixed chunk-size increments mean the raw value can overshoot 100 on
    // the final, possibly short, chunk; clamp before reporting.
    fn percent(&self, processed: u64) -> u8 {
        if self.total_count == 0 {
            return 100.min(100 + self.status_offset);
        }
        let raw = (processed as f64 / self.total_count as f64 / self.status_divider as f64
            * 100.0)
            .round() as i64
            + self.status_offset as i64;
        raw.clamp(0, 100) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::ProgressError, progress::NoopProgress};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Captures every reported percent for assertions.
    struct RecordingProgress {
        reported: Mutex<Vec<u8>>,
    }

    impl RecordingProgress {
        fn new() -> Self {
            RecordingProgress {
                reported: Mutex::new(Vec::new()),
            }
        }

        fn reported(&self) -> Vec<u8> {
            self.reported.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ProgressSink for RecordingProgress {
        async fn update_status(&self, percent: u8) -> Result<(), ProgressError> {
            self.reported.lock().unwrap().push(percent);
            Ok(())
        }
    }

    fn paged_source(total: i64, chunk_size: i64) -> impl AsyncFnMut(Watermark) -> Result<ChunkResult<Vec<i64>>, EngineError>
    {
        async move |watermark: Watermark| {
            let ids: Vec<i64> = (watermark.value() + 1..=total)
                .take(chunk_size as usize)
                .collect();
            Ok(match ids.last() {
                None => ChunkResult::Done,
                Some(&last) => ChunkResult::Continue {
                    watermark: Watermark(last),
                    payload: ids,
                },
            })
        }
    }

    #[tokio::test]
    async fn iterates_ceil_n_over_k_chunks_without_gaps() {
        let chunk_loop = ChunkLoop::new("test walk", 1, 2, 5);
        let mut seen = Vec::new();
        let stats = chunk_loop
            .run_with_writer(&NoopProgress, paged_source(5, 2), async |ids: Vec<i64>| {
                seen.extend(ids);
                Ok(())
            })
            .await
            .unwrap();

        assert_eq!(stats.chunks, 3);
        assert_eq!(stats.last_watermark, Watermark(5));
        assert_eq!(seen, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn empty_source_reports_nothing() {
        let chunk_loop = ChunkLoop::new("test walk", 1, 10, 0);
        let progress = RecordingProgress::new();
        let stats = chunk_loop
            .run(&progress, paged_source(0, 10))
            .await
            .unwrap();

        assert_eq!(stats.chunks, 0);
        assert_eq!(stats.last_watermark, Watermark::ZERO);
        assert!(progress.reported().is_empty());
    }

    #[tokio::test]
    async fn final_short_chunk_overshoots_then_clamps() {
        let chunk_loop = ChunkLoop::new("test walk", 1, 2, 5);
        let progress = RecordingProgress::new();
        chunk_loop
            .run(&progress, paged_source(5, 2))
            .await
            .unwrap();

        // 2/5 = 40, 4/5 = 80, 6/5 = 120 clamped to 100.
        assert_eq!(progress.reported(), vec![40, 80, 100]);
    }

    #[tokio::test]
    async fn divider_and_offset_slice_the_budget() {
        let chunk_loop = ChunkLoop::new("test walk", 1, 2, 4).with_status_share(4, 25);
        let progress = RecordingProgress::new();
        chunk_loop
            .run(&progress, paged_source(4, 2))
            .await
            .unwrap();

        // 2/4/4 = 12.5 -> 13 (+25), 4/4/4 = 25 (+25).
        assert_eq!(progress.reported(), vec![38, 50]);
    }

    #[tokio::test]
    async fn watermark_regression_is_fatal() {
        let chunk_loop = ChunkLoop::new("test walk", 1, 2, 10);
        let result = chunk_loop
            .run(&NoopProgress, async |_watermark| {
                Ok(ChunkResult::Continue {
                    watermark: Watermark::ZERO,
                    payload: (),
                })
            })
            .await;

        assert!(matches!(
            result,
            Err(EngineError::WatermarkRegression { .. })
        ));
    }

    #[tokio::test]
    async fn processor_error_aborts_without_further_progress() {
        let chunk_loop = ChunkLoop::new("test walk", 1, 2, 10);
        let progress = RecordingProgress::new();
        let mut calls = 0;
        let result = chunk_loop
            .run(&progress, async |watermark: Watermark| {
                calls += 1;
                if calls == 2 {
                    return Err(EngineError::process(
                        watermark,
                        std::io::Error::other("store unreachable"),
                    ));
                }
                Ok(ChunkResult::Continue {
                    watermark: Watermark(watermark.value() + 2),
                    payload: (),
                })
            })
            .await;

        assert!(matches!(result, Err(EngineError::Process { .. })));
        assert_eq!(progress.reported().len(), 1);
    }
}
