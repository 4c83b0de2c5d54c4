use crate::{mail::Mailer, upload::UploadStore};
use engine::progress::ProgressSink;
use std::sync::Arc;
use store::CampaignStore;

/// Everything a job driver needs, passed explicitly rather than read from
/// ambient state so concurrent jobs can coexist in one process.
#[derive(Clone)]
pub struct TaskContext {
    pub store: Arc<dyn CampaignStore>,
    pub uploads: Arc<dyn UploadStore>,
    pub mailer: Arc<dyn Mailer>,
    pub progress: Arc<dyn ProgressSink>,
    pub export_chunk_size: u64,
    pub second_pass_chunk_size: u64,
    /// Root for links back into the app (campaign pages in emails).
    pub base_url: String,
}
