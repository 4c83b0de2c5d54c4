#![allow(dead_code)]

use async_trait::async_trait;
use engine::error::ProgressError;
use engine::progress::ProgressSink;
use model::jobs::{ExportCampaignPayload, ExportOptions, MarkSecondPassPayload, SecondPassOptions};
use model::records::contact::MessageStatus;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use store::memory::{ContactSeed, MemoryStore};
use tasks::{context::TaskContext, mail::MemoryMailer, upload::MemoryUploadStore};

/// Progress double recording every reported percent.
#[derive(Default)]
pub struct SharedProgress {
    reported: Mutex<Vec<u8>>,
}

impl SharedProgress {
    pub fn reported(&self) -> Vec<u8> {
        self.reported.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProgressSink for SharedProgress {
    async fn update_status(&self, percent: u8) -> Result<(), ProgressError> {
        self.reported.lock().unwrap().push(percent);
        Ok(())
    }
}

/// In-memory wiring for one test job run, with handles kept for assertions.
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub uploads: MemoryUploadStore,
    pub mailer: Arc<MemoryMailer>,
    pub progress: Arc<SharedProgress>,
    pub ctx: TaskContext,
}

pub fn harness(chunk_size: u64) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let uploads = MemoryUploadStore::new();
    let mailer = Arc::new(MemoryMailer::new());
    let progress = Arc::new(SharedProgress::default());
    let ctx = TaskContext {
        store: store.clone(),
        uploads: Arc::new(uploads.clone()),
        mailer: mailer.clone(),
        progress: progress.clone(),
        export_chunk_size: chunk_size,
        second_pass_chunk_size: chunk_size,
        base_url: "https://spoke.test".to_string(),
    };
    Harness {
        store,
        uploads,
        mailer,
        progress,
        ctx,
    }
}

/// Seed `count` contacts with distinct cells and the given status.
/// Returns the campaign id and the contact ids in insertion order.
pub fn seed_campaign(
    store: &MemoryStore,
    title: &str,
    count: usize,
    status: MessageStatus,
) -> (i64, Vec<i64>) {
    let campaign_id = store.add_campaign(title);
    let ids = (0..count)
        .map(|n| {
            store.add_contact(
                campaign_id,
                ContactSeed {
                    first_name: format!("Contact{n}"),
                    cell: format!("+1555555{n:04}"),
                    message_status: status,
                    ..Default::default()
                },
            )
        })
        .collect();
    (campaign_id, ids)
}

pub fn export_payload(
    campaign_id: i64,
    title: &str,
    requester_id: i64,
    options: ExportOptions,
) -> ExportCampaignPayload {
    ExportCampaignPayload {
        campaign_id,
        campaign_title: title.to_string(),
        requester_id,
        is_automated_export: false,
        options,
    }
}

pub fn second_pass_payload(
    campaign_id: i64,
    title: &str,
    requester_id: i64,
    options: SecondPassOptions,
) -> MarkSecondPassPayload {
    MarkSecondPassPayload {
        campaign_id,
        campaign_title: title.to_string(),
        organization_id: 1,
        requester_id,
        options,
    }
}

/// Parse a CSV artifact into its header and one map per data row.
pub fn read_csv(bytes: &[u8]) -> (Vec<String>, Vec<HashMap<String, String>>) {
    let mut reader = csv::Reader::from_reader(bytes);
    let header: Vec<String> = reader
        .headers()
        .expect("csv header")
        .iter()
        .map(str::to_string)
        .collect();
    let rows = reader
        .records()
        .map(|record| {
            let record = record.expect("csv record");
            header
                .iter()
                .cloned()
                .zip(record.iter().map(str::to_string))
                .collect()
        })
        .collect();
    (header, rows)
}
