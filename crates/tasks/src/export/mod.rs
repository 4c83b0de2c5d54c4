//! Campaign export job: walks the requested record sets in chunks and
//! streams each one into a CSV artifact.
//!
//! Phases run sequentially and share the 0-100 progress budget with a
//! fixed divider and per-phase offsets, so a job exporting everything
//! reports a single monotonic-looking percentage. A re-run regenerates
//! the same artifacts from scratch; nothing about a prior attempt is
//! consulted.

pub mod shape;
pub mod writer;

use crate::{context::TaskContext, error::TaskError, mail::Email, templates};
use chrono::Utc;
use engine::chunk::ChunkLoop;
use engine::error::EngineError;
use model::{
    chunk::{ChunkResult, Watermark},
    jobs::ExportCampaignPayload,
};
use shape::{
    contact_columns, filtered_contact_columns, message_columns, shape_contact_row,
    shape_filtered_contact_row, shape_message_row, unique_questions_by_step_id, ExportRow,
};
use tracing::info;
use writer::CsvStreamWriter;
use writer_key::artifact_key;

/// Progress budget shared by the export phases.
const STATUS_DIVIDER: u64 = 4;
const CONTACTS_OFFSET: u8 = 25;
const OPT_OUTS_OFFSET: u8 = 75;
const MESSAGES_OFFSET: u8 = 0;
const FILTERED_OFFSET: u8 = 75;

/// URLs of the artifacts one export run produced, in request order.
/// Unrequested record sets stay `None`.
#[derive(Debug, Default, Clone)]
pub struct ExportArtifacts {
    pub contacts_url: Option<String>,
    pub opt_outs_url: Option<String>,
    pub messages_url: Option<String>,
    pub filtered_contacts_url: Option<String>,
}

mod writer_key {
    use chrono::{DateTime, Utc};

    /// Artifact key: sanitized title, campaign id and (for user-requested
    /// exports) a start timestamp, so repeated manual exports never clobber
    /// each other while automated exports overwrite a stable key.
    pub fn artifact_key(
        campaign_id: i64,
        campaign_title: &str,
        started_at: Option<DateTime<Utc>>,
        suffix: &str,
    ) -> String {
        let mut title = String::new();
        let mut last_dash = true;
        for c in campaign_title.chars() {
            if c.is_ascii_alphanumeric() {
                title.push(c.to_ascii_lowercase());
                last_dash = false;
            } else if !last_dash {
                title.push('-');
                last_dash = true;
            }
        }
        let title = title.trim_end_matches('-');
        let base = if title.is_empty() {
            format!("campaign-{campaign_id}")
        } else {
            format!("{title}-{campaign_id}")
        };
        match started_at {
            Some(at) => format!("{base}-{}{suffix}.csv", at.format("%Y-%m-%d-%H-%M-%S")),
            None => format!("{base}{suffix}.csv"),
        }
    }

}

/// Run one export job end to end and return the artifact URLs.
pub async fn run_export(
    ctx: &TaskContext,
    payload: &ExportCampaignPayload,
) -> Result<ExportArtifacts, TaskError> {
    let store = ctx.store.as_ref();
    let campaign_id = payload.campaign_id;

    let contact_count = store.contact_count(campaign_id).await?;
    let steps = store.interaction_steps(campaign_id).await?;
    let questions = unique_questions_by_step_id(&steps);
    let custom_field_keys = store.custom_field_keys(campaign_id).await?;

    let started_at = if payload.is_automated_export {
        None
    } else {
        Some(Utc::now())
    };
    let key = |suffix: &str| artifact_key(campaign_id, &payload.campaign_title, started_at, suffix);

    info!(
        campaign_id,
        contact_count,
        automated = payload.is_automated_export,
        "Starting campaign export"
    );

    let mut artifacts = ExportArtifacts::default();

    if payload.options.campaign {
        let columns = contact_columns(&custom_field_keys, &questions);
        let mut csv = CsvStreamWriter::new(
            key(""),
            ctx.uploads.begin(&key("")).await?,
            columns,
        );
        ChunkLoop::new("export contacts", campaign_id, ctx.export_chunk_size, contact_count)
            .with_status_share(STATUS_DIVIDER, CONTACTS_OFFSET)
            .run_with_writer(
                ctx.progress.as_ref(),
                async |watermark| {
                    let rows = store
                        .fetch_contact_chunk(campaign_id, watermark, ctx.export_chunk_size, false)
                        .await
                        .map_err(|e| EngineError::process(watermark, e))?;
                    Ok(match rows.last() {
                        None => ChunkResult::Done,
                        Some(last) => ChunkResult::Continue {
                            watermark: Watermark(last.contact.id),
                            payload: rows
                                .iter()
                                .map(|row| {
                                    shape_contact_row(
                                        row,
                                        campaign_id,
                                        &payload.campaign_title,
                                        &questions,
                                    )
                                })
                                .collect::<Vec<ExportRow>>(),
                        },
                    })
                },
                async |rows: Vec<ExportRow>| {
                    csv.write_rows(&rows).await.map_err(EngineError::sink)
                },
            )
            .await?;
        artifacts.contacts_url = Some(csv.close().await?);
    }

    if payload.options.opt_outs {
        let columns = contact_columns(&custom_field_keys, &questions);
        let opt_outs_key = key("-optouts");
        let mut csv = CsvStreamWriter::new(
            opt_outs_key.clone(),
            ctx.uploads.begin(&opt_outs_key).await?,
            columns,
        );
        ChunkLoop::new("export opt-outs", campaign_id, ctx.export_chunk_size, contact_count)
            .with_status_share(STATUS_DIVIDER, OPT_OUTS_OFFSET)
            .run_with_writer(
                ctx.progress.as_ref(),
                async |watermark| {
                    let rows = store
                        .fetch_contact_chunk(campaign_id, watermark, ctx.export_chunk_size, true)
                        .await
                        .map_err(|e| EngineError::process(watermark, e))?;
                    Ok(match rows.last() {
                        None => ChunkResult::Done,
                        Some(last) => ChunkResult::Continue {
                            watermark: Watermark(last.contact.id),
                            payload: rows
                                .iter()
                                .map(|row| {
                                    shape_contact_row(
                                        row,
                                        campaign_id,
                                        &payload.campaign_title,
                                        &questions,
                                    )
                                })
                                .collect::<Vec<ExportRow>>(),
                        },
                    })
                },
                async |rows: Vec<ExportRow>| {
                    csv.write_rows(&rows).await.map_err(EngineError::sink)
                },
            )
            .await?;
        artifacts.opt_outs_url = Some(csv.close().await?);
    }

    if payload.options.messages {
        let variable_names = store.campaign_variable_names(campaign_id).await?;
        let columns = message_columns(&variable_names);
        let messages_key = key("-messages");
        let mut csv = CsvStreamWriter::new(
            messages_key.clone(),
            ctx.uploads.begin(&messages_key).await?,
            columns,
        );
        ChunkLoop::new("export messages", campaign_id, ctx.export_chunk_size, contact_count)
            .with_status_share(STATUS_DIVIDER, MESSAGES_OFFSET)
            .run_with_writer(
                ctx.progress.as_ref(),
                async |watermark| {
                    let rows = store
                        .fetch_message_chunk(campaign_id, watermark, ctx.export_chunk_size)
                        .await
                        .map_err(|e| EngineError::process(watermark, e))?;
                    // The watermark walks contact ids; the final row holds
                    // the highest one in the chunk.
                    Ok(match rows.last() {
                        None => ChunkResult::Done,
                        Some(last) => ChunkResult::Continue {
                            watermark: Watermark(last.campaign_contact_id),
                            payload: rows
                                .iter()
                                .map(|row| shape_message_row(row, campaign_id, &variable_names))
                                .collect::<Vec<ExportRow>>(),
                        },
                    })
                },
                async |rows: Vec<ExportRow>| {
                    csv.write_rows(&rows).await.map_err(EngineError::sink)
                },
            )
            .await?;
        artifacts.messages_url = Some(csv.close().await?);
    }

    if payload.options.filtered_contacts {
        let filtered_count = store.filtered_contact_count(campaign_id).await?;
        let columns = filtered_contact_columns(&custom_field_keys);
        let filtered_key = key("-filteredContacts");
        let mut csv = CsvStreamWriter::new(
            filtered_key.clone(),
            ctx.uploads.begin(&filtered_key).await?,
            columns,
        );
        ChunkLoop::new(
            "export filtered contacts",
            campaign_id,
            ctx.export_chunk_size,
            filtered_count,
        )
        .with_status_share(STATUS_DIVIDER, FILTERED_OFFSET)
        .run_with_writer(
            ctx.progress.as_ref(),
            async |watermark| {
                let rows = store
                    .fetch_filtered_chunk(campaign_id, watermark, ctx.export_chunk_size)
                    .await
                    .map_err(|e| EngineError::process(watermark, e))?;
                Ok(match rows.last() {
                    None => ChunkResult::Done,
                    Some(last) => ChunkResult::Continue {
                        watermark: Watermark(last.contact.id),
                        payload: rows
                            .iter()
                            .map(|row| {
                                shape_filtered_contact_row(
                                    row,
                                    campaign_id,
                                    &payload.campaign_title,
                                )
                            })
                            .collect::<Vec<ExportRow>>(),
                    },
                })
            },
            async |rows: Vec<ExportRow>| {
                csv.write_rows(&rows).await.map_err(EngineError::sink)
            },
        )
        .await?;
        artifacts.filtered_contacts_url = Some(csv.close().await?);
    }

    if !payload.is_automated_export {
        let to = store.notification_email(payload.requester_id).await?;
        ctx.mailer
            .send(Email {
                to,
                subject: format!("Export ready for {}", payload.campaign_title),
                html: templates::export_content(&artifacts, &payload.campaign_title),
            })
            .await?;
    }

    info!(campaign_id, "Campaign export complete");
    Ok(artifacts)
}
