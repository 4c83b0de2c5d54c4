//! Second-pass job: walks a campaign's contacts and bulk-flips their
//! message status so texters can send a follow-up round.
//!
//! Each chunk is a select-then-apply pair. The select reads candidate ids
//! above the watermark; the apply is guarded on the expected current status,
//! so replaying a chunk after a crash matches zero rows instead of
//! double-flipping.

use crate::{context::TaskContext, error::TaskError, mail::Email, templates};
use engine::chunk::ChunkLoop;
use engine::error::EngineError;
use model::{
    chunk::{ChunkResult, Watermark},
    jobs::MarkSecondPassPayload,
    records::{campaign::AutosendStatus, contact::MessageStatus},
};
use tracing::info;

/// Run one mark (or unmark) job end to end. Returns the number of contacts
/// whose status was flipped.
pub async fn run_mark_second_pass(
    ctx: &TaskContext,
    payload: &MarkSecondPassPayload,
) -> Result<u64, TaskError> {
    let store = ctx.store.as_ref();
    let campaign_id = payload.campaign_id;
    let options = payload.options;

    // Marking sends messaged contacts back to the needs-message pool;
    // unmarking reverses an earlier run.
    let (from, to) = if options.unmark {
        (MessageStatus::NeedsMessage, MessageStatus::Messaged)
    } else {
        (MessageStatus::Messaged, MessageStatus::NeedsMessage)
    };

    let contact_count = store.contact_count(campaign_id).await?;
    info!(
        campaign_id,
        contact_count,
        unmark = options.unmark,
        "Starting second pass"
    );

    let mut updated: u64 = 0;
    let operation = if options.unmark {
        "unmark second pass"
    } else {
        "mark second pass"
    };
    ChunkLoop::new(operation, campaign_id, ctx.second_pass_chunk_size, contact_count)
        .run(ctx.progress.as_ref(), async |watermark| {
            let ids = store
                .select_second_pass_chunk(
                    campaign_id,
                    watermark,
                    ctx.second_pass_chunk_size,
                    &options,
                )
                .await
                .map_err(|e| EngineError::process(watermark, e))?;
            let Some(&last) = ids.last() else {
                return Ok(ChunkResult::Done);
            };
            updated += store
                .apply_second_pass(&ids, from, to)
                .await
                .map_err(|e| EngineError::process(watermark, e))?;
            // Advance over the read set, not the written one, so ids that
            // changed status between select and apply are not revisited.
            Ok(ChunkResult::Continue {
                watermark: Watermark(last),
                payload: (),
            })
        })
        .await?;

    // A marked campaign has sendable contacts again; autosend waits for an
    // operator to restart it. Unmark leaves autosend untouched.
    if !options.unmark {
        store
            .set_autosend_status(campaign_id, AutosendStatus::Unstarted)
            .await?;
    }

    let campaign_url = format!(
        "{}/admin/{}/campaigns/{}",
        ctx.base_url.trim_end_matches('/'),
        payload.organization_id,
        campaign_id
    );
    let to_address = store.notification_email(payload.requester_id).await?;
    let action = if options.unmark { "unmarking" } else { "marking" };
    ctx.mailer
        .send(Email {
            to: to_address,
            subject: format!(
                "Second pass {action} complete for {}",
                payload.campaign_title
            ),
            html: templates::second_pass_content(
                &payload.campaign_title,
                &campaign_url,
                options.unmark,
            ),
        })
        .await?;

    info!(campaign_id, updated, "Second pass complete");
    Ok(updated)
}
