use crate::error::StoreError;
use async_trait::async_trait;
use model::{
    chunk::Watermark,
    export::{ContactExportRow, FilteredContactRow, MessageExportRow},
    jobs::SecondPassOptions,
    records::{
        campaign::AutosendStatus, contact::MessageStatus, interaction_step::InteractionStepRecord,
    },
};

/// Storage contract for the chunk tasks.
///
/// Every `fetch_*_chunk` method returns rows with id strictly above the
/// watermark, ascending, at most `limit` of them. Two calls with the same
/// arguments against an unmodified store return identical rows, and an
/// empty result is the sole exhaustion signal.
///
/// Implementations read chunks through a reader-preferring connection and
/// apply mutations through the primary; no transaction spans more than one
/// chunk.
#[async_trait]
pub trait CampaignStore: Send + Sync {
    async fn contact_count(&self, campaign_id: i64) -> Result<u64, StoreError>;

    async fn filtered_contact_count(&self, campaign_id: i64) -> Result<u64, StoreError>;

    async fn notification_email(&self, requester_id: i64) -> Result<String, StoreError>;

    async fn interaction_steps(
        &self,
        campaign_id: i64,
    ) -> Result<Vec<InteractionStepRecord>, StoreError>;

    /// Distinct campaign-variable names ever defined for the campaign.
    async fn campaign_variable_names(&self, campaign_id: i64) -> Result<Vec<String>, StoreError>;

    /// Distinct custom-field keys across the campaign's contacts (uploaded
    /// and filtered), fixing the export header once per phase.
    async fn custom_field_keys(&self, campaign_id: i64) -> Result<Vec<String>, StoreError>;

    async fn fetch_contact_chunk(
        &self,
        campaign_id: i64,
        watermark: Watermark,
        limit: u64,
        only_opt_outs: bool,
    ) -> Result<Vec<ContactExportRow>, StoreError>;

    /// Messages for the next `limit` contacts (with at least one message)
    /// above the watermark, ordered by contact id then send time. The
    /// watermark advances over contact ids, not message ids.
    async fn fetch_message_chunk(
        &self,
        campaign_id: i64,
        watermark: Watermark,
        limit: u64,
    ) -> Result<Vec<MessageExportRow>, StoreError>;

    async fn fetch_filtered_chunk(
        &self,
        campaign_id: i64,
        watermark: Watermark,
        limit: u64,
    ) -> Result<Vec<FilteredContactRow>, StoreError>;

    /// Candidate ids for one second-pass chunk: contacts above the
    /// watermark matching the mode's status predicate and exclusions,
    /// ascending, at most `limit`. The caller derives the next watermark
    /// from this read set.
    async fn select_second_pass_chunk(
        &self,
        campaign_id: i64,
        watermark: Watermark,
        limit: u64,
        options: &SecondPassOptions,
    ) -> Result<Vec<i64>, StoreError>;

    /// Guarded bulk transition: flips `from -> to` only for the given ids
    /// still in `from`. Replaying an already-applied chunk therefore
    /// matches zero rows. Returns the number of rows updated.
    async fn apply_second_pass(
        &self,
        ids: &[i64],
        from: MessageStatus,
        to: MessageStatus,
    ) -> Result<u64, StoreError>;

    async fn set_autosend_status(
        &self,
        campaign_id: i64,
        status: AutosendStatus,
    ) -> Result<(), StoreError>;
}
