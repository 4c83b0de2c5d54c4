mod connect;
mod decode;

use crate::{campaign::CampaignStore, error::StoreError};
use async_trait::async_trait;
use model::{
    chunk::Watermark,
    export::{ContactExportRow, FilteredContactRow, MessageExportRow},
    jobs::SecondPassOptions,
    records::{
        campaign::AutosendStatus, contact::MessageStatus, interaction_step::InteractionStepRecord,
    },
};
use tokio_postgres::{Client, types::ToSql};
use tracing::debug;

const CONTACT_COUNT_SQL: &str = include_str!("sql/contact_count.sql");
const FILTERED_CONTACT_COUNT_SQL: &str = include_str!("sql/filtered_contact_count.sql");
const NOTIFICATION_EMAIL_SQL: &str = include_str!("sql/notification_email.sql");
const INTERACTION_STEPS_SQL: &str = include_str!("sql/interaction_steps.sql");
const CAMPAIGN_VARIABLE_NAMES_SQL: &str = include_str!("sql/campaign_variable_names.sql");
const CUSTOM_FIELD_KEYS_SQL: &str = include_str!("sql/custom_field_keys.sql");
const CONTACT_CHUNK_SQL: &str = include_str!("sql/contact_chunk.sql");
const MESSAGE_CHUNK_SQL: &str = include_str!("sql/message_chunk.sql");
const FILTERED_CHUNK_SQL: &str = include_str!("sql/filtered_chunk.sql");
const SECOND_PASS_SELECT_SQL: &str = include_str!("sql/second_pass_select.sql");
const APPLY_SECOND_PASS_SQL: &str = include_str!("sql/apply_second_pass.sql");
const SET_AUTOSEND_STATUS_SQL: &str = include_str!("sql/set_autosend_status.sql");

/// Postgres-backed [`CampaignStore`].
///
/// Chunk fetches and counters go through the reader client, mutations
/// through the primary. With a single database both clients point at the
/// same server.
pub struct PgCampaignStore {
    reader: Client,
    primary: Client,
}

impl PgCampaignStore {
    pub async fn connect(primary_url: &str, reader_url: &str) -> Result<Self, StoreError> {
        let primary = connect::connect_client(primary_url).await?;
        let reader = connect::connect_client(reader_url).await?;
        Ok(PgCampaignStore { reader, primary })
    }

    /// Second-pass candidate selection with mode-dependent predicates.
    /// Filters are appended as SQL fragments; only the recency window adds
    /// a parameter, so it is always the last placeholder.
    fn second_pass_query(options: &SecondPassOptions) -> String {
        let mut filters = String::new();

        if options.unmark {
            // Never unmark contacts that were never sent a first message.
            filters.push_str(
                "and exists (\n      \
                     select 1 from message\n      \
                     where message.campaign_contact_id = cc.id\n  )",
            );
        } else {
            if options.exclude_newer {
                filters.push_str(
                    "and not exists (\n      \
                         select 1 from campaign_contact as newer_contact\n      \
                         where newer_contact.cell = cc.cell\n        \
                           and newer_contact.id > cc.id\n  )\n  ",
                );
            }
            if options.exclude_age_in_hours.is_some() {
                filters.push_str(
                    "and not exists (\n      \
                         select 1 from message\n      \
                         where message.campaign_contact_id = cc.id\n        \
                           and message.created_at > now() - make_interval(hours => $5::int)\n  )",
                );
            }
        }

        SECOND_PASS_SELECT_SQL.replace("{filters}", &filters)
    }
}

#[async_trait]
impl CampaignStore for PgCampaignStore {
    async fn contact_count(&self, campaign_id: i64) -> Result<u64, StoreError> {
        let row = self.reader.query_one(CONTACT_COUNT_SQL, &[&campaign_id]).await?;
        Ok(row.get::<_, i64>(0) as u64)
    }

    async fn filtered_contact_count(&self, campaign_id: i64) -> Result<u64, StoreError> {
        let row = self
            .reader
            .query_one(FILTERED_CONTACT_COUNT_SQL, &[&campaign_id])
            .await?;
        Ok(row.get::<_, i64>(0) as u64)
    }

    async fn notification_email(&self, requester_id: i64) -> Result<String, StoreError> {
        let row = self
            .reader
            .query_opt(NOTIFICATION_EMAIL_SQL, &[&requester_id])
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("user {requester_id}")))?;
        Ok(row.get(0))
    }

    async fn interaction_steps(
        &self,
        campaign_id: i64,
    ) -> Result<Vec<InteractionStepRecord>, StoreError> {
        let rows = self
            .reader
            .query(INTERACTION_STEPS_SQL, &[&campaign_id])
            .await?;
        Ok(rows
            .iter()
            .map(|row| InteractionStepRecord {
                id: row.get("id"),
                campaign_id: row.get("campaign_id"),
                question: row.get("question"),
            })
            .collect())
    }

    async fn campaign_variable_names(&self, campaign_id: i64) -> Result<Vec<String>, StoreError> {
        let rows = self
            .reader
            .query(CAMPAIGN_VARIABLE_NAMES_SQL, &[&campaign_id])
            .await?;
        Ok(rows.iter().map(|row| row.get(0)).collect())
    }

    async fn custom_field_keys(&self, campaign_id: i64) -> Result<Vec<String>, StoreError> {
        let rows = self
            .reader
            .query(CUSTOM_FIELD_KEYS_SQL, &[&campaign_id])
            .await?;
        Ok(rows.iter().map(|row| row.get(0)).collect())
    }

    async fn fetch_contact_chunk(
        &self,
        campaign_id: i64,
        watermark: Watermark,
        limit: u64,
        only_opt_outs: bool,
    ) -> Result<Vec<ContactExportRow>, StoreError> {
        debug!(campaign_id, %watermark, limit, only_opt_outs, "Fetching contact chunk");
        let rows = self
            .reader
            .query(
                CONTACT_CHUNK_SQL,
                &[
                    &campaign_id,
                    &watermark.value(),
                    &(limit as i64),
                    &only_opt_outs,
                ],
            )
            .await?;
        rows.iter().map(decode::contact_export_row).collect()
    }

    async fn fetch_message_chunk(
        &self,
        campaign_id: i64,
        watermark: Watermark,
        limit: u64,
    ) -> Result<Vec<MessageExportRow>, StoreError> {
        debug!(campaign_id, %watermark, limit, "Fetching message chunk");
        let rows = self
            .reader
            .query(
                MESSAGE_CHUNK_SQL,
                &[&campaign_id, &watermark.value(), &(limit as i64)],
            )
            .await?;
        rows.iter().map(decode::message_export_row).collect()
    }

    async fn fetch_filtered_chunk(
        &self,
        campaign_id: i64,
        watermark: Watermark,
        limit: u64,
    ) -> Result<Vec<FilteredContactRow>, StoreError> {
        debug!(campaign_id, %watermark, limit, "Fetching filtered contact chunk");
        let rows = self
            .reader
            .query(
                FILTERED_CHUNK_SQL,
                &[&campaign_id, &watermark.value(), &(limit as i64)],
            )
            .await?;
        rows.iter().map(decode::filtered_contact_row).collect()
    }

    async fn select_second_pass_chunk(
        &self,
        campaign_id: i64,
        watermark: Watermark,
        limit: u64,
        options: &SecondPassOptions,
    ) -> Result<Vec<i64>, StoreError> {
        let status = if options.unmark {
            MessageStatus::NeedsMessage
        } else {
            MessageStatus::Messaged
        };

        let query = Self::second_pass_query(options);
        let watermark_value = watermark.value();
        let limit = limit as i64;
        let status_str = status.as_str();
        let mut params: Vec<&(dyn ToSql + Sync)> =
            vec![&campaign_id, &watermark_value, &limit, &status_str];
        let age_hours = options.exclude_age_in_hours.map(|hours| hours as i32);
        if let Some(ref hours) = age_hours
            && !options.unmark
        {
            params.push(hours);
        }

        let rows = self.reader.query(&query, &params).await?;
        Ok(rows.iter().map(|row| row.get(0)).collect())
    }

    async fn apply_second_pass(
        &self,
        ids: &[i64],
        from: MessageStatus,
        to: MessageStatus,
    ) -> Result<u64, StoreError> {
        let updated = self
            .primary
            .execute(APPLY_SECOND_PASS_SQL, &[&to.as_str(), &ids, &from.as_str()])
            .await?;
        Ok(updated)
    }

    async fn set_autosend_status(
        &self,
        campaign_id: i64,
        status: AutosendStatus,
    ) -> Result<(), StoreError> {
        self.primary
            .execute(SET_AUTOSEND_STATUS_SQL, &[&campaign_id, &status.as_str()])
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_pass_query_for_plain_mark_has_no_filters() {
        let query = PgCampaignStore::second_pass_query(&SecondPassOptions::default());
        assert!(!query.contains("{filters}"));
        assert!(!query.contains("newer_contact"));
        assert!(!query.contains("make_interval"));
    }

    #[test]
    fn second_pass_query_appends_mark_exclusions() {
        let query = PgCampaignStore::second_pass_query(&SecondPassOptions {
            unmark: false,
            exclude_newer: true,
            exclude_age_in_hours: Some(24),
        });
        assert!(query.contains("newer_contact.cell = cc.cell"));
        assert!(query.contains("make_interval(hours => $5::int)"));
    }

    #[test]
    fn second_pass_query_for_unmark_requires_prior_message() {
        let query = PgCampaignStore::second_pass_query(&SecondPassOptions {
            unmark: true,
            exclude_newer: true,
            exclude_age_in_hours: Some(24),
        });
        // Mark-only exclusions never apply to unmark runs.
        assert!(query.contains("message.campaign_contact_id = cc.id"));
        assert!(!query.contains("newer_contact"));
        assert!(!query.contains("make_interval"));
    }
}
