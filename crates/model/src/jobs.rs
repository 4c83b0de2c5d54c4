//! Payloads consumed from the external job queue.
//!
//! Field names are camelCase on the wire so payloads enqueued by the API
//! layer deserialize unchanged.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportOptions {
    pub campaign: bool,
    pub messages: bool,
    pub opt_outs: bool,
    pub filtered_contacts: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportCampaignPayload {
    pub campaign_id: i64,
    pub campaign_title: String,
    pub requester_id: i64,
    #[serde(default)]
    pub is_automated_export: bool,
    pub options: ExportOptions,
}

/// Filters applied when selecting second-pass candidates.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecondPassOptions {
    /// Reverse an earlier mark run instead of marking.
    #[serde(default)]
    pub unmark: bool,
    /// Skip contacts whose cell also appears on a newer campaign contact.
    #[serde(default)]
    pub exclude_newer: bool,
    /// Skip contacts texted within this many hours.
    #[serde(default)]
    pub exclude_age_in_hours: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkSecondPassPayload {
    pub campaign_id: i64,
    pub campaign_title: String,
    pub organization_id: i64,
    pub requester_id: i64,
    #[serde(flatten)]
    pub options: SecondPassOptions,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_payload_deserializes_queue_shape() {
        let payload: ExportCampaignPayload = serde_json::from_str(
            r#"{
                "campaignId": 7,
                "campaignTitle": "GOTV Phase 2",
                "requesterId": 3,
                "options": {
                    "campaign": true,
                    "messages": false,
                    "optOuts": true,
                    "filteredContacts": false
                }
            }"#,
        )
        .unwrap();
        assert_eq!(payload.campaign_id, 7);
        assert!(!payload.is_automated_export);
        assert!(payload.options.opt_outs);
        assert!(!payload.options.filtered_contacts);
    }

    #[test]
    fn second_pass_payload_flattens_options() {
        let payload: MarkSecondPassPayload = serde_json::from_str(
            r#"{
                "campaignId": 7,
                "campaignTitle": "GOTV Phase 2",
                "organizationId": 1,
                "requesterId": 3,
                "unmark": false,
                "excludeNewer": true,
                "excludeAgeInHours": 24
            }"#,
        )
        .unwrap();
        assert!(payload.options.exclude_newer);
        assert_eq!(payload.options.exclude_age_in_hours, Some(24));
    }
}
