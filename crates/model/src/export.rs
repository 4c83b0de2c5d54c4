//! Read models returned by chunk fetches for the export pipeline.

use crate::records::contact::{ContactRecord, FilteredContactRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A contact's answer to one interaction step. Responses are mapped back to
/// export columns by step id, never by question text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionResponse {
    pub interaction_step_id: i64,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactExportRow {
    pub contact: ContactRecord,
    pub city: Option<String>,
    pub state: Option<String>,
    pub responses: Vec<QuestionResponse>,
    pub tag_titles: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilteredContactRow {
    pub contact: FilteredContactRecord,
    pub city: Option<String>,
    pub state: Option<String>,
}

/// One outbound or inbound message flattened with its texter identity and
/// the variable snapshot captured when the body was rendered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageExportRow {
    pub campaign_contact_id: i64,
    pub assignment_id: Option<i64>,
    pub user_number: String,
    pub contact_number: String,
    pub is_from_contact: bool,
    pub text: String,
    pub send_status: String,
    /// Delivery error codes, pipe-joined as stored for export.
    pub error_codes: String,
    pub num_segments: Option<i32>,
    pub num_media: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub texter_first_name: Option<String>,
    pub texter_last_name: Option<String>,
    pub texter_email: Option<String>,
    pub texter_cell: Option<String>,
    pub campaign_variables: HashMap<String, String>,
}
