use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{fmt, str::FromStr};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("Unknown message status: {0}")]
pub struct ParseMessageStatusError(String);

/// Per-contact messaging state driving which batch predicate applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageStatus {
    #[serde(rename = "needsMessage")]
    NeedsMessage,
    #[serde(rename = "needsResponse")]
    NeedsResponse,
    #[serde(rename = "convo")]
    Convo,
    #[serde(rename = "messaged")]
    Messaged,
    #[serde(rename = "closed")]
    Closed,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::NeedsMessage => "needsMessage",
            MessageStatus::NeedsResponse => "needsResponse",
            MessageStatus::Convo => "convo",
            MessageStatus::Messaged => "messaged",
            MessageStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageStatus {
    type Err = ParseMessageStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "needsMessage" => Ok(MessageStatus::NeedsMessage),
            "needsResponse" => Ok(MessageStatus::NeedsResponse),
            "convo" => Ok(MessageStatus::Convo),
            "messaged" => Ok(MessageStatus::Messaged),
            "closed" => Ok(MessageStatus::Closed),
            other => Err(ParseMessageStatusError(other.to_string())),
        }
    }
}

/// One uploaded contact of a campaign.
///
/// Ids are assigned in strict insertion order and never reused, which is
/// what makes the watermark walk sound.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactRecord {
    pub id: i64,
    pub campaign_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub cell: String,
    pub zip: String,
    pub external_id: Option<String>,
    pub message_status: MessageStatus,
    pub is_opted_out: bool,
    /// Serialized map of upload-time custom fields.
    pub custom_fields: Map<String, Value>,
    pub created_at: DateTime<Utc>,
}

/// A contact removed during list filtering, kept for export only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilteredContactRecord {
    pub id: i64,
    pub campaign_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub cell: String,
    pub zip: String,
    pub external_id: Option<String>,
    pub filtered_reason: String,
    pub custom_fields: Map<String, Value>,
}
