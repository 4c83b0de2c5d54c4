use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("Unknown autosend status: {0}")]
pub struct ParseAutosendStatusError(String);

/// Campaign-level state machine governing automated message dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AutosendStatus {
    #[serde(rename = "unstarted")]
    Unstarted,
    #[serde(rename = "sending")]
    Sending,
    #[serde(rename = "paused")]
    Paused,
    #[serde(rename = "complete")]
    Complete,
}

impl AutosendStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AutosendStatus::Unstarted => "unstarted",
            AutosendStatus::Sending => "sending",
            AutosendStatus::Paused => "paused",
            AutosendStatus::Complete => "complete",
        }
    }
}

impl fmt::Display for AutosendStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AutosendStatus {
    type Err = ParseAutosendStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unstarted" => Ok(AutosendStatus::Unstarted),
            "sending" => Ok(AutosendStatus::Sending),
            "paused" => Ok(AutosendStatus::Paused),
            "complete" => Ok(AutosendStatus::Complete),
            other => Err(ParseAutosendStatusError(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignRecord {
    pub id: i64,
    pub title: String,
    /// Denormalized count of contacts uploaded to the campaign.
    pub contacts_count: u64,
    pub autosend_status: AutosendStatus,
}

/// A named variable usable in campaign message scripts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignVariableRecord {
    pub id: i64,
    pub campaign_id: i64,
    pub name: String,
    pub value: Option<String>,
}
