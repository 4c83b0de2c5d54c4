use serde::{Deserialize, Serialize};

/// One node of a campaign's scripted conversation tree. Only the question
/// text matters for exports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionStepRecord {
    pub id: i64,
    pub campaign_id: i64,
    pub question: String,
}
