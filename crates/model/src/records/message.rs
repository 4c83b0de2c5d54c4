use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: i64,
    pub campaign_contact_id: i64,
    pub assignment_id: Option<i64>,
    pub user_id: Option<i64>,
    pub user_number: String,
    pub contact_number: String,
    pub is_from_contact: bool,
    pub text: String,
    pub send_status: String,
    pub error_codes: Vec<String>,
    pub num_segments: Option<i32>,
    pub num_media: Option<i32>,
    /// Campaign variables referenced when the message body was rendered.
    pub campaign_variable_ids: Vec<i64>,
    pub created_at: DateTime<Utc>,
}
