//! Row-to-model decoding for the chunk queries.

use crate::error::StoreError;
use model::export::{ContactExportRow, FilteredContactRow, MessageExportRow, QuestionResponse};
use model::records::contact::{ContactRecord, FilteredContactRecord, MessageStatus};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tokio_postgres::Row;

fn custom_fields(value: Value) -> Result<Map<String, Value>, StoreError> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(StoreError::Decode(format!(
            "custom_fields is not an object: {other}"
        ))),
    }
}

fn message_status(raw: &str) -> Result<MessageStatus, StoreError> {
    raw.parse::<MessageStatus>()
        .map_err(|e| StoreError::Decode(e.to_string()))
}

pub(crate) fn contact_export_row(row: &Row) -> Result<ContactExportRow, StoreError> {
    let responses: Vec<QuestionResponse> = serde_json::from_value(row.get("responses"))
        .map_err(|e| StoreError::Decode(format!("responses: {e}")))?;

    Ok(ContactExportRow {
        contact: ContactRecord {
            id: row.get("id"),
            campaign_id: row.get("campaign_id"),
            first_name: row.get("first_name"),
            last_name: row.get("last_name"),
            cell: row.get("cell"),
            zip: row.get("zip"),
            external_id: row.get("external_id"),
            message_status: message_status(row.get("message_status"))?,
            is_opted_out: row.get("is_opted_out"),
            custom_fields: custom_fields(row.get("custom_fields"))?,
            created_at: row.get("created_at"),
        },
        city: row.get("city"),
        state: row.get("state"),
        responses,
        tag_titles: row.get("tag_titles"),
    })
}

pub(crate) fn filtered_contact_row(row: &Row) -> Result<FilteredContactRow, StoreError> {
    Ok(FilteredContactRow {
        contact: FilteredContactRecord {
            id: row.get("id"),
            campaign_id: row.get("campaign_id"),
            first_name: row.get("first_name"),
            last_name: row.get("last_name"),
            cell: row.get("cell"),
            zip: row.get("zip"),
            external_id: row.get("external_id"),
            filtered_reason: row.get("filtered_reason"),
            custom_fields: custom_fields(row.get("custom_fields"))?,
        },
        city: row.get("city"),
        state: row.get("state"),
    })
}

pub(crate) fn message_export_row(row: &Row) -> Result<MessageExportRow, StoreError> {
    let variables: Value = row.get("campaign_variables");
    let campaign_variables: HashMap<String, String> = match variables {
        Value::Object(map) => map
            .into_iter()
            .map(|(name, value)| {
                let value = match value {
                    Value::String(s) => s,
                    Value::Null => String::new(),
                    other => other.to_string(),
                };
                (name, value)
            })
            .collect(),
        Value::Null => HashMap::new(),
        other => {
            return Err(StoreError::Decode(format!(
                "campaign_variables is not an object: {other}"
            )));
        }
    };

    Ok(MessageExportRow {
        campaign_contact_id: row.get("campaign_contact_id"),
        assignment_id: row.get("assignment_id"),
        user_number: row.get("user_number"),
        contact_number: row.get("contact_number"),
        is_from_contact: row.get("is_from_contact"),
        text: row.get("text"),
        send_status: row.get("send_status"),
        error_codes: row.get("error_codes"),
        num_segments: row.get("num_segments"),
        num_media: row.get("num_media"),
        created_at: row.get("created_at"),
        texter_first_name: row.get("first_name"),
        texter_last_name: row.get("last_name"),
        texter_email: row.get("email"),
        texter_cell: row.get("sender_cell"),
        campaign_variables,
    })
}
