//! Flattens fetched rows into wide tabular records with dynamic columns.
//!
//! Column schemas are derived once per export phase from campaign-level
//! metadata (custom field keys, interaction steps, variable names) so every
//! chunk writes into an identical header.

use model::export::{ContactExportRow, FilteredContactRow, MessageExportRow};
use model::records::interaction_step::InteractionStepRecord;
use serde_json::Value;
use std::collections::HashMap;

/// A shaped record, keyed by column name. The stream writer renders it
/// against the phase's fixed column order.
pub type ExportRow = HashMap<String, String>;

const CONTACT_COLUMNS: &[&str] = &[
    "campaignId",
    "campaign",
    "contact[firstName]",
    "contact[lastName]",
    "contact[cell]",
    "contact[zip]",
    "contact[city]",
    "contact[state]",
    "contact[messageStatus]",
    "contact[external_id]",
];

const MESSAGE_COLUMNS: &[&str] = &[
    "assignmentId",
    "userNumber",
    "contactNumber",
    "isFromContact",
    "numSegments",
    "numMedia",
    "sendStatus",
    "errorCodes",
    "attemptedAt",
    "text",
    "campaignId",
    "texter[firstName]",
    "texter[lastName]",
    "texter[email]",
    "texter[cell]",
];

/// Map from interaction step id to its export column name.
///
/// Steps sharing identical question text are disambiguated with an
/// incrementing suffix in first-seen order; the first occurrence keeps the
/// bare text. Responses are matched to columns via step id, so duplicated
/// text never misroutes a value.
pub fn unique_questions_by_step_id(steps: &[InteractionStepRecord]) -> Vec<(i64, String)> {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    steps
        .iter()
        .filter(|step| !step.question.trim().is_empty())
        .map(|step| {
            let question = step.question.trim();
            let occurrence = seen.entry(question).or_insert(0);
            *occurrence += 1;
            let column = if *occurrence == 1 {
                question.to_string()
            } else {
                format!("{question}_{occurrence}")
            };
            (step.id, column)
        })
        .collect()
}

pub fn contact_columns(custom_field_keys: &[String], questions: &[(i64, String)]) -> Vec<String> {
    let mut columns: Vec<String> = CONTACT_COLUMNS.iter().map(|c| c.to_string()).collect();
    columns.extend(custom_field_keys.iter().map(|key| format!("contact[{key}]")));
    columns.extend(
        questions
            .iter()
            .map(|(_, question)| format!("question[{question}]")),
    );
    columns.push("tags".to_string());
    columns
}

pub fn filtered_contact_columns(custom_field_keys: &[String]) -> Vec<String> {
    let mut columns: Vec<String> = CONTACT_COLUMNS.iter().map(|c| c.to_string()).collect();
    columns.push("contact[filtered_reason]".to_string());
    columns.extend(custom_field_keys.iter().map(|key| format!("contact[{key}]")));
    columns
}

pub fn message_columns(campaign_variable_names: &[String]) -> Vec<String> {
    let mut columns: Vec<String> = MESSAGE_COLUMNS.iter().map(|c| c.to_string()).collect();
    columns.extend(
        campaign_variable_names
            .iter()
            .map(|name| format!("campaignVariable[{name}]")),
    );
    columns
}

fn render_custom_field(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

pub fn shape_contact_row(
    row: &ContactExportRow,
    campaign_id: i64,
    campaign_title: &str,
    questions: &[(i64, String)],
) -> ExportRow {
    let contact = &row.contact;
    let mut shaped = ExportRow::new();
    shaped.insert("campaignId".to_string(), campaign_id.to_string());
    shaped.insert("campaign".to_string(), campaign_title.to_string());
    shaped.insert("contact[firstName]".to_string(), contact.first_name.clone());
    shaped.insert("contact[lastName]".to_string(), contact.last_name.clone());
    shaped.insert("contact[cell]".to_string(), contact.cell.clone());
    shaped.insert("contact[zip]".to_string(), contact.zip.clone());
    shaped.insert("contact[city]".to_string(), row.city.clone().unwrap_or_default());
    shaped.insert(
        "contact[state]".to_string(),
        row.state.clone().unwrap_or_default(),
    );
    shaped.insert(
        "contact[messageStatus]".to_string(),
        contact.message_status.as_str().to_string(),
    );
    shaped.insert(
        "contact[external_id]".to_string(),
        contact.external_id.clone().unwrap_or_default(),
    );

    for (key, value) in &contact.custom_fields {
        shaped.insert(format!("contact[{key}]"), render_custom_field(value));
    }

    for (step_id, question) in questions {
        let value = row
            .responses
            .iter()
            .find(|response| response.interaction_step_id == *step_id)
            .map(|response| response.value.clone())
            .unwrap_or_default();
        shaped.insert(format!("question[{question}]"), value);
    }

    shaped.insert("tags".to_string(), row.tag_titles.join("|"));
    shaped
}

pub fn shape_filtered_contact_row(
    row: &FilteredContactRow,
    campaign_id: i64,
    campaign_title: &str,
) -> ExportRow {
    let contact = &row.contact;
    let mut shaped = ExportRow::new();
    shaped.insert("campaignId".to_string(), campaign_id.to_string());
    shaped.insert("campaign".to_string(), campaign_title.to_string());
    shaped.insert("contact[firstName]".to_string(), contact.first_name.clone());
    shaped.insert("contact[lastName]".to_string(), contact.last_name.clone());
    shaped.insert("contact[cell]".to_string(), contact.cell.clone());
    shaped.insert("contact[zip]".to_string(), contact.zip.clone());
    shaped.insert("contact[city]".to_string(), row.city.clone().unwrap_or_default());
    shaped.insert(
        "contact[state]".to_string(),
        row.state.clone().unwrap_or_default(),
    );
    // Removed contacts have no live message status.
    shaped.insert("contact[messageStatus]".to_string(), "removed".to_string());
    shaped.insert(
        "contact[external_id]".to_string(),
        contact.external_id.clone().unwrap_or_default(),
    );
    shaped.insert(
        "contact[filtered_reason]".to_string(),
        contact.filtered_reason.clone(),
    );

    for (key, value) in &contact.custom_fields {
        shaped.insert(format!("contact[{key}]"), render_custom_field(value));
    }
    shaped
}

pub fn shape_message_row(
    row: &MessageExportRow,
    campaign_id: i64,
    campaign_variable_names: &[String],
) -> ExportRow {
    let mut shaped = ExportRow::new();
    shaped.insert(
        "assignmentId".to_string(),
        row.assignment_id.map(|id| id.to_string()).unwrap_or_default(),
    );
    shaped.insert("userNumber".to_string(), row.user_number.clone());
    shaped.insert("contactNumber".to_string(), row.contact_number.clone());
    shaped.insert("isFromContact".to_string(), row.is_from_contact.to_string());
    shaped.insert(
        "numSegments".to_string(),
        row.num_segments.map(|n| n.to_string()).unwrap_or_default(),
    );
    shaped.insert(
        "numMedia".to_string(),
        row.num_media.map(|n| n.to_string()).unwrap_or_default(),
    );
    shaped.insert("sendStatus".to_string(), row.send_status.clone());
    shaped.insert("errorCodes".to_string(), row.error_codes.clone());
    shaped.insert("attemptedAt".to_string(), row.created_at.to_rfc3339());
    shaped.insert("text".to_string(), row.text.clone());
    shaped.insert("campaignId".to_string(), campaign_id.to_string());
    shaped.insert(
        "texter[firstName]".to_string(),
        row.texter_first_name.clone().unwrap_or_default(),
    );
    shaped.insert(
        "texter[lastName]".to_string(),
        row.texter_last_name.clone().unwrap_or_default(),
    );
    shaped.insert(
        "texter[email]".to_string(),
        row.texter_email.clone().unwrap_or_default(),
    );
    shaped.insert(
        "texter[cell]".to_string(),
        row.texter_cell.clone().unwrap_or_default(),
    );

    for name in campaign_variable_names {
        let value = row.campaign_variables.get(name).cloned().unwrap_or_default();
        shaped.insert(format!("campaignVariable[{name}]"), value);
    }
    shaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::export::QuestionResponse;
    use model::records::contact::{ContactRecord, MessageStatus};
    use serde_json::Map;

    fn step(id: i64, question: &str) -> InteractionStepRecord {
        InteractionStepRecord {
            id,
            campaign_id: 1,
            question: question.to_string(),
        }
    }

    #[test]
    fn duplicate_questions_get_incrementing_suffixes_in_first_seen_order() {
        let steps = vec![
            step(10, "Will you vote?"),
            step(11, ""),
            step(12, "Will you vote?"),
            step(13, "Need a ride?"),
            step(14, "Will you vote?"),
        ];
        let questions = unique_questions_by_step_id(&steps);
        assert_eq!(
            questions,
            vec![
                (10, "Will you vote?".to_string()),
                (12, "Will you vote?_2".to_string()),
                (13, "Need a ride?".to_string()),
                (14, "Will you vote?_3".to_string()),
            ]
        );
    }

    #[test]
    fn responses_map_back_by_step_id_not_text() {
        let steps = vec![step(10, "Will you vote?"), step(12, "Will you vote?")];
        let questions = unique_questions_by_step_id(&steps);

        let mut custom_fields = Map::new();
        custom_fields.insert("unionLocal".to_string(), serde_json::json!("77"));
        let row = ContactExportRow {
            contact: ContactRecord {
                id: 1,
                campaign_id: 1,
                first_name: "Sam".to_string(),
                last_name: "Lee".to_string(),
                cell: "+15555550100".to_string(),
                zip: "02139".to_string(),
                external_id: None,
                message_status: MessageStatus::Messaged,
                is_opted_out: false,
                custom_fields,
                created_at: chrono::Utc::now(),
            },
            city: Some("Cambridge".to_string()),
            state: Some("MA".to_string()),
            responses: vec![QuestionResponse {
                interaction_step_id: 12,
                value: "yes".to_string(),
            }],
            tag_titles: vec!["volunteer".to_string(), "warm".to_string()],
        };

        let shaped = shape_contact_row(&row, 1, "Test Campaign", &questions);
        assert_eq!(shaped["question[Will you vote?]"], "");
        assert_eq!(shaped["question[Will you vote?_2]"], "yes");
        assert_eq!(shaped["contact[unionLocal]"], "77");
        assert_eq!(shaped["tags"], "volunteer|warm");
        assert_eq!(shaped["contact[messageStatus]"], "messaged");
    }

    #[test]
    fn message_row_defaults_missing_variables_to_empty() {
        let names = vec!["firstName".to_string(), "pollLocation".to_string()];
        let row = MessageExportRow {
            campaign_contact_id: 1,
            assignment_id: Some(9),
            user_number: "+15555550001".to_string(),
            contact_number: "+15555550100".to_string(),
            is_from_contact: false,
            text: "Hi!".to_string(),
            send_status: "SENT".to_string(),
            error_codes: "30007|30008".to_string(),
            num_segments: Some(1),
            num_media: Some(0),
            created_at: chrono::Utc::now(),
            texter_first_name: Some("Ana".to_string()),
            texter_last_name: None,
            texter_email: None,
            texter_cell: None,
            campaign_variables: [("firstName".to_string(), "Sam".to_string())]
                .into_iter()
                .collect(),
        };
        let shaped = shape_message_row(&row, 1, &names);
        assert_eq!(shaped["campaignVariable[firstName]"], "Sam");
        assert_eq!(shaped["campaignVariable[pollLocation]"], "");
        assert_eq!(shaped["errorCodes"], "30007|30008");
    }
}
