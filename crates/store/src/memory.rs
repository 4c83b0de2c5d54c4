//! In-memory [`CampaignStore`] with the same observable semantics as the
//! Postgres implementation. Ids are assigned in strict insertion order
//! across the whole store, matching the monotonic-id guarantee the chunk
//! walk relies on.

use crate::{campaign::CampaignStore, error::StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use model::{
    chunk::Watermark,
    export::{ContactExportRow, FilteredContactRow, MessageExportRow, QuestionResponse},
    jobs::SecondPassOptions,
    records::{
        campaign::{AutosendStatus, CampaignRecord, CampaignVariableRecord},
        contact::{ContactRecord, FilteredContactRecord, MessageStatus},
        interaction_step::InteractionStepRecord,
        message::MessageRecord,
        user::UserRecord,
    },
};
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

pub struct ContactSeed {
    pub first_name: String,
    pub last_name: String,
    pub cell: String,
    pub zip: String,
    pub external_id: Option<String>,
    pub message_status: MessageStatus,
    pub is_opted_out: bool,
    pub custom_fields: Map<String, Value>,
}

impl Default for ContactSeed {
    fn default() -> Self {
        ContactSeed {
            first_name: "Pat".to_string(),
            last_name: "Doe".to_string(),
            cell: "+15555550100".to_string(),
            zip: "02139".to_string(),
            external_id: None,
            message_status: MessageStatus::NeedsMessage,
            is_opted_out: false,
            custom_fields: Map::new(),
        }
    }
}

pub struct FilteredContactSeed {
    pub first_name: String,
    pub last_name: String,
    pub cell: String,
    pub zip: String,
    pub external_id: Option<String>,
    pub filtered_reason: String,
    pub custom_fields: Map<String, Value>,
}

impl Default for FilteredContactSeed {
    fn default() -> Self {
        FilteredContactSeed {
            first_name: "Pat".to_string(),
            last_name: "Doe".to_string(),
            cell: "+15555550100".to_string(),
            zip: "02139".to_string(),
            external_id: None,
            filtered_reason: "INVALID".to_string(),
            custom_fields: Map::new(),
        }
    }
}

pub struct MessageSeed {
    pub user_id: Option<i64>,
    pub user_number: String,
    pub is_from_contact: bool,
    pub text: String,
    pub send_status: String,
    pub error_codes: Vec<String>,
    pub campaign_variable_ids: Vec<i64>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Default for MessageSeed {
    fn default() -> Self {
        MessageSeed {
            user_id: None,
            user_number: "+15555550001".to_string(),
            is_from_contact: false,
            text: "Hello!".to_string(),
            send_status: "DELIVERED".to_string(),
            error_codes: Vec::new(),
            campaign_variable_ids: Vec::new(),
            created_at: None,
        }
    }
}

#[derive(Default)]
struct Inner {
    next_id: i64,
    campaigns: Vec<CampaignRecord>,
    contacts: Vec<ContactRecord>,
    filtered: Vec<FilteredContactRecord>,
    messages: Vec<MessageRecord>,
    users: Vec<UserRecord>,
    steps: Vec<InteractionStepRecord>,
    variables: Vec<CampaignVariableRecord>,
    /// (campaign_contact_id, interaction_step_id, value)
    responses: Vec<(i64, i64, String)>,
    /// (campaign_contact_id, tag title)
    tags: Vec<(i64, String)>,
    /// zip -> (city, state)
    zips: HashMap<String, (String, String)>,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn city_state(&self, zip: &str) -> (Option<String>, Option<String>) {
        match self.zips.get(zip) {
            Some((city, state)) => (Some(city.clone()), Some(state.clone())),
            None => (None, None),
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    pub fn add_campaign(&self, title: &str) -> i64 {
        let mut inner = self.inner.write().unwrap();
        let id = inner.next_id();
        inner.campaigns.push(CampaignRecord {
            id,
            title: title.to_string(),
            contacts_count: 0,
            autosend_status: AutosendStatus::Complete,
        });
        id
    }

    pub fn add_user(&self, first_name: &str, last_name: &str, email: &str) -> i64 {
        let mut inner = self.inner.write().unwrap();
        let id = inner.next_id();
        inner.users.push(UserRecord {
            id,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: email.to_string(),
            cell: "+15555550001".to_string(),
        });
        id
    }

    pub fn add_contact(&self, campaign_id: i64, seed: ContactSeed) -> i64 {
        let mut inner = self.inner.write().unwrap();
        let id = inner.next_id();
        inner.contacts.push(ContactRecord {
            id,
            campaign_id,
            first_name: seed.first_name,
            last_name: seed.last_name,
            cell: seed.cell,
            zip: seed.zip,
            external_id: seed.external_id,
            message_status: seed.message_status,
            is_opted_out: seed.is_opted_out,
            custom_fields: seed.custom_fields,
            created_at: Utc::now(),
        });
        if let Some(campaign) = inner.campaigns.iter_mut().find(|c| c.id == campaign_id) {
            campaign.contacts_count += 1;
        }
        id
    }

    pub fn add_filtered_contact(&self, campaign_id: i64, seed: FilteredContactSeed) -> i64 {
        let mut inner = self.inner.write().unwrap();
        let id = inner.next_id();
        inner.filtered.push(FilteredContactRecord {
            id,
            campaign_id,
            first_name: seed.first_name,
            last_name: seed.last_name,
            cell: seed.cell,
            zip: seed.zip,
            external_id: seed.external_id,
            filtered_reason: seed.filtered_reason,
            custom_fields: seed.custom_fields,
        });
        id
    }

    pub fn add_message(&self, campaign_contact_id: i64, seed: MessageSeed) -> i64 {
        let mut inner = self.inner.write().unwrap();
        let contact_number = inner
            .contacts
            .iter()
            .find(|c| c.id == campaign_contact_id)
            .map(|c| c.cell.clone())
            .unwrap_or_default();
        let id = inner.next_id();
        inner.messages.push(MessageRecord {
            id,
            campaign_contact_id,
            assignment_id: None,
            user_id: seed.user_id,
            user_number: seed.user_number,
            contact_number,
            is_from_contact: seed.is_from_contact,
            text: seed.text,
            send_status: seed.send_status,
            error_codes: seed.error_codes,
            num_segments: Some(1),
            num_media: Some(0),
            campaign_variable_ids: seed.campaign_variable_ids,
            created_at: seed.created_at.unwrap_or_else(Utc::now),
        });
        id
    }

    pub fn add_interaction_step(&self, campaign_id: i64, question: &str) -> i64 {
        let mut inner = self.inner.write().unwrap();
        let id = inner.next_id();
        inner.steps.push(InteractionStepRecord {
            id,
            campaign_id,
            question: question.to_string(),
        });
        id
    }

    pub fn add_question_response(&self, campaign_contact_id: i64, step_id: i64, value: &str) {
        let mut inner = self.inner.write().unwrap();
        inner
            .responses
            .push((campaign_contact_id, step_id, value.to_string()));
    }

    pub fn add_tag(&self, campaign_contact_id: i64, title: &str) {
        let mut inner = self.inner.write().unwrap();
        inner.tags.push((campaign_contact_id, title.to_string()));
    }

    pub fn add_campaign_variable(&self, campaign_id: i64, name: &str, value: Option<&str>) -> i64 {
        let mut inner = self.inner.write().unwrap();
        let id = inner.next_id();
        inner.variables.push(CampaignVariableRecord {
            id,
            campaign_id,
            name: name.to_string(),
            value: value.map(str::to_string),
        });
        id
    }

    pub fn set_zip(&self, zip: &str, city: &str, state: &str) {
        let mut inner = self.inner.write().unwrap();
        inner
            .zips
            .insert(zip.to_string(), (city.to_string(), state.to_string()));
    }

    pub fn contact_status(&self, contact_id: i64) -> Option<MessageStatus> {
        let inner = self.inner.read().unwrap();
        inner
            .contacts
            .iter()
            .find(|c| c.id == contact_id)
            .map(|c| c.message_status)
    }

    pub fn campaign(&self, campaign_id: i64) -> Option<CampaignRecord> {
        let inner = self.inner.read().unwrap();
        inner.campaigns.iter().find(|c| c.id == campaign_id).cloned()
    }

    fn contact_has_message(inner: &Inner, contact_id: i64) -> bool {
        inner
            .messages
            .iter()
            .any(|m| m.campaign_contact_id == contact_id)
    }
}

#[async_trait]
impl CampaignStore for MemoryStore {
    async fn contact_count(&self, campaign_id: i64) -> Result<u64, StoreError> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .contacts
            .iter()
            .filter(|c| c.campaign_id == campaign_id)
            .count() as u64)
    }

    async fn filtered_contact_count(&self, campaign_id: i64) -> Result<u64, StoreError> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .filtered
            .iter()
            .filter(|c| c.campaign_id == campaign_id)
            .count() as u64)
    }

    async fn notification_email(&self, requester_id: i64) -> Result<String, StoreError> {
        let inner = self.inner.read().unwrap();
        inner
            .users
            .iter()
            .find(|u| u.id == requester_id)
            .map(|u| u.email.clone())
            .ok_or_else(|| StoreError::NotFound(format!("user {requester_id}")))
    }

    async fn interaction_steps(
        &self,
        campaign_id: i64,
    ) -> Result<Vec<InteractionStepRecord>, StoreError> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .steps
            .iter()
            .filter(|s| s.campaign_id == campaign_id)
            .cloned()
            .collect())
    }

    async fn campaign_variable_names(&self, campaign_id: i64) -> Result<Vec<String>, StoreError> {
        let inner = self.inner.read().unwrap();
        let names: BTreeSet<String> = inner
            .variables
            .iter()
            .filter(|v| v.campaign_id == campaign_id)
            .map(|v| v.name.clone())
            .collect();
        Ok(names.into_iter().collect())
    }

    async fn custom_field_keys(&self, campaign_id: i64) -> Result<Vec<String>, StoreError> {
        let inner = self.inner.read().unwrap();
        let mut keys = BTreeSet::new();
        for contact in inner.contacts.iter().filter(|c| c.campaign_id == campaign_id) {
            keys.extend(contact.custom_fields.keys().cloned());
        }
        for contact in inner.filtered.iter().filter(|c| c.campaign_id == campaign_id) {
            keys.extend(contact.custom_fields.keys().cloned());
        }
        Ok(keys.into_iter().collect())
    }

    async fn fetch_contact_chunk(
        &self,
        campaign_id: i64,
        watermark: Watermark,
        limit: u64,
        only_opt_outs: bool,
    ) -> Result<Vec<ContactExportRow>, StoreError> {
        let inner = self.inner.read().unwrap();
        let mut matching: Vec<&ContactRecord> = inner
            .contacts
            .iter()
            .filter(|c| {
                c.campaign_id == campaign_id
                    && c.id > watermark.value()
                    && (!only_opt_outs || c.is_opted_out)
            })
            .collect();
        matching.sort_by_key(|c| c.id);
        matching.truncate(limit as usize);

        Ok(matching
            .into_iter()
            .map(|contact| {
                let (city, state) = inner.city_state(&contact.zip);
                let responses = inner
                    .responses
                    .iter()
                    .filter(|(contact_id, _, _)| *contact_id == contact.id)
                    .map(|(_, step_id, value)| QuestionResponse {
                        interaction_step_id: *step_id,
                        value: value.clone(),
                    })
                    .collect();
                let mut tag_titles: Vec<String> = inner
                    .tags
                    .iter()
                    .filter(|(contact_id, _)| *contact_id == contact.id)
                    .map(|(_, title)| title.clone())
                    .collect();
                tag_titles.sort();
                ContactExportRow {
                    contact: contact.clone(),
                    city,
                    state,
                    responses,
                    tag_titles,
                }
            })
            .collect())
    }

    async fn fetch_message_chunk(
        &self,
        campaign_id: i64,
        watermark: Watermark,
        limit: u64,
    ) -> Result<Vec<MessageExportRow>, StoreError> {
        let inner = self.inner.read().unwrap();
        let mut contact_ids: Vec<i64> = inner
            .contacts
            .iter()
            .filter(|c| {
                c.campaign_id == campaign_id
                    && c.id > watermark.value()
                    && MemoryStore::contact_has_message(&inner, c.id)
            })
            .map(|c| c.id)
            .collect();
        contact_ids.sort_unstable();
        contact_ids.truncate(limit as usize);

        let mut rows = Vec::new();
        for contact_id in contact_ids {
            let mut messages: Vec<&MessageRecord> = inner
                .messages
                .iter()
                .filter(|m| m.campaign_contact_id == contact_id)
                .collect();
            messages.sort_by_key(|m| m.created_at);

            for message in messages {
                let sender = message
                    .user_id
                    .and_then(|user_id| inner.users.iter().find(|u| u.id == user_id));
                let campaign_variables = message
                    .campaign_variable_ids
                    .iter()
                    .filter_map(|variable_id| {
                        inner.variables.iter().find(|v| v.id == *variable_id)
                    })
                    .map(|v| (v.name.clone(), v.value.clone().unwrap_or_default()))
                    .collect();
                rows.push(MessageExportRow {
                    campaign_contact_id: contact_id,
                    assignment_id: message.assignment_id,
                    user_number: message.user_number.clone(),
                    contact_number: message.contact_number.clone(),
                    is_from_contact: message.is_from_contact,
                    text: message.text.clone(),
                    send_status: message.send_status.clone(),
                    error_codes: message.error_codes.join("|"),
                    num_segments: message.num_segments,
                    num_media: message.num_media,
                    created_at: message.created_at,
                    texter_first_name: sender.map(|u| u.first_name.clone()),
                    texter_last_name: sender.map(|u| u.last_name.clone()),
                    texter_email: sender.map(|u| u.email.clone()),
                    texter_cell: sender.map(|u| u.cell.clone()),
                    campaign_variables,
                });
            }
        }
        Ok(rows)
    }

    async fn fetch_filtered_chunk(
        &self,
        campaign_id: i64,
        watermark: Watermark,
        limit: u64,
    ) -> Result<Vec<FilteredContactRow>, StoreError> {
        let inner = self.inner.read().unwrap();
        let mut matching: Vec<&FilteredContactRecord> = inner
            .filtered
            .iter()
            .filter(|c| c.campaign_id == campaign_id && c.id > watermark.value())
            .collect();
        matching.sort_by_key(|c| c.id);
        matching.truncate(limit as usize);

        Ok(matching
            .into_iter()
            .map(|contact| {
                let (city, state) = inner.city_state(&contact.zip);
                FilteredContactRow {
                    contact: contact.clone(),
                    city,
                    state,
                }
            })
            .collect())
    }

    async fn select_second_pass_chunk(
        &self,
        campaign_id: i64,
        watermark: Watermark,
        limit: u64,
        options: &SecondPassOptions,
    ) -> Result<Vec<i64>, StoreError> {
        let inner = self.inner.read().unwrap();
        let status = if options.unmark {
            MessageStatus::NeedsMessage
        } else {
            MessageStatus::Messaged
        };
        let recency_floor = options
            .exclude_age_in_hours
            .map(|hours| Utc::now() - chrono::Duration::hours(hours));

        let mut ids: Vec<i64> = inner
            .contacts
            .iter()
            .filter(|c| {
                if c.campaign_id != campaign_id
                    || c.id <= watermark.value()
                    || c.message_status != status
                {
                    return false;
                }
                if options.unmark {
                    return MemoryStore::contact_has_message(&inner, c.id);
                }
                if options.exclude_newer {
                    let has_newer = inner
                        .contacts
                        .iter()
                        .any(|other| other.cell == c.cell && other.id > c.id);
                    if has_newer {
                        return false;
                    }
                }
                if let Some(floor) = recency_floor {
                    let texted_recently = inner.messages.iter().any(|m| {
                        m.campaign_contact_id == c.id && m.created_at > floor
                    });
                    if texted_recently {
                        return false;
                    }
                }
                true
            })
            .map(|c| c.id)
            .collect();
        ids.sort_unstable();
        ids.truncate(limit as usize);
        Ok(ids)
    }

    async fn apply_second_pass(
        &self,
        ids: &[i64],
        from: MessageStatus,
        to: MessageStatus,
    ) -> Result<u64, StoreError> {
        let mut inner = self.inner.write().unwrap();
        let mut updated = 0;
        for contact in inner.contacts.iter_mut() {
            if ids.contains(&contact.id) && contact.message_status == from {
                contact.message_status = to;
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn set_autosend_status(
        &self,
        campaign_id: i64,
        status: AutosendStatus,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().unwrap();
        let campaign = inner
            .campaigns
            .iter_mut()
            .find(|c| c.id == campaign_id)
            .ok_or_else(|| StoreError::NotFound(format!("campaign {campaign_id}")))?;
        campaign.autosend_status = status;
        Ok(())
    }
}
