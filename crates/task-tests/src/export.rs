#[cfg(test)]
mod tests {
    use crate::utils::{export_payload, harness, read_csv, seed_campaign};
    use model::jobs::ExportOptions;
    use model::records::contact::MessageStatus;
    use store::memory::{ContactSeed, FilteredContactSeed, MessageSeed};
    use tasks::export::run_export;
    use tracing_test::traced_test;

    const CONTACTS_ONLY: ExportOptions = ExportOptions {
        campaign: true,
        messages: false,
        opt_outs: false,
        filtered_contacts: false,
    };

    // Five contacts walked in chunks of two: three chunks, every contact
    // exactly once, no duplicates across chunk boundaries.
    #[traced_test]
    #[tokio::test]
    async fn contacts_artifact_covers_every_contact_exactly_once() {
        let h = harness(2);
        let (campaign_id, ids) = seed_campaign(&h.store, "Spring GOTV", 5, MessageStatus::Messaged);
        let requester = h.store.add_user("Ana", "Admin", "ana@example.org");

        let payload = export_payload(campaign_id, "Spring GOTV", requester, CONTACTS_ONLY);
        let artifacts = run_export(&h.ctx, &payload).await.unwrap();

        let key = h.uploads.keys().pop().unwrap();
        assert_eq!(
            artifacts.contacts_url.as_deref(),
            Some(format!("memory://{key}").as_str())
        );
        let (header, rows) = read_csv(&h.uploads.object(&key).unwrap());
        assert!(header.contains(&"contact[cell]".to_string()));
        assert_eq!(rows.len(), ids.len());
        let mut cells: Vec<&str> = rows.iter().map(|r| r["contact[cell]"].as_str()).collect();
        cells.sort_unstable();
        cells.dedup();
        assert_eq!(cells.len(), ids.len());

        // Contacts phase owns a quarter of the budget, offset by 25.
        assert_eq!(h.progress.reported(), vec![35, 45, 55]);
    }

    // Automated exports use a stable key and no timestamp, so re-running
    // the same job regenerates a byte-identical artifact.
    #[tokio::test]
    async fn rerun_of_an_automated_export_is_byte_identical() {
        let h = harness(2);
        let (campaign_id, _) = seed_campaign(&h.store, "Weekly Sync", 5, MessageStatus::Messaged);
        let requester = h.store.add_user("Ana", "Admin", "ana@example.org");

        let mut payload = export_payload(campaign_id, "Weekly Sync", requester, CONTACTS_ONLY);
        payload.is_automated_export = true;

        run_export(&h.ctx, &payload).await.unwrap();
        let key = h.uploads.keys().pop().unwrap();
        let first = h.uploads.object(&key).unwrap();

        run_export(&h.ctx, &payload).await.unwrap();
        let second = h.uploads.object(&key).unwrap();

        assert_eq!(h.uploads.keys().len(), 1);
        assert_eq!(first, second);
    }

    // A custom field present on any contact becomes a column for all of
    // them; contacts without the field get an empty cell.
    #[tokio::test]
    async fn custom_field_column_is_shared_but_sparsely_populated() {
        let h = harness(10);
        let campaign_id = h.store.add_campaign("Union Drive");
        let requester = h.store.add_user("Ana", "Admin", "ana@example.org");
        let mut custom_fields = serde_json::Map::new();
        custom_fields.insert("unionLocal".to_string(), serde_json::json!("77"));
        h.store.add_contact(
            campaign_id,
            ContactSeed {
                cell: "+15555550001".to_string(),
                custom_fields,
                ..Default::default()
            },
        );
        for n in 2..4 {
            h.store.add_contact(
                campaign_id,
                ContactSeed {
                    cell: format!("+1555555000{n}"),
                    ..Default::default()
                },
            );
        }

        let payload = export_payload(campaign_id, "Union Drive", requester, CONTACTS_ONLY);
        run_export(&h.ctx, &payload).await.unwrap();

        let key = h.uploads.keys().pop().unwrap();
        let (header, rows) = read_csv(&h.uploads.object(&key).unwrap());
        assert!(header.contains(&"contact[unionLocal]".to_string()));
        let values: Vec<&str> = rows
            .iter()
            .map(|r| r["contact[unionLocal]"].as_str())
            .collect();
        assert_eq!(values.iter().filter(|v| **v == "77").count(), 1);
        assert_eq!(values.iter().filter(|v| v.is_empty()).count(), 2);
    }

    #[tokio::test]
    async fn opt_outs_artifact_only_lists_opted_out_contacts() {
        let h = harness(10);
        let campaign_id = h.store.add_campaign("Opt Out Check");
        let requester = h.store.add_user("Ana", "Admin", "ana@example.org");
        h.store.add_contact(campaign_id, ContactSeed::default());
        h.store.add_contact(
            campaign_id,
            ContactSeed {
                cell: "+15555559999".to_string(),
                is_opted_out: true,
                ..Default::default()
            },
        );

        let payload = export_payload(
            campaign_id,
            "Opt Out Check",
            requester,
            ExportOptions {
                campaign: false,
                messages: false,
                opt_outs: true,
                filtered_contacts: false,
            },
        );
        let artifacts = run_export(&h.ctx, &payload).await.unwrap();
        assert!(artifacts.contacts_url.is_none());

        let key = h.uploads.keys().pop().unwrap();
        assert!(key.contains("-optouts"));
        let (_, rows) = read_csv(&h.uploads.object(&key).unwrap());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["contact[cell]"], "+15555559999");
    }

    #[tokio::test]
    async fn filtered_contacts_report_removed_status_and_reason() {
        let h = harness(10);
        let campaign_id = h.store.add_campaign("Landline Purge");
        let requester = h.store.add_user("Ana", "Admin", "ana@example.org");
        h.store.add_filtered_contact(
            campaign_id,
            FilteredContactSeed {
                filtered_reason: "LANDLINE".to_string(),
                ..Default::default()
            },
        );

        let payload = export_payload(
            campaign_id,
            "Landline Purge",
            requester,
            ExportOptions {
                campaign: false,
                messages: false,
                opt_outs: false,
                filtered_contacts: true,
            },
        );
        run_export(&h.ctx, &payload).await.unwrap();

        let key = h.uploads.keys().pop().unwrap();
        assert!(key.contains("-filteredContacts"));
        let (_, rows) = read_csv(&h.uploads.object(&key).unwrap());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["contact[messageStatus]"], "removed");
        assert_eq!(rows[0]["contact[filtered_reason]"], "LANDLINE");
    }

    #[tokio::test]
    async fn messages_artifact_carries_texter_and_variable_columns() {
        let h = harness(10);
        let campaign_id = h.store.add_campaign("Message Export");
        let requester = h.store.add_user("Ana", "Admin", "ana@example.org");
        let texter = h.store.add_user("Tess", "Texter", "tess@example.org");
        let variable_id =
            h.store
                .add_campaign_variable(campaign_id, "pollLocation", Some("City Hall"));
        let contact_id = h.store.add_contact(campaign_id, ContactSeed::default());
        h.store.add_message(
            contact_id,
            MessageSeed {
                user_id: Some(texter),
                text: "Polls open at 7".to_string(),
                campaign_variable_ids: vec![variable_id],
                ..Default::default()
            },
        );

        let payload = export_payload(
            campaign_id,
            "Message Export",
            requester,
            ExportOptions {
                campaign: false,
                messages: true,
                opt_outs: false,
                filtered_contacts: false,
            },
        );
        run_export(&h.ctx, &payload).await.unwrap();

        let key = h.uploads.keys().pop().unwrap();
        assert!(key.contains("-messages"));
        let (header, rows) = read_csv(&h.uploads.object(&key).unwrap());
        assert!(header.contains(&"campaignVariable[pollLocation]".to_string()));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["texter[email]"], "tess@example.org");
        assert_eq!(rows[0]["campaignVariable[pollLocation]"], "City Hall");
        assert_eq!(rows[0]["text"], "Polls open at 7");
    }

    #[tokio::test]
    async fn completion_email_links_exactly_the_produced_artifacts() {
        let h = harness(2);
        let (campaign_id, _) = seed_campaign(&h.store, "Email Check", 3, MessageStatus::Messaged);
        let requester = h.store.add_user("Ana", "Admin", "ana@example.org");

        let payload = export_payload(campaign_id, "Email Check", requester, CONTACTS_ONLY);
        let artifacts = run_export(&h.ctx, &payload).await.unwrap();

        let sent = h.mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "ana@example.org");
        assert!(sent[0].html.contains(artifacts.contacts_url.as_deref().unwrap()));
        assert!(!sent[0].html.contains("Opt-outs"));
    }

    #[tokio::test]
    async fn automated_exports_send_no_email() {
        let h = harness(2);
        let (campaign_id, _) = seed_campaign(&h.store, "Nightly", 3, MessageStatus::Messaged);
        let requester = h.store.add_user("Ana", "Admin", "ana@example.org");

        let mut payload = export_payload(campaign_id, "Nightly", requester, CONTACTS_ONLY);
        payload.is_automated_export = true;
        run_export(&h.ctx, &payload).await.unwrap();

        assert!(h.mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn empty_campaign_still_produces_a_header_only_artifact() {
        let h = harness(2);
        let campaign_id = h.store.add_campaign("Empty");
        let requester = h.store.add_user("Ana", "Admin", "ana@example.org");

        let payload = export_payload(campaign_id, "Empty", requester, CONTACTS_ONLY);
        let artifacts = run_export(&h.ctx, &payload).await.unwrap();
        assert!(artifacts.contacts_url.is_some());

        let key = h.uploads.keys().pop().unwrap();
        let (header, rows) = read_csv(&h.uploads.object(&key).unwrap());
        assert!(header.contains(&"campaignId".to_string()));
        assert!(rows.is_empty());
    }
}
