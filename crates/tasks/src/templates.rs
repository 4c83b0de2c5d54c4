//! HTML bodies for completion notifications.

use crate::export::ExportArtifacts;

pub fn export_content(artifacts: &ExportArtifacts, campaign_title: &str) -> String {
    let mut links = String::new();
    let mut link = |label: &str, url: &Option<String>| {
        if let Some(url) = url {
            links.push_str(&format!("<li><a href=\"{url}\">{label}</a></li>\n"));
        }
    };
    link("Campaign contacts", &artifacts.contacts_url);
    link("Opt-outs", &artifacts.opt_outs_url);
    link("Messages", &artifacts.messages_url);
    link("Filtered contacts", &artifacts.filtered_contacts_url);

    format!(
        "<p>Your export for {campaign_title} is ready:</p>\n<ul>\n{links}</ul>\n\
         <p>These links will expire.</p>"
    )
}

pub fn second_pass_content(
    campaign_title: &str,
    campaign_url: &str,
    unmark: bool,
) -> String {
    let action = if unmark { "unmarked for" } else { "marked for a" };
    format!(
        "<p>Contacts on <a href=\"{campaign_url}\">{campaign_title}</a> have been \
         {action} second pass and the campaign is ready to send again.</p>"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_content_lists_only_produced_artifacts() {
        let artifacts = ExportArtifacts {
            contacts_url: Some("memory://a.csv".to_string()),
            opt_outs_url: None,
            messages_url: Some("memory://b.csv".to_string()),
            filtered_contacts_url: None,
        };
        let html = export_content(&artifacts, "Spring GOTV");
        assert!(html.contains("memory://a.csv"));
        assert!(html.contains("memory://b.csv"));
        assert!(!html.contains("Opt-outs"));
        assert!(!html.contains("Filtered contacts"));
    }
}
