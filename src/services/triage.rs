//! Offline categorization of entries that never need a fetch, mapping of
//! transport error text onto liveness statuses, and work-list building for
//! the browser passes.

use url::Url;

use crate::dal::worklist::WorkItem;
use crate::domain::{
    AuthProvider, AuthType, CaptchaType, SiteStatus, SubmissionStatus, TargetEntry,
};

const DNS_FAILURE_PHRASES: &[&str] = &[
    "name or service not known",
    "no address associated",
    "temporary failure in name resolution",
    "failed to lookup address",
    "dns error",
];

const TIMEOUT_PHRASES: &[&str] = &["timed out", "timeout"];

/// Map a transport failure's text onto a liveness status. DNS-level
/// failures mean the domain itself is dead, not that the fetch errored.
pub fn status_for_error_text(message: &str) -> Option<SiteStatus> {
    let lowered = message.to_lowercase();
    if DNS_FAILURE_PHRASES.iter().any(|p| lowered.contains(p)) {
        return Some(SiteStatus::DomainDead);
    }
    if lowered == "http 404" {
        return Some(SiteStatus::NotFound);
    }
    if TIMEOUT_PHRASES.iter().any(|p| lowered.contains(p)) {
        return Some(SiteStatus::Timeout);
    }
    None
}

/// Categorize an obviously-broken entry without touching the network.
/// Returns true when the entry was settled here and needs no further pass.
pub fn triage_entry(entry: &mut TargetEntry) -> bool {
    let url = entry.target_url().to_string();

    // Descriptions pasted into the URL column, markdown leftovers and the
    // like are not fetchable.
    if !url.starts_with("http") || url.contains(' ') || url.contains("**") || url.contains('"') {
        entry.site_status = Some(SiteStatus::InvalidUrl);
        entry.auth_type = Some(AuthType::Unknown);
        entry.captcha_type = Some(CaptchaType::None);
        return true;
    }

    if url.contains("facebook.com/groups/") {
        entry.site_status = Some(SiteStatus::FacebookGroup);
        entry.auth_type = Some(AuthType::Single(AuthProvider::Facebook));
        entry.captcha_type = Some(CaptchaType::None);
        entry.requires_login = Some(true);
        return true;
    }

    if let Some(message) = entry.analysis_error.clone() {
        if let Some(status) = status_for_error_text(&message) {
            entry.site_status = Some(status);
            if status == SiteStatus::DomainDead {
                entry.auth_type = Some(AuthType::Unknown);
                entry.captcha_type = Some(CaptchaType::None);
            }
            return true;
        }
    }

    false
}

fn needs_browser_check(entry: &TargetEntry) -> bool {
    entry.auth_type == Some(AuthType::Unknown) || entry.site_status == Some(SiteStatus::Error)
}

fn work_item(entry: &TargetEntry) -> WorkItem {
    WorkItem {
        index: entry.index,
        name: entry.name.clone(),
        url: entry.target_url().to_string(),
        error: entry.analysis_error.clone().unwrap_or_default(),
    }
}

/// Entries the rendering pass should revisit after the cheap fetch pass.
pub fn build_browser_check_list(entries: &[TargetEntry]) -> Vec<WorkItem> {
    entries
        .iter()
        .filter(|e| needs_browser_check(e))
        .map(work_item)
        .collect()
}

/// Deep recheck scope: still-unknown auth on otherwise live sites.
pub fn build_deep_recheck_list(entries: &[TargetEntry]) -> Vec<WorkItem> {
    entries
        .iter()
        .filter(|e| {
            e.auth_type == Some(AuthType::Unknown) && e.site_status == Some(SiteStatus::Active)
        })
        .map(work_item)
        .collect()
}

/// Form discovery scope: live sites with an open submission form that have
/// not been discovered yet.
pub fn build_discovery_list(entries: &[TargetEntry]) -> Vec<WorkItem> {
    entries
        .iter()
        .filter(|e| {
            e.site_status == Some(SiteStatus::Active)
                && e.auth_type == Some(AuthType::None)
                && matches!(
                    e.submission_status,
                    None | Some(SubmissionStatus::Pending)
                )
        })
        .map(work_item)
        .collect()
}

/// A discovered form is worth submitting only if it has at least one field
/// the matcher could conceivably fill.
pub fn has_real_fields(entry: &TargetEntry) -> bool {
    entry.forms.iter().any(|form| {
        form.fields.iter().any(|field| {
            !matches!(
                field.input_type.as_str(),
                "checkbox" | "search" | "hidden" | "radio" | ""
            )
        })
    })
}

pub fn build_submission_list(entries: &[TargetEntry]) -> Vec<WorkItem> {
    entries
        .iter()
        .filter(|e| e.submission_status == Some(SubmissionStatus::Discovered) && has_real_fields(e))
        .map(work_item)
        .collect()
}

/// All entries carrying a fetchable URL, for the full HTTP pass.
pub fn build_full_list(entries: &[TargetEntry]) -> Vec<WorkItem> {
    entries
        .iter()
        .filter(|e| !e.target_url().is_empty())
        .map(work_item)
        .collect()
}

pub fn domain_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PricingType;

    fn entry(url: &str) -> TargetEntry {
        TargetEntry::new(
            "Sample".to_string(),
            "sample".to_string(),
            url.to_string(),
            PricingType::Free,
        )
    }

    #[test]
    fn invalid_urls_are_settled_offline() {
        let mut e = entry("See the **submission page** for details");
        assert!(triage_entry(&mut e));
        assert_eq!(e.site_status, Some(SiteStatus::InvalidUrl));
        assert_eq!(e.auth_type, Some(AuthType::Unknown));
    }

    #[test]
    fn facebook_groups_require_facebook_login() {
        let mut e = entry("https://facebook.com/groups/startups");
        assert!(triage_entry(&mut e));
        assert_eq!(e.site_status, Some(SiteStatus::FacebookGroup));
        assert_eq!(
            e.auth_type,
            Some(AuthType::Single(AuthProvider::Facebook))
        );
        assert_eq!(e.requires_login, Some(true));
    }

    #[test]
    fn dns_failures_mean_a_dead_domain() {
        let mut e = entry("https://gone.example");
        e.analysis_error = Some("error: Name or service not known".to_string());
        assert!(triage_entry(&mut e));
        assert_eq!(e.site_status, Some(SiteStatus::DomainDead));
    }

    #[test]
    fn http_404_maps_to_not_found() {
        assert_eq!(status_for_error_text("HTTP 404"), Some(SiteStatus::NotFound));
        assert_eq!(status_for_error_text("HTTP 500"), None);
    }

    #[test]
    fn healthy_entries_pass_through() {
        let mut e = entry("https://alive.example/submit");
        assert!(!triage_entry(&mut e));
        assert_eq!(e.site_status, None);
    }

    #[test]
    fn browser_check_list_covers_unknown_and_errored() {
        let mut unknown = entry("https://a.example");
        unknown.auth_type = Some(AuthType::Unknown);
        let mut errored = entry("https://b.example");
        errored.site_status = Some(SiteStatus::Error);
        let mut settled = entry("https://c.example");
        settled.auth_type = Some(AuthType::None);
        settled.site_status = Some(SiteStatus::Active);
        let entries = vec![unknown, errored, settled];
        let list = build_browser_check_list(&entries);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn submission_list_requires_real_fields() {
        use crate::domain::{FieldDescriptor, FormDescriptor};
        let mut checkbox_only = entry("https://a.example");
        checkbox_only.submission_status = Some(SubmissionStatus::Discovered);
        checkbox_only.forms = vec![FormDescriptor {
            action: String::new(),
            method: String::new(),
            id: String::new(),
            class_name: String::new(),
            fields: vec![FieldDescriptor {
                tag: "input".to_string(),
                input_type: "checkbox".to_string(),
                name: "agree".to_string(),
                id: String::new(),
                placeholder: String::new(),
                label: String::new(),
                required: false,
                ordinal: 0,
            }],
        }];
        assert!(build_submission_list(&[checkbox_only]).is_empty());
    }
}
