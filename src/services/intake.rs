//! One-off intake of a pasted tabular listing (name TAB url TAB pricing,
//! with an optional auth-info continuation line) and deduplication against
//! the existing collection.

use std::collections::HashSet;
use std::fmt;

use url::Url;

use crate::domain::{PricingType, TargetEntry};

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDirectory {
    pub name: String,
    pub url: String,
    pub pricing: String,
    pub auth_info: String,
}

/// Parse the pasted text. A line counts when its second tab-separated column
/// is a URL; a following line with no tabs and no URL is treated as the
/// entry's auth-info continuation.
pub fn parse_tabular(text: &str) -> Vec<ParsedDirectory> {
    let lines: Vec<&str> = text.trim().lines().collect();
    let mut entries = vec![];
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i].trim();
        if line.is_empty() {
            i += 1;
            continue;
        }

        let parts: Vec<&str> = line
            .split('\t')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();

        if parts.len() >= 2 && parts[1].starts_with("http") {
            let mut auth_info = String::new();
            if let Some(next) = lines.get(i + 1) {
                let next = next.trim();
                if !next.is_empty() && !next.contains('\t') && !next.to_lowercase().contains("http")
                {
                    auth_info = next.to_string();
                    i += 1;
                }
            }
            entries.push(ParsedDirectory {
                name: parts[0].to_string(),
                url: parts[1].to_string(),
                pricing: parts.get(2).unwrap_or(&"Free").to_string(),
                auth_info,
            });
        }

        i += 1;
    }

    entries
}

/// Lowercased host plus path with the trailing slash dropped; the
/// comparison key for URL-level dedup.
pub fn normalize_url(url: &str) -> String {
    match Url::parse(&url.to_lowercase()) {
        Ok(parsed) => {
            let host = parsed.host_str().unwrap_or("");
            let path = parsed.path().trim_end_matches('/');
            format!("{}{}", host, path)
        }
        Err(_) => url.trim().to_lowercase(),
    }
}

pub fn slugify(name: &str) -> String {
    let mut slug = String::new();
    let mut last_was_dash = true;
    for c in name.to_lowercase().chars() {
        if matches!(c, '\'' | '(' | ')' | '.') {
            continue;
        }
        if c.is_ascii_alphanumeric() {
            slug.push(c);
            last_was_dash = false;
        } else if !last_was_dash {
            slug.push('-');
            last_was_dash = true;
        }
    }
    slug.trim_end_matches('-').to_string()
}

pub fn pricing_from_text(text: &str) -> PricingType {
    let lowered = text.to_lowercase();
    if lowered.contains("paid") && !lowered.contains("free") {
        return PricingType::Paid;
    }
    if lowered.contains("fee") || text.contains('$') {
        return PricingType::Paid;
    }
    PricingType::Free
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateReason {
    Url,
    Domain,
    Name,
}

impl fmt::Display for DuplicateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DuplicateReason::Url => f.write_str("URL match"),
            DuplicateReason::Domain => f.write_str("Domain match"),
            DuplicateReason::Name => f.write_str("Name match"),
        }
    }
}

#[derive(Debug, Default)]
pub struct MergeOutcome {
    pub added: Vec<String>,
    pub duplicates: Vec<(String, DuplicateReason)>,
}

fn domain_of(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
        .unwrap_or_default()
}

/// Append parsed entries that are not already present by normalized URL,
/// domain, or case-folded name, in that check order.
pub fn merge_new(existing: &mut Vec<TargetEntry>, parsed: Vec<ParsedDirectory>) -> MergeOutcome {
    let mut seen_urls: HashSet<String> =
        existing.iter().map(|e| normalize_url(&e.url)).collect();
    let mut seen_domains: HashSet<String> = existing
        .iter()
        .map(|e| domain_of(&e.url))
        .filter(|d| !d.is_empty())
        .collect();
    let mut seen_names: HashSet<String> =
        existing.iter().map(|e| e.name.to_lowercase()).collect();

    let mut outcome = MergeOutcome::default();

    for candidate in parsed {
        let url_key = normalize_url(&candidate.url);
        let domain = domain_of(&candidate.url);
        let name_key = candidate.name.to_lowercase();

        if seen_urls.contains(&url_key) {
            outcome
                .duplicates
                .push((candidate.name, DuplicateReason::Url));
            continue;
        }
        if !domain.is_empty() && seen_domains.contains(&domain) {
            outcome
                .duplicates
                .push((candidate.name, DuplicateReason::Domain));
            continue;
        }
        if seen_names.contains(&name_key) {
            outcome
                .duplicates
                .push((candidate.name, DuplicateReason::Name));
            continue;
        }

        let entry = TargetEntry::new(
            candidate.name.clone(),
            slugify(&candidate.name),
            candidate.url.clone(),
            pricing_from_text(&candidate.pricing),
        );
        existing.push(entry);

        seen_urls.insert(url_key);
        if !domain.is_empty() {
            seen_domains.insert(domain);
        }
        seen_names.insert(name_key);
        outcome.added.push(candidate.name);
    }

    for (index, entry) in existing.iter_mut().enumerate() {
        entry.index = index;
    }

    outcome
}
