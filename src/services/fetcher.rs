//! The lightweight HTTP pass: plain fetches without a rendering engine,
//! sharing the classifier's rule set. Cheaper than a browser but blind to
//! client-side rendering, so its unknowns feed the browser work list.

use std::error::Error as _;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE};
use reqwest::Client;
use tokio::sync::{Mutex, Semaphore};

use crate::dal::entry_store::EntryStore;
use crate::dal::worklist::WorkItem;
use crate::domain::{AuthType, CaptchaType, SiteStatus, TargetEntry};
use crate::services::classifier;
use crate::services::orchestrator::BatchStats;
use crate::services::triage;

/// Fixed desktop identification for every outbound request.
pub const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";
pub const ACCEPT_LANGUAGE_HEADER: &str = "en-US,en;q=0.9";
const ACCEPT_HEADER: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Invalid TLS certificates are accepted on this path; the fetch is
/// read-only and misconfigured hosts still need a classification.
pub fn build_client(timeout: Duration) -> anyhow::Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HEADER));
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static(ACCEPT_LANGUAGE_HEADER),
    );
    Client::builder()
        .user_agent(DESKTOP_USER_AGENT)
        .default_headers(headers)
        .danger_accept_invalid_certs(true)
        .timeout(timeout)
        .build()
        .context("Failed to build fetch client")
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchedPage {
    pub final_url: String,
    pub html: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Page(FetchedPage),
    NonHtml { content_type: String },
    HttpError { status: u16 },
    TransportError { message: String },
}

fn is_html_family(content_type: &str) -> bool {
    content_type.contains("text/html")
        || content_type.contains("text/plain")
        || content_type.contains("application/xhtml")
}

/// Flatten a reqwest error chain into one string so the DNS-level cause
/// survives into the stored diagnostic.
fn error_chain_text(err: &reqwest::Error) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = err.source();
    while let Some(cause) = source {
        parts.push(cause.to_string());
        source = cause.source();
    }
    parts.join(": ")
}

pub async fn fetch_page(client: &Client, url: &str) -> FetchOutcome {
    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) => {
            return FetchOutcome::TransportError {
                message: error_chain_text(&e),
            }
        }
    };

    let status = response.status();
    if !status.is_success() {
        return FetchOutcome::HttpError {
            status: status.as_u16(),
        };
    }

    let final_url = response.url().to_string();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    if !is_html_family(&content_type) {
        return FetchOutcome::NonHtml { content_type };
    }

    match response.text().await {
        Ok(html) => FetchOutcome::Page(FetchedPage { final_url, html }),
        Err(e) => FetchOutcome::TransportError {
            message: error_chain_text(&e),
        },
    }
}

/// Fold one fetch outcome into an entry. Pure with respect to the outcome,
/// so failure mapping is testable without a network.
pub fn apply_fetch_outcome(entry: &mut TargetEntry, requested_url: &str, outcome: FetchOutcome) {
    match outcome {
        FetchOutcome::Page(page) => {
            let title = classifier::extract_title(&page.html);
            let result = classifier::classify(&page.html, &title, requested_url, &page.final_url);
            entry.record_classification(result);
        }
        FetchOutcome::NonHtml { content_type } => {
            entry.record_failure(
                SiteStatus::Error,
                &format!("Non-HTML content: {}", content_type),
            );
            entry.auth_type = Some(AuthType::Unknown);
            entry.captcha_type = Some(CaptchaType::None);
        }
        FetchOutcome::HttpError { status } => {
            let site_status = match status {
                404 => SiteStatus::NotFound,
                _ => SiteStatus::Error,
            };
            entry.record_failure(site_status, &format!("HTTP {}", status));
            entry.auth_type = Some(AuthType::Unknown);
            entry.captcha_type = Some(CaptchaType::None);
        }
        FetchOutcome::TransportError { message } => {
            let site_status =
                triage::status_for_error_text(&message).unwrap_or(SiteStatus::Error);
            entry.record_failure(site_status, &message);
            entry.auth_type = Some(AuthType::Unknown);
            entry.captcha_type = Some(CaptchaType::None);
        }
    }
}

/// Run the fetch pass over a work list with bounded parallelism and the
/// same checkpoint cadence as the browser batches.
pub async fn run_fetch_pass(
    store: Arc<EntryStore>,
    work: Vec<WorkItem>,
    workers: usize,
    timeout: Duration,
    checkpoint_every: usize,
) -> anyhow::Result<BatchStats> {
    let client = build_client(timeout)?;
    let total = work.len();
    let semaphore = Arc::new(Semaphore::new(workers));
    let stats = Arc::new(Mutex::new(BatchStats::default()));
    let processed = Arc::new(std::sync::atomic::AtomicUsize::new(0));

    log::info!("Fetching {} targets with {} workers", total, workers);

    let mut handles = vec![];
    for (seq, item) in work.into_iter().enumerate() {
        let client = client.clone();
        let semaphore = semaphore.clone();
        let store = store.clone();
        let stats = stats.clone();
        let processed = processed.clone();

        handles.push(tokio::spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return,
            };

            let outcome = fetch_page(&client, &item.url).await;
            let ok = matches!(outcome, FetchOutcome::Page(_));
            store
                .with_entry(item.index, |entry| {
                    apply_fetch_outcome(entry, &item.url, outcome)
                })
                .await;

            {
                let mut stats = stats.lock().await;
                match ok {
                    true => stats.ok += 1,
                    false => stats.errored += 1,
                }
            }

            let done = processed.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1;
            if done % 20 == 0 {
                log::info!("  {}/{} done [{}]", done, total, seq + 1);
            }
            if checkpoint_every > 0 && done % checkpoint_every == 0 {
                match store.checkpoint().await {
                    Ok(()) => log::info!("  [autosave] {}/{} processed", done, total),
                    Err(e) => log::error!("Checkpoint failed: {:?}", e),
                }
            }
        }));
    }

    for handle in handles {
        if let Err(e) = handle.await {
            log::error!("Fetch task panicked: {:?}", e);
        }
    }

    store.checkpoint().await?;
    let stats = stats.lock().await.clone();
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PricingType;

    fn entry() -> TargetEntry {
        TargetEntry::new(
            "Acme".to_string(),
            "acme".to_string(),
            "https://example.test/submit".to_string(),
            PricingType::Free,
        )
    }

    #[test]
    fn dns_failure_marks_domain_dead() {
        let mut e = entry();
        apply_fetch_outcome(
            &mut e,
            "https://example.test/submit",
            FetchOutcome::TransportError {
                message: "error sending request: dns error: failed to lookup address information: \
                          Name or service not known"
                    .to_string(),
            },
        );
        assert_eq!(e.site_status, Some(SiteStatus::DomainDead));
        assert_eq!(e.auth_type, Some(AuthType::Unknown));
    }

    #[test]
    fn http_404_marks_not_found() {
        let mut e = entry();
        apply_fetch_outcome(
            &mut e,
            "https://example.test/submit",
            FetchOutcome::HttpError { status: 404 },
        );
        assert_eq!(e.site_status, Some(SiteStatus::NotFound));
        assert_eq!(e.analysis_error.as_deref(), Some("HTTP 404"));
    }

    #[test]
    fn non_html_content_is_a_classification_error() {
        let mut e = entry();
        apply_fetch_outcome(
            &mut e,
            "https://example.test/submit",
            FetchOutcome::NonHtml {
                content_type: "application/pdf".to_string(),
            },
        );
        assert_eq!(e.site_status, Some(SiteStatus::Error));
        assert!(e
            .analysis_error
            .as_deref()
            .unwrap()
            .contains("application/pdf"));
    }

    #[test]
    fn fetched_page_is_classified_in_place() {
        let mut e = entry();
        let html = r#"<p>please log in</p><input type="password" name="pw">"#;
        apply_fetch_outcome(
            &mut e,
            "https://example.test/submit",
            FetchOutcome::Page(FetchedPage {
                final_url: "https://example.test/submit".to_string(),
                html: html.to_string(),
            }),
        );
        assert_eq!(e.auth_type, Some(AuthType::EmailPassword));
        assert_eq!(e.requires_login, Some(true));
        assert_eq!(e.site_status, Some(SiteStatus::Active));
    }
}
