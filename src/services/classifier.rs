//! Heuristic page classification: auth providers, captcha widgets, liveness
//! and pricing signals. Pure text/pattern analysis over rendered markup, so
//! the same input always produces the same result.

use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::domain::{
    AuthProvider, AuthType, CaptchaType, Classification, PricingSignal, SiteStatus,
};
use crate::services::rules;

/// Classify one fetched page. `markup` is the full rendered source,
/// `page_title` the document title; both are case-folded internally.
pub fn classify(
    markup: &str,
    page_title: &str,
    requested_url: &str,
    final_url: &str,
) -> Classification {
    let html = markup.to_lowercase();
    let title = page_title.to_lowercase();
    let mut result = Classification::new();

    // Challenge interstitial wins over everything else on the page.
    if rules::INTERSTITIAL_TITLE_PHRASES.iter().any(|p| title.contains(p))
        || rules::INTERSTITIAL_BODY_PHRASES.iter().any(|p| html.contains(p))
    {
        result.site_status = SiteStatus::CloudflareBlocked;
        result.captcha_type = CaptchaType::Cloudflare;
        result.signals.push("cloudflare_challenge".to_string());
        return result;
    }

    if let Some(phrase) = rules::PARKED_DOMAIN_PHRASES.iter().find(|p| html.contains(*p)) {
        result.site_status = SiteStatus::DomainParked;
        result.signals.push(format!("parked_domain: {}", phrase));
        return result;
    }

    if rules::DEAD_TITLE_PHRASES.iter().any(|p| title.contains(p))
        || rules::DEAD_BODY_PHRASES.iter().any(|p| html.contains(p))
    {
        result.site_status = SiteStatus::NotFound;
        result.signals.push("page_not_found".to_string());
        return result;
    }

    let document = Html::parse_document(&html);
    let mut providers: Vec<AuthProvider> = vec![];

    for (provider, patterns) in rules::PROVIDER_TABLES {
        // First hit decides; the rest of the provider's table is not scanned.
        if let Some(pattern) = patterns.iter().find(|p| html.contains(*p)) {
            providers.push(*provider);
            result
                .signals
                .push(format!("{}_auth: {}", provider.as_str(), pattern));
        }
    }

    let password_selector = Selector::parse("input[type=\"password\"]").unwrap();
    let email_selector = Selector::parse("input[type=\"email\"]").unwrap();
    if document.select(&password_selector).next().is_some() {
        providers.push(AuthProvider::EmailPassword);
        result.signals.push("has_password_field".to_string());
    }
    if document.select(&email_selector).next().is_some() {
        result.signals.push("has_email_field".to_string());
    }

    let mut login_wall = false;
    if let Some(phrase) = rules::LOGIN_WALL_PHRASES.iter().find(|p| html.contains(*p)) {
        login_wall = true;
        result.signals.push(format!("login_required: {}", phrase));
    }

    let has_interactive = has_interactive_elements(&document, &html);
    if providers.is_empty() && has_interactive {
        result.signals.push("has_form".to_string());
    }

    result.auth_type = AuthType::resolve(&providers, has_interactive);
    result.requires_login = login_wall || !providers.is_empty();

    result.captcha_type = detect_captcha(&html, &mut result.signals);
    result.pricing_signals = detect_pricing(&html);

    if redirected_to_homepage(requested_url, final_url) {
        result.signals.push("redirected_to_homepage".to_string());
    }

    result
}

/// Extract the document title from raw markup, for the fetch path where no
/// rendering surface reports one.
pub fn extract_title(markup: &str) -> String {
    let document = Html::parse_document(markup);
    let title_selector = Selector::parse("title").unwrap();
    document
        .select(&title_selector)
        .next()
        .map(|t| t.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

fn has_interactive_elements(document: &Html, html: &str) -> bool {
    let form_selector = Selector::parse("form").unwrap();
    if document.select(&form_selector).next().is_some() {
        return true;
    }
    let input_selector = Selector::parse(
        "input[type=\"text\"], input[type=\"email\"], input[type=\"url\"], \
         input[type=\"search\"], input[type=\"tel\"], textarea, [contenteditable]",
    )
    .unwrap();
    if document.select(&input_selector).next().is_some() {
        return true;
    }
    rules::JS_FORM_MARKERS.iter().any(|m| html.contains(m))
}

/// Captcha vendors are checked weakest-first and later matches override, so
/// a page embedding several widgets reports the most specific one.
fn detect_captcha(html: &str, signals: &mut Vec<String>) -> CaptchaType {
    let mut captcha = CaptchaType::None;

    if rules::RECAPTCHA_MARKERS.iter().any(|m| html.contains(m)) {
        captcha = match is_recaptcha_v3(html) {
            true => CaptchaType::RecaptchaV3,
            false => CaptchaType::RecaptchaV2,
        };
        signals.push("recaptcha_detected".to_string());
    }
    if rules::HCAPTCHA_MARKERS.iter().any(|m| html.contains(m)) {
        captcha = CaptchaType::Hcaptcha;
        signals.push("hcaptcha_detected".to_string());
    }
    if rules::TURNSTILE_MARKERS.iter().any(|m| html.contains(m)) {
        captcha = CaptchaType::CloudflareTurnstile;
        signals.push("turnstile_detected".to_string());
    }
    if captcha == CaptchaType::None && html.contains(rules::GENERIC_CAPTCHA_MARKER) {
        captcha = CaptchaType::CaptchaUnknown;
        signals.push("generic_captcha_mention".to_string());
    }

    captcha
}

fn is_recaptcha_v3(html: &str) -> bool {
    if html.contains(rules::RECAPTCHA_V3_EXECUTE) {
        return true;
    }
    match html.find(rules::RECAPTCHA_SCRIPT_PREFIX) {
        Some(at) => html[at..].contains(rules::RECAPTCHA_RENDER_PARAM),
        None => false,
    }
}

fn detect_pricing(html: &str) -> Vec<PricingSignal> {
    let mut signals = vec![];
    if rules::has_dollar_amount(html)
        || rules::PAID_PRICING_PATTERNS.iter().any(|p| p.matches(html))
    {
        signals.push(PricingSignal::Paid);
    }
    if rules::FREE_PRICING_PATTERNS.iter().any(|p| p.matches(html)) {
        signals.push(PricingSignal::Free);
    }
    if rules::FREEMIUM_PRICING_PATTERNS.iter().any(|p| p.matches(html)) {
        signals.push(PricingSignal::Freemium);
    }
    signals
}

fn redirected_to_homepage(requested_url: &str, final_url: &str) -> bool {
    let requested_path = Url::parse(requested_url).map(|u| u.path().to_string());
    let final_path = Url::parse(final_url).map(|u| u.path().to_string());
    match (requested_path, final_path) {
        (Ok(requested), Ok(finished)) => {
            (finished == "/" || finished.is_empty()) && requested != "/" && !requested.is_empty()
        }
        _ => false,
    }
}

/// Structured result of the deep-recheck DOM query phase.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomProbe {
    #[serde(default)]
    pub input_count: usize,
    #[serde(default)]
    pub form_count: usize,
    #[serde(default)]
    pub signup_buttons: Vec<String>,
    #[serde(default)]
    pub oauth_buttons: Vec<String>,
}

/// In-page query executed during deep rechecks on pages whose static markup
/// gave no auth verdict. Counts rendered inputs/forms and collects button
/// text for a second provider pass.
pub const DOM_PROBE_SCRIPT: &str = r#"
const inputs = document.querySelectorAll(
    'input[type="text"], input[type="email"], input[type="url"], '
    + 'input[type="password"], input[type="search"], input[type="tel"], '
    + 'input:not([type]), textarea');
const forms = document.querySelectorAll('form, [role="form"]');
const buttons = [...document.querySelectorAll('button, a, [role="button"]')];
const texts = buttons.map(b => b.textContent.toLowerCase().trim()).filter(t => t.length < 80);
const signup = texts.filter(t =>
    /sign.?up|sign.?in|log.?in|register|get started|create account|submit|join/.test(t));
const oauth = texts.filter(t =>
    /google|github|facebook|twitter|apple|linkedin|microsoft|sso/.test(t));
return {
    input_count: inputs.length,
    form_count: forms.length,
    signup_buttons: signup.slice(0, 10),
    oauth_buttons: oauth.slice(0, 10),
};
"#;

/// Second-chance resolution from live DOM data. Only adjusts entries the
/// static pass left at `unknown`.
pub fn apply_dom_probe(result: &mut Classification, probe: &DomProbe) {
    if result.auth_type != AuthType::Unknown {
        return;
    }

    let mut providers: Vec<AuthProvider> = vec![];
    let button_mentions: &[(AuthProvider, &[&str])] = &[
        (AuthProvider::Google, &["google"]),
        (AuthProvider::Github, &["github"]),
        (AuthProvider::Twitter, &["twitter", " x "]),
        (AuthProvider::Facebook, &["facebook"]),
        (AuthProvider::Apple, &["apple"]),
        (AuthProvider::Linkedin, &["linkedin"]),
    ];
    for (provider, mentions) in button_mentions {
        let hit = probe
            .oauth_buttons
            .iter()
            .any(|text| mentions.iter().any(|m| text.contains(m)));
        if hit {
            providers.push(*provider);
            result
                .signals
                .push(format!("{}_auth: oauth_button_text", provider.as_str()));
        }
    }

    if !providers.is_empty() {
        result.auth_type = AuthType::resolve(&providers, false);
        result.requires_login = true;
        return;
    }

    if probe.form_count > 0 || probe.input_count > 0 {
        result.auth_type = AuthType::None;
        result.signals.push("dom_probe_found_inputs".to_string());
    } else if !probe.signup_buttons.is_empty() {
        result.auth_type = AuthType::None;
        for hint in &probe.signup_buttons {
            result.signals.push(format!("submission_hint: {}", hint));
        }
    }
}
