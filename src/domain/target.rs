use serde::{Deserialize, Serialize};

use crate::domain::classification::{
    AuthType, CaptchaType, Classification, PricingSignal, SiteStatus,
};
use crate::domain::form::{FormDescriptor, SubmitReport};
use crate::domain::product::CopyVariant;

/// Maximum stored length for diagnostic messages.
pub const MAX_ERROR_LEN: usize = 200;

pub fn truncate_error(message: &str) -> String {
    message.chars().take(MAX_ERROR_LEN).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingType {
    Free,
    Paid,
}

/// Where an entry stands in the form pipeline: discovery outcomes first,
/// submission outcomes after.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Pending,
    Discovered,
    NoFormFound,
    Timeout,
    Error,
    Submitted,
    FilledNoSubmit,
    NoFieldsMatched,
    SubmitTimeout,
    SubmitError,
}

fn default_true() -> bool {
    true
}

/// One site under evaluation. Created once at batch start, mutated in place
/// by whichever pipeline stage processed it, never deleted during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetEntry {
    /// Stable identity within the store, assigned at load time.
    #[serde(default)]
    pub index: usize,
    pub name: String,
    pub slug: String,
    pub url: String,
    pub submission_url: String,
    pub pricing_type: PricingType,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_true")]
    pub is_active: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_type: Option<AuthType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captcha_type: Option<CaptchaType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_login: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_status: Option<SiteStatus>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pricing_signals: Vec<PricingSignal>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub signals: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copy: Option<CopyVariant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_path: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub forms: Vec<FormDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submission_status: Option<SubmissionStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submit_result: Option<SubmitReport>,
}

impl TargetEntry {
    pub fn new(name: String, slug: String, url: String, pricing_type: PricingType) -> Self {
        TargetEntry {
            index: 0,
            name,
            slug,
            submission_url: url.clone(),
            url,
            pricing_type,
            categories: vec!["General".to_string()],
            description: String::new(),
            is_active: true,
            auth_type: None,
            captcha_type: None,
            requires_login: None,
            site_status: None,
            pricing_signals: vec![],
            signals: vec![],
            analysis_error: None,
            copy: None,
            form_path: None,
            forms: vec![],
            submission_status: None,
            submit_result: None,
        }
    }

    /// The URL a pipeline stage should visit: the dedicated submission page
    /// when one is known, the canonical URL otherwise.
    pub fn target_url(&self) -> &str {
        match self.submission_url.is_empty() {
            true => &self.url,
            false => &self.submission_url,
        }
    }

    /// Write one classification result into the entry. An `active` status
    /// clears any error left over from a previous pass.
    pub fn record_classification(&mut self, result: Classification) {
        self.auth_type = Some(result.auth_type);
        self.captcha_type = Some(result.captcha_type);
        self.requires_login = Some(result.requires_login);
        self.site_status = Some(result.site_status);
        if result.site_status == SiteStatus::Active {
            self.analysis_error = None;
        }
        if !result.pricing_signals.is_empty() {
            self.pricing_signals = result.pricing_signals;
        }
        self.signals = result.signals;
    }

    pub fn record_failure(&mut self, status: SiteStatus, message: &str) {
        self.site_status = Some(status);
        self.analysis_error = Some(truncate_error(message));
    }
}
