use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// A single authentication mechanism detected on a page. Detection order is
/// the order of the provider tables in the rule set, with `EmailPassword`
/// always appended last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthProvider {
    Google,
    Github,
    Twitter,
    Facebook,
    Apple,
    Linkedin,
    EmailPassword,
}

impl AuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthProvider::Google => "google",
            AuthProvider::Github => "github",
            AuthProvider::Twitter => "twitter",
            AuthProvider::Facebook => "facebook",
            AuthProvider::Apple => "apple",
            AuthProvider::Linkedin => "linkedin",
            AuthProvider::EmailPassword => "email_password",
        }
    }
}

impl fmt::Display for AuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google" => Ok(AuthProvider::Google),
            "github" => Ok(AuthProvider::Github),
            "twitter" => Ok(AuthProvider::Twitter),
            "facebook" => Ok(AuthProvider::Facebook),
            "apple" => Ok(AuthProvider::Apple),
            "linkedin" => Ok(AuthProvider::Linkedin),
            "email_password" => Ok(AuthProvider::EmailPassword),
            other => Err(format!("unknown auth provider: {}", other)),
        }
    }
}

/// Resolved authentication classification for a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthType {
    /// No auth signals and no interactive elements found.
    Unknown,
    /// No auth signals but the page has an open submission form.
    None,
    EmailPassword,
    GoogleOnly,
    GoogleAndEmail,
    /// Exactly one non-google provider.
    Single(AuthProvider),
    /// Two or more providers, none of them google, joined with `+`.
    Combined(Vec<AuthProvider>),
}

impl AuthType {
    /// Resolution of a detected provider set into the final auth type.
    ///
    /// Rules, in order:
    /// 1. no providers: `none` if the page has any interactive form or
    ///    inputs, otherwise `unknown`
    /// 2. email/password alone: `email_password`
    /// 3. google without email/password: `google_only`
    /// 4. google with email/password: `google_and_email`
    /// 5. anything else: providers joined in detection order
    pub fn resolve(providers: &[AuthProvider], has_interactive_elements: bool) -> AuthType {
        if providers.is_empty() {
            return match has_interactive_elements {
                true => AuthType::None,
                false => AuthType::Unknown,
            };
        }
        if matches!(providers, [AuthProvider::EmailPassword]) {
            return AuthType::EmailPassword;
        }
        if providers.contains(&AuthProvider::Google) {
            return match providers.contains(&AuthProvider::EmailPassword) {
                true => AuthType::GoogleAndEmail,
                false => AuthType::GoogleOnly,
            };
        }
        match providers {
            [single] => AuthType::Single(*single),
            many => AuthType::Combined(many.to_vec()),
        }
    }
}

impl fmt::Display for AuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthType::Unknown => f.write_str("unknown"),
            AuthType::None => f.write_str("none"),
            AuthType::EmailPassword => f.write_str("email_password"),
            AuthType::GoogleOnly => f.write_str("google_only"),
            AuthType::GoogleAndEmail => f.write_str("google_and_email"),
            AuthType::Single(provider) => f.write_str(provider.as_str()),
            AuthType::Combined(providers) => {
                let joined: Vec<&str> = providers.iter().map(|p| p.as_str()).collect();
                f.write_str(&joined.join("+"))
            }
        }
    }
}

impl FromStr for AuthType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unknown" => return Ok(AuthType::Unknown),
            "none" => return Ok(AuthType::None),
            "email_password" => return Ok(AuthType::EmailPassword),
            "google_only" => return Ok(AuthType::GoogleOnly),
            "google_and_email" => return Ok(AuthType::GoogleAndEmail),
            _ => {}
        }
        if s.contains('+') {
            let providers = s
                .split('+')
                .map(AuthProvider::from_str)
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(AuthType::Combined(providers));
        }
        AuthProvider::from_str(s).map(AuthType::Single)
    }
}

impl Serialize for AuthType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for AuthType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// Which anti-automation widget a page embeds. `Cloudflare` is the full-page
/// challenge interstitial, not an embedded widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptchaType {
    None,
    RecaptchaV2,
    RecaptchaV3,
    Hcaptcha,
    CloudflareTurnstile,
    CaptchaUnknown,
    Cloudflare,
}

/// Liveness/availability of a target, distinct from auth and captcha.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteStatus {
    Active,
    NotFound,
    Timeout,
    Error,
    CloudflareBlocked,
    DomainParked,
    InvalidUrl,
    DomainDead,
    FacebookGroup,
}

/// Additive pricing flags; a page may carry more than one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PricingSignal {
    #[serde(rename = "paid_signals")]
    Paid,
    #[serde(rename = "free_signals")]
    Free,
    #[serde(rename = "freemium_signals")]
    Freemium,
}

/// Full output of one classification pass over a page.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub auth_type: AuthType,
    pub captcha_type: CaptchaType,
    pub requires_login: bool,
    pub site_status: SiteStatus,
    pub pricing_signals: Vec<PricingSignal>,
    /// Diagnostic strings, append-only, in detection order.
    pub signals: Vec<String>,
}

impl Classification {
    pub fn new() -> Self {
        Classification {
            auth_type: AuthType::Unknown,
            captcha_type: CaptchaType::None,
            requires_login: false,
            site_status: SiteStatus::Active,
            pricing_signals: vec![],
            signals: vec![],
        }
    }
}

impl Default for Classification {
    fn default() -> Self {
        Self::new()
    }
}
