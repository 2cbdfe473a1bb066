//! Ordered pattern tables for page classification. Pure data; the classifier
//! owns all evaluation logic. Patterns match against lowercased markup.

use crate::domain::AuthProvider;

/// A phrase that either appears literally or as an ordered sequence of
/// fragments with arbitrary text between them.
#[derive(Debug, Clone, Copy)]
pub enum PhrasePattern {
    Literal(&'static str),
    Ordered(&'static [&'static str]),
}

impl PhrasePattern {
    pub fn matches(&self, haystack: &str) -> bool {
        match self {
            PhrasePattern::Literal(needle) => haystack.contains(needle),
            PhrasePattern::Ordered(fragments) => {
                let mut rest = haystack;
                for fragment in *fragments {
                    match rest.find(fragment) {
                        Some(at) => rest = &rest[at + fragment.len()..],
                        None => return false,
                    }
                }
                true
            }
        }
    }

    pub fn describe(&self) -> String {
        match self {
            PhrasePattern::Literal(needle) => (*needle).to_string(),
            PhrasePattern::Ordered(fragments) => fragments.join(".."),
        }
    }
}

/// Per-provider detection tables. The first matching pattern detects the
/// provider and ends that provider's scan.
pub const PROVIDER_TABLES: &[(AuthProvider, &[&str])] = &[
    (
        AuthProvider::Google,
        &[
            "accounts.google.com",
            "googleapis.com/auth",
            "google-signin",
            "gsi/client",
            "sign in with google",
            "login with google",
            "continue with google",
            "google.com/o/oauth",
            "google-login",
            "auth/google",
            "oauth/google",
            "btn-google",
            "btn_google",
            "social-google",
            "google oauth",
            "google_oauth",
        ],
    ),
    (
        AuthProvider::Github,
        &[
            "github.com/login/oauth",
            "sign in with github",
            "login with github",
            "continue with github",
            "auth/github",
            "oauth/github",
            "btn-github",
            "btn_github",
            "social-github",
        ],
    ),
    (
        AuthProvider::Twitter,
        &[
            "api.twitter.com/oauth",
            "sign in with twitter",
            "login with twitter",
            "continue with twitter",
            "auth/twitter",
            "sign in with x",
            "continue with x",
            "login with x",
            "btn-twitter",
            "social-twitter",
        ],
    ),
    (
        AuthProvider::Facebook,
        &[
            "facebook.com/v",
            "facebook.com/dialog/oauth",
            "connect.facebook.net",
            "sign in with facebook",
            "login with facebook",
            "continue with facebook",
            "auth/facebook",
            "oauth/facebook",
            "btn-facebook",
            "btn_facebook",
            "social-facebook",
            "fb-login",
            "fbconnect",
        ],
    ),
    (
        AuthProvider::Apple,
        &[
            "appleid.apple.com/auth",
            "sign in with apple",
            "continue with apple",
            "auth/apple",
            "apple-login",
            "btn-apple",
            "apple-sign-in",
        ],
    ),
    (
        AuthProvider::Linkedin,
        &[
            "linkedin.com/oauth",
            "sign in with linkedin",
            "login with linkedin",
            "continue with linkedin",
            "auth/linkedin",
            "oauth/linkedin",
            "btn-linkedin",
            "social-linkedin",
        ],
    ),
];

/// Phrases that mark a login wall regardless of provider buttons.
pub const LOGIN_WALL_PHRASES: &[&str] = &[
    "sign in to continue",
    "log in to continue",
    "login to submit",
    "sign up to submit",
    "create an account",
    "you must log in",
    "please sign in",
    "please log in",
    "sign in to submit",
    "login required",
    "sign up to continue",
];

/// Full-page challenge interstitial markers, checked against title and body.
pub const INTERSTITIAL_TITLE_PHRASES: &[&str] = &["just a moment"];
pub const INTERSTITIAL_BODY_PHRASES: &[&str] =
    &["checking your browser", "cf-browser-verification"];

pub const PARKED_DOMAIN_PHRASES: &[&str] = &[
    "domain is for sale",
    "buy this domain",
    "domain may be for sale",
    "parked domain",
    "this domain is parked",
];

pub const DEAD_TITLE_PHRASES: &[&str] = &["404", "not found", "page not found", "error"];
pub const DEAD_BODY_PHRASES: &[&str] = &[
    "page not found",
    "404 error",
    "this page doesn't exist",
    "page doesn&#39;t exist",
];

/// Embedded captcha widget markers, weakest first. The classifier evaluates
/// them in this order and lets later, more specific vendors override.
pub const RECAPTCHA_MARKERS: &[&str] = &["g-recaptcha", "recaptcha/api.js", "grecaptcha"];
/// A programmatic-execute marker upgrades recaptcha to v3.
pub const RECAPTCHA_V3_EXECUTE: &str = "grecaptcha.execute";
/// So does a render parameter on the script include.
pub const RECAPTCHA_SCRIPT_PREFIX: &str = "recaptcha/api.js?";
pub const RECAPTCHA_RENDER_PARAM: &str = "render=";
pub const HCAPTCHA_MARKERS: &[&str] = &["hcaptcha.com", "h-captcha"];
pub const TURNSTILE_MARKERS: &[&str] = &["challenges.cloudflare.com/turnstile", "cf-turnstile"];
pub const GENERIC_CAPTCHA_MARKER: &str = "captcha";

pub const PAID_PRICING_PATTERNS: &[PhrasePattern] = &[
    PhrasePattern::Ordered(&["paid", "submission"]),
    PhrasePattern::Ordered(&["premium", "submission"]),
    PhrasePattern::Ordered(&["upgrade", "to", "submit"]),
    PhrasePattern::Ordered(&["pay", "to", "submit"]),
];

pub const FREE_PRICING_PATTERNS: &[PhrasePattern] = &[
    PhrasePattern::Ordered(&["free", "submission"]),
    PhrasePattern::Ordered(&["submit", "free"]),
    PhrasePattern::Ordered(&["free", "listing"]),
    PhrasePattern::Ordered(&["no", "cost"]),
];

pub const FREEMIUM_PRICING_PATTERNS: &[PhrasePattern] = &[
    PhrasePattern::Literal("freemium"),
    PhrasePattern::Ordered(&["free", "plan"]),
    PhrasePattern::Ordered(&["basic", "free"]),
    PhrasePattern::Ordered(&["free", "tier"]),
];

/// Framework form markers for pages that render inputs without `<form>`.
pub const JS_FORM_MARKERS: &[&str] = &[
    "role=\"form\"",
    "role='form'",
    "data-form",
    "ng-form",
    "formik",
    "react-hook-form",
];

/// A dollar amount anywhere on the page counts as a paid signal.
pub fn has_dollar_amount(haystack: &str) -> bool {
    let bytes = haystack.as_bytes();
    bytes
        .windows(2)
        .any(|pair| pair[0] == b'$' && pair[1].is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordered_pattern_requires_fragment_order() {
        let pattern = PhrasePattern::Ordered(&["upgrade", "to", "submit"]);
        assert!(pattern.matches("upgrade your plan to submit more tools"));
        assert!(!pattern.matches("submit to upgrade"));
    }

    #[test]
    fn dollar_amount_needs_a_digit() {
        assert!(has_dollar_amount("listing costs $49 per month"));
        assert!(!has_dollar_amount("US$ pricing available"));
    }
}
