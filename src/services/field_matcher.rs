//! Field-to-slot matching. An ordered rule table over the case-folded
//! concatenation of a field's name/label/placeholder/id plus its type; the
//! first matching rule decides, so table order encodes priority.

use crate::domain::{FieldDecision, FieldDescriptor, FieldValues, SemanticSlot};

const EMAIL_CUES: &[&str] = &["email", "e-mail", "e_mail"];
const URL_CUES: &[&str] = &[
    "url",
    "website",
    "web site",
    "homepage",
    "web address",
    "tool-tool-website",
    "tool url",
    "tool_url",
    "product url",
    "product_url",
    "link",
    "site",
];
const SOCIAL_CUES: &[&str] = &[
    "facebook",
    "instagram",
    "linkedin",
    "discord",
    "youtube",
    "product hunt",
    "social",
];
const PHONE_CUES: &[&str] = &["phone", "tel"];
const FULL_NAME_CUES: &[&str] = &[
    "your name",
    "your-name",
    "full name",
    "fullname",
    "contact name",
    "name *",
    "listcontact",
    "author",
];
const LAST_NAME_CUES: &[&str] = &["last_name", "lastname", "last name", "nachname"];
const FIRST_NAME_CUES: &[&str] = &["first_name", "firstname", "first name", "vorname"];
const USERNAME_CUES: &[&str] = &["username", "user name", "user_name"];
const PRODUCT_NAME_CUES: &[&str] = &[
    "tool name",
    "tool-name",
    "tool_name",
    "product name",
    "product_name",
    "company name",
    "company_name",
    "companyname",
    "startup name",
    "app name",
    "app_name",
    "project name",
    "title",
    "name of",
    "listorgname",
    "ai tool name",
];
const SUBJECT_CUES: &[&str] = &["subject"];
const JOB_CUES: &[&str] = &["job", "position", "industry", "role"];
const COMPANY_CUES: &[&str] = &["company"];
const LOCATION_CUES: &[&str] = &[
    "location", "city", "state", "zip", "country", "address", "addr",
];
const DATE_CUES: &[&str] = &["date", "launch", "when did"];
const CAPTCHA_CUES: &[&str] = &["captcha", "plus", "+ "];
const DESCRIPTION_CUES: &[&str] = &[
    "description",
    "message",
    "comment",
    "content",
    "overview",
    "about",
    "details",
    "summary",
    "pitch",
    "what does",
    "tell us",
    "how is your",
    "why did you",
    "founding",
    "short-ter",
    "where can people",
    "who is the",
    "product aimed",
    "statement",
    "promo",
    "bio",
];

/// The evaluated view of one field: tag, input subtype, and the combined
/// lowercased text every cue is checked against.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldCue {
    pub tag: String,
    pub input_type: String,
    pub combined: String,
}

impl FieldCue {
    pub fn from_field(field: &FieldDescriptor) -> Self {
        FieldCue {
            tag: field.tag.to_lowercase(),
            input_type: field.input_type.to_lowercase(),
            combined: format!(
                "{} {} {} {}",
                field.name, field.label, field.placeholder, field.id
            )
            .to_lowercase(),
        }
    }

    fn has_any(&self, cues: &[&str]) -> bool {
        cues.iter().any(|cue| self.combined.contains(cue))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RuleAction {
    Skip,
    Blank,
    Fill(SemanticSlot),
}

/// One row of the match table.
pub struct MatchRule {
    pub name: &'static str,
    pub applies: fn(&FieldCue) -> bool,
    pub action: RuleAction,
}

fn excluded_type(c: &FieldCue) -> bool {
    matches!(
        c.input_type.as_str(),
        "hidden" | "submit" | "checkbox" | "radio" | "file" | "image" | "search" | "button"
    )
}
fn password_type(c: &FieldCue) -> bool {
    c.input_type == "password"
}
fn email_cue(c: &FieldCue) -> bool {
    c.input_type == "email" || c.has_any(EMAIL_CUES)
}
fn url_field(c: &FieldCue) -> bool {
    c.input_type == "url" || c.has_any(URL_CUES)
}
fn url_github(c: &FieldCue) -> bool {
    url_field(c) && c.combined.contains("github")
}
fn url_twitter(c: &FieldCue) -> bool {
    url_field(c) && c.combined.contains("twitter")
}
fn url_social(c: &FieldCue) -> bool {
    url_field(c) && c.has_any(SOCIAL_CUES)
}
fn github_cue(c: &FieldCue) -> bool {
    c.combined.contains("github")
}
fn twitter_cue(c: &FieldCue) -> bool {
    c.combined.contains("twitter")
}
fn social_cue(c: &FieldCue) -> bool {
    c.has_any(SOCIAL_CUES)
}
fn phone_cue(c: &FieldCue) -> bool {
    c.input_type == "tel" || c.has_any(PHONE_CUES)
}
fn full_name_last(c: &FieldCue) -> bool {
    c.has_any(FULL_NAME_CUES) && (c.combined.contains("last") || c.combined.contains("nachname"))
}
fn full_name_first(c: &FieldCue) -> bool {
    c.has_any(FULL_NAME_CUES) && (c.combined.contains("first") || c.combined.contains("vorname"))
}
fn full_name_cue(c: &FieldCue) -> bool {
    c.has_any(FULL_NAME_CUES)
}
fn last_name_cue(c: &FieldCue) -> bool {
    c.has_any(LAST_NAME_CUES)
}
fn first_name_cue(c: &FieldCue) -> bool {
    c.has_any(FIRST_NAME_CUES)
}
fn username_cue(c: &FieldCue) -> bool {
    c.has_any(USERNAME_CUES)
}
fn product_name_cue(c: &FieldCue) -> bool {
    c.has_any(PRODUCT_NAME_CUES)
}
fn subject_cue(c: &FieldCue) -> bool {
    c.has_any(SUBJECT_CUES)
}
fn job_cue(c: &FieldCue) -> bool {
    c.has_any(JOB_CUES)
}
fn company_cue(c: &FieldCue) -> bool {
    c.has_any(COMPANY_CUES)
}
fn location_cue(c: &FieldCue) -> bool {
    c.has_any(LOCATION_CUES)
}
fn date_cue(c: &FieldCue) -> bool {
    c.input_type == "date" || c.has_any(DATE_CUES)
}
fn captcha_cue(c: &FieldCue) -> bool {
    c.has_any(CAPTCHA_CUES)
}
fn description_cue(c: &FieldCue) -> bool {
    c.tag == "textarea" || c.has_any(DESCRIPTION_CUES)
}

/// The full priority chain. Order is behavior; do not reorder without
/// auditing every rule below the edit.
pub const MATCH_RULES: &[MatchRule] = &[
    MatchRule { name: "excluded-type", applies: excluded_type, action: RuleAction::Skip },
    MatchRule { name: "password", applies: password_type, action: RuleAction::Fill(SemanticSlot::Password) },
    MatchRule { name: "email", applies: email_cue, action: RuleAction::Fill(SemanticSlot::Email) },
    MatchRule { name: "url-github", applies: url_github, action: RuleAction::Fill(SemanticSlot::Github) },
    MatchRule { name: "url-twitter", applies: url_twitter, action: RuleAction::Fill(SemanticSlot::Twitter) },
    MatchRule { name: "url-social", applies: url_social, action: RuleAction::Blank },
    MatchRule { name: "url", applies: url_field, action: RuleAction::Fill(SemanticSlot::Url) },
    MatchRule { name: "github", applies: github_cue, action: RuleAction::Fill(SemanticSlot::Github) },
    MatchRule { name: "twitter", applies: twitter_cue, action: RuleAction::Fill(SemanticSlot::Twitter) },
    MatchRule { name: "social", applies: social_cue, action: RuleAction::Blank },
    MatchRule { name: "phone", applies: phone_cue, action: RuleAction::Blank },
    MatchRule { name: "name-last", applies: full_name_last, action: RuleAction::Fill(SemanticSlot::LastName) },
    MatchRule { name: "name-first", applies: full_name_first, action: RuleAction::Fill(SemanticSlot::FirstName) },
    MatchRule { name: "name-full", applies: full_name_cue, action: RuleAction::Fill(SemanticSlot::FullName) },
    MatchRule { name: "last-name", applies: last_name_cue, action: RuleAction::Fill(SemanticSlot::LastName) },
    MatchRule { name: "first-name", applies: first_name_cue, action: RuleAction::Fill(SemanticSlot::FirstName) },
    MatchRule { name: "username", applies: username_cue, action: RuleAction::Fill(SemanticSlot::Username) },
    MatchRule { name: "product-name", applies: product_name_cue, action: RuleAction::Fill(SemanticSlot::ProductName) },
    MatchRule { name: "subject", applies: subject_cue, action: RuleAction::Fill(SemanticSlot::Subject) },
    MatchRule { name: "job", applies: job_cue, action: RuleAction::Fill(SemanticSlot::Job) },
    MatchRule { name: "company", applies: company_cue, action: RuleAction::Fill(SemanticSlot::Company) },
    MatchRule { name: "location", applies: location_cue, action: RuleAction::Blank },
    MatchRule { name: "date", applies: date_cue, action: RuleAction::Fill(SemanticSlot::LaunchDate) },
    MatchRule { name: "captcha", applies: captcha_cue, action: RuleAction::Skip },
    MatchRule { name: "description", applies: description_cue, action: RuleAction::Fill(SemanticSlot::Description) },
];

/// Decide what to do with one field. Pure: the same descriptor and value
/// dictionary always produce the same decision, and fields never influence
/// each other.
pub fn match_field(field: &FieldDescriptor, values: &FieldValues) -> FieldDecision {
    let cue = FieldCue::from_field(field);
    for rule in MATCH_RULES {
        if (rule.applies)(&cue) {
            return match rule.action {
                RuleAction::Skip => FieldDecision::Skip,
                RuleAction::Blank => FieldDecision::Blank,
                RuleAction::Fill(slot) => FieldDecision::Fill {
                    slot,
                    value: values.for_slot(slot),
                },
            };
        }
    }
    FieldDecision::Skip
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ProductProfile;

    fn profile() -> ProductProfile {
        ProductProfile {
            url: "https://acme.example".to_string(),
            app_url: "https://app.acme.example".to_string(),
            github: "https://github.com/acme/acme".to_string(),
            twitter: "https://twitter.com/acme".to_string(),
            name: "Acme".to_string(),
            tagline: "Ship faster".to_string(),
            email: "founders@acme.example".to_string(),
            author_name: "Jordan Doe".to_string(),
            author_first: "Jordan".to_string(),
            author_last: "Doe".to_string(),
            username: "acmehq".to_string(),
            password: "hunter2hunter2".to_string(),
            category_keywords: vec!["ai".to_string(), "saas".to_string()],
            logo_path: "assets/logo.png".to_string(),
            screenshot_path: "assets/screenshot.png".to_string(),
        }
    }

    fn values() -> FieldValues {
        FieldValues::new(&profile(), None)
    }

    fn field(name: &str, input_type: &str, tag: &str) -> FieldDescriptor {
        FieldDescriptor {
            tag: tag.to_string(),
            input_type: input_type.to_string(),
            name: name.to_string(),
            id: String::new(),
            placeholder: String::new(),
            label: String::new(),
            required: false,
            ordinal: 0,
        }
    }

    fn decide(name: &str, input_type: &str, tag: &str) -> FieldDecision {
        match_field(&field(name, input_type, tag), &values())
    }

    #[test]
    fn matching_is_idempotent() {
        let f = field("website_url", "url", "input");
        let v = values();
        let first = match_field(&f, &v);
        let second = match_field(&f, &v);
        assert_eq!(first, second);
    }

    #[test]
    fn captcha_fields_are_always_skipped() {
        assert_eq!(decide("captcha_answer", "text", "input"), FieldDecision::Skip);
        assert_eq!(decide("what is 3 plus 4", "text", "input"), FieldDecision::Skip);
    }

    #[test]
    fn excluded_types_are_skipped() {
        for t in ["hidden", "submit", "checkbox", "radio", "file", "image", "search", "button"] {
            assert_eq!(decide("anything", t, "input"), FieldDecision::Skip);
        }
    }

    #[test]
    fn password_type_gets_password_value() {
        match decide("pw", "password", "input") {
            FieldDecision::Fill { slot, value } => {
                assert_eq!(slot, SemanticSlot::Password);
                assert_eq!(value, "hunter2hunter2");
            }
            other => panic!("unexpected decision: {:?}", other),
        }
    }

    #[test]
    fn url_sub_dispatch() {
        match decide("github_url", "url", "input") {
            FieldDecision::Fill { slot, .. } => assert_eq!(slot, SemanticSlot::Github),
            other => panic!("unexpected: {:?}", other),
        }
        match decide("twitter link", "text", "input") {
            FieldDecision::Fill { slot, .. } => assert_eq!(slot, SemanticSlot::Twitter),
            other => panic!("unexpected: {:?}", other),
        }
        // A social-network url is intentionally blanked, not skipped.
        assert_eq!(decide("facebook page url", "url", "input"), FieldDecision::Blank);
        match decide("website", "text", "input") {
            FieldDecision::Fill { slot, value } => {
                assert_eq!(slot, SemanticSlot::Url);
                assert_eq!(value, "https://acme.example");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn phone_is_blanked() {
        assert_eq!(decide("phone_number", "tel", "input"), FieldDecision::Blank);
    }

    #[test]
    fn name_rules_sub_dispatch() {
        match decide("your name (first)", "text", "input") {
            FieldDecision::Fill { slot, .. } => assert_eq!(slot, SemanticSlot::FirstName),
            other => panic!("unexpected: {:?}", other),
        }
        match decide("contact name", "text", "input") {
            FieldDecision::Fill { slot, value } => {
                assert_eq!(slot, SemanticSlot::FullName);
                assert_eq!(value, "Jordan Doe");
            }
            other => panic!("unexpected: {:?}", other),
        }
        match decide("lastname", "text", "input") {
            FieldDecision::Fill { slot, .. } => assert_eq!(slot, SemanticSlot::LastName),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn product_and_subject_rules() {
        match decide("tool name", "text", "input") {
            FieldDecision::Fill { slot, value } => {
                assert_eq!(slot, SemanticSlot::ProductName);
                assert_eq!(value, "Acme");
            }
            other => panic!("unexpected: {:?}", other),
        }
        match decide("subject", "text", "input") {
            FieldDecision::Fill { slot, value } => {
                assert_eq!(slot, SemanticSlot::Subject);
                assert_eq!(value, "Acme - Ship faster");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn job_gets_fixed_placeholder() {
        match decide("your role", "text", "input") {
            FieldDecision::Fill { slot, value } => {
                assert_eq!(slot, SemanticSlot::Job);
                assert_eq!(value, "Founder");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn location_is_blanked_and_date_gets_placeholder() {
        assert_eq!(decide("city", "text", "input"), FieldDecision::Blank);
        match decide("launch date", "date", "input") {
            FieldDecision::Fill { slot, value } => {
                assert_eq!(slot, SemanticSlot::LaunchDate);
                assert_eq!(value, "2025-01-01");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn textarea_gets_description() {
        match decide("anything_at_all", "", "textarea") {
            FieldDecision::Fill { slot, .. } => assert_eq!(slot, SemanticSlot::Description),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn unmatched_field_is_skipped() {
        assert_eq!(decide("xyzzy", "text", "input"), FieldDecision::Skip);
    }
}
