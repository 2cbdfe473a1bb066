use serde::{Deserialize, Serialize};

use crate::domain::form::SemanticSlot;

/// The product being submitted. An immutable value passed into the
/// submission executor at call time, never read from ambient state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductProfile {
    pub url: String,
    pub app_url: String,
    pub github: String,
    pub twitter: String,
    pub name: String,
    pub tagline: String,
    pub email: String,
    pub author_name: String,
    pub author_first: String,
    pub author_last: String,
    pub username: String,
    pub password: String,
    pub category_keywords: Vec<String>,
    pub logo_path: String,
    pub screenshot_path: String,
}

/// Per-entry listing copy. Falls back to a title built from the profile when
/// an entry carries no variant of its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CopyVariant {
    pub title: String,
    pub description: String,
}

/// The value dictionary the field matcher draws from: one resolved string
/// per semantic slot.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldValues {
    pub password: String,
    pub email: String,
    pub url: String,
    pub github: String,
    pub twitter: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub username: String,
    pub product_name: String,
    pub subject: String,
    pub job_title: String,
    pub company: String,
    pub launch_date: String,
    pub description: String,
}

const JOB_TITLE_PLACEHOLDER: &str = "Founder";
const LAUNCH_DATE_PLACEHOLDER: &str = "2025-01-01";

impl FieldValues {
    pub fn new(profile: &ProductProfile, copy: Option<&CopyVariant>) -> Self {
        let subject = copy
            .map(|c| c.title.clone())
            .unwrap_or_else(|| format!("{} - {}", profile.name, profile.tagline));
        let description = copy
            .map(|c| c.description.clone())
            .unwrap_or_else(|| profile.tagline.clone());

        FieldValues {
            password: profile.password.clone(),
            email: profile.email.clone(),
            url: profile.url.clone(),
            github: profile.github.clone(),
            twitter: profile.twitter.clone(),
            first_name: profile.author_first.clone(),
            last_name: profile.author_last.clone(),
            full_name: profile.author_name.clone(),
            username: profile.username.clone(),
            product_name: profile.name.clone(),
            subject,
            job_title: JOB_TITLE_PLACEHOLDER.to_string(),
            company: profile.name.clone(),
            launch_date: LAUNCH_DATE_PLACEHOLDER.to_string(),
            description,
        }
    }

    pub fn for_slot(&self, slot: SemanticSlot) -> String {
        match slot {
            SemanticSlot::Password => self.password.clone(),
            SemanticSlot::Email => self.email.clone(),
            SemanticSlot::Url => self.url.clone(),
            SemanticSlot::Github => self.github.clone(),
            SemanticSlot::Twitter => self.twitter.clone(),
            SemanticSlot::FirstName => self.first_name.clone(),
            SemanticSlot::LastName => self.last_name.clone(),
            SemanticSlot::FullName => self.full_name.clone(),
            SemanticSlot::Username => self.username.clone(),
            SemanticSlot::ProductName => self.product_name.clone(),
            SemanticSlot::Subject => self.subject.clone(),
            SemanticSlot::Job => self.job_title.clone(),
            SemanticSlot::Company => self.company.clone(),
            SemanticSlot::LaunchDate => self.launch_date.clone(),
            SemanticSlot::Description => self.description.clone(),
        }
    }
}
