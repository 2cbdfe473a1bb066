use serde::{Deserialize, Serialize};

/// Locator id used for the synthetic group that collects qualifying inputs
/// rendered outside any `<form>` container.
pub const NO_FORM_WRAPPER: &str = "_no_form_wrapper";

/// One discovered submission form: its locator plus the visible fields it
/// wraps. The synthetic formless group uses [`NO_FORM_WRAPPER`] as its id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormDescriptor {
    pub action: String,
    pub method: String,
    pub id: String,
    #[serde(rename = "class")]
    pub class_name: String,
    pub fields: Vec<FieldDescriptor>,
}

impl FormDescriptor {
    pub fn is_synthetic(&self) -> bool {
        self.id == NO_FORM_WRAPPER
    }
}

/// Structural description of a single input element. `ordinal` is the
/// element's position in the discovery enumeration, used to address the same
/// element again when filling within the same page visit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub tag: String,
    #[serde(rename = "type")]
    pub input_type: String,
    pub name: String,
    pub id: String,
    pub placeholder: String,
    pub label: String,
    pub required: bool,
    #[serde(default)]
    pub ordinal: usize,
}

/// Semantic slot a field was matched to. Each slot resolves to exactly one
/// value from the product profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticSlot {
    Password,
    Email,
    Url,
    Github,
    Twitter,
    FirstName,
    LastName,
    FullName,
    Username,
    ProductName,
    Subject,
    Job,
    Company,
    LaunchDate,
    Description,
}

/// The matcher's verdict for one field. `Blank` writes an empty value so a
/// required-but-irrelevant field does not keep its default; `Skip` leaves the
/// control completely untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldDecision {
    Skip,
    Blank,
    Fill { slot: SemanticSlot, value: String },
}

/// Result of one fill-and-submit attempt, persisted on the entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitReport {
    pub filled: usize,
    pub skipped: usize,
    pub submitted: bool,
    pub submit_button_text: String,
    pub page_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SubmitReport {
    pub fn from_error(message: String) -> Self {
        SubmitReport {
            filled: 0,
            skipped: 0,
            submitted: false,
            submit_button_text: String::new(),
            page_url: String::new(),
            error: Some(message),
        }
    }
}
