//! Form discovery: one in-page enumeration of every input-like element,
//! then host-side filtering, label resolution and grouping so the rules stay
//! testable without a browser.

use serde::Deserialize;

use crate::domain::{FieldDescriptor, FormDescriptor, NO_FORM_WRAPPER};
use crate::services::surface::{RenderingSurface, SurfaceError};

/// Labels are truncated to keep descriptors small and stable for comparison.
const MAX_LABEL_LEN: usize = 100;

/// Input subtypes that never count as fillable fields.
const EXCLUDED_INPUT_KINDS: &[&str] = &["hidden", "submit", "button", "image", "reset"];

/// Enumerates every candidate element in document order. The `laid_out` flag
/// is the single visibility predicate: the element has at least one client
/// rect and an offset parent (textareas are exempt from the offset-parent
/// check, matching how browsers report them inside some layouts).
pub const ENUMERATE_SCRIPT: &str = r#"
const forms = [...document.querySelectorAll('form')];
const els = [...document.querySelectorAll('input, textarea, select, [contenteditable="true"]')];
return els.map((el, ordinal) => {
    const wrapper = el.closest('form');
    const laidOut = el.getClientRects().length > 0
        && (el.offsetParent !== null || el.tagName === 'TEXTAREA');
    const labelText = (el.labels && el.labels[0] && el.labels[0].textContent)
        ? el.labels[0].textContent.trim() : '';
    return {
        ordinal: ordinal,
        tag: el.tagName.toLowerCase(),
        type: (el.type || '').toLowerCase(),
        name: el.name || '',
        id: el.id || '',
        placeholder: el.placeholder || '',
        aria_label: el.getAttribute('aria-label') || '',
        label_text: labelText,
        required: !!el.required,
        laid_out: laidOut,
        form_ordinal: wrapper ? forms.indexOf(wrapper) : -1,
        form: wrapper ? {
            action: wrapper.getAttribute('action') || '',
            method: wrapper.getAttribute('method') || 'get',
            id: wrapper.id || '',
            class: (wrapper.className || '').substring(0, 100)
        } : null,
    };
});
"#;

/// Wire format of one enumerated element as the script reports it.
#[derive(Debug, Clone, Deserialize)]
pub struct RawElement {
    pub ordinal: usize,
    pub tag: String,
    #[serde(default, rename = "type")]
    pub input_type: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub placeholder: String,
    #[serde(default)]
    pub aria_label: String,
    #[serde(default)]
    pub label_text: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub laid_out: bool,
    #[serde(default)]
    pub form_ordinal: i64,
    #[serde(default)]
    pub form: Option<RawFormLocator>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawFormLocator {
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub id: String,
    #[serde(default, rename = "class")]
    pub class_name: String,
}

/// Run the enumeration script against a live page and shape the result.
pub async fn discover(surface: &dyn RenderingSurface) -> Result<Vec<FormDescriptor>, SurfaceError> {
    let raw = surface.evaluate(ENUMERATE_SCRIPT, vec![]).await?;
    let elements: Vec<RawElement> = serde_json::from_value(raw)
        .map_err(|e| SurfaceError::Evaluation(format!("bad enumeration payload: {}", e)))?;
    Ok(group_elements(elements))
}

/// Filter, label and group raw elements into form descriptors. Elements with
/// no layout box and hidden/submit-kind inputs never make it into a group.
/// When no `<form>`-wrapped group has fields, all qualifying unwrapped
/// inputs collapse into one synthetic group.
pub fn group_elements(elements: Vec<RawElement>) -> Vec<FormDescriptor> {
    let mut wrapped: Vec<(i64, FormDescriptor)> = vec![];
    let mut formless: Vec<FieldDescriptor> = vec![];

    for element in &elements {
        if !element.laid_out || is_excluded_kind(element) {
            continue;
        }
        let field = to_field(element);
        if element.form_ordinal >= 0 {
            match wrapped.iter_mut().find(|(o, _)| *o == element.form_ordinal) {
                Some((_, form)) => form.fields.push(field),
                None => {
                    let locator = element.form.clone().unwrap_or(RawFormLocator {
                        action: String::new(),
                        method: "get".to_string(),
                        id: String::new(),
                        class_name: String::new(),
                    });
                    wrapped.push((
                        element.form_ordinal,
                        FormDescriptor {
                            action: locator.action,
                            method: locator.method,
                            id: locator.id,
                            class_name: locator.class_name,
                            fields: vec![field],
                        },
                    ));
                }
            }
        } else {
            formless.push(field);
        }
    }

    let forms: Vec<FormDescriptor> = wrapped.into_iter().map(|(_, form)| form).collect();
    if !forms.is_empty() {
        return forms;
    }
    if formless.is_empty() {
        return vec![];
    }
    vec![FormDescriptor {
        action: String::new(),
        method: String::new(),
        id: NO_FORM_WRAPPER.to_string(),
        class_name: String::new(),
        fields: formless,
    }]
}

fn is_excluded_kind(element: &RawElement) -> bool {
    element.tag == "input" && EXCLUDED_INPUT_KINDS.contains(&element.input_type.as_str())
}

fn to_field(element: &RawElement) -> FieldDescriptor {
    FieldDescriptor {
        tag: element.tag.clone(),
        input_type: element.input_type.clone(),
        name: element.name.clone(),
        id: element.id.clone(),
        placeholder: truncate(&element.placeholder),
        label: resolve_label(element),
        required: element.required,
        ordinal: element.ordinal,
    }
}

/// Label precedence: associated label text, aria-label, placeholder, name
/// attribute, id attribute, empty string. First non-empty wins.
fn resolve_label(element: &RawElement) -> String {
    let candidates = [
        &element.label_text,
        &element.aria_label,
        &element.placeholder,
        &element.name,
        &element.id,
    ];
    for candidate in candidates {
        let trimmed = candidate.trim();
        if !trimmed.is_empty() {
            return truncate(trimmed);
        }
    }
    String::new()
}

fn truncate(text: &str) -> String {
    text.chars().take(MAX_LABEL_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(name: &str, input_type: &str, form_ordinal: i64) -> RawElement {
        RawElement {
            ordinal: 0,
            tag: "input".to_string(),
            input_type: input_type.to_string(),
            name: name.to_string(),
            id: String::new(),
            placeholder: String::new(),
            aria_label: String::new(),
            label_text: String::new(),
            required: false,
            laid_out: true,
            form_ordinal,
            form: Some(RawFormLocator {
                action: "/submit".to_string(),
                method: "post".to_string(),
                id: "submit-form".to_string(),
                class_name: String::new(),
            }),
        }
    }

    #[test]
    fn elements_without_layout_box_are_excluded() {
        let mut hidden_by_css = raw("email", "email", 0);
        hidden_by_css.laid_out = false;
        let forms = group_elements(vec![hidden_by_css, raw("name", "text", 0)]);
        assert_eq!(forms.len(), 1);
        assert_eq!(forms[0].fields.len(), 1);
        assert_eq!(forms[0].fields[0].name, "name");
    }

    #[test]
    fn hidden_and_submit_kinds_are_excluded() {
        let forms = group_elements(vec![
            raw("csrf", "hidden", 0),
            raw("go", "submit", 0),
            raw("email", "email", 0),
        ]);
        assert_eq!(forms[0].fields.len(), 1);
        assert_eq!(forms[0].fields[0].input_type, "email");
    }

    #[test]
    fn label_precedence_first_non_empty_wins() {
        let mut el = raw("field_name", "text", 0);
        el.placeholder = "Your email".to_string();
        el.aria_label = "Email address".to_string();
        let forms = group_elements(vec![el]);
        assert_eq!(forms[0].fields[0].label, "Email address");

        let mut el = raw("field_name", "text", 0);
        el.id = "field-id".to_string();
        let forms = group_elements(vec![el]);
        assert_eq!(forms[0].fields[0].label, "field_name");
    }

    #[test]
    fn labels_are_truncated() {
        let mut el = raw("n", "text", 0);
        el.label_text = "x".repeat(250);
        let forms = group_elements(vec![el]);
        assert_eq!(forms[0].fields[0].label.len(), MAX_LABEL_LEN);
    }

    #[test]
    fn formless_inputs_collapse_into_synthetic_group() {
        let mut unwrapped = raw("search_query", "text", -1);
        unwrapped.form = None;
        let forms = group_elements(vec![unwrapped]);
        assert_eq!(forms.len(), 1);
        assert!(forms[0].is_synthetic());
        assert_eq!(forms[0].id, NO_FORM_WRAPPER);
    }

    #[test]
    fn synthetic_group_only_when_no_wrapped_group_has_fields() {
        let mut unwrapped = raw("stray", "text", -1);
        unwrapped.form = None;
        let forms = group_elements(vec![raw("email", "email", 0), unwrapped]);
        assert_eq!(forms.len(), 1);
        assert!(!forms[0].is_synthetic());
    }

    #[test]
    fn fields_group_by_enclosing_form() {
        let mut second_form = raw("comment", "text", 1);
        second_form.form = Some(RawFormLocator {
            action: "/comment".to_string(),
            method: "post".to_string(),
            id: String::new(),
            class_name: "comment-box".to_string(),
        });
        let forms = group_elements(vec![
            raw("email", "email", 0),
            raw("name", "text", 0),
            second_form,
        ]);
        assert_eq!(forms.len(), 2);
        assert_eq!(forms[0].fields.len(), 2);
        assert_eq!(forms[1].class_name, "comment-box");
    }
}
