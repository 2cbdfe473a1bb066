//! Submission executor: writes matched values into a live form through the
//! surface's native value-assignment path, assigns upload files, then finds
//! and clicks the submit control.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::domain::{
    CopyVariant, FieldDecision, FieldValues, FormDescriptor, ProductProfile, SubmissionStatus,
    SubmitReport,
};
use crate::services::field_matcher::match_field;
use crate::services::surface::{FileInputInfo, RenderingSurface, SurfaceError};

const POST_SUBMIT_WAIT: Duration = Duration::from_secs(2);

const LOGO_FILE_CUES: &[&str] = &["logo", "icon", "avatar"];
const SCREENSHOT_FILE_CUES: &[&str] =
    &["screen", "image", "photo", "screenshot", "cover", "banner"];

/// One write the fill script should perform, addressed by the element's
/// position in the discovery enumeration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FillInstruction {
    pub ordinal: usize,
    pub value: String,
    pub select: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct FillOutcome {
    #[serde(default)]
    filled: usize,
    #[serde(default)]
    errors: usize,
    #[serde(default)]
    touched: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ClickOutcome {
    #[serde(default)]
    clicked: bool,
    #[serde(default)]
    button_text: String,
}

/// Values are written through the element prototype's value setter and
/// followed by input/change events; anything less is invisible to
/// framework-bound inputs. Select controls pick the first option whose
/// visible text matches a category keyword instead of a fixed index.
const FILL_SCRIPT: &str = r#"
const plan = arguments[0];
const keywords = arguments[1];
const els = [...document.querySelectorAll('input, textarea, select, [contenteditable="true"]')];
let filled = 0;
let errors = 0;
const touched = [];
for (const item of plan) {
    const el = els[item.ordinal];
    if (!el) { errors += 1; continue; }
    try {
        if (item.select) {
            const options = [...el.options];
            const hit = options.find(o => keywords.some(k => o.text.toLowerCase().includes(k)));
            if (hit) {
                el.value = hit.value;
                el.dispatchEvent(new Event('change', { bubbles: true }));
                filled += 1;
                touched.push(el.name || el.id || String(item.ordinal));
            }
        } else if (el.isContentEditable) {
            el.textContent = item.value;
            el.dispatchEvent(new Event('input', { bubbles: true }));
            if (item.value.length > 0) {
                filled += 1;
                touched.push(el.name || el.id || String(item.ordinal));
            }
        } else {
            const proto = el.tagName === 'TEXTAREA'
                ? window.HTMLTextAreaElement.prototype
                : window.HTMLInputElement.prototype;
            const setter = Object.getOwnPropertyDescriptor(proto, 'value');
            if (setter && setter.set) { setter.set.call(el, item.value); } else { el.value = item.value; }
            el.dispatchEvent(new Event('input', { bubbles: true }));
            el.dispatchEvent(new Event('change', { bubbles: true }));
            if (item.value.length > 0) {
                filled += 1;
                touched.push(el.name || el.id || String(item.ordinal));
            }
        }
    } catch (e) { errors += 1; }
}
return { filled: filled, errors: errors, touched: touched.slice(0, 20) };
"#;

/// Best-guess submit control: an interactive element whose visible text
/// starts with a submission verb, with a plain submit button as fallback.
const SUBMIT_SCRIPT: &str = r#"
const verbs = ['submit', 'send', 'post', 'add', 'create', 'register', 'sign up', 'list', 'save'];
const buttons = [...document.querySelectorAll('button, input[type="submit"], a[role="button"]')];
let target = buttons.find(b => {
    const t = (b.textContent || b.value || '').toLowerCase().trim();
    return verbs.some(v => t.startsWith(v));
});
if (!target) {
    target = document.querySelector('button[type="submit"], input[type="submit"], button:not([type])');
}
if (!target) { return { clicked: false, button_text: '' }; }
const text = (target.textContent || target.value || '').trim().substring(0, 50);
target.click();
return { clicked: true, button_text: text };
"#;

/// Turn discovered forms into fill instructions. Returns the plan plus the
/// count of fields the matcher refused to touch.
pub fn build_fill_plan(
    forms: &[FormDescriptor],
    values: &FieldValues,
) -> (Vec<FillInstruction>, usize) {
    let mut plan = vec![];
    let mut skipped = 0;
    for form in forms {
        for field in &form.fields {
            match match_field(field, values) {
                FieldDecision::Skip => skipped += 1,
                FieldDecision::Blank => {
                    // Selects cannot be meaningfully blanked; leave them be.
                    match field.tag == "select" {
                        true => skipped += 1,
                        false => plan.push(FillInstruction {
                            ordinal: field.ordinal,
                            value: String::new(),
                            select: false,
                        }),
                    }
                }
                FieldDecision::Fill { value, .. } => plan.push(FillInstruction {
                    ordinal: field.ordinal,
                    value,
                    select: field.tag == "select",
                }),
            }
        }
    }
    (plan, skipped)
}

/// Pick an upload file for each file input by filename cue. Unmatched inputs
/// default to the screenshot first, then the logo.
pub fn assign_uploads(inputs: &[FileInputInfo], profile: &ProductProfile) -> Vec<(usize, String)> {
    let mut assignments = vec![];
    let mut unmatched = 0;
    for input in inputs {
        let cue = format!("{} {}", input.name, input.id).to_lowercase();
        if LOGO_FILE_CUES.iter().any(|c| cue.contains(c)) {
            assignments.push((input.ordinal, profile.logo_path.clone()));
        } else if SCREENSHOT_FILE_CUES.iter().any(|c| cue.contains(c)) {
            assignments.push((input.ordinal, profile.screenshot_path.clone()));
        } else {
            unmatched += 1;
            let path = match unmatched {
                1 => profile.screenshot_path.clone(),
                _ => profile.logo_path.clone(),
            };
            assignments.push((input.ordinal, path));
        }
    }
    assignments
}

/// Fill, upload and submit one discovered form set. The submit control is
/// clicked only when at least one field was actually filled.
pub async fn apply(
    surface: &dyn RenderingSurface,
    forms: &[FormDescriptor],
    profile: &ProductProfile,
    copy: Option<&CopyVariant>,
) -> Result<(SubmissionStatus, SubmitReport), SurfaceError> {
    let values = FieldValues::new(profile, copy);
    let (plan, mut skipped) = build_fill_plan(forms, &values);

    let mut filled = 0;
    if !plan.is_empty() {
        let plan_json = serde_json::to_value(&plan)
            .map_err(|e| SurfaceError::Evaluation(format!("bad fill plan: {}", e)))?;
        let raw = surface
            .evaluate(FILL_SCRIPT, vec![plan_json, json!(profile.category_keywords)])
            .await?;
        let outcome: FillOutcome = serde_json::from_value(raw)
            .map_err(|e| SurfaceError::Evaluation(format!("bad fill payload: {}", e)))?;
        log::debug!("Filled fields: {:?}", outcome.touched);
        filled = outcome.filled;
        skipped += outcome.errors;
    }

    // A broken file input must not sink the rest of the submission.
    let file_inputs = match surface.file_inputs().await {
        Ok(inputs) => inputs,
        Err(e) => {
            log::warn!("Could not enumerate file inputs: {}", e);
            vec![]
        }
    };
    for (ordinal, path) in assign_uploads(&file_inputs, profile) {
        if let Err(e) = surface.upload_file(ordinal, Path::new(&path)).await {
            log::warn!("Upload into file input {} failed: {}", ordinal, e);
        }
    }

    let mut submitted = false;
    let mut button_text = String::new();
    if filled > 0 {
        let raw = surface.evaluate(SUBMIT_SCRIPT, vec![]).await?;
        let click: ClickOutcome = serde_json::from_value(raw)
            .map_err(|e| SurfaceError::Evaluation(format!("bad click payload: {}", e)))?;
        submitted = click.clicked;
        button_text = click.button_text;
        if submitted {
            tokio::time::sleep(POST_SUBMIT_WAIT).await;
        }
    }

    let page_url = surface.current_url().await.unwrap_or_default();
    let status = match (submitted, filled > 0) {
        (true, true) => SubmissionStatus::Submitted,
        (false, true) => SubmissionStatus::FilledNoSubmit,
        _ => SubmissionStatus::NoFieldsMatched,
    };
    let report = SubmitReport {
        filled,
        skipped,
        submitted,
        submit_button_text: button_text,
        page_url,
        error: None,
    };
    Ok((status, report))
}
