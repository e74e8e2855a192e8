use crate::dom::dom_model::{Document, NodeId};
use crate::error::DomError;
use crate::field::field_model::{Classification, Exclusion, FieldDescriptor, FieldId, FieldKind, Validation};
use crate::field::label::{group_caption, resolve_label, LabelSource};
use crate::field::selector::synthesize;

const CAPTCHA_MARKERS: &[&str] = &["recaptcha", "captcha"];

/// Attributes that identify a control for the captcha check.
const IDENTIFYING_ATTRS: &[&str] = &["id", "name", "class"];

// ============================================================================
// Kind inference
// ============================================================================

/// Semantic kind from the native control type. `None` for inputs that hold
/// no user data (buttons, hidden).
pub fn infer_kind(doc: &Document, node: NodeId) -> Option<FieldKind> {
    match doc.tag(node)? {
        "textarea" => Some(FieldKind::TextArea),
        "select" => Some(FieldKind::Select),
        "input" => match doc.input_type(node)?.as_str() {
            "email" => Some(FieldKind::Email),
            "tel" => Some(FieldKind::Tel),
            "number" | "range" => Some(FieldKind::Number),
            "date" | "datetime-local" | "datetime" | "month" | "week" | "time" => {
                Some(FieldKind::Date)
            }
            "url" => Some(FieldKind::Url),
            "radio" => Some(FieldKind::Radio),
            "checkbox" => Some(FieldKind::Checkbox),
            "file" => Some(FieldKind::File),
            "hidden" | "submit" | "button" | "reset" | "image" => None,
            // text, search, password and anything unrecognised
            _ => Some(FieldKind::Text),
        },
        _ => None,
    }
}

// ============================================================================
// Exclusion policy
// ============================================================================

fn is_captcha(doc: &Document, node: NodeId) -> bool {
    IDENTIFYING_ATTRS.iter().any(|attr| {
        doc.attr(node, attr).is_some_and(|v| {
            let lower = v.to_lowercase();
            CAPTCHA_MARKERS.iter().any(|m| lower.contains(m))
        })
    })
}

/// Why `node` can never be surfaced or matched, if it can't. Visibility is
/// read from the live document on every call.
pub fn exclusion_reason(doc: &Document, node: NodeId) -> Option<Exclusion> {
    if !doc.is_form_control(node) {
        return Some(Exclusion::NotAControl);
    }
    if doc.input_type(node).as_deref() == Some("hidden") {
        return Some(Exclusion::HiddenType);
    }
    if infer_kind(doc, node).is_none() {
        return Some(Exclusion::NotFillable);
    }
    if is_captcha(doc, node) {
        return Some(Exclusion::Captcha);
    }
    if !doc.is_visible(node) {
        return Some(Exclusion::NotVisible);
    }
    None
}

// ============================================================================
// Value and constraint extraction
// ============================================================================

/// The value the user (or page) has already put in the control, `None` when
/// the control is effectively empty.
///
/// Selects count only an explicit selection, never the implicit first
/// option; checkboxes count when checked; radios when any group member is.
pub fn current_value(doc: &Document, node: NodeId, kind: FieldKind) -> Option<String> {
    let value = match kind {
        FieldKind::Select => doc
            .options(node)
            .into_iter()
            .filter(|o| o.selected)
            .map(|o| o.value)
            .find(|v| !v.trim().is_empty()),
        FieldKind::Checkbox => doc.checked(node).then(|| "true".to_string()),
        FieldKind::Radio => doc
            .radio_group(node)
            .into_iter()
            .find(|r| doc.checked(*r))
            .map(|r| doc.value(r)),
        FieldKind::File => None,
        _ => Some(doc.value(node)),
    };
    value.filter(|v| !v.trim().is_empty())
}

pub fn is_required(doc: &Document, node: NodeId) -> bool {
    doc.has_attr(node, "required")
        || doc
            .attr(node, "aria-required")
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
}

fn validation(doc: &Document, node: NodeId) -> Option<Validation> {
    let length = |attr: &str| -> Option<u32> {
        doc.attr_non_empty(node, attr).and_then(|v| v.parse().ok())
    };
    let text = |attr: &str| doc.attr_non_empty(node, attr).map(str::to_string);
    let rules = Validation {
        pattern: text("pattern"),
        min_length: length("minlength"),
        max_length: length("maxlength"),
        min: text("min"),
        max: text("max"),
    };
    (!rules.is_empty()).then_some(rules)
}

fn select_options(doc: &Document, node: NodeId) -> Vec<String> {
    doc.options(node)
        .into_iter()
        .map(|o| {
            if o.label.trim().is_empty() {
                o.value.trim().to_string()
            } else {
                o.label.trim().to_string()
            }
        })
        .filter(|o| !o.is_empty())
        .collect()
}

/// Caption of one radio: steps 1-4 of the waterfall, else its value.
pub fn radio_option_label(doc: &Document, radio: NodeId) -> String {
    match resolve_label(doc, radio) {
        Some((label, source)) if source != LabelSource::Attribute => label,
        _ => doc.value(radio).trim().to_string(),
    }
}

fn radio_options(doc: &Document, node: NodeId) -> Vec<String> {
    doc.radio_group(node)
        .into_iter()
        .map(|r| radio_option_label(doc, r))
        .filter(|l| !l.is_empty())
        .collect()
}

fn radio_group_label(doc: &Document, node: NodeId) -> Option<String> {
    group_caption(doc, node)
        .or_else(|| doc.attr_non_empty(node, "name").map(str::to_string))
        .or_else(|| resolve_label(doc, node).map(|(label, _)| label))
}

// ============================================================================
// Classification
// ============================================================================

/// Classify one control. The returned descriptor carries `FieldId(0)`;
/// discovery assigns the real id.
pub fn classify(doc: &Document, node: NodeId) -> Result<Classification, DomError> {
    doc.ensure_connected(node)?;

    if let Some(reason) = exclusion_reason(doc, node) {
        return Ok(Classification::Excluded(reason));
    }
    let Some(kind) = infer_kind(doc, node) else {
        return Ok(Classification::Excluded(Exclusion::NotFillable));
    };

    let label = match kind {
        FieldKind::Radio => radio_group_label(doc, node),
        _ => resolve_label(doc, node).map(|(label, _)| label),
    };
    let Some(label) = label.filter(|l| !l.is_empty()) else {
        return Ok(Classification::Excluded(Exclusion::Unlabeled));
    };

    let options = match kind {
        FieldKind::Select => Some(select_options(doc, node)),
        FieldKind::Radio => Some(radio_options(doc, node)),
        _ => None,
    };

    let context = group_caption(doc, node).filter(|c| *c != label);

    Ok(Classification::Field(Box::new(FieldDescriptor {
        id: FieldId(0),
        kind,
        label,
        name: doc.attr_non_empty(node, "name").map(str::to_string),
        dom_id: doc.attr_non_empty(node, "id").map(str::to_string),
        required: is_required(doc, node),
        current_value: current_value(doc, node, kind),
        selector: synthesize(doc, node),
        options,
        validation: validation(doc, node),
        context,
    })))
}
