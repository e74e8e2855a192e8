use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::dom::dom_model::{Document, NodeId};
use crate::dom::events::EventKind;
use crate::error::DomError;
use crate::field::classifier::{current_value, infer_kind, radio_option_label};
use crate::field::field_model::{FieldKind, FillValue};
use crate::inject::options::{pick_choice, Choice};

/// Result of one fill attempt. Only `Filled` counts as a success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum FillOutcome {
    Filled,
    /// The control already held a value; nothing was written
    AlreadyFilled,
    /// No control matched the instruction
    NoMatch,
    /// Select/radio/checkbox had no entry fitting the value
    NoOption,
    EmptyValue,
    /// Control kind cannot be filled programmatically (file inputs)
    Unsupported,
    /// The page threw or the element went away mid-fill
    Failed(String),
}

impl FillOutcome {
    pub fn is_filled(&self) -> bool {
        matches!(self, FillOutcome::Filled)
    }
}

/// Fill `node` with `value`. Never panics and never propagates: errors from
/// the page become `FillOutcome::Failed` for this field alone.
pub fn inject(doc: &mut Document, node: NodeId, value: &FillValue) -> FillOutcome {
    match try_inject(doc, node, value) {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(node = %node, error = %e, "Fill failed");
            FillOutcome::Failed(e.to_string())
        }
    }
}

/// Fill `node`, surfacing page errors to the caller.
///
/// A control that already holds a value is never written to.
pub fn try_inject(doc: &mut Document, node: NodeId, value: &FillValue) -> Result<FillOutcome, DomError> {
    doc.ensure_connected(node)?;

    let Some(kind) = infer_kind(doc, node) else {
        return Ok(FillOutcome::Unsupported);
    };
    if let Some(existing) = current_value(doc, node, kind) {
        debug!(node = %node, existing = %existing, "Control already filled, leaving it alone");
        return Ok(FillOutcome::AlreadyFilled);
    }
    if value.is_blank() {
        return Ok(FillOutcome::EmptyValue);
    }

    match kind {
        FieldKind::Select => fill_select(doc, node, value),
        FieldKind::Radio => fill_radio(doc, node, value),
        FieldKind::Checkbox => fill_checkbox(doc, node, value),
        FieldKind::File => Ok(FillOutcome::Unsupported),
        _ => fill_text(doc, node, &value.as_text()),
    }
}

/// Write through the tag's native setter so framework trackers see the
/// change, then fire input, change, focus and blur.
fn fill_text(doc: &mut Document, node: NodeId, text: &str) -> Result<FillOutcome, DomError> {
    let tag = doc.tag(node).unwrap_or_default().to_string();
    if doc.has_native_value_setter(&tag) {
        doc.set_value_native(node, text)?;
    } else {
        debug!(node = %node, tag = %tag, "No native setter, writing the value property");
        doc.set_value_property(node, text)?;
    }

    doc.dispatch(node, EventKind::Input, true)?;
    doc.dispatch(node, EventKind::Change, true)?;
    // many forms validate only on blur
    doc.focus(node)?;
    doc.blur(node)?;
    Ok(FillOutcome::Filled)
}

fn fill_select(doc: &mut Document, node: NodeId, value: &FillValue) -> Result<FillOutcome, DomError> {
    let options = doc.options(node);
    let choices: Vec<Choice> = options
        .iter()
        .map(|o| Choice::new(o.value.as_str(), o.label.as_str()))
        .collect();

    let targets = if doc.has_attr(node, "multiple") {
        value.values()
    } else {
        value.first().into_iter().collect()
    };

    let mut picked = Vec::with_capacity(targets.len());
    for target in &targets {
        match pick_choice(&choices, target) {
            Some(index) => picked.push(options[index].node),
            // no partial writes
            None => return Ok(FillOutcome::NoOption),
        }
    }
    if picked.is_empty() {
        return Ok(FillOutcome::NoOption);
    }

    for option in picked {
        doc.select_option(node, option)?;
    }
    doc.dispatch(node, EventKind::Change, true)?;
    doc.blur(node)?;
    Ok(FillOutcome::Filled)
}

fn fill_radio(doc: &mut Document, node: NodeId, value: &FillValue) -> Result<FillOutcome, DomError> {
    let Some(target) = value.first() else {
        return Ok(FillOutcome::NoOption);
    };
    let group = doc.radio_group(node);
    let choices: Vec<Choice> = group
        .iter()
        .map(|r| Choice::new(doc.value(*r), radio_option_label(doc, *r)))
        .collect();

    let Some(index) = pick_choice(&choices, target) else {
        return Ok(FillOutcome::NoOption);
    };
    let radio = group[index];
    doc.set_checked(radio, true)?;
    doc.dispatch(radio, EventKind::Change, true)?;
    Ok(FillOutcome::Filled)
}

/// Interpret a fill value as a checkbox state.
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "y" | "1" | "on" | "checked" => Some(true),
        "false" | "no" | "n" | "0" | "off" | "unchecked" => Some(false),
        _ => None,
    }
}

fn fill_checkbox(doc: &mut Document, node: NodeId, value: &FillValue) -> Result<FillOutcome, DomError> {
    let Some(flag) = value.first().and_then(parse_flag) else {
        return Ok(FillOutcome::NoOption);
    };
    doc.set_checked(node, flag)?;
    doc.dispatch(node, EventKind::Change, true)?;
    Ok(FillOutcome::Filled)
}
