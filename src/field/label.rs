use crate::dom::controls::collapse_whitespace;
use crate::dom::dom_model::{Document, NodeId};

/// Where a resolved caption came from, most to least reliable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LabelSource {
    LabelFor,
    WrappingLabel,
    AccessibleName,
    Placeholder,
    Attribute,
}

/// Collapse whitespace and drop trailing required markers ("Email *").
pub fn normalize_label(raw: &str) -> String {
    collapse_whitespace(raw)
        .trim_end_matches(['*', ':'])
        .trim_end()
        .to_string()
}

/// `<label for=...>` elements pointing at the control's id.
fn labels_for(doc: &Document, node: NodeId) -> Vec<NodeId> {
    let Some(id) = doc.attr_non_empty(node, "id") else {
        return Vec::new();
    };
    doc.elements_by_tag(&["label"])
        .into_iter()
        .filter(|l| doc.attr(*l, "for").map(str::trim) == Some(id))
        .collect()
}

fn wrapping_label(doc: &Document, node: NodeId) -> Option<NodeId> {
    doc.ancestors(node).find(|a| doc.is_tag(*a, "label"))
}

/// Text of every `<label>` associated with the control: explicit `for`
/// labels first, then a wrapping label with the control's own text removed.
pub fn associated_label_texts(doc: &Document, node: NodeId) -> Vec<String> {
    let mut texts: Vec<String> = labels_for(doc, node)
        .into_iter()
        .map(|l| normalize_label(&doc.text_content(l)))
        .collect();
    if let Some(wrapper) = wrapping_label(doc, node) {
        texts.push(normalize_label(&doc.text_content_excluding(wrapper, node)));
    }
    texts.retain(|t| !t.is_empty());
    texts
}

/// aria-label, else the text of the aria-labelledby targets.
pub fn accessible_name(doc: &Document, node: NodeId) -> Option<String> {
    if let Some(label) = doc.attr_non_empty(node, "aria-label") {
        return Some(normalize_label(label));
    }
    let ids = doc.attr_non_empty(node, "aria-labelledby")?;
    let text = ids
        .split_whitespace()
        .filter_map(|id| doc.get_element_by_id(id))
        .map(|n| doc.text_content(n))
        .collect::<Vec<_>>()
        .join(" ");
    Some(normalize_label(&text)).filter(|t| !t.is_empty())
}

/// Label waterfall; the first non-empty source wins.
pub fn resolve_label(doc: &Document, node: NodeId) -> Option<(String, LabelSource)> {
    if let Some(text) = labels_for(doc, node)
        .into_iter()
        .map(|l| normalize_label(&doc.text_content(l)))
        .find(|t| !t.is_empty())
    {
        return Some((text, LabelSource::LabelFor));
    }

    if let Some(wrapper) = wrapping_label(doc, node) {
        let text = normalize_label(&doc.text_content_excluding(wrapper, node));
        if !text.is_empty() {
            return Some((text, LabelSource::WrappingLabel));
        }
    }

    if let Some(text) = accessible_name(doc, node) {
        return Some((text, LabelSource::AccessibleName));
    }

    if let Some(placeholder) = doc.attr_non_empty(node, "placeholder") {
        return Some((normalize_label(placeholder), LabelSource::Placeholder));
    }

    doc.attr_non_empty(node, "name")
        .or_else(|| doc.attr_non_empty(node, "id"))
        .map(|raw| (raw.to_string(), LabelSource::Attribute))
}

/// Caption of the nearest grouping container: a fieldset legend, or a
/// `role=group|radiogroup` element's accessible name.
pub fn group_caption(doc: &Document, node: NodeId) -> Option<String> {
    for ancestor in doc.ancestors(node) {
        if doc.is_tag(ancestor, "fieldset") {
            let legend = doc
                .element_children(ancestor)
                .into_iter()
                .find(|c| doc.is_tag(*c, "legend"))
                .map(|l| normalize_label(&doc.text_content(l)))
                .filter(|t| !t.is_empty());
            if legend.is_some() {
                return legend;
            }
        }
        if matches!(doc.attr(ancestor, "role"), Some("group" | "radiogroup")) {
            if let Some(name) = accessible_name(doc, ancestor) {
                return Some(name);
            }
        }
    }
    None
}
