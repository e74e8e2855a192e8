use crate::dom::dom_model::{Document, NodeId};

/// Last declaration of `property` in an inline `style` attribute, lowercased,
/// with any `!important` stripped.
pub fn inline_style(doc: &Document, node: NodeId, property: &str) -> Option<String> {
    let style = doc.attr(node, "style")?;
    style
        .split(';')
        .filter_map(|decl| decl.split_once(':'))
        .filter(|(name, _)| name.trim().eq_ignore_ascii_case(property))
        .map(|(_, value)| {
            value
                .trim()
                .trim_end_matches("!important")
                .trim()
                .to_ascii_lowercase()
        })
        .last()
}

fn is_zero_opacity(value: &str) -> bool {
    let number = value.trim_end_matches('%');
    number.parse::<f32>().is_ok_and(|n| n <= 0.0)
}

impl Document {
    /// Whether the element currently renders. Computed from the live
    /// attributes on every call.
    pub fn is_visible(&self, node: NodeId) -> bool {
        if !self.is_connected(node) || self.element(node).is_none() {
            return false;
        }

        let chain = std::iter::once(node).chain(self.ancestors(node));
        let mut visibility_decided = false;

        for n in chain {
            if self.has_attr(n, "hidden") {
                return false;
            }
            if inline_style(self, n, "display").as_deref() == Some("none") {
                return false;
            }
            if inline_style(self, n, "opacity").is_some_and(|o| is_zero_opacity(&o)) {
                return false;
            }
            // visibility inherits: the nearest declaration wins
            if !visibility_decided {
                if let Some(v) = inline_style(self, n, "visibility") {
                    if v == "hidden" || v == "collapse" {
                        return false;
                    }
                    visibility_decided = true;
                }
            }
        }
        true
    }
}
