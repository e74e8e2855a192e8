use crate::dom::dom_model::{Document, NodeId};
use crate::error::DomError;

/// One `<option>` of a select, as the page presents it.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionInfo {
    pub node: NodeId,
    /// `value` attribute, or the text when the attribute is absent
    pub value: String,
    /// Visible text, whitespace-collapsed
    pub label: String,
    pub selected: bool,
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl Document {
    pub fn is_form_control(&self, id: NodeId) -> bool {
        matches!(self.tag(id), Some("input" | "textarea" | "select"))
    }

    /// Lowercased `type` of an input, `"text"` when missing.
    pub fn input_type(&self, id: NodeId) -> Option<String> {
        if !self.is_tag(id, "input") {
            return None;
        }
        Some(
            self.attr_non_empty(id, "type")
                .unwrap_or("text")
                .to_ascii_lowercase(),
        )
    }

    /// The `value` IDL attribute as a script would read it.
    pub fn value(&self, id: NodeId) -> String {
        let Some(el) = self.element(id) else {
            return String::new();
        };
        match el.tag.as_str() {
            "input" => el
                .value
                .clone()
                .or_else(|| el.attr("value").map(str::to_string))
                .unwrap_or_default(),
            "textarea" => el.value.clone().unwrap_or_else(|| self.text_content(id)),
            "select" => {
                let options = self.options(id);
                options
                    .iter()
                    .find(|o| o.selected)
                    .or_else(|| {
                        if self.has_attr(id, "multiple") {
                            None
                        } else {
                            options.first()
                        }
                    })
                    .map(|o| o.value.clone())
                    .unwrap_or_default()
            }
            "option" => self.option_value(id),
            _ => String::new(),
        }
    }

    /// Write through the element's original prototype setter. Framework
    /// trackers shadowing the instance property are not notified.
    pub fn set_value_native(&mut self, id: NodeId, value: &str) -> Result<(), DomError> {
        self.ensure_connected(id)?;
        self.require_text_control(id)?;
        let el = self.element_mut(id)?;
        el.value = Some(value.to_string());
        Ok(())
    }

    /// Write through the element's apparent `value` property. When a
    /// framework has installed a tracker, the tracker records the new value
    /// too and will not report a change on the next input event.
    pub fn set_value_property(&mut self, id: NodeId, value: &str) -> Result<(), DomError> {
        self.ensure_connected(id)?;
        self.require_text_control(id)?;
        let el = self.element_mut(id)?;
        el.value = Some(value.to_string());
        if el.tracker.is_some() {
            el.tracker = Some(value.to_string());
        }
        Ok(())
    }

    /// Input and textarea each carry a distinct native setter; nothing else
    /// has one.
    pub fn has_native_value_setter(&self, tag: &str) -> bool {
        self.native_setters_available() && matches!(tag, "input" | "textarea")
    }

    fn require_text_control(&self, id: NodeId) -> Result<(), DomError> {
        match self.tag(id) {
            Some("input" | "textarea") => Ok(()),
            other => Err(DomError::NotAControl {
                node: id.0,
                tag: other.unwrap_or("#text").to_string(),
            }),
        }
    }

    pub fn checked(&self, id: NodeId) -> bool {
        self.element(id).is_some_and(|el| el.checked)
    }

    /// Set checkedness. Checking a radio unchecks the rest of its group.
    pub fn set_checked(&mut self, id: NodeId, checked: bool) -> Result<(), DomError> {
        self.ensure_connected(id)?;
        let is_radio = self.input_type(id).as_deref() == Some("radio");
        if checked && is_radio {
            for other in self.radio_group(id) {
                if other != id {
                    self.element_mut(other)?.checked = false;
                }
            }
        }
        self.element_mut(id)?.checked = checked;
        Ok(())
    }

    /// Radios sharing `id`'s name (within the same form owner), including
    /// `id` itself, in document order. An unnamed radio is its own group.
    pub fn radio_group(&self, id: NodeId) -> Vec<NodeId> {
        let Some(name) = self.attr(id, "name").filter(|n| !n.is_empty()) else {
            return vec![id];
        };
        let owner = self.form_owner(id);
        self.elements_by_tag(&["input"])
            .into_iter()
            .filter(|n| {
                self.input_type(*n).as_deref() == Some("radio")
                    && self.attr(*n, "name") == Some(name)
                    && self.form_owner(*n) == owner
            })
            .collect()
    }

    /// Nearest ancestor `<form>`.
    pub fn form_owner(&self, id: NodeId) -> Option<NodeId> {
        self.ancestors(id).find(|a| self.is_tag(*a, "form"))
    }

    fn option_value(&self, option: NodeId) -> String {
        match self.attr(option, "value") {
            Some(v) => v.to_string(),
            None => collapse_whitespace(&self.text_content(option)),
        }
    }

    pub fn options(&self, select: NodeId) -> Vec<OptionInfo> {
        self.descendants(select)
            .into_iter()
            .filter(|n| self.is_tag(*n, "option"))
            .map(|n| OptionInfo {
                node: n,
                value: self.option_value(n),
                label: collapse_whitespace(&self.text_content(n)),
                selected: self.checked(n),
            })
            .collect()
    }

    /// Select `option` inside `select`. Single selects drop any previous
    /// selection.
    pub fn select_option(&mut self, select: NodeId, option: NodeId) -> Result<(), DomError> {
        self.ensure_connected(select)?;
        if !self.is_tag(select, "select") || !self.contains(select, option) {
            return Err(DomError::NotAControl {
                node: option.0,
                tag: self.tag(option).unwrap_or("#text").to_string(),
            });
        }
        if !self.has_attr(select, "multiple") {
            for other in self.options(select) {
                self.element_mut(other.node)?.checked = false;
            }
        }
        self.element_mut(option)?.checked = true;
        Ok(())
    }
}
