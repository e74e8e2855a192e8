/// A selectable entry: a select option or one radio of a group.
#[derive(Debug, Clone, PartialEq)]
pub struct Choice {
    pub value: String,
    pub label: String,
}

impl Choice {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }

    fn texts(&self) -> impl Iterator<Item = &str> {
        [self.value.trim(), self.label.trim()]
            .into_iter()
            .filter(|t| !t.is_empty())
    }
}

/// Index of the choice that best fits `target`.
///
/// Exact tier: case-insensitive equality with value or label. Substring
/// tier: case-sensitive containment in either direction. `"Calif"` finds
/// `"California"`; `"CA"` does not.
pub fn pick_choice(choices: &[Choice], target: &str) -> Option<usize> {
    let target = target.trim();
    if target.is_empty() {
        return None;
    }

    let target_lower = target.to_lowercase();
    let exact = choices
        .iter()
        .position(|c| c.texts().any(|t| t.to_lowercase() == target_lower));
    if exact.is_some() {
        return exact;
    }

    choices
        .iter()
        .position(|c| c.texts().any(|t| t.contains(target) || target.contains(t)))
}
