use tracing::debug;

use crate::dom::dom_model::{Document, NodeId};

/// Ancestors a structural path may climb through.
pub const MAX_ANCESTOR_DEPTH: usize = 3;

/// Class tokens kept per path segment.
const MAX_CLASS_TOKENS: usize = 2;

/// Class fragments that mark interaction state rather than structure.
const TRANSIENT_CLASS_MARKERS: &[&str] = &[
    "focus", "hover", "active", "visited", "pressed", "dirty", "touched", "pristine", "valid",
    "error", "selected", "checked", "open", "loading", "animat",
];

// ============================================================================
// Synthesis
// ============================================================================

/// Produce a selector that re-identifies `node` in the current document.
///
/// Priority: stable id, then `tag[name="..."]` when the name is unique for
/// that tag (or names a radio group), then a structural path of at most
/// `MAX_ANCESTOR_DEPTH` ancestors.
pub fn synthesize(doc: &Document, node: NodeId) -> String {
    let tag = doc.tag(node).unwrap_or("*");

    if let Some(id) = stable_id(doc, node) {
        return id_selector(tag, id);
    }

    if let Some(name) = doc.attr_non_empty(node, "name") {
        let same_name = doc
            .elements_by_tag(&[tag])
            .into_iter()
            .filter(|n| doc.attr(*n, "name").map(str::trim) == Some(name))
            .count();
        let is_radio = doc.input_type(node).as_deref() == Some("radio");
        if same_name == 1 || is_radio {
            return format!("{}[name=\"{}\"]", tag, escape_string(name));
        }
    }

    structural_path(doc, node)
}

fn stable_id(doc: &Document, node: NodeId) -> Option<&str> {
    let id = doc.attr_non_empty(node, "id")?;
    if looks_generated(id) {
        return None;
    }
    let unique = doc
        .elements()
        .into_iter()
        .filter(|n| doc.attr(*n, "id").map(str::trim) == Some(id))
        .count()
        == 1;
    unique.then_some(id)
}

/// Framework-minted ids (`:r3:`, `input-482913`) change between renders.
fn looks_generated(id: &str) -> bool {
    if id.starts_with(':') {
        return true;
    }
    let mut run = 0;
    for c in id.chars() {
        if c.is_ascii_digit() {
            run += 1;
            if run >= 5 {
                return true;
            }
        } else {
            run = 0;
        }
    }
    false
}

fn is_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '-' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn escape_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

fn id_selector(tag: &str, id: &str) -> String {
    if is_ident(id) {
        format!("#{}", id)
    } else {
        format!("{}[id=\"{}\"]", tag, escape_string(id))
    }
}

fn is_transient_class(token: &str) -> bool {
    let lower = token.to_ascii_lowercase();
    TRANSIENT_CLASS_MARKERS.iter().any(|m| lower.contains(m))
}

fn segment(doc: &Document, node: NodeId) -> String {
    let tag = doc.tag(node).unwrap_or("*");
    let mut out = tag.to_string();

    for class in doc
        .class_list(node)
        .into_iter()
        .filter(|c| is_ident(c) && !is_transient_class(c))
        .take(MAX_CLASS_TOKENS)
    {
        out.push('.');
        out.push_str(class);
    }

    if let Some(parent) = doc.parent(node) {
        let same_tag: Vec<NodeId> = doc
            .element_children(parent)
            .into_iter()
            .filter(|c| doc.tag(*c) == Some(tag))
            .collect();
        if same_tag.len() > 1 {
            if let Some(pos) = same_tag.iter().position(|c| *c == node) {
                out.push_str(&format!(":nth-of-type({})", pos + 1));
            }
        }
    }
    out
}

fn structural_path(doc: &Document, node: NodeId) -> String {
    let mut segments = vec![segment(doc, node)];

    for ancestor in doc
        .ancestors(node)
        .filter(|a| !matches!(doc.tag(*a), Some("html" | "body")))
        .take(MAX_ANCESTOR_DEPTH)
    {
        if let Some(id) = stable_id(doc, ancestor) {
            segments.push(id_selector(doc.tag(ancestor).unwrap_or("*"), id));
            break;
        }
        segments.push(segment(doc, ancestor));
    }

    segments.reverse();
    let mut path = segments.join(" > ");

    // Narrow an ambiguous path with the control's own attributes.
    for attr in ["type", "placeholder", "aria-label"] {
        if resolve_all(doc, &path) == [node] {
            break;
        }
        if let Some(value) = doc.attr_non_empty(node, attr) {
            path.push_str(&format!("[{}=\"{}\"]", attr, escape_string(value)));
        }
    }
    if resolve_all(doc, &path).len() > 1 {
        // the distinguishing ancestor lies beyond the depth bound
        debug!(selector = %path, "Structural selector is not unique");
    }
    path
}

// ============================================================================
// Resolution
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<(String, String)>,
    nth_of_type: Option<usize>,
}

struct Cursor<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
        }
    }

    fn skip_ws(&mut self) {
        while self.chars.peek().is_some_and(|c| c.is_whitespace()) {
            self.chars.next();
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.chars.peek() == Some(&expected) {
            self.chars.next();
            true
        } else {
            false
        }
    }

    fn ident(&mut self) -> Option<String> {
        let mut out = String::new();
        while let Some(c) = self
            .chars
            .peek()
            .copied()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-' || *c == '*')
        {
            out.push(c);
            self.chars.next();
        }
        (!out.is_empty()).then_some(out)
    }

    fn quoted(&mut self) -> Option<String> {
        if !self.eat('"') {
            return None;
        }
        let mut out = String::new();
        loop {
            match self.chars.next()? {
                '\\' => out.push(self.chars.next()?),
                '"' => return Some(out),
                c => out.push(c),
            }
        }
    }

    fn number_in_parens(&mut self) -> Option<usize> {
        if !self.eat('(') {
            return None;
        }
        let mut digits = String::new();
        while let Some(c) = self.chars.peek().copied().filter(char::is_ascii_digit) {
            digits.push(c);
            self.chars.next();
        }
        if !self.eat(')') {
            return None;
        }
        digits.parse().ok()
    }

    fn compound(&mut self) -> Option<Compound> {
        let mut compound = Compound::default();
        if let Some(tag) = self.ident() {
            if tag != "*" {
                compound.tag = Some(tag.to_ascii_lowercase());
            }
        }
        loop {
            match self.chars.peek() {
                Some('#') => {
                    self.chars.next();
                    compound.id = Some(self.ident()?);
                }
                Some('.') => {
                    self.chars.next();
                    compound.classes.push(self.ident()?);
                }
                Some('[') => {
                    self.chars.next();
                    let name = self.ident()?;
                    if !self.eat('=') {
                        return None;
                    }
                    let value = self.quoted()?;
                    if !self.eat(']') {
                        return None;
                    }
                    compound.attrs.push((name.to_ascii_lowercase(), value));
                }
                Some(':') => {
                    self.chars.next();
                    if self.ident()?.as_str() != "nth-of-type" {
                        return None;
                    }
                    compound.nth_of_type = Some(self.number_in_parens()?);
                }
                _ => break,
            }
        }
        (compound != Compound::default()).then_some(compound)
    }
}

/// Parse the selector grammar `synthesize` emits: compounds of tag, `#id`,
/// `.class`, `[attr="value"]` and `:nth-of-type(n)` joined by ` > `.
fn parse(selector: &str) -> Option<Vec<Compound>> {
    let mut cursor = Cursor::new(selector.trim());
    let mut compounds = vec![cursor.compound()?];
    loop {
        cursor.skip_ws();
        if cursor.chars.peek().is_none() {
            return Some(compounds);
        }
        if !cursor.eat('>') {
            return None;
        }
        cursor.skip_ws();
        compounds.push(cursor.compound()?);
    }
}

fn matches_compound(doc: &Document, node: NodeId, compound: &Compound) -> bool {
    let Some(tag) = doc.tag(node) else {
        return false;
    };
    if compound.tag.as_deref().is_some_and(|t| t != tag) {
        return false;
    }
    if compound
        .id
        .as_deref()
        .is_some_and(|id| doc.attr(node, "id").map(str::trim) != Some(id))
    {
        return false;
    }
    let classes = doc.class_list(node);
    if !compound.classes.iter().all(|c| classes.contains(&c.as_str())) {
        return false;
    }
    if !compound
        .attrs
        .iter()
        .all(|(name, value)| doc.attr(node, name).map(str::trim) == Some(value.as_str()))
    {
        return false;
    }
    if let Some(n) = compound.nth_of_type {
        let Some(parent) = doc.parent(node) else {
            return false;
        };
        let position = doc
            .element_children(parent)
            .into_iter()
            .filter(|c| doc.tag(*c) == Some(tag))
            .position(|c| c == node);
        if position.map(|p| p + 1) != Some(n) {
            return false;
        }
    }
    true
}

fn matches_chain(doc: &Document, node: NodeId, compounds: &[Compound]) -> bool {
    let Some((last, rest)) = compounds.split_last() else {
        return false;
    };
    if !matches_compound(doc, node, last) {
        return false;
    }
    if rest.is_empty() {
        return true;
    }
    doc.parent_element(node)
        .is_some_and(|parent| matches_chain(doc, parent, rest))
}

/// First connected element, in document order, matching `selector`.
pub fn resolve(doc: &Document, selector: &str) -> Option<NodeId> {
    let Some(compounds) = parse(selector) else {
        debug!(selector, "Unparseable selector");
        return None;
    };
    doc.elements()
        .into_iter()
        .find(|n| matches_chain(doc, *n, &compounds))
}

/// Every connected element matching `selector`, in document order.
pub fn resolve_all(doc: &Document, selector: &str) -> Vec<NodeId> {
    let Some(compounds) = parse(selector) else {
        debug!(selector, "Unparseable selector");
        return Vec::new();
    };
    doc.elements()
        .into_iter()
        .filter(|n| matches_chain(doc, *n, &compounds))
        .collect()
}

/// The single control `selector` identifies, or `None` when it matches
/// nothing or several unrelated elements. Members of one radio group count
/// as one control and resolve to the first of them.
pub fn resolve_unique(doc: &Document, selector: &str) -> Option<NodeId> {
    let matches = resolve_all(doc, selector);
    let (&first, rest) = matches.split_first()?;
    if rest.is_empty() {
        return Some(first);
    }
    let is_radio = |n: NodeId| doc.input_type(n).as_deref() == Some("radio");
    if is_radio(first) {
        let group = doc.radio_group(first);
        if rest.iter().all(|n| group.contains(n)) {
            return Some(first);
        }
    }
    debug!(selector, matches = matches.len(), "Selector is ambiguous");
    None
}
