use std::fmt;

use crate::dom::events::{DispatchedEvent, FrameworkChange, Listener};
use crate::error::DomError;

/// Handle to a node inside one `Document`. Only meaningful for the document
/// that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub enum NodeData {
    Document,
    Element(ElementData),
    Text(String),
}

/// Live state of one element.
#[derive(Debug, Clone)]
pub struct ElementData {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    /// Dirty value (input/textarea). `None` means the default value applies.
    pub(crate) value: Option<String>,
    /// Checkedness for checkbox/radio, selectedness for option.
    pub(crate) checked: bool,
    /// Framework value tracker installed over the element's setter.
    pub(crate) tracker: Option<String>,
    pub(crate) listeners: Vec<Listener>,
}

impl ElementData {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
            value: None,
            checked: false,
            tracker: None,
            listeners: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: NodeData,
}

/// In-memory document the engine reads and writes.
///
/// Nodes live in an arena and are never freed; detaching a node only cuts it
/// from its parent, so stale handles stay valid but report `Detached`.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    title: String,
    url: Option<String>,
    native_setters: bool,
    pub(crate) event_log: Vec<DispatchedEvent>,
    pub(crate) framework_log: Vec<FrameworkChange>,
    pub(crate) focused: Option<NodeId>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                data: NodeData::Document,
            }],
            title: String::new(),
            url: None,
            native_setters: true,
            event_log: Vec::new(),
            framework_log: Vec::new(),
            focused: None,
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn set_url(&mut self, url: Option<String>) {
        self.url = url;
    }

    /// Whether the element prototypes still expose their original value
    /// setters. Pages that replace or freeze the prototypes turn this off.
    pub fn native_setters_available(&self) -> bool {
        self.native_setters
    }

    pub fn set_native_setters_available(&mut self, available: bool) {
        self.native_setters = available;
    }

    // ========================================================================
    // Construction
    // ========================================================================

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeData::Element(ElementData::new(tag)))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Text(text.to_string()))
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            data,
        });
        id
    }

    /// Create an element with attributes, initialise its control state from
    /// them and append it to `parent`.
    pub fn append_element(
        &mut self,
        parent: NodeId,
        tag: &str,
        attrs: &[(&str, &str)],
    ) -> Result<NodeId, DomError> {
        let node = self.create_element(tag);
        for (name, value) in attrs {
            self.set_attr(node, name, value)?;
        }
        self.reset_control_state(node)?;
        self.append_child(parent, node)?;
        Ok(node)
    }

    pub fn append_text(&mut self, parent: NodeId, text: &str) -> Result<NodeId, DomError> {
        let node = self.create_text(text);
        self.append_child(parent, node)?;
        Ok(node)
    }

    /// Re-derive checkedness/selectedness from the markup attributes.
    pub fn reset_control_state(&mut self, node: NodeId) -> Result<(), DomError> {
        let el = self.element_mut(node)?;
        el.checked = match el.tag.as_str() {
            "input" => el.attr("checked").is_some(),
            "option" => el.attr("selected").is_some(),
            _ => false,
        };
        el.value = None;
        Ok(())
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.node(parent)?;
        self.node(child)?;
        self.detach(child)?;
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
        Ok(())
    }

    /// Cut a node (and its subtree) out of the tree.
    pub fn detach(&mut self, node: NodeId) -> Result<(), DomError> {
        if let Some(parent) = self.node(node)?.parent {
            self.nodes[parent.0].children.retain(|c| *c != node);
            self.nodes[node.0].parent = None;
        }
        if self.focused.is_some_and(|f| f == node || !self.is_connected(f)) {
            self.focused = None;
        }
        Ok(())
    }

    // ========================================================================
    // Node access
    // ========================================================================

    fn node(&self, id: NodeId) -> Result<&Node, DomError> {
        self.nodes.get(id.0).ok_or(DomError::NodeNotFound(id.0))
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.nodes.get(id.0)?.data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    pub(crate) fn element_mut(&mut self, id: NodeId) -> Result<&mut ElementData, DomError> {
        let node = self
            .nodes
            .get_mut(id.0)
            .ok_or(DomError::NodeNotFound(id.0))?;
        match &mut node.data {
            NodeData::Element(el) => Ok(el),
            NodeData::Document => Err(DomError::NotAControl {
                node: id.0,
                tag: "#document".into(),
            }),
            NodeData::Text(_) => Err(DomError::NotAControl {
                node: id.0,
                tag: "#text".into(),
            }),
        }
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|el| el.tag.as_str())
    }

    pub fn is_tag(&self, id: NodeId, tag: &str) -> bool {
        self.tag(id) == Some(tag)
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|el| el.attr(name))
    }

    /// Attribute value, trimmed, `None` when missing or blank.
    pub fn attr_non_empty(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attr(id, name).map(str::trim).filter(|v| !v.is_empty())
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.attr(id, name).is_some()
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        let el = self.element_mut(id)?;
        let name = name.to_ascii_lowercase();
        match el.attrs.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value.to_string(),
            None => el.attrs.push((name, value.to_string())),
        }
        Ok(())
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Result<(), DomError> {
        let el = self.element_mut(id)?;
        el.attrs.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        Ok(())
    }

    pub fn class_list(&self, id: NodeId) -> Vec<&str> {
        self.attr(id, "class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|n| n.parent)
    }

    /// Parent only when it is an element (not the document root).
    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).filter(|p| self.element(*p).is_some())
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id.0)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|c| self.element(*c).is_some())
            .collect()
    }

    /// Element ancestors, nearest first. Excludes `id` itself.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent_element(id), move |n| self.parent_element(*n))
    }

    pub fn is_connected(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(n) = current {
            if n == self.root() {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    pub fn ensure_connected(&self, id: NodeId) -> Result<(), DomError> {
        self.node(id)?;
        if self.is_connected(id) {
            Ok(())
        } else {
            Err(DomError::Detached(id.0))
        }
    }

    /// All nodes below `id` in document order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(self.children(n).iter().rev().copied());
        }
        out
    }

    /// Every connected element, in document order.
    pub fn elements(&self) -> Vec<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .filter(|n| self.element(*n).is_some())
            .collect()
    }

    pub fn elements_by_tag(&self, tags: &[&str]) -> Vec<NodeId> {
        self.elements()
            .into_iter()
            .filter(|n| self.tag(*n).is_some_and(|t| tags.contains(&t)))
            .collect()
    }

    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.elements()
            .into_iter()
            .find(|n| self.attr(*n, "id") == Some(id))
    }

    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        node == ancestor || self.ancestors(node).any(|a| a == ancestor)
    }

    pub fn text_content(&self, id: NodeId) -> String {
        self.collect_text(id, None)
    }

    /// Text content of `id` with the subtree rooted at `skip` left out.
    pub fn text_content_excluding(&self, id: NodeId, skip: NodeId) -> String {
        self.collect_text(id, Some(skip))
    }

    fn collect_text(&self, id: NodeId, skip: Option<NodeId>) -> String {
        let mut out = String::new();
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            if Some(n) == skip {
                continue;
            }
            match self.nodes.get(n.0).map(|node| &node.data) {
                Some(NodeData::Text(t)) => out.push_str(t),
                Some(_) => stack.extend(self.children(n).iter().rev().copied()),
                None => {}
            }
        }
        out
    }
}
