use std::fmt;

use serde::Serialize;

use crate::dom::dom_model::{Document, NodeId};
use crate::error::DomError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Input,
    Change,
    Focus,
    Blur,
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::Input => "input",
            EventKind::Change => "change",
            EventKind::Focus => "focus",
            EventKind::Blur => "blur",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A page-registered listener. Listeners that throw abort the dispatch.
#[derive(Debug, Clone)]
pub struct Listener {
    pub kind: EventKind,
    pub throws: Option<String>,
}

/// Record of one dispatched event.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchedEvent {
    pub kind: EventKind,
    /// Always the element the event was fired on, even while bubbling
    pub target: NodeId,
    pub bubbles: bool,
    /// Propagation path: target first, then ancestors when bubbling
    pub path: Vec<NodeId>,
}

/// A value change the page's framework noticed through its tracker.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameworkChange {
    pub node: NodeId,
    pub value: String,
}

impl Document {
    pub fn add_throwing_listener(
        &mut self,
        node: NodeId,
        kind: EventKind,
        message: &str,
    ) -> Result<(), DomError> {
        self.element_mut(node)?.listeners.push(Listener {
            kind,
            throws: Some(message.to_string()),
        });
        Ok(())
    }

    pub fn dispatch(&mut self, target: NodeId, kind: EventKind, bubbles: bool) -> Result<(), DomError> {
        self.ensure_connected(target)?;

        let mut path = vec![target];
        if bubbles {
            path.extend(self.ancestors(target));
        }

        self.event_log.push(DispatchedEvent {
            kind,
            target,
            bubbles,
            path: path.clone(),
        });

        for node in &path {
            let Some(el) = self.element(*node) else {
                continue;
            };
            if let Some(message) = el
                .listeners
                .iter()
                .filter(|l| l.kind == kind)
                .find_map(|l| l.throws.clone())
            {
                return Err(DomError::ListenerThrew {
                    event: kind,
                    message,
                });
            }
        }

        if matches!(kind, EventKind::Input | EventKind::Change) {
            self.sync_tracker(target)?;
        }
        Ok(())
    }

    /// Framework side of an input/change event: compare the tracked value
    /// with the live one and record a change when they differ.
    fn sync_tracker(&mut self, node: NodeId) -> Result<(), DomError> {
        let current = self.value(node);
        let el = self.element_mut(node)?;
        let Some(tracked) = el.tracker.as_ref() else {
            return Ok(());
        };
        if *tracked != current {
            el.tracker = Some(current.clone());
            self.framework_log.push(FrameworkChange {
                node,
                value: current,
            });
        }
        Ok(())
    }

    /// Simulate a UI framework taking over the element's value property.
    pub fn install_value_tracker(&mut self, node: NodeId) -> Result<(), DomError> {
        let current = self.value(node);
        self.element_mut(node)?.tracker = Some(current);
        Ok(())
    }

    /// Changes the framework has seen on `node`, oldest first.
    pub fn framework_changes(&self, node: NodeId) -> Vec<&FrameworkChange> {
        self.framework_log.iter().filter(|c| c.node == node).collect()
    }

    pub fn focus(&mut self, node: NodeId) -> Result<(), DomError> {
        self.focused = Some(node);
        self.dispatch(node, EventKind::Focus, false)
    }

    /// Dispatch a bubbling blur and drop focus.
    pub fn blur(&mut self, node: NodeId) -> Result<(), DomError> {
        if self.focused == Some(node) {
            self.focused = None;
        }
        self.dispatch(node, EventKind::Blur, true)
    }

    pub fn focused(&self) -> Option<NodeId> {
        self.focused
    }

    pub fn events(&self) -> &[DispatchedEvent] {
        &self.event_log
    }

    /// Events whose propagation path reached `node`.
    pub fn events_observed_by(&self, node: NodeId) -> Vec<&DispatchedEvent> {
        self.event_log
            .iter()
            .filter(|e| e.path.contains(&node))
            .collect()
    }

    pub fn clear_events(&mut self) {
        self.event_log.clear();
    }
}
