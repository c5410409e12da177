//! Virtual tree reconciler: consumes a session's operation stream in
//! emission order, maintains the element registry, and projects it onto a
//! native tree. Operations referencing unknown ids or non-whitelisted
//! kinds are dropped, never fatal.

use crate::protocol::Operation;
use glasspane_ui::{
    sanitize_props, ElementKind, NativeHandler, NativeNode, VirtualElement, MAX_NESTING_DEPTH,
};
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

/// The designated session root. Created by the reconciler at session
/// start; provider operations can append to it but never create, move, or
/// remove it.
pub const ROOT_ELEMENT_ID: u64 = 0;

#[derive(Debug, Clone, PartialEq)]
pub struct HandlerEntry {
    pub element_id: u64,
    pub event: String,
}

pub struct TreeReconciler {
    elements: HashMap<u64, VirtualElement>,
    /// handler_id -> owning element and event name. Entries die with their
    /// element.
    handlers: HashMap<u64, HandlerEntry>,
    dirty: bool,
}

impl TreeReconciler {
    pub fn new() -> Self {
        let mut elements = HashMap::new();
        elements.insert(
            ROOT_ELEMENT_ID,
            VirtualElement::new(ROOT_ELEMENT_ID, ElementKind::Div, Default::default()),
        );
        Self {
            elements,
            handlers: HashMap::new(),
            dirty: true,
        }
    }

    /// Live element count, root included.
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    pub fn contains(&self, id: u64) -> bool {
        self.elements.contains_key(&id)
    }

    pub fn element(&self, id: u64) -> Option<&VirtualElement> {
        self.elements.get(&id)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Reverse lookup for the event bridge: which handler id (if any) is
    /// registered for this element/event pair.
    pub fn handler_for(&self, element_id: u64, event: &str) -> Option<u64> {
        self.handlers
            .iter()
            .find(|(_, entry)| entry.element_id == element_id && entry.event == event)
            .map(|(id, _)| *id)
    }

    /// True once any operation changed the registry since the last
    /// projection; cleared by `take_dirty`.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    /// Apply one batch, in order. Returns the handler ids released by
    /// element removal so the executor can free its local callables.
    pub fn apply_batch(&mut self, ops: &[Operation]) -> Vec<u64> {
        let mut released = Vec::new();
        for op in ops {
            self.apply(op, &mut released);
        }
        released
    }

    fn apply(&mut self, op: &Operation, released: &mut Vec<u64>) {
        match op {
            Operation::Create { id, kind, props } => self.create(*id, kind, props),
            Operation::SetAttribute { id, key, value } => self.set_attribute(*id, key, value),
            Operation::AppendChild { parent, child } => self.append_child(*parent, *child),
            Operation::RemoveChild { parent, child } => {
                self.remove_child(*parent, *child, released)
            }
            Operation::SetText { id, text } => self.set_text(*id, text),
            Operation::AddEventListener {
                id,
                event,
                handler_id,
            } => self.add_event_listener(*id, event, *handler_id, released),
            Operation::InvokeHost { .. } => {
                // Host calls are routed through the guard before the batch
                // reaches the reconciler.
                warn!("invoke_host operation reached the reconciler; ignored");
            }
        }
    }

    fn create(&mut self, id: u64, kind: &str, props: &glasspane_ui::Props) {
        let Some(kind) = ElementKind::from_tag(kind) else {
            warn!(%id, kind, "rejecting element of non-whitelisted kind");
            return;
        };
        if self.elements.contains_key(&id) {
            warn!(%id, "rejecting create with duplicate element id");
            return;
        }
        self.elements
            .insert(id, VirtualElement::new(id, kind, sanitize_props(props)));
        self.dirty = true;
    }

    fn set_attribute(&mut self, id: u64, key: &str, value: &Value) {
        let Some(element) = self.elements.get_mut(&id) else {
            warn!(%id, "set_attribute on unknown element; dropped");
            return;
        };
        let mut single = glasspane_ui::Props::new();
        single.insert(key.to_string(), value.clone());
        let clean = sanitize_props(&single);
        if clean.is_empty() {
            warn!(%id, key, "attribute dropped by sanitizer");
            return;
        }
        for (k, v) in clean {
            element.props.insert(k, v);
        }
        self.dirty = true;
    }

    fn append_child(&mut self, parent: u64, child: u64) {
        if child == ROOT_ELEMENT_ID {
            warn!("refusing to re-parent the session root");
            return;
        }
        if !self.elements.contains_key(&parent) || !self.elements.contains_key(&child) {
            warn!(parent, child, "append_child with unknown id; dropped");
            return;
        }
        if self.is_reachable(child, parent) {
            warn!(parent, child, "append_child would create a cycle; dropped");
            return;
        }
        // A child has at most one parent: detach before re-attaching.
        for element in self.elements.values_mut() {
            element.children.retain(|c| *c != child);
        }
        if let Some(parent) = self.elements.get_mut(&parent) {
            parent.children.push(child);
        }
        self.dirty = true;
    }

    fn remove_child(&mut self, parent: u64, child: u64, released: &mut Vec<u64>) {
        if child == ROOT_ELEMENT_ID {
            warn!("refusing to remove the session root");
            return;
        }
        let Some(parent_el) = self.elements.get_mut(&parent) else {
            warn!(parent, child, "remove_child on unknown parent; dropped");
            return;
        };
        let before = parent_el.children.len();
        parent_el.children.retain(|c| *c != child);
        if parent_el.children.len() == before {
            warn!(parent, child, "remove_child: not a child of parent; dropped");
            return;
        }
        self.delete_subtree(child, released);
        self.dirty = true;
    }

    /// Delete an element and its descendants, releasing their handlers.
    /// After this, the ids are fully severed and may be reused.
    fn delete_subtree(&mut self, id: u64, released: &mut Vec<u64>) {
        let Some(element) = self.elements.remove(&id) else {
            return;
        };
        let dead: Vec<u64> = self
            .handlers
            .iter()
            .filter(|(_, entry)| entry.element_id == id)
            .map(|(hid, _)| *hid)
            .collect();
        for hid in dead {
            self.handlers.remove(&hid);
            released.push(hid);
        }
        for child in element.children {
            self.delete_subtree(child, released);
        }
    }

    fn set_text(&mut self, id: u64, text: &str) {
        match self.elements.get_mut(&id) {
            Some(element) => {
                element.text = Some(text.to_string());
                self.dirty = true;
            }
            None => warn!(%id, "set_text on unknown element; dropped"),
        }
    }

    fn add_event_listener(&mut self, id: u64, event: &str, handler_id: u64, released: &mut Vec<u64>) {
        if !self.elements.contains_key(&id) {
            warn!(%id, event, "listener on unknown element; dropped");
            return;
        }
        // One handler per (element, event) pair: the latest registration
        // wins and the prior callable is released.
        let stale: Vec<u64> = self
            .handlers
            .iter()
            .filter(|(_, entry)| entry.element_id == id && entry.event == event)
            .map(|(hid, _)| *hid)
            .collect();
        for hid in stale {
            self.handlers.remove(&hid);
            released.push(hid);
        }
        self.handlers.insert(
            handler_id,
            HandlerEntry {
                element_id: id,
                event: event.to_string(),
            },
        );
        self.dirty = true;
    }

    /// Is `needle` reachable from `from` through child edges?
    fn is_reachable(&self, from: u64, needle: u64) -> bool {
        if from == needle {
            return true;
        }
        let Some(element) = self.elements.get(&from) else {
            return false;
        };
        element
            .children
            .iter()
            .any(|child| self.is_reachable(*child, needle))
    }

    /// Project the registry onto a native tree, re-sanitizing props at the
    /// render boundary. Children past the depth limit are dropped.
    pub fn project(&self) -> NativeNode {
        self.project_element(ROOT_ELEMENT_ID, 0)
            .unwrap_or_else(|| NativeNode::new(ElementKind::Div))
    }

    fn project_element(&self, id: u64, depth: usize) -> Option<NativeNode> {
        if depth > MAX_NESTING_DEPTH {
            warn!(%id, "element past nesting depth limit dropped from projection");
            return None;
        }
        let element = self.elements.get(&id)?;
        let mut node = NativeNode::new(element.kind);
        node.props = sanitize_props(&element.props);
        node.text = element.text.clone();
        node.handlers = self
            .handlers
            .iter()
            .filter(|(_, entry)| entry.element_id == id)
            .map(|(hid, entry)| NativeHandler {
                event: entry.event.clone(),
                handler_id: *hid,
            })
            .collect();
        node.handlers.sort_by_key(|h| h.handler_id);
        node.children = element
            .children
            .iter()
            .filter_map(|child| self.project_element(*child, depth + 1))
            .collect();
        Some(node)
    }
}

impl Default for TreeReconciler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glasspane_ui::Props;
    use serde_json::json;

    fn create(id: u64, kind: &str) -> Operation {
        Operation::Create {
            id,
            kind: kind.to_string(),
            props: Props::new(),
        }
    }

    fn append(parent: u64, child: u64) -> Operation {
        Operation::AppendChild { parent, child }
    }

    #[test]
    fn test_batch_applies_in_emission_order() {
        let mut reconciler = TreeReconciler::new();
        reconciler.apply_batch(&[
            create(1, "div"),
            Operation::SetText {
                id: 1,
                text: "hello".to_string(),
            },
            append(ROOT_ELEMENT_ID, 1),
        ]);
        let tree = reconciler.project();
        assert_eq!(tree.children.len(), 1);
        assert_eq!(tree.children[0].text.as_deref(), Some("hello"));
    }

    #[test]
    fn test_unknown_kind_never_enters_registry() {
        let mut reconciler = TreeReconciler::new();
        reconciler.apply_batch(&[
            create(1, "script"),
            Operation::SetText {
                id: 1,
                text: "ignored".to_string(),
            },
            create(2, "p"),
            append(ROOT_ELEMENT_ID, 2),
        ]);
        assert!(!reconciler.contains(1));
        // The valid sibling is unaffected.
        assert!(reconciler.contains(2));
        assert_eq!(reconciler.element_count(), 2); // root + p
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut reconciler = TreeReconciler::new();
        reconciler.apply_batch(&[create(1, "div"), create(1, "span")]);
        assert_eq!(reconciler.element(1).unwrap().kind, ElementKind::Div);
    }

    #[test]
    fn test_remove_child_releases_subtree_and_handlers() {
        let mut reconciler = TreeReconciler::new();
        let released = reconciler.apply_batch(&[
            create(1, "div"),
            create(2, "button"),
            append(ROOT_ELEMENT_ID, 1),
            append(1, 2),
            Operation::AddEventListener {
                id: 2,
                event: "click".to_string(),
                handler_id: 5,
            },
            Operation::RemoveChild {
                parent: ROOT_ELEMENT_ID,
                child: 1,
            },
        ]);
        assert_eq!(released, vec![5]);
        assert!(!reconciler.contains(1));
        assert!(!reconciler.contains(2));
        assert_eq!(reconciler.handler_count(), 0);
        // The severed id may be reused now.
        reconciler.apply_batch(&[create(1, "p")]);
        assert!(reconciler.contains(1));
    }

    #[test]
    fn test_cycle_creation_is_refused() {
        let mut reconciler = TreeReconciler::new();
        reconciler.apply_batch(&[
            create(1, "div"),
            create(2, "div"),
            append(ROOT_ELEMENT_ID, 1),
            append(1, 2),
            append(2, 1),
        ]);
        assert!(reconciler.element(2).unwrap().children.is_empty());
    }

    #[test]
    fn test_projection_sanitizes_at_render_boundary() {
        let mut reconciler = TreeReconciler::new();
        let mut props = Props::new();
        props.insert("className".to_string(), json!("card"));
        reconciler.apply_batch(&[
            Operation::Create {
                id: 1,
                kind: "div".to_string(),
                props,
            },
            append(ROOT_ELEMENT_ID, 1),
        ]);
        let tree = reconciler.project();
        assert_eq!(tree.children[0].props["class"], json!("card"));
    }

    #[test]
    fn test_latest_listener_wins_per_element_event_pair() {
        let mut reconciler = TreeReconciler::new();
        let released = reconciler.apply_batch(&[
            create(1, "button"),
            append(ROOT_ELEMENT_ID, 1),
            Operation::AddEventListener {
                id: 1,
                event: "click".to_string(),
                handler_id: 5,
            },
            Operation::AddEventListener {
                id: 1,
                event: "click".to_string(),
                handler_id: 6,
            },
            Operation::AddEventListener {
                id: 1,
                event: "change".to_string(),
                handler_id: 7,
            },
        ]);
        // The superseded handler is released for the executor to free.
        assert_eq!(released, vec![5]);
        assert_eq!(reconciler.handler_for(1, "click"), Some(6));
        assert_eq!(reconciler.handler_for(1, "change"), Some(7));
        assert_eq!(reconciler.handler_count(), 2);
    }

    #[test]
    fn test_handlers_survive_projection_as_ids() {
        let mut reconciler = TreeReconciler::new();
        reconciler.apply_batch(&[
            create(1, "button"),
            append(ROOT_ELEMENT_ID, 1),
            Operation::AddEventListener {
                id: 1,
                event: "click".to_string(),
                handler_id: 9,
            },
        ]);
        let tree = reconciler.project();
        assert_eq!(tree.children[0].handlers.len(), 1);
        assert_eq!(tree.children[0].handlers[0].handler_id, 9);
        assert_eq!(reconciler.handler_for(1, "click"), Some(9));
        assert_eq!(reconciler.handler_for(1, "change"), None);
    }

    #[test]
    fn test_operations_on_unknown_ids_are_non_fatal() {
        let mut reconciler = TreeReconciler::new();
        reconciler.apply_batch(&[
            Operation::SetText {
                id: 42,
                text: "ghost".to_string(),
            },
            Operation::SetAttribute {
                id: 42,
                key: "class".to_string(),
                value: json!("x"),
            },
            append(42, 43),
            Operation::RemoveChild {
                parent: 42,
                child: 43,
            },
        ]);
        assert_eq!(reconciler.element_count(), 1);
    }
}
