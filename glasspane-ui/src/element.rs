use crate::kind::ElementKind;
use serde::{Deserialize, Serialize};

/// Sanitized key/value property map. Always structured data: values come
/// from JSON, never from executable content.
pub type Props = serde_json::Map<String, serde_json::Value>;

/// One element in a session's virtual registry. Owned exclusively by the
/// reconciler for that session; ids are session-scoped and never reused
/// while the element is live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualElement {
    pub id: u64,
    pub kind: ElementKind,
    pub props: Props,
    /// Ordered child ids. Every id listed here resolves in the registry
    /// until the child is explicitly removed.
    pub children: Vec<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl VirtualElement {
    pub fn new(id: u64, kind: ElementKind, props: Props) -> Self {
        Self {
            id,
            kind,
            props,
            children: Vec::new(),
            text: None,
        }
    }
}

/// A handler reference attached to a projected node. Only the opaque id
/// crosses back to the execution context, never a callable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeHandler {
    pub event: String,
    pub handler_id: u64,
}

/// A node of the projected native tree, ready for the host's renderer.
/// Props here have passed the sanitizer twice: once on entry to the
/// registry and once at the render boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeNode {
    pub kind: ElementKind,
    pub props: Props,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub handlers: Vec<NativeHandler>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub children: Vec<NativeNode>,
}

impl NativeNode {
    pub fn new(kind: ElementKind) -> Self {
        Self {
            kind,
            props: Props::new(),
            text: None,
            handlers: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_text(kind: ElementKind, text: impl Into<String>) -> Self {
        let mut node = NativeNode::new(kind);
        node.text = Some(text.into());
        node
    }

    /// Total node count of this subtree, root included.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(NativeNode::node_count).sum::<usize>()
    }
}
