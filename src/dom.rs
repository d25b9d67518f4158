// 🌳 Document Seam - the host page as the engine sees it
//
// The engine never owns the page. Everything it reads or writes goes through
// `HostDocument`, so the same reconciliation code runs against a browser
// binding or against `PageDocument`, the in-memory arena used by the CLI,
// the terminal demo and the tests.

use crate::error::DomError;
use std::collections::HashMap;

// ============================================================================
// NODE IDENTITY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn from_raw(raw: usize) -> Self {
        NodeId(raw)
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ============================================================================
// LISTENERS
// ============================================================================

/// Click behaviour attached to a node.
///
/// Handlers are data, not closures: the session interprets them while
/// dispatching a click, which keeps the document free of engine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listener {
    /// Swallows the click before it reaches ancestors
    StopPropagation,
    /// Adds the nearest row to the selection and re-renders the summary
    ToggleSelection,
    /// Re-runs reconciliation
    Refresh,
    /// Behaviour owned by the host page (expand row, open details, ...)
    HostRowClick,
}

// ============================================================================
// DOCUMENT TRAIT
// ============================================================================

pub trait HostDocument {
    fn root(&self) -> NodeId;

    fn body(&self) -> Option<NodeId>;

    /// Descendants of `scope` carrying `class`, in document order. `scope`
    /// itself is not included.
    fn select_all(&self, scope: NodeId, class: &str) -> Vec<NodeId>;

    fn select_first(&self, scope: NodeId, class: &str) -> Option<NodeId> {
        self.select_all(scope, class).into_iter().next()
    }

    /// First attached element whose `id` attribute equals `id`
    fn element_by_id(&self, id: &str) -> Option<NodeId>;

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    fn has_class(&self, node: NodeId, class: &str) -> bool;

    /// Nearest inclusive ancestor carrying `class`
    fn closest(&self, node: NodeId, class: &str) -> Option<NodeId> {
        let mut current = Some(node);
        while let Some(candidate) = current {
            if self.has_class(candidate, class) {
                return Some(candidate);
            }
            current = self.parent(candidate);
        }
        None
    }

    fn tag(&self, node: NodeId) -> Option<String>;

    fn attr(&self, node: NodeId, name: &str) -> Option<String>;

    fn set_attr(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), DomError>;

    /// Text content of the node and all its descendants
    fn text(&self, node: NodeId) -> Option<String>;

    fn set_text(&mut self, node: NodeId, text: &str) -> Result<(), DomError>;

    fn checked(&self, node: NodeId) -> bool;

    fn set_checked(&mut self, node: NodeId, checked: bool) -> Result<(), DomError>;

    /// Creates a detached element. `class` may hold several space-separated names.
    fn create_element(&mut self, tag: &str, class: &str) -> NodeId;

    fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError>;

    fn prepend_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError>;

    /// Detaches the node (and its subtree) from its parent
    fn remove(&mut self, node: NodeId) -> Result<(), DomError>;

    fn add_listener(&mut self, node: NodeId, listener: Listener) -> Result<(), DomError>;

    fn listeners(&self, node: NodeId) -> Vec<Listener>;

    fn is_attached(&self, node: NodeId) -> bool;

    /// Bumped on every change; the readiness detector watches it
    fn mutation_count(&self) -> u64;
}

// ============================================================================
// IN-MEMORY DOCUMENT
// ============================================================================

#[derive(Debug, Clone)]
struct Element {
    tag: String,
    classes: Vec<String>,
    attrs: HashMap<String, String>,
    text: String,
    checked: bool,
    listeners: Vec<Listener>,
}

#[derive(Debug, Clone)]
enum NodeKind {
    Document,
    Element(Element),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
}

/// Arena-backed document. Removed nodes stay in the arena, unreachable from
/// the root, the way a browser keeps detached nodes alive while referenced.
#[derive(Debug, Clone)]
pub struct PageDocument {
    nodes: Vec<Node>,
    root: NodeId,
    body: NodeId,
    mutations: u64,
}

impl PageDocument {
    /// Empty document holding just a `<body>`
    pub fn new() -> Self {
        let mut doc = PageDocument {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                kind: NodeKind::Document,
            }],
            root: NodeId(0),
            body: NodeId(0),
            mutations: 0,
        };

        let body = doc.create_element("body", "");
        doc.nodes[0].children.push(body);
        doc.nodes[body.0].parent = Some(doc.root);
        doc.body = body;
        doc.mutations = 0;
        doc
    }

    /// Creates an element and appends it under `parent` in one step
    pub fn element(&mut self, parent: NodeId, tag: &str, class: &str) -> Result<NodeId, DomError> {
        let node = self.create_element(tag, class);
        self.append_child(parent, node)?;
        Ok(node)
    }

    /// Same as `element`, with text content
    pub fn text_element(
        &mut self,
        parent: NodeId,
        tag: &str,
        class: &str,
        text: &str,
    ) -> Result<NodeId, DomError> {
        let node = self.element(parent, tag, class)?;
        self.set_text(node, text)?;
        Ok(node)
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(node.0)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    /// Compact markup of a subtree, for debugging and assertions
    pub fn markup(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_markup(node, &mut out);
        out
    }

    fn write_markup(&self, node: NodeId, out: &mut String) {
        let Some(n) = self.nodes.get(node.0) else {
            return;
        };

        match &n.kind {
            NodeKind::Document => {
                for child in &n.children {
                    self.write_markup(*child, out);
                }
            }
            NodeKind::Element(el) => {
                out.push('<');
                out.push_str(&el.tag);
                if !el.classes.is_empty() {
                    out.push_str(&format!(" class=\"{}\"", el.classes.join(" ")));
                }
                let mut attrs: Vec<_> = el.attrs.iter().collect();
                attrs.sort();
                for (name, value) in attrs {
                    out.push_str(&format!(" {}=\"{}\"", name, value));
                }
                if el.checked {
                    out.push_str(" checked");
                }
                out.push('>');
                out.push_str(&el.text);
                for child in &n.children {
                    self.write_markup(*child, out);
                }
                out.push_str(&format!("</{}>", el.tag));
            }
        }
    }

    fn element_ref(&self, node: NodeId) -> Option<&Element> {
        match self.nodes.get(node.0).map(|n| &n.kind) {
            Some(NodeKind::Element(el)) => Some(el),
            _ => None,
        }
    }

    fn element_mut(&mut self, node: NodeId) -> Result<&mut Element, DomError> {
        match self.nodes.get_mut(node.0).map(|n| &mut n.kind) {
            Some(NodeKind::Element(el)) => Ok(el),
            Some(NodeKind::Document) => Err(DomError::NotAnElement(node)),
            None => Err(DomError::UnknownNode(node)),
        }
    }

    fn check_node(&self, node: NodeId) -> Result<(), DomError> {
        if node.0 < self.nodes.len() {
            Ok(())
        } else {
            Err(DomError::UnknownNode(node))
        }
    }

    /// Preorder walk of everything below `scope`
    fn descendants(&self, scope: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = match self.nodes.get(scope.0) {
            Some(n) => n.children.iter().rev().copied().collect(),
            None => return out,
        };

        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.nodes[node.0].children.iter().rev().copied());
        }

        out
    }

    fn is_ancestor_or_self(&self, candidate: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == candidate {
                return true;
            }
            current = self.nodes.get(n.0).and_then(|x| x.parent);
        }
        false
    }

    fn insert(&mut self, parent: NodeId, child: NodeId, at_front: bool) -> Result<(), DomError> {
        self.check_node(parent)?;
        self.element_mut(child)?;
        if self.is_ancestor_or_self(child, parent) {
            return Err(DomError::CycleRejected { parent, child });
        }

        self.detach(child);
        let children = &mut self.nodes[parent.0].children;
        if at_front {
            children.insert(0, child);
        } else {
            children.push(child);
        }
        self.nodes[child.0].parent = Some(parent);
        self.mutations += 1;
        Ok(())
    }

    fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node.0].parent.take() {
            self.nodes[parent.0].children.retain(|c| *c != node);
        }
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        if let Some(el) = self.element_ref(node) {
            out.push_str(&el.text);
        }
        for child in &self.nodes[node.0].children {
            self.collect_text(*child, out);
        }
    }
}

impl Default for PageDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl HostDocument for PageDocument {
    fn root(&self) -> NodeId {
        self.root
    }

    fn body(&self) -> Option<NodeId> {
        Some(self.body).filter(|b| self.is_attached(*b))
    }

    fn select_all(&self, scope: NodeId, class: &str) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|n| self.has_class(*n, class))
            .collect()
    }

    fn element_by_id(&self, id: &str) -> Option<NodeId> {
        if id.is_empty() {
            return None;
        }
        self.descendants(self.root).into_iter().find(|n| {
            self.element_ref(*n)
                .and_then(|el| el.attrs.get("id"))
                .is_some_and(|v| v == id)
        })
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.0).and_then(|n| n.parent)
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.element_ref(node)
            .is_some_and(|el| el.classes.iter().any(|c| c == class))
    }

    fn tag(&self, node: NodeId) -> Option<String> {
        self.element_ref(node).map(|el| el.tag.clone())
    }

    fn attr(&self, node: NodeId, name: &str) -> Option<String> {
        self.element_ref(node).and_then(|el| el.attrs.get(name).cloned())
    }

    fn set_attr(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        let el = self.element_mut(node)?;
        el.attrs.insert(name.to_string(), value.to_string());
        self.mutations += 1;
        Ok(())
    }

    fn text(&self, node: NodeId) -> Option<String> {
        self.element_ref(node)?;
        let mut out = String::new();
        self.collect_text(node, &mut out);
        Some(out)
    }

    fn set_text(&mut self, node: NodeId, text: &str) -> Result<(), DomError> {
        let el = self.element_mut(node)?;
        el.text = text.to_string();
        self.mutations += 1;
        Ok(())
    }

    fn checked(&self, node: NodeId) -> bool {
        self.element_ref(node).is_some_and(|el| el.checked)
    }

    fn set_checked(&mut self, node: NodeId, checked: bool) -> Result<(), DomError> {
        let el = self.element_mut(node)?;
        if el.checked != checked {
            el.checked = checked;
            self.mutations += 1;
        }
        Ok(())
    }

    fn create_element(&mut self, tag: &str, class: &str) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            kind: NodeKind::Element(Element {
                tag: tag.to_string(),
                classes: class.split_whitespace().map(String::from).collect(),
                attrs: HashMap::new(),
                text: String::new(),
                checked: false,
                listeners: Vec::new(),
            }),
        });
        id
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.insert(parent, child, false)
    }

    fn prepend_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.insert(parent, child, true)
    }

    fn remove(&mut self, node: NodeId) -> Result<(), DomError> {
        self.element_mut(node)?;
        if self.nodes[node.0].parent.is_some() {
            self.detach(node);
            self.mutations += 1;
        }
        Ok(())
    }

    fn add_listener(&mut self, node: NodeId, listener: Listener) -> Result<(), DomError> {
        self.element_mut(node)?.listeners.push(listener);
        Ok(())
    }

    fn listeners(&self, node: NodeId) -> Vec<Listener> {
        self.element_ref(node)
            .map(|el| el.listeners.clone())
            .unwrap_or_default()
    }

    fn is_attached(&self, node: NodeId) -> bool {
        self.check_node(node).is_ok() && self.is_ancestor_or_self(self.root, node)
    }

    fn mutation_count(&self) -> u64 {
        self.mutations
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (PageDocument, NodeId, NodeId, NodeId) {
        let mut doc = PageDocument::new();
        let body = doc.body().unwrap();
        let list = doc.element(body, "div", "list").unwrap();
        let a = doc.text_element(list, "span", "item first", "alpha").unwrap();
        let b = doc.text_element(list, "span", "item", "beta").unwrap();
        (doc, list, a, b)
    }

    #[test]
    fn test_select_all_in_document_order() {
        let (doc, list, a, b) = sample();

        assert_eq!(doc.select_all(doc.root(), "item"), vec![a, b]);
        assert_eq!(doc.select_first(list, "first"), Some(a));
        assert!(doc.select_all(list, "list").is_empty());
    }

    #[test]
    fn test_prepend_puts_node_first() {
        let (mut doc, list, a, _) = sample();
        let head = doc.create_element("span", "item");
        doc.prepend_child(list, head).unwrap();

        assert_eq!(doc.children(list)[0], head);
        assert_eq!(doc.select_first(list, "item"), Some(head));
        assert_ne!(doc.select_first(list, "item"), Some(a));
    }

    #[test]
    fn test_removed_subtree_is_unreachable() {
        let (mut doc, list, a, _) = sample();
        doc.set_attr(a, "id", "row-a").unwrap();
        assert_eq!(doc.element_by_id("row-a"), Some(a));

        doc.remove(list).unwrap();

        assert!(!doc.is_attached(a));
        assert_eq!(doc.element_by_id("row-a"), None);
        assert!(doc.select_all(doc.root(), "item").is_empty());
    }

    #[test]
    fn test_closest_includes_self() {
        let (doc, list, a, _) = sample();

        assert_eq!(doc.closest(a, "item"), Some(a));
        assert_eq!(doc.closest(a, "list"), Some(list));
        assert_eq!(doc.closest(a, "missing"), None);
    }

    #[test]
    fn test_text_concatenates_descendants() {
        let (doc, list, _, _) = sample();

        assert_eq!(doc.text(list).as_deref(), Some("alphabeta"));
        assert_eq!(doc.text(doc.root()), None);
    }

    #[test]
    fn test_cycle_is_rejected() {
        let (mut doc, list, a, _) = sample();

        let err = doc.append_child(a, list).unwrap_err();
        assert_eq!(err, DomError::CycleRejected { parent: a, child: list });
    }

    #[test]
    fn test_mutation_count_tracks_changes() {
        let (mut doc, _, a, _) = sample();
        let before = doc.mutation_count();

        doc.set_checked(a, true).unwrap();
        doc.set_checked(a, true).unwrap();

        assert_eq!(doc.mutation_count(), before + 1);
    }

    #[test]
    fn test_markup_shows_structure() {
        let mut doc = PageDocument::new();
        let body = doc.body().unwrap();
        let input = doc.element(body, "input", "check").unwrap();
        doc.set_attr(input, "type", "checkbox").unwrap();
        doc.set_checked(input, true).unwrap();

        assert_eq!(
            doc.markup(body),
            "<body><input class=\"check\" type=\"checkbox\" checked></input></body>"
        );
    }
}
