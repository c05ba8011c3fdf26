#![forbid(unsafe_code)]

//! Host-driven in-memory document.
//!
//! [`MemoryDocument`] is a small node arena shaped like an HTML document
//! (`html > head, body`). It implements [`DocumentPort`] and additionally
//! lets the host:
//!
//! - build fixtures (elements, marker comments) before a provider mounts,
//! - decide when a stylesheet finishes loading ([`MemoryDocument::fire_load`]),
//! - inspect every mutation in order ([`MemoryDocument::journal`]).
//!
//! Cloning a `MemoryDocument` creates a new handle to the **same** tree, the
//! same way cloning an `Observable` shares its value.
//!
//! Removed nodes stay in the arena. Their load callbacks stay registered, so
//! the host can still fire a load for a node that was detached before its
//! resource arrived (the browser does the same).

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::trace;

use crate::{DocumentPort, DomError, InsertPosition, LinkSpec, LoadCallback, NodeId, NodeKind};

/// A single recorded change to the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Inserted {
        node: NodeId,
        parent: NodeId,
    },
    Removed {
        node: NodeId,
        parent: NodeId,
    },
    AttributeSet {
        element: NodeId,
        name: String,
        value: String,
    },
}

#[derive(Debug)]
struct NodeData {
    kind: NodeKind,
    tag: Option<String>,
    data: String,
    attributes: Vec<(String, String)>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl NodeData {
    fn element(tag: &str) -> Self {
        Self {
            kind: NodeKind::Element,
            tag: Some(tag.to_ascii_lowercase()),
            data: String::new(),
            attributes: Vec::new(),
            parent: None,
            children: Vec::new(),
        }
    }

    fn character(kind: NodeKind, data: &str) -> Self {
        Self {
            kind,
            tag: None,
            data: data.to_owned(),
            attributes: Vec::new(),
            parent: None,
            children: Vec::new(),
        }
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    fn set_attribute(&mut self, name: &str, value: &str) {
        match self.attributes.iter_mut().find(|(key, _)| key == name) {
            Some(slot) => slot.1 = value.to_owned(),
            None => self.attributes.push((name.to_owned(), value.to_owned())),
        }
    }
}

struct DocumentInner {
    nodes: Vec<NodeData>,
    root: NodeId,
    head: NodeId,
    body: NodeId,
    pending_loads: HashMap<NodeId, LoadCallback>,
    journal: Vec<Mutation>,
}

impl DocumentInner {
    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId::from_raw(self.nodes.len() as u32);
        self.nodes.push(data);
        id
    }

    fn get(&self, node: NodeId) -> Option<&NodeData> {
        self.nodes.get(node.raw() as usize)
    }

    fn get_mut(&mut self, node: NodeId) -> Option<&mut NodeData> {
        self.nodes.get_mut(node.raw() as usize)
    }

    fn is_attached(&self, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if current == self.root {
                return true;
            }
            cursor = self.get(current).and_then(|data| data.parent);
        }
        false
    }

    fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.get(current).and_then(|data| data.parent);
        }
        false
    }

    fn detach(&mut self, node: NodeId) -> Option<NodeId> {
        let parent = self.get(node)?.parent?;
        if let Some(parent_data) = self.get_mut(parent) {
            parent_data.children.retain(|&child| child != node);
        }
        if let Some(data) = self.get_mut(node) {
            data.parent = None;
        }
        self.journal.push(Mutation::Removed { node, parent });
        Some(parent)
    }

    fn insert(&mut self, node: NodeId, position: InsertPosition) -> Result<(), DomError> {
        let InsertPosition { parent, after } = position;
        let parent_kind = self
            .get(parent)
            .ok_or(DomError::UnknownNode(parent))?
            .kind;
        if self.get(node).is_none() {
            return Err(DomError::UnknownNode(node));
        }
        if parent_kind != NodeKind::Element || self.is_inclusive_ancestor(node, parent) {
            return Err(DomError::HierarchyRequest { parent, node });
        }
        if let Some(anchor) = after {
            let is_child = self
                .get(parent)
                .is_some_and(|data| data.children.contains(&anchor));
            if !is_child {
                return Err(DomError::NotAChild { parent, anchor });
            }
            if anchor == node {
                // Inserting a node right after itself leaves it in place.
                return Ok(());
            }
        }

        self.detach(node);

        let Some(parent_data) = self.get_mut(parent) else {
            return Err(DomError::UnknownNode(parent));
        };
        let index = match after {
            Some(anchor) => parent_data
                .children
                .iter()
                .position(|&child| child == anchor)
                .map_or(parent_data.children.len(), |at| at + 1),
            None => parent_data.children.len(),
        };
        parent_data.children.insert(index, node);
        if let Some(data) = self.get_mut(node) {
            data.parent = Some(parent);
        }
        self.journal.push(Mutation::Inserted { node, parent });
        Ok(())
    }

    fn walk(&self, from: NodeId, out: &mut Vec<NodeId>) {
        out.push(from);
        if let Some(data) = self.get(from) {
            for &child in &data.children {
                self.walk(child, out);
            }
        }
    }
}

/// Deterministic, host-driven document tree.
#[derive(Clone)]
pub struct MemoryDocument {
    inner: Rc<RefCell<DocumentInner>>,
}

impl std::fmt::Debug for MemoryDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("MemoryDocument")
            .field("nodes", &inner.nodes.len())
            .field("pending_loads", &inner.pending_loads.len())
            .field("mutations", &inner.journal.len())
            .finish()
    }
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocument {
    /// Create `html > head, body` with an empty journal.
    #[must_use]
    pub fn new() -> Self {
        let mut inner = DocumentInner {
            nodes: Vec::new(),
            root: NodeId::from_raw(0),
            head: NodeId::from_raw(0),
            body: NodeId::from_raw(0),
            pending_loads: HashMap::new(),
            journal: Vec::new(),
        };
        let root = inner.push(NodeData::element("html"));
        let head = inner.push(NodeData::element("head"));
        let body = inner.push(NodeData::element("body"));
        for child in [head, body] {
            inner.nodes[child.raw() as usize].parent = Some(root);
            inner.nodes[root.raw() as usize].children.push(child);
        }
        inner.root = root;
        inner.head = head;
        inner.body = body;
        Self {
            inner: Rc::new(RefCell::new(inner)),
        }
    }

    /// The `html` element.
    #[must_use]
    pub fn document_element(&self) -> NodeId {
        self.inner.borrow().root
    }

    /// Create a detached element.
    pub fn create_element(&self, tag: &str) -> NodeId {
        self.inner.borrow_mut().push(NodeData::element(tag))
    }

    /// Create a detached comment.
    pub fn create_comment(&self, text: &str) -> NodeId {
        self.inner
            .borrow_mut()
            .push(NodeData::character(NodeKind::Comment, text))
    }

    /// Create a detached text node.
    pub fn create_text(&self, text: &str) -> NodeId {
        self.inner
            .borrow_mut()
            .push(NodeData::character(NodeKind::Text, text))
    }

    /// Append `child` as the last child of `parent`.
    pub fn append_child(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.inner
            .borrow_mut()
            .insert(child, InsertPosition::append(parent))
    }

    /// Insert `child` as the first child of `parent`.
    pub fn prepend_child(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        let mut inner = self.inner.borrow_mut();
        let first = inner.get(parent).and_then(|data| data.children.first().copied());
        match first {
            Some(first) if first != child => {
                inner.insert(child, InsertPosition::append(parent))?;
                let Some(parent_data) = inner.get_mut(parent) else {
                    return Err(DomError::UnknownNode(parent));
                };
                parent_data.children.retain(|&node| node != child);
                parent_data.children.insert(0, child);
                Ok(())
            }
            Some(_) => Ok(()),
            None => inner.insert(child, InsertPosition::append(parent)),
        }
    }

    /// Value of attribute `name` on `node`.
    #[must_use]
    pub fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.inner
            .borrow()
            .get(node)
            .and_then(|data| data.attribute(name))
            .map(str::to_owned)
    }

    /// Lowercase tag name of an element.
    #[must_use]
    pub fn tag_name(&self, node: NodeId) -> Option<String> {
        self.inner.borrow().get(node).and_then(|data| data.tag.clone())
    }

    /// Whether `node` is connected to the document element.
    #[must_use]
    pub fn is_attached(&self, node: NodeId) -> bool {
        self.inner.borrow().is_attached(node)
    }

    /// Element children of `parent`, in order.
    #[must_use]
    pub fn element_children(&self, parent: NodeId) -> Vec<NodeId> {
        let inner = self.inner.borrow();
        inner
            .get(parent)
            .map(|data| {
                data.children
                    .iter()
                    .copied()
                    .filter(|&child| {
                        inner
                            .get(child)
                            .is_some_and(|child| child.kind == NodeKind::Element)
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Attached elements, in document order, whose every `(name, value)`
    /// attribute pair matches.
    #[must_use]
    pub fn query(&self, attributes: &[(&str, &str)]) -> Vec<NodeId> {
        let inner = self.inner.borrow();
        let mut order = Vec::new();
        inner.walk(inner.root, &mut order);
        order
            .into_iter()
            .filter(|&node| {
                inner.get(node).is_some_and(|data| {
                    data.kind == NodeKind::Element
                        && attributes
                            .iter()
                            .all(|(name, value)| data.attribute(name) == Some(*value))
                })
            })
            .collect()
    }

    /// Fire the load event of a link created through the port.
    ///
    /// Returns `false` when no load callback is pending for `node` (never
    /// registered, or already fired). No internal borrow is held while the
    /// callback runs.
    pub fn fire_load(&self, node: NodeId) -> bool {
        let callback = self.inner.borrow_mut().pending_loads.remove(&node);
        match callback {
            Some(callback) => {
                trace!(%node, "memory document firing load");
                callback();
                true
            }
            None => false,
        }
    }

    /// Whether `node` still has an unfired load callback.
    #[must_use]
    pub fn has_pending_load(&self, node: NodeId) -> bool {
        self.inner.borrow().pending_loads.contains_key(&node)
    }

    /// Every mutation since construction, in order.
    #[must_use]
    pub fn journal(&self) -> Vec<Mutation> {
        self.inner.borrow().journal.clone()
    }

    /// Number of recorded mutations.
    #[must_use]
    pub fn mutation_count(&self) -> usize {
        self.inner.borrow().journal.len()
    }
}

impl DocumentPort for MemoryDocument {
    fn head(&self) -> NodeId {
        self.inner.borrow().head
    }

    fn root_content(&self) -> NodeId {
        self.inner.borrow().body
    }

    fn child_nodes(&self, parent: NodeId) -> Vec<NodeId> {
        self.inner
            .borrow()
            .get(parent)
            .map(|data| data.children.clone())
            .unwrap_or_default()
    }

    fn node_kind(&self, node: NodeId) -> Option<NodeKind> {
        self.inner.borrow().get(node).map(|data| data.kind)
    }

    fn character_data(&self, node: NodeId) -> Option<String> {
        self.inner
            .borrow()
            .get(node)
            .filter(|data| data.kind != NodeKind::Element)
            .map(|data| data.data.clone())
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.inner.borrow().get(node).and_then(|data| data.parent)
    }

    fn element_by_id(&self, id: &str) -> Option<NodeId> {
        let inner = self.inner.borrow();
        let mut order = Vec::new();
        inner.walk(inner.root, &mut order);
        order.into_iter().find(|&node| {
            inner.get(node).is_some_and(|data| {
                data.kind == NodeKind::Element && data.attribute("id") == Some(id)
            })
        })
    }

    fn create_link(
        &self,
        spec: &LinkSpec,
        on_load: Option<LoadCallback>,
    ) -> Result<NodeId, DomError> {
        let mut inner = self.inner.borrow_mut();
        let mut data = NodeData::element("link");
        data.set_attribute("rel", spec.rel.as_str());
        data.set_attribute("type", spec.mime_type);
        data.set_attribute("id", &spec.id);
        data.set_attribute("href", &spec.href);
        let node = inner.push(data);
        if let Some(callback) = on_load {
            inner.pending_loads.insert(node, callback);
        }
        Ok(node)
    }

    fn insert(&self, node: NodeId, position: InsertPosition) -> Result<(), DomError> {
        self.inner.borrow_mut().insert(node, position)
    }

    fn remove(&self, node: NodeId) {
        self.inner.borrow_mut().detach(node);
    }

    fn set_attribute(&self, element: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        let mut inner = self.inner.borrow_mut();
        let data = inner
            .get_mut(element)
            .ok_or(DomError::UnknownNode(element))?;
        if data.kind != NodeKind::Element {
            return Err(DomError::NotAnElement(element));
        }
        data.set_attribute(name, value);
        inner.journal.push(Mutation::AttributeSet {
            element,
            name: name.to_owned(),
            value: value.to_owned(),
        });
        Ok(())
    }
}
