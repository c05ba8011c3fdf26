#![forbid(unsafe_code)]

//! Browser backend over `web-sys`.
//!
//! DOM nodes are registered in a slot table the first time the port hands
//! them out, so the same DOM node always maps to the same [`NodeId`] while it
//! stays registered. A [`NodeId`] packs a slot index with the slot's
//! generation. Removing a node through the port frees its slot and bumps the
//! generation, so the JS reference (and any `onload` closure it keeps alive)
//! is released and a stale id reports [`DomError::UnknownNode`] instead of
//! aliasing a newer node.

use std::cell::RefCell;

use tracing::trace;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Element, HtmlLinkElement, Node};

use crate::{DocumentPort, DomError, InsertPosition, LinkSpec, LoadCallback, NodeId, NodeKind};

const INDEX_BITS: u32 = 20;
const INDEX_MASK: u32 = (1 << INDEX_BITS) - 1;
const GENERATION_MASK: u32 = u32::MAX >> INDEX_BITS;

fn host_error(err: JsValue) -> DomError {
    DomError::Host(format!("{err:?}"))
}

#[derive(Default)]
struct Slot {
    node: Option<Node>,
    generation: u32,
}

impl Slot {
    fn id(&self, index: usize) -> NodeId {
        NodeId::from_raw((self.generation << INDEX_BITS) | index as u32)
    }
}

#[derive(Default)]
struct Registry {
    slots: Vec<Slot>,
    free: Vec<usize>,
}

impl Registry {
    fn register(&mut self, node: Node) -> NodeId {
        let known = self.slots.iter().position(|slot| {
            slot.node
                .as_ref()
                .is_some_and(|known| known.is_same_node(Some(&node)))
        });
        if let Some(index) = known {
            return self.slots[index].id(index);
        }
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot::default());
                self.slots.len() - 1
            }
        };
        debug_assert!(index as u32 <= INDEX_MASK, "node registry exhausted");
        self.slots[index].node = Some(node);
        self.slots[index].id(index)
    }

    fn lookup(&self, id: NodeId) -> Option<Node> {
        let raw = id.raw();
        let slot = self.slots.get((raw & INDEX_MASK) as usize)?;
        if slot.generation != raw >> INDEX_BITS {
            return None;
        }
        slot.node.clone()
    }

    fn release(&mut self, id: NodeId) -> Option<Node> {
        let raw = id.raw();
        let index = (raw & INDEX_MASK) as usize;
        let slot = self.slots.get_mut(index)?;
        if slot.generation != raw >> INDEX_BITS {
            return None;
        }
        let node = slot.node.take()?;
        slot.generation = (slot.generation + 1) & GENERATION_MASK;
        self.free.push(index);
        Some(node)
    }

    fn live(&self) -> usize {
        self.slots.len() - self.free.len()
    }
}

/// [`DocumentPort`] over the live browser document.
pub struct WebDocument {
    document: Document,
    head: NodeId,
    body: NodeId,
    registry: RefCell<Registry>,
}

impl std::fmt::Debug for WebDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebDocument")
            .field("registered_nodes", &self.registered_nodes())
            .finish()
    }
}

impl WebDocument {
    /// Bind to `window.document`.
    pub fn from_window() -> Result<Self, DomError> {
        let window = web_sys::window().ok_or_else(|| DomError::Host("no global window".into()))?;
        let document = window
            .document()
            .ok_or_else(|| DomError::Host("window has no document".into()))?;
        Self::new(document)
    }

    /// Bind to `document`, which must already have a head and a body.
    pub fn new(document: Document) -> Result<Self, DomError> {
        let head: Node = document
            .head()
            .ok_or_else(|| DomError::Host("document has no head".into()))?
            .into();
        let body: Node = document
            .body()
            .ok_or_else(|| DomError::Host("document has no body".into()))?
            .into();
        let mut registry = Registry::default();
        let head = registry.register(head);
        let body = registry.register(body);
        Ok(Self {
            document,
            head,
            body,
            registry: RefCell::new(registry),
        })
    }

    /// The bound document.
    #[must_use]
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Id for `node`, registering it on first use. Use this to pass an
    /// element as an insertion point.
    pub fn node_id(&self, node: &Node) -> NodeId {
        self.register(node.clone())
    }

    /// Nodes currently held by the registry.
    #[must_use]
    pub fn registered_nodes(&self) -> usize {
        self.registry.borrow().live()
    }

    fn register(&self, node: Node) -> NodeId {
        self.registry.borrow_mut().register(node)
    }

    fn node(&self, id: NodeId) -> Option<Node> {
        self.registry.borrow().lookup(id)
    }

    fn require(&self, id: NodeId) -> Result<Node, DomError> {
        self.node(id).ok_or(DomError::UnknownNode(id))
    }
}

impl DocumentPort for WebDocument {
    fn head(&self) -> NodeId {
        self.head
    }

    fn root_content(&self) -> NodeId {
        self.body
    }

    fn child_nodes(&self, parent: NodeId) -> Vec<NodeId> {
        let Some(parent) = self.node(parent) else {
            return Vec::new();
        };
        let list = parent.child_nodes();
        (0..list.length())
            .filter_map(|index| list.item(index))
            .map(|child| self.register(child))
            .collect()
    }

    fn node_kind(&self, node: NodeId) -> Option<NodeKind> {
        match self.node(node)?.node_type() {
            Node::ELEMENT_NODE => Some(NodeKind::Element),
            Node::COMMENT_NODE => Some(NodeKind::Comment),
            Node::TEXT_NODE => Some(NodeKind::Text),
            _ => None,
        }
    }

    fn character_data(&self, node: NodeId) -> Option<String> {
        self.node(node)?.node_value()
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.node(node)?.parent_node()?;
        Some(self.register(parent))
    }

    fn element_by_id(&self, id: &str) -> Option<NodeId> {
        let element = self.document.get_element_by_id(id)?;
        Some(self.register(element.into()))
    }

    fn create_link(
        &self,
        spec: &LinkSpec,
        on_load: Option<LoadCallback>,
    ) -> Result<NodeId, DomError> {
        let link: HtmlLinkElement = self
            .document
            .create_element("link")
            .map_err(host_error)?
            .dyn_into()
            .map_err(|_| DomError::Host("created element is not a link".into()))?;
        link.set_rel(spec.rel.as_str());
        link.set_type(spec.mime_type);
        link.set_id(&spec.id);
        link.set_href(&spec.href);
        if let Some(callback) = on_load {
            let handler = Closure::once_into_js(move || callback());
            link.set_onload(Some(handler.unchecked_ref()));
        }
        trace!(id = %spec.id, href = %spec.href, rel = %spec.rel, "web document created link");
        Ok(self.register(link.into()))
    }

    fn insert(&self, node: NodeId, position: InsertPosition) -> Result<(), DomError> {
        let child = self.require(node)?;
        let parent = self.require(position.parent)?;
        match position.after {
            Some(anchor_id) => {
                let anchor = self.require(anchor_id)?;
                if !anchor
                    .parent_node()
                    .is_some_and(|owner| owner.is_same_node(Some(&parent)))
                {
                    return Err(DomError::NotAChild {
                        parent: position.parent,
                        anchor: anchor_id,
                    });
                }
                let next = anchor.next_sibling();
                parent
                    .insert_before(&child, next.as_ref())
                    .map_err(host_error)?;
            }
            None => {
                parent.append_child(&child).map_err(host_error)?;
            }
        }
        Ok(())
    }

    fn remove(&self, node: NodeId) {
        if node == self.head || node == self.body {
            return;
        }
        let Some(child) = self.registry.borrow_mut().release(node) else {
            return;
        };
        if let Some(parent) = child.parent_node() {
            // A concurrent script may already have moved the node.
            let _ = parent.remove_child(&child);
        }
        trace!(%node, "web document released node");
    }

    fn set_attribute(&self, element: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        let node = self.require(element)?;
        let element_ref: &Element = node
            .dyn_ref()
            .ok_or(DomError::NotAnElement(element))?;
        element_ref.set_attribute(name, value).map_err(host_error)
    }
}
