#![forbid(unsafe_code)]

//! Document mutation port for themeswap.
//!
//! # Role in themeswap
//! The theme switcher never touches a host document directly. Every lookup and
//! mutation it needs (find a marker comment, insert a node after a sibling,
//! remove a node by id, write an attribute on the root content element) goes
//! through [`DocumentPort`], so the switching logic can run against a real
//! browser document or a deterministic in-memory one.
//!
//! # This crate provides
//! - [`NodeId`], [`NodeKind`], [`LinkSpec`] and [`InsertPosition`], the node
//!   vocabulary shared by every backend.
//! - [`DocumentPort`], the port trait.
//! - [`MemoryDocument`], a host-driven document tree: the embedding test or
//!   host decides when a stylesheet finishes loading via
//!   [`MemoryDocument::fire_load`].
//! - `WebDocument` (feature `web`, wasm32 only), a backend over `web-sys`.

pub mod memory;
#[cfg(all(feature = "web", target_arch = "wasm32"))]
pub mod web;

use core::fmt;

pub use memory::{MemoryDocument, Mutation};
#[cfg(all(feature = "web", target_arch = "wasm32"))]
pub use web::WebDocument;

/// MIME type stamped on every link node created through the port.
pub const CSS_MIME: &str = "text/css";

/// Opaque handle to a node owned by a [`DocumentPort`] backend.
///
/// Ids are only meaningful for the backend that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// Wrap a raw backend index.
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw backend index.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// The node types the port distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Element,
    Comment,
    Text,
}

/// `rel` value of a created link node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkRel {
    /// The active theme stylesheet.
    Stylesheet,
    /// A cache-priming hint for a theme that is not active.
    Prefetch,
}

impl LinkRel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stylesheet => "stylesheet",
            Self::Prefetch => "prefetch",
        }
    }
}

impl fmt::Display for LinkRel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Description of a `<link>` node to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSpec {
    pub rel: LinkRel,
    pub mime_type: &'static str,
    pub id: String,
    pub href: String,
}

impl LinkSpec {
    /// A `rel=stylesheet` CSS link.
    #[must_use]
    pub fn stylesheet(id: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            rel: LinkRel::Stylesheet,
            mime_type: CSS_MIME,
            id: id.into(),
            href: href.into(),
        }
    }

    /// A `rel=prefetch` CSS link.
    #[must_use]
    pub fn prefetch(id: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            rel: LinkRel::Prefetch,
            mime_type: CSS_MIME,
            id: id.into(),
            href: href.into(),
        }
    }
}

/// Where a node is placed: under `parent`, immediately after `after`, or at
/// the end of `parent`'s children when `after` is `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertPosition {
    pub parent: NodeId,
    pub after: Option<NodeId>,
}

impl InsertPosition {
    /// Append as the last child of `parent`.
    #[must_use]
    pub const fn append(parent: NodeId) -> Self {
        Self {
            parent,
            after: None,
        }
    }

    /// Insert right after `anchor`, which must be a child of `parent`.
    #[must_use]
    pub const fn after(parent: NodeId, anchor: NodeId) -> Self {
        Self {
            parent,
            after: Some(anchor),
        }
    }
}

/// Invoked once when the resource behind a created link finishes loading.
pub type LoadCallback = Box<dyn FnOnce()>;

/// Failures reported by a [`DocumentPort`] backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    #[error("{0} does not exist")]
    UnknownNode(NodeId),

    #[error("{0} is not an element")]
    NotAnElement(NodeId),

    #[error("{anchor} is not a child of {parent}")]
    NotAChild { parent: NodeId, anchor: NodeId },

    #[error("{node} cannot be inserted under {parent}")]
    HierarchyRequest { parent: NodeId, node: NodeId },

    #[error("host document error: {0}")]
    Host(String),
}

/// Primitive operations against a host document tree.
///
/// Backends use interior mutability: every method takes `&self`, and no
/// backend may hold an internal borrow while a [`LoadCallback`] runs.
pub trait DocumentPort {
    /// The document head.
    fn head(&self) -> NodeId;

    /// The root content element (the body) that carries the theme attribute.
    fn root_content(&self) -> NodeId;

    /// Direct children of `parent`, in order. Empty for unknown nodes.
    fn child_nodes(&self, parent: NodeId) -> Vec<NodeId>;

    fn node_kind(&self, node: NodeId) -> Option<NodeKind>;

    /// Character data of a comment or text node.
    fn character_data(&self, node: NodeId) -> Option<String>;

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// First attached element whose `id` attribute equals `id`.
    fn element_by_id(&self, id: &str) -> Option<NodeId>;

    /// Create a detached link node. `on_load` fires when its resource loads.
    fn create_link(
        &self,
        spec: &LinkSpec,
        on_load: Option<LoadCallback>,
    ) -> Result<NodeId, DomError>;

    /// Attach `node` at `position`.
    fn insert(&self, node: NodeId, position: InsertPosition) -> Result<(), DomError>;

    /// Detach `node` from its parent. Detached or unknown nodes are ignored.
    ///
    /// A backend may retire the id afterwards; callers must not reuse it.
    fn remove(&self, node: NodeId);

    fn set_attribute(&self, element: NodeId, name: &str, value: &str) -> Result<(), DomError>;

    fn is_element(&self, node: NodeId) -> bool {
        self.node_kind(node) == Some(NodeKind::Element)
    }

    /// First direct child of the head that is a comment whose trimmed text
    /// equals `label`.
    fn find_marker_comment(&self, label: &str) -> Option<NodeId> {
        self.child_nodes(self.head()).into_iter().find(|&node| {
            self.node_kind(node) == Some(NodeKind::Comment)
                && self
                    .character_data(node)
                    .is_some_and(|text| text.trim() == label)
        })
    }

    /// Remove the element carrying `id`, if any. Returns whether one was removed.
    fn remove_by_id(&self, id: &str) -> bool {
        match self.element_by_id(id) {
            Some(node) => {
                self.remove(node);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_specs_are_css() {
        let sheet = LinkSpec::stylesheet("current-theme-style", "./dark.css");
        assert_eq!(sheet.rel, LinkRel::Stylesheet);
        assert_eq!(sheet.mime_type, "text/css");
        let prefetch = LinkSpec::prefetch("theme-prefetch-dark", "./dark.css");
        assert_eq!(prefetch.rel.as_str(), "prefetch");
        assert_eq!(prefetch.mime_type, CSS_MIME);
    }

    #[test]
    fn node_id_display() {
        assert_eq!(NodeId::from_raw(7).to_string(), "node#7");
        assert_eq!(NodeId::from_raw(7).raw(), 7);
    }

    #[test]
    fn dom_error_messages() {
        let err = DomError::NotAChild {
            parent: NodeId::from_raw(1),
            anchor: NodeId::from_raw(9),
        };
        assert_eq!(err.to_string(), "node#9 is not a child of node#1");
    }
}
