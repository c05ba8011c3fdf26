#![forbid(unsafe_code)]

//! Insertion point resolution.
//!
//! Turns the configured [`InsertionPoint`] into a concrete [`InsertPosition`]
//! against the current document. Resolution is repeated for every insertion:
//! marker nodes can move between calls, so a position is never cached.

use themeswap_dom::{DocumentPort, InsertPosition, NodeId};
use tracing::{trace, warn};

use crate::config::InsertionPoint;
use crate::error::{Result, ThemeSwitchError};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsertionResolver {
    point: Option<InsertionPoint>,
}

impl InsertionResolver {
    #[must_use]
    pub fn new(point: Option<InsertionPoint>) -> Self {
        Self { point }
    }

    #[must_use]
    pub fn point(&self) -> Option<&InsertionPoint> {
        self.point.as_ref()
    }

    /// Resolve the position for one insertion.
    ///
    /// A label with no matching head comment, or a node that is not an
    /// element, logs one warning and falls back to appending to the head. An
    /// element without a parent is a configuration error.
    pub fn resolve<D: DocumentPort + ?Sized>(&self, document: &D) -> Result<InsertPosition> {
        let head = document.head();
        let anchor = match &self.point {
            None => return Ok(InsertPosition::append(head)),
            Some(InsertionPoint::Node(node)) if document.is_element(*node) => {
                return Self::after_element(document, *node);
            }
            Some(InsertionPoint::Node(_)) => None,
            Some(InsertionPoint::Label(label)) => document.find_marker_comment(label),
        };

        match anchor {
            Some(comment) => {
                trace!(%comment, "resolved insertion point to marker comment");
                Ok(InsertPosition::after(head, comment))
            }
            None => {
                let point = self.point.as_ref().map(ToString::to_string).unwrap_or_default();
                warn!(
                    insertion_point = %point,
                    "Insertion point '{point}' does not exist. Be sure to add comment on head and that it matches the insertionPoint"
                );
                Ok(InsertPosition::append(head))
            }
        }
    }

    fn after_element<D: DocumentPort + ?Sized>(document: &D, node: NodeId) -> Result<InsertPosition> {
        match document.parent(node) {
            Some(parent) => Ok(InsertPosition::after(parent, node)),
            None => Err(ThemeSwitchError::DetachedInsertionPoint { node }),
        }
    }

    /// Resolve a position and attach `node` there.
    pub fn insert<D: DocumentPort + ?Sized>(&self, document: &D, node: NodeId) -> Result<InsertPosition> {
        let position = self.resolve(document)?;
        document.insert(node, position)?;
        Ok(position)
    }
}
