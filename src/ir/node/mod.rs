// IR Node Module
//
// The node model is split into:
//
// - node_types: the closed `Node` enumeration and its `NodeKind` tags
// - children: helpers that declare traversable fields and rebuild nodes
// - node_impl: kind-dispatched queries (capabilities, types, equality)

mod children;
mod node_impl;
mod node_types;

use std::fmt;
use std::sync::Arc;

use archery::ArcK;
use rpds::Vector;

use super::error::IrResult;
use super::source_info::SourceInfo;

pub use children::{ChildMapper, ChildVisitor};
pub use node_impl::Category;
pub use node_types::{Node, NodeKind};

/// Persistent vector of polymorphic children.
pub type NodeVector = Vector<Node, ArcK>;

/// Persistent vector of children of one fixed kind.
pub type TypedVector<T> = Vector<Arc<T>, ArcK>;

/// Controls which fields a traversal treats as substructure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VisitOptions {
    /// Also visit the inferred-type field of expressions. Off by default:
    /// most passes must neither perturb nor depend on inference results.
    pub visit_types: bool,
}

impl VisitOptions {
    pub fn with_types() -> Self {
        VisitOptions { visit_types: true }
    }
}

/// Link between a payload type and its `Node` variant. Implemented for every
/// payload by the `node_kinds!` table in `node_types`.
pub trait NodePayload: Sized {
    const KIND: NodeKind;

    fn into_node(this: Arc<Self>) -> Node;

    fn from_node(node: &Node) -> Option<&Arc<Self>>;
}

/// The contract every node kind implements.
///
/// Payloads are immutable once wrapped in an `Arc`. Constructors run
/// [`IrNode::validate`] and copy-on-write setters run it again on the copy;
/// nothing re-validates implicitly afterwards.
pub trait IrNode: NodePayload + fmt::Debug + fmt::Display + Clone + Send + Sync + 'static {
    fn src_info(&self) -> &SourceInfo;

    /// Checks structural invariants, returning an invariant failure when the
    /// node is malformed.
    fn validate(&self) -> IrResult<()>;

    /// Developer-facing label used by `dbprint`; may expose internal names
    /// and declaration ids.
    fn dbprint_label(&self) -> String {
        self.to_string()
    }

    /// Declares the traversable substructure, in source order.
    fn visit_children(&self, _v: &mut ChildVisitor<'_>) {}

    /// Rewrites children through `m`. Returns `Some(copy)` only when at
    /// least one child was replaced by a different node.
    fn map_children(&self, _m: &mut ChildMapper<'_>) -> IrResult<Option<Self>> {
        Ok(None)
    }

    /// Validates `self` and wraps it for sharing.
    fn finish(self) -> IrResult<Arc<Self>> {
        self.validate()?;
        Ok(Arc::new(self))
    }
}
