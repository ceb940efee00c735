use std::sync::Arc;

use super::{IrNode, Node, NodeVector, TypedVector, VisitOptions};
use crate::ir::error::{IrError, IrResult};

/// Read-only view over a node's traversable fields.
pub struct ChildVisitor<'f> {
    options: VisitOptions,
    f: &'f mut dyn FnMut(&Node),
}

impl<'f> ChildVisitor<'f> {
    pub fn new(options: VisitOptions, f: &'f mut dyn FnMut(&Node)) -> Self {
        ChildVisitor { options, f }
    }

    pub fn visit_types(&self) -> bool {
        self.options.visit_types
    }

    pub fn node(&mut self, child: &Node) {
        (self.f)(child)
    }

    pub fn typed<T: IrNode>(&mut self, child: &Arc<T>) {
        (self.f)(&T::into_node(Arc::clone(child)))
    }

    pub fn optional(&mut self, child: &Option<Node>) {
        if let Some(child) = child {
            self.node(child);
        }
    }

    pub fn vector(&mut self, children: &NodeVector) {
        for child in children.iter() {
            self.node(child);
        }
    }

    pub fn typed_vector<T: IrNode>(&mut self, children: &TypedVector<T>) {
        for child in children.iter() {
            self.typed(child);
        }
    }

    /// Visits an expression's inferred-type field only when requested.
    pub fn inferred_type(&mut self, ty: &Node) {
        if self.options.visit_types {
            self.node(ty);
        }
    }
}

/// Rewriting view over a node's traversable fields.
///
/// Each helper returns the (possibly replaced) child and records whether any
/// child changed identity, so `map_children` can hand back the original
/// node untouched when nothing changed.
pub struct ChildMapper<'f> {
    options: VisitOptions,
    f: &'f mut dyn FnMut(&Node) -> IrResult<Node>,
    changed: bool,
}

impl<'f> ChildMapper<'f> {
    pub fn new(options: VisitOptions, f: &'f mut dyn FnMut(&Node) -> IrResult<Node>) -> Self {
        ChildMapper { options, f, changed: false }
    }

    pub fn visit_types(&self) -> bool {
        self.options.visit_types
    }

    pub fn changed(&self) -> bool {
        self.changed
    }

    pub fn node(&mut self, child: &Node) -> IrResult<Node> {
        let result = (self.f)(child)?;
        if !result.ptr_eq(child) {
            self.changed = true;
        }
        Ok(result)
    }

    /// Rewrites a child stored with a fixed kind; a replacement of another
    /// kind is an invariant failure.
    pub fn typed<T: IrNode>(&mut self, child: &Arc<T>) -> IrResult<Arc<T>> {
        let result = self.node(&T::into_node(Arc::clone(child)))?;
        T::from_node(&result)
            .cloned()
            .ok_or(IrError::RewriteKindMismatch { expected: T::KIND, found: result.kind() })
    }

    pub fn optional(&mut self, child: &Option<Node>) -> IrResult<Option<Node>> {
        child.as_ref().map(|c| self.node(c)).transpose()
    }

    pub fn vector(&mut self, children: &NodeVector) -> IrResult<NodeVector> {
        let mut rewritten = Vec::with_capacity(children.len());
        let mut any_changed = false;
        for child in children.iter() {
            let result = (self.f)(child)?;
            any_changed |= !result.ptr_eq(child);
            rewritten.push(result);
        }
        if !any_changed {
            return Ok(children.clone());
        }
        self.changed = true;
        Ok(rewritten.into_iter().collect())
    }

    pub fn typed_vector<T: IrNode>(&mut self, children: &TypedVector<T>) -> IrResult<TypedVector<T>> {
        let mut rewritten = Vec::with_capacity(children.len());
        let mut any_changed = false;
        for child in children.iter() {
            let result = (self.f)(&T::into_node(Arc::clone(child)))?;
            let typed = T::from_node(&result)
                .cloned()
                .ok_or(IrError::RewriteKindMismatch { expected: T::KIND, found: result.kind() })?;
            any_changed |= !Arc::ptr_eq(&typed, child);
            rewritten.push(typed);
        }
        if !any_changed {
            return Ok(children.clone());
        }
        self.changed = true;
        Ok(rewritten.into_iter().collect())
    }

    /// Rewrites an expression's inferred-type field only when requested.
    pub fn inferred_type(&mut self, ty: &Node) -> IrResult<Node> {
        if self.options.visit_types {
            self.node(ty)
        } else {
            Ok(ty.clone())
        }
    }
}
