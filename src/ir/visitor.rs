//! Traversal engine.
//!
//! Two kinds of passes walk the tree through `Node::visit_children` and
//! `Node::rewrite_children`:
//!
//! - an [`Inspector`] observes the tree and may report diagnostics;
//! - a [`Transform`] rebuilds it. Unchanged nodes come back as the very same
//!   instance, so a pass that changes nothing returns the input root, and a
//!   subtree shared by several parents is rewritten once and stays shared.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::trace;

use super::diagnostics::DiagnosticSink;
use super::error::IrResult;
use super::node::{Node, NodeKind, VisitOptions};

/// Read-only pass.
pub trait Inspector {
    /// Called before the children. Returning `false` skips them.
    fn preorder(&mut self, _node: &Node) -> bool {
        true
    }

    /// Called after the children.
    fn postorder(&mut self, _node: &Node) {}

    /// Also descend into the inferred types of expressions.
    fn visit_types(&self) -> bool {
        false
    }

    /// Visit a node reachable along several paths only the first time.
    fn visit_dag_once(&self) -> bool {
        true
    }

    /// Called once after the traversal; flushes collected diagnostics.
    fn end_apply(&mut self, _sink: &mut dyn DiagnosticSink) {}
}

/// Rewriting pass.
pub trait Transform {
    /// Called before the children. `Some(replacement)` replaces the node
    /// without descending into it.
    fn preorder(&mut self, _node: &Node) -> IrResult<Option<Node>> {
        Ok(None)
    }

    /// Called with the node rebuilt from its transformed children; returns
    /// its replacement.
    fn postorder(&mut self, node: Node) -> IrResult<Node> {
        Ok(node)
    }

    fn visit_types(&self) -> bool {
        false
    }

    fn end_apply(&mut self, _sink: &mut dyn DiagnosticSink) {}
}

/// Runs `inspector` over the tree rooted at `root`.
pub fn inspect(root: &Node, inspector: &mut dyn Inspector) {
    let options = VisitOptions { visit_types: inspector.visit_types() };
    let mut visited = FxHashSet::default();
    inspect_node(root, inspector, options, &mut visited);
}

fn inspect_node(node: &Node, inspector: &mut dyn Inspector, options: VisitOptions, visited: &mut FxHashSet<usize>) {
    if inspector.visit_dag_once() && !visited.insert(node.as_ptr() as usize) {
        return;
    }
    if inspector.preorder(node) {
        node.visit_children(options, &mut |child| inspect_node(child, inspector, options, visited));
    }
    inspector.postorder(node);
}

/// Runs `pass` over the tree rooted at `root` and returns the new root.
pub fn transform(root: &Node, pass: &mut dyn Transform) -> IrResult<Node> {
    let options = VisitOptions { visit_types: pass.visit_types() };
    let mut memo: FxHashMap<usize, Node> = FxHashMap::default();
    transform_node(root, pass, options, &mut memo)
}

fn transform_node(
    node: &Node,
    pass: &mut dyn Transform,
    options: VisitOptions,
    memo: &mut FxHashMap<usize, Node>,
) -> IrResult<Node> {
    let key = node.as_ptr() as usize;
    if let Some(done) = memo.get(&key) {
        return Ok(done.clone());
    }
    let result = match pass.preorder(node)? {
        Some(replacement) => replacement,
        None => {
            let rebuilt = node.rewrite_children(options, &mut |child| transform_node(child, pass, options, memo))?;
            pass.postorder(rebuilt)?
        }
    };
    if !result.ptr_eq(node) {
        trace!("rewrote {} '{}'", node.kind(), node);
    }
    memo.insert(key, result.clone());
    Ok(result)
}

/// Counts nodes per kind.
#[derive(Debug, Default)]
pub struct NodeCounter {
    counts: FxHashMap<NodeKind, usize>,
    total: usize,
}

impl NodeCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn count(&self, kind: NodeKind) -> usize {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    /// Per-kind counts, ordered by kind.
    pub fn counts(&self) -> Vec<(NodeKind, usize)> {
        let mut counts: Vec<_> = self.counts.iter().map(|(k, v)| (*k, *v)).collect();
        counts.sort();
        counts
    }
}

impl Inspector for NodeCounter {
    fn preorder(&mut self, node: &Node) -> bool {
        *self.counts.entry(node.kind()).or_default() += 1;
        self.total += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::expressions::{BinaryOp, BinaryOperator, Constant, PathExpression};
    use crate::ir::source_info::SourceInfo;
    use crate::ir::types::TypeBits;

    fn sum_of(left: Node, right: Node) -> Node {
        BinaryOp::new(SourceInfo::invalid(), BinaryOperator::Add, left, right).unwrap().into()
    }

    fn num(v: i128) -> Node {
        Constant::new(SourceInfo::invalid(), v).unwrap().into()
    }

    struct Order(Vec<String>);

    impl Inspector for Order {
        fn preorder(&mut self, node: &Node) -> bool {
            self.0.push(format!("pre {}", node.dbprint_label()));
            true
        }

        fn postorder(&mut self, node: &Node) {
            self.0.push(format!("post {}", node.dbprint_label()));
        }
    }

    #[test]
    fn test_inspect_order() {
        let tree = sum_of(num(1), num(2));
        let mut order = Order(Vec::new());
        inspect(&tree, &mut order);
        assert_eq!(order.0, vec!["pre +", "pre 1", "post 1", "pre 2", "post 2", "post +"]);
    }

    #[test]
    fn test_shared_subtree_visited_once() {
        let shared = num(7);
        let tree = sum_of(shared.clone(), shared);
        let mut counter = NodeCounter::new();
        inspect(&tree, &mut counter);
        assert_eq!(counter.count(NodeKind::Constant), 1);
    }

    struct Noop;

    impl Transform for Noop {}

    #[test]
    fn test_noop_transform_returns_same_root() {
        let tree = sum_of(num(1), PathExpression::named("x").unwrap().into());
        let result = transform(&tree, &mut Noop).unwrap();
        assert!(result.ptr_eq(&tree));
    }

    /// Replaces every constant 1 with 100.
    struct BumpOnes {
        calls: usize,
    }

    impl Transform for BumpOnes {
        fn postorder(&mut self, node: Node) -> IrResult<Node> {
            self.calls += 1;
            match &node {
                Node::Constant(c) if c.value == 1 => Ok(num(100)),
                _ => Ok(node),
            }
        }
    }

    #[test]
    fn test_transform_shares_unchanged_and_rewrites_shared_once() {
        let one = num(1);
        let two = num(2);
        let left = sum_of(one.clone(), one);
        let tree = sum_of(left, two.clone());
        let mut pass = BumpOnes { calls: 0 };
        let result = transform(&tree, &mut pass).unwrap();
        assert!(!result.ptr_eq(&tree));
        assert_eq!(result.to_string(), "100 + 100 + 2");
        let Node::BinaryOp(top) = &result else { panic!("expected a binary op") };
        assert!(top.right.ptr_eq(&two));
        let Node::BinaryOp(inner) = &top.left else { panic!("expected a binary op") };
        assert!(inner.left.ptr_eq(&inner.right));
        // +, +, 1 (once), 2
        assert_eq!(pass.calls, 4);
    }

    struct Retype;

    impl Transform for Retype {
        fn visit_types(&self) -> bool {
            true
        }

        fn postorder(&mut self, node: Node) -> IrResult<Node> {
            match &node {
                Node::TypeUnknown(_) => Ok(TypeBits::bits(8)?.into()),
                _ => Ok(node),
            }
        }
    }

    #[test]
    fn test_inferred_types_rewritten_only_when_requested() {
        let tree = num(3);
        let result = transform(&tree, &mut Retype).unwrap();
        assert_eq!(result.inferred_type().unwrap().to_string(), "bit<8>");

        struct RetypeBlind;
        impl Transform for RetypeBlind {
            fn postorder(&mut self, node: Node) -> IrResult<Node> {
                Retype.postorder(node)
            }
        }
        let untouched = transform(&tree, &mut RetypeBlind).unwrap();
        assert!(untouched.ptr_eq(&tree));
    }

    #[test]
    fn test_kind_mismatch_is_an_error() {
        struct Vandal;
        impl Transform for Vandal {
            fn postorder(&mut self, node: Node) -> IrResult<Node> {
                match node {
                    Node::Path(_) => Ok(num(0)),
                    other => Ok(other),
                }
            }
        }
        let tree: Node = PathExpression::named("x").unwrap().into();
        assert!(transform(&tree, &mut Vandal).is_err());
    }
}
