use std::sync::Arc;

use parking_lot::Mutex;
use petgraph::algo::toposort;
use petgraph::stable_graph::{NodeIndex, StableGraph};
use rustc_hash::FxHashMap;
use tracing::{debug, error};

use super::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink};
use super::error::{IrError, IrResult};
use super::node::Node;
use super::visitor::{inspect, transform, Inspector, Transform};

/// Either a read-only pass or a rewriting one.
pub enum PassKind {
    Inspect(Arc<Mutex<dyn Inspector + Send>>),
    Transform(Arc<Mutex<dyn Transform + Send>>),
}

/// A single pass in the pipeline together with the ids of the passes that
/// must run before it.
pub struct Pass {
    pub id: String,
    pub dependencies: Vec<String>,
    pub kind: PassKind,
}

impl Pass {
    pub fn inspector(id: impl Into<String>, dependencies: &[&str], inspector: impl Inspector + Send + 'static) -> Self {
        Pass {
            id: id.into(),
            dependencies: dependencies.iter().map(|d| d.to_string()).collect(),
            kind: PassKind::Inspect(Arc::new(Mutex::new(inspector))),
        }
    }

    pub fn transform(id: impl Into<String>, dependencies: &[&str], pass: impl Transform + Send + 'static) -> Self {
        Pass {
            id: id.into(),
            dependencies: dependencies.iter().map(|d| d.to_string()).collect(),
            kind: PassKind::Transform(Arc::new(Mutex::new(pass))),
        }
    }
}

impl Clone for Pass {
    fn clone(&self) -> Self {
        Pass {
            id: self.id.clone(),
            dependencies: self.dependencies.clone(),
            kind: match &self.kind {
                PassKind::Inspect(p) => PassKind::Inspect(Arc::clone(p)),
                PassKind::Transform(p) => PassKind::Transform(Arc::clone(p)),
            },
        }
    }
}

/// Passes organised in a dependency graph and run in topological order.
/// Each transform receives the tree produced by the passes before it.
#[derive(Default)]
pub struct Pipeline {
    graph: StableGraph<Pass, ()>,
    node_indices: FxHashMap<String, NodeIndex>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.node_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_indices.is_empty()
    }

    /// Adds `pass`. Its dependencies must already be in the pipeline.
    pub fn add_pass(&mut self, pass: Pass) -> IrResult<()> {
        if self.node_indices.contains_key(&pass.id) {
            return Err(IrError::Pipeline(format!("duplicate pass id '{}'", pass.id)));
        }
        let deps = pass
            .dependencies
            .iter()
            .map(|dep| {
                self.node_indices
                    .get(dep)
                    .copied()
                    .ok_or_else(|| IrError::Pipeline(format!("pass '{}' depends on unknown pass '{}'", pass.id, dep)))
            })
            .collect::<IrResult<Vec<_>>>()?;
        let id = pass.id.clone();
        let node = self.graph.add_node(pass);
        for dep in deps {
            self.graph.add_edge(dep, node, ());
        }
        self.node_indices.insert(id, node);
        Ok(())
    }

    /// Removes the pass with the given id. Returns whether it was present.
    pub fn remove_pass(&mut self, id: &str) -> bool {
        match self.node_indices.remove(id) {
            Some(node) => self.graph.remove_node(node).is_some(),
            None => false,
        }
    }

    /// Pass ids in execution order.
    pub fn order(&self) -> IrResult<Vec<String>> {
        Ok(self.sorted()?.into_iter().map(|idx| self.graph[idx].id.clone()).collect())
    }

    fn sorted(&self) -> IrResult<Vec<NodeIndex>> {
        toposort(&self.graph, None)
            .map_err(|cycle| IrError::Pipeline(format!("dependency cycle through '{}'", self.graph[cycle.node_id()].id)))
    }

    /// Runs every pass over `root` and returns the final tree.
    ///
    /// The first invariant failure aborts the run: it is reported to `sink`
    /// as an internal diagnostic and returned.
    pub fn run(&self, root: &Node, sink: &mut dyn DiagnosticSink) -> IrResult<Node> {
        let mut current = root.clone();
        for idx in self.sorted()? {
            let pass = &self.graph[idx];
            debug!("running pass '{}'", pass.id);
            match &pass.kind {
                PassKind::Inspect(inspector) => {
                    let mut inspector = inspector.lock();
                    inspect(&current, &mut *inspector);
                    inspector.end_apply(sink);
                }
                PassKind::Transform(pass_impl) => {
                    let mut pass_impl = pass_impl.lock();
                    match transform(&current, &mut *pass_impl) {
                        Ok(next) => {
                            if !next.ptr_eq(&current) {
                                debug!("pass '{}' changed the tree", pass.id);
                            }
                            current = next;
                            pass_impl.end_apply(sink);
                        }
                        Err(e) => {
                            error!("pass '{}' failed: {}", pass.id, e);
                            sink.report(Diagnostic::error(
                                DiagnosticKind::Internal,
                                e.src_info(),
                                format!("{}: {}", pass.id, e),
                            ));
                            return Err(e);
                        }
                    }
                }
            }
        }
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::diagnostics::DiagnosticCollector;
    use crate::ir::expressions::{Constant, PathExpression};
    use crate::ir::source_info::SourceInfo;

    struct Identity;

    impl Transform for Identity {}

    #[test]
    fn test_pipeline_identity_preserves_root() {
        let mut pipeline = Pipeline::new();
        pipeline.add_pass(Pass::transform("identity", &[], Identity)).unwrap();
        let node: Node = PathExpression::named("x").unwrap().into();
        let mut sink = DiagnosticCollector::new();
        let result = pipeline.run(&node, &mut sink).unwrap();
        assert!(result.ptr_eq(&node));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_dependency_order() {
        let mut pipeline = Pipeline::new();
        pipeline.add_pass(Pass::transform("a", &[], Identity)).unwrap();
        pipeline.add_pass(Pass::transform("b", &["a"], Identity)).unwrap();
        pipeline.add_pass(Pass::transform("c", &["b"], Identity)).unwrap();
        assert_eq!(pipeline.order().unwrap(), vec!["a", "b", "c"]);
        assert!(pipeline.remove_pass("b"));
        assert!(!pipeline.remove_pass("b"));
        assert_eq!(pipeline.len(), 2);
    }

    #[test]
    fn test_add_pass_rejects_unknown_dependency_and_duplicates() {
        let mut pipeline = Pipeline::new();
        assert!(pipeline.add_pass(Pass::transform("b", &["a"], Identity)).is_err());
        pipeline.add_pass(Pass::transform("a", &[], Identity)).unwrap();
        assert!(matches!(pipeline.add_pass(Pass::transform("a", &[], Identity)), Err(IrError::Pipeline(_))));
    }

    struct Broken;

    impl Transform for Broken {
        fn postorder(&mut self, _node: Node) -> IrResult<Node> {
            Err(IrError::Pipeline("boom".to_string()))
        }
    }

    #[test]
    fn test_failure_is_reported_and_aborts() {
        let mut pipeline = Pipeline::new();
        pipeline.add_pass(Pass::transform("broken", &[], Broken)).unwrap();
        let node: Node = Constant::new(SourceInfo::invalid(), 1).unwrap().into();
        let mut sink = DiagnosticCollector::new();
        assert!(pipeline.run(&node, &mut sink).is_err());
        assert_eq!(sink.error_count(), 1);
        let diagnostic = sink.iter().next().unwrap();
        assert_eq!(diagnostic.kind, DiagnosticKind::Internal);
        assert!(diagnostic.message.starts_with("broken: "));
    }
}
