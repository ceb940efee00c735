//! Renames declarations and the paths that refer to them.

use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::ir::diagnostics::DiagnosticSink;
use crate::ir::error::IrResult;
use crate::ir::node::Node;
use crate::ir::visitor::Transform;

/// Maps current internal names to new ones. Original names are kept, so
/// user-facing output still shows the source spelling.
#[derive(Debug, Default)]
pub struct RenameDeclarations {
    renames: FxHashMap<String, String>,
    renamed: usize,
}

impl RenameDeclarations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rename(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.renames.insert(from.into(), to.into());
        self
    }

    /// Number of nodes rewritten so far.
    pub fn renamed(&self) -> usize {
        self.renamed
    }

    fn target(&self, name: &str) -> Option<&str> {
        self.renames.get(name).map(String::as_str)
    }
}

impl Transform for RenameDeclarations {
    fn postorder(&mut self, node: Node) -> IrResult<Node> {
        if let Node::Path(path) = &node {
            if let Some(to) = self.target(&path.name.name) {
                trace!("path {} -> {}", path.as_string(), to);
                let renamed = path.renamed(to)?;
                self.renamed += 1;
                return Ok(renamed.into());
            }
            return Ok(node);
        }
        // Parsers and controls take their name from their type, which was
        // renamed already.
        if matches!(node, Node::P4Parser(_) | Node::P4Control(_)) {
            return Ok(node);
        }
        let Some(to) = node.declared_name().and_then(|n| self.target(n)).map(str::to_owned) else {
            return Ok(node);
        };
        trace!("declaration {} -> {}", node, to);
        self.renamed += 1;
        node.with_name(&to)
    }

    fn end_apply(&mut self, _sink: &mut dyn DiagnosticSink) {
        debug!("renamed {} node(s)", self.renamed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::blocks::P4Program;
    use crate::ir::declarations::DeclarationConstant;
    use crate::ir::expressions::{Constant, PathExpression};
    use crate::ir::identity::IdAllocator;
    use crate::ir::source_info::SourceInfo;
    use crate::ir::types::TypeBits;
    use crate::ir::visitor::transform;

    #[test]
    fn test_renames_declaration_and_uses() {
        let ids = IdAllocator::new();
        let ty: Node = TypeBits::bits(8).unwrap().into();
        let one: Node = Constant::new(SourceInfo::invalid(), 1).unwrap().into();
        let x: Node = DeclarationConstant::new(&ids, "x".into(), ty.clone(), one).unwrap().into();
        let use_x: Node = PathExpression::named("x").unwrap().into();
        let y: Node = DeclarationConstant::new(&ids, "y".into(), ty, use_x).unwrap().into();
        let program: Node = P4Program::new([x.clone(), y]).unwrap().into();

        let mut pass = RenameDeclarations::new().rename("x", "x$1");
        let result = transform(&program, &mut pass).unwrap();
        assert_eq!(pass.renamed(), 2);

        let program = result.to::<P4Program>().unwrap();
        let new_x = program.objects.get(0).unwrap();
        assert_eq!(new_x.declared_name(), Some("x$1"));
        assert_eq!(new_x, &x);
        assert_eq!(new_x.name_id().unwrap().original_name, "x");

        let new_y = program.objects.get(1).unwrap().to::<DeclarationConstant>().unwrap();
        let Node::PathExpression(reference) = &new_y.initializer else { panic!("expected a path") };
        assert_eq!(reference.path.as_string(), "x$1");
        assert_eq!(reference.to_string(), "x");
    }
}
