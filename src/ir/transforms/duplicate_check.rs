//! Reports declarations that collide inside an overload-permitting scope,
//! and annotation lists carrying more than one `@name`.

use tracing::debug;

use crate::ir::diagnostics::{DiagnosticCollector, DiagnosticSink};
use crate::ir::node::Node;
use crate::ir::visitor::Inspector;

#[derive(Debug, Default)]
pub struct DuplicateDeclarationCheck {
    pending: DiagnosticCollector,
    duplicates: usize,
    repeated_names: usize,
}

impl DuplicateDeclarationCheck {
    pub fn new() -> Self {
        Self::default()
    }

    /// Duplicate declarations found over every run so far.
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    /// Extra `@name` annotations found over every run so far.
    pub fn repeated_names(&self) -> usize {
        self.repeated_names
    }
}

impl Inspector for DuplicateDeclarationCheck {
    fn preorder(&mut self, node: &Node) -> bool {
        if let Some(namespace) = node.as_general_namespace() {
            self.duplicates += namespace.check_duplicate_declarations(&mut self.pending);
        }
        if let Node::Annotations(annotations) = node {
            self.repeated_names += annotations.check_control_plane_names(&mut self.pending);
            return false;
        }
        // Types carry no declarations worth checking.
        !node.is_type() || node.is_declaration()
    }

    fn end_apply(&mut self, sink: &mut dyn DiagnosticSink) {
        debug!(
            "duplicate check: {} duplicate(s), {} repeated @name",
            self.duplicates, self.repeated_names
        );
        self.pending.drain_into(sink);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::annotations::{Annotation, Annotations};
    use crate::ir::blocks::P4Program;
    use crate::ir::diagnostics::DiagnosticKind;
    use crate::ir::expressions::StringLiteral;
    use crate::ir::identity::IdAllocator;
    use crate::ir::source_info::SourceInfo;
    use crate::ir::type_decls::{StructKind, TypeStruct};
    use crate::ir::visitor::inspect;

    #[test]
    fn test_reports_program_level_duplicates() {
        let ids = IdAllocator::new();
        let first: Node = TypeStruct::new(&ids, StructKind::Struct, "h".into(), []).unwrap().into();
        let second: Node = TypeStruct::new(&ids, StructKind::Header, "h".into(), []).unwrap().into();
        let program: Node = P4Program::new([first, second]).unwrap().into();

        let mut check = DuplicateDeclarationCheck::new();
        inspect(&program, &mut check);
        let mut sink = DiagnosticCollector::new();
        check.end_apply(&mut sink);
        assert_eq!(check.duplicates(), 1);
        assert_eq!(sink.error_count(), 1);
        assert_eq!(sink.iter().next().unwrap().kind, DiagnosticKind::Duplicate);
    }

    #[test]
    fn test_warns_on_repeated_name_annotation() {
        let name = |s: &str| Annotation::single("name", StringLiteral::new(SourceInfo::invalid(), s).unwrap().into()).unwrap();
        let annotations: Node = Annotations::new([name("a"), name("b")]).into();
        let mut check = DuplicateDeclarationCheck::new();
        inspect(&annotations, &mut check);
        let mut sink = DiagnosticCollector::new();
        check.end_apply(&mut sink);
        assert_eq!(check.repeated_names(), 1);
        assert_eq!(sink.warning_count(), 1);
    }
}
