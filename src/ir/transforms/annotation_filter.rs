//! Drops annotations from every annotation list in the tree.

use tracing::debug;

use crate::ir::annotations::Annotation;
use crate::ir::diagnostics::DiagnosticSink;
use crate::ir::error::IrResult;
use crate::ir::node::Node;
use crate::ir::visitor::Transform;

type Keep = Box<dyn Fn(&Annotation) -> bool + Send>;

/// Keeps the annotations accepted by a predicate. Lists where everything is
/// kept, and therefore their owners, are left untouched.
pub struct AnnotationFilter {
    keep: Keep,
    removed: usize,
}

impl AnnotationFilter {
    pub fn new(keep: impl Fn(&Annotation) -> bool + Send + 'static) -> Self {
        AnnotationFilter { keep: Box::new(keep), removed: 0 }
    }

    /// Removes every annotation whose name is in `names`.
    pub fn dropping<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        AnnotationFilter::new(move |a| !names.iter().any(|n| n == a.name()))
    }

    pub fn removed(&self) -> usize {
        self.removed
    }
}

impl Transform for AnnotationFilter {
    fn preorder(&mut self, node: &Node) -> IrResult<Option<Node>> {
        let Node::Annotations(annotations) = node else {
            return Ok(None);
        };
        let filtered = annotations.filter(|a| (self.keep)(a));
        self.removed += annotations.len() - filtered.len();
        Ok(Some(filtered.into()))
    }

    fn end_apply(&mut self, _sink: &mut dyn DiagnosticSink) {
        debug!("annotation filter removed {} annotation(s)", self.removed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::annotations::Annotations;
    use crate::ir::expressions::Constant;
    use crate::ir::identity::IdAllocator;
    use crate::ir::source_info::SourceInfo;
    use crate::ir::type_decls::{StructField, StructKind, TypeStruct};
    use crate::ir::types::TypeBits;
    use crate::ir::visitor::transform;

    fn field(ids: &IdAllocator, name: &str, annotations: &[&str]) -> Node {
        let ty: Node = TypeBits::bits(8).unwrap().into();
        let field = StructField::new(ids, name.into(), ty).unwrap();
        let one: Node = Constant::new(SourceInfo::invalid(), 1).unwrap().into();
        let list = Annotations::new(annotations.iter().map(|a| Annotation::single(a, one.clone()).unwrap()));
        Node::from(field).with_annotations(list).unwrap()
    }

    #[test]
    fn test_untouched_fields_stay_shared() {
        let ids = IdAllocator::new();
        let plain = field(&ids, "a", &["keep"]);
        let tagged = field(&ids, "b", &["hidden", "keep"]);
        let fields = [&plain, &tagged].into_iter().map(|f| f.to::<StructField>().unwrap().clone());
        let header: Node = TypeStruct::new(&ids, StructKind::Header, "h".into(), fields).unwrap().into();

        let mut filter = AnnotationFilter::dropping(["hidden"]);
        let result = transform(&header, &mut filter).unwrap();
        assert_eq!(filter.removed(), 1);

        let result = result.to::<TypeStruct>().unwrap();
        let a = result.get_field("a").unwrap();
        assert!(std::sync::Arc::ptr_eq(a, plain.to::<StructField>().unwrap()));
        let b = result.get_field("b").unwrap();
        assert!(b.annotations.contains("keep"));
        assert!(!b.annotations.contains("hidden"));
        // Identity survives the rewrite.
        assert_eq!(Node::from(b.clone()), tagged);
    }

    #[test]
    fn test_nothing_removed_returns_same_tree() {
        let ids = IdAllocator::new();
        let plain = field(&ids, "a", &["keep"]);
        let mut filter = AnnotationFilter::dropping(["hidden"]);
        let result = transform(&plain, &mut filter).unwrap();
        assert!(result.ptr_eq(&plain));
    }
}
