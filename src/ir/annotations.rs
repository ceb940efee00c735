//! Annotations: ordered, named, expression-bearing metadata.
//!
//! An [`Annotations`] collection is immutable once shared. Its operations
//! return a new collection, or the receiver itself when the result would be
//! unchanged; only [`Annotations::push`] and [`Annotations::push_annotation`]
//! mutate, and they need exclusive access.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use tracing::warn;

use super::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink};
use super::error::IrResult;
use super::identity::Id;
use super::node::{Category, ChildMapper, ChildVisitor, IrNode, Node, NodeKind, NodeVector, TypedVector};
use super::source_info::SourceInfo;

/// Annotation names with compiler-recognized meaning. Stages match on the
/// literal keys; any other name is carried through uninterpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PredefinedAnnotation {
    /// `@name("...")`: control-plane name.
    Name,
    TableOnly,
    DefaultOnly,
    Atomic,
    /// Hidden from the control plane.
    Hidden,
    /// Legacy varbit length hint.
    Length,
}

impl PredefinedAnnotation {
    pub const ALL: [PredefinedAnnotation; 6] = [
        PredefinedAnnotation::Name,
        PredefinedAnnotation::TableOnly,
        PredefinedAnnotation::DefaultOnly,
        PredefinedAnnotation::Atomic,
        PredefinedAnnotation::Hidden,
        PredefinedAnnotation::Length,
    ];

    pub fn key(self) -> &'static str {
        match self {
            PredefinedAnnotation::Name => "name",
            PredefinedAnnotation::TableOnly => "tableonly",
            PredefinedAnnotation::DefaultOnly => "defaultonly",
            PredefinedAnnotation::Atomic => "atomic",
            PredefinedAnnotation::Hidden => "hidden",
            PredefinedAnnotation::Length => "length",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.key() == key)
    }
}

#[derive(Debug, Clone)]
pub struct Annotation {
    pub src_info: SourceInfo,
    pub name: Id,
    pub expressions: NodeVector,
}

impl Annotation {
    pub fn new(name: Id, expressions: impl IntoIterator<Item = Node>) -> IrResult<Arc<Self>> {
        Annotation::with_src(SourceInfo::invalid(), name, expressions)
    }

    /// Builds an annotation; an unset span covers the name and expressions.
    pub fn with_src(
        src_info: SourceInfo,
        name: Id,
        expressions: impl IntoIterator<Item = Node>,
    ) -> IrResult<Arc<Self>> {
        let expressions: NodeVector = expressions.into_iter().collect();
        let src_info = src_info.or_else(|| {
            expressions.iter().fold(name.src_info.clone(), |span, e| span.merge(e.src_info()))
        });
        Annotation { src_info, name, expressions }.finish()
    }

    /// `@name(expr)`.
    pub fn single(name: &str, expr: Node) -> IrResult<Arc<Self>> {
        Annotation::new(Id::new(name), [expr])
    }

    pub fn name(&self) -> &str {
        &self.name.name
    }

    pub fn predefined(&self) -> Option<PredefinedAnnotation> {
        PredefinedAnnotation::from_key(self.name())
    }

    /// The string argument of a well-formed `@name("...")`.
    pub fn control_plane_name(&self) -> Option<String> {
        if self.predefined() != Some(PredefinedAnnotation::Name) || self.expressions.len() != 1 {
            return None;
        }
        match self.expressions.first() {
            Some(Node::StringLiteral(s)) => Some(s.value.clone()),
            _ => None,
        }
    }
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.name)?;
        if self.expressions.is_empty() {
            return Ok(());
        }
        write!(f, "(")?;
        for (i, e) in self.expressions.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", e)?;
        }
        write!(f, ")")
    }
}

impl IrNode for Annotation {
    fn src_info(&self) -> &SourceInfo {
        &self.src_info
    }

    fn validate(&self) -> IrResult<()> {
        self.name.require_non_empty(NodeKind::Annotation)?;
        for e in self.expressions.iter() {
            Category::Expression.require(NodeKind::Annotation, "expressions", e)?;
        }
        Ok(())
    }

    fn visit_children(&self, v: &mut ChildVisitor<'_>) {
        v.vector(&self.expressions);
    }

    fn map_children(&self, m: &mut ChildMapper<'_>) -> IrResult<Option<Self>> {
        let expressions = m.vector(&self.expressions)?;
        Ok(m.changed().then(|| Annotation { expressions, ..self.clone() }))
    }
}

static EMPTY: Lazy<Arc<Annotations>> = Lazy::new(|| Arc::new(Annotations::default()));

/// Ordered annotation list. Order matters for rendering, not for lookup.
#[derive(Debug, Clone, Default)]
pub struct Annotations {
    pub src_info: SourceInfo,
    pub annotations: TypedVector<Annotation>,
}

impl Annotations {
    /// The shared empty collection.
    pub fn empty() -> Arc<Self> {
        Arc::clone(&EMPTY)
    }

    pub fn new(annotations: impl IntoIterator<Item = Arc<Annotation>>) -> Arc<Self> {
        let mut result = Annotations::default();
        for a in annotations {
            result.push(a);
        }
        Arc::new(result)
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Annotation>> {
        self.annotations.iter()
    }

    /// First annotation called `name`.
    pub fn get_single(&self, name: &str) -> Option<&Arc<Annotation>> {
        self.iter().find(|a| a.name() == name)
    }

    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Arc<Annotation>> + 'a {
        self.iter().filter(move |a| a.name() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get_single(name).is_some()
    }

    /// Appends in place. Only for a collection that is not shared yet.
    pub fn push(&mut self, annotation: Arc<Annotation>) {
        self.src_info = self.src_info.merge(&annotation.src_info);
        self.annotations.push_back_mut(annotation);
    }

    /// In-place `@name(expr)`.
    pub fn push_annotation(&mut self, name: &str, expr: Node) -> IrResult<()> {
        self.push(Annotation::single(name, expr)?);
        Ok(())
    }

    /// A copy with `annotation` appended; the span grows to cover it.
    pub fn add(self: &Arc<Self>, annotation: Arc<Annotation>) -> Arc<Self> {
        let mut copy = (**self).clone();
        copy.push(annotation);
        Arc::new(copy)
    }

    pub fn add_annotation(self: &Arc<Self>, name: &str, expr: Node) -> IrResult<Arc<Self>> {
        Ok(self.add(Annotation::single(name, expr)?))
    }

    /// Like [`Annotations::add_annotation`], but returns the receiver itself
    /// when an annotation called `name` already exists.
    pub fn add_annotation_if_new(self: &Arc<Self>, name: &str, expr: Node) -> IrResult<Arc<Self>> {
        if self.contains(name) {
            return Ok(Arc::clone(self));
        }
        self.add_annotation(name, expr)
    }

    /// Drops every annotation called `name`, then appends `@name(expr)`.
    /// Always returns a new collection.
    pub fn add_or_replace(self: &Arc<Self>, name: &str, expr: Node) -> IrResult<Arc<Self>> {
        let annotation = Annotation::single(name, expr)?;
        let mut copy = Annotations::default();
        for a in self.iter().filter(|a| a.name() != name) {
            copy.push(Arc::clone(a));
        }
        copy.src_info = copy.src_info.merge(&self.src_info);
        copy.push(annotation);
        Ok(Arc::new(copy))
    }

    /// Keeps the annotations accepted by `predicate`. Returns the receiver
    /// itself when every annotation is kept.
    pub fn filter(self: &Arc<Self>, mut predicate: impl FnMut(&Annotation) -> bool) -> Arc<Self> {
        let kept: TypedVector<Annotation> = self.iter().filter(|a| predicate(a)).cloned().collect();
        if kept.len() == self.len() {
            return Arc::clone(self);
        }
        Arc::new(Annotations { src_info: self.src_info.clone(), annotations: kept })
    }

    /// Warns when more than one `@name` is present. The collection itself
    /// accepts any number; callers are expected to keep at most one.
    pub fn check_control_plane_names(&self, sink: &mut dyn DiagnosticSink) -> usize {
        let key = PredefinedAnnotation::Name.key();
        let extra: Vec<_> = self.get_all(key).skip(1).collect();
        for a in &extra {
            warn!("repeated @{} annotation at {}", key, a.src_info);
            sink.report(Diagnostic::warning(
                DiagnosticKind::Convention,
                a.src_info.clone(),
                format!("{}: more than one @{} annotation", a, key),
            ));
        }
        extra.len()
    }
}

impl fmt::Display for Annotations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, a) in self.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", a)?;
        }
        Ok(())
    }
}

impl IrNode for Annotations {
    fn src_info(&self) -> &SourceInfo {
        &self.src_info
    }

    fn validate(&self) -> IrResult<()> {
        Ok(())
    }

    fn dbprint_label(&self) -> String {
        format!("[{}]", self.len())
    }

    fn visit_children(&self, v: &mut ChildVisitor<'_>) {
        v.typed_vector(&self.annotations);
    }

    fn map_children(&self, m: &mut ChildMapper<'_>) -> IrResult<Option<Self>> {
        let annotations = m.typed_vector(&self.annotations)?;
        Ok(m.changed().then(|| Annotations { annotations, src_info: self.src_info.clone() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::diagnostics::{DiagnosticCollector, Severity};
    use crate::ir::error::IrError;
    use crate::ir::expressions::{Constant, StringLiteral};

    fn num(v: i128) -> Node {
        Constant::new(SourceInfo::invalid(), v).unwrap().into()
    }

    fn sample() -> Arc<Annotations> {
        Annotations::new([
            Annotation::single("a", num(1)).unwrap(),
            Annotation::single("b", num(2)).unwrap(),
            Annotation::single("a", num(3)).unwrap(),
        ])
    }

    #[test]
    fn test_filter_keeping_everything_returns_receiver() {
        let annotations = sample();
        let same = annotations.filter(|_| true);
        assert!(Arc::ptr_eq(&annotations, &same));
    }

    #[test]
    fn test_filter_dropping_returns_subset_in_order() {
        let annotations = sample();
        let filtered = annotations.filter(|a| a.name() == "a");
        assert!(!Arc::ptr_eq(&annotations, &filtered));
        let rendered: Vec<_> = filtered.iter().map(|a| a.to_string()).collect();
        assert_eq!(rendered, vec!["@a(1)", "@a(3)"]);
        assert_eq!(annotations.len(), 3);
    }

    #[test]
    fn test_add_annotation_if_new_is_noop_when_present() {
        let annotations = sample();
        let same = annotations.add_annotation_if_new("b", num(9)).unwrap();
        assert!(Arc::ptr_eq(&annotations, &same));
        let added = annotations.add_annotation_if_new("c", num(9)).unwrap();
        assert_eq!(added.len(), 4);
    }

    #[test]
    fn test_add_or_replace_leaves_exactly_one() {
        let annotations = sample();
        let replaced = annotations.add_or_replace("a", num(7)).unwrap();
        let all: Vec<_> = replaced.get_all("a").collect();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].to_string(), "@a(7)");
        assert_eq!(replaced.len(), 2);
    }

    #[test]
    fn test_add_or_replace_always_clones() {
        let annotations = Annotations::empty();
        let replaced = annotations.add_or_replace("x", num(1)).unwrap();
        assert!(!Arc::ptr_eq(&annotations, &replaced));
        assert!(Annotations::empty().is_empty());
    }

    #[test]
    fn test_get_single_returns_first_match() {
        let annotations = sample();
        assert_eq!(annotations.get_single("a").unwrap().to_string(), "@a(1)");
        assert!(annotations.get_single("zzz").is_none());
    }

    #[test]
    fn test_add_extends_span() {
        let first = Annotation::with_src(SourceInfo::on_line("a.p4", 1, 0, 4), Id::new("a"), []).unwrap();
        let second = Annotation::with_src(SourceInfo::on_line("a.p4", 3, 0, 4), Id::new("b"), []).unwrap();
        let annotations = Annotations::new([first]).add(second);
        assert_eq!(annotations.src_info.start().line, 1);
        assert_eq!(annotations.src_info.end().line, 3);
    }

    #[test]
    fn test_empty_name_rejected() {
        let err = Annotation::new(Id::new(""), []).unwrap_err();
        assert!(matches!(err, IrError::EmptyName { kind: NodeKind::Annotation, .. }));
    }

    #[test]
    fn test_control_plane_name() {
        let lit = StringLiteral::new(SourceInfo::invalid(), "ingress.t").unwrap();
        let a = Annotation::single("name", lit.into()).unwrap();
        assert_eq!(a.predefined(), Some(PredefinedAnnotation::Name));
        assert_eq!(a.control_plane_name().as_deref(), Some("ingress.t"));
        assert_eq!(Annotation::single("name", num(1)).unwrap().control_plane_name(), None);
    }

    #[test]
    fn test_second_control_plane_name_warns() {
        let lit = |s: &str| -> Node { StringLiteral::new(SourceInfo::invalid(), s).unwrap().into() };
        let mut annotations = Annotations::default();
        annotations.push_annotation("name", lit("x")).unwrap();
        annotations.push_annotation("name", lit("y")).unwrap();
        let mut sink = DiagnosticCollector::new();
        assert_eq!(annotations.check_control_plane_names(&mut sink), 1);
        assert_eq!(sink.iter().next().unwrap().severity, Severity::Warning);
    }

    #[test]
    fn test_unknown_names_pass_through() {
        let a = Annotation::single("my_vendor_hint", num(1)).unwrap();
        assert_eq!(a.predefined(), None);
        assert_eq!(PredefinedAnnotation::from_key("tableonly"), Some(PredefinedAnnotation::TableOnly));
    }
}
