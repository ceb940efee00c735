//! Top-level program blocks: parsers, controls, tables and the program.

use std::fmt;
use std::sync::Arc;

use super::annotations::Annotations;
use super::capability::{
    APPLY_METHOD_NAME, Annotated, Container, Declaration, GeneralNamespace, HasApply, MayBeGeneric, Namespace, SimpleNamespace, Type,
    check_unique_names, control_plane_name, impl_declaration,
};
use super::error::{IrError, IrResult};
use super::identity::{DeclId, DeclInfo, Id, IdAllocator};
use super::node::{Category, ChildMapper, ChildVisitor, IrNode, Node, NodeKind, NodeVector, TypedVector};
use super::parameters::{ParameterList, TypeParameters};
use super::source_info::SourceInfo;
use super::statements::BlockStatement;
use super::type_decls::{StructField, StructKind, TypeControl, TypeParser, TypeStruct};
use super::types::{TypeBoolean, TypeMethod, TypeName};

pub const START_STATE: &str = "start";
pub const ACCEPT_STATE: &str = "accept";
pub const REJECT_STATE: &str = "reject";

/// Defines a parser or control implementation. Both take their name and
/// annotations from their type, add constructor parameters and locals, and
/// form one strict namespace over every name they bring into scope.
macro_rules! block_impl {
    ($ty:ident) => {
        impl Declaration for $ty {
            fn name(&self) -> &Id {
                &self.ty.decl.name
            }

            fn decl_id(&self) -> DeclId {
                self.decl_id
            }

            fn external_name(&self) -> String {
                control_plane_name(&self.ty.annotations).unwrap_or_else(|| self.ty.decl.name.original_name.clone())
            }
        }

        impl Annotated for $ty {
            fn annotations(&self) -> &Arc<Annotations> {
                &self.ty.annotations
            }
        }

        impl Type for $ty {}

        impl MayBeGeneric for $ty {
            fn type_parameters(&self) -> &Arc<TypeParameters> {
                &self.ty.type_parameters
            }
        }

        impl HasApply for $ty {
            fn apply_parameters(&self) -> Arc<ParameterList> {
                Arc::clone(&self.ty.apply_params)
            }

            fn apply_method_type(&self) -> IrResult<Arc<TypeMethod>> {
                self.ty.apply_method_type()
            }
        }

        impl Container for $ty {
            fn constructor_parameters(&self) -> &Arc<ParameterList> {
                &self.constructor_params
            }

            /// `Name<T>(ctor params)`, returning the block's own type.
            fn constructor_method_type(&self) -> IrResult<Arc<TypeMethod>> {
                let ret: Node = TypeName::referring_to(self.name())?.into();
                TypeMethod::new(
                    self.ty.type_parameters.clone(),
                    Some(ret),
                    self.constructor_params.clone(),
                    Some(self.name().clone()),
                )
            }
        }

        impl $ty {
            /// Same block under a new internal name; the type is renamed
            /// along with it.
            pub fn with_name(&self, name: &str) -> IrResult<Arc<Self>> {
                let mut copy = self.clone();
                copy.ty = self.ty.with_name(name)?;
                copy.finish()
            }

            pub fn with_annotations(&self, annotations: Arc<Annotations>) -> IrResult<Arc<Self>> {
                let mut copy = self.clone();
                copy.ty = self.ty.with_annotations(annotations)?;
                copy.finish()
            }

            fn scope_names(&self) -> impl Iterator<Item = (&Id, &SourceInfo)> {
                self.ty
                    .type_parameters
                    .iter()
                    .map(|p| (p.name(), &p.src_info))
                    .chain(self.ty.apply_params.iter().map(|p| (p.name(), &p.src_info)))
                    .chain(self.constructor_params.iter().map(|p| (p.name(), &p.src_info)))
                    .chain(self.locals.iter().filter_map(|l| l.as_declaration().map(|d| (d.name(), l.src_info()))))
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.ty.decl.name)
            }
        }
    };
}

#[derive(Debug, Clone)]
pub struct ParserState {
    pub src_info: SourceInfo,
    pub decl: DeclInfo,
    pub annotations: Arc<Annotations>,
    pub components: NodeVector,
    /// Absent for `accept` and `reject`.
    pub select_expression: Option<Node>,
}

impl ParserState {
    pub fn new(
        ids: &IdAllocator,
        name: Id,
        components: impl IntoIterator<Item = Node>,
        select_expression: Option<Node>,
    ) -> IrResult<Arc<Self>> {
        let decl = DeclInfo::new(ids, name, NodeKind::ParserState)?;
        ParserState {
            src_info: decl.name.src_info.clone(),
            decl,
            annotations: Annotations::empty(),
            components: components.into_iter().collect(),
            select_expression,
        }
        .finish()
    }

    pub fn is_built_in(&self) -> bool {
        matches!(self.decl.name.name.as_str(), ACCEPT_STATE | REJECT_STATE)
    }
}

impl_declaration!(ParserState, annotated);

impl fmt::Display for ParserState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.decl.name)
    }
}

impl IrNode for ParserState {
    fn src_info(&self) -> &SourceInfo {
        &self.src_info
    }

    fn validate(&self) -> IrResult<()> {
        self.decl.name.require_non_empty(NodeKind::ParserState)?;
        for c in self.components.iter() {
            Category::StatementOrDeclaration.require(NodeKind::ParserState, "components", c)?;
        }
        if let Some(select) = &self.select_expression {
            Category::Expression.require(NodeKind::ParserState, "select_expression", select)?;
        }
        Ok(())
    }

    fn dbprint_label(&self) -> String {
        format!("state {}/{}", self.decl.name.name, self.decl.decl_id)
    }

    fn visit_children(&self, v: &mut ChildVisitor<'_>) {
        v.typed(&self.annotations);
        v.vector(&self.components);
        v.optional(&self.select_expression);
    }

    fn map_children(&self, m: &mut ChildMapper<'_>) -> IrResult<Option<Self>> {
        let annotations = m.typed(&self.annotations)?;
        let components = m.vector(&self.components)?;
        let select_expression = m.optional(&self.select_expression)?;
        Ok(m.changed().then(|| ParserState { annotations, components, select_expression, ..self.clone() }))
    }
}

#[derive(Debug, Clone)]
pub struct P4Parser {
    pub src_info: SourceInfo,
    pub decl_id: DeclId,
    pub ty: Arc<TypeParser>,
    pub constructor_params: Arc<ParameterList>,
    pub locals: NodeVector,
    pub states: TypedVector<ParserState>,
}

impl P4Parser {
    pub fn new(
        ids: &IdAllocator,
        ty: Arc<TypeParser>,
        constructor_params: Arc<ParameterList>,
        locals: impl IntoIterator<Item = Node>,
        states: impl IntoIterator<Item = Arc<ParserState>>,
    ) -> IrResult<Arc<Self>> {
        P4Parser {
            src_info: ty.src_info.clone(),
            decl_id: ids.fresh(),
            ty,
            constructor_params,
            locals: locals.into_iter().collect(),
            states: states.into_iter().collect(),
        }
        .finish()
    }

    pub fn get_state(&self, name: &str) -> Option<&Arc<ParserState>> {
        self.states.iter().find(|s| s.decl.name.name == name)
    }
}

block_impl!(P4Parser);

impl Namespace for P4Parser {
    fn declarations(&self) -> Box<dyn Iterator<Item = Node> + '_> {
        Box::new(
            self.ty
                .type_parameters
                .declarations()
                .chain(self.ty.apply_params.declarations())
                .chain(self.constructor_params.declarations())
                .chain(self.locals.iter().filter(|l| l.as_declaration().is_some()).cloned())
                .chain(self.states.iter().map(|s| Node::from(Arc::clone(s)))),
        )
    }
}

impl SimpleNamespace for P4Parser {}

impl IrNode for P4Parser {
    fn src_info(&self) -> &SourceInfo {
        &self.src_info
    }

    fn validate(&self) -> IrResult<()> {
        for l in self.locals.iter() {
            Category::Declaration.require(NodeKind::P4Parser, "locals", l)?;
        }
        check_unique_names(
            NodeKind::P4Parser,
            self.scope_names().chain(self.states.iter().map(|s| (s.name(), &s.src_info))),
        )
    }

    fn dbprint_label(&self) -> String {
        format!("parser {}/{}", self.ty.decl.name.name, self.decl_id)
    }

    fn visit_children(&self, v: &mut ChildVisitor<'_>) {
        v.typed(&self.ty);
        v.typed(&self.constructor_params);
        v.vector(&self.locals);
        v.typed_vector(&self.states);
    }

    fn map_children(&self, m: &mut ChildMapper<'_>) -> IrResult<Option<Self>> {
        let ty = m.typed(&self.ty)?;
        let constructor_params = m.typed(&self.constructor_params)?;
        let locals = m.vector(&self.locals)?;
        let states = m.typed_vector(&self.states)?;
        Ok(m.changed().then(|| P4Parser { ty, constructor_params, locals, states, ..self.clone() }))
    }
}

#[derive(Debug, Clone)]
pub struct P4Control {
    pub src_info: SourceInfo,
    pub decl_id: DeclId,
    pub ty: Arc<TypeControl>,
    pub constructor_params: Arc<ParameterList>,
    pub locals: NodeVector,
    pub body: Arc<BlockStatement>,
}

impl P4Control {
    pub fn new(
        ids: &IdAllocator,
        ty: Arc<TypeControl>,
        constructor_params: Arc<ParameterList>,
        locals: impl IntoIterator<Item = Node>,
        body: Arc<BlockStatement>,
    ) -> IrResult<Arc<Self>> {
        P4Control {
            src_info: ty.src_info.clone(),
            decl_id: ids.fresh(),
            ty,
            constructor_params,
            locals: locals.into_iter().collect(),
            body,
        }
        .finish()
    }
}

block_impl!(P4Control);

impl Namespace for P4Control {
    fn declarations(&self) -> Box<dyn Iterator<Item = Node> + '_> {
        Box::new(
            self.ty
                .type_parameters
                .declarations()
                .chain(self.ty.apply_params.declarations())
                .chain(self.constructor_params.declarations())
                .chain(self.locals.iter().filter(|l| l.as_declaration().is_some()).cloned()),
        )
    }
}

impl SimpleNamespace for P4Control {}

impl IrNode for P4Control {
    fn src_info(&self) -> &SourceInfo {
        &self.src_info
    }

    fn validate(&self) -> IrResult<()> {
        for l in self.locals.iter() {
            Category::Declaration.require(NodeKind::P4Control, "locals", l)?;
        }
        check_unique_names(NodeKind::P4Control, self.scope_names())
    }

    fn dbprint_label(&self) -> String {
        format!("control {}/{}", self.ty.decl.name.name, self.decl_id)
    }

    fn visit_children(&self, v: &mut ChildVisitor<'_>) {
        v.typed(&self.ty);
        v.typed(&self.constructor_params);
        v.vector(&self.locals);
        v.typed(&self.body);
    }

    fn map_children(&self, m: &mut ChildMapper<'_>) -> IrResult<Option<Self>> {
        let ty = m.typed(&self.ty)?;
        let constructor_params = m.typed(&self.constructor_params)?;
        let locals = m.vector(&self.locals)?;
        let body = m.typed(&self.body)?;
        Ok(m.changed().then(|| P4Control { ty, constructor_params, locals, body, ..self.clone() }))
    }
}

/// A match-action table. `apply()` returns a struct telling whether the
/// lookup hit or missed.
#[derive(Debug, Clone)]
pub struct P4Table {
    pub src_info: SourceInfo,
    pub decl: DeclInfo,
    pub annotations: Arc<Annotations>,
    /// Each entry names an action, optionally with bound arguments.
    pub actions: NodeVector,
    pub default_action: Option<Node>,
    pub apply_result: Arc<TypeStruct>,
}

impl P4Table {
    pub fn new(
        ids: &IdAllocator,
        name: Id,
        actions: impl IntoIterator<Item = Node>,
        default_action: Option<Node>,
    ) -> IrResult<Arc<Self>> {
        let decl = DeclInfo::new(ids, name, NodeKind::P4Table)?;
        let apply_result = Self::apply_result_type(ids, &decl.name)?;
        P4Table {
            src_info: decl.name.src_info.clone(),
            decl,
            annotations: Annotations::empty(),
            actions: actions.into_iter().collect(),
            default_action,
            apply_result,
        }
        .finish()
    }

    fn apply_result_type(ids: &IdAllocator, table: &Id) -> IrResult<Arc<TypeStruct>> {
        let hit = StructField::new(ids, Id::new("hit"), TypeBoolean::get())?;
        let miss = StructField::new(ids, Id::new("miss"), TypeBoolean::get())?;
        let name = Id::with_src(table.src_info.clone(), Self::apply_result_name(&table.name));
        TypeStruct::new(ids, StructKind::Struct, name, [hit, miss])
    }

    fn apply_result_name(table: &str) -> String {
        format!("{}_apply_result", table)
    }

    /// Same table under a new internal name. The apply result struct is
    /// renamed along with it and keeps its identity.
    pub fn with_name(&self, name: &str) -> IrResult<Arc<Self>> {
        let mut copy = self.clone();
        copy.decl = self.decl.renamed(name);
        copy.apply_result = self.apply_result.with_name(&Self::apply_result_name(name))?;
        copy.finish()
    }

    /// Names of the listed actions, as written.
    pub fn action_names(&self) -> impl Iterator<Item = String> + '_ {
        self.actions.iter().filter_map(|a| match a {
            Node::PathExpression(p) => Some(p.path.to_string()),
            Node::MethodCallExpression(c) => Some(c.method.to_string()),
            _ => None,
        })
    }
}

impl_declaration!(P4Table, annotated, own_rename);

impl HasApply for P4Table {
    fn apply_parameters(&self) -> Arc<ParameterList> {
        ParameterList::empty()
    }

    fn apply_method_type(&self) -> IrResult<Arc<TypeMethod>> {
        let ret: Node = TypeName::referring_to(&self.apply_result.decl.name)?.into();
        TypeMethod::new(TypeParameters::empty(), Some(ret), self.apply_parameters(), Some(Id::new(APPLY_METHOD_NAME)))
    }
}

impl fmt::Display for P4Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.decl.name)
    }
}

impl IrNode for P4Table {
    fn src_info(&self) -> &SourceInfo {
        &self.src_info
    }

    fn validate(&self) -> IrResult<()> {
        self.decl.name.require_non_empty(NodeKind::P4Table)?;
        for a in self.actions.iter().chain(self.default_action.iter()) {
            if !matches!(a, Node::PathExpression(_) | Node::MethodCallExpression(_)) {
                return Err(IrError::UnexpectedChild {
                    parent: NodeKind::P4Table,
                    field: "actions",
                    expected: "action reference",
                    found: a.kind(),
                });
            }
        }
        Ok(())
    }

    fn dbprint_label(&self) -> String {
        format!("table {}/{}", self.decl.name.name, self.decl.decl_id)
    }

    fn visit_children(&self, v: &mut ChildVisitor<'_>) {
        v.typed(&self.annotations);
        v.vector(&self.actions);
        v.optional(&self.default_action);
    }

    fn map_children(&self, m: &mut ChildMapper<'_>) -> IrResult<Option<Self>> {
        let annotations = m.typed(&self.annotations)?;
        let actions = m.vector(&self.actions)?;
        let default_action = m.optional(&self.default_action)?;
        Ok(m.changed().then(|| P4Table { annotations, actions, default_action, ..self.clone() }))
    }
}

/// The whole program: a general namespace of top-level declarations.
#[derive(Debug, Clone)]
pub struct P4Program {
    pub src_info: SourceInfo,
    pub objects: NodeVector,
}

impl P4Program {
    pub fn new(objects: impl IntoIterator<Item = Node>) -> IrResult<Arc<Self>> {
        let objects: NodeVector = objects.into_iter().collect();
        let src_info = objects.iter().fold(SourceInfo::invalid(), |s, o| s.merge(o.src_info()));
        P4Program { src_info, objects }.finish()
    }
}

impl Namespace for P4Program {
    fn declarations(&self) -> Box<dyn Iterator<Item = Node> + '_> {
        Box::new(self.objects.iter().cloned())
    }
}

impl GeneralNamespace for P4Program {}

impl fmt::Display for P4Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "program")
    }
}

impl IrNode for P4Program {
    fn src_info(&self) -> &SourceInfo {
        &self.src_info
    }

    fn validate(&self) -> IrResult<()> {
        for o in self.objects.iter() {
            Category::Declaration.require(NodeKind::P4Program, "objects", o)?;
        }
        Ok(())
    }

    fn dbprint_label(&self) -> String {
        format!("[{}]", self.objects.len())
    }

    fn visit_children(&self, v: &mut ChildVisitor<'_>) {
        v.vector(&self.objects);
    }

    fn map_children(&self, m: &mut ChildMapper<'_>) -> IrResult<Option<Self>> {
        let objects = m.vector(&self.objects)?;
        Ok(m.changed().then(|| P4Program { objects, ..self.clone() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::declarations::{DeclarationVariable, P4Action};
    use crate::ir::diagnostics::DiagnosticCollector;
    use crate::ir::error::IrError;
    use crate::ir::expressions::PathExpression;
    use crate::ir::parameters::{Direction, Parameter};
    use crate::ir::types::TypeBits;

    fn bits(n: u32) -> Node {
        TypeBits::bits(n).unwrap().into()
    }

    fn control(ids: &IdAllocator, locals: Vec<Node>) -> IrResult<Arc<P4Control>> {
        let hdr = Parameter::new(ids, Id::new("hdr"), Direction::InOut, bits(8), None)?;
        let ty = TypeControl::new(ids, Id::new("Ingress"), TypeParameters::empty(), ParameterList::new([hdr])?)?;
        P4Control::new(ids, ty, ParameterList::empty(), locals, BlockStatement::empty()?)
    }

    #[test]
    fn test_control_name_comes_from_type() {
        let ids = IdAllocator::new();
        let c = control(&ids, vec![]).unwrap();
        assert_eq!(c.name().name, "Ingress");
        assert_ne!(c.decl_id(), c.ty.decl.decl_id);
        assert_eq!(c.apply_method_type().unwrap().to_string(), "void apply(inout bit<8> hdr)");
        assert_eq!(c.constructor_method_type().unwrap().to_string(), "Ingress Ingress()");
    }

    #[test]
    fn test_local_clashing_with_apply_parameter() {
        let ids = IdAllocator::new();
        let v: Node = DeclarationVariable::new(&ids, Id::new("hdr"), bits(8), None).unwrap().into();
        let err = control(&ids, vec![v]).unwrap_err();
        assert!(matches!(err, IrError::DuplicateDeclaration { kind: NodeKind::P4Control, .. }));
    }

    #[test]
    fn test_control_namespace_lookup() {
        let ids = IdAllocator::new();
        let v: Node = DeclarationVariable::new(&ids, Id::new("tmp"), bits(8), None).unwrap().into();
        let c = control(&ids, vec![v]).unwrap();
        assert_eq!(c.get_decl_by_name("tmp").unwrap().kind(), NodeKind::DeclarationVariable);
        assert_eq!(c.get_decl_by_name("hdr").unwrap().kind(), NodeKind::Parameter);
    }

    #[test]
    fn test_table_apply_result() {
        let ids = IdAllocator::new();
        let a: Node = PathExpression::named("drop").unwrap().into();
        let t = P4Table::new(&ids, Id::new("fwd"), [a.clone()], Some(a)).unwrap();
        assert!(t.apply_result.get_field("hit").is_some());
        assert!(t.apply_result.get_field("miss").is_some());
        assert_eq!(t.apply_method_type().unwrap().to_string(), "fwd_apply_result apply()");
        assert_eq!(t.action_names().collect::<Vec<_>>(), vec!["drop"]);
    }

    #[test]
    fn test_renamed_table_renames_apply_result() {
        let ids = IdAllocator::new();
        let a: Node = PathExpression::named("drop").unwrap().into();
        let t = P4Table::new(&ids, Id::new("fwd"), [a], None).unwrap();
        let renamed = t.with_name("fwd$1").unwrap();
        assert_eq!(renamed.decl_id(), t.decl_id());
        assert_eq!(renamed.name().original_name, "fwd");
        assert_eq!(renamed.apply_result.decl.decl_id, t.apply_result.decl.decl_id);
        assert_eq!(renamed.apply_method_type().unwrap().to_string(), "fwd$1_apply_result apply()");

        let node: Node = t.clone().into();
        let table = node.with_name("ipv4_lpm").unwrap();
        let table = table.to::<P4Table>().unwrap();
        assert_eq!(table.apply_result.decl.name.name, "ipv4_lpm_apply_result");
    }

    #[test]
    fn test_table_rejects_non_action_entries() {
        let ids = IdAllocator::new();
        assert!(P4Table::new(&ids, Id::new("t"), [bits(8)], None).is_err());
    }

    #[test]
    fn test_program_duplicates_are_diagnosed_not_rejected() {
        let ids = IdAllocator::new();
        let action = |name: &str| -> Node {
            P4Action::new(&ids, Id::new(name), ParameterList::empty(), BlockStatement::empty().unwrap())
                .unwrap()
                .into()
        };
        let program = P4Program::new([action("a"), action("b"), action("a")]).unwrap();
        assert_eq!(program.get_decls_by_name("a").count(), 2);
        let mut sink = DiagnosticCollector::new();
        assert_eq!(program.check_duplicate_declarations(&mut sink), 1);
    }
}
