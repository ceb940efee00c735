use std::fmt;
use std::sync::Arc;

use super::annotations::Annotations;
use super::capability::{Instance, Namespace, SimpleNamespace, impl_declaration};
use super::error::IrResult;
use super::identity::{DeclInfo, Id, IdAllocator};
use super::node::{Category, ChildMapper, ChildVisitor, IrNode, Node, NodeKind, NodeVector};
use super::parameters::ParameterList;
use super::source_info::SourceInfo;
use super::statements::BlockStatement;

#[derive(Debug, Clone)]
pub struct DeclarationVariable {
    pub src_info: SourceInfo,
    pub decl: DeclInfo,
    pub annotations: Arc<Annotations>,
    pub ty: Node,
    pub initializer: Option<Node>,
}

impl DeclarationVariable {
    pub fn new(ids: &IdAllocator, name: Id, ty: Node, initializer: Option<Node>) -> IrResult<Arc<Self>> {
        let decl = DeclInfo::new(ids, name, NodeKind::DeclarationVariable)?;
        DeclarationVariable {
            src_info: decl.name.src_info.clone(),
            decl,
            annotations: Annotations::empty(),
            ty,
            initializer,
        }
        .finish()
    }
}

impl_declaration!(DeclarationVariable, annotated);

impl fmt::Display for DeclarationVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.decl.name)
    }
}

impl IrNode for DeclarationVariable {
    fn src_info(&self) -> &SourceInfo {
        &self.src_info
    }

    fn validate(&self) -> IrResult<()> {
        self.decl.name.require_non_empty(NodeKind::DeclarationVariable)?;
        Category::Type.require(NodeKind::DeclarationVariable, "ty", &self.ty)?;
        if let Some(init) = &self.initializer {
            Category::Expression.require(NodeKind::DeclarationVariable, "initializer", init)?;
        }
        Ok(())
    }

    fn dbprint_label(&self) -> String {
        format!("{} {}/{}", self.ty, self.decl.name.name, self.decl.decl_id)
    }

    fn visit_children(&self, v: &mut ChildVisitor<'_>) {
        v.typed(&self.annotations);
        v.node(&self.ty);
        v.optional(&self.initializer);
    }

    fn map_children(&self, m: &mut ChildMapper<'_>) -> IrResult<Option<Self>> {
        let annotations = m.typed(&self.annotations)?;
        let ty = m.node(&self.ty)?;
        let initializer = m.optional(&self.initializer)?;
        Ok(m.changed().then(|| DeclarationVariable { annotations, ty, initializer, ..self.clone() }))
    }
}

#[derive(Debug, Clone)]
pub struct DeclarationConstant {
    pub src_info: SourceInfo,
    pub decl: DeclInfo,
    pub annotations: Arc<Annotations>,
    pub ty: Node,
    pub initializer: Node,
}

impl DeclarationConstant {
    pub fn new(ids: &IdAllocator, name: Id, ty: Node, initializer: Node) -> IrResult<Arc<Self>> {
        let decl = DeclInfo::new(ids, name, NodeKind::DeclarationConstant)?;
        DeclarationConstant {
            src_info: decl.name.src_info.clone(),
            decl,
            annotations: Annotations::empty(),
            ty,
            initializer,
        }
        .finish()
    }
}

impl_declaration!(DeclarationConstant, annotated);

impl fmt::Display for DeclarationConstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.decl.name)
    }
}

impl IrNode for DeclarationConstant {
    fn src_info(&self) -> &SourceInfo {
        &self.src_info
    }

    fn validate(&self) -> IrResult<()> {
        self.decl.name.require_non_empty(NodeKind::DeclarationConstant)?;
        Category::Type.require(NodeKind::DeclarationConstant, "ty", &self.ty)?;
        Category::Expression.require(NodeKind::DeclarationConstant, "initializer", &self.initializer)
    }

    fn dbprint_label(&self) -> String {
        format!("const {} {}/{} = {}", self.ty, self.decl.name.name, self.decl.decl_id, self.initializer)
    }

    fn visit_children(&self, v: &mut ChildVisitor<'_>) {
        v.typed(&self.annotations);
        v.node(&self.ty);
        v.node(&self.initializer);
    }

    fn map_children(&self, m: &mut ChildMapper<'_>) -> IrResult<Option<Self>> {
        let annotations = m.typed(&self.annotations)?;
        let ty = m.node(&self.ty)?;
        let initializer = m.node(&self.initializer)?;
        Ok(m.changed().then(|| DeclarationConstant { annotations, ty, initializer, ..self.clone() }))
    }
}

/// Instantiation of an extern, parser or control: `Register<bit<8>>(16) r;`
#[derive(Debug, Clone)]
pub struct DeclarationInstance {
    pub src_info: SourceInfo,
    pub decl: DeclInfo,
    pub annotations: Arc<Annotations>,
    pub ty: Node,
    pub arguments: NodeVector,
}

impl DeclarationInstance {
    pub fn new(
        ids: &IdAllocator,
        name: Id,
        ty: Node,
        arguments: impl IntoIterator<Item = Node>,
    ) -> IrResult<Arc<Self>> {
        let decl = DeclInfo::new(ids, name, NodeKind::DeclarationInstance)?;
        DeclarationInstance {
            src_info: decl.name.src_info.clone(),
            decl,
            annotations: Annotations::empty(),
            ty,
            arguments: arguments.into_iter().collect(),
        }
        .finish()
    }
}

impl_declaration!(DeclarationInstance, annotated);

impl Instance for DeclarationInstance {
    fn instance_name(&self) -> &Id {
        &self.decl.name
    }

    fn instance_type(&self) -> &Node {
        &self.ty
    }
}

impl fmt::Display for DeclarationInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.decl.name)
    }
}

impl IrNode for DeclarationInstance {
    fn src_info(&self) -> &SourceInfo {
        &self.src_info
    }

    fn validate(&self) -> IrResult<()> {
        self.decl.name.require_non_empty(NodeKind::DeclarationInstance)?;
        Category::Type.require(NodeKind::DeclarationInstance, "ty", &self.ty)?;
        for a in self.arguments.iter() {
            Category::Expression.require(NodeKind::DeclarationInstance, "arguments", a)?;
        }
        Ok(())
    }

    fn dbprint_label(&self) -> String {
        format!("{} {}/{}", self.ty, self.decl.name.name, self.decl.decl_id)
    }

    fn visit_children(&self, v: &mut ChildVisitor<'_>) {
        v.typed(&self.annotations);
        v.node(&self.ty);
        v.vector(&self.arguments);
    }

    fn map_children(&self, m: &mut ChildMapper<'_>) -> IrResult<Option<Self>> {
        let annotations = m.typed(&self.annotations)?;
        let ty = m.node(&self.ty)?;
        let arguments = m.vector(&self.arguments)?;
        Ok(m.changed().then(|| DeclarationInstance { annotations, ty, arguments, ..self.clone() }))
    }
}

/// An action: parameters in scope of a body.
#[derive(Debug, Clone)]
pub struct P4Action {
    pub src_info: SourceInfo,
    pub decl: DeclInfo,
    pub annotations: Arc<Annotations>,
    pub parameters: Arc<ParameterList>,
    pub body: Arc<BlockStatement>,
}

impl P4Action {
    pub fn new(
        ids: &IdAllocator,
        name: Id,
        parameters: Arc<ParameterList>,
        body: Arc<BlockStatement>,
    ) -> IrResult<Arc<Self>> {
        let decl = DeclInfo::new(ids, name, NodeKind::P4Action)?;
        P4Action {
            src_info: decl.name.src_info.clone(),
            decl,
            annotations: Annotations::empty(),
            parameters,
            body,
        }
        .finish()
    }
}

impl_declaration!(P4Action, annotated);

impl Namespace for P4Action {
    fn declarations(&self) -> Box<dyn Iterator<Item = Node> + '_> {
        self.parameters.declarations()
    }
}

impl SimpleNamespace for P4Action {}

impl fmt::Display for P4Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.decl.name)
    }
}

impl IrNode for P4Action {
    fn src_info(&self) -> &SourceInfo {
        &self.src_info
    }

    fn validate(&self) -> IrResult<()> {
        self.decl.name.require_non_empty(NodeKind::P4Action)
    }

    fn dbprint_label(&self) -> String {
        format!("action {}/{}{}", self.decl.name.name, self.decl.decl_id, self.parameters)
    }

    fn visit_children(&self, v: &mut ChildVisitor<'_>) {
        v.typed(&self.annotations);
        v.typed(&self.parameters);
        v.typed(&self.body);
    }

    fn map_children(&self, m: &mut ChildMapper<'_>) -> IrResult<Option<Self>> {
        let annotations = m.typed(&self.annotations)?;
        let parameters = m.typed(&self.parameters)?;
        let body = m.typed(&self.body)?;
        Ok(m.changed().then(|| P4Action { annotations, parameters, body, ..self.clone() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::capability::{Annotated, Declaration};
    use crate::ir::expressions::{Constant, StringLiteral};
    use crate::ir::types::TypeBits;

    fn bits(n: u32) -> Node {
        TypeBits::bits(n).unwrap().into()
    }

    #[test]
    fn test_same_name_distinct_identity() {
        let ids = IdAllocator::new();
        let a = DeclarationVariable::new(&ids, Id::new("x"), bits(8), None).unwrap();
        let b = DeclarationVariable::new(&ids, Id::new("x"), bits(8), None).unwrap();
        assert_ne!(a.decl_id(), b.decl_id());
        assert_ne!(Node::from(a), Node::from(b));
    }

    #[test]
    fn test_with_name_keeps_identity() {
        let ids = IdAllocator::new();
        let a = DeclarationVariable::new(&ids, Id::new("x"), bits(8), None).unwrap();
        let renamed = a.with_name("x$0").unwrap();
        assert_eq!(renamed.decl_id(), a.decl_id());
        assert_eq!(renamed.name().name, "x$0");
        assert_eq!(renamed.to_string(), "x");
        assert_eq!(Node::from(a), Node::from(renamed));
    }

    #[test]
    fn test_with_name_rejects_empty() {
        let ids = IdAllocator::new();
        let a = DeclarationVariable::new(&ids, Id::new("x"), bits(8), None).unwrap();
        assert!(a.with_name("").is_err());
    }

    #[test]
    fn test_external_name_honors_control_plane_annotation() {
        let ids = IdAllocator::new();
        let c = DeclarationConstant::new(&ids, Id::new("k"), bits(8), Constant::new(SourceInfo::invalid(), 1).unwrap().into())
            .unwrap();
        assert_eq!(c.external_name(), "k");
        let name: Node = StringLiteral::new(SourceInfo::invalid(), "ingress.k").unwrap().into();
        let annotated = c.with_annotations(Annotations::empty().add_annotation("name", name).unwrap()).unwrap();
        assert_eq!(annotated.external_name(), "ingress.k");
        assert!(annotated.get_annotation("name").is_some());
        assert_eq!(annotated.decl_id(), c.decl_id());
    }

    #[test]
    fn test_initializer_must_be_expression() {
        let ids = IdAllocator::new();
        assert!(DeclarationVariable::new(&ids, Id::new("x"), bits(8), Some(bits(8))).is_err());
    }
}
