use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use super::annotations::Annotations;
use super::capability::{
    Declaration, Instance, Namespace, SimpleNamespace, check_unique_names, impl_declaration,
};
use super::error::IrResult;
use super::identity::{DeclInfo, Id, IdAllocator};
use super::node::{Category, ChildMapper, ChildVisitor, IrNode, Node, NodeKind, TypedVector};
use super::source_info::SourceInfo;
use super::type_decls::TypeVar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    None,
    In,
    Out,
    InOut,
}

impl Direction {
    pub fn keyword(self) -> &'static str {
        match self {
            Direction::None => "",
            Direction::In => "in",
            Direction::Out => "out",
            Direction::InOut => "inout",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Parameter {
    pub src_info: SourceInfo,
    pub decl: DeclInfo,
    pub annotations: Arc<Annotations>,
    pub direction: Direction,
    pub ty: Node,
    pub default_value: Option<Node>,
}

impl Parameter {
    pub fn new(
        ids: &IdAllocator,
        name: Id,
        direction: Direction,
        ty: Node,
        default_value: Option<Node>,
    ) -> IrResult<Arc<Self>> {
        let decl = DeclInfo::new(ids, name, NodeKind::Parameter)?;
        Parameter {
            src_info: decl.name.src_info.clone(),
            decl,
            annotations: Annotations::empty(),
            direction,
            ty,
            default_value,
        }
        .finish()
    }
}

impl_declaration!(Parameter, annotated);

impl Instance for Parameter {
    fn instance_name(&self) -> &Id {
        &self.decl.name
    }

    fn instance_type(&self) -> &Node {
        &self.ty
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.decl.name)
    }
}

impl IrNode for Parameter {
    fn src_info(&self) -> &SourceInfo {
        &self.src_info
    }

    fn validate(&self) -> IrResult<()> {
        self.decl.name.require_non_empty(NodeKind::Parameter)?;
        Category::Type.require(NodeKind::Parameter, "ty", &self.ty)?;
        if let Some(value) = &self.default_value {
            Category::Expression.require(NodeKind::Parameter, "default_value", value)?;
        }
        Ok(())
    }

    fn dbprint_label(&self) -> String {
        let dir = self.direction.keyword();
        let sep = if dir.is_empty() { "" } else { " " };
        format!("{}{}{} {}/{}", dir, sep, self.ty, self.decl.name.name, self.decl.decl_id)
    }

    fn visit_children(&self, v: &mut ChildVisitor<'_>) {
        v.typed(&self.annotations);
        v.node(&self.ty);
        v.optional(&self.default_value);
    }

    fn map_children(&self, m: &mut ChildMapper<'_>) -> IrResult<Option<Self>> {
        let annotations = m.typed(&self.annotations)?;
        let ty = m.node(&self.ty)?;
        let default_value = m.optional(&self.default_value)?;
        Ok(m.changed().then(|| Parameter { annotations, ty, default_value, ..self.clone() }))
    }
}

static EMPTY_PARAMETERS: Lazy<Arc<ParameterList>> = Lazy::new(|| Arc::new(ParameterList::default()));

/// Ordered parameters; names are unique.
#[derive(Debug, Clone, Default)]
pub struct ParameterList {
    pub src_info: SourceInfo,
    pub parameters: TypedVector<Parameter>,
}

impl ParameterList {
    pub fn new(parameters: impl IntoIterator<Item = Arc<Parameter>>) -> IrResult<Arc<Self>> {
        let parameters: TypedVector<Parameter> = parameters.into_iter().collect();
        let src_info = parameters.iter().fold(SourceInfo::invalid(), |s, p| s.merge(&p.src_info));
        ParameterList { src_info, parameters }.finish()
    }

    /// The shared empty list.
    pub fn empty() -> Arc<Self> {
        Arc::clone(&EMPTY_PARAMETERS)
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Parameter>> {
        self.parameters.iter()
    }

    pub fn get_parameter(&self, name: &str) -> Option<&Arc<Parameter>> {
        self.iter().find(|p| p.decl.name.name == name)
    }
}

impl fmt::Display for ParameterList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, p) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            let dir = p.direction.keyword();
            if !dir.is_empty() {
                write!(f, "{} ", dir)?;
            }
            write!(f, "{} {}", p.ty, p.decl.name)?;
        }
        write!(f, ")")
    }
}

impl Namespace for ParameterList {
    fn declarations(&self) -> Box<dyn Iterator<Item = Node> + '_> {
        Box::new(self.parameters.iter().map(|p| Node::from(Arc::clone(p))))
    }
}

impl SimpleNamespace for ParameterList {}

impl IrNode for ParameterList {
    fn src_info(&self) -> &SourceInfo {
        &self.src_info
    }

    fn validate(&self) -> IrResult<()> {
        check_unique_names(NodeKind::ParameterList, self.iter().map(|p| (p.name(), &p.src_info)))
    }

    fn dbprint_label(&self) -> String {
        format!("[{}]", self.len())
    }

    fn visit_children(&self, v: &mut ChildVisitor<'_>) {
        v.typed_vector(&self.parameters);
    }

    fn map_children(&self, m: &mut ChildMapper<'_>) -> IrResult<Option<Self>> {
        let parameters = m.typed_vector(&self.parameters)?;
        Ok(m.changed().then(|| ParameterList { parameters, src_info: self.src_info.clone() }))
    }
}

static EMPTY_TYPE_PARAMETERS: Lazy<Arc<TypeParameters>> = Lazy::new(|| Arc::new(TypeParameters::default()));

/// Ordered type variables of a generic declaration; names are unique.
#[derive(Debug, Clone, Default)]
pub struct TypeParameters {
    pub src_info: SourceInfo,
    pub parameters: TypedVector<TypeVar>,
}

impl TypeParameters {
    pub fn new(parameters: impl IntoIterator<Item = Arc<TypeVar>>) -> IrResult<Arc<Self>> {
        let parameters: TypedVector<TypeVar> = parameters.into_iter().collect();
        let src_info = parameters.iter().fold(SourceInfo::invalid(), |s, p| s.merge(&p.src_info));
        TypeParameters { src_info, parameters }.finish()
    }

    /// The shared empty list.
    pub fn empty() -> Arc<Self> {
        Arc::clone(&EMPTY_TYPE_PARAMETERS)
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<TypeVar>> {
        self.parameters.iter()
    }
}

impl fmt::Display for TypeParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return Ok(());
        }
        write!(f, "<")?;
        for (i, p) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", p)?;
        }
        write!(f, ">")
    }
}

impl Namespace for TypeParameters {
    fn declarations(&self) -> Box<dyn Iterator<Item = Node> + '_> {
        Box::new(self.parameters.iter().map(|p| Node::from(Arc::clone(p))))
    }
}

impl SimpleNamespace for TypeParameters {}

impl IrNode for TypeParameters {
    fn src_info(&self) -> &SourceInfo {
        &self.src_info
    }

    fn validate(&self) -> IrResult<()> {
        check_unique_names(NodeKind::TypeParameters, self.iter().map(|p| (p.name(), &p.src_info)))
    }

    fn dbprint_label(&self) -> String {
        format!("[{}]", self.len())
    }

    fn visit_children(&self, v: &mut ChildVisitor<'_>) {
        v.typed_vector(&self.parameters);
    }

    fn map_children(&self, m: &mut ChildMapper<'_>) -> IrResult<Option<Self>> {
        let parameters = m.typed_vector(&self.parameters)?;
        Ok(m.changed().then(|| TypeParameters { parameters, src_info: self.src_info.clone() }))
    }
}
