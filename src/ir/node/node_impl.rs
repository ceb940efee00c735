use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::{Node, NodeKind, NodePayload};
use crate::ir::annotations::Annotations;
use crate::ir::capability::{
    Annotated, Container, Declaration, GeneralNamespace, HasApply, Instance, MayBeGeneric, SimpleNamespace, Type,
    TypeVariable,
};
use crate::ir::error::{IrError, IrResult};
use crate::ir::identity::Id;
use crate::ir::types::{TypeMethod, TypeName, TypeSpecialized};

/// Broad classes of nodes that typed fields accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Type,
    Expression,
    Statement,
    Declaration,
    StatementOrDeclaration,
}

impl Category {
    pub fn name(self) -> &'static str {
        match self {
            Category::Type => "type",
            Category::Expression => "expression",
            Category::Statement => "statement",
            Category::Declaration => "declaration",
            Category::StatementOrDeclaration => "statement or declaration",
        }
    }

    pub fn contains(self, node: &Node) -> bool {
        match self {
            Category::Type => node.is_type(),
            Category::Expression => node.is_expression(),
            Category::Statement => node.is_statement(),
            Category::Declaration => node.is_declaration(),
            Category::StatementOrDeclaration => node.is_statement() || node.is_declaration(),
        }
    }

    /// Fails with [`IrError::UnexpectedChild`] when `node` is not in this
    /// category.
    pub fn require(self, parent: NodeKind, field: &'static str, node: &Node) -> IrResult<()> {
        if self.contains(node) {
            Ok(())
        } else {
            Err(IrError::UnexpectedChild { parent, field, expected: self.name(), found: node.kind() })
        }
    }
}

impl Node {
    pub fn is_type(&self) -> bool {
        self.as_type().is_some()
    }

    pub fn is_expression(&self) -> bool {
        matches!(
            self.kind(),
            NodeKind::Constant
                | NodeKind::BoolLiteral
                | NodeKind::StringLiteral
                | NodeKind::PathExpression
                | NodeKind::Member
                | NodeKind::BinaryOp
                | NodeKind::UnaryOp
                | NodeKind::MethodCallExpression
        )
    }

    pub fn is_statement(&self) -> bool {
        matches!(
            self.kind(),
            NodeKind::BlockStatement | NodeKind::AssignmentStatement | NodeKind::MethodCallStatement
        )
    }

    pub fn is_declaration(&self) -> bool {
        self.as_declaration().is_some()
    }

    pub fn is_compile_time_value(&self) -> bool {
        matches!(self.kind(), NodeKind::Constant | NodeKind::BoolLiteral | NodeKind::StringLiteral)
    }

    /// Typed payload of a child slot, or an invariant failure naming the slot.
    pub fn expect<T: NodePayload>(&self, parent: NodeKind, field: &'static str) -> IrResult<&Arc<T>> {
        T::from_node(self).ok_or(IrError::UnexpectedChild {
            parent,
            field,
            expected: T::KIND.name(),
            found: self.kind(),
        })
    }

    pub fn as_type(&self) -> Option<&dyn Type> {
        let ty: &dyn Type = match self {
            Node::TypeUnknown(n) => &**n,
            Node::TypeBoolean(n) => &**n,
            Node::TypeVoid(n) => &**n,
            Node::TypeString(n) => &**n,
            Node::TypeBits(n) => &**n,
            Node::TypeVarbits(n) => &**n,
            Node::TypeInfInt(n) => &**n,
            Node::TypeName(n) => &**n,
            Node::TypeSpecialized(n) => &**n,
            Node::TypeMethod(n) => &**n,
            Node::TypeVar(n) => &**n,
            Node::TypeStruct(n) => &**n,
            Node::TypeTypedef(n) => &**n,
            Node::TypeExtern(n) => &**n,
            Node::TypeParser(n) => &**n,
            Node::TypeControl(n) => &**n,
            Node::P4Parser(n) => &**n,
            Node::P4Control(n) => &**n,
            _ => return None,
        };
        Some(ty)
    }

    pub fn as_declaration(&self) -> Option<&dyn Declaration> {
        let decl: &dyn Declaration = match self {
            Node::TypeVar(n) => &**n,
            Node::TypeStruct(n) => &**n,
            Node::TypeTypedef(n) => &**n,
            Node::TypeExtern(n) => &**n,
            Node::TypeParser(n) => &**n,
            Node::TypeControl(n) => &**n,
            Node::P4Parser(n) => &**n,
            Node::P4Control(n) => &**n,
            Node::StructField(n) => &**n,
            Node::Parameter(n) => &**n,
            Node::Method(n) => &**n,
            Node::DeclarationVariable(n) => &**n,
            Node::DeclarationConstant(n) => &**n,
            Node::DeclarationInstance(n) => &**n,
            Node::P4Action(n) => &**n,
            Node::P4Table(n) => &**n,
            Node::ParserState(n) => &**n,
            _ => return None,
        };
        Some(decl)
    }

    pub fn as_annotated(&self) -> Option<&dyn Annotated> {
        let annotated: &dyn Annotated = match self {
            Node::TypeStruct(n) => &**n,
            Node::TypeTypedef(n) => &**n,
            Node::TypeExtern(n) => &**n,
            Node::TypeParser(n) => &**n,
            Node::TypeControl(n) => &**n,
            Node::P4Parser(n) => &**n,
            Node::P4Control(n) => &**n,
            Node::StructField(n) => &**n,
            Node::Parameter(n) => &**n,
            Node::Method(n) => &**n,
            Node::DeclarationVariable(n) => &**n,
            Node::DeclarationConstant(n) => &**n,
            Node::DeclarationInstance(n) => &**n,
            Node::P4Action(n) => &**n,
            Node::P4Table(n) => &**n,
            Node::ParserState(n) => &**n,
            Node::BlockStatement(n) => &**n,
            _ => return None,
        };
        Some(annotated)
    }

    pub fn as_may_be_generic(&self) -> Option<&dyn MayBeGeneric> {
        let generic: &dyn MayBeGeneric = match self {
            Node::TypeMethod(n) => &**n,
            Node::TypeExtern(n) => &**n,
            Node::Method(n) => &**n,
            Node::TypeParser(n) => &**n,
            Node::TypeControl(n) => &**n,
            Node::P4Parser(n) => &**n,
            Node::P4Control(n) => &**n,
            _ => return None,
        };
        Some(generic)
    }

    pub fn as_apply(&self) -> Option<&dyn HasApply> {
        let apply: &dyn HasApply = match self {
            Node::TypeParser(n) => &**n,
            Node::TypeControl(n) => &**n,
            Node::P4Parser(n) => &**n,
            Node::P4Control(n) => &**n,
            Node::P4Table(n) => &**n,
            _ => return None,
        };
        Some(apply)
    }

    pub fn as_container(&self) -> Option<&dyn Container> {
        let container: &dyn Container = match self {
            Node::P4Parser(n) => &**n,
            Node::P4Control(n) => &**n,
            _ => return None,
        };
        Some(container)
    }

    pub fn as_type_var(&self) -> Option<&dyn TypeVariable> {
        let var: &dyn TypeVariable = match self {
            Node::TypeVar(n) => &**n,
            Node::TypeInfInt(n) => &**n,
            _ => return None,
        };
        Some(var)
    }

    pub fn as_instance(&self) -> Option<&dyn Instance> {
        let instance: &dyn Instance = match self {
            Node::Parameter(n) => &**n,
            Node::DeclarationInstance(n) => &**n,
            _ => return None,
        };
        Some(instance)
    }

    pub fn as_simple_namespace(&self) -> Option<&dyn SimpleNamespace> {
        let ns: &dyn SimpleNamespace = match self {
            Node::TypeStruct(n) => &**n,
            Node::ParameterList(n) => &**n,
            Node::TypeParameters(n) => &**n,
            Node::P4Action(n) => &**n,
            Node::P4Parser(n) => &**n,
            Node::P4Control(n) => &**n,
            _ => return None,
        };
        Some(ns)
    }

    pub fn as_general_namespace(&self) -> Option<&dyn GeneralNamespace> {
        let ns: &dyn GeneralNamespace = match self {
            Node::TypeExtern(n) => &**n,
            Node::P4Program(n) => &**n,
            _ => return None,
        };
        Some(ns)
    }

    /// Internal name of a declaration.
    pub fn declared_name(&self) -> Option<&str> {
        self.as_declaration().map(|d| d.name().name.as_str())
    }

    pub fn annotations(&self) -> Option<&Arc<Annotations>> {
        self.as_annotated().map(|a| a.annotations())
    }

    /// Inferred type of an expression.
    pub fn inferred_type(&self) -> Option<&Node> {
        match self {
            Node::Constant(n) => Some(&n.ty),
            Node::BoolLiteral(n) => Some(&n.ty),
            Node::StringLiteral(n) => Some(&n.ty),
            Node::PathExpression(n) => Some(&n.ty),
            Node::Member(n) => Some(&n.ty),
            Node::BinaryOp(n) => Some(&n.ty),
            Node::UnaryOp(n) => Some(&n.ty),
            Node::MethodCallExpression(n) => Some(&n.ty),
            _ => None,
        }
    }

    /// Copy of an expression with a new inferred type.
    pub fn with_type(&self, ty: Node) -> IrResult<Node> {
        Ok(match self {
            Node::Constant(n) => n.with_type(ty)?.into(),
            Node::BoolLiteral(n) => n.with_type(ty)?.into(),
            Node::StringLiteral(n) => n.with_type(ty)?.into(),
            Node::PathExpression(n) => n.with_type(ty)?.into(),
            Node::Member(n) => n.with_type(ty)?.into(),
            Node::BinaryOp(n) => n.with_type(ty)?.into(),
            Node::UnaryOp(n) => n.with_type(ty)?.into(),
            Node::MethodCallExpression(n) => n.with_type(ty)?.into(),
            _ => return Err(IrError::invalid(self.kind(), "only expressions carry an inferred type")),
        })
    }

    /// Copy of a declaration under a new internal name, keeping its
    /// identity and original name.
    pub fn with_name(&self, name: &str) -> IrResult<Node> {
        Ok(match self {
            Node::TypeVar(n) => n.with_name(name)?.into(),
            Node::TypeStruct(n) => n.with_name(name)?.into(),
            Node::TypeTypedef(n) => n.with_name(name)?.into(),
            Node::TypeExtern(n) => n.with_name(name)?.into(),
            Node::TypeParser(n) => n.with_name(name)?.into(),
            Node::TypeControl(n) => n.with_name(name)?.into(),
            Node::P4Parser(n) => n.with_name(name)?.into(),
            Node::P4Control(n) => n.with_name(name)?.into(),
            Node::StructField(n) => n.with_name(name)?.into(),
            Node::Parameter(n) => n.with_name(name)?.into(),
            Node::Method(n) => n.with_name(name)?.into(),
            Node::DeclarationVariable(n) => n.with_name(name)?.into(),
            Node::DeclarationConstant(n) => n.with_name(name)?.into(),
            Node::DeclarationInstance(n) => n.with_name(name)?.into(),
            Node::P4Action(n) => n.with_name(name)?.into(),
            Node::P4Table(n) => n.with_name(name)?.into(),
            Node::ParserState(n) => n.with_name(name)?.into(),
            _ => return Err(IrError::invalid(self.kind(), "only declarations can be renamed")),
        })
    }

    /// Copy of an annotated node carrying `annotations`. Returns this very
    /// node when `annotations` is the collection it already holds.
    pub fn with_annotations(&self, annotations: Arc<Annotations>) -> IrResult<Node> {
        match self.annotations() {
            Some(current) if Arc::ptr_eq(current, &annotations) => return Ok(self.clone()),
            Some(_) => {}
            None => return Err(IrError::invalid(self.kind(), "node cannot carry annotations")),
        }
        Ok(match self {
            Node::TypeStruct(n) => n.with_annotations(annotations)?.into(),
            Node::TypeTypedef(n) => n.with_annotations(annotations)?.into(),
            Node::TypeExtern(n) => n.with_annotations(annotations)?.into(),
            Node::TypeParser(n) => n.with_annotations(annotations)?.into(),
            Node::TypeControl(n) => n.with_annotations(annotations)?.into(),
            Node::P4Parser(n) => n.with_annotations(annotations)?.into(),
            Node::P4Control(n) => n.with_annotations(annotations)?.into(),
            Node::StructField(n) => n.with_annotations(annotations)?.into(),
            Node::Parameter(n) => n.with_annotations(annotations)?.into(),
            Node::Method(n) => n.with_annotations(annotations)?.into(),
            Node::DeclarationVariable(n) => n.with_annotations(annotations)?.into(),
            Node::DeclarationConstant(n) => n.with_annotations(annotations)?.into(),
            Node::DeclarationInstance(n) => n.with_annotations(annotations)?.into(),
            Node::P4Action(n) => n.with_annotations(annotations)?.into(),
            Node::P4Table(n) => n.with_annotations(annotations)?.into(),
            Node::ParserState(n) => n.with_annotations(annotations)?.into(),
            Node::BlockStatement(n) => n.with_annotations(annotations)?.into(),
            _ => return Err(IrError::invalid(self.kind(), "node cannot carry annotations")),
        })
    }

    /// Static width in bits; 0 for non-types and unsized types.
    pub fn width_bits(&self) -> u32 {
        self.as_type().map_or(0, |t| t.width_bits())
    }

    /// The form of this type that can be written back as source.
    ///
    /// Base and structural types are already representable and come back as
    /// this very node. Declared types come back as a name reference, never
    /// as a copy of their structure.
    pub fn get_p4_type(&self) -> IrResult<Node> {
        match self {
            Node::TypeUnknown(_)
            | Node::TypeBoolean(_)
            | Node::TypeVoid(_)
            | Node::TypeString(_)
            | Node::TypeBits(_)
            | Node::TypeVarbits(_)
            | Node::TypeInfInt(_)
            | Node::TypeName(_)
            | Node::TypeMethod(_) => Ok(self.clone()),
            Node::TypeSpecialized(n) => {
                let mut changed = false;
                let mut arguments = Vec::with_capacity(n.arguments.len());
                for a in n.arguments.iter() {
                    let canonical = a.get_p4_type()?;
                    changed |= !canonical.ptr_eq(a);
                    arguments.push(canonical);
                }
                if !changed {
                    return Ok(self.clone());
                }
                Ok(TypeSpecialized::new(Arc::clone(&n.base_type), arguments)?.into())
            }
            _ => match (self.as_type(), self.as_declaration()) {
                (Some(_), Some(decl)) => Ok(TypeName::referring_to(decl.name())?.into()),
                _ => Err(IrError::invalid(self.kind(), "not a type")),
            },
        }
    }

    /// Structural type equivalence. Declared types and type variables are
    /// nominal; base and structural types compare by shape.
    pub fn equiv(&self, other: &Node) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        match (self, other) {
            (Node::TypeUnknown(_), Node::TypeUnknown(_))
            | (Node::TypeBoolean(_), Node::TypeBoolean(_))
            | (Node::TypeVoid(_), Node::TypeVoid(_))
            | (Node::TypeString(_), Node::TypeString(_)) => true,
            (Node::TypeBits(a), Node::TypeBits(b)) => a.size == b.size && a.signed == b.signed,
            (Node::TypeVarbits(a), Node::TypeVarbits(b)) => a.size == b.size,
            (Node::TypeName(a), Node::TypeName(b)) => a.path.as_string() == b.path.as_string(),
            (Node::TypeSpecialized(a), Node::TypeSpecialized(b)) => {
                a.base_type.path.as_string() == b.base_type.path.as_string()
                    && a.arguments.len() == b.arguments.len()
                    && a.arguments.iter().zip(b.arguments.iter()).all(|(x, y)| x.equiv(y))
            }
            (Node::TypeMethod(a), Node::TypeMethod(b)) => method_types_equiv(a, b),
            _ => match (self.as_type_var(), other.as_type_var()) {
                (Some(a), Some(b)) => a.declaration_id() == b.declaration_id(),
                _ => match (self.as_type(), self.as_declaration(), other.as_declaration()) {
                    (Some(_), Some(a), Some(b)) => a.decl_id() == b.decl_id(),
                    _ => false,
                },
            },
        }
    }

    /// Declaration id or type-variable id, when the node has one.
    fn identity_key(&self) -> Option<u64> {
        self.as_declaration()
            .map(|d| d.decl_id().value())
            .or_else(|| self.as_type_var().map(|v| v.declaration_id().value()))
    }

    /// Name of a declaration as an [`Id`].
    pub fn name_id(&self) -> Option<&Id> {
        self.as_declaration().map(|d| d.name())
    }
}

fn method_types_equiv(a: &TypeMethod, b: &TypeMethod) -> bool {
    let returns = match (&a.return_type, &b.return_type) {
        (None, None) => true,
        (Some(x), Some(y)) => x.equiv(y),
        _ => false,
    };
    returns
        && a.type_parameters.len() == b.type_parameters.len()
        && a.parameters.len() == b.parameters.len()
        && a
            .parameters
            .iter()
            .zip(b.parameters.iter())
            .all(|(x, y)| x.direction == y.direction && x.ty.equiv(&y.ty))
}

/// Declarations (and type variables) are equal when they share an id, even
/// across copy-on-write copies; every other node is equal only to itself.
impl PartialEq for Node {
    fn eq(&self, other: &Node) -> bool {
        match (self.identity_key(), other.identity_key()) {
            (Some(a), Some(b)) => a == b,
            (None, None) => self.ptr_eq(other),
            _ => false,
        }
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self.identity_key() {
            Some(id) => id.hash(state),
            None => (self.as_ptr() as usize).hash(state),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::identity::IdAllocator;
    use crate::ir::source_info::SourceInfo;
    use crate::ir::type_decls::{StructKind, TypeStruct, TypeVar};
    use crate::ir::types::{TypeBits, TypeBoolean, TypeUnknown};

    #[test]
    fn test_base_types_are_their_own_canonical_form() {
        for t in [TypeUnknown::get(), TypeBoolean::get(), TypeBits::bits(8).unwrap().into()] {
            assert!(t.get_p4_type().unwrap().ptr_eq(&t));
        }
    }

    #[test]
    fn test_declared_type_canonical_form_is_a_name() {
        let ids = IdAllocator::new();
        let s: Node = TypeStruct::new(&ids, StructKind::Header, Id::new("ethernet_t"), []).unwrap().into();
        let canonical = s.get_p4_type().unwrap();
        let name = canonical.to::<TypeName>().unwrap();
        assert_eq!(name.path.to_string(), "ethernet_t");
    }

    #[test]
    fn test_specialized_with_canonical_arguments_is_unchanged() {
        let base = TypeName::named("Register").unwrap();
        let t: Node = TypeSpecialized::new(base, [TypeBits::bits(8).unwrap().into()]).unwrap().into();
        assert!(t.get_p4_type().unwrap().ptr_eq(&t));
    }

    #[test]
    fn test_specialized_argument_declared_inline_is_replaced_by_name() {
        let ids = IdAllocator::new();
        let s: Node = TypeStruct::new(&ids, StructKind::Struct, Id::new("meta_t"), []).unwrap().into();
        let t: Node = TypeSpecialized::new(TypeName::named("Register").unwrap(), [s]).unwrap().into();
        let canonical = t.get_p4_type().unwrap();
        assert!(!canonical.ptr_eq(&t));
        assert_eq!(canonical.to_string(), "Register<meta_t>");
    }

    #[test]
    fn test_non_type_has_no_canonical_form() {
        let e: Node = crate::ir::expressions::Constant::new(SourceInfo::invalid(), 1).unwrap().into();
        assert!(e.get_p4_type().is_err());
        assert_eq!(e.width_bits(), 0);
    }

    #[test]
    fn test_equiv() {
        let ids = IdAllocator::new();
        let a: Node = TypeBits::bits(8).unwrap().into();
        let b: Node = TypeBits::bits(8).unwrap().into();
        let c: Node = TypeBits::new(SourceInfo::invalid(), 8, true).unwrap().into();
        assert!(a.equiv(&b));
        assert!(!a.equiv(&c));
        let t: Node = TypeVar::new(&ids, Id::new("T")).unwrap().into();
        let u: Node = TypeVar::new(&ids, Id::new("T")).unwrap().into();
        assert!(!t.equiv(&u));
        assert!(t.equiv(&t.as_type_var().unwrap().as_type()));
    }

    #[test]
    fn test_equality_is_identity_for_untagged_nodes() {
        let a: Node = TypeBits::bits(8).unwrap().into();
        let b: Node = TypeBits::bits(8).unwrap().into();
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn test_category_mismatch_reports_slot() {
        let e: Node = crate::ir::expressions::Constant::new(SourceInfo::invalid(), 1).unwrap().into();
        let err = Category::Type.require(NodeKind::StructField, "ty", &e).unwrap_err();
        assert_eq!(err.to_string(), "StructField.ty: expected type, found Constant");
    }
}
