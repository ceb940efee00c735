//! Declarations that introduce a type.
//!
//! Each payload here implements both [`Type`] and [`Declaration`]; the two
//! contracts stay separate traits and are combined per kind.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::annotations::Annotations;
use super::capability::{
    APPLY_METHOD_NAME, Declaration, GeneralNamespace, HasApply, MayBeGeneric, Namespace, SimpleNamespace, Type,
    TypeVariable, check_unique_names, impl_declaration,
};
use super::error::IrResult;
use super::identity::{DeclId, DeclInfo, Id, IdAllocator};
use super::node::{Category, ChildMapper, ChildVisitor, IrNode, Node, NodeKind, TypedVector};
use super::parameters::{ParameterList, TypeParameters};
use super::source_info::SourceInfo;
use super::types::{TypeMethod, TypeVoid};

/// A type parameter of a generic declaration.
#[derive(Debug, Clone)]
pub struct TypeVar {
    pub src_info: SourceInfo,
    pub decl: DeclInfo,
}

impl TypeVar {
    pub fn new(ids: &IdAllocator, name: Id) -> IrResult<Arc<Self>> {
        let decl = DeclInfo::new(ids, name, NodeKind::TypeVar)?;
        TypeVar { src_info: decl.name.src_info.clone(), decl }.finish()
    }
}

impl_declaration!(TypeVar);

impl Type for TypeVar {}

impl TypeVariable for TypeVar {
    fn var_name(&self) -> &str {
        &self.decl.name.name
    }

    fn declaration_id(&self) -> DeclId {
        self.decl.decl_id
    }

    fn as_type(&self) -> Node {
        Node::from(Arc::new(self.clone()))
    }
}

impl fmt::Display for TypeVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.decl.name)
    }
}

impl IrNode for TypeVar {
    fn src_info(&self) -> &SourceInfo {
        &self.src_info
    }

    fn validate(&self) -> IrResult<()> {
        self.decl.name.require_non_empty(NodeKind::TypeVar)
    }

    fn dbprint_label(&self) -> String {
        format!("{}/{}", self.decl.name.name, self.decl.decl_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructKind {
    Struct,
    Header,
    HeaderUnion,
}

impl StructKind {
    pub fn keyword(self) -> &'static str {
        match self {
            StructKind::Struct => "struct",
            StructKind::Header => "header",
            StructKind::HeaderUnion => "header_union",
        }
    }
}

#[derive(Debug, Clone)]
pub struct StructField {
    pub src_info: SourceInfo,
    pub decl: DeclInfo,
    pub annotations: Arc<Annotations>,
    pub ty: Node,
}

impl StructField {
    pub fn new(ids: &IdAllocator, name: Id, ty: Node) -> IrResult<Arc<Self>> {
        let decl = DeclInfo::new(ids, name, NodeKind::StructField)?;
        StructField { src_info: decl.name.src_info.clone(), decl, annotations: Annotations::empty(), ty }.finish()
    }
}

impl_declaration!(StructField, annotated);

impl fmt::Display for StructField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.decl.name)
    }
}

impl IrNode for StructField {
    fn src_info(&self) -> &SourceInfo {
        &self.src_info
    }

    fn validate(&self) -> IrResult<()> {
        self.decl.name.require_non_empty(NodeKind::StructField)?;
        Category::Type.require(NodeKind::StructField, "ty", &self.ty)
    }

    fn dbprint_label(&self) -> String {
        format!("{} {}/{}", self.ty, self.decl.name.name, self.decl.decl_id)
    }

    fn visit_children(&self, v: &mut ChildVisitor<'_>) {
        v.typed(&self.annotations);
        v.node(&self.ty);
    }

    fn map_children(&self, m: &mut ChildMapper<'_>) -> IrResult<Option<Self>> {
        let annotations = m.typed(&self.annotations)?;
        let ty = m.node(&self.ty)?;
        Ok(m.changed().then(|| StructField { annotations, ty, ..self.clone() }))
    }
}

/// Struct, header or header union. Field names are unique.
#[derive(Debug, Clone)]
pub struct TypeStruct {
    pub src_info: SourceInfo,
    pub decl: DeclInfo,
    pub kind: StructKind,
    pub annotations: Arc<Annotations>,
    pub fields: TypedVector<StructField>,
}

impl TypeStruct {
    pub fn new(
        ids: &IdAllocator,
        kind: StructKind,
        name: Id,
        fields: impl IntoIterator<Item = Arc<StructField>>,
    ) -> IrResult<Arc<Self>> {
        let decl = DeclInfo::new(ids, name, NodeKind::TypeStruct)?;
        TypeStruct {
            src_info: decl.name.src_info.clone(),
            decl,
            kind,
            annotations: Annotations::empty(),
            fields: fields.into_iter().collect(),
        }
        .finish()
    }

    pub fn get_field(&self, name: &str) -> Option<&Arc<StructField>> {
        self.fields.iter().find(|f| f.decl.name.name == name)
    }
}

impl_declaration!(TypeStruct, annotated);

impl Type for TypeStruct {
    /// Sum of the field widths; the widest field for a header union.
    fn width_bits(&self) -> u32 {
        let widths = self.fields.iter().map(|f| f.ty.width_bits());
        match self.kind {
            StructKind::HeaderUnion => widths.max().unwrap_or(0),
            StructKind::Struct | StructKind::Header => widths.sum(),
        }
    }
}

impl Namespace for TypeStruct {
    fn declarations(&self) -> Box<dyn Iterator<Item = Node> + '_> {
        Box::new(self.fields.iter().map(|f| Node::from(Arc::clone(f))))
    }
}

impl SimpleNamespace for TypeStruct {}

impl fmt::Display for TypeStruct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.decl.name)
    }
}

impl IrNode for TypeStruct {
    fn src_info(&self) -> &SourceInfo {
        &self.src_info
    }

    fn validate(&self) -> IrResult<()> {
        self.decl.name.require_non_empty(NodeKind::TypeStruct)?;
        check_unique_names(NodeKind::TypeStruct, self.fields.iter().map(|f| (f.name(), &f.src_info)))
    }

    fn dbprint_label(&self) -> String {
        format!("{} {}/{}", self.kind.keyword(), self.decl.name.name, self.decl.decl_id)
    }

    fn visit_children(&self, v: &mut ChildVisitor<'_>) {
        v.typed(&self.annotations);
        v.typed_vector(&self.fields);
    }

    fn map_children(&self, m: &mut ChildMapper<'_>) -> IrResult<Option<Self>> {
        let annotations = m.typed(&self.annotations)?;
        let fields = m.typed_vector(&self.fields)?;
        Ok(m.changed().then(|| TypeStruct { annotations, fields, ..self.clone() }))
    }
}

#[derive(Debug, Clone)]
pub struct TypeTypedef {
    pub src_info: SourceInfo,
    pub decl: DeclInfo,
    pub annotations: Arc<Annotations>,
    pub ty: Node,
}

impl TypeTypedef {
    pub fn new(ids: &IdAllocator, name: Id, ty: Node) -> IrResult<Arc<Self>> {
        let decl = DeclInfo::new(ids, name, NodeKind::TypeTypedef)?;
        TypeTypedef { src_info: decl.name.src_info.clone(), decl, annotations: Annotations::empty(), ty }.finish()
    }
}

impl_declaration!(TypeTypedef, annotated);

impl Type for TypeTypedef {
    fn width_bits(&self) -> u32 {
        self.ty.width_bits()
    }
}

impl fmt::Display for TypeTypedef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.decl.name)
    }
}

impl IrNode for TypeTypedef {
    fn src_info(&self) -> &SourceInfo {
        &self.src_info
    }

    fn validate(&self) -> IrResult<()> {
        self.decl.name.require_non_empty(NodeKind::TypeTypedef)?;
        Category::Type.require(NodeKind::TypeTypedef, "ty", &self.ty)
    }

    fn dbprint_label(&self) -> String {
        format!("{}/{} = {}", self.decl.name.name, self.decl.decl_id, self.ty)
    }

    fn visit_children(&self, v: &mut ChildVisitor<'_>) {
        v.typed(&self.annotations);
        v.node(&self.ty);
    }

    fn map_children(&self, m: &mut ChildMapper<'_>) -> IrResult<Option<Self>> {
        let annotations = m.typed(&self.annotations)?;
        let ty = m.node(&self.ty)?;
        Ok(m.changed().then(|| TypeTypedef { annotations, ty, ..self.clone() }))
    }
}

/// A method of an extern. Overloads share a name and differ in their
/// parameters.
#[derive(Debug, Clone)]
pub struct Method {
    pub src_info: SourceInfo,
    pub decl: DeclInfo,
    pub annotations: Arc<Annotations>,
    pub ty: Arc<TypeMethod>,
    pub is_abstract: bool,
}

impl Method {
    pub fn new(ids: &IdAllocator, name: Id, ty: Arc<TypeMethod>, is_abstract: bool) -> IrResult<Arc<Self>> {
        let decl = DeclInfo::new(ids, name, NodeKind::Method)?;
        Method {
            src_info: decl.name.src_info.clone(),
            decl,
            annotations: Annotations::empty(),
            ty,
            is_abstract,
        }
        .finish()
    }
}

impl_declaration!(Method, annotated);

impl MayBeGeneric for Method {
    fn type_parameters(&self) -> &Arc<TypeParameters> {
        &self.ty.type_parameters
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.decl.name)
    }
}

impl IrNode for Method {
    fn src_info(&self) -> &SourceInfo {
        &self.src_info
    }

    fn validate(&self) -> IrResult<()> {
        self.decl.name.require_non_empty(NodeKind::Method)
    }

    fn dbprint_label(&self) -> String {
        let prefix = if self.is_abstract { "abstract " } else { "" };
        format!("{}{}/{} {}", prefix, self.decl.name.name, self.decl.decl_id, self.ty)
    }

    fn visit_children(&self, v: &mut ChildVisitor<'_>) {
        v.typed(&self.annotations);
        v.typed(&self.ty);
    }

    fn map_children(&self, m: &mut ChildMapper<'_>) -> IrResult<Option<Self>> {
        let annotations = m.typed(&self.annotations)?;
        let ty = m.typed(&self.ty)?;
        Ok(m.changed().then(|| Method { annotations, ty, ..self.clone() }))
    }
}

/// An extern object type. Its methods form a general namespace, so
/// overloads are legal and exact duplicates are diagnosed separately.
#[derive(Debug, Clone)]
pub struct TypeExtern {
    pub src_info: SourceInfo,
    pub decl: DeclInfo,
    pub annotations: Arc<Annotations>,
    pub type_parameters: Arc<TypeParameters>,
    pub methods: TypedVector<Method>,
}

impl TypeExtern {
    pub fn new(
        ids: &IdAllocator,
        name: Id,
        type_parameters: Arc<TypeParameters>,
        methods: impl IntoIterator<Item = Arc<Method>>,
    ) -> IrResult<Arc<Self>> {
        let decl = DeclInfo::new(ids, name, NodeKind::TypeExtern)?;
        TypeExtern {
            src_info: decl.name.src_info.clone(),
            decl,
            annotations: Annotations::empty(),
            type_parameters,
            methods: methods.into_iter().collect(),
        }
        .finish()
    }

    /// Methods called `name` taking `arity` arguments.
    pub fn lookup_method(&self, name: &str, arity: usize) -> Option<&Arc<Method>> {
        self.methods
            .iter()
            .find(|m| m.decl.name.name == name && m.ty.parameters.len() == arity)
    }
}

impl_declaration!(TypeExtern, annotated);

impl Type for TypeExtern {}

impl MayBeGeneric for TypeExtern {
    fn type_parameters(&self) -> &Arc<TypeParameters> {
        &self.type_parameters
    }
}

impl Namespace for TypeExtern {
    fn declarations(&self) -> Box<dyn Iterator<Item = Node> + '_> {
        Box::new(self.methods.iter().map(|m| Node::from(Arc::clone(m))))
    }
}

impl GeneralNamespace for TypeExtern {}

impl fmt::Display for TypeExtern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.decl.name)
    }
}

impl IrNode for TypeExtern {
    fn src_info(&self) -> &SourceInfo {
        &self.src_info
    }

    fn validate(&self) -> IrResult<()> {
        self.decl.name.require_non_empty(NodeKind::TypeExtern)
    }

    fn dbprint_label(&self) -> String {
        format!("extern {}/{}{}", self.decl.name.name, self.decl.decl_id, self.type_parameters)
    }

    fn visit_children(&self, v: &mut ChildVisitor<'_>) {
        v.typed(&self.annotations);
        v.typed(&self.type_parameters);
        v.typed_vector(&self.methods);
    }

    fn map_children(&self, m: &mut ChildMapper<'_>) -> IrResult<Option<Self>> {
        let annotations = m.typed(&self.annotations)?;
        let type_parameters = m.typed(&self.type_parameters)?;
        let methods = m.typed_vector(&self.methods)?;
        Ok(m.changed().then(|| TypeExtern { annotations, type_parameters, methods, ..self.clone() }))
    }
}

/// Defines the parser and control types, which share one shape: a generic
/// declaration with an apply signature.
macro_rules! block_type {
    ($ty:ident, $keyword:literal) => {
        #[derive(Debug, Clone)]
        pub struct $ty {
            pub src_info: SourceInfo,
            pub decl: DeclInfo,
            pub annotations: Arc<Annotations>,
            pub type_parameters: Arc<TypeParameters>,
            pub apply_params: Arc<ParameterList>,
        }

        impl $ty {
            pub fn new(
                ids: &IdAllocator,
                name: Id,
                type_parameters: Arc<TypeParameters>,
                apply_params: Arc<ParameterList>,
            ) -> IrResult<Arc<Self>> {
                let decl = DeclInfo::new(ids, name, NodeKind::$ty)?;
                $ty {
                    src_info: decl.name.src_info.clone(),
                    decl,
                    annotations: Annotations::empty(),
                    type_parameters,
                    apply_params,
                }
                .finish()
            }
        }

        impl_declaration!($ty, annotated);

        impl Type for $ty {}

        impl MayBeGeneric for $ty {
            fn type_parameters(&self) -> &Arc<TypeParameters> {
                &self.type_parameters
            }
        }

        impl HasApply for $ty {
            fn apply_parameters(&self) -> Arc<ParameterList> {
                Arc::clone(&self.apply_params)
            }

            fn apply_method_type(&self) -> IrResult<Arc<TypeMethod>> {
                apply_signature(self.type_parameters.clone(), self.apply_parameters())
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.decl.name)
            }
        }

        impl IrNode for $ty {
            fn src_info(&self) -> &SourceInfo {
                &self.src_info
            }

            fn validate(&self) -> IrResult<()> {
                self.decl.name.require_non_empty(NodeKind::$ty)?;
                check_unique_names(
                    NodeKind::$ty,
                    self.type_parameters
                        .iter()
                        .map(|p| (p.name(), &p.src_info))
                        .chain(self.apply_params.iter().map(|p| (p.name(), &p.src_info))),
                )
            }

            fn dbprint_label(&self) -> String {
                format!(
                    "{} {}/{}{}{}",
                    $keyword, self.decl.name.name, self.decl.decl_id, self.type_parameters, self.apply_params
                )
            }

            fn visit_children(&self, v: &mut ChildVisitor<'_>) {
                v.typed(&self.annotations);
                v.typed(&self.type_parameters);
                v.typed(&self.apply_params);
            }

            fn map_children(&self, m: &mut ChildMapper<'_>) -> IrResult<Option<Self>> {
                let annotations = m.typed(&self.annotations)?;
                let type_parameters = m.typed(&self.type_parameters)?;
                let apply_params = m.typed(&self.apply_params)?;
                Ok(m.changed().then(|| $ty { annotations, type_parameters, apply_params, ..self.clone() }))
            }
        }
    };
}

block_type!(TypeParser, "parser");
block_type!(TypeControl, "control");

/// `void apply(params)`.
pub(crate) fn apply_signature(
    type_parameters: Arc<TypeParameters>,
    parameters: Arc<ParameterList>,
) -> IrResult<Arc<TypeMethod>> {
    TypeMethod::new(type_parameters, Some(TypeVoid::get()), parameters, Some(Id::new(APPLY_METHOD_NAME)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::capability::same_signature;
    use crate::ir::diagnostics::DiagnosticCollector;
    use crate::ir::error::IrError;
    use crate::ir::parameters::{Direction, Parameter};
    use crate::ir::types::{TypeBits, TypeName};

    fn bits(n: u32) -> Node {
        TypeBits::bits(n).unwrap().into()
    }

    fn field(ids: &IdAllocator, name: &str, width: u32) -> Arc<StructField> {
        StructField::new(ids, Id::new(name), bits(width)).unwrap()
    }

    fn method(ids: &IdAllocator, name: &str, params: &[(&str, Direction, u32)]) -> Arc<Method> {
        let params: Vec<_> = params
            .iter()
            .map(|(n, d, w)| Parameter::new(ids, Id::new(*n), *d, bits(*w), None).unwrap())
            .collect();
        let ty = TypeMethod::new(
            TypeParameters::empty(),
            Some(TypeVoid::get()),
            ParameterList::new(params).unwrap(),
            Some(Id::new(name)),
        )
        .unwrap();
        Method::new(ids, Id::new(name), ty, false).unwrap()
    }

    #[test]
    fn test_struct_width_and_lookup() {
        let ids = IdAllocator::new();
        let h = TypeStruct::new(&ids, StructKind::Header, Id::new("h"), [field(&ids, "a", 8), field(&ids, "b", 24)])
            .unwrap();
        assert_eq!(h.width_bits(), 32);
        assert!(h.get_decl_by_name("b").is_some());
        assert!(h.get_decl_by_name("c").is_none());
    }

    #[test]
    fn test_union_width_is_the_widest_member() {
        let ids = IdAllocator::new();
        let u = TypeStruct::new(
            &ids,
            StructKind::HeaderUnion,
            Id::new("u"),
            [field(&ids, "a", 8), field(&ids, "b", 24)],
        )
        .unwrap();
        assert_eq!(u.width_bits(), 24);
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let ids = IdAllocator::new();
        let err = TypeStruct::new(&ids, StructKind::Struct, Id::new("s"), [field(&ids, "a", 8), field(&ids, "a", 8)])
            .unwrap_err();
        assert!(matches!(err, IrError::DuplicateDeclaration { kind: NodeKind::TypeStruct, .. }));
    }

    #[test]
    fn test_typedef_width_follows_target() {
        let ids = IdAllocator::new();
        let t = TypeTypedef::new(&ids, Id::new("mac_t"), bits(48)).unwrap();
        assert_eq!(t.width_bits(), 48);
        let named = TypeTypedef::new(&ids, Id::new("alias"), TypeName::named("mac_t").unwrap().into()).unwrap();
        assert_eq!(named.width_bits(), 0);
    }

    #[test]
    fn test_overloads_are_legal_duplicates_are_diagnosed() {
        let ids = IdAllocator::new();
        let ext = TypeExtern::new(
            &ids,
            Id::new("Checksum"),
            TypeParameters::empty(),
            [
                method(&ids, "update", &[("data", Direction::In, 8)]),
                method(&ids, "update", &[("data", Direction::In, 16)]),
                method(&ids, "update", &[("other", Direction::In, 8)]),
            ],
        )
        .unwrap();
        assert_eq!(ext.get_decls_by_name("update").count(), 3);
        let mut sink = DiagnosticCollector::new();
        assert_eq!(ext.check_duplicate_declarations(&mut sink), 1);
        assert_eq!(sink.error_count(), 1);
        assert_eq!(ext.lookup_method("update", 1).unwrap().decl.name.name, "update");
    }

    #[test]
    fn test_generic_arity_separates_overloads() {
        let ids = IdAllocator::new();
        let with_signature = |type_parameters: Arc<TypeParameters>, return_type: Node| {
            let x = Parameter::new(&ids, Id::new("x"), Direction::In, bits(8), None).unwrap();
            let ty = TypeMethod::new(type_parameters, Some(return_type), ParameterList::new([x]).unwrap(), None)
                .unwrap();
            Method::new(&ids, Id::new("read"), ty, false).unwrap()
        };
        let generic = TypeParameters::new([TypeVar::new(&ids, Id::new("T")).unwrap()]).unwrap();
        let ext = TypeExtern::new(
            &ids,
            Id::new("Port"),
            TypeParameters::empty(),
            [
                with_signature(TypeParameters::empty(), TypeVoid::get()),
                with_signature(generic, TypeVoid::get()),
                with_signature(TypeParameters::empty(), bits(8)),
            ],
        )
        .unwrap();
        let methods: Vec<Node> = ext.get_decls_by_name("read").collect();
        assert_eq!(methods.len(), 3);
        assert!(!same_signature(&methods[0], &methods[1]));
        assert!(same_signature(&methods[0], &methods[2]));
        let mut sink = DiagnosticCollector::new();
        assert_eq!(ext.check_duplicate_declarations(&mut sink), 1);
    }

    #[test]
    fn test_control_type_apply_signature() {
        let ids = IdAllocator::new();
        let p = Parameter::new(&ids, Id::new("hdr"), Direction::InOut, bits(8), None).unwrap();
        let ctl = TypeControl::new(&ids, Id::new("Ingress"), TypeParameters::empty(), ParameterList::new([p]).unwrap())
            .unwrap();
        let apply = ctl.apply_method_type().unwrap();
        assert_eq!(apply.to_string(), "void apply(inout bit<8> hdr)");
        assert!(!ctl.is_generic());
    }

    #[test]
    fn test_apply_parameter_clashing_with_type_parameter() {
        let ids = IdAllocator::new();
        let t = TypeVar::new(&ids, Id::new("T")).unwrap();
        let p = Parameter::new(&ids, Id::new("T"), Direction::In, bits(8), None).unwrap();
        let err = TypeParser::new(
            &ids,
            Id::new("P"),
            TypeParameters::new([t]).unwrap(),
            ParameterList::new([p]).unwrap(),
        )
        .unwrap_err();
        assert!(matches!(err, IrError::DuplicateDeclaration { .. }));
    }
}
