//! Base and structural types.
//!
//! Types that introduce a name (structs, externs, parser and control types,
//! type variables) live in `type_decls`.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;

use super::capability::{MayBeGeneric, Type, TypeVariable};
use super::error::{IrError, IrResult};
use super::identity::{DeclId, Id, IdAllocator};
use super::node::{Category, ChildMapper, ChildVisitor, IrNode, Node, NodeKind, NodeVector};
use super::parameters::{ParameterList, TypeParameters};
use super::path::Path;
use super::source_info::SourceInfo;

/// Defines an unsized base type that exists as one shared instance.
macro_rules! singleton_type {
    ($ty:ident, $label:literal, $width:expr) => {
        #[derive(Debug, Clone, Default)]
        pub struct $ty {
            pub src_info: SourceInfo,
        }

        impl $ty {
            /// The canonical shared instance.
            pub fn get() -> Node {
                static INSTANCE: Lazy<Node> = Lazy::new(|| Node::from(Arc::new($ty::default())));
                INSTANCE.clone()
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str($label)
            }
        }

        impl Type for $ty {
            fn width_bits(&self) -> u32 {
                $width
            }
        }

        impl IrNode for $ty {
            fn src_info(&self) -> &SourceInfo {
                &self.src_info
            }

            fn validate(&self) -> IrResult<()> {
                Ok(())
            }
        }
    };
}

singleton_type!(TypeUnknown, "unknown", 0);
singleton_type!(TypeBoolean, "bool", 1);
singleton_type!(TypeVoid, "void", 0);
singleton_type!(TypeString, "string", 0);

/// `bit<N>` or `int<N>`.
#[derive(Debug, Clone)]
pub struct TypeBits {
    pub src_info: SourceInfo,
    pub size: u32,
    pub signed: bool,
}

impl TypeBits {
    pub fn new(src_info: SourceInfo, size: u32, signed: bool) -> IrResult<Arc<Self>> {
        TypeBits { src_info, size, signed }.finish()
    }

    pub fn bits(size: u32) -> IrResult<Arc<Self>> {
        TypeBits::new(SourceInfo::invalid(), size, false)
    }
}

impl fmt::Display for TypeBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<{}>", if self.signed { "int" } else { "bit" }, self.size)
    }
}

impl Type for TypeBits {
    fn width_bits(&self) -> u32 {
        self.size
    }
}

impl IrNode for TypeBits {
    fn src_info(&self) -> &SourceInfo {
        &self.src_info
    }

    fn validate(&self) -> IrResult<()> {
        if self.signed && self.size == 0 {
            return Err(IrError::invalid(NodeKind::TypeBits, "int<0> has no sign bit"));
        }
        Ok(())
    }
}

/// `varbit<N>`: width is the maximum size.
#[derive(Debug, Clone)]
pub struct TypeVarbits {
    pub src_info: SourceInfo,
    pub size: u32,
}

impl TypeVarbits {
    pub fn new(src_info: SourceInfo, size: u32) -> IrResult<Arc<Self>> {
        TypeVarbits { src_info, size }.finish()
    }
}

impl fmt::Display for TypeVarbits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "varbit<{}>", self.size)
    }
}

impl Type for TypeVarbits {
    fn width_bits(&self) -> u32 {
        self.size
    }
}

impl IrNode for TypeVarbits {
    fn src_info(&self) -> &SourceInfo {
        &self.src_info
    }

    fn validate(&self) -> IrResult<()> {
        if self.size == 0 {
            return Err(IrError::invalid(NodeKind::TypeVarbits, "varbit size must be positive"));
        }
        Ok(())
    }
}

/// Type of an unsized integer literal. Each occurrence is a distinct type
/// variable until inference unifies it.
#[derive(Debug, Clone)]
pub struct TypeInfInt {
    pub src_info: SourceInfo,
    pub decl_id: DeclId,
    var_name: String,
}

impl TypeInfInt {
    pub fn new(ids: &IdAllocator, src_info: SourceInfo) -> IrResult<Arc<Self>> {
        let decl_id = ids.fresh();
        TypeInfInt { src_info, decl_id, var_name: format!("int_{}", decl_id) }.finish()
    }
}

impl fmt::Display for TypeInfInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("int")
    }
}

impl Type for TypeInfInt {}

impl TypeVariable for TypeInfInt {
    fn var_name(&self) -> &str {
        &self.var_name
    }

    fn declaration_id(&self) -> DeclId {
        self.decl_id
    }

    fn as_type(&self) -> Node {
        Node::from(Arc::new(self.clone()))
    }
}

impl IrNode for TypeInfInt {
    fn src_info(&self) -> &SourceInfo {
        &self.src_info
    }

    fn validate(&self) -> IrResult<()> {
        Ok(())
    }

    fn dbprint_label(&self) -> String {
        format!("int/{}", self.decl_id)
    }
}

/// Reference to a declared type by name.
#[derive(Debug, Clone)]
pub struct TypeName {
    pub src_info: SourceInfo,
    pub path: Arc<Path>,
}

impl TypeName {
    pub fn new(path: Arc<Path>) -> IrResult<Arc<Self>> {
        TypeName { src_info: path.src_info.clone(), path }.finish()
    }

    /// Relative reference to `name`.
    pub fn named(name: &str) -> IrResult<Arc<Self>> {
        TypeName::new(Path::named(name)?)
    }

    /// Reference to a declaration, keeping its internal and original names.
    pub fn referring_to(name: &Id) -> IrResult<Arc<Self>> {
        TypeName::new(Path::new(name.clone(), false)?)
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path)
    }
}

impl Type for TypeName {}

impl IrNode for TypeName {
    fn src_info(&self) -> &SourceInfo {
        &self.src_info
    }

    fn validate(&self) -> IrResult<()> {
        Ok(())
    }

    fn dbprint_label(&self) -> String {
        self.path.as_string()
    }

    fn visit_children(&self, v: &mut ChildVisitor<'_>) {
        v.typed(&self.path);
    }

    fn map_children(&self, m: &mut ChildMapper<'_>) -> IrResult<Option<Self>> {
        let path = m.typed(&self.path)?;
        Ok(m.changed().then(|| TypeName { path, ..self.clone() }))
    }
}

/// A generic type applied to arguments: `Register<bit<32>>`.
#[derive(Debug, Clone)]
pub struct TypeSpecialized {
    pub src_info: SourceInfo,
    pub base_type: Arc<TypeName>,
    pub arguments: NodeVector,
}

impl TypeSpecialized {
    pub fn new(base_type: Arc<TypeName>, arguments: impl IntoIterator<Item = Node>) -> IrResult<Arc<Self>> {
        TypeSpecialized {
            src_info: base_type.src_info.clone(),
            base_type,
            arguments: arguments.into_iter().collect(),
        }
        .finish()
    }
}

impl fmt::Display for TypeSpecialized {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<", self.base_type)?;
        for (i, a) in self.arguments.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", a)?;
        }
        write!(f, ">")
    }
}

impl Type for TypeSpecialized {}

impl IrNode for TypeSpecialized {
    fn src_info(&self) -> &SourceInfo {
        &self.src_info
    }

    fn validate(&self) -> IrResult<()> {
        for a in self.arguments.iter() {
            Category::Type.require(NodeKind::TypeSpecialized, "arguments", a)?;
        }
        Ok(())
    }

    fn visit_children(&self, v: &mut ChildVisitor<'_>) {
        v.typed(&self.base_type);
        v.vector(&self.arguments);
    }

    fn map_children(&self, m: &mut ChildMapper<'_>) -> IrResult<Option<Self>> {
        let base_type = m.typed(&self.base_type)?;
        let arguments = m.vector(&self.arguments)?;
        Ok(m.changed().then(|| TypeSpecialized { base_type, arguments, ..self.clone() }))
    }
}

/// Signature of a method, function or constructor.
#[derive(Debug, Clone)]
pub struct TypeMethod {
    pub src_info: SourceInfo,
    pub type_parameters: Arc<TypeParameters>,
    /// Absent for constructors.
    pub return_type: Option<Node>,
    pub parameters: Arc<ParameterList>,
    pub name: Option<Id>,
}

impl TypeMethod {
    pub fn new(
        type_parameters: Arc<TypeParameters>,
        return_type: Option<Node>,
        parameters: Arc<ParameterList>,
        name: Option<Id>,
    ) -> IrResult<Arc<Self>> {
        let src_info = name.as_ref().map(|n| n.src_info.clone()).unwrap_or_default();
        let src_info = src_info.or_else(|| parameters.src_info.clone());
        TypeMethod { src_info, type_parameters, return_type, parameters, name }.finish()
    }
}

impl fmt::Display for TypeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ret) = &self.return_type {
            write!(f, "{} ", ret)?;
        }
        if let Some(name) = &self.name {
            write!(f, "{}", name)?;
        }
        write!(f, "{}{}", self.type_parameters, self.parameters)
    }
}

impl Type for TypeMethod {}

impl MayBeGeneric for TypeMethod {
    fn type_parameters(&self) -> &Arc<TypeParameters> {
        &self.type_parameters
    }
}

impl IrNode for TypeMethod {
    fn src_info(&self) -> &SourceInfo {
        &self.src_info
    }

    fn validate(&self) -> IrResult<()> {
        if let Some(ret) = &self.return_type {
            Category::Type.require(NodeKind::TypeMethod, "return_type", ret)?;
        }
        if let Some(name) = &self.name {
            name.require_non_empty(NodeKind::TypeMethod)?;
        }
        Ok(())
    }

    fn visit_children(&self, v: &mut ChildVisitor<'_>) {
        v.typed(&self.type_parameters);
        v.optional(&self.return_type);
        v.typed(&self.parameters);
    }

    fn map_children(&self, m: &mut ChildMapper<'_>) -> IrResult<Option<Self>> {
        let type_parameters = m.typed(&self.type_parameters)?;
        let return_type = m.optional(&self.return_type)?;
        let parameters = m.typed(&self.parameters)?;
        Ok(m.changed().then(|| TypeMethod { type_parameters, return_type, parameters, ..self.clone() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_is_a_singleton() {
        assert!(TypeUnknown::get().ptr_eq(&TypeUnknown::get()));
        assert!(TypeBoolean::get().ptr_eq(&TypeBoolean::get()));
    }

    #[test]
    fn test_bits_display_and_width() {
        let b = TypeBits::new(SourceInfo::invalid(), 8, false).unwrap();
        let i = TypeBits::new(SourceInfo::invalid(), 16, true).unwrap();
        assert_eq!(b.to_string(), "bit<8>");
        assert_eq!(i.to_string(), "int<16>");
        assert_eq!(b.width_bits(), 8);
        assert!(TypeBits::new(SourceInfo::invalid(), 0, true).is_err());
    }

    #[test]
    fn test_inf_int_variables_are_distinct() {
        let ids = IdAllocator::new();
        let a = TypeInfInt::new(&ids, SourceInfo::invalid()).unwrap();
        let b = TypeInfInt::new(&ids, SourceInfo::invalid()).unwrap();
        assert_ne!(a.declaration_id(), b.declaration_id());
        assert_ne!(a.var_name(), b.var_name());
        assert_eq!(a.to_string(), "int");
    }

    #[test]
    fn test_specialized_display() {
        let base = TypeName::named("Register").unwrap();
        let arg: Node = TypeBits::bits(32).unwrap().into();
        let ty = TypeSpecialized::new(base, [arg]).unwrap();
        assert_eq!(ty.to_string(), "Register<bit<32>>");
    }

    #[test]
    fn test_specialized_rejects_non_type_arguments() {
        let base = TypeName::named("Register").unwrap();
        let not_a_type: Node = Path::named("x").unwrap().into();
        assert!(TypeSpecialized::new(base, [not_a_type]).is_err());
    }
}
