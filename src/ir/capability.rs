//! Capability interfaces.
//!
//! Each capability is an independent trait a payload implements alongside
//! [`IrNode`](super::node::IrNode); a `Node` exposes them through the
//! `as_*` casts in `node_impl`. Nothing here forms an inheritance chain: a
//! type declaration implements both [`Type`] and [`Declaration`] by
//! composition.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::annotations::{Annotation, Annotations, PredefinedAnnotation};
use super::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink};
use super::error::{IrError, IrResult};
use super::identity::{DeclId, Id};
use super::node::{Node, NodeKind};
use super::parameters::{ParameterList, TypeParameters};
use super::source_info::SourceInfo;
use super::types::TypeMethod;

/// Name of the single apply entry point of parsers, controls and tables.
pub const APPLY_METHOD_NAME: &str = "apply";

/// A named entity with a session-unique identity.
pub trait Declaration {
    fn name(&self) -> &Id;

    fn decl_id(&self) -> DeclId;

    /// Name exposed to the control plane: the `@name` annotation when
    /// present, the name as written otherwise.
    fn external_name(&self) -> String {
        self.name().original_name.clone()
    }
}

pub trait Annotated {
    fn annotations(&self) -> &Arc<Annotations>;

    fn get_annotation(&self, name: &str) -> Option<&Arc<Annotation>> {
        self.annotations().get_single(name)
    }
}

/// Marker for nodes that evaluate at compile time.
pub trait CompileTimeValue {}

pub trait MayBeGeneric {
    /// Empty, never absent, when the node takes no type parameters.
    fn type_parameters(&self) -> &Arc<TypeParameters>;

    fn is_generic(&self) -> bool {
        !self.type_parameters().is_empty()
    }
}

pub trait HasApply {
    fn apply_parameters(&self) -> Arc<ParameterList>;

    /// Signature of the `apply` method.
    fn apply_method_type(&self) -> IrResult<Arc<TypeMethod>>;
}

/// A generic declaration that is instantiated through a constructor.
pub trait Container: MayBeGeneric + Declaration {
    fn constructor_parameters(&self) -> &Arc<ParameterList>;

    fn constructor_method_type(&self) -> IrResult<Arc<TypeMethod>>;
}

pub trait TypeVariable {
    fn var_name(&self) -> &str;

    fn declaration_id(&self) -> DeclId;

    /// The variable reinterpreted as a type node.
    fn as_type(&self) -> Node;
}

/// A named, typed value.
pub trait Instance {
    fn instance_name(&self) -> &Id;

    fn instance_type(&self) -> &Node;
}

pub trait Type {
    /// Static width in bits; 0 when not statically sized.
    fn width_bits(&self) -> u32 {
        0
    }
}

pub trait Namespace {
    /// Declarations visible in this scope, in declaration order.
    fn declarations(&self) -> Box<dyn Iterator<Item = Node> + '_>;
}

/// One declaration per name. Uniqueness is checked when the namespace is
/// constructed, so a lookup finds at most one match.
pub trait SimpleNamespace: Namespace {
    fn get_decl_by_name(&self, name: &str) -> Option<Node> {
        self.declarations().find(|d| d.declared_name() == Some(name))
    }
}

/// Several declarations may share a name (overloads).
pub trait GeneralNamespace: Namespace {
    fn get_decls_by_name<'a>(&'a self, name: &'a str) -> Box<dyn Iterator<Item = Node> + 'a> {
        Box::new(self.declarations().filter(move |d| d.declared_name() == Some(name)))
    }

    /// Reports every declaration that repeats an earlier one with the same
    /// name and signature. Returns the number of diagnostics reported.
    fn check_duplicate_declarations(&self, sink: &mut dyn DiagnosticSink) -> usize {
        let mut seen: FxHashMap<String, Vec<Node>> = FxHashMap::default();
        let mut reported = 0;
        for decl in self.declarations() {
            let Some(name) = decl.declared_name().map(str::to_owned) else {
                continue;
            };
            let earlier = seen.entry(name).or_default();
            if let Some(previous) = earlier.iter().find(|p| same_signature(p, &decl)) {
                let message = format!(
                    "{}: duplicate declaration, previously declared at {}",
                    decl,
                    previous.src_info()
                );
                sink.report(Diagnostic::error(DiagnosticKind::Duplicate, decl.src_info().clone(), message));
                reported += 1;
            }
            earlier.push(decl);
        }
        reported
    }
}

/// Whether two same-named declarations collide. Methods collide when they
/// take the same number of type parameters and their parameter lists agree
/// pairwise in direction and type. Return types are not part of the
/// signature, so methods differing only there collide. Any other pair of
/// declarations collides on the name alone.
pub fn same_signature(a: &Node, b: &Node) -> bool {
    match (a, b) {
        (Node::Method(a), Node::Method(b)) => {
            let (pa, pb) = (&a.ty.parameters, &b.ty.parameters);
            a.ty.type_parameters.len() == b.ty.type_parameters.len()
                && pa.len() == pb.len()
                && pa
                    .iter()
                    .zip(pb.iter())
                    .all(|(x, y)| x.direction == y.direction && x.ty.equiv(&y.ty))
        }
        (Node::Method(_), _) | (_, Node::Method(_)) => false,
        _ => true,
    }
}

/// Validation helper for strict namespaces: fails on the first name that
/// repeats.
pub(crate) fn check_unique_names<'a>(
    kind: NodeKind,
    decls: impl IntoIterator<Item = (&'a Id, &'a SourceInfo)>,
) -> IrResult<()> {
    let mut index: FxHashMap<&str, &SourceInfo> = FxHashMap::default();
    for (name, src_info) in decls {
        if name.is_dont_care() {
            continue;
        }
        if let Some(previous) = index.insert(name.name.as_str(), src_info) {
            return Err(IrError::DuplicateDeclaration {
                kind,
                name: name.to_string(),
                src_info: src_info.clone(),
                previous: previous.clone(),
            });
        }
    }
    Ok(())
}

/// The control-plane name carried by `annotations`, if any.
pub(crate) fn control_plane_name(annotations: &Annotations) -> Option<String> {
    annotations
        .get_single(PredefinedAnnotation::Name.key())
        .and_then(|a| a.control_plane_name())
}

/// Implements [`Declaration`] for a payload with a `decl: DeclInfo` field,
/// plus the `with_name` copy-on-write setter. The `annotated` form also
/// implements [`Annotated`] over an `annotations` field, honors `@name` in
/// `external_name` and adds `with_annotations`. The `annotated, own_rename`
/// form leaves `with_name` to the payload, for declarations whose derived
/// parts follow their name.
macro_rules! impl_declaration {
    ($ty:ident) => {
        impl $crate::ir::capability::Declaration for $ty {
            fn name(&self) -> &$crate::ir::identity::Id {
                &self.decl.name
            }

            fn decl_id(&self) -> $crate::ir::identity::DeclId {
                self.decl.decl_id
            }
        }

        impl $ty {
            /// Same declaration under a new internal name.
            pub fn with_name(&self, name: &str) -> $crate::ir::error::IrResult<::std::sync::Arc<Self>> {
                let mut copy = self.clone();
                copy.decl = self.decl.renamed(name);
                $crate::ir::node::IrNode::finish(copy)
            }
        }
    };
    ($ty:ident, annotated) => {
        impl $crate::ir::capability::Declaration for $ty {
            fn name(&self) -> &$crate::ir::identity::Id {
                &self.decl.name
            }

            fn decl_id(&self) -> $crate::ir::identity::DeclId {
                self.decl.decl_id
            }

            fn external_name(&self) -> String {
                $crate::ir::capability::control_plane_name(&self.annotations)
                    .unwrap_or_else(|| self.decl.name.original_name.clone())
            }
        }

        impl $ty {
            /// Same declaration under a new internal name.
            pub fn with_name(&self, name: &str) -> $crate::ir::error::IrResult<::std::sync::Arc<Self>> {
                let mut copy = self.clone();
                copy.decl = self.decl.renamed(name);
                $crate::ir::node::IrNode::finish(copy)
            }
        }

        $crate::ir::capability::impl_annotated!($ty);
    };
    ($ty:ident, annotated, own_rename) => {
        impl $crate::ir::capability::Declaration for $ty {
            fn name(&self) -> &$crate::ir::identity::Id {
                &self.decl.name
            }

            fn decl_id(&self) -> $crate::ir::identity::DeclId {
                self.decl.decl_id
            }

            fn external_name(&self) -> String {
                $crate::ir::capability::control_plane_name(&self.annotations)
                    .unwrap_or_else(|| self.decl.name.original_name.clone())
            }
        }

        $crate::ir::capability::impl_annotated!($ty);
    };
}

/// Implements [`Annotated`] over an `annotations` field, plus the
/// `with_annotations` copy-on-write setter. A set location is extended to
/// cover the new annotations.
macro_rules! impl_annotated {
    ($ty:ident) => {
        impl $crate::ir::capability::Annotated for $ty {
            fn annotations(&self) -> &::std::sync::Arc<$crate::ir::annotations::Annotations> {
                &self.annotations
            }
        }

        impl $ty {
            pub fn with_annotations(
                &self,
                annotations: ::std::sync::Arc<$crate::ir::annotations::Annotations>,
            ) -> $crate::ir::error::IrResult<::std::sync::Arc<Self>> {
                let mut copy = self.clone();
                if copy.src_info.is_valid() {
                    copy.src_info = copy.src_info.merge(&annotations.src_info);
                }
                copy.annotations = annotations;
                $crate::ir::node::IrNode::finish(copy)
            }
        }
    };
}

pub(crate) use impl_annotated;
pub(crate) use impl_declaration;
