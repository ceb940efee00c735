use std::fmt;
use std::sync::Arc;

use super::{ChildMapper, ChildVisitor, IrNode, NodePayload, VisitOptions};
use crate::ir::annotations::{Annotation, Annotations};
use crate::ir::blocks::{P4Control, P4Parser, P4Program, P4Table, ParserState};
use crate::ir::declarations::{DeclarationConstant, DeclarationInstance, DeclarationVariable, P4Action};
use crate::ir::error::IrResult;
use crate::ir::expressions::{
    BinaryOp, BoolLiteral, Constant, Member, MethodCallExpression, PathExpression, StringLiteral, UnaryOp,
};
use crate::ir::parameters::{Parameter, ParameterList, TypeParameters};
use crate::ir::path::Path;
use crate::ir::source_info::SourceInfo;
use crate::ir::statements::{AssignmentStatement, BlockStatement, MethodCallStatement};
use crate::ir::type_decls::{Method, StructField, TypeControl, TypeExtern, TypeParser, TypeStruct, TypeTypedef, TypeVar};
use crate::ir::types::{
    TypeBits, TypeBoolean, TypeInfInt, TypeMethod, TypeName, TypeSpecialized, TypeString, TypeUnknown, TypeVarbits,
    TypeVoid,
};

/// Generates the closed node enumeration, its kind tags, the payload links
/// and the kind-dispatched protocol methods from one table of payload types.
macro_rules! node_kinds {
    ($($variant:ident),* $(,)?) => {
        /// Any IR entity. Each variant shares its payload through an `Arc`;
        /// cloning a `Node` never copies the payload, and two `Node`s are the
        /// same object when [`Node::ptr_eq`] holds.
        #[derive(Debug, Clone)]
        pub enum Node {
            $($variant(Arc<$variant>),)*
        }

        /// Fieldless tag for each node kind.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum NodeKind {
            $($variant,)*
        }

        impl NodeKind {
            pub const ALL: &'static [NodeKind] = &[$(NodeKind::$variant,)*];

            pub fn name(self) -> &'static str {
                match self {
                    $(NodeKind::$variant => stringify!($variant),)*
                }
            }

            pub fn from_name(name: &str) -> Option<NodeKind> {
                match name {
                    $(stringify!($variant) => Some(NodeKind::$variant),)*
                    _ => None,
                }
            }
        }

        $(
            impl NodePayload for $variant {
                const KIND: NodeKind = NodeKind::$variant;

                fn into_node(this: Arc<Self>) -> Node {
                    Node::$variant(this)
                }

                fn from_node(node: &Node) -> Option<&Arc<Self>> {
                    match node {
                        Node::$variant(payload) => Some(payload),
                        _ => None,
                    }
                }
            }

            impl From<Arc<$variant>> for Node {
                fn from(payload: Arc<$variant>) -> Node {
                    Node::$variant(payload)
                }
            }
        )*

        impl Node {
            pub fn kind(&self) -> NodeKind {
                match self {
                    $(Node::$variant(_) => NodeKind::$variant,)*
                }
            }

            pub fn src_info(&self) -> &SourceInfo {
                match self {
                    $(Node::$variant(n) => n.src_info(),)*
                }
            }

            pub fn validate(&self) -> IrResult<()> {
                match self {
                    $(Node::$variant(n) => n.validate(),)*
                }
            }

            pub fn dbprint_label(&self) -> String {
                match self {
                    $(Node::$variant(n) => n.dbprint_label(),)*
                }
            }

            /// Calls `f` on every traversable child, in source order.
            pub fn visit_children(&self, options: VisitOptions, f: &mut dyn FnMut(&Node)) {
                let mut visitor = ChildVisitor::new(options, f);
                match self {
                    $(Node::$variant(n) => n.visit_children(&mut visitor),)*
                }
            }

            /// Rebuilds this node with every traversable child replaced by
            /// `f(child)`. Returns this very node when no child changed;
            /// otherwise a validated shallow copy.
            pub fn rewrite_children(
                &self,
                options: VisitOptions,
                f: &mut dyn FnMut(&Node) -> IrResult<Node>,
            ) -> IrResult<Node> {
                let mut mapper = ChildMapper::new(options, f);
                match self {
                    $(Node::$variant(n) => match n.map_children(&mut mapper)? {
                        None => Ok(self.clone()),
                        Some(copy) => Ok(Node::$variant(copy.finish()?)),
                    },)*
                }
            }

            /// Address of the shared payload; stable for as long as the node
            /// is alive.
            pub fn as_ptr(&self) -> *const () {
                match self {
                    $(Node::$variant(n) => Arc::as_ptr(n) as *const (),)*
                }
            }
        }

        impl fmt::Display for Node {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $(Node::$variant(n) => fmt::Display::fmt(n.as_ref(), f),)*
                }
            }
        }
    };
}

node_kinds! {
    // Types
    TypeUnknown,
    TypeBoolean,
    TypeVoid,
    TypeString,
    TypeBits,
    TypeVarbits,
    TypeInfInt,
    TypeName,
    TypeSpecialized,
    TypeMethod,
    // Declarations that introduce a type
    TypeVar,
    TypeStruct,
    TypeTypedef,
    TypeExtern,
    TypeParser,
    TypeControl,
    P4Parser,
    P4Control,
    // Names, metadata and collections
    Path,
    Annotation,
    Annotations,
    TypeParameters,
    ParameterList,
    P4Program,
    // Declarations
    StructField,
    Parameter,
    Method,
    DeclarationVariable,
    DeclarationConstant,
    DeclarationInstance,
    P4Action,
    P4Table,
    ParserState,
    // Expressions
    Constant,
    BoolLiteral,
    StringLiteral,
    PathExpression,
    Member,
    BinaryOp,
    UnaryOp,
    MethodCallExpression,
    // Statements
    BlockStatement,
    AssignmentStatement,
    MethodCallStatement,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Node {
    /// Identity comparison: both handles share one payload.
    pub fn ptr_eq(&self, other: &Node) -> bool {
        std::ptr::eq(self.as_ptr(), other.as_ptr())
    }

    /// Typed view of the payload, when this node is a `T`.
    pub fn to<T: NodePayload>(&self) -> Option<&Arc<T>> {
        T::from_node(self)
    }

    pub fn is<T: NodePayload>(&self) -> bool {
        T::from_node(self).is_some()
    }
}
