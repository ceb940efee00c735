//! JSON export and import.
//!
//! Every node becomes one object tagged by `Node_Type`. Export writes both
//! the internal and the original spelling of each name together with source
//! locations. Import goes back through the ordinary constructors, so every
//! node is validated again and declarations get fresh ids from the session
//! allocator.
//!
//! A node reachable along several paths is written once. Its first
//! occurrence carries a `Node_ID` and the full object; later occurrences are
//! a bare `{"Node_ID": n}`. Import resolves those references to the node
//! already built, so shared subtrees stay shared and a declaration keeps a
//! single identity. Hand-written input may leave `Node_ID` out entirely.

use std::cell::RefCell;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::annotations::{Annotation, Annotations};
use super::blocks::{P4Control, P4Parser, P4Program, P4Table, ParserState};
use super::declarations::{DeclarationConstant, DeclarationInstance, DeclarationVariable, P4Action};
use super::error::{IrError, IrResult};
use super::expressions::{
    BinaryOp, BinaryOperator, BoolLiteral, Constant, Member, MethodCallExpression, PathExpression, StringLiteral,
    UnaryOp, UnaryOperator,
};
use super::identity::{Id, IdAllocator};
use super::node::{Node, NodeKind, NodePayload, TypedVector};
use super::parameters::{Direction, Parameter, ParameterList, TypeParameters};
use super::path::Path;
use super::source_info::{SourceInfo, SourceInfoRepr};
use super::statements::{AssignmentStatement, BlockStatement, MethodCallStatement};
use super::type_decls::{Method, StructField, StructKind, TypeControl, TypeExtern, TypeParser, TypeStruct, TypeTypedef, TypeVar};
use super::types::{
    TypeBits, TypeBoolean, TypeInfInt, TypeMethod, TypeName, TypeSpecialized, TypeString, TypeUnknown, TypeVarbits,
    TypeVoid,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonId {
    pub name: String,
    pub original_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<SourceInfoRepr>,
}

impl From<&Id> for JsonId {
    fn from(id: &Id) -> Self {
        JsonId { name: id.name.clone(), original_name: id.original_name.clone(), src: id.src_info.to_repr() }
    }
}

impl JsonId {
    fn to_id(&self) -> Id {
        Id {
            src_info: SourceInfo::from_repr(self.src.clone()),
            name: self.name.clone(),
            original_name: self.original_name.clone(),
        }
    }
}

type Child = Box<JsonNode>;

/// One node in the JSON tree: a definition, or a reference to a node
/// defined earlier in the document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonNode {
    #[serde(rename = "Node_ID", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(flatten)]
    pub body: Option<JsonBody>,
}

/// Serialized fields of a node, tagged by kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "Node_Type")]
pub enum JsonBody {
    TypeUnknown,
    TypeBoolean,
    TypeVoid,
    TypeString,
    TypeBits {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        src: Option<SourceInfoRepr>,
        size: u32,
        signed: bool,
    },
    TypeVarbits {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        src: Option<SourceInfoRepr>,
        size: u32,
    },
    TypeInfInt {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        src: Option<SourceInfoRepr>,
    },
    TypeName {
        path: Child,
    },
    TypeSpecialized {
        base_type: Child,
        #[serde(default)]
        arguments: Vec<JsonNode>,
    },
    TypeMethod {
        type_parameters: Child,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        return_type: Option<Child>,
        parameters: Child,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<JsonId>,
    },
    TypeVar {
        name: JsonId,
    },
    TypeStruct {
        name: JsonId,
        struct_kind: StructKind,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        annotations: Vec<JsonNode>,
        #[serde(default)]
        fields: Vec<JsonNode>,
    },
    TypeTypedef {
        name: JsonId,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        annotations: Vec<JsonNode>,
        #[serde(rename = "type")]
        ty: Child,
    },
    TypeExtern {
        name: JsonId,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        annotations: Vec<JsonNode>,
        type_parameters: Child,
        #[serde(default)]
        methods: Vec<JsonNode>,
    },
    TypeParser {
        name: JsonId,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        annotations: Vec<JsonNode>,
        type_parameters: Child,
        apply_params: Child,
    },
    TypeControl {
        name: JsonId,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        annotations: Vec<JsonNode>,
        type_parameters: Child,
        apply_params: Child,
    },
    P4Parser {
        #[serde(rename = "type")]
        ty: Child,
        constructor_params: Child,
        #[serde(default)]
        locals: Vec<JsonNode>,
        #[serde(default)]
        states: Vec<JsonNode>,
    },
    P4Control {
        #[serde(rename = "type")]
        ty: Child,
        constructor_params: Child,
        #[serde(default)]
        locals: Vec<JsonNode>,
        body: Child,
    },
    Path {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        src: Option<SourceInfoRepr>,
        name: JsonId,
        absolute: bool,
    },
    Annotation {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        src: Option<SourceInfoRepr>,
        name: JsonId,
        #[serde(default)]
        expressions: Vec<JsonNode>,
    },
    Annotations {
        #[serde(default)]
        annotations: Vec<JsonNode>,
    },
    TypeParameters {
        #[serde(default)]
        parameters: Vec<JsonNode>,
    },
    ParameterList {
        #[serde(default)]
        parameters: Vec<JsonNode>,
    },
    P4Program {
        #[serde(default)]
        objects: Vec<JsonNode>,
    },
    StructField {
        name: JsonId,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        annotations: Vec<JsonNode>,
        #[serde(rename = "type")]
        ty: Child,
    },
    Parameter {
        name: JsonId,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        annotations: Vec<JsonNode>,
        direction: Direction,
        #[serde(rename = "type")]
        ty: Child,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default_value: Option<Child>,
    },
    Method {
        name: JsonId,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        annotations: Vec<JsonNode>,
        #[serde(rename = "type")]
        ty: Child,
        is_abstract: bool,
    },
    DeclarationVariable {
        name: JsonId,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        annotations: Vec<JsonNode>,
        #[serde(rename = "type")]
        ty: Child,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        initializer: Option<Child>,
    },
    DeclarationConstant {
        name: JsonId,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        annotations: Vec<JsonNode>,
        #[serde(rename = "type")]
        ty: Child,
        initializer: Child,
    },
    DeclarationInstance {
        name: JsonId,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        annotations: Vec<JsonNode>,
        #[serde(rename = "type")]
        ty: Child,
        #[serde(default)]
        arguments: Vec<JsonNode>,
    },
    P4Action {
        name: JsonId,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        annotations: Vec<JsonNode>,
        parameters: Child,
        body: Child,
    },
    P4Table {
        name: JsonId,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        annotations: Vec<JsonNode>,
        #[serde(default)]
        actions: Vec<JsonNode>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default_action: Option<Child>,
    },
    ParserState {
        name: JsonId,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        annotations: Vec<JsonNode>,
        #[serde(default)]
        components: Vec<JsonNode>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        select_expression: Option<Child>,
    },
    Constant {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        src: Option<SourceInfoRepr>,
        #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
        ty: Option<Child>,
        /// Decimal text; the value range exceeds what tagged JSON numbers carry.
        value: String,
        base: u32,
    },
    BoolLiteral {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        src: Option<SourceInfoRepr>,
        #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
        ty: Option<Child>,
        value: bool,
    },
    StringLiteral {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        src: Option<SourceInfoRepr>,
        #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
        ty: Option<Child>,
        value: String,
    },
    PathExpression {
        #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
        ty: Option<Child>,
        path: Child,
    },
    Member {
        #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
        ty: Option<Child>,
        expr: Child,
        member: JsonId,
    },
    BinaryOp {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        src: Option<SourceInfoRepr>,
        #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
        ty: Option<Child>,
        op: BinaryOperator,
        left: Child,
        right: Child,
    },
    UnaryOp {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        src: Option<SourceInfoRepr>,
        #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
        ty: Option<Child>,
        op: UnaryOperator,
        expr: Child,
    },
    MethodCallExpression {
        #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
        ty: Option<Child>,
        method: Child,
        #[serde(default)]
        type_arguments: Vec<JsonNode>,
        #[serde(default)]
        arguments: Vec<JsonNode>,
    },
    BlockStatement {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        src: Option<SourceInfoRepr>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        annotations: Vec<JsonNode>,
        #[serde(default)]
        components: Vec<JsonNode>,
    },
    AssignmentStatement {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        src: Option<SourceInfoRepr>,
        left: Child,
        right: Child,
    },
    MethodCallStatement {
        call: Child,
    },
}

pub fn to_json_string(node: &Node) -> IrResult<String> {
    Ok(serde_json::to_string_pretty(&export(node))?)
}

pub fn from_json_str(text: &str, ids: &IdAllocator) -> IrResult<Node> {
    let json: JsonNode = serde_json::from_str(text)?;
    Importer { ids, imported: RefCell::default() }.node(&json)
}

// ---- export ----

pub fn export(node: &Node) -> JsonNode {
    Exporter::default().node(node)
}

/// Numbers nodes in first-visit order. Keys are payload addresses, which
/// stay valid because the exported tree is borrowed for the whole export.
#[derive(Default)]
struct Exporter {
    emitted: FxHashMap<usize, u64>,
}

impl Exporter {
    fn node(&mut self, node: &Node) -> JsonNode {
        let key = node.as_ptr() as usize;
        if let Some(id) = self.emitted.get(&key) {
            return JsonNode { id: Some(*id), body: None };
        }
        let id = self.emitted.len() as u64;
        self.emitted.insert(key, id);
        JsonNode { id: Some(id), body: Some(self.body(node)) }
    }

    fn body(&mut self, node: &Node) -> JsonBody {
        match node {
            Node::TypeUnknown(_) => JsonBody::TypeUnknown,
            Node::TypeBoolean(_) => JsonBody::TypeBoolean,
            Node::TypeVoid(_) => JsonBody::TypeVoid,
            Node::TypeString(_) => JsonBody::TypeString,
            Node::TypeBits(t) => JsonBody::TypeBits { src: t.src_info.to_repr(), size: t.size, signed: t.signed },
            Node::TypeVarbits(t) => JsonBody::TypeVarbits { src: t.src_info.to_repr(), size: t.size },
            Node::TypeInfInt(t) => JsonBody::TypeInfInt { src: t.src_info.to_repr() },
            Node::TypeName(t) => JsonBody::TypeName { path: self.child(&t.path) },
            Node::TypeSpecialized(t) => JsonBody::TypeSpecialized {
                base_type: self.child(&t.base_type),
                arguments: t.arguments.iter().map(|n| self.node(n)).collect(),
            },
            Node::TypeMethod(t) => JsonBody::TypeMethod {
                type_parameters: self.child(&t.type_parameters),
                return_type: t.return_type.as_ref().map(|r| Box::new(self.node(r))),
                parameters: self.child(&t.parameters),
                name: t.name.as_ref().map(JsonId::from),
            },
            Node::TypeVar(t) => JsonBody::TypeVar { name: (&t.decl.name).into() },
            Node::TypeStruct(t) => JsonBody::TypeStruct {
                name: (&t.decl.name).into(),
                struct_kind: t.kind,
                annotations: self.annotations(&t.annotations),
                fields: self.typed_list(&t.fields),
            },
            Node::TypeTypedef(t) => JsonBody::TypeTypedef {
                name: (&t.decl.name).into(),
                annotations: self.annotations(&t.annotations),
                ty: Box::new(self.node(&t.ty)),
            },
            Node::TypeExtern(t) => JsonBody::TypeExtern {
                name: (&t.decl.name).into(),
                annotations: self.annotations(&t.annotations),
                type_parameters: self.child(&t.type_parameters),
                methods: self.typed_list(&t.methods),
            },
            Node::TypeParser(t) => JsonBody::TypeParser {
                name: (&t.decl.name).into(),
                annotations: self.annotations(&t.annotations),
                type_parameters: self.child(&t.type_parameters),
                apply_params: self.child(&t.apply_params),
            },
            Node::TypeControl(t) => JsonBody::TypeControl {
                name: (&t.decl.name).into(),
                annotations: self.annotations(&t.annotations),
                type_parameters: self.child(&t.type_parameters),
                apply_params: self.child(&t.apply_params),
            },
            Node::P4Parser(p) => JsonBody::P4Parser {
                ty: self.child(&p.ty),
                constructor_params: self.child(&p.constructor_params),
                locals: p.locals.iter().map(|n| self.node(n)).collect(),
                states: self.typed_list(&p.states),
            },
            Node::P4Control(c) => JsonBody::P4Control {
                ty: self.child(&c.ty),
                constructor_params: self.child(&c.constructor_params),
                locals: c.locals.iter().map(|n| self.node(n)).collect(),
                body: self.child(&c.body),
            },
            Node::Path(p) => JsonBody::Path { src: p.src_info.to_repr(), name: (&p.name).into(), absolute: p.absolute },
            Node::Annotation(a) => JsonBody::Annotation {
                src: a.src_info.to_repr(),
                name: (&a.name).into(),
                expressions: a.expressions.iter().map(|n| self.node(n)).collect(),
            },
            Node::Annotations(a) => JsonBody::Annotations { annotations: self.annotations(a) },
            Node::TypeParameters(t) => JsonBody::TypeParameters { parameters: self.typed_list(&t.parameters) },
            Node::ParameterList(p) => JsonBody::ParameterList { parameters: self.typed_list(&p.parameters) },
            Node::P4Program(p) => JsonBody::P4Program { objects: p.objects.iter().map(|n| self.node(n)).collect() },
            Node::StructField(f) => JsonBody::StructField {
                name: (&f.decl.name).into(),
                annotations: self.annotations(&f.annotations),
                ty: Box::new(self.node(&f.ty)),
            },
            Node::Parameter(p) => JsonBody::Parameter {
                name: (&p.decl.name).into(),
                annotations: self.annotations(&p.annotations),
                direction: p.direction,
                ty: Box::new(self.node(&p.ty)),
                default_value: p.default_value.as_ref().map(|d| Box::new(self.node(d))),
            },
            Node::Method(m) => JsonBody::Method {
                name: (&m.decl.name).into(),
                annotations: self.annotations(&m.annotations),
                ty: self.child(&m.ty),
                is_abstract: m.is_abstract,
            },
            Node::DeclarationVariable(d) => JsonBody::DeclarationVariable {
                name: (&d.decl.name).into(),
                annotations: self.annotations(&d.annotations),
                ty: Box::new(self.node(&d.ty)),
                initializer: d.initializer.as_ref().map(|i| Box::new(self.node(i))),
            },
            Node::DeclarationConstant(d) => JsonBody::DeclarationConstant {
                name: (&d.decl.name).into(),
                annotations: self.annotations(&d.annotations),
                ty: Box::new(self.node(&d.ty)),
                initializer: Box::new(self.node(&d.initializer)),
            },
            Node::DeclarationInstance(d) => JsonBody::DeclarationInstance {
                name: (&d.decl.name).into(),
                annotations: self.annotations(&d.annotations),
                ty: Box::new(self.node(&d.ty)),
                arguments: d.arguments.iter().map(|n| self.node(n)).collect(),
            },
            Node::P4Action(a) => JsonBody::P4Action {
                name: (&a.decl.name).into(),
                annotations: self.annotations(&a.annotations),
                parameters: self.child(&a.parameters),
                body: self.child(&a.body),
            },
            Node::P4Table(t) => JsonBody::P4Table {
                name: (&t.decl.name).into(),
                annotations: self.annotations(&t.annotations),
                actions: t.actions.iter().map(|n| self.node(n)).collect(),
                default_action: t.default_action.as_ref().map(|d| Box::new(self.node(d))),
            },
            Node::ParserState(s) => JsonBody::ParserState {
                name: (&s.decl.name).into(),
                annotations: self.annotations(&s.annotations),
                components: s.components.iter().map(|n| self.node(n)).collect(),
                select_expression: s.select_expression.as_ref().map(|e| Box::new(self.node(e))),
            },
            Node::Constant(c) => JsonBody::Constant {
                src: c.src_info.to_repr(),
                ty: self.inferred(&c.ty),
                value: c.value.to_string(),
                base: c.base,
            },
            Node::BoolLiteral(b) => JsonBody::BoolLiteral { src: b.src_info.to_repr(), ty: self.inferred(&b.ty), value: b.value },
            Node::StringLiteral(s) => {
                JsonBody::StringLiteral { src: s.src_info.to_repr(), ty: self.inferred(&s.ty), value: s.value.clone() }
            }
            Node::PathExpression(p) => JsonBody::PathExpression { ty: self.inferred(&p.ty), path: self.child(&p.path) },
            Node::Member(m) => JsonBody::Member {
                ty: self.inferred(&m.ty),
                expr: Box::new(self.node(&m.expr)),
                member: (&m.member).into(),
            },
            Node::BinaryOp(b) => JsonBody::BinaryOp {
                src: b.src_info.to_repr(),
                ty: self.inferred(&b.ty),
                op: b.op,
                left: Box::new(self.node(&b.left)),
                right: Box::new(self.node(&b.right)),
            },
            Node::UnaryOp(u) => JsonBody::UnaryOp {
                src: u.src_info.to_repr(),
                ty: self.inferred(&u.ty),
                op: u.op,
                expr: Box::new(self.node(&u.expr)),
            },
            Node::MethodCallExpression(m) => JsonBody::MethodCallExpression {
                ty: self.inferred(&m.ty),
                method: Box::new(self.node(&m.method)),
                type_arguments: m.type_arguments.iter().map(|n| self.node(n)).collect(),
                arguments: m.arguments.iter().map(|n| self.node(n)).collect(),
            },
            Node::BlockStatement(b) => JsonBody::BlockStatement {
                src: b.src_info.to_repr(),
                annotations: self.annotations(&b.annotations),
                components: b.components.iter().map(|n| self.node(n)).collect(),
            },
            Node::AssignmentStatement(a) => JsonBody::AssignmentStatement {
                src: a.src_info.to_repr(),
                left: Box::new(self.node(&a.left)),
                right: Box::new(self.node(&a.right)),
            },
            Node::MethodCallStatement(m) => JsonBody::MethodCallStatement { call: self.child(&m.call) },
        }
    }

    fn child<T: NodePayload>(&mut self, payload: &Arc<T>) -> Child {
        Box::new(self.node(&T::into_node(Arc::clone(payload))))
    }

    fn typed_list<T: NodePayload>(&mut self, items: &TypedVector<T>) -> Vec<JsonNode> {
        items.iter().map(|item| self.node(&T::into_node(Arc::clone(item)))).collect()
    }

    fn annotations(&mut self, annotations: &Annotations) -> Vec<JsonNode> {
        self.typed_list(&annotations.annotations)
    }

    /// Unknown inferred types are left out.
    fn inferred(&mut self, ty: &Node) -> Option<Child> {
        (!ty.is::<TypeUnknown>()).then(|| Box::new(self.node(ty)))
    }
}

// ---- import ----

struct Importer<'a> {
    ids: &'a IdAllocator,
    /// Nodes built so far, by `Node_ID`.
    imported: RefCell<FxHashMap<u64, Node>>,
}

impl Importer<'_> {
    fn typed<T: NodePayload>(&self, json: &JsonNode, parent: NodeKind, field: &'static str) -> IrResult<Arc<T>> {
        let node = self.node(json)?;
        let payload = node.expect::<T>(parent, field)?;
        Ok(Arc::clone(payload))
    }

    fn typed_list<T: NodePayload>(
        &self,
        items: &[JsonNode],
        parent: NodeKind,
        field: &'static str,
    ) -> IrResult<Vec<Arc<T>>> {
        items.iter().map(|j| self.typed::<T>(j, parent, field)).collect()
    }

    fn list(&self, items: &[JsonNode]) -> IrResult<Vec<Node>> {
        items.iter().map(|j| self.node(j)).collect()
    }

    fn optional(&self, item: &Option<Child>) -> IrResult<Option<Node>> {
        item.as_deref().map(|j| self.node(j)).transpose()
    }

    /// Annotations and inferred types are imported before the node's other
    /// children, the order export numbers them in.
    fn annotations(&self, items: &[JsonNode], parent: NodeKind) -> IrResult<Option<Arc<Annotations>>> {
        if items.is_empty() {
            return Ok(None);
        }
        Ok(Some(Annotations::new(self.typed_list::<Annotation>(items, parent, "annotations")?)))
    }

    fn annotate(&self, node: Node, annotations: Option<Arc<Annotations>>) -> IrResult<Node> {
        match annotations {
            Some(annotations) => node.with_annotations(annotations),
            None => Ok(node),
        }
    }

    fn retype(&self, node: Node, ty: Option<Node>) -> IrResult<Node> {
        match ty {
            Some(ty) => node.with_type(ty),
            None => Ok(node),
        }
    }

    fn node(&self, json: &JsonNode) -> IrResult<Node> {
        match (json.id, &json.body) {
            (Some(id), None) => self
                .imported
                .borrow()
                .get(&id)
                .cloned()
                .ok_or_else(|| IrError::Json(format!("Node_ID {} is referenced before it is defined", id))),
            (id, Some(body)) => {
                let node = self.build(body)?;
                if let Some(id) = id {
                    if self.imported.borrow_mut().insert(id, node.clone()).is_some() {
                        return Err(IrError::Json(format!("Node_ID {} is defined twice", id)));
                    }
                }
                Ok(node)
            }
            (None, None) => Err(IrError::Json("node has neither a Node_Type nor a Node_ID".to_string())),
        }
    }

    fn build(&self, body: &JsonBody) -> IrResult<Node> {
        let ids = self.ids;
        let node: Node = match body {
            JsonBody::TypeUnknown => TypeUnknown::get(),
            JsonBody::TypeBoolean => TypeBoolean::get(),
            JsonBody::TypeVoid => TypeVoid::get(),
            JsonBody::TypeString => TypeString::get(),
            JsonBody::TypeBits { src, size, signed } => {
                TypeBits::new(SourceInfo::from_repr(src.clone()), *size, *signed)?.into()
            }
            JsonBody::TypeVarbits { src, size } => TypeVarbits::new(SourceInfo::from_repr(src.clone()), *size)?.into(),
            JsonBody::TypeInfInt { src } => TypeInfInt::new(ids, SourceInfo::from_repr(src.clone()))?.into(),
            JsonBody::TypeName { path } => TypeName::new(self.typed(path, NodeKind::TypeName, "path")?)?.into(),
            JsonBody::TypeSpecialized { base_type, arguments } => TypeSpecialized::new(
                self.typed(base_type, NodeKind::TypeSpecialized, "base_type")?,
                self.list(arguments)?,
            )?
            .into(),
            JsonBody::TypeMethod { type_parameters, return_type, parameters, name } => TypeMethod::new(
                self.typed(type_parameters, NodeKind::TypeMethod, "type_parameters")?,
                self.optional(return_type)?,
                self.typed(parameters, NodeKind::TypeMethod, "parameters")?,
                name.as_ref().map(JsonId::to_id),
            )?
            .into(),
            JsonBody::TypeVar { name } => TypeVar::new(ids, name.to_id())?.into(),
            JsonBody::TypeStruct { name, struct_kind, annotations, fields } => {
                let annotations = self.annotations(annotations, NodeKind::TypeStruct)?;
                let fields = self.typed_list::<StructField>(fields, NodeKind::TypeStruct, "fields")?;
                let node = TypeStruct::new(ids, *struct_kind, name.to_id(), fields)?.into();
                self.annotate(node, annotations)?
            }
            JsonBody::TypeTypedef { name, annotations, ty } => {
                let annotations = self.annotations(annotations, NodeKind::TypeTypedef)?;
                let node = TypeTypedef::new(ids, name.to_id(), self.node(ty)?)?.into();
                self.annotate(node, annotations)?
            }
            JsonBody::TypeExtern { name, annotations, type_parameters, methods } => {
                let annotations = self.annotations(annotations, NodeKind::TypeExtern)?;
                let node = TypeExtern::new(
                    ids,
                    name.to_id(),
                    self.typed(type_parameters, NodeKind::TypeExtern, "type_parameters")?,
                    self.typed_list::<Method>(methods, NodeKind::TypeExtern, "methods")?,
                )?
                .into();
                self.annotate(node, annotations)?
            }
            JsonBody::TypeParser { name, annotations, type_parameters, apply_params } => {
                let annotations = self.annotations(annotations, NodeKind::TypeParser)?;
                let node = TypeParser::new(
                    ids,
                    name.to_id(),
                    self.typed(type_parameters, NodeKind::TypeParser, "type_parameters")?,
                    self.typed(apply_params, NodeKind::TypeParser, "apply_params")?,
                )?
                .into();
                self.annotate(node, annotations)?
            }
            JsonBody::TypeControl { name, annotations, type_parameters, apply_params } => {
                let annotations = self.annotations(annotations, NodeKind::TypeControl)?;
                let node = TypeControl::new(
                    ids,
                    name.to_id(),
                    self.typed(type_parameters, NodeKind::TypeControl, "type_parameters")?,
                    self.typed(apply_params, NodeKind::TypeControl, "apply_params")?,
                )?
                .into();
                self.annotate(node, annotations)?
            }
            JsonBody::P4Parser { ty, constructor_params, locals, states } => P4Parser::new(
                ids,
                self.typed(ty, NodeKind::P4Parser, "type")?,
                self.typed(constructor_params, NodeKind::P4Parser, "constructor_params")?,
                self.list(locals)?,
                self.typed_list::<ParserState>(states, NodeKind::P4Parser, "states")?,
            )?
            .into(),
            JsonBody::P4Control { ty, constructor_params, locals, body } => P4Control::new(
                ids,
                self.typed(ty, NodeKind::P4Control, "type")?,
                self.typed(constructor_params, NodeKind::P4Control, "constructor_params")?,
                self.list(locals)?,
                self.typed(body, NodeKind::P4Control, "body")?,
            )?
            .into(),
            JsonBody::Path { src, name, absolute } => {
                Path::with_src(SourceInfo::from_repr(src.clone()), name.to_id(), *absolute)?.into()
            }
            JsonBody::Annotation { src, name, expressions } => {
                Annotation::with_src(SourceInfo::from_repr(src.clone()), name.to_id(), self.list(expressions)?)?.into()
            }
            JsonBody::Annotations { annotations } => {
                Annotations::new(self.typed_list::<Annotation>(annotations, NodeKind::Annotations, "annotations")?)
                    .into()
            }
            JsonBody::TypeParameters { parameters } if parameters.is_empty() => TypeParameters::empty().into(),
            JsonBody::TypeParameters { parameters } => {
                TypeParameters::new(self.typed_list::<TypeVar>(parameters, NodeKind::TypeParameters, "parameters")?)?
                    .into()
            }
            JsonBody::ParameterList { parameters } if parameters.is_empty() => ParameterList::empty().into(),
            JsonBody::ParameterList { parameters } => {
                ParameterList::new(self.typed_list::<Parameter>(parameters, NodeKind::ParameterList, "parameters")?)?
                    .into()
            }
            JsonBody::P4Program { objects } => P4Program::new(self.list(objects)?)?.into(),
            JsonBody::StructField { name, annotations, ty } => {
                let annotations = self.annotations(annotations, NodeKind::StructField)?;
                let node = StructField::new(ids, name.to_id(), self.node(ty)?)?.into();
                self.annotate(node, annotations)?
            }
            JsonBody::Parameter { name, annotations, direction, ty, default_value } => {
                let annotations = self.annotations(annotations, NodeKind::Parameter)?;
                let node =
                    Parameter::new(ids, name.to_id(), *direction, self.node(ty)?, self.optional(default_value)?)?
                        .into();
                self.annotate(node, annotations)?
            }
            JsonBody::Method { name, annotations, ty, is_abstract } => {
                let annotations = self.annotations(annotations, NodeKind::Method)?;
                let ty = self.typed::<TypeMethod>(ty, NodeKind::Method, "type")?;
                let node = Method::new(ids, name.to_id(), ty, *is_abstract)?.into();
                self.annotate(node, annotations)?
            }
            JsonBody::DeclarationVariable { name, annotations, ty, initializer } => {
                let annotations = self.annotations(annotations, NodeKind::DeclarationVariable)?;
                let node =
                    DeclarationVariable::new(ids, name.to_id(), self.node(ty)?, self.optional(initializer)?)?.into();
                self.annotate(node, annotations)?
            }
            JsonBody::DeclarationConstant { name, annotations, ty, initializer } => {
                let annotations = self.annotations(annotations, NodeKind::DeclarationConstant)?;
                let node = DeclarationConstant::new(ids, name.to_id(), self.node(ty)?, self.node(initializer)?)?.into();
                self.annotate(node, annotations)?
            }
            JsonBody::DeclarationInstance { name, annotations, ty, arguments } => {
                let annotations = self.annotations(annotations, NodeKind::DeclarationInstance)?;
                let node = DeclarationInstance::new(ids, name.to_id(), self.node(ty)?, self.list(arguments)?)?.into();
                self.annotate(node, annotations)?
            }
            JsonBody::P4Action { name, annotations, parameters, body } => {
                let annotations = self.annotations(annotations, NodeKind::P4Action)?;
                let node = P4Action::new(
                    ids,
                    name.to_id(),
                    self.typed(parameters, NodeKind::P4Action, "parameters")?,
                    self.typed(body, NodeKind::P4Action, "body")?,
                )?
                .into();
                self.annotate(node, annotations)?
            }
            JsonBody::P4Table { name, annotations, actions, default_action } => {
                let annotations = self.annotations(annotations, NodeKind::P4Table)?;
                let node = P4Table::new(ids, name.to_id(), self.list(actions)?, self.optional(default_action)?)?.into();
                self.annotate(node, annotations)?
            }
            JsonBody::ParserState { name, annotations, components, select_expression } => {
                let annotations = self.annotations(annotations, NodeKind::ParserState)?;
                let node = ParserState::new(ids, name.to_id(), self.list(components)?, self.optional(select_expression)?)?
                    .into();
                self.annotate(node, annotations)?
            }
            JsonBody::Constant { src, ty, value, base } => {
                let ty = self.optional(ty)?;
                let value: i128 = value
                    .parse()
                    .map_err(|_| IrError::Json(format!("constant value '{}' is not an integer", value)))?;
                let node = Constant::with_base(SourceInfo::from_repr(src.clone()), value, *base)?.into();
                self.retype(node, ty)?
            }
            JsonBody::BoolLiteral { src, ty, value } => {
                let ty = self.optional(ty)?;
                self.retype(BoolLiteral::new(SourceInfo::from_repr(src.clone()), *value)?.into(), ty)?
            }
            JsonBody::StringLiteral { src, ty, value } => {
                let ty = self.optional(ty)?;
                self.retype(StringLiteral::new(SourceInfo::from_repr(src.clone()), value.clone())?.into(), ty)?
            }
            JsonBody::PathExpression { ty, path } => {
                let ty = self.optional(ty)?;
                let path = self.typed::<Path>(path, NodeKind::PathExpression, "path")?;
                self.retype(PathExpression::new(path)?.into(), ty)?
            }
            JsonBody::Member { ty, expr, member } => {
                let ty = self.optional(ty)?;
                self.retype(Member::new(self.node(expr)?, member.to_id())?.into(), ty)?
            }
            JsonBody::BinaryOp { src, ty, op, left, right } => {
                let ty = self.optional(ty)?;
                let node =
                    BinaryOp::new(SourceInfo::from_repr(src.clone()), *op, self.node(left)?, self.node(right)?)?;
                self.retype(node.into(), ty)?
            }
            JsonBody::UnaryOp { src, ty, op, expr } => {
                let ty = self.optional(ty)?;
                let node = UnaryOp::new(SourceInfo::from_repr(src.clone()), *op, self.node(expr)?)?;
                self.retype(node.into(), ty)?
            }
            JsonBody::MethodCallExpression { ty, method, type_arguments, arguments } => {
                let ty = self.optional(ty)?;
                let node =
                    MethodCallExpression::new(self.node(method)?, self.list(type_arguments)?, self.list(arguments)?)?;
                self.retype(node.into(), ty)?
            }
            JsonBody::BlockStatement { src, annotations, components } => {
                let annotations = self.annotations(annotations, NodeKind::BlockStatement)?;
                let node = BlockStatement::new(SourceInfo::from_repr(src.clone()), self.list(components)?)?.into();
                self.annotate(node, annotations)?
            }
            JsonBody::AssignmentStatement { src, left, right } => {
                AssignmentStatement::new(SourceInfo::from_repr(src.clone()), self.node(left)?, self.node(right)?)?
                    .into()
            }
            JsonBody::MethodCallStatement { call } => {
                MethodCallStatement::new(self.typed(call, NodeKind::MethodCallStatement, "call")?)?.into()
            }
        };
        Ok(node)
    }
}
