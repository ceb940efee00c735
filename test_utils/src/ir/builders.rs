//! Shorthand constructors for IR fixtures.

use std::sync::Arc;

use p4ir::ir::annotations::{Annotation, Annotations};
use p4ir::ir::blocks::{P4Control, P4Parser, P4Program, P4Table, ParserState};
use p4ir::ir::declarations::{DeclarationConstant, DeclarationInstance, DeclarationVariable, P4Action};
use p4ir::ir::expressions::{
    BinaryOp, BinaryOperator, Constant, Member, MethodCallExpression, PathExpression, StringLiteral,
};
use p4ir::ir::identity::{Id, IdAllocator};
use p4ir::ir::node::Node;
use p4ir::ir::parameters::{Direction, Parameter, ParameterList, TypeParameters};
use p4ir::ir::source_info::SourceInfo;
use p4ir::ir::statements::{AssignmentStatement, BlockStatement, MethodCallStatement};
use p4ir::ir::type_decls::{Method, StructField, StructKind, TypeControl, TypeExtern, TypeParser, TypeStruct, TypeVar};
use p4ir::ir::types::{TypeBits, TypeMethod, TypeName, TypeSpecialized, TypeVoid};

pub fn bits(size: u32) -> Node {
    TypeBits::bits(size).unwrap().into()
}

pub fn int(value: i128) -> Node {
    Constant::new(SourceInfo::invalid(), value).unwrap().into()
}

pub fn var(name: &str) -> Node {
    PathExpression::named(name).unwrap().into()
}

pub fn type_name(name: &str) -> Node {
    TypeName::named(name).unwrap().into()
}

pub fn add(left: Node, right: Node) -> Node {
    BinaryOp::new(SourceInfo::invalid(), BinaryOperator::Add, left, right).unwrap().into()
}

pub fn id_at(name: &str, file: &str, line: u32) -> Id {
    Id::with_src(SourceInfo::on_line(file, line, 0, name.len() as u32), name)
}

/// `@name("value")`
pub fn name_annotation(value: &str) -> Arc<Annotation> {
    Annotation::single("name", StringLiteral::new(SourceInfo::invalid(), value).unwrap().into()).unwrap()
}

pub fn annotations(names: &[&str]) -> Arc<Annotations> {
    Annotations::new(names.iter().map(|n| Annotation::new(Id::new(*n), []).unwrap()))
}

pub fn param(ids: &IdAllocator, name: &str, direction: Direction, ty: Node) -> Arc<Parameter> {
    Parameter::new(ids, name.into(), direction, ty, None).unwrap()
}

pub fn params(items: impl IntoIterator<Item = Arc<Parameter>>) -> Arc<ParameterList> {
    ParameterList::new(items).unwrap()
}

/// A struct-like type with `bit<N>` fields.
pub fn struct_type(ids: &IdAllocator, kind: StructKind, name: &str, fields: &[(&str, u32)]) -> Arc<TypeStruct> {
    let fields = fields.iter().map(|(n, w)| StructField::new(ids, (*n).into(), bits(*w)).unwrap());
    TypeStruct::new(ids, kind, name.into(), fields).unwrap()
}

/// `void name(params)`
pub fn method(ids: &IdAllocator, name: &str, parameters: Arc<ParameterList>) -> Arc<Method> {
    let ty = TypeMethod::new(TypeParameters::empty(), Some(TypeVoid::get()), parameters, Some(name.into())).unwrap();
    Method::new(ids, name.into(), ty, false).unwrap()
}

/// `extern Register<T> { void read(out T v); void write(in T v); }`
pub fn register_extern(ids: &IdAllocator) -> Arc<TypeExtern> {
    let t = TypeVar::new(ids, "T".into()).unwrap();
    let read = method(ids, "read", params([param(ids, "v", Direction::Out, type_name("T"))]));
    let write = method(ids, "write", params([param(ids, "v", Direction::In, type_name("T"))]));
    TypeExtern::new(ids, "Register".into(), TypeParameters::new([t]).unwrap(), [read, write]).unwrap()
}

pub fn call_stmt(target: Node, method: &str, args: impl IntoIterator<Item = Node>) -> Node {
    let callee: Node = Member::new(target, method.into()).unwrap().into();
    let call = MethodCallExpression::new(callee, [], args).unwrap();
    MethodCallStatement::new(call).unwrap().into()
}

/// A small program touching every node family:
///
/// ```text
/// header h_t { bit<8> a; bit<16> b; }
/// extern Register<T> { ... }
/// const bit<8> LIMIT = 1;
/// parser P(out h_t hdr) { state start { } }
/// control C(inout h_t hdr) {
///     Register<bit<8>>() r;
///     @name("drop_it") action drop() { hdr.a = LIMIT + 1; }
///     table t { actions = { drop; } default_action = drop; }
///     apply { r.read(hdr.a); }
/// }
/// ```
pub fn sample_program(ids: &IdAllocator) -> Node {
    let header = struct_type(ids, StructKind::Header, "h_t", &[("a", 8), ("b", 16)]);
    let register = register_extern(ids);
    let limit: Node = DeclarationConstant::new(ids, id_at("LIMIT", "sample.p4", 3), bits(8), int(1)).unwrap().into();

    let parser_type = TypeParser::new(
        ids,
        id_at("P", "sample.p4", 4),
        TypeParameters::empty(),
        params([param(ids, "hdr", Direction::Out, type_name("h_t"))]),
    )
    .unwrap();
    let start = ParserState::new(ids, "start".into(), [], Some(var("accept"))).unwrap();
    let parser: Node = P4Parser::new(ids, parser_type, ParameterList::empty(), [], [start]).unwrap().into();

    let control_type = TypeControl::new(
        ids,
        id_at("C", "sample.p4", 5),
        TypeParameters::empty(),
        params([param(ids, "hdr", Direction::InOut, type_name("h_t"))]),
    )
    .unwrap();
    let register_of_bytes = TypeSpecialized::new(TypeName::named("Register").unwrap(), [bits(8)]).unwrap();
    let instance: Node = DeclarationInstance::new(ids, "r".into(), register_of_bytes.into(), []).unwrap().into();

    let field_a: Node = Member::new(var("hdr"), "a".into()).unwrap().into();
    let assign: Node = AssignmentStatement::new(SourceInfo::invalid(), field_a.clone(), add(var("LIMIT"), int(1)))
        .unwrap()
        .into();
    let drop_body = BlockStatement::new(SourceInfo::invalid(), [assign]).unwrap();
    let drop: Node = P4Action::new(ids, "drop".into(), ParameterList::empty(), drop_body).unwrap().into();
    let drop = drop.with_annotations(Annotations::new([name_annotation("drop_it")])).unwrap();
    let table: Node = P4Table::new(ids, "t".into(), [var("drop")], Some(var("drop"))).unwrap().into();
    let scratch: Node = DeclarationVariable::new(ids, "tmp".into(), bits(8), None).unwrap().into();

    let body = BlockStatement::new(SourceInfo::invalid(), [scratch, call_stmt(var("r"), "read", [field_a])]).unwrap();
    let control: Node = P4Control::new(ids, control_type, ParameterList::empty(), [instance, drop, table], body)
        .unwrap()
        .into();

    P4Program::new([header.into(), register.into(), limit, parser, control]).unwrap().into()
}
