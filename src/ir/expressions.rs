//! Expressions.
//!
//! Every expression carries an inferred type `ty`. It starts as the shared
//! unknown type and is written by type inference; traversals skip it unless
//! they opt in with `VisitOptions::visit_types`.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::capability::CompileTimeValue;
use super::error::{IrError, IrResult};
use super::identity::Id;
use super::node::{Category, ChildMapper, ChildVisitor, IrNode, Node, NodeKind, NodeVector};
use super::path::Path;
use super::source_info::SourceInfo;
use super::types::TypeUnknown;

/// Adds the `with_type` copy-on-write setter.
macro_rules! impl_typed_expression {
    ($ty:ident) => {
        impl $ty {
            /// Same expression with a new inferred type.
            pub fn with_type(&self, ty: Node) -> IrResult<Arc<Self>> {
                Category::Type.require(NodeKind::$ty, "ty", &ty)?;
                let mut copy = self.clone();
                copy.ty = ty;
                copy.finish()
            }
        }
    };
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &NodeVector) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

/// Integer literal.
#[derive(Debug, Clone)]
pub struct Constant {
    pub src_info: SourceInfo,
    pub ty: Node,
    pub value: i128,
    /// Radix the literal was written in: 2, 8, 10 or 16.
    pub base: u32,
}

impl Constant {
    pub fn new(src_info: SourceInfo, value: i128) -> IrResult<Arc<Self>> {
        Constant::with_base(src_info, value, 10)
    }

    pub fn with_base(src_info: SourceInfo, value: i128, base: u32) -> IrResult<Arc<Self>> {
        Constant { src_info, ty: TypeUnknown::get(), value, base }.finish()
    }
}

impl_typed_expression!(Constant);

impl CompileTimeValue for Constant {}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.value < 0 { "-" } else { "" };
        let magnitude = self.value.unsigned_abs();
        match self.base {
            2 => write!(f, "{}0b{:b}", sign, magnitude),
            8 => write!(f, "{}0o{:o}", sign, magnitude),
            16 => write!(f, "{}0x{:x}", sign, magnitude),
            _ => write!(f, "{}", self.value),
        }
    }
}

impl IrNode for Constant {
    fn src_info(&self) -> &SourceInfo {
        &self.src_info
    }

    fn validate(&self) -> IrResult<()> {
        if !matches!(self.base, 2 | 8 | 10 | 16) {
            return Err(IrError::invalid(NodeKind::Constant, format!("unsupported base {}", self.base)));
        }
        Ok(())
    }

    fn visit_children(&self, v: &mut ChildVisitor<'_>) {
        v.inferred_type(&self.ty);
    }

    fn map_children(&self, m: &mut ChildMapper<'_>) -> IrResult<Option<Self>> {
        let ty = m.inferred_type(&self.ty)?;
        Ok(m.changed().then(|| Constant { ty, ..self.clone() }))
    }
}

#[derive(Debug, Clone)]
pub struct BoolLiteral {
    pub src_info: SourceInfo,
    pub ty: Node,
    pub value: bool,
}

impl BoolLiteral {
    pub fn new(src_info: SourceInfo, value: bool) -> IrResult<Arc<Self>> {
        BoolLiteral { src_info, ty: TypeUnknown::get(), value }.finish()
    }
}

impl_typed_expression!(BoolLiteral);

impl CompileTimeValue for BoolLiteral {}

impl fmt::Display for BoolLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl IrNode for BoolLiteral {
    fn src_info(&self) -> &SourceInfo {
        &self.src_info
    }

    fn validate(&self) -> IrResult<()> {
        Ok(())
    }

    fn visit_children(&self, v: &mut ChildVisitor<'_>) {
        v.inferred_type(&self.ty);
    }

    fn map_children(&self, m: &mut ChildMapper<'_>) -> IrResult<Option<Self>> {
        let ty = m.inferred_type(&self.ty)?;
        Ok(m.changed().then(|| BoolLiteral { ty, ..self.clone() }))
    }
}

#[derive(Debug, Clone)]
pub struct StringLiteral {
    pub src_info: SourceInfo,
    pub ty: Node,
    pub value: String,
}

impl StringLiteral {
    pub fn new(src_info: SourceInfo, value: impl Into<String>) -> IrResult<Arc<Self>> {
        StringLiteral { src_info, ty: TypeUnknown::get(), value: value.into() }.finish()
    }
}

impl_typed_expression!(StringLiteral);

impl CompileTimeValue for StringLiteral {}

impl fmt::Display for StringLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.value)
    }
}

impl IrNode for StringLiteral {
    fn src_info(&self) -> &SourceInfo {
        &self.src_info
    }

    fn validate(&self) -> IrResult<()> {
        Ok(())
    }

    fn visit_children(&self, v: &mut ChildVisitor<'_>) {
        v.inferred_type(&self.ty);
    }

    fn map_children(&self, m: &mut ChildMapper<'_>) -> IrResult<Option<Self>> {
        let ty = m.inferred_type(&self.ty)?;
        Ok(m.changed().then(|| StringLiteral { ty, ..self.clone() }))
    }
}

/// A name used as a value.
#[derive(Debug, Clone)]
pub struct PathExpression {
    pub src_info: SourceInfo,
    pub ty: Node,
    pub path: Arc<Path>,
}

impl PathExpression {
    pub fn new(path: Arc<Path>) -> IrResult<Arc<Self>> {
        PathExpression { src_info: path.src_info.clone(), ty: TypeUnknown::get(), path }.finish()
    }

    pub fn named(name: &str) -> IrResult<Arc<Self>> {
        PathExpression::new(Path::named(name)?)
    }
}

impl_typed_expression!(PathExpression);

impl fmt::Display for PathExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path)
    }
}

impl IrNode for PathExpression {
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
        v.inferred_type(&self.ty);
        v.typed(&self.path);
    }

    fn map_children(&self, m: &mut ChildMapper<'_>) -> IrResult<Option<Self>> {
        let ty = m.inferred_type(&self.ty)?;
        let path = m.typed(&self.path)?;
        Ok(m.changed().then(|| PathExpression { ty, path, ..self.clone() }))
    }
}

/// Field or method selection: `hdr.ipv4`.
#[derive(Debug, Clone)]
pub struct Member {
    pub src_info: SourceInfo,
    pub ty: Node,
    pub expr: Node,
    pub member: Id,
}

impl Member {
    pub fn new(expr: Node, member: Id) -> IrResult<Arc<Self>> {
        let src_info = expr.src_info().merge(&member.src_info);
        Member { src_info, ty: TypeUnknown::get(), expr, member }.finish()
    }
}

impl_typed_expression!(Member);

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.expr, self.member)
    }
}

impl IrNode for Member {
    fn src_info(&self) -> &SourceInfo {
        &self.src_info
    }

    fn validate(&self) -> IrResult<()> {
        self.member.require_non_empty(NodeKind::Member)?;
        Category::Expression.require(NodeKind::Member, "expr", &self.expr)
    }

    fn visit_children(&self, v: &mut ChildVisitor<'_>) {
        v.inferred_type(&self.ty);
        v.node(&self.expr);
    }

    fn map_children(&self, m: &mut ChildMapper<'_>) -> IrResult<Option<Self>> {
        let ty = m.inferred_type(&self.ty)?;
        let expr = m.node(&self.expr)?;
        Ok(m.changed().then(|| Member { ty, expr, ..self.clone() }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Shl,
    Shr,
    Eq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,
    BAnd,
    BOr,
    BXor,
    LAnd,
    LOr,
    Concat,
}

impl BinaryOperator {
    pub const ALL: [BinaryOperator; 19] = [
        BinaryOperator::Add,
        BinaryOperator::Sub,
        BinaryOperator::Mul,
        BinaryOperator::Div,
        BinaryOperator::Mod,
        BinaryOperator::Shl,
        BinaryOperator::Shr,
        BinaryOperator::Eq,
        BinaryOperator::Neq,
        BinaryOperator::Lt,
        BinaryOperator::Le,
        BinaryOperator::Gt,
        BinaryOperator::Ge,
        BinaryOperator::BAnd,
        BinaryOperator::BOr,
        BinaryOperator::BXor,
        BinaryOperator::LAnd,
        BinaryOperator::LOr,
        BinaryOperator::Concat,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::Mod => "%",
            BinaryOperator::Shl => "<<",
            BinaryOperator::Shr => ">>",
            BinaryOperator::Eq => "==",
            BinaryOperator::Neq => "!=",
            BinaryOperator::Lt => "<",
            BinaryOperator::Le => "<=",
            BinaryOperator::Gt => ">",
            BinaryOperator::Ge => ">=",
            BinaryOperator::BAnd => "&",
            BinaryOperator::BOr => "|",
            BinaryOperator::BXor => "^",
            BinaryOperator::LAnd => "&&",
            BinaryOperator::LOr => "||",
            BinaryOperator::Concat => "++",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.symbol() == symbol)
    }
}

#[derive(Debug, Clone)]
pub struct BinaryOp {
    pub src_info: SourceInfo,
    pub ty: Node,
    pub op: BinaryOperator,
    pub left: Node,
    pub right: Node,
}

impl BinaryOp {
    /// An unset span covers both operands.
    pub fn new(src_info: SourceInfo, op: BinaryOperator, left: Node, right: Node) -> IrResult<Arc<Self>> {
        let src_info = src_info.or_else(|| left.src_info().merge(right.src_info()));
        BinaryOp { src_info, ty: TypeUnknown::get(), op, left, right }.finish()
    }
}

impl_typed_expression!(BinaryOp);

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.left, self.op.symbol(), self.right)
    }
}

impl IrNode for BinaryOp {
    fn src_info(&self) -> &SourceInfo {
        &self.src_info
    }

    fn validate(&self) -> IrResult<()> {
        Category::Expression.require(NodeKind::BinaryOp, "left", &self.left)?;
        Category::Expression.require(NodeKind::BinaryOp, "right", &self.right)
    }

    fn dbprint_label(&self) -> String {
        self.op.symbol().to_string()
    }

    fn visit_children(&self, v: &mut ChildVisitor<'_>) {
        v.inferred_type(&self.ty);
        v.node(&self.left);
        v.node(&self.right);
    }

    fn map_children(&self, m: &mut ChildMapper<'_>) -> IrResult<Option<Self>> {
        let ty = m.inferred_type(&self.ty)?;
        let left = m.node(&self.left)?;
        let right = m.node(&self.right)?;
        Ok(m.changed().then(|| BinaryOp { ty, left, right, ..self.clone() }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOperator {
    Neg,
    Cmpl,
    LNot,
}

impl UnaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOperator::Neg => "-",
            UnaryOperator::Cmpl => "~",
            UnaryOperator::LNot => "!",
        }
    }
}

#[derive(Debug, Clone)]
pub struct UnaryOp {
    pub src_info: SourceInfo,
    pub ty: Node,
    pub op: UnaryOperator,
    pub expr: Node,
}

impl UnaryOp {
    pub fn new(src_info: SourceInfo, op: UnaryOperator, expr: Node) -> IrResult<Arc<Self>> {
        let src_info = src_info.or_else(|| expr.src_info().clone());
        UnaryOp { src_info, ty: TypeUnknown::get(), op, expr }.finish()
    }
}

impl_typed_expression!(UnaryOp);

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.op.symbol(), self.expr)
    }
}

impl IrNode for UnaryOp {
    fn src_info(&self) -> &SourceInfo {
        &self.src_info
    }

    fn validate(&self) -> IrResult<()> {
        Category::Expression.require(NodeKind::UnaryOp, "expr", &self.expr)
    }

    fn dbprint_label(&self) -> String {
        self.op.symbol().to_string()
    }

    fn visit_children(&self, v: &mut ChildVisitor<'_>) {
        v.inferred_type(&self.ty);
        v.node(&self.expr);
    }

    fn map_children(&self, m: &mut ChildMapper<'_>) -> IrResult<Option<Self>> {
        let ty = m.inferred_type(&self.ty)?;
        let expr = m.node(&self.expr)?;
        Ok(m.changed().then(|| UnaryOp { ty, expr, ..self.clone() }))
    }
}

#[derive(Debug, Clone)]
pub struct MethodCallExpression {
    pub src_info: SourceInfo,
    pub ty: Node,
    pub method: Node,
    pub type_arguments: NodeVector,
    pub arguments: NodeVector,
}

impl MethodCallExpression {
    pub fn new(
        method: Node,
        type_arguments: impl IntoIterator<Item = Node>,
        arguments: impl IntoIterator<Item = Node>,
    ) -> IrResult<Arc<Self>> {
        let arguments: NodeVector = arguments.into_iter().collect();
        let src_info = arguments.iter().fold(method.src_info().clone(), |s, a| s.merge(a.src_info()));
        MethodCallExpression {
            src_info,
            ty: TypeUnknown::get(),
            method,
            type_arguments: type_arguments.into_iter().collect(),
            arguments,
        }
        .finish()
    }
}

impl_typed_expression!(MethodCallExpression);

impl fmt::Display for MethodCallExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.method)?;
        if !self.type_arguments.is_empty() {
            write!(f, "<")?;
            write_list(f, &self.type_arguments)?;
            write!(f, ">")?;
        }
        write!(f, "(")?;
        write_list(f, &self.arguments)?;
        write!(f, ")")
    }
}

impl IrNode for MethodCallExpression {
    fn src_info(&self) -> &SourceInfo {
        &self.src_info
    }

    fn validate(&self) -> IrResult<()> {
        Category::Expression.require(NodeKind::MethodCallExpression, "method", &self.method)?;
        for t in self.type_arguments.iter() {
            Category::Type.require(NodeKind::MethodCallExpression, "type_arguments", t)?;
        }
        for a in self.arguments.iter() {
            Category::Expression.require(NodeKind::MethodCallExpression, "arguments", a)?;
        }
        Ok(())
    }

    fn visit_children(&self, v: &mut ChildVisitor<'_>) {
        v.inferred_type(&self.ty);
        v.node(&self.method);
        v.vector(&self.type_arguments);
        v.vector(&self.arguments);
    }

    fn map_children(&self, m: &mut ChildMapper<'_>) -> IrResult<Option<Self>> {
        let ty = m.inferred_type(&self.ty)?;
        let method = m.node(&self.method)?;
        let type_arguments = m.vector(&self.type_arguments)?;
        let arguments = m.vector(&self.arguments)?;
        Ok(m.changed().then(|| MethodCallExpression { ty, method, type_arguments, arguments, ..self.clone() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::node::VisitOptions;
    use crate::ir::types::TypeBits;

    #[test]
    fn test_constant_renders_in_its_base() {
        let hex = Constant::with_base(SourceInfo::invalid(), 255, 16).unwrap();
        let neg = Constant::with_base(SourceInfo::invalid(), -5, 2).unwrap();
        assert_eq!(hex.to_string(), "0xff");
        assert_eq!(neg.to_string(), "-0b101");
        assert!(Constant::with_base(SourceInfo::invalid(), 1, 3).is_err());
    }

    #[test]
    fn test_uninferred_expressions_share_unknown_type() {
        let a = Constant::new(SourceInfo::invalid(), 1).unwrap();
        let b = BoolLiteral::new(SourceInfo::invalid(), true).unwrap();
        assert!(a.ty.ptr_eq(&b.ty));
        assert!(a.ty.ptr_eq(&TypeUnknown::get()));
    }

    #[test]
    fn test_binary_span_covers_operands() {
        let l = Constant::new(SourceInfo::on_line("a.p4", 5, 2, 3), 1).unwrap();
        let r = Constant::new(SourceInfo::on_line("a.p4", 5, 6, 7), 2).unwrap();
        let sum = BinaryOp::new(SourceInfo::invalid(), BinaryOperator::Add, l.into(), r.into()).unwrap();
        assert_eq!(sum.src_info.start().column, 2);
        assert_eq!(sum.src_info.end().column, 7);
        assert_eq!(sum.to_string(), "1 + 2");
    }

    #[test]
    fn test_inferred_type_skipped_by_default() {
        let c: Node = Constant::new(SourceInfo::invalid(), 1).unwrap().into();
        let mut seen = 0;
        c.visit_children(VisitOptions::default(), &mut |_| seen += 1);
        assert_eq!(seen, 0);
        c.visit_children(VisitOptions::with_types(), &mut |_| seen += 1);
        assert_eq!(seen, 1);
    }

    #[test]
    fn test_with_type_keeps_original() {
        let c = Constant::new(SourceInfo::invalid(), 1).unwrap();
        let typed = c.with_type(TypeBits::bits(8).unwrap().into()).unwrap();
        assert_eq!(typed.ty.to_string(), "bit<8>");
        assert!(c.ty.ptr_eq(&TypeUnknown::get()));
    }

    #[test]
    fn test_method_call_display() {
        let method: Node = Member::new(PathExpression::named("r").unwrap().into(), Id::new("read")).unwrap().into();
        let arg: Node = Constant::new(SourceInfo::invalid(), 3).unwrap().into();
        let call = MethodCallExpression::new(method, [], [arg]).unwrap();
        assert_eq!(call.to_string(), "r.read(3)");
    }
}
