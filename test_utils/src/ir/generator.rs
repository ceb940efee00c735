//! Random IR fragments for property-based tests.
//!
//! The specs are plain data so quickcheck can print and shrink them; `build`
//! turns a spec into real nodes. Names are drawn from small pools so that
//! collisions (repeated annotations, duplicate declarations) are common.

use std::sync::Arc;

use quickcheck::{Arbitrary, Gen};

use p4ir::ir::annotations::{Annotation, Annotations};
use p4ir::ir::blocks::P4Program;
use p4ir::ir::expressions::{BinaryOp, BinaryOperator, BoolLiteral, Constant, Member, PathExpression, UnaryOp, UnaryOperator};
use p4ir::ir::identity::{Id, IdAllocator};
use p4ir::ir::node::Node;
use p4ir::ir::source_info::SourceInfo;
use p4ir::ir::type_decls::StructKind;

use super::builders::struct_type;

const ANNOTATION_NAMES: &[&str] = &["name", "hidden", "atomic", "tableonly", "defaultonly", "length", "custom"];
const IDENTIFIERS: &[&str] = &["a", "b", "c", "hdr", "meta", "x"];
const MAX_DEPTH: usize = 5;

/// One annotation: a name and integer arguments.
#[derive(Clone, Debug)]
pub struct AnnotationSpec {
    pub name: String,
    pub values: Vec<i64>,
}

impl Arbitrary for AnnotationSpec {
    fn arbitrary(g: &mut Gen) -> Self {
        let name = g.choose(ANNOTATION_NAMES).unwrap().to_string();
        let count = usize::arbitrary(g) % 3;
        let values = (0..count).map(|_| i64::arbitrary(g)).collect();
        AnnotationSpec { name, values }
    }

    fn shrink(&self) -> Box<dyn Iterator<Item = Self>> {
        let name = self.name.clone();
        Box::new(self.values.shrink().map(move |values| AnnotationSpec { name: name.clone(), values }))
    }
}

impl AnnotationSpec {
    pub fn build(&self) -> Arc<Annotation> {
        let exprs = self.values.iter().map(|v| Constant::new(SourceInfo::invalid(), *v as i128).unwrap().into());
        Annotation::new(Id::new(self.name.as_str()), exprs.collect::<Vec<Node>>()).unwrap()
    }
}

/// An annotation list.
#[derive(Clone, Debug)]
pub struct AnnotationsSpec(pub Vec<AnnotationSpec>);

impl Arbitrary for AnnotationsSpec {
    fn arbitrary(g: &mut Gen) -> Self {
        let count = usize::arbitrary(g) % 6;
        AnnotationsSpec((0..count).map(|_| AnnotationSpec::arbitrary(g)).collect())
    }

    fn shrink(&self) -> Box<dyn Iterator<Item = Self>> {
        Box::new(self.0.shrink().map(AnnotationsSpec))
    }
}

impl AnnotationsSpec {
    pub fn build(&self) -> Arc<Annotations> {
        Annotations::new(self.0.iter().map(AnnotationSpec::build))
    }

    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(|a| a.name.as_str()).collect()
    }
}

pub fn arbitrary_annotation_name(g: &mut Gen) -> String {
    g.choose(ANNOTATION_NAMES).unwrap().to_string()
}

/// An expression tree.
#[derive(Clone, Debug)]
pub enum ExprSpec {
    Int(i64),
    Bool(bool),
    Var(String),
    Member(Box<ExprSpec>, String),
    Unary(UnaryOperator, Box<ExprSpec>),
    Binary(BinaryOperator, Box<ExprSpec>, Box<ExprSpec>),
}

fn gen_expr(g: &mut Gen, depth: usize) -> ExprSpec {
    let leaf = depth == 0 || usize::arbitrary(g) % 3 == 0;
    if leaf {
        return match usize::arbitrary(g) % 3 {
            0 => ExprSpec::Int(i64::arbitrary(g)),
            1 => ExprSpec::Bool(bool::arbitrary(g)),
            _ => ExprSpec::Var(g.choose(IDENTIFIERS).unwrap().to_string()),
        };
    }
    match usize::arbitrary(g) % 3 {
        0 => ExprSpec::Member(Box::new(gen_expr(g, depth - 1)), g.choose(IDENTIFIERS).unwrap().to_string()),
        1 => {
            let op = *g.choose(&[UnaryOperator::Neg, UnaryOperator::Cmpl, UnaryOperator::LNot]).unwrap();
            ExprSpec::Unary(op, Box::new(gen_expr(g, depth - 1)))
        }
        _ => {
            let op = *g.choose(&BinaryOperator::ALL).unwrap();
            ExprSpec::Binary(op, Box::new(gen_expr(g, depth - 1)), Box::new(gen_expr(g, depth - 1)))
        }
    }
}

impl Arbitrary for ExprSpec {
    fn arbitrary(g: &mut Gen) -> Self {
        gen_expr(g, g.size().min(MAX_DEPTH))
    }

    fn shrink(&self) -> Box<dyn Iterator<Item = Self>> {
        match self {
            ExprSpec::Int(v) => Box::new(v.shrink().map(ExprSpec::Int)),
            ExprSpec::Bool(_) | ExprSpec::Var(_) => quickcheck::empty_shrinker(),
            ExprSpec::Member(e, _) | ExprSpec::Unary(_, e) => quickcheck::single_shrinker((**e).clone()),
            ExprSpec::Binary(_, l, r) => Box::new(vec![(**l).clone(), (**r).clone()].into_iter()),
        }
    }
}

impl ExprSpec {
    pub fn build(&self) -> Node {
        let src = SourceInfo::invalid();
        match self {
            ExprSpec::Int(v) => Constant::new(src, *v as i128).unwrap().into(),
            ExprSpec::Bool(b) => BoolLiteral::new(src, *b).unwrap().into(),
            ExprSpec::Var(name) => PathExpression::named(name).unwrap().into(),
            ExprSpec::Member(e, m) => Member::new(e.build(), m.as_str().into()).unwrap().into(),
            ExprSpec::Unary(op, e) => UnaryOp::new(src, *op, e.build()).unwrap().into(),
            ExprSpec::Binary(op, l, r) => BinaryOp::new(src, *op, l.build(), r.build()).unwrap().into(),
        }
    }

    /// Number of nodes `build` produces, paths included.
    pub fn node_count(&self) -> usize {
        match self {
            ExprSpec::Int(_) | ExprSpec::Bool(_) => 1,
            ExprSpec::Var(_) => 2,
            ExprSpec::Member(e, _) | ExprSpec::Unary(_, e) => 1 + e.node_count(),
            ExprSpec::Binary(_, l, r) => 1 + l.node_count() + r.node_count(),
        }
    }
}

/// A program of struct declarations whose names may repeat. Each entry is
/// an index into the identifier pool and the widths of its fields.
#[derive(Clone, Debug)]
pub struct ProgramSpec {
    pub structs: Vec<(usize, Vec<u32>)>,
}

impl Arbitrary for ProgramSpec {
    fn arbitrary(g: &mut Gen) -> Self {
        let count = usize::arbitrary(g) % 8;
        let structs = (0..count)
            .map(|_| {
                let name = usize::arbitrary(g) % IDENTIFIERS.len();
                let widths = (0..usize::arbitrary(g) % 4).map(|_| 1 + u32::arbitrary(g) % 64).collect();
                (name, widths)
            })
            .collect();
        ProgramSpec { structs }
    }

    fn shrink(&self) -> Box<dyn Iterator<Item = Self>> {
        Box::new(self.structs.shrink().map(|structs| ProgramSpec { structs }))
    }
}

const FIELD_NAMES: &[&str] = &["f0", "f1", "f2", "f3"];

impl ProgramSpec {
    fn name(index: usize) -> &'static str {
        IDENTIFIERS[index % IDENTIFIERS.len()]
    }

    pub fn build(&self, ids: &IdAllocator) -> Node {
        let objects: Vec<Node> = self
            .structs
            .iter()
            .map(|(name, widths)| {
                let fields: Vec<(&str, u32)> = FIELD_NAMES.iter().copied().zip(widths.iter().copied()).collect();
                struct_type(ids, StructKind::Struct, Self::name(*name), &fields).into()
            })
            .collect();
        P4Program::new(objects).unwrap().into()
    }

    /// Declarations that repeat an earlier name.
    pub fn expected_duplicates(&self) -> usize {
        let mut seen = std::collections::HashSet::new();
        self.structs.iter().filter(|(name, _)| !seen.insert(Self::name(*name))).count()
    }

    /// Static width of each struct, in declaration order.
    pub fn widths(&self) -> Vec<u32> {
        self.structs.iter().map(|(_, w)| w.iter().take(FIELD_NAMES.len()).sum()).collect()
    }
}
