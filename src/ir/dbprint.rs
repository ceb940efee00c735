//! Debug rendering of a tree: one line per node, children indented below
//! their parent.

use std::fmt::Write;

use super::node::{Node, VisitOptions};

#[derive(Debug, Clone, Copy, Default)]
pub struct DbPrintOptions {
    /// Include the inferred types of expressions.
    pub show_types: bool,
}

pub fn dbprint(node: &Node) -> String {
    dbprint_with(node, DbPrintOptions::default())
}

pub fn dbprint_with(node: &Node, options: DbPrintOptions) -> String {
    let mut out = String::new();
    let visit = VisitOptions { visit_types: options.show_types };
    print_node(node, 0, visit, &mut out);
    out
}

fn print_node(node: &Node, depth: usize, options: VisitOptions, out: &mut String) {
    if let Node::Annotations(a) = node {
        if a.is_empty() {
            return;
        }
    }
    let _ = write!(out, "{:indent$}{}", "", node.kind(), indent = depth * 2);
    let label = node.dbprint_label();
    if !label.is_empty() {
        let _ = write!(out, " {}", label);
    }
    let position = node.src_info().to_position_string();
    if !position.is_empty() {
        let _ = write!(out, " @{}", position);
    }
    out.push('\n');
    node.visit_children(options, &mut |child| print_node(child, depth + 1, options, out));
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;
    use crate::ir::expressions::{BinaryOp, BinaryOperator, Constant, PathExpression};
    use crate::ir::source_info::SourceInfo;

    #[test]
    fn test_expression_tree() {
        let x: Node = PathExpression::named("x").unwrap().into();
        let one: Node = Constant::new(SourceInfo::on_line("a.p4", 2, 8, 9), 1).unwrap().into();
        let sum: Node = BinaryOp::new(SourceInfo::invalid(), BinaryOperator::Add, x, one).unwrap().into();
        let expected = indoc! {"
            BinaryOp + @a.p4(2:8)
              PathExpression x
                Path x
              Constant 1 @a.p4(2:8)
        "};
        assert_eq!(dbprint(&sum), expected);
    }

    #[test]
    fn test_show_types() {
        let one: Node = Constant::new(SourceInfo::invalid(), 1).unwrap().into();
        assert_eq!(dbprint(&one), "Constant 1\n");
        assert_eq!(dbprint_with(&one, DbPrintOptions { show_types: true }), "Constant 1\n  TypeUnknown unknown\n");
    }
}
