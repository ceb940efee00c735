use std::fmt;
use std::sync::Arc;

use super::annotations::Annotations;
use super::capability::impl_annotated;
use super::error::IrResult;
use super::expressions::MethodCallExpression;
use super::node::{Category, ChildMapper, ChildVisitor, IrNode, Node, NodeKind, NodeVector};
use super::source_info::SourceInfo;

/// `{ ... }`: statements interleaved with local declarations.
#[derive(Debug, Clone)]
pub struct BlockStatement {
    pub src_info: SourceInfo,
    pub annotations: Arc<Annotations>,
    pub components: NodeVector,
}

impl BlockStatement {
    pub fn new(src_info: SourceInfo, components: impl IntoIterator<Item = Node>) -> IrResult<Arc<Self>> {
        let components: NodeVector = components.into_iter().collect();
        let src_info = src_info.or_else(|| components.iter().fold(SourceInfo::invalid(), |s, c| s.merge(c.src_info())));
        BlockStatement { src_info, annotations: Annotations::empty(), components }.finish()
    }

    pub fn empty() -> IrResult<Arc<Self>> {
        BlockStatement::new(SourceInfo::invalid(), [])
    }
}

impl_annotated!(BlockStatement);

impl fmt::Display for BlockStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ {} component(s) }}", self.components.len())
    }
}

impl IrNode for BlockStatement {
    fn src_info(&self) -> &SourceInfo {
        &self.src_info
    }

    fn validate(&self) -> IrResult<()> {
        for c in self.components.iter() {
            Category::StatementOrDeclaration.require(NodeKind::BlockStatement, "components", c)?;
        }
        Ok(())
    }

    fn dbprint_label(&self) -> String {
        format!("[{}]", self.components.len())
    }

    fn visit_children(&self, v: &mut ChildVisitor<'_>) {
        v.typed(&self.annotations);
        v.vector(&self.components);
    }

    fn map_children(&self, m: &mut ChildMapper<'_>) -> IrResult<Option<Self>> {
        let annotations = m.typed(&self.annotations)?;
        let components = m.vector(&self.components)?;
        Ok(m.changed().then(|| BlockStatement { annotations, components, ..self.clone() }))
    }
}

#[derive(Debug, Clone)]
pub struct AssignmentStatement {
    pub src_info: SourceInfo,
    pub left: Node,
    pub right: Node,
}

impl AssignmentStatement {
    pub fn new(src_info: SourceInfo, left: Node, right: Node) -> IrResult<Arc<Self>> {
        let src_info = src_info.or_else(|| left.src_info().merge(right.src_info()));
        AssignmentStatement { src_info, left, right }.finish()
    }
}

impl fmt::Display for AssignmentStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {};", self.left, self.right)
    }
}

impl IrNode for AssignmentStatement {
    fn src_info(&self) -> &SourceInfo {
        &self.src_info
    }

    fn validate(&self) -> IrResult<()> {
        Category::Expression.require(NodeKind::AssignmentStatement, "left", &self.left)?;
        Category::Expression.require(NodeKind::AssignmentStatement, "right", &self.right)
    }

    fn dbprint_label(&self) -> String {
        "=".to_string()
    }

    fn visit_children(&self, v: &mut ChildVisitor<'_>) {
        v.node(&self.left);
        v.node(&self.right);
    }

    fn map_children(&self, m: &mut ChildMapper<'_>) -> IrResult<Option<Self>> {
        let left = m.node(&self.left)?;
        let right = m.node(&self.right)?;
        Ok(m.changed().then(|| AssignmentStatement { left, right, ..self.clone() }))
    }
}

#[derive(Debug, Clone)]
pub struct MethodCallStatement {
    pub src_info: SourceInfo,
    pub call: Arc<MethodCallExpression>,
}

impl MethodCallStatement {
    pub fn new(call: Arc<MethodCallExpression>) -> IrResult<Arc<Self>> {
        MethodCallStatement { src_info: call.src_info.clone(), call }.finish()
    }
}

impl fmt::Display for MethodCallStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{};", self.call)
    }
}

impl IrNode for MethodCallStatement {
    fn src_info(&self) -> &SourceInfo {
        &self.src_info
    }

    fn validate(&self) -> IrResult<()> {
        Ok(())
    }

    fn dbprint_label(&self) -> String {
        String::new()
    }

    fn visit_children(&self, v: &mut ChildVisitor<'_>) {
        v.typed(&self.call);
    }

    fn map_children(&self, m: &mut ChildMapper<'_>) -> IrResult<Option<Self>> {
        let call = m.typed(&self.call)?;
        Ok(m.changed().then(|| MethodCallStatement { call, ..self.clone() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::expressions::{Constant, PathExpression};

    #[test]
    fn test_block_accepts_statements_only() {
        let x: Node = PathExpression::named("x").unwrap().into();
        let one: Node = Constant::new(SourceInfo::invalid(), 1).unwrap().into();
        let assign: Node = AssignmentStatement::new(SourceInfo::invalid(), x.clone(), one).unwrap().into();
        assert_eq!(assign.to_string(), "x = 1;");
        assert!(BlockStatement::new(SourceInfo::invalid(), [assign]).is_ok());
        assert!(BlockStatement::new(SourceInfo::invalid(), [x]).is_err());
    }
}
