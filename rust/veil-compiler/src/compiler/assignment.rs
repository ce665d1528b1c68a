//! Normalised view of the assignment an identifier takes part in.
//!
//! `x = s;` and `uint x = s;` expose `s` in the same way, so both are turned
//! into one [`AssignmentView`] shape before classification.

use crate::compiler::ast::{AssignOp, Ast, NodeId, NodeKind, NodeTag};
use crate::compiler::path::NodePath;

/// Which side of the enclosing assignment a node is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    OnLeftHandSide,
    OnRightHandSide,
    Neither,
}

/// The statement an identifier sits in, as far as access tracking cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementContext {
    Assign(AssignmentView),
    /// `x++;` and friends, tracked by the incrementation analysis instead.
    Unary { statement: NodeId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssignmentView {
    pub statement: NodeId,
    /// The assigned node: an expression for assignments, a
    /// `VariableDeclaration` for declarations.
    pub lhs: NodeId,
    pub rhs: NodeId,
    /// `None` for declarations.
    pub operator: Option<AssignOp>,
    pub is_incremented: bool,
}

impl AssignmentView {
    pub fn from_assignment(ast: &Ast, statement: NodeId, assignment: NodeId) -> Option<Self> {
        let NodeKind::Assignment(a) = &ast.node(assignment).kind else {
            return None;
        };
        Some(Self {
            statement,
            lhs: a.left_hand_side,
            rhs: a.right_hand_side,
            operator: Some(a.operator),
            is_incremented: a.is_incremented,
        })
    }

    /// `T a = rhs;` viewed as `a = rhs;`. Only the first declared variable is
    /// the target; statements without an initializer have no view.
    pub fn from_declaration(ast: &Ast, statement: NodeId) -> Option<Self> {
        let NodeKind::VariableDeclarationStatement { declarations, initial_value } =
            &ast.node(statement).kind
        else {
            return None;
        };
        Some(Self {
            statement,
            lhs: declarations.first().copied().flatten()?,
            rhs: (*initial_value)?,
            operator: None,
            is_incremented: false,
        })
    }

    /// Side of this assignment `path` is on, decided by the nearest of the
    /// two operand subtrees containing it.
    pub fn position_of(&self, path: &NodePath<'_>) -> Position {
        for p in path.self_and_ancestors() {
            if p.id() == self.lhs {
                return Position::OnLeftHandSide;
            }
            if p.id() == self.rhs {
                return Position::OnRightHandSide;
            }
            if p.id() == self.statement {
                break;
            }
        }
        Position::Neither
    }

    /// Name of the assigned variable, looking through one member or index
    /// access (`a`, `a[k]`, `a.f`).
    pub fn target_name<'a>(&self, ast: &'a Ast) -> Option<&'a str> {
        let lhs = ast.node(self.lhs);
        match &lhs.kind {
            NodeKind::IndexAccess { base_expression: base, .. }
            | NodeKind::MemberAccess { expression: base, .. } => ast.node(*base).name(),
            _ => lhs.name(),
        }
    }

    /// Whether the target is a mapping entry (`m[k]`) or a field of one
    /// (`m[k].f`).
    pub fn targets_index(&self, ast: &Ast) -> bool {
        match &ast.node(self.lhs).kind {
            NodeKind::IndexAccess { .. } => true,
            NodeKind::MemberAccess { expression, .. } => {
                ast.node(*expression).tag() == NodeTag::IndexAccess
            }
            _ => false,
        }
    }
}

/// Find the statement context of `path`: the enclosing expression statement
/// if there is one, otherwise the enclosing declaration statement with an
/// initializer. Expression statements that are neither an assignment nor a
/// unary operation give no context.
pub fn normalize(path: &NodePath<'_>) -> Option<StatementContext> {
    let ast = path.ast();
    if let Some(stmt) = path.nearest_ancestor_of_kind(NodeTag::ExpressionStatement) {
        let NodeKind::ExpressionStatement { expression } = stmt.kind() else {
            return None;
        };
        return match ast.node(*expression).tag() {
            NodeTag::Assignment => {
                AssignmentView::from_assignment(ast, stmt.id(), *expression).map(StatementContext::Assign)
            }
            NodeTag::UnaryOperation => Some(StatementContext::Unary { statement: stmt.id() }),
            _ => None,
        };
    }
    let stmt = path.nearest_ancestor_of_kind(NodeTag::VariableDeclarationStatement)?;
    AssignmentView::from_declaration(ast, stmt.id()).map(StatementContext::Assign)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::json::parse_source_unit;
    use serde_json::json;

    fn ident(id: i64, start: usize, name: &str) -> serde_json::Value {
        json!({ "nodeType": "Identifier", "id": id, "src": format!("{}:1:0", start), "name": name })
    }

    fn block(statements: serde_json::Value) -> Ast {
        let unit = json!({
            "nodeType": "SourceUnit", "id": 1, "src": "0:100:0",
            "nodes": [{ "nodeType": "Block", "id": 2, "src": "0:100:0", "statements": statements }]
        });
        parse_source_unit(&unit.to_string()).unwrap()
    }

    #[test]
    fn assignment_statement() {
        let ast = block(json!([{
            "nodeType": "ExpressionStatement", "id": 3, "src": "0:10:0",
            "expression": {
                "nodeType": "Assignment", "id": 4, "src": "0:9:0", "operator": "*=",
                "leftHandSide": {
                    "nodeType": "IndexAccess", "id": 5, "src": "0:4:0",
                    "baseExpression": ident(6, 0, "m"),
                    "indexExpression": ident(7, 2, "k")
                },
                "rightHandSide": ident(8, 8, "s")
            }
        }]));
        let k = ast.path(ast.find(7).unwrap());
        let Some(StatementContext::Assign(view)) = normalize(&k) else {
            panic!("expected an assignment context");
        };
        assert_eq!(view.operator, Some(AssignOp::Mul));
        assert_eq!(view.position_of(&k), Position::OnLeftHandSide);
        assert_eq!(view.position_of(&ast.path(ast.find(8).unwrap())), Position::OnRightHandSide);
        assert_eq!(view.target_name(&ast), Some("m"));
        assert!(view.targets_index(&ast));
    }

    #[test]
    fn field_of_mapping_entry_is_an_index_target() {
        // m[k].f = s;
        let entry = json!({
            "nodeType": "IndexAccess", "id": 6, "src": "0:4:0",
            "baseExpression": ident(7, 0, "m"),
            "indexExpression": ident(8, 2, "k")
        });
        let field = json!({
            "nodeType": "MemberAccess", "id": 5, "src": "0:6:0", "memberName": "f", "expression": entry
        });
        let ast = block(json!([{
            "nodeType": "ExpressionStatement", "id": 3, "src": "0:12:0",
            "expression": {
                "nodeType": "Assignment", "id": 4, "src": "0:11:0", "operator": "=",
                "leftHandSide": field, "rightHandSide": ident(9, 10, "s")
            }
        }]));
        let s = ast.path(ast.find(9).unwrap());
        let Some(StatementContext::Assign(view)) = normalize(&s) else {
            panic!("expected an assignment context");
        };
        assert!(view.targets_index(&ast));
    }

    #[test]
    fn declaration_is_viewed_as_assignment() {
        let ast = block(json!([{
            "nodeType": "VariableDeclarationStatement", "id": 3, "src": "0:12:0",
            "declarations": [{ "nodeType": "VariableDeclaration", "id": 4, "src": "0:6:0", "name": "x" }],
            "initialValue": {
                "nodeType": "BinaryOperation", "id": 5, "src": "9:3:0", "operator": "+",
                "leftExpression": ident(6, 9, "s"),
                "rightExpression": { "nodeType": "Literal", "id": 7, "src": "11:1:0", "kind": "number", "value": "1" }
            }
        }]));
        let s = ast.path(ast.find(6).unwrap());
        let Some(StatementContext::Assign(view)) = normalize(&s) else {
            panic!("expected an assignment context");
        };
        assert_eq!(view.operator, None);
        assert!(!view.is_incremented);
        assert_eq!(view.position_of(&s), Position::OnRightHandSide);
        assert_eq!(view.target_name(&ast), Some("x"));
        assert!(!view.targets_index(&ast));
    }

    #[test]
    fn declaration_without_initializer_has_no_context() {
        let ast = block(json!([{
            "nodeType": "VariableDeclarationStatement", "id": 3, "src": "0:6:0",
            "declarations": [{
                "nodeType": "VariableDeclaration", "id": 4, "src": "0:6:0", "name": "x",
                "typeName": { "nodeType": "UserDefinedTypeName", "id": 5, "src": "0:1:0",
                              "pathNode": ident(6, 0, "T") }
            }]
        }]));
        assert_eq!(normalize(&ast.path(ast.find(6).unwrap())), None);
    }

    #[test]
    fn unary_and_call_statements() {
        let ast = block(json!([
            {
                "nodeType": "ExpressionStatement", "id": 3, "src": "0:4:0",
                "expression": { "nodeType": "UnaryOperation", "id": 4, "src": "0:3:0", "operator": "++", "subExpression": ident(5, 0, "x") }
            },
            {
                "nodeType": "ExpressionStatement", "id": 6, "src": "10:10:0",
                "expression": { "nodeType": "FunctionCall", "id": 7, "src": "10:9:0", "expression": ident(8, 10, "f"), "arguments": [ident(9, 12, "y")] }
            }
        ]));
        assert_eq!(
            normalize(&ast.path(ast.find(5).unwrap())),
            Some(StatementContext::Unary { statement: ast.find(3).unwrap() })
        );
        assert_eq!(normalize(&ast.path(ast.find(9).unwrap())), None);
    }

    #[test]
    fn outside_any_statement() {
        let ast = block(json!([]));
        assert_eq!(normalize(&ast.path(ast.find(2).unwrap())), None);
    }
}
