//! Navigation handles over an [`Ast`].

use crate::compiler::ast::{Ast, Node, NodeId, NodeKind, NodeTag, Slot};

/// A node together with the tree it lives in, so that its ancestor chain can
/// be queried.
#[derive(Debug, Clone, Copy)]
pub struct NodePath<'a> {
    ast: &'a Ast,
    id: NodeId,
}

impl<'a> NodePath<'a> {
    pub fn new(ast: &'a Ast, id: NodeId) -> Self {
        Self { ast, id }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn ast(&self) -> &'a Ast {
        self.ast
    }

    pub fn node(&self) -> &'a Node {
        self.ast.node(self.id)
    }

    pub fn kind(&self) -> &'a NodeKind {
        &self.node().kind
    }

    pub fn tag(&self) -> NodeTag {
        self.node().tag()
    }

    /// Field of the parent this node occupies (`None` for the root).
    pub fn slot(&self) -> Option<Slot> {
        self.node().slot
    }

    pub fn parent(&self) -> Option<NodePath<'a>> {
        self.node().parent.map(|p| NodePath::new(self.ast, p))
    }

    /// Strict ancestors, nearest first.
    pub fn ancestors(&self) -> impl Iterator<Item = NodePath<'a>> {
        std::iter::successors(self.parent(), |p| p.parent())
    }

    /// This node followed by its ancestors.
    pub fn self_and_ancestors(&self) -> impl Iterator<Item = NodePath<'a>> {
        std::iter::successors(Some(*self), |p| p.parent())
    }

    /// Nearest strict ancestor of the given kind.
    pub fn nearest_ancestor_of_kind(&self, tag: NodeTag) -> Option<NodePath<'a>> {
        self.ancestors().find(|p| p.tag() == tag)
    }

    /// Nearest node on the chain from this node up to the root that sits in
    /// `slot` of its parent. `Some` means this node is reachable through that
    /// field.
    pub fn nearest_in_slot(&self, slot: Slot) -> Option<NodePath<'a>> {
        self.self_and_ancestors().find(|p| p.slot() == Some(slot))
    }

    /// The function this node is written in, if any.
    pub fn enclosing_function(&self) -> Option<NodePath<'a>> {
        self.nearest_ancestor_of_kind(NodeTag::FunctionDefinition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::json::parse_source_unit;
    use serde_json::json;

    fn ident(id: i64, src: &str, name: &str, decl: i64) -> serde_json::Value {
        json!({ "nodeType": "Identifier", "id": id, "src": src, "name": name, "referencedDeclaration": decl })
    }

    /// `contract C { function f() { m[k] = v; } }`
    fn tree() -> Ast {
        let target = json!({
            "nodeType": "IndexAccess", "id": 7, "src": "22:4:0",
            "baseExpression": ident(8, "22:1:0", "m", 100),
            "indexExpression": ident(9, "24:1:0", "k", 101)
        });
        let statement = json!({
            "nodeType": "ExpressionStatement", "id": 5, "src": "22:12:0",
            "expression": {
                "nodeType": "Assignment", "id": 6, "src": "22:11:0", "operator": "=",
                "leftHandSide": target, "rightHandSide": ident(10, "29:1:0", "v", 102)
            }
        });
        let function = json!({
            "nodeType": "FunctionDefinition", "id": 3, "src": "10:40:0", "name": "f",
            "body": { "nodeType": "Block", "id": 4, "src": "20:30:0", "statements": [statement] }
        });
        let unit = json!({
            "nodeType": "SourceUnit", "id": 1, "src": "0:60:0",
            "nodes": [{ "nodeType": "ContractDefinition", "id": 2, "src": "0:60:0", "name": "C", "nodes": [function] }]
        });
        parse_source_unit(&unit.to_string()).unwrap()
    }

    #[test]
    fn parent_and_slot() {
        let ast = tree();
        let m = ast.path(ast.find(8).unwrap());
        assert_eq!(m.slot(), Some(Slot::BaseExpression));
        assert_eq!(m.parent().unwrap().tag(), NodeTag::IndexAccess);
    }

    #[test]
    fn nearest_ancestor_of_kind_skips_self() {
        let ast = tree();
        let stmt = ast.path(ast.find(5).unwrap());
        assert!(stmt.nearest_ancestor_of_kind(NodeTag::ExpressionStatement).is_none());
        let v = ast.path(ast.find(10).unwrap());
        assert_eq!(v.nearest_ancestor_of_kind(NodeTag::ExpressionStatement).unwrap().id(), stmt.id());
    }

    #[test]
    fn slot_containment_sees_through_nesting() {
        let ast = tree();
        let k = ast.path(ast.find(9).unwrap());
        assert!(k.nearest_in_slot(Slot::LeftHandSide).is_some());
        assert!(k.nearest_in_slot(Slot::IndexExpression).is_some());
        assert!(k.nearest_in_slot(Slot::RightHandSide).is_none());
        let v = ast.path(ast.find(10).unwrap());
        assert_eq!(v.nearest_in_slot(Slot::RightHandSide).unwrap().id(), v.id());
    }

    #[test]
    fn enclosing_function() {
        let ast = tree();
        let v = ast.path(ast.find(10).unwrap());
        assert_eq!(v.enclosing_function().unwrap().node().name(), Some("f"));
        let contract = ast.path(ast.find(2).unwrap());
        assert!(contract.enclosing_function().is_none());
    }
}
