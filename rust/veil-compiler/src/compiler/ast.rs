//! Arena representation of a contract syntax tree.
//!
//! Nodes are produced by the front end (see [`crate::compiler::json`]) and
//! keep their shape for the rest of compilation. Each node records its parent
//! and the field of the parent it occupies, which is what ancestor queries in
//! [`crate::compiler::path`] are built on.

use crate::compiler::path::NodePath;
use crate::compiler::span::SrcSpan;
use serde::Deserialize;
use std::collections::HashMap;
use strum::{Display, EnumDiscriminants, EnumString};

/// Index of a node inside its [`Ast`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The field of its parent a node is stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "camelCase")]
pub enum Slot {
    Nodes,
    Parameters,
    ReturnParameters,
    Body,
    Statements,
    Declarations,
    InitialValue,
    Expression,
    LeftHandSide,
    RightHandSide,
    LeftExpression,
    RightExpression,
    SubExpression,
    BaseExpression,
    IndexExpression,
    Arguments,
    Components,
    TypeName,
    KeyType,
    ValueType,
    Value,
    Condition,
    TrueBody,
    FalseBody,
    /// Child of a node kind this compiler does not model.
    Nested,
}

/// Assignment operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Display, EnumString)]
pub enum AssignOp {
    #[serde(rename = "=")]
    #[strum(serialize = "=")]
    Assign,
    #[serde(rename = "+=")]
    #[strum(serialize = "+=")]
    Add,
    #[serde(rename = "-=")]
    #[strum(serialize = "-=")]
    Sub,
    #[serde(rename = "*=")]
    #[strum(serialize = "*=")]
    Mul,
    #[serde(rename = "/=")]
    #[strum(serialize = "/=")]
    Div,
    #[serde(rename = "%=")]
    #[strum(serialize = "%=")]
    Mod,
    #[serde(rename = "|=")]
    #[strum(serialize = "|=")]
    BitOr,
    #[serde(rename = "&=")]
    #[strum(serialize = "&=")]
    BitAnd,
    #[serde(rename = "^=")]
    #[strum(serialize = "^=")]
    BitXor,
    #[serde(rename = "<<=")]
    #[strum(serialize = "<<=")]
    Shl,
    #[serde(rename = ">>=")]
    #[strum(serialize = ">>=")]
    Shr,
}

impl AssignOp {
    /// Compound arithmetic forms whose result depends on the target's current
    /// value: `*=`, `+=` and `-=`.
    pub fn reads_target(self) -> bool {
        matches!(self, AssignOp::Mul | AssignOp::Add | AssignOp::Sub)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableDeclaration {
    pub name: String,
    pub type_name: Option<NodeId>,
    pub value: Option<NodeId>,
    /// Contract-persistent (as opposed to a parameter or local).
    pub state_variable: bool,
    pub is_secret: bool,
    /// Already represented as a set of independently spendable partitions.
    pub is_partitioned: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub operator: AssignOp,
    pub left_hand_side: NodeId,
    pub right_hand_side: NodeId,
    /// Set by the incrementation analysis for `a += b` / `a = a + b` shapes.
    pub is_incremented: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Identifier {
    pub name: String,
    /// Declaration this identifier refers to; absent for unresolved names.
    pub referenced_declaration: Option<i64>,
}

/// Per-kind payload of a node. Children are referenced by [`NodeId`].
#[derive(Debug, Clone, PartialEq, EnumDiscriminants)]
#[strum_discriminants(name(NodeTag), derive(Hash, Display, EnumString))]
pub enum NodeKind {
    SourceUnit {
        nodes: Vec<NodeId>,
    },
    PragmaDirective {
        literals: Vec<String>,
    },
    ContractDefinition {
        name: String,
        nodes: Vec<NodeId>,
    },
    FunctionDefinition {
        name: String,
        parameters: Option<NodeId>,
        return_parameters: Option<NodeId>,
        body: Option<NodeId>,
    },
    ParameterList {
        parameters: Vec<NodeId>,
    },
    Block {
        statements: Vec<NodeId>,
    },
    VariableDeclarationStatement {
        declarations: Vec<Option<NodeId>>,
        initial_value: Option<NodeId>,
    },
    VariableDeclaration(VariableDeclaration),
    ExpressionStatement {
        expression: NodeId,
    },
    Assignment(Assignment),
    UnaryOperation {
        operator: String,
        prefix: bool,
        sub_expression: NodeId,
    },
    BinaryOperation {
        operator: String,
        left_expression: NodeId,
        right_expression: NodeId,
    },
    Identifier(Identifier),
    MemberAccess {
        expression: NodeId,
        member_name: String,
    },
    IndexAccess {
        base_expression: NodeId,
        index_expression: Option<NodeId>,
    },
    Literal {
        kind: String,
        value: Option<String>,
    },
    ElementaryTypeName {
        name: String,
    },
    Mapping {
        key_type: NodeId,
        value_type: NodeId,
    },
    Return {
        expression: Option<NodeId>,
    },
    IfStatement {
        condition: NodeId,
        true_body: NodeId,
        false_body: Option<NodeId>,
    },
    FunctionCall {
        expression: NodeId,
        arguments: Vec<NodeId>,
    },
    TupleExpression {
        components: Vec<Option<NodeId>>,
    },
    /// A node kind without a dedicated model; its node children are kept in
    /// source order.
    Other {
        node_type: String,
        children: Vec<NodeId>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Id assigned by the front end (declaration ids refer to these).
    pub id: i64,
    pub src: SrcSpan,
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub slot: Option<Slot>,
    /// Set by the access resolver on identifiers whose read exposes a secret
    /// state's current value.
    pub accessed_secret_state: bool,
}

impl Node {
    pub fn tag(&self) -> NodeTag {
        NodeTag::from(&self.kind)
    }

    /// Declared or referenced name, for the kinds that have one.
    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Identifier(ident) => Some(&ident.name),
            NodeKind::VariableDeclaration(decl) => Some(&decl.name),
            NodeKind::ContractDefinition { name, .. } | NodeKind::FunctionDefinition { name, .. } => {
                Some(name)
            }
            _ => None,
        }
    }
}

/// A whole source unit.
#[derive(Debug, Clone)]
pub struct Ast {
    nodes: Vec<Node>,
    by_ast_id: HashMap<i64, NodeId>,
}

impl Ast {
    pub(crate) fn new() -> Self {
        Self { nodes: Vec::new(), by_ast_id: HashMap::new() }
    }

    /// Allocate a node with a placeholder kind; the builder fills it in once
    /// the children have been allocated.
    pub(crate) fn reserve(&mut self, id: i64, src: SrcSpan, parent: Option<NodeId>, slot: Option<Slot>) -> NodeId {
        let node_id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            id,
            src,
            kind: NodeKind::Other { node_type: String::new(), children: Vec::new() },
            parent,
            slot,
            accessed_secret_state: false,
        });
        self.by_ast_id.entry(id).or_insert(node_id);
        node_id
    }

    pub(crate) fn set_kind(&mut self, id: NodeId, kind: NodeKind) {
        self.nodes[id.index()].kind = kind;
    }

    /// The source unit. Always the first node allocated.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub fn path(&self, id: NodeId) -> NodePath<'_> {
        NodePath::new(self, id)
    }

    /// Look a node up by the id the front end gave it.
    pub fn find(&self, ast_id: i64) -> Option<NodeId> {
        self.by_ast_id.get(&ast_id).copied()
    }

    /// Nodes in allocation order (a pre-order of the tree).
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i as u32), n))
    }

    /// Direct children of `id`, in source order, with the field each occupies.
    pub fn children(&self, id: NodeId) -> Vec<(Slot, NodeId)> {
        fn many(out: &mut Vec<(Slot, NodeId)>, slot: Slot, ids: &[NodeId]) {
            out.extend(ids.iter().map(|&c| (slot, c)));
        }
        fn sparse(out: &mut Vec<(Slot, NodeId)>, slot: Slot, ids: &[Option<NodeId>]) {
            out.extend(ids.iter().flatten().map(|&c| (slot, c)));
        }
        fn opt(out: &mut Vec<(Slot, NodeId)>, slot: Slot, id: Option<NodeId>) {
            out.extend(id.map(|c| (slot, c)));
        }

        let mut out = Vec::new();
        match &self.node(id).kind {
            NodeKind::SourceUnit { nodes } | NodeKind::ContractDefinition { nodes, .. } => {
                many(&mut out, Slot::Nodes, nodes)
            }
            NodeKind::PragmaDirective { .. }
            | NodeKind::Identifier(_)
            | NodeKind::Literal { .. }
            | NodeKind::ElementaryTypeName { .. } => {}
            NodeKind::FunctionDefinition { parameters, return_parameters, body, .. } => {
                opt(&mut out, Slot::Parameters, *parameters);
                opt(&mut out, Slot::ReturnParameters, *return_parameters);
                opt(&mut out, Slot::Body, *body);
            }
            NodeKind::ParameterList { parameters } => many(&mut out, Slot::Parameters, parameters),
            NodeKind::Block { statements } => many(&mut out, Slot::Statements, statements),
            NodeKind::VariableDeclarationStatement { declarations, initial_value } => {
                sparse(&mut out, Slot::Declarations, declarations);
                opt(&mut out, Slot::InitialValue, *initial_value);
            }
            NodeKind::VariableDeclaration(decl) => {
                opt(&mut out, Slot::TypeName, decl.type_name);
                opt(&mut out, Slot::Value, decl.value);
            }
            NodeKind::ExpressionStatement { expression } => out.push((Slot::Expression, *expression)),
            NodeKind::Assignment(assign) => {
                out.push((Slot::LeftHandSide, assign.left_hand_side));
                out.push((Slot::RightHandSide, assign.right_hand_side));
            }
            NodeKind::UnaryOperation { sub_expression, .. } => {
                out.push((Slot::SubExpression, *sub_expression))
            }
            NodeKind::BinaryOperation { left_expression, right_expression, .. } => {
                out.push((Slot::LeftExpression, *left_expression));
                out.push((Slot::RightExpression, *right_expression));
            }
            NodeKind::MemberAccess { expression, .. } => out.push((Slot::Expression, *expression)),
            NodeKind::IndexAccess { base_expression, index_expression } => {
                out.push((Slot::BaseExpression, *base_expression));
                opt(&mut out, Slot::IndexExpression, *index_expression);
            }
            NodeKind::Mapping { key_type, value_type } => {
                out.push((Slot::KeyType, *key_type));
                out.push((Slot::ValueType, *value_type));
            }
            NodeKind::Return { expression } => opt(&mut out, Slot::Expression, *expression),
            NodeKind::IfStatement { condition, true_body, false_body } => {
                out.push((Slot::Condition, *condition));
                out.push((Slot::TrueBody, *true_body));
                opt(&mut out, Slot::FalseBody, *false_body);
            }
            NodeKind::FunctionCall { expression, arguments } => {
                out.push((Slot::Expression, *expression));
                many(&mut out, Slot::Arguments, arguments);
            }
            NodeKind::TupleExpression { components } => sparse(&mut out, Slot::Components, components),
            NodeKind::Other { children, .. } => many(&mut out, Slot::Nested, children),
        }
        out
    }
}
