//! Lowering of the front end's compact JSON AST into an [`Ast`].
//!
//! Every object carrying a `nodeType` becomes one node. Kinds with a model in
//! [`NodeKind`] are decoded field by field; any other kind is kept as
//! [`NodeKind::Other`] with its node-valued fields as children, so that
//! identifiers nested inside (say) a loop are still visited.

use crate::compiler::ast::{
    AssignOp, Assignment, Ast, Identifier, NodeId, NodeKind, Slot, VariableDeclaration,
};
use crate::compiler::span::{SpanParseError, SrcSpan};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JsonError {
    #[error("invalid AST JSON: {0}")]
    Syntax(#[from] serde_json::Error),
    #[error("malformed {node_type} node (id {id}): {source}")]
    Malformed {
        node_type: String,
        id: i64,
        #[source]
        source: serde_json::Error,
    },
    #[error("field '{slot}' of node {parent} does not hold a node")]
    NotANode { slot: Slot, parent: i64 },
    #[error(transparent)]
    Span(#[from] SpanParseError),
    #[error("root node must be a SourceUnit, found {0}")]
    NotASourceUnit(String),
}

/// Parse a JSON source unit.
pub fn parse_source_unit(json: &str) -> Result<Ast, JsonError> {
    let value: Value = serde_json::from_str(json)?;
    lower_source_unit(&value)
}

/// Lower an already-decoded JSON source unit.
pub fn lower_source_unit(value: &Value) -> Result<Ast, JsonError> {
    let header = Header::deserialize(value)?;
    if header.node_type != "SourceUnit" {
        return Err(JsonError::NotASourceUnit(header.node_type));
    }
    let mut lowering = Lowering { ast: Ast::new() };
    lowering.lower(value, None)?;
    Ok(lowering.ast)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Header {
    node_type: String,
    id: i64,
    #[serde(default)]
    src: Option<String>,
}

#[derive(Deserialize)]
struct NodesFields {
    #[serde(default)]
    nodes: Vec<Value>,
}

#[derive(Deserialize)]
struct PragmaFields {
    #[serde(default)]
    literals: Vec<String>,
}

#[derive(Deserialize)]
struct ContractFields {
    name: String,
    #[serde(default)]
    nodes: Vec<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FunctionFields {
    #[serde(default)]
    name: String,
    #[serde(default)]
    parameters: Option<Value>,
    #[serde(default)]
    return_parameters: Option<Value>,
    #[serde(default)]
    body: Option<Value>,
}

#[derive(Deserialize)]
struct ParameterListFields {
    #[serde(default)]
    parameters: Vec<Value>,
}

#[derive(Deserialize)]
struct BlockFields {
    #[serde(default)]
    statements: Vec<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeclarationStatementFields {
    declarations: Vec<Option<Value>>,
    #[serde(default)]
    initial_value: Option<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeclarationFields {
    name: String,
    #[serde(default)]
    type_name: Option<Value>,
    #[serde(default)]
    value: Option<Value>,
    #[serde(default)]
    state_variable: bool,
    #[serde(default)]
    is_secret: bool,
    #[serde(default)]
    is_partitioned: bool,
}

#[derive(Deserialize)]
struct ExpressionFields {
    expression: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssignmentFields {
    operator: AssignOp,
    left_hand_side: Value,
    right_hand_side: Value,
    #[serde(default)]
    is_incremented: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UnaryFields {
    operator: String,
    #[serde(default)]
    prefix: bool,
    sub_expression: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BinaryFields {
    operator: String,
    left_expression: Value,
    right_expression: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentifierFields {
    name: String,
    #[serde(default)]
    referenced_declaration: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MemberAccessFields {
    expression: Value,
    member_name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndexAccessFields {
    base_expression: Value,
    #[serde(default)]
    index_expression: Option<Value>,
}

#[derive(Deserialize)]
struct LiteralFields {
    #[serde(default)]
    kind: String,
    #[serde(default)]
    value: Option<String>,
}

#[derive(Deserialize)]
struct TypeNameFields {
    #[serde(default)]
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MappingFields {
    key_type: Value,
    value_type: Value,
}

#[derive(Deserialize)]
struct ReturnFields {
    #[serde(default)]
    expression: Option<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IfFields {
    condition: Value,
    true_body: Value,
    #[serde(default)]
    false_body: Option<Value>,
}

#[derive(Deserialize)]
struct CallFields {
    expression: Value,
    #[serde(default)]
    arguments: Vec<Value>,
}

#[derive(Deserialize)]
struct TupleFields {
    #[serde(default)]
    components: Vec<Option<Value>>,
}

struct Lowering {
    ast: Ast,
}

impl Lowering {
    fn lower(&mut self, value: &Value, parent: Option<(NodeId, Slot)>) -> Result<NodeId, JsonError> {
        let header = match Header::deserialize(value) {
            Ok(h) => h,
            Err(_) => {
                let (slot, parent_ast_id) = parent
                    .map(|(p, s)| (s, self.ast.node(p).id))
                    .unwrap_or((Slot::Nodes, -1));
                return Err(JsonError::NotANode { slot, parent: parent_ast_id });
            }
        };
        let src = match header.src.as_deref() {
            Some(s) => s.parse()?,
            None => SrcSpan::dummy(),
        };
        let id = self.ast.reserve(header.id, src, parent.map(|p| p.0), parent.map(|p| p.1));
        let kind = self.lower_kind(&header, value, id)?;
        self.ast.set_kind(id, kind);
        Ok(id)
    }

    fn lower_kind(&mut self, header: &Header, value: &Value, id: NodeId) -> Result<NodeKind, JsonError> {
        let kind = match header.node_type.as_str() {
            "SourceUnit" => {
                let f: NodesFields = fields(header, value)?;
                NodeKind::SourceUnit { nodes: self.many(&f.nodes, id, Slot::Nodes)? }
            }
            "PragmaDirective" => {
                let f: PragmaFields = fields(header, value)?;
                NodeKind::PragmaDirective { literals: f.literals }
            }
            "ContractDefinition" => {
                let f: ContractFields = fields(header, value)?;
                NodeKind::ContractDefinition {
                    name: f.name,
                    nodes: self.many(&f.nodes, id, Slot::Nodes)?,
                }
            }
            "FunctionDefinition" => {
                let f: FunctionFields = fields(header, value)?;
                NodeKind::FunctionDefinition {
                    name: f.name,
                    parameters: self.opt(f.parameters.as_ref(), id, Slot::Parameters)?,
                    return_parameters: self.opt(f.return_parameters.as_ref(), id, Slot::ReturnParameters)?,
                    body: self.opt(f.body.as_ref(), id, Slot::Body)?,
                }
            }
            "ParameterList" => {
                let f: ParameterListFields = fields(header, value)?;
                NodeKind::ParameterList { parameters: self.many(&f.parameters, id, Slot::Parameters)? }
            }
            "Block" | "UncheckedBlock" => {
                let f: BlockFields = fields(header, value)?;
                NodeKind::Block { statements: self.many(&f.statements, id, Slot::Statements)? }
            }
            "VariableDeclarationStatement" => {
                let f: DeclarationStatementFields = fields(header, value)?;
                let declarations = f
                    .declarations
                    .iter()
                    .map(|d| self.opt(d.as_ref(), id, Slot::Declarations))
                    .collect::<Result<Vec<_>, _>>()?;
                NodeKind::VariableDeclarationStatement {
                    declarations,
                    initial_value: self.opt(f.initial_value.as_ref(), id, Slot::InitialValue)?,
                }
            }
            "VariableDeclaration" => {
                let f: DeclarationFields = fields(header, value)?;
                NodeKind::VariableDeclaration(VariableDeclaration {
                    name: f.name,
                    type_name: self.opt(f.type_name.as_ref(), id, Slot::TypeName)?,
                    value: self.opt(f.value.as_ref(), id, Slot::Value)?,
                    state_variable: f.state_variable,
                    is_secret: f.is_secret,
                    is_partitioned: f.is_partitioned,
                })
            }
            "ExpressionStatement" => {
                let f: ExpressionFields = fields(header, value)?;
                NodeKind::ExpressionStatement { expression: self.one(&f.expression, id, Slot::Expression)? }
            }
            "Assignment" => {
                let f: AssignmentFields = fields(header, value)?;
                NodeKind::Assignment(Assignment {
                    operator: f.operator,
                    left_hand_side: self.one(&f.left_hand_side, id, Slot::LeftHandSide)?,
                    right_hand_side: self.one(&f.right_hand_side, id, Slot::RightHandSide)?,
                    is_incremented: f.is_incremented,
                })
            }
            "UnaryOperation" => {
                let f: UnaryFields = fields(header, value)?;
                NodeKind::UnaryOperation {
                    operator: f.operator,
                    prefix: f.prefix,
                    sub_expression: self.one(&f.sub_expression, id, Slot::SubExpression)?,
                }
            }
            "BinaryOperation" => {
                let f: BinaryFields = fields(header, value)?;
                NodeKind::BinaryOperation {
                    operator: f.operator,
                    left_expression: self.one(&f.left_expression, id, Slot::LeftExpression)?,
                    right_expression: self.one(&f.right_expression, id, Slot::RightExpression)?,
                }
            }
            "Identifier" => {
                let f: IdentifierFields = fields(header, value)?;
                NodeKind::Identifier(Identifier {
                    name: f.name,
                    referenced_declaration: f.referenced_declaration,
                })
            }
            "MemberAccess" => {
                let f: MemberAccessFields = fields(header, value)?;
                NodeKind::MemberAccess {
                    expression: self.one(&f.expression, id, Slot::Expression)?,
                    member_name: f.member_name,
                }
            }
            "IndexAccess" => {
                let f: IndexAccessFields = fields(header, value)?;
                NodeKind::IndexAccess {
                    base_expression: self.one(&f.base_expression, id, Slot::BaseExpression)?,
                    index_expression: self.opt(f.index_expression.as_ref(), id, Slot::IndexExpression)?,
                }
            }
            "Literal" => {
                let f: LiteralFields = fields(header, value)?;
                NodeKind::Literal { kind: f.kind, value: f.value }
            }
            "ElementaryTypeName" => {
                let f: TypeNameFields = fields(header, value)?;
                NodeKind::ElementaryTypeName { name: f.name }
            }
            "Mapping" => {
                let f: MappingFields = fields(header, value)?;
                NodeKind::Mapping {
                    key_type: self.one(&f.key_type, id, Slot::KeyType)?,
                    value_type: self.one(&f.value_type, id, Slot::ValueType)?,
                }
            }
            "Return" => {
                let f: ReturnFields = fields(header, value)?;
                NodeKind::Return { expression: self.opt(f.expression.as_ref(), id, Slot::Expression)? }
            }
            "IfStatement" => {
                let f: IfFields = fields(header, value)?;
                NodeKind::IfStatement {
                    condition: self.one(&f.condition, id, Slot::Condition)?,
                    true_body: self.one(&f.true_body, id, Slot::TrueBody)?,
                    false_body: self.opt(f.false_body.as_ref(), id, Slot::FalseBody)?,
                }
            }
            "FunctionCall" => {
                let f: CallFields = fields(header, value)?;
                NodeKind::FunctionCall {
                    expression: self.one(&f.expression, id, Slot::Expression)?,
                    arguments: self.many(&f.arguments, id, Slot::Arguments)?,
                }
            }
            "TupleExpression" => {
                let f: TupleFields = fields(header, value)?;
                let components = f
                    .components
                    .iter()
                    .map(|c| self.opt(c.as_ref(), id, Slot::Components))
                    .collect::<Result<Vec<_>, _>>()?;
                NodeKind::TupleExpression { components }
            }
            other => NodeKind::Other {
                node_type: other.to_string(),
                children: self.nested(value, id)?,
            },
        };
        Ok(kind)
    }

    fn one(&mut self, value: &Value, parent: NodeId, slot: Slot) -> Result<NodeId, JsonError> {
        self.lower(value, Some((parent, slot)))
    }

    fn opt(&mut self, value: Option<&Value>, parent: NodeId, slot: Slot) -> Result<Option<NodeId>, JsonError> {
        match value {
            None | Some(Value::Null) => Ok(None),
            Some(v) => self.one(v, parent, slot).map(Some),
        }
    }

    fn many(&mut self, values: &[Value], parent: NodeId, slot: Slot) -> Result<Vec<NodeId>, JsonError> {
        values.iter().map(|v| self.one(v, parent, slot)).collect()
    }

    /// Node-valued fields of an unmodelled kind, ordered by source position.
    fn nested(&mut self, value: &Value, parent: NodeId) -> Result<Vec<NodeId>, JsonError> {
        let Value::Object(map) = value else {
            return Ok(Vec::new());
        };
        let mut found: Vec<&Value> = Vec::new();
        for (key, field) in map {
            if key == "nodeType" {
                continue;
            }
            match field {
                Value::Object(obj) if obj.contains_key("nodeType") => found.push(field),
                Value::Array(items) => found.extend(
                    items
                        .iter()
                        .filter(|i| matches!(i, Value::Object(o) if o.contains_key("nodeType"))),
                ),
                _ => {}
            }
        }
        found.sort_by_key(|v| {
            v.get("src")
                .and_then(Value::as_str)
                .and_then(|s| s.parse::<SrcSpan>().ok())
                .map_or(usize::MAX, |s| s.start)
        });
        found.into_iter().map(|v| self.one(v, parent, Slot::Nested)).collect()
    }
}

fn fields<T: DeserializeOwned>(header: &Header, value: &Value) -> Result<T, JsonError> {
    T::deserialize(value).map_err(|source| JsonError::Malformed {
        node_type: header.node_type.clone(),
        id: header.id,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::ast::NodeTag;
    use serde_json::json;

    fn unit(body: Value) -> String {
        json!({
            "nodeType": "SourceUnit", "id": 1, "src": "0:100:0",
            "nodes": [body]
        })
        .to_string()
    }

    #[test]
    fn lowers_assignment_with_annotations() {
        let src = unit(json!({
            "nodeType": "ExpressionStatement", "id": 2, "src": "0:10:0",
            "expression": {
                "nodeType": "Assignment", "id": 3, "src": "0:9:0",
                "operator": "+=", "isIncremented": true,
                "leftHandSide": { "nodeType": "Identifier", "id": 4, "src": "0:1:0", "name": "a", "referencedDeclaration": 10 },
                "rightHandSide": { "nodeType": "Literal", "id": 5, "src": "5:1:0", "kind": "number", "value": "1" }
            }
        }));
        let ast = parse_source_unit(&src).unwrap();
        let assign = ast.node(ast.find(3).unwrap());
        let NodeKind::Assignment(a) = &assign.kind else {
            panic!("expected assignment, got {:?}", assign.kind);
        };
        assert_eq!(a.operator, AssignOp::Add);
        assert!(a.is_incremented);
        assert_eq!(ast.node(a.left_hand_side).slot, Some(Slot::LeftHandSide));
        assert_eq!(ast.node(a.right_hand_side).tag(), NodeTag::Literal);
    }

    #[test]
    fn declaration_flags_default_to_false() {
        let src = unit(json!({
            "nodeType": "VariableDeclaration", "id": 2, "src": "0:6:0", "name": "x",
            "typeName": { "nodeType": "ElementaryTypeName", "id": 3, "src": "0:4:0", "name": "uint" }
        }));
        let ast = parse_source_unit(&src).unwrap();
        let NodeKind::VariableDeclaration(decl) = &ast.node(ast.find(2).unwrap()).kind else {
            panic!("expected declaration");
        };
        assert!(!decl.is_secret && !decl.state_variable && !decl.is_partitioned);
        assert!(decl.type_name.is_some());
    }

    #[test]
    fn unknown_kinds_keep_node_children_in_source_order() {
        let src = unit(json!({
            "nodeType": "ForStatement", "id": 2, "src": "0:50:0",
            "loopExpression": { "nodeType": "Identifier", "id": 4, "src": "30:1:0", "name": "b" },
            "condition": { "nodeType": "Identifier", "id": 3, "src": "10:1:0", "name": "a" },
            "documentation": "not a node"
        }));
        let ast = parse_source_unit(&src).unwrap();
        let for_id = ast.find(2).unwrap();
        let NodeKind::Other { node_type, children } = &ast.node(for_id).kind else {
            panic!("expected opaque node");
        };
        assert_eq!(node_type, "ForStatement");
        let ids: Vec<i64> = children.iter().map(|c| ast.node(*c).id).collect();
        assert_eq!(ids, vec![3, 4]);
    }

    #[test]
    fn tuple_declarations_may_have_holes() {
        let src = unit(json!({
            "nodeType": "VariableDeclarationStatement", "id": 2, "src": "0:20:0",
            "declarations": [null, { "nodeType": "VariableDeclaration", "id": 3, "src": "3:1:0", "name": "y" }],
            "initialValue": { "nodeType": "Identifier", "id": 4, "src": "10:1:0", "name": "t" }
        }));
        let ast = parse_source_unit(&src).unwrap();
        let children = ast.children(ast.find(2).unwrap());
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].0, Slot::Declarations);
        assert_eq!(children[1].0, Slot::InitialValue);
    }

    #[test]
    fn malformed_known_node_is_an_error() {
        let src = unit(json!({
            "nodeType": "Assignment", "id": 7, "src": "0:1:0", "operator": "=",
            "leftHandSide": { "nodeType": "Identifier", "id": 8, "src": "0:1:0", "name": "a" }
        }));
        let err = parse_source_unit(&src).unwrap_err();
        assert!(
            matches!(err, JsonError::Malformed { ref node_type, id: 7, .. } if node_type == "Assignment"),
            "expected malformed assignment, got: {:?}",
            err
        );
    }

    #[test]
    fn root_must_be_source_unit() {
        let err = parse_source_unit(r#"{"nodeType": "Block", "id": 1, "statements": []}"#).unwrap_err();
        assert!(matches!(err, JsonError::NotASourceUnit(ref t) if t == "Block"), "got: {:?}", err);
    }

    #[test]
    fn bad_span_is_an_error() {
        let err = parse_source_unit(r#"{"nodeType": "SourceUnit", "id": 1, "src": "x", "nodes": []}"#).unwrap_err();
        assert!(matches!(err, JsonError::Span(_)), "got: {:?}", err);
    }
}
