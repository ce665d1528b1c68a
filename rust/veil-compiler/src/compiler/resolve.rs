//! Binding resolution: one binding per declared variable, one indicator
//! scope per function.

use crate::compiler::ast::*;
use crate::compiler::indicator::FunctionScope;
use crate::compiler::span::SrcSpan;
use std::collections::BTreeMap;
use thiserror::Error;

/// Declaration id, as assigned by the front end.
pub type DeclId = i64;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("duplicate declaration id {id} for '{name}' at {at}")]
    DuplicateDeclaration { id: DeclId, name: String, at: SrcSpan },
}

/// What the compiler knows about a declared variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub id: DeclId,
    pub name: String,
    pub node: NodeId,
    pub is_secret: bool,
    pub state_variable: bool,
    pub is_partitioned: bool,
    pub declared_at: SrcSpan,
    /// Set once any identifier referring to this binding reads its value.
    pub is_accessed: bool,
    /// Identifiers that triggered an access, in traversal order.
    pub accessed_nodes: Vec<NodeId>,
}

/// Bindings and function scopes of one source unit.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    pub bindings: BTreeMap<DeclId, Binding>,
    pub functions: BTreeMap<NodeId, FunctionScope>,
}

impl SymbolTable {
    pub fn binding(&self, id: DeclId) -> Option<&Binding> {
        self.bindings.get(&id)
    }

    pub fn binding_mut(&mut self, id: DeclId) -> Option<&mut Binding> {
        self.bindings.get_mut(&id)
    }

    /// Binding the given node refers to: an identifier's referenced
    /// declaration, a declaration itself, or the base of a member or index
    /// access. `None` for builtins and anything that is not a variable.
    pub fn referenced_binding(&self, ast: &Ast, id: NodeId) -> Option<DeclId> {
        let node = ast.node(id);
        let decl = match &node.kind {
            NodeKind::Identifier(ident) => ident.referenced_declaration?,
            NodeKind::VariableDeclaration(_) => node.id,
            NodeKind::MemberAccess { expression, .. } => return self.referenced_binding(ast, *expression),
            NodeKind::IndexAccess { base_expression, .. } => {
                return self.referenced_binding(ast, *base_expression)
            }
            _ => return None,
        };
        self.bindings.contains_key(&decl).then_some(decl)
    }

    pub fn function_scope(&self, function: NodeId) -> Option<&FunctionScope> {
        self.functions.get(&function)
    }

    /// Scope of a function definition, created if the resolver did not see it.
    pub fn function_scope_mut(&mut self, ast: &Ast, function: NodeId) -> &mut FunctionScope {
        self.functions
            .entry(function)
            .or_insert_with(|| FunctionScope::for_function(ast, function))
    }

    /// First function scope with the given name.
    pub fn function_named(&self, name: &str) -> Option<&FunctionScope> {
        self.functions.values().find(|f| f.name == name)
    }

    /// First binding with the given name.
    pub fn binding_named(&self, name: &str) -> Option<&Binding> {
        self.bindings.values().find(|b| b.name == name)
    }
}

/// Canonical name of the key an index access uses, so that accesses through
/// the same key share one sub-indicator. Identifiers use their name, member
/// accesses their dotted path, literals their value; any other key expression
/// is named by its source location.
pub fn mapping_key_name(ast: &Ast, id: NodeId) -> String {
    let node = ast.node(id);
    match &node.kind {
        NodeKind::IndexAccess { index_expression: Some(index), .. } => key_name(ast, *index),
        NodeKind::MemberAccess { expression, .. } => mapping_key_name(ast, *expression),
        _ => node.src.to_string(),
    }
}

fn key_name(ast: &Ast, id: NodeId) -> String {
    let node = ast.node(id);
    match &node.kind {
        NodeKind::Identifier(ident) => ident.name.clone(),
        NodeKind::MemberAccess { expression, member_name } => {
            format!("{}.{}", key_name(ast, *expression), member_name)
        }
        NodeKind::Literal { value: Some(value), .. } => value.clone(),
        _ => node.src.to_string(),
    }
}

/// Build the symbol table for a source unit.
pub fn resolve(ast: &Ast) -> Result<SymbolTable, Vec<ResolveError>> {
    let mut table = SymbolTable::default();
    let mut errors = Vec::new();

    for (id, node) in ast.iter() {
        match &node.kind {
            NodeKind::VariableDeclaration(decl) => {
                if table.bindings.contains_key(&node.id) {
                    errors.push(ResolveError::DuplicateDeclaration {
                        id: node.id,
                        name: decl.name.clone(),
                        at: node.src,
                    });
                    continue;
                }
                table.bindings.insert(
                    node.id,
                    Binding {
                        id: node.id,
                        name: decl.name.clone(),
                        node: id,
                        is_secret: decl.is_secret,
                        state_variable: decl.state_variable,
                        is_partitioned: decl.is_partitioned,
                        declared_at: node.src,
                        is_accessed: false,
                        accessed_nodes: Vec::new(),
                    },
                );
            }
            NodeKind::FunctionDefinition { .. } => {
                table.functions.insert(id, FunctionScope::for_function(ast, id));
            }
            _ => {}
        }
    }

    if errors.is_empty() {
        Ok(table)
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::json::parse_source_unit;
    use serde_json::json;

    fn contract(members: serde_json::Value) -> Ast {
        let unit = json!({
            "nodeType": "SourceUnit", "id": 1, "src": "0:200:0",
            "nodes": [{ "nodeType": "ContractDefinition", "id": 2, "src": "0:200:0", "name": "C", "nodes": members }]
        });
        parse_source_unit(&unit.to_string()).unwrap()
    }

    fn mapping_state(id: i64, name: &str) -> serde_json::Value {
        json!({
            "nodeType": "VariableDeclaration", "id": id, "src": "10:20:0", "name": name,
            "stateVariable": true, "isSecret": true,
            "typeName": {
                "nodeType": "Mapping", "id": id + 1000, "src": "10:10:0",
                "keyType": { "nodeType": "ElementaryTypeName", "id": id + 1001, "src": "10:4:0", "name": "address" },
                "valueType": { "nodeType": "ElementaryTypeName", "id": id + 1002, "src": "15:4:0", "name": "uint" }
            }
        })
    }

    #[test]
    fn binds_declarations_and_functions() {
        let ast = contract(json!([
            mapping_state(10, "balances"),
            {
                "nodeType": "FunctionDefinition", "id": 20, "src": "40:50:0", "name": "deposit",
                "parameters": {
                    "nodeType": "ParameterList", "id": 21, "src": "50:10:0",
                    "parameters": [{ "nodeType": "VariableDeclaration", "id": 22, "src": "51:6:0", "name": "amount" }]
                }
            }
        ]));
        let table = resolve(&ast).unwrap();
        let balances = table.binding(10).unwrap();
        assert!(balances.is_secret && balances.state_variable);
        let amount = table.binding_named("amount").unwrap();
        assert!(!amount.is_secret && !amount.state_variable);
        assert!(table.function_named("deposit").is_some());
    }

    #[test]
    fn duplicate_declaration_ids_are_rejected() {
        let ast = contract(json!([
            { "nodeType": "VariableDeclaration", "id": 5, "src": "10:5:0", "name": "a" },
            { "nodeType": "VariableDeclaration", "id": 5, "src": "20:5:0", "name": "b" }
        ]));
        let errors = resolve(&ast).unwrap_err();
        assert!(
            matches!(errors.as_slice(), [ResolveError::DuplicateDeclaration { id: 5, name, .. }] if name == "b"),
            "expected one duplicate error, got: {:?}",
            errors
        );
    }

    #[test]
    fn referenced_binding_sees_through_accesses() {
        let ast = contract(json!([
            mapping_state(10, "balances"),
            {
                "nodeType": "ExpressionStatement", "id": 30, "src": "100:20:0",
                "expression": {
                    "nodeType": "IndexAccess", "id": 31, "src": "100:19:0",
                    "baseExpression": { "nodeType": "Identifier", "id": 32, "src": "100:8:0", "name": "balances", "referencedDeclaration": 10 },
                    "indexExpression": {
                        "nodeType": "MemberAccess", "id": 33, "src": "109:10:0", "memberName": "sender",
                        "expression": { "nodeType": "Identifier", "id": 34, "src": "109:3:0", "name": "msg", "referencedDeclaration": 4294967281i64 }
                    }
                }
            }
        ]));
        let table = resolve(&ast).unwrap();
        let index = ast.find(31).unwrap();
        assert_eq!(table.referenced_binding(&ast, index), Some(10));
        assert_eq!(table.referenced_binding(&ast, ast.find(34).unwrap()), None);
        assert_eq!(mapping_key_name(&ast, index), "msg.sender");
    }

    #[test]
    fn literal_and_computed_keys() {
        let ast = contract(json!([{
            "nodeType": "ExpressionStatement", "id": 30, "src": "100:20:0",
            "expression": {
                "nodeType": "TupleExpression", "id": 40, "src": "100:19:0",
                "components": [
                    {
                        "nodeType": "IndexAccess", "id": 41, "src": "100:5:0",
                        "baseExpression": { "nodeType": "Identifier", "id": 42, "src": "100:1:0", "name": "m" },
                        "indexExpression": { "nodeType": "Literal", "id": 43, "src": "102:1:0", "kind": "number", "value": "7" }
                    },
                    {
                        "nodeType": "IndexAccess", "id": 44, "src": "110:9:0",
                        "baseExpression": { "nodeType": "Identifier", "id": 45, "src": "110:1:0", "name": "m" },
                        "indexExpression": {
                            "nodeType": "BinaryOperation", "id": 46, "src": "112:5:0", "operator": "+",
                            "leftExpression": { "nodeType": "Identifier", "id": 47, "src": "112:1:0", "name": "a" },
                            "rightExpression": { "nodeType": "Identifier", "id": 48, "src": "116:1:0", "name": "b" }
                        }
                    }
                ]
            }
        }]));
        assert_eq!(mapping_key_name(&ast, ast.find(41).unwrap()), "7");
        assert_eq!(mapping_key_name(&ast, ast.find(44).unwrap()), "112:5:0");
    }
}
