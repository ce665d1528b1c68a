//! Per-function access indicators for secret state.
//!
//! One [`FunctionScope`] exists per function definition. It holds an
//! [`Indicator`] for every binding the function touches, created on first
//! access. Code generation reads these to decide between a whole and a
//! partitioned representation of each secret state.

use crate::compiler::ast::{Ast, NodeId};
use crate::compiler::resolve::DeclId;
use serde::Serialize;
use std::collections::BTreeMap;

/// Accumulated facts about how one function uses one binding (or one key of a
/// mapping binding).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Indicator {
    /// The state must be treated as a single whole value. Never reset.
    pub is_whole: bool,
    pub is_accessed: bool,
    pub is_whole_reason: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub mapping_key: BTreeMap<String, Indicator>,
}

impl Indicator {
    /// Sub-indicator for one key of a mapping, created on demand.
    pub fn mapping_key_mut(&mut self, key: &str) -> &mut Indicator {
        self.mapping_key.entry(key.to_string()).or_default()
    }

    pub fn mapping_key(&self, key: &str) -> Option<&Indicator> {
        self.mapping_key.get(key)
    }

    /// Record that the current value was read to compute a new one.
    pub fn mark_accessed(&mut self, reason: String) {
        self.is_whole = true;
        self.is_accessed = true;
        self.is_whole_reason.push(reason);
    }
}

/// The indicator table of one function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionScope {
    pub name: String,
    pub node: NodeId,
    pub indicators: BTreeMap<DeclId, Indicator>,
}

impl FunctionScope {
    pub fn new(node: NodeId, name: impl Into<String>) -> Self {
        Self { name: name.into(), node, indicators: BTreeMap::new() }
    }

    pub fn for_function(ast: &Ast, node: NodeId) -> Self {
        Self::new(node, ast.node(node).name().unwrap_or_default())
    }

    pub fn indicator(&self, binding: DeclId) -> Option<&Indicator> {
        self.indicators.get(&binding)
    }

    /// Indicator for `binding`, created on first access.
    pub fn indicator_mut(&mut self, binding: DeclId) -> &mut Indicator {
        self.indicators.entry(binding).or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn created_on_demand() {
        let ast = crate::compiler::json::parse_source_unit(
            r#"{"nodeType": "SourceUnit", "id": 1, "src": "0:0:0", "nodes": []}"#,
        )
        .unwrap();
        let mut scope = FunctionScope::new(ast.root(), "f");
        assert!(scope.indicator(7).is_none());
        scope.indicator_mut(7);
        assert_eq!(scope.indicator(7), Some(&Indicator::default()));
    }

    #[test]
    fn mark_accessed_is_sticky_and_appends() {
        let mut ind = Indicator::default();
        ind.mark_accessed("Accessed at 1:1:0".into());
        ind.mark_accessed("Accessed at 9:1:0".into());
        assert!(ind.is_whole && ind.is_accessed);
        assert_eq!(ind.is_whole_reason, vec!["Accessed at 1:1:0", "Accessed at 9:1:0"]);
    }

    #[test]
    fn mapping_keys_are_independent() {
        let mut ind = Indicator::default();
        ind.mapping_key_mut("a").mark_accessed("Accessed at 3:1:0".into());
        ind.mapping_key_mut("b");
        assert!(!ind.is_whole);
        assert!(ind.mapping_key("a").unwrap().is_whole);
        assert!(!ind.mapping_key("b").unwrap().is_whole);
        assert!(ind.mapping_key("c").is_none());
    }

    #[test]
    fn serializes_camel_case() {
        let mut ind = Indicator::default();
        ind.mark_accessed("Accessed at 3:1:0".into());
        let v = serde_json::to_value(&ind).unwrap();
        assert_eq!(v["isWhole"], true);
        assert_eq!(v["isWholeReason"][0], "Accessed at 3:1:0");
        assert!(v.get("mappingKey").is_none());
    }
}
