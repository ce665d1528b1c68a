//! Veil Compiler
//!
//! Analyses contracts whose state is annotated as secret, ahead of circuit
//! generation. The front end hands over a compact JSON syntax tree; this crate
//! lowers it into an [`compiler::ast::Ast`], resolves bindings, and runs the
//! access/taint resolver, which records where secret state is read and rejects
//! flows that would leak a secret into public state.

pub mod compiler;
pub mod diagnostics;

use compiler::access::{check_access, AccessError, AccessWarning};
use compiler::ast::{Ast, NodeTag};
use compiler::indicator::Indicator;
use compiler::json::JsonError;
use compiler::resolve::{DeclId, ResolveError, SymbolTable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

// ── Analysis options ────────────────────────────────────────────────

/// What happens to advisory warnings once the walk is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningMode {
    /// Warnings are logged but not returned.
    Allow,
    /// Warnings are returned alongside the analysis (default).
    #[default]
    Warn,
    /// Any warning fails the analysis.
    Deny,
}

#[derive(Debug, Clone, Default)]
pub struct AnalysisOptions {
    pub warning_mode: WarningMode,
}

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("AST error: {0}")]
    Json(#[from] JsonError),
    #[error("resolve errors: {0:?}")]
    Resolve(Vec<ResolveError>),
    #[error("access error: {0}")]
    Access(#[from] AccessError),
    #[error("{} warning(s) raised while warnings are denied", .0.len())]
    DeniedWarnings(Vec<AccessWarning>),
}

// ── Analysis result ─────────────────────────────────────────────────

/// The annotated tree and everything the resolver learned about it.
#[derive(Debug)]
pub struct Analysis {
    pub ast: Ast,
    pub symbols: SymbolTable,
    pub warnings: Vec<AccessWarning>,
}

/// Serializable summary of an [`Analysis`]: warnings, and per function the
/// indicator of every binding it accesses. Functions are keyed
/// `Contract.name#id` by their front-end node id, so overloads and
/// same-named functions of different contracts stay apart.
#[derive(Debug, Serialize)]
pub struct AnalysisReport<'a> {
    pub warnings: Vec<WarningReport>,
    pub functions: BTreeMap<String, FunctionReport<'a>>,
}

#[derive(Debug, Serialize)]
pub struct WarningReport {
    pub code: &'static str,
    pub message: String,
    pub src: String,
}

#[derive(Debug, Serialize)]
pub struct FunctionReport<'a> {
    pub name: &'a str,
    pub contract: Option<&'a str>,
    pub id: i64,
    /// In declaration id order.
    pub indicators: Vec<BindingReport<'a>>,
}

#[derive(Debug, Serialize)]
pub struct BindingReport<'a> {
    pub binding: &'a str,
    pub declaration: DeclId,
    #[serde(flatten)]
    pub indicator: &'a Indicator,
}

impl Analysis {
    pub fn report(&self) -> AnalysisReport<'_> {
        let warnings = self
            .warnings
            .iter()
            .map(|w| WarningReport {
                code: compiler::error_codes::warning_code(w),
                message: w.to_string(),
                src: w.span().to_string(),
            })
            .collect();

        let mut functions = BTreeMap::new();
        for scope in self.symbols.functions.values() {
            let id = self.ast.node(scope.node).id;
            let contract = self
                .ast
                .path(scope.node)
                .nearest_ancestor_of_kind(NodeTag::ContractDefinition)
                .and_then(|c| c.node().name());
            let key = match contract {
                Some(contract) => format!("{}.{}#{}", contract, scope.name, id),
                None => format!("{}#{}", scope.name, id),
            };
            let indicators = scope
                .indicators
                .iter()
                .filter_map(|(decl, indicator)| {
                    let binding = self.symbols.binding(*decl)?;
                    Some(BindingReport { binding: &binding.name, declaration: *decl, indicator })
                })
                .collect();
            functions.insert(key, FunctionReport { name: &scope.name, contract, id, indicators });
        }
        AnalysisReport { warnings, functions }
    }
}

// ── Pipeline ────────────────────────────────────────────────────────

/// Analyse a JSON source unit. `source` is the contract text the tree was
/// produced from; when given, warnings quote the offending line.
pub fn analyze(
    json: &str,
    source: Option<&str>,
    options: &AnalysisOptions,
) -> Result<Analysis, CompileError> {
    let ast = compiler::json::parse_source_unit(json)?;
    analyze_ast(ast, source, options)
}

/// Analyse an already lowered tree.
pub fn analyze_ast(
    mut ast: Ast,
    source: Option<&str>,
    options: &AnalysisOptions,
) -> Result<Analysis, CompileError> {
    let mut symbols = compiler::resolve::resolve(&ast).map_err(CompileError::Resolve)?;
    debug!(
        "resolved {} bindings in {} functions",
        symbols.bindings.len(),
        symbols.functions.len()
    );

    let mut warnings = check_access(&mut ast, &mut symbols, source)?;
    match options.warning_mode {
        WarningMode::Allow => warnings.clear(),
        WarningMode::Warn => {}
        WarningMode::Deny if !warnings.is_empty() => {
            return Err(CompileError::DeniedWarnings(warnings))
        }
        WarningMode::Deny => {}
    }

    Ok(Analysis { ast, symbols, warnings })
}
