//! Access/taint resolution for secret state.
//!
//! Walks a resolved tree and, for every identifier that takes part in an
//! assignment, decides whether the identifier's secret value is *accessed*
//! (its current value is read to compute something else). Accesses are
//! recorded in the enclosing function's indicator table, on the binding and on
//! the identifier node itself. Flows that would leak a secret into a variable
//! not declared secret abort the pass; risky but legal flows are reported as
//! warnings.
//!
//! The pass appends to indicator and binding lists, so it must run exactly
//! once per compilation.

use crate::compiler::assignment::{normalize, AssignmentView, Position, StatementContext};
use crate::compiler::ast::{Ast, NodeId, NodeKind, NodeTag, Slot};
use crate::compiler::path::NodePath;
use crate::compiler::resolve::{mapping_key_name, Binding, DeclId, SymbolTable};
use crate::compiler::span::SrcSpan;
use crate::compiler::walk::{walk, Visitor};

use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

/// Declaration ids above this are reserved for the implicit sender identity.
pub const SENDER_DECLARATION_THRESHOLD: i64 = 4_294_967_200;

/// Name of the implicit sender object.
const SENDER_NAME: &str = "msg";

// ── Errors ──────────────────────────────────────────────────────────

/// A flow that would let an observer infer a secret. Fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error(
        "secret parameter '{parameter}' must not be assigned to non-secret variable '{target}' \
         (at {at}): the secret could be deduced by observing how '{target}' changes"
    )]
    SecretParameterLeak { parameter: String, target: String, at: SrcSpan },
    #[error(
        "secret state '{state}' must not be assigned to non-secret variable '{target}' \
         (at {at}): the secret could be deduced by observing how '{target}' changes"
    )]
    SecretStateLeak { state: String, target: String, at: SrcSpan },
    #[error("cannot resolve the variable assigned from secret '{secret}' (at {at})")]
    UnresolvedTarget { secret: String, at: SrcSpan },
}

impl AccessError {
    pub fn span(&self) -> SrcSpan {
        match self {
            AccessError::SecretParameterLeak { at, .. }
            | AccessError::SecretStateLeak { at, .. }
            | AccessError::UnresolvedTarget { at, .. } => *at,
        }
    }
}

// ── Warnings ────────────────────────────────────────────────────────

/// A legal flow the user should look at. Compilation continues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessWarning {
    /// A secret parameter is copied into a secret local rather than into
    /// secret state.
    SecretParameterDowngrade { parameter: String, target: String, at: SrcSpan },
    /// A non-secret input shapes the new value of a secret variable.
    PublicInputShapesSecret {
        input: String,
        target: String,
        at: SrcSpan,
        /// The offending source line, when source text was supplied.
        source_line: Option<String>,
    },
}

impl AccessWarning {
    pub fn span(&self) -> SrcSpan {
        match self {
            AccessWarning::SecretParameterDowngrade { at, .. }
            | AccessWarning::PublicInputShapesSecret { at, .. } => *at,
        }
    }
}

impl fmt::Display for AccessWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessWarning::SecretParameterDowngrade { parameter, target, .. } => write!(
                f,
                "secret parameter '{}' is assigned to '{}', which is not contract state; is this intended?",
                parameter, target
            ),
            AccessWarning::PublicInputShapesSecret { input, target, .. } => write!(
                f,
                "non-secret '{}' is used when assigning to secret '{}'; observers may be able to infer \
                 '{}' from '{}', so '{}' might not stay secret",
                input, target, target, input, target
            ),
        }
    }
}

fn report(warnings: &mut Vec<AccessWarning>, warning: AccessWarning) {
    warn!(at = %warning.span(), "{}", warning);
    warnings.push(warning);
}

// ── The resolver ────────────────────────────────────────────────────

/// An access the classifier decided to record.
#[derive(Debug)]
struct Access {
    binding: DeclId,
    function: NodeId,
    mapping_key: Option<String>,
}

/// The pass. Only identifiers carry logic; every other node kind is left to
/// the walker's defaults.
pub struct AccessResolver<'a> {
    symbols: &'a mut SymbolTable,
    /// Original contract text, used to quote lines in warnings.
    source: Option<&'a str>,
    warnings: Vec<AccessWarning>,
}

impl<'a> AccessResolver<'a> {
    pub fn new(symbols: &'a mut SymbolTable, source: Option<&'a str>) -> Self {
        Self { symbols, source, warnings: Vec::new() }
    }

    pub fn into_warnings(self) -> Vec<AccessWarning> {
        self.warnings
    }

    fn enter_identifier(&mut self, ast: &mut Ast, id: NodeId) -> Result<(), AccessError> {
        if let Some(access) = self.classify(ast, id)? {
            self.record(ast, id, access);
        }
        Ok(())
    }

    fn classify(&mut self, ast: &Ast, id: NodeId) -> Result<Option<Access>, AccessError> {
        let path = ast.path(id);
        let NodeKind::Identifier(ident) = path.kind() else {
            return Ok(None);
        };
        if ident
            .referenced_declaration
            .is_some_and(|d| d > SENDER_DECLARATION_THRESHOLD)
        {
            return Ok(None);
        }

        // `s.f` resolves through the member access that owns `s`.
        let owner = match path.parent() {
            Some(parent) if parent.tag() == NodeTag::MemberAccess => parent.id(),
            _ => id,
        };
        let Some(binding_id) = self.symbols.referenced_binding(ast, owner) else {
            debug!("'{}' does not refer to a tracked variable", ident.name);
            return Ok(None);
        };
        let Some(context) = normalize(&path) else {
            return Ok(None);
        };
        let Some(binding) = self.symbols.binding(binding_id) else {
            return Ok(None);
        };

        if binding.is_secret {
            self.classify_secret(&path, &ident.name, binding_id, context)
        } else {
            self.check_public_input(&path, &ident.name, binding_id, context);
            Ok(None)
        }
    }

    fn classify_secret(
        &mut self,
        path: &NodePath<'_>,
        name: &str,
        binding_id: DeclId,
        context: StatementContext,
    ) -> Result<Option<Access>, AccessError> {
        let ast = path.ast();
        let Some(function) = path.enclosing_function() else {
            return Ok(None);
        };
        let StatementContext::Assign(view) = context else {
            return Ok(None);
        };
        let Some(binding) = self.symbols.binding(binding_id) else {
            return Ok(None);
        };
        let lhs_name = view.target_name(ast);
        let at = path.node().src;

        match view.position_of(path) {
            Position::OnRightHandSide => {
                // `a += a` re-reads its own target; the incrementation
                // analysis owns that case, as it does the sender.
                let self_reference =
                    view.is_incremented && (lhs_name == Some(name) || name == SENDER_NAME);
                if self_reference {
                    return Ok(None);
                }
                debug!("Found an accessed secret state {}", name);
                let target = target_binding(self.symbols, ast, &view, name, at)?;
                if !binding.state_variable {
                    if !target.is_secret {
                        return Err(AccessError::SecretParameterLeak {
                            parameter: name.to_string(),
                            target: target.name.clone(),
                            at,
                        });
                    }
                    if !target.state_variable {
                        let warning = AccessWarning::SecretParameterDowngrade {
                            parameter: name.to_string(),
                            target: target.name.clone(),
                            at,
                        };
                        report(&mut self.warnings, warning);
                    }
                    return Ok(None);
                }
                if !target.is_secret {
                    return Err(AccessError::SecretStateLeak {
                        state: name.to_string(),
                        target: target.name.clone(),
                        at,
                    });
                }
                Ok(Some(Access {
                    binding: binding_id,
                    function: function.id(),
                    mapping_key: mapping_key(ast, &view),
                }))
            }
            // TODO: decide which of the right-hand-side leak checks also
            // apply to compound targets; none are repeated here yet.
            Position::OnLeftHandSide
                if !view.is_incremented
                    && !binding.is_partitioned
                    && view.operator.is_some_and(|op| op.reads_target()) =>
            {
                if let Some(op) = view.operator {
                    debug!("Found an accessed secret state {} (accessed in {} operation)", name, op);
                }
                Ok(Some(Access {
                    binding: binding_id,
                    function: function.id(),
                    mapping_key: mapping_key(ast, &view),
                }))
            }
            _ => Ok(None),
        }
    }

    /// Warn when a non-secret parameter or local feeds a secret variable.
    fn check_public_input(
        &mut self,
        path: &NodePath<'_>,
        name: &str,
        binding_id: DeclId,
        context: StatementContext,
    ) {
        let ast = path.ast();
        let StatementContext::Assign(view) = context else {
            return;
        };
        if view.position_of(path) != Position::OnRightHandSide {
            return;
        }
        if path.enclosing_function().is_none() {
            return;
        }
        // Non-secret mapping keys are not this rule's concern.
        if path.nearest_in_slot(Slot::IndexExpression).is_some() {
            return;
        }
        let Some(binding) = self.symbols.binding(binding_id) else {
            return;
        };
        let Some(target) = self
            .symbols
            .referenced_binding(ast, view.lhs)
            .and_then(|t| self.symbols.binding(t))
        else {
            return;
        };
        if target.is_secret && !binding.state_variable {
            let at = path.node().src;
            let target_name = view.target_name(ast).unwrap_or(target.name.as_str()).to_string();
            report(
                &mut self.warnings,
                AccessWarning::PublicInputShapesSecret {
                    input: name.to_string(),
                    target: target_name,
                    at,
                    source_line: self.source.and_then(|s| at.line_text(s)),
                },
            );
        }
    }

    fn record(&mut self, ast: &mut Ast, id: NodeId, access: Access) {
        let reason = format!("Accessed at {}", ast.node(id).src);
        let scope = self.symbols.function_scope_mut(ast, access.function);
        let mut indicator = scope.indicator_mut(access.binding);
        if let Some(key) = &access.mapping_key {
            indicator = indicator.mapping_key_mut(key);
        }
        indicator.mark_accessed(reason);

        if let Some(binding) = self.symbols.binding_mut(access.binding) {
            binding.is_accessed = true;
            binding.accessed_nodes.push(id);
        }
        ast.node_mut(id).accessed_secret_state = true;
    }
}

/// Binding of the variable an assignment writes.
fn target_binding<'s>(
    symbols: &'s SymbolTable,
    ast: &Ast,
    view: &AssignmentView,
    secret: &str,
    at: SrcSpan,
) -> Result<&'s Binding, AccessError> {
    symbols
        .referenced_binding(ast, view.lhs)
        .and_then(|t| symbols.binding(t))
        .ok_or_else(|| AccessError::UnresolvedTarget { secret: secret.to_string(), at })
}

fn mapping_key(ast: &Ast, view: &AssignmentView) -> Option<String> {
    view.targets_index(ast).then(|| mapping_key_name(ast, view.lhs))
}

impl Visitor for AccessResolver<'_> {
    type Error = AccessError;

    fn enter(&mut self, ast: &mut Ast, id: NodeId) -> Result<(), AccessError> {
        match ast.node(id).tag() {
            NodeTag::Identifier => self.enter_identifier(ast, id),
            _ => Ok(()),
        }
    }
}

/// Run access resolution over a whole tree. Returns the warnings raised, or
/// the first leak found.
pub fn check_access(
    ast: &mut Ast,
    symbols: &mut SymbolTable,
    source: Option<&str>,
) -> Result<Vec<AccessWarning>, AccessError> {
    let mut resolver = AccessResolver::new(symbols, source);
    walk(ast, &mut resolver)?;
    Ok(resolver.into_warnings())
}
