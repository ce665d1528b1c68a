//! Stable codes for every error and warning the analysis can produce.
//!
//! Code ranges:
//!   E0600–E0649  AST ingestion errors
//!   E0650–E0699  Resolve errors
//!   E0700–E0799  Access errors
//!   W0700–W0799  Access warnings

use crate::compiler::access::{AccessError, AccessWarning};
use crate::compiler::json::JsonError;
use crate::compiler::resolve::ResolveError;
use crate::CompileError;

// ── Ingestion error codes (E0600–E0649) ────────────────────────────

fn json_error_code(e: &JsonError) -> &'static str {
    match e {
        JsonError::Syntax(_) => "E0600",
        JsonError::Malformed { .. } => "E0601",
        JsonError::NotANode { .. } => "E0602",
        JsonError::Span(_) => "E0603",
        JsonError::NotASourceUnit(_) => "E0604",
    }
}

// ── Resolve error codes (E0650–E0699) ──────────────────────────────

fn resolve_error_code(e: &ResolveError) -> &'static str {
    match e {
        ResolveError::DuplicateDeclaration { .. } => "E0650",
    }
}

// ── Access error codes (E0700–E0799) ───────────────────────────────

fn access_error_code(e: &AccessError) -> &'static str {
    match e {
        AccessError::SecretParameterLeak { .. } => "E0700",
        AccessError::SecretStateLeak { .. } => "E0701",
        AccessError::UnresolvedTarget { .. } => "E0702",
    }
}

// ── Public API ─────────────────────────────────────────────────────

/// Return the stable code for the *first* sub-error inside a `CompileError`.
pub fn error_code(error: &CompileError) -> &'static str {
    match error {
        CompileError::Json(e) => json_error_code(e),
        CompileError::Resolve(errors) => errors.first().map_or("E0650", resolve_error_code),
        CompileError::Access(e) => access_error_code(e),
        CompileError::DeniedWarnings(_) => "E0703",
    }
}

/// Return the stable code for a single `JsonError`.
pub fn json_code(e: &JsonError) -> &'static str {
    json_error_code(e)
}

/// Return the stable code for a single `ResolveError`.
pub fn resolve_code(e: &ResolveError) -> &'static str {
    resolve_error_code(e)
}

/// Return the stable code for a single `AccessError`.
pub fn access_code(e: &AccessError) -> &'static str {
    access_error_code(e)
}

pub fn warning_code(w: &AccessWarning) -> &'static str {
    match w {
        AccessWarning::SecretParameterDowngrade { .. } => "W0700",
        AccessWarning::PublicInputShapesSecret { .. } => "W0701",
    }
}

/// Return a short documentation string for the given code.
pub fn error_doc(code: &str) -> &'static str {
    match code {
        // Ingestion
        "E0600" => "The AST file is not valid JSON. Regenerate it with the front end's compact JSON output.",
        "E0601" => "A node is missing a required field or a field has the wrong type. The AST was probably produced by an incompatible front end version.",
        "E0602" => "A field that must hold a child node holds something else. Check that the AST was not edited by hand.",
        "E0603" => "A `src` attribute is not of the form start:length:file.",
        "E0604" => "The root of the AST must be a SourceUnit node.",

        // Resolve
        "E0650" => "Two variable declarations share one declaration id. Every declaration in a source unit must have a unique id.",

        // Access
        "E0700" => "A secret parameter is assigned to a variable that is not secret. Anyone watching that variable change could deduce the parameter. Declare the target secret.",
        "E0701" => "Secret state is assigned to a variable that is not secret. Anyone watching that variable change could deduce the state. Declare the target secret.",
        "E0702" => "The variable assigned from a secret could not be resolved, so the flow cannot be checked.",
        "E0703" => "Warnings were raised while warnings are denied. Fix the warnings or relax the warning mode.",

        // Warnings
        "W0700" => "A secret parameter is copied into a secret local instead of secret state. The value stays secret but is not stored; check that this is intended.",
        "W0701" => "A non-secret input is used to compute a new secret value. Observers who know the input may be able to infer the secret.",

        _ => "Unknown error code.",
    }
}

/// Return all registered codes with their short description.
pub fn all_error_codes() -> Vec<(&'static str, &'static str)> {
    let codes = [
        "E0600", "E0601", "E0602", "E0603", "E0604", "E0650", "E0700", "E0701", "E0702", "E0703",
        "W0700", "W0701",
    ];
    codes.iter().map(|&c| (c, error_doc(c))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::span::{SpanParseError, SrcSpan};

    #[test]
    fn test_json_error_codes() {
        let e = CompileError::Json(JsonError::NotASourceUnit("Block".into()));
        assert_eq!(error_code(&e), "E0604");

        let e = CompileError::Json(JsonError::Span(SpanParseError("1:2".into())));
        assert_eq!(error_code(&e), "E0603");
    }

    #[test]
    fn test_resolve_error_code_returns_first() {
        let at = SrcSpan::new(0, 1, 0);
        let e = CompileError::Resolve(vec![
            ResolveError::DuplicateDeclaration { id: 3, name: "a".into(), at },
            ResolveError::DuplicateDeclaration { id: 4, name: "b".into(), at },
        ]);
        assert_eq!(error_code(&e), "E0650");
        assert_eq!(error_code(&CompileError::Resolve(vec![])), "E0650");
    }

    #[test]
    fn test_access_error_codes() {
        let at = SrcSpan::new(4, 1, 0);
        let e = CompileError::Access(AccessError::SecretParameterLeak {
            parameter: "p".into(),
            target: "x".into(),
            at,
        });
        assert_eq!(error_code(&e), "E0700");

        let e = CompileError::Access(AccessError::SecretStateLeak {
            state: "s".into(),
            target: "x".into(),
            at,
        });
        assert_eq!(error_code(&e), "E0701");

        assert_eq!(
            access_code(&AccessError::UnresolvedTarget { secret: "s".into(), at }),
            "E0702"
        );
    }

    #[test]
    fn test_warning_codes() {
        let at = SrcSpan::new(4, 1, 0);
        let w = AccessWarning::SecretParameterDowngrade {
            parameter: "p".into(),
            target: "l".into(),
            at,
        };
        assert_eq!(warning_code(&w), "W0700");
        assert_eq!(error_code(&CompileError::DeniedWarnings(vec![w])), "E0703");
    }

    #[test]
    fn test_all_error_codes_documented() {
        for (code, doc) in all_error_codes() {
            assert_ne!(doc, "Unknown error code.", "code {} has no documentation", code);
        }
        assert_eq!(error_doc("E9999"), "Unknown error code.");
    }
}
