//! Rich diagnostics with source snippets, colors, and suggestions.

use crate::compiler::access::{AccessError, AccessWarning};
use crate::compiler::error_codes::{access_code, json_code, resolve_code, warning_code};
use crate::compiler::json::JsonError;
use crate::compiler::resolve::ResolveError;
use crate::compiler::span::SrcSpan;
use crate::CompileError;

/// Severity level for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// A rendered diagnostic with source context
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: Option<String>,
    pub message: String,
    pub file: Option<String>,
    pub line: Option<usize>,
    pub col: Option<usize>,
    pub source_line: Option<String>,
    pub underline: Option<String>,
    pub suggestions: Vec<String>,
}

impl Diagnostic {
    fn new(severity: Severity, code: &str, message: String, filename: &str) -> Self {
        Self {
            severity,
            code: Some(code.to_string()),
            message,
            file: Some(filename.to_string()),
            line: None,
            col: None,
            source_line: None,
            underline: None,
            suggestions: vec![],
        }
    }

    /// Attach line, column and an underlined snippet for `span`. Without
    /// source text only the file is known.
    fn at(mut self, span: SrcSpan, source: Option<&str>) -> Self {
        let Some(source) = source else {
            return self;
        };
        let Some((line, col)) = span.line_col(source) else {
            return self;
        };
        let source_line = get_source_line(source, line);
        self.underline = source_line.as_ref().map(|l| {
            let rest = l.chars().count().saturating_sub(col - 1);
            make_underline(col, span.length.min(rest))
        });
        self.line = Some(line);
        self.col = Some(col);
        self.source_line = source_line;
        self
    }

    fn suggest(mut self, suggestion: String) -> Self {
        self.suggestions.push(suggestion);
        self
    }

    /// Render with ANSI colors for terminal
    pub fn render_ansi(&self) -> String {
        let mut out = String::new();

        // Header: error[E0700]: message
        let severity_label = match self.severity {
            Severity::Error => red("error"),
            Severity::Warning => yellow("warning"),
        };

        if let Some(ref code) = self.code {
            out.push_str(&format!("{}[{}]: ", severity_label, bold(code)));
        } else {
            out.push_str(&format!("{}: ", severity_label));
        }
        out.push_str(&bold(&self.message));
        out.push('\n');

        // Location: --> file:line:col
        if let (Some(ref file), Some(line), Some(col)) = (&self.file, self.line, self.col) {
            out.push_str(&format!("  {} {}:{}:{}\n", cyan("-->"), file, line, col));
        } else if let Some(ref file) = self.file {
            out.push_str(&format!("  {} {}\n", cyan("-->"), file));
        }

        // Source line with underline
        if let (Some(line_num), Some(ref line_text), Some(ref underline)) =
            (self.line, &self.source_line, &self.underline)
        {
            let marker = match self.severity {
                Severity::Warning => yellow(underline),
                Severity::Error => red(underline),
            };
            out.push_str(&format!("   {}\n", cyan("|")));
            out.push_str(&format!(
                "{:>3} {} {}\n",
                cyan(&line_num.to_string()),
                cyan("|"),
                line_text
            ));
            out.push_str(&format!("   {} {}\n", cyan("|"), marker));
        }

        // Suggestions
        if !self.suggestions.is_empty() {
            out.push_str(&format!("   {}\n", cyan("|")));
            for suggestion in &self.suggestions {
                out.push_str(&format!("   {} {}: {}\n", cyan("="), cyan("help"), suggestion));
            }
        }

        out
    }

    /// Render without colors (for tests and piped output)
    pub fn render_plain(&self) -> String {
        let mut out = String::new();

        let severity_label = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };

        if let Some(ref code) = self.code {
            out.push_str(&format!("{}[{}]: ", severity_label, code));
        } else {
            out.push_str(&format!("{}: ", severity_label));
        }
        out.push_str(&self.message);
        out.push('\n');

        if let (Some(ref file), Some(line), Some(col)) = (&self.file, self.line, self.col) {
            out.push_str(&format!("  --> {}:{}:{}\n", file, line, col));
        } else if let Some(ref file) = self.file {
            out.push_str(&format!("  --> {}\n", file));
        }

        if let (Some(line_num), Some(ref line_text), Some(ref underline)) =
            (self.line, &self.source_line, &self.underline)
        {
            out.push_str("   |\n");
            out.push_str(&format!("{:>3} | {}\n", line_num, line_text));
            out.push_str(&format!("   | {}\n", underline));
        }

        if !self.suggestions.is_empty() {
            out.push_str("   |\n");
            for suggestion in &self.suggestions {
                out.push_str(&format!("   = help: {}\n", suggestion));
            }
        }

        out
    }
}

// ANSI color helpers
fn red(s: &str) -> String {
    format!("\x1b[31m{}\x1b[0m", s)
}

fn yellow(s: &str) -> String {
    format!("\x1b[33m{}\x1b[0m", s)
}

fn cyan(s: &str) -> String {
    format!("\x1b[36m{}\x1b[0m", s)
}

fn bold(s: &str) -> String {
    format!("\x1b[1m{}\x1b[0m", s)
}

fn get_source_line(source: &str, line: usize) -> Option<String> {
    source
        .lines()
        .nth(line.saturating_sub(1))
        .map(|s| s.to_string())
}

fn make_underline(col: usize, len: usize) -> String {
    format!(
        "{}{}",
        " ".repeat(col.saturating_sub(1)),
        "^".repeat(len.max(1))
    )
}

/// Convert a CompileError into a list of Diagnostics. `source` is the
/// contract text, used for line numbers and snippets when available.
pub fn format_compile_error(
    error: &CompileError,
    source: Option<&str>,
    filename: &str,
) -> Vec<Diagnostic> {
    match error {
        CompileError::Json(e) => vec![format_json_error(e, filename)],
        CompileError::Resolve(errors) => errors
            .iter()
            .map(|e| format_resolve_error(e, source, filename))
            .collect(),
        CompileError::Access(e) => vec![format_access_error(e, source, filename)],
        CompileError::DeniedWarnings(warnings) => warnings
            .iter()
            .map(|w| {
                let mut diag = format_warning(w, source, filename);
                diag.severity = Severity::Error;
                diag
            })
            .collect(),
    }
}

fn format_json_error(error: &JsonError, filename: &str) -> Diagnostic {
    let diag = Diagnostic::new(Severity::Error, json_code(error), error.to_string(), filename);
    match error {
        JsonError::NotASourceUnit(_) | JsonError::Syntax(_) => diag.suggest(
            "pass the compact JSON AST the front end writes for a whole source file".to_string(),
        ),
        _ => diag,
    }
}

fn format_resolve_error(error: &ResolveError, source: Option<&str>, filename: &str) -> Diagnostic {
    match error {
        ResolveError::DuplicateDeclaration { at, .. } => {
            Diagnostic::new(Severity::Error, resolve_code(error), error.to_string(), filename)
                .at(*at, source)
        }
    }
}

fn format_access_error(error: &AccessError, source: Option<&str>, filename: &str) -> Diagnostic {
    let code = access_code(error);
    match error {
        AccessError::SecretParameterLeak { parameter, target, at } => Diagnostic::new(
            Severity::Error,
            code,
            format!(
                "secret parameter '{}' flows into non-secret variable '{}'",
                parameter, target
            ),
            filename,
        )
        .at(*at, source)
        .suggest(format!("declare '{}' as secret", target)),
        AccessError::SecretStateLeak { state, target, at } => Diagnostic::new(
            Severity::Error,
            code,
            format!("secret state '{}' flows into non-secret variable '{}'", state, target),
            filename,
        )
        .at(*at, source)
        .suggest(format!("declare '{}' as secret", target)),
        AccessError::UnresolvedTarget { at, .. } => {
            Diagnostic::new(Severity::Error, code, error.to_string(), filename).at(*at, source)
        }
    }
}

/// Convert an advisory warning into a Diagnostic.
pub fn format_warning(warning: &AccessWarning, source: Option<&str>, filename: &str) -> Diagnostic {
    let diag = Diagnostic::new(
        Severity::Warning,
        warning_code(warning),
        warning.to_string(),
        filename,
    )
    .at(warning.span(), source);
    match warning {
        AccessWarning::SecretParameterDowngrade { target, .. } => diag.suggest(format!(
            "assign the parameter to secret state if '{}' was meant to persist",
            target
        )),
        AccessWarning::PublicInputShapesSecret { input, .. } => {
            diag.suggest(format!("declare '{}' as secret if it should stay private", input))
        }
    }
}
