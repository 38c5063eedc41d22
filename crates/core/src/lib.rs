#![allow(clippy::result_large_err)]
//! plexil-core: Standard Plexil front end.
//!
//! Turns plan source text into a syntax tree, the declaration scopes seen
//! while building it, and an ordered list of diagnostics. Parsing never
//! stops at the first error: malformed input is repaired or skipped, and
//! placeholder nodes stand in for constructs that could not be parsed.
//!
//! # Public API
//!
//! - [`parse()`] / [`parse_with_options()`] -- parse one compile unit
//! - [`parse_with_session()`] -- parse against a caller-owned [`Session`]
//! - [`Node`], [`NodeKind`] -- the plan syntax tree
//! - [`ScopeArena`] -- global and node contexts with their bindings
//! - [`Diagnostic`] -- lexical, syntax, recovery, semantic and fatal reports
//! - [`ParseOptions`] -- reference and redeclaration checks, error limit

pub mod ast;
pub mod config;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod scope;
pub mod session;
pub mod token;

// ── Convenience re-exports ───────────────────────────────────────────

pub use ast::{Node, NodeKind};
pub use config::{CheckLevel, ConfigError, ParseOptions, DEFAULT_MAX_DEPTH, DEFAULT_MAX_ERRORS};
pub use error::{Diagnostic, DiagnosticKind, FatalError, LexError, Severity, SyntaxError};
pub use lexer::Lexer;
pub use parser::parse_with_session;
pub use scope::{Binding, BindingKind, ScopeArena, ScopeId};
pub use session::Session;
pub use token::{Span, Token, TokenKind};

/// Everything produced for one compile unit.
#[derive(Debug, Clone)]
pub struct ParseOutput {
    pub plan: Node,
    pub diagnostics: Vec<Diagnostic>,
    pub scopes: ScopeArena,
    /// The unit was abandoned; `plan` holds what was built up to that point.
    pub aborted: bool,
}

impl ParseOutput {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> + '_ {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    pub fn to_json_value(&self) -> serde_json::Value {
        let diagnostics: Vec<serde_json::Value> =
            self.diagnostics.iter().map(Diagnostic::to_json_value).collect();
        serde_json::json!({
            "plan":        self.plan.to_json_value(),
            "diagnostics": diagnostics,
            "aborted":     self.aborted,
        })
    }
}

/// Parse `source` with default options.
pub fn parse(source: &str) -> ParseOutput {
    parse_with_options(source, ParseOptions::default())
}

pub fn parse_with_options(source: &str, options: ParseOptions) -> ParseOutput {
    let mut session = Session::new(options);
    let (plan, scopes) = parse_with_session(source, &mut session);
    let aborted = session.aborted();
    ParseOutput {
        plan,
        diagnostics: session.into_diagnostics(),
        scopes,
        aborted,
    }
}
