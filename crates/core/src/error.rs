//! Error and diagnostic types.
//!
//! Failures inside the parser are typed errors (`LexError`, `SyntaxError`,
//! `FatalError`); what a caller sees is the ordered list of `Diagnostic`s
//! they were turned into.

use serde::Serialize;
use std::fmt;

use crate::token::{Span, Token};

// ──────────────────────────────────────────────
// Diagnostics
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Note => "note",
        })
    }
}

/// Where a diagnostic came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticKind {
    /// No token rule matched the input.
    Lexical,
    /// A mismatch repaired in place by deleting or inserting one token.
    Syntax,
    /// A rule failed; tokens were skipped and an error node stands in its place.
    Recovered,
    /// A declaration or reference check on the scope chain.
    Semantic,
    /// The compile unit was abandoned.
    Fatal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub message: String,
    pub span: Span,
    /// Text of the offending token, if there was one.
    pub lexeme: Option<String>,
}

impl Diagnostic {
    pub fn new(
        kind: DiagnosticKind,
        severity: Severity,
        message: impl Into<String>,
        span: Span,
    ) -> Self {
        Diagnostic {
            kind,
            severity,
            message: message.into(),
            span,
            lexeme: None,
        }
    }

    pub fn with_lexeme(mut self, lexeme: impl Into<String>) -> Self {
        self.lexeme = Some(lexeme.into());
        self
    }

    pub fn lexical(error: &LexError) -> Self {
        Diagnostic::new(
            DiagnosticKind::Lexical,
            Severity::Error,
            error.to_string(),
            error.span(),
        )
    }

    /// A syntax error turned into a diagnostic of the given kind
    /// (`Syntax` for inline repairs, `Recovered` for rule failures).
    pub fn syntax(kind: DiagnosticKind, error: &SyntaxError) -> Self {
        Diagnostic::new(kind, Severity::Error, error.to_string(), error.token.span)
            .with_lexeme(error.token.text.clone())
    }

    pub fn semantic(severity: Severity, message: impl Into<String>, span: Span) -> Self {
        Diagnostic::new(DiagnosticKind::Semantic, severity, message, span)
    }

    pub fn fatal(error: &FatalError, span: Span) -> Self {
        Diagnostic::new(DiagnosticKind::Fatal, Severity::Error, error.to_string(), span)
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// JSON view with every field present (`null` when absent).
    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::json!({
            "column":   self.span.column,
            "end":      self.span.end,
            "kind":     self.kind,
            "lexeme":   self.lexeme,
            "line":     self.span.line,
            "message":  self.message,
            "severity": self.severity,
            "start":    self.span.start,
        })
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {}: {}",
            self.span.line, self.span.column, self.severity, self.message
        )
    }
}

// ──────────────────────────────────────────────
// Lexical errors
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LexError {
    #[error("unexpected character '{ch}'")]
    UnexpectedChar { ch: char, span: Span },
    #[error("unterminated string literal")]
    UnterminatedString { span: Span },
    #[error("unterminated block comment")]
    UnterminatedComment { span: Span },
    #[error("invalid escape sequence '{escape}' in string literal")]
    InvalidEscape {
        escape: String,
        /// Span of the whole literal the escape sits in.
        span: Span,
    },
    #[error("malformed number '{text}'")]
    MalformedNumber { text: String, span: Span },
}

impl LexError {
    pub fn span(&self) -> Span {
        match self {
            LexError::UnexpectedChar { span, .. }
            | LexError::UnterminatedString { span }
            | LexError::UnterminatedComment { span }
            | LexError::InvalidEscape { span, .. }
            | LexError::MalformedNumber { span, .. } => *span,
        }
    }
}

// ──────────────────────────────────────────────
// Syntax errors
// ──────────────────────────────────────────────

/// The grammar mismatch itself. `found` is already quoted for display.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SyntaxErrorKind {
    #[error("mismatched input {found} expecting {expected}")]
    Mismatched { found: String, expected: String },
    #[error("missing {expected} at {found}")]
    Missing { expected: String, found: String },
    #[error("extraneous input {found} expecting {expected}")]
    Extraneous { found: String, expected: String },
    #[error("no viable alternative at input {found}")]
    NoViableAlternative { found: String },
}

/// A production mismatch, carrying the offending token and the paraphrase
/// that was on top of the stack when it was raised.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxError {
    pub kind: SyntaxErrorKind,
    pub token: Token,
    pub context: Option<String>,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.context {
            Some(context) => write!(f, "{} {}", self.kind, context),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl std::error::Error for SyntaxError {}

// ──────────────────────────────────────────────
// Fatal errors
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FatalError {
    #[error("unexpected end of input while recovering from a syntax error{}", suffix(.context))]
    UnexpectedEof { context: Option<String> },
    #[error("too many errors ({limit}); giving up")]
    TooManyErrors { limit: usize },
    #[error("nesting deeper than {limit} levels; giving up")]
    NestingTooDeep { limit: usize },
}

fn suffix(context: &Option<String>) -> String {
    context
        .as_ref()
        .map(|c| format!(" {}", c))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenKind;

    #[test]
    fn syntax_error_message_appends_paraphrase() {
        let token = Token::new(TokenKind::Ident, "x", Span::new(4, 5, 1, 5));
        let err = SyntaxError {
            kind: SyntaxErrorKind::Mismatched {
                found: token.error_display(),
                expected: "';'".to_owned(),
            },
            token,
            context: Some("in \"if\" statement".to_owned()),
        };
        assert_eq!(
            err.to_string(),
            "mismatched input 'x' expecting ';' in \"if\" statement"
        );
    }

    #[test]
    fn json_view_always_has_every_field() {
        let d = Diagnostic::semantic(Severity::Warning, "shadowed", Span::new(0, 1, 1, 1));
        let v = d.to_json_value();
        assert_eq!(v["lexeme"], serde_json::Value::Null);
        assert_eq!(v["severity"], "warning");
        assert_eq!(v["kind"], "semantic");
        assert_eq!(v["line"], 1);
    }

    #[test]
    fn fatal_eof_mentions_context_when_known() {
        let e = FatalError::UnexpectedEof {
            context: Some("in block".to_owned()),
        };
        assert_eq!(
            e.to_string(),
            "unexpected end of input while recovering from a syntax error in block"
        );
        let bare = FatalError::UnexpectedEof { context: None };
        assert!(bare.to_string().ends_with("syntax error"));
    }
}
