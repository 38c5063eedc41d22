//! Per-compile-unit state shared by every parsing rule.

use tracing::warn;

use crate::config::ParseOptions;
use crate::error::{Diagnostic, DiagnosticKind, FatalError, Severity, SyntaxError};
use crate::token::Span;

// ──────────────────────────────────────────────
// Paraphrase stack
// ──────────────────────────────────────────────

/// Stack of "in ..." phrases describing the constructs being parsed.
/// Pushes and pops are counted so that balance can be checked after a run.
#[derive(Debug, Clone, Default)]
pub struct ParaphraseStack {
    stack: Vec<&'static str>,
    pushes: usize,
    pops: usize,
}

impl ParaphraseStack {
    pub fn push(&mut self, phrase: &'static str) {
        self.stack.push(phrase);
        self.pushes += 1;
    }

    pub fn pop(&mut self) -> Option<&'static str> {
        let phrase = self.stack.pop()?;
        self.pops += 1;
        Some(phrase)
    }

    pub fn top(&self) -> Option<&'static str> {
        self.stack.last().copied()
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn pushes(&self) -> usize {
        self.pushes
    }

    pub fn pops(&self) -> usize {
        self.pops
    }

    pub fn is_balanced(&self) -> bool {
        self.stack.is_empty() && self.pushes == self.pops
    }
}

// ──────────────────────────────────────────────
// Session
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct Session {
    options: ParseOptions,
    diagnostics: Vec<Diagnostic>,
    paraphrases: ParaphraseStack,
    error_recovery: bool,
    error_count: usize,
    aborted: bool,
}

/// What a speculative parse may change in the session.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SessionMark {
    diagnostics: usize,
    error_count: usize,
    error_recovery: bool,
    paraphrase_depth: usize,
}

impl Session {
    pub fn new(options: ParseOptions) -> Self {
        Session {
            options,
            ..Session::default()
        }
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    pub fn paraphrases(&self) -> &ParaphraseStack {
        &self.paraphrases
    }

    pub(crate) fn paraphrases_mut(&mut self) -> &mut ParaphraseStack {
        &mut self.paraphrases
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn aborted(&self) -> bool {
        self.aborted
    }

    pub fn in_error_recovery(&self) -> bool {
        self.error_recovery
    }

    /// Start a new compile unit. Diagnostics from earlier units are kept;
    /// the error count, the abort and the recovery state start over.
    pub(crate) fn begin_unit(&mut self) {
        self.error_count = 0;
        self.error_recovery = false;
        self.aborted = false;
    }

    /// A token was matched normally; syntax errors may be reported again.
    pub(crate) fn end_error_recovery(&mut self) {
        self.error_recovery = false;
    }

    /// Append a diagnostic. Nothing is recorded once the unit is aborted.
    /// Reaching the error limit aborts the unit.
    pub fn report(&mut self, diagnostic: Diagnostic) {
        if self.aborted {
            return;
        }
        let is_error = diagnostic.severity == Severity::Error;
        let span = diagnostic.span;
        self.diagnostics.push(diagnostic);
        if is_error {
            self.error_count += 1;
            if self.error_count >= self.options.max_errors {
                self.abort(
                    FatalError::TooManyErrors {
                        limit: self.options.max_errors,
                    },
                    span,
                );
            }
        }
    }

    /// Report a syntax error unless one is already being recovered from.
    /// Returns whether it was recorded.
    pub(crate) fn report_syntax(&mut self, kind: DiagnosticKind, error: &SyntaxError) -> bool {
        if self.aborted || self.error_recovery {
            return false;
        }
        self.error_recovery = true;
        self.report(Diagnostic::syntax(kind, error));
        true
    }

    /// Abandon the compile unit. Only the first abort is recorded.
    pub fn abort(&mut self, error: FatalError, span: Span) {
        if self.aborted {
            return;
        }
        warn!(%error, line = span.line, "aborting compile unit");
        self.diagnostics.push(Diagnostic::fatal(&error, span));
        self.aborted = true;
    }

    pub(crate) fn mark(&self) -> SessionMark {
        SessionMark {
            diagnostics: self.diagnostics.len(),
            error_count: self.error_count,
            error_recovery: self.error_recovery,
            paraphrase_depth: self.paraphrases.depth(),
        }
    }

    /// Undo everything recorded since `mark`. Speculation never reports
    /// errors, so `aborted` cannot have changed in between.
    pub(crate) fn rollback(&mut self, mark: SessionMark) {
        self.diagnostics.truncate(mark.diagnostics);
        self.error_count = mark.error_count;
        self.error_recovery = mark.error_recovery;
        while self.paraphrases.depth() > mark.paraphrase_depth {
            self.paraphrases.pop();
        }
    }
}
