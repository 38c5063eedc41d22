//! Recursive-descent parser producing the plan syntax tree.
//!
//! One method per production, spread over:
//!
//! - `declarations` -- global command, lookup and library action declarations
//! - `nodes` -- blocks, node declarations and node attributes
//! - `actions` -- compound and simple actions
//! - `expressions` -- the expression cascade and its primaries
//! - `recovery` -- `expect`, rule boundaries and resynchronization
//!
//! Ambiguous spots are settled either by bounded lookahead ([`Parser::la`])
//! or by speculative parsing ([`Parser::try_parse`], [`Parser::predicts`]).
//! A speculative attempt never reports syntax errors and leaves no trace in
//! the session or the scope arena when it is rolled back.

use tracing::trace;

use crate::ast::Node;
use crate::error::{Diagnostic, FatalError, LexError, Severity, SyntaxError, SyntaxErrorKind};
use crate::lexer::Lexer;
use crate::scope::{Binding, BindingKind, ScopeArena, ScopeId, ScopeMark};
use crate::session::{Session, SessionMark};
use crate::token::{Token, TokenKind, TokenSet};

mod actions;
mod declarations;
mod expressions;
mod nodes;
mod recovery;

pub(crate) type PResult<T> = Result<T, SyntaxError>;

/// What a reference must resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reference {
    Variable,
    Command,
    Lookup,
    LibraryAction,
}

// ──────────────────────────────────────────────
// Parser
// ──────────────────────────────────────────────

pub(crate) struct Parser<'s> {
    tokens: Vec<Token>,
    pos: usize,
    /// Lexical errors keyed by the index of the token that follows them.
    lex_errors: Vec<(usize, LexError)>,
    lex_reported: usize,
    session: &'s mut Session,
    scopes: ScopeArena,
    scope: ScopeId,
    follow: Vec<TokenSet>,
    speculating: usize,
    block_depth: usize,
    /// Actions and expressions currently open, see [`Parser::nested`].
    depth: usize,
    last_error_pos: Option<usize>,
    /// Semantic diagnostics raised while speculating, released on commit.
    deferred: Vec<Diagnostic>,
}

/// Everything a speculative parse may change.
struct Snapshot {
    pos: usize,
    session: SessionMark,
    scopes: ScopeMark,
    scope: ScopeId,
    follow: usize,
    block_depth: usize,
    depth: usize,
    last_error_pos: Option<usize>,
    deferred: usize,
}

impl<'s> Parser<'s> {
    fn new(source: &str, session: &'s mut Session) -> Self {
        session.begin_unit();
        let (tokens, lex_errors) = Lexer::new(source).tokenize();
        let scopes = ScopeArena::new();
        let scope = scopes.global();
        let mut parser = Parser {
            tokens,
            pos: 0,
            lex_errors,
            lex_reported: 0,
            session,
            scopes,
            scope,
            follow: Vec::new(),
            speculating: 0,
            block_depth: 0,
            depth: 0,
            last_error_pos: None,
            deferred: Vec::new(),
        };
        parser.flush_lex_errors();
        parser
    }

    fn finish(mut self) -> ScopeArena {
        // Anything still pending sits before end of input.
        while let Some((_, error)) = self.lex_errors.get(self.lex_reported) {
            self.session.report(Diagnostic::lexical(error));
            self.lex_reported += 1;
        }
        self.scopes
    }

    // -- Token cursor -------------------------------------------

    /// The `k`-th token ahead, 1-based. Past the end, and after the unit is
    /// aborted, this is the end-of-input token.
    fn lt(&self, k: usize) -> &Token {
        let last = self.tokens.len().saturating_sub(1);
        let index = if self.session.aborted() {
            last
        } else {
            (self.pos + k.saturating_sub(1)).min(last)
        };
        &self.tokens[index]
    }

    fn la(&self, k: usize) -> TokenKind {
        self.lt(k).kind
    }

    fn cur(&self) -> &Token {
        self.lt(1)
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.la(1) == kind
    }

    fn at_any(&self, set: TokenSet) -> bool {
        set.contains(self.la(1))
    }

    /// Match the current token, whatever it is.
    fn advance(&mut self) -> Token {
        let token = self.cur().clone();
        self.session.end_error_recovery();
        self.step();
        token
    }

    /// Match the current token if it is `kind`.
    fn eat(&mut self, kind: TokenKind) -> Option<Token> {
        if self.at(kind) {
            Some(self.advance())
        } else {
            None
        }
    }

    /// Move past the current token without matching it.
    fn step(&mut self) {
        if self.la(1) != TokenKind::Eof {
            self.pos += 1;
        }
        self.flush_lex_errors();
    }

    fn flush_lex_errors(&mut self) {
        if self.speculating > 0 {
            return;
        }
        while let Some((index, error)) = self.lex_errors.get(self.lex_reported) {
            if *index > self.pos {
                break;
            }
            self.session.report(Diagnostic::lexical(error));
            self.lex_reported += 1;
        }
    }

    /// Report what a committed trial held back, together with the lexical
    /// errors it passed, in source order. A note stays behind the
    /// diagnostic it belongs to.
    fn release_deferred(&mut self) {
        let mut pending: Vec<(usize, Diagnostic)> = Vec::new();
        while let Some((index, error)) = self.lex_errors.get(self.lex_reported) {
            if *index > self.pos {
                break;
            }
            let diagnostic = Diagnostic::lexical(error);
            pending.push((diagnostic.span.start, diagnostic));
            self.lex_reported += 1;
        }
        let mut key = 0;
        for diagnostic in std::mem::take(&mut self.deferred) {
            if diagnostic.severity != Severity::Note {
                key = diagnostic.span.start;
            }
            pending.push((key, diagnostic));
        }
        pending.sort_by_key(|(start, _)| *start);
        for (_, diagnostic) in pending {
            self.session.report(diagnostic);
        }
    }

    // -- Error construction -------------------------------------

    /// The paraphrase on top of the stack, as attached to error messages.
    fn context(&self) -> Option<String> {
        self.session.paraphrases().top().map(str::to_owned)
    }

    fn syntax_error(&self, kind: SyntaxErrorKind) -> SyntaxError {
        SyntaxError {
            kind,
            token: self.cur().clone(),
            context: self.context(),
        }
    }

    fn mismatch(&self, expected: impl Into<String>) -> SyntaxError {
        self.syntax_error(SyntaxErrorKind::Mismatched {
            found: self.cur().error_display(),
            expected: expected.into(),
        })
    }

    fn no_viable_alternative(&self) -> SyntaxError {
        self.syntax_error(SyntaxErrorKind::NoViableAlternative {
            found: self.cur().error_display(),
        })
    }

    // -- Speculation --------------------------------------------

    fn speculating(&self) -> bool {
        self.speculating > 0
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            pos: self.pos,
            session: self.session.mark(),
            scopes: self.scopes.mark(),
            scope: self.scope,
            follow: self.follow.len(),
            block_depth: self.block_depth,
            depth: self.depth,
            last_error_pos: self.last_error_pos,
            deferred: self.deferred.len(),
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.pos = snapshot.pos;
        self.session.rollback(snapshot.session);
        self.scopes.rollback(snapshot.scopes);
        self.scope = snapshot.scope;
        self.follow.truncate(snapshot.follow);
        self.block_depth = snapshot.block_depth;
        self.depth = snapshot.depth;
        self.last_error_pos = snapshot.last_error_pos;
        self.deferred.truncate(snapshot.deferred);
    }

    /// Attempt `body`; keep its effects if it succeeds, rewind if it fails.
    fn try_parse<T>(
        &mut self,
        what: &'static str,
        body: impl FnOnce(&mut Self) -> PResult<T>,
    ) -> Option<T> {
        let snapshot = self.snapshot();
        self.speculating += 1;
        let result = body(self);
        self.speculating -= 1;
        match result {
            Ok(value) => {
                trace!(what, pos = self.pos, "speculation committed");
                if !self.speculating() {
                    self.release_deferred();
                }
                Some(value)
            }
            Err(error) => {
                trace!(what, %error, "speculation rolled back");
                self.restore(snapshot);
                None
            }
        }
    }

    /// Whether `body` would succeed from here. Always rewinds.
    fn predicts(&mut self, what: &'static str, body: impl FnOnce(&mut Self) -> PResult<()>) -> bool {
        let snapshot = self.snapshot();
        self.speculating += 1;
        let matched = body(self).is_ok();
        self.speculating -= 1;
        trace!(what, matched, "prediction");
        self.restore(snapshot);
        matched
    }

    // -- Scoped state -------------------------------------------

    /// Run `body` with `phrase` on the paraphrase stack.
    fn with_paraphrase<T>(&mut self, phrase: &'static str, body: impl FnOnce(&mut Self) -> T) -> T {
        self.session.paraphrases_mut().push(phrase);
        let out = body(self);
        self.session.paraphrases_mut().pop();
        out
    }

    /// Run `body` in a fresh node context chained to the active one.
    fn within_scope<T>(&mut self, name: Option<String>, body: impl FnOnce(&mut Self) -> T) -> T {
        let outer = self.scope;
        self.scope = self.scopes.push_child(outer, name);
        if !self.speculating() {
            tracing::debug!(scope = self.scope.index(), parent = outer.index(), "node context");
        }
        let out = body(self);
        self.scope = outer;
        out
    }

    /// Run `body` between a pair of braces.
    fn within_braces<T>(&mut self, body: impl FnOnce(&mut Self) -> T) -> T {
        self.block_depth += 1;
        let out = body(self);
        self.block_depth -= 1;
        out
    }

    /// Run `body` one nesting level deeper. Past `max_depth` the rule fails;
    /// outside speculation the compile unit is abandoned as well.
    fn nested<T>(&mut self, body: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        let limit = self.session.options().max_depth;
        if self.depth >= limit {
            if !self.speculating() {
                let span = self.cur().span;
                self.session.abort(FatalError::NestingTooDeep { limit }, span);
            }
            return Err(self.no_viable_alternative());
        }
        self.depth += 1;
        let out = body(self);
        self.depth -= 1;
        out
    }

    // -- Declarations and references ----------------------------

    fn report_semantic(&mut self, diagnostic: Diagnostic) {
        if self.speculating() {
            self.deferred.push(diagnostic);
        } else {
            self.session.report(diagnostic);
        }
    }

    /// Declare `binding` in the active context.
    fn declare(&mut self, binding: Binding) {
        self.declare_in(self.scope, binding);
    }

    fn declare_in(&mut self, scope: ScopeId, binding: Binding) {
        if let Some(severity) = self.session.options().redeclarations.severity() {
            self.check_redeclaration(scope, &binding, severity);
        }
        self.scopes.declare(scope, binding);
    }

    fn check_redeclaration(&mut self, scope: ScopeId, binding: &Binding, severity: Severity) {
        let previous = self
            .scopes
            .bindings_in(scope)
            .find(|b| b.name == binding.name && b.kind.same_namespace(binding.kind))
            .map(|b| (b.kind, b.span));
        if let Some((kind, span)) = previous {
            self.report_semantic(
                Diagnostic::semantic(
                    severity,
                    format!(
                        "{} \"{}\" is already declared in this context",
                        binding.kind.describe(),
                        binding.name
                    ),
                    binding.span,
                )
                .with_lexeme(binding.name.clone()),
            );
            self.report_semantic(Diagnostic::semantic(
                Severity::Note,
                format!("{} \"{}\" previously declared here", kind.describe(), binding.name),
                span,
            ));
        }
        // Interface declarations name inherited variables on purpose.
        let local = matches!(binding.kind, BindingKind::Variable | BindingKind::ArrayVariable);
        if local
            && self
                .scopes
                .find_inherited_variable(scope, &binding.name)
                .is_some()
        {
            self.report_semantic(
                Diagnostic::semantic(
                    Severity::Warning,
                    format!(
                        "local variable \"{}\" shadows an inherited variable",
                        binding.name
                    ),
                    binding.span,
                )
                .with_lexeme(binding.name.clone()),
            );
        }
    }

    /// Check that `name` resolves from the active context.
    fn check_reference(&mut self, name: &Token, reference: Reference) {
        let severity = match self.session.options().references.severity() {
            Some(severity) => severity,
            None => return,
        };
        if name.is_missing() {
            return;
        }
        let (wanted, message) = match reference {
            Reference::Variable => (
                BindingKind::Variable,
                format!("undefined variable \"{}\"", name.text),
            ),
            Reference::Command => (
                BindingKind::Command,
                format!("command \"{}\" is not declared", name.text),
            ),
            Reference::Lookup => (
                BindingKind::Lookup,
                format!("lookup \"{}\" is not declared", name.text),
            ),
            Reference::LibraryAction => (
                BindingKind::LibraryAction,
                format!("library action \"{}\" is not declared", name.text),
            ),
        };
        let found = self
            .scopes
            .resolve_kind(self.scope, &name.text, |k| k.same_namespace(wanted))
            .is_some();
        if !found {
            self.report_semantic(
                Diagnostic::semantic(severity, message, name.span).with_lexeme(name.text.clone()),
            );
        }
    }
}

/// Parse `source` with the options, diagnostics sink and paraphrase stack of
/// `session`. Returns the plan and the declaration scopes built along the way.
///
/// A session may be reused for several units. Diagnostics accumulate; the
/// error limit, the abort and the recovery state apply to one call.
pub fn parse_with_session(source: &str, session: &mut Session) -> (Node, ScopeArena) {
    let mut parser = Parser::new(source, session);
    let plan = parser.plan();
    let scopes = parser.finish();
    (plan, scopes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CheckLevel, ParseOptions};
    use crate::error::DiagnosticKind;

    fn parser_for<'s>(src: &str, session: &'s mut Session) -> Parser<'s> {
        Parser::new(src, session)
    }

    #[test]
    fn lookahead_is_bounded_by_end_of_input() {
        let mut session = Session::default();
        let p = parser_for("a b", &mut session);
        assert_eq!(p.la(1), TokenKind::Ident);
        assert_eq!(p.la(2), TokenKind::Ident);
        assert_eq!(p.la(3), TokenKind::Eof);
        assert_eq!(p.la(9), TokenKind::Eof);
    }

    #[test]
    fn failed_trial_leaves_no_trace() {
        let mut session = Session::new(ParseOptions {
            references: CheckLevel::Error,
            ..ParseOptions::default()
        });
        let mut p = parser_for("x y z", &mut session);
        let before_scopes = p.scopes.len();
        let got = p.try_parse("trial", |p| {
            let name = p.advance();
            p.check_reference(&name, Reference::Variable);
            p.within_scope(None, |p| {
                p.declare(Binding::new("tmp", BindingKind::Variable, name.span))
            });
            p.expect(TokenKind::Semicolon)
        });
        assert!(got.is_none());
        assert_eq!(p.pos, 0);
        assert_eq!(p.scopes.len(), before_scopes);
        assert!(p.scopes.bindings().is_empty());
        assert!(p.deferred.is_empty());
        drop(p);
        assert!(session.diagnostics().is_empty());
    }

    #[test]
    fn committed_trial_releases_semantic_diagnostics() {
        let mut session = Session::new(ParseOptions {
            references: CheckLevel::Error,
            ..ParseOptions::default()
        });
        let mut p = parser_for("x ;", &mut session);
        let got = p.try_parse("trial", |p| {
            let name = p.advance();
            p.check_reference(&name, Reference::Variable);
            p.expect(TokenKind::Semicolon)
        });
        assert!(got.is_some());
        assert_eq!(p.la(1), TokenKind::Eof);
        drop(p);
        assert_eq!(session.diagnostics().len(), 1);
        assert_eq!(session.diagnostics()[0].kind, DiagnosticKind::Semantic);
        assert_eq!(session.diagnostics()[0].message, "undefined variable \"x\"");
    }

    #[test]
    fn predicts_always_rewinds() {
        let mut session = Session::default();
        let mut p = parser_for("a = 1", &mut session);
        assert!(p.predicts("assignment", |p| {
            p.expect(TokenKind::Ident)?;
            p.expect(TokenKind::Equals)?;
            Ok(())
        }));
        assert_eq!(p.pos, 0);
        assert!(!p.predicts("call", |p| {
            p.expect(TokenKind::Ident)?;
            p.expect(TokenKind::LParen)?;
            Ok(())
        }));
        assert_eq!(p.pos, 0);
    }

    #[test]
    fn lexical_errors_surface_when_cursor_reaches_them() {
        let mut session = Session::default();
        let mut p = parser_for("a @ b", &mut session);
        assert!(p.session.diagnostics().is_empty());
        p.advance();
        assert_eq!(p.session.diagnostics().len(), 1);
        assert_eq!(p.session.diagnostics()[0].kind, DiagnosticKind::Lexical);
    }
}
