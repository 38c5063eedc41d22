use tracing::debug;

use super::{PResult, Parser};
use crate::ast::Node;
use crate::error::{DiagnosticKind, FatalError, SyntaxErrorKind};
use crate::token::{Token, TokenKind, TokenSet};

impl<'s> Parser<'s> {
    // -- Matching -----------------------------------------------

    /// Match a token of `kind`.
    ///
    /// Outside speculation a mismatch is repaired in place when one token
    /// fixes it: an extraneous token is dropped when the one after it is
    /// the expected one, and a missing token is conjured when the current
    /// token can follow the rule being parsed. Either repair records a
    /// `Syntax` diagnostic. Anything else fails the rule.
    pub(super) fn expect(&mut self, kind: TokenKind) -> PResult<Token> {
        self.expect_before(kind, TokenSet::EMPTY)
    }

    /// Like [`Parser::expect`], for a token that `next` may directly follow
    /// inside the rule: a closing `)` or `]` is also conjured when the
    /// current token is one that would come right after it.
    pub(super) fn expect_before(&mut self, kind: TokenKind, next: TokenSet) -> PResult<Token> {
        if self.at(kind) {
            return Ok(self.advance());
        }
        if self.speculating() {
            return Err(self.mismatch(kind.describe()));
        }

        if self.la(2) == kind {
            let error = self.syntax_error(SyntaxErrorKind::Extraneous {
                found: self.cur().error_display(),
                expected: kind.describe(),
            });
            self.session.report_syntax(DiagnosticKind::Syntax, &error);
            debug!(dropped = %self.cur().text, line = self.cur().span.line, "single-token deletion");
            self.step();
            return Ok(self.advance());
        }

        let follows = self
            .follow
            .last()
            .copied()
            .unwrap_or(TokenSet::EMPTY)
            .union(next);
        if follows.contains(self.la(1)) {
            let error = self.syntax_error(SyntaxErrorKind::Missing {
                expected: kind.describe(),
                found: self.cur().error_display(),
            });
            self.session.report_syntax(DiagnosticKind::Syntax, &error);
            debug!(inserted = ?kind, line = self.cur().span.line, "single-token insertion");
            return Ok(Token::missing(kind, self.cur().span));
        }

        Err(self.mismatch(kind.describe()))
    }

    /// Match any token in `set`; `expected` names the set in messages.
    pub(super) fn expect_one_of(&mut self, set: TokenSet, expected: &str) -> PResult<Token> {
        if self.at_any(set) {
            Ok(self.advance())
        } else {
            Err(self.mismatch(expected))
        }
    }

    // -- Rule boundaries ----------------------------------------

    /// A rule with its own paraphrase. See [`Parser::recoverable`].
    pub(super) fn rule(
        &mut self,
        phrase: &'static str,
        follow: TokenSet,
        body: impl FnOnce(&mut Self) -> PResult<Node>,
    ) -> PResult<Node> {
        self.with_paraphrase(phrase, |p| p.recoverable(follow, body))
    }

    /// Run `body` as a recovery boundary. `follow` is what may come after
    /// the rule; it drives single-token insertion inside the rule and
    /// resynchronization after a failure. A failure outside speculation is
    /// reported, the input is skipped to a token in the combined follow
    /// sets, and an error node is returned in place of the rule's result.
    pub(super) fn recoverable(
        &mut self,
        follow: TokenSet,
        body: impl FnOnce(&mut Self) -> PResult<Node>,
    ) -> PResult<Node> {
        self.follow.push(follow);
        let result = body(self);
        self.follow.pop();

        match result {
            Ok(node) => Ok(node),
            Err(error) if self.speculating() => Err(error),
            Err(error) => {
                self.session
                    .report_syntax(DiagnosticKind::Recovered, &error);
                self.resync(follow, error.context.clone());
                Ok(Node::error(error.token))
            }
        }
    }

    /// Skip tokens until one in `follow` or in any enclosing rule's follow
    /// set. Always moves at least one token when the previous error was
    /// reported at this same position.
    fn resync(&mut self, follow: TokenSet, context: Option<String>) {
        let stop = self
            .follow
            .iter()
            .fold(follow, |acc, set| acc.union(*set));

        let start = self.pos;
        if self.last_error_pos == Some(self.pos) && !self.at(TokenKind::Eof) {
            self.step();
        }
        self.last_error_pos = Some(self.pos);
        while !self.at(TokenKind::Eof) && !stop.contains(self.la(1)) {
            self.step();
        }
        debug!(
            skipped = self.pos - start,
            resumed_at = %self.cur().text,
            line = self.cur().span.line,
            "resynchronized"
        );

        if self.at(TokenKind::Eof) && self.block_depth > 0 {
            let span = self.cur().span;
            self.session
                .abort(FatalError::UnexpectedEof { context }, span);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiagnosticKind;
    use crate::session::Session;
    use crate::token::sets;

    fn run<T>(src: &str, f: impl FnOnce(&mut Parser<'_>) -> T) -> (T, Session) {
        let mut session = Session::default();
        let out = {
            let mut p = Parser::new(src, &mut session);
            f(&mut p)
        };
        (out, session)
    }

    #[test]
    fn extraneous_token_is_deleted() {
        let (tok, session) = run("x ;", |p| {
            p.recoverable(sets::ACTION_FOLLOW, |p| p.expect(TokenKind::Semicolon).map(Node::leaf))
        });
        assert_eq!(tok.map(|n| n.is_error()), Ok(false));
        let d = session.diagnostics();
        assert_eq!(d.len(), 1);
        assert_eq!(d[0].kind, DiagnosticKind::Syntax);
        assert_eq!(d[0].message, "extraneous input 'x' expecting ';'");
    }

    #[test]
    fn missing_token_is_conjured_from_follow_set() {
        let (tok, session) = run("y = 2;", |p| {
            p.recoverable(sets::ACTION_FOLLOW, |p| p.expect(TokenKind::Semicolon).map(Node::leaf))
        });
        let node = tok.expect("repaired");
        assert_eq!(node.text(), Some("<missing ';'>"));
        assert_eq!(
            session.diagnostics()[0].message,
            "missing ';' at 'y'"
        );
    }

    #[test]
    fn closing_paren_is_conjured_before_what_follows_it() {
        let after = TokenSet::of(&[TokenKind::Semicolon]);
        let (tok, session) = run("; Wait", |p| {
            p.recoverable(sets::ACTION_FOLLOW, |p| {
                p.expect_before(TokenKind::RParen, after).map(Node::leaf)
            })
        });
        assert_eq!(tok.expect("repaired").text(), Some("<missing ')'>"));
        assert_eq!(session.diagnostics()[0].message, "missing ')' at ';'");

        let (plain, _) = run("; Wait", |p| {
            p.recoverable(sets::ACTION_FOLLOW, |p| p.expect(TokenKind::RParen).map(Node::leaf))
        });
        assert!(plain.expect("recovered").is_error());
    }

    #[test]
    fn unrepairable_mismatch_resyncs_and_returns_error_node() {
        let (node, session) = run(") ) foo", |p| {
            p.with_paraphrase("in test rule", |p| {
                p.recoverable(sets::ACTION_FOLLOW, |p| p.expect(TokenKind::Semicolon).map(Node::leaf))
            })
        });
        assert!(node.expect("recovered").is_error());
        let d = session.diagnostics();
        assert_eq!(d.len(), 1);
        assert_eq!(d[0].kind, DiagnosticKind::Recovered);
        assert_eq!(d[0].message, "mismatched input ')' expecting ';' in test rule");
        assert!(session.paraphrases().is_balanced());
    }

    #[test]
    fn repeated_failure_at_same_position_consumes_a_token() {
        let (pos, session) = run("else else", |p| {
            for _ in 0..2 {
                let _ = p.recoverable(sets::ACTION_FOLLOW, |p| Err(p.no_viable_alternative()));
            }
            p.pos
        });
        assert_eq!(pos, 1);
        // The second failure happens before any token is matched.
        assert_eq!(session.diagnostics().len(), 1);
    }

    #[test]
    fn eof_inside_braces_aborts() {
        let (_, session) = run("{ ) )", |p| {
            p.advance();
            p.within_braces(|p| {
                p.recoverable(TokenSet::of(&[TokenKind::Semicolon]), |p| {
                    Err(p.no_viable_alternative())
                })
            })
        });
        assert!(session.aborted());
        let last = session.diagnostics().last().expect("fatal diagnostic");
        assert_eq!(last.kind, DiagnosticKind::Fatal);
    }
}
