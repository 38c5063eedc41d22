//! Tokenizer for Plexil source text.
//!
//! The lexer is pull-based: each call to [`Lexer::next_token`] yields the
//! next token or a [`LexError`]. After an error it stays put; the caller
//! decides to continue by calling [`Lexer::recover`].

use crate::error::LexError;
use crate::token::{Span, Token, TokenKind};

pub struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    line: u32,
    column: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Lexer {
            src,
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    // -- Character cursor ---------------------------------------

    fn peek_char(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.src[self.pos..].chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn here(&self) -> Span {
        Span::new(self.pos, self.pos, self.line, self.column)
    }

    fn finish(&self, start: Span) -> Span {
        Span::new(start.start, self.pos, start.line, start.column)
    }

    // -- Trivia -------------------------------------------------

    fn skip_trivia(&mut self) -> Result<(), LexError> {
        loop {
            match (self.peek_char(), self.peek_nth(1)) {
                (Some(' ' | '\t' | '\n' | '\r' | '\u{000C}'), _) => {
                    self.bump();
                }
                (Some('/'), Some('/')) => {
                    while let Some(c) = self.peek_char() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                (Some('/'), Some('*')) => {
                    let start = self.here();
                    self.bump();
                    self.bump();
                    loop {
                        match self.peek_char() {
                            None => {
                                // Rewind so recovery sees where the comment opened.
                                let span = self.finish(start);
                                self.pos = start.start;
                                self.line = start.line;
                                self.column = start.column;
                                return Err(LexError::UnterminatedComment { span });
                            }
                            Some('*') if self.peek_nth(1) == Some('/') => {
                                self.bump();
                                self.bump();
                                break;
                            }
                            Some(_) => {
                                self.bump();
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    // -- Tokens -------------------------------------------------

    /// Produce the next token. `Eof` is returned once input is exhausted and
    /// on every call after that.
    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_trivia()?;
        let start = self.here();
        let c = match self.peek_char() {
            Some(c) => c,
            None => return Ok(Token::new(TokenKind::Eof, "<EOF>", start)),
        };

        if c.is_ascii_alphabetic() || c == '_' {
            return Ok(self.lex_word(start));
        }
        if c.is_ascii_digit() || (c == '.' && self.peek_nth(1).is_some_and(|d| d.is_ascii_digit()))
        {
            return self.lex_number(start);
        }
        if c == '"' || c == '\'' {
            return self.lex_string(start, c);
        }
        self.lex_punctuation(start, c)
    }

    fn lex_word(&mut self, start: Span) -> Token {
        while let Some(c) = self.peek_char() {
            if c.is_ascii_alphanumeric() || c == '_' {
                self.bump();
            } else {
                break;
            }
        }
        let text = &self.src[start.start..self.pos];
        let kind = TokenKind::keyword(text).unwrap_or(TokenKind::Ident);
        Token::new(kind, text, self.finish(start))
    }

    fn eat_digits(&mut self, radix: u32) -> usize {
        let mut n = 0;
        while let Some(c) = self.peek_char() {
            if c.is_digit(radix) {
                self.bump();
                n += 1;
            } else {
                break;
            }
        }
        n
    }

    fn lex_number(&mut self, start: Span) -> Result<Token, LexError> {
        if self.peek_char() == Some('0') {
            let radix = match self.peek_nth(1) {
                Some('x' | 'X') => Some(16),
                Some('o' | 'O') => Some(8),
                Some('b' | 'B') => Some(2),
                _ => None,
            };
            if let Some(radix) = radix {
                self.bump();
                self.bump();
                if self.eat_digits(radix) == 0 {
                    let text = self.src[start.start..self.pos].to_owned();
                    let span = self.finish(start);
                    return Err(self.rewind_with(
                        start,
                        LexError::MalformedNumber { text, span },
                    ));
                }
                let text = &self.src[start.start..self.pos];
                return Ok(Token::new(TokenKind::Int, text, self.finish(start)));
            }
        }

        let mut kind = TokenKind::Int;
        self.eat_digits(10);
        if self.peek_char() == Some('.') && self.peek_nth(1) != Some('.') {
            self.bump();
            self.eat_digits(10);
            kind = TokenKind::Double;
        }
        if let Some('e' | 'E') = self.peek_char() {
            let signed = matches!(self.peek_nth(1), Some('+' | '-'));
            let digit_at = if signed { 2 } else { 1 };
            if self.peek_nth(digit_at).is_some_and(|d| d.is_ascii_digit()) {
                self.bump();
                if signed {
                    self.bump();
                }
                self.eat_digits(10);
                kind = TokenKind::Double;
            }
        }
        let text = &self.src[start.start..self.pos];
        Ok(Token::new(kind, text, self.finish(start)))
    }

    fn lex_string(&mut self, start: Span, quote: char) -> Result<Token, LexError> {
        self.bump();
        let mut value = String::new();
        let mut bad_escape: Option<String> = None;
        loop {
            let c = match self.bump() {
                Some(c) => c,
                None => {
                    let span = self.finish(start);
                    return Err(self.rewind_with(start, LexError::UnterminatedString { span }));
                }
            };
            if c == quote {
                break;
            }
            if c != '\\' {
                value.push(c);
                continue;
            }
            match self.decode_escape() {
                Ok(Some(decoded)) => value.push(decoded),
                Ok(None) => {}
                Err(escape) => {
                    bad_escape.get_or_insert(escape);
                }
            }
        }
        let span = self.finish(start);
        if let Some(escape) = bad_escape {
            return Err(self.rewind_with(start, LexError::InvalidEscape { escape, span }));
        }
        Ok(Token::new(TokenKind::Str, value, span))
    }

    /// Decode the escape after a backslash. `Ok(None)` is a line
    /// continuation; `Err` carries the offending escape text.
    fn decode_escape(&mut self) -> Result<Option<char>, String> {
        let c = match self.peek_char() {
            Some(c) => c,
            None => return Err("\\".to_owned()),
        };
        let simple = match c {
            'n' => Some('\n'),
            't' => Some('\t'),
            'b' => Some('\u{0008}'),
            'f' => Some('\u{000C}'),
            'r' => Some('\r'),
            '"' => Some('"'),
            '\'' => Some('\''),
            '\\' => Some('\\'),
            _ => None,
        };
        if let Some(decoded) = simple {
            self.bump();
            return Ok(Some(decoded));
        }
        match c {
            '\n' => {
                self.bump();
                Ok(None)
            }
            'u' => {
                self.bump();
                let mut code = 0u32;
                let mut text = String::from("\\u");
                for _ in 0..4 {
                    match self.peek_char() {
                        Some(h) if h.is_ascii_hexdigit() => {
                            self.bump();
                            text.push(h);
                            code = code * 16 + h.to_digit(16).unwrap_or(0);
                        }
                        _ => return Err(text),
                    }
                }
                char::from_u32(code).map(Some).ok_or(text)
            }
            '0'..='7' => {
                // Up to three octal digits, the first at most 3 when three are used.
                let max_len = if c <= '3' { 3 } else { 2 };
                let mut code = 0u32;
                let mut len = 0;
                while len < max_len {
                    match self.peek_char() {
                        Some(d @ '0'..='7') => {
                            self.bump();
                            code = code * 8 + (d as u32 - '0' as u32);
                            len += 1;
                        }
                        _ => break,
                    }
                }
                char::from_u32(code)
                    .map(Some)
                    .ok_or_else(|| format!("\\{:o}", code))
            }
            other => {
                self.bump();
                Err(format!("\\{}", other))
            }
        }
    }

    fn lex_punctuation(&mut self, start: Span, c: char) -> Result<Token, LexError> {
        let next = self.peek_nth(1);
        let (kind, len) = match (c, next) {
            ('=', Some('=')) => (TokenKind::DoubleEquals, 2),
            ('!', Some('=')) => (TokenKind::NotEquals, 2),
            ('>', Some('=')) => (TokenKind::Geq, 2),
            ('<', Some('=')) => (TokenKind::Leq, 2),
            ('&', Some('&')) => (TokenKind::And, 2),
            ('|', Some('|')) => (TokenKind::Or, 2),
            ('#', Some('(')) => (TokenKind::HashParen, 2),
            ('.', Some('.')) if self.peek_nth(2) == Some('.') => (TokenKind::Ellipsis, 3),
            ('=', _) => (TokenKind::Equals, 1),
            ('!', _) => (TokenKind::Not, 1),
            ('>', _) => (TokenKind::Greater, 1),
            ('<', _) => (TokenKind::Less, 1),
            ('|', _) => (TokenKind::Bar, 1),
            ('*', _) => (TokenKind::Asterisk, 1),
            (':', _) => (TokenKind::Colon, 1),
            (',', _) => (TokenKind::Comma, 1),
            ('{', _) => (TokenKind::LBrace, 1),
            ('}', _) => (TokenKind::RBrace, 1),
            ('[', _) => (TokenKind::LBracket, 1),
            (']', _) => (TokenKind::RBracket, 1),
            ('(', _) => (TokenKind::LParen, 1),
            (')', _) => (TokenKind::RParen, 1),
            ('%', _) => (TokenKind::Percent, 1),
            ('.', _) => (TokenKind::Period, 1),
            ('+', _) => (TokenKind::Plus, 1),
            ('-', _) => (TokenKind::Minus, 1),
            (';', _) => (TokenKind::Semicolon, 1),
            ('/', _) => (TokenKind::Slash, 1),
            (ch, _) => {
                let mut span = start;
                span.end = start.start + ch.len_utf8();
                return Err(LexError::UnexpectedChar { ch, span });
            }
        };
        for _ in 0..len {
            self.bump();
        }
        let text = &self.src[start.start..self.pos];
        Ok(Token::new(kind, text, self.finish(start)))
    }

    fn rewind_with(&mut self, start: Span, error: LexError) -> LexError {
        self.pos = start.start;
        self.line = start.line;
        self.column = start.column;
        error
    }

    // -- Recovery -----------------------------------------------

    /// Move past the input that caused `error` so lexing can continue:
    /// to the end of the opening line for an unterminated string, to the end
    /// of input for an unterminated comment, past the literal for a bad
    /// escape or number, and past one character otherwise.
    pub fn recover(&mut self, error: &LexError) {
        let span = error.span();
        match error {
            LexError::UnterminatedString { .. } => {
                self.seek(span.start);
                while let Some(c) = self.peek_char() {
                    if c == '\n' {
                        break;
                    }
                    self.bump();
                }
            }
            LexError::UnterminatedComment { .. } => self.seek(self.src.len()),
            LexError::InvalidEscape { .. } | LexError::MalformedNumber { .. } => {
                self.seek(span.end)
            }
            LexError::UnexpectedChar { .. } => {
                self.seek(span.start);
                self.bump();
            }
        }
    }

    fn seek(&mut self, target: usize) {
        if target < self.pos {
            return;
        }
        while self.pos < target {
            if self.bump().is_none() {
                break;
            }
        }
    }

    /// Lex the whole input, recovering from errors. Each error is paired with
    /// the index of the token that follows it in the returned stream.
    pub fn tokenize(mut self) -> (Vec<Token>, Vec<(usize, LexError)>) {
        let mut tokens = Vec::new();
        let mut errors = Vec::new();
        loop {
            match self.next_token() {
                Ok(token) => {
                    let eof = token.kind == TokenKind::Eof;
                    tokens.push(token);
                    if eof {
                        break;
                    }
                }
                Err(error) => {
                    self.recover(&error);
                    errors.push((tokens.len(), error));
                }
            }
        }
        (tokens, errors)
    }
}
