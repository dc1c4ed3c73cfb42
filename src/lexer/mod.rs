mod raw_token;
pub mod token;

use logos::{Lexer as LogosLexer, Logos};
use raw_token::RawToken;
pub use token::{Token, TokenKind};

/// Pull-based scanner producing one [`Token`] per call.
///
/// Once the source is exhausted every further call yields `Eof`.
pub struct Scanner<'source> {
    inner: LogosLexer<'source, RawToken>,
    at_end: bool,
}

impl<'source> Scanner<'source> {
    pub fn new(source: &'source str) -> Self {
        Scanner {
            inner: RawToken::lexer(source),
            at_end: false,
        }
    }

    pub fn scan_token(&mut self) -> Token<'source> {
        if self.at_end {
            return self.eof_token();
        }
        match self.inner.next() {
            Some(Ok(RawToken::UnterminatedString)) => self.error_token("Unterminated string."),
            Some(Ok(raw)) => self.make_token(Self::convert_token(raw)),
            Some(Err(())) => self.error_token("Unexpected character."),
            None => {
                self.at_end = true;
                self.eof_token()
            }
        }
    }

    fn make_token(&self, kind: TokenKind) -> Token<'source> {
        Token {
            kind,
            lexeme: self.inner.slice(),
            line: self.inner.extras.line,
            span: self.inner.span(),
        }
    }

    fn error_token(&self, message: &'static str) -> Token<'source> {
        Token {
            kind: TokenKind::Error,
            lexeme: message,
            line: self.inner.extras.line,
            span: self.inner.span(),
        }
    }

    fn eof_token(&self) -> Token<'source> {
        let end = self.inner.source().len();
        Token {
            kind: TokenKind::Eof,
            lexeme: "",
            line: self.inner.extras.line,
            span: end..end,
        }
    }

    fn convert_token(raw: RawToken) -> TokenKind {
        match raw {
            RawToken::And => TokenKind::And,
            RawToken::Class => TokenKind::Class,
            RawToken::Else => TokenKind::Else,
            RawToken::False => TokenKind::False,
            RawToken::For => TokenKind::For,
            RawToken::Fun => TokenKind::Fun,
            RawToken::If => TokenKind::If,
            RawToken::Nil => TokenKind::Nil,
            RawToken::Or => TokenKind::Or,
            RawToken::Print => TokenKind::Print,
            RawToken::Return => TokenKind::Return,
            RawToken::Super => TokenKind::Super,
            RawToken::This => TokenKind::This,
            RawToken::True => TokenKind::True,
            RawToken::Var => TokenKind::Var,
            RawToken::While => TokenKind::While,

            RawToken::Identifier => TokenKind::Identifier,
            RawToken::Number => TokenKind::Number,
            RawToken::String => TokenKind::String,
            // Surfaced as an error token by `scan_token`.
            RawToken::UnterminatedString => TokenKind::Error,

            RawToken::LeftParen => TokenKind::LeftParen,
            RawToken::RightParen => TokenKind::RightParen,
            RawToken::LeftBrace => TokenKind::LeftBrace,
            RawToken::RightBrace => TokenKind::RightBrace,
            RawToken::Comma => TokenKind::Comma,
            RawToken::Dot => TokenKind::Dot,
            RawToken::Minus => TokenKind::Minus,
            RawToken::Plus => TokenKind::Plus,
            RawToken::Semicolon => TokenKind::Semicolon,
            RawToken::Slash => TokenKind::Slash,
            RawToken::Star => TokenKind::Star,
            RawToken::Bang => TokenKind::Bang,
            RawToken::BangEqual => TokenKind::BangEqual,
            RawToken::Equal => TokenKind::Equal,
            RawToken::EqualEqual => TokenKind::EqualEqual,
            RawToken::Greater => TokenKind::Greater,
            RawToken::GreaterEqual => TokenKind::GreaterEqual,
            RawToken::Less => TokenKind::Less,
            RawToken::LessEqual => TokenKind::LessEqual,

            // Newlines are skipped inside the logos callback.
            RawToken::Newline => TokenKind::Error,
        }
    }
}

impl<'source> Iterator for Scanner<'source> {
    type Item = Token<'source>;

    /// Yields tokens up to, but not including, `Eof`.
    fn next(&mut self) -> Option<Self::Item> {
        let token = self.scan_token();
        (token.kind != TokenKind::Eof).then_some(token)
    }
}
