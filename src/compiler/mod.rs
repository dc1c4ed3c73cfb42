//! Single-pass compiler: a Pratt parser that writes bytecode straight into a
//! [`Chunk`] without building a syntax tree.

mod rules;

use crate::Diagnostic;
use crate::lexer::{Scanner, Token, TokenKind};
use crate::vm::bytecode::{Chunk, OpCode};
use crate::vm::value::Value;
pub use rules::Precedence;
use rules::rule;

/// Result of one compilation. The chunk is partial when `is_ok()` is false and
/// must not be executed.
#[derive(Debug, Clone)]
pub struct Compiled {
    pub chunk: Chunk,
    pub diagnostics: Vec<Diagnostic>,
    ok: bool,
}

impl Compiled {
    pub fn is_ok(&self) -> bool {
        self.ok
    }

    /// Returns the chunk, or every diagnostic if compilation failed.
    pub fn into_result(self) -> Result<Chunk, Vec<Diagnostic>> {
        if self.ok {
            Ok(self.chunk)
        } else {
            Err(self.diagnostics)
        }
    }
}

pub fn compile(source: &str) -> Compiled {
    Compiler::new(source).compile()
}

pub struct Compiler<'src> {
    scanner: Scanner<'src>,
    previous: Token<'src>,
    current: Token<'src>,
    chunk: Chunk,
    had_error: bool,
    /// Set after a report; silences errors until the next statement boundary.
    panic_mode: bool,
    diagnostics: Vec<Diagnostic>,
}

impl<'src> Compiler<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            scanner: Scanner::new(source),
            previous: Token::start(),
            current: Token::start(),
            chunk: Chunk::new(),
            had_error: false,
            panic_mode: false,
            diagnostics: Vec::new(),
        }
    }

    pub fn compile(mut self) -> Compiled {
        self.advance();
        while !self.match_token(TokenKind::Eof) {
            self.declaration();
        }
        self.emit_op(OpCode::Return);
        Compiled {
            chunk: self.chunk,
            diagnostics: self.diagnostics,
            ok: !self.had_error,
        }
    }

    // ========== Token plumbing ==========

    /// Shifts `current` into `previous`. Error tokens are reported and skipped,
    /// so `current` is never an error token afterwards.
    fn advance(&mut self) {
        let next = self.scanner.scan_token();
        self.previous = std::mem::replace(&mut self.current, next);
        while self.current.kind == TokenKind::Error {
            let message = self.current.lexeme;
            self.error_at_current(message);
            self.current = self.scanner.scan_token();
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    fn match_token(&mut self, kind: TokenKind) -> bool {
        if !self.check(kind) {
            return false;
        }
        self.advance();
        true
    }

    fn consume(&mut self, kind: TokenKind, message: &str) {
        if self.check(kind) {
            self.advance();
            return;
        }
        self.error_at_current(message);
    }

    // ========== Errors ==========

    fn error_at_current(&mut self, message: &str) {
        let (line, span) = (self.current.line, self.current.span.clone());
        self.report(line, span, message);
    }

    /// Reports at `previous`, the token being compiled. Reporting these at
    /// `current` instead would move `print ;\nvar x = 1;` onto line 2.
    fn error(&mut self, message: &str) {
        let (line, span) = (self.previous.line, self.previous.span.clone());
        self.report(line, span, message);
    }

    fn report(&mut self, line: usize, span: std::ops::Range<usize>, message: &str) {
        if self.panic_mode {
            return;
        }
        self.panic_mode = true;
        self.had_error = true;
        self.diagnostics.push(Diagnostic {
            message: message.to_string(),
            line,
            span,
        });
    }

    fn synchronize(&mut self) {
        self.panic_mode = false;
        while self.current.kind != TokenKind::Eof {
            if self.previous.kind == TokenKind::Semicolon || self.current.kind.starts_statement() {
                return;
            }
            self.advance();
        }
    }

    // ========== Emission ==========

    /// Bytes are attributed to the line of the token being looked at.
    fn emit_op(&mut self, op: OpCode) {
        self.chunk.write_op(op, self.current.line);
    }

    fn emit_ops(&mut self, first: OpCode, second: OpCode) {
        self.emit_op(first);
        self.emit_op(second);
    }

    fn emit_with_operand(&mut self, op: OpCode, operand: u8) {
        self.emit_op(op);
        self.chunk.write(operand, self.current.line);
    }

    fn emit_constant(&mut self, value: Value) {
        let index = self.make_constant(value);
        self.emit_with_operand(OpCode::Constant, index);
    }

    fn make_constant(&mut self, value: Value) -> u8 {
        let index = self.chunk.add_constant(value);
        match u8::try_from(index) {
            Ok(index) => index,
            Err(_) => {
                self.error("Too many constants in one chunk.");
                0
            }
        }
    }

    fn identifier_constant(&mut self, name: &str) -> u8 {
        self.make_constant(Value::from(name))
    }

    // ========== Declarations and statements ==========

    fn declaration(&mut self) {
        if self.match_token(TokenKind::Var) {
            self.var_declaration();
        } else {
            self.statement();
        }
        if self.panic_mode {
            self.synchronize();
        }
    }

    fn var_declaration(&mut self) {
        let global = self.parse_variable("Expect variable name.");
        if self.match_token(TokenKind::Equal) {
            self.expression();
        } else {
            self.emit_op(OpCode::Nil);
        }
        self.consume(
            TokenKind::Semicolon,
            "Expect ';' after variable declaration.",
        );
        self.emit_with_operand(OpCode::DefineGlobal, global);
    }

    fn parse_variable(&mut self, message: &str) -> u8 {
        self.consume(TokenKind::Identifier, message);
        let name = self.previous.lexeme;
        self.identifier_constant(name)
    }

    fn statement(&mut self) {
        if self.match_token(TokenKind::Print) {
            self.print_statement();
        } else {
            self.expression_statement();
        }
    }

    fn print_statement(&mut self) {
        self.expression();
        self.consume(TokenKind::Semicolon, "Expect ';' after value.");
        self.emit_op(OpCode::Print);
    }

    fn expression_statement(&mut self) {
        self.expression();
        self.consume(TokenKind::Semicolon, "Expect ';' after expression.");
        self.emit_op(OpCode::Pop);
    }

    // ========== Expressions ==========

    fn expression(&mut self) {
        self.parse_precedence(Precedence::Assignment);
    }

    fn parse_precedence(&mut self, precedence: Precedence) {
        self.advance();
        let Some(prefix) = rule(self.previous.kind).prefix else {
            self.error("Expect expression.");
            return;
        };
        let can_assign = precedence <= Precedence::Assignment;
        prefix(self, can_assign);

        while precedence <= rule(self.current.kind).precedence {
            self.advance();
            let Some(infix) = rule(self.previous.kind).infix else {
                self.error("Expect expression.");
                return;
            };
            infix(self, can_assign);
        }

        if can_assign && self.match_token(TokenKind::Equal) {
            self.error("Invalid assignment target.");
        }
    }

    pub(crate) fn number(&mut self, _can_assign: bool) {
        match self.previous.lexeme.parse::<f64>() {
            Ok(n) => self.emit_constant(Value::Number(n)),
            Err(_) => self.error("Invalid number literal."),
        }
    }

    pub(crate) fn string(&mut self, _can_assign: bool) {
        let text = self.previous.lexeme.trim_matches('"');
        self.emit_constant(Value::from(text));
    }

    pub(crate) fn grouping(&mut self, _can_assign: bool) {
        self.expression();
        self.consume(TokenKind::RightParen, "Expect ')' after expression.");
    }

    pub(crate) fn unary(&mut self, _can_assign: bool) {
        let operator = self.previous.kind;
        self.parse_precedence(Precedence::Unary);
        match operator {
            TokenKind::Minus => self.emit_op(OpCode::Negate),
            TokenKind::Bang => self.emit_op(OpCode::Not),
            _ => {}
        }
    }

    pub(crate) fn binary(&mut self, _can_assign: bool) {
        let operator = self.previous.kind;
        self.parse_precedence(rule(operator).precedence.next());
        match operator {
            TokenKind::Plus => self.emit_op(OpCode::Add),
            TokenKind::Minus => self.emit_op(OpCode::Subtract),
            TokenKind::Star => self.emit_op(OpCode::Multiply),
            TokenKind::Slash => self.emit_op(OpCode::Divide),
            TokenKind::Greater => self.emit_op(OpCode::Greater),
            TokenKind::Less => self.emit_op(OpCode::Lesser),
            TokenKind::EqualEqual => self.emit_op(OpCode::Equal),
            // a >= b is !(a < b), a <= b is !(a > b)
            TokenKind::GreaterEqual => self.emit_ops(OpCode::Lesser, OpCode::Not),
            TokenKind::LessEqual => self.emit_ops(OpCode::Greater, OpCode::Not),
            TokenKind::BangEqual => self.emit_ops(OpCode::Equal, OpCode::Not),
            _ => {}
        }
    }

    pub(crate) fn literal(&mut self, _can_assign: bool) {
        match self.previous.kind {
            TokenKind::False => self.emit_op(OpCode::False),
            TokenKind::True => self.emit_op(OpCode::True),
            TokenKind::Nil => self.emit_op(OpCode::Nil),
            _ => {}
        }
    }

    pub(crate) fn variable(&mut self, can_assign: bool) {
        let name = self.previous.lexeme;
        self.named_variable(name, can_assign);
    }

    fn named_variable(&mut self, name: &str, can_assign: bool) {
        let arg = self.identifier_constant(name);
        if can_assign && self.match_token(TokenKind::Equal) {
            self.expression();
            self.emit_with_operand(OpCode::SetGlobal, arg);
        } else {
            self.emit_with_operand(OpCode::GetGlobal, arg);
        }
    }
}
