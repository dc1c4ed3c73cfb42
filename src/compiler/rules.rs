//! Pratt parse table: for every token kind, an optional prefix handler, an
//! optional infix handler and the infix binding strength.

use super::Compiler;
use crate::lexer::TokenKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    None,
    Assignment, // =
    Or,         // or
    And,        // and
    Equality,   // == !=
    Comparison, // < > <= >=
    Term,       // + -
    Factor,     // * /
    Unary,      // ! -
    Call,       // . ()
    Primary,
}

impl Precedence {
    /// One level tighter; used for the right operand of left-associative operators.
    pub fn next(self) -> Precedence {
        match self {
            Precedence::None => Precedence::Assignment,
            Precedence::Assignment => Precedence::Or,
            Precedence::Or => Precedence::And,
            Precedence::And => Precedence::Equality,
            Precedence::Equality => Precedence::Comparison,
            Precedence::Comparison => Precedence::Term,
            Precedence::Term => Precedence::Factor,
            Precedence::Factor => Precedence::Unary,
            Precedence::Unary => Precedence::Call,
            Precedence::Call | Precedence::Primary => Precedence::Primary,
        }
    }
}

/// Handler signature; the flag says whether an `=` may follow.
pub type ParseFn<'src> = fn(&mut Compiler<'src>, bool);

pub struct ParseRule<'src> {
    pub prefix: Option<ParseFn<'src>>,
    pub infix: Option<ParseFn<'src>>,
    pub precedence: Precedence,
}

impl<'src> ParseRule<'src> {
    fn new(
        prefix: Option<ParseFn<'src>>,
        infix: Option<ParseFn<'src>>,
        precedence: Precedence,
    ) -> Self {
        Self {
            prefix,
            infix,
            precedence,
        }
    }
}

pub fn rule<'src>(kind: TokenKind) -> ParseRule<'src> {
    use Precedence as P;
    use TokenKind as T;
    match kind {
        T::LeftParen => ParseRule::new(Some(Compiler::grouping), None, P::None),
        T::Minus => ParseRule::new(Some(Compiler::unary), Some(Compiler::binary), P::Term),
        T::Plus => ParseRule::new(None, Some(Compiler::binary), P::Term),
        T::Slash | T::Star => ParseRule::new(None, Some(Compiler::binary), P::Factor),
        T::Bang => ParseRule::new(Some(Compiler::unary), None, P::None),
        T::BangEqual | T::EqualEqual => {
            ParseRule::new(None, Some(Compiler::binary), P::Equality)
        }
        T::Greater | T::GreaterEqual | T::Less | T::LessEqual => {
            ParseRule::new(None, Some(Compiler::binary), P::Comparison)
        }
        T::Identifier => ParseRule::new(Some(Compiler::variable), None, P::None),
        T::String => ParseRule::new(Some(Compiler::string), None, P::None),
        T::Number => ParseRule::new(Some(Compiler::number), None, P::None),
        T::False | T::True | T::Nil => ParseRule::new(Some(Compiler::literal), None, P::None),
        _ => ParseRule::new(None, None, P::None),
    }
}
