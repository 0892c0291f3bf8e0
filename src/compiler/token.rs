use std::fmt::{self, Display, Formatter};

use crate::common::span::Span;

/// The different kinds of token the lexer will output.
/// Spellings live on the `Token` itself so that diagnostics can
/// quote exactly what was written, including for literals whose
/// value the later stages re-parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, proptest_derive::Arbitrary)]
pub enum TokenKind {
    // Keywords
    Boolean,
    Break,
    Continue,
    Else,
    Float,
    For,
    If,
    Int,
    Return,
    Void,
    While,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Not,
    NotEq,
    Eq,
    EqEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    AndAnd,
    OrOr,

    // Separators
    OpenParen,
    CloseParen,
    OpenCurly,
    CloseCurly,
    OpenBracket,
    CloseBracket,
    Semicolon,
    Comma,

    // Literals and names
    IntLit,
    FloatLit,
    BoolLit,
    StrLit,
    Ident,

    // A lexically malformed token; the lexer has already
    // reported it where recoverable.
    Error,

    // End of source
    End,
}

impl TokenKind {
    /// The fixed spelling of a keyword, operator, or separator,
    /// used when a parse error wants to name the token it
    /// expected. Kinds without a fixed spelling answer a
    /// placeholder.
    pub fn spelling(&self) -> &'static str {
        match self {
            TokenKind::Boolean => "boolean",
            TokenKind::Break => "break",
            TokenKind::Continue => "continue",
            TokenKind::Else => "else",
            TokenKind::Float => "float",
            TokenKind::For => "for",
            TokenKind::If => "if",
            TokenKind::Int => "int",
            TokenKind::Return => "return",
            TokenKind::Void => "void",
            TokenKind::While => "while",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Not => "!",
            TokenKind::NotEq => "!=",
            TokenKind::Eq => "=",
            TokenKind::EqEq => "==",
            TokenKind::Lt => "<",
            TokenKind::LtEq => "<=",
            TokenKind::Gt => ">",
            TokenKind::GtEq => ">=",
            TokenKind::AndAnd => "&&",
            TokenKind::OrOr => "||",
            TokenKind::OpenParen => "(",
            TokenKind::CloseParen => ")",
            TokenKind::OpenCurly => "{",
            TokenKind::CloseCurly => "}",
            TokenKind::OpenBracket => "[",
            TokenKind::CloseBracket => "]",
            TokenKind::Semicolon => ";",
            TokenKind::Comma => ",",
            TokenKind::IntLit => "<int-literal>",
            TokenKind::FloatLit => "<float-literal>",
            TokenKind::BoolLit => "<boolean-literal>",
            TokenKind::StrLit => "<string-literal>",
            TokenKind::Ident => "<identifier>",
            TokenKind::Error => "<error>",
            TokenKind::End => "$",
        }
    }

    /// Converts an identifier spelling into its keyword kind,
    /// if it is one. `true`/`false` are not keywords; the lexer
    /// recognizes them by the longest-match rule instead.
    pub fn keyword(spelling: &str) -> Option<TokenKind> {
        let kind = match spelling {
            "boolean" => TokenKind::Boolean,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "else" => TokenKind::Else,
            "float" => TokenKind::Float,
            "for" => TokenKind::For,
            "if" => TokenKind::If,
            "int" => TokenKind::Int,
            "return" => TokenKind::Return,
            "void" => TokenKind::Void,
            "while" => TokenKind::While,
            _ => return None,
        };
        Some(kind)
    }

    /// Whether this kind opens a type in a declaration.
    pub fn is_type(&self) -> bool {
        matches!(
            self,
            TokenKind::Void | TokenKind::Boolean | TokenKind::Int | TokenKind::Float
        )
    }
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.spelling())
    }
}

/// One token: its kind, the text it was spelled with, and the
/// source range it covers (end inclusive). Produced one at a
/// time by `Lexer::next_token`; the stream ends with a single
/// `TokenKind::End`.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub spelling: String,
    pub span: Span,
}

impl Token {
    /// Builds a token, converting identifier spellings that are
    /// reserved words into their keyword kinds.
    pub fn new(kind: TokenKind, spelling: &str, span: Span) -> Token {
        let kind = match kind {
            TokenKind::Ident => TokenKind::keyword(spelling).unwrap_or(TokenKind::Ident),
            other => other,
        };
        Token {
            kind,
            spelling: spelling.to_string(),
            span,
        }
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind, self.spelling)
    }
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn keywords_fold_from_idents() {
        let token = Token::new(TokenKind::Ident, "while", Span::dummy());
        assert_eq!(token.kind, TokenKind::While);
        let token = Token::new(TokenKind::Ident, "whilst", Span::dummy());
        assert_eq!(token.kind, TokenKind::Ident);
    }

    #[test]
    fn type_starters() {
        assert!(TokenKind::Int.is_type());
        assert!(TokenKind::Void.is_type());
        assert!(!TokenKind::If.is_type());
    }

    proptest! {
        #[test]
        fn display_never_panics(kind: TokenKind) {
            format!("{}", kind);
        }
    }
}
