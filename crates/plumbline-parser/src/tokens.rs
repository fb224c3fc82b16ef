//! Token definitions for the Python subset.

use std::fmt;

use crate::span::Span;

/// Tokens produced by the lexer.
///
/// Layout is explicit: the lexer emits [`Token::Newline`] at the end of each
/// logical line and [`Token::Indent`] / [`Token::Dedent`] when the
/// indentation level changes. Whitespace and comments are dropped before
/// the parser sees the stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'src> {
    // Keywords
    Class,
    Def,
    For,
    In,
    With,
    As,
    Async,

    // Literals
    Name(&'src str),
    StringLiteral(String),
    Number(&'src str),

    // Operators
    RightShift, // >>
    LeftShift,  // <<
    Minus,      // -
    Equals,     // =
    Arrow,      // ->
    Star,       // *
    DoubleStar, // **
    /// Any other operator, such as `+`, `==` or `+=`.
    Operator(&'src str),

    // Punctuation
    Colon,        // :
    Comma,        // ,
    Dot,          // .
    Semicolon,    // ;
    At,           // @
    LeftParen,    // (
    RightParen,   // )
    LeftBracket,  // [
    RightBracket, // ]
    LeftBrace,    // {
    RightBrace,   // }

    // Trivia, filtered by the lexer
    Comment(&'src str),
    Whitespace,
    LineContinuation,

    // Layout
    Newline,
    Indent,
    Dedent,
}

impl Token<'_> {
    /// Returns `true` for tokens that open a bracket pair.
    pub fn is_opening_bracket(&self) -> bool {
        matches!(self, Token::LeftParen | Token::LeftBracket | Token::LeftBrace)
    }

    /// Returns `true` for tokens that close a bracket pair.
    pub fn is_closing_bracket(&self) -> bool {
        matches!(
            self,
            Token::RightParen | Token::RightBracket | Token::RightBrace
        )
    }
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Class => write!(f, "class"),
            Token::Def => write!(f, "def"),
            Token::For => write!(f, "for"),
            Token::In => write!(f, "in"),
            Token::With => write!(f, "with"),
            Token::As => write!(f, "as"),
            Token::Async => write!(f, "async"),
            Token::Name(name) => write!(f, "{name}"),
            Token::StringLiteral(s) => write!(f, "{s:?}"),
            Token::Number(n) => write!(f, "{n}"),
            Token::RightShift => write!(f, ">>"),
            Token::LeftShift => write!(f, "<<"),
            Token::Minus => write!(f, "-"),
            Token::Equals => write!(f, "="),
            Token::Arrow => write!(f, "->"),
            Token::Star => write!(f, "*"),
            Token::DoubleStar => write!(f, "**"),
            Token::Operator(op) => write!(f, "{op}"),
            Token::Colon => write!(f, ":"),
            Token::Comma => write!(f, ","),
            Token::Dot => write!(f, "."),
            Token::Semicolon => write!(f, ";"),
            Token::At => write!(f, "@"),
            Token::LeftParen => write!(f, "("),
            Token::RightParen => write!(f, ")"),
            Token::LeftBracket => write!(f, "["),
            Token::RightBracket => write!(f, "]"),
            Token::LeftBrace => write!(f, "{{"),
            Token::RightBrace => write!(f, "}}"),
            Token::Comment(text) => write!(f, "#{text}"),
            Token::Whitespace => write!(f, "whitespace"),
            Token::LineContinuation => write!(f, "\\"),
            Token::Newline => write!(f, "newline"),
            Token::Indent => write!(f, "indent"),
            Token::Dedent => write!(f, "dedent"),
        }
    }
}

/// A token with position information for winnow integration
#[derive(Debug, Clone, PartialEq)]
pub struct PositionedToken<'src> {
    pub token: Token<'src>,
    pub span: Span,
}

impl<'src> PositionedToken<'src> {
    pub fn new(token: Token<'src>, span: Span) -> Self {
        Self { token, span }
    }
}

impl<'src> std::ops::Deref for PositionedToken<'src> {
    type Target = Token<'src>;

    fn deref(&self) -> &Self::Target {
        &self.token
    }
}
