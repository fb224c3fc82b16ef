//! Syntax tree for the Python subset.
//!
//! Both engines walk this tree by exhaustive matching. Anything the parser
//! does not model is kept as [`Statement::Other`] with its span so that it
//! can be skipped without failing the parse.

use crate::span::{Span, Spanned};

/// A parsed source file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Module<'src> {
    pub statements: Vec<Statement<'src>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement<'src> {
    ClassDef(ClassDef<'src>),
    FunctionDef(FunctionDef<'src>),
    Assign(Assign<'src>),
    Expr(Spanned<Expr<'src>>),
    For(ForLoop<'src>),
    With(WithBlock<'src>),
    /// A compound statement not modeled in detail, such as `if` or `try`.
    Block(Block<'src>),
    /// A line outside the supported grammar.
    Other(Span),
}

impl Statement<'_> {
    /// Returns the source span covered by this statement.
    pub fn span(&self) -> Span {
        match self {
            Statement::ClassDef(class) => class.span,
            Statement::FunctionDef(function) => function.span,
            Statement::Assign(assign) => assign.span,
            Statement::Expr(expr) => expr.span(),
            Statement::For(for_loop) => for_loop.span,
            Statement::With(with) => with.span,
            Statement::Block(block) => block.span,
            Statement::Other(span) => *span,
        }
    }
}

/// `class Name(bases...): body`
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDef<'src> {
    pub name: Spanned<&'src str>,
    /// Positional base expressions; keyword arguments like `metaclass=` are dropped.
    pub bases: Vec<Spanned<Expr<'src>>>,
    pub body: Vec<Statement<'src>>,
    pub span: Span,
}

/// `def name(...): body`, also `async def`.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef<'src> {
    pub name: Spanned<&'src str>,
    pub is_async: bool,
    pub body: Vec<Statement<'src>>,
    pub span: Span,
}

/// `t1 = t2 = value`
#[derive(Debug, Clone, PartialEq)]
pub struct Assign<'src> {
    pub targets: Vec<Spanned<Expr<'src>>>,
    pub value: Spanned<Expr<'src>>,
    pub span: Span,
}

/// `for target in iter: body`
#[derive(Debug, Clone, PartialEq)]
pub struct ForLoop<'src> {
    pub target: Spanned<Expr<'src>>,
    pub iter: Spanned<Expr<'src>>,
    pub body: Vec<Statement<'src>>,
    pub span: Span,
}

/// `with a(...) as x, b(...): body`
#[derive(Debug, Clone, PartialEq)]
pub struct WithBlock<'src> {
    pub items: Vec<WithItem<'src>>,
    pub body: Vec<Statement<'src>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WithItem<'src> {
    pub context: Spanned<Expr<'src>>,
    pub alias: Option<Spanned<&'src str>>,
}

/// A compound statement introduced by `keyword ... :`.
#[derive(Debug, Clone, PartialEq)]
pub struct Block<'src> {
    pub keyword: Spanned<&'src str>,
    pub body: Vec<Statement<'src>>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    /// `>>`
    RightShift,
    /// `<<`
    LeftShift,
    /// `-`
    Subtract,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr<'src> {
    Name(&'src str),
    Attribute {
        value: Box<Spanned<Expr<'src>>>,
        attr: Spanned<&'src str>,
    },
    Call(Call<'src>),
    /// A string literal; adjacent literals are concatenated.
    Str(String),
    Number(&'src str),
    List(Vec<Spanned<Expr<'src>>>),
    Tuple(Vec<Spanned<Expr<'src>>>),
    Dict(Vec<(Spanned<Expr<'src>>, Spanned<Expr<'src>>)>),
    Subscript {
        value: Box<Spanned<Expr<'src>>>,
        index: Box<Spanned<Expr<'src>>>,
    },
    BinOp {
        left: Box<Spanned<Expr<'src>>>,
        op: BinOp,
        right: Box<Spanned<Expr<'src>>>,
    },
}

impl<'src> Expr<'src> {
    /// Returns the identifier if this is a plain name.
    pub fn as_name(&self) -> Option<&'src str> {
        match self {
            Expr::Name(name) => Some(name),
            _ => None,
        }
    }

    /// Returns the literal text if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Expr::Str(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the call if this is a call expression.
    pub fn as_call(&self) -> Option<&Call<'src>> {
        match self {
            Expr::Call(call) => Some(call),
            _ => None,
        }
    }
}

/// `func(args..., name=value...)`
#[derive(Debug, Clone, PartialEq)]
pub struct Call<'src> {
    pub func: Box<Spanned<Expr<'src>>>,
    pub args: Vec<Spanned<Expr<'src>>>,
    pub keywords: Vec<Keyword<'src>>,
}

impl<'src> Call<'src> {
    /// The called name: `Edge` for both `Edge(...)` and `diagrams.Edge(...)`.
    pub fn callee(&self) -> Option<&'src str> {
        match self.func.inner() {
            Expr::Name(name) => Some(name),
            Expr::Attribute { attr, .. } => Some(*attr.inner()),
            _ => None,
        }
    }

    /// Looks up a keyword argument by name.
    pub fn keyword(&self, name: &str) -> Option<&Spanned<Expr<'src>>> {
        self.keywords
            .iter()
            .find(|keyword| *keyword.name.inner() == name)
            .map(|keyword| &keyword.value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Keyword<'src> {
    pub name: Spanned<&'src str>,
    pub value: Spanned<Expr<'src>>,
}
