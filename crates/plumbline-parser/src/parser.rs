//! Parser for Python-subset tokens.
//!
//! This module transforms a token stream from the [`lexer`](super::lexer)
//! into the syntax tree defined in [`syntax`](super::syntax). The public
//! entry point is [`build_module`].
//!
//! The grammar is deliberately forgiving. Class and function headers are
//! skimmed rather than parsed, compound statements other than `for` and
//! `with` keep only their body, and any line that does not fit the
//! expression grammar becomes [`Statement::Other`]. Only broken block
//! structure is a hard error.

use winnow::{
    Parser as _,
    combinator::{alt, opt, preceded, repeat, separated},
    error::{ContextError, ErrMode},
    stream::{Stream, TokenSlice},
    token::any,
};

use crate::{
    error::{Diagnostic, ErrorCode},
    span::{Span, Spanned},
    syntax::{
        Assign, BinOp, Block, Call, ClassDef, Expr, ForLoop, FunctionDef, Keyword, Module,
        Statement, WithBlock, WithItem,
    },
    tokens::{PositionedToken, Token},
};

/// Context type for parser errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Context {
    /// Description of what is currently being parsed
    Label(&'static str),
    /// Remaining token count (`eof_offset()`) at error start position
    ///
    /// Used to calculate start_offset as: `tokens.len() - start_offset_value`
    StartOffset(usize),
}

/// Winnow token slice over positioned tokens borrowed for `'t` from source `'src`.
type Input<'t, 'src> = TokenSlice<'t, PositionedToken<'src>>;
type IResult<O> = std::result::Result<O, ErrMode<ContextError<Context>>>;

/// Soft keywords that introduce compound statements kept only as blocks.
const COMPOUND_KEYWORDS: [&str; 9] = [
    "if", "elif", "else", "while", "try", "except", "finally", "match", "case",
];

fn cut_err<'t, 'src, O, F>(input: &mut Input<'t, 'src>, f: F) -> IResult<O>
where
    F: FnOnce(&mut Input<'t, 'src>) -> IResult<O>,
{
    let start_remaining = input.eof_offset();

    match f(input) {
        Ok(o) => Ok(o),
        Err(ErrMode::Backtrack(mut e)) | Err(ErrMode::Cut(mut e)) => {
            e.push(Context::StartOffset(start_remaining));
            Err(ErrMode::Cut(e))
        }
        Err(e) => Err(e),
    }
}

/// Helper to create a Cut error with StartOffset context
fn cut_error_with_offset(input: &Input<'_, '_>) -> ErrMode<ContextError<Context>> {
    let mut e = ContextError::new();
    e.push(Context::StartOffset(input.eof_offset()));
    ErrMode::Cut(e)
}

fn backtrack_error() -> ErrMode<ContextError<Context>> {
    ErrMode::Backtrack(ContextError::new())
}

/// Span covering a statement header and the last statement of its body.
fn block_span(start: Span, body: &[Statement<'_>]) -> Span {
    body.last().map_or(start, |last| start.union(last.span()))
}

fn items_span<T>(items: &[Spanned<T>]) -> Span {
    items
        .iter()
        .map(Spanned::span)
        .reduce(|a, b| a.union(b))
        .unwrap_or_default()
}

/// Take the next token, whatever it is.
fn next_token<'t, 'src>(input: &mut Input<'t, 'src>) -> IResult<&'t PositionedToken<'src>> {
    any.parse_next(input)
}

/// Parse a single token equal to `expected`, returning its span.
fn punct<'t, 'src: 't>(expected: Token<'static>) -> impl FnMut(&mut Input<'t, 'src>) -> IResult<Span> {
    move |input: &mut Input<'t, 'src>| {
        any.verify_map(|token: &PositionedToken<'_>| {
            (token.token == expected).then_some(token.span)
        })
        .parse_next(input)
    }
}

/// Parse an identifier with span preservation
fn identifier<'t, 'src>(input: &mut Input<'t, 'src>) -> IResult<Spanned<&'src str>> {
    any.verify_map(|token: &PositionedToken<'src>| match token.token {
        Token::Name(name) => Some(Spanned::new(name, token.span)),
        _ => None,
    })
    .context(Context::Label("identifier"))
    .parse_next(input)
}

/// Parse string literal
fn string_literal<'t, 'src>(input: &mut Input<'t, 'src>) -> IResult<Spanned<String>> {
    any.verify_map(|token: &PositionedToken<'_>| match &token.token {
        Token::StringLiteral(s) => Some(Spanned::new(s.clone(), token.span)),
        _ => None,
    })
    .context(Context::Label("string literal"))
    .parse_next(input)
}

/// Parse a comma separated list with an optional trailing comma.
///
/// Returns the items and whether the list ended with a comma.
fn comma_list<'t, 'src, O>(
    input: &mut Input<'t, 'src>,
    item: fn(&mut Input<'t, 'src>) -> IResult<O>,
) -> IResult<(Vec<O>, bool)> {
    let mut items = Vec::new();
    let mut trailing_comma = false;
    while let Some(value) = opt(item).parse_next(input)? {
        items.push(value);
        trailing_comma = opt(punct(Token::Comma)).parse_next(input)?.is_some();
        if !trailing_comma {
            break;
        }
    }
    Ok((items, trailing_comma))
}

/// Skip the rest of a statement header up to its top-level `:`.
///
/// Used for parameter lists, annotations and conditions, none of which
/// matter to the model builders. Fails at the end of the line.
fn skip_header<'t, 'src>(input: &mut Input<'t, 'src>) -> IResult<()> {
    let mut depth = 0usize;
    loop {
        let checkpoint = input.checkpoint();
        let token = next_token(input)?;
        match &token.token {
            Token::Colon if depth == 0 => {
                input.reset(&checkpoint);
                return Ok(());
            }
            Token::Newline | Token::Indent | Token::Dedent => return Err(backtrack_error()),
            t if t.is_opening_bracket() => depth += 1,
            t if t.is_closing_bracket() => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

fn binary<'src>(left: Spanned<Expr<'src>>, op: BinOp, right: Spanned<Expr<'src>>) -> Spanned<Expr<'src>> {
    let span = left.span().union(right.span());
    Spanned::new(
        Expr::BinOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        },
        span,
    )
}

fn shift_operator<'t, 'src>(input: &mut Input<'t, 'src>) -> IResult<BinOp> {
    any.verify_map(|token: &PositionedToken<'_>| match token.token {
        Token::RightShift => Some(BinOp::RightShift),
        Token::LeftShift => Some(BinOp::LeftShift),
        _ => None,
    })
    .parse_next(input)
}

/// Parse an expression: left-associative `>>` / `<<` chains.
fn expression<'t, 'src>(input: &mut Input<'t, 'src>) -> IResult<Spanned<Expr<'src>>> {
    let mut left = arith_expr(input)?;
    while let Some(op) = opt(shift_operator).parse_next(input)? {
        let right = arith_expr(input)?;
        left = binary(left, op, right);
    }
    Ok(left)
}

/// `a - b`, binding tighter than the shifts.
fn arith_expr<'t, 'src>(input: &mut Input<'t, 'src>) -> IResult<Spanned<Expr<'src>>> {
    let mut left = postfix_expr(input)?;
    while opt(punct(Token::Minus)).parse_next(input)?.is_some() {
        let right = postfix_expr(input)?;
        left = binary(left, BinOp::Subtract, right);
    }
    Ok(left)
}

/// Parse an expression list; more than one item (or a trailing comma) is a tuple.
fn expression_list<'t, 'src>(input: &mut Input<'t, 'src>) -> IResult<Spanned<Expr<'src>>> {
    let (mut items, trailing_comma) = comma_list(input, expression)?;
    match (items.len(), trailing_comma) {
        (0, _) => Err(backtrack_error()),
        (1, false) => Ok(items.remove(0)),
        _ => {
            let span = items_span(&items);
            Ok(Spanned::new(Expr::Tuple(items), span))
        }
    }
}

/// Attribute access, calls and subscripts.
fn postfix_expr<'t, 'src>(input: &mut Input<'t, 'src>) -> IResult<Spanned<Expr<'src>>> {
    let mut expr = atom(input)?;
    loop {
        if let Some(attr) = opt(preceded(punct(Token::Dot), identifier)).parse_next(input)? {
            let span = expr.span().union(attr.span());
            expr = Spanned::new(
                Expr::Attribute {
                    value: Box::new(expr),
                    attr,
                },
                span,
            );
        } else if let Some(arguments) = opt(call_arguments).parse_next(input)? {
            let span = expr.span().union(arguments.span);
            expr = Spanned::new(
                Expr::Call(Call {
                    func: Box::new(expr),
                    args: arguments.positional,
                    keywords: arguments.keywords,
                }),
                span,
            );
        } else if let Some((index, close)) = opt(subscript).parse_next(input)? {
            let span = expr.span().union(close);
            expr = Spanned::new(
                Expr::Subscript {
                    value: Box::new(expr),
                    index: Box::new(index),
                },
                span,
            );
        } else {
            break;
        }
    }
    Ok(expr)
}

/// A single call argument.
enum Argument<'src> {
    Positional(Spanned<Expr<'src>>),
    Keyword(Keyword<'src>),
}

/// Parsed argument list of a call or class header.
struct Arguments<'src> {
    positional: Vec<Spanned<Expr<'src>>>,
    keywords: Vec<Keyword<'src>>,
    span: Span,
}

fn keyword_argument<'t, 'src>(input: &mut Input<'t, 'src>) -> IResult<Keyword<'src>> {
    let name = identifier(input)?;
    punct(Token::Equals).parse_next(input)?;
    let value = expression(input)?;
    Ok(Keyword { name, value })
}

fn argument<'t, 'src>(input: &mut Input<'t, 'src>) -> IResult<Argument<'src>> {
    alt((
        keyword_argument.map(Argument::Keyword),
        expression.map(Argument::Positional),
    ))
    .parse_next(input)
}

/// Parse `( arguments )`
fn call_arguments<'t, 'src>(input: &mut Input<'t, 'src>) -> IResult<Arguments<'src>> {
    let open = punct(Token::LeftParen).parse_next(input)?;
    let (items, _) = comma_list(input, argument)?;
    let close = punct(Token::RightParen)
        .context(Context::Label("`)`"))
        .parse_next(input)?;

    let mut arguments = Arguments {
        positional: Vec::new(),
        keywords: Vec::new(),
        span: open.union(close),
    };
    for item in items {
        match item {
            Argument::Positional(expr) => arguments.positional.push(expr),
            Argument::Keyword(keyword) => arguments.keywords.push(keyword),
        }
    }
    Ok(arguments)
}

/// Parse `[ index ]`, returning the index and the closing bracket span.
fn subscript<'t, 'src>(input: &mut Input<'t, 'src>) -> IResult<(Spanned<Expr<'src>>, Span)> {
    punct(Token::LeftBracket).parse_next(input)?;
    let index = expression_list(input)?;
    let close = punct(Token::RightBracket).parse_next(input)?;
    Ok((index, close))
}

fn name_atom<'t, 'src>(input: &mut Input<'t, 'src>) -> IResult<Spanned<Expr<'src>>> {
    identifier
        .map(|name: Spanned<&'src str>| name.map(Expr::Name))
        .parse_next(input)
}

/// Adjacent string literals are concatenated, as in Python.
fn string_atom<'t, 'src>(input: &mut Input<'t, 'src>) -> IResult<Spanned<Expr<'src>>> {
    let parts: Vec<Spanned<String>> = repeat(1.., string_literal).parse_next(input)?;
    let span = items_span(&parts);
    let value: String = parts.into_iter().map(Spanned::into_inner).collect();
    Ok(Spanned::new(Expr::Str(value), span))
}

fn number_atom<'t, 'src>(input: &mut Input<'t, 'src>) -> IResult<Spanned<Expr<'src>>> {
    any.verify_map(|token: &PositionedToken<'src>| match token.token {
        Token::Number(number) => Some(Spanned::new(Expr::Number(number), token.span)),
        _ => None,
    })
    .parse_next(input)
}

/// Parse `[e1, e2, ...]`
fn list_atom<'t, 'src>(input: &mut Input<'t, 'src>) -> IResult<Spanned<Expr<'src>>> {
    let open = punct(Token::LeftBracket).parse_next(input)?;
    let (items, _) = comma_list(input, expression)?;
    let close = punct(Token::RightBracket).parse_next(input)?;
    Ok(Spanned::new(Expr::List(items), open.union(close)))
}

/// Parse a parenthesized expression or a tuple.
fn paren_atom<'t, 'src>(input: &mut Input<'t, 'src>) -> IResult<Spanned<Expr<'src>>> {
    let open = punct(Token::LeftParen).parse_next(input)?;
    let (mut items, trailing_comma) = comma_list(input, expression)?;
    let close = punct(Token::RightParen).parse_next(input)?;

    let span = open.union(close);
    if items.len() == 1 && !trailing_comma {
        return Ok(Spanned::new(items.remove(0).into_inner(), span));
    }
    Ok(Spanned::new(Expr::Tuple(items), span))
}

fn dict_entry<'t, 'src>(
    input: &mut Input<'t, 'src>,
) -> IResult<(Spanned<Expr<'src>>, Spanned<Expr<'src>>)> {
    let key = expression(input)?;
    punct(Token::Colon).parse_next(input)?;
    let value = expression(input)?;
    Ok((key, value))
}

/// Parse `{k: v, ...}`
fn dict_atom<'t, 'src>(input: &mut Input<'t, 'src>) -> IResult<Spanned<Expr<'src>>> {
    let open = punct(Token::LeftBrace).parse_next(input)?;
    let (entries, _) = comma_list(input, dict_entry)?;
    let close = punct(Token::RightBrace).parse_next(input)?;
    Ok(Spanned::new(Expr::Dict(entries), open.union(close)))
}

fn atom<'t, 'src>(input: &mut Input<'t, 'src>) -> IResult<Spanned<Expr<'src>>> {
    alt((
        name_atom,
        string_atom,
        number_atom,
        list_atom,
        paren_atom,
        dict_atom,
    ))
    .context(Context::Label("expression"))
    .parse_next(input)
}

// ---------------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------------

/// `targets = value`, possibly chained: `a = b = value`.
fn assignment<'t, 'src>(input: &mut Input<'t, 'src>) -> IResult<Statement<'src>> {
    let first = expression_list(input)?;
    punct(Token::Equals).parse_next(input)?;
    let mut value = expression_list(input)?;

    let start = first.span();
    let mut targets = vec![first];
    while opt(punct(Token::Equals)).parse_next(input)?.is_some() {
        targets.push(value);
        value = expression_list(input)?;
    }

    Ok(Statement::Assign(Assign {
        span: start.union(value.span()),
        targets,
        value,
    }))
}

fn small_statement<'t, 'src>(input: &mut Input<'t, 'src>) -> IResult<Statement<'src>> {
    alt((assignment, expression_list.map(Statement::Expr))).parse_next(input)
}

/// Parse `stmt; stmt NEWLINE`
fn small_statements<'t, 'src>(input: &mut Input<'t, 'src>) -> IResult<Vec<Statement<'src>>> {
    let statements: Vec<Statement<'src>> =
        separated(1.., small_statement, punct(Token::Semicolon)).parse_next(input)?;
    opt(punct(Token::Semicolon)).parse_next(input)?;
    punct(Token::Newline).parse_next(input)?;
    Ok(statements)
}

/// Any other logical line, kept only as a span.
fn other_line<'t, 'src>(input: &mut Input<'t, 'src>) -> IResult<Vec<Statement<'src>>> {
    let spans: Vec<Span> = repeat(
        1..,
        any.verify_map(|token: &PositionedToken<'_>| {
            (!matches!(
                token.token,
                Token::Newline | Token::Indent | Token::Dedent
            ))
            .then_some(token.span)
        }),
    )
    .parse_next(input)?;
    punct(Token::Newline).parse_next(input)?;

    let span = spans
        .into_iter()
        .reduce(|a, b| a.union(b))
        .unwrap_or_default();
    Ok(vec![Statement::Other(span)])
}

fn simple_line<'t, 'src>(input: &mut Input<'t, 'src>) -> IResult<Vec<Statement<'src>>> {
    alt((small_statements, other_line)).parse_next(input)
}

/// Parse `NEWLINE INDENT statements DEDENT`
fn indented_block<'t, 'src>(input: &mut Input<'t, 'src>) -> IResult<Vec<Statement<'src>>> {
    punct(Token::Newline).parse_next(input)?;
    punct(Token::Indent)
        .context(Context::Label("indented block"))
        .parse_next(input)?;
    let body = statements(input)?;
    punct(Token::Dedent)
        .context(Context::Label("end of block"))
        .parse_next(input)?;
    Ok(body)
}

/// The body of a compound statement: an indented block or the rest of the line.
fn suite<'t, 'src>(input: &mut Input<'t, 'src>) -> IResult<Vec<Statement<'src>>> {
    alt((indented_block, simple_line)).parse_next(input)
}

/// Parse the `:` ending a header.
fn header_colon<'t, 'src>(input: &mut Input<'t, 'src>) -> IResult<Span> {
    punct(Token::Colon)
        .context(Context::Label("`:`"))
        .parse_next(input)
}

/// Parse `class Name(bases): body`
fn class_def<'t, 'src>(input: &mut Input<'t, 'src>) -> IResult<Statement<'src>> {
    let start = punct(Token::Class).parse_next(input)?;

    cut_err(input, |input| {
        let name = identifier(input)?;
        let bases = opt(call_arguments)
            .parse_next(input)?
            .map(|arguments| arguments.positional)
            .unwrap_or_default();
        // Anything else before the colon (e.g. `*mixins`) is skipped.
        skip_header(input)?;
        header_colon(input)?;
        let body = suite(input)?;

        Ok(Statement::ClassDef(ClassDef {
            span: block_span(start, &body),
            name,
            bases,
            body,
        }))
    })
}

/// Parse `[async] def name(...) [-> T]: body`
fn function_def<'t, 'src>(input: &mut Input<'t, 'src>) -> IResult<Statement<'src>> {
    let async_span = opt(punct(Token::Async)).parse_next(input)?;
    let def_span = punct(Token::Def).parse_next(input)?;
    let start = async_span.unwrap_or(def_span);

    cut_err(input, |input| {
        let name = identifier(input)?;
        skip_header(input)?;
        header_colon(input)?;
        let body = suite(input)?;

        Ok(Statement::FunctionDef(FunctionDef {
            span: block_span(start, &body),
            name,
            is_async: async_span.is_some(),
            body,
        }))
    })
}

/// Parse `for target in iter: body`
///
/// Headers outside the expression grammar fall through to [`compound_block`].
fn for_stmt<'t, 'src>(input: &mut Input<'t, 'src>) -> IResult<Statement<'src>> {
    let async_span = opt(punct(Token::Async)).parse_next(input)?;
    let for_span = punct(Token::For).parse_next(input)?;
    let start = async_span.unwrap_or(for_span);

    let target = expression_list(input)?;
    punct(Token::In).parse_next(input)?;
    let iter = expression_list(input)?;
    header_colon(input)?;
    let body = cut_err(input, suite)?;

    Ok(Statement::For(ForLoop {
        span: block_span(start, &body),
        target,
        iter,
        body,
    }))
}

fn with_item<'t, 'src>(input: &mut Input<'t, 'src>) -> IResult<WithItem<'src>> {
    let context = expression(input)?;
    let alias = opt(preceded(punct(Token::As), identifier)).parse_next(input)?;
    Ok(WithItem { context, alias })
}

/// Parse `with item [as name], ...: body`
fn with_stmt<'t, 'src>(input: &mut Input<'t, 'src>) -> IResult<Statement<'src>> {
    let async_span = opt(punct(Token::Async)).parse_next(input)?;
    let with_span = punct(Token::With).parse_next(input)?;
    let start = async_span.unwrap_or(with_span);

    let items: Vec<WithItem<'src>> =
        separated(1.., with_item, punct(Token::Comma)).parse_next(input)?;
    header_colon(input)?;
    let body = cut_err(input, suite)?;

    Ok(Statement::With(WithBlock {
        span: block_span(start, &body),
        items,
        body,
    }))
}

fn compound_keyword<'t, 'src>(input: &mut Input<'t, 'src>) -> IResult<Spanned<&'src str>> {
    any.verify_map(|token: &PositionedToken<'src>| {
        let keyword = match token.token {
            Token::For => "for",
            Token::With => "with",
            Token::Async => "async",
            Token::Name(name) if COMPOUND_KEYWORDS.contains(&name) => name,
            _ => return None,
        };
        Some(Spanned::new(keyword, token.span))
    })
    .parse_next(input)
}

/// Parse any other `keyword ...: body` statement, keeping only the body.
fn compound_block<'t, 'src>(input: &mut Input<'t, 'src>) -> IResult<Statement<'src>> {
    let keyword = compound_keyword(input)?;
    skip_header(input)?;
    header_colon(input)?;
    let body = cut_err(input, suite)?;

    Ok(Statement::Block(Block {
        span: block_span(keyword.span(), &body),
        keyword,
        body,
    }))
}

fn statement<'t, 'src>(input: &mut Input<'t, 'src>) -> IResult<Vec<Statement<'src>>> {
    alt((
        class_def.map(|s| vec![s]),
        function_def.map(|s| vec![s]),
        for_stmt.map(|s| vec![s]),
        with_stmt.map(|s| vec![s]),
        compound_block.map(|s| vec![s]),
        simple_line,
    ))
    .parse_next(input)
}

fn statements<'t, 'src>(input: &mut Input<'t, 'src>) -> IResult<Vec<Statement<'src>>> {
    let lines: Vec<Vec<Statement<'src>>> = repeat(0.., statement).parse_next(input)?;
    Ok(lines.into_iter().flatten().collect())
}

/// Parse a complete module
fn module<'t, 'src>(input: &mut Input<'t, 'src>) -> IResult<Module<'src>> {
    let statements = statements(input)?;

    // Every token must belong to a statement; a stray indent ends up here.
    if !input.is_empty() {
        return Err(cut_error_with_offset(input));
    }

    Ok(Module { statements })
}

/// Union of the spans of the layout-free tokens in `tokens`.
fn meaningful_span(tokens: &[PositionedToken<'_>]) -> Span {
    let is_layout = |t: &&PositionedToken<'_>| {
        matches!(t.token, Token::Newline | Token::Indent | Token::Dedent)
    };
    let first = tokens.iter().find(|t| !is_layout(t)).or(tokens.first());
    let last = tokens.iter().rev().find(|t| !is_layout(t)).or(tokens.last());
    match (first, last) {
        (Some(first), Some(last)) => first.span.union(last.span),
        _ => Span::default(),
    }
}

/// Utility function to convert winnow errors to our custom error format
///
/// Extracts position information from error context (StartOffset) and calculates
/// precise error spans using the token array.
fn convert_error(
    error: ErrMode<ContextError<Context>>,
    tokens: &[PositionedToken<'_>],
    current_remaining: usize,
) -> Diagnostic {
    let start_remaining = match &error {
        ErrMode::Backtrack(e) | ErrMode::Cut(e) => e.context().find_map(|ctx| match ctx {
            Context::StartOffset(n) => Some(*n),
            _ => None,
        }),
        _ => None,
    };

    let end_offset = tokens.len().saturating_sub(current_remaining);
    let start_offset = start_remaining.map_or(0, |r| tokens.len().saturating_sub(r));

    match error {
        ErrMode::Backtrack(e) | ErrMode::Cut(e) => {
            let contexts: Vec<String> = e
                .context()
                .filter_map(|ctx| match ctx {
                    Context::Label(label) => Some(format!("expected {label}")),
                    _ => None,
                })
                .collect();

            let message = if contexts.is_empty() {
                "unexpected token or end of input".to_string()
            } else {
                contexts.join(" → ")
            };

            // The failing token itself if there is one, else what the parser consumed.
            let error_span = match tokens.get(end_offset) {
                Some(token) if !matches!(token.token, Token::Newline | Token::Dedent) => {
                    token.span
                }
                _ if start_offset < end_offset => meaningful_span(&tokens[start_offset..end_offset]),
                Some(token) => token.span,
                None => meaningful_span(tokens),
            };

            let label = match tokens.get(end_offset).map(|t| &t.token) {
                Some(Token::Indent) => "unexpected indent",
                _ => "unexpected token",
            };

            Diagnostic::error(format!("unexpected token: {message}"))
                .with_code(ErrorCode::E100)
                .with_label(error_span, label)
                .with_help("check the indentation and syntax of this statement")
        }
        ErrMode::Incomplete(_) => {
            let error_span = tokens
                .get(end_offset)
                .map_or_else(|| meaningful_span(tokens), |t| t.span);

            Diagnostic::error("incomplete input, more tokens expected")
                .with_code(ErrorCode::E101)
                .with_label(error_span, "incomplete")
                .with_help("ensure input is complete")
        }
    }
}

/// Build a syntax tree from tokens
pub fn build_module<'t, 'src>(
    tokens: &'t [PositionedToken<'src>],
) -> Result<Module<'src>, Diagnostic> {
    let mut token_slice = TokenSlice::new(tokens);

    match module.parse_next(&mut token_slice) {
        Ok(module) => Ok(module),
        Err(e) => {
            let current_remaining = token_slice.eof_offset();
            Err(convert_error(e, tokens, current_remaining))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse_tokens(input: &str) -> Vec<PositionedToken<'_>> {
        tokenize(input).expect("Failed to tokenize input")
    }

    fn parse_expression(input: &str) -> Expr<'_> {
        let tokens = parse_tokens(input);
        let mut slice = TokenSlice::new(&tokens);
        let result = expression.parse_next(&mut slice);
        // Tokens borrow `input`, so the expression can outlive them.
        result.expect("expression should parse").into_inner()
    }

    #[test]
    fn test_identifier() {
        let tokens = parse_tokens("car");
        let mut slice = TokenSlice::new(&tokens);
        let result = identifier.parse_next(&mut slice).expect("identifier");
        assert_eq!(*result.inner(), "car");
        assert_eq!(result.span(), Span::new(0..3));
    }

    #[test]
    fn test_string_literal() {
        let tokens = parse_tokens("\"hello world\"");
        let mut slice = TokenSlice::new(&tokens);
        let result = string_literal.parse_next(&mut slice).expect("string");
        assert_eq!(result.inner(), "hello world");
    }

    #[test]
    fn test_adjacent_strings_concatenate() {
        assert_eq!(parse_expression("\"dri\" 've()'"), Expr::Str("drive()".into()));
    }

    #[test]
    fn test_shift_chain_is_left_associative() {
        let expr = parse_expression("a >> Edge(label=\"x\") >> b");
        let Expr::BinOp { left, op, right } = expr else {
            panic!("expected a binary operation");
        };
        assert_eq!(op, BinOp::RightShift);
        assert_eq!(right.inner(), &Expr::Name("b"));
        assert!(matches!(
            left.inner(),
            Expr::BinOp {
                op: BinOp::RightShift,
                ..
            }
        ));
    }

    #[test]
    fn test_call_with_keywords() {
        let expr = parse_expression("Container(\"Car\", technology=\"Python\")");
        let call = expr.as_call().expect("call");
        assert_eq!(call.callee(), Some("Container"));
        assert_eq!(call.args.len(), 1);
        assert_eq!(
            call.keyword("technology").map(|v| v.inner().clone()),
            Some(Expr::Str("Python".into()))
        );
    }

    #[test]
    fn test_attribute_callee() {
        let expr = parse_expression("diagrams.Edge(label=\"x\")");
        assert_eq!(expr.as_call().and_then(Call::callee), Some("Edge"));
    }

    #[test]
    fn test_parenthesized_and_tuple() {
        assert_eq!(parse_expression("(a)"), Expr::Name("a"));
        assert!(matches!(parse_expression("(a,)"), Expr::Tuple(items) if items.len() == 1));
        assert!(matches!(parse_expression("()"), Expr::Tuple(items) if items.is_empty()));
    }

    #[test]
    fn test_list_with_trailing_comma() {
        let expr = parse_expression("[a, b,]");
        assert!(matches!(expr, Expr::List(items) if items.len() == 2));
    }

    #[test]
    fn test_skip_header_respects_brackets() {
        let tokens = parse_tokens("(x: int = {1: 2}) -> Dict[str, int]: pass");
        let mut slice = TokenSlice::new(&tokens);
        skip_header(&mut slice).expect("header");
        assert_eq!(slice.first().map(|t| &t.token), Some(&Token::Colon));
    }

    #[test]
    fn test_skip_header_stops_at_newline() {
        let tokens = parse_tokens("x = 1\n");
        let mut slice = TokenSlice::new(&tokens);
        assert!(skip_header(&mut slice).is_err());
    }
}
