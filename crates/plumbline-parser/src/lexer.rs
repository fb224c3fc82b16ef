//! Lexical analyzer for the Python subset.
//!
//! The lexer converts source text into a stream of [`Token`]s for parsing.
//! Besides ordinary tokens it tracks layout the way Python does:
//!
//! - a [`Token::Newline`] ends every logical line,
//! - [`Token::Indent`] and [`Token::Dedent`] mark changes of indentation,
//! - newlines inside brackets and after a trailing `\` are ignored,
//! - blank and comment-only lines produce no tokens.
//!
//! Whitespace and comments are recognized but never reach the parser. The
//! public entry point is [`tokenize`], which recovers from errors and reports
//! every diagnostic found in a single pass.

use winnow::{
    Parser as _,
    combinator::{alt, opt, preceded},
    error::{AddContext, ContextError, ErrMode},
    stream::{LocatingSlice, Location, Stream},
    token::{literal, one_of, take_while},
};

use crate::{
    error::{Diagnostic, DiagnosticCollector, ErrorCode, ParseError},
    span::Span,
    tokens::{PositionedToken, Token},
};

/// Rich diagnostic information for lexer errors.
///
/// Attached to winnow errors via `.context()` or `add_context` so the
/// reported span starts at the beginning of the offending token.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LexerDiagnostic {
    code: ErrorCode,
    message: &'static str,
    help: Option<&'static str>,
    start: usize,
}

type Input<'a> = LocatingSlice<&'a str>;
type IResult<O> = Result<O, ErrMode<ContextError<LexerDiagnostic>>>;

/// Tab stops are every eight columns.
const TAB_WIDTH: usize = 8;

const BYTE_ORDER_MARK: char = '\u{feff}';

/// Parse a comment starting with `#` up to the end of the line.
fn comment<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    preceded('#', take_while(0.., |c| c != '\n' && c != '\r'))
        .map(Token::Comment)
        .parse_next(input)
}

/// Parse a line break.
fn newline<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    alt((literal("\r\n"), literal("\n")))
        .value(Token::Newline)
        .parse_next(input)
}

/// Parse an explicit line continuation: a backslash directly before a line break.
fn line_continuation<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    ('\\', opt('\r'), '\n')
        .value(Token::LineContinuation)
        .parse_next(input)
}

/// Parse whitespace inside a line.
fn whitespace<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    take_while(1.., [' ', '\t', '\r', '\x0c'])
        .value(Token::Whitespace)
        .parse_next(input)
}

/// Parse the leading whitespace of a line, possibly empty.
fn leading_whitespace<'a>(input: &mut Input<'a>) -> IResult<&'a str> {
    take_while(0.., [' ', '\t', '\x0c']).parse_next(input)
}

/// Parse the optional prefix of a string literal (`r`, `b`, `f`, `rb`, ...).
fn string_prefix<'a>(input: &mut Input<'a>) -> IResult<&'a str> {
    take_while(0..=2, |c: char| {
        matches!(c, 'r' | 'R' | 'b' | 'B' | 'u' | 'U' | 'f' | 'F')
    })
    .parse_next(input)
}

/// Parse an opening quote, longest form first.
fn string_quote<'a>(input: &mut Input<'a>) -> IResult<&'a str> {
    alt((
        literal("\"\"\""),
        literal("'''"),
        literal("\""),
        literal("'"),
    ))
    .parse_next(input)
}

/// Append the meaning of `\<escaped>` to `value`.
///
/// Unknown escapes keep their backslash, and an escaped line break joins
/// the lines.
fn push_escape(value: &mut String, escaped: char) {
    match escaped {
        'n' => value.push('\n'),
        't' => value.push('\t'),
        'r' => value.push('\r'),
        '0' => value.push('\0'),
        'a' => value.push('\u{07}'),
        'b' => value.push('\u{08}'),
        'f' => value.push('\u{0C}'),
        'v' => value.push('\u{0B}'),
        '\\' | '\'' | '"' => value.push(escaped),
        '\n' => {}
        other => {
            value.push('\\');
            value.push(other);
        }
    }
}

/// Parse the body of a string after its opening quote, through the closing quote.
///
/// Single-quoted strings end at the line break; triple-quoted strings may
/// span lines. Raw strings keep every backslash.
fn string_body(input: &mut Input<'_>, quote: &str, raw: bool, start: usize) -> IResult<String> {
    let triple = quote.len() == 3;
    let mut value = String::new();

    loop {
        if input.starts_with(quote) {
            input.next_slice(quote.len());
            return Ok(value);
        }
        if !triple && (input.starts_with('\n') || input.starts_with("\r\n")) {
            break;
        }
        match input.next_token() {
            None => break,
            Some('\\') => match input.next_token() {
                None => break,
                Some(escaped) if raw => {
                    value.push('\\');
                    value.push(escaped);
                }
                Some(escaped) => push_escape(&mut value, escaped),
            },
            Some(c) => value.push(c),
        }
    }

    Err(ErrMode::Cut(ContextError::new().add_context(
        input,
        &input.checkpoint(),
        LexerDiagnostic {
            code: ErrorCode::E001,
            message: "unterminated string literal",
            help: Some("close the string with the quote that opened it"),
            start,
        },
    )))
}

/// Parse a string literal, including prefixed and triple-quoted forms.
///
/// Bytes and f-strings are kept as plain text; only the literal content matters
/// to the model builders.
fn string_literal<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    let start = input.current_token_start();
    let prefix = string_prefix(input)?;
    let quote = string_quote(input)?;
    let raw = prefix.contains(['r', 'R']);

    string_body(input, quote, raw, start).map(Token::StringLiteral)
}

/// Parse a numeric literal.
///
/// The exact value is irrelevant, so any run of digits, letters, dots and
/// underscores starting with a digit is accepted (`42`, `0x1F`, `1.5`, `1_000`).
fn number<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    (
        one_of(|c: char| c.is_ascii_digit()),
        take_while(0.., |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '.'),
    )
        .take()
        .map(Token::Number)
        .parse_next(input)
}

fn keyword_or_name(name: &str) -> Token<'_> {
    match name {
        "class" => Token::Class,
        "def" => Token::Def,
        "for" => Token::For,
        "in" => Token::In,
        "with" => Token::With,
        "as" => Token::As,
        "async" => Token::Async,
        _ => Token::Name(name),
    }
}

/// Parse an identifier or one of the recognized keywords.
fn name<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    (
        one_of(|c: char| c.is_alphabetic() || c == '_'),
        take_while(0.., |c: char| c.is_alphanumeric() || c == '_'),
    )
        .take()
        .map(keyword_or_name)
        .parse_next(input)
}

/// Parse operators, longest first.
fn operator<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    alt((
        alt((
            alt((
                literal("**="),
                literal("//="),
                literal(">>="),
                literal("<<="),
                literal("..."),
                literal(":="),
                literal("=="),
            )),
            alt((
                literal("!="),
                literal("<="),
                literal(">="),
                literal("//"),
                literal("+="),
                literal("-="),
                literal("*="),
            )),
            alt((
                literal("/="),
                literal("%="),
                literal("&="),
                literal("|="),
                literal("^="),
                literal("@="),
            )),
        ))
        .map(Token::Operator),
        literal("->").value(Token::Arrow),
        literal(">>").value(Token::RightShift),
        literal("<<").value(Token::LeftShift),
        literal("**").value(Token::DoubleStar),
        one_of(['+', '/', '%', '&', '|', '^', '~', '<', '>', '!'])
            .take()
            .map(Token::Operator),
    ))
    .parse_next(input)
}

/// Parse single character punctuation.
fn punctuation<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    alt((
            '-'.value(Token::Minus),
            '='.value(Token::Equals),
            '*'.value(Token::Star),
            ':'.value(Token::Colon),
            ','.value(Token::Comma),
            '.'.value(Token::Dot),
            ';'.value(Token::Semicolon),
            '@'.value(Token::At),
        alt((
            '('.value(Token::LeftParen),
            ')'.value(Token::RightParen),
            '['.value(Token::LeftBracket),
            ']'.value(Token::RightBracket),
            '{'.value(Token::LeftBrace),
            '}'.value(Token::RightBrace),
        )),
    ))
    .parse_next(input)
}

/// Parse a single token with position tracking
fn positioned_token<'a>(input: &mut Input<'a>) -> IResult<PositionedToken<'a>> {
    let start_pos = input.current_token_start();

    let token = alt((
        comment,
        newline,
        line_continuation,
        whitespace,
        string_literal, // Must come before name (string prefixes)
        number,
        name,
        operator,    // Must come before punctuation (`->` vs `-`)
        punctuation,
    ))
    .parse_next(input)?;

    let end_pos = input.current_token_start();
    Ok(PositionedToken::new(token, Span::new(start_pos..end_pos)))
}

/// Width of leading whitespace, expanding tabs to the next tab stop.
fn indentation_width(leading: &str) -> usize {
    leading.chars().fold(0, |width, c| match c {
        '\t' => (width / TAB_WIDTH + 1) * TAB_WIDTH,
        _ => width + 1,
    })
}

/// Lexer that accumulates tokens, layout state and diagnostics.
struct Lexer<'a> {
    tokens: Vec<PositionedToken<'a>>,
    diagnostics: DiagnosticCollector,
    /// Indentation widths of the enclosing blocks; never empty.
    indents: Vec<usize>,
    /// Spans of currently open brackets.
    brackets: Vec<Span>,
}

impl<'a> Lexer<'a> {
    fn new() -> Self {
        Self {
            tokens: Vec::new(),
            diagnostics: DiagnosticCollector::new(),
            indents: vec![0],
            brackets: Vec::new(),
        }
    }

    /// Tokenize the input, collecting tokens and errors.
    fn tokenize(&mut self, mut input: Input<'a>) {
        let mut at_line_start = true;

        while !input.is_empty() {
            if at_line_start && self.brackets.is_empty() {
                at_line_start = false;
                self.indentation(&mut input);
                continue;
            }

            let before = input.current_token_start();
            match positioned_token(&mut input) {
                Ok(token) => at_line_start = self.push(token),
                Err(e) => {
                    let error_pos = input.current_token_start();
                    self.diagnostics.emit(Self::convert_err_mode(e, error_pos));

                    // Cut errors have already consumed the bad token.
                    if error_pos == before && !input.is_empty() {
                        input.next_token();
                    }
                }
            }
        }

        self.finish_layout(input.current_token_start());
    }

    /// Measure the indentation of a new line and emit `Indent`/`Dedent` tokens.
    fn indentation(&mut self, input: &mut Input<'a>) {
        let start = input.current_token_start();
        let Ok(leading) = leading_whitespace(input) else {
            return;
        };

        // Blank and comment-only lines do not affect layout.
        if input.is_empty()
            || input.starts_with('\n')
            || input.starts_with("\r\n")
            || input.starts_with('#')
        {
            return;
        }

        let span = Span::new(start..input.current_token_start());
        self.indent_to(indentation_width(leading), span);
    }

    fn current_indent(&self) -> usize {
        self.indents.last().copied().unwrap_or(0)
    }

    fn indent_to(&mut self, width: usize, span: Span) {
        let current = self.current_indent();
        if width > current {
            self.indents.push(width);
            self.tokens.push(PositionedToken::new(Token::Indent, span));
            return;
        }

        let at = Span::new(span.end()..span.end());
        while self.current_indent() > width {
            self.indents.pop();
            self.tokens.push(PositionedToken::new(Token::Dedent, at));
        }
        if self.current_indent() != width {
            self.diagnostics.emit(
                Diagnostic::error("unindent does not match any outer indentation level")
                    .with_code(ErrorCode::E003)
                    .with_label(span, ErrorCode::E003.description())
                    .with_help("indent this line to the level of an enclosing block"),
            );
        }
    }

    /// Record a token. Returns `true` if the token ended a logical line.
    fn push(&mut self, token: PositionedToken<'a>) -> bool {
        match &token.token {
            Token::Whitespace | Token::Comment(_) | Token::LineContinuation => false,
            Token::Newline => {
                // Inside brackets a line break is just whitespace.
                if !self.brackets.is_empty() {
                    return false;
                }
                if self
                    .tokens
                    .last()
                    .is_some_and(|last| !matches!(last.token, Token::Newline))
                {
                    self.tokens.push(token);
                }
                true
            }
            t if t.is_opening_bracket() => {
                self.brackets.push(token.span);
                self.tokens.push(token);
                false
            }
            t if t.is_closing_bracket() => {
                if self.brackets.pop().is_none() {
                    self.diagnostics.emit(
                        Diagnostic::error("unmatched closing bracket")
                            .with_code(ErrorCode::E004)
                            .with_label(token.span, ErrorCode::E004.description()),
                    );
                }
                self.tokens.push(token);
                false
            }
            _ => {
                self.tokens.push(token);
                false
            }
        }
    }

    /// Close the last logical line and every open block at end of input.
    fn finish_layout(&mut self, end: usize) {
        for span in std::mem::take(&mut self.brackets) {
            self.diagnostics.emit(
                Diagnostic::error("bracket is never closed")
                    .with_code(ErrorCode::E005)
                    .with_label(span, ErrorCode::E005.description())
                    .with_help("add the matching closing bracket"),
            );
        }

        let at = Span::new(end..end);
        if self
            .tokens
            .last()
            .is_some_and(|last| !matches!(last.token, Token::Newline))
        {
            self.tokens.push(PositionedToken::new(Token::Newline, at));
        }
        while self.indents.len() > 1 {
            self.indents.pop();
            self.tokens.push(PositionedToken::new(Token::Dedent, at));
        }
    }

    /// Finish lexing and return tokens or collected errors.
    fn finish(self) -> Result<Vec<PositionedToken<'a>>, ParseError> {
        self.diagnostics.finish().map(|_| self.tokens)
    }

    /// Convert an ErrMode and error position to a Diagnostic.
    ///
    /// Falls back to E002 (unexpected character) if no diagnostic context is found.
    fn convert_err_mode(
        err: ErrMode<ContextError<LexerDiagnostic>>,
        error_pos: usize,
    ) -> Diagnostic {
        let context_error = match err {
            ErrMode::Backtrack(ctx) | ErrMode::Cut(ctx) => ctx,
            ErrMode::Incomplete(_) => ContextError::new(),
        };

        if let Some(LexerDiagnostic {
            code,
            message,
            help,
            start,
        }) = context_error.context().next()
        {
            let span = Span::new(*start..error_pos);

            let mut diag = Diagnostic::error(*message)
                .with_code(*code)
                .with_label(span, code.description());
            if let Some(h) = help {
                diag = diag.with_help(*h);
            }
            return diag;
        }

        let span = Span::new(error_pos..error_pos.saturating_add(1));
        Diagnostic::error("unexpected character")
            .with_code(ErrorCode::E002)
            .with_label(span, ErrorCode::E002.description())
    }
}

/// Tokenize source text, collecting every lexical error.
///
/// # Returns
///
/// - `Ok(tokens)` - All tokens, with layout tokens inserted and trivia removed
/// - `Err(ParseError)` - One or more errors occurred; contains all diagnostics
pub fn tokenize(input: &str) -> Result<Vec<PositionedToken<'_>>, ParseError> {
    let mut stream = LocatingSlice::new(input);
    // Spans stay relative to `input`, byte order mark included.
    if stream.starts_with(BYTE_ORDER_MARK) {
        stream.next_slice(BYTE_ORDER_MARK.len_utf8());
    }

    let mut lexer = Lexer::new();
    lexer.tokenize(stream);
    lexer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<Token<'_>> {
        tokenize(input)
            .expect("input should tokenize")
            .into_iter()
            .map(|t| t.token)
            .collect()
    }

    fn single_token(input: &str) -> Token<'_> {
        let mut located = LocatingSlice::new(input);
        positioned_token(&mut located)
            .unwrap_or_else(|_| panic!("failed to lex {input:?}"))
            .token
    }

    fn error_codes(input: &str) -> Vec<ErrorCode> {
        tokenize(input)
            .expect_err("input should fail")
            .diagnostics()
            .iter()
            .filter_map(Diagnostic::code)
            .collect()
    }

    #[test]
    fn test_keywords_and_names() {
        assert_eq!(single_token("class"), Token::Class);
        assert_eq!(single_token("def"), Token::Def);
        assert_eq!(single_token("for"), Token::For);
        assert_eq!(single_token("in"), Token::In);
        assert_eq!(single_token("with"), Token::With);
        assert_eq!(single_token("classy"), Token::Name("classy"));
        assert_eq!(single_token("_private"), Token::Name("_private"));
        assert_eq!(single_token("données"), Token::Name("données"));
    }

    #[test]
    fn test_shift_operators() {
        assert_eq!(single_token(">>"), Token::RightShift);
        assert_eq!(single_token("<<"), Token::LeftShift);
        assert_eq!(single_token(">>="), Token::Operator(">>="));
        assert_eq!(single_token("<="), Token::Operator("<="));
        assert_eq!(single_token("->"), Token::Arrow);
        assert_eq!(single_token("-"), Token::Minus);
    }

    #[test]
    fn test_string_literals() {
        assert_eq!(single_token(r#""Car""#), Token::StringLiteral("Car".into()));
        assert_eq!(single_token("'Car'"), Token::StringLiteral("Car".into()));
        assert_eq!(
            single_token(r#""say \"hi\"\n""#),
            Token::StringLiteral("say \"hi\"\n".into())
        );
        assert_eq!(
            single_token(r#"r"C:\path""#),
            Token::StringLiteral(r"C:\path".into())
        );
        assert_eq!(
            single_token(r#"f"{name}()""#),
            Token::StringLiteral("{name}()".into())
        );
        assert_eq!(
            single_token("\"\"\"doc\nstring\"\"\""),
            Token::StringLiteral("doc\nstring".into())
        );
        assert_eq!(single_token("\"\""), Token::StringLiteral(String::new()));
    }

    #[test]
    fn test_prefix_letter_alone_is_a_name() {
        assert_eq!(single_token("rate"), Token::Name("rate"));
        assert_eq!(single_token("b"), Token::Name("b"));
    }

    #[test]
    fn test_simple_line() {
        assert_eq!(
            kinds("car = Container(\"Car\")\n"),
            vec![
                Token::Name("car"),
                Token::Equals,
                Token::Name("Container"),
                Token::LeftParen,
                Token::StringLiteral("Car".into()),
                Token::RightParen,
                Token::Newline,
            ]
        );
    }

    #[test]
    fn test_indent_and_dedent() {
        let source = "class A:\n    def f(self):\n        pass\n\nx = 1\n";
        assert_eq!(
            kinds(source),
            vec![
                Token::Class,
                Token::Name("A"),
                Token::Colon,
                Token::Newline,
                Token::Indent,
                Token::Def,
                Token::Name("f"),
                Token::LeftParen,
                Token::Name("self"),
                Token::RightParen,
                Token::Colon,
                Token::Newline,
                Token::Indent,
                Token::Name("pass"),
                Token::Newline,
                Token::Dedent,
                Token::Dedent,
                Token::Name("x"),
                Token::Equals,
                Token::Number("1"),
                Token::Newline,
            ]
        );
    }

    #[test]
    fn test_blocks_closed_at_end_of_input() {
        let tokens = kinds("with Diagram(\"d\"):\n    a = 1");
        assert_eq!(
            &tokens[tokens.len() - 3..],
            &[Token::Number("1"), Token::Newline, Token::Dedent]
        );
    }

    #[test]
    fn test_blank_and_comment_lines_ignored() {
        let source = "a = 1\n\n    # indented comment\n# comment\nb = 2\n";
        let tokens = kinds(source);
        assert!(!tokens.contains(&Token::Indent));
        assert_eq!(tokens.iter().filter(|t| **t == Token::Newline).count(), 2);
    }

    #[test]
    fn test_newlines_inside_brackets_ignored() {
        let source = "people = [\n    alice,\n    bob,\n]\n";
        let tokens = kinds(source);
        assert_eq!(tokens.iter().filter(|t| **t == Token::Newline).count(), 1);
        assert!(!tokens.contains(&Token::Indent));
    }

    #[test]
    fn test_line_continuation() {
        let tokens = kinds("a >> \\\n    b\n");
        assert_eq!(
            tokens,
            vec![
                Token::Name("a"),
                Token::RightShift,
                Token::Name("b"),
                Token::Newline
            ]
        );
    }

    #[test]
    fn test_tabs_expand_to_tab_stops() {
        assert_eq!(indentation_width("\t"), 8);
        assert_eq!(indentation_width("  \t"), 8);
        assert_eq!(indentation_width("    "), 4);
    }

    #[test]
    fn test_unterminated_string() {
        assert_eq!(error_codes("a = \"Car\nb = 1\n"), vec![ErrorCode::E001]);
    }

    #[test]
    fn test_unterminated_string_span_starts_at_quote() {
        let err = tokenize("x = 'abc\n").expect_err("unterminated");
        let span = err.diagnostics()[0].labels()[0].span();
        assert_eq!(span.start(), 4);
    }

    #[test]
    fn test_unexpected_character() {
        assert_eq!(error_codes("a = $\n"), vec![ErrorCode::E002]);
    }

    #[test]
    fn test_inconsistent_dedent() {
        let source = "if x:\n        a = 1\n    b = 2\n";
        assert_eq!(error_codes(source), vec![ErrorCode::E003]);
    }

    #[test]
    fn test_bracket_errors() {
        assert_eq!(error_codes("a = b)\n"), vec![ErrorCode::E004]);
        assert_eq!(error_codes("a = [b, c\n"), vec![ErrorCode::E005]);
    }

    #[test]
    fn test_multiple_errors_reported() {
        let codes = error_codes("a = $\nb = ?\n");
        assert_eq!(codes, vec![ErrorCode::E002, ErrorCode::E002]);
    }

    #[test]
    fn test_token_spans() {
        let tokens = tokenize("car >> bus").expect("valid");
        assert_eq!(tokens[0].span, Span::new(0..3));
        assert_eq!(tokens[1].span, Span::new(4..6));
        assert_eq!(tokens[2].span, Span::new(7..10));
    }

    #[test]
    fn test_leading_byte_order_mark_is_skipped() {
        let source = "\u{feff}class Car:\n    pass\n";
        let tokens = tokenize(source).expect("a byte order mark is not an error");
        assert_eq!(tokens[0].token, Token::Class);
        assert_eq!(tokens[0].span, Span::new(3..8));
        assert_eq!(&source[tokens[0].span.start()..tokens[0].span.end()], "class");

        // Anywhere else it is still an unexpected character.
        assert_eq!(error_codes("a = 1\n\u{feff}b = 2\n"), vec![ErrorCode::E002]);
    }
}
