//! Connection inference between classes.
//!
//! A [`Connection`] says that a method of one class uses one or more other
//! classes. The evidence is read from the tokens of the method, so lines the
//! parser keeps only as [`Statement::Other`] still count:
//!
//! - `var.method(...)` points at every class whose resolved capabilities
//!   include `method()`
//! - `var.attr`, for any `var` but `self`, points at every class whose
//!   constructor assigns `attr`
//! - `x = Class(...)` points at `Class` when it is declared in the same file
//!
//! Replacement fields of f-strings are searched too. Constructors record no
//! connections since they are not capabilities.

use indexmap::IndexSet;
use log::{debug, trace};

use plumbline_core::model::{Capability, EntityName, GraphModel};

use crate::{
    extract::{ExtractConfig, SourceModel},
    lexer::tokenize,
    span::Span,
    syntax::{ClassDef, Module, Statement},
    tokens::{PositionedToken, Token},
};

/// A method of `source` that uses each of `targets`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Connection {
    source: EntityName,
    capability: Capability,
    targets: Vec<EntityName>,
}

impl Connection {
    pub fn new(source: EntityName, capability: Capability, targets: Vec<EntityName>) -> Self {
        Self {
            source,
            capability,
            targets,
        }
    }

    pub fn source(&self) -> &EntityName {
        &self.source
    }

    pub fn capability(&self) -> &Capability {
        &self.capability
    }

    /// Candidate classes in declaration order.
    pub fn targets(&self) -> &[EntityName] {
        &self.targets
    }
}

fn token_at<'t, 'src>(
    tokens: &'t [PositionedToken<'src>],
    index: usize,
) -> Option<&'t Token<'src>> {
    tokens.get(index).map(|positioned| &positioned.token)
}

/// Tokens starting inside `start..end`.
fn token_range<'t, 'src>(
    tokens: &'t [PositionedToken<'src>],
    start: usize,
    end: usize,
) -> &'t [PositionedToken<'src>] {
    let first = tokens.partition_point(|positioned| positioned.span.start() < start);
    let last = tokens
        .partition_point(|positioned| positioned.span.start() < end)
        .max(first);
    &tokens[first..last]
}

fn span_text(text: &str, span: Span) -> &str {
    text.get(span.start()..span.end()).unwrap_or_default()
}

/// End of a replacement field's expression: the first `}`, `!` or `:`
/// outside brackets and nested strings.
fn field_end(body: &str, start: usize) -> usize {
    let bytes = body.as_bytes();
    let mut depth = 0usize;
    let mut index = start;
    while index < bytes.len() {
        match bytes[index] {
            quote @ (b'\'' | b'"') => {
                index += 1;
                while index < bytes.len() && bytes[index] != quote {
                    index += 1;
                }
            }
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' => depth = depth.saturating_sub(1),
            b'}' if depth > 0 => depth -= 1,
            b'}' | b':' if depth == 0 => return index,
            b'!' if depth == 0 && bytes.get(index + 1) != Some(&b'=') => return index,
            _ => {}
        }
        index += 1;
    }
    bytes.len()
}

/// Index just past the `}` closing a field whose expression ended at `from`.
fn field_close(body: &str, from: usize) -> usize {
    let mut depth = 0usize;
    for (offset, byte) in body.bytes().enumerate().skip(from) {
        match byte {
            b'{' => depth += 1,
            b'}' if depth == 0 => return offset + 1,
            b'}' => depth -= 1,
            _ => {}
        }
    }
    body.len()
}

/// Source text of the replacement field expressions of a string literal.
///
/// Returns nothing unless the literal carries an `f` prefix.
fn format_fields(literal: &str) -> Vec<&str> {
    let Some(prefix_len) = literal.find(['\'', '"']) else {
        return Vec::new();
    };
    if !literal[..prefix_len].contains(['f', 'F']) {
        return Vec::new();
    }
    let rest = &literal[prefix_len..];
    let quote_len = if rest.starts_with("\"\"\"") || rest.starts_with("'''") {
        3
    } else {
        1
    };
    let Some(body) = rest.get(quote_len..rest.len().saturating_sub(quote_len)) else {
        return Vec::new();
    };

    let bytes = body.as_bytes();
    let mut fields = Vec::new();
    let mut index = 0;
    while index < bytes.len() {
        match bytes[index] {
            b'{' if bytes.get(index + 1) == Some(&b'{') => index += 2,
            b'{' => {
                let end = field_end(body, index + 1);
                fields.push(&body[index + 1..end]);
                index = field_close(body, end);
            }
            _ => index += 1,
        }
    }
    fields
}

/// Spans of classes declared inside a method body.
fn nested_classes(statements: &[Statement<'_>], spans: &mut Vec<Span>) {
    for statement in statements {
        match statement {
            Statement::ClassDef(class) => spans.push(class.span),
            Statement::FunctionDef(function) => nested_classes(&function.body, spans),
            Statement::For(for_loop) => nested_classes(&for_loop.body, spans),
            Statement::With(with) => nested_classes(&with.body, spans),
            Statement::Block(block) => nested_classes(&block.body, spans),
            Statement::Assign(_) | Statement::Expr(_) | Statement::Other(_) => {}
        }
    }
}

struct Finder<'a, 'src> {
    source: &'a str,
    tokens: &'a [PositionedToken<'src>],
    model: &'a SourceModel,
    config: &'a ExtractConfig,
    resolved: GraphModel,
    connections: IndexSet<Connection>,
}

impl Finder<'_, '_> {
    fn visit_statements(&mut self, statements: &[Statement<'_>]) {
        for statement in statements {
            match statement {
                Statement::ClassDef(class) => self.visit_class(class),
                Statement::FunctionDef(function) => self.visit_statements(&function.body),
                Statement::For(for_loop) => self.visit_statements(&for_loop.body),
                Statement::With(with) => self.visit_statements(&with.body),
                Statement::Block(block) => self.visit_statements(&block.body),
                Statement::Assign(_) | Statement::Expr(_) | Statement::Other(_) => {}
            }
        }
    }

    fn visit_class(&mut self, class: &ClassDef<'_>) {
        let name = EntityName::new(*class.name.inner());
        self.visit_class_body(&name, &class.body);
    }

    fn visit_class_body(&mut self, class: &EntityName, body: &[Statement<'_>]) {
        for statement in body {
            match statement {
                Statement::FunctionDef(function) => {
                    let method = *function.name.inner();
                    if method != self.config.constructor() {
                        let mut nested = Vec::new();
                        nested_classes(&function.body, &mut nested);
                        let capability = Capability::method(method);
                        self.visit_method(class, capability, function.span, &nested);
                    }
                    self.visit_statements(&function.body);
                }
                Statement::ClassDef(nested) => self.visit_class(nested),
                Statement::For(for_loop) => self.visit_class_body(class, &for_loop.body),
                Statement::With(with) => self.visit_class_body(class, &with.body),
                Statement::Block(block) => self.visit_class_body(class, &block.body),
                Statement::Assign(_) | Statement::Expr(_) | Statement::Other(_) => {}
            }
        }
    }

    /// Scans the tokens of one method, skipping classes declared inside it.
    fn visit_method(
        &mut self,
        class: &EntityName,
        capability: Capability,
        span: Span,
        nested: &[Span],
    ) {
        let tokens = self.tokens;
        let mut found = Vec::new();
        let mut start = span.start();
        for hole in nested {
            self.scan(self.source, token_range(tokens, start, hole.start()), &mut found);
            start = hole.end();
        }
        self.scan(self.source, token_range(tokens, start, span.end()), &mut found);

        for targets in found.into_iter().filter(|targets| !targets.is_empty()) {
            let connection = Connection::new(class.clone(), capability.clone(), targets);
            trace!(
                class = class.as_str(),
                method = capability.as_str(),
                targets = connection.targets().len();
                "Inferred connection"
            );
            self.connections.insert(connection);
        }
    }

    /// Collects candidate target lists from `tokens`, which were lexed from `text`.
    fn scan(
        &self,
        text: &str,
        tokens: &[PositionedToken<'_>],
        found: &mut Vec<Vec<EntityName>>,
    ) {
        let mut depth = 0usize;
        for (index, positioned) in tokens.iter().enumerate() {
            match &positioned.token {
                Token::Newline => depth = 0,
                token if token.is_opening_bracket() => depth += 1,
                token if token.is_closing_bracket() => depth = depth.saturating_sub(1),
                // Only a plain assignment; keyword arguments sit inside brackets.
                Token::Equals if depth == 0 => {
                    if let (Some(Token::Name(class)), Some(Token::LeftParen)) =
                        (token_at(tokens, index + 1), token_at(tokens, index + 2))
                    {
                        if let Some(class) = self.model.class(class) {
                            found.push(vec![class.name().clone()]);
                        }
                    }
                }
                Token::Name(variable)
                    if index == 0 || !matches!(token_at(tokens, index - 1), Some(Token::Dot)) =>
                {
                    let (Some(Token::Dot), Some(Token::Name(member))) =
                        (token_at(tokens, index + 1), token_at(tokens, index + 2))
                    else {
                        continue;
                    };
                    if matches!(token_at(tokens, index + 3), Some(Token::LeftParen)) {
                        found.push(self.classes_with_method(member));
                    }
                    if *variable != "self" {
                        found.push(self.classes_with_attribute(member));
                    }
                }
                Token::StringLiteral(_) => {
                    for field in format_fields(span_text(text, positioned.span)) {
                        let field = field.trim();
                        if let Ok(field_tokens) = tokenize(field) {
                            self.scan(field, &field_tokens, found);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn classes_with_method(&self, method: &str) -> Vec<EntityName> {
        let label = Capability::method(method);
        self.model
            .classes()
            .filter(|class| {
                self.resolved
                    .capabilities()
                    .has(class.name().as_str(), label.as_str())
            })
            .map(|class| class.name().clone())
            .collect()
    }

    fn classes_with_attribute(&self, attribute: &str) -> Vec<EntityName> {
        self.model
            .classes()
            .filter(|class| class.attributes().contains(attribute))
            .map(|class| class.name().clone())
            .collect()
    }
}

/// Infers which classes of `model` each method uses.
///
/// `tokens` are the tokens of `source` and `module` the tree parsed from
/// them; `model` is what [`extract_source_model`](crate::extract_source_model)
/// built from `module` with the same `config`. Identical connections are
/// kept once.
pub fn infer_connections(
    source: &str,
    tokens: &[PositionedToken<'_>],
    module: &Module<'_>,
    model: &SourceModel,
    config: &ExtractConfig,
) -> IndexSet<Connection> {
    let mut finder = Finder {
        source,
        tokens,
        model,
        config,
        resolved: model.resolve(),
        connections: IndexSet::new(),
    };
    finder.visit_statements(&module.statements);
    debug!(connections = finder.connections.len(); "Connections inferred");
    finder.connections
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{extract_source_model, parser::build_module};

    fn connections(source: &str) -> Vec<String> {
        let config = ExtractConfig::default();
        let tokens = tokenize(source).expect("source should tokenize");
        let module = build_module(&tokens).expect("source should parse");
        let model = extract_source_model(&module, &config).into_output();
        infer_connections(source, &tokens, &module, &model, &config)
            .iter()
            .map(|connection| {
                let targets: Vec<&str> =
                    connection.targets().iter().map(EntityName::as_str).collect();
                format!(
                    "{} {} [{}]",
                    connection.source(),
                    connection.capability(),
                    targets.join(", ")
                )
            })
            .collect()
    }

    const LIBRARY: &str = r#"
class Library:
    def __init__(self, name, address):
        self.name = name
        self.address = address
        self.books = []

    def add_book(self, book):
        self.books.append(book)
        print(f"Book '{book.title}' added to the library.")


class Book:
    def __init__(self, title, author):
        self.title = title
        self.author = author
        self.borrower = None

    def borrow(self, member):
        if self.borrower is None:
            self.borrower = member
            print(f"'{self.title}' is borrowed by {member.name}.")
        else:
            print(f"'{self.title}' is already borrowed by {self.borrower.name}.")

    def return_book(self):
        self.borrower = None


class Member:
    def __init__(self, name):
        self.name = name
        self.borrowed_books = []

    def borrow_book(self, book):
        if len(self.borrowed_books) < 5:
            book.borrow(self)
            self.borrowed_books.append(book)

    def return_book(self, book):
        if book in self.borrowed_books:
            book.return_book()
        else:
            print(f"{self.name} doesn't have the book '{book.title}' to return.")
"#;

    #[test]
    fn test_library_connections() {
        assert_eq!(
            connections(LIBRARY),
            vec![
                "Library add_book() [Book]",
                "Book borrow() [Library, Member]",
                "Member borrow_book() [Book]",
                "Member return_book() [Book, Member]",
                "Member return_book() [Book]",
            ]
        );
    }

    #[test]
    fn test_constructor_calls_and_skipped_contexts() {
        let source = r#"
class Engine:
    def start(self):
        pass

class Car:
    def __init__(self):
        self.engine = Engine()

    def rebuild(self, make=Engine()):
        spare = Engine(size=2)
        log(level=Engine())

    def honk(self):
        self.sound()
        Unknown.thing
"#;
        assert_eq!(connections(source), vec!["Car rebuild() [Engine]"]);
    }

    #[test]
    fn test_classes_nested_in_methods_are_separate() {
        let source = r#"
class Pump:
    def __init__(self):
        self.pressure = 0

    def run(self):
        pass

class Plant:
    def operate(self, pump):
        class Local:
            def check(self, gauge):
                gauge.run()
        pump.pressure
"#;
        assert_eq!(
            connections(source),
            vec!["Plant operate() [Pump]", "Local check() [Pump]"]
        );
    }

    #[test]
    fn test_format_fields() {
        assert_eq!(
            format_fields(r#"f"{a.b} and {c!r:>{width}} {{x}}""#),
            vec!["a.b", "c"]
        );
        assert_eq!(format_fields(r#"rf'{d["k"]}'"#), vec![r#"d["k"]"#]);
        assert_eq!(format_fields(r#"f"""{x != y}""""#), vec!["x != y"]);
        assert!(format_fields(r#""{a.b}""#).is_empty());
        assert!(format_fields(r#"b"{a.b}""#).is_empty());
    }
}
