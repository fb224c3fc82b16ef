//! Source model extraction.
//!
//! Walks a parsed Python module and records every class with its own
//! methods, declared parents and the attributes its constructor assigns.
//! [`SourceModel::resolve`] turns that record into a [`GraphModel`] with
//! inherited capabilities folded in.

use indexmap::{IndexMap, IndexSet};
use log::{debug, trace};

use plumbline_core::{
    inheritance::{self, InheritanceFact},
    model::{Capability, EntityName, GraphModel},
};

use crate::{
    Analysis,
    connect::Connection,
    error::{Diagnostic, DiagnosticCollector, ErrorCode},
    span::Span,
    syntax::{ClassDef, Expr, Module, Statement},
};

/// Configuration for source extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractConfig {
    constructor: String,
}

impl ExtractConfig {
    /// Creates a configuration that skips methods named `constructor`.
    pub fn new(constructor: impl Into<String>) -> Self {
        Self {
            constructor: constructor.into(),
        }
    }

    /// Name of the method that is never recorded as a capability.
    pub fn constructor(&self) -> &str {
        &self.constructor
    }
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self::new("__init__")
    }
}

/// A class as declared in source, before inheritance is applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDeclaration {
    name: EntityName,
    parents: Vec<EntityName>,
    methods: IndexSet<Capability>,
    attributes: IndexSet<String>,
    span: Span,
}

impl ClassDeclaration {
    pub fn name(&self) -> &EntityName {
        &self.name
    }

    /// Declared parents in source order, without duplicates.
    pub fn parents(&self) -> &[EntityName] {
        &self.parents
    }

    /// Capabilities declared by the class itself.
    pub fn methods(&self) -> &IndexSet<Capability> {
        &self.methods
    }

    /// Attributes assigned at the top level of the constructor, such as
    /// `title` for `self.title = title`.
    pub fn attributes(&self) -> &IndexSet<String> {
        &self.attributes
    }

    /// Span of the class name at its first declaration.
    pub fn span(&self) -> Span {
        self.span
    }

    fn merge(&mut self, other: ClassDeclaration) {
        for parent in other.parents {
            if !self.parents.contains(&parent) {
                self.parents.push(parent);
            }
        }
        self.methods.extend(other.methods);
        self.attributes.extend(other.attributes);
    }
}

/// Every class found in a source file, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceModel {
    classes: IndexMap<EntityName, ClassDeclaration>,
    connections: IndexSet<Connection>,
}

impl SourceModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassDeclaration> {
        self.classes.values()
    }

    pub fn class(&self, name: &str) -> Option<&ClassDeclaration> {
        self.classes.get(name)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Replaces the inferred connections between classes.
    pub fn with_connections(mut self, connections: IndexSet<Connection>) -> Self {
        self.connections = connections;
        self
    }

    /// Inferred uses of other classes, in source order. Empty unless set
    /// with [`SourceModel::with_connections`].
    pub fn connections(&self) -> &IndexSet<Connection> {
        &self.connections
    }

    /// One fact per declared parent.
    pub fn inheritance_facts(&self) -> Vec<InheritanceFact> {
        self.classes
            .values()
            .flat_map(|class| {
                class
                    .parents
                    .iter()
                    .map(|parent| InheritanceFact::new(class.name.clone(), parent.clone()))
            })
            .collect()
    }

    /// Builds the graph model: every class with its own and inherited
    /// capabilities, and no edges.
    ///
    /// Parents that are not declared in this model are skipped.
    pub fn resolve(&self) -> GraphModel {
        let mut model = GraphModel::new();
        for class in self.classes.values() {
            model.add_entity(class.name.clone());
            for method in &class.methods {
                model.add_capability(&class.name, method.clone());
            }
        }

        for class in self.classes.values() {
            for parent in class.parents.iter().filter(|p| !self.classes.contains_key(*p)) {
                debug!(class = class.name.as_str(), parent = parent.as_str(); "Skipping undeclared parent class");
            }
        }

        inheritance::resolve_model(&mut model, &self.inheritance_facts());
        model
    }
}

/// Name of a base class expression: `Base` or the last segment of `pkg.Base`.
fn base_name<'src>(base: &Expr<'src>) -> Option<&'src str> {
    match base {
        Expr::Name(name) => Some(*name),
        Expr::Attribute { attr, .. } => Some(*attr.inner()),
        _ => None,
    }
}

/// `x.attr = ...` targets among the top-level statements of a constructor.
fn collect_attributes(body: &[Statement<'_>], attributes: &mut IndexSet<String>) {
    let targets = body.iter().flat_map(|statement| match statement {
        Statement::Assign(assign) => assign.targets.as_slice(),
        _ => &[][..],
    });
    for target in targets {
        if let Expr::Attribute { attr, .. } = target.inner() {
            attributes.insert(attr.inner().to_string());
        }
    }
}

struct Extractor<'a> {
    config: &'a ExtractConfig,
    model: SourceModel,
    diagnostics: DiagnosticCollector,
}

impl<'a> Extractor<'a> {
    fn new(config: &'a ExtractConfig) -> Self {
        Self {
            config,
            model: SourceModel::new(),
            diagnostics: DiagnosticCollector::new(),
        }
    }

    fn visit_statements(&mut self, statements: &[Statement<'_>]) {
        for statement in statements {
            self.visit_statement(statement);
        }
    }

    /// Classes may be declared anywhere, so every body is searched.
    fn visit_statement(&mut self, statement: &Statement<'_>) {
        match statement {
            Statement::ClassDef(class) => self.visit_class(class),
            Statement::FunctionDef(function) => self.visit_statements(&function.body),
            Statement::For(for_loop) => self.visit_statements(&for_loop.body),
            Statement::With(with) => self.visit_statements(&with.body),
            Statement::Block(block) => self.visit_statements(&block.body),
            Statement::Assign(_) | Statement::Expr(_) | Statement::Other(_) => {}
        }
    }

    fn visit_class(&mut self, class: &ClassDef<'_>) {
        let name = EntityName::new(*class.name.inner());

        let mut parents = Vec::new();
        for base in &class.bases {
            if let Some(parent) = base_name(base.inner()).map(EntityName::new) {
                if !parents.contains(&parent) {
                    parents.push(parent);
                }
            }
        }

        let mut methods = IndexSet::new();
        let mut attributes = IndexSet::new();
        self.collect_members(&class.body, &mut methods, &mut attributes);

        trace!(class = name.as_str(), parents = parents.len(), methods = methods.len(); "Found class");
        self.declare(ClassDeclaration {
            name,
            parents,
            methods,
            attributes,
            span: class.name.span(),
        });

        self.visit_statements(&class.body);
    }

    /// Methods and constructor attributes of a class body, including those
    /// inside compound blocks but not those of nested classes.
    fn collect_members(
        &self,
        body: &[Statement<'_>],
        methods: &mut IndexSet<Capability>,
        attributes: &mut IndexSet<String>,
    ) {
        for statement in body {
            match statement {
                Statement::FunctionDef(function) => {
                    let method = *function.name.inner();
                    if method == self.config.constructor() {
                        collect_attributes(&function.body, attributes);
                    } else {
                        methods.insert(Capability::method(method));
                    }
                }
                Statement::For(for_loop) => {
                    self.collect_members(&for_loop.body, methods, attributes)
                }
                Statement::With(with) => self.collect_members(&with.body, methods, attributes),
                Statement::Block(block) => self.collect_members(&block.body, methods, attributes),
                Statement::ClassDef(_)
                | Statement::Assign(_)
                | Statement::Expr(_)
                | Statement::Other(_) => {}
            }
        }
    }

    fn declare(&mut self, declaration: ClassDeclaration) {
        match self.model.classes.get_mut(&declaration.name) {
            Some(existing) => {
                self.diagnostics.emit(
                    Diagnostic::warning(format!(
                        "class `{}` is declared more than once",
                        declaration.name
                    ))
                    .with_code(ErrorCode::E300)
                    .with_label(declaration.span, "declared again here")
                    .with_secondary_label(existing.span, "first declared here")
                    .with_help("methods and parents of both declarations are merged"),
                );
                existing.merge(declaration);
            }
            None => {
                self.model
                    .classes
                    .insert(declaration.name.clone(), declaration);
            }
        }
    }

    fn finish(self) -> Analysis<SourceModel> {
        debug!(classes = self.model.len(); "Source model extracted");
        Analysis::new(self.model, self.diagnostics.into_diagnostics())
    }
}

/// Extracts the classes of a parsed Python module.
pub fn extract_source_model(module: &Module<'_>, config: &ExtractConfig) -> Analysis<SourceModel> {
    let mut extractor = Extractor::new(config);
    extractor.visit_statements(&module.statements);
    extractor.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    fn extract(source: &str) -> Analysis<SourceModel> {
        let module = parse(source).expect("source should parse");
        extract_source_model(&module, &ExtractConfig::default())
    }

    fn methods(model: &SourceModel, class: &str) -> Vec<String> {
        model
            .class(class)
            .map(|class| class.methods().iter().map(ToString::to_string).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_class_methods_skip_constructor() {
        let analysis = extract(
            r#"
class Car:
    def __init__(self):
        self.speed = 0

    def drive(self):
        pass

    async def park(self):
        pass
"#,
        );
        assert!(analysis.diagnostics().is_empty());
        assert_eq!(methods(analysis.output(), "Car"), vec!["drive()", "park()"]);
    }

    #[test]
    fn test_constructor_attributes() {
        let analysis = extract(
            r#"
class Book:
    def __init__(self, title, owner):
        self.title = title
        self.owner = self.holder = owner
        self.pages, self.isbn = [], None
        if owner:
            self.lent = True

    def lend(self, member):
        self.borrower = member
"#,
        );
        let book = analysis.output().class("Book").expect("Book");
        let attributes: Vec<&str> = book.attributes().iter().map(String::as_str).collect();
        assert_eq!(attributes, vec!["title", "owner", "holder"]);
    }

    #[test]
    fn test_custom_constructor_name() {
        let module = parse("class A:\n    def setup(self): pass\n    def run(self): pass\n")
            .expect("parses");
        let analysis = extract_source_model(&module, &ExtractConfig::new("setup"));
        assert_eq!(methods(analysis.output(), "A"), vec!["run()"]);
    }

    #[test]
    fn test_parents_from_names_and_attributes() {
        let analysis = extract(
            "class Dog(Animal, abc.ABC, Generic[T], metaclass=Meta):\n    pass\n",
        );
        let dog = analysis.output().class("Dog").expect("Dog");
        let parents: Vec<&str> = dog.parents().iter().map(EntityName::as_str).collect();
        assert_eq!(parents, vec!["Animal", "ABC"]);
    }

    #[test]
    fn test_methods_in_compound_blocks() {
        let analysis = extract(
            r#"
class Service:
    if FAST:
        def run(self):
            pass
    else:
        def run(self):
            pass
        def slow(self):
            pass
"#,
        );
        assert_eq!(methods(analysis.output(), "Service"), vec!["run()", "slow()"]);
    }

    #[test]
    fn test_nested_classes_are_separate_entities() {
        let analysis = extract(
            r#"
class Outer:
    def outer(self):
        class Local:
            def local(self):
                pass

    class Inner:
        def inner(self):
            pass

def factory():
    class Made:
        pass
"#,
        );
        let model = analysis.output();
        assert_eq!(model.len(), 4);
        assert_eq!(methods(model, "Outer"), vec!["outer()"]);
        assert_eq!(methods(model, "Inner"), vec!["inner()"]);
        assert_eq!(methods(model, "Local"), vec!["local()"]);
        assert!(model.class("Made").is_some());
    }

    #[test]
    fn test_duplicate_class_merges_with_warning() {
        let analysis = extract(
            "class A:\n    def x(self): pass\n\nclass A(B):\n    def y(self): pass\n",
        );
        assert_eq!(analysis.diagnostics().len(), 1);
        assert_eq!(analysis.diagnostics()[0].code(), Some(ErrorCode::E300));
        assert!(!analysis.has_errors());

        let class = analysis.output().class("A").expect("A");
        assert_eq!(class.parents().len(), 1);
        assert_eq!(class.methods().len(), 2);
    }

    #[test]
    fn test_resolve_inherits_through_levels() {
        let analysis = extract(
            r#"
class Puppy(Dog):
    def play(self): pass

class Dog(Animal):
    def bark(self): pass

class Animal:
    def speak(self): pass
"#,
        );
        let model = analysis.output().resolve();

        assert!(model.edges().is_empty());
        assert!(model.capabilities().has("Puppy", "speak()"));
        assert!(model.capabilities().has("Puppy", "bark()"));
        assert!(model.capabilities().has("Dog", "speak()"));
        assert!(!model.capabilities().has("Animal", "bark()"));
    }

    #[test]
    fn test_resolve_skips_unknown_parents_and_cycles() {
        let analysis = extract(
            "class A(B, Missing):\n    def a(self): pass\nclass B(A):\n    def b(self): pass\n",
        );
        let model = analysis.output().resolve();

        assert_eq!(model.entities().len(), 2);
        assert!(!model.contains_entity("Missing"));
        assert!(model.capabilities().has("A", "b()"));
        assert!(model.capabilities().has("B", "a()"));
    }
}
