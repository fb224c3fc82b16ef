//! Diagram specification interpretation.
//!
//! The interpreter walks a parsed diagram specification once, collecting
//! entities, capabilities, edges and pending inheritance facts. Inheritance
//! is resolved only after the whole tree has been walked, so ancestors are
//! complete before their capabilities are copied forward.
//!
//! Supported statement forms:
//!
//! - `name = Ctor("Entity")` declares an entity and binds `name` to it
//! - `name = [a, b, "Entity"]` binds a collection
//! - `name = "text"` binds a constant usable as an edge label
//! - `a >> Edge(label="x()") >> b` (and `<<`) records relationships
//! - `for v in collection:` repeats relationships per element
//! - `with ...:` is transparent
//!
//! Everything else is skipped, with a warning where the author most likely
//! expected it to count.

use std::collections::HashMap;

use indexmap::IndexSet;
use log::{debug, trace};

use plumbline_core::{
    inheritance::{self, InheritanceFact},
    model::{Capability, Edge, EntityName, GraphModel},
    registry::{Binding, EntityRegistry},
};

use crate::{
    Analysis,
    error::{Diagnostic, DiagnosticCollector, ErrorCode},
    span::{Span, Spanned},
    syntax::{Assign, BinOp, Block, Call, Expr, ForLoop, Module, Statement},
};

/// Configuration for diagram interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterpretConfig {
    edge_constructor: String,
    label_keyword: String,
    inheritance_label: String,
    scope_constructors: Vec<String>,
}

impl InterpretConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the name of the call that marks an edge, `Edge` by default.
    pub fn with_edge_constructor(mut self, name: impl Into<String>) -> Self {
        self.edge_constructor = name.into();
        self
    }

    /// Sets the keyword argument that carries the edge label.
    pub fn with_label_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.label_keyword = keyword.into();
        self
    }

    /// Sets the reserved label that marks inheritance.
    pub fn with_inheritance_label(mut self, label: impl Into<String>) -> Self {
        self.inheritance_label = label.into();
        self
    }

    /// Sets the constructors that group nodes and never declare entities.
    pub fn with_scope_constructors<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scope_constructors = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn edge_constructor(&self) -> &str {
        &self.edge_constructor
    }

    pub fn label_keyword(&self) -> &str {
        &self.label_keyword
    }

    pub fn inheritance_label(&self) -> &str {
        &self.inheritance_label
    }

    pub fn scope_constructors(&self) -> &[String] {
        &self.scope_constructors
    }

    fn is_entity_constructor(&self, callee: &str) -> bool {
        callee != self.edge_constructor && !self.scope_constructors.iter().any(|s| s == callee)
    }
}

impl Default for InterpretConfig {
    fn default() -> Self {
        Self {
            edge_constructor: "Edge".to_string(),
            label_keyword: "label".to_string(),
            inheritance_label: "inherits".to_string(),
            scope_constructors: vec!["Diagram".to_string(), "Cluster".to_string()],
        }
    }
}

/// Right-hand side of an assignment after evaluation.
#[derive(Debug, Clone)]
enum Value {
    Binding(Binding),
    Constant(String),
}

/// A relationship chain flattened into operands and the operators between them.
struct Chain<'e, 'src> {
    operands: Vec<&'e Spanned<Expr<'src>>>,
    operators: Vec<BinOp>,
}

impl<'e, 'src> Chain<'e, 'src> {
    fn flatten(expr: &'e Spanned<Expr<'src>>) -> Self {
        let mut chain = Chain {
            operands: Vec::new(),
            operators: Vec::new(),
        };
        chain.push(expr);
        chain
    }

    fn push(&mut self, expr: &'e Spanned<Expr<'src>>) {
        match expr.inner() {
            Expr::BinOp {
                left,
                op: op @ (BinOp::RightShift | BinOp::LeftShift),
                right,
            } => {
                self.push(left);
                self.operators.push(*op);
                self.push(right);
            }
            _ => self.operands.push(expr),
        }
    }
}

fn is_relationship(expr: &Expr<'_>) -> bool {
    matches!(
        expr,
        Expr::BinOp {
            op: BinOp::RightShift | BinOp::LeftShift,
            ..
        }
    )
}

/// Interpretation context for one diagram specification.
struct Interpreter<'a> {
    config: &'a InterpretConfig,
    registry: EntityRegistry,
    constants: HashMap<String, String>,
    model: GraphModel,
    facts: IndexSet<InheritanceFact>,
    diagnostics: DiagnosticCollector,
}

impl<'a> Interpreter<'a> {
    fn new(config: &'a InterpretConfig) -> Self {
        Self {
            config,
            registry: EntityRegistry::new(),
            constants: HashMap::new(),
            model: GraphModel::new(),
            facts: IndexSet::new(),
            diagnostics: DiagnosticCollector::new(),
        }
    }

    fn visit_statements(&mut self, statements: &[Statement<'_>]) {
        for statement in statements {
            self.visit_statement(statement);
        }
    }

    fn visit_statement(&mut self, statement: &Statement<'_>) {
        match statement {
            Statement::Assign(assign) => self.assign(assign),
            Statement::Expr(expr) if is_relationship(expr.inner()) => self.relationship(expr),
            Statement::For(for_loop) => self.for_loop(for_loop),
            Statement::With(with) => self.visit_statements(&with.body),
            // A `with` whose header did not parse is still a scope.
            Statement::Block(block) if *block.keyword.inner() == "with" => {
                self.visit_statements(&block.body)
            }
            Statement::Block(block) => self.unsupported_block(block),
            Statement::Expr(_)
            | Statement::ClassDef(_)
            | Statement::FunctionDef(_)
            | Statement::Other(_) => {}
        }
    }

    // -- Declarations and bindings ------------------------------------------

    fn declare(&mut self, name: &str) -> EntityName {
        let entity = self.registry.declare(name);
        self.model.add_entity(entity.clone());
        entity
    }

    /// Declares the entity an entity constructor call names, if any.
    ///
    /// The name is the first positional string argument, or else the
    /// `name=` or `label=` keyword.
    fn constructor_entity(&mut self, call: &Call<'_>) -> Option<EntityName> {
        let callee = call.callee()?;
        if !self.config.is_entity_constructor(callee) {
            return None;
        }
        let name = call
            .args
            .iter()
            .find_map(|arg| arg.as_str())
            .or_else(|| call.keyword("name").and_then(|value| value.as_str()))
            .or_else(|| call.keyword("label").and_then(|value| value.as_str()))?
            .to_string();
        Some(self.declare(&name))
    }

    fn bind(&mut self, name: &str, value: Value) {
        trace!(name; "Binding name");
        match value {
            Value::Binding(binding) => {
                self.constants.remove(name);
                self.registry.bind(name, binding);
            }
            Value::Constant(text) => {
                self.registry.unbind(name);
                self.constants.insert(name.to_string(), text);
            }
        }
    }

    fn unbind(&mut self, name: &str) {
        self.registry.unbind(name);
        self.constants.remove(name);
    }

    fn assign(&mut self, assign: &Assign<'_>) {
        let value = self.evaluate(&assign.value);
        for target in &assign.targets {
            // Attribute, subscript and tuple targets bind nothing we track.
            let Some(name) = target.as_name() else {
                continue;
            };
            match &value {
                Some(value) => self.bind(name, value.clone()),
                None => self.unbind(name),
            }
        }
    }

    fn evaluate(&mut self, value: &Spanned<Expr<'_>>) -> Option<Value> {
        match value.inner() {
            Expr::Call(call) => self
                .constructor_entity(call)
                .map(|entity| Value::Binding(Binding::Entity(entity))),
            Expr::List(items) | Expr::Tuple(items) => Some(Value::Binding(Binding::Collection(
                self.collection_members(items),
            ))),
            Expr::Str(text) => Some(Value::Constant(text.clone())),
            Expr::Name(other) => self.alias(other, value.span()),
            Expr::BinOp { .. } if is_relationship(value.inner()) => {
                self.relationship(value);
                None
            }
            _ => None,
        }
    }

    /// `a = b`: copy whatever `b` is bound to.
    fn alias(&mut self, other: &str, span: Span) -> Option<Value> {
        if let Some(binding) = self.registry.lookup(other) {
            return Some(Value::Binding(binding.clone()));
        }
        if let Some(text) = self.constants.get(other) {
            return Some(Value::Constant(text.clone()));
        }
        if !matches!(other, "True" | "False" | "None") {
            self.undefined_binding(other, span);
        }
        None
    }

    /// Entities of a collection literal: bound names are spliced in order,
    /// string literals and constructor calls declare entities.
    fn collection_members(&mut self, items: &[Spanned<Expr<'_>>]) -> Vec<EntityName> {
        let mut members = Vec::new();
        for item in items {
            match item.inner() {
                Expr::Name(name) => members.extend(self.lookup_entities(name, item.span())),
                Expr::Str(name) => members.push(self.declare(name)),
                Expr::Call(call) => members.extend(self.constructor_entity(call)),
                _ => {}
            }
        }
        members
    }

    fn lookup_entities(&mut self, name: &str, span: Span) -> Vec<EntityName> {
        match self.registry.lookup(name) {
            Some(binding) => binding.entities().to_vec(),
            None => {
                self.unresolved_entity(name, span);
                Vec::new()
            }
        }
    }

    // -- Relationships -------------------------------------------------------

    /// Entities a relationship operand stands for.
    fn resolve_operand(&mut self, operand: &Spanned<Expr<'_>>) -> Vec<EntityName> {
        match operand.inner() {
            Expr::Name(name) => self.lookup_entities(name, operand.span()),
            Expr::List(items) | Expr::Tuple(items) => self.collection_members(items),
            Expr::Call(call) => self.constructor_entity(call).into_iter().collect(),
            _ => Vec::new(),
        }
    }

    fn edge_call<'e, 'src>(&self, operand: &'e Spanned<Expr<'src>>) -> Option<&'e Call<'src>> {
        operand
            .as_call()
            .filter(|call| call.callee() == Some(self.config.edge_constructor()))
    }

    /// The label of an edge call, through at most one named constant.
    fn edge_label(&mut self, call: &Call<'_>) -> Option<Capability> {
        let value = call.keyword(self.config.label_keyword())?;
        let resolved = match value.inner() {
            Expr::Str(text) => Some(text.clone()),
            Expr::Name(name) => self.constants.get(*name).cloned(),
            _ => None,
        };
        if resolved.is_none() {
            self.diagnostics.emit(
                Diagnostic::warning("edge label cannot be resolved")
                    .with_code(ErrorCode::E203)
                    .with_label(value.span(), ErrorCode::E203.description())
                    .with_help("use a string literal or a name bound to a string literal"),
            );
        }
        resolved.map(Capability::new)
    }

    /// Interprets a `>>` / `<<` chain.
    ///
    /// In `a >> Edge(label=L) >> b >> Edge(label=M) >> c` the relationships
    /// are (a, L, b) and (b, M, c); the operator after each edge call sets
    /// its direction. Adjacent nodes with no edge call relate nothing.
    fn relationship(&mut self, expr: &Spanned<Expr<'_>>) {
        let chain = Chain::flatten(expr);

        let mut index = 0;
        while index + 1 < chain.operands.len() {
            let Some(edge) = self.edge_call(chain.operands[index + 1]) else {
                index += 1;
                continue;
            };
            if let (Some(target), Some(op)) = (
                chain.operands.get(index + 2),
                chain.operators.get(index + 1),
            ) {
                if let Some(label) = self.edge_label(edge) {
                    let sources = self.resolve_operand(chain.operands[index]);
                    let targets = self.resolve_operand(target);
                    self.broadcast(&sources, &label, &targets, *op);
                }
            }
            index += 2;
        }
    }

    /// Records every (source, target) pair of the Cartesian product.
    fn broadcast(
        &mut self,
        left: &[EntityName],
        label: &Capability,
        right: &[EntityName],
        op: BinOp,
    ) {
        for l in left {
            for r in right {
                match op {
                    BinOp::LeftShift => self.record(r, label, l),
                    _ => self.record(l, label, r),
                }
            }
        }
    }

    fn record(&mut self, source: &EntityName, label: &Capability, target: &EntityName) {
        if label.as_str() == self.config.inheritance_label() {
            if source != target {
                self.facts
                    .insert(InheritanceFact::new(source.clone(), target.clone()));
            }
            return;
        }

        if source == target {
            self.model.add_capability(source, label.clone());
            return;
        }

        self.model
            .add_edge(Edge::new(source.clone(), label.clone(), target.clone()));
        self.model.add_capability(source, label.clone());
    }

    // -- Loops and blocks ----------------------------------------------------

    fn for_loop(&mut self, for_loop: &ForLoop<'_>) {
        let Some(variable) = for_loop.target.as_name() else {
            self.diagnostics.emit(
                Diagnostic::warning("loop target is not supported")
                    .with_code(ErrorCode::E202)
                    .with_label(for_loop.target.span(), ErrorCode::E202.description())
                    .with_help("loop over entities with a single name, e.g. `for service in services:`"),
            );
            return;
        };
        let Some(elements) = self.iteration_elements(&for_loop.iter) else {
            return;
        };

        let previous_binding = self.registry.unbind(variable);
        let previous_constant = self.constants.remove(variable);

        trace!(variable, elements = elements.len(); "Interpreting loop");
        for element in elements {
            self.registry.bind(variable, Binding::Entity(element));
            for statement in &for_loop.body {
                self.loop_statement(statement);
            }
        }

        self.registry.unbind(variable);
        if let Some(binding) = previous_binding {
            self.registry.bind(variable, binding);
        }
        if let Some(text) = previous_constant {
            self.constants.insert(variable.to_string(), text);
        }
    }

    /// The entities a loop visits, or `None` after reporting why there are none.
    fn iteration_elements(&mut self, iter: &Spanned<Expr<'_>>) -> Option<Vec<EntityName>> {
        match iter.inner() {
            Expr::List(items) | Expr::Tuple(items) => Some(self.collection_members(items)),
            Expr::Name(name) => match self.registry.lookup(name) {
                Some(Binding::Collection(entities)) => Some(entities.clone()),
                Some(Binding::Entity(_)) => {
                    self.not_a_collection(iter.span());
                    None
                }
                None => {
                    self.unresolved_entity(name, iter.span());
                    None
                }
            },
            _ => {
                self.not_a_collection(iter.span());
                None
            }
        }
    }

    fn not_a_collection(&mut self, span: Span) {
        self.diagnostics.emit(
            Diagnostic::warning("loop does not iterate over a collection of entities")
                .with_code(ErrorCode::E201)
                .with_label(span, ErrorCode::E201.description())
                .with_help("iterate over a list of bindings or a name bound to one"),
        );
    }

    fn loop_statement(&mut self, statement: &Statement<'_>) {
        match statement {
            Statement::Expr(expr) if is_relationship(expr.inner()) => self.relationship(expr),
            other => self.diagnostics.emit(
                Diagnostic::warning("only relationships are interpreted inside a loop")
                    .with_code(ErrorCode::E204)
                    .with_label(other.span(), ErrorCode::E204.description())
                    .with_help("move this statement out of the loop"),
            ),
        }
    }

    fn unsupported_block(&mut self, block: &Block<'_>) {
        self.diagnostics.emit(
            Diagnostic::warning(format!(
                "`{}` statements are not interpreted",
                block.keyword.inner()
            ))
            .with_code(ErrorCode::E205)
            .with_label(block.keyword.span(), ErrorCode::E205.description())
            .with_help("declarations and relationships inside this block are ignored"),
        );
    }

    /// Reports a name used where entities are expected but bound to none.
    fn unresolved_entity(&mut self, name: &str, span: Span) {
        if !self.constants.contains_key(name) {
            self.undefined_binding(name, span);
            return;
        }
        self.diagnostics.emit(
            Diagnostic::warning(format!("`{name}` is bound to a constant, not an entity"))
                .with_code(ErrorCode::E200)
                .with_label(span, "constant used as an entity")
                .with_help(format!(
                    "bind `{name}` to an entity, e.g. `{name} = Container(\"Name\")`"
                )),
        );
    }

    fn undefined_binding(&mut self, name: &str, span: Span) {
        self.diagnostics.emit(
            Diagnostic::warning(format!("binding `{name}` is not declared"))
                .with_code(ErrorCode::E200)
                .with_label(span, "undeclared binding")
                .with_help(format!(
                    "declare `{name}` before using it, e.g. `{name} = Container(\"Name\")`"
                )),
        );
    }

    fn finish(mut self) -> Analysis<GraphModel> {
        let facts: Vec<InheritanceFact> = self.facts.iter().cloned().collect();
        let inherited = inheritance::resolve_model(&mut self.model, &facts);
        debug!(
            entities = self.model.entities().len(),
            edges = self.model.edges().len(),
            inheritance_facts = self.facts.len(),
            inherited;
            "Diagram interpreted"
        );
        Analysis::new(self.model, self.diagnostics.into_diagnostics())
    }
}

/// Interprets a parsed diagram specification into a graph model.
///
/// Never fails: unsupported constructs and undeclared names produce
/// warnings and are skipped.
pub fn interpret_diagram(module: &Module<'_>, config: &InterpretConfig) -> Analysis<GraphModel> {
    let mut interpreter = Interpreter::new(config);
    interpreter.visit_statements(&module.statements);
    interpreter.finish()
}
