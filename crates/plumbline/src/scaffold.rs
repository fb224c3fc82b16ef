//! Diagram specification generation.
//!
//! [`Scaffold`] renders a [`SourceModel`] as a diagram specification that
//! agrees with it: one container per class, an inheritance edge per known
//! parent, an edge per inferred connection and a self loop per remaining
//! method the class declares itself. Inherited methods are left to the
//! inheritance edges.

use std::{collections::HashSet, fmt};

use indexmap::IndexMap;

use plumbline_core::model::EntityName;
use plumbline_parser::SourceModel;

use crate::config::DiagramConfig;

const PYTHON_KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if",
    "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try",
    "while", "with", "yield", "match", "case", "type",
];

/// Names the generated file defines itself.
const RESERVED_NAMES: &[&str] = &["graph_attr"];

/// `HTTPServer` -> `http_server`, `DogV2` -> `dog_v2`.
fn snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let boundary = prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next_is_lower);
            if prev != '_' && boundary {
                out.push('_');
            }
        }
        out.extend(c.to_lowercase());
    }
    out
}

/// Escapes text for a double-quoted Python string literal.
fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

/// A diagram specification generated from a source model.
pub struct Scaffold<'a> {
    title: &'a str,
    model: &'a SourceModel,
    config: &'a DiagramConfig,
    variables: IndexMap<EntityName, String>,
}

impl<'a> Scaffold<'a> {
    pub fn new(model: &'a SourceModel, config: &'a DiagramConfig, title: &'a str) -> Self {
        let mut used: HashSet<String> = RESERVED_NAMES.iter().map(|s| s.to_string()).collect();
        let mut variables = IndexMap::new();

        for class in model.classes() {
            let mut base = snake_case(class.name().as_str());
            if PYTHON_KEYWORDS.contains(&base.as_str()) {
                base.push('_');
            }
            let mut candidate = base.clone();
            let mut suffix = 2;
            while used.contains(&candidate) {
                candidate = format!("{base}_{suffix}");
                suffix += 1;
            }
            used.insert(candidate.clone());
            variables.insert(class.name().clone(), candidate);
        }

        Self {
            title,
            model,
            config,
            variables,
        }
    }

    /// Variable bound to each class, in declaration order.
    pub fn variables(&self) -> &IndexMap<EntityName, String> {
        &self.variables
    }

    /// Renders a connection target: a variable, or a list of them.
    fn targets(&self, targets: &[EntityName]) -> Option<String> {
        let variables: Vec<&str> = targets
            .iter()
            .filter_map(|target| self.variables.get(target))
            .map(String::as_str)
            .collect();
        match variables.as_slice() {
            [] => None,
            [single] => Some((*single).to_string()),
            many => Some(format!("[{}]", many.join(", "))),
        }
    }

    fn edge(&self, f: &mut fmt::Formatter<'_>, from: &str, label: &str, to: &str) -> fmt::Result {
        writeln!(
            f,
            "    {from} >> {}({}={}) >> {to}",
            self.config.edge_constructor(),
            self.config.label_keyword(),
            quote(label)
        )
    }
}

impl fmt::Display for Scaffold<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "from diagrams import Diagram, {}", self.config.edge_constructor())?;
        writeln!(f, "from diagrams.c4 import Container")?;
        writeln!(f)?;
        writeln!(f, "graph_attr = {{\"splines\": \"polyline\"}}")?;
        writeln!(f)?;
        writeln!(
            f,
            "with Diagram({}, direction=\"LR\", show=False, graph_attr=graph_attr):",
            quote(self.title)
        )?;

        if self.variables.is_empty() {
            return writeln!(f, "    pass");
        }

        for (class, variable) in &self.variables {
            writeln!(f, "    {variable} = Container({})", quote(class.as_str()))?;
        }

        let inherits: Vec<(&String, &String)> = self
            .model
            .classes()
            .flat_map(|class| {
                let child = &self.variables[class.name()];
                class
                    .parents()
                    .iter()
                    .filter_map(|parent| self.variables.get(parent))
                    .map(move |parent| (child, parent))
            })
            .collect();
        if !inherits.is_empty() {
            writeln!(f)?;
        }
        for (child, parent) in inherits {
            self.edge(f, child, self.config.inheritance_label(), parent)?;
        }

        let mut connected = HashSet::new();
        let mut wrote_header = false;
        for connection in self.model.connections() {
            let Some(from) = self.variables.get(connection.source()) else {
                continue;
            };
            let Some(to) = self.targets(connection.targets()) else {
                continue;
            };
            if !wrote_header {
                writeln!(f)?;
                wrote_header = true;
            }
            self.edge(f, from, connection.capability().as_str(), &to)?;
            connected.insert((connection.source(), connection.capability()));
        }

        let mut wrote_header = false;
        for class in self.model.classes() {
            let variable = &self.variables[class.name()];
            for method in class.methods() {
                if connected.contains(&(class.name(), method)) {
                    continue;
                }
                if !wrote_header {
                    writeln!(f)?;
                    wrote_header = true;
                }
                self.edge(f, variable, method.as_str(), variable)?;
            }
        }
        Ok(())
    }
}
