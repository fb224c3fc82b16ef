//! Configuration types for Plumbline audits.
//!
//! All types implement [`serde::Deserialize`] so they can be loaded from a
//! TOML file. Every field is optional; missing fields take the defaults
//! shown below.
//!
//! ```toml
//! [source]
//! constructor = "__init__"
//!
//! [diagram]
//! edge_constructor = "Edge"
//! label_keyword = "label"
//! inheritance_label = "inherits"
//! scope_constructors = ["Diagram", "Cluster"]
//! ```
//!
//! # Example
//!
//! ```
//! # use plumbline::config::AppConfig;
//! let config = AppConfig::default();
//! assert_eq!(config.diagram().inheritance_label(), "inherits");
//! ```

use serde::Deserialize;

use plumbline_parser::{ExtractConfig, InterpretConfig};

/// Top-level configuration combining the source and diagram sections.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Source extraction section.
    #[serde(default)]
    source: SourceConfig,

    /// Diagram interpretation section.
    #[serde(default)]
    diagram: DiagramConfig,
}

impl AppConfig {
    pub fn new(source: SourceConfig, diagram: DiagramConfig) -> Self {
        Self { source, diagram }
    }

    pub fn source(&self) -> &SourceConfig {
        &self.source
    }

    pub fn diagram(&self) -> &DiagramConfig {
        &self.diagram
    }
}

/// How classes are read from application code.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Method name that is never reported as a capability.
    constructor: String,
}

impl SourceConfig {
    pub fn constructor(&self) -> &str {
        &self.constructor
    }

    pub(crate) fn extract_config(&self) -> ExtractConfig {
        ExtractConfig::new(&self.constructor)
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            constructor: ExtractConfig::default().constructor().to_string(),
        }
    }
}

/// How diagram specifications are interpreted.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DiagramConfig {
    edge_constructor: String,
    label_keyword: String,
    /// Edge label that marks inheritance instead of a capability.
    inheritance_label: String,
    /// Constructors that group nodes and never declare an entity.
    scope_constructors: Vec<String>,
}

impl DiagramConfig {
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

    pub(crate) fn interpret_config(&self) -> InterpretConfig {
        InterpretConfig::new()
            .with_edge_constructor(&self.edge_constructor)
            .with_label_keyword(&self.label_keyword)
            .with_inheritance_label(&self.inheritance_label)
            .with_scope_constructors(self.scope_constructors.iter().cloned())
    }
}

impl Default for DiagramConfig {
    fn default() -> Self {
        let defaults = InterpretConfig::default();
        Self {
            edge_constructor: defaults.edge_constructor().to_string(),
            label_keyword: defaults.label_keyword().to_string(),
            inheritance_label: defaults.inheritance_label().to_string(),
            scope_constructors: defaults.scope_constructors().to_vec(),
        }
    }
}
