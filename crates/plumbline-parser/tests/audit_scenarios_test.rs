//! End-to-end audits through the parser crate.
//!
//! Each test extracts a code model and interprets a diagram model from
//! source text, then compares them.

use plumbline_core::{compare::compare, model::EntityName};
use plumbline_parser::{
    ExtractConfig, InterpretConfig, analyze_diagram, analyze_source, error::ErrorCode,
};

fn audit(code: &str, diagram: &str) -> plumbline_core::compare::Discrepancies {
    let source = analyze_source(code, &ExtractConfig::default());
    assert!(!source.has_errors(), "code should parse: {:?}", source.diagnostics());
    let diagram = analyze_diagram(diagram, &InterpretConfig::default());
    assert!(!diagram.has_errors(), "diagram should parse: {:?}", diagram.diagnostics());
    compare(&source.output().resolve(), diagram.output())
}

#[test]
fn test_self_loop_matches_method() {
    let discrepancies = audit(
        "class Car:\n    def drive(self):\n        pass\n",
        r#"
from diagrams import Diagram, Edge
from diagrams.c4 import Container

with Diagram("Cars", show=False):
    car = Container("Car")
    car >> Edge(label="drive()") >> car
"#,
    );
    assert!(discrepancies.is_consistent(), "{discrepancies}");
}

#[test]
fn test_inheritance_on_both_sides() {
    let discrepancies = audit(
        r#"
class Animal:
    def speak(self):
        ...

class Dog(Animal):
    pass
"#,
        r#"
dog = Container("Dog")
animal = Container("Animal")
dog >> Edge(label="inherits") >> animal
animal >> Edge(label="speak()") >> animal
"#,
    );
    assert!(discrepancies.is_consistent(), "{discrepancies}");
}

#[test]
fn test_ghost_entity_is_missing_from_code() {
    let discrepancies = audit(
        "class Car:\n    pass\n",
        "car = Container(\"Car\")\nghost = Container(\"Ghost\")\n",
    );
    let missing: Vec<&EntityName> = discrepancies.missing_entities().iter().collect();
    assert_eq!(missing, vec![&EntityName::new("Ghost")]);
    assert!(discrepancies.extra_entities().is_empty());
}

#[test]
fn test_undocumented_method_is_extra() {
    let discrepancies = audit(
        "class Car:\n    def drive(self): pass\n    def honk(self): pass\n",
        "car = Container(\"Car\")\ncar >> Edge(label=\"drive()\") >> car\ncar >> Edge(label=\"fly()\") >> car\n",
    );
    assert_eq!(discrepancies.count(), 2);
    assert!(discrepancies.extra_capabilities()["Car"].iter().any(|c| c.as_str() == "honk()"));
    assert!(discrepancies.missing_capabilities()["Car"].iter().any(|c| c.as_str() == "fly()"));
}

#[test]
fn test_loop_relationships_count_as_capabilities() {
    let discrepancies = audit(
        r#"
class S1:
    def store(self): pass
class S2:
    def store(self): pass
class S3:
    def store(self): pass
class DB:
    pass
"#,
        r#"
s1 = Container("S1")
s2 = Container("S2")
s3 = Container("S3")
db = Database("DB")
for s in [s1, s2, s3]:
    s >> Edge(label="store()") >> [db]
"#,
    );
    assert!(discrepancies.is_consistent(), "{discrepancies}");
}

#[test]
fn test_undeclared_binding_does_not_stop_interpretation() {
    let analysis = analyze_diagram(
        r#"
db = Database("DB")
x >> Edge(label="query()") >> db
api = Container("API")
api >> Edge(label="query()") >> db
"#,
        &InterpretConfig::default(),
    );
    let codes: Vec<_> = analysis.diagnostics().iter().filter_map(|d| d.code()).collect();
    assert_eq!(codes, vec![ErrorCode::E200]);

    let model = analysis.output();
    assert_eq!(model.edges().len(), 1);
    assert!(model.capabilities().has("API", "query()"));
    assert!(!model.contains_entity("x"));
}

#[test]
fn test_unparsable_diagram_reports_everything_as_extra() {
    let source = analyze_source("class Car:\n    def drive(self): pass\n", &ExtractConfig::default());
    let diagram = analyze_diagram("car = Container(\"Car\"\n", &InterpretConfig::default());
    assert!(diagram.has_errors());

    let discrepancies = compare(&source.output().resolve(), diagram.output());
    assert_eq!(discrepancies.extra_entities().len(), 1);
    assert!(discrepancies.missing_entities().is_empty());
}
