//! Plumbline Core Types and Definitions
//!
//! This crate provides the foundational types shared by both model-building
//! engines of Plumbline. It includes:
//!
//! - **Model**: Entity names, capability labels, edges and the [`model::GraphModel`]
//! - **Registry**: Binding names to entities ([`registry::EntityRegistry`])
//! - **Inheritance**: Fixpoint propagation of capabilities ([`inheritance`] module)
//! - **Compare**: The consistency comparator ([`compare::compare`])

pub mod compare;
pub mod inheritance;
pub mod model;
pub mod registry;
