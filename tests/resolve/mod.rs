//! Resolver tests
//!
//! - Name lookup across aliases, references and the core registry
//! - Ambiguity and cycle handling
//! - Overloads, bindings and annotation queries

mod tests_annotations;
mod tests_lookup;
mod tests_navigation;
