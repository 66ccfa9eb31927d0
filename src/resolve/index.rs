//! Name indexes over a model's own declarations.
//!
//! Both indexes store slots into the owning model's element or annotation
//! vector. The parsed representation builds them once after reading; the
//! builder representation updates them on every insertion.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::base::{qualify, split_qualified};
use crate::model::{SchemaElement, VocabularyAnnotation};

// ============================================================================
// SYMBOL INDEX
// ============================================================================

/// Full name → element slots, plus alias → namespace.
///
/// Several slots under one name is normal: overloads share a name, and
/// duplicate declarations are kept so the resolver can report them.
#[derive(Clone, Debug, Default)]
pub struct SymbolIndex {
    by_full_name: FxHashMap<Arc<str>, Vec<usize>>,
    /// Alias → namespace.
    aliases: FxHashMap<Arc<str>, Arc<str>>,
}

impl SymbolIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a slice of elements, slot = position in the slice.
    pub fn build(elements: &[SchemaElement]) -> Self {
        let mut index = Self::new();
        for (slot, element) in elements.iter().enumerate() {
            index.insert(slot, element);
        }
        index
    }

    /// Register one element under its full name and its alias.
    pub fn insert(&mut self, slot: usize, element: &SchemaElement) {
        let full_name: Arc<str> = Arc::from(element.full_name());
        self.by_full_name.entry(full_name).or_default().push(slot);
        if let Some(alias) = &element.alias {
            self.add_alias(Arc::clone(alias), Arc::clone(&element.namespace));
        }
    }

    pub fn add_alias(&mut self, alias: Arc<str>, namespace: Arc<str>) {
        self.aliases.entry(alias).or_insert(namespace);
    }

    /// Namespace of `alias`, if registered.
    pub fn namespace_of(&self, alias: &str) -> Option<&Arc<str>> {
        self.aliases.get(alias)
    }

    /// Slots declared under `full_name`.
    ///
    /// A name whose namespace part is a known alias is looked up under the
    /// aliased namespace as well.
    pub fn lookup(&self, full_name: &str) -> Vec<usize> {
        let mut slots = self
            .by_full_name
            .get(full_name)
            .cloned()
            .unwrap_or_default();
        let Some((prefix, name)) = split_qualified(full_name) else {
            return slots;
        };
        let Some(namespace) = self.aliases.get(prefix) else {
            return slots;
        };
        if **namespace == *prefix {
            return slots;
        }
        let translated = qualify(namespace, name);
        if let Some(more) = self.by_full_name.get(translated.as_str()) {
            for slot in more {
                if !slots.contains(slot) {
                    slots.push(*slot);
                }
            }
        }
        slots
    }

    /// Number of distinct full names.
    pub fn len(&self) -> usize {
        self.by_full_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_full_name.is_empty()
    }
}

// ============================================================================
// ANNOTATION INDEX
// ============================================================================

/// Target path → annotation slots, in declaration order.
#[derive(Clone, Debug, Default)]
pub struct AnnotationIndex {
    by_target: FxHashMap<Arc<str>, Vec<usize>>,
}

impl AnnotationIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build(annotations: &[VocabularyAnnotation]) -> Self {
        let mut index = Self::new();
        for (slot, annotation) in annotations.iter().enumerate() {
            index.insert(slot, annotation);
        }
        index
    }

    pub fn insert(&mut self, slot: usize, annotation: &VocabularyAnnotation) {
        self.by_target
            .entry(Arc::clone(&annotation.target))
            .or_default()
            .push(slot);
    }

    pub fn lookup(&self, target: &str) -> &[usize] {
        self.by_target
            .get(target)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
