//! Resolution failures represented as data.
//!
//! Resolution never panics or errors for "not found" or "ambiguous".
//! Ambiguous names, dangling references and cyclic base types produce a
//! [`BadElement`] that carries its own diagnostics and can be inspected like
//! any other element.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use super::diagnostics::EdmError;
use super::elements::ElementKind;

/// Why an element is bad.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BadReason {
    /// The name matched more than one declaration.
    Ambiguous,
    /// The name matched nothing usable.
    Unresolved,
    /// The element takes part in a cyclic base-type chain.
    Cyclic,
}

/// A structurally present but semantically invalid element.
#[derive(Debug)]
pub struct BadElement {
    full_name: Arc<str>,
    kind: ElementKind,
    reason: BadReason,
    errors: Vec<EdmError>,
}

impl BadElement {
    pub fn new(
        full_name: impl Into<Arc<str>>,
        kind: ElementKind,
        reason: BadReason,
        errors: Vec<EdmError>,
    ) -> Self {
        Self {
            full_name: full_name.into(),
            kind,
            reason,
            errors,
        }
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// The kind of element that was looked up.
    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    pub fn reason(&self) -> BadReason {
        self.reason
    }

    pub fn errors(&self) -> &[EdmError] {
        &self.errors
    }

    pub fn is_ambiguous(&self) -> bool {
        self.reason == BadReason::Ambiguous
    }
}

/// Which elements a lookup considered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LookupScope {
    /// Only elements declared by the queried model.
    Declared,
    /// The model, its direct references and the core registry.
    All,
}

/// Category of lookup; each category has its own name space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LookupSpace {
    Type,
    Term,
    EntityContainer,
    /// Placeholder returned for an entity type's base type.
    EntityBaseType,
    /// Placeholder returned for a complex type's base type.
    ComplexBaseType,
    /// Target of a navigation property binding.
    NavigationTarget,
}

impl LookupSpace {
    /// Whether an element of `kind` lives in this name space.
    pub fn accepts(self, kind: ElementKind) -> bool {
        match self {
            Self::Type => kind.is_type(),
            Self::Term => kind == ElementKind::Term,
            Self::EntityContainer => kind == ElementKind::EntityContainer,
            Self::EntityBaseType => kind == ElementKind::EntityType,
            Self::ComplexBaseType => kind == ElementKind::ComplexType,
            Self::NavigationTarget => false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct CacheKey {
    scope: LookupScope,
    space: LookupSpace,
    reason: BadReason,
    name: Arc<str>,
}

/// Model-owned cache giving bad elements a stable identity.
///
/// Repeated lookups of the same ambiguous or dangling name return the same
/// `Arc`. Safe for concurrent readers of an immutable model.
#[derive(Debug, Default)]
pub struct BadElementCache {
    entries: RwLock<FxHashMap<CacheKey, Arc<BadElement>>>,
}

impl BadElementCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached element for the key or build and cache one.
    pub fn get_or_insert_with(
        &self,
        scope: LookupScope,
        space: LookupSpace,
        reason: BadReason,
        name: &str,
        build: impl FnOnce() -> BadElement,
    ) -> Arc<BadElement> {
        let key = CacheKey {
            scope,
            space,
            reason,
            name: Arc::from(name),
        };
        if let Some(existing) = self.entries.read().get(&key) {
            return Arc::clone(existing);
        }
        let mut entries = self.entries.write();
        Arc::clone(entries.entry(key).or_insert_with(|| Arc::new(build())))
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop every cached element. Called when a mutable model changes.
    pub fn clear(&mut self) {
        self.entries.get_mut().clear();
    }
}
