//! Name resolution and the read-through indexes over a [`Model`].
//!
//! Everything here is a query: nothing is stored besides the per-model
//! [`BadElementCache`](crate::model::BadElementCache) that gives bad results
//! a stable identity.
//!
//! ```text
//! EdmModelExt (blanket over every Model)
//! ├── lookup      find_type / find_term / find_operations / find_entity_container
//! ├── structure   base_type, properties, key, partner, resolve_type_ref
//! ├── derived     find_directly_derived_types / find_all_derived_types
//! ├── binding     navigation sources and binding targets
//! ├── overload    operation signatures and imports
//! └── annotations declared / referenced / inherited vocabulary annotations
//! ```
//!
//! Lookup scope is non-transitive: a model sees its own declarations, the
//! declarations of its direct references, and the core `Edm` registry.

mod annotations;
mod binding;
mod derived;
mod index;
mod lookup;
mod overload;
mod structure;

use std::ptr;
use std::sync::Arc;

use thiserror::Error;

use crate::model::{
    BadElement, BadReason, EdmError, ElementKind, Model, NavigationProperty, OperationImport,
    PropertyDef, PropertyRef, SchemaElement, TypeRef, VocabularyAnnotation,
};

pub use binding::{NavigationSource, NavigationTarget};
pub use index::{AnnotationIndex, SymbolIndex};
pub use overload::OperationSignature;

// ============================================================================
// RESOLUTION
// ============================================================================

/// Outcome of a name lookup that found something.
///
/// "Nothing found" is `None` at the call site; a name that matched several
/// declarations, or matched nothing usable where something is required,
/// comes back as [`Resolution::Bad`].
#[derive(Clone, Debug)]
pub enum Resolution<'m> {
    Resolved(&'m SchemaElement),
    Bad(Arc<BadElement>),
}

impl<'m> Resolution<'m> {
    pub fn is_bad(&self) -> bool {
        matches!(self, Self::Bad(_))
    }

    /// The resolved element, `None` for bad results.
    pub fn element(&self) -> Option<&'m SchemaElement> {
        match self {
            Self::Resolved(element) => Some(*element),
            Self::Bad(_) => None,
        }
    }

    pub fn bad(&self) -> Option<&Arc<BadElement>> {
        match self {
            Self::Resolved(_) => None,
            Self::Bad(bad) => Some(bad),
        }
    }

    pub fn full_name(&self) -> String {
        match self {
            Self::Resolved(element) => element.full_name(),
            Self::Bad(bad) => bad.full_name().to_string(),
        }
    }

    pub fn kind(&self) -> ElementKind {
        match self {
            Self::Resolved(element) => element.kind(),
            Self::Bad(bad) => bad.kind(),
        }
    }

    /// Diagnostics carried by a bad result; empty for resolved elements.
    pub fn errors(&self) -> &[EdmError] {
        match self {
            Self::Resolved(_) => &[],
            Self::Bad(bad) => bad.errors(),
        }
    }

    /// Identity comparison.
    pub fn is_same(&self, other: &Resolution<'_>) -> bool {
        match (self, other) {
            (Self::Resolved(a), Resolution::Resolved(b)) => ptr::eq(*a, *b),
            (Self::Bad(a), Resolution::Bad(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Invalid arguments to a resolver query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("no element was given")]
    MissingElement,
    #[error("'{0}' does not resolve to an element")]
    Unresolved(String),
}

// ============================================================================
// EXTENSION TRAIT
// ============================================================================

/// Resolver and index queries available on every [`Model`].
pub trait EdmModelExt: Model {
    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    /// Type declared by this model, its direct references, or the core registry.
    fn find_type(&self, full_name: &str) -> Option<Resolution<'_>>;

    /// Type declared by this model only. Never returns core primitives.
    fn find_declared_type(&self, full_name: &str) -> Option<Resolution<'_>>;

    fn find_term(&self, full_name: &str) -> Option<Resolution<'_>>;

    fn find_declared_term(&self, full_name: &str) -> Option<Resolution<'_>>;

    /// The whole overload set named `full_name`, across direct references.
    fn find_operations(&self, full_name: &str) -> Vec<&SchemaElement>;

    fn find_declared_operations(&self, full_name: &str) -> Vec<&SchemaElement>;

    fn find_entity_container(&self, full_name: &str) -> Option<Resolution<'_>>;

    fn find_declared_entity_container(&self, full_name: &str) -> Option<Resolution<'_>>;

    /// The first entity container declared by this model.
    fn default_entity_container(&self) -> Option<&SchemaElement>;

    // ------------------------------------------------------------------
    // Structure
    // ------------------------------------------------------------------

    /// Resolved base type of a structured type.
    ///
    /// `None` when no base type is declared. Dangling, wrong-kind and cyclic
    /// base types come back as bad placeholders.
    fn base_type<'m>(&'m self, element: &'m SchemaElement) -> Option<Resolution<'m>>;

    /// True when following base types from `element` returns to it.
    fn is_in_base_type_cycle(&self, element: &SchemaElement) -> bool;

    /// Inherited and declared properties, base-most type first.
    fn properties<'m>(&'m self, element: &'m SchemaElement) -> Vec<&'m PropertyDef>;

    /// Own properties only.
    fn declared_properties<'e>(&self, element: &'e SchemaElement) -> &'e [PropertyDef];

    /// Property by name, searching the base-type chain.
    fn find_property<'m>(
        &'m self,
        element: &'m SchemaElement,
        name: &str,
    ) -> Option<&'m PropertyDef>;

    /// Key of an entity type, inherited from the nearest type declaring one.
    fn key<'m>(&'m self, element: &'m SchemaElement) -> &'m [PropertyRef];

    /// The type a reference points to; collections resolve to their items.
    fn resolve_type_ref(&self, type_ref: &TypeRef) -> Resolution<'_>;

    /// Entity type a navigation property points to.
    fn navigation_target_type(&self, navigation: &NavigationProperty) -> Resolution<'_>;

    /// The inverse navigation property named by `Partner`.
    fn partner<'m>(&'m self, navigation: &NavigationProperty) -> Option<&'m NavigationProperty>;

    // ------------------------------------------------------------------
    // Derived types
    // ------------------------------------------------------------------

    /// Types whose base type is `element`.
    fn find_directly_derived_types(&self, element: &SchemaElement) -> Vec<&SchemaElement>;

    /// Transitive closure of [`find_directly_derived_types`](Self::find_directly_derived_types).
    fn find_all_derived_types(&self, element: &SchemaElement) -> Vec<&SchemaElement>;

    // ------------------------------------------------------------------
    // Container bindings
    // ------------------------------------------------------------------

    /// Entity set or singleton `name` in container `container` or one it extends.
    fn find_navigation_source(&self, container: &str, name: &str) -> Option<NavigationSource<'_>>;

    /// Entity type of a navigation source.
    fn navigation_source_type(&self, source: &NavigationSource<'_>) -> Resolution<'_>;

    /// Target bound to `navigation`, declared on `owner`, for `source`.
    fn find_navigation_target<'m>(
        &'m self,
        source: &NavigationSource<'m>,
        owner: &SchemaElement,
        navigation: &NavigationProperty,
    ) -> NavigationTarget<'m>;

    /// Target bound to the binding path `path` of `source`.
    fn find_navigation_target_by_path<'m>(
        &'m self,
        source: &NavigationSource<'m>,
        path: &str,
    ) -> NavigationTarget<'m>;

    // ------------------------------------------------------------------
    // Overloads
    // ------------------------------------------------------------------

    /// The overload of `full_name` whose parameters match `signature`.
    fn find_operation(&self, full_name: &str, signature: &OperationSignature)
    -> Option<&SchemaElement>;

    /// Operation imports named `name` in `container` and the containers it extends.
    fn find_operation_imports<'m>(
        &'m self,
        container: &'m SchemaElement,
        name: &str,
    ) -> Vec<&'m OperationImport>;

    /// Unbound operations an import refers to.
    fn find_imported_operations(&self, import: &OperationImport) -> Vec<&SchemaElement>;

    // ------------------------------------------------------------------
    // Annotations
    // ------------------------------------------------------------------

    /// Annotations this model declares for `target`.
    fn find_declared_vocabulary_annotations(&self, target: &str) -> Vec<&VocabularyAnnotation>;

    /// Declared annotations plus those direct references declare for `target`.
    fn find_vocabulary_annotations(&self, target: &str) -> Vec<&VocabularyAnnotation>;

    /// Annotations with term `term` (full or alias-qualified name).
    fn find_vocabulary_annotations_for_term(
        &self,
        target: &str,
        term: &str,
        qualifier: Option<&str>,
    ) -> Vec<&VocabularyAnnotation>;

    /// Annotations using the term element `term`.
    fn find_vocabulary_annotations_for_term_element(
        &self,
        target: &str,
        term: &SchemaElement,
        qualifier: Option<&str>,
    ) -> Vec<&VocabularyAnnotation>;

    /// Annotations on `element` and every type up its base-type chain.
    ///
    /// Fails for a missing or unresolvable element.
    fn find_vocabulary_annotations_including_inherited<'m>(
        &'m self,
        element: Option<&Resolution<'m>>,
    ) -> Result<Vec<&'m VocabularyAnnotation>, ResolveError>;

    /// The term an annotation uses.
    fn annotation_term(&self, annotation: &VocabularyAnnotation) -> Resolution<'_>;

    // ------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------

    /// Every semantic diagnostic of this model, in declaration order.
    fn validate(&self) -> Vec<EdmError>;

    /// Diagnostics attributable to one element.
    fn element_errors(&self, element: &SchemaElement) -> Vec<EdmError>;
}

impl<M: Model + ?Sized> EdmModelExt for M {
    fn find_type(&self, full_name: &str) -> Option<Resolution<'_>> {
        lookup::find_type(self, full_name, true)
    }

    fn find_declared_type(&self, full_name: &str) -> Option<Resolution<'_>> {
        lookup::find_type(self, full_name, false)
    }

    fn find_term(&self, full_name: &str) -> Option<Resolution<'_>> {
        lookup::find_term(self, full_name, true)
    }

    fn find_declared_term(&self, full_name: &str) -> Option<Resolution<'_>> {
        lookup::find_term(self, full_name, false)
    }

    fn find_operations(&self, full_name: &str) -> Vec<&SchemaElement> {
        lookup::find_operations(self, full_name, true)
    }

    fn find_declared_operations(&self, full_name: &str) -> Vec<&SchemaElement> {
        lookup::find_operations(self, full_name, false)
    }

    fn find_entity_container(&self, full_name: &str) -> Option<Resolution<'_>> {
        lookup::find_entity_container(self, full_name, true)
    }

    fn find_declared_entity_container(&self, full_name: &str) -> Option<Resolution<'_>> {
        lookup::find_entity_container(self, full_name, false)
    }

    fn default_entity_container(&self) -> Option<&SchemaElement> {
        self.schema_elements()
            .iter()
            .find(|element| element.kind() == ElementKind::EntityContainer)
    }

    fn base_type<'m>(&'m self, element: &'m SchemaElement) -> Option<Resolution<'m>> {
        structure::base_type(self, element)
    }

    fn is_in_base_type_cycle(&self, element: &SchemaElement) -> bool {
        structure::in_base_type_cycle(self, element)
    }

    fn properties<'m>(&'m self, element: &'m SchemaElement) -> Vec<&'m PropertyDef> {
        structure::properties(self, element)
    }

    fn declared_properties<'e>(&self, element: &'e SchemaElement) -> &'e [PropertyDef] {
        element
            .as_structured_type()
            .map(|ty| ty.declared_properties())
            .unwrap_or(&[])
    }

    fn find_property<'m>(
        &'m self,
        element: &'m SchemaElement,
        name: &str,
    ) -> Option<&'m PropertyDef> {
        structure::find_property(self, element, name)
    }

    fn key<'m>(&'m self, element: &'m SchemaElement) -> &'m [PropertyRef] {
        structure::key(self, element)
    }

    fn resolve_type_ref(&self, type_ref: &TypeRef) -> Resolution<'_> {
        structure::resolve_type_ref(self, type_ref)
    }

    fn navigation_target_type(&self, navigation: &NavigationProperty) -> Resolution<'_> {
        structure::navigation_target_type(self, navigation)
    }

    fn partner<'m>(&'m self, navigation: &NavigationProperty) -> Option<&'m NavigationProperty> {
        structure::partner(self, navigation)
    }

    fn find_directly_derived_types(&self, element: &SchemaElement) -> Vec<&SchemaElement> {
        derived::directly_derived(self, element)
    }

    fn find_all_derived_types(&self, element: &SchemaElement) -> Vec<&SchemaElement> {
        derived::all_derived(self, element)
    }

    fn find_navigation_source(&self, container: &str, name: &str) -> Option<NavigationSource<'_>> {
        binding::find_source(self, container, name)
    }

    fn navigation_source_type(&self, source: &NavigationSource<'_>) -> Resolution<'_> {
        binding::source_type(self, source)
    }

    fn find_navigation_target<'m>(
        &'m self,
        source: &NavigationSource<'m>,
        owner: &SchemaElement,
        navigation: &NavigationProperty,
    ) -> NavigationTarget<'m> {
        binding::find_target(self, source, owner, navigation)
    }

    fn find_navigation_target_by_path<'m>(
        &'m self,
        source: &NavigationSource<'m>,
        path: &str,
    ) -> NavigationTarget<'m> {
        binding::find_target_by_path(self, source, path)
    }

    fn find_operation(
        &self,
        full_name: &str,
        signature: &OperationSignature,
    ) -> Option<&SchemaElement> {
        overload::find_operation(self, full_name, signature)
    }

    fn find_operation_imports<'m>(
        &'m self,
        container: &'m SchemaElement,
        name: &str,
    ) -> Vec<&'m OperationImport> {
        overload::find_imports(self, container, name)
    }

    fn find_imported_operations(&self, import: &OperationImport) -> Vec<&SchemaElement> {
        overload::imported_operations(self, import)
    }

    fn find_declared_vocabulary_annotations(&self, target: &str) -> Vec<&VocabularyAnnotation> {
        self.declared_annotations(target)
    }

    fn find_vocabulary_annotations(&self, target: &str) -> Vec<&VocabularyAnnotation> {
        annotations::find(self, target)
    }

    fn find_vocabulary_annotations_for_term(
        &self,
        target: &str,
        term: &str,
        qualifier: Option<&str>,
    ) -> Vec<&VocabularyAnnotation> {
        annotations::find_for_term(self, target, term, qualifier)
    }

    fn find_vocabulary_annotations_for_term_element(
        &self,
        target: &str,
        term: &SchemaElement,
        qualifier: Option<&str>,
    ) -> Vec<&VocabularyAnnotation> {
        annotations::find_for_term(self, target, &term.full_name(), qualifier)
    }

    fn find_vocabulary_annotations_including_inherited<'m>(
        &'m self,
        element: Option<&Resolution<'m>>,
    ) -> Result<Vec<&'m VocabularyAnnotation>, ResolveError> {
        annotations::find_including_inherited(self, element)
    }

    fn annotation_term(&self, annotation: &VocabularyAnnotation) -> Resolution<'_> {
        annotations::term_of(self, annotation)
    }

    fn validate(&self) -> Vec<EdmError> {
        crate::validation::validate(self)
    }

    fn element_errors(&self, element: &SchemaElement) -> Vec<EdmError> {
        crate::validation::element_errors(self, element)
    }
}

/// Same reference, compared by address.
pub(crate) fn same_element(a: &SchemaElement, b: &SchemaElement) -> bool {
    ptr::eq(a, b)
}

/// Build or reuse the placeholder for a name that resolved to nothing usable.
///
/// The placeholder is shared by every element referring to `name`, so
/// `error` describes the name only and carries no location.
pub(crate) fn unresolved_placeholder<M: Model + ?Sized>(
    model: &M,
    space: crate::model::LookupSpace,
    name: &str,
    kind: ElementKind,
    error: EdmError,
) -> Arc<BadElement> {
    model.bad_elements().get_or_insert_with(
        crate::model::LookupScope::All,
        space,
        BadReason::Unresolved,
        name,
        || BadElement::new(name, kind, BadReason::Unresolved, vec![error]),
    )
}
