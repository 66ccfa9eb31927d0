//! The builder representation: a mutable model assembled through code.
//!
//! Insertion always succeeds structurally. Duplicate names, dangling
//! references and cycles are allowed here and surface later through the
//! resolver (as bad elements) and through `validate()`.
//!
//! ```text
//! let mut model = EdmModel::new();
//! let customer = model.add_entity_type("NS", "Customer", StructuredType::new());
//! let order = model.add_entity_type("NS", "Order", StructuredType::new());
//! model.add_bidirectional_navigation(
//!     customer, NavigationEnd::many("Orders"),
//!     order, NavigationEnd::single("Customer"),
//! )?;
//! ```
//!
//! The builder is not meant to be mutated while other threads read it; every
//! mutation takes `&mut self` and clears the bad-element cache.

use std::sync::Arc;

use indexmap::IndexMap;
use thiserror::Error;
use tracing::debug;

use crate::model::{
    BadElementCache, Definition, ElementKind, EntityContainer, EnumType, Model, NavigationProperty,
    OnDeleteAction, Operation, OperationKind, ReferentialConstraint, SchemaElement,
    SchemaReference, StructuralProperty, StructuredType, Term, TypeDefinition, TypeRef,
    VocabularyAnnotation,
};
use crate::resolve::{AnnotationIndex, SymbolIndex};

/// Handle of an element inside one [`EdmModel`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(u32);

impl ElementId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Misuse of the builder API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("no element with id {0:?}")]
    UnknownElement(ElementId),
    #[error("'{name}' is a {actual}, expected {expected}")]
    WrongKind {
        name: String,
        expected: &'static str,
        actual: ElementKind,
    },
}

/// One side of a bidirectional navigation.
#[derive(Clone, Debug, PartialEq)]
pub struct NavigationEnd {
    pub name: Arc<str>,
    pub collection: bool,
    pub nullable: bool,
    pub contains_target: bool,
    pub on_delete: OnDeleteAction,
    pub referential_constraints: Vec<ReferentialConstraint>,
}

impl NavigationEnd {
    /// A single-valued, nullable end.
    pub fn single(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            collection: false,
            nullable: true,
            contains_target: false,
            on_delete: OnDeleteAction::None,
            referential_constraints: Vec::new(),
        }
    }

    /// A collection-valued end.
    pub fn many(name: impl Into<Arc<str>>) -> Self {
        Self {
            collection: true,
            nullable: false,
            ..Self::single(name)
        }
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn with_contains_target(mut self, contains_target: bool) -> Self {
        self.contains_target = contains_target;
        self
    }

    pub fn with_on_delete(mut self, on_delete: OnDeleteAction) -> Self {
        self.on_delete = on_delete;
        self
    }

    pub fn with_constraint(
        mut self,
        dependent: impl Into<Arc<str>>,
        principal: impl Into<Arc<str>>,
    ) -> Self {
        self.referential_constraints
            .push(ReferentialConstraint::new(dependent, principal));
        self
    }

    fn into_property(self, target_type: String, partner: Arc<str>) -> NavigationProperty {
        let type_ref = if self.collection {
            TypeRef::collection(TypeRef::named(target_type).with_nullable(false))
        } else {
            TypeRef::named(target_type).with_nullable(self.nullable)
        };
        NavigationProperty {
            name: self.name,
            type_ref,
            partner: Some(partner),
            contains_target: self.contains_target,
            referential_constraints: self.referential_constraints,
            on_delete: self.on_delete,
        }
    }
}

/// A model built programmatically.
#[derive(Debug, Default)]
pub struct EdmModel {
    elements: Vec<SchemaElement>,
    annotations: Vec<VocabularyAnnotation>,
    references: Vec<Arc<dyn Model>>,
    schema_references: Vec<SchemaReference>,
    /// Namespace → alias.
    aliases: IndexMap<Arc<str>, Arc<str>>,
    symbols: SymbolIndex,
    annotation_index: AnnotationIndex,
    bad_elements: BadElementCache,
}

impl EdmModel {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // ELEMENTS
    // ========================================================================

    /// Add any element. Never fails; duplicates are reported by validation.
    pub fn add_element(&mut self, mut element: SchemaElement) -> ElementId {
        if element.alias.is_none() {
            element.alias = self.aliases.get(&element.namespace).cloned();
        } else if let Some(alias) = &element.alias {
            self.aliases
                .entry(Arc::clone(&element.namespace))
                .or_insert_with(|| Arc::clone(alias));
        }
        let slot = self.elements.len();
        self.symbols.insert(slot, &element);
        self.elements.push(element);
        self.bad_elements.clear();
        ElementId(slot as u32)
    }

    pub fn add_entity_type(
        &mut self,
        namespace: impl Into<Arc<str>>,
        name: impl Into<Arc<str>>,
        body: StructuredType,
    ) -> ElementId {
        self.add_element(SchemaElement::new(namespace, name, Definition::EntityType(body)))
    }

    pub fn add_complex_type(
        &mut self,
        namespace: impl Into<Arc<str>>,
        name: impl Into<Arc<str>>,
        body: StructuredType,
    ) -> ElementId {
        self.add_element(SchemaElement::new(namespace, name, Definition::ComplexType(body)))
    }

    pub fn add_enum_type(
        &mut self,
        namespace: impl Into<Arc<str>>,
        name: impl Into<Arc<str>>,
        body: EnumType,
    ) -> ElementId {
        self.add_element(SchemaElement::new(namespace, name, Definition::EnumType(body)))
    }

    pub fn add_type_definition(
        &mut self,
        namespace: impl Into<Arc<str>>,
        name: impl Into<Arc<str>>,
        body: TypeDefinition,
    ) -> ElementId {
        self.add_element(SchemaElement::new(namespace, name, Definition::TypeDefinition(body)))
    }

    pub fn add_term(
        &mut self,
        namespace: impl Into<Arc<str>>,
        name: impl Into<Arc<str>>,
        body: Term,
    ) -> ElementId {
        self.add_element(SchemaElement::new(namespace, name, Definition::Term(body)))
    }

    /// Add a function; the body's kind is forced to `Function`.
    pub fn add_function(
        &mut self,
        namespace: impl Into<Arc<str>>,
        name: impl Into<Arc<str>>,
        mut body: Operation,
    ) -> ElementId {
        body.kind = OperationKind::Function;
        self.add_element(SchemaElement::new(namespace, name, Definition::Operation(body)))
    }

    /// Add an action; the body's kind is forced to `Action`.
    pub fn add_action(
        &mut self,
        namespace: impl Into<Arc<str>>,
        name: impl Into<Arc<str>>,
        mut body: Operation,
    ) -> ElementId {
        body.kind = OperationKind::Action;
        body.is_composable = false;
        self.add_element(SchemaElement::new(namespace, name, Definition::Operation(body)))
    }

    pub fn add_entity_container(
        &mut self,
        namespace: impl Into<Arc<str>>,
        name: impl Into<Arc<str>>,
        body: EntityContainer,
    ) -> ElementId {
        self.add_element(SchemaElement::new(namespace, name, Definition::EntityContainer(body)))
    }

    pub fn element(&self, id: ElementId) -> Option<&SchemaElement> {
        self.elements.get(id.index())
    }

    fn definition_mut(&mut self, id: ElementId) -> Result<&mut SchemaElement, BuildError> {
        self.bad_elements.clear();
        self.elements
            .get_mut(id.index())
            .ok_or(BuildError::UnknownElement(id))
    }

    fn wrong_kind(element: &SchemaElement, expected: &'static str) -> BuildError {
        BuildError::WrongKind {
            name: element.full_name(),
            expected,
            actual: element.kind(),
        }
    }

    // ========================================================================
    // MUTABLE BODIES
    // ========================================================================

    pub fn structured_type_mut(
        &mut self,
        id: ElementId,
    ) -> Result<&mut StructuredType, BuildError> {
        let element = self.definition_mut(id)?;
        let mismatch = Self::wrong_kind(element, "structured type");
        match &mut element.definition {
            Definition::EntityType(ty) | Definition::ComplexType(ty) => Ok(ty),
            _ => Err(mismatch),
        }
    }

    pub fn enum_type_mut(&mut self, id: ElementId) -> Result<&mut EnumType, BuildError> {
        let element = self.definition_mut(id)?;
        let mismatch = Self::wrong_kind(element, "enum type");
        match &mut element.definition {
            Definition::EnumType(ty) => Ok(ty),
            _ => Err(mismatch),
        }
    }

    pub fn type_definition_mut(
        &mut self,
        id: ElementId,
    ) -> Result<&mut TypeDefinition, BuildError> {
        let element = self.definition_mut(id)?;
        let mismatch = Self::wrong_kind(element, "type definition");
        match &mut element.definition {
            Definition::TypeDefinition(ty) => Ok(ty),
            _ => Err(mismatch),
        }
    }

    pub fn term_mut(&mut self, id: ElementId) -> Result<&mut Term, BuildError> {
        let element = self.definition_mut(id)?;
        let mismatch = Self::wrong_kind(element, "term");
        match &mut element.definition {
            Definition::Term(term) => Ok(term),
            _ => Err(mismatch),
        }
    }

    pub fn operation_mut(&mut self, id: ElementId) -> Result<&mut Operation, BuildError> {
        let element = self.definition_mut(id)?;
        let mismatch = Self::wrong_kind(element, "operation");
        match &mut element.definition {
            Definition::Operation(op) => Ok(op),
            _ => Err(mismatch),
        }
    }

    pub fn container_mut(&mut self, id: ElementId) -> Result<&mut EntityContainer, BuildError> {
        let element = self.definition_mut(id)?;
        let mismatch = Self::wrong_kind(element, "entity container");
        match &mut element.definition {
            Definition::EntityContainer(container) => Ok(container),
            _ => Err(mismatch),
        }
    }

    // ========================================================================
    // PROPERTIES
    // ========================================================================

    pub fn add_structural_property(
        &mut self,
        owner: ElementId,
        property: StructuralProperty,
    ) -> Result<(), BuildError> {
        self.structured_type_mut(owner)?.properties.push(property.into());
        Ok(())
    }

    pub fn add_navigation_property(
        &mut self,
        owner: ElementId,
        property: NavigationProperty,
    ) -> Result<(), BuildError> {
        self.structured_type_mut(owner)?.properties.push(property.into());
        Ok(())
    }

    /// Add two navigation properties that are each other's partner.
    ///
    /// `forward` is declared on `source` and points to `target`; `reverse` is
    /// declared on `target` and points back.
    pub fn add_bidirectional_navigation(
        &mut self,
        source: ElementId,
        forward: NavigationEnd,
        target: ElementId,
        reverse: NavigationEnd,
    ) -> Result<(), BuildError> {
        let source_name = self.entity_type_name(source)?;
        let target_name = self.entity_type_name(target)?;
        let forward_name = Arc::clone(&forward.name);
        let reverse_name = Arc::clone(&reverse.name);
        debug!(source = %source_name, target = %target_name, "adding bidirectional navigation");
        self.add_navigation_property(source, forward.into_property(target_name, reverse_name))?;
        self.add_navigation_property(target, reverse.into_property(source_name, forward_name))
    }

    fn entity_type_name(&self, id: ElementId) -> Result<String, BuildError> {
        let element = self.element(id).ok_or(BuildError::UnknownElement(id))?;
        if element.kind() != ElementKind::EntityType {
            return Err(Self::wrong_kind(element, "entity type"));
        }
        Ok(element.full_name())
    }

    // ========================================================================
    // ANNOTATIONS, REFERENCES, ALIASES
    // ========================================================================

    /// Add an annotation; the target does not have to exist.
    pub fn add_vocabulary_annotation(&mut self, annotation: VocabularyAnnotation) {
        let slot = self.annotations.len();
        self.annotation_index.insert(slot, &annotation);
        self.annotations.push(annotation);
    }

    /// Add a referenced model. References cannot be removed.
    pub fn add_reference(&mut self, model: Arc<dyn Model>) {
        self.references.push(model);
        self.bad_elements.clear();
    }

    /// Record an `edmx:Reference` to emit when the model is written.
    pub fn add_schema_reference(&mut self, reference: SchemaReference) {
        self.schema_references.push(reference);
    }

    /// Give `namespace` an alias usable in lookups.
    ///
    /// Elements already declared in the namespace without an alias take it.
    pub fn set_namespace_alias(
        &mut self,
        namespace: impl Into<Arc<str>>,
        alias: impl Into<Arc<str>>,
    ) {
        let namespace = namespace.into();
        let alias = alias.into();
        for element in &mut self.elements {
            if element.namespace == namespace && element.alias.is_none() {
                element.alias = Some(Arc::clone(&alias));
            }
        }
        self.symbols
            .add_alias(Arc::clone(&alias), Arc::clone(&namespace));
        self.aliases.insert(namespace, alias);
        self.bad_elements.clear();
    }
}

impl Model for EdmModel {
    fn schema_elements(&self) -> &[SchemaElement] {
        &self.elements
    }

    fn declared_elements(&self, full_name: &str) -> Vec<&SchemaElement> {
        self.symbols
            .lookup(full_name)
            .into_iter()
            .map(|slot| &self.elements[slot])
            .collect()
    }

    fn vocabulary_annotations(&self) -> &[VocabularyAnnotation] {
        &self.annotations
    }

    fn declared_annotations(&self, target: &str) -> Vec<&VocabularyAnnotation> {
        self.annotation_index
            .lookup(target)
            .iter()
            .map(|slot| &self.annotations[*slot])
            .collect()
    }

    fn referenced_models(&self) -> &[Arc<dyn Model>] {
        &self.references
    }

    fn namespace_aliases(&self) -> &IndexMap<Arc<str>, Arc<str>> {
        &self.aliases
    }

    fn schema_references(&self) -> &[SchemaReference] {
        &self.schema_references
    }

    fn bad_elements(&self) -> &BadElementCache {
        &self.bad_elements
    }
}
