//! Model-wide semantic validation.
//!
//! Parsing accepts any well-formed document; everything that makes a model
//! semantically wrong is reported here instead:
//!
//! - duplicate declarations and overloads
//! - invalid names and keys
//! - unresolved or cyclic base types, property, parameter and term types
//! - navigation partners, referential constraints and `OnDelete` values
//! - entity set types, navigation property bindings and operation imports
//! - annotation terms
//!
//! Diagnostics come out in element declaration order, followed by those of
//! annotations in declaration order.

use std::ptr;

use rustc_hash::FxHashSet;
use tracing::debug;

use crate::base::{SourceLocation, is_namespace, is_simple_identifier, split_qualified};
use crate::model::{
    ContainerElement, DiagnosticCollector, EdmError, EdmErrorCode, ElementKind, EntityContainer,
    EnumType, Model, NavigationProperty, OnDeleteAction, Operation, OperationImport, PropertyDef,
    SchemaElement, StructuredType, Term, TypeRef, VocabularyAnnotation, member_target,
};
use crate::resolve::{
    EdmModelExt, NavigationSource, NavigationTarget, OperationSignature, Resolution,
};

/// Validate a whole model.
pub fn validate<M: Model + ?Sized>(model: &M) -> Vec<EdmError> {
    let mut checker = ModelChecker::new(model);
    checker.check_all();
    let errors = checker.finish();
    debug!(count = errors.len(), "model validated");
    errors
}

/// Diagnostics attributable to one element of `model`.
pub fn element_errors<M: Model + ?Sized>(model: &M, element: &SchemaElement) -> Vec<EdmError> {
    let mut checker = ModelChecker::new(model);
    checker.check_element(element);
    checker.finish()
}

// ============================================================================
// CHECKER
// ============================================================================

/// Runs the semantic checks of one model into a collector.
pub struct ModelChecker<'m, M: Model + ?Sized> {
    model: &'m M,
    collector: DiagnosticCollector,
}

impl<'m, M: Model + ?Sized> ModelChecker<'m, M> {
    pub fn new(model: &'m M) -> Self {
        Self {
            model,
            collector: DiagnosticCollector::new(),
        }
    }

    /// Check every element, then every annotation.
    pub fn check_all(&mut self) {
        let model = self.model;
        for element in model.schema_elements() {
            self.check_element(element);
        }
        for annotation in model.vocabulary_annotations() {
            self.check_annotation(annotation);
        }
    }

    pub fn finish(self) -> Vec<EdmError> {
        self.collector.finish()
    }

    /// Check a single element.
    pub fn check_element(&mut self, element: &SchemaElement) {
        self.check_name(element);
        self.check_duplicates(element);
        match element.kind() {
            ElementKind::EntityType | ElementKind::ComplexType => {
                if let Some(ty) = element.as_structured_type() {
                    self.check_structured_type(element, ty);
                }
            }
            ElementKind::EnumType => {
                if let Some(ty) = element.as_enum_type() {
                    self.check_enum_type(element, ty);
                }
            }
            ElementKind::Term => {
                if let Some(term) = element.as_term() {
                    self.check_term(element, term);
                }
            }
            ElementKind::Function | ElementKind::Action => {
                if let Some(operation) = element.as_operation() {
                    self.check_operation(element, operation);
                }
            }
            ElementKind::EntityContainer => {
                if let Some(container) = element.as_entity_container() {
                    self.check_container(element, container);
                }
            }
            ElementKind::TypeDefinition | ElementKind::Primitive | ElementKind::Unknown => {}
        }
    }

    /// The annotation's term must resolve.
    pub fn check_annotation(&mut self, annotation: &VocabularyAnnotation) {
        let term = self.model.annotation_term(annotation);
        let referrer = format!("annotation on '{}'", annotation.target);
        self.report_bad(&term, &referrer, annotation.location);
    }

    fn report(&mut self, code: EdmErrorCode, message: String, location: Option<SourceLocation>) {
        self.collector.report(code, message, location);
    }

    /// Forward the diagnostics of a bad resolution.
    ///
    /// Diagnostics without a location belong to a placeholder shared by
    /// every reference to the same name; each is reported against
    /// `referrer` at `location`. Located ones point at the offending
    /// declarations and are forwarded unchanged.
    fn report_bad(
        &mut self,
        resolution: &Resolution<'_>,
        referrer: &str,
        location: Option<SourceLocation>,
    ) {
        for error in resolution.errors() {
            if error.location.is_some() {
                self.collector.add(error.clone());
            } else {
                self.report(
                    error.code,
                    format!("{} (referenced by {referrer})", error.message),
                    location,
                );
            }
        }
    }

    // ------------------------------------------------------------------------
    // Names and duplicates
    // ------------------------------------------------------------------------

    fn check_name(&mut self, element: &SchemaElement) {
        if !is_simple_identifier(&element.name) {
            self.report(
                EdmErrorCode::InvalidName,
                format!("'{}' is not a valid element name", element.name),
                element.location,
            );
        }
        if !is_namespace(&element.namespace) {
            self.report(
                EdmErrorCode::InvalidName,
                format!("'{}' is not a valid namespace", element.namespace),
                element.location,
            );
        }
    }

    fn check_duplicates(&mut self, element: &SchemaElement) {
        let model = self.model;
        let full_name = element.full_name();
        let signature = OperationSignature::of_element(element);

        let mut already_defined = false;
        let mut duplicate_overload = false;
        for other in model.declared_elements(&full_name) {
            if ptr::eq(other, element) || other.full_name() != full_name {
                continue;
            }
            match (&signature, OperationSignature::of_element(other)) {
                (Some(own), Some(theirs)) => duplicate_overload |= *own == theirs,
                _ => already_defined = true,
            }
        }
        for reference in model.referenced_models() {
            for other in reference.declared_elements(&full_name) {
                if other.full_name() != full_name {
                    continue;
                }
                already_defined |= match (&signature, OperationSignature::of_element(other)) {
                    (Some(own), Some(theirs)) => *own == theirs,
                    _ => true,
                };
            }
        }

        if already_defined {
            self.report(
                EdmErrorCode::AlreadyDefined,
                format!("{} '{full_name}' is already defined", element.kind()),
                element.location,
            );
        }
        if duplicate_overload {
            self.report(
                EdmErrorCode::DuplicateFunctions,
                format!(
                    "{} '{}' has another overload with the same parameters",
                    element.kind(),
                    element.target_path()
                ),
                element.location,
            );
        }
    }

    // ------------------------------------------------------------------------
    // Structured types
    // ------------------------------------------------------------------------

    fn check_structured_type(&mut self, element: &SchemaElement, ty: &StructuredType) {
        let model = self.model;
        let base = model.base_type(element);
        if let Some(base) = &base {
            self.report_bad(base, &format!("'{}'", element.full_name()), element.location);
        }
        if element.kind() == ElementKind::EntityType {
            self.check_key(element, ty, base.is_some());
        }
        self.check_property_names(element, ty);
        for property in &ty.properties {
            if !is_simple_identifier(property.name()) {
                self.report(
                    EdmErrorCode::InvalidName,
                    format!("'{}' is not a valid property name", property.name()),
                    element.location,
                );
            }
            match property {
                PropertyDef::Structural(structural) => {
                    let referrer = member_target(&element.full_name(), &structural.name);
                    self.check_type_ref(&structural.type_ref, &referrer, element.location);
                }
                PropertyDef::Navigation(navigation) => {
                    self.check_navigation(element, navigation);
                }
            }
        }
    }

    fn check_key(&mut self, element: &SchemaElement, ty: &StructuredType, has_base: bool) {
        let model = self.model;
        let name = element.full_name();
        if has_base && !ty.key.is_empty() {
            self.report(
                EdmErrorCode::InvalidKey,
                format!("The derived type '{name}' cannot declare a key"),
                element.location,
            );
        }
        if model.key(element).is_empty() && !ty.is_abstract && !has_bad_base(model, element) {
            self.report(
                EdmErrorCode::InvalidKey,
                format!("The entity type '{name}' has no key"),
                element.location,
            );
        }
        for key in &ty.key {
            let problem = match model.find_property(element, &key.name) {
                None => Some("is not a property of the type"),
                Some(PropertyDef::Navigation(_)) => Some("is a navigation property"),
                Some(PropertyDef::Structural(property)) if property.type_ref.is_collection() => {
                    Some("is collection-valued")
                }
                Some(PropertyDef::Structural(property)) if property.type_ref.nullable => {
                    Some("is nullable")
                }
                Some(PropertyDef::Structural(_)) => None,
            };
            if let Some(problem) = problem {
                self.report(
                    EdmErrorCode::InvalidKey,
                    format!("The key property '{}' of '{name}' {problem}", key.name),
                    element.location,
                );
            }
        }
    }

    /// Own properties may not repeat each other or an inherited name.
    fn check_property_names(&mut self, element: &SchemaElement, ty: &StructuredType) {
        let model = self.model;
        let all = model.properties(element);
        let inherited_count = all.len().saturating_sub(ty.properties.len());
        let inherited: FxHashSet<&str> = all[..inherited_count]
            .iter()
            .map(|p| p.name().as_ref())
            .collect();
        let mut seen: FxHashSet<&str> = FxHashSet::default();
        for property in &ty.properties {
            let name: &str = property.name();
            if inherited.contains(name) || !seen.insert(name) {
                self.report(
                    EdmErrorCode::AlreadyDefined,
                    format!(
                        "The property '{name}' is already defined on '{}'",
                        element.full_name()
                    ),
                    element.location,
                );
            }
        }
    }

    fn check_type_ref(
        &mut self,
        type_ref: &TypeRef,
        referrer: &str,
        location: Option<SourceLocation>,
    ) {
        let resolved = self.model.resolve_type_ref(type_ref);
        self.report_bad(&resolved, &format!("'{referrer}'"), location);
    }

    fn check_navigation(&mut self, owner: &SchemaElement, navigation: &NavigationProperty) {
        let model = self.model;
        let location = owner.location;
        let target = model.navigation_target_type(navigation);
        let referrer = format!("'{}'", member_target(&owner.full_name(), &navigation.name));
        self.report_bad(&target, &referrer, location);

        if let Some(partner_name) = navigation.partner.as_deref() {
            match model.partner(navigation) {
                None if target.is_bad() => {}
                None => self.report(
                    EdmErrorCode::BadUnresolvedNavigationPropertyPath,
                    format!(
                        "The partner '{partner_name}' of '{}/{}' cannot be found",
                        owner.full_name(),
                        navigation.name
                    ),
                    location,
                ),
                Some(partner) => {
                    let back_link = partner
                        .partner
                        .as_deref()
                        .is_none_or(|name| name == &*navigation.name);
                    let back_type = match model.navigation_target_type(partner) {
                        Resolution::Resolved(back) => is_related(model, back, owner),
                        Resolution::Bad(_) => true,
                    };
                    if !back_link || !back_type {
                        self.report(
                            EdmErrorCode::InvalidNavigationPropertyPartner,
                            format!(
                                "The partner '{partner_name}' of '{}/{}' does not point back to it",
                                owner.full_name(),
                                navigation.name
                            ),
                            location,
                        );
                    }
                }
            }
        }

        for constraint in &navigation.referential_constraints {
            if model
                .find_property(owner, &constraint.dependent_property)
                .is_none()
            {
                self.report(
                    EdmErrorCode::BadUnresolvedProperty,
                    format!(
                        "The dependent property '{}' of '{}/{}' cannot be found",
                        constraint.dependent_property,
                        owner.full_name(),
                        navigation.name
                    ),
                    location,
                );
            }
            if let Resolution::Resolved(principal) = &target {
                if model
                    .find_property(principal, &constraint.principal_property)
                    .is_none()
                {
                    self.report(
                        EdmErrorCode::BadUnresolvedProperty,
                        format!(
                            "The principal property '{}' of '{}/{}' cannot be found on '{}'",
                            constraint.principal_property,
                            owner.full_name(),
                            navigation.name,
                            principal.full_name()
                        ),
                        location,
                    );
                }
            }
        }

        if let OnDeleteAction::Invalid(action) = &navigation.on_delete {
            self.report(
                EdmErrorCode::InvalidOnDelete,
                format!(
                    "'{action}' is not a valid OnDelete action for '{}/{}'",
                    owner.full_name(),
                    navigation.name
                ),
                location,
            );
        }
    }

    // ------------------------------------------------------------------------
    // Enums, terms, operations
    // ------------------------------------------------------------------------

    fn check_enum_type(&mut self, element: &SchemaElement, ty: &EnumType) {
        let mut seen: FxHashSet<&str> = FxHashSet::default();
        for member in &ty.members {
            if !is_simple_identifier(&member.name) {
                self.report(
                    EdmErrorCode::InvalidName,
                    format!("'{}' is not a valid enum member name", member.name),
                    element.location,
                );
            }
            if !seen.insert(&member.name) {
                self.report(
                    EdmErrorCode::AlreadyDefined,
                    format!(
                        "The member '{}' is already defined on '{}'",
                        member.name,
                        element.full_name()
                    ),
                    element.location,
                );
            }
        }
    }

    fn check_term(&mut self, element: &SchemaElement, term: &Term) {
        self.check_type_ref(&term.type_ref, &element.full_name(), element.location);
        let Some(base_term) = term.base_term.as_deref() else {
            return;
        };
        match self.model.find_term(base_term) {
            Some(resolution) => {
                let referrer = format!("'{}'", element.full_name());
                self.report_bad(&resolution, &referrer, element.location);
            }
            None => self.report(
                EdmErrorCode::BadUnresolvedTerm,
                format!(
                    "The base term '{base_term}' of '{}' cannot be found",
                    element.full_name()
                ),
                element.location,
            ),
        }
    }

    fn check_operation(&mut self, element: &SchemaElement, operation: &Operation) {
        let mut seen: FxHashSet<&str> = FxHashSet::default();
        for parameter in &operation.parameters {
            if !seen.insert(&parameter.name) {
                self.report(
                    EdmErrorCode::AlreadyDefined,
                    format!(
                        "The parameter '{}' is already defined on '{}'",
                        parameter.name,
                        element.target_path()
                    ),
                    element.location,
                );
            }
            let referrer = format!("{}/{}", element.target_path(), parameter.name);
            self.check_type_ref(&parameter.type_ref, &referrer, element.location);
        }
        if let Some(return_type) = &operation.return_type {
            self.check_type_ref(return_type, &element.target_path(), element.location);
        }
    }

    // ------------------------------------------------------------------------
    // Entity containers
    // ------------------------------------------------------------------------

    fn check_container(&mut self, element: &SchemaElement, container: &EntityContainer) {
        let model = self.model;
        let location = element.location;
        if let Some(extends) = container.extends.as_deref() {
            match model.find_entity_container(extends) {
                Some(resolution) => {
                    self.report_bad(&resolution, &format!("'{}'", element.full_name()), location);
                }
                None => self.report(
                    EdmErrorCode::BadUnresolvedType,
                    format!(
                        "The container '{extends}' extended by '{}' cannot be found",
                        element.full_name()
                    ),
                    location,
                ),
            }
        }

        let mut seen: FxHashSet<&str> = FxHashSet::default();
        for child in &container.elements {
            if !seen.insert(child.name()) {
                self.report(
                    EdmErrorCode::AlreadyDefined,
                    format!(
                        "'{}' is already defined in '{}'",
                        child.name(),
                        element.full_name()
                    ),
                    location,
                );
            }
            match child {
                ContainerElement::EntitySet(_) | ContainerElement::Singleton(_) => {
                    let source = NavigationSource {
                        container: element,
                        element: child,
                    };
                    self.check_navigation_source(&source);
                }
                ContainerElement::OperationImport(import) => {
                    self.check_import(element, container, import);
                }
            }
        }
    }

    fn check_navigation_source(&mut self, source: &NavigationSource<'_>) {
        let model = self.model;
        let location = source.container.location;
        let source_type = model.navigation_source_type(source);
        let referrer = format!("'{}'", source.target_path());
        self.report_bad(&source_type, &referrer, location);

        for binding in source.bindings() {
            if let Resolution::Resolved(ty) = &source_type {
                if resolve_binding_path(model, ty, &binding.path).is_none() {
                    self.report(
                        EdmErrorCode::BadUnresolvedNavigationPropertyPath,
                        format!(
                            "The binding path '{}' of '{}' does not name a navigation property",
                            binding.path,
                            source.target_path()
                        ),
                        location,
                    );
                }
            }
            let target = model.find_navigation_target_by_path(source, &binding.path);
            if let NavigationTarget::Bad(bad) = target {
                self.report_bad(&Resolution::Bad(bad), &referrer, location);
            }
        }
    }

    fn check_import(
        &mut self,
        element: &SchemaElement,
        container: &EntityContainer,
        import: &OperationImport,
    ) {
        let model = self.model;
        let location = element.location;
        if model.find_imported_operations(import).is_empty() {
            self.report(
                EdmErrorCode::BadUnresolvedOperation,
                format!(
                    "The operation '{}' imported by '{}/{}' cannot be found",
                    import.operation,
                    element.full_name(),
                    import.name
                ),
                location,
            );
        }
        if let Some(entity_set) = import.entity_set.as_deref() {
            let found = match entity_set.split_once('/') {
                Some((container_name, name)) => {
                    model.find_navigation_source(container_name, name).is_some()
                }
                None => {
                    container
                        .element(entity_set)
                        .is_some_and(ContainerElement::is_navigation_source)
                        || model
                            .find_navigation_source(&element.full_name(), entity_set)
                            .is_some()
                }
            };
            if !found {
                self.report(
                    EdmErrorCode::BadUnresolvedEntitySet,
                    format!(
                        "The entity set '{entity_set}' of '{}/{}' cannot be found",
                        element.full_name(),
                        import.name
                    ),
                    location,
                );
            }
        }
    }
}

// ============================================================================
// HELPERS
// ============================================================================

/// True when some type up the base chain of `element` fails to resolve.
fn has_bad_base<M: Model + ?Sized>(model: &M, element: &SchemaElement) -> bool {
    let mut visited: FxHashSet<*const SchemaElement> = FxHashSet::default();
    let mut current = element;
    loop {
        match model.base_type(current) {
            None => return false,
            Some(Resolution::Bad(_)) => return true,
            Some(Resolution::Resolved(base)) => {
                if !visited.insert(base as *const SchemaElement) {
                    return true;
                }
                current = base;
            }
        }
    }
}

/// `candidate` is `element`, one of its ancestors, or derives from it.
fn is_related<M: Model + ?Sized>(
    model: &M,
    candidate: &SchemaElement,
    element: &SchemaElement,
) -> bool {
    ptr::eq(candidate, element)
        || descends(model, candidate, element)
        || descends(model, element, candidate)
}

fn descends<M: Model + ?Sized>(model: &M, from: &SchemaElement, to: &SchemaElement) -> bool {
    let mut visited: FxHashSet<*const SchemaElement> = FxHashSet::default();
    let mut current = from;
    while let Some(Resolution::Resolved(base)) = model.base_type(current) {
        if ptr::eq(base, to) {
            return true;
        }
        if !visited.insert(base as *const SchemaElement) {
            return false;
        }
        current = base;
    }
    false
}

/// Walk a binding path from `source_type` and return the navigation property
/// it ends in.
///
/// Segments are property names, or qualified type names casting to a
/// derived type. Intermediate segments may pass through complex properties
/// and containment navigation properties.
fn resolve_binding_path<'m, M: Model + ?Sized>(
    model: &'m M,
    source_type: &'m SchemaElement,
    path: &str,
) -> Option<&'m NavigationProperty> {
    let segments: Vec<&str> = path.split('/').collect();
    let (last, init) = segments.split_last()?;
    let mut current = source_type;
    for segment in init {
        if split_qualified(segment).is_some() {
            match model.find_type(segment) {
                Some(Resolution::Resolved(cast)) if cast.kind().is_structured() => {
                    current = cast;
                    continue;
                }
                _ => return None,
            }
        }
        let next = match model.find_property(current, segment)? {
            PropertyDef::Structural(property) => model.resolve_type_ref(&property.type_ref),
            PropertyDef::Navigation(navigation) => model.navigation_target_type(navigation),
        };
        current = next.element().filter(|ty| ty.kind().is_structured())?;
    }
    model.find_property(current, last)?.as_navigation()
}
