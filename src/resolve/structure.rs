//! Base types, inherited properties, keys and navigation partners.

use rustc_hash::FxHashSet;
use tracing::trace;

use crate::model::{
    BadElement, BadReason, EdmError, EdmErrorCode, ElementKind, LookupScope, LookupSpace, Model,
    NavigationProperty, PropertyDef, PropertyRef, SchemaElement, TypeRef, TypeRefKind,
};

use super::{EdmModelExt, Resolution, same_element, unresolved_placeholder};

pub(super) fn base_type<'m, M: Model + ?Sized>(
    model: &'m M,
    element: &'m SchemaElement,
) -> Option<Resolution<'m>> {
    let base_name = element.as_structured_type()?.base_type.as_deref()?;
    let is_entity = element.kind() == ElementKind::EntityType;
    let space = if is_entity {
        LookupSpace::EntityBaseType
    } else {
        LookupSpace::ComplexBaseType
    };

    if in_base_type_cycle(model, element) {
        trace!(element = %element.full_name(), base = base_name, "cyclic base type");
        let code = if is_entity {
            EdmErrorCode::BadCyclicEntity
        } else {
            EdmErrorCode::BadCyclicComplex
        };
        let bad = model.bad_elements().get_or_insert_with(
            LookupScope::All,
            space,
            BadReason::Cyclic,
            base_name,
            || {
                let error = EdmError::new(
                    code,
                    format!("The base type '{base_name}' is part of a base type cycle"),
                );
                BadElement::new(base_name, element.kind(), BadReason::Cyclic, vec![error])
            },
        );
        return Some(Resolution::Bad(bad));
    }

    match model.find_type(base_name) {
        Some(Resolution::Resolved(base)) if base.kind() == element.kind() => {
            Some(Resolution::Resolved(base))
        }
        Some(Resolution::Bad(bad)) => Some(Resolution::Bad(bad)),
        _ => {
            let code = if is_entity {
                EdmErrorCode::BadUnresolvedEntityType
            } else {
                EdmErrorCode::BadUnresolvedComplexType
            };
            let error = EdmError::new(code, format!("The base type '{base_name}' cannot be found"));
            Some(Resolution::Bad(unresolved_placeholder(
                model,
                space,
                base_name,
                element.kind(),
                error,
            )))
        }
    }
}

pub(super) fn in_base_type_cycle<'a, M: Model + ?Sized>(
    model: &'a M,
    element: &'a SchemaElement,
) -> bool {
    let mut visited: FxHashSet<*const SchemaElement> = FxHashSet::default();
    let mut current = element;
    loop {
        let Some(base_name) = current
            .as_structured_type()
            .and_then(|ty| ty.base_type.as_deref())
        else {
            return false;
        };
        let Some(Resolution::Resolved(next)) = model.find_type(base_name) else {
            return false;
        };
        if next.kind() != element.kind() {
            return false;
        }
        if same_element(next, element) {
            return true;
        }
        // A cycle that does not pass through `element`.
        if !visited.insert(next as *const SchemaElement) {
            return false;
        }
        current = next;
    }
}

/// Resolved ancestors of `element`, nearest first. Stops at the first bad base.
pub(super) fn ancestors<'m, M: Model + ?Sized>(
    model: &'m M,
    element: &'m SchemaElement,
) -> Vec<&'m SchemaElement> {
    let mut chain = Vec::new();
    let mut visited: FxHashSet<*const SchemaElement> = FxHashSet::default();
    visited.insert(element as *const SchemaElement);
    let mut current = element;
    while let Some(Resolution::Resolved(base)) = base_type(model, current) {
        if !visited.insert(base as *const SchemaElement) {
            break;
        }
        chain.push(base);
        current = base;
    }
    chain
}

pub(super) fn properties<'m, M: Model + ?Sized>(
    model: &'m M,
    element: &'m SchemaElement,
) -> Vec<&'m PropertyDef> {
    let mut result = Vec::new();
    for ty in ancestors(model, element)
        .into_iter()
        .rev()
        .chain(std::iter::once(element))
    {
        if let Some(structured) = ty.as_structured_type() {
            result.extend(structured.properties.iter());
        }
    }
    result
}

pub(super) fn find_property<'m, M: Model + ?Sized>(
    model: &'m M,
    element: &'m SchemaElement,
    name: &str,
) -> Option<&'m PropertyDef> {
    std::iter::once(element)
        .chain(ancestors(model, element))
        .filter_map(SchemaElement::as_structured_type)
        .find_map(|ty| ty.declared_property(name))
}

pub(super) fn key<'m, M: Model + ?Sized>(
    model: &'m M,
    element: &'m SchemaElement,
) -> &'m [PropertyRef] {
    std::iter::once(element)
        .chain(ancestors(model, element))
        .filter_map(SchemaElement::as_structured_type)
        .find(|ty| !ty.key.is_empty())
        .map(|ty| ty.key.as_slice())
        .unwrap_or(&[])
}

pub(super) fn resolve_type_ref<'m, M: Model + ?Sized>(
    model: &'m M,
    type_ref: &TypeRef,
) -> Resolution<'m> {
    let name = type_ref.element_type_name();
    match model.find_type(&name) {
        Some(resolution) => resolution,
        None => {
            let error = EdmError::new(
                EdmErrorCode::BadUnresolvedType,
                format!("The type '{name}' cannot be found"),
            );
            Resolution::Bad(unresolved_placeholder(
                model,
                LookupSpace::Type,
                &name,
                unresolved_kind(type_ref),
                error,
            ))
        }
    }
}

/// Kind of the placeholder for a dangling type reference: entity references
/// must name entity types, anything else could be any kind of type.
fn unresolved_kind(type_ref: &TypeRef) -> ElementKind {
    match &type_ref.element_type().kind {
        TypeRefKind::EntityReference(_) => ElementKind::EntityType,
        _ => ElementKind::Unknown,
    }
}

pub(super) fn navigation_target_type<'m, M: Model + ?Sized>(
    model: &'m M,
    navigation: &NavigationProperty,
) -> Resolution<'m> {
    match resolve_type_ref(model, &navigation.type_ref) {
        Resolution::Resolved(target) if target.kind() != ElementKind::EntityType => {
            let name = target.full_name();
            let error = EdmError::new(
                EdmErrorCode::BadUnresolvedEntityType,
                format!("The navigation target '{name}' is not an entity type"),
            );
            Resolution::Bad(unresolved_placeholder(
                model,
                LookupSpace::EntityBaseType,
                &name,
                ElementKind::EntityType,
                error,
            ))
        }
        other => other,
    }
}

pub(super) fn partner<'m, M: Model + ?Sized>(
    model: &'m M,
    navigation: &NavigationProperty,
) -> Option<&'m NavigationProperty> {
    let partner_name = navigation.partner.as_deref()?;
    let target = navigation_target_type(model, navigation).element()?;
    find_property(model, target, partner_name)?.as_navigation()
}
