//! Full-name lookup with ambiguity detection.

use std::ptr;

use tracing::trace;

use crate::model::{
    BadElement, BadReason, EdmError, EdmErrorCode, ElementKind, LookupScope, LookupSpace, Model,
    SchemaElement,
};

use super::Resolution;

/// Candidates for `full_name` in `space`, own declarations first.
///
/// With `include_references` the direct references contribute too, each
/// element counted once.
fn candidates<'m, M: Model + ?Sized>(
    model: &'m M,
    full_name: &str,
    accepts: impl Fn(ElementKind) -> bool,
    include_references: bool,
) -> Vec<&'m SchemaElement> {
    let mut found: Vec<&'m SchemaElement> = model
        .declared_elements(full_name)
        .into_iter()
        .filter(|element| accepts(element.kind()))
        .collect();
    if include_references {
        for reference in model.referenced_models() {
            for element in reference.declared_elements(full_name) {
                if accepts(element.kind()) && !found.iter().any(|f| ptr::eq(*f, element)) {
                    found.push(element);
                }
            }
        }
    }
    found
}

fn resolve<'m, M: Model + ?Sized>(
    model: &'m M,
    full_name: &str,
    space: LookupSpace,
    include_references: bool,
) -> Option<Resolution<'m>> {
    let found = candidates(model, full_name, |kind| space.accepts(kind), include_references);
    match found.as_slice() {
        [] => None,
        [single] => Some(Resolution::Resolved(*single)),
        many => {
            let scope = if include_references {
                LookupScope::All
            } else {
                LookupScope::Declared
            };
            let bad = model.bad_elements().get_or_insert_with(
                scope,
                space,
                BadReason::Ambiguous,
                full_name,
                || ambiguous(full_name, space, many),
            );
            Some(Resolution::Bad(bad))
        }
    }
}

/// Synthesize the bad element for a name declared more than once.
fn ambiguous(full_name: &str, space: LookupSpace, declarations: &[&SchemaElement]) -> BadElement {
    trace!(name = full_name, count = declarations.len(), "ambiguous lookup");
    let code = match space {
        LookupSpace::Type => EdmErrorCode::DuplicateType,
        _ => EdmErrorCode::AlreadyDefined,
    };
    let errors = declarations
        .iter()
        .map(|declaration| {
            EdmError::new(
                code,
                format!(
                    "{} '{full_name}' is declared more than once",
                    declaration.kind()
                ),
            )
            .with_location(declaration.location)
        })
        .collect();
    let kind = declarations
        .first()
        .map_or(ElementKind::EntityType, |d| d.kind());
    BadElement::new(full_name, kind, BadReason::Ambiguous, errors)
}

pub(super) fn find_type<'m, M: Model + ?Sized>(
    model: &'m M,
    full_name: &str,
    include_references: bool,
) -> Option<Resolution<'m>> {
    let found = resolve(model, full_name, LookupSpace::Type, include_references);
    if found.is_some() || !include_references {
        return found;
    }
    model.core().find_type(full_name).map(Resolution::Resolved)
}

pub(super) fn find_term<'m, M: Model + ?Sized>(
    model: &'m M,
    full_name: &str,
    include_references: bool,
) -> Option<Resolution<'m>> {
    resolve(model, full_name, LookupSpace::Term, include_references)
}

pub(super) fn find_entity_container<'m, M: Model + ?Sized>(
    model: &'m M,
    full_name: &str,
    include_references: bool,
) -> Option<Resolution<'m>> {
    resolve(model, full_name, LookupSpace::EntityContainer, include_references)
}

/// Overload sets are never ambiguous.
pub(super) fn find_operations<'m, M: Model + ?Sized>(
    model: &'m M,
    full_name: &str,
    include_references: bool,
) -> Vec<&'m SchemaElement> {
    candidates(model, full_name, ElementKind::is_operation, include_references)
}
