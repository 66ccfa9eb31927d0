//! Derived-type queries.
//!
//! Derived types may live in the queried model or in any of its direct
//! references, so every query scans both and deduplicates by identity.
//! Types in a base-type cycle have no derived types.

use std::collections::VecDeque;

use rustc_hash::FxHashSet;

use crate::model::{Model, SchemaElement};

use super::{EdmModelExt, Resolution, same_element};

/// Own elements followed by the elements of every direct reference.
fn searchable_elements<M: Model + ?Sized>(model: &M) -> impl Iterator<Item = &SchemaElement> {
    model.schema_elements().iter().chain(
        model
            .referenced_models()
            .iter()
            .flat_map(|reference| reference.schema_elements().iter()),
    )
}

pub(super) fn directly_derived<'m, M: Model + ?Sized>(
    model: &'m M,
    element: &SchemaElement,
) -> Vec<&'m SchemaElement> {
    if !element.kind().is_structured() || model.is_in_base_type_cycle(element) {
        return Vec::new();
    }
    let mut seen: FxHashSet<*const SchemaElement> = FxHashSet::default();
    let mut derived = Vec::new();
    for candidate in searchable_elements(model) {
        if candidate.kind() != element.kind() || !seen.insert(candidate as *const SchemaElement) {
            continue;
        }
        let Some(base_name) = candidate
            .as_structured_type()
            .and_then(|ty| ty.base_type.as_deref())
        else {
            continue;
        };
        if let Some(Resolution::Resolved(base)) = model.find_type(base_name) {
            if same_element(base, element) {
                derived.push(candidate);
            }
        }
    }
    derived
}

pub(super) fn all_derived<'m, M: Model + ?Sized>(
    model: &'m M,
    element: &SchemaElement,
) -> Vec<&'m SchemaElement> {
    let mut visited: FxHashSet<*const SchemaElement> = FxHashSet::default();
    visited.insert(element as *const SchemaElement);
    let mut result = Vec::new();
    let mut queue: VecDeque<&'m SchemaElement> = directly_derived(model, element).into();
    while let Some(next) = queue.pop_front() {
        if !visited.insert(next as *const SchemaElement) {
            continue;
        }
        result.push(next);
        queue.extend(directly_derived(model, next));
    }
    result
}
