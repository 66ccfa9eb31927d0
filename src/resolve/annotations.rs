//! Vocabulary annotation lookups.

use rustc_hash::FxHashSet;

use crate::base::{qualify, split_qualified};
use crate::model::{
    BadReason, EdmError, EdmErrorCode, ElementKind, LookupSpace, Model, VocabularyAnnotation,
};

use super::{EdmModelExt, Resolution, ResolveError, structure, unresolved_placeholder};

/// Declared annotations followed by those of each direct reference.
pub(super) fn find<'m, M: Model + ?Sized>(
    model: &'m M,
    target: &str,
) -> Vec<&'m VocabularyAnnotation> {
    let mut found = model.declared_annotations(target);
    for reference in model.referenced_models() {
        found.extend(reference.declared_annotations(target));
    }
    found
}

/// Translate an alias-qualified name using the aliases of the model and its references.
fn canonical_name<M: Model + ?Sized>(model: &M, name: &str) -> String {
    let Some((prefix, simple)) = split_qualified(name) else {
        return name.to_string();
    };
    let namespace = model.namespace_for_alias(prefix).or_else(|| {
        model
            .referenced_models()
            .iter()
            .find_map(|reference| reference.namespace_for_alias(prefix))
    });
    match namespace {
        Some(namespace) => qualify(namespace, simple),
        None => name.to_string(),
    }
}

pub(super) fn find_for_term<'m, M: Model + ?Sized>(
    model: &'m M,
    target: &str,
    term: &str,
    qualifier: Option<&str>,
) -> Vec<&'m VocabularyAnnotation> {
    let term = canonical_name(model, term);
    find(model, target)
        .into_iter()
        .filter(|annotation| *annotation.term == *term)
        .filter(|annotation| qualifier.is_none_or(|q| annotation.qualifier.as_deref() == Some(q)))
        .collect()
}

pub(super) fn find_including_inherited<'m, M: Model + ?Sized>(
    model: &'m M,
    element: Option<&Resolution<'m>>,
) -> Result<Vec<&'m VocabularyAnnotation>, ResolveError> {
    let element = match element {
        None => return Err(ResolveError::MissingElement),
        Some(Resolution::Bad(bad)) => {
            return match bad.reason() {
                BadReason::Unresolved => Err(ResolveError::Unresolved(bad.full_name().to_string())),
                BadReason::Cyclic => Ok(Vec::new()),
                BadReason::Ambiguous => Ok(find(model, bad.full_name())),
            };
        }
        Some(Resolution::Resolved(element)) => *element,
    };
    if model.is_in_base_type_cycle(element) {
        return Ok(Vec::new());
    }

    let mut found = find(model, &element.target_path());
    let mut visited: FxHashSet<String> = FxHashSet::default();
    visited.insert(element.full_name());
    for ancestor in structure::ancestors(model, element) {
        let target = ancestor.full_name();
        if !visited.insert(target.clone()) {
            break;
        }
        found.extend(find(model, &target));
    }
    Ok(found)
}

pub(super) fn term_of<'m, M: Model + ?Sized>(
    model: &'m M,
    annotation: &VocabularyAnnotation,
) -> Resolution<'m> {
    match model.find_term(&annotation.term) {
        Some(resolution) => resolution,
        None => {
            let error = EdmError::new(
                EdmErrorCode::BadUnresolvedTerm,
                format!("The term '{}' cannot be found", annotation.term),
            );
            Resolution::Bad(unresolved_placeholder(
                model,
                LookupSpace::Term,
                &annotation.term,
                ElementKind::Term,
                error,
            ))
        }
    }
}
