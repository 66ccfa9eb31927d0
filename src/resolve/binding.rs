//! Navigation property bindings of entity sets and singletons.
//!
//! A binding maps a navigation path on a source to a target set:
//!
//! ```text
//! <EntitySet Name="Orders" EntityType="NS.Order">
//!   <NavigationPropertyBinding Path="Customer" Target="Customers"/>
//!   <NavigationPropertyBinding Path="NS.SpecialOrder/Auditor" Target="NS.Other/People"/>
//! </EntitySet>
//! ```
//!
//! A path without a configured binding yields [`NavigationTarget::Unknown`],
//! distinct from a binding whose target cannot be found.

use std::sync::Arc;

use rustc_hash::FxHashSet;

use crate::model::{
    BadElement, ContainerElement, EdmError, EdmErrorCode, ElementKind, LookupSpace, Model,
    NavigationProperty, NavigationPropertyBinding, SchemaElement, member_target,
};

use super::{EdmModelExt, Resolution, same_element, structure, unresolved_placeholder};

/// An entity set or singleton together with the container declaring it.
#[derive(Clone, Copy, Debug)]
pub struct NavigationSource<'m> {
    pub container: &'m SchemaElement,
    pub element: &'m ContainerElement,
}

impl<'m> NavigationSource<'m> {
    pub fn name(&self) -> &'m str {
        self.element.name()
    }

    pub fn bindings(&self) -> &'m [NavigationPropertyBinding] {
        self.element.bindings()
    }

    /// `NS.Container/Name`.
    pub fn target_path(&self) -> String {
        member_target(&self.container.full_name(), self.element.name())
    }

    pub fn is_same(&self, other: &NavigationSource<'_>) -> bool {
        same_element(self.container, other.container) && std::ptr::eq(self.element, other.element)
    }
}

/// Where a navigation property leads from a given source.
#[derive(Clone, Debug)]
pub enum NavigationTarget<'m> {
    /// A binding names this set or singleton.
    Bound(NavigationSource<'m>),
    /// No binding, and the navigation property contains its target.
    Contained,
    /// No binding is configured for the path.
    Unknown,
    /// A binding exists but its target cannot be found.
    Bad(Arc<BadElement>),
}

impl<'m> NavigationTarget<'m> {
    pub fn source(&self) -> Option<&NavigationSource<'m>> {
        match self {
            Self::Bound(source) => Some(source),
            _ => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }
}

/// `container` followed by every container it extends, each once.
pub(super) fn container_chain<'m, M: Model + ?Sized>(
    model: &'m M,
    container: &'m SchemaElement,
) -> Vec<&'m SchemaElement> {
    let mut chain = vec![container];
    let mut visited: FxHashSet<*const SchemaElement> = FxHashSet::default();
    visited.insert(container as *const SchemaElement);
    let mut current = container;
    while let Some(extends) = current
        .as_entity_container()
        .and_then(|c| c.extends.as_deref())
    {
        let Some(Resolution::Resolved(next)) = model.find_entity_container(extends) else {
            break;
        };
        if !visited.insert(next as *const SchemaElement) {
            break;
        }
        chain.push(next);
        current = next;
    }
    chain
}

/// Set or singleton `name` in `container` or a container it extends.
fn source_in<'m, M: Model + ?Sized>(
    model: &'m M,
    container: &'m SchemaElement,
    name: &str,
) -> Option<NavigationSource<'m>> {
    container_chain(model, container)
        .into_iter()
        .find_map(|owner| {
            let element = owner.as_entity_container()?.element(name)?;
            element
                .is_navigation_source()
                .then_some(NavigationSource { container: owner, element })
        })
}

pub(super) fn find_source<'m, M: Model + ?Sized>(
    model: &'m M,
    container: &str,
    name: &str,
) -> Option<NavigationSource<'m>> {
    let container = model.find_entity_container(container)?.element()?;
    source_in(model, container, name)
}

pub(super) fn source_type<'m, M: Model + ?Sized>(
    model: &'m M,
    source: &NavigationSource<'_>,
) -> Resolution<'m> {
    let name = source
        .element
        .entity_type_name()
        .map(|n| n.to_string())
        .unwrap_or_default();
    match model.find_type(&name) {
        Some(Resolution::Resolved(ty)) if ty.kind() == ElementKind::EntityType => {
            Resolution::Resolved(ty)
        }
        Some(Resolution::Bad(bad)) => Resolution::Bad(bad),
        _ => {
            let error = EdmError::new(
                EdmErrorCode::BadUnresolvedEntityType,
                format!("The entity type '{name}' cannot be found"),
            );
            Resolution::Bad(unresolved_placeholder(
                model,
                LookupSpace::EntityBaseType,
                &name,
                ElementKind::EntityType,
                error,
            ))
        }
    }
}

/// The binding path for `navigation` declared on `owner`.
///
/// Navigation properties of the source's own type or its ancestors use the
/// bare name; those declared on other (derived) types are type-qualified.
pub(super) fn binding_path<M: Model + ?Sized>(
    model: &M,
    source: &NavigationSource<'_>,
    owner: &SchemaElement,
    navigation: &NavigationProperty,
) -> String {
    if let Resolution::Resolved(source_ty) = source_type(model, source) {
        let on_chain = same_element(source_ty, owner)
            || structure::ancestors(model, source_ty)
                .into_iter()
                .any(|ancestor| same_element(ancestor, owner));
        if on_chain {
            return navigation.name.to_string();
        }
    }
    member_target(&owner.full_name(), &navigation.name)
}

pub(super) fn find_target<'m, M: Model + ?Sized>(
    model: &'m M,
    source: &NavigationSource<'m>,
    owner: &SchemaElement,
    navigation: &NavigationProperty,
) -> NavigationTarget<'m> {
    let path = binding_path(model, source, owner, navigation);
    match find_target_by_path(model, source, &path) {
        NavigationTarget::Unknown if navigation.contains_target => NavigationTarget::Contained,
        target => target,
    }
}

pub(super) fn find_target_by_path<'m, M: Model + ?Sized>(
    model: &'m M,
    source: &NavigationSource<'m>,
    path: &str,
) -> NavigationTarget<'m> {
    let Some(binding) = source.bindings().iter().find(|b| &*b.path == path) else {
        return NavigationTarget::Unknown;
    };
    let found = match binding.target.split_once('/') {
        Some((container_name, name)) => model
            .find_entity_container(container_name)
            .and_then(|c| c.element())
            .and_then(|container| source_in(model, container, name)),
        None => source_in(model, source.container, &binding.target),
    };
    match found {
        Some(target) => NavigationTarget::Bound(target),
        None => {
            let error = EdmError::new(
                EdmErrorCode::BadUnresolvedEntitySet,
                format!("The binding target '{}' cannot be found", binding.target),
            );
            NavigationTarget::Bad(unresolved_placeholder(
                model,
                LookupSpace::NavigationTarget,
                &binding.target,
                ElementKind::Unknown,
                error,
            ))
        }
    }
}
