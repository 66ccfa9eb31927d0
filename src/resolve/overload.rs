//! Operation overload matching.
//!
//! Two operations have the same signature when their ordered parameter names
//! match and each parameter type matches once facets are stripped.
//! Nullability is significant. The return type is not part of a signature.

use std::fmt;
use std::sync::Arc;

use crate::model::{Model, Operation, OperationImport, SchemaElement, TypeRef};

use super::EdmModelExt;
use super::binding::container_chain;

/// Ordered `(name, type)` pairs identifying one overload.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OperationSignature {
    parameters: Vec<(Arc<str>, TypeRef)>,
}

impl OperationSignature {
    /// Signature from explicit parameters; facets are ignored.
    pub fn new<N: Into<Arc<str>>>(parameters: impl IntoIterator<Item = (N, TypeRef)>) -> Self {
        Self {
            parameters: parameters
                .into_iter()
                .map(|(name, type_ref)| (name.into(), type_ref.strip_facets()))
                .collect(),
        }
    }

    pub fn of(operation: &Operation) -> Self {
        Self::new(
            operation
                .parameters
                .iter()
                .map(|p| (Arc::clone(&p.name), p.type_ref.clone())),
        )
    }

    /// Signature of an operation element; `None` for other kinds.
    pub fn of_element(element: &SchemaElement) -> Option<Self> {
        element.as_operation().map(Self::of)
    }

    pub fn matches(&self, operation: &Operation) -> bool {
        *self == Self::of(operation)
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }
}

impl fmt::Display for OperationSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, (name, type_ref)) in self.parameters.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}: {type_ref}")?;
            if !type_ref.nullable {
                f.write_str(" not null")?;
            }
        }
        f.write_str(")")
    }
}

pub(super) fn find_operation<'m, M: Model + ?Sized>(
    model: &'m M,
    full_name: &str,
    signature: &OperationSignature,
) -> Option<&'m SchemaElement> {
    model.find_operations(full_name).into_iter().find(|element| {
        element
            .as_operation()
            .is_some_and(|operation| signature.matches(operation))
    })
}

pub(super) fn find_imports<'m, M: Model + ?Sized>(
    model: &'m M,
    container: &'m SchemaElement,
    name: &str,
) -> Vec<&'m OperationImport> {
    container_chain(model, container)
        .into_iter()
        .filter_map(SchemaElement::as_entity_container)
        .flat_map(|c| c.operation_imports())
        .filter(|import| &*import.name == name)
        .collect()
}

pub(super) fn imported_operations<'m, M: Model + ?Sized>(
    model: &'m M,
    import: &OperationImport,
) -> Vec<&'m SchemaElement> {
    model
        .find_operations(&import.operation)
        .into_iter()
        .filter(|element| {
            element
                .as_operation()
                .is_some_and(|op| op.kind == import.kind && !op.is_bound)
        })
        .collect()
}
