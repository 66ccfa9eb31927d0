//! Core registry of the built-in `Edm` primitive types.
//!
//! One immutable table per process, created on first use and shared by every
//! model. Core types resolve through `find_type` only, never through
//! `find_declared_type`.

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;

use crate::base::EDM_NAMESPACE;

use super::elements::{Definition, SchemaElement};
use super::types::PrimitiveKind;

static CORE_MODEL: Lazy<CoreModel> = Lazy::new(CoreModel::build);

/// The shared table of primitive type elements.
#[derive(Debug)]
pub struct CoreModel {
    elements: Vec<SchemaElement>,
    by_full_name: FxHashMap<String, usize>,
}

impl CoreModel {
    /// The process-wide instance.
    pub fn instance() -> &'static CoreModel {
        &CORE_MODEL
    }

    fn build() -> Self {
        let elements: Vec<SchemaElement> = PrimitiveKind::ALL
            .iter()
            .map(|kind| {
                SchemaElement::new(EDM_NAMESPACE, kind.name(), Definition::Primitive(*kind))
            })
            .collect();
        let by_full_name = elements
            .iter()
            .enumerate()
            .map(|(index, element)| (element.full_name(), index))
            .collect();
        Self {
            elements,
            by_full_name,
        }
    }

    /// Find a primitive type element by full name, e.g. `Edm.Int32`.
    pub fn find_type(&self, full_name: &str) -> Option<&SchemaElement> {
        self.by_full_name
            .get(full_name)
            .map(|index| &self.elements[*index])
    }

    pub fn primitive(&self, kind: PrimitiveKind) -> &SchemaElement {
        let index = PrimitiveKind::ALL
            .iter()
            .position(|k| *k == kind)
            .unwrap_or_default();
        &self.elements[index]
    }

    pub fn elements(&self) -> &[SchemaElement] {
        &self.elements
    }
}
