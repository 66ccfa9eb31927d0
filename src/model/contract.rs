//! The read contract shared by the parsed and the builder representation.
//!
//! Resolver, derived-type index, binding resolver, overload matching and the
//! annotation index are all implemented once over this trait (see
//! [`crate::resolve::EdmModelExt`]).

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use super::annotations::VocabularyAnnotation;
use super::bad::BadElementCache;
use super::registry::CoreModel;
use super::elements::SchemaElement;

/// An `edmx:Reference` to an external CSDL document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchemaReference {
    pub uri: Arc<str>,
    pub includes: Vec<ReferenceInclude>,
}

/// An `edmx:Include` namespace with an optional alias.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReferenceInclude {
    pub namespace: Arc<str>,
    pub alias: Option<Arc<str>>,
}

/// A schema model: own elements, annotations and referenced models.
///
/// Implementations must be safe to query from several threads once fully
/// constructed.
pub trait Model: Send + Sync + fmt::Debug {
    /// Elements declared by this model, in declaration order.
    fn schema_elements(&self) -> &[SchemaElement];

    /// Declared elements named `full_name`; alias-qualified names match too.
    fn declared_elements(&self, full_name: &str) -> Vec<&SchemaElement>;

    /// Annotations declared by this model (inline and out-of-line), in order.
    fn vocabulary_annotations(&self) -> &[VocabularyAnnotation];

    /// Declared annotations whose target path is exactly `target`.
    fn declared_annotations(&self, target: &str) -> Vec<&VocabularyAnnotation>;

    /// Directly referenced models. Append-only.
    fn referenced_models(&self) -> &[Arc<dyn Model>];

    /// Namespace → alias.
    fn namespace_aliases(&self) -> &IndexMap<Arc<str>, Arc<str>>;

    /// `edmx:Reference` entries to emit when writing.
    fn schema_references(&self) -> &[SchemaReference] {
        &[]
    }

    /// Identity cache for bad elements produced by lookups on this model.
    fn bad_elements(&self) -> &BadElementCache;

    /// The shared primitive type registry.
    fn core(&self) -> &'static CoreModel {
        CoreModel::instance()
    }

    /// Namespaces with at least one declared element, in first-seen order.
    fn declared_namespaces(&self) -> Vec<Arc<str>> {
        let mut namespaces: Vec<Arc<str>> = Vec::new();
        for element in self.schema_elements() {
            if !namespaces.iter().any(|ns| *ns == element.namespace) {
                namespaces.push(Arc::clone(&element.namespace));
            }
        }
        namespaces
    }

    /// Translate `alias` into its namespace.
    fn namespace_for_alias(&self, alias: &str) -> Option<&Arc<str>> {
        self.namespace_aliases()
            .iter()
            .find(|(_, a)| &***a == alias)
            .map(|(ns, _)| ns)
    }
}
