//! CSDL XML support and the parsed model representation.
//!
//! ## Document shapes
//!
//! ```xml
//! <edmx:Edmx xmlns:edmx="http://docs.oasis-open.org/odata/ns/edmx" Version="4.0">
//!   <edmx:Reference Uri="vocabularies/Core.xml">
//!     <edmx:Include Namespace="Org.OData.Core.V1" Alias="Core"/>
//!   </edmx:Reference>
//!   <edmx:DataServices>
//!     <Schema xmlns="http://docs.oasis-open.org/odata/ns/edm" Namespace="NS" Alias="Self">
//!       <EntityType Name="Customer">...</EntityType>
//!     </Schema>
//!   </edmx:DataServices>
//! </edmx:Edmx>
//! ```
//!
//! A bare `<Schema>` root in the EDM namespace is accepted too. Several
//! documents, and several schemas, may declare the same namespace.
//!
//! Parsing is fail-fast on malformed input: any fatal error makes
//! [`CsdlReader::parse`] return every fatal error found. Semantic problems
//! (duplicates, dangling names, cycles) never fail a parse.

mod error;
#[cfg(feature = "json")]
mod json;
mod reader;
mod writer;
mod xml;

use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::model::{BadElementCache, Model, SchemaElement, SchemaReference, VocabularyAnnotation};
use crate::resolve::{AnnotationIndex, SymbolIndex};

pub use error::{CsdlError, CsdlErrors};
#[cfg(feature = "json")]
pub use json::write_json;
pub use reader::{CsdlReader, CsdlReaderSettings};
pub use writer::{CsdlWriter, CsdlWriterSettings};

/// CSDL namespace URIs.
pub mod namespace {
    /// EDM elements (`Schema` and everything inside it).
    pub const EDM: &str = "http://docs.oasis-open.org/odata/ns/edm";
    /// The `edmx:Edmx` envelope.
    pub const EDMX: &str = "http://docs.oasis-open.org/odata/ns/edmx";
}

/// Raw contents of a model, used to construct a [`CsdlModel`].
#[derive(Debug, Default)]
pub(crate) struct ModelParts {
    pub elements: Vec<SchemaElement>,
    pub annotations: Vec<VocabularyAnnotation>,
    pub references: Vec<Arc<dyn Model>>,
    pub schema_references: Vec<SchemaReference>,
    pub aliases: IndexMap<Arc<str>, Arc<str>>,
}

/// A model produced by parsing CSDL. Immutable once built.
#[derive(Debug)]
pub struct CsdlModel {
    elements: Vec<SchemaElement>,
    annotations: Vec<VocabularyAnnotation>,
    references: Vec<Arc<dyn Model>>,
    schema_references: Vec<SchemaReference>,
    aliases: IndexMap<Arc<str>, Arc<str>>,
    symbols: SymbolIndex,
    annotation_index: AnnotationIndex,
    bad_elements: BadElementCache,
}

impl CsdlModel {
    pub(crate) fn from_parts(parts: ModelParts) -> Self {
        let mut symbols = SymbolIndex::build(&parts.elements);
        for (namespace, alias) in &parts.aliases {
            symbols.add_alias(Arc::clone(alias), Arc::clone(namespace));
        }
        let annotation_index = AnnotationIndex::build(&parts.annotations);
        Self {
            elements: parts.elements,
            annotations: parts.annotations,
            references: parts.references,
            schema_references: parts.schema_references,
            aliases: parts.aliases,
            symbols,
            annotation_index,
            bad_elements: BadElementCache::new(),
        }
    }

    /// Parse a single document with default settings.
    pub fn parse(document: &str) -> Result<Self, CsdlErrors> {
        CsdlReader::new().parse(&[document])
    }
}

impl Model for CsdlModel {
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

/// Read and parse one CSDL file.
pub fn read_file(path: impl AsRef<Path>) -> Result<CsdlModel, CsdlError> {
    read_files(&[path])
}

/// Read several CSDL files into one model.
pub fn read_files<P: AsRef<Path>>(paths: &[P]) -> Result<CsdlModel, CsdlError> {
    let texts = paths
        .iter()
        .map(std::fs::read_to_string)
        .collect::<Result<Vec<_>, _>>()?;
    let documents: Vec<&str> = texts.iter().map(String::as_str).collect();
    Ok(CsdlReader::new().parse(&documents)?)
}

/// Write a model as one `edmx:Edmx` file with default settings.
pub fn write_file(model: &dyn Model, path: impl AsRef<Path>) -> Result<(), CsdlError> {
    let text = CsdlWriter::new().write_edmx(model)?;
    std::fs::write(path, text)?;
    Ok(())
}
