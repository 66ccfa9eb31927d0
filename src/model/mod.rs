//! The schema element graph.
//!
//! Plain data types for every EDM element, the shared primitive registry,
//! diagnostics, and the [`Model`] trait both representations implement.
//!
//! ```text
//! Model (trait)
//! ├── schema_elements: [SchemaElement]      (declaration order)
//! │     └── definition: EntityType | ComplexType | EnumType | TypeDefinition
//! │                     | Term | Operation | EntityContainer
//! ├── vocabulary_annotations: [VocabularyAnnotation]
//! ├── referenced_models: [Arc<dyn Model>]   (append-only)
//! └── bad_elements: BadElementCache         (stable identity for bad lookups)
//! ```

mod annotations;
mod bad;
mod contract;
mod diagnostics;
mod elements;
mod registry;
mod types;

pub use annotations::{
    ConstantKind, Expression, PathKind, PropertyValue, RecordExpression, VocabularyAnnotation,
};
pub use bad::{BadElement, BadElementCache, BadReason, LookupScope, LookupSpace};
pub use contract::{Model, ReferenceInclude, SchemaReference};
pub use diagnostics::{DiagnosticCollector, EdmError, EdmErrorCode};
pub use elements::{
    ContainerElement, Definition, ElementKind, EntityContainer, EntitySet, EnumMember, EnumType,
    NavigationProperty, NavigationPropertyBinding, OnDeleteAction, Operation, OperationImport,
    OperationKind, Parameter, PropertyDef, PropertyRef, ReferentialConstraint, SchemaElement,
    Singleton, StructuralProperty, StructuredType, Term, TypeDefinition, member_target,
};
pub use registry::CoreModel;
pub use types::{Facets, MaxLength, PrimitiveKind, Scale, Srid, TypeRef, TypeRefKind};
