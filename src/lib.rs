//! # edm-base
//!
//! Entity Data Model metadata: the schema element graph, a CSDL reader and
//! writer, name resolution, and model-wide validation.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! validation → Model-wide semantic diagnostics
//!   ↓
//! convert    → Converter between representations, model comparison
//!   ↓
//! csdl       → CSDL XML reader/writer, parsed representation (CsdlModel)
//!   ↓
//! builder    → Programmatic representation (EdmModel)
//!   ↓
//! resolve    → Symbol index, lookups, derived types, bindings, overloads, annotations
//!   ↓
//! model      → Element graph, core primitives, Model trait, diagnostics
//!   ↓
//! base       → Primitives (DocumentId, SourceLocation, qualified names)
//! ```
//!
//! ## Example
//!
//! ```
//! use edm::csdl::CsdlModel;
//! use edm::resolve::EdmModelExt;
//!
//! let model = CsdlModel::parse(
//!     r#"<Schema xmlns="http://docs.oasis-open.org/odata/ns/edm" Namespace="NS">
//!          <ComplexType Name="Address"/>
//!        </Schema>"#,
//! )
//! .unwrap();
//! assert!(model.find_type("NS.Address").is_some());
//! assert!(model.validate().is_empty());
//! ```

// ============================================================================
// MODULES
// dependency order: base → model → resolve → builder → csdl → convert → validation
// ============================================================================

/// Foundation types: DocumentId, SourceLocation, qualified names
pub mod base;

/// Schema element graph, core primitive registry, Model trait, diagnostics
pub mod model;

/// Name resolution and indexes over any Model
pub mod resolve;

/// Programmatic model construction
pub mod builder;

/// CSDL reading and writing
pub mod csdl;

/// Converting and comparing models
pub mod convert;

/// Semantic validation
pub mod validation;

// Re-export foundation types
pub use base::{DocumentId, SourceLocation};

// Re-export the model contract and its two representations
pub use builder::EdmModel;
pub use csdl::{CsdlModel, CsdlReader, CsdlWriter};
pub use model::{EdmError, EdmErrorCode, Model, SchemaElement};
pub use resolve::{EdmModelExt, Resolution};
