//! Foundation types for the EDM engine.
//!
//! This module provides fundamental types used throughout the crate:
//! - [`DocumentId`] - Identifier of one CSDL input document
//! - [`SourceLocation`], [`LineIndex`] - Byte offset to line/column mapping
//! - Qualified-name helpers ([`split_qualified`], [`qualify`], ...)
//!
//! This module has NO dependencies on other edm modules.

mod names;
mod position;

pub use names::{
    EDM_NAMESPACE, is_namespace, is_simple_identifier, qualify, split_qualified,
    split_type_name_arguments,
};
pub use position::{DocumentId, LineIndex, SourceLocation};

// Re-export text-size types for convenience
pub use text_size::{TextRange, TextSize};
