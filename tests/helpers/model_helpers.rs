//! Helpers for building and inspecting models in tests.

use std::sync::Arc;

use edm::csdl::{CsdlModel, CsdlReader};
use edm::model::{EdmError, EdmErrorCode, Model};

/// Parse documents, failing the test with every error on a fatal parse.
pub fn parse(documents: &[&str]) -> CsdlModel {
    match CsdlReader::new().parse(documents) {
        Ok(model) => model,
        Err(errors) => panic!(
            "Expected documents to parse, got {} error(s):\n{}",
            errors.len(),
            format_errors(errors.errors())
        ),
    }
}

/// Parse one document that references already-built models.
pub fn parse_with_references(document: &str, references: Vec<Arc<dyn Model>>) -> CsdlModel {
    let mut reader = CsdlReader::new();
    for reference in references {
        reader = reader.with_reference(reference);
    }
    match reader.parse(&[document]) {
        Ok(model) => model,
        Err(errors) => panic!("Expected document to parse:\n{}", format_errors(errors.errors())),
    }
}

/// Error codes of a fatal parse, failing the test if the parse succeeds.
pub fn parse_error_codes(document: &str) -> Vec<EdmErrorCode> {
    match CsdlReader::new().parse(&[document]) {
        Ok(_) => panic!("Expected the document to fail to parse"),
        Err(errors) => errors.errors().iter().map(|e| e.code).collect(),
    }
}

pub fn codes(errors: &[EdmError]) -> Vec<EdmErrorCode> {
    errors.iter().map(|e| e.code).collect()
}

pub fn format_errors(errors: &[EdmError]) -> String {
    errors
        .iter()
        .map(|e| format!("  {}", e.format()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Wrap a schema body in a bare `Schema` root for namespace `NS`.
pub fn schema(body: &str) -> String {
    format!(
        r#"<Schema xmlns="http://docs.oasis-open.org/odata/ns/edm" Namespace="NS">{body}</Schema>"#
    )
}
