//! Error types for CSDL reading and writing.

use std::fmt;

use thiserror::Error;

use crate::model::EdmError;

/// Every fatal error of a failed CSDL parse, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsdlErrors(pub Vec<EdmError>);

impl CsdlErrors {
    pub fn errors(&self) -> &[EdmError] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether any error carries `code`.
    pub fn contains(&self, code: crate::model::EdmErrorCode) -> bool {
        self.0.iter().any(|e| e.code == code)
    }
}

impl fmt::Display for CsdlErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} CSDL error(s)", self.0.len())?;
        for error in &self.0 {
            write!(f, "\n  {}", error.format())?;
        }
        Ok(())
    }
}

impl std::error::Error for CsdlErrors {}

/// Errors that can occur during CSDL file operations.
#[derive(Debug, Error)]
pub enum CsdlError {
    /// The documents were read but are not valid CSDL.
    #[error(transparent)]
    Parse(#[from] CsdlErrors),

    /// IO error during read/write.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// XML serialization error.
    #[error("XML error: {0}")]
    Xml(String),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(String),
}

impl CsdlError {
    pub fn xml(message: impl Into<String>) -> Self {
        Self::Xml(message.into())
    }

    pub fn json(message: impl Into<String>) -> Self {
        Self::Json(message.into())
    }
}
