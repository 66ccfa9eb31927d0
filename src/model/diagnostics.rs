//! Structured errors produced by parsing and validation.
//!
//! Error codes fall in two classes:
//! - **parse-fatal** codes make a CSDL read fail outright
//! - **semantic** codes describe bad elements in an otherwise usable model
//!   and are reported by `validate()` or carried by bad elements

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::base::SourceLocation;

/// Error codes for EDM diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EdmErrorCode {
    // =========================================================================
    // Parse-fatal
    // =========================================================================
    /// Malformed XML (unbalanced tags, bad escapes, ...)
    XmlError,
    /// Document contains no root element
    EmptyFile,
    /// Element not allowed at this position or unknown root
    UnexpectedXmlElement,
    /// Unknown attribute in the EDM namespace
    UnexpectedXmlAttribute,
    /// Attribute repeated on one element
    DuplicateXmlAttribute,
    /// Required attribute missing
    MissingAttribute,
    /// Unsupported `Version` of an `edmx:Edmx` root
    InvalidVersionNumber,
    InvalidBoolean,
    InvalidInteger,
    InvalidFloat,
    InvalidMaxLength,
    InvalidSrid,
    InvalidScale,
    /// Malformed `Type` attribute
    InvalidTypeName,
    /// Name that must be qualified is not
    InvalidQualifiedName,

    // =========================================================================
    // Semantic
    // =========================================================================
    /// Element name declared more than once
    AlreadyDefined,
    /// Type name resolved to several declarations
    DuplicateType,
    /// Operations with identical signatures in one model
    DuplicateFunctions,
    /// A name resolved to more than one element
    BadAmbiguousElementBinding,
    BadCyclicEntity,
    BadCyclicComplex,
    BadUnresolvedEntityType,
    BadUnresolvedComplexType,
    BadUnresolvedType,
    BadUnresolvedTerm,
    BadUnresolvedProperty,
    BadUnresolvedNavigationPropertyPath,
    BadUnresolvedEntitySet,
    BadUnresolvedOperation,
    /// Partner missing its back-link or pointing to the wrong type
    InvalidNavigationPropertyPartner,
    InvalidOnDelete,
    /// Name is not a valid SimpleIdentifier or namespace
    InvalidName,
    /// Missing or malformed entity key
    InvalidKey,
}

impl EdmErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::XmlError => "XmlError",
            Self::EmptyFile => "EmptyFile",
            Self::UnexpectedXmlElement => "UnexpectedXmlElement",
            Self::UnexpectedXmlAttribute => "UnexpectedXmlAttribute",
            Self::DuplicateXmlAttribute => "DuplicateXmlAttribute",
            Self::MissingAttribute => "MissingAttribute",
            Self::InvalidVersionNumber => "InvalidVersionNumber",
            Self::InvalidBoolean => "InvalidBoolean",
            Self::InvalidInteger => "InvalidInteger",
            Self::InvalidFloat => "InvalidFloat",
            Self::InvalidMaxLength => "InvalidMaxLength",
            Self::InvalidSrid => "InvalidSrid",
            Self::InvalidScale => "InvalidScale",
            Self::InvalidTypeName => "InvalidTypeName",
            Self::InvalidQualifiedName => "InvalidQualifiedName",
            Self::AlreadyDefined => "AlreadyDefined",
            Self::DuplicateType => "DuplicateType",
            Self::DuplicateFunctions => "DuplicateFunctions",
            Self::BadAmbiguousElementBinding => "BadAmbiguousElementBinding",
            Self::BadCyclicEntity => "BadCyclicEntity",
            Self::BadCyclicComplex => "BadCyclicComplex",
            Self::BadUnresolvedEntityType => "BadUnresolvedEntityType",
            Self::BadUnresolvedComplexType => "BadUnresolvedComplexType",
            Self::BadUnresolvedType => "BadUnresolvedType",
            Self::BadUnresolvedTerm => "BadUnresolvedTerm",
            Self::BadUnresolvedProperty => "BadUnresolvedProperty",
            Self::BadUnresolvedNavigationPropertyPath => "BadUnresolvedNavigationPropertyPath",
            Self::BadUnresolvedEntitySet => "BadUnresolvedEntitySet",
            Self::BadUnresolvedOperation => "BadUnresolvedOperation",
            Self::InvalidNavigationPropertyPartner => "InvalidNavigationPropertyPartner",
            Self::InvalidOnDelete => "InvalidOnDelete",
            Self::InvalidName => "InvalidName",
            Self::InvalidKey => "InvalidKey",
        }
    }

    /// True for codes that make a CSDL read fail.
    pub fn is_parse_fatal(&self) -> bool {
        matches!(
            self,
            Self::XmlError
                | Self::EmptyFile
                | Self::UnexpectedXmlElement
                | Self::UnexpectedXmlAttribute
                | Self::DuplicateXmlAttribute
                | Self::MissingAttribute
                | Self::InvalidVersionNumber
                | Self::InvalidBoolean
                | Self::InvalidInteger
                | Self::InvalidFloat
                | Self::InvalidMaxLength
                | Self::InvalidSrid
                | Self::InvalidScale
                | Self::InvalidTypeName
                | Self::InvalidQualifiedName
        )
    }
}

impl fmt::Display for EdmErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One diagnostic: code, message and optional source location.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct EdmError {
    pub code: EdmErrorCode,
    pub message: Arc<str>,
    pub location: Option<SourceLocation>,
}

impl EdmError {
    pub fn new(code: EdmErrorCode, message: impl Into<Arc<str>>) -> Self {
        Self {
            code,
            message: message.into(),
            location: None,
        }
    }

    pub fn at(code: EdmErrorCode, message: impl Into<Arc<str>>, location: SourceLocation) -> Self {
        Self::new(code, message).with_location(Some(location))
    }

    pub fn with_location(mut self, location: Option<SourceLocation>) -> Self {
        self.location = location;
        self
    }

    /// Format with location prefix, for logs and CLI output.
    pub fn format(&self) -> String {
        match &self.location {
            Some(location) => format!("{location}: {self}"),
            None => self.to_string(),
        }
    }
}

/// Collects diagnostics during a parse or validation pass.
#[derive(Clone, Debug, Default)]
pub struct DiagnosticCollector {
    errors: Vec<EdmError>,
}

impl DiagnosticCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, error: EdmError) {
        self.errors.push(error);
    }

    pub fn report(
        &mut self,
        code: EdmErrorCode,
        message: impl Into<Arc<str>>,
        location: Option<SourceLocation>,
    ) {
        self.add(EdmError::new(code, message).with_location(location));
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn extend(&mut self, errors: impl IntoIterator<Item = EdmError>) {
        self.errors.extend(errors);
    }

    pub fn finish(self) -> Vec<EdmError> {
        self.errors
    }
}
