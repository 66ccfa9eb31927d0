//! Position tracking for parsed schema elements.
//!
//! Stores the source location (document, line, column) of CSDL nodes for
//! error reporting. Lines and columns are 1-based, matching what XML tools
//! print.

use std::fmt;

use text_size::TextSize;

/// Identifier of one input document within a single parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DocumentId(pub u32);

impl DocumentId {
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A position in a CSDL document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceLocation {
    pub document: DocumentId,
    pub offset: TextSize,
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn new(document: DocumentId, offset: TextSize, line: u32, column: u32) -> Self {
        Self {
            document,
            offset,
            line,
            column,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "document {} ({}, {})", self.document, self.line, self.column)
    }
}

/// Maps byte offsets of one document to line/column pairs.
///
/// Built once per document; lookups are a binary search over line starts.
#[derive(Debug, Clone)]
pub struct LineIndex {
    document: DocumentId,
    line_starts: Vec<u32>,
}

impl LineIndex {
    pub fn new(document: DocumentId, text: &str) -> Self {
        let mut line_starts = vec![0];
        for (offset, byte) in text.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(offset as u32 + 1);
            }
        }
        Self {
            document,
            line_starts,
        }
    }

    pub fn document(&self) -> DocumentId {
        self.document
    }

    /// Convert a byte offset into a 1-based location.
    pub fn location(&self, offset: usize) -> SourceLocation {
        let offset = offset.min(u32::MAX as usize) as u32;
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let column = offset - self.line_starts[line];
        SourceLocation::new(
            self.document,
            TextSize::new(offset),
            line as u32 + 1,
            column + 1,
        )
    }
}
