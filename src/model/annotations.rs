//! Vocabulary annotations and their value expressions.

use std::fmt;
use std::sync::Arc;

use crate::base::SourceLocation;

/// A `(target, term, qualifier) -> value` triple.
#[derive(Clone, Debug, PartialEq)]
pub struct VocabularyAnnotation {
    /// Target path, e.g. `NS.Customer` or `NS.Customer/Name`.
    pub target: Arc<str>,
    /// Full name of the term, possibly unresolved.
    pub term: Arc<str>,
    pub qualifier: Option<Arc<str>>,
    pub value: Expression,
    /// Declared nested inside its target rather than in an `Annotations` block.
    pub inline: bool,
    /// Namespace of the schema that declared the annotation.
    pub declared_in: Option<Arc<str>>,
    pub location: Option<SourceLocation>,
}

impl VocabularyAnnotation {
    pub fn new(
        target: impl Into<Arc<str>>,
        term: impl Into<Arc<str>>,
        value: Expression,
    ) -> Self {
        Self {
            target: target.into(),
            term: term.into(),
            qualifier: None,
            value,
            inline: false,
            declared_in: None,
            location: None,
        }
    }

    pub fn with_qualifier(mut self, qualifier: impl Into<Arc<str>>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }

    pub fn with_inline(mut self, inline: bool) -> Self {
        self.inline = inline;
        self
    }

    pub fn with_declared_in(mut self, namespace: impl Into<Arc<str>>) -> Self {
        self.declared_in = Some(namespace.into());
        self
    }

    pub fn without_location(&self) -> VocabularyAnnotation {
        VocabularyAnnotation {
            location: None,
            ..self.clone()
        }
    }
}

/// Typed constants stored in their lexical form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConstantKind {
    Binary,
    Date,
    DateTimeOffset,
    Decimal,
    Duration,
    Guid,
    TimeOfDay,
}

impl ConstantKind {
    pub const ALL: &'static [ConstantKind] = &[
        Self::Binary,
        Self::Date,
        Self::DateTimeOffset,
        Self::Decimal,
        Self::Duration,
        Self::Guid,
        Self::TimeOfDay,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Binary => "Binary",
            Self::Date => "Date",
            Self::DateTimeOffset => "DateTimeOffset",
            Self::Decimal => "Decimal",
            Self::Duration => "Duration",
            Self::Guid => "Guid",
            Self::TimeOfDay => "TimeOfDay",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.as_str() == name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PathKind {
    Path,
    PropertyPath,
    NavigationPropertyPath,
    AnnotationPath,
}

impl PathKind {
    pub const ALL: &'static [PathKind] = &[
        Self::Path,
        Self::PropertyPath,
        Self::NavigationPropertyPath,
        Self::AnnotationPath,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Path => "Path",
            Self::PropertyPath => "PropertyPath",
            Self::NavigationPropertyPath => "NavigationPropertyPath",
            Self::AnnotationPath => "AnnotationPath",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.as_str() == name)
    }
}

/// An annotation value.
#[derive(Clone, Debug, PartialEq)]
pub enum Expression {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(Arc<str>),
    Constant(ConstantKind, Arc<str>),
    /// Space-separated `NS.Enum/Member` values.
    EnumMember(Arc<str>),
    Path(PathKind, Arc<str>),
    Collection(Vec<Expression>),
    Record(RecordExpression),
}

impl Expression {
    pub fn string(value: impl Into<Arc<str>>) -> Self {
        Self::String(value.into())
    }

    /// Short name used in messages and comparisons.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "Null",
            Self::Bool(_) => "Bool",
            Self::Int(_) => "Int",
            Self::Float(_) => "Float",
            Self::String(_) => "String",
            Self::Constant(kind, _) => kind.as_str(),
            Self::EnumMember(_) => "EnumMember",
            Self::Path(kind, _) => kind.as_str(),
            Self::Collection(_) => "Collection",
            Self::Record(_) => "Record",
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::Constant(kind, text) => write!(f, "{}({text})", kind.as_str()),
            Self::EnumMember(m) => f.write_str(m),
            Self::Path(_, p) => f.write_str(p),
            Self::Collection(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Record(record) => {
                if let Some(ty) = &record.type_name {
                    write!(f, "{ty} ")?;
                }
                f.write_str("{")?;
                for (i, pv) in record.properties.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", pv.property, pv.value)?;
                }
                f.write_str("}")
            }
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordExpression {
    pub type_name: Option<Arc<str>>,
    pub properties: Vec<PropertyValue>,
}

impl RecordExpression {
    pub fn with_property(mut self, property: impl Into<Arc<str>>, value: Expression) -> Self {
        self.properties.push(PropertyValue {
            property: property.into(),
            value,
        });
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PropertyValue {
    pub property: Arc<str>,
    pub value: Expression,
}
