//! Type references: primitive, named, collection and entity-reference types
//! with their nullability and facets.

use std::fmt;
use std::sync::Arc;

use crate::base::{EDM_NAMESPACE, split_qualified, split_type_name_arguments};

// ============================================================================
// PRIMITIVE KINDS
// ============================================================================

/// The built-in EDM primitive types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimitiveKind {
    Binary,
    Boolean,
    Byte,
    Date,
    DateTimeOffset,
    Decimal,
    Double,
    Duration,
    Guid,
    Int16,
    Int32,
    Int64,
    SByte,
    Single,
    Stream,
    String,
    TimeOfDay,
    Geography,
    GeographyPoint,
    GeographyLineString,
    GeographyPolygon,
    GeographyMultiPoint,
    GeographyMultiLineString,
    GeographyMultiPolygon,
    GeographyCollection,
    Geometry,
    GeometryPoint,
    GeometryLineString,
    GeometryPolygon,
    GeometryMultiPoint,
    GeometryMultiLineString,
    GeometryMultiPolygon,
    GeometryCollection,
    /// Abstract `Edm.PrimitiveType`.
    PrimitiveType,
    /// `Edm.Untyped`.
    Untyped,
}

impl PrimitiveKind {
    pub const ALL: &'static [PrimitiveKind] = &[
        Self::Binary,
        Self::Boolean,
        Self::Byte,
        Self::Date,
        Self::DateTimeOffset,
        Self::Decimal,
        Self::Double,
        Self::Duration,
        Self::Guid,
        Self::Int16,
        Self::Int32,
        Self::Int64,
        Self::SByte,
        Self::Single,
        Self::Stream,
        Self::String,
        Self::TimeOfDay,
        Self::Geography,
        Self::GeographyPoint,
        Self::GeographyLineString,
        Self::GeographyPolygon,
        Self::GeographyMultiPoint,
        Self::GeographyMultiLineString,
        Self::GeographyMultiPolygon,
        Self::GeographyCollection,
        Self::Geometry,
        Self::GeometryPoint,
        Self::GeometryLineString,
        Self::GeometryPolygon,
        Self::GeometryMultiPoint,
        Self::GeometryMultiLineString,
        Self::GeometryMultiPolygon,
        Self::GeometryCollection,
        Self::PrimitiveType,
        Self::Untyped,
    ];

    /// The simple name inside the `Edm` namespace.
    pub fn name(self) -> &'static str {
        match self {
            Self::Binary => "Binary",
            Self::Boolean => "Boolean",
            Self::Byte => "Byte",
            Self::Date => "Date",
            Self::DateTimeOffset => "DateTimeOffset",
            Self::Decimal => "Decimal",
            Self::Double => "Double",
            Self::Duration => "Duration",
            Self::Guid => "Guid",
            Self::Int16 => "Int16",
            Self::Int32 => "Int32",
            Self::Int64 => "Int64",
            Self::SByte => "SByte",
            Self::Single => "Single",
            Self::Stream => "Stream",
            Self::String => "String",
            Self::TimeOfDay => "TimeOfDay",
            Self::Geography => "Geography",
            Self::GeographyPoint => "GeographyPoint",
            Self::GeographyLineString => "GeographyLineString",
            Self::GeographyPolygon => "GeographyPolygon",
            Self::GeographyMultiPoint => "GeographyMultiPoint",
            Self::GeographyMultiLineString => "GeographyMultiLineString",
            Self::GeographyMultiPolygon => "GeographyMultiPolygon",
            Self::GeographyCollection => "GeographyCollection",
            Self::Geometry => "Geometry",
            Self::GeometryPoint => "GeometryPoint",
            Self::GeometryLineString => "GeometryLineString",
            Self::GeometryPolygon => "GeometryPolygon",
            Self::GeometryMultiPoint => "GeometryMultiPoint",
            Self::GeometryMultiLineString => "GeometryMultiLineString",
            Self::GeometryMultiPolygon => "GeometryMultiPolygon",
            Self::GeometryCollection => "GeometryCollection",
            Self::PrimitiveType => "PrimitiveType",
            Self::Untyped => "Untyped",
        }
    }

    /// The full name, e.g. `Edm.Int32`.
    pub fn full_name(self) -> String {
        format!("{EDM_NAMESPACE}.{}", self.name())
    }

    /// Look a primitive up by its simple name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.name() == name)
    }

    /// Look a primitive up by its full `Edm.*` name.
    pub fn from_full_name(full_name: &str) -> Option<Self> {
        match split_qualified(full_name) {
            Some((EDM_NAMESPACE, name)) => Self::from_name(name),
            _ => None,
        }
    }

    pub fn is_spatial(self) -> bool {
        matches!(
            self,
            Self::Geography
                | Self::GeographyPoint
                | Self::GeographyLineString
                | Self::GeographyPolygon
                | Self::GeographyMultiPoint
                | Self::GeographyMultiLineString
                | Self::GeographyMultiPolygon
                | Self::GeographyCollection
                | Self::Geometry
                | Self::GeometryPoint
                | Self::GeometryLineString
                | Self::GeometryPolygon
                | Self::GeometryMultiPoint
                | Self::GeometryMultiLineString
                | Self::GeometryMultiPolygon
                | Self::GeometryCollection
        )
    }

    /// Integer kinds usable as an enum's underlying type.
    pub fn is_integral(self) -> bool {
        matches!(
            self,
            Self::Byte | Self::SByte | Self::Int16 | Self::Int32 | Self::Int64
        )
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{EDM_NAMESPACE}.{}", self.name())
    }
}

// ============================================================================
// FACETS
// ============================================================================

/// `MaxLength` facet value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MaxLength {
    Max,
    Length(u32),
}

/// `Scale` facet value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Scale {
    Variable,
    Value(u32),
}

/// `SRID` facet value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Srid {
    Variable,
    Value(u32),
}

impl fmt::Display for MaxLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Max => f.write_str("max"),
            Self::Length(n) => write!(f, "{n}"),
        }
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Variable => f.write_str("variable"),
            Self::Value(n) => write!(f, "{n}"),
        }
    }
}

impl fmt::Display for Srid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Variable => f.write_str("variable"),
            Self::Value(n) => write!(f, "{n}"),
        }
    }
}

/// Type-specific facets. `None` means "not specified".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Facets {
    pub max_length: Option<MaxLength>,
    pub precision: Option<u32>,
    pub scale: Option<Scale>,
    pub srid: Option<Srid>,
    pub unicode: Option<bool>,
}

impl Facets {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

// ============================================================================
// TYPE REFERENCES
// ============================================================================

/// The shape of a type reference.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeRefKind {
    Primitive(PrimitiveKind),
    /// Reference to a named schema type by full name (possibly unresolved).
    Named(Arc<str>),
    Collection(Box<TypeRef>),
    /// Reference to an entity of the named entity type.
    EntityReference(Arc<str>),
}

/// A type reference carrying nullability and facets.
///
/// For collections, `nullable` describes the items and lives on the element
/// type reference; the collection reference itself is never null.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeRef {
    pub kind: TypeRefKind,
    pub nullable: bool,
    pub facets: Facets,
}

impl TypeRef {
    pub fn primitive(kind: PrimitiveKind) -> Self {
        Self {
            kind: TypeRefKind::Primitive(kind),
            nullable: true,
            facets: Facets::default(),
        }
    }

    /// Reference a named type. `Edm.*` names become primitive references.
    pub fn named(full_name: impl Into<Arc<str>>) -> Self {
        let full_name = full_name.into();
        let kind = match PrimitiveKind::from_full_name(&full_name) {
            Some(primitive) => TypeRefKind::Primitive(primitive),
            None => TypeRefKind::Named(full_name),
        };
        Self {
            kind,
            nullable: true,
            facets: Facets::default(),
        }
    }

    pub fn collection(element: TypeRef) -> Self {
        Self {
            kind: TypeRefKind::Collection(Box::new(element)),
            nullable: false,
            facets: Facets::default(),
        }
    }

    pub fn entity_reference(entity_type: impl Into<Arc<str>>) -> Self {
        Self {
            kind: TypeRefKind::EntityReference(entity_type.into()),
            nullable: true,
            facets: Facets::default(),
        }
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn with_facets(mut self, facets: Facets) -> Self {
        self.facets = facets;
        self
    }

    pub fn with_max_length(mut self, max_length: MaxLength) -> Self {
        self.facets.max_length = Some(max_length);
        self
    }

    pub fn with_precision(mut self, precision: u32) -> Self {
        self.facets.precision = Some(precision);
        self
    }

    pub fn with_scale(mut self, scale: Scale) -> Self {
        self.facets.scale = Some(scale);
        self
    }

    pub fn is_collection(&self) -> bool {
        matches!(self.kind, TypeRefKind::Collection(_))
    }

    /// The item type of a collection, or the reference itself.
    pub fn element_type(&self) -> &TypeRef {
        match &self.kind {
            TypeRefKind::Collection(inner) => inner.element_type(),
            _ => self,
        }
    }

    /// Full name of the referenced type without any collection wrapper.
    pub fn element_type_name(&self) -> String {
        match &self.element_type().kind {
            TypeRefKind::Primitive(kind) => kind.full_name(),
            TypeRefKind::Named(name) | TypeRefKind::EntityReference(name) => name.to_string(),
            TypeRefKind::Collection(_) => unreachable!("element_type strips collections"),
        }
    }

    /// Named (non-primitive) type referenced anywhere inside this reference.
    pub fn named_type(&self) -> Option<&Arc<str>> {
        match &self.kind {
            TypeRefKind::Named(name) | TypeRefKind::EntityReference(name) => Some(name),
            TypeRefKind::Collection(inner) => inner.named_type(),
            TypeRefKind::Primitive(_) => None,
        }
    }

    /// A copy with all facets removed; nullability is kept at every level.
    pub fn strip_facets(&self) -> TypeRef {
        let kind = match &self.kind {
            TypeRefKind::Collection(inner) => {
                TypeRefKind::Collection(Box::new(inner.strip_facets()))
            }
            other => other.clone(),
        };
        TypeRef {
            kind,
            nullable: self.nullable,
            facets: Facets::default(),
        }
    }

    /// Parse the textual type name used in CSDL `Type` attributes.
    ///
    /// Returns `None` for malformed names such as `Collection(` or `NS.`.
    pub fn parse(text: &str) -> Option<TypeRef> {
        let text = text.trim();
        let (head, argument) = split_type_name_arguments(text)?;
        match (head, argument) {
            ("Collection", Some(inner)) => {
                let inner = TypeRef::parse(inner)?;
                if inner.is_collection() {
                    return None;
                }
                Some(TypeRef::collection(inner))
            }
            ("Ref", Some(inner)) => {
                split_qualified(inner)?;
                Some(TypeRef::entity_reference(inner))
            }
            (_, Some(_)) => None,
            (name, None) => {
                split_qualified(name)?;
                Some(TypeRef::named(name))
            }
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TypeRefKind::Primitive(kind) => write!(f, "{kind}"),
            TypeRefKind::Named(name) => f.write_str(name),
            TypeRefKind::Collection(inner) => write!(f, "Collection({inner})"),
            TypeRefKind::EntityReference(name) => write!(f, "Ref({name})"),
        }
    }
}
