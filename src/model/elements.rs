//! Schema elements: the nodes of the metadata graph.
//!
//! Edges between elements (base types, property types, partners, binding
//! targets) are stored as full names and resolved on query, so cyclic or
//! dangling references never create cyclic ownership.

use std::fmt;
use std::sync::Arc;

use crate::base::{SourceLocation, qualify};

use super::types::{Facets, PrimitiveKind, TypeRef};

// ============================================================================
// ELEMENT KINDS
// ============================================================================

/// The discriminant of a [`Definition`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementKind {
    Primitive,
    EntityType,
    ComplexType,
    EnumType,
    TypeDefinition,
    Term,
    Function,
    Action,
    EntityContainer,
    /// Placeholder for a name that resolved to nothing, so its kind is not known.
    Unknown,
}

impl ElementKind {
    /// Returns true for kinds found by `find_type`.
    pub fn is_type(self) -> bool {
        matches!(
            self,
            Self::Primitive
                | Self::EntityType
                | Self::ComplexType
                | Self::EnumType
                | Self::TypeDefinition
        )
    }

    pub fn is_structured(self) -> bool {
        matches!(self, Self::EntityType | Self::ComplexType)
    }

    pub fn is_operation(self) -> bool {
        matches!(self, Self::Function | Self::Action)
    }

    /// The CSDL element name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Primitive => "PrimitiveType",
            Self::EntityType => "EntityType",
            Self::ComplexType => "ComplexType",
            Self::EnumType => "EnumType",
            Self::TypeDefinition => "TypeDefinition",
            Self::Term => "Term",
            Self::Function => "Function",
            Self::Action => "Action",
            Self::EntityContainer => "EntityContainer",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SCHEMA ELEMENT
// ============================================================================

/// A named, namespaced schema element.
///
/// Identity is `(namespace, name)`. `alias` is the alternate namespace
/// identifier of the declaring schema, usable in name resolution.
#[derive(Clone, Debug, PartialEq)]
pub struct SchemaElement {
    pub namespace: Arc<str>,
    pub name: Arc<str>,
    pub alias: Option<Arc<str>>,
    pub location: Option<SourceLocation>,
    pub definition: Definition,
}

/// The kind-specific body of a schema element.
#[derive(Clone, Debug, PartialEq)]
pub enum Definition {
    Primitive(PrimitiveKind),
    EntityType(StructuredType),
    ComplexType(StructuredType),
    EnumType(EnumType),
    TypeDefinition(TypeDefinition),
    Term(Term),
    Operation(Operation),
    EntityContainer(EntityContainer),
}

impl SchemaElement {
    pub fn new(
        namespace: impl Into<Arc<str>>,
        name: impl Into<Arc<str>>,
        definition: Definition,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            alias: None,
            location: None,
            definition,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<Arc<str>>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    /// `namespace.name`.
    pub fn full_name(&self) -> String {
        qualify(&self.namespace, &self.name)
    }

    /// `alias.name`, when the declaring schema has an alias.
    pub fn alias_name(&self) -> Option<String> {
        self.alias.as_deref().map(|alias| qualify(alias, &self.name))
    }

    pub fn kind(&self) -> ElementKind {
        match &self.definition {
            Definition::Primitive(_) => ElementKind::Primitive,
            Definition::EntityType(_) => ElementKind::EntityType,
            Definition::ComplexType(_) => ElementKind::ComplexType,
            Definition::EnumType(_) => ElementKind::EnumType,
            Definition::TypeDefinition(_) => ElementKind::TypeDefinition,
            Definition::Term(_) => ElementKind::Term,
            Definition::Operation(op) => match op.kind {
                OperationKind::Function => ElementKind::Function,
                OperationKind::Action => ElementKind::Action,
            },
            Definition::EntityContainer(_) => ElementKind::EntityContainer,
        }
    }

    pub fn as_structured_type(&self) -> Option<&StructuredType> {
        match &self.definition {
            Definition::EntityType(ty) | Definition::ComplexType(ty) => Some(ty),
            _ => None,
        }
    }

    pub fn as_enum_type(&self) -> Option<&EnumType> {
        match &self.definition {
            Definition::EnumType(ty) => Some(ty),
            _ => None,
        }
    }

    pub fn as_type_definition(&self) -> Option<&TypeDefinition> {
        match &self.definition {
            Definition::TypeDefinition(ty) => Some(ty),
            _ => None,
        }
    }

    pub fn as_term(&self) -> Option<&Term> {
        match &self.definition {
            Definition::Term(term) => Some(term),
            _ => None,
        }
    }

    pub fn as_operation(&self) -> Option<&Operation> {
        match &self.definition {
            Definition::Operation(op) => Some(op),
            _ => None,
        }
    }

    pub fn as_entity_container(&self) -> Option<&EntityContainer> {
        match &self.definition {
            Definition::EntityContainer(container) => Some(container),
            _ => None,
        }
    }

    pub fn as_primitive(&self) -> Option<PrimitiveKind> {
        match &self.definition {
            Definition::Primitive(kind) => Some(*kind),
            _ => None,
        }
    }

    /// Annotation target path of this element.
    ///
    /// Operations are addressed per overload, e.g. `NS.F(Edm.Int32)`.
    pub fn target_path(&self) -> String {
        match &self.definition {
            Definition::Operation(op) => op.overload_target(&self.full_name()),
            _ => self.full_name(),
        }
    }

    /// Same element ignoring where it was declared.
    pub fn without_location(&self) -> SchemaElement {
        SchemaElement {
            location: None,
            ..self.clone()
        }
    }
}

/// Annotation target path of a member (`owner/member`).
pub fn member_target(owner: &str, member: &str) -> String {
    let mut path = String::with_capacity(owner.len() + member.len() + 1);
    path.push_str(owner);
    path.push('/');
    path.push_str(member);
    path
}

// ============================================================================
// STRUCTURED TYPES
// ============================================================================

/// Entity or complex type body.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StructuredType {
    /// Full name of the base type, possibly unresolved.
    pub base_type: Option<Arc<str>>,
    pub is_abstract: bool,
    pub is_open: bool,
    pub has_stream: bool,
    /// Declared key (entity types only).
    pub key: Vec<PropertyRef>,
    /// Declared properties in declaration order.
    pub properties: Vec<PropertyDef>,
}

impl StructuredType {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_type(mut self, base_type: impl Into<Arc<str>>) -> Self {
        self.base_type = Some(base_type.into());
        self
    }

    pub fn with_abstract(mut self, is_abstract: bool) -> Self {
        self.is_abstract = is_abstract;
        self
    }

    pub fn with_open(mut self, is_open: bool) -> Self {
        self.is_open = is_open;
        self
    }

    pub fn with_key(mut self, names: &[&str]) -> Self {
        self.key = names.iter().map(|n| PropertyRef::new(*n)).collect();
        self
    }

    pub fn with_property(mut self, property: impl Into<PropertyDef>) -> Self {
        self.properties.push(property.into());
        self
    }

    /// Own properties only, excluding inherited ones.
    pub fn declared_properties(&self) -> &[PropertyDef] {
        &self.properties
    }

    pub fn declared_property(&self, name: &str) -> Option<&PropertyDef> {
        self.properties.iter().find(|p| &**p.name() == name)
    }

    pub fn navigation_properties(&self) -> impl Iterator<Item = &NavigationProperty> {
        self.properties.iter().filter_map(PropertyDef::as_navigation)
    }
}

/// A key member.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropertyRef {
    /// Property path (usually a simple name).
    pub name: Arc<str>,
    pub alias: Option<Arc<str>>,
}

impl PropertyRef {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            alias: None,
        }
    }
}

/// A structural or navigation property.
#[derive(Clone, Debug, PartialEq)]
pub enum PropertyDef {
    Structural(StructuralProperty),
    Navigation(NavigationProperty),
}

impl PropertyDef {
    pub fn name(&self) -> &Arc<str> {
        match self {
            Self::Structural(p) => &p.name,
            Self::Navigation(p) => &p.name,
        }
    }

    pub fn type_ref(&self) -> &TypeRef {
        match self {
            Self::Structural(p) => &p.type_ref,
            Self::Navigation(p) => &p.type_ref,
        }
    }

    pub fn as_structural(&self) -> Option<&StructuralProperty> {
        match self {
            Self::Structural(p) => Some(p),
            Self::Navigation(_) => None,
        }
    }

    pub fn as_navigation(&self) -> Option<&NavigationProperty> {
        match self {
            Self::Navigation(p) => Some(p),
            Self::Structural(_) => None,
        }
    }
}

/// A property with a primitive, enum, type-definition or complex type.
#[derive(Clone, Debug, PartialEq)]
pub struct StructuralProperty {
    pub name: Arc<str>,
    pub type_ref: TypeRef,
    pub default_value: Option<Arc<str>>,
}

impl StructuralProperty {
    pub fn new(name: impl Into<Arc<str>>, type_ref: TypeRef) -> Self {
        Self {
            name: name.into(),
            type_ref,
            default_value: None,
        }
    }

    pub fn with_default_value(mut self, value: impl Into<Arc<str>>) -> Self {
        self.default_value = Some(value.into());
        self
    }
}

impl From<StructuralProperty> for PropertyDef {
    fn from(property: StructuralProperty) -> Self {
        Self::Structural(property)
    }
}

impl From<NavigationProperty> for PropertyDef {
    fn from(property: NavigationProperty) -> Self {
        Self::Navigation(property)
    }
}

/// What happens to dependents when the principal is deleted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum OnDeleteAction {
    #[default]
    None,
    Cascade,
    SetNull,
    SetDefault,
    /// An unrecognised value, kept so validation can report it.
    Invalid(Arc<str>),
}

impl OnDeleteAction {
    pub fn parse(text: &str) -> Self {
        match text {
            "None" => Self::None,
            "Cascade" => Self::Cascade,
            "SetNull" => Self::SetNull,
            "SetDefault" => Self::SetDefault,
            other => Self::Invalid(Arc::from(other)),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::None => "None",
            Self::Cascade => "Cascade",
            Self::SetNull => "SetNull",
            Self::SetDefault => "SetDefault",
            Self::Invalid(raw) => raw,
        }
    }
}

/// A `(dependent, principal)` property pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReferentialConstraint {
    pub dependent_property: Arc<str>,
    pub principal_property: Arc<str>,
}

impl ReferentialConstraint {
    pub fn new(dependent: impl Into<Arc<str>>, principal: impl Into<Arc<str>>) -> Self {
        Self {
            dependent_property: dependent.into(),
            principal_property: principal.into(),
        }
    }
}

/// A property whose type is an entity type or a collection of one.
#[derive(Clone, Debug, PartialEq)]
pub struct NavigationProperty {
    pub name: Arc<str>,
    pub type_ref: TypeRef,
    /// Name of the inverse navigation property on the target type.
    pub partner: Option<Arc<str>>,
    pub contains_target: bool,
    pub referential_constraints: Vec<ReferentialConstraint>,
    pub on_delete: OnDeleteAction,
}

impl NavigationProperty {
    pub fn new(name: impl Into<Arc<str>>, type_ref: TypeRef) -> Self {
        Self {
            name: name.into(),
            type_ref,
            partner: None,
            contains_target: false,
            referential_constraints: Vec::new(),
            on_delete: OnDeleteAction::None,
        }
    }

    pub fn with_partner(mut self, partner: impl Into<Arc<str>>) -> Self {
        self.partner = Some(partner.into());
        self
    }

    pub fn with_contains_target(mut self, contains_target: bool) -> Self {
        self.contains_target = contains_target;
        self
    }

    pub fn with_constraint(mut self, constraint: ReferentialConstraint) -> Self {
        self.referential_constraints.push(constraint);
        self
    }

    pub fn with_on_delete(mut self, on_delete: OnDeleteAction) -> Self {
        self.on_delete = on_delete;
        self
    }

    /// Full name of the target entity type.
    pub fn target_type_name(&self) -> String {
        self.type_ref.element_type_name()
    }
}

// ============================================================================
// ENUMS, TYPE DEFINITIONS, TERMS
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
pub struct EnumType {
    pub underlying: PrimitiveKind,
    pub is_flags: bool,
    pub members: Vec<EnumMember>,
}

impl Default for EnumType {
    fn default() -> Self {
        Self {
            underlying: PrimitiveKind::Int32,
            is_flags: false,
            members: Vec::new(),
        }
    }
}

impl EnumType {
    pub fn with_member(mut self, name: impl Into<Arc<str>>, value: Option<i64>) -> Self {
        self.members.push(EnumMember {
            name: name.into(),
            value,
        });
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumMember {
    pub name: Arc<str>,
    pub value: Option<i64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TypeDefinition {
    pub underlying: PrimitiveKind,
    pub facets: Facets,
}

/// A named, typed annotation schema.
#[derive(Clone, Debug, PartialEq)]
pub struct Term {
    pub type_ref: TypeRef,
    pub base_term: Option<Arc<str>>,
    pub default_value: Option<Arc<str>>,
    /// Symbolic element kinds the term applies to.
    pub applies_to: Vec<Arc<str>>,
}

impl Term {
    pub fn new(type_ref: TypeRef) -> Self {
        Self {
            type_ref,
            base_term: None,
            default_value: None,
            applies_to: Vec::new(),
        }
    }
}

// ============================================================================
// OPERATIONS
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Function,
    Action,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Parameter {
    pub name: Arc<str>,
    pub type_ref: TypeRef,
}

impl Parameter {
    pub fn new(name: impl Into<Arc<str>>, type_ref: TypeRef) -> Self {
        Self {
            name: name.into(),
            type_ref,
        }
    }
}

/// A function or action. Several may share a full name (an overload set).
#[derive(Clone, Debug, PartialEq)]
pub struct Operation {
    pub kind: OperationKind,
    pub is_bound: bool,
    /// Functions only.
    pub is_composable: bool,
    pub entity_set_path: Option<Arc<str>>,
    pub parameters: Vec<Parameter>,
    pub return_type: Option<TypeRef>,
}

impl Operation {
    pub fn function() -> Self {
        Self::new(OperationKind::Function)
    }

    pub fn action() -> Self {
        Self::new(OperationKind::Action)
    }

    fn new(kind: OperationKind) -> Self {
        Self {
            kind,
            is_bound: false,
            is_composable: false,
            entity_set_path: None,
            parameters: Vec::new(),
            return_type: None,
        }
    }

    pub fn with_bound(mut self, is_bound: bool) -> Self {
        self.is_bound = is_bound;
        self
    }

    pub fn with_parameter(mut self, name: impl Into<Arc<str>>, type_ref: TypeRef) -> Self {
        self.parameters.push(Parameter::new(name, type_ref));
        self
    }

    pub fn with_return_type(mut self, return_type: TypeRef) -> Self {
        self.return_type = Some(return_type);
        self
    }

    pub fn with_entity_set_path(mut self, path: impl Into<Arc<str>>) -> Self {
        self.entity_set_path = Some(path.into());
        self
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| &*p.name == name)
    }

    /// The binding parameter of a bound operation.
    pub fn binding_parameter(&self) -> Option<&Parameter> {
        if self.is_bound {
            self.parameters.first()
        } else {
            None
        }
    }

    /// `NS.F(T1,T2)` target path addressing this overload.
    pub fn overload_target(&self, full_name: &str) -> String {
        let types: Vec<String> = self
            .parameters
            .iter()
            .map(|p| p.type_ref.to_string())
            .collect();
        format!("{full_name}({})", types.join(","))
    }
}

// ============================================================================
// ENTITY CONTAINER
// ============================================================================

#[derive(Clone, Debug, Default, PartialEq)]
pub struct EntityContainer {
    /// Full name of an extended container.
    pub extends: Option<Arc<str>>,
    pub elements: Vec<ContainerElement>,
}

impl EntityContainer {
    pub fn with_element(mut self, element: impl Into<ContainerElement>) -> Self {
        self.elements.push(element.into());
        self
    }

    /// Declared child by name (not searching extended containers).
    pub fn element(&self, name: &str) -> Option<&ContainerElement> {
        self.elements.iter().find(|e| &**e.name() == name)
    }

    pub fn entity_sets(&self) -> impl Iterator<Item = &EntitySet> {
        self.elements.iter().filter_map(|e| match e {
            ContainerElement::EntitySet(set) => Some(set),
            _ => None,
        })
    }

    pub fn operation_imports(&self) -> impl Iterator<Item = &OperationImport> {
        self.elements.iter().filter_map(ContainerElement::as_operation_import)
    }
}

/// A child of an entity container.
#[derive(Clone, Debug, PartialEq)]
pub enum ContainerElement {
    EntitySet(EntitySet),
    Singleton(Singleton),
    OperationImport(OperationImport),
}

impl ContainerElement {
    pub fn name(&self) -> &Arc<str> {
        match self {
            Self::EntitySet(e) => &e.name,
            Self::Singleton(s) => &s.name,
            Self::OperationImport(i) => &i.name,
        }
    }

    /// Navigation property bindings of sets and singletons.
    pub fn bindings(&self) -> &[NavigationPropertyBinding] {
        match self {
            Self::EntitySet(e) => &e.bindings,
            Self::Singleton(s) => &s.bindings,
            Self::OperationImport(_) => &[],
        }
    }

    /// Entity type of a set or singleton.
    pub fn entity_type_name(&self) -> Option<&Arc<str>> {
        match self {
            Self::EntitySet(e) => Some(&e.entity_type),
            Self::Singleton(s) => Some(&s.entity_type),
            Self::OperationImport(_) => None,
        }
    }

    pub fn as_operation_import(&self) -> Option<&OperationImport> {
        match self {
            Self::OperationImport(import) => Some(import),
            _ => None,
        }
    }

    pub fn is_navigation_source(&self) -> bool {
        !matches!(self, Self::OperationImport(_))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EntitySet {
    pub name: Arc<str>,
    pub entity_type: Arc<str>,
    pub include_in_service_document: bool,
    pub bindings: Vec<NavigationPropertyBinding>,
}

impl EntitySet {
    pub fn new(name: impl Into<Arc<str>>, entity_type: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            entity_type: entity_type.into(),
            include_in_service_document: true,
            bindings: Vec::new(),
        }
    }

    pub fn with_binding(mut self, path: impl Into<Arc<str>>, target: impl Into<Arc<str>>) -> Self {
        self.bindings.push(NavigationPropertyBinding::new(path, target));
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Singleton {
    pub name: Arc<str>,
    pub entity_type: Arc<str>,
    /// Whether the singleton may have no instance.
    pub nullable: bool,
    pub bindings: Vec<NavigationPropertyBinding>,
}

impl Singleton {
    pub fn new(name: impl Into<Arc<str>>, entity_type: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            entity_type: entity_type.into(),
            nullable: false,
            bindings: Vec::new(),
        }
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn with_binding(mut self, path: impl Into<Arc<str>>, target: impl Into<Arc<str>>) -> Self {
        self.bindings.push(NavigationPropertyBinding::new(path, target));
        self
    }
}

/// Maps a navigation path on a set to a target set or singleton.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NavigationPropertyBinding {
    /// `Nav`, `NS.Derived/Nav` or a path through complex properties.
    pub path: Arc<str>,
    /// `Set` in the same container or `NS.Container/Set`.
    pub target: Arc<str>,
}

impl NavigationPropertyBinding {
    pub fn new(path: impl Into<Arc<str>>, target: impl Into<Arc<str>>) -> Self {
        Self {
            path: path.into(),
            target: target.into(),
        }
    }
}

/// A function import or action import.
#[derive(Clone, Debug, PartialEq)]
pub struct OperationImport {
    pub kind: OperationKind,
    pub name: Arc<str>,
    /// Full name of the imported operation (overload set).
    pub operation: Arc<str>,
    pub entity_set: Option<Arc<str>>,
    pub include_in_service_document: bool,
}

impl OperationImport {
    pub fn function(name: impl Into<Arc<str>>, function: impl Into<Arc<str>>) -> Self {
        Self {
            kind: OperationKind::Function,
            name: name.into(),
            operation: function.into(),
            entity_set: None,
            include_in_service_document: false,
        }
    }

    pub fn action(name: impl Into<Arc<str>>, action: impl Into<Arc<str>>) -> Self {
        Self {
            kind: OperationKind::Action,
            name: name.into(),
            operation: action.into(),
            entity_set: None,
            include_in_service_document: false,
        }
    }
}

impl From<EntitySet> for ContainerElement {
    fn from(set: EntitySet) -> Self {
        Self::EntitySet(set)
    }
}

impl From<Singleton> for ContainerElement {
    fn from(singleton: Singleton) -> Self {
        Self::Singleton(singleton)
    }
}

impl From<OperationImport> for ContainerElement {
    fn from(import: OperationImport) -> Self {
        Self::OperationImport(import)
    }
}
