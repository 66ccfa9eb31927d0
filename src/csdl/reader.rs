//! CSDL XML reader.
//!
//! Reading happens in two phases:
//!
//! 1. every document is tokenized into an [`XmlElement`] tree (in parallel)
//! 2. the trees are converted, in document order, into model elements
//!
//! Alias-qualified names are rewritten to namespace-qualified names while
//! converting, using the aliases the document itself declares. Elements keep
//! the alias of their schema.

use std::sync::Arc;

use rayon::prelude::*;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::base::{DocumentId, qualify, split_qualified};
use crate::model::{
    ConstantKind, ContainerElement, Definition, DiagnosticCollector, EdmError, EdmErrorCode,
    EntityContainer, EntitySet, EnumMember, EnumType, Expression, Facets, MaxLength, Model,
    NavigationProperty, NavigationPropertyBinding, OnDeleteAction, Operation, OperationImport,
    OperationKind, Parameter, PathKind, PrimitiveKind, PropertyDef, PropertyRef,
    PropertyValue, RecordExpression, ReferenceInclude, ReferentialConstraint, Scale,
    SchemaElement, SchemaReference, Singleton, Srid, StructuralProperty, StructuredType, Term,
    TypeDefinition, TypeRef, TypeRefKind, VocabularyAnnotation, member_target,
};

use super::error::CsdlErrors;
use super::namespace::{EDM, EDMX};
use super::xml::{XmlElement, parse_document};
use super::{CsdlModel, ModelParts};

const SUPPORTED_VERSIONS: &[&str] = &["4.0", "4.01"];
const FACET_ATTRIBUTES: &[&str] =
    &["Nullable", "MaxLength", "Precision", "Scale", "SRID", "Unicode"];
const RETURN_TYPE_MEMBER: &str = "$ReturnType";

// ============================================================================
// SETTINGS
// ============================================================================

/// Reader configuration.
#[derive(Clone, Debug)]
pub struct CsdlReaderSettings {
    /// Tokenize documents on the rayon thread pool.
    pub parallel: bool,
    /// Report unknown unprefixed attributes as fatal errors.
    pub strict_attributes: bool,
}

impl Default for CsdlReaderSettings {
    fn default() -> Self {
        Self {
            parallel: true,
            strict_attributes: true,
        }
    }
}

impl CsdlReaderSettings {
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_strict_attributes(mut self, strict: bool) -> Self {
        self.strict_attributes = strict;
        self
    }
}

// ============================================================================
// READER
// ============================================================================

/// Parses CSDL documents plus already-built referenced models.
#[derive(Clone, Debug, Default)]
pub struct CsdlReader {
    settings: CsdlReaderSettings,
    references: Vec<Arc<dyn Model>>,
}

impl CsdlReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(mut self, settings: CsdlReaderSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Add a model the parsed model will reference.
    pub fn with_reference(mut self, model: Arc<dyn Model>) -> Self {
        self.references.push(model);
        self
    }

    pub fn settings(&self) -> &CsdlReaderSettings {
        &self.settings
    }

    /// Parse `documents` into one model.
    ///
    /// Fails with every fatal error of every document; semantic problems are
    /// left for the resolver and `validate()`.
    pub fn parse(&self, documents: &[&str]) -> Result<CsdlModel, CsdlErrors> {
        debug!(documents = documents.len(), "parsing CSDL");
        let tokenize = |(index, text): (usize, &&str)| {
            parse_document(DocumentId::new(index as u32), text)
        };
        let trees: Vec<Result<XmlElement, Vec<EdmError>>> = if self.settings.parallel {
            documents.par_iter().enumerate().map(tokenize).collect()
        } else {
            documents.iter().enumerate().map(tokenize).collect()
        };

        let mut parts = ModelParts {
            references: self.references.clone(),
            ..ModelParts::default()
        };
        let mut errors = DiagnosticCollector::new();
        for tree in trees {
            match tree {
                Ok(root) => {
                    let mut reader = DocumentReader::new(&self.settings, &mut parts);
                    reader.read_root(&root);
                    errors.extend(reader.finish());
                }
                Err(document_errors) => errors.extend(document_errors),
            }
        }

        if errors.has_errors() {
            debug!(errors = errors.len(), "CSDL parse failed");
            return Err(CsdlErrors(errors.finish()));
        }
        debug!(
            elements = parts.elements.len(),
            annotations = parts.annotations.len(),
            "CSDL parsed"
        );
        Ok(CsdlModel::from_parts(parts))
    }
}

// ============================================================================
// DOCUMENT READER
// ============================================================================

/// Converts one document tree into model parts.
struct DocumentReader<'a> {
    settings: &'a CsdlReaderSettings,
    parts: &'a mut ModelParts,
    /// Alias → namespace, for this document only.
    aliases: FxHashMap<String, String>,
    errors: DiagnosticCollector,
}

/// Schema the element being read belongs to.
#[derive(Clone, Copy)]
struct SchemaScope<'s> {
    namespace: &'s str,
    alias: Option<&'s str>,
}

impl<'a> DocumentReader<'a> {
    fn new(settings: &'a CsdlReaderSettings, parts: &'a mut ModelParts) -> Self {
        Self {
            settings,
            parts,
            aliases: FxHashMap::default(),
            errors: DiagnosticCollector::new(),
        }
    }

    fn finish(self) -> Vec<EdmError> {
        self.errors.finish()
    }

    // ------------------------------------------------------------------------
    // Diagnostics and attribute helpers
    // ------------------------------------------------------------------------

    fn report(&mut self, code: EdmErrorCode, message: impl Into<Arc<str>>, element: &XmlElement) {
        self.errors.report(code, message, Some(element.location));
    }

    fn unexpected(&mut self, element: &XmlElement) {
        self.report(
            EdmErrorCode::UnexpectedXmlElement,
            format!("The element '{}' was unexpected", element.local_name),
            element,
        );
    }

    fn check_attributes(&mut self, element: &XmlElement, allowed: &[&str]) {
        if !self.settings.strict_attributes {
            return;
        }
        let unexpected: Vec<String> = element
            .local_attributes()
            .filter(|a| !allowed.contains(&a.local_name.as_str()))
            .map(|a| a.local_name.clone())
            .collect();
        for name in unexpected {
            self.report(
                EdmErrorCode::UnexpectedXmlAttribute,
                format!(
                    "The attribute '{name}' was not expected on '{}'",
                    element.local_name
                ),
                element,
            );
        }
    }

    /// Children in the EDM namespace; foreign children are skipped.
    fn edm_children<'x>(&mut self, element: &'x XmlElement) -> Vec<&'x XmlElement> {
        let mut children = Vec::new();
        for child in &element.children {
            match child.namespace.as_deref() {
                Some(EDM) => children.push(child),
                Some(EDMX) | None => self.unexpected(child),
                Some(_) => {}
            }
        }
        children
    }

    fn required<'x>(&mut self, element: &'x XmlElement, name: &str) -> Option<&'x str> {
        let value = element.attribute(name);
        if value.is_none() {
            self.report(
                EdmErrorCode::MissingAttribute,
                format!(
                    "The required attribute '{name}' is missing on '{}'",
                    element.local_name
                ),
                element,
            );
        }
        value
    }

    fn boolean(&mut self, element: &XmlElement, name: &str) -> Option<bool> {
        let value = element.attribute(name)?;
        match value.trim() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            other => {
                self.report(
                    EdmErrorCode::InvalidBoolean,
                    format!("'{other}' is not a valid boolean for '{name}'"),
                    element,
                );
                None
            }
        }
    }

    fn unsigned(&mut self, element: &XmlElement, name: &str, code: EdmErrorCode) -> Option<u32> {
        let value = element.attribute(name)?;
        match value.trim().parse::<u32>() {
            Ok(n) => Some(n),
            Err(_) => {
                self.report(
                    code,
                    format!("'{value}' is not a valid value for '{name}'"),
                    element,
                );
                None
            }
        }
    }

    fn facets(&mut self, element: &XmlElement) -> Facets {
        let max_length = match element.attribute("MaxLength") {
            Some(value) if value.trim().eq_ignore_ascii_case("max") => Some(MaxLength::Max),
            Some(_) => self
                .unsigned(element, "MaxLength", EdmErrorCode::InvalidMaxLength)
                .map(MaxLength::Length),
            None => None,
        };
        let precision = self.unsigned(element, "Precision", EdmErrorCode::InvalidInteger);
        let scale = match element.attribute("Scale") {
            Some(value) if matches!(value.trim(), "variable" | "floating") => Some(Scale::Variable),
            Some(_) => self
                .unsigned(element, "Scale", EdmErrorCode::InvalidScale)
                .map(Scale::Value),
            None => None,
        };
        let srid = match element.attribute("SRID") {
            Some(value) if value.trim().eq_ignore_ascii_case("variable") => Some(Srid::Variable),
            Some(_) => self
                .unsigned(element, "SRID", EdmErrorCode::InvalidSrid)
                .map(Srid::Value),
            None => None,
        };
        let unicode = self.boolean(element, "Unicode");
        Facets {
            max_length,
            precision,
            scale,
            srid,
            unicode,
        }
    }

    // ------------------------------------------------------------------------
    // Name normalization
    // ------------------------------------------------------------------------

    /// Rewrite an alias-qualified name to its namespace-qualified form.
    fn normalize(&self, name: &str) -> String {
        match split_qualified(name) {
            Some((prefix, simple)) => match self.aliases.get(prefix) {
                Some(namespace) => qualify(namespace, simple),
                None => name.to_string(),
            },
            None => name.to_string(),
        }
    }

    /// A name that must be qualified, normalized.
    fn qualified(&mut self, element: &XmlElement, attribute: &str, value: &str) -> Option<String> {
        if split_qualified(value).is_none() {
            self.report(
                EdmErrorCode::InvalidQualifiedName,
                format!("'{value}' in '{attribute}' is not a qualified name"),
                element,
            );
            return None;
        }
        Some(self.normalize(value))
    }

    fn normalize_type_ref(&self, type_ref: TypeRef) -> TypeRef {
        let kind = match type_ref.kind {
            TypeRefKind::Named(name) => {
                let normalized = self.normalize(&name);
                match PrimitiveKind::from_full_name(&normalized) {
                    Some(primitive) => TypeRefKind::Primitive(primitive),
                    None => TypeRefKind::Named(Arc::from(normalized)),
                }
            }
            TypeRefKind::EntityReference(name) => {
                TypeRefKind::EntityReference(Arc::from(self.normalize(&name)))
            }
            TypeRefKind::Collection(inner) => {
                TypeRefKind::Collection(Box::new(self.normalize_type_ref(*inner)))
            }
            primitive @ TypeRefKind::Primitive(_) => primitive,
        };
        TypeRef { kind, ..type_ref }
    }

    /// Normalize each qualified segment of a `/`-separated path.
    fn normalize_path(&self, path: &str) -> String {
        path.split('/')
            .map(|segment| {
                if let Some(term) = segment.strip_prefix('@') {
                    let (term, qualifier) = match term.split_once('#') {
                        Some((term, qualifier)) => (term, Some(qualifier)),
                        None => (term, None),
                    };
                    let mut normalized = format!("@{}", self.normalize(term));
                    if let Some(qualifier) = qualifier {
                        normalized.push('#');
                        normalized.push_str(qualifier);
                    }
                    normalized
                } else if segment.contains('(') {
                    self.normalize_overload(segment)
                } else {
                    self.normalize(segment)
                }
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    /// `Alias.F(Alias.T,Edm.Int32)` → `NS.F(NS.T,Edm.Int32)`.
    fn normalize_overload(&self, text: &str) -> String {
        let Some((name, rest)) = text.split_once('(') else {
            return self.normalize(text);
        };
        let Some(parameters) = rest.strip_suffix(')') else {
            return text.to_string();
        };
        let parameters: Vec<String> = if parameters.is_empty() {
            Vec::new()
        } else {
            split_parameter_list(parameters)
                .into_iter()
                .map(|p| match TypeRef::parse(p) {
                    Some(type_ref) => self.normalize_type_ref(type_ref).to_string(),
                    None => p.trim().to_string(),
                })
                .collect()
        };
        format!("{}({})", self.normalize(name), parameters.join(","))
    }

    fn normalize_enum_members(&self, text: &str) -> String {
        text.split_whitespace()
            .map(|member| match member.split_once('/') {
                Some((ty, name)) => format!("{}/{name}", self.normalize(ty)),
                None => member.to_string(),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    // ------------------------------------------------------------------------
    // Roots
    // ------------------------------------------------------------------------

    fn read_root(&mut self, root: &XmlElement) {
        if root.is(EDMX, "Edmx") {
            self.read_edmx(root);
        } else if root.is(EDM, "Schema") {
            self.collect_schema_alias(root);
            self.read_schema(root);
        } else {
            self.report(
                EdmErrorCode::UnexpectedXmlElement,
                format!(
                    "The root element '{}' is not an EDMX or EDM Schema element",
                    root.local_name
                ),
                root,
            );
        }
    }

    fn collect_schema_alias(&mut self, schema: &XmlElement) {
        let namespace = schema.attribute("Namespace");
        if let (Some(namespace), Some(alias)) = (namespace, schema.attribute("Alias")) {
            self.aliases.insert(alias.to_string(), namespace.to_string());
            self.parts
                .aliases
                .entry(Arc::from(namespace))
                .or_insert_with(|| Arc::from(alias));
        }
    }

    fn read_edmx(&mut self, root: &XmlElement) {
        self.check_attributes(root, &["Version"]);
        if let Some(version) = self.required(root, "Version") {
            if !SUPPORTED_VERSIONS.contains(&version.trim()) {
                self.report(
                    EdmErrorCode::InvalidVersionNumber,
                    format!("The EDMX version '{version}' is not supported"),
                    root,
                );
            }
        }

        // Aliases are visible in the whole document, before their declaration.
        for child in &root.children {
            if child.is(EDMX, "Reference") {
                for include in child.children.iter().filter(|c| c.is(EDMX, "Include")) {
                    if let (Some(namespace), Some(alias)) =
                        (include.attribute("Namespace"), include.attribute("Alias"))
                    {
                        self.aliases.insert(alias.to_string(), namespace.to_string());
                    }
                }
            } else if child.is(EDMX, "DataServices") {
                for schema in child.children.iter().filter(|c| c.is(EDM, "Schema")) {
                    self.collect_schema_alias(schema);
                }
            }
        }

        for child in &root.children {
            match (child.namespace.as_deref(), child.local_name.as_str()) {
                (Some(EDMX), "Reference") => self.read_reference(child),
                (Some(EDMX), "DataServices") => {
                    self.check_attributes(child, &[]);
                    for schema in &child.children {
                        match schema.namespace.as_deref() {
                            Some(EDM) if schema.local_name == "Schema" => self.read_schema(schema),
                            Some(EDM) | Some(EDMX) | None => self.unexpected(schema),
                            Some(_) => {}
                        }
                    }
                }
                (Some(EDMX), _) | (Some(EDM), _) | (None, _) => self.unexpected(child),
                _ => {}
            }
        }
    }

    fn read_reference(&mut self, element: &XmlElement) {
        self.check_attributes(element, &["Uri"]);
        let Some(uri) = self.required(element, "Uri") else {
            return;
        };
        let mut reference = SchemaReference {
            uri: Arc::from(uri),
            includes: Vec::new(),
        };
        for child in &element.children {
            match (child.namespace.as_deref(), child.local_name.as_str()) {
                (Some(EDMX), "Include") => {
                    self.check_attributes(child, &["Namespace", "Alias"]);
                    if let Some(namespace) = self.required(child, "Namespace") {
                        reference.includes.push(ReferenceInclude {
                            namespace: Arc::from(namespace),
                            alias: child.attribute("Alias").map(Arc::from),
                        });
                    }
                }
                (Some(EDMX), "IncludeAnnotations") => {
                    self.check_attributes(
                        child,
                        &["TermNamespace", "Qualifier", "TargetNamespace"],
                    );
                    self.required(child, "TermNamespace");
                }
                (Some(EDM), "Annotation") => {}
                (Some(EDMX), _) | (None, _) => self.unexpected(child),
                _ => {}
            }
        }
        self.parts.schema_references.push(reference);
    }

    // ------------------------------------------------------------------------
    // Schema
    // ------------------------------------------------------------------------

    fn read_schema(&mut self, schema: &XmlElement) {
        self.check_attributes(schema, &["Namespace", "Alias"]);
        let Some(namespace) = self.required(schema, "Namespace") else {
            return;
        };
        let scope = SchemaScope {
            namespace,
            alias: schema.attribute("Alias"),
        };
        debug!(namespace, "reading schema");

        for child in self.edm_children(schema) {
            match child.local_name.as_str() {
                "EntityType" => self.read_structured_type(child, scope, true),
                "ComplexType" => self.read_structured_type(child, scope, false),
                "EnumType" => self.read_enum_type(child, scope),
                "TypeDefinition" => self.read_type_definition(child, scope),
                "Term" => self.read_term(child, scope),
                "Function" => self.read_operation(child, scope, OperationKind::Function),
                "Action" => self.read_operation(child, scope, OperationKind::Action),
                "EntityContainer" => self.read_entity_container(child, scope),
                "Annotations" => self.read_annotations_block(child, scope),
                "Annotation" => self.read_inline_annotation(child, namespace, scope),
                _ => self.unexpected(child),
            }
        }
    }

    fn push_element(
        &mut self,
        scope: SchemaScope<'_>,
        name: &str,
        definition: Definition,
        source: &XmlElement,
    ) {
        let mut element = SchemaElement::new(scope.namespace, name, definition)
            .with_location(source.location);
        if let Some(alias) = scope.alias {
            element = element.with_alias(alias);
        }
        self.parts.elements.push(element);
    }

    // ------------------------------------------------------------------------
    // Types
    // ------------------------------------------------------------------------

    fn read_structured_type(&mut self, element: &XmlElement, scope: SchemaScope<'_>, entity: bool) {
        if entity {
            self.check_attributes(
                element,
                &["Name", "BaseType", "Abstract", "OpenType", "HasStream"],
            );
        } else {
            self.check_attributes(element, &["Name", "BaseType", "Abstract", "OpenType"]);
        }
        let Some(name) = self.required(element, "Name") else {
            return;
        };
        let full_name = qualify(scope.namespace, name);

        let mut body = StructuredType::new();
        if let Some(base) = element.attribute("BaseType") {
            body.base_type = self.qualified(element, "BaseType", base).map(Arc::from);
        }
        body.is_abstract = self.boolean(element, "Abstract").unwrap_or(false);
        body.is_open = self.boolean(element, "OpenType").unwrap_or(false);
        body.has_stream = self.boolean(element, "HasStream").unwrap_or(false);

        for child in self.edm_children(element) {
            match child.local_name.as_str() {
                "Key" if entity => {
                    self.check_attributes(child, &[]);
                    for property_ref in self.edm_children(child) {
                        if property_ref.local_name != "PropertyRef" {
                            self.unexpected(property_ref);
                            continue;
                        }
                        self.check_attributes(property_ref, &["Name", "Alias"]);
                        if let Some(name) = self.required(property_ref, "Name") {
                            body.key.push(PropertyRef {
                                name: Arc::from(name),
                                alias: property_ref.attribute("Alias").map(Arc::from),
                            });
                        }
                    }
                }
                "Property" => {
                    if let Some(property) = self.read_property(child, &full_name, scope) {
                        body.properties.push(PropertyDef::Structural(property));
                    }
                }
                "NavigationProperty" => {
                    let property = self.read_navigation_property(child, &full_name, scope);
                    if let Some(property) = property {
                        body.properties.push(PropertyDef::Navigation(property));
                    }
                }
                "Annotation" => self.read_inline_annotation(child, &full_name, scope),
                _ => self.unexpected(child),
            }
        }

        let definition = if entity {
            Definition::EntityType(body)
        } else {
            Definition::ComplexType(body)
        };
        self.push_element(scope, name, definition, element);
    }

    /// Parse `Type` (or another attribute) and apply `Nullable` and facets to the item type.
    fn type_attribute(
        &mut self,
        element: &XmlElement,
        attribute: &str,
        with_facets: bool,
    ) -> Option<TypeRef> {
        let text = self.required(element, attribute)?;
        let Some(parsed) = TypeRef::parse(text) else {
            self.report(
                EdmErrorCode::InvalidTypeName,
                format!("'{text}' is not a valid type name"),
                element,
            );
            return None;
        };
        let mut type_ref = self.normalize_type_ref(parsed);
        let nullable = self.boolean(element, "Nullable").unwrap_or(true);
        let facets = if with_facets {
            self.facets(element)
        } else {
            Facets::default()
        };
        match &mut type_ref.kind {
            TypeRefKind::Collection(item) => {
                item.nullable = nullable;
                item.facets = facets;
            }
            _ => {
                type_ref.nullable = nullable;
                type_ref.facets = facets;
            }
        }
        Some(type_ref)
    }

    fn read_property(
        &mut self,
        element: &XmlElement,
        owner: &str,
        scope: SchemaScope<'_>,
    ) -> Option<StructuralProperty> {
        let mut allowed = vec!["Name", "Type", "DefaultValue"];
        allowed.extend_from_slice(FACET_ATTRIBUTES);
        self.check_attributes(element, &allowed);
        let name = self.required(element, "Name");
        let type_ref = self.type_attribute(element, "Type", true);
        let target = name.map(|name| member_target(owner, name));
        for child in self.edm_children(element) {
            match (child.local_name.as_str(), &target) {
                ("Annotation", Some(target)) => self.read_inline_annotation(child, target, scope),
                ("Annotation", None) => {}
                _ => self.unexpected(child),
            }
        }
        let mut property = StructuralProperty::new(name?, type_ref?);
        property.default_value = element.attribute("DefaultValue").map(Arc::from);
        Some(property)
    }

    fn read_navigation_property(
        &mut self,
        element: &XmlElement,
        owner: &str,
        scope: SchemaScope<'_>,
    ) -> Option<NavigationProperty> {
        self.check_attributes(element, &["Name", "Type", "Nullable", "Partner", "ContainsTarget"]);
        let name = self.required(element, "Name");
        let mut type_ref = self.type_attribute(element, "Type", false);
        if let Some(TypeRefKind::Collection(item)) = type_ref.as_mut().map(|t| &mut t.kind) {
            // Collection-valued navigation properties never hold null entities.
            item.nullable = element.attribute("Nullable").is_some() && item.nullable;
        }
        let target = name.map(|name| member_target(owner, name));

        let mut constraints = Vec::new();
        let mut on_delete = OnDeleteAction::None;
        for child in self.edm_children(element) {
            match child.local_name.as_str() {
                "ReferentialConstraint" => {
                    self.check_attributes(child, &["Property", "ReferencedProperty"]);
                    let dependent = self.required(child, "Property");
                    let principal = self.required(child, "ReferencedProperty");
                    self.read_nested_annotations(child, target.as_deref(), scope);
                    if let (Some(dependent), Some(principal)) = (dependent, principal) {
                        constraints.push(ReferentialConstraint::new(dependent, principal));
                    }
                }
                "OnDelete" => {
                    self.check_attributes(child, &["Action"]);
                    if let Some(action) = self.required(child, "Action") {
                        on_delete = OnDeleteAction::parse(action);
                    }
                    self.read_nested_annotations(child, target.as_deref(), scope);
                }
                "Annotation" => {
                    if let Some(target) = &target {
                        self.read_inline_annotation(child, target, scope);
                    }
                }
                _ => self.unexpected(child),
            }
        }

        let mut property = NavigationProperty::new(name?, type_ref?);
        property.partner = element.attribute("Partner").map(|p| Arc::from(self.normalize_path(p)));
        property.contains_target = self.boolean(element, "ContainsTarget").unwrap_or(false);
        property.referential_constraints = constraints;
        property.on_delete = on_delete;
        Some(property)
    }

    /// Annotations nested in constraint-like children attach to `target`.
    fn read_nested_annotations(
        &mut self,
        element: &XmlElement,
        target: Option<&str>,
        scope: SchemaScope<'_>,
    ) {
        for child in self.edm_children(element) {
            match (child.local_name.as_str(), target) {
                ("Annotation", Some(target)) => self.read_inline_annotation(child, target, scope),
                ("Annotation", None) => {}
                _ => self.unexpected(child),
            }
        }
    }

    fn primitive_attribute(
        &mut self,
        element: &XmlElement,
        attribute: &str,
    ) -> Option<PrimitiveKind> {
        let text = element.attribute(attribute)?;
        let kind = PrimitiveKind::from_full_name(&self.normalize(text));
        if kind.is_none() {
            self.report(
                EdmErrorCode::InvalidTypeName,
                format!("'{text}' is not a primitive type"),
                element,
            );
        }
        kind
    }

    fn read_enum_type(&mut self, element: &XmlElement, scope: SchemaScope<'_>) {
        self.check_attributes(element, &["Name", "UnderlyingType", "IsFlags"]);
        let Some(name) = self.required(element, "Name") else {
            return;
        };
        let full_name = qualify(scope.namespace, name);
        let mut body = EnumType {
            underlying: self
                .primitive_attribute(element, "UnderlyingType")
                .unwrap_or(PrimitiveKind::Int32),
            is_flags: self.boolean(element, "IsFlags").unwrap_or(false),
            members: Vec::new(),
        };
        for child in self.edm_children(element) {
            match child.local_name.as_str() {
                "Member" => {
                    self.check_attributes(child, &["Name", "Value"]);
                    let Some(member) = self.required(child, "Name") else {
                        continue;
                    };
                    let value = match child.attribute("Value") {
                        Some(text) => match text.trim().parse::<i64>() {
                            Ok(value) => Some(value),
                            Err(_) => {
                                self.report(
                                    EdmErrorCode::InvalidInteger,
                                    format!("'{text}' is not a valid enum member value"),
                                    child,
                                );
                                None
                            }
                        },
                        None => None,
                    };
                    let target = member_target(&full_name, member);
                    self.read_nested_annotations(child, Some(&target), scope);
                    body.members.push(EnumMember {
                        name: Arc::from(member),
                        value,
                    });
                }
                "Annotation" => self.read_inline_annotation(child, &full_name, scope),
                _ => self.unexpected(child),
            }
        }
        self.push_element(scope, name, Definition::EnumType(body), element);
    }

    fn read_type_definition(&mut self, element: &XmlElement, scope: SchemaScope<'_>) {
        self.check_attributes(
            element,
            &["Name", "UnderlyingType", "MaxLength", "Precision", "Scale", "SRID", "Unicode"],
        );
        let name = self.required(element, "Name");
        self.required(element, "UnderlyingType");
        let underlying = self.primitive_attribute(element, "UnderlyingType");
        let facets = self.facets(element);
        let Some(name) = name else {
            return;
        };
        let full_name = qualify(scope.namespace, name);
        self.read_nested_annotations(element, Some(&full_name), scope);
        let Some(underlying) = underlying else {
            return;
        };
        self.push_element(
            scope,
            name,
            Definition::TypeDefinition(TypeDefinition { underlying, facets }),
            element,
        );
    }

    fn read_term(&mut self, element: &XmlElement, scope: SchemaScope<'_>) {
        let mut allowed = vec!["Name", "Type", "BaseTerm", "DefaultValue", "AppliesTo"];
        allowed.extend_from_slice(FACET_ATTRIBUTES);
        self.check_attributes(element, &allowed);
        let name = self.required(element, "Name");
        let type_ref = self.type_attribute(element, "Type", true);
        let base_term = match element.attribute("BaseTerm") {
            Some(base) => self.qualified(element, "BaseTerm", base).map(Arc::from),
            None => None,
        };
        let Some(name) = name else {
            return;
        };
        let full_name = qualify(scope.namespace, name);
        self.read_nested_annotations(element, Some(&full_name), scope);
        let Some(type_ref) = type_ref else {
            return;
        };
        let mut term = Term::new(type_ref);
        term.base_term = base_term;
        term.default_value = element.attribute("DefaultValue").map(Arc::from);
        term.applies_to = element
            .attribute("AppliesTo")
            .map(|text| text.split_whitespace().map(Arc::from).collect())
            .unwrap_or_default();
        self.push_element(scope, name, Definition::Term(term), element);
    }

    // ------------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------------

    fn read_operation(
        &mut self,
        element: &XmlElement,
        scope: SchemaScope<'_>,
        kind: OperationKind,
    ) {
        let allowed: &[&str] = match kind {
            OperationKind::Function => &["Name", "IsBound", "IsComposable", "EntitySetPath"],
            OperationKind::Action => &["Name", "IsBound", "EntitySetPath"],
        };
        self.check_attributes(element, allowed);
        let name = self.required(element, "Name");
        let mut operation = match kind {
            OperationKind::Function => Operation::function(),
            OperationKind::Action => Operation::action(),
        };
        operation.is_bound = self.boolean(element, "IsBound").unwrap_or(false);
        operation.is_composable = self.boolean(element, "IsComposable").unwrap_or(false);
        operation.entity_set_path = element
            .attribute("EntitySetPath")
            .map(|path| Arc::from(self.normalize_path(path)));

        // Member annotations are read once the signature, and so the target, is known.
        let mut pending: Vec<(&XmlElement, Option<Arc<str>>)> = Vec::new();
        for child in self.edm_children(element) {
            match child.local_name.as_str() {
                "Parameter" => {
                    let mut allowed = vec!["Name", "Type"];
                    allowed.extend_from_slice(FACET_ATTRIBUTES);
                    self.check_attributes(child, &allowed);
                    let parameter_name = self.required(child, "Name");
                    let type_ref = self.type_attribute(child, "Type", true);
                    if let (Some(parameter_name), Some(type_ref)) = (parameter_name, type_ref) {
                        operation.parameters.push(Parameter::new(parameter_name, type_ref));
                        for annotation in self.edm_children(child) {
                            pending.push((annotation, Some(Arc::from(parameter_name))));
                        }
                    }
                }
                "ReturnType" => {
                    let mut allowed = vec!["Type"];
                    allowed.extend_from_slice(FACET_ATTRIBUTES);
                    self.check_attributes(child, &allowed);
                    operation.return_type = self.type_attribute(child, "Type", true);
                    for annotation in self.edm_children(child) {
                        pending.push((annotation, Some(Arc::from(RETURN_TYPE_MEMBER))));
                    }
                }
                "Annotation" => pending.push((child, None)),
                _ => self.unexpected(child),
            }
        }

        let Some(name) = name else {
            return;
        };
        let target = operation.overload_target(&qualify(scope.namespace, name));
        for (annotation, member) in pending {
            if annotation.local_name != "Annotation" {
                self.unexpected(annotation);
                continue;
            }
            let annotation_target = match member {
                Some(member) => member_target(&target, &member),
                None => target.clone(),
            };
            self.read_inline_annotation(annotation, &annotation_target, scope);
        }
        self.push_element(scope, name, Definition::Operation(operation), element);
    }

    // ------------------------------------------------------------------------
    // Entity container
    // ------------------------------------------------------------------------

    fn read_entity_container(&mut self, element: &XmlElement, scope: SchemaScope<'_>) {
        self.check_attributes(element, &["Name", "Extends"]);
        let Some(name) = self.required(element, "Name") else {
            return;
        };
        let full_name = qualify(scope.namespace, name);
        let mut container = EntityContainer::default();
        if let Some(extends) = element.attribute("Extends") {
            container.extends = self.qualified(element, "Extends", extends).map(Arc::from);
        }

        for child in self.edm_children(element) {
            let item = match child.local_name.as_str() {
                "EntitySet" => self.read_entity_set(child),
                "Singleton" => self.read_singleton(child),
                "FunctionImport" => self.read_operation_import(child, OperationKind::Function),
                "ActionImport" => self.read_operation_import(child, OperationKind::Action),
                "Annotation" => {
                    self.read_inline_annotation(child, &full_name, scope);
                    continue;
                }
                _ => {
                    self.unexpected(child);
                    continue;
                }
            };
            let Some(item) = item else {
                continue;
            };
            let target = member_target(&full_name, item.name());
            for annotation in child.children.iter().filter(|c| c.is(EDM, "Annotation")) {
                self.read_inline_annotation(annotation, &target, scope);
            }
            container.elements.push(item);
        }
        self.push_element(scope, name, Definition::EntityContainer(container), element);
    }

    /// Bindings of a set or singleton; other EDM children besides annotations are unexpected.
    fn read_bindings(&mut self, element: &XmlElement) -> Vec<NavigationPropertyBinding> {
        let mut bindings = Vec::new();
        for child in self.edm_children(element) {
            match child.local_name.as_str() {
                "NavigationPropertyBinding" => {
                    self.check_attributes(child, &["Path", "Target"]);
                    let path = self.required(child, "Path");
                    let target = self.required(child, "Target");
                    if let (Some(path), Some(target)) = (path, target) {
                        bindings.push(NavigationPropertyBinding::new(
                            self.normalize_path(path),
                            self.normalize_path(target),
                        ));
                    }
                }
                "Annotation" => {}
                _ => self.unexpected(child),
            }
        }
        bindings
    }

    fn read_entity_set(&mut self, element: &XmlElement) -> Option<ContainerElement> {
        self.check_attributes(element, &["Name", "EntityType", "IncludeInServiceDocument"]);
        let name = self.required(element, "Name");
        let entity_type = match self.required(element, "EntityType") {
            Some(ty) => self.qualified(element, "EntityType", ty),
            None => None,
        };
        let include = self.boolean(element, "IncludeInServiceDocument");
        let bindings = self.read_bindings(element);
        let mut set = EntitySet::new(name?, entity_type?);
        set.include_in_service_document = include.unwrap_or(true);
        set.bindings = bindings;
        Some(set.into())
    }

    fn read_singleton(&mut self, element: &XmlElement) -> Option<ContainerElement> {
        self.check_attributes(element, &["Name", "Type", "Nullable"]);
        let name = self.required(element, "Name");
        let entity_type = match self.required(element, "Type") {
            Some(ty) => self.qualified(element, "Type", ty),
            None => None,
        };
        let nullable = self.boolean(element, "Nullable");
        let bindings = self.read_bindings(element);
        let mut singleton =
            Singleton::new(name?, entity_type?).with_nullable(nullable.unwrap_or(false));
        singleton.bindings = bindings;
        Some(singleton.into())
    }

    fn read_operation_import(
        &mut self,
        element: &XmlElement,
        kind: OperationKind,
    ) -> Option<ContainerElement> {
        let (operation_attribute, allowed): (&str, &[&str]) = match kind {
            OperationKind::Function => (
                "Function",
                &["Name", "Function", "EntitySet", "IncludeInServiceDocument"],
            ),
            OperationKind::Action => ("Action", &["Name", "Action", "EntitySet"]),
        };
        self.check_attributes(element, allowed);
        let name = self.required(element, "Name");
        let operation = match self.required(element, operation_attribute) {
            Some(op) => self.qualified(element, operation_attribute, op),
            None => None,
        };
        let include = self.boolean(element, "IncludeInServiceDocument");
        for child in self.edm_children(element) {
            if child.local_name != "Annotation" {
                self.unexpected(child);
            }
        }
        let mut import = match kind {
            OperationKind::Function => OperationImport::function(name?, operation?),
            OperationKind::Action => OperationImport::action(name?, operation?),
        };
        import.entity_set = element
            .attribute("EntitySet")
            .map(|set| Arc::from(self.normalize_path(set)));
        import.include_in_service_document = include.unwrap_or(false);
        Some(import.into())
    }

    // ------------------------------------------------------------------------
    // Annotations
    // ------------------------------------------------------------------------

    fn read_annotations_block(&mut self, element: &XmlElement, scope: SchemaScope<'_>) {
        self.check_attributes(element, &["Target", "Qualifier"]);
        let Some(target) = self.required(element, "Target") else {
            return;
        };
        let target = self.normalize_target(target);
        let qualifier = element.attribute("Qualifier");
        for child in self.edm_children(element) {
            if child.local_name != "Annotation" {
                self.unexpected(child);
                continue;
            }
            if let Some(annotation) = self.read_annotation(child, &target, qualifier, scope) {
                self.parts.annotations.push(annotation);
            }
        }
    }

    /// Normalize the qualified head of a target path and the rest of its segments.
    fn normalize_target(&self, target: &str) -> String {
        match target.split_once('/') {
            Some((head, rest)) => format!(
                "{}/{}",
                self.normalize_overload(head),
                self.normalize_path(rest)
            ),
            None => self.normalize_overload(target),
        }
    }

    fn read_inline_annotation(
        &mut self,
        element: &XmlElement,
        target: &str,
        scope: SchemaScope<'_>,
    ) {
        if let Some(annotation) = self.read_annotation(element, target, None, scope) {
            self.parts.annotations.push(annotation.with_inline(true));
        }
    }

    fn read_annotation(
        &mut self,
        element: &XmlElement,
        target: &str,
        default_qualifier: Option<&str>,
        scope: SchemaScope<'_>,
    ) -> Option<VocabularyAnnotation> {
        let mut allowed = vec!["Term", "Qualifier"];
        allowed.extend(EXPRESSION_ATTRIBUTES);
        self.check_attributes(element, &allowed);
        let term = self.required(element, "Term")?;
        let term = self.qualified(element, "Term", term)?;
        let qualifier = element.attribute("Qualifier").or(default_qualifier);

        let mut value = self.attribute_expression(element);
        for child in self.edm_children(element) {
            if child.local_name == "Annotation" {
                debug!(term = %term, "ignoring annotation nested in an annotation");
                continue;
            }
            if value.is_some() {
                self.unexpected(child);
                continue;
            }
            value = self.element_expression(child);
        }

        let value = value.unwrap_or(Expression::Null);
        let mut annotation =
            VocabularyAnnotation::new(target, term, value).with_declared_in(scope.namespace);
        annotation.qualifier = qualifier.map(Arc::from);
        annotation.location = Some(element.location);
        Some(annotation)
    }

    /// The value of the first constant-expression attribute, if any.
    fn attribute_expression(&mut self, element: &XmlElement) -> Option<Expression> {
        let attribute = element
            .local_attributes()
            .find(|a| EXPRESSION_ATTRIBUTES.contains(&a.local_name.as_str()))?;
        self.scalar_expression(element, &attribute.local_name, &attribute.value)
    }

    fn scalar_expression(
        &mut self,
        element: &XmlElement,
        kind: &str,
        text: &str,
    ) -> Option<Expression> {
        let value = match kind {
            "String" => Expression::String(Arc::from(text)),
            "Int" => match text.trim().parse::<i64>() {
                Ok(value) => Expression::Int(value),
                Err(_) => {
                    self.report(
                        EdmErrorCode::InvalidInteger,
                        format!("'{text}' is not a valid integer"),
                        element,
                    );
                    return None;
                }
            },
            "Bool" => match text.trim() {
                "true" | "1" => Expression::Bool(true),
                "false" | "0" => Expression::Bool(false),
                _ => {
                    self.report(
                        EdmErrorCode::InvalidBoolean,
                        format!("'{text}' is not a valid boolean"),
                        element,
                    );
                    return None;
                }
            },
            "Float" => match parse_float(text) {
                Some(value) => Expression::Float(value),
                None => {
                    self.report(
                        EdmErrorCode::InvalidFloat,
                        format!("'{text}' is not a valid floating point number"),
                        element,
                    );
                    return None;
                }
            },
            "EnumMember" => Expression::EnumMember(Arc::from(self.normalize_enum_members(text))),
            other => {
                if let Some(constant) = ConstantKind::from_name(other) {
                    Expression::Constant(constant, Arc::from(text.trim()))
                } else if let Some(path) = PathKind::from_name(other) {
                    Expression::Path(path, Arc::from(self.normalize_path(text.trim())))
                } else {
                    self.unexpected(element);
                    return None;
                }
            }
        };
        Some(value)
    }

    fn element_expression(&mut self, element: &XmlElement) -> Option<Expression> {
        match element.local_name.as_str() {
            "Null" => {
                self.check_attributes(element, &[]);
                Some(Expression::Null)
            }
            "Collection" => {
                self.check_attributes(element, &[]);
                let mut items = Vec::new();
                for child in self.edm_children(element) {
                    if child.local_name == "Annotation" {
                        continue;
                    }
                    items.extend(self.element_expression(child));
                }
                Some(Expression::Collection(items))
            }
            "Record" => {
                self.check_attributes(element, &["Type"]);
                let type_name = match element.attribute("Type") {
                    Some(ty) => self.qualified(element, "Type", ty).map(Arc::from),
                    None => None,
                };
                let mut record = RecordExpression {
                    type_name,
                    properties: Vec::new(),
                };
                for child in self.edm_children(element) {
                    match child.local_name.as_str() {
                        "PropertyValue" => {
                            if let Some(value) = self.read_property_value(child) {
                                record.properties.push(value);
                            }
                        }
                        "Annotation" => {}
                        _ => self.unexpected(child),
                    }
                }
                Some(Expression::Record(record))
            }
            kind if EXPRESSION_ATTRIBUTES.contains(&kind) => {
                self.check_attributes(element, &[]);
                let text = element.text.clone();
                self.scalar_expression(element, kind, &text)
            }
            _ => {
                self.unexpected(element);
                None
            }
        }
    }

    fn read_property_value(&mut self, element: &XmlElement) -> Option<PropertyValue> {
        let mut allowed = vec!["Property"];
        allowed.extend(EXPRESSION_ATTRIBUTES);
        self.check_attributes(element, &allowed);
        let property = self.required(element, "Property")?;
        let mut value = self.attribute_expression(element);
        for child in self.edm_children(element) {
            if child.local_name == "Annotation" {
                continue;
            }
            if value.is_some() {
                self.unexpected(child);
                continue;
            }
            value = self.element_expression(child);
        }
        Some(PropertyValue {
            property: Arc::from(property),
            value: value.unwrap_or(Expression::Null),
        })
    }
}

/// Attribute (and element) names of constant and path expressions.
const EXPRESSION_ATTRIBUTES: &[&str] = &[
    "String",
    "Int",
    "Bool",
    "Float",
    "Decimal",
    "Binary",
    "Date",
    "DateTimeOffset",
    "Duration",
    "Guid",
    "TimeOfDay",
    "EnumMember",
    "Path",
    "PropertyPath",
    "NavigationPropertyPath",
    "AnnotationPath",
];

fn parse_float(text: &str) -> Option<f64> {
    match text.trim() {
        "INF" => Some(f64::INFINITY),
        "-INF" => Some(f64::NEG_INFINITY),
        "NaN" => Some(f64::NAN),
        other => other.parse::<f64>().ok().filter(|value| value.is_finite()),
    }
}

/// Split `A,Collection(B),C` on top-level commas.
fn split_parameter_list(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (index, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&text[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}
