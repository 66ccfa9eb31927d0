//! CSDL XML writer.
//!
//! One `Schema` is written per namespace, elements in declaration order.
//! Inline annotations are nested under the element or member they target;
//! everything else goes into `Annotations` blocks at the end of a schema.

use std::io::Write;
use std::sync::Arc;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, warn};

use crate::base::split_qualified;
use crate::model::{
    ContainerElement, Definition, EntityContainer, EnumType, Expression, Facets, MaxLength, Model,
    NavigationProperty, OnDeleteAction, Operation, OperationKind, PrimitiveKind, PropertyDef,
    RecordExpression, Scale, SchemaElement, Srid, StructuralProperty, StructuredType, Term,
    TypeDefinition, TypeRef, VocabularyAnnotation, member_target,
};

use super::error::CsdlError;
use super::namespace::{EDM, EDMX};

/// Writer configuration.
#[derive(Clone, Debug)]
pub struct CsdlWriterSettings {
    /// Spaces per nesting level; 0 writes everything on one line.
    pub indent: usize,
    /// `Version` of the `edmx:Edmx` envelope.
    pub version: String,
    /// Write `Alias` on schemas that have one.
    pub emit_aliases: bool,
    pub xml_declaration: bool,
}

impl Default for CsdlWriterSettings {
    fn default() -> Self {
        Self {
            indent: 2,
            version: "4.0".to_string(),
            emit_aliases: true,
            xml_declaration: true,
        }
    }
}

impl CsdlWriterSettings {
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_aliases(mut self, emit_aliases: bool) -> Self {
        self.emit_aliases = emit_aliases;
        self
    }

    pub fn with_xml_declaration(mut self, xml_declaration: bool) -> Self {
        self.xml_declaration = xml_declaration;
        self
    }
}

/// Serializes any [`Model`] to CSDL XML.
#[derive(Clone, Debug, Default)]
pub struct CsdlWriter {
    settings: CsdlWriterSettings,
}

impl CsdlWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(mut self, settings: CsdlWriterSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Write the whole model as one `edmx:Edmx` document.
    pub fn write_edmx(&self, model: &dyn Model) -> Result<String, CsdlError> {
        let schemas = SchemaBuilder::new(model, &self.settings).build();
        debug!(schemas = schemas.len(), "writing EDMX document");

        let mut root = XmlNode::new("edmx:Edmx")
            .attr("xmlns:edmx", EDMX)
            .attr("Version", self.settings.version.as_str());
        for reference in model.schema_references() {
            let mut node = XmlNode::new("edmx:Reference").attr("Uri", reference.uri.as_ref());
            for include in &reference.includes {
                node.push(
                    XmlNode::new("edmx:Include")
                        .attr("Namespace", include.namespace.as_ref())
                        .opt_attr("Alias", include.alias.as_deref()),
                );
            }
            root.push(node);
        }
        let mut data_services = XmlNode::new("edmx:DataServices");
        data_services.children = schemas.into_iter().map(|(_, schema)| schema).collect();
        root.push(data_services);

        self.serialize(&root)
    }

    /// Write each namespace as a standalone `Schema` document.
    pub fn write_schemas(&self, model: &dyn Model) -> Result<Vec<(Arc<str>, String)>, CsdlError> {
        SchemaBuilder::new(model, &self.settings)
            .build()
            .into_iter()
            .map(|(namespace, schema)| Ok((namespace, self.serialize(&schema)?)))
            .collect()
    }

    fn serialize(&self, root: &XmlNode) -> Result<String, CsdlError> {
        let mut writer = if self.settings.indent > 0 {
            Writer::new_with_indent(Vec::new(), b' ', self.settings.indent)
        } else {
            Writer::new(Vec::new())
        };
        if self.settings.xml_declaration {
            emit(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
        }
        write_node(&mut writer, root)?;
        let mut output = writer.into_inner();
        output.push(b'\n');
        String::from_utf8(output).map_err(|e| CsdlError::xml(format!("Write error: {e}")))
    }
}

// ============================================================================
// XML NODES
// ============================================================================

/// An element ready to be written.
#[derive(Debug)]
struct XmlNode {
    name: &'static str,
    attributes: Vec<(&'static str, String)>,
    children: Vec<XmlNode>,
    text: Option<String>,
}

impl XmlNode {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            attributes: Vec::new(),
            children: Vec::new(),
            text: None,
        }
    }

    fn attr(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.attributes.push((name, value.into()));
        self
    }

    fn opt_attr(self, name: &'static str, value: Option<&str>) -> Self {
        match value {
            Some(value) => self.attr(name, value),
            None => self,
        }
    }

    /// `name="true"` when `flag` is set.
    fn flag(self, name: &'static str, flag: bool) -> Self {
        if flag { self.attr(name, "true") } else { self }
    }

    fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    fn push(&mut self, child: XmlNode) {
        self.children.push(child);
    }
}

fn emit<W: Write>(writer: &mut Writer<W>, event: Event<'_>) -> Result<(), CsdlError> {
    writer
        .write_event(event)
        .map_err(|e| CsdlError::xml(format!("Write error: {e}")))
}

fn write_node<W: Write>(writer: &mut Writer<W>, node: &XmlNode) -> Result<(), CsdlError> {
    let mut start = BytesStart::new(node.name);
    for (name, value) in &node.attributes {
        start.push_attribute((*name, value.as_str()));
    }
    if node.children.is_empty() && node.text.is_none() {
        return emit(writer, Event::Empty(start));
    }
    emit(writer, Event::Start(start))?;
    if let Some(text) = &node.text {
        emit(writer, Event::Text(BytesText::new(text)))?;
    }
    for child in &node.children {
        write_node(writer, child)?;
    }
    emit(writer, Event::End(BytesEnd::new(node.name)))
}

// ============================================================================
// SCHEMA BUILDER
// ============================================================================

/// Turns a model into one `Schema` node per namespace.
struct SchemaBuilder<'m> {
    model: &'m dyn Model,
    settings: &'m CsdlWriterSettings,
    annotations: &'m [VocabularyAnnotation],
    /// Target → inline annotations that will be nested under it.
    inline: FxHashMap<String, Vec<usize>>,
    written: Vec<bool>,
}

impl<'m> SchemaBuilder<'m> {
    fn new(model: &'m dyn Model, settings: &'m CsdlWriterSettings) -> Self {
        let annotations = model.vocabulary_annotations();
        let mut targets: FxHashSet<String> = FxHashSet::default();
        for namespace in model.declared_namespaces() {
            targets.insert(namespace.to_string());
        }
        for element in model.schema_elements() {
            targets.extend(element_targets(element));
        }
        let mut inline: FxHashMap<String, Vec<usize>> = FxHashMap::default();
        for (index, annotation) in annotations.iter().enumerate() {
            if annotation.inline && targets.contains(annotation.target.as_ref()) {
                inline
                    .entry(annotation.target.to_string())
                    .or_default()
                    .push(index);
            }
        }
        Self {
            model,
            settings,
            annotations,
            inline,
            written: vec![false; annotations.len()],
        }
    }

    fn build(mut self) -> Vec<(Arc<str>, XmlNode)> {
        let model = self.model;
        let namespaces = self.namespaces();
        let mut schemas: Vec<(Arc<str>, XmlNode)> = Vec::with_capacity(namespaces.len());
        for namespace in &namespaces {
            let alias = if self.settings.emit_aliases {
                model.namespace_aliases().get(namespace).cloned()
            } else {
                None
            };
            let mut schema = XmlNode::new("Schema")
                .attr("xmlns", EDM)
                .attr("Namespace", namespace.as_ref())
                .opt_attr("Alias", alias.as_deref());
            schema.children.extend(self.inline_annotations(namespace));
            for element in model
                .schema_elements()
                .iter()
                .filter(|e| e.namespace == *namespace)
            {
                if let Some(node) = self.element_node(element) {
                    schema.push(node);
                }
            }
            schemas.push((Arc::clone(namespace), schema));
        }

        // Out-of-line blocks, grouped by target within their home schema.
        let mut blocks: Vec<Vec<(Arc<str>, Vec<usize>)>> = vec![Vec::new(); schemas.len()];
        for (index, annotation) in self.annotations.iter().enumerate() {
            if self.written[index] {
                continue;
            }
            if annotation.inline {
                warn!(
                    target = %annotation.target,
                    term = %annotation.term,
                    "inline annotation target is not written; moving it out of line"
                );
            }
            let Some(home) = home_schema(annotation, &namespaces) else {
                continue;
            };
            let groups = &mut blocks[home];
            match groups.iter_mut().find(|(target, _)| *target == annotation.target) {
                Some((_, members)) => members.push(index),
                None => groups.push((Arc::clone(&annotation.target), vec![index])),
            }
        }
        for ((_, schema), groups) in schemas.iter_mut().zip(blocks) {
            for (target, members) in groups {
                let mut block = XmlNode::new("Annotations").attr("Target", target.as_ref());
                for index in members {
                    block.push(annotation_node(&self.annotations[index]));
                }
                schema.push(block);
            }
        }
        schemas
    }

    /// Declared namespaces plus those only annotations live in.
    fn namespaces(&self) -> Vec<Arc<str>> {
        let mut namespaces = self.model.declared_namespaces();
        for annotation in self.annotations {
            if let Some(namespace) = &annotation.declared_in {
                if !namespaces.contains(namespace) {
                    namespaces.push(Arc::clone(namespace));
                }
            }
        }
        if namespaces.is_empty() {
            if let Some(annotation) = self.annotations.first() {
                namespaces.push(Arc::from(target_namespace(&annotation.target, &[])));
            }
        }
        namespaces
    }

    /// Nodes for the unwritten inline annotations on `target`.
    fn inline_annotations(&mut self, target: &str) -> Vec<XmlNode> {
        let Some(indices) = self.inline.get(target) else {
            return Vec::new();
        };
        let mut nodes = Vec::new();
        for &index in indices {
            if !self.written[index] {
                self.written[index] = true;
                nodes.push(annotation_node(&self.annotations[index]));
            }
        }
        nodes
    }

    fn element_node(&mut self, element: &SchemaElement) -> Option<XmlNode> {
        let full_name = element.full_name();
        let mut node = match &element.definition {
            Definition::Primitive(_) => return None,
            Definition::EntityType(body) => self.structured_node("EntityType", element, body, true),
            Definition::ComplexType(body) => {
                self.structured_node("ComplexType", element, body, false)
            }
            Definition::EnumType(body) => self.enum_node(element, body),
            Definition::TypeDefinition(body) => type_definition_node(element, body),
            Definition::Term(body) => term_node(element, body),
            Definition::Operation(body) => self.operation_node(element, body),
            Definition::EntityContainer(body) => self.container_node(element, body),
        };
        let target = match &element.definition {
            Definition::Operation(_) => element.target_path(),
            _ => full_name,
        };
        node.children.extend(self.inline_annotations(&target));
        Some(node)
    }

    fn structured_node(
        &mut self,
        tag: &'static str,
        element: &SchemaElement,
        body: &StructuredType,
        entity: bool,
    ) -> XmlNode {
        let full_name = element.full_name();
        let mut node = XmlNode::new(tag)
            .attr("Name", element.name.as_ref())
            .opt_attr("BaseType", body.base_type.as_deref())
            .flag("Abstract", body.is_abstract)
            .flag("OpenType", body.is_open)
            .flag("HasStream", entity && body.has_stream);
        if entity && !body.key.is_empty() {
            let mut key = XmlNode::new("Key");
            for property_ref in &body.key {
                key.push(
                    XmlNode::new("PropertyRef")
                        .attr("Name", property_ref.name.as_ref())
                        .opt_attr("Alias", property_ref.alias.as_deref()),
                );
            }
            node.push(key);
        }
        for property in &body.properties {
            let target = member_target(&full_name, property.name());
            let mut child = match property {
                PropertyDef::Structural(property) => structural_property_node(property),
                PropertyDef::Navigation(property) => navigation_property_node(property),
            };
            child.children.extend(self.inline_annotations(&target));
            node.push(child);
        }
        node
    }

    fn enum_node(&mut self, element: &SchemaElement, body: &EnumType) -> XmlNode {
        let full_name = element.full_name();
        let mut node = XmlNode::new("EnumType").attr("Name", element.name.as_ref());
        if body.underlying != PrimitiveKind::Int32 {
            node = node.attr("UnderlyingType", body.underlying.full_name());
        }
        node = node.flag("IsFlags", body.is_flags);
        for member in &body.members {
            let mut child = XmlNode::new("Member").attr("Name", member.name.as_ref());
            if let Some(value) = member.value {
                child = child.attr("Value", value.to_string());
            }
            child
                .children
                .extend(self.inline_annotations(&member_target(&full_name, &member.name)));
            node.push(child);
        }
        node
    }

    fn operation_node(&mut self, element: &SchemaElement, body: &Operation) -> XmlNode {
        let target = element.target_path();
        let mut node = match body.kind {
            OperationKind::Function => XmlNode::new("Function")
                .attr("Name", element.name.as_ref())
                .flag("IsBound", body.is_bound)
                .flag("IsComposable", body.is_composable),
            OperationKind::Action => XmlNode::new("Action")
                .attr("Name", element.name.as_ref())
                .flag("IsBound", body.is_bound),
        }
        .opt_attr("EntitySetPath", body.entity_set_path.as_deref());
        for parameter in &body.parameters {
            let mut child = type_attributes(
                XmlNode::new("Parameter").attr("Name", parameter.name.as_ref()),
                &parameter.type_ref,
            );
            child
                .children
                .extend(self.inline_annotations(&member_target(&target, &parameter.name)));
            node.push(child);
        }
        if let Some(return_type) = &body.return_type {
            let mut child = type_attributes(XmlNode::new("ReturnType"), return_type);
            child
                .children
                .extend(self.inline_annotations(&member_target(&target, "$ReturnType")));
            node.push(child);
        }
        node
    }

    fn container_node(&mut self, element: &SchemaElement, body: &EntityContainer) -> XmlNode {
        let full_name = element.full_name();
        let mut node = XmlNode::new("EntityContainer")
            .attr("Name", element.name.as_ref())
            .opt_attr("Extends", body.extends.as_deref());
        for item in &body.elements {
            let mut child = match item {
                ContainerElement::EntitySet(set) => {
                    let mut child = XmlNode::new("EntitySet")
                        .attr("Name", set.name.as_ref())
                        .attr("EntityType", set.entity_type.as_ref());
                    if !set.include_in_service_document {
                        child = child.attr("IncludeInServiceDocument", "false");
                    }
                    child
                }
                ContainerElement::Singleton(singleton) => XmlNode::new("Singleton")
                    .attr("Name", singleton.name.as_ref())
                    .attr("Type", singleton.entity_type.as_ref())
                    .flag("Nullable", singleton.nullable),
                ContainerElement::OperationImport(import) => match import.kind {
                    OperationKind::Function => XmlNode::new("FunctionImport")
                        .attr("Name", import.name.as_ref())
                        .attr("Function", import.operation.as_ref())
                        .opt_attr("EntitySet", import.entity_set.as_deref())
                        .flag("IncludeInServiceDocument", import.include_in_service_document),
                    OperationKind::Action => XmlNode::new("ActionImport")
                        .attr("Name", import.name.as_ref())
                        .attr("Action", import.operation.as_ref())
                        .opt_attr("EntitySet", import.entity_set.as_deref()),
                },
            };
            for binding in item.bindings() {
                child.push(
                    XmlNode::new("NavigationPropertyBinding")
                        .attr("Path", binding.path.as_ref())
                        .attr("Target", binding.target.as_ref()),
                );
            }
            child
                .children
                .extend(self.inline_annotations(&member_target(&full_name, item.name())));
            node.push(child);
        }
        node
    }
}

/// Every annotation target an element writes, itself included.
fn element_targets(element: &SchemaElement) -> Vec<String> {
    let own = element.target_path();
    let mut targets = Vec::new();
    match &element.definition {
        Definition::EntityType(body) | Definition::ComplexType(body) => {
            for property in &body.properties {
                targets.push(member_target(&own, property.name()));
            }
        }
        Definition::EnumType(body) => {
            for member in &body.members {
                targets.push(member_target(&own, &member.name));
            }
        }
        Definition::Operation(body) => {
            for parameter in &body.parameters {
                targets.push(member_target(&own, &parameter.name));
            }
            if body.return_type.is_some() {
                targets.push(member_target(&own, "$ReturnType"));
            }
        }
        Definition::EntityContainer(body) => {
            for item in &body.elements {
                targets.push(member_target(&own, item.name()));
            }
        }
        Definition::Primitive(_) => return targets,
        Definition::TypeDefinition(_) | Definition::Term(_) => {}
    }
    targets.push(own);
    targets
}

/// Namespace of the element an annotation target path starts with.
fn target_namespace<'t>(target: &'t str, namespaces: &[Arc<str>]) -> &'t str {
    let head = target.split('/').next().unwrap_or(target);
    let head = head.split('(').next().unwrap_or(head);
    if namespaces.iter().any(|ns| ns.as_ref() == head) {
        return head;
    }
    split_qualified(head).map(|(namespace, _)| namespace).unwrap_or(head)
}

/// Index of the schema an out-of-line annotation is written into.
fn home_schema(annotation: &VocabularyAnnotation, namespaces: &[Arc<str>]) -> Option<usize> {
    if namespaces.is_empty() {
        return None;
    }
    let by_declaration = annotation
        .declared_in
        .as_ref()
        .and_then(|declared| namespaces.iter().position(|ns| ns == declared));
    let by_target = || {
        let namespace = target_namespace(&annotation.target, namespaces);
        namespaces.iter().position(|ns| ns.as_ref() == namespace)
    };
    Some(by_declaration.or_else(by_target).unwrap_or(0))
}

// ============================================================================
// ELEMENT NODES
// ============================================================================

fn type_definition_node(element: &SchemaElement, body: &TypeDefinition) -> XmlNode {
    let node = XmlNode::new("TypeDefinition")
        .attr("Name", element.name.as_ref())
        .attr("UnderlyingType", body.underlying.full_name());
    facet_attributes(node, &body.facets)
}

fn term_node(element: &SchemaElement, body: &Term) -> XmlNode {
    let mut node = type_attributes(
        XmlNode::new("Term").attr("Name", element.name.as_ref()),
        &body.type_ref,
    )
    .opt_attr("BaseTerm", body.base_term.as_deref())
    .opt_attr("DefaultValue", body.default_value.as_deref());
    if !body.applies_to.is_empty() {
        let applies_to: Vec<&str> = body.applies_to.iter().map(|a| a.as_ref()).collect();
        node = node.attr("AppliesTo", applies_to.join(" "));
    }
    node
}

fn structural_property_node(property: &StructuralProperty) -> XmlNode {
    type_attributes(
        XmlNode::new("Property").attr("Name", property.name.as_ref()),
        &property.type_ref,
    )
    .opt_attr("DefaultValue", property.default_value.as_deref())
}

fn navigation_property_node(property: &NavigationProperty) -> XmlNode {
    let mut node = XmlNode::new("NavigationProperty")
        .attr("Name", property.name.as_ref())
        .attr("Type", property.type_ref.to_string());
    // A collection's items are non-nullable unless `Nullable="true"` is written.
    if property.type_ref.is_collection() {
        node = node.flag("Nullable", property.type_ref.element_type().nullable);
    } else if !property.type_ref.nullable {
        node = node.attr("Nullable", "false");
    }
    node = node
        .opt_attr("Partner", property.partner.as_deref())
        .flag("ContainsTarget", property.contains_target);
    for constraint in &property.referential_constraints {
        node.push(
            XmlNode::new("ReferentialConstraint")
                .attr("Property", constraint.dependent_property.as_ref())
                .attr("ReferencedProperty", constraint.principal_property.as_ref()),
        );
    }
    if property.on_delete != OnDeleteAction::None {
        node.push(XmlNode::new("OnDelete").attr("Action", property.on_delete.as_str()));
    }
    node
}

/// `Type`, `Nullable` and facets; the latter two describe collection items.
fn type_attributes(node: XmlNode, type_ref: &TypeRef) -> XmlNode {
    let item = type_ref.element_type();
    let mut node = node.attr("Type", type_ref.to_string());
    if !item.nullable {
        node = node.attr("Nullable", "false");
    }
    facet_attributes(node, &item.facets)
}

fn facet_attributes(mut node: XmlNode, facets: &Facets) -> XmlNode {
    match facets.max_length {
        Some(MaxLength::Max) => node = node.attr("MaxLength", "max"),
        Some(MaxLength::Length(n)) => node = node.attr("MaxLength", n.to_string()),
        None => {}
    }
    if let Some(precision) = facets.precision {
        node = node.attr("Precision", precision.to_string());
    }
    match facets.scale {
        Some(Scale::Variable) => node = node.attr("Scale", "variable"),
        Some(Scale::Value(n)) => node = node.attr("Scale", n.to_string()),
        None => {}
    }
    match facets.srid {
        Some(Srid::Variable) => node = node.attr("SRID", "variable"),
        Some(Srid::Value(n)) => node = node.attr("SRID", n.to_string()),
        None => {}
    }
    if let Some(unicode) = facets.unicode {
        node = node.attr("Unicode", if unicode { "true" } else { "false" });
    }
    node
}

// ============================================================================
// ANNOTATIONS
// ============================================================================

fn annotation_node(annotation: &VocabularyAnnotation) -> XmlNode {
    let node = XmlNode::new("Annotation")
        .attr("Term", annotation.term.as_ref())
        .opt_attr("Qualifier", annotation.qualifier.as_deref());
    with_value(node, &annotation.value)
}

/// Scalars become an attribute; structured values a child element.
fn with_value(node: XmlNode, value: &Expression) -> XmlNode {
    match scalar_text(value) {
        Some((name, text)) => node.attr(name, text),
        None => {
            let mut node = node;
            node.push(expression_node(value));
            node
        }
    }
}

/// Attribute name and text of a scalar expression.
fn scalar_text(value: &Expression) -> Option<(&'static str, String)> {
    let scalar = match value {
        Expression::String(s) => ("String", s.to_string()),
        Expression::Int(i) => ("Int", i.to_string()),
        Expression::Bool(b) => ("Bool", b.to_string()),
        Expression::Float(x) => ("Float", format_float(*x)),
        Expression::Constant(kind, text) => (kind.as_str(), text.to_string()),
        Expression::EnumMember(members) => ("EnumMember", members.to_string()),
        Expression::Path(kind, path) => (kind.as_str(), path.to_string()),
        Expression::Null | Expression::Collection(_) | Expression::Record(_) => return None,
    };
    Some(scalar)
}

fn expression_node(value: &Expression) -> XmlNode {
    match value {
        Expression::Null => XmlNode::new("Null"),
        Expression::Collection(items) => {
            let mut node = XmlNode::new("Collection");
            node.children = items.iter().map(expression_node).collect();
            node
        }
        Expression::Record(record) => record_node(record),
        scalar => match scalar_text(scalar) {
            Some((name, text)) => XmlNode::new(name).with_text(text),
            None => XmlNode::new("Null"),
        },
    }
}

fn record_node(record: &RecordExpression) -> XmlNode {
    let mut node = XmlNode::new("Record").opt_attr("Type", record.type_name.as_deref());
    for property in &record.properties {
        let child = XmlNode::new("PropertyValue").attr("Property", property.property.as_ref());
        node.push(with_value(child, &property.value));
    }
    node
}

fn format_float(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "INF".to_string()
    } else if value == f64::NEG_INFINITY {
        "-INF".to_string()
    } else {
        value.to_string()
    }
}
