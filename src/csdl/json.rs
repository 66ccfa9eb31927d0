//! CSDL JSON output (`$Version`, `$Kind`, ... documents).
//!
//! Write-only. Member order follows declaration order.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde_json::{Map, Value, json};

use crate::base::split_qualified;
use crate::model::{
    ContainerElement, Definition, Expression, Facets, MaxLength, Model, OnDeleteAction,
    OperationKind, PrimitiveKind, PropertyDef, Scale, SchemaElement, Srid, TypeRef,
    VocabularyAnnotation, member_target,
};
use crate::resolve::EdmModelExt;

use super::error::CsdlError;

/// Serialize `model` as a CSDL JSON document.
pub fn write_json(model: &dyn Model) -> Result<String, CsdlError> {
    let document = JsonBuilder::new(model).build();
    serde_json::to_string_pretty(&document).map_err(|e| CsdlError::json(e.to_string()))
}

struct JsonBuilder<'m> {
    model: &'m dyn Model,
    annotations: &'m [VocabularyAnnotation],
    inline: FxHashMap<&'m str, Vec<usize>>,
    placed: Vec<bool>,
}

impl<'m> JsonBuilder<'m> {
    fn new(model: &'m dyn Model) -> Self {
        let annotations = model.vocabulary_annotations();
        let mut inline: FxHashMap<&'m str, Vec<usize>> = FxHashMap::default();
        for (index, annotation) in annotations.iter().enumerate() {
            if annotation.inline {
                inline.entry(annotation.target.as_ref()).or_default().push(index);
            }
        }
        Self {
            model,
            annotations,
            inline,
            placed: vec![false; annotations.len()],
        }
    }

    fn build(mut self) -> Value {
        let model = self.model;
        let mut root = Map::new();
        root.insert("$Version".into(), json!("4.0"));
        if let Some(container) = model.default_entity_container() {
            root.insert("$EntityContainer".into(), json!(container.full_name()));
        }
        if !model.schema_references().is_empty() {
            let mut references = Map::new();
            for reference in model.schema_references() {
                let includes: Vec<Value> = reference
                    .includes
                    .iter()
                    .map(|include| {
                        let mut entry = Map::new();
                        entry.insert("$Namespace".into(), json!(include.namespace.as_ref()));
                        if let Some(alias) = &include.alias {
                            entry.insert("$Alias".into(), json!(alias.as_ref()));
                        }
                        Value::Object(entry)
                    })
                    .collect();
                references.insert(reference.uri.to_string(), json!({ "$Include": includes }));
            }
            root.insert("$Reference".into(), Value::Object(references));
        }

        let namespaces = model.declared_namespaces();
        let mut schemas: Vec<(Arc<str>, Map<String, Value>)> = Vec::new();
        for namespace in &namespaces {
            let mut schema = Map::new();
            if let Some(alias) = model.namespace_aliases().get(namespace) {
                schema.insert("$Alias".into(), json!(alias.as_ref()));
            }
            self.annotate(&mut schema, namespace);
            for element in model.schema_elements().iter().filter(|e| e.namespace == *namespace) {
                self.insert_element(&mut schema, element);
            }
            schemas.push((Arc::clone(namespace), schema));
        }

        // Whatever was not placed inline becomes `$Annotations`.
        for index in 0..self.annotations.len() {
            if self.placed[index] {
                continue;
            }
            let annotation = &self.annotations[index];
            let home = annotation
                .declared_in
                .as_ref()
                .and_then(|ns| namespaces.iter().position(|n| n == ns))
                .or_else(|| {
                    let head = annotation.target.split(['/', '(']).next().unwrap_or_default();
                    let owner = split_qualified(head).map(|(ns, _)| ns);
                    namespaces
                        .iter()
                        .position(|n| n.as_ref() == head || owner == Some(n.as_ref()))
                })
                .unwrap_or(0);
            let Some((_, schema)) = schemas.get_mut(home) else {
                continue;
            };
            let block = schema
                .entry("$Annotations")
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(block) = block {
                let target = block
                    .entry(annotation.target.to_string())
                    .or_insert_with(|| Value::Object(Map::new()));
                if let Value::Object(target) = target {
                    target.insert(annotation_key(annotation), expression_value(&annotation.value));
                }
            }
        }

        for (namespace, schema) in schemas {
            root.insert(namespace.to_string(), Value::Object(schema));
        }
        Value::Object(root)
    }

    /// Add the inline annotations on `target` as `@Term#Qualifier` members.
    fn annotate(&mut self, object: &mut Map<String, Value>, target: &str) {
        let Some(indices) = self.inline.get(target) else {
            return;
        };
        for &index in indices {
            if self.placed[index] {
                continue;
            }
            self.placed[index] = true;
            let annotation = &self.annotations[index];
            object.insert(annotation_key(annotation), expression_value(&annotation.value));
        }
    }

    fn insert_element(&mut self, schema: &mut Map<String, Value>, element: &SchemaElement) {
        let full_name = element.full_name();
        let mut object = Map::new();
        match &element.definition {
            Definition::Primitive(_) => return,
            Definition::EntityType(body) | Definition::ComplexType(body) => {
                let kind = if matches!(element.definition, Definition::EntityType(_)) {
                    "EntityType"
                } else {
                    "ComplexType"
                };
                object.insert("$Kind".into(), json!(kind));
                if let Some(base) = &body.base_type {
                    object.insert("$BaseType".into(), json!(base.as_ref()));
                }
                if body.is_abstract {
                    object.insert("$Abstract".into(), json!(true));
                }
                if body.is_open {
                    object.insert("$OpenType".into(), json!(true));
                }
                if body.has_stream {
                    object.insert("$HasStream".into(), json!(true));
                }
                if !body.key.is_empty() {
                    let key: Vec<Value> = body
                        .key
                        .iter()
                        .map(|k| match &k.alias {
                            Some(alias) => json!({ alias.to_string(): k.name.as_ref() }),
                            None => json!(k.name.as_ref()),
                        })
                        .collect();
                    object.insert("$Key".into(), Value::Array(key));
                }
                for property in &body.properties {
                    let mut member = property_object(property);
                    self.annotate(&mut member, &member_target(&full_name, property.name()));
                    object.insert(property.name().to_string(), Value::Object(member));
                }
            }
            Definition::EnumType(body) => {
                object.insert("$Kind".into(), json!("EnumType"));
                if body.underlying != PrimitiveKind::Int32 {
                    object.insert("$UnderlyingType".into(), json!(body.underlying.full_name()));
                }
                if body.is_flags {
                    object.insert("$IsFlags".into(), json!(true));
                }
                let mut next = 0i64;
                for member in &body.members {
                    let value = member.value.unwrap_or(next);
                    next = value + 1;
                    object.insert(member.name.to_string(), json!(value));
                }
            }
            Definition::TypeDefinition(body) => {
                object.insert("$Kind".into(), json!("TypeDefinition"));
                object.insert("$UnderlyingType".into(), json!(body.underlying.full_name()));
                insert_facets(&mut object, &body.facets);
            }
            Definition::Term(body) => {
                object.insert("$Kind".into(), json!("Term"));
                insert_type(&mut object, &body.type_ref);
                if let Some(base) = &body.base_term {
                    object.insert("$BaseTerm".into(), json!(base.as_ref()));
                }
                if let Some(default) = &body.default_value {
                    object.insert("$DefaultValue".into(), json!(default.as_ref()));
                }
                if !body.applies_to.is_empty() {
                    let applies_to: Vec<&str> =
                        body.applies_to.iter().map(|a| a.as_ref()).collect();
                    object.insert("$AppliesTo".into(), json!(applies_to));
                }
            }
            Definition::Operation(body) => {
                let kind = match body.kind {
                    OperationKind::Function => "Function",
                    OperationKind::Action => "Action",
                };
                object.insert("$Kind".into(), json!(kind));
                if body.is_bound {
                    object.insert("$IsBound".into(), json!(true));
                }
                if body.is_composable {
                    object.insert("$IsComposable".into(), json!(true));
                }
                if let Some(path) = &body.entity_set_path {
                    object.insert("$EntitySetPath".into(), json!(path.as_ref()));
                }
                if !body.parameters.is_empty() {
                    let parameters: Vec<Value> = body
                        .parameters
                        .iter()
                        .map(|p| {
                            let mut parameter = Map::new();
                            parameter.insert("$Name".into(), json!(p.name.as_ref()));
                            insert_type(&mut parameter, &p.type_ref);
                            Value::Object(parameter)
                        })
                        .collect();
                    object.insert("$Parameter".into(), Value::Array(parameters));
                }
                if let Some(return_type) = &body.return_type {
                    let mut returns = Map::new();
                    insert_type(&mut returns, return_type);
                    object.insert("$ReturnType".into(), Value::Object(returns));
                }
                self.annotate(&mut object, &element.target_path());
                // Overloads share one array member.
                let overloads = schema
                    .entry(element.name.to_string())
                    .or_insert_with(|| Value::Array(Vec::new()));
                if let Value::Array(overloads) = overloads {
                    overloads.push(Value::Object(object));
                }
                return;
            }
            Definition::EntityContainer(body) => {
                object.insert("$Kind".into(), json!("EntityContainer"));
                if let Some(extends) = &body.extends {
                    object.insert("$Extends".into(), json!(extends.as_ref()));
                }
                for item in &body.elements {
                    let mut child = container_child_object(item);
                    self.annotate(&mut child, &member_target(&full_name, item.name()));
                    object.insert(item.name().to_string(), Value::Object(child));
                }
            }
        }
        self.annotate(&mut object, &full_name);
        schema.insert(element.name.to_string(), Value::Object(object));
    }
}

fn annotation_key(annotation: &VocabularyAnnotation) -> String {
    match &annotation.qualifier {
        Some(qualifier) => format!("@{}#{qualifier}", annotation.term),
        None => format!("@{}", annotation.term),
    }
}

fn property_object(property: &PropertyDef) -> Map<String, Value> {
    let mut object = Map::new();
    match property {
        PropertyDef::Structural(property) => {
            insert_type(&mut object, &property.type_ref);
            if let Some(default) = &property.default_value {
                object.insert("$DefaultValue".into(), json!(default.as_ref()));
            }
        }
        PropertyDef::Navigation(property) => {
            object.insert("$Kind".into(), json!("NavigationProperty"));
            insert_type(&mut object, &property.type_ref);
            if let Some(partner) = &property.partner {
                object.insert("$Partner".into(), json!(partner.as_ref()));
            }
            if property.contains_target {
                object.insert("$ContainsTarget".into(), json!(true));
            }
            if !property.referential_constraints.is_empty() {
                let constraints: Map<String, Value> = property
                    .referential_constraints
                    .iter()
                    .map(|c| {
                        (
                            c.dependent_property.to_string(),
                            json!(c.principal_property.as_ref()),
                        )
                    })
                    .collect();
                object.insert("$ReferentialConstraint".into(), Value::Object(constraints));
            }
            if property.on_delete != OnDeleteAction::None {
                object.insert(
                    "$OnDelete".into(),
                    json!({ "$Action": property.on_delete.as_str() }),
                );
            }
        }
    }
    object
}

fn container_child_object(item: &ContainerElement) -> Map<String, Value> {
    let mut object = Map::new();
    match item {
        ContainerElement::EntitySet(set) => {
            object.insert("$Collection".into(), json!(true));
            object.insert("$Type".into(), json!(set.entity_type.as_ref()));
            if !set.include_in_service_document {
                object.insert("$IncludeInServiceDocument".into(), json!(false));
            }
        }
        ContainerElement::Singleton(singleton) => {
            object.insert("$Type".into(), json!(singleton.entity_type.as_ref()));
            if singleton.nullable {
                object.insert("$Nullable".into(), json!(true));
            }
        }
        ContainerElement::OperationImport(import) => {
            let key = match import.kind {
                OperationKind::Function => "$Function",
                OperationKind::Action => "$Action",
            };
            object.insert(key.into(), json!(import.operation.as_ref()));
            if let Some(set) = &import.entity_set {
                object.insert("$EntitySet".into(), json!(set.as_ref()));
            }
            if import.include_in_service_document {
                object.insert("$IncludeInServiceDocument".into(), json!(true));
            }
        }
    }
    if !item.bindings().is_empty() {
        let bindings: Map<String, Value> = item
            .bindings()
            .iter()
            .map(|b| (b.path.to_string(), json!(b.target.as_ref())))
            .collect();
        object.insert("$NavigationPropertyBinding".into(), Value::Object(bindings));
    }
    object
}

/// `$Type`, `$Collection`, `$Nullable` and facets. `Edm.String` is implied.
fn insert_type(object: &mut Map<String, Value>, type_ref: &TypeRef) {
    let item = type_ref.element_type();
    let type_name = item.to_string();
    if type_name != "Edm.String" {
        object.insert("$Type".into(), json!(type_name));
    }
    if type_ref.is_collection() {
        object.insert("$Collection".into(), json!(true));
    }
    if item.nullable {
        object.insert("$Nullable".into(), json!(true));
    }
    insert_facets(object, &item.facets);
}

fn insert_facets(object: &mut Map<String, Value>, facets: &Facets) {
    match facets.max_length {
        Some(MaxLength::Max) => {
            object.insert("$MaxLength".into(), json!("max"));
        }
        Some(MaxLength::Length(n)) => {
            object.insert("$MaxLength".into(), json!(n));
        }
        None => {}
    }
    if let Some(precision) = facets.precision {
        object.insert("$Precision".into(), json!(precision));
    }
    match facets.scale {
        Some(Scale::Variable) => {
            object.insert("$Scale".into(), json!("variable"));
        }
        Some(Scale::Value(n)) => {
            object.insert("$Scale".into(), json!(n));
        }
        None => {}
    }
    match facets.srid {
        Some(Srid::Variable) => {
            object.insert("$SRID".into(), json!("variable"));
        }
        Some(Srid::Value(n)) => {
            object.insert("$SRID".into(), json!(n));
        }
        None => {}
    }
    if facets.unicode == Some(false) {
        object.insert("$Unicode".into(), json!(false));
    }
}

fn expression_value(expression: &Expression) -> Value {
    match expression {
        Expression::Null => Value::Null,
        Expression::Bool(b) => json!(b),
        Expression::Int(i) => json!(i),
        Expression::Float(x) if x.is_finite() => json!(x),
        Expression::Float(x) if x.is_nan() => json!("NaN"),
        Expression::Float(x) if *x > 0.0 => json!("INF"),
        Expression::Float(_) => json!("-INF"),
        Expression::String(s) => json!(s.as_ref()),
        Expression::Constant(_, text) => json!(text.as_ref()),
        Expression::EnumMember(members) => json!(members.as_ref()),
        Expression::Path(kind, path) => {
            let mut object = Map::new();
            object.insert(format!("${}", kind.as_str()), json!(path.as_ref()));
            Value::Object(object)
        }
        Expression::Collection(items) => Value::Array(items.iter().map(expression_value).collect()),
        Expression::Record(record) => {
            let mut object = Map::new();
            if let Some(type_name) = &record.type_name {
                object.insert("@type".into(), json!(format!("#{type_name}")));
            }
            for property in &record.properties {
                object.insert(property.property.to_string(), expression_value(&property.value));
            }
            Value::Object(object)
        }
    }
}
