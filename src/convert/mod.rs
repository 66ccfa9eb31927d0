//! Conversion between the parsed and the builder representation.
//!
//! Both converters are [`ModelVisitor`]s: they walk a `&dyn Model` and
//! re-emit its contents through the other representation's construction
//! path. Referenced models are shared, not copied.
//!
//! [`compare_models`] checks that two models are equivalent element for
//! element, which is how conversions and CSDL round trips are verified.

mod compare;
mod visitor;

use std::sync::Arc;

use tracing::{debug, warn};

use crate::builder::{ElementId, EdmModel};
use crate::csdl::{CsdlModel, ModelParts};
use crate::model::{
    ContainerElement, Definition, EntityContainer, Model, OperationKind, PropertyDef,
    SchemaElement, SchemaReference, StructuredType, VocabularyAnnotation,
};

pub use compare::{ModelDifference, compare_models};
pub use visitor::{ModelVisitor, walk_model};

/// Body of a structured type without its properties, which are visited one by one.
fn structured_shell(body: &StructuredType) -> StructuredType {
    StructuredType {
        base_type: body.base_type.clone(),
        is_abstract: body.is_abstract,
        is_open: body.is_open,
        has_stream: body.has_stream,
        key: body.key.clone(),
        properties: Vec::new(),
    }
}

/// Container without its children, which are visited one by one.
fn container_shell(body: &EntityContainer) -> EntityContainer {
    EntityContainer {
        extends: body.extends.clone(),
        elements: Vec::new(),
    }
}

/// `element` with properties and container children left out.
fn element_shell(element: &SchemaElement) -> SchemaElement {
    let definition = match &element.definition {
        Definition::EntityType(body) => Definition::EntityType(structured_shell(body)),
        Definition::ComplexType(body) => Definition::ComplexType(structured_shell(body)),
        Definition::EntityContainer(body) => Definition::EntityContainer(container_shell(body)),
        other => other.clone(),
    };
    SchemaElement {
        namespace: Arc::clone(&element.namespace),
        name: Arc::clone(&element.name),
        alias: element.alias.clone(),
        location: element.location,
        definition,
    }
}

/// Re-emits a model through the builder API.
struct BuilderEmitter {
    model: EdmModel,
    /// Element receiving the properties or container children being visited.
    current: Option<ElementId>,
}

impl BuilderEmitter {
    fn add(&mut self, element: &SchemaElement) -> ElementId {
        let namespace = Arc::clone(&element.namespace);
        let name = Arc::clone(&element.name);
        match &element.definition {
            Definition::EntityType(body) => {
                self.model.add_entity_type(namespace, name, structured_shell(body))
            }
            Definition::ComplexType(body) => {
                self.model.add_complex_type(namespace, name, structured_shell(body))
            }
            Definition::EnumType(body) => self.model.add_enum_type(namespace, name, body.clone()),
            Definition::TypeDefinition(body) => {
                self.model.add_type_definition(namespace, name, body.clone())
            }
            Definition::Term(body) => self.model.add_term(namespace, name, body.clone()),
            Definition::Operation(body) => match body.kind {
                OperationKind::Function => self.model.add_function(namespace, name, body.clone()),
                OperationKind::Action => self.model.add_action(namespace, name, body.clone()),
            },
            Definition::EntityContainer(body) => {
                self.model.add_entity_container(namespace, name, container_shell(body))
            }
            Definition::Primitive(_) => {
                let mut shell = element_shell(element);
                shell.location = None;
                self.model.add_element(shell)
            }
        }
    }
}

impl ModelVisitor for BuilderEmitter {
    fn visit_reference(&mut self, model: &Arc<dyn Model>) {
        self.model.add_reference(Arc::clone(model));
    }

    fn visit_schema_reference(&mut self, reference: &SchemaReference) {
        self.model.add_schema_reference(reference.clone());
    }

    fn visit_namespace_alias(&mut self, namespace: &Arc<str>, alias: &Arc<str>) {
        self.model
            .set_namespace_alias(Arc::clone(namespace), Arc::clone(alias));
    }

    fn visit_element(&mut self, element: &SchemaElement) {
        self.current = Some(self.add(element));
    }

    fn visit_property(&mut self, owner: &SchemaElement, property: &PropertyDef) {
        let Some(id) = self.current else { return };
        let added = match property {
            PropertyDef::Structural(p) => self.model.add_structural_property(id, p.clone()),
            PropertyDef::Navigation(p) => self.model.add_navigation_property(id, p.clone()),
        };
        if let Err(err) = added {
            warn!(owner = %owner.full_name(), %err, "dropping property during conversion");
        }
    }

    fn visit_container_element(&mut self, container: &SchemaElement, item: &ContainerElement) {
        let Some(id) = self.current else { return };
        match self.model.container_mut(id) {
            Ok(body) => body.elements.push(item.clone()),
            Err(err) => {
                warn!(
                    container = %container.full_name(),
                    %err,
                    "dropping container child during conversion"
                );
            }
        }
    }

    fn visit_annotation(&mut self, annotation: &VocabularyAnnotation) {
        self.model
            .add_vocabulary_annotation(annotation.without_location());
    }
}

/// Collects the raw parts of a model, keeping source locations.
#[derive(Default)]
struct PartsCollector {
    parts: ModelParts,
}

impl ModelVisitor for PartsCollector {
    fn visit_reference(&mut self, model: &Arc<dyn Model>) {
        self.parts.references.push(Arc::clone(model));
    }

    fn visit_schema_reference(&mut self, reference: &SchemaReference) {
        self.parts.schema_references.push(reference.clone());
    }

    fn visit_namespace_alias(&mut self, namespace: &Arc<str>, alias: &Arc<str>) {
        self.parts
            .aliases
            .insert(Arc::clone(namespace), Arc::clone(alias));
    }

    fn visit_element(&mut self, element: &SchemaElement) {
        self.parts.elements.push(element_shell(element));
    }

    fn visit_property(&mut self, _owner: &SchemaElement, property: &PropertyDef) {
        let last = self.parts.elements.last_mut().map(|e| &mut e.definition);
        if let Some(Definition::EntityType(body) | Definition::ComplexType(body)) = last {
            body.properties.push(property.clone());
        }
    }

    fn visit_container_element(&mut self, _container: &SchemaElement, item: &ContainerElement) {
        let last = self.parts.elements.last_mut().map(|e| &mut e.definition);
        if let Some(Definition::EntityContainer(body)) = last {
            body.elements.push(item.clone());
        }
    }

    fn visit_annotation(&mut self, annotation: &VocabularyAnnotation) {
        self.parts.annotations.push(annotation.clone());
    }
}

/// Rebuild `model` as a mutable [`EdmModel`].
pub fn to_builder(model: &dyn Model) -> EdmModel {
    debug!(
        elements = model.schema_elements().len(),
        "converting model to builder representation"
    );
    let mut emitter = BuilderEmitter {
        model: EdmModel::new(),
        current: None,
    };
    walk_model(model, &mut emitter);
    emitter.model
}

/// Rebuild `model` as an immutable [`CsdlModel`].
pub fn to_csdl_model(model: &dyn Model) -> CsdlModel {
    debug!(
        elements = model.schema_elements().len(),
        "converting model to parsed representation"
    );
    let mut collector = PartsCollector::default();
    walk_model(model, &mut collector);
    CsdlModel::from_parts(collector.parts)
}
