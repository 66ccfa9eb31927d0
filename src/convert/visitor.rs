//! Structural walk over any [`Model`].

use std::sync::Arc;

use crate::model::{
    ContainerElement, Definition, Model, PropertyDef, SchemaElement, SchemaReference,
    VocabularyAnnotation,
};

/// Visitor over the contents of a model.
///
/// Implement this trait to collect or re-emit model contents. Default
/// implementations are no-ops.
pub trait ModelVisitor {
    fn visit_reference(&mut self, _model: &Arc<dyn Model>) {}
    fn visit_schema_reference(&mut self, _reference: &SchemaReference) {}
    fn visit_namespace_alias(&mut self, _namespace: &Arc<str>, _alias: &Arc<str>) {}
    fn visit_element(&mut self, _element: &SchemaElement) {}
    fn visit_property(&mut self, _owner: &SchemaElement, _property: &PropertyDef) {}
    fn visit_container_element(&mut self, _container: &SchemaElement, _item: &ContainerElement) {}
    fn visit_annotation(&mut self, _annotation: &VocabularyAnnotation) {}
}

/// Walk `model` in a fixed order: references, aliases, elements (each
/// followed by its properties or container children), then annotations.
pub fn walk_model<M, V>(model: &M, visitor: &mut V)
where
    M: Model + ?Sized,
    V: ModelVisitor + ?Sized,
{
    for reference in model.referenced_models() {
        visitor.visit_reference(reference);
    }
    for reference in model.schema_references() {
        visitor.visit_schema_reference(reference);
    }
    for (namespace, alias) in model.namespace_aliases() {
        visitor.visit_namespace_alias(namespace, alias);
    }
    for element in model.schema_elements() {
        visitor.visit_element(element);
        match &element.definition {
            Definition::EntityType(body) | Definition::ComplexType(body) => {
                for property in &body.properties {
                    visitor.visit_property(element, property);
                }
            }
            Definition::EntityContainer(body) => {
                for item in &body.elements {
                    visitor.visit_container_element(element, item);
                }
            }
            _ => {}
        }
    }
    for annotation in model.vocabulary_annotations() {
        visitor.visit_annotation(annotation);
    }
}
