//! Converting between representations keeps models equivalent.

use std::sync::Arc;

use rstest::rstest;

use edm::convert::{
    ModelDifference, ModelVisitor, compare_models, to_builder, to_csdl_model, walk_model,
};
use edm::csdl::{CsdlModel, CsdlWriter};
use edm::model::{
    Model, PrimitiveKind, PropertyDef, SchemaElement, StructuralProperty, StructuredType, TypeRef,
};
use edm::resolve::EdmModelExt;

use crate::helpers::csdl_fixtures::*;
use crate::helpers::model_helpers::*;

#[derive(Default)]
struct Counter {
    elements: usize,
    properties: usize,
    annotations: usize,
}

impl ModelVisitor for Counter {
    fn visit_element(&mut self, _element: &SchemaElement) {
        self.elements += 1;
    }

    fn visit_property(&mut self, _owner: &SchemaElement, _property: &PropertyDef) {
        self.properties += 1;
    }

    fn visit_annotation(&mut self, _annotation: &edm::model::VocabularyAnnotation) {
        self.annotations += 1;
    }
}

#[rstest]
#[case::sales(&[SALES])]
#[case::overloads(&[OVERLOADS])]
#[case::cycle(&[CYCLE])]
#[case::duplicates(&[DUPLICATE_A, DUPLICATE_B])]
fn test_parsed_to_builder_and_back(#[case] documents: &[&str]) {
    let parsed = parse(documents);
    let builder = to_builder(&parsed);
    assert!(compare_models(&parsed, &builder).is_empty());

    let written = CsdlWriter::new().write_edmx(&builder).unwrap();
    let reparsed = CsdlModel::parse(&written).unwrap();
    assert!(compare_models(&parsed, &reparsed).is_empty());

    let back = to_csdl_model(&builder);
    assert!(compare_models(&parsed, &back).is_empty());
}

#[test]
fn test_converted_models_answer_queries_alike() {
    let parsed = parse(&[SALES]);
    let builder = to_builder(&parsed);

    for name in ["S.Customer", "Sales.Order", "Sales.Money", "Edm.Guid"] {
        assert_eq!(
            parsed.find_type(name).map(|r| r.full_name()),
            builder.find_type(name).map(|r| r.full_name())
        );
    }
    let customer = builder.find_type("Sales.Customer").unwrap().element().unwrap();
    assert_eq!(builder.properties(customer).len(), 4);
    assert_eq!(builder.validate(), Vec::new());
    let customer_type = builder.find_type("Sales.Customer");
    assert_eq!(
        builder
            .find_vocabulary_annotations_including_inherited(customer_type.as_ref())
            .unwrap()
            .len(),
        2
    );
}

#[test]
fn test_builder_drops_locations() {
    let parsed = parse(&[SALES]);
    let builder = to_builder(&parsed);
    assert!(parsed.schema_elements().iter().all(|e| e.location.is_some()));
    assert!(builder.schema_elements().iter().all(|e| e.location.is_none()));
}

#[test]
fn test_references_are_shared() {
    let core: Arc<dyn Model> = Arc::new(parse(&[CORE_VOCABULARY]));
    let parsed = parse_with_references(USES_CORE, vec![Arc::clone(&core)]);
    let builder = to_builder(&parsed);
    assert_eq!(builder.referenced_models().len(), 1);
    assert!(Arc::ptr_eq(&builder.referenced_models()[0], &core));
    assert!(builder.find_term("Core.Immutable").is_some());
}

#[test]
fn test_builder_edits_show_up_in_output() {
    let parsed = parse(&[SHARED_NAMESPACE_A]);
    let mut builder = to_builder(&parsed);
    builder.add_complex_type(
        "Shared",
        "Rate",
        StructuredType::new().with_property(StructuralProperty::new(
            "Percent",
            TypeRef::primitive(PrimitiveKind::Double),
        )),
    );

    let differences = compare_models(&parsed, &builder);
    assert_eq!(differences.len(), 1);
    assert!(matches!(&differences[0], ModelDifference::UnexpectedElement(_)));

    let reparsed = CsdlModel::parse(&CsdlWriter::new().write_edmx(&builder).unwrap()).unwrap();
    assert!(reparsed.find_type("Shared.Rate").is_some());
    assert!(compare_models(&builder, &reparsed).is_empty());
}

#[test]
fn test_comparison_reports_each_kind_of_difference() {
    let expected = parse(&[SALES]);
    let actual = parse(&[&SALES
        .replace(r#"Alias="S""#, r#"Alias="Shop""#)
        .replace("S.", "Shop.")
        .replace(r#"<Member Name="Shipped" Value="1"/>"#, r#"<Member Name="Shipped" Value="2"/>"#)
        .replace(r#"<Term Name="Priority" Type="Edm.Int32"/>"#, "")]);
    let differences = compare_models(&expected, &actual);

    assert!(differences
        .iter()
        .any(|d| matches!(d, ModelDifference::AliasMismatch { .. })));
    assert!(differences
        .iter()
        .any(|d| matches!(d, ModelDifference::MissingElement(name) if name.contains("Priority"))));
    assert!(differences.iter().any(|d| matches!(
        d,
        ModelDifference::ChangedElement { key, .. } if key.contains("OrderStatus")
    )));
}

#[test]
fn test_walk_visits_everything_once() {
    let model = parse(&[SALES]);
    let mut counter = Counter::default();
    walk_model(&model, &mut counter);
    assert_eq!(counter.elements, 11);
    assert_eq!(counter.properties, 11);
    assert_eq!(counter.annotations, 2);
}
