//! Tests for reading CSDL documents.

use rstest::rstest;

use edm::base::DocumentId;
use edm::csdl::{CsdlReader, CsdlReaderSettings};
use edm::model::{
    EdmErrorCode, ElementKind, Expression, MaxLength, Model, OnDeleteAction, PrimitiveKind,
    Scale, TypeRefKind,
};
use edm::resolve::{EdmModelExt, Resolution};

use crate::helpers::csdl_fixtures::*;
use crate::helpers::model_helpers::*;

// =============================================================================
// STRUCTURE
// =============================================================================

#[test]
fn test_sales_elements_in_declaration_order() {
    let model = parse(&[SALES]);
    let names: Vec<String> = model
        .schema_elements()
        .iter()
        .map(|e| e.full_name())
        .collect();
    assert_eq!(
        names,
        vec![
            "Sales.Party",
            "Sales.Customer",
            "Sales.Order",
            "Sales.Address",
            "Sales.OrderStatus",
            "Sales.Money",
            "Sales.Description",
            "Sales.Priority",
            "Sales.TopCustomers",
            "Sales.Ship",
            "Sales.Default",
        ]
    );
    assert_eq!(model.vocabulary_annotations().len(), 2);
}

#[test]
fn test_alias_qualified_names_are_normalized() {
    let model = parse(&[SALES]);
    let customer = model.find_type("Sales.Customer").unwrap().element().unwrap();
    let body = customer.as_structured_type().unwrap();
    assert_eq!(body.base_type.as_deref(), Some("Sales.Party"));
    assert_eq!(customer.alias.as_deref(), Some("S"));

    let annotation = &model.vocabulary_annotations()[0];
    assert_eq!(&*annotation.target, "Sales.Party");
    assert_eq!(&*annotation.term, "Sales.Description");
    assert_eq!(annotation.value, Expression::string("Anyone we trade with"));
    assert!(!annotation.inline);
}

#[test]
fn test_alias_lookup_finds_same_element() {
    let model = parse(&[SALES]);
    let by_alias = model.find_type("S.Order").unwrap();
    let by_namespace = model.find_type("Sales.Order").unwrap();
    assert!(by_alias.is_same(&by_namespace));
    assert_eq!(
        model.namespace_aliases().get("Sales").map(|a| &**a),
        Some("S")
    );
}

#[test]
fn test_property_types_and_facets() {
    let model = parse(&[SALES]);
    let party = model.find_type("Sales.Party").unwrap().element().unwrap();
    let name = party
        .as_structured_type()
        .unwrap()
        .declared_property("Name")
        .unwrap();
    assert_eq!(name.type_ref().kind, TypeRefKind::Primitive(PrimitiveKind::String));
    assert!(name.type_ref().nullable);
    assert_eq!(name.type_ref().facets.max_length, Some(MaxLength::Length(100)));

    let money = model.find_type("Sales.Money").unwrap().element().unwrap();
    let definition = money.as_type_definition().unwrap();
    assert_eq!(definition.underlying, PrimitiveKind::Decimal);
    assert_eq!(definition.facets.precision, Some(18));
    assert_eq!(definition.facets.scale, Some(Scale::Value(2)));
}

#[test]
fn test_navigation_properties() {
    let model = parse(&[SALES]);
    let order = model.find_type("Sales.Order").unwrap().element().unwrap();
    let navigation = model
        .find_property(order, "Customer")
        .and_then(|p| p.as_navigation())
        .unwrap();
    assert!(!navigation.type_ref.nullable);
    assert_eq!(navigation.partner.as_deref(), Some("Orders"));
    assert_eq!(navigation.on_delete, OnDeleteAction::Cascade);
    assert_eq!(navigation.referential_constraints.len(), 1);

    let customer = model.find_type("Sales.Customer").unwrap().element().unwrap();
    let orders = model
        .find_property(customer, "Orders")
        .and_then(|p| p.as_navigation())
        .unwrap();
    assert!(orders.type_ref.is_collection());
    assert!(!orders.type_ref.element_type().nullable);
    assert_eq!(orders.target_type_name(), "Sales.Order");
}

#[test]
fn test_enum_and_container() {
    let model = parse(&[SALES]);
    let status = model.find_type("Sales.OrderStatus").unwrap().element().unwrap();
    let body = status.as_enum_type().unwrap();
    assert_eq!(body.underlying, PrimitiveKind::Int32);
    assert_eq!(body.members.len(), 2);
    assert_eq!(body.members[1].value, Some(1));

    let container = model.default_entity_container().unwrap();
    assert_eq!(container.full_name(), "Sales.Default");
    let body = container.as_entity_container().unwrap();
    assert_eq!(body.entity_sets().count(), 2);
    let import = body.operation_imports().next().unwrap();
    assert_eq!(&*import.operation, "Sales.TopCustomers");
    assert!(!import.include_in_service_document);
}

#[test]
fn test_elements_carry_source_locations() {
    let model = parse(&[SHARED_NAMESPACE_A, SHARED_NAMESPACE_B]);
    let money = model.find_type("Shared.Money").unwrap().element().unwrap();
    let price = model.find_type("Shared.Price").unwrap().element().unwrap();
    let money_location = money.location.unwrap();
    let price_location = price.location.unwrap();
    assert_eq!(money_location.document, DocumentId::new(0));
    assert_eq!(price_location.document, DocumentId::new(1));
    assert_eq!(money_location.line, 2);
}

#[test]
fn test_inline_annotations_target_their_parent() {
    let core: std::sync::Arc<dyn Model> = std::sync::Arc::new(parse(&[CORE_VOCABULARY]));
    let model = parse_with_references(USES_CORE, vec![core]);
    let on_type = model.find_declared_vocabulary_annotations("Catalog.Product");
    assert_eq!(on_type.len(), 1);
    assert_eq!(&*on_type[0].term, "Org.OData.Core.V1.Description");
    assert!(on_type[0].inline);

    let on_property = model.find_declared_vocabulary_annotations("Catalog.Product/Sku");
    assert_eq!(on_property.len(), 1);
    assert_eq!(on_property[0].value, Expression::Bool(true));
}

#[test]
fn test_schema_references_are_recorded() {
    let model = parse(&[USES_CORE]);
    let references = model.schema_references();
    assert_eq!(references.len(), 1);
    assert_eq!(references[0].includes[0].alias.as_deref(), Some("Core"));
    assert_eq!(&*references[0].includes[0].namespace, "Org.OData.Core.V1");
}

#[test]
fn test_operation_annotation_targets_overload() {
    let model = parse(&[OVERLOADS]);
    let annotations = model.find_declared_vocabulary_annotations("Math.Sum(Edm.Int32,Edm.Int32)");
    assert_eq!(annotations.len(), 1);
    assert!(model
        .find_declared_vocabulary_annotations("Math.Sum(Edm.Int32)")
        .is_empty());
}

// =============================================================================
// MULTIPLE DOCUMENTS
// =============================================================================

#[test]
fn test_namespace_shared_across_documents() {
    let model = parse(&[SHARED_NAMESPACE_A, SHARED_NAMESPACE_B]);
    assert_eq!(model.declared_namespaces().len(), 1);
    let price = model.find_type("Shared.Price").unwrap().element().unwrap();
    let value = model.find_property(price, "Value").unwrap();
    let resolved = model.resolve_type_ref(value.type_ref());
    assert_eq!(resolved.kind(), ElementKind::ComplexType);
    assert_eq!(resolved.full_name(), "Shared.Money");
}

#[test]
fn test_sequential_and_parallel_reads_agree() {
    let documents = [SALES, SHARED_NAMESPACE_A, SHARED_NAMESPACE_B];
    let parallel = CsdlReader::new().parse(&documents).unwrap();
    let sequential = CsdlReader::new()
        .with_settings(CsdlReaderSettings::default().with_parallel(false))
        .parse(&documents)
        .unwrap();
    assert_eq!(parallel.schema_elements(), sequential.schema_elements());
}

#[test]
fn test_semantic_problems_do_not_fail_parse() {
    let model = parse(&[DUPLICATE_A, DUPLICATE_B]);
    assert_eq!(model.schema_elements().len(), 2);
    assert!(matches!(model.find_type("Dup.Foo"), Some(Resolution::Bad(_))));
}

// =============================================================================
// PARSE-FATAL ERRORS
// =============================================================================

#[rstest]
#[case("", EdmErrorCode::EmptyFile)]
#[case("<Schema", EdmErrorCode::XmlError)]
#[case(
    r#"<Model xmlns="http://docs.oasis-open.org/odata/ns/edm"/>"#,
    EdmErrorCode::UnexpectedXmlElement
)]
#[case(
    r#"<edmx:Edmx xmlns:edmx="http://docs.oasis-open.org/odata/ns/edmx" Version="3.0"/>"#,
    EdmErrorCode::InvalidVersionNumber
)]
#[case(&schema(r#"<EntityType/>"#), EdmErrorCode::MissingAttribute)]
#[case(&schema(r#"<ComplexType Name="A" Name="B"/>"#), EdmErrorCode::DuplicateXmlAttribute)]
#[case(&schema(r#"<ComplexType Name="A" Colour="red"/>"#), EdmErrorCode::UnexpectedXmlAttribute)]
#[case(&schema(r#"<ComplexType Name="A" BaseType="B"/>"#), EdmErrorCode::InvalidQualifiedName)]
#[case(
    &schema(r#"<ComplexType Name="A"><Property Name="P" Type="Edm.Int32" Nullable="maybe"/></ComplexType>"#),
    EdmErrorCode::InvalidBoolean
)]
#[case(
    &schema(r#"<ComplexType Name="A"><Property Name="P" Type="Edm.String" MaxLength="lots"/></ComplexType>"#),
    EdmErrorCode::InvalidMaxLength
)]
#[case(
    &schema(r#"<ComplexType Name="A"><Property Name="P" Type="Collection("/></ComplexType>"#),
    EdmErrorCode::InvalidTypeName
)]
#[case(&schema(r#"<Widget Name="A"/>"#), EdmErrorCode::UnexpectedXmlElement)]
fn test_parse_fatal_errors(#[case] document: &str, #[case] expected: EdmErrorCode) {
    let codes = parse_error_codes(document);
    assert!(
        codes.contains(&expected),
        "Expected {expected}, got {codes:?}"
    );
    assert!(codes.iter().all(|code| code.is_parse_fatal()));
}

#[test]
fn test_every_fatal_error_is_reported() {
    let document = schema(
        r#"<ComplexType Name="A" Colour="red"/><EntityType/><ComplexType Name="B" BaseType="C"/>"#,
    );
    let codes = parse_error_codes(&document);
    assert_eq!(
        codes,
        vec![
            EdmErrorCode::UnexpectedXmlAttribute,
            EdmErrorCode::MissingAttribute,
            EdmErrorCode::InvalidQualifiedName,
        ]
    );
}

#[test]
fn test_errors_from_all_documents_are_collected() {
    let errors = CsdlReader::new()
        .parse(&["", &schema(r#"<EntityType/>"#)])
        .unwrap_err();
    assert!(errors.contains(EdmErrorCode::EmptyFile));
    assert!(errors.contains(EdmErrorCode::MissingAttribute));
}

#[test]
fn test_lenient_attributes() {
    let document = schema(r#"<ComplexType Name="A" Colour="red"/>"#);
    let settings = CsdlReaderSettings::default().with_strict_attributes(false);
    let reader = CsdlReader::new().with_settings(settings);
    let model = reader.parse(&[&document]).unwrap();
    assert!(model.find_type("NS.A").is_some());
}

#[test]
fn test_foreign_elements_are_ignored() {
    let document = schema(
        r#"<ComplexType Name="A"><x:Extra xmlns:x="urn:vendor"/></ComplexType>"#,
    );
    let model = parse(&[&document]);
    assert!(model.find_type("NS.A").is_some());
}
