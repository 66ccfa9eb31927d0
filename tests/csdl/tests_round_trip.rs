//! Write-then-read tests: serializing a model and parsing the output must
//! give back an equivalent model.

use rstest::rstest;
use tempfile::TempDir;

use edm::builder::EdmModel;
use edm::convert::compare_models;
use edm::csdl::{CsdlModel, CsdlWriter, CsdlWriterSettings, read_file, read_files, write_file};
use edm::model::{
    ContainerElement, EntityContainer, EntitySet, Expression, Model, PrimitiveKind,
    RecordExpression, Singleton, StructuralProperty, StructuredType, Term, TypeRef,
    VocabularyAnnotation,
};
use edm::resolve::EdmModelExt;

use crate::helpers::csdl_fixtures::*;
use crate::helpers::model_helpers::*;

// =============================================================================
// HELPERS
// =============================================================================

fn round_trip(model: &dyn Model) -> CsdlModel {
    let text = CsdlWriter::new().write_edmx(model).unwrap();
    match CsdlModel::parse(&text) {
        Ok(reparsed) => reparsed,
        Err(errors) => panic!("Written document does not parse:\n{errors}\n{text}"),
    }
}

fn assert_equivalent(expected: &dyn Model, actual: &dyn Model) {
    let differences = compare_models(expected, actual);
    assert!(
        differences.is_empty(),
        "Models differ:\n{}",
        differences
            .iter()
            .map(|d| format!("  {d}"))
            .collect::<Vec<_>>()
            .join("\n")
    );
}

fn annotated_model(value: Expression) -> EdmModel {
    let mut model = EdmModel::new();
    model.add_complex_type("NS", "C", StructuredType::new());
    model.add_term("NS", "T", Term::new(TypeRef::primitive(PrimitiveKind::Untyped)));
    model.add_vocabulary_annotation(VocabularyAnnotation::new("NS.C", "NS.T", value));
    model
}

// =============================================================================
// PARSED MODELS
// =============================================================================

#[rstest]
#[case::sales(&[SALES])]
#[case::overloads(&[OVERLOADS])]
#[case::cycle(&[CYCLE])]
#[case::shared_namespace(&[SHARED_NAMESPACE_A, SHARED_NAMESPACE_B])]
#[case::duplicates(&[DUPLICATE_A, DUPLICATE_B])]
#[case::references(&[USES_CORE])]
fn test_parsed_model_round_trips(#[case] documents: &[&str]) {
    let model = parse(documents);
    let reparsed = round_trip(&model);
    assert_equivalent(&model, &reparsed);
}

#[test]
fn test_shared_namespace_is_written_as_one_schema() {
    let model = parse(&[SHARED_NAMESPACE_A, SHARED_NAMESPACE_B]);
    let schemas = CsdlWriter::new().write_schemas(&model).unwrap();
    assert_eq!(schemas.len(), 1);
    assert_eq!(&*schemas[0].0, "Shared");
    let reparsed = CsdlModel::parse(&schemas[0].1).unwrap();
    assert_equivalent(&model, &reparsed);
}

#[test]
fn test_one_schema_per_namespace() {
    let model = parse(&[SALES, SHARED_NAMESPACE_A]);
    let schemas = CsdlWriter::new().write_schemas(&model).unwrap();
    let namespaces: Vec<&str> = schemas.iter().map(|(ns, _)| &**ns).collect();
    assert_eq!(namespaces, vec!["Sales", "Shared"]);
}

#[test]
fn test_schema_references_are_written() {
    let model = parse(&[USES_CORE]);
    let reparsed = round_trip(&model);
    assert_eq!(reparsed.schema_references(), model.schema_references());
}

#[test]
fn test_written_alias_is_preserved() {
    let model = parse(&[SALES]);
    let text = CsdlWriter::new().write_edmx(&model).unwrap();
    assert!(text.contains(r#"Alias="S""#));
    let reparsed = CsdlModel::parse(&text).unwrap();
    assert!(reparsed.find_type("S.Customer").is_some());
}

#[test]
fn test_collection_navigation_nullability_round_trips() {
    let document = schema(concat!(
        r#"<EntityType Name="A"><Key><PropertyRef Name="Id"/></Key>"#,
        r#"<Property Name="Id" Type="Edm.Int32" Nullable="false"/>"#,
        r#"<NavigationProperty Name="Bs" Type="Collection(NS.A)" Nullable="true"/>"#,
        r#"<NavigationProperty Name="Cs" Type="Collection(NS.A)"/>"#,
        "</EntityType>",
    ));
    let model = parse(&[&document]);
    let reparsed = round_trip(&model);
    assert_equivalent(&model, &reparsed);

    let a = reparsed.find_type("NS.A").unwrap().element().unwrap();
    let items_nullable = |name: &str| {
        let navigation = reparsed.find_property(a, name).and_then(|p| p.as_navigation()).unwrap();
        navigation.type_ref.element_type().nullable
    };
    assert!(items_nullable("Bs"));
    assert!(!items_nullable("Cs"));
}

#[test]
fn test_singleton_nullability_round_trips() {
    let document = schema(concat!(
        r#"<EntityType Name="User"><Key><PropertyRef Name="Id"/></Key>"#,
        r#"<Property Name="Id" Type="Edm.Int32" Nullable="false"/></EntityType>"#,
        r#"<EntityContainer Name="C">"#,
        r#"<Singleton Name="Me" Type="NS.User" Nullable="true"/>"#,
        r#"<Singleton Name="Admin" Type="NS.User"/>"#,
        "</EntityContainer>",
    ));
    let model = parse(&[&document]);
    let text = CsdlWriter::new().write_edmx(&model).unwrap();
    assert_eq!(text.matches(r#"Nullable="true""#).count(), 1);
    let reparsed = round_trip(&model);
    assert_equivalent(&model, &reparsed);

    let nullable = |name: &str| {
        match reparsed.find_navigation_source("NS.C", name).unwrap().element {
            ContainerElement::Singleton(singleton) => singleton.nullable,
            other => panic!("Expected a singleton, got {other:?}"),
        }
    };
    assert!(nullable("Me"));
    assert!(!nullable("Admin"));
}

#[test]
fn test_singleton_nullability_is_compared() {
    let mut plain = EdmModel::new();
    plain.add_entity_container(
        "NS",
        "C",
        EntityContainer::default().with_element(Singleton::new("Me", "NS.User")),
    );
    let mut nullable = EdmModel::new();
    nullable.add_entity_container(
        "NS",
        "C",
        EntityContainer::default()
            .with_element(Singleton::new("Me", "NS.User").with_nullable(true)),
    );
    assert_eq!(compare_models(&plain, &nullable).len(), 1);
}

#[rstest]
#[case::compact(CsdlWriterSettings::default().with_indent(0))]
#[case::no_declaration(CsdlWriterSettings::default().with_xml_declaration(false))]
#[case::version_401(CsdlWriterSettings::default().with_version("4.01"))]
#[case::no_aliases(CsdlWriterSettings::default().with_aliases(false))]
fn test_writer_settings_keep_documents_readable(#[case] settings: CsdlWriterSettings) {
    let model = parse(&[SALES]);
    let text = CsdlWriter::new().with_settings(settings).write_edmx(&model).unwrap();
    let reparsed = CsdlModel::parse(&text).unwrap();
    assert_eq!(
        compare_models(&model, &reparsed)
            .iter()
            .filter(|d| !matches!(d, edm::convert::ModelDifference::AliasMismatch { .. }))
            .count(),
        0
    );
}

// =============================================================================
// BUILT MODELS
// =============================================================================

#[rstest]
#[case::null(Expression::Null)]
#[case::nan(Expression::Float(f64::NAN))]
#[case::infinity(Expression::Float(f64::NEG_INFINITY))]
#[case::collection(Expression::Collection(vec![Expression::string("a"), Expression::Int(2)]))]
#[case::padded_string(Expression::Collection(vec![Expression::string("  padded  ")]))]
#[case::record(Expression::Record(
    RecordExpression::default()
        .with_property("Label", Expression::string("x"))
        .with_property("Required", Expression::Bool(false)),
))]
fn test_annotation_values_round_trip(#[case] value: Expression) {
    let model = annotated_model(value);
    let reparsed = round_trip(&model);
    assert_equivalent(&model, &reparsed);
}

#[test]
fn test_builder_model_round_trips() {
    let mut model = EdmModel::new();
    let person = model.add_entity_type(
        "People",
        "Person",
        StructuredType::new()
            .with_key(&["Id"])
            .with_property(StructuralProperty::new(
                "Id",
                TypeRef::primitive(PrimitiveKind::Guid).with_nullable(false),
            ))
            .with_property(StructuralProperty::new(
                "Tags",
                TypeRef::collection(TypeRef::primitive(PrimitiveKind::String)),
            )),
    );
    model
        .add_structural_property(
            person,
            StructuralProperty::new("Age", TypeRef::primitive(PrimitiveKind::Int16))
                .with_default_value("0"),
        )
        .unwrap();
    model.add_entity_container(
        "People",
        "Service",
        EntityContainer::default().with_element(EntitySet::new("People", "People.Person")),
    );
    model.set_namespace_alias("People", "P");

    let reparsed = round_trip(&model);
    assert_equivalent(&model, &reparsed);
    assert!(reparsed.validate().is_empty());
}

// =============================================================================
// FILES
// =============================================================================

#[test]
fn test_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sales.xml");

    let model = parse(&[SALES]);
    write_file(&model, &path).unwrap();
    let reread = read_file(&path).unwrap();
    assert_equivalent(&model, &reread);
}

#[test]
fn test_read_several_files() {
    let dir = TempDir::new().unwrap();
    let first = dir.path().join("a.xml");
    let second = dir.path().join("b.xml");
    std::fs::write(&first, SHARED_NAMESPACE_A).unwrap();
    std::fs::write(&second, SHARED_NAMESPACE_B).unwrap();

    let model = read_files(&[first, second]).unwrap();
    assert_eq!(model.schema_elements().len(), 2);
    assert!(model.validate().is_empty());
}

#[test]
fn test_missing_file_is_an_io_error() {
    let dir = TempDir::new().unwrap();
    let result = read_file(dir.path().join("missing.xml"));
    assert!(matches!(result, Err(edm::csdl::CsdlError::Io(_))));
}

#[test]
fn test_invalid_file_is_a_parse_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.xml");
    std::fs::write(&path, "<Schema").unwrap();
    assert!(matches!(read_file(&path), Err(edm::csdl::CsdlError::Parse(_))));
}

// =============================================================================
// JSON
// =============================================================================

#[cfg(feature = "json")]
#[test]
fn test_json_document_shape() {
    let model = parse(&[SALES]);
    let text = edm::csdl::write_json(&model).unwrap();
    let document: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(document["$EntityContainer"], "Sales.Default");
    assert_eq!(document["Sales"]["Customer"]["$Kind"], "EntityType");
    assert_eq!(document["Sales"]["Customer"]["$BaseType"], "Sales.Party");
}
