//! Semantic diagnostics of parsed models.

use std::sync::Arc;

use rstest::rstest;

use edm::model::{EdmErrorCode, Model};
use edm::resolve::EdmModelExt;

use crate::helpers::csdl_fixtures::*;
use crate::helpers::model_helpers::*;

// =============================================================================
// VALID MODELS
// =============================================================================

#[rstest]
#[case::sales(&[SALES])]
#[case::overloads(&[OVERLOADS])]
#[case::shared_namespace(&[SHARED_NAMESPACE_A, SHARED_NAMESPACE_B])]
#[case::vocabulary(&[CORE_VOCABULARY])]
fn test_valid_models(#[case] documents: &[&str]) {
    let model = parse(documents);
    let errors = model.validate();
    assert!(errors.is_empty(), "Unexpected errors:\n{}", format_errors(&errors));
}

#[test]
fn test_valid_with_referenced_vocabulary() {
    let core: Arc<dyn Model> = Arc::new(parse(&[CORE_VOCABULARY]));
    let model = parse_with_references(USES_CORE, vec![core]);
    assert!(model.validate().is_empty());
}

// =============================================================================
// INVALID MODELS
// =============================================================================

#[test]
fn test_unreferenced_vocabulary_terms_are_unresolved() {
    let model = parse(&[USES_CORE]);
    assert_eq!(
        codes(&model.validate()),
        vec![EdmErrorCode::BadUnresolvedTerm, EdmErrorCode::BadUnresolvedTerm]
    );
}

#[test]
fn test_duplicates_across_documents() {
    let model = parse(&[DUPLICATE_A, DUPLICATE_B]);
    assert_eq!(
        codes(&model.validate()),
        vec![EdmErrorCode::AlreadyDefined, EdmErrorCode::AlreadyDefined]
    );
}

#[test]
fn test_every_cycle_member_is_reported() {
    let model = parse(&[CYCLE]);
    assert_eq!(codes(&model.validate()), vec![EdmErrorCode::BadCyclicComplex; 3]);
}

#[rstest]
#[case::no_key(
    r#"<EntityType Name="E"><Property Name="P" Type="Edm.Int32"/></EntityType>"#,
    vec![EdmErrorCode::InvalidKey]
)]
#[case::nullable_key(
    r#"<EntityType Name="E"><Key><PropertyRef Name="P"/></Key><Property Name="P" Type="Edm.Int32"/></EntityType>"#,
    vec![EdmErrorCode::InvalidKey]
)]
#[case::unknown_key(
    r#"<EntityType Name="E"><Key><PropertyRef Name="Q"/></Key><Property Name="P" Type="Edm.Int32" Nullable="false"/></EntityType>"#,
    vec![EdmErrorCode::InvalidKey]
)]
#[case::unresolved_property_type(
    r#"<ComplexType Name="C"><Property Name="P" Type="NS.Missing"/></ComplexType>"#,
    vec![EdmErrorCode::BadUnresolvedType]
)]
#[case::duplicate_property(
    r#"<ComplexType Name="C"><Property Name="P" Type="Edm.Int32"/><Property Name="P" Type="Edm.String"/></ComplexType>"#,
    vec![EdmErrorCode::AlreadyDefined]
)]
#[case::duplicate_member(
    r#"<EnumType Name="E"><Member Name="A"/><Member Name="A"/></EnumType>"#,
    vec![EdmErrorCode::AlreadyDefined]
)]
#[case::identical_overloads(
    r#"<Function Name="F"><Parameter Name="a" Type="Edm.Int32"/><ReturnType Type="Edm.Int32"/></Function>
       <Function Name="F"><Parameter Name="a" Type="Edm.Int32"/><ReturnType Type="Edm.String"/></Function>"#,
    vec![EdmErrorCode::DuplicateFunctions, EdmErrorCode::DuplicateFunctions]
)]
#[case::duplicate_parameter(
    r#"<Action Name="A"><Parameter Name="a" Type="Edm.Int32"/><Parameter Name="a" Type="Edm.Int32"/></Action>"#,
    vec![EdmErrorCode::AlreadyDefined]
)]
#[case::unresolved_term(
    r#"<ComplexType Name="C"/><Annotations Target="NS.C"><Annotation Term="NS.Nope"/></Annotations>"#,
    vec![EdmErrorCode::BadUnresolvedTerm]
)]
#[case::missing_base_term(
    r#"<Term Name="T" Type="Edm.String" BaseTerm="NS.Missing"/>"#,
    vec![EdmErrorCode::BadUnresolvedTerm]
)]
#[case::set_of_missing_type(
    r#"<EntityContainer Name="C"><EntitySet Name="S" EntityType="NS.Missing"/></EntityContainer>"#,
    vec![EdmErrorCode::BadUnresolvedEntityType]
)]
#[case::import_of_missing_function(
    r#"<EntityContainer Name="C"><FunctionImport Name="F" Function="NS.Missing"/></EntityContainer>"#,
    vec![EdmErrorCode::BadUnresolvedOperation]
)]
fn test_invalid_schemas(#[case] body: &str, #[case] expected: Vec<EdmErrorCode>) {
    let model = parse(&[&schema(body)]);
    let errors = model.validate();
    assert_eq!(codes(&errors), expected, "{}", format_errors(&errors));
}

// =============================================================================
// LOCATIONS AND SCOPING
// =============================================================================

#[test]
fn test_errors_point_at_their_element() {
    let document = schema("\n<ComplexType Name=\"Ok\"/>\n<EntityType Name=\"NoKey\"/>");
    let model = parse(&[&document]);
    let errors = model.validate();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].location.unwrap().line, 3);
}

#[test]
fn test_element_errors_only_cover_the_element() {
    let document = schema(
        r#"<EntityType Name="NoKey"/><ComplexType Name="C"><Property Name="P" Type="NS.Missing"/></ComplexType>"#,
    );
    let model = parse(&[&document]);
    let no_key = model.find_type("NS.NoKey").unwrap().element().unwrap();
    let complex = model.find_type("NS.C").unwrap().element().unwrap();
    assert_eq!(
        codes(&model.element_errors(no_key)),
        vec![EdmErrorCode::InvalidKey]
    );
    assert_eq!(
        codes(&model.element_errors(complex)),
        vec![EdmErrorCode::BadUnresolvedType]
    );
    assert_eq!(model.validate().len(), 2);
}

#[test]
fn test_shared_dangling_names_are_reported_per_referrer() {
    let document = schema(concat!(
        "\n<ComplexType Name=\"D1\" BaseType=\"NS.Missing\"/>",
        "\n<ComplexType Name=\"D2\" BaseType=\"NS.Missing\"/>",
        "\n<Annotations Target=\"NS.D1\"><Annotation Term=\"NS.Gone\"/></Annotations>",
        "\n<Annotations Target=\"NS.D2\"><Annotation Term=\"NS.Gone\"/></Annotations>",
    ));
    let model = parse(&[&document]);
    let errors = model.validate();
    assert_eq!(
        codes(&errors),
        vec![
            EdmErrorCode::BadUnresolvedComplexType,
            EdmErrorCode::BadUnresolvedComplexType,
            EdmErrorCode::BadUnresolvedTerm,
            EdmErrorCode::BadUnresolvedTerm,
        ]
    );
    let lines: Vec<u32> = errors.iter().map(|e| e.location.unwrap().line).collect();
    assert_eq!(lines, vec![2, 3, 4, 5]);
    assert!(errors[0].message.contains("'NS.D1'"));
    assert!(errors[1].message.contains("'NS.D2'"));
    assert!(errors[3].message.contains("'NS.D2'"));

    let d2 = model.find_type("NS.D2").unwrap().element().unwrap();
    let own = model.element_errors(d2);
    assert_eq!(own.len(), 1);
    assert!(own[0].message.contains("'NS.D2'"));
    assert!(!own[0].message.contains("'NS.D1'"));
    assert_eq!(own[0].location.unwrap().line, 3);
}

#[test]
fn test_validation_is_repeatable() {
    let model = parse(&[DUPLICATE_A, DUPLICATE_B, CYCLE]);
    assert_eq!(model.validate(), model.validate());
}
