//! Annotation queries: by target, by term, through references and up the
//! base-type chain.

use std::sync::Arc;

use edm::model::{EdmErrorCode, Expression, Model};
use edm::resolve::{EdmModelExt, ResolveError};

use crate::helpers::csdl_fixtures::*;
use crate::helpers::model_helpers::*;

fn core() -> Arc<dyn Model> {
    Arc::new(parse(&[CORE_VOCABULARY]))
}

#[test]
fn test_inherited_annotations_follow_base_types() {
    let model = parse(&[SALES]);
    let customer = model.find_type("Sales.Customer").unwrap();
    let found = model
        .find_vocabulary_annotations_including_inherited(Some(&customer))
        .unwrap();
    let terms: Vec<&str> = found.iter().map(|a| &*a.term).collect();
    assert_eq!(terms, vec!["Sales.Priority", "Sales.Description"]);

    let party = model.find_type("Sales.Party").unwrap();
    let found = model
        .find_vocabulary_annotations_including_inherited(Some(&party))
        .unwrap();
    assert_eq!(found.len(), 1);
}

#[test]
fn test_inherited_annotations_in_a_cycle() {
    let model = parse(&[CYCLE]);
    let a = model.find_type("Loop.A").unwrap();
    assert!(model
        .find_vocabulary_annotations_including_inherited(Some(&a))
        .unwrap()
        .is_empty());
}

#[test]
fn test_inherited_annotations_need_an_element() {
    let model = parse(&[SALES]);
    assert!(matches!(
        model.find_vocabulary_annotations_including_inherited(None),
        Err(ResolveError::MissingElement)
    ));
}

#[test]
fn test_annotations_by_term() {
    let model = parse(&[SALES]);
    let by_alias =
        model.find_vocabulary_annotations_for_term("Sales.Party", "S.Description", None);
    let by_name =
        model.find_vocabulary_annotations_for_term("Sales.Party", "Sales.Description", None);
    assert_eq!(by_alias.len(), 1);
    assert_eq!(by_name.len(), 1);
    assert!(std::ptr::eq(by_alias[0], by_name[0]));
    assert!(model
        .find_vocabulary_annotations_for_term("Sales.Party", "Sales.Description", Some("Tablet"))
        .is_empty());

    let term = model.find_term("Sales.Priority").unwrap().element().unwrap();
    let found = model.find_vocabulary_annotations_for_term_element("Sales.Customer", term, None);
    assert_eq!(found[0].value, Expression::Int(1));
}

#[test]
fn test_terms_from_referenced_vocabulary() {
    let model = parse_with_references(USES_CORE, vec![core()]);
    assert!(model.find_term("Org.OData.Core.V1.Immutable").is_some());
    assert!(model.find_declared_term("Org.OData.Core.V1.Immutable").is_none());

    let found =
        model.find_vocabulary_annotations_for_term("Catalog.Product", "Core.Description", None);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].value, Expression::string("Something we sell"));

    let term = model.annotation_term(found[0]);
    assert!(!term.is_bad());
    assert_eq!(term.full_name(), "Org.OData.Core.V1.Description");
    assert!(model.validate().is_empty());
}

#[test]
fn test_annotations_declared_by_references() {
    let catalog: Arc<dyn Model> = Arc::new(parse_with_references(USES_CORE, vec![core()]));
    let model = parse_with_references(SALES, vec![catalog]);
    assert!(model.find_declared_vocabulary_annotations("Catalog.Product").is_empty());
    assert_eq!(model.find_vocabulary_annotations("Catalog.Product").len(), 1);
}

#[test]
fn test_unresolved_annotation_term() {
    let model = parse(&[USES_CORE]);
    let annotation = &model.vocabulary_annotations()[0];
    let term = model.annotation_term(annotation);
    assert!(term.is_bad());
    assert_eq!(term.errors()[0].code, EdmErrorCode::BadUnresolvedTerm);
}
