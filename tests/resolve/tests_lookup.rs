//! Name lookup, ambiguity, cycles and overloads.

use std::sync::Arc;

use rstest::rstest;

use edm::builder::EdmModel;
use edm::model::{
    BadElement, BadReason, EdmErrorCode, ElementKind, Model, PrimitiveKind, SchemaElement,
    StructuredType, TypeRef,
};
use edm::resolve::{EdmModelExt, OperationSignature, Resolution};

use crate::helpers::csdl_fixtures::*;
use crate::helpers::model_helpers::*;

fn full_names(elements: &[&SchemaElement]) -> Vec<String> {
    elements.iter().map(|e| e.full_name()).collect()
}

// =============================================================================
// CORE TYPES
// =============================================================================

#[rstest]
#[case::sales(&[SALES])]
#[case::shared(&[SHARED_NAMESPACE_A, SHARED_NAMESPACE_B])]
#[case::cycle(&[CYCLE])]
fn test_core_types_are_not_declared(#[case] documents: &[&str]) {
    let model = parse(documents);
    assert!(model.find_declared_type("Edm.Int32").is_none());
    let int32 = model.find_type("Edm.Int32").unwrap();
    assert_eq!(int32.kind(), ElementKind::Primitive);
    assert_eq!(int32.element().unwrap().as_primitive(), Some(PrimitiveKind::Int32));
}

#[test]
fn test_core_type_is_shared_between_models() {
    let first = parse(&[SALES]);
    let second = parse(&[CYCLE]);
    let a = first.find_type("Edm.String").unwrap();
    let b = second.find_type("Edm.String").unwrap();
    assert!(a.is_same(&b));
}

#[test]
fn test_unknown_name_is_none() {
    let model = parse(&[SALES]);
    assert!(model.find_type("Sales.Nothing").is_none());
    assert!(model.find_type("Nope.Customer").is_none());
    assert!(model.find_term("Sales.Customer").is_none());
    assert!(model.find_entity_container("Sales.Customer").is_none());
}

#[test]
fn test_lookup_spaces_are_separate() {
    let model = parse(&[SALES]);
    assert_eq!(model.find_term("S.Description").unwrap().kind(), ElementKind::Term);
    assert!(model.find_type("S.Description").is_none());
    assert_eq!(
        model.find_entity_container("S.Default").unwrap().kind(),
        ElementKind::EntityContainer
    );
}

// =============================================================================
// AMBIGUITY
// =============================================================================

#[test]
fn test_duplicate_type_is_ambiguous() {
    let model = parse(&[DUPLICATE_A, DUPLICATE_B]);
    let Some(Resolution::Bad(bad)) = model.find_type("Dup.Foo") else {
        panic!("Expected an ambiguous result");
    };
    assert_eq!(bad.reason(), BadReason::Ambiguous);
    assert_eq!(bad.full_name(), "Dup.Foo");
    assert_eq!(bad.errors()[0].code, EdmErrorCode::DuplicateType);
    assert_eq!(bad.errors().len(), 2);
}

#[test]
fn test_ambiguous_result_is_stable() {
    let model = parse(&[DUPLICATE_A, DUPLICATE_B]);
    let first = model.find_type("Dup.Foo").unwrap();
    let second = model.find_type("Dup.Foo").unwrap();
    assert!(Arc::ptr_eq(first.bad().unwrap(), second.bad().unwrap()));
    assert!(first.is_same(&second));
    assert!(model.find_declared_type("Dup.Foo").unwrap().is_bad());
}

#[test]
fn test_reference_declaring_same_name_is_ambiguous() {
    let referenced: Arc<dyn Model> = Arc::new(parse(&[DUPLICATE_A]));
    let model = parse_with_references(DUPLICATE_B, vec![referenced]);
    assert!(model.find_type("Dup.Foo").unwrap().is_bad());
    assert!(!model.find_declared_type("Dup.Foo").unwrap().is_bad());
}

// =============================================================================
// INHERITANCE
// =============================================================================

#[test]
fn test_properties_include_inherited() {
    let model = parse(&[SALES]);
    let customer = model.find_type("Sales.Customer").unwrap().element().unwrap();
    let names: Vec<&str> = model.properties(customer).iter().map(|p| &**p.name()).collect();
    assert_eq!(names, vec!["Id", "Name", "Address", "Orders"]);
    assert_eq!(model.declared_properties(customer).len(), 2);
    assert_eq!(&*model.key(customer)[0].name, "Id");
}

#[test]
fn test_derived_types() {
    let model = parse(&[SALES]);
    let party = model.find_type("Sales.Party").unwrap().element().unwrap();
    let derived = model.find_all_derived_types(party);
    assert_eq!(derived.len(), 1);
    assert_eq!(derived[0].full_name(), "Sales.Customer");

    let order = model.find_type("Sales.Order").unwrap().element().unwrap();
    assert!(model.find_directly_derived_types(order).is_empty());
}

#[test]
fn test_derived_type_chain() {
    let mut model = EdmModel::new();
    model.add_entity_type("Chain", "A", StructuredType::new());
    model.add_entity_type("Chain", "B", StructuredType::new().with_base_type("Chain.A"));
    model.add_entity_type("Chain", "C", StructuredType::new().with_base_type("Chain.B"));
    model.add_entity_type("Chain", "D", StructuredType::new().with_base_type("Chain.C"));
    let element = |name: &str| model.find_type(name).unwrap().element().unwrap();

    assert_eq!(full_names(&model.find_directly_derived_types(element("Chain.A"))), ["Chain.B"]);
    assert_eq!(
        full_names(&model.find_all_derived_types(element("Chain.A"))),
        ["Chain.B", "Chain.C", "Chain.D"]
    );
    assert_eq!(
        full_names(&model.find_all_derived_types(element("Chain.B"))),
        ["Chain.C", "Chain.D"]
    );
    assert!(model.find_all_derived_types(element("Chain.D")).is_empty());
}

#[test]
fn test_derived_types_across_references() {
    let mut base = EdmModel::new();
    base.add_entity_type("Base", "Party", StructuredType::new());
    base.add_entity_type("Base", "Org", StructuredType::new().with_base_type("Base.Party"));
    let base: Arc<dyn Model> = Arc::new(base);

    let mut ext = EdmModel::new();
    ext.add_reference(Arc::clone(&base));
    ext.add_entity_type("Ext", "Customer", StructuredType::new().with_base_type("Base.Party"));
    let ext: Arc<dyn Model> = Arc::new(ext);

    let mut main = EdmModel::new();
    main.add_reference(Arc::clone(&base));
    main.add_reference(ext);
    main.add_reference(base);
    main.add_entity_type("Main", "Vip", StructuredType::new().with_base_type("Ext.Customer"));

    let party = main.find_type("Base.Party").unwrap();
    assert!(!party.is_bad());
    let party = party.element().unwrap();
    assert_eq!(
        full_names(&main.find_directly_derived_types(party)),
        ["Base.Org", "Ext.Customer"]
    );
    assert_eq!(
        full_names(&main.find_all_derived_types(party)),
        ["Base.Org", "Ext.Customer", "Main.Vip"]
    );
}

#[rstest]
#[case("Loop.A")]
#[case("Loop.B")]
#[case("Loop.C")]
fn test_cycle_members(#[case] name: &str) {
    let model = parse(&[CYCLE]);
    let element = model.find_type(name).unwrap().element().unwrap();
    assert!(model.is_in_base_type_cycle(element));
    assert!(model.find_directly_derived_types(element).is_empty());
    assert!(model.find_all_derived_types(element).is_empty());

    let base = model.base_type(element).unwrap();
    assert_eq!(base.bad().unwrap().reason(), BadReason::Cyclic);
    assert_eq!(base.errors()[0].code, EdmErrorCode::BadCyclicComplex);
    assert!(model.properties(element).is_empty());
}

#[test]
fn test_type_refs_resolve_through_aliases() {
    let model = parse(&[SALES]);
    let order = model.find_type("Sales.Order").unwrap().element().unwrap();
    let status = model.find_property(order, "Status").unwrap();
    assert_eq!(model.resolve_type_ref(status.type_ref()).full_name(), "Sales.OrderStatus");

    let dangling = model.resolve_type_ref(&TypeRef::named("Sales.Missing"));
    assert!(dangling.is_bad());
    assert_eq!(dangling.bad().unwrap().reason(), BadReason::Unresolved);
}

#[test]
fn test_dangling_type_ref_kind_is_unknown() {
    let model = parse(&[SALES]);
    let plain = model.resolve_type_ref(&TypeRef::named("Sales.Missing"));
    assert_eq!(plain.kind(), ElementKind::Unknown);
    let items = model.resolve_type_ref(&TypeRef::collection(TypeRef::named("Sales.Missing")));
    assert_eq!(items.kind(), ElementKind::Unknown);
    let entity = model.resolve_type_ref(&TypeRef::entity_reference("Sales.Missing"));
    assert_eq!(entity.kind(), ElementKind::EntityType);
}

// =============================================================================
// OVERLOADS
// =============================================================================

#[test]
fn test_overload_set() {
    let model = parse(&[OVERLOADS]);
    let overloads = model.find_operations("Math.Sum");
    assert_eq!(overloads.len(), 2);
    for overload in &overloads {
        let signature = OperationSignature::of(overload.as_operation().unwrap());
        let found = model.find_operation("Math.Sum", &signature).unwrap();
        assert!(std::ptr::eq(found, *overload));
    }
}

#[test]
fn test_signature_ignores_facets() {
    let model = parse(&[OVERLOADS]);
    let signature = OperationSignature::new([(
        "a",
        TypeRef::primitive(PrimitiveKind::Int32).with_precision(3),
    )]);
    assert!(model.find_operation("Math.Sum", &signature).is_some());
    let wrong = OperationSignature::new([("a", TypeRef::primitive(PrimitiveKind::String))]);
    assert!(model.find_operation("Math.Sum", &wrong).is_none());
}

#[test]
fn test_operation_imports() {
    let model = parse(&[SALES]);
    let container = model.default_entity_container().unwrap();
    let imports = model.find_operation_imports(container, "TopCustomers");
    assert_eq!(imports.len(), 1);
    let operations = model.find_imported_operations(imports[0]);
    assert_eq!(operations.len(), 1);
    assert_eq!(operations[0].full_name(), "Sales.TopCustomers");
}

// =============================================================================
// CONCURRENCY
// =============================================================================

#[test]
fn test_parsed_model_is_shared_between_threads() {
    let model = Arc::new(parse(&[SALES, DUPLICATE_A, DUPLICATE_B]));
    let expected_errors = model.validate();

    let results: Vec<(Arc<BadElement>, usize, usize)> = std::thread::scope(|scope| {
        let expected_errors = &expected_errors;
        let workers: Vec<_> = (0..8)
            .map(|_| {
                let model = Arc::clone(&model);
                scope.spawn(move || {
                    let bad = Arc::clone(model.find_type("Dup.Foo").unwrap().bad().unwrap());
                    let customer = model.find_type("S.Customer").unwrap().element().unwrap();
                    let properties = model.properties(customer).len();
                    assert_eq!(model.validate(), *expected_errors);
                    (bad, properties, model.find_all_derived_types(customer).len())
                })
            })
            .collect();
        workers.into_iter().map(|w| w.join().unwrap()).collect()
    });

    let first = &results[0].0;
    for (bad, properties, derived) in &results {
        assert!(Arc::ptr_eq(first, bad));
        assert_eq!((*properties, *derived), (4, 0));
    }
}
