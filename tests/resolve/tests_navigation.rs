//! Navigation sources, bindings and partners.

use edm::builder::EdmModel;
use edm::model::{
    EdmErrorCode, ElementKind, EntityContainer, EntitySet, NavigationProperty, PrimitiveKind,
    Singleton, StructuralProperty, StructuredType, TypeRef,
};
use edm::resolve::{EdmModelExt, NavigationTarget};

use crate::helpers::csdl_fixtures::*;
use crate::helpers::model_helpers::*;

/// A folder tree: `Children` is contained, `Owner` is never bound and
/// `Parent` is bound to a set that does not exist.
fn folders() -> EdmModel {
    let mut model = EdmModel::new();
    let folder = model.add_entity_type(
        "Files",
        "Folder",
        StructuredType::new()
            .with_key(&["Id"])
            .with_property(StructuralProperty::new(
                "Id",
                TypeRef::primitive(PrimitiveKind::Int64).with_nullable(false),
            )),
    );
    model
        .add_navigation_property(
            folder,
            NavigationProperty::new("Children", TypeRef::collection(TypeRef::named("Files.Folder")))
                .with_contains_target(true),
        )
        .unwrap();
    model
        .add_navigation_property(
            folder,
            NavigationProperty::new("Owner", TypeRef::named("Files.Folder")),
        )
        .unwrap();
    model
        .add_navigation_property(
            folder,
            NavigationProperty::new("Parent", TypeRef::named("Files.Folder")),
        )
        .unwrap();
    model.add_entity_container(
        "Files",
        "Drive",
        EntityContainer::default()
            .with_element(
                EntitySet::new("Folders", "Files.Folder").with_binding("Parent", "Nowhere"),
            )
            .with_element(Singleton::new("Root", "Files.Folder")),
    );
    model
}

#[test]
fn test_bound_targets() {
    let model = parse(&[SALES]);
    let customers = model.find_navigation_source("Sales.Default", "Customers").unwrap();
    let orders = model.find_navigation_source("S.Default", "Orders").unwrap();

    let customer = model.find_type("Sales.Customer").unwrap().element().unwrap();
    let navigation = model
        .find_property(customer, "Orders")
        .and_then(|p| p.as_navigation())
        .unwrap();
    let target = model.find_navigation_target(&customers, customer, navigation);
    assert!(target.source().unwrap().is_same(&orders));

    let back = model.find_navigation_target_by_path(&orders, "Customer");
    assert!(back.source().unwrap().is_same(&customers));
}

#[test]
fn test_navigation_source_type() {
    let model = parse(&[SALES]);
    let orders = model.find_navigation_source("Sales.Default", "Orders").unwrap();
    assert_eq!(orders.name(), "Orders");
    assert_eq!(orders.target_path(), "Sales.Default/Orders");
    let ty = model.navigation_source_type(&orders);
    assert_eq!(ty.kind(), ElementKind::EntityType);
    assert_eq!(ty.full_name(), "Sales.Order");
}

#[test]
fn test_missing_navigation_source() {
    let model = parse(&[SALES]);
    assert!(model.find_navigation_source("Sales.Default", "Suppliers").is_none());
    assert!(model.find_navigation_source("Sales.Default", "TopCustomers").is_none());
    assert!(model.find_navigation_source("Sales.Elsewhere", "Orders").is_none());
}

#[test]
fn test_unbound_contained_and_dangling_targets() {
    let model = folders();
    let folders = model.find_navigation_source("Files.Drive", "Folders").unwrap();
    let folder = model.find_type("Files.Folder").unwrap().element().unwrap();
    let navigation = |name: &str| {
        model
            .find_property(folder, name)
            .and_then(|p| p.as_navigation())
            .unwrap()
    };

    assert!(matches!(
        model.find_navigation_target(&folders, folder, navigation("Children")),
        NavigationTarget::Contained
    ));
    assert!(model
        .find_navigation_target(&folders, folder, navigation("Owner"))
        .is_unknown());

    let parent = model.find_navigation_target(&folders, folder, navigation("Parent"));
    let NavigationTarget::Bad(bad) = parent else {
        panic!("Expected a dangling binding");
    };
    assert_eq!(bad.errors()[0].code, EdmErrorCode::BadUnresolvedEntitySet);
}

#[test]
fn test_singleton_is_a_navigation_source() {
    let model = folders();
    let root = model.find_navigation_source("Files.Drive", "Root").unwrap();
    assert!(root.bindings().is_empty());
    assert_eq!(model.navigation_source_type(&root).full_name(), "Files.Folder");
}

#[test]
fn test_partners() {
    let model = parse(&[SALES]);
    let order = model.find_type("Sales.Order").unwrap().element().unwrap();
    let customer_nav = model
        .find_property(order, "Customer")
        .and_then(|p| p.as_navigation())
        .unwrap();
    let partner = model.partner(customer_nav).unwrap();
    assert_eq!(&*partner.name, "Orders");
    assert_eq!(model.partner(partner).map(|p| &*p.name), Some("Customer"));
    assert_eq!(model.navigation_target_type(customer_nav).full_name(), "Sales.Customer");
}
