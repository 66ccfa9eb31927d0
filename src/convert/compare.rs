//! Element-for-element model comparison.

use std::fmt;

use indexmap::IndexMap;

use crate::model::{
    ContainerElement, Definition, Expression, Model, SchemaElement, VocabularyAnnotation,
};

/// One way two models differ.
#[derive(Clone, Debug, PartialEq)]
pub enum ModelDifference {
    /// Declared in the expected model only.
    MissingElement(String),
    /// Declared in the actual model only.
    UnexpectedElement(String),
    /// Declared in both, with different contents.
    ChangedElement {
        key: String,
        expected: Box<SchemaElement>,
        actual: Box<SchemaElement>,
    },
    MissingAnnotation(String),
    UnexpectedAnnotation(String),
    /// A namespace alias that differs or is missing on one side.
    AliasMismatch {
        namespace: String,
        expected: Option<String>,
        actual: Option<String>,
    },
}

impl fmt::Display for ModelDifference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingElement(key) => write!(f, "missing element {key}"),
            Self::UnexpectedElement(key) => write!(f, "unexpected element {key}"),
            Self::ChangedElement { key, .. } => write!(f, "element {key} differs"),
            Self::MissingAnnotation(key) => write!(f, "missing annotation {key}"),
            Self::UnexpectedAnnotation(key) => write!(f, "unexpected annotation {key}"),
            Self::AliasMismatch {
                namespace,
                expected,
                actual,
            } => write!(
                f,
                "namespace {namespace} alias {expected:?} became {actual:?}"
            ),
        }
    }
}

/// Compare two models, ignoring source locations, element aliases and the
/// order of container children. Elements and annotations are compared as
/// multisets: duplicates must occur equally often on both sides.
pub fn compare_models(expected: &dyn Model, actual: &dyn Model) -> Vec<ModelDifference> {
    let mut differences = Vec::new();
    compare_elements(expected, actual, &mut differences);
    compare_annotations(expected, actual, &mut differences);
    compare_aliases(expected, actual, &mut differences);
    differences
}

/// `EntityType NS.T`, or `Function NS.F(Edm.Int32)` for overloads.
fn element_key(element: &SchemaElement) -> String {
    format!("{} {}", element.kind().as_str(), element.target_path())
}

fn normalize_element(element: &SchemaElement) -> SchemaElement {
    let mut element = element.without_location();
    element.alias = None;
    if let Definition::EntityContainer(container) = &mut element.definition {
        container
            .elements
            .sort_by(|a, b| container_order(a).cmp(&container_order(b)));
    }
    element
}

fn container_order(item: &ContainerElement) -> (u8, &str) {
    let rank = match item {
        ContainerElement::EntitySet(_) => 0,
        ContainerElement::Singleton(_) => 1,
        ContainerElement::OperationImport(_) => 2,
    };
    (rank, item.name().as_ref())
}

fn group<'a, T, K>(
    items: impl Iterator<Item = &'a T>,
    key: K,
    normalize: impl Fn(&T) -> T,
) -> IndexMap<String, Vec<T>>
where
    T: 'a,
    K: Fn(&T) -> String,
{
    let mut groups: IndexMap<String, Vec<T>> = IndexMap::new();
    for item in items {
        groups.entry(key(item)).or_default().push(normalize(item));
    }
    groups
}

/// Remove the items `expected` and `actual` have in common.
fn cancel_common<T, F>(expected: &mut Vec<T>, actual: &mut Vec<T>, equal: F)
where
    F: Fn(&T, &T) -> bool,
{
    let mut index = 0;
    while index < expected.len() {
        match actual.iter().position(|a| equal(&expected[index], a)) {
            Some(found) => {
                expected.remove(index);
                actual.remove(found);
            }
            None => index += 1,
        }
    }
}

fn compare_elements(expected: &dyn Model, actual: &dyn Model, out: &mut Vec<ModelDifference>) {
    let mut expected_groups =
        group(expected.schema_elements().iter(), element_key, normalize_element);
    let mut actual_groups = group(actual.schema_elements().iter(), element_key, normalize_element);

    for (key, expected_items) in expected_groups.iter_mut() {
        let mut empty = Vec::new();
        let actual_items = actual_groups.get_mut(key).unwrap_or(&mut empty);
        cancel_common(expected_items, actual_items, |a, b| a == b);
        let changed = expected_items.len().min(actual_items.len());
        for (e, a) in expected_items.drain(..changed).zip(actual_items.drain(..changed)) {
            out.push(ModelDifference::ChangedElement {
                key: key.clone(),
                expected: Box::new(e),
                actual: Box::new(a),
            });
        }
        for _ in expected_items.iter() {
            out.push(ModelDifference::MissingElement(key.clone()));
        }
    }
    for (key, actual_items) in &actual_groups {
        for _ in actual_items {
            out.push(ModelDifference::UnexpectedElement(key.clone()));
        }
    }
}

fn annotation_key(annotation: &VocabularyAnnotation) -> String {
    match &annotation.qualifier {
        Some(qualifier) => format!("{} @{}#{qualifier}", annotation.target, annotation.term),
        None => format!("{} @{}", annotation.target, annotation.term),
    }
}

/// Floats compare by bits so NaN equals itself.
fn same_value(a: &Expression, b: &Expression) -> bool {
    match (a, b) {
        (Expression::Float(x), Expression::Float(y)) => x.to_bits() == y.to_bits(),
        (Expression::Collection(xs), Expression::Collection(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| same_value(x, y))
        }
        (Expression::Record(x), Expression::Record(y)) => {
            x.type_name == y.type_name
                && x.properties.len() == y.properties.len()
                && x
                    .properties
                    .iter()
                    .zip(&y.properties)
                    .all(|(p, q)| p.property == q.property && same_value(&p.value, &q.value))
        }
        _ => a == b,
    }
}

fn compare_annotations(expected: &dyn Model, actual: &dyn Model, out: &mut Vec<ModelDifference>) {
    let expected_groups =
        group(expected.vocabulary_annotations().iter(), annotation_key, Clone::clone);
    let mut actual_groups =
        group(actual.vocabulary_annotations().iter(), annotation_key, Clone::clone);

    for (key, mut expected_items) in expected_groups {
        let mut empty = Vec::new();
        let actual_items = actual_groups.get_mut(&key).unwrap_or(&mut empty);
        cancel_common(&mut expected_items, actual_items, |a, b| same_value(&a.value, &b.value));
        for _ in &expected_items {
            out.push(ModelDifference::MissingAnnotation(key.clone()));
        }
    }
    for (key, actual_items) in &actual_groups {
        for _ in actual_items {
            out.push(ModelDifference::UnexpectedAnnotation(key.clone()));
        }
    }
}

fn compare_aliases(expected: &dyn Model, actual: &dyn Model, out: &mut Vec<ModelDifference>) {
    let expected_aliases = expected.namespace_aliases();
    let actual_aliases = actual.namespace_aliases();
    let namespaces = expected_aliases.keys().chain(
        actual_aliases
            .keys()
            .filter(|ns| !expected_aliases.contains_key(*ns)),
    );
    for namespace in namespaces {
        let e = expected_aliases.get(namespace);
        let a = actual_aliases.get(namespace);
        if e != a {
            out.push(ModelDifference::AliasMismatch {
                namespace: namespace.to_string(),
                expected: e.map(|alias| alias.to_string()),
                actual: a.map(|alias| alias.to_string()),
            });
        }
    }
}
