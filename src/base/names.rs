//! Qualified-name helpers.
//!
//! A full name is `namespace.name` where the namespace itself may contain
//! dots. Splitting always happens on the LAST dot.

/// Namespace of the built-in primitive types.
pub const EDM_NAMESPACE: &str = "Edm";

const MAX_IDENTIFIER_LEN: usize = 128;

/// Split a full name into `(namespace, name)`.
///
/// Returns `None` when the name has no namespace part.
pub fn split_qualified(full_name: &str) -> Option<(&str, &str)> {
    let dot = full_name.rfind('.')?;
    let (namespace, name) = (&full_name[..dot], &full_name[dot + 1..]);
    if namespace.is_empty() || name.is_empty() {
        return None;
    }
    Some((namespace, name))
}

/// Join a namespace and a simple name.
pub fn qualify(namespace: &str, name: &str) -> String {
    let mut full = String::with_capacity(namespace.len() + name.len() + 1);
    full.push_str(namespace);
    full.push('.');
    full.push_str(name);
    full
}

/// Check whether `name` is a CSDL SimpleIdentifier.
pub fn is_simple_identifier(name: &str) -> bool {
    if name.is_empty() || name.chars().count() > MAX_IDENTIFIER_LEN {
        return false;
    }
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first == '_' || unicode_ident::is_xid_start(first))
        && chars.all(unicode_ident::is_xid_continue)
}

/// Check whether `namespace` is a dot-separated list of simple identifiers.
pub fn is_namespace(namespace: &str) -> bool {
    !namespace.is_empty() && namespace.split('.').all(is_simple_identifier)
}

/// Split `Collection(NS.T)` into `("Collection", Some("NS.T"))`.
///
/// Names without parentheses come back unchanged with `None`. Returns `None`
/// for an unbalanced argument list.
pub fn split_type_name_arguments(text: &str) -> Option<(&str, Option<&str>)> {
    match text.find('(') {
        None => {
            if text.contains(')') {
                None
            } else {
                Some((text, None))
            }
        }
        Some(open) => {
            if !text.ends_with(')') {
                return None;
            }
            let head = &text[..open];
            let argument = &text[open + 1..text.len() - 1];
            Some((head, Some(argument)))
        }
    }
}
