//! Namespace-aware XML tree built from one CSDL document.
//!
//! quick-xml only reports raw prefixed names, so namespace declarations are
//! tracked here with a scope stack and resolved for every element and
//! prefixed attribute. Each element remembers its source location.

use std::sync::Arc;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use rustc_hash::FxHashMap;

use crate::base::{DocumentId, LineIndex, SourceLocation};
use crate::model::{EdmError, EdmErrorCode};

const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// An attribute with its resolved namespace (`None` when unprefixed).
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct XmlAttribute {
    pub namespace: Option<Arc<str>>,
    pub local_name: String,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct XmlElement {
    pub namespace: Option<Arc<str>>,
    pub local_name: String,
    pub attributes: Vec<XmlAttribute>,
    pub children: Vec<XmlElement>,
    /// Concatenated text and CDATA content.
    pub text: String,
    pub location: SourceLocation,
}

impl XmlElement {
    pub fn is(&self, namespace: &str, local_name: &str) -> bool {
        self.local_name == local_name && self.namespace.as_deref() == Some(namespace)
    }

    pub fn in_namespace(&self, namespace: &str) -> bool {
        self.namespace.as_deref() == Some(namespace)
    }

    /// Value of an unprefixed attribute.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.namespace.is_none() && a.local_name == name)
            .map(|a| a.value.as_str())
    }

    /// Unprefixed attributes, in document order.
    pub fn local_attributes(&self) -> impl Iterator<Item = &XmlAttribute> {
        self.attributes.iter().filter(|a| a.namespace.is_none())
    }
}

/// Namespace declarations in scope, innermost last.
#[derive(Default)]
struct NamespaceScopes {
    scopes: Vec<FxHashMap<String, Arc<str>>>,
}

impl NamespaceScopes {
    fn resolve(&self, prefix: &str) -> Option<Arc<str>> {
        if prefix == "xml" {
            return Some(Arc::from(XML_NAMESPACE));
        }
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(prefix))
            .cloned()
            .filter(|uri| !uri.is_empty())
    }
}

fn split_prefix(raw: &str) -> (&str, &str) {
    match raw.split_once(':') {
        Some((prefix, local)) => (prefix, local),
        None => ("", raw),
    }
}

struct TreeBuilder<'t> {
    lines: LineIndex,
    reader: Reader<&'t [u8]>,
    scopes: NamespaceScopes,
    open: Vec<XmlElement>,
    root: Option<XmlElement>,
    errors: Vec<EdmError>,
}

impl<'t> TreeBuilder<'t> {
    fn new(document: DocumentId, text: &'t str) -> Self {
        let reader = Reader::from_str(text);
        Self {
            lines: LineIndex::new(document, text),
            reader,
            scopes: NamespaceScopes::default(),
            open: Vec::new(),
            root: None,
            errors: Vec::new(),
        }
    }

    fn error(&mut self, code: EdmErrorCode, message: impl Into<Arc<str>>, offset: usize) {
        let location = self.lines.location(offset);
        self.errors.push(EdmError::at(code, message, location));
    }

    fn run(mut self) -> Result<XmlElement, Vec<EdmError>> {
        loop {
            match self.reader.read_event() {
                Ok(Event::Start(e)) => {
                    let end = self.reader.buffer_position() as usize;
                    let start = end.saturating_sub(e.len() + 2);
                    let element = self.open_element(&e, start);
                    self.open.push(element);
                }
                Ok(Event::Empty(e)) => {
                    let end = self.reader.buffer_position() as usize;
                    let start = end.saturating_sub(e.len() + 3);
                    let element = self.open_element(&e, start);
                    self.close_element(element);
                }
                Ok(Event::End(_)) => {
                    if let Some(element) = self.open.pop() {
                        self.close_element(element);
                    }
                }
                Ok(Event::Text(e)) => {
                    let offset = self.reader.buffer_position() as usize;
                    match e.unescape() {
                        Ok(text) => self.push_text(&text),
                        Err(err) => self.error(EdmErrorCode::XmlError, err.to_string(), offset),
                    }
                }
                Ok(Event::CData(e)) => {
                    let text = String::from_utf8_lossy(&e).into_owned();
                    self.push_text(&text);
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(err) => {
                    let offset = self.reader.error_position() as usize;
                    self.error(EdmErrorCode::XmlError, err.to_string(), offset);
                    return Err(self.errors);
                }
            }
        }

        if !self.open.is_empty() {
            let offset = self.reader.buffer_position() as usize;
            self.error(
                EdmErrorCode::XmlError,
                "Unexpected end of document inside an open element",
                offset,
            );
        }
        match self.root {
            Some(root) if self.errors.is_empty() => Ok(root),
            Some(_) => Err(self.errors),
            None => {
                if self.errors.is_empty() {
                    self.errors.push(EdmError::at(
                        EdmErrorCode::EmptyFile,
                        "The document contains no root element",
                        self.lines.location(0),
                    ));
                }
                Err(self.errors)
            }
        }
    }

    fn push_text(&mut self, text: &str) {
        if let Some(current) = self.open.last_mut() {
            current.text.push_str(text);
        }
    }

    fn open_element(&mut self, start: &BytesStart<'_>, offset: usize) -> XmlElement {
        let location = self.lines.location(offset);
        let mut declarations: FxHashMap<String, Arc<str>> = FxHashMap::default();
        let mut raw_attributes: Vec<(String, String)> = Vec::new();

        let mut attributes = start.attributes();
        attributes.with_checks(false);
        for attribute in attributes {
            let attribute = match attribute {
                Ok(attribute) => attribute,
                Err(err) => {
                    self.error(EdmErrorCode::XmlError, err.to_string(), offset);
                    continue;
                }
            };
            let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
            let value = match attribute.unescape_value() {
                Ok(value) => value.into_owned(),
                Err(err) => {
                    self.error(EdmErrorCode::XmlError, err.to_string(), offset);
                    continue;
                }
            };
            if raw_attributes.iter().any(|(k, _)| *k == key) {
                self.error(
                    EdmErrorCode::DuplicateXmlAttribute,
                    format!("The attribute '{key}' is specified more than once"),
                    offset,
                );
                continue;
            }
            if key == "xmlns" {
                declarations.insert(String::new(), Arc::from(value.as_str()));
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                declarations.insert(prefix.to_string(), Arc::from(value.as_str()));
            }
            raw_attributes.push((key, value));
        }
        self.scopes.scopes.push(declarations);

        let raw_name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let (prefix, local) = split_prefix(&raw_name);
        let namespace = self.scopes.resolve(prefix);
        if namespace.is_none() && !prefix.is_empty() {
            self.error(
                EdmErrorCode::XmlError,
                format!("The namespace prefix '{prefix}' is not declared"),
                offset,
            );
        }

        let attributes = raw_attributes
            .into_iter()
            .filter(|(key, _)| key != "xmlns" && !key.starts_with("xmlns:"))
            .map(|(key, value)| {
                let (prefix, local) = split_prefix(&key);
                let namespace = if prefix.is_empty() {
                    None
                } else {
                    // Undeclared prefixes still mark the attribute as foreign.
                    Some(
                        self.scopes
                            .resolve(prefix)
                            .unwrap_or_else(|| Arc::from(prefix)),
                    )
                };
                XmlAttribute {
                    namespace,
                    local_name: local.to_string(),
                    value,
                }
            })
            .collect();

        XmlElement {
            namespace,
            local_name: local.to_string(),
            attributes,
            children: Vec::new(),
            text: String::new(),
            location,
        }
    }

    fn close_element(&mut self, mut element: XmlElement) {
        self.scopes.scopes.pop();
        // Indentation between child elements is not content; leaf text is kept verbatim.
        if !element.children.is_empty() && element.text.trim().is_empty() {
            element.text.clear();
        }
        match self.open.last_mut() {
            Some(parent) => parent.children.push(element),
            None if self.root.is_none() => self.root = Some(element),
            None => self.errors.push(EdmError::at(
                EdmErrorCode::XmlError,
                "The document has more than one root element",
                element.location,
            )),
        }
    }
}

/// Parse one document into an element tree.
pub(crate) fn parse_document(
    document: DocumentId,
    text: &str,
) -> Result<XmlElement, Vec<EdmError>> {
    TreeBuilder::new(document, text).run()
}
