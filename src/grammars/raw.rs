use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::Deserialize;

use crate::error::OcraResult;

/// An attribute value as found in the source.
///
/// The source format is written by hand so both `"bold": true` and `"bold": "true"` are
/// accepted.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Text(String),
}

impl AttributeValue {
    pub fn as_str(&self) -> &str {
        match self {
            AttributeValue::Bool(true) => "true",
            AttributeValue::Bool(false) => "false",
            AttributeValue::Text(s) => s,
        }
    }

    /// Only `true` and `"true"` count as set
    pub fn is_true(&self) -> bool {
        self.as_str() == "true"
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

/// One node of the grammar source: a name, some attributes and ordered children.
///
/// # Examples
/// ```json
/// {
///   "element": "group",
///   "attributes": { "name": "comment", "partialMatch": true, "italic": true },
///   "children": [
///     { "element": "pattern", "attributes": { "value": "/*" } },
///     { "element": "pattern", "attributes": { "type": "final", "value": "*/" } }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawElement {
    /// Element name, e.g. `group`, `pattern`, `highlightOrder`
    pub element: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeValue>,
    #[serde(default)]
    pub children: Vec<RawElement>,
}

impl RawElement {
    pub fn new(element: &str) -> Self {
        Self {
            element: element.to_string(),
            ..Default::default()
        }
    }

    /// Builder: add an attribute
    pub fn attr(mut self, name: &str, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }

    /// Builder: append a child element
    pub fn child(mut self, child: RawElement) -> Self {
        self.children.push(child);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(AttributeValue::as_str)
    }

    pub fn flag(&self, name: &str) -> bool {
        self.attributes.get(name).is_some_and(AttributeValue::is_true)
    }
}

/// A grammar source document before validation. The root element's name is not checked,
/// only its children are.
///
/// # Examples
/// ```json
/// {
///   "element": "highlight",
///   "children": [
///     { "element": "wordSeparators", "attributes": { "value": "+-*/=" } },
///     { "element": "wordDelimiters", "attributes": { "value": "'" } },
///     { "element": "ignoredChars", "attributes": { "value": " \t" } },
///     { "element": "highlightOrder", "children": [
///         { "element": "group", "attributes": { "name": "keyword" } }
///     ] },
///     { "element": "group", "attributes": { "name": "keyword", "bold": true }, "children": [
///         { "element": "pattern", "attributes": { "value": "select" } }
///     ] }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct RawGrammar {
    pub root: RawElement,
}

impl RawGrammar {
    pub fn new(root: RawElement) -> Self {
        Self { root }
    }

    pub fn from_json_str(json: &str) -> OcraResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> OcraResult<Self> {
        let file = File::open(&path)?;
        let raw_grammar = serde_json::from_reader(BufReader::new(file))?;
        Ok(raw_grammar)
    }
}
