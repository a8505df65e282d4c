// src/model/element.rs

//! Abstract document tree handed to serializers
//!
//! Each resource declares a [`Schema`]: its tag plus the closed set of
//! attribute and field names it may carry. Elements can only be built
//! through an [`ElementBuilder`] bound to a schema, and any name outside
//! the declared set fails the build with `Error::UnknownField`. An element
//! is therefore either complete and valid or never produced at all.

use crate::error::{Error, Result};
use serde::Serialize;

/// Declared shape of one resource element
#[derive(Debug, PartialEq, Eq)]
pub struct Schema {
    pub tag: &'static str,
    pub attributes: &'static [&'static str],
    pub fields: &'static [&'static str],
}

impl Schema {
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains(&name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains(&name)
    }
}

/// A field value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Text(String),
    Unsigned(u64),
    Float(f64),
    Element(Element),
}

/// One node of the document tree
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Element {
    pub tag: &'static str,
    pub attributes: Vec<(&'static str, String)>,
    pub children: Vec<(&'static str, Value)>,
}

impl Element {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    /// First child value with the given field name
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.children.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    /// All child values with the given field name, in order
    pub fn fields<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
        self.children
            .iter()
            .filter(move |(n, _)| *n == name)
            .map(|(_, v)| v)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.field(name) {
            Some(Value::Text(s)) => Some(s),
            _ => None,
        }
    }
}

/// Builds an element against a schema
#[derive(Debug)]
pub struct ElementBuilder {
    schema: &'static Schema,
    element: Element,
}

impl ElementBuilder {
    pub fn new(schema: &'static Schema) -> Self {
        Self {
            schema,
            element: Element {
                tag: schema.tag,
                attributes: Vec::new(),
                children: Vec::new(),
            },
        }
    }

    fn unknown(&self, name: &'static str) -> Error {
        Error::UnknownField {
            resource: self.schema.tag,
            field: name.to_string(),
        }
    }

    pub fn attr(mut self, name: &'static str, value: impl Into<String>) -> Result<Self> {
        if !self.schema.has_attribute(name) {
            return Err(self.unknown(name));
        }
        self.element.attributes.push((name, value.into()));
        Ok(self)
    }

    /// Set an attribute only when a value is present
    pub fn attr_opt(self, name: &'static str, value: Option<&str>) -> Result<Self> {
        match value {
            Some(v) => self.attr(name, v),
            None if self.schema.has_attribute(name) => Ok(self),
            None => Err(self.unknown(name)),
        }
    }

    pub fn value(mut self, name: &'static str, value: Value) -> Result<Self> {
        if !self.schema.has_field(name) {
            return Err(self.unknown(name));
        }
        self.element.children.push((name, value));
        Ok(self)
    }

    pub fn text(self, name: &'static str, value: impl Into<String>) -> Result<Self> {
        self.value(name, Value::Text(value.into()))
    }

    /// Add a text field only when a value is present; absent stays absent
    pub fn text_opt(self, name: &'static str, value: Option<&str>) -> Result<Self> {
        match value {
            Some(v) => self.text(name, v),
            None if self.schema.has_field(name) => Ok(self),
            None => Err(self.unknown(name)),
        }
    }

    pub fn unsigned(self, name: &'static str, value: u64) -> Result<Self> {
        self.value(name, Value::Unsigned(value))
    }

    pub fn child(self, name: &'static str, element: Element) -> Result<Self> {
        self.value(name, Value::Element(element))
    }

    /// Add one child per element, all under the same field name
    pub fn children<I>(mut self, name: &'static str, elements: I) -> Result<Self>
    where
        I: IntoIterator<Item = Element>,
    {
        if !self.schema.has_field(name) {
            return Err(self.unknown(name));
        }
        self.element
            .children
            .extend(elements.into_iter().map(|e| (name, Value::Element(e))));
        Ok(self)
    }

    pub fn build(self) -> Element {
        self.element
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static SAMPLE: Schema = Schema {
        tag: "sample",
        attributes: &["id"],
        fields: &["name", "size"],
    };

    #[test]
    fn test_build_declared_fields() {
        let element = ElementBuilder::new(&SAMPLE)
            .attr("id", "http://x/1")
            .unwrap()
            .text("name", "foo")
            .unwrap()
            .unsigned("size", 0)
            .unwrap()
            .build();

        assert_eq!(element.tag, "sample");
        assert_eq!(element.attribute("id"), Some("http://x/1"));
        assert_eq!(element.text("name"), Some("foo"));
        assert_eq!(element.field("size"), Some(&Value::Unsigned(0)));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = ElementBuilder::new(&SAMPLE)
            .text("colour", "blue")
            .unwrap_err();
        match err {
            Error::UnknownField { resource, field } => {
                assert_eq!(resource, "sample");
                assert_eq!(field, "colour");
            }
            other => panic!("unexpected error: {other}"),
        }

        assert!(ElementBuilder::new(&SAMPLE).attr("href", "x").is_err());
        assert!(ElementBuilder::new(&SAMPLE).text_opt("colour", None).is_err());
    }

    #[test]
    fn test_absent_optional_leaves_no_child() {
        let element = ElementBuilder::new(&SAMPLE)
            .text_opt("name", None)
            .unwrap()
            .build();
        assert!(element.children.is_empty());
    }
}
