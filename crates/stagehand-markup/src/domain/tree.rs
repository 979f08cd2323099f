//! Content tree produced by the parser.
//!
//! The tree keeps inline structure (character references, emphasis, inline
//! pauses) so that renderers and the typewriter can work on it directly.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

/// A single attribute, in source order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    /// Attribute name.
    pub name: String,
    /// Decoded attribute value.
    pub value: String,
}

/// A node of the content tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Node {
    /// A nested element.
    Element(Element),
    /// Decoded character data.
    Text(String),
}

/// An element with its attributes and children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    /// Element name.
    pub name: String,
    /// Attributes in source order.
    pub attributes: Vec<Attribute>,
    /// Child nodes in document order.
    pub children: Vec<Node>,
}

impl Element {
    /// Creates an element with no attributes or children.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style attribute setter.
    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push(Attribute {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Builder-style child setter.
    #[must_use]
    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    /// Returns a clone of this element with its children removed.
    #[must_use]
    pub fn shallow_clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            attributes: self.attributes.clone(),
            children: Vec::new(),
        }
    }

    /// Returns the first attribute named `name`, ignoring blank values.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.trim())
            .filter(|v| !v.is_empty())
    }

    /// Iterates over child elements, skipping text.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|child| match child {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        })
    }

    /// Concatenated text of all descendants.
    #[must_use]
    pub fn text(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }

    /// Serializes this element back to markup.
    #[must_use]
    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        write_element(self, &mut out);
        out
    }

    /// Serializes only the children of this element.
    #[must_use]
    pub fn inner_markup(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            write_node(child, &mut out);
        }
        out
    }
}

fn collect_text(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => collect_text(&el.children, out),
        }
    }
}

fn write_node(node: &Node, out: &mut String) {
    match node {
        Node::Text(text) => out.push_str(&escape(text)),
        Node::Element(el) => write_element(el, out),
    }
}

fn write_element(el: &Element, out: &mut String) {
    out.push('<');
    out.push_str(&el.name);
    for attribute in &el.attributes {
        let _ = write!(out, " {}=\"{}\"", attribute.name, escape(&attribute.value));
    }
    if el.children.is_empty() {
        out.push_str("/>");
        return;
    }
    out.push('>');
    for child in &el.children {
        write_node(child, out);
    }
    let _ = write!(out, "</{}>", el.name);
}

/// Escapes the five markup-significant characters.
#[must_use]
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attr_ignores_blank_values() {
        let el = Element::new("enter")
            .with_attr("id", "kai")
            .with_attr("expression", "  ");

        assert_eq!(el.attr("id"), Some("kai"));
        assert_eq!(el.attr("expression"), None);
        assert_eq!(el.attr("position"), None);
    }

    #[test]
    fn test_text_concatenates_nested_content() {
        let el = Element::new("dialogue")
            .with_child(Node::Text("Hello, ".to_owned()))
            .with_child(Node::Element(
                Element::new("em").with_child(Node::Text("friend".to_owned())),
            ));

        assert_eq!(el.text(), "Hello, friend");
    }

    #[test]
    fn test_to_markup_escapes_text_and_attributes() {
        let el = Element::new("narrate")
            .with_attr("note", "a\"b")
            .with_child(Node::Text("1 < 2 & 3".to_owned()));

        assert_eq!(
            el.to_markup(),
            "<narrate note=\"a&quot;b\">1 &lt; 2 &amp; 3</narrate>"
        );
    }

    #[test]
    fn test_node_serializes_with_type_tag() {
        let json = serde_json::to_value(Node::Text("hi".to_owned())).unwrap();

        assert_eq!(json, serde_json::json!({ "type": "text", "value": "hi" }));
    }
}
