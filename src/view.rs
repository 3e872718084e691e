//! A minimal HTML node tree the components render into.
//!
//! Each frame is built from scratch; the tree is only ever printed (as HTML,
//! or as Markdown through `htmd`) and inspected by tests.

use html_escape::{encode_double_quoted_attribute, encode_text};

const VOID_TAGS: [&str; 3] = ["br", "img", "input"];

/// Attribute marking the root element of a component.
pub const COMPONENT_ATTR: &str = "data-component";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Node {
    #[default]
    Empty,
    Text(String),
    Element(Element),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: &'static str,
    attrs: Vec<(&'static str, Option<String>)>,
    children: Vec<Node>,
}

pub fn el(tag: &'static str) -> Element {
    Element {
        tag,
        attrs: vec![],
        children: vec![],
    }
}

impl Element {
    pub fn attr(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.attrs.push((name, Some(value.into())));
        self
    }

    pub fn class(self, class: &str) -> Self {
        self.attr("class", class)
    }

    pub fn component(self, name: &str) -> Self {
        self.attr(COMPONENT_ATTR, name)
    }

    /// Boolean attribute such as `disabled`, present only when `on`.
    pub fn flag(mut self, name: &'static str, on: bool) -> Self {
        if on {
            self.attrs.push((name, None));
        }
        self
    }

    pub fn child(mut self, node: impl Into<Node>) -> Self {
        let node = node.into();
        if node != Node::Empty {
            self.children.push(node);
        }
        self
    }

    pub fn children(self, nodes: impl IntoIterator<Item = Node>) -> Self {
        nodes.into_iter().fold(self, |element, node| element.child(node))
    }

    fn write_html(&self, out: &mut String) {
        out.push('<');
        out.push_str(self.tag);
        for (name, value) in &self.attrs {
            out.push(' ');
            out.push_str(name);
            if let Some(value) = value {
                out.push_str("=\"");
                out.push_str(&encode_double_quoted_attribute(value));
                out.push('"');
            }
        }
        out.push('>');

        if VOID_TAGS.contains(&self.tag) {
            return;
        }
        for child in &self.children {
            child.write_html(out);
        }
        out.push_str("</");
        out.push_str(self.tag);
        out.push('>');
    }
}

impl Node {
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    pub fn to_markdown(&self) -> Result<String, std::io::Error> {
        htmd::convert(&self.to_html())
    }

    fn write_html(&self, out: &mut String) {
        match self {
            Node::Empty => {}
            Node::Text(text) => out.push_str(&encode_text(text)),
            Node::Element(element) => element.write_html(out),
        }
    }
}

/// Queries over a rendered tree.
#[cfg(test)]
impl Element {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_deref().unwrap_or(""))
    }

    pub fn has(&self, name: &str) -> bool {
        self.attrs.iter().any(|(key, _)| *key == name)
    }

    pub fn text(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            child.collect_text(&mut out);
        }
        out
    }

    /// Descendant elements (including self) matching `pred`, in document order.
    pub fn find<'a>(&'a self, pred: &dyn Fn(&Element) -> bool, found: &mut Vec<&'a Element>) {
        if pred(self) {
            found.push(self);
        }
        for child in &self.children {
            if let Node::Element(element) = child {
                element.find(pred, found);
            }
        }
    }
}

#[cfg(test)]
impl Node {
    pub fn is_empty(&self) -> bool {
        *self == Node::Empty
    }

    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    pub fn find_all(&self, pred: &dyn Fn(&Element) -> bool) -> Vec<&Element> {
        let mut found = vec![];
        if let Node::Element(element) = self {
            element.find(pred, &mut found);
        }
        found
    }

    /// Roots of every rendered `name` component.
    pub fn components(&self, name: &str) -> Vec<&Element> {
        self.find_all(&|element| element.get(COMPONENT_ATTR) == Some(name))
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Node::Empty => {}
            Node::Text(text) => out.push_str(text),
            Node::Element(element) => {
                for child in &element.children {
                    child.collect_text(out);
                }
            }
        }
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

impl From<&str> for Node {
    fn from(text: &str) -> Self {
        Node::Text(text.to_string())
    }
}

impl From<String> for Node {
    fn from(text: String) -> Self {
        Node::Text(text)
    }
}

impl<T: Into<Node>> From<Option<T>> for Node {
    fn from(node: Option<T>) -> Self {
        node.map(Into::into).unwrap_or_default()
    }
}
