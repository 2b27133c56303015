//! Declarative element tree shared by charts and widgets.

use std::fmt::Write as _;

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: &'static str,
    pub attrs: Vec<(&'static str, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: &'static str) -> Self {
        Self { name, attrs: Vec::new(), children: Vec::new() }
    }

    pub fn attr(mut self, key: &'static str, value: impl ToString) -> Self {
        self.attrs.push((key, value.to_string()));
        self
    }

    pub fn num(self, key: &'static str, value: f64) -> Self {
        self.attr(key, fmt_num(value))
    }

    pub fn child(mut self, node: impl Into<Node>) -> Self {
        self.children.push(node.into());
        self
    }

    pub fn children<I, N>(mut self, nodes: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<Node>,
    {
        self.children.extend(nodes.into_iter().map(Into::into));
        self
    }

    pub fn text(self, text: impl Into<String>) -> Self {
        self.child(Node::Text(text.into()))
    }

    pub fn get_attr(&self, key: &str) -> Option<&str> {
        self.attrs.iter().find(|(k, _)| *k == key).map(|(_, v)| v.as_str())
    }

    /// Depth-first search over descendant elements, self included.
    pub fn find_all<'a>(&'a self, pred: &dyn Fn(&Element) -> bool) -> Vec<&'a Element> {
        let mut out = Vec::new();
        self.collect(pred, &mut out);
        out
    }

    fn collect<'a>(&'a self, pred: &dyn Fn(&Element) -> bool, out: &mut Vec<&'a Element>) {
        if pred(self) {
            out.push(self);
        }
        for child in &self.children {
            if let Node::Element(e) = child {
                e.collect(pred, out);
            }
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.get_attr("class").map_or(false, |c| c.split_whitespace().any(|c| c == class))
    }

    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        write_element(self, &mut out);
        out
    }

    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            match child {
                Node::Text(t) => out.push_str(t),
                Node::Element(e) => out.push_str(&e.text_content()),
            }
        }
        out
    }
}

impl From<Element> for Node {
    fn from(e: Element) -> Self {
        Node::Element(e)
    }
}

impl Node {
    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        write_node(self, &mut out);
        out
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        }
    }
}

fn write_node(node: &Node, out: &mut String) {
    match node {
        Node::Text(t) => out.push_str(&escape(t)),
        Node::Element(e) => write_element(e, out),
    }
}

/// SVG shapes may self-close; HTML containers must not.
const SELF_CLOSING: &[&str] = &["circle", "ellipse", "line", "path", "polygon", "polyline", "rect", "stop"];

fn write_element(e: &Element, out: &mut String) {
    let _ = write!(out, "<{}", e.name);
    for (k, v) in &e.attrs {
        let _ = write!(out, " {}=\"{}\"", k, escape(v));
    }
    if e.children.is_empty() && SELF_CLOSING.contains(&e.name) {
        out.push_str("/>");
        return;
    }
    out.push('>');
    for child in &e.children {
        write_node(child, out);
    }
    let _ = write!(out, "</{}>", e.name);
}

pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Two decimals at most, no trailing zeros, no negative zero.
pub fn fmt_num(v: f64) -> String {
    if !v.is_finite() {
        return "0".to_string();
    }
    let rounded = (v * 100.0).round() / 100.0;
    let s = format!("{:.2}", rounded);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_nested_elements_with_escaping() {
        let node: Node = Element::new("g")
            .attr("class", "a&b")
            .child(Element::new("text").text("1 < 2"))
            .child(Element::new("circle").num("r", 4.0))
            .into();
        assert_eq!(
            node.to_markup(),
            r#"<g class="a&amp;b"><text>1 &lt; 2</text><circle r="4"/></g>"#
        );
        assert_eq!(Element::new("div").to_markup(), "<div></div>");
    }

    #[test]
    fn number_formatting() {
        assert_eq!(fmt_num(350.0), "350");
        assert_eq!(fmt_num(12.5), "12.5");
        assert_eq!(fmt_num(1.0 / 3.0), "0.33");
        assert_eq!(fmt_num(-0.001), "0");
        assert_eq!(fmt_num(f64::NAN), "0");
    }

    #[test]
    fn finds_descendants_by_class() {
        let root = Element::new("svg")
            .child(Element::new("circle").attr("class", "xp-point hit"))
            .child(Element::new("g").child(Element::new("circle").attr("class", "xp-point")));
        assert_eq!(root.find_all(&|e| e.has_class("xp-point")).len(), 2);
        assert_eq!(root.find_all(&|e| e.has_class("hit")).len(), 1);
    }
}
