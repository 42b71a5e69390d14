//! Document node tree.
//!
//! The tree is an `ego_tree` arena built once (from HTML via `scraper`, or
//! programmatically through [`NodeBuilder`]) and only read afterwards.

use std::collections::VecDeque;
use std::ops::Deref;

use ego_tree::{NodeId, NodeMut, NodeRef, Tree};
use scraper::Html;

use crate::select::{self, SelectorError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomNode {
    Document,
    Element(ElementData),
    Text(String),
}

impl DomNode {
    pub fn as_element(&self) -> Option<&ElementData> {
        match self {
            DomNode::Element(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            DomNode::Text(text) => Some(text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    name: String,
    attrs: Vec<(String, String)>,
}

impl ElementData {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_ascii_lowercase(),
            attrs: Vec::new(),
        }
    }

    /// Lower-case tag name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn attrs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn id(&self) -> Option<&str> {
        self.attr("id")
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or_default().split_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }

    fn set_attr(&mut self, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        match self.attrs.iter_mut().find(|(key, _)| *key == name) {
            Some(slot) => slot.1 = value.to_string(),
            None => self.attrs.push((name, value.to_string())),
        }
    }
}

/// Element view over a tree node, mirroring `scraper::ElementRef`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementRef<'a> {
    node: NodeRef<'a, DomNode>,
    data: &'a ElementData,
}

impl<'a> ElementRef<'a> {
    pub fn wrap(node: NodeRef<'a, DomNode>) -> Option<Self> {
        node.value().as_element().map(|data| Self { node, data })
    }

    pub fn node(&self) -> NodeRef<'a, DomNode> {
        self.node
    }

    pub fn id(&self) -> NodeId {
        self.node.id()
    }

    pub fn value(&self) -> &'a ElementData {
        self.data
    }

    pub fn name(&self) -> &'a str {
        self.value().name()
    }

    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.value().attr(name)
    }

    pub fn parent_element(&self) -> Option<ElementRef<'a>> {
        self.node.parent().and_then(ElementRef::wrap)
    }

    pub fn prev_sibling_element(&self) -> Option<ElementRef<'a>> {
        self.node.prev_siblings().find_map(ElementRef::wrap)
    }

    pub fn next_sibling_element(&self) -> Option<ElementRef<'a>> {
        self.node.next_siblings().find_map(ElementRef::wrap)
    }

    pub fn child_elements(&self) -> impl Iterator<Item = ElementRef<'a>> + 'a {
        self.node.children().filter_map(ElementRef::wrap)
    }

    /// Topmost element ancestor (the element itself when detached).
    pub fn root_element(&self) -> ElementRef<'a> {
        let mut current = *self;
        while let Some(parent) = current.parent_element() {
            current = parent;
        }
        current
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text(&self) -> String {
        self.node
            .descendants()
            .filter_map(|node| node.value().as_text())
            .collect()
    }

    /// `<link rel="stylesheet">`; these carry no content of their own.
    pub fn is_stylesheet_link(&self) -> bool {
        self.name() == "link"
            && self
                .attr("rel")
                .map(|rel| {
                    rel.split_whitespace()
                        .any(|token| token.eq_ignore_ascii_case("stylesheet"))
                })
                .unwrap_or(false)
    }
}

impl<'a> Deref for ElementRef<'a> {
    type Target = NodeRef<'a, DomNode>;

    fn deref(&self) -> &Self::Target {
        &self.node
    }
}

#[derive(Debug, Clone)]
pub struct Document {
    tree: Tree<DomNode>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// An empty document holding only the document node.
    pub fn new() -> Self {
        Self {
            tree: Tree::new(DomNode::Document),
        }
    }

    /// Parse an HTML string. Comments, doctypes and processing instructions
    /// are dropped.
    pub fn parse_html(html: &str) -> Self {
        let parsed = Html::parse_document(html);
        let mut document = Self::new();
        for child in parsed.tree.root().children() {
            copy_scraper_node(child, &mut document.tree.root_mut());
        }
        document
    }

    /// Build a document whose single top-level node is `root`.
    pub fn from_builder(root: NodeBuilder) -> Self {
        let mut document = Self::new();
        root.append_to(&mut document.tree.root_mut());
        document
    }

    pub fn root(&self) -> NodeRef<'_, DomNode> {
        self.tree.root()
    }

    /// First element child of the document node.
    pub fn root_element(&self) -> Option<ElementRef<'_>> {
        self.tree.root().children().find_map(ElementRef::wrap)
    }

    pub fn get(&self, id: NodeId) -> Option<NodeRef<'_, DomNode>> {
        self.tree.get(id)
    }

    pub fn element(&self, id: NodeId) -> Option<ElementRef<'_>> {
        self.tree.get(id).and_then(ElementRef::wrap)
    }

    /// Breadth-first search for the first element with the given tag name.
    pub fn find_element(&self, tag: &str) -> Option<ElementRef<'_>> {
        let mut queue = VecDeque::new();
        queue.push_back(self.tree.root());
        while let Some(node) = queue.pop_front() {
            if let Some(element) = ElementRef::wrap(node) {
                if element.name().eq_ignore_ascii_case(tag) {
                    return Some(element);
                }
            }
            queue.extend(node.children().filter(|c| c.value().as_element().is_some()));
        }
        None
    }

    /// Every element in document order.
    pub fn elements(&self) -> impl Iterator<Item = ElementRef<'_>> {
        self.tree.root().descendants().filter_map(ElementRef::wrap)
    }

    /// Elements matching a selector query such as `div.note > p, #main`.
    pub fn select(&self, query: &str) -> Result<Vec<ElementRef<'_>>, SelectorError> {
        select::select(self, query)
    }
}

fn copy_scraper_node(source: NodeRef<'_, scraper::Node>, parent: &mut NodeMut<'_, DomNode>) {
    match source.value() {
        scraper::Node::Element(element) => {
            let mut data = ElementData::new(element.name());
            for (name, value) in element.attrs() {
                data.set_attr(name, value);
            }
            let mut node = parent.append(DomNode::Element(data));
            for child in source.children() {
                copy_scraper_node(child, &mut node);
            }
        }
        scraper::Node::Text(text) => {
            parent.append(DomNode::Text(text.deref().to_string()));
        }
        scraper::Node::Document | scraper::Node::Fragment => {
            for child in source.children() {
                copy_scraper_node(child, parent);
            }
        }
        _ => {}
    }
}

/// Programmatic tree construction, mostly for tests and embedders that
/// already hold a parsed tree in another form.
#[derive(Debug, Clone)]
pub struct NodeBuilder {
    node: DomNode,
    children: Vec<NodeBuilder>,
}

/// Start an element node.
pub fn element(name: &str) -> NodeBuilder {
    NodeBuilder {
        node: DomNode::Element(ElementData::new(name)),
        children: Vec::new(),
    }
}

/// A text node.
pub fn text(content: &str) -> NodeBuilder {
    NodeBuilder {
        node: DomNode::Text(content.to_string()),
        children: Vec::new(),
    }
}

impl NodeBuilder {
    pub fn attr(mut self, name: &str, value: &str) -> Self {
        if let DomNode::Element(data) = &mut self.node {
            data.set_attr(name, value);
        }
        self
    }

    /// Append a child; ignored for text nodes.
    pub fn child(mut self, child: NodeBuilder) -> Self {
        if matches!(self.node, DomNode::Element(_)) {
            self.children.push(child);
        }
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = NodeBuilder>) -> Self {
        for child in children {
            self = self.child(child);
        }
        self
    }

    fn append_to(self, parent: &mut NodeMut<'_, DomNode>) {
        let mut node = parent.append(self.node);
        for child in self.children {
            child.append_to(&mut node);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_html_keeps_elements_and_text() {
        let doc = Document::parse_html("<html><body><p class='a b'>Hi</p><!-- gone --></body></html>");
        let p = doc.find_element("p").expect("paragraph");
        assert_eq!(p.text(), "Hi");
        assert!(p.value().has_class("b"));
        let body = doc.find_element("body").expect("body");
        assert_eq!(body.child_elements().count(), 1);
        assert!(body.node().children().all(|c| c.value().as_element().is_some()));
    }

    #[test]
    fn find_element_is_breadth_first() {
        let doc = Document::from_builder(
            element("html").children([
                element("body").child(element("div").child(element("section").attr("id", "deep"))),
                element("section").attr("id", "shallow"),
            ]),
        );
        let found = doc.find_element("section").expect("section");
        assert_eq!(found.value().id(), Some("shallow"));
    }

    #[test]
    fn builder_ignores_children_of_text() {
        let doc = Document::from_builder(element("div").child(text("a").child(element("span"))));
        assert!(doc.find_element("span").is_none());
    }

    #[test]
    fn stylesheet_link_detection() {
        let doc = Document::from_builder(element("head").children([
            element("link").attr("rel", "Stylesheet").attr("href", "a.css"),
            element("link").attr("rel", "icon"),
        ]));
        let links: Vec<_> = doc.elements().filter(|e| e.name() == "link").collect();
        assert!(links[0].is_stylesheet_link());
        assert!(!links[1].is_stylesheet_link());
    }

    #[test]
    fn root_element_walks_to_top() {
        let doc = Document::from_builder(element("html").child(element("body").child(element("p"))));
        let p = doc.find_element("p").unwrap();
        assert_eq!(p.root_element().name(), "html");
        assert_eq!(doc.root_element().map(|e| e.name()), Some("html"));
    }
}
