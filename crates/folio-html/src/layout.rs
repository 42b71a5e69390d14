//! Layout-ready element tree produced by tag workers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayoutKind {
    Document,
    Div,
    Paragraph,
    Heading { level: u8 },
    Text { text: String },
    Span,
    Link { href: String },
    List { ordered: bool },
    ListItem,
    Image {
        source: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alt: Option<String>,
    },
    LineBreak,
    Table,
    Row,
    Cell,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutElement {
    #[serde(flatten)]
    pub kind: LayoutKind,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<LayoutElement>,
}

impl LayoutElement {
    pub fn new(kind: LayoutKind) -> Self {
        Self {
            kind,
            properties: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(LayoutKind::Text { text: text.into() })
    }

    pub fn push_child(&mut self, child: LayoutElement) {
        self.children.push(child);
    }

    pub fn set_property(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(name.into(), value.into());
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    /// Flows inside a line rather than starting a block.
    pub fn is_inline(&self) -> bool {
        matches!(
            self.kind,
            LayoutKind::Text { .. }
                | LayoutKind::Span
                | LayoutKind::Link { .. }
                | LayoutKind::Image { .. }
                | LayoutKind::LineBreak
        )
    }

    /// Concatenated text of this element and its descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match &self.kind {
            LayoutKind::Text { text } => out.push_str(text),
            LayoutKind::LineBreak => out.push('\n'),
            _ => {}
        }
        for child in &self.children {
            child.collect_text(out);
        }
    }
}
