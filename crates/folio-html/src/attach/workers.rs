//! Default tag workers.

use super::{ProcessorContext, TagWorker};
use crate::dom::ElementRef;
use crate::layout::{LayoutElement, LayoutKind};

/// Block container (`html`, `body`, `div`, `li`, `td`, ...). Inline content is
/// gathered into anonymous paragraphs between block children.
pub struct BlockWorker {
    element: LayoutElement,
    pending: Option<LayoutElement>,
}

impl BlockWorker {
    pub fn new(kind: LayoutKind) -> Self {
        Self {
            element: LayoutElement::new(kind),
            pending: None,
        }
    }

    fn pending(&mut self) -> &mut LayoutElement {
        self.pending
            .get_or_insert_with(|| LayoutElement::new(LayoutKind::Paragraph))
    }

    fn flush(&mut self) {
        if let Some(mut paragraph) = self.pending.take() {
            trim_line_edges(&mut paragraph);
            if !paragraph.children.is_empty() {
                self.element.push_child(paragraph);
            }
        }
    }
}

impl TagWorker for BlockWorker {
    fn process_end(&mut self, _element: ElementRef<'_>, _context: &ProcessorContext<'_>) {
        self.flush();
    }

    fn process_tag_child(&mut self, child: Box<dyn TagWorker>, _context: &ProcessorContext<'_>) -> bool {
        let Some(result) = child.into_result() else {
            return true;
        };
        if result.is_inline() {
            self.pending().push_child(result);
        } else {
            self.flush();
            self.element.push_child(result);
        }
        true
    }

    fn process_content(&mut self, content: &str, _context: &ProcessorContext<'_>) -> bool {
        if content.trim().is_empty() {
            // Separates inline siblings; meaningless between blocks.
            if let Some(paragraph) = &mut self.pending {
                append_text(paragraph, " ", false);
            }
            return true;
        }
        append_text(self.pending(), content, false);
        true
    }

    fn result(&self) -> Option<&LayoutElement> {
        Some(&self.element)
    }

    fn result_mut(&mut self) -> Option<&mut LayoutElement> {
        Some(&mut self.element)
    }

    fn into_result(self: Box<Self>) -> Option<LayoutElement> {
        Some(self.element)
    }
}

/// Paragraphs, headings and `pre`. Block children stay in document order
/// next to the inline content.
pub struct ParagraphWorker {
    element: LayoutElement,
    preformatted: bool,
}

impl ParagraphWorker {
    pub fn new() -> Self {
        Self {
            element: LayoutElement::new(LayoutKind::Paragraph),
            preformatted: false,
        }
    }

    pub fn heading(level: u8) -> Self {
        Self {
            element: LayoutElement::new(LayoutKind::Heading { level }),
            preformatted: false,
        }
    }

    /// Keeps whitespace and line breaks as written.
    pub fn preformatted() -> Self {
        Self {
            element: LayoutElement::new(LayoutKind::Paragraph),
            preformatted: true,
        }
    }
}

impl Default for ParagraphWorker {
    fn default() -> Self {
        Self::new()
    }
}

impl TagWorker for ParagraphWorker {
    fn process_end(&mut self, _element: ElementRef<'_>, _context: &ProcessorContext<'_>) {
        if !self.preformatted {
            trim_line_edges(&mut self.element);
        }
    }

    fn process_tag_child(&mut self, child: Box<dyn TagWorker>, _context: &ProcessorContext<'_>) -> bool {
        push_result(&mut self.element, child)
    }

    fn process_content(&mut self, content: &str, _context: &ProcessorContext<'_>) -> bool {
        append_text(&mut self.element, content, self.preformatted);
        true
    }

    fn result(&self) -> Option<&LayoutElement> {
        Some(&self.element)
    }

    fn result_mut(&mut self) -> Option<&mut LayoutElement> {
        Some(&mut self.element)
    }

    fn into_result(self: Box<Self>) -> Option<LayoutElement> {
        Some(self.element)
    }
}

/// Inline phrasing elements and links.
pub struct SpanWorker {
    element: LayoutElement,
}

impl SpanWorker {
    pub fn new() -> Self {
        Self {
            element: LayoutElement::new(LayoutKind::Span),
        }
    }

    /// `<a>`; the target is resolved against the document location.
    pub fn link(element: ElementRef<'_>, context: &ProcessorContext<'_>) -> Self {
        let href = element
            .attr("href")
            .map(|raw| context.resource_resolver().resolve(raw).to_string())
            .unwrap_or_default();
        Self {
            element: LayoutElement::new(LayoutKind::Link { href }),
        }
    }
}

impl Default for SpanWorker {
    fn default() -> Self {
        Self::new()
    }
}

impl TagWorker for SpanWorker {
    fn process_end(&mut self, _element: ElementRef<'_>, _context: &ProcessorContext<'_>) {}

    fn process_tag_child(&mut self, child: Box<dyn TagWorker>, _context: &ProcessorContext<'_>) -> bool {
        push_result(&mut self.element, child)
    }

    fn process_content(&mut self, content: &str, _context: &ProcessorContext<'_>) -> bool {
        append_text(&mut self.element, content, false);
        true
    }

    fn result(&self) -> Option<&LayoutElement> {
        Some(&self.element)
    }

    fn result_mut(&mut self) -> Option<&mut LayoutElement> {
        Some(&mut self.element)
    }

    fn into_result(self: Box<Self>) -> Option<LayoutElement> {
        Some(self.element)
    }
}

/// `ul` and `ol`. Anything that is not a list item gets wrapped in one.
pub struct ListWorker {
    element: LayoutElement,
}

impl ListWorker {
    pub fn new(ordered: bool) -> Self {
        Self {
            element: LayoutElement::new(LayoutKind::List { ordered }),
        }
    }

    fn push_item(&mut self, child: LayoutElement) {
        if child.kind == LayoutKind::ListItem {
            self.element.push_child(child);
            return;
        }
        let mut item = LayoutElement::new(LayoutKind::ListItem);
        if child.is_inline() {
            let mut paragraph = LayoutElement::new(LayoutKind::Paragraph);
            paragraph.push_child(child);
            item.push_child(paragraph);
        } else {
            item.push_child(child);
        }
        self.element.push_child(item);
    }
}

impl TagWorker for ListWorker {
    fn process_end(&mut self, _element: ElementRef<'_>, _context: &ProcessorContext<'_>) {}

    fn process_tag_child(&mut self, child: Box<dyn TagWorker>, _context: &ProcessorContext<'_>) -> bool {
        if let Some(result) = child.into_result() {
            self.push_item(result);
        }
        true
    }

    fn process_content(&mut self, content: &str, _context: &ProcessorContext<'_>) -> bool {
        let text = collapse_whitespace(content);
        let text = text.trim();
        if !text.is_empty() {
            self.push_item(LayoutElement::text(text));
        }
        true
    }

    fn result(&self) -> Option<&LayoutElement> {
        Some(&self.element)
    }

    fn result_mut(&mut self) -> Option<&mut LayoutElement> {
        Some(&mut self.element)
    }

    fn into_result(self: Box<Self>) -> Option<LayoutElement> {
        Some(self.element)
    }
}

/// `img`. Accepts neither content nor children.
pub struct ImageWorker {
    element: LayoutElement,
}

impl ImageWorker {
    pub fn new(element: ElementRef<'_>, context: &ProcessorContext<'_>) -> Self {
        let source = element
            .attr("src")
            .map(|raw| context.resource_resolver().locate(raw).to_string())
            .unwrap_or_default();
        let alt = element.attr("alt").map(str::to_string);
        let mut image = LayoutElement::new(LayoutKind::Image { source, alt });
        for dimension in ["width", "height"] {
            if let Some(value) = element.attr(dimension).map(str::trim) {
                if value.chars().all(|c| c.is_ascii_digit()) && !value.is_empty() {
                    image.set_property(dimension, format!("{value}px"));
                } else if !value.is_empty() {
                    image.set_property(dimension, value);
                }
            }
        }
        Self { element: image }
    }
}

impl TagWorker for ImageWorker {
    fn process_end(&mut self, _element: ElementRef<'_>, _context: &ProcessorContext<'_>) {}

    fn process_tag_child(&mut self, _child: Box<dyn TagWorker>, _context: &ProcessorContext<'_>) -> bool {
        false
    }

    fn process_content(&mut self, _content: &str, _context: &ProcessorContext<'_>) -> bool {
        false
    }

    fn result(&self) -> Option<&LayoutElement> {
        Some(&self.element)
    }

    fn result_mut(&mut self) -> Option<&mut LayoutElement> {
        Some(&mut self.element)
    }

    fn into_result(self: Box<Self>) -> Option<LayoutElement> {
        Some(self.element)
    }
}

/// `br`
pub struct LineBreakWorker {
    element: LayoutElement,
}

impl LineBreakWorker {
    pub fn new() -> Self {
        Self {
            element: LayoutElement::new(LayoutKind::LineBreak),
        }
    }
}

impl Default for LineBreakWorker {
    fn default() -> Self {
        Self::new()
    }
}

impl TagWorker for LineBreakWorker {
    fn process_end(&mut self, _element: ElementRef<'_>, _context: &ProcessorContext<'_>) {}

    fn process_tag_child(&mut self, _child: Box<dyn TagWorker>, _context: &ProcessorContext<'_>) -> bool {
        false
    }

    fn process_content(&mut self, _content: &str, _context: &ProcessorContext<'_>) -> bool {
        false
    }

    fn result(&self) -> Option<&LayoutElement> {
        Some(&self.element)
    }

    fn result_mut(&mut self) -> Option<&mut LayoutElement> {
        Some(&mut self.element)
    }

    fn into_result(self: Box<Self>) -> Option<LayoutElement> {
        Some(self.element)
    }
}

/// `table`. Takes rows; cells outside a row are collected into an implicit
/// trailing row.
pub struct TableWorker {
    element: LayoutElement,
    implicit_row_open: bool,
}

impl TableWorker {
    pub fn new() -> Self {
        Self {
            element: LayoutElement::new(LayoutKind::Table),
            implicit_row_open: false,
        }
    }
}

impl Default for TableWorker {
    fn default() -> Self {
        Self::new()
    }
}

impl TagWorker for TableWorker {
    fn process_end(&mut self, _element: ElementRef<'_>, _context: &ProcessorContext<'_>) {}

    fn process_tag_child(&mut self, child: Box<dyn TagWorker>, _context: &ProcessorContext<'_>) -> bool {
        let Some(result) = child.into_result() else {
            return true;
        };
        match result.kind {
            LayoutKind::Row => {
                self.implicit_row_open = false;
                self.element.push_child(result);
                true
            }
            LayoutKind::Cell => {
                match self.element.children.last_mut() {
                    Some(row) if self.implicit_row_open => row.push_child(result),
                    _ => {
                        let mut row = LayoutElement::new(LayoutKind::Row);
                        row.push_child(result);
                        self.element.push_child(row);
                        self.implicit_row_open = true;
                    }
                }
                true
            }
            _ => false,
        }
    }

    fn process_content(&mut self, content: &str, _context: &ProcessorContext<'_>) -> bool {
        content.trim().is_empty()
    }

    fn result(&self) -> Option<&LayoutElement> {
        Some(&self.element)
    }

    fn result_mut(&mut self) -> Option<&mut LayoutElement> {
        Some(&mut self.element)
    }

    fn into_result(self: Box<Self>) -> Option<LayoutElement> {
        Some(self.element)
    }
}

/// `tr`. Takes cells only.
pub struct RowWorker {
    element: LayoutElement,
}

impl RowWorker {
    pub fn new() -> Self {
        Self {
            element: LayoutElement::new(LayoutKind::Row),
        }
    }
}

impl Default for RowWorker {
    fn default() -> Self {
        Self::new()
    }
}

impl TagWorker for RowWorker {
    fn process_end(&mut self, _element: ElementRef<'_>, _context: &ProcessorContext<'_>) {}

    fn process_tag_child(&mut self, child: Box<dyn TagWorker>, _context: &ProcessorContext<'_>) -> bool {
        match child.into_result() {
            Some(cell) if cell.kind == LayoutKind::Cell => {
                self.element.push_child(cell);
                true
            }
            Some(_) => false,
            None => true,
        }
    }

    fn process_content(&mut self, content: &str, _context: &ProcessorContext<'_>) -> bool {
        content.trim().is_empty()
    }

    fn result(&self) -> Option<&LayoutElement> {
        Some(&self.element)
    }

    fn result_mut(&mut self) -> Option<&mut LayoutElement> {
        Some(&mut self.element)
    }

    fn into_result(self: Box<Self>) -> Option<LayoutElement> {
        Some(self.element)
    }
}

fn push_result(container: &mut LayoutElement, child: Box<dyn TagWorker>) -> bool {
    if let Some(result) = child.into_result() {
        container.push_child(result);
    }
    true
}

/// Append text, merging with a trailing text child. Outside preformatted
/// content whitespace runs collapse to one space, also across the seam.
fn append_text(container: &mut LayoutElement, content: &str, preserve: bool) {
    let text = if preserve {
        content.to_string()
    } else {
        collapse_whitespace(content)
    };
    if text.is_empty() {
        return;
    }
    if let Some(LayoutElement {
        kind: LayoutKind::Text { text: last },
        ..
    }) = container.children.last_mut()
    {
        if !preserve && last.ends_with(' ') {
            last.push_str(text.trim_start());
        } else {
            last.push_str(&text);
        }
        return;
    }
    container.push_child(LayoutElement::text(text));
}

/// Drop leading whitespace of the first text child and trailing whitespace of
/// the last one.
fn trim_line_edges(container: &mut LayoutElement) {
    if let Some(LayoutElement {
        kind: LayoutKind::Text { text },
        ..
    }) = container.children.first_mut()
    {
        *text = text.trim_start().to_string();
    }
    if let Some(LayoutElement {
        kind: LayoutKind::Text { text },
        ..
    }) = container.children.last_mut()
    {
        *text = text.trim_end().to_string();
    }
    container
        .children
        .retain(|child| !matches!(&child.kind, LayoutKind::Text { text } if text.is_empty()));
}

fn collapse_whitespace(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut in_space = false;
    for ch in content.chars() {
        if ch.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(ch);
            in_space = false;
        }
    }
    out
}
