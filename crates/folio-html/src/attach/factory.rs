use std::collections::HashMap;

use super::workers::{
    BlockWorker, ImageWorker, LineBreakWorker, ListWorker, ParagraphWorker, RowWorker, SpanWorker,
    TableWorker,
};
use super::{ProcessorContext, TagWorker, WorkerError};
use crate::dom::ElementRef;
use crate::layout::LayoutKind;

/// Builds the worker for an element. `Ok(None)` means the tag is not handled.
pub trait TagWorkerFactory {
    fn tag_worker(
        &self,
        element: ElementRef<'_>,
        context: &ProcessorContext<'_>,
    ) -> Result<Option<Box<dyn TagWorker>>, WorkerError>;
}

pub type WorkerConstructor = fn(ElementRef<'_>, &ProcessorContext<'_>) -> Box<dyn TagWorker>;

/// Registry of worker constructors keyed by lower-case tag name.
#[derive(Clone)]
pub struct DefaultTagWorkerFactory {
    constructors: HashMap<&'static str, WorkerConstructor>,
}

const BLOCK_TAGS: &[&str] = &[
    "body", "div", "section", "article", "header", "footer", "nav", "main", "aside", "address",
    "blockquote", "figure", "figcaption", "form", "center",
];

const INLINE_TAGS: &[&str] = &[
    "span", "b", "strong", "i", "em", "u", "s", "small", "code", "sub", "sup", "label", "mark",
    "abbr", "cite", "q", "font", "big", "tt", "kbd", "samp", "var", "del", "ins",
];

impl DefaultTagWorkerFactory {
    /// A factory with no registered tags.
    pub fn empty() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    pub fn new() -> Self {
        let mut factory = Self::empty();
        factory.register("html", |_, _| Box::new(BlockWorker::new(LayoutKind::Document)));
        for tag in BLOCK_TAGS {
            factory.register(*tag, |_, _| Box::new(BlockWorker::new(LayoutKind::Div)));
        }
        for tag in INLINE_TAGS {
            factory.register(*tag, |_, _| Box::new(SpanWorker::new()));
        }
        factory.register("a", |element, context| Box::new(SpanWorker::link(element, context)));
        factory.register("p", |_, _| Box::new(ParagraphWorker::new()));
        factory.register("pre", |_, _| Box::new(ParagraphWorker::preformatted()));
        factory.register("h1", |_, _| Box::new(ParagraphWorker::heading(1)));
        factory.register("h2", |_, _| Box::new(ParagraphWorker::heading(2)));
        factory.register("h3", |_, _| Box::new(ParagraphWorker::heading(3)));
        factory.register("h4", |_, _| Box::new(ParagraphWorker::heading(4)));
        factory.register("h5", |_, _| Box::new(ParagraphWorker::heading(5)));
        factory.register("h6", |_, _| Box::new(ParagraphWorker::heading(6)));
        factory.register("ul", |_, _| Box::new(ListWorker::new(false)));
        factory.register("ol", |_, _| Box::new(ListWorker::new(true)));
        factory.register("li", |_, _| Box::new(BlockWorker::new(LayoutKind::ListItem)));
        factory.register("img", |element, context| Box::new(ImageWorker::new(element, context)));
        factory.register("br", |_, _| Box::new(LineBreakWorker::new()));
        factory.register("table", |_, _| Box::new(TableWorker::new()));
        factory.register("tr", |_, _| Box::new(RowWorker::new()));
        factory.register("td", |_, _| Box::new(BlockWorker::new(LayoutKind::Cell)));
        factory.register("th", |_, _| Box::new(BlockWorker::new(LayoutKind::Cell)));
        factory
    }

    /// Add or replace the constructor for `tag`.
    pub fn register(&mut self, tag: &'static str, constructor: WorkerConstructor) {
        self.constructors.insert(tag, constructor);
    }

    pub fn is_registered(&self, tag: &str) -> bool {
        self.constructors.contains_key(tag)
    }
}

impl Default for DefaultTagWorkerFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl TagWorkerFactory for DefaultTagWorkerFactory {
    fn tag_worker(
        &self,
        element: ElementRef<'_>,
        context: &ProcessorContext<'_>,
    ) -> Result<Option<Box<dyn TagWorker>>, WorkerError> {
        Ok(self
            .constructors
            .get(element.name())
            .map(|constructor| constructor(element, context)))
    }
}
