//! Tree processing: the worker stack, tag workers and the document processor.

mod context;
mod diagnostics;
mod factory;
mod processor;
mod workers;

use crate::css::CssError;
use crate::dom::ElementRef;
use crate::layout::LayoutElement;

pub use context::{ProcessorContext, State};
pub use diagnostics::Diagnostic;
pub use factory::{DefaultTagWorkerFactory, TagWorkerFactory, WorkerConstructor};
pub use processor::{Conversion, HtmlProcessor};
pub use workers::{
    BlockWorker, ImageWorker, LineBreakWorker, ListWorker, ParagraphWorker, RowWorker,
    SpanWorker, TableWorker,
};

/// Handler for one element's visit.
///
/// Created on element enter, it receives child workers and text content while
/// the element's children are visited and is finalized once with
/// [`process_end`](TagWorker::process_end).
pub trait TagWorker {
    fn process_end(&mut self, element: ElementRef<'_>, context: &ProcessorContext<'_>);

    /// Offer a finished child worker. `false` rejects it; the child's result is
    /// then dropped.
    fn process_tag_child(&mut self, child: Box<dyn TagWorker>, context: &ProcessorContext<'_>) -> bool;

    fn process_content(&mut self, content: &str, context: &ProcessorContext<'_>) -> bool;

    fn result(&self) -> Option<&LayoutElement>;

    fn result_mut(&mut self) -> Option<&mut LayoutElement>;

    fn into_result(self: Box<Self>) -> Option<LayoutElement>;

    fn name(&self) -> &'static str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("cannot create worker for <{tag}>: {message}")]
    Construction { tag: String, message: String },
}

/// Fatal processing failures. Absorbed anomalies are [`Diagnostic`]s instead.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("document has no <{0}> element")]
    MissingElement(&'static str),
    #[error("style resolution failed for <{tag}>")]
    Style {
        tag: String,
        #[source]
        source: CssError,
    },
    #[error("worker acquisition failed for <{tag}>")]
    Worker {
        tag: String,
        #[source]
        source: WorkerError,
    },
    #[error("conversion cancelled")]
    Cancelled,
    #[error("document produced no result")]
    EmptyDocument,
    #[error("worker stack out of balance")]
    UnbalancedStack,
}
