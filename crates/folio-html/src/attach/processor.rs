use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use ego_tree::NodeRef;
use folio_config::ProcessorConfig;
use tracing::{debug, info};

use super::{
    DefaultTagWorkerFactory, Diagnostic, ProcessError, ProcessorContext, TagWorker,
    TagWorkerFactory,
};
use crate::css::{CssApplierFactory, CssResolver, DefaultCssApplierFactory, is_displayable};
use crate::dom::{Document, DomNode, ElementRef};
use crate::layout::LayoutElement;
use crate::resource::ResourceResolver;

/// Output of a conversion together with the anomalies absorbed on the way.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion<T> {
    pub result: T,
    pub diagnostics: Vec<Diagnostic>,
}

/// Walks a document once and composes the results of its tag workers.
///
/// ```ignore
/// let processor = HtmlProcessor::new(resolver)
///     .with_resources(ResourceResolver::from_config(&config.resources))
///     .with_config(config.processor.clone());
/// let conversion = processor.process_elements(&document)?;
/// ```
pub struct HtmlProcessor {
    css_resolver: Box<dyn CssResolver>,
    worker_factory: Box<dyn TagWorkerFactory>,
    applier_factory: Box<dyn CssApplierFactory>,
    resources: ResourceResolver,
    config: ProcessorConfig,
    cancel: Option<Arc<AtomicBool>>,
}

impl HtmlProcessor {
    /// A processor with the default worker and applier registries.
    pub fn new(css_resolver: impl CssResolver + 'static) -> Self {
        Self {
            css_resolver: Box::new(css_resolver),
            worker_factory: Box::new(DefaultTagWorkerFactory::new()),
            applier_factory: Box::new(DefaultCssApplierFactory::new()),
            resources: ResourceResolver::default(),
            config: ProcessorConfig::default(),
            cancel: None,
        }
    }

    pub fn with_worker_factory(mut self, factory: impl TagWorkerFactory + 'static) -> Self {
        self.worker_factory = Box::new(factory);
        self
    }

    pub fn with_applier_factory(mut self, factory: impl CssApplierFactory + 'static) -> Self {
        self.applier_factory = Box::new(factory);
        self
    }

    pub fn with_resources(mut self, resources: ResourceResolver) -> Self {
        self.resources = resources;
        self
    }

    pub fn with_config(mut self, config: ProcessorConfig) -> Self {
        self.config = config;
        self
    }

    /// Setting the flag makes the running conversion fail with
    /// [`ProcessError::Cancelled`] at the next visited node.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Convert the children of `<body>` into top-level layout elements.
    ///
    /// `<html>` and `<body>` are styled up front so their descendants inherit
    /// from them; non-blank text placed directly in the body is reported and
    /// skipped.
    pub fn process_elements(
        &self,
        document: &Document,
    ) -> Result<Conversion<Vec<LayoutElement>>, ProcessError> {
        let html = document
            .find_element("html")
            .ok_or(ProcessError::MissingElement("html"))?;
        let body = document
            .find_element("body")
            .ok_or(ProcessError::MissingElement("body"))?;

        let mut context = ProcessorContext::new(self.css_resolver.as_ref(), &self.resources);
        self.resolve_styles(html, &mut context)?;
        self.resolve_styles(body, &mut context)?;

        let mut roots = Vec::new();
        for child in body.children() {
            match child.value() {
                DomNode::Element(_) => self.visit(child, &mut context, &mut roots)?,
                DomNode::Text(text) if !text.trim().is_empty() => {
                    context.report(Diagnostic::TextWasNotProcessed {
                        text: text.trim().to_string(),
                    });
                }
                _ => {}
            }
        }

        if self.config.collapsing_margins {
            for root in &mut roots {
                root.set_property("collapsing-margins", "true");
            }
        }
        let diagnostics = context.finish()?;
        info!(results = roots.len(), diagnostics = diagnostics.len(), "converted elements");
        Ok(Conversion {
            result: roots,
            diagnostics,
        })
    }

    /// Convert the whole document into its single root layout element.
    pub fn process_document(
        &self,
        document: &Document,
    ) -> Result<Conversion<LayoutElement>, ProcessError> {
        let html = document
            .find_element("html")
            .ok_or(ProcessError::MissingElement("html"))?;

        let mut context = ProcessorContext::new(self.css_resolver.as_ref(), &self.resources);
        let mut roots = Vec::new();
        self.visit(html.node(), &mut context, &mut roots)?;
        let diagnostics = context.finish()?;

        let result = roots.into_iter().next().ok_or(ProcessError::EmptyDocument)?;
        info!(diagnostics = diagnostics.len(), "converted document");
        Ok(Conversion {
            result,
            diagnostics,
        })
    }

    fn visit(
        &self,
        node: NodeRef<'_, DomNode>,
        context: &mut ProcessorContext<'_>,
        roots: &mut Vec<LayoutElement>,
    ) -> Result<(), ProcessError> {
        if self.cancel.as_ref().is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            return Err(ProcessError::Cancelled);
        }
        match node.value() {
            DomNode::Element(_) => match ElementRef::wrap(node) {
                Some(element) => self.visit_element(element, context, roots),
                None => Ok(()),
            },
            DomNode::Text(text) => {
                self.visit_text(text, context);
                Ok(())
            }
            DomNode::Document => node
                .children()
                .try_for_each(|child| self.visit(child, context, roots)),
        }
    }

    fn visit_element(
        &self,
        element: ElementRef<'_>,
        context: &mut ProcessorContext<'_>,
        roots: &mut Vec<LayoutElement>,
    ) -> Result<(), ProcessError> {
        let tag = element.name();
        self.resolve_styles(element, context)?;
        if !context.styles(element.id()).is_none_or(is_displayable) {
            debug!(tag = %tag, "skipping non-displayed subtree");
            context.clear_styles(element.id());
            return Ok(());
        }

        let worker = self
            .worker_factory
            .tag_worker(element, context)
            .map_err(|source| ProcessError::Worker {
                tag: tag.to_string(),
                source,
            })?;
        let pushed = match worker {
            Some(worker) => {
                context.state_mut().push(worker);
                true
            }
            None => {
                if !self.config.is_ignored_tag(tag) && !element.is_stylesheet_link() {
                    context.report(Diagnostic::NoWorkerFound {
                        tag: tag.to_string(),
                    });
                }
                false
            }
        };

        let visited = element
            .children()
            .try_for_each(|child| self.visit(child, context, roots));

        if pushed {
            if let Err(err) = visited {
                context.state_mut().pop();
                return Err(err);
            }
            // The worker is still on the stack while it finishes.
            context.with_top(|worker, context| worker.process_end(element, context));
            let mut worker = context
                .state_mut()
                .pop()
                .ok_or(ProcessError::UnbalancedStack)?;
            self.apply_css(element, context, worker.as_mut());
            self.attach(worker, context, roots);
        } else {
            visited?;
        }

        context.clear_styles(element.id());
        Ok(())
    }

    /// Hand text to the innermost worker. With no worker on the stack,
    /// whitespace-only text is dropped silently and anything else is reported
    /// as [`Diagnostic::NoConsumerFoundForContent`].
    fn visit_text(&self, text: &str, context: &mut ProcessorContext<'_>) {
        if context.state().is_empty() {
            if !text.trim().is_empty() {
                context.report(Diagnostic::NoConsumerFoundForContent);
            }
            return;
        }
        let outcome = context.with_top(|top, context| (top.name(), top.process_content(text, context)));
        if let Some((worker, false)) = outcome {
            context.report(Diagnostic::WorkerUnableToProcessContent {
                worker: worker.to_string(),
            });
        }
    }

    fn resolve_styles(
        &self,
        element: ElementRef<'_>,
        context: &mut ProcessorContext<'_>,
    ) -> Result<(), ProcessError> {
        let parent = element
            .parent_element()
            .and_then(|parent| context.styles(parent.id()));
        let styles = context
            .css_resolver()
            .resolve_styles(element, parent)
            .map_err(|source| ProcessError::Style {
                tag: element.name().to_string(),
                source,
            })?;
        context.set_styles(element.id(), styles);
        Ok(())
    }

    fn apply_css(
        &self,
        element: ElementRef<'_>,
        context: &mut ProcessorContext<'_>,
        worker: &mut dyn TagWorker,
    ) {
        let tag = element.name();
        match self.applier_factory.css_applier(tag) {
            Some(applier) => applier.apply(context, element, worker),
            None if self.config.is_ignored_css_tag(tag) => {}
            None => context.report(Diagnostic::NoCssApplierFound {
                tag: tag.to_string(),
            }),
        }
    }

    /// Hand a finished worker to the enclosing one, or promote its result to
    /// the top level when the stack is empty.
    fn attach(
        &self,
        worker: Box<dyn TagWorker>,
        context: &mut ProcessorContext<'_>,
        roots: &mut Vec<LayoutElement>,
    ) {
        if context.state().is_empty() {
            roots.extend(worker.into_result());
            return;
        }
        let child = worker.name();
        let outcome = context.with_top(|parent, context| {
            (parent.name(), parent.process_tag_child(worker, context))
        });
        if let Some((parent, false)) = outcome {
            context.report(Diagnostic::WorkerUnableToProcessOtherWorker {
                parent: parent.to_string(),
                child: child.to_string(),
            });
        }
    }
}
