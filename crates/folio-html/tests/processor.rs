use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use folio_config::ProcessorConfig;
use folio_html::attach::{
    Diagnostic, HtmlProcessor, ProcessError, ProcessorContext, TagWorker, TagWorkerFactory,
    WorkerError,
};
use folio_html::css::{CssApplier, CssApplierFactory, CssError, CssResolver, StyleMap};
use folio_html::dom::{Document, ElementRef, element, text};
use folio_html::layout::{LayoutElement, LayoutKind};

/// Styles every element with `color: red`; `class="hidden"` adds
/// `display: none` and `data-fail` makes resolution fail.
#[derive(Clone, Default)]
struct StubResolver {
    calls: Arc<AtomicUsize>,
}

impl CssResolver for StubResolver {
    fn resolve_styles(
        &self,
        element: ElementRef<'_>,
        _parent: Option<&StyleMap>,
    ) -> Result<StyleMap, CssError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if element.attr("data-fail").is_some() {
            return Err(CssError::Resolution {
                tag: element.name().to_string(),
                message: "stub failure".into(),
            });
        }
        let mut styles = StyleMap::from([("color".to_string(), "red".to_string())]);
        if element.value().has_class("hidden") {
            styles.insert("display".into(), "none".into());
        }
        Ok(styles)
    }
}

#[derive(Default)]
struct Log {
    created: AtomicUsize,
    contents: Mutex<Vec<String>>,
}

struct StubWorker {
    element: LayoutElement,
    accepts_children: bool,
    accepts_content: bool,
    log: Arc<Log>,
}

impl TagWorker for StubWorker {
    fn process_end(&mut self, element: ElementRef<'_>, context: &ProcessorContext<'_>) {
        self.element.set_property("tag", element.name());
        self.element.set_property("depth", context.state().len().to_string());
    }

    fn process_tag_child(&mut self, child: Box<dyn TagWorker>, _context: &ProcessorContext<'_>) -> bool {
        if !self.accepts_children {
            return false;
        }
        self.element.children.extend(child.into_result());
        true
    }

    fn process_content(&mut self, content: &str, _context: &ProcessorContext<'_>) -> bool {
        if !self.accepts_content {
            return false;
        }
        if let Ok(mut contents) = self.log.contents.lock() {
            contents.push(content.to_string());
        }
        self.element.push_child(LayoutElement::text(content));
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

/// `div` and `p` get accepting workers, `aside` rejects children, `img`
/// rejects content. Anything else has no worker.
struct StubFactory {
    log: Arc<Log>,
}

impl TagWorkerFactory for StubFactory {
    fn tag_worker(
        &self,
        element: ElementRef<'_>,
        _context: &ProcessorContext<'_>,
    ) -> Result<Option<Box<dyn TagWorker>>, WorkerError> {
        let (accepts_children, accepts_content) = match element.name() {
            "div" | "p" | "tr" => (true, true),
            "aside" => (false, true),
            "img" => (true, false),
            "blink" => {
                return Err(WorkerError::Construction {
                    tag: "blink".into(),
                    message: "unsupported".into(),
                });
            }
            _ => return Ok(None),
        };
        self.log.created.fetch_add(1, Ordering::SeqCst);
        Ok(Some(Box::new(StubWorker {
            element: LayoutElement::new(LayoutKind::Div),
            accepts_children,
            accepts_content,
            log: Arc::clone(&self.log),
        })))
    }
}

/// Copies every resolved property onto the result under an `applied-` prefix.
struct StubApplier;

impl CssApplier for StubApplier {
    fn apply(&self, context: &ProcessorContext<'_>, element: ElementRef<'_>, worker: &mut dyn TagWorker) {
        let Some(styles) = context.styles(element.id()) else {
            return;
        };
        if let Some(result) = worker.result_mut() {
            for (name, value) in styles {
                result.set_property(format!("applied-{name}"), value.clone());
            }
        }
    }
}

/// Appliers for everything but `p` and `tr`.
struct StubApplierFactory {
    applier: StubApplier,
    skipped: &'static [&'static str],
}

impl StubApplierFactory {
    fn new() -> Self {
        Self {
            applier: StubApplier,
            skipped: &["p", "tr"],
        }
    }
}

impl CssApplierFactory for StubApplierFactory {
    fn css_applier(&self, tag: &str) -> Option<&dyn CssApplier> {
        if self.skipped.contains(&tag) {
            None
        } else {
            Some(&self.applier)
        }
    }
}

fn processor(log: &Arc<Log>) -> HtmlProcessor {
    HtmlProcessor::new(StubResolver::default())
        .with_worker_factory(StubFactory {
            log: Arc::clone(log),
        })
        .with_applier_factory(StubApplierFactory::new())
}

fn page(body_children: Vec<folio_html::dom::NodeBuilder>) -> Document {
    Document::from_builder(element("html").child(element("body").children(body_children)))
}

#[test]
fn single_div_with_text_becomes_one_result() -> Result<()> {
    let log = Arc::new(Log::default());
    let doc = page(vec![element("div").child(text("hi"))]);

    let conversion = processor(&log).process_elements(&doc)?;

    assert_eq!(conversion.result.len(), 1);
    let div = &conversion.result[0];
    assert_eq!(div.property("applied-color"), Some("red"));
    assert_eq!(div.property("tag"), Some("div"));
    assert_eq!(div.property("collapsing-margins"), Some("true"));
    assert_eq!(*log.contents.lock().unwrap(), vec!["hi".to_string()]);
    assert!(conversion.diagnostics.is_empty(), "{:?}", conversion.diagnostics);
    Ok(())
}

#[test]
fn non_displayed_subtree_creates_no_workers() -> Result<()> {
    let log = Arc::new(Log::default());
    let doc = page(vec![element("div").attr("class", "hidden").children([
        element("div").child(element("p").child(text("deep"))),
        element("p"),
        element("aside").child(text("x")),
    ])]);

    let conversion = processor(&log).process_elements(&doc)?;

    assert_eq!(log.created.load(Ordering::SeqCst), 0);
    assert!(conversion.result.is_empty());
    assert!(conversion.diagnostics.is_empty());
    assert!(log.contents.lock().unwrap().is_empty());
    Ok(())
}

#[test]
fn child_of_workerless_element_surfaces_at_top_level() -> Result<()> {
    let log = Arc::new(Log::default());
    let doc = page(vec![element("section").child(element("div").child(text("inner")))]);

    let conversion = processor(&log).process_elements(&doc)?;

    assert_eq!(conversion.result.len(), 1);
    assert_eq!(conversion.result[0].text_content(), "inner");
    assert_eq!(
        conversion.diagnostics,
        vec![Diagnostic::NoWorkerFound {
            tag: "section".into()
        }]
    );
    Ok(())
}

#[test]
fn rejected_child_is_reported_and_dropped() -> Result<()> {
    let log = Arc::new(Log::default());
    let doc = page(vec![element("div").child(
        element("aside").child(element("div").child(text("lost"))),
    )]);

    let conversion = processor(&log).process_elements(&doc)?;

    assert_eq!(conversion.result.len(), 1);
    let outer = &conversion.result[0];
    assert_eq!(outer.children.len(), 1, "aside is attached to the outer div");
    assert!(outer.children[0].children.is_empty());
    assert!(!outer.text_content().contains("lost"));
    assert_eq!(
        conversion.diagnostics,
        vec![Diagnostic::WorkerUnableToProcessOtherWorker {
            parent: "StubWorker".into(),
            child: "StubWorker".into(),
        }]
    );
    Ok(())
}

#[test]
fn absorbed_anomalies_are_reported() -> Result<()> {
    let log = Arc::new(Log::default());
    let doc = page(vec![
        text("loose"),
        text("   "),
        element("section").child(text("orphan")),
        element("img").child(text("caption")),
        element("p").child(text("no applier")),
        element("tr"),
        element("style"),
        element("link").attr("rel", "stylesheet").attr("href", "x.css"),
    ]);

    let conversion = processor(&log).process_elements(&doc)?;

    assert_eq!(conversion.result.len(), 3);
    assert_eq!(
        conversion.diagnostics,
        vec![
            Diagnostic::TextWasNotProcessed {
                text: "loose".into()
            },
            Diagnostic::NoWorkerFound {
                tag: "section".into()
            },
            Diagnostic::NoConsumerFoundForContent,
            Diagnostic::WorkerUnableToProcessContent {
                worker: "StubWorker".into()
            },
            Diagnostic::NoCssApplierFound { tag: "p".into() },
        ]
    );
    Ok(())
}

#[test]
fn collapsing_margins_can_be_disabled() -> Result<()> {
    let log = Arc::new(Log::default());
    let config = ProcessorConfig {
        collapsing_margins: false,
        ..ProcessorConfig::default()
    };
    let doc = page(vec![element("div"), element("p")]);

    let conversion = processor(&log).with_config(config).process_elements(&doc)?;

    assert_eq!(conversion.result.len(), 2);
    assert!(conversion.result.iter().all(|r| r.property("collapsing-margins").is_none()));
    Ok(())
}

#[test]
fn resolver_failure_aborts_conversion() {
    let log = Arc::new(Log::default());
    let doc = page(vec![
        element("div").child(element("p").attr("data-fail", "1")),
        element("div"),
    ]);

    let err = processor(&log).process_elements(&doc).unwrap_err();

    assert!(matches!(err, ProcessError::Style { ref tag, .. } if tag == "p"));
    assert_eq!(log.created.load(Ordering::SeqCst), 1, "second div never visited");
}

#[test]
fn worker_construction_failure_aborts_conversion() {
    let log = Arc::new(Log::default());
    let doc = page(vec![element("div").child(element("blink"))]);

    let err = processor(&log).process_elements(&doc).unwrap_err();

    assert!(matches!(err, ProcessError::Worker { ref tag, .. } if tag == "blink"));
}

#[test]
fn cancelled_conversion_stops_before_visiting() {
    let log = Arc::new(Log::default());
    let flag = Arc::new(AtomicBool::new(true));
    let doc = page(vec![element("div").child(text("hi"))]);

    let err = processor(&log)
        .with_cancel_flag(Arc::clone(&flag))
        .process_elements(&doc)
        .unwrap_err();

    assert!(matches!(err, ProcessError::Cancelled));
    assert_eq!(log.created.load(Ordering::SeqCst), 0);

    flag.store(false, Ordering::SeqCst);
    assert!(processor(&log).with_cancel_flag(flag).process_elements(&doc).is_ok());
}

#[test]
fn missing_body_is_fatal() {
    let log = Arc::new(Log::default());
    let doc = Document::from_builder(element("html").child(element("div")));
    let err = processor(&log).process_elements(&doc).unwrap_err();
    assert!(matches!(err, ProcessError::MissingElement("body")));
}

#[test]
fn full_document_mode_returns_single_root() -> Result<()> {
    let log = Arc::new(Log::default());
    let doc = Document::from_builder(
        element("div").children([
            element("div").child(text("a")),
            element("p").child(text("b")),
        ]),
    );
    let err = processor(&log).process_document(&doc).unwrap_err();
    assert!(matches!(err, ProcessError::MissingElement("html")));

    let doc = Document::from_builder(element("html").child(element("body").child(
        element("div").children([element("div").child(text("a")), element("p").child(text("b"))]),
    )));
    // html and body have no stub worker, so the outer div is the single root.
    let conversion = processor(&log).process_document(&doc)?;
    assert_eq!(conversion.result.property("tag"), Some("div"));
    assert_eq!(conversion.result.children.len(), 2);
    assert_eq!(conversion.result.text_content(), "ab");
    assert!(conversion.result.property("collapsing-margins").is_none());
    assert_eq!(
        conversion.diagnostics,
        vec![
            Diagnostic::NoWorkerFound { tag: "html".into() },
            Diagnostic::NoWorkerFound { tag: "body".into() },
            Diagnostic::NoCssApplierFound { tag: "p".into() },
        ]
    );
    Ok(())
}

#[test]
fn styles_are_resolved_once_per_element() -> Result<()> {
    let log = Arc::new(Log::default());
    let resolver = StubResolver::default();
    let calls = Arc::clone(&resolver.calls);
    let doc = page(vec![element("div").children([element("p"), element("p")])]);

    HtmlProcessor::new(resolver)
        .with_worker_factory(StubFactory { log })
        .with_applier_factory(StubApplierFactory::new())
        .process_elements(&doc)?;

    // html, body, div and two paragraphs
    assert_eq!(calls.load(Ordering::SeqCst), 5);
    Ok(())
}

/// Records which style entries are still held when an element is styled.
#[derive(Default)]
struct ScopeApplier {
    seen: Arc<Mutex<Vec<String>>>,
}

impl CssApplier for ScopeApplier {
    fn apply(&self, context: &ProcessorContext<'_>, element: ElementRef<'_>, _worker: &mut dyn TagWorker) {
        let held = |e: ElementRef<'_>| context.styles(e.id()).is_some();
        let line = format!(
            "{}: own={} parent={} prev={:?} children={}",
            element.attr("id").unwrap_or(element.name()),
            held(element),
            element.parent_element().is_some_and(held),
            element.prev_sibling_element().map(held),
            element.child_elements().any(held),
        );
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(line);
        }
    }
}

impl CssApplierFactory for ScopeApplier {
    fn css_applier(&self, _tag: &str) -> Option<&dyn CssApplier> {
        Some(self)
    }
}

#[test]
fn styles_are_released_once_a_subtree_is_done() -> Result<()> {
    let log = Arc::new(Log::default());
    let applier = ScopeApplier::default();
    let seen = Arc::clone(&applier.seen);
    let doc = page(vec![
        element("div")
            .attr("id", "outer")
            .children([element("p").attr("id", "a"), element("p").attr("id", "b")]),
        element("div").attr("id", "next"),
    ]);

    HtmlProcessor::new(StubResolver::default())
        .with_worker_factory(StubFactory { log })
        .with_applier_factory(applier)
        .process_elements(&doc)?;

    let seen = seen.lock().map(|seen| seen.clone()).unwrap_or_default();
    assert_eq!(
        seen,
        vec![
            "a: own=true parent=true prev=None children=false",
            "b: own=true parent=true prev=Some(false) children=false",
            "outer: own=true parent=true prev=None children=false",
            "next: own=true parent=true prev=Some(false) children=false",
        ]
    );
    Ok(())
}

#[test]
fn workers_finish_while_still_on_the_stack() -> Result<()> {
    let log = Arc::new(Log::default());
    let doc = page(vec![element("div").child(element("p").child(text("x")))]);

    let conversion = processor(&log).process_elements(&doc)?;
    let div = &conversion.result[0];
    assert_eq!(div.property("depth"), Some("1"));
    assert_eq!(div.children[0].property("depth"), Some("2"));
    Ok(())
}
