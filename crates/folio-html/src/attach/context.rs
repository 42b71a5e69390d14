use std::collections::HashMap;

use ego_tree::NodeId;
use tracing::{error, trace};

use super::{Diagnostic, ProcessError, TagWorker};
use crate::css::{CssResolver, StyleMap};
use crate::resource::ResourceResolver;

/// The active worker stack; the top is the worker of the innermost element
/// still being visited.
///
/// While a worker runs inside [`ProcessorContext::with_top`] it is detached:
/// [`top`](State::top) skips it but [`len`](State::len) still counts it.
#[derive(Default)]
pub struct State {
    stack: Vec<Box<dyn TagWorker>>,
    detached: usize,
}

impl State {
    pub fn push(&mut self, worker: Box<dyn TagWorker>) {
        trace!(worker = worker.name(), depth = self.stack.len(), "push");
        self.stack.push(worker);
    }

    pub fn pop(&mut self) -> Option<Box<dyn TagWorker>> {
        let worker = self.stack.pop();
        if let Some(worker) = &worker {
            trace!(worker = worker.name(), depth = self.stack.len(), "pop");
        }
        worker
    }

    pub fn top(&self) -> Option<&dyn TagWorker> {
        self.stack.last().map(|w| w.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn len(&self) -> usize {
        self.stack.len() + self.detached
    }
}

/// Per-conversion state: the worker stack, the collaborators, the transient
/// style side table and the diagnostics reported so far.
///
/// One context backs exactly one conversion and is consumed by [`finish`].
///
/// [`finish`]: ProcessorContext::finish
pub struct ProcessorContext<'a> {
    state: State,
    css_resolver: &'a dyn CssResolver,
    resource_resolver: &'a ResourceResolver,
    styles: HashMap<NodeId, StyleMap>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> ProcessorContext<'a> {
    pub fn new(css_resolver: &'a dyn CssResolver, resource_resolver: &'a ResourceResolver) -> Self {
        Self {
            state: State::default(),
            css_resolver,
            resource_resolver,
            styles: HashMap::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut State {
        &mut self.state
    }

    pub fn css_resolver(&self) -> &'a dyn CssResolver {
        self.css_resolver
    }

    pub fn resource_resolver(&self) -> &'a ResourceResolver {
        self.resource_resolver
    }

    /// Resolved styles of an element currently being visited.
    pub fn styles(&self, node: NodeId) -> Option<&StyleMap> {
        self.styles.get(&node)
    }

    pub fn set_styles(&mut self, node: NodeId, styles: StyleMap) {
        self.styles.insert(node, styles);
    }

    pub fn clear_styles(&mut self, node: NodeId) {
        self.styles.remove(&node);
    }

    /// Run `f` against the top worker, which is detached from the stack for
    /// the duration of the call. `None` when the stack is empty.
    pub fn with_top<R>(
        &mut self,
        f: impl FnOnce(&mut dyn TagWorker, &ProcessorContext<'a>) -> R,
    ) -> Option<R> {
        let mut top = self.state.stack.pop()?;
        self.state.detached += 1;
        let out = f(top.as_mut(), self);
        self.state.detached -= 1;
        self.state.stack.push(top);
        Some(out)
    }

    pub fn report(&mut self, diagnostic: Diagnostic) {
        error!(%diagnostic, "conversion diagnostic");
        self.diagnostics.push(diagnostic);
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Close the context, handing back its diagnostics. Fails when workers
    /// are still on the stack.
    pub fn finish(self) -> Result<Vec<Diagnostic>, ProcessError> {
        if !self.state.is_empty() {
            error!(depth = self.state.len(), "workers left on the stack");
            return Err(ProcessError::UnbalancedStack);
        }
        Ok(self.diagnostics)
    }
}
