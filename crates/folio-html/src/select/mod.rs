//! Selector evaluation.
//!
//! A selector is compiled into a tree of [`Evaluator`]s. Leaves test a single
//! element (tag, id, class, attribute); structural evaluators walk to
//! ancestors or siblings; [`And`] and [`Or`] compose them.

mod combining;
mod evaluator;
mod parser;
mod structural;

use std::fmt;
use std::sync::Arc;

use crate::dom::{Document, ElementRef};

pub use combining::{And, CombiningEvaluator, Or};
pub use evaluator::{AllElements, AttrOp, Attribute, AttributeValue, Class, Id, Tag};
pub use parser::{Selector, Specificity, parse, parse_selector, parse_selector_list};
pub use structural::{
    FirstChild, ImmediateParent, ImmediatePreviousSibling, LastChild, Not, Parent,
    PreviousSibling, Root,
};

/// A predicate over `(root, element)` pairs.
///
/// `root` bounds upward traversal for structural evaluators; matching must
/// depend only on the two elements and the evaluator's own configuration.
pub trait Evaluator: fmt::Debug + fmt::Display + Send + Sync {
    fn matches(&self, root: ElementRef<'_>, element: ElementRef<'_>) -> bool;
}

/// Shared handle to an evaluator; clauses are immutable once built.
pub type EvaluatorRef = Arc<dyn Evaluator>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectorError {
    #[error("empty selector query")]
    Empty,
    #[error("unexpected '{found}' at position {position} in selector '{query}'")]
    Unexpected {
        query: String,
        position: usize,
        found: char,
    },
    #[error("unterminated {what} in selector '{query}'")]
    Unterminated { query: String, what: &'static str },
    #[error("unsupported pseudo-class ':{0}'")]
    UnsupportedPseudo(String),
    #[error("combinator has no clause to replace")]
    EmptyCombinator,
}

/// Run `query` against every element of `document`, in document order.
pub fn select<'a>(document: &'a Document, query: &str) -> Result<Vec<ElementRef<'a>>, SelectorError> {
    let evaluator = parse(query)?;
    let Some(root) = document.root_element() else {
        return Ok(Vec::new());
    };
    Ok(document
        .elements()
        .filter(|element| evaluator.matches(root, *element))
        .collect())
}
