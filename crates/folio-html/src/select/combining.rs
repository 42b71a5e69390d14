use std::fmt;
use std::sync::Arc;

use super::{Evaluator, EvaluatorRef, SelectorError};
use crate::dom::ElementRef;

/// Evaluators built from an ordered list of clauses.
///
/// The right-most clause is the one a selector parser rewrites when it meets
/// a combinator while a group is open.
pub trait CombiningEvaluator: Evaluator {
    fn evaluators(&self) -> &[EvaluatorRef];

    fn right_most(&self) -> Option<&EvaluatorRef> {
        self.evaluators().last()
    }

    /// Swap the last clause for `replacement`, returning the old one.
    fn replace_right_most(&mut self, replacement: EvaluatorRef) -> Result<EvaluatorRef, SelectorError>;
}

/// Conjunction; vacuously true when empty.
#[derive(Debug, Clone, Default)]
pub struct And {
    evaluators: Vec<EvaluatorRef>,
}

impl And {
    pub fn new(evaluators: Vec<EvaluatorRef>) -> Self {
        Self { evaluators }
    }
}

impl Evaluator for And {
    fn matches(&self, root: ElementRef<'_>, element: ElementRef<'_>) -> bool {
        self.evaluators.iter().all(|e| e.matches(root, element))
    }
}

impl CombiningEvaluator for And {
    fn evaluators(&self) -> &[EvaluatorRef] {
        &self.evaluators
    }

    fn replace_right_most(&mut self, replacement: EvaluatorRef) -> Result<EvaluatorRef, SelectorError> {
        replace_last(&mut self.evaluators, replacement)
    }
}

impl fmt::Display for And {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, evaluator) in self.evaluators.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{evaluator}")?;
        }
        Ok(())
    }
}

/// Disjunction; false when empty.
#[derive(Debug, Clone, Default)]
pub struct Or {
    evaluators: Vec<EvaluatorRef>,
}

impl Or {
    /// Several initial clauses are first joined into a single [`And`], so
    /// `Or::new(vec![a, b])` behaves as `a AND b` until more clauses are added.
    pub fn new(evaluators: Vec<EvaluatorRef>) -> Self {
        if evaluators.len() > 1 {
            Self {
                evaluators: vec![Arc::new(And::new(evaluators))],
            }
        } else {
            Self { evaluators }
        }
    }

    pub fn add(&mut self, evaluator: EvaluatorRef) {
        self.evaluators.push(evaluator);
    }
}

impl Evaluator for Or {
    fn matches(&self, root: ElementRef<'_>, element: ElementRef<'_>) -> bool {
        self.evaluators.iter().any(|e| e.matches(root, element))
    }
}

impl CombiningEvaluator for Or {
    fn evaluators(&self) -> &[EvaluatorRef] {
        &self.evaluators
    }

    fn replace_right_most(&mut self, replacement: EvaluatorRef) -> Result<EvaluatorRef, SelectorError> {
        replace_last(&mut self.evaluators, replacement)
    }
}

impl fmt::Display for Or {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(":or[")?;
        for (i, evaluator) in self.evaluators.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{evaluator}")?;
        }
        f.write_str("]")
    }
}

fn replace_last(
    evaluators: &mut [EvaluatorRef],
    replacement: EvaluatorRef,
) -> Result<EvaluatorRef, SelectorError> {
    let last = evaluators.last_mut().ok_or(SelectorError::EmptyCombinator)?;
    Ok(std::mem::replace(last, replacement))
}
