//! Evaluators that look beyond the element itself.
//!
//! Ancestor walks stop at the `root` passed to [`Evaluator::matches`], so a
//! selector evaluated against a subtree never matches outside of it.

use std::fmt;

use super::{Evaluator, EvaluatorRef};
use crate::dom::ElementRef;

/// Matches only the evaluation root.
#[derive(Debug, Clone, Copy, Default)]
pub struct Root;

impl Evaluator for Root {
    fn matches(&self, root: ElementRef<'_>, element: ElementRef<'_>) -> bool {
        root == element
    }
}

impl fmt::Display for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(":root")
    }
}

#[derive(Debug, Clone)]
pub struct Not(pub EvaluatorRef);

impl Evaluator for Not {
    fn matches(&self, root: ElementRef<'_>, element: ElementRef<'_>) -> bool {
        !self.0.matches(root, element)
    }
}

impl fmt::Display for Not {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ":not({})", self.0)
    }
}

/// Some ancestor (up to and including `root`) matches. Descendant combinator.
#[derive(Debug, Clone)]
pub struct Parent(pub EvaluatorRef);

impl Evaluator for Parent {
    fn matches(&self, root: ElementRef<'_>, element: ElementRef<'_>) -> bool {
        if root == element {
            return false;
        }
        let mut current = element.parent_element();
        while let Some(ancestor) = current {
            if self.0.matches(root, ancestor) {
                return true;
            }
            if ancestor == root {
                break;
            }
            current = ancestor.parent_element();
        }
        false
    }
}

impl fmt::Display for Parent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ":parent({})", self.0)
    }
}

/// Child combinator.
#[derive(Debug, Clone)]
pub struct ImmediateParent(pub EvaluatorRef);

impl Evaluator for ImmediateParent {
    fn matches(&self, root: ElementRef<'_>, element: ElementRef<'_>) -> bool {
        if root == element {
            return false;
        }
        element
            .parent_element()
            .is_some_and(|parent| self.0.matches(root, parent))
    }
}

impl fmt::Display for ImmediateParent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ":immediate-parent({})", self.0)
    }
}

/// General sibling combinator (`~`).
#[derive(Debug, Clone)]
pub struct PreviousSibling(pub EvaluatorRef);

impl Evaluator for PreviousSibling {
    fn matches(&self, root: ElementRef<'_>, element: ElementRef<'_>) -> bool {
        if root == element {
            return false;
        }
        let mut current = element.prev_sibling_element();
        while let Some(sibling) = current {
            if self.0.matches(root, sibling) {
                return true;
            }
            current = sibling.prev_sibling_element();
        }
        false
    }
}

impl fmt::Display for PreviousSibling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ":prev*({})", self.0)
    }
}

/// Adjacent sibling combinator (`+`).
#[derive(Debug, Clone)]
pub struct ImmediatePreviousSibling(pub EvaluatorRef);

impl Evaluator for ImmediatePreviousSibling {
    fn matches(&self, root: ElementRef<'_>, element: ElementRef<'_>) -> bool {
        if root == element {
            return false;
        }
        element
            .prev_sibling_element()
            .is_some_and(|sibling| self.0.matches(root, sibling))
    }
}

impl fmt::Display for ImmediatePreviousSibling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ":prev({})", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FirstChild;

impl Evaluator for FirstChild {
    fn matches(&self, _root: ElementRef<'_>, element: ElementRef<'_>) -> bool {
        element.parent_element().is_some() && element.prev_sibling_element().is_none()
    }
}

impl fmt::Display for FirstChild {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(":first-child")
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LastChild;

impl Evaluator for LastChild {
    fn matches(&self, _root: ElementRef<'_>, element: ElementRef<'_>) -> bool {
        element.parent_element().is_some() && element.next_sibling_element().is_none()
    }
}

impl fmt::Display for LastChild {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(":last-child")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{Document, element, text};
    use crate::select::Tag;
    use std::sync::Arc;

    fn tag(name: &str) -> EvaluatorRef {
        Arc::new(Tag(name.into()))
    }

    #[test]
    fn parent_walk_is_bounded_by_root() {
        let doc = Document::from_builder(
            element("section").child(element("div").child(element("p"))),
        );
        let section = doc.root_element().unwrap();
        let div = doc.find_element("div").unwrap();
        let p = doc.find_element("p").unwrap();

        assert!(Parent(tag("section")).matches(section, p));
        // Evaluated from the div subtree, the section is out of reach.
        assert!(!Parent(tag("section")).matches(div, p));
        assert!(Parent(tag("div")).matches(div, p));
        assert!(!Parent(tag("div")).matches(div, div));
        assert!(ImmediateParent(tag("div")).matches(section, p));
        assert!(!ImmediateParent(tag("section")).matches(section, p));
    }

    #[test]
    fn sibling_evaluators_skip_text() {
        let doc = Document::from_builder(element("ul").children([
            element("li").attr("id", "a"),
            text(" "),
            element("li").attr("id", "b"),
            element("em"),
        ]));
        let ul = doc.root_element().unwrap();
        let items: Vec<_> = ul.child_elements().collect();

        assert!(ImmediatePreviousSibling(tag("li")).matches(ul, items[1]));
        assert!(!ImmediatePreviousSibling(tag("em")).matches(ul, items[1]));
        assert!(PreviousSibling(tag("li")).matches(ul, items[2]));
        assert!(!PreviousSibling(tag("li")).matches(ul, items[0]));
        assert!(FirstChild.matches(ul, items[0]));
        assert!(!FirstChild.matches(ul, items[1]));
        assert!(LastChild.matches(ul, items[2]));
        assert!(!FirstChild.matches(ul, ul));
    }

    #[test]
    fn root_and_not() {
        let doc = Document::from_builder(element("html").child(element("body")));
        let html = doc.root_element().unwrap();
        let body = doc.find_element("body").unwrap();
        assert!(Root.matches(html, html));
        assert!(!Root.matches(html, body));
        assert!(Not(Arc::new(Root)).matches(html, body));
        assert_eq!(Not(tag("p")).to_string(), ":not(p)");
    }
}
