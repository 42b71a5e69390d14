use std::fmt;

use super::Evaluator;
use crate::dom::ElementRef;

/// `*`
#[derive(Debug, Clone, Copy, Default)]
pub struct AllElements;

impl Evaluator for AllElements {
    fn matches(&self, _root: ElementRef<'_>, _element: ElementRef<'_>) -> bool {
        true
    }
}

impl fmt::Display for AllElements {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("*")
    }
}

/// Type selector; tag names compare ASCII case-insensitively.
#[derive(Debug, Clone)]
pub struct Tag(pub String);

impl Evaluator for Tag {
    fn matches(&self, _root: ElementRef<'_>, element: ElementRef<'_>) -> bool {
        element.name().eq_ignore_ascii_case(&self.0)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Id(pub String);

impl Evaluator for Id {
    fn matches(&self, _root: ElementRef<'_>, element: ElementRef<'_>) -> bool {
        element.value().id() == Some(self.0.as_str())
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Class(pub String);

impl Evaluator for Class {
    fn matches(&self, _root: ElementRef<'_>, element: ElementRef<'_>) -> bool {
        element.value().has_class(&self.0)
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ".{}", self.0)
    }
}

/// `[name]`: attribute presence.
#[derive(Debug, Clone)]
pub struct Attribute(pub String);

impl Evaluator for Attribute {
    fn matches(&self, _root: ElementRef<'_>, element: ElementRef<'_>) -> bool {
        element.attr(&self.0).is_some()
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrOp {
    /// `=`
    Equals,
    /// `~=` whitespace-separated word
    Includes,
    /// `|=` exact or followed by `-`
    DashMatch,
    /// `^=`
    Prefix,
    /// `$=`
    Suffix,
    /// `*=`
    Substring,
}

impl AttrOp {
    fn symbol(self) -> &'static str {
        match self {
            AttrOp::Equals => "=",
            AttrOp::Includes => "~=",
            AttrOp::DashMatch => "|=",
            AttrOp::Prefix => "^=",
            AttrOp::Suffix => "$=",
            AttrOp::Substring => "*=",
        }
    }
}

/// `[name<op>value]`
#[derive(Debug, Clone)]
pub struct AttributeValue {
    pub name: String,
    pub op: AttrOp,
    pub value: String,
}

impl Evaluator for AttributeValue {
    fn matches(&self, _root: ElementRef<'_>, element: ElementRef<'_>) -> bool {
        let Some(actual) = element.attr(&self.name) else {
            return false;
        };
        let expected = self.value.as_str();
        match self.op {
            AttrOp::Equals => actual == expected,
            AttrOp::Includes => actual.split_whitespace().any(|word| word == expected),
            AttrOp::DashMatch => {
                actual == expected
                    || actual
                        .strip_prefix(expected)
                        .is_some_and(|rest| rest.starts_with('-'))
            }
            // Empty values never match for the substring forms.
            AttrOp::Prefix => !expected.is_empty() && actual.starts_with(expected),
            AttrOp::Suffix => !expected.is_empty() && actual.ends_with(expected),
            AttrOp::Substring => !expected.is_empty() && actual.contains(expected),
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}{}{}]", self.name, self.op.symbol(), self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{Document, element};

    #[test]
    fn attribute_operators() {
        let doc = Document::from_builder(
            element("a")
                .attr("href", "https://example.com/page.pdf")
                .attr("rel", "nofollow noopener")
                .attr("lang", "en"),
        );
        let a = doc.root_element().unwrap();
        let check = |name: &str, op, value: &str| {
            AttributeValue {
                name: name.into(),
                op,
                value: value.into(),
            }
            .matches(a, a)
        };
        assert!(check("href", AttrOp::Prefix, "https://"));
        assert!(check("href", AttrOp::Suffix, ".pdf"));
        assert!(check("href", AttrOp::Substring, "example"));
        assert!(!check("href", AttrOp::Substring, ""));
        assert!(check("rel", AttrOp::Includes, "noopener"));
        assert!(!check("rel", AttrOp::Includes, "noop"));
        assert!(check("lang", AttrOp::DashMatch, "en"));
        assert!(!check("lang", AttrOp::Equals, "EN"));
        assert!(!check("missing", AttrOp::Equals, ""));
    }

    #[test]
    fn tag_is_case_insensitive() {
        let doc = Document::from_builder(element("DIV"));
        let div = doc.root_element().unwrap();
        assert!(Tag("div".into()).matches(div, div));
        assert!(Tag("Div".into()).matches(div, div));
        assert_eq!(Tag("div".into()).to_string(), "div");
    }
}
