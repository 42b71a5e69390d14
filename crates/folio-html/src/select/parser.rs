//! Selector query parser.
//!
//! Compound selectors are parsed left to right. A combinator rewrites the
//! clause built so far into `And([next, Structural(previous)])`; once a `,`
//! has opened a group, combinators rewrite the group's right-most clause
//! instead, so `a b, c d` yields `Or[b ∧ parent(a), d ∧ parent(c)]`.

use std::fmt;
use std::sync::Arc;

use super::{
    AllElements, And, AttrOp, Attribute, AttributeValue, Class, CombiningEvaluator, Evaluator,
    EvaluatorRef, FirstChild, Id, ImmediateParent, ImmediatePreviousSibling, LastChild, Not, Or,
    Parent, PreviousSibling, Root, SelectorError, Tag,
};
use crate::dom::ElementRef;

/// Selector specificity as `(ids, classes, tags)`, compared lexicographically.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Specificity {
    pub ids: u32,
    pub classes: u32,
    pub tags: u32,
}

impl std::ops::AddAssign for Specificity {
    fn add_assign(&mut self, other: Self) {
        self.ids += other.ids;
        self.classes += other.classes;
        self.tags += other.tags;
    }
}

/// A parsed selector together with its source text and specificity.
#[derive(Debug, Clone)]
pub struct Selector {
    pub text: String,
    pub evaluator: EvaluatorRef,
    pub specificity: Specificity,
}

impl Selector {
    pub fn matches(&self, root: ElementRef<'_>, element: ElementRef<'_>) -> bool {
        self.evaluator.matches(root, element)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Compile a selector query into an evaluator.
pub fn parse(query: &str) -> Result<EvaluatorRef, SelectorError> {
    QueryParser::new(query).parse().map(|(evaluator, _)| evaluator)
}

/// Compile a selector; for a group the highest clause specificity is kept.
pub fn parse_selector(text: &str) -> Result<Selector, SelectorError> {
    let (evaluator, clauses) = QueryParser::new(text).parse()?;
    Ok(Selector {
        text: text.trim().to_string(),
        evaluator,
        specificity: clauses.into_iter().max().unwrap_or_default(),
    })
}

/// Split a rule prelude on top-level commas and compile each selector.
pub fn parse_selector_list(text: &str) -> Result<Vec<Selector>, SelectorError> {
    split_top_level(text)
        .into_iter()
        .map(parse_selector)
        .collect()
}

fn split_top_level(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(' | '[') => depth += 1,
            (None, ')' | ']') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                parts.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

struct QueryParser<'q> {
    query: &'q str,
    chars: Vec<char>,
    pos: usize,
}

impl<'q> QueryParser<'q> {
    fn new(query: &'q str) -> Self {
        Self {
            query,
            chars: query.trim().chars().collect(),
            pos: 0,
        }
    }

    /// Returns the evaluator and the specificity of each comma clause.
    fn parse(mut self) -> Result<(EvaluatorRef, Vec<Specificity>), SelectorError> {
        if self.chars.is_empty() {
            return Err(SelectorError::Empty);
        }

        let mut specificities = Vec::new();
        let mut clause = Specificity::default();
        let mut group: Option<Or> = None;
        let mut current = self.compound(&mut clause)?;

        loop {
            let had_space = self.skip_whitespace();
            let Some(c) = self.peek() else {
                break;
            };
            if c == ',' {
                self.pos += 1;
                self.skip_whitespace();
                specificities.push(std::mem::take(&mut clause));
                let next = self.compound(&mut clause)?;
                match group.as_mut() {
                    Some(or) => or.add(next),
                    None => {
                        let mut or = Or::new(vec![Arc::clone(&current)]);
                        or.add(next);
                        group = Some(or);
                    }
                }
            } else if matches!(c, '>' | '+' | '~') || had_space {
                let combinator = if matches!(c, '>' | '+' | '~') {
                    self.pos += 1;
                    self.skip_whitespace();
                    c
                } else {
                    ' '
                };
                let next = self.compound(&mut clause)?;
                match group.as_mut() {
                    Some(or) => {
                        let previous = or
                            .right_most()
                            .cloned()
                            .ok_or(SelectorError::EmptyCombinator)?;
                        or.replace_right_most(combine(combinator, previous, next))?;
                    }
                    None => current = combine(combinator, current, next),
                }
            } else {
                return Err(self.unexpected(c));
            }
        }
        specificities.push(clause);

        let evaluator = match group {
            Some(or) => Arc::new(or) as EvaluatorRef,
            None => current,
        };
        Ok((evaluator, specificities))
    }

    /// One compound selector such as `p.note#main[lang]:first-child`.
    fn compound(&mut self, specificity: &mut Specificity) -> Result<EvaluatorRef, SelectorError> {
        let mut parts: Vec<EvaluatorRef> = Vec::new();
        while let Some(c) = self.peek() {
            if c.is_whitespace() || matches!(c, ',' | '>' | '+' | '~') {
                break;
            }
            let part: EvaluatorRef = match c {
                '*' => {
                    self.pos += 1;
                    Arc::new(AllElements)
                }
                '#' => {
                    self.pos += 1;
                    specificity.ids += 1;
                    Arc::new(Id(self.identifier()?))
                }
                '.' => {
                    self.pos += 1;
                    specificity.classes += 1;
                    Arc::new(Class(self.identifier()?))
                }
                '[' => {
                    self.pos += 1;
                    specificity.classes += 1;
                    self.attribute()?
                }
                ':' => {
                    self.pos += 1;
                    self.pseudo(specificity)?
                }
                c if is_identifier_char(c) => {
                    specificity.tags += 1;
                    Arc::new(Tag(self.identifier()?.to_ascii_lowercase()))
                }
                c => return Err(self.unexpected(c)),
            };
            parts.push(part);
        }

        match parts.len() {
            0 => match self.peek() {
                Some(c) => Err(self.unexpected(c)),
                None => Err(SelectorError::Unterminated {
                    query: self.query.to_string(),
                    what: "combinator",
                }),
            },
            1 => Ok(parts.remove(0)),
            _ => Ok(Arc::new(And::new(parts))),
        }
    }

    fn attribute(&mut self) -> Result<EvaluatorRef, SelectorError> {
        self.skip_whitespace();
        let name = self.identifier()?.to_ascii_lowercase();
        self.skip_whitespace();
        let op = match (self.peek(), self.peek_at(1)) {
            (Some(']'), _) => {
                self.pos += 1;
                return Ok(Arc::new(Attribute(name)));
            }
            (Some('='), _) => {
                self.pos += 1;
                AttrOp::Equals
            }
            (Some(c), Some('=')) => {
                let op = match c {
                    '~' => AttrOp::Includes,
                    '|' => AttrOp::DashMatch,
                    '^' => AttrOp::Prefix,
                    '$' => AttrOp::Suffix,
                    '*' => AttrOp::Substring,
                    other => return Err(self.unexpected(other)),
                };
                self.pos += 2;
                op
            }
            (Some(c), _) => return Err(self.unexpected(c)),
            (None, _) => return Err(self.unterminated("attribute selector")),
        };
        self.skip_whitespace();
        let value = match self.peek() {
            Some(q @ ('"' | '\'')) => {
                self.pos += 1;
                let start = self.pos;
                while self.peek().is_some_and(|c| c != q) {
                    self.pos += 1;
                }
                if self.peek().is_none() {
                    return Err(self.unterminated("string"));
                }
                let value: String = self.chars[start..self.pos].iter().collect();
                self.pos += 1;
                value
            }
            _ => self.identifier()?,
        };
        self.skip_whitespace();
        match self.peek() {
            Some(']') => self.pos += 1,
            Some(c) => return Err(self.unexpected(c)),
            None => return Err(self.unterminated("attribute selector")),
        }
        Ok(Arc::new(AttributeValue { name, op, value }))
    }

    fn pseudo(&mut self, specificity: &mut Specificity) -> Result<EvaluatorRef, SelectorError> {
        let name = self.identifier()?.to_ascii_lowercase();
        match name.as_str() {
            "root" => {
                specificity.classes += 1;
                Ok(Arc::new(Root))
            }
            "first-child" => {
                specificity.classes += 1;
                Ok(Arc::new(FirstChild))
            }
            "last-child" => {
                specificity.classes += 1;
                Ok(Arc::new(LastChild))
            }
            "not" => {
                let inner = self.parenthesised()?;
                let (evaluator, clauses) = QueryParser::new(&inner).parse()?;
                if let Some(max) = clauses.into_iter().max() {
                    *specificity += max;
                }
                Ok(Arc::new(Not(evaluator)))
            }
            _ => Err(SelectorError::UnsupportedPseudo(name)),
        }
    }

    /// Text between a `(` at the cursor and its matching `)`.
    fn parenthesised(&mut self) -> Result<String, SelectorError> {
        match self.peek() {
            Some('(') => self.pos += 1,
            Some(c) => return Err(self.unexpected(c)),
            None => return Err(self.unterminated("pseudo-class argument")),
        }
        let start = self.pos;
        let mut depth = 1usize;
        while let Some(c) = self.peek() {
            match c {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        let inner = self.chars[start..self.pos].iter().collect();
                        self.pos += 1;
                        return Ok(inner);
                    }
                }
                _ => {}
            }
            self.pos += 1;
        }
        Err(self.unterminated("pseudo-class argument"))
    }

    fn identifier(&mut self) -> Result<String, SelectorError> {
        let start = self.pos;
        while self.peek().is_some_and(is_identifier_char) {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(match self.peek() {
                Some(c) => self.unexpected(c),
                None => self.unterminated("selector"),
            });
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn unexpected(&self, found: char) -> SelectorError {
        SelectorError::Unexpected {
            query: self.query.to_string(),
            position: self.pos,
            found,
        }
    }

    fn unterminated(&self, what: &'static str) -> SelectorError {
        SelectorError::Unterminated {
            query: self.query.to_string(),
            what,
        }
    }
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
}

fn combine(combinator: char, previous: EvaluatorRef, next: EvaluatorRef) -> EvaluatorRef {
    let structural: EvaluatorRef = match combinator {
        '>' => Arc::new(ImmediateParent(previous)),
        '+' => Arc::new(ImmediatePreviousSibling(previous)),
        '~' => Arc::new(PreviousSibling(previous)),
        _ => Arc::new(Parent(previous)),
    };
    Arc::new(And::new(vec![next, structural]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structure_of_combined_selectors() {
        assert_eq!(parse("div > p").unwrap().to_string(), "p :immediate-parent(div)");
        assert_eq!(parse("a b, c d").unwrap().to_string(), ":or[b :parent(a), d :parent(c)]");
        assert_eq!(parse("h1 + p ~ ul").unwrap().to_string(), "ul :prev*(p :prev(h1))");
        assert_eq!(parse("p.note#x").unwrap().to_string(), "p .note #x");
    }

    #[test]
    fn group_then_combinator_rewrites_last_clause_only() {
        assert_eq!(parse("a, b > c").unwrap().to_string(), ":or[a, c :immediate-parent(b)]");
    }

    #[test]
    fn specificity_counts() {
        let s = |text: &str| parse_selector(text).unwrap().specificity;
        assert_eq!(s("p"), Specificity { ids: 0, classes: 0, tags: 1 });
        assert_eq!(s("div p.note"), Specificity { ids: 0, classes: 1, tags: 2 });
        assert_eq!(s("#main [lang]"), Specificity { ids: 1, classes: 1, tags: 0 });
        assert_eq!(s("li:not(.done)"), Specificity { ids: 0, classes: 1, tags: 1 });
        assert_eq!(s("*"), Specificity::default());
        assert!(s("#a") > s(".a.b.c"));
    }

    #[test]
    fn selector_list_respects_nesting() {
        let list = parse_selector_list("p, a[title='x, y'], :not(b, i)").unwrap();
        let texts: Vec<_> = list.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["p", "a[title='x, y']", ":not(b, i)"]);
    }

    #[test]
    fn attribute_values() {
        assert_eq!(parse("[href^=\"http\"]").unwrap().to_string(), "[href^=http]");
        assert_eq!(parse("[ lang |= en ]").unwrap().to_string(), "[lang|=en]");
        assert!(parse("[href").is_err());
        assert!(parse("[href=\"x]").is_err());
    }

    #[test]
    fn errors() {
        assert_eq!(parse("   ").unwrap_err(), SelectorError::Empty);
        assert!(matches!(
            parse("p >").unwrap_err(),
            SelectorError::Unterminated { what: "combinator", .. }
        ));
        assert!(matches!(parse("p, ,a").unwrap_err(), SelectorError::Unexpected { found: ',', .. }));
        assert!(matches!(parse("p:not(a").unwrap_err(), SelectorError::Unterminated { .. }));
        assert_eq!(
            parse("a::before").unwrap_err(),
            SelectorError::Unexpected {
                query: "a::before".into(),
                position: 2,
                found: ':'
            }
        );
    }
}
