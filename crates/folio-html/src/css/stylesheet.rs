use std::collections::HashMap;

use cssparser::{
    AtRuleParser, BasicParseErrorKind, CowRcStr, DeclarationParser, ParseError, Parser,
    ParserInput, ParserState, QualifiedRuleParser, RuleBodyItemParser, RuleBodyParser,
    StyleSheetParser,
};
use tracing::{debug, warn};

use super::StyleMap;
use super::apply::expand_shorthand;
use crate::dom::ElementRef;
use crate::select::{Selector, Specificity, parse_selector_list};

/// Where a rule came from. Author rules override normal user-agent rules;
/// for `!important` declarations the user agent wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Origin {
    UserAgent,
    Author,
}

#[derive(Debug, Clone)]
struct Declaration {
    name: String,
    value: String,
    important: bool,
}

#[derive(Debug, Clone)]
struct Rule {
    selector: Selector,
    declarations: Vec<Declaration>,
    origin: Origin,
    order: usize,
}

/// Cascade precedence; compared field by field. `position` orders the
/// declarations within one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Precedence {
    layer: Layer,
    inline: bool,
    specificity: Specificity,
    order: usize,
    position: usize,
}

/// Importance and origin combined. Important declarations reverse the
/// origin order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Layer {
    UserAgent,
    Author,
    ImportantAuthor,
    ImportantUserAgent,
}

impl Layer {
    fn of(important: bool, origin: Origin) -> Self {
        match (important, origin) {
            (false, Origin::UserAgent) => Layer::UserAgent,
            (false, Origin::Author) => Layer::Author,
            (true, Origin::Author) => Layer::ImportantAuthor,
            (true, Origin::UserAgent) => Layer::ImportantUserAgent,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StyleSheet {
    rules: Vec<Rule>,
    next_order: usize,
}

impl StyleSheet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_sources(origin: Origin, sources: &[String]) -> Self {
        let mut sheet = Self::empty();
        for css in sources {
            sheet.add_source(origin, css);
        }
        sheet
    }

    /// Append the rules of `css`. Rules whose selector fails to parse are
    /// skipped.
    pub fn add_source(&mut self, origin: Origin, css: &str) {
        for (prelude, declarations) in parse_rules(css) {
            let selectors = match parse_selector_list(&prelude) {
                Ok(selectors) => selectors,
                Err(err) => {
                    warn!(selector = %prelude, error = %err, "skipping css rule");
                    continue;
                }
            };
            if declarations.is_empty() {
                continue;
            }
            self.next_order += 1;
            for selector in selectors {
                self.rules.push(Rule {
                    selector,
                    declarations: declarations.clone(),
                    origin,
                    order: self.next_order,
                });
            }
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Cascaded declarations of `element`, with `inline` (the element's
    /// `style` attribute) taking precedence over sheet rules.
    pub fn compute_for(&self, element: ElementRef<'_>, inline: Option<&str>) -> StyleMap {
        let root = element.root_element();
        let mut winners: HashMap<String, (Precedence, String)> = HashMap::new();
        let mut matched_rules = 0usize;

        let mut offer = |decl: &Declaration, precedence: Precedence| {
            let replace = winners
                .get(&decl.name)
                .is_none_or(|(existing, _)| precedence > *existing);
            if replace {
                winners.insert(decl.name.clone(), (precedence, decl.value.clone()));
            }
        };

        for rule in &self.rules {
            if !rule.selector.matches(root, element) {
                continue;
            }
            matched_rules += 1;
            for (position, decl) in rule.declarations.iter().enumerate() {
                offer(
                    decl,
                    Precedence {
                        layer: Layer::of(decl.important, rule.origin),
                        inline: false,
                        specificity: rule.selector.specificity,
                        order: rule.order,
                        position,
                    },
                );
            }
        }

        if let Some(inline) = inline {
            for (position, decl) in parse_declarations(inline).iter().enumerate() {
                offer(
                    decl,
                    Precedence {
                        layer: Layer::of(decl.important, Origin::Author),
                        inline: true,
                        specificity: Specificity::default(),
                        order: usize::MAX,
                        position,
                    },
                );
            }
        }

        debug!(tag = %element.name(), matched_rules, properties = winners.len(), "cascade applied");
        winners
            .into_iter()
            .map(|(name, (_, value))| (name, value))
            .collect()
    }
}

/// Parse a stylesheet into `(prelude, declarations)` pairs. At-rules are
/// dropped with their blocks; media queries are not evaluated.
fn parse_rules(css: &str) -> Vec<(String, Vec<Declaration>)> {
    let mut input = ParserInput::new(css);
    let mut parser = Parser::new(&mut input);
    let mut rules = RuleListParser;
    StyleSheetParser::new(&mut parser, &mut rules)
        .filter_map(|rule| match rule {
            Ok(rule) => Some(rule),
            Err((_, source)) => {
                debug!(rule = %source.trim(), "dropping css rule");
                None
            }
        })
        .collect()
}

/// Parse the contents of a declaration block or a `style` attribute.
fn parse_declarations(source: &str) -> Vec<Declaration> {
    let mut input = ParserInput::new(source);
    let mut parser = Parser::new(&mut input);
    declarations_in(&mut parser)
}

fn declarations_in(block: &mut Parser<'_, '_>) -> Vec<Declaration> {
    let mut body = DeclarationBlock;
    RuleBodyParser::new(block, &mut body)
        .flatten()
        .flatten()
        .collect()
}

struct RuleListParser;

impl<'i> QualifiedRuleParser<'i> for RuleListParser {
    type Prelude = String;
    type QualifiedRule = (String, Vec<Declaration>);
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, ParseError<'i, Self::Error>> {
        let start = input.position();
        while input.next_including_whitespace_and_comments().is_ok() {}
        Ok(strip_css_comments(input.slice_from(start)).trim().to_string())
    }

    fn parse_block<'t>(
        &mut self,
        prelude: Self::Prelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::QualifiedRule, ParseError<'i, Self::Error>> {
        Ok((prelude, declarations_in(input)))
    }
}

impl<'i> AtRuleParser<'i> for RuleListParser {
    type Prelude = ();
    type AtRule = (String, Vec<Declaration>);
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        _name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, ParseError<'i, Self::Error>> {
        while input.next().is_ok() {}
        Ok(())
    }

    fn parse_block<'t>(
        &mut self,
        _prelude: Self::Prelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::AtRule, ParseError<'i, Self::Error>> {
        Err(input.new_error(BasicParseErrorKind::AtRuleBodyInvalid))
    }

    fn rule_without_block(
        &mut self,
        _prelude: Self::Prelude,
        _start: &ParserState,
    ) -> Result<Self::AtRule, Self::Error> {
        Err(())
    }
}

/// Declarations of one block. Supported shorthands are replaced by their
/// longhands in place, so later declarations still override them.
struct DeclarationBlock;

impl<'i> DeclarationParser<'i> for DeclarationBlock {
    type Declaration = Vec<Declaration>;
    type Error = ();

    fn parse_value<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
        _start: &ParserState,
    ) -> Result<Self::Declaration, ParseError<'i, Self::Error>> {
        let start = input.position();
        while input.next_including_whitespace_and_comments().is_ok() {}
        let (value, important) = strip_important(input.slice_from(start).trim());
        let name = name.to_ascii_lowercase();
        if value.is_empty() {
            return Ok(Vec::new());
        }
        Ok(match expand_shorthand(&name, value) {
            Some(longhands) => longhands
                .into_iter()
                .map(|(name, value)| Declaration {
                    name,
                    value,
                    important,
                })
                .collect(),
            None => vec![Declaration {
                name,
                value: value.to_string(),
                important,
            }],
        })
    }
}

impl<'i> AtRuleParser<'i> for DeclarationBlock {
    type Prelude = ();
    type AtRule = Vec<Declaration>;
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, ParseError<'i, Self::Error>> {
        Err(input.new_error(BasicParseErrorKind::AtRuleInvalid(name)))
    }

    fn parse_block<'t>(
        &mut self,
        _prelude: Self::Prelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::AtRule, ParseError<'i, Self::Error>> {
        Err(input.new_error(BasicParseErrorKind::AtRuleBodyInvalid))
    }

    fn rule_without_block(
        &mut self,
        _prelude: Self::Prelude,
        _start: &ParserState,
    ) -> Result<Self::AtRule, Self::Error> {
        Err(())
    }
}

impl<'i> QualifiedRuleParser<'i> for DeclarationBlock {
    type Prelude = ();
    type QualifiedRule = Vec<Declaration>;
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, ParseError<'i, Self::Error>> {
        Err(input.new_error(BasicParseErrorKind::QualifiedRuleInvalid))
    }

    fn parse_block<'t>(
        &mut self,
        _prelude: Self::Prelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::QualifiedRule, ParseError<'i, Self::Error>> {
        Err(input.new_error(BasicParseErrorKind::QualifiedRuleInvalid))
    }
}

impl<'i> RuleBodyItemParser<'i, Vec<Declaration>, ()> for DeclarationBlock {
    fn parse_declarations(&self) -> bool {
        true
    }

    fn parse_qualified(&self) -> bool {
        false
    }
}

fn strip_css_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    let mut in_comment = false;
    while let Some(ch) = chars.next() {
        if in_comment {
            if ch == '*' && chars.peek() == Some(&'/') {
                chars.next();
                in_comment = false;
            }
        } else if ch == '/' && chars.peek() == Some(&'*') {
            chars.next();
            in_comment = true;
        } else {
            out.push(ch);
        }
    }
    out
}

fn strip_important(value: &str) -> (&str, bool) {
    if let Some(pos) = value.rfind('!') {
        if value[pos + 1..].trim().eq_ignore_ascii_case("important") {
            return (value[..pos].trim_end(), true);
        }
    }
    (value, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{Document, element};

    fn doc() -> Document {
        Document::from_builder(element("html").child(element("body").child(
            element("p").attr("id", "intro").attr("class", "lead").attr("style", "color: green"),
        )))
    }

    #[test]
    fn specificity_then_order_decides() {
        let doc = doc();
        let p = doc.find_element("p").unwrap();
        let sheet = StyleSheet::from_sources(
            Origin::Author,
            &["p.lead { margin: 1pt } p { margin: 2pt; font-weight: bold } p { font-weight: normal }"
                .to_string()],
        );
        let styles = sheet.compute_for(p, None);
        assert_eq!(styles["margin-top"], "1pt");
        assert_eq!(styles["margin-left"], "1pt");
        assert_eq!(styles["font-weight"], "normal");
    }

    #[test]
    fn inline_and_important() {
        let doc = doc();
        let p = doc.find_element("p").unwrap();
        let mut sheet = StyleSheet::empty();
        sheet.add_source(Origin::UserAgent, "p { color: black !important; display: block }");
        sheet.add_source(Origin::Author, "#intro { color: red } p { display: inline }");
        let styles = sheet.compute_for(p, p.attr("style"));
        // Important beats inline; author beats user agent.
        assert_eq!(styles["color"], "black");
        assert_eq!(styles["display"], "inline");

        let mut plain = StyleSheet::empty();
        plain.add_source(Origin::Author, "#intro { color: red }");
        assert_eq!(plain.compute_for(p, p.attr("style"))["color"], "green");
    }

    #[test]
    fn comments_and_at_rules_are_skipped() {
        let css = r#"
            @charset "utf-8";
            @import url(other.css);
            /* p { color: blue } */
            @media print { p { color: gray } }
            @font-face { font-family: X; src: url(x.ttf) }
            p { color: navy }
            p:hover { color: pink }
        "#;
        let sheet = StyleSheet::from_sources(Origin::Author, &[css.to_string()]);
        assert_eq!(sheet.len(), 1);
        let doc = doc();
        let styles = sheet.compute_for(doc.find_element("p").unwrap(), None);
        assert_eq!(styles["color"], "navy");
    }

    #[test]
    fn selector_lists_keep_their_own_specificity() {
        let sheet = StyleSheet::from_sources(
            Origin::Author,
            &["#intro, body { font-size: 20pt } p { font-size: 10pt }".to_string()],
        );
        let doc = doc();
        let p = doc.find_element("p").unwrap();
        let body = doc.find_element("body").unwrap();
        assert_eq!(sheet.compute_for(p, None)["font-size"], "20pt");
        assert_eq!(sheet.compute_for(body, None)["font-size"], "20pt");
    }

    #[test]
    fn shorthands_expand_where_declared() {
        let doc = doc();
        let p = doc.find_element("p").unwrap();
        let mut sheet = StyleSheet::empty();
        sheet.add_source(Origin::UserAgent, "p { margin-top: 1em }");
        sheet.add_source(Origin::Author, "p { margin-left: 9pt; margin: 2pt 4pt; padding: 1pt; padding-top: 3pt }");
        let styles = sheet.compute_for(p, Some("outline: 1px solid red"));
        assert_eq!(styles["margin-top"], "2pt");
        assert_eq!(styles["margin-left"], "4pt");
        assert_eq!(styles["padding-top"], "3pt");
        assert_eq!(styles["padding-bottom"], "1pt");
        assert_eq!(styles["outline-style"], "solid");
        assert!(!styles.contains_key("margin"));
    }

    #[test]
    fn quoted_and_url_values_keep_their_delimiters() {
        let doc = doc();
        let p = doc.find_element("p").unwrap();
        let sheet = StyleSheet::from_sources(
            Origin::Author,
            &[r#"p { font-family: "A;B", serif; color: red; background-image: url("x}.png") }
                 p { text-decoration: underline }"#
                .to_string()],
        );
        assert_eq!(sheet.len(), 2);
        let styles = sheet.compute_for(p, Some("content: ';'; font-weight: bold"));
        assert_eq!(styles["font-family"], r#""A;B", serif"#);
        assert_eq!(styles["color"], "red");
        assert_eq!(styles["background-image"], r#"url("x}.png")"#);
        assert_eq!(styles["text-decoration"], "underline");
        assert_eq!(styles["content"], "';'");
        assert_eq!(styles["font-weight"], "bold");
    }

    #[test]
    fn malformed_declarations_do_not_poison_the_block() {
        let doc = doc();
        let p = doc.find_element("p").unwrap();
        let sheet = StyleSheet::from_sources(
            Origin::Author,
            &["p { color red; : blue; font-style: italic; width: }".to_string()],
        );
        let styles = sheet.compute_for(p, None);
        assert_eq!(styles.get("font-style").map(String::as_str), Some("italic"));
        assert!(!styles.contains_key("color"));
        assert!(!styles.contains_key("width"));
    }

    #[test]
    fn user_agent_important_beats_author_important() {
        let doc = doc();
        let p = doc.find_element("p").unwrap();
        let mut sheet = StyleSheet::empty();
        sheet.add_source(Origin::UserAgent, "p { color: black !important; margin-top: 1pt }");
        sheet.add_source(Origin::Author, "#intro { color: red !important } p { margin-top: 2pt !important }");
        let styles = sheet.compute_for(p, None);
        assert_eq!(styles["color"], "black");
        assert_eq!(styles["margin-top"], "2pt");

        let mut author = StyleSheet::empty();
        author.add_source(Origin::Author, "#intro { color: red !important }");
        let styles = author.compute_for(p, Some("color: green !important"));
        assert_eq!(styles["color"], "green");
    }

    #[test]
    fn important_suffix_parsing() {
        assert_eq!(strip_important("red ! important"), ("red", true));
        assert_eq!(strip_important("url(a!b.png)"), ("url(a!b.png)", false));
    }
}
