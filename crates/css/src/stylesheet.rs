//! Stylesheet model
//!
//! A CSSOM-shaped view of loaded stylesheets: each sheet exposes its
//! top-level rules with serialized selector and declaration text. The
//! parser is lenient and never fails; unterminated blocks are closed at
//! end of input.

use crate::error::{CssError, CssResult};

/// A top-level or nested CSS rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CssRule {
    /// `selector { declarations }`
    Style(StyleRule),
    /// `@media condition { rules }`
    Media(MediaRule),
    /// Any other at-rule, kept as text
    Other(String),
}

impl CssRule {
    /// Selector text of a style rule
    pub fn selector_text(&self) -> Option<&str> {
        match self {
            CssRule::Style(rule) => Some(&rule.selector_text),
            _ => None,
        }
    }
}

/// A style rule (selector block)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleRule {
    /// Whitespace-normalized selector list
    pub selector_text: String,
    /// Declaration block contents, whitespace-normalized
    pub css_text: String,
}

/// @media rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRule {
    /// Media query
    pub condition: String,
    /// Rules inside the media block
    pub rules: Vec<CssRule>,
}

/// A loaded stylesheet
#[derive(Debug, Clone, Default)]
pub struct StyleSheet {
    href: Option<String>,
    origin_clean: bool,
    rules: Vec<CssRule>,
}

impl StyleSheet {
    /// Parse a same-origin stylesheet
    pub fn parse(input: &str) -> Self {
        let rules = RuleParser::new(input).parse_rules(false);
        log::trace!("Parsed stylesheet with {} rules", rules.len());
        Self {
            href: None,
            origin_clean: true,
            rules,
        }
    }

    /// Parse a stylesheet loaded from another origin; its rules are not readable
    pub fn cross_origin(href: impl Into<String>, input: &str) -> Self {
        Self {
            href: Some(href.into()),
            origin_clean: false,
            ..Self::parse(input)
        }
    }

    /// Set the URL the sheet was loaded from
    pub fn with_href(mut self, href: impl Into<String>) -> Self {
        self.href = Some(href.into());
        self
    }

    pub fn href(&self) -> Option<&str> {
        self.href.as_deref()
    }

    /// Top-level rules (`cssRules`), refused for cross-origin sheets
    pub fn css_rules(&self) -> CssResult<&[CssRule]> {
        if !self.origin_clean {
            return Err(CssError::SecurityError {
                href: self.href.clone().unwrap_or_default(),
            });
        }
        Ok(&self.rules)
    }
}

/// Ordered list of loaded stylesheets (`document.styleSheets`)
#[derive(Debug, Clone, Default)]
pub struct StyleSheetList {
    sheets: Vec<StyleSheet>,
}

impl StyleSheetList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sheet: StyleSheet) {
        self.sheets.push(sheet);
    }

    pub fn get(&self, index: usize) -> Option<&StyleSheet> {
        self.sheets.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StyleSheet> {
        self.sheets.iter()
    }

    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }
}

impl FromIterator<StyleSheet> for StyleSheetList {
    fn from_iter<I: IntoIterator<Item = StyleSheet>>(iter: I) -> Self {
        Self {
            sheets: iter.into_iter().collect(),
        }
    }
}

/// Collapse whitespace runs and put a single space after commas
fn normalize_selector(text: &str) -> String {
    text.split(',')
        .map(|part| part.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join(", ")
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove `/* ... */` comments outside of strings
fn strip_comments(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        match quote {
            Some(q) => {
                output.push(c);
                if c == '\\' {
                    if let Some(escaped) = chars.next() {
                        output.push(escaped);
                    }
                } else if c == q {
                    quote = None;
                }
            }
            None => {
                if c == '/' && chars.peek() == Some(&'*') {
                    chars.next();
                    let mut prev = '\0';
                    for c in chars.by_ref() {
                        if prev == '*' && c == '/' {
                            break;
                        }
                        prev = c;
                    }
                    output.push(' ');
                } else {
                    if c == '"' || c == '\'' {
                        quote = Some(c);
                    }
                    output.push(c);
                }
            }
        }
    }

    output
}

/// Character-level rule splitter
struct RuleParser {
    chars: Vec<char>,
    pos: usize,
}

impl RuleParser {
    fn new(input: &str) -> Self {
        Self {
            chars: strip_comments(input).chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    /// Parse rules until end of input, or until the closing brace of a
    /// nested block when `nested`
    fn parse_rules(&mut self, nested: bool) -> Vec<CssRule> {
        let mut rules = Vec::new();

        loop {
            self.skip_whitespace();

            match self.peek() {
                None => break,
                Some('}') => {
                    self.pos += 1;
                    if nested {
                        break;
                    }
                    // Stray brace at top level
                }
                Some('@') => {
                    if let Some(rule) = self.parse_at_rule() {
                        rules.push(rule);
                    }
                }
                Some(_) => {
                    if let Some(rule) = self.parse_style_rule() {
                        rules.push(rule);
                    }
                }
            }
        }

        rules
    }

    fn parse_at_rule(&mut self) -> Option<CssRule> {
        // Consume '@'
        self.pos += 1;
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '-' || c == '_') {
            self.pos += 1;
        }
        let name: String = self.chars[start..self.pos].iter().collect::<String>().to_ascii_lowercase();

        let (prelude, terminator) = self.collect_prelude();
        let prelude = collapse_whitespace(&prelude);
        let head = if prelude.is_empty() {
            format!("@{}", name)
        } else {
            format!("@{} {}", name, prelude)
        };

        match terminator {
            Some('{') if name == "media" => {
                let rules = self.parse_rules(true);
                Some(CssRule::Media(MediaRule { condition: prelude, rules }))
            }
            Some('{') => {
                let block = collapse_whitespace(&self.collect_block());
                Some(CssRule::Other(format!("{} {{ {} }}", head, block)))
            }
            None if name.is_empty() => None,
            _ => Some(CssRule::Other(format!("{};", head))),
        }
    }

    fn parse_style_rule(&mut self) -> Option<CssRule> {
        let (prelude, terminator) = self.collect_prelude();

        match terminator {
            Some('{') => {
                let body = self.collect_block();
                let selector_text = normalize_selector(&prelude);
                if selector_text.is_empty() {
                    return None;
                }
                Some(CssRule::Style(StyleRule {
                    selector_text,
                    css_text: collapse_whitespace(&body),
                }))
            }
            // A selector ended by ';' or end of input has no block; drop it
            _ => None,
        }
    }

    /// Collect text up to (and consume) the next top-level `{` or `;`
    fn collect_prelude(&mut self) -> (String, Option<char>) {
        let mut text = String::new();
        let mut quote: Option<char> = None;

        while let Some(c) = self.peek() {
            self.pos += 1;
            match quote {
                Some(q) => {
                    if c == q {
                        quote = None;
                    }
                    text.push(c);
                }
                None => match c {
                    '{' | ';' => return (text, Some(c)),
                    '"' | '\'' => {
                        quote = Some(c);
                        text.push(c);
                    }
                    _ => text.push(c),
                },
            }
        }

        (text, None)
    }

    /// Collect a block body after its `{`, consuming the matching `}`
    fn collect_block(&mut self) -> String {
        let mut text = String::new();
        let mut depth = 1usize;
        let mut quote: Option<char> = None;

        while let Some(c) = self.peek() {
            self.pos += 1;
            match quote {
                Some(q) => {
                    if c == q {
                        quote = None;
                    }
                }
                None => match c {
                    '"' | '\'' => quote = Some(c),
                    '{' => depth += 1,
                    '}' => {
                        depth -= 1;
                        if depth == 0 {
                            return text;
                        }
                    }
                    _ => {}
                },
            }
            text.push(c);
        }

        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style_rules(sheet: &StyleSheet) -> Vec<(String, String)> {
        sheet
            .css_rules()
            .unwrap()
            .iter()
            .filter_map(|rule| match rule {
                CssRule::Style(r) => Some((r.selector_text.clone(), r.css_text.clone())),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_simple_rule() {
        let sheet = StyleSheet::parse(".foo { color: red; }");
        assert_eq!(
            style_rules(&sheet),
            vec![(".foo".to_string(), "color: red;".to_string())]
        );
    }

    #[test]
    fn test_multiple_rules() {
        let sheet = StyleSheet::parse("p { color: red; } div{color:blue}\n span {\n  color: green;\n}");
        let rules = style_rules(&sheet);

        assert_eq!(rules.len(), 3);
        assert_eq!(rules[1], ("div".to_string(), "color:blue".to_string()));
        assert_eq!(rules[2], ("span".to_string(), "color: green;".to_string()));
    }

    #[test]
    fn test_selector_normalization() {
        let sheet = StyleSheet::parse("h1,h2 ,\n  h3   .x { margin: 0 }");
        assert_eq!(
            sheet.css_rules().unwrap()[0].selector_text(),
            Some("h1, h2, h3 .x")
        );
    }

    #[test]
    fn test_comment_ignored() {
        let sheet = StyleSheet::parse("/* .foo { color: red; } */ .bar { /* note */ color: blue; }");
        assert_eq!(
            style_rules(&sheet),
            vec![(".bar".to_string(), "color: blue;".to_string())]
        );
    }

    #[test]
    fn test_braces_inside_strings() {
        let sheet = StyleSheet::parse(".q::before { content: \"}\"; color: red; } .next { top: 0; }");
        let rules = style_rules(&sheet);

        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].1, "content: \"}\"; color: red;");
    }

    #[test]
    fn test_media_rule() {
        let sheet = StyleSheet::parse("@media screen and (max-width: 600px) { .foo { color: red; } } .foo { color: blue; }");
        let rules = sheet.css_rules().unwrap();

        assert_eq!(rules.len(), 2);
        match &rules[0] {
            CssRule::Media(media) => {
                assert_eq!(media.condition, "screen and (max-width: 600px)");
                assert_eq!(media.rules.len(), 1);
                assert_eq!(media.rules[0].selector_text(), Some(".foo"));
            }
            other => panic!("Expected media rule, got {:?}", other),
        }
        assert_eq!(rules[1].selector_text(), Some(".foo"));
    }

    #[test]
    fn test_other_at_rules() {
        let sheet = StyleSheet::parse("@import url('a.css');\n@font-face { font-family: X; } .a { b: c }");
        let rules = sheet.css_rules().unwrap();

        assert_eq!(rules.len(), 3);
        assert_eq!(rules[0], CssRule::Other("@import url('a.css');".to_string()));
        assert_eq!(rules[1], CssRule::Other("@font-face { font-family: X; }".to_string()));
        assert_eq!(rules[2].selector_text(), Some(".a"));
    }

    #[test]
    fn test_unterminated_block() {
        let sheet = StyleSheet::parse(".a { color: red; .b { top: 1px }");
        let rules = style_rules(&sheet);

        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].0, ".a");
    }

    #[test]
    fn test_stray_braces_and_empty_input() {
        assert!(StyleSheet::parse("").css_rules().unwrap().is_empty());
        assert!(StyleSheet::parse("   ").css_rules().unwrap().is_empty());
        let sheet = StyleSheet::parse("} .a { x: y } dangling");
        assert_eq!(style_rules(&sheet).len(), 1);
    }

    #[test]
    fn test_cross_origin_rules_refused() {
        let sheet = StyleSheet::cross_origin("https://cdn.example/x.css", ".foo { color: red; }");

        assert_eq!(sheet.href(), Some("https://cdn.example/x.css"));
        assert_eq!(
            sheet.css_rules(),
            Err(CssError::SecurityError { href: "https://cdn.example/x.css".into() })
        );
    }

    #[test]
    fn test_sheet_list() {
        let list: StyleSheetList = vec![
            StyleSheet::parse(".a {}").with_href("/a.css"),
            StyleSheet::parse(".b {}"),
        ]
        .into_iter()
        .collect();

        assert_eq!(list.len(), 2);
        assert_eq!(list.get(0).and_then(|s| s.href()), Some("/a.css"));
        assert_eq!(list.iter().count(), 2);
    }
}
