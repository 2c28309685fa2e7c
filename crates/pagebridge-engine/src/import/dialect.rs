//! Tokenizer and tree builder for the bracketed-tag dialect.
//!
//! The dialect has no grammar for void tags, so an opening tag is treated as
//! a container exactly when a matching closing tag follows it somewhere in the
//! input. Stray closing tags are ignored and unclosed containers are closed
//! at the end of input.

use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

use regex::Regex;

/// Tags that never take content.
const VOID_TAGS: &[&str] = &["image", "divider", "spacer", "counter"];

/// Tag names whose presence marks content as written in the dialect.
const VOCABULARY: &[&str] = &[
    "section",
    "row",
    "column",
    "row_inner",
    "column_inner",
    "heading",
    "text",
    "image",
    "button",
    "divider",
    "spacer",
    "box",
    "blurb",
    "pricing_tables",
    "pricing_table",
    "testimonial",
    "counter",
    "accordion",
    "toggle",
];

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)\[(/)?([a-z][a-z0-9_]*)((?:\s+[a-z_][a-z0-9_-]*\s*=\s*"[^"]*")*)\s*/?\]"#)
            .expect("Invalid dialect tag regex")
    })
}

fn attr_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)([a-z_][a-z0-9_-]*)\s*=\s*"([^"]*)""#).expect("Invalid dialect attr regex")
    })
}

/// True when `content` uses at least one tag from the dialect's vocabulary.
pub fn contains_dialect_markup(content: &str) -> bool {
    tag_regex().captures_iter(content).any(|caps| {
        let name = caps[2].to_ascii_lowercase();
        VOCABULARY.contains(&name.as_str())
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Markup {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    /// Lowercased tag name.
    pub name: String,
    /// Attribute values with entities decoded.
    pub attrs: BTreeMap<String, String>,
    pub children: Vec<Markup>,
}

impl Element {
    fn new(name: String, attrs: BTreeMap<String, String>) -> Self {
        Self {
            name,
            attrs,
            children: Vec::new(),
        }
    }

    /// Non-blank attribute value.
    pub fn attr(&self, name: &str) -> Option<String> {
        self.attrs
            .get(name)
            .filter(|value| !value.trim().is_empty())
            .cloned()
    }

    /// Raw text of every descendant text run, in order.
    pub fn text(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }

    /// Direct child elements.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|child| match child {
            Markup::Element(el) => Some(el),
            Markup::Text(_) => None,
        })
    }

    /// First descendant named `name`, depth first.
    pub fn find(&self, name: &str) -> Option<&Element> {
        self.elements()
            .find_map(|el| if el.name == name { Some(el) } else { el.find(name) })
    }

    /// Every descendant named `name`, depth first.
    pub fn find_all<'a>(&'a self, name: &str, found: &mut Vec<&'a Element>) {
        for el in self.elements() {
            if el.name == name {
                found.push(el);
            } else {
                el.find_all(name, found);
            }
        }
    }
}

fn collect_text(children: &[Markup], out: &mut String) {
    for child in children {
        match child {
            Markup::Text(text) => out.push_str(text),
            Markup::Element(el) => collect_text(&el.children, out),
        }
    }
}

fn parse_attrs(text: &str) -> BTreeMap<String, String> {
    attr_regex()
        .captures_iter(text)
        .map(|caps| {
            (
                caps[1].to_ascii_lowercase(),
                html_escape::decode_html_entities(&caps[2]).into_owned(),
            )
        })
        .collect()
}

fn attach(stack: &mut [Element], child: Markup) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(child);
    }
}

fn attach_text(stack: &mut [Element], text: &str) {
    if !text.is_empty() {
        attach(stack, Markup::Text(text.to_string()));
    }
}

/// Close the innermost open element and hand it to its parent.
fn close_top(stack: &mut Vec<Element>) {
    if stack.len() > 1
        && let Some(el) = stack.pop()
    {
        attach(stack, Markup::Element(el));
    }
}

/// Parse dialect markup into a forest. Never fails: anything that is not a
/// recognizable tag is kept as text.
pub fn parse(markup: &str) -> Vec<Markup> {
    let tags: Vec<_> = tag_regex().captures_iter(markup).collect();

    // Start offsets of closing tags, per name, in input order.
    let mut closers: HashMap<String, Vec<usize>> = HashMap::new();
    for caps in &tags {
        if caps.get(1).is_some()
            && let Some(whole) = caps.get(0)
        {
            closers
                .entry(caps[2].to_ascii_lowercase())
                .or_default()
                .push(whole.start());
        }
    }

    let mut stack = vec![Element::default()];
    let mut cursor = 0;
    for caps in &tags {
        let Some(whole) = caps.get(0) else { continue };
        attach_text(&mut stack, &markup[cursor..whole.start()]);
        cursor = whole.end();

        let name = caps[2].to_ascii_lowercase();
        if caps.get(1).is_some() {
            let open_at = stack.iter().rposition(|el| el.name == name);
            if let Some(depth) = open_at.filter(|depth| *depth > 0) {
                while stack.len() > depth {
                    close_top(&mut stack);
                }
            }
            continue;
        }

        let element = Element::new(name, parse_attrs(&caps[3]));
        let has_closer = !VOID_TAGS.contains(&element.name.as_str())
            && closers
                .get(&element.name)
                .is_some_and(|offsets| offsets.iter().any(|offset| *offset >= whole.end()));
        if has_closer {
            stack.push(element);
        } else {
            attach(&mut stack, Markup::Element(element));
        }
    }
    attach_text(&mut stack, &markup[cursor..]);

    while stack.len() > 1 {
        close_top(&mut stack);
    }
    stack.pop().map(|root| root.children).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn element(markup: &Markup) -> &Element {
        match markup {
            Markup::Element(el) => el,
            Markup::Text(text) => panic!("expected element, got text {text:?}"),
        }
    }

    #[test]
    fn test_nested_structure() {
        let forest = parse(
            "[section bg_color=\"#111\"][row width=\"full\"][column span=\"12\"]\n[heading level=\"2\"]Hi[/heading]\n[/column][/row][/section]",
        );

        assert_eq!(forest.len(), 1);
        let section = element(&forest[0]);
        assert_eq!(section.name, "section");
        assert_eq!(section.attr("bg_color").as_deref(), Some("#111"));
        let heading = section.find("heading").unwrap();
        assert_eq!(heading.text(), "Hi");
        assert_eq!(heading.attr("level").as_deref(), Some("2"));
    }

    #[test]
    fn test_void_tags_take_no_children() {
        let forest = parse("[image src=\"/a.png\"][text]after[/text]");

        assert_eq!(forest.len(), 2);
        assert!(element(&forest[0]).children.is_empty());
        assert_eq!(element(&forest[1]).text(), "after");
    }

    #[test]
    fn test_unknown_tag_without_closer_is_void() {
        let forest = parse("[gallery ids=\"1,2\"][text]x[/text]");

        assert_eq!(element(&forest[0]).name, "gallery");
        assert!(element(&forest[0]).children.is_empty());
    }

    #[test]
    fn test_stray_closer_is_ignored_and_unclosed_is_closed() {
        let forest = parse("[/row][section][box][text]a[/text][/section][/box]");

        assert_eq!(forest.len(), 1);
        let section = element(&forest[0]);
        assert_eq!(section.name, "section");
        assert_eq!(section.find("text").unwrap().text(), "a");
    }

    #[test]
    fn test_attribute_entities_are_decoded() {
        let forest = parse("[testimonial author=\"Ann &amp; Bob\"]Great[/testimonial]");
        assert_eq!(
            element(&forest[0]).attr("author").as_deref(),
            Some("Ann & Bob")
        );
    }

    #[test]
    fn test_dialect_detection() {
        assert!(contains_dialect_markup("[section][/section]"));
        assert!(contains_dialect_markup("intro [heading level=\"2\"]x[/heading]"));
        assert!(!contains_dialect_markup("<p>[caption] is not ours</p>"));
        assert!(!contains_dialect_markup("<html><body>plain</body></html>"));
    }
}
