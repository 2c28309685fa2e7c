//! Regex-level reading of rendered HTML, for pages only reachable by scraping.
//!
//! Only the shapes the compiler can rebuild are recognized: section-like
//! containers and, inside or between them, headings, paragraphs, images,
//! button links and horizontal rules.

use std::ops::Range;
use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::style::structural::attribute;

/// Class fragments that make a `div` count as a section.
const SECTION_CLASS_MARKERS: &[&str] = &["section", "hero", "banner"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HtmlBlock {
    Heading {
        level: u8,
        text: String,
        align: Option<String>,
    },
    Paragraph {
        text: String,
        align: Option<String>,
    },
    Image {
        src: String,
        alt: Option<String>,
    },
    Button {
        href: Option<String>,
        label: String,
    },
    Divider,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlSection {
    pub id: Option<String>,
    pub class: Option<String>,
    pub style: Option<String>,
    /// Byte range of the whole element in the original markup.
    pub span: Range<usize>,
    pub blocks: Vec<HtmlBlock>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HtmlItem {
    Section(HtmlSection),
    Block(HtmlBlock),
}

fn noise_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)<!--.*?-->|<script\b.*?</script\s*>|<style\b.*?</style\s*>|<head\b.*?</head\s*>|<noscript\b.*?</noscript\s*>")
            .expect("Invalid HTML noise regex")
    })
}

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)<(/?)([a-z][a-z0-9]*)\b([^>]*)>").expect("Invalid HTML tag regex")
    })
}

fn block_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(concat!(
            r"(?is)<h([1-6])\b([^>]*)>(.*?)</h[1-6]\s*>",
            r"|<p\b([^>]*)>(.*?)</p\s*>",
            r"|<img\b([^>]*)>",
            r"|<a\b([^>]*)>(.*?)</a\s*>",
            r"|<hr\b[^>]*>",
        ))
        .expect("Invalid HTML block regex")
    })
}

fn inner_tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<[^>]*>").expect("Invalid inner tag regex"))
}

fn text_align_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)text-align\s*:\s*([a-z]+)|has-text-align-([a-z]+)")
            .expect("Invalid text-align regex")
    })
}

/// Blank out comments, scripts and stylesheets without moving any offsets.
fn without_noise(html: &str) -> String {
    noise_regex()
        .replace_all(html, |caps: &Captures| " ".repeat(caps[0].len()))
        .into_owned()
}

/// Visible text of an HTML fragment, whitespace collapsed.
pub fn visible_text(fragment: &str) -> String {
    let stripped = inner_tag_regex().replace_all(fragment, " ");
    let decoded = html_escape::decode_html_entities(&stripped);
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn alignment(attrs: &str) -> Option<String> {
    let haystack = [attribute(attrs, "style"), attribute(attrs, "class")]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
    text_align_regex().captures(&haystack).and_then(|caps| {
        caps.get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str().to_ascii_lowercase())
    })
}

fn is_button(attrs: &str) -> bool {
    attribute(attrs, "class").is_some_and(|class| {
        class.split_whitespace().any(|c| {
            let c = c.to_ascii_lowercase();
            c == "btn" || c.contains("button")
        })
    })
}

fn is_section_like(tag: &str, attrs: &str) -> bool {
    if tag.eq_ignore_ascii_case("section") {
        return true;
    }
    tag.eq_ignore_ascii_case("div")
        && attribute(attrs, "class").is_some_and(|class| {
            class.split_whitespace().any(|c| {
                let c = c.to_ascii_lowercase();
                SECTION_CLASS_MARKERS.iter().any(|marker| c.contains(marker))
            })
        })
}

fn block(caps: &Captures) -> Option<HtmlBlock> {
    if let Some(level) = caps.get(1) {
        let text = visible_text(&caps[3]);
        return (!text.is_empty()).then(|| HtmlBlock::Heading {
            level: level.as_str().parse().unwrap_or(2),
            text,
            align: alignment(&caps[2]),
        });
    }
    if let Some(inner) = caps.get(5) {
        let text = visible_text(inner.as_str());
        return (!text.is_empty()).then(|| HtmlBlock::Paragraph {
            text,
            align: alignment(&caps[4]),
        });
    }
    if let Some(attrs) = caps.get(6) {
        return attribute(attrs.as_str(), "src").map(|src| HtmlBlock::Image {
            src,
            alt: attribute(attrs.as_str(), "alt").filter(|alt| !alt.trim().is_empty()),
        });
    }
    if let Some(attrs) = caps.get(7) {
        let label = visible_text(&caps[8]);
        return (is_button(attrs.as_str()) && !label.is_empty()).then(|| HtmlBlock::Button {
            href: attribute(attrs.as_str(), "href"),
            label,
        });
    }
    Some(HtmlBlock::Divider)
}

fn blocks_in(html: &str) -> Vec<HtmlBlock> {
    block_regex()
        .captures_iter(html)
        .filter_map(|caps| block(&caps))
        .collect()
}

/// Outermost section-like elements, in document order.
fn section_spans(html: &str) -> Vec<(Range<usize>, Range<usize>, String)> {
    let mut spans = Vec::new();
    // (tag name, outer start, inner start, attrs, depth of same-name nesting)
    let mut open: Option<(String, usize, usize, String, usize)> = None;

    for caps in tag_regex().captures_iter(html) {
        let Some(whole) = caps.get(0) else { continue };
        let closing = !caps[1].is_empty();
        let tag = caps[2].to_ascii_lowercase();
        let attrs = &caps[3];

        match open.as_mut() {
            None => {
                if !closing && is_section_like(&tag, attrs) {
                    open = Some((tag, whole.start(), whole.end(), attrs.to_string(), 1));
                }
            }
            Some((name, start, inner_start, open_attrs, depth)) if *name == tag => {
                if closing {
                    *depth -= 1;
                    if *depth == 0 {
                        spans.push((
                            *start..whole.end(),
                            *inner_start..whole.start(),
                            std::mem::take(open_attrs),
                        ));
                        open = None;
                    }
                } else if !attrs.trim_end().ends_with('/') {
                    *depth += 1;
                }
            }
            Some(_) => {}
        }
    }

    if let Some((_, start, inner_start, attrs, _)) = open {
        spans.push((start..html.len(), inner_start..html.len(), attrs));
    }
    spans
}

/// Read rendered HTML into sections and the loose blocks between them.
pub fn parse(html: &str) -> Vec<HtmlItem> {
    let clean = without_noise(html);
    let mut items = Vec::new();
    let mut cursor = 0;

    for (outer, inner, attrs) in section_spans(&clean) {
        items.extend(blocks_in(&clean[cursor..outer.start]).into_iter().map(HtmlItem::Block));
        items.push(HtmlItem::Section(HtmlSection {
            id: attribute(&attrs, "id").filter(|id| !id.trim().is_empty()),
            class: attribute(&attrs, "class"),
            style: attribute(&attrs, "style"),
            blocks: blocks_in(&clean[inner]),
            span: outer.clone(),
        }));
        cursor = outer.end;
    }
    items.extend(blocks_in(&clean[cursor..]).into_iter().map(HtmlItem::Block));
    items
}
