use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use super::rules::backgrounds_in;

/// Class names the theme puts on its dedicated "section background" layer.
const WRAPPER_CLASSES: &[&str] = &["section-bg", "section-background", "section_bg"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackgroundOrigin {
    /// The theme's background wrapper element.
    Wrapper,
    /// A `style="background..."` attribute on a section-like element.
    InlineStyle,
}

/// A background found directly in markup rather than in a stylesheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructuralBackground {
    /// Id of the nearest element carrying one, else `section-{byte_offset}`.
    pub key: String,
    pub background: String,
    pub offset: usize,
    pub origin: BackgroundOrigin,
}

fn open_tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)<([a-z][a-z0-9]*)\b([^>]*)>").expect("Invalid opening tag regex")
    })
}

fn attr_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)([a-z_:][a-z0-9_:.-]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
            .expect("Invalid attribute regex")
    })
}

/// Value of attribute `name` inside an opening tag's attribute text.
pub(crate) fn attribute(attrs: &str, name: &str) -> Option<String> {
    attr_regex()
        .captures_iter(attrs)
        .find(|caps| caps[1].eq_ignore_ascii_case(name))
        .and_then(|caps| caps.get(2).or_else(|| caps.get(3)))
        .map(|m| html_escape::decode_html_entities(m.as_str()).into_owned())
}

fn is_wrapper(class: &str) -> bool {
    class
        .split_whitespace()
        .any(|c| WRAPPER_CLASSES.contains(&c.to_ascii_lowercase().as_str()))
}

fn is_section_like(tag: &str, class: &str) -> bool {
    tag.eq_ignore_ascii_case("section") || class.to_ascii_lowercase().contains("section")
}

/// Scan raw markup for backgrounds the theme expresses structurally.
///
/// Two passes are folded into one walk over opening tags: the theme's
/// background wrapper (`class="section-bg"` with a `data-bg` or inline
/// background) and inline `style="background..."` on section-like elements.
/// Each hit is keyed by the element's own id, else the nearest preceding
/// element with an id, else its byte offset, so every hit stays addressable.
pub fn extract_structural_backgrounds(markup: &str) -> Vec<StructuralBackground> {
    let mut found = Vec::new();
    let mut last_id: Option<String> = None;

    for caps in open_tag_regex().captures_iter(markup) {
        let Some(whole) = caps.get(0) else { continue };
        let tag = &caps[1];
        let attrs = &caps[2];
        let own_id = attribute(attrs, "id").filter(|id| !id.trim().is_empty());
        let class = attribute(attrs, "class").unwrap_or_default();

        let hit = if is_wrapper(&class) {
            attribute(attrs, "data-bg")
                .or_else(|| attribute(attrs, "data-bg-color"))
                .or_else(|| inline_background(attrs))
                .map(|bg| (bg, BackgroundOrigin::Wrapper))
        } else if is_section_like(tag, &class) {
            inline_background(attrs).map(|bg| (bg, BackgroundOrigin::InlineStyle))
        } else {
            None
        };

        if let Some((background, origin)) = hit.filter(|(bg, _)| !bg.trim().is_empty()) {
            let key = own_id
                .clone()
                .or_else(|| last_id.clone())
                .unwrap_or_else(|| format!("section-{}", whole.start()));
            found.push(StructuralBackground {
                key,
                background: background.trim().to_string(),
                offset: whole.start(),
                origin,
            });
        }

        if own_id.is_some() {
            last_id = own_id;
        }
    }

    found
}

fn inline_background(attrs: &str) -> Option<String> {
    let style = attribute(attrs, "style")?;
    let (background, color, image) = backgrounds_in(&style);
    background.or(color).or(image)
}
