//! Remote content → block tree, best effort.
//!
//! Content written in the dialect is parsed structurally; rendered HTML from
//! the scrape fallback is read with regular expressions. The compiler is not
//! exactly invertible, and this direction does not try to be: it recovers
//! sections, their backgrounds and the primitives the theme emits.
//!
//! Every style value harvested here comes from untrusted markup, so it goes
//! through the [`PropertyMapper`] before it is stored on a node.

pub mod dialect;
pub mod html;
mod rebuild;

use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::json;

use crate::diagnostics::{Phase, TranscodeLog};
use crate::model::{BlockKind, BlockNode, Document, ZoneKey};
use crate::sanitize::{PropertyMapper, TargetProperty, validate};
use crate::source::ResolvedSource;
use crate::style::rules::backgrounds_in;
use crate::style::{
    StructuralBackground, StyleRule, extract_rules, extract_structural_backgrounds,
    resolve_background,
};

pub use dialect::contains_dialect_markup;

fn style_block_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)<style\b[^>]*>(.*?)</style\s*>").expect("Invalid style block regex")
    })
}

fn css_url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)url\([^)]*\)").expect("Invalid css url regex"))
}

/// Import `content`, detecting whether it is dialect markup or rendered HTML.
pub fn import_document(content: &str, log: &mut TranscodeLog) -> Document {
    Importer::new(log).import(content)
}

/// Where a section's background came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BackgroundSource {
    Attribute,
    InlineStyle,
    Stylesheet,
    Structural,
}

impl BackgroundSource {
    fn as_str(&self) -> &'static str {
        match self {
            BackgroundSource::Attribute => "attribute",
            BackgroundSource::InlineStyle => "inline style",
            BackgroundSource::Stylesheet => "stylesheet",
            BackgroundSource::Structural => "structural wrapper",
        }
    }
}

/// One import run.
pub struct Importer<'l> {
    mapper: PropertyMapper,
    log: &'l mut TranscodeLog,
    rules: Vec<StyleRule>,
    structural: Vec<StructuralBackground>,
    counters: BTreeMap<String, usize>,
    doc: Document,
}

impl<'l> Importer<'l> {
    pub fn new(log: &'l mut TranscodeLog) -> Self {
        Self {
            mapper: PropertyMapper::new(),
            log,
            rules: Vec::new(),
            structural: Vec::new(),
            counters: BTreeMap::new(),
            doc: Document::new(),
        }
    }

    pub fn import(self, content: &str) -> Document {
        let is_dialect = contains_dialect_markup(content);
        self.import_as(content, is_dialect)
    }

    /// Import content whose flavour the resolver already determined.
    pub fn import_resolved(self, source: &ResolvedSource) -> Document {
        self.import_as(&source.content, source.has_dialect_markup)
    }

    pub fn import_as(mut self, content: &str, is_dialect: bool) -> Document {
        self.log.push(
            Phase::Init,
            format!(
                "Importing {} bytes as {}",
                content.len(),
                if is_dialect { "dialect markup" } else { "rendered HTML" }
            ),
        );
        self.harvest_styles(content);

        if is_dialect {
            let forest = dialect::parse(content);
            self.log.push(
                Phase::Parse,
                format!("Parsed {} top-level dialect items", forest.len()),
            );
            self.dialect_forest(&forest);
        } else {
            let items = html::parse(content);
            self.log.push(
                Phase::Parse,
                format!("Parsed {} top-level HTML items", items.len()),
            );
            self.html_items(items);
        }

        let sections = self
            .doc
            .top_level
            .iter()
            .filter(|node| node.kind.is_structural())
            .count();
        self.log.push(
            Phase::Success,
            format!(
                "Imported {} nodes in {} sections",
                self.doc.node_count(),
                sections
            ),
        );
        self.doc
    }

    /// Collect stylesheet rules and structural backgrounds for later lookup.
    fn harvest_styles(&mut self, content: &str) {
        let css: Vec<&str> = style_block_regex()
            .captures_iter(content)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
            .collect();
        self.rules = extract_rules(&css.join("\n"));
        self.structural = extract_structural_backgrounds(content);

        if !self.rules.is_empty() {
            self.log.push_with(
                Phase::Style,
                format!(
                    "Extracted {} background rules from {} style blocks",
                    self.rules.len(),
                    css.len()
                ),
                json!(self.rules),
            );
        }
        if !self.structural.is_empty() {
            self.log.push_with(
                Phase::Style,
                format!("Found {} structural backgrounds", self.structural.len()),
                json!(self.structural),
            );
        }
    }

    /// Allocate the next `{kind}-{n}` id.
    fn node(&mut self, kind: BlockKind) -> BlockNode {
        let slug = kind.type_name().to_ascii_lowercase();
        let counter = self.counters.entry(slug.clone()).or_default();
        *counter += 1;
        let id = format!("{slug}-{counter}");
        BlockNode::new(kind, id)
    }

    /// Store `raw` under `key` if the allow-list for `target` accepts it.
    fn styled(
        &mut self,
        node: BlockNode,
        key: &str,
        target: TargetProperty,
        raw: Option<String>,
    ) -> BlockNode {
        let allowed = match raw {
            Some(raw) => self.mapper.filter(target, &raw, Some(&node.id), self.log),
            None => None,
        };
        match allowed {
            Some(value) => node.with_prop(key, value),
            None => node,
        }
    }

    /// Find a section's background: explicit attribute or inline style
    /// first, then stylesheet rules, then structural wrappers.
    fn find_background(
        &self,
        explicit: Option<(String, BackgroundSource)>,
        id: Option<&str>,
        class: Option<&str>,
        span: Option<&Range<usize>>,
    ) -> Option<(String, BackgroundSource)> {
        explicit
            .or_else(|| {
                resolve_background(id, class, &self.rules)
                    .map(|bg| (bg, BackgroundSource::Stylesheet))
            })
            .or_else(|| {
                self.structural
                    .iter()
                    .find(|found| {
                        id.is_some_and(|id| found.key == id)
                            || span.is_some_and(|span| span.contains(&found.offset))
                    })
                    .map(|found| (found.background.clone(), BackgroundSource::Structural))
            })
    }

    /// Split a background value into color and image candidates, sanitize
    /// them and attach what survives.
    fn apply_background(
        &mut self,
        node: BlockNode,
        found: Option<(String, BackgroundSource)>,
    ) -> BlockNode {
        let Some((raw, source)) = found else {
            return node;
        };
        self.log.push_with(
            Phase::Style,
            format!("{} {} background from {}", node.kind, node.id, source.as_str()),
            json!({ "id": node.id, "background": raw, "source": source.as_str() }),
        );

        let (color, image) = split_background(&raw);
        let node = self.styled(node, "backgroundColor", TargetProperty::BgColor, color);
        self.styled(node, "backgroundImage", TargetProperty::BgImage, image)
    }

    /// Attach an explicit `bg_image` attribute. It is already an image
    /// reference, so it skips the color/image split.
    fn apply_background_image(&mut self, node: BlockNode, image: Option<String>) -> BlockNode {
        let Some(image) = image else {
            return node;
        };
        let source = BackgroundSource::Attribute;
        self.log.push_with(
            Phase::Style,
            format!("{} {} background image from {}", node.kind, node.id, source.as_str()),
            json!({ "id": node.id, "background_image": image, "source": source.as_str() }),
        );
        self.styled(node, "backgroundImage", TargetProperty::BgImage, Some(image))
    }

    fn place(&mut self, nodes: Vec<BlockNode>, parent: Option<&ZoneKey>) {
        for node in nodes {
            self.log.push(
                Phase::Block,
                format!("{} {} imported", node.kind, node.id),
            );
            match parent {
                Some(key) => self.doc.push_to_zone(key.clone(), node),
                None => self.doc.push_top_level(node),
            }
        }
    }

    fn dialect_forest(&mut self, forest: &[dialect::Markup]) {
        for item in forest {
            match item {
                dialect::Markup::Element(el) if el.name == "section" => {
                    let explicit = el
                        .attr("bg_color")
                        .map(|bg| (bg, BackgroundSource::Attribute));
                    let image = el.attr("bg_image");
                    let id = el.attr("module_id").or_else(|| el.attr("id"));
                    let class = el.attr("module_class").or_else(|| el.attr("class"));

                    let section = self.node(BlockKind::Section);
                    let found = if explicit.is_none() && image.is_some() {
                        None
                    } else {
                        self.find_background(explicit, id.as_deref(), class.as_deref(), None)
                    };
                    let section = self.apply_background(section, found);
                    let section = self.apply_background_image(section, image);
                    let section = self.styled(
                        section,
                        "padding",
                        TargetProperty::Padding,
                        el.attr("padding"),
                    );
                    let zone = section.content_zone();
                    self.place(vec![section], None);

                    let children = self.dialect_children(&el.children);
                    self.place(children, Some(&zone));
                }
                other => {
                    let nodes = self.dialect_children(std::slice::from_ref(other));
                    self.place(nodes, None);
                }
            }
        }
    }

    fn html_items(&mut self, items: Vec<html::HtmlItem>) {
        for item in items {
            match item {
                html::HtmlItem::Section(section) => {
                    let explicit = section.style.as_deref().and_then(|style| {
                        let (background, color, image) = backgrounds_in(style);
                        background
                            .or(color)
                            .or(image)
                            .map(|bg| (bg, BackgroundSource::InlineStyle))
                    });
                    let node = self.node(BlockKind::Section);
                    let found = self.find_background(
                        explicit,
                        section.id.as_deref(),
                        section.class.as_deref(),
                        Some(&section.span),
                    );
                    let node = self.apply_background(node, found);
                    let zone = node.content_zone();
                    self.place(vec![node], None);

                    let children = section
                        .blocks
                        .into_iter()
                        .map(|block| self.html_block(block))
                        .collect();
                    self.place(children, Some(&zone));
                }
                html::HtmlItem::Block(block) => {
                    let node = self.html_block(block);
                    self.place(vec![node], None);
                }
            }
        }
    }

    fn html_block(&mut self, block: html::HtmlBlock) -> BlockNode {
        match block {
            html::HtmlBlock::Heading { level, text, align } => {
                let node = self.node(BlockKind::Heading).with_prop("title", text);
                let node =
                    self.styled(node, "level", TargetProperty::Level, Some(level.to_string()));
                self.styled(node, "align", TargetProperty::Align, align)
            }
            html::HtmlBlock::Paragraph { text, align } => {
                let node = self.node(BlockKind::Text).with_prop("text", text);
                self.styled(node, "align", TargetProperty::Align, align)
            }
            html::HtmlBlock::Image { src, alt } => {
                let mut node = self.node(BlockKind::Image);
                if let Some(alt) = alt {
                    node = node.with_prop("alt", alt);
                }
                self.styled(node, "src", TargetProperty::Src, Some(src))
            }
            html::HtmlBlock::Button { href, label } => {
                let node = self.node(BlockKind::Button).with_prop("label", label);
                self.styled(node, "href", TargetProperty::Href, href)
            }
            html::HtmlBlock::Divider => self.node(BlockKind::Divider),
        }
    }
}

/// Color and image candidates from a `background` value. A value with no
/// recognizable part is returned whole as the color candidate so that the
/// sanitizer records its rejection.
fn split_background(raw: &str) -> (Option<String>, Option<String>) {
    let raw = raw.trim();
    if validate::color(raw).is_some() {
        return (Some(raw.to_string()), None);
    }
    let image = css_url_regex().find(raw).map(|m| m.as_str().to_string());
    let rest = css_url_regex().replace_all(raw, " ");
    let color = rest
        .split_whitespace()
        .find(|token| validate::color(token).is_some())
        .map(str::to_string);

    match (color, image) {
        (None, None) => (Some(raw.to_string()), None),
        found => found,
    }
}
