//! Allow-list translation from editor properties to markup attributes.
//!
//! Import harvests style values from untrusted remote markup, so every value
//! that ends up in generated markup passes through [`PropertyMapper`] first.
//! Values that change under normalization, and values that are rejected,
//! produce a `FILTER` entry in the run's log.

pub mod validate;

use serde_json::json;

use crate::diagnostics::{BLOCKED, Phase, TranscodeLog};
use crate::model::{BlockKind, BlockNode, PropValue, value_of};

/// A markup attribute whose values are restricted to an allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetProperty {
    BgColor,
    Color,
    Padding,
    Margin,
    Height,
    Align,
    Href,
    Src,
    BgImage,
    Level,
    ButtonStyle,
}

impl TargetProperty {
    /// The markup attribute this property is written to.
    pub fn attr_name(&self) -> &'static str {
        match self {
            TargetProperty::BgColor => "bg_color",
            TargetProperty::Color => "color",
            TargetProperty::Padding => "padding",
            TargetProperty::Margin => "margin",
            TargetProperty::Height => "height",
            TargetProperty::Align => "align",
            TargetProperty::Href => "href",
            TargetProperty::Src => "src",
            TargetProperty::BgImage => "bg_image",
            TargetProperty::Level => "level",
            TargetProperty::ButtonStyle => "style",
        }
    }

    /// Normalized value if allowed, `None` if it must be dropped.
    pub fn allow(&self, value: &str) -> Option<String> {
        match self {
            TargetProperty::BgColor | TargetProperty::Color => validate::color(value),
            TargetProperty::Padding => validate::lengths(value, false),
            TargetProperty::Margin => validate::lengths(value, true),
            TargetProperty::Height => validate::height(value),
            TargetProperty::Align => {
                validate::keyword(value, &["left", "center", "right", "justify"])
            }
            TargetProperty::Href | TargetProperty::Src => validate::url(value),
            TargetProperty::BgImage => validate::background_image(value),
            TargetProperty::Level => validate::heading_level(value),
            TargetProperty::ButtonStyle => {
                validate::keyword(value, &["primary", "secondary", "outline", "link"])
            }
        }
    }
}

/// One editor property (under any of its accepted spellings) feeding a
/// restricted attribute.
struct Mapping {
    sources: &'static [&'static str],
    target: TargetProperty,
}

const fn map(sources: &'static [&'static str], target: TargetProperty) -> Mapping {
    Mapping { sources, target }
}

const SECTION_MAP: &[Mapping] = &[
    map(&["backgroundColor", "bgColor", "background"], TargetProperty::BgColor),
    map(&["backgroundImage", "bgImage"], TargetProperty::BgImage),
    map(&["padding"], TargetProperty::Padding),
];
const HEADING_MAP: &[Mapping] = &[
    map(&["level", "size"], TargetProperty::Level),
    map(&["align", "textAlign"], TargetProperty::Align),
    map(&["color"], TargetProperty::Color),
];
const TEXT_MAP: &[Mapping] = &[
    map(&["align", "textAlign"], TargetProperty::Align),
    map(&["color"], TargetProperty::Color),
];
const IMAGE_MAP: &[Mapping] = &[
    map(&["src", "url", "image"], TargetProperty::Src),
    map(&["align"], TargetProperty::Align),
];
const BUTTON_MAP: &[Mapping] = &[
    map(&["href", "url", "link"], TargetProperty::Href),
    map(&["variant", "style"], TargetProperty::ButtonStyle),
    map(&["align"], TargetProperty::Align),
];
const DIVIDER_MAP: &[Mapping] = &[
    map(&["color"], TargetProperty::Color),
    map(&["margin", "spacing"], TargetProperty::Margin),
];
const SPACER_MAP: &[Mapping] = &[map(&["height", "size"], TargetProperty::Height)];
const BOX_MAP: &[Mapping] = &[
    map(&["backgroundColor", "bgColor", "background"], TargetProperty::BgColor),
    map(&["backgroundImage", "bgImage"], TargetProperty::BgImage),
    map(&["padding"], TargetProperty::Padding),
    map(&["align", "textAlign"], TargetProperty::Align),
];

fn mappings(kind: &BlockKind) -> &'static [Mapping] {
    match kind {
        BlockKind::Section => SECTION_MAP,
        BlockKind::Heading => HEADING_MAP,
        BlockKind::Text => TEXT_MAP,
        BlockKind::Image => IMAGE_MAP,
        BlockKind::Button => BUTTON_MAP,
        BlockKind::Divider => DIVIDER_MAP,
        BlockKind::Spacer => SPACER_MAP,
        BlockKind::Card | BlockKind::Hero => BOX_MAP,
        BlockKind::Columns
        | BlockKind::FeatureGrid
        | BlockKind::PricingCards
        | BlockKind::Testimonial
        | BlockKind::StatsRow
        | BlockKind::Faq
        | BlockKind::Unknown(_) => &[],
    }
}

/// Restricted attributes in emission order.
pub type Attrs = Vec<(&'static str, String)>;

/// Allow-list enforcing translator from editor props to markup attributes.
#[derive(Debug, Clone, Copy, Default)]
pub struct PropertyMapper;

impl PropertyMapper {
    pub fn new() -> Self {
        Self
    }

    /// Restricted attributes for `node`, per its kind's mapping table.
    ///
    /// Attributes come out in table order so output is stable; absent and
    /// blank props are skipped silently, rejected ones are logged and skipped.
    pub fn attrs_for(&self, node: &BlockNode, log: &mut TranscodeLog) -> Attrs {
        mappings(&node.kind)
            .iter()
            .filter_map(|mapping| {
                let value = value_of(&node.props, mapping.sources)?;
                self.filter_value(mapping.target, value, Some(&node.id), log)
                    .map(|allowed| (mapping.target.attr_name(), allowed))
            })
            .collect()
    }

    /// Filter a single prop value bound for `target`.
    pub fn filter_value(
        &self,
        target: TargetProperty,
        value: &PropValue,
        node_id: Option<&str>,
        log: &mut TranscodeLog,
    ) -> Option<String> {
        match value.to_text() {
            Some(raw) => self.filter(target, &raw, node_id, log),
            None if value.is_blank() => None,
            None => {
                record(target, &format!("{value:?}"), None, node_id, log);
                None
            }
        }
    }

    /// Filter raw text bound for `target`.
    pub fn filter(
        &self,
        target: TargetProperty,
        raw: &str,
        node_id: Option<&str>,
        log: &mut TranscodeLog,
    ) -> Option<String> {
        if raw.trim().is_empty() {
            return None;
        }
        let allowed = target.allow(raw);
        if allowed.as_deref() != Some(raw) {
            record(target, raw, allowed.as_deref(), node_id, log);
        }
        allowed
    }
}

fn record(
    target: TargetProperty,
    original: &str,
    filtered: Option<&str>,
    node_id: Option<&str>,
    log: &mut TranscodeLog,
) {
    let property = target.attr_name();
    let message = match filtered {
        Some(value) => format!(
            "{property}: '{}' normalized to '{value}'",
            log.clip(original)
        ),
        None => format!("{property}: value blocked"),
    };
    log.push_with(
        Phase::Filter,
        message,
        json!({
            "node": node_id,
            "property": property,
            "original": original,
            "filtered": filtered.unwrap_or(BLOCKED),
        }),
    );
}
