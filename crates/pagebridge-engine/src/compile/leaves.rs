//! Leaf kinds: one editor block, one dialect primitive.

use crate::diagnostics::{Phase, TranscodeLog};
use crate::model::{BlockNode, text_of};
use crate::sanitize::PropertyMapper;

use super::markup::{Tag, escape_rich_text, escape_text};

pub(crate) const DEFAULT_HEADING_LEVEL: &str = "2";

fn missing(node: &BlockNode, what: &str, log: &mut TranscodeLog) {
    log.push(
        Phase::Warn,
        format!("{} {} has no {what}; skipped", node.kind, node.id),
    );
}

pub(crate) fn heading(
    node: &BlockNode,
    mapper: &PropertyMapper,
    log: &mut TranscodeLog,
) -> Option<String> {
    let Some(title) = text_of(&node.props, &["title", "text", "content"]) else {
        missing(node, "text", log);
        return None;
    };
    let mut attrs = mapper.attrs_for(node, log);
    if !attrs.iter().any(|(name, _)| *name == "level") {
        attrs.insert(0, ("level", DEFAULT_HEADING_LEVEL.to_string()));
    }
    Some(Tag::new("heading").attrs(attrs).inline(&escape_text(&title)))
}

pub(crate) fn text(
    node: &BlockNode,
    mapper: &PropertyMapper,
    log: &mut TranscodeLog,
) -> Option<String> {
    let Some(body) = text_of(&node.props, &["text", "content", "body"]) else {
        missing(node, "text", log);
        return None;
    };
    let attrs = mapper.attrs_for(node, log);
    Some(Tag::new("text").attrs(attrs).inline(&escape_rich_text(&body)))
}

pub(crate) fn image(
    node: &BlockNode,
    mapper: &PropertyMapper,
    log: &mut TranscodeLog,
) -> Option<String> {
    let attrs = mapper.attrs_for(node, log);
    if !attrs.iter().any(|(name, _)| *name == "src") {
        missing(node, "usable src", log);
        return None;
    }
    let alt = text_of(&node.props, &["alt", "caption"]);
    Some(Tag::new("image").attrs(attrs).attr_opt("alt", alt).open())
}

pub(crate) fn button(
    node: &BlockNode,
    mapper: &PropertyMapper,
    log: &mut TranscodeLog,
) -> Option<String> {
    let Some(label) = text_of(&node.props, &["label", "text", "title"]) else {
        missing(node, "label", log);
        return None;
    };
    let attrs = mapper.attrs_for(node, log);
    Some(Tag::new("button").attrs(attrs).inline(&escape_text(&label)))
}

pub(crate) fn divider(node: &BlockNode, mapper: &PropertyMapper, log: &mut TranscodeLog) -> String {
    Tag::new("divider").attrs(mapper.attrs_for(node, log)).open()
}

pub(crate) fn spacer(node: &BlockNode, mapper: &PropertyMapper, log: &mut TranscodeLog) -> String {
    Tag::new("spacer").attrs(mapper.attrs_for(node, log)).open()
}

/// Best-effort rendering for a type outside the vocabulary: a generic
/// `content` prop degrades to plain text, anything else is dropped.
pub(crate) fn unrecognized(
    node: &BlockNode,
    type_name: &str,
    log: &mut TranscodeLog,
) -> Option<String> {
    match text_of(&node.props, &["content"]) {
        Some(content) => {
            log.push(
                Phase::Warn,
                format!("Unknown block type '{type_name}' ({}) degraded to text", node.id),
            );
            Some(Tag::new("text").inline(&escape_rich_text(&content)))
        }
        None => {
            log.push(
                Phase::Warn,
                format!("Unknown block type '{type_name}' ({}) skipped", node.id),
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BlockKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_heading_defaults_level() {
        let mut log = TranscodeLog::new();
        let node = BlockNode::new(BlockKind::Heading, "h").with_prop("title", "Hello");

        let out = heading(&node, &PropertyMapper, &mut log).unwrap();

        assert_eq!(out, r#"[heading level="2"]Hello[/heading]"#);
    }

    #[test]
    fn test_heading_keeps_explicit_level() {
        let mut log = TranscodeLog::new();
        let node = BlockNode::new(BlockKind::Heading, "h")
            .with_prop("title", "Hello")
            .with_prop("level", 4i64);

        let out = heading(&node, &PropertyMapper, &mut log).unwrap();

        assert_eq!(out, r#"[heading level="4"]Hello[/heading]"#);
    }

    #[test]
    fn test_image_without_src_is_skipped_with_warning() {
        let mut log = TranscodeLog::new();
        let node = BlockNode::new(BlockKind::Image, "img").with_prop("src", "javascript:x");

        assert_eq!(image(&node, &PropertyMapper, &mut log), None);
        assert_eq!(log.count(Phase::Filter), 1);
        assert_eq!(log.count(Phase::Warn), 1);
    }

    #[test]
    fn test_image_renders_self_closing() {
        let mut log = TranscodeLog::new();
        let node = BlockNode::new(BlockKind::Image, "img")
            .with_prop("src", "/logo.png")
            .with_prop("alt", "Logo")
            .with_prop("align", "center");

        let out = image(&node, &PropertyMapper, &mut log).unwrap();

        assert_eq!(out, r#"[image src="/logo.png" align="center" alt="Logo"]"#);
    }

    #[test]
    fn test_button_label_and_href() {
        let mut log = TranscodeLog::new();
        let node = BlockNode::new(BlockKind::Button, "b")
            .with_prop("label", "Buy now")
            .with_prop("href", "https://shop.example.com")
            .with_prop("variant", "primary");

        let out = button(&node, &PropertyMapper, &mut log).unwrap();

        assert_eq!(
            out,
            r#"[button href="https://shop.example.com" style="primary"]Buy now[/button]"#
        );
    }

    #[test]
    fn test_spacer_height_from_number() {
        let mut log = TranscodeLog::new();
        let node = BlockNode::new(BlockKind::Spacer, "sp").with_prop("height", 32i64);

        assert_eq!(spacer(&node, &PropertyMapper, &mut log), r#"[spacer height="32"]"#);
    }

    #[test]
    fn test_unrecognized_with_content_degrades_to_text() {
        let mut log = TranscodeLog::new();
        let node = BlockNode::new(BlockKind::Unknown("Callout".into()), "c")
            .with_prop("content", "Heads up");

        let out = unrecognized(&node, "Callout", &mut log);

        assert_eq!(out.as_deref(), Some("[text]Heads up[/text]"));
        assert!(log.entries()[0].message.contains("Callout"));
    }

    #[test]
    fn test_unrecognized_without_content_is_dropped() {
        let mut log = TranscodeLog::new();
        let node = BlockNode::new(BlockKind::Unknown("Map".into()), "m").with_prop("lat", 1.5);

        assert_eq!(unrecognized(&node, "Map", &mut log), None);
        assert_eq!(log.count(Phase::Warn), 1);
        assert!(log.entries()[0].message.contains("'Map'"));
    }
}
