//! Composite kinds expand to fixed templates of primitives.
//!
//! Their sub-parts (feature cards, plans, questions) live in list-typed props
//! rather than in zones, because the editor does not expose them as
//! independently editable nodes.

use crate::diagnostics::{Phase, TranscodeLog};
use crate::model::{BlockNode, PropValue, Props, text_of, value_of};
use crate::sanitize::{PropertyMapper, TargetProperty};

use super::markup::{Tag, escape_rich_text, escape_text};

/// Records of a list-typed prop, skipping entries that are not records.
fn records<'a>(props: &'a Props, keys: &[&str]) -> Vec<&'a Props> {
    value_of(props, keys)
        .and_then(PropValue::as_list)
        .map(|items| items.iter().filter_map(PropValue::as_map).collect())
        .unwrap_or_default()
}

/// Split a 12-unit grid across `n` columns, remainder to the leftmost.
pub(crate) fn spans(n: usize) -> Vec<usize> {
    let n = n.clamp(1, 12);
    let base = 12 / n;
    let extra = 12 % n;
    (0..n).map(|i| base + usize::from(i < extra)).collect()
}

fn columns_per_row(props: &Props, items: usize) -> usize {
    value_of(props, &["columns", "perRow"])
        .and_then(PropValue::as_f64)
        .filter(|n| *n >= 1.0)
        .map(|n| (n as usize).min(6))
        .unwrap_or_else(|| items.clamp(1, 3))
}

/// Lay out rendered cells in `row_inner` rows of `per_row` columns.
fn grid(cells: Vec<String>, per_row: usize) -> String {
    cells
        .chunks(per_row.max(1))
        .map(|chunk| {
            let columns: Vec<String> = chunk
                .iter()
                .zip(spans(per_row))
                .map(|(cell, span)| {
                    Tag::new("column_inner")
                        .attr("span", span.to_string())
                        .block(cell)
                })
                .collect();
            Tag::new("row_inner").block(&columns.join("\n"))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn section_title(props: &Props) -> Option<String> {
    text_of(props, &["title", "heading"]).map(|title| {
        Tag::new("heading")
            .attr("level", "2")
            .attr("align", "center")
            .inline(&escape_text(&title))
    })
}

fn empty(node: &BlockNode, what: &str, log: &mut TranscodeLog) {
    log.push(
        Phase::Warn,
        format!("{} {} has no {what}; skipped", node.kind, node.id),
    );
}

fn link(
    record: &Props,
    keys: &[&str],
    node: &BlockNode,
    mapper: &PropertyMapper,
    log: &mut TranscodeLog,
) -> Option<String> {
    let raw = text_of(record, keys)?;
    mapper.filter(TargetProperty::Href, &raw, Some(&node.id), log)
}

fn media(
    record: &Props,
    keys: &[&str],
    node: &BlockNode,
    mapper: &PropertyMapper,
    log: &mut TranscodeLog,
) -> Option<String> {
    let raw = text_of(record, keys)?;
    mapper.filter(TargetProperty::Src, &raw, Some(&node.id), log)
}

pub(crate) fn columns(
    node: &BlockNode,
    _mapper: &PropertyMapper,
    log: &mut TranscodeLog,
) -> Option<String> {
    let items = records(&node.props, &["columns", "items"]);
    if items.is_empty() {
        empty(node, "columns", log);
        return None;
    }
    let cells: Vec<String> = items
        .iter()
        .map(|item| {
            let mut parts = Vec::new();
            if let Some(title) = text_of(item, &["title", "heading"]) {
                parts.push(
                    Tag::new("heading")
                        .attr("level", "3")
                        .inline(&escape_text(&title)),
                );
            }
            if let Some(content) = text_of(item, &["content", "text"]) {
                parts.push(Tag::new("text").inline(&escape_rich_text(&content)));
            }
            parts.join("\n")
        })
        .collect();
    let per_row = cells.len().min(6);
    Some(grid(cells, per_row))
}

pub(crate) fn card(
    node: &BlockNode,
    mapper: &PropertyMapper,
    log: &mut TranscodeLog,
) -> Option<String> {
    let attrs = mapper.attrs_for(node, log);
    let props = &node.props;
    let title = text_of(props, &["title", "heading"]);
    let mut parts = Vec::new();

    if let Some(src) = media(props, &["image", "imageUrl", "src"], node, mapper, log) {
        parts.push(
            Tag::new("image")
                .attr("src", src)
                .attr_opt("alt", title.clone())
                .open(),
        );
    }
    if let Some(title) = &title {
        parts.push(
            Tag::new("heading")
                .attr("level", "3")
                .inline(&escape_text(title)),
        );
    }
    if let Some(body) = text_of(props, &["text", "description", "body"]) {
        parts.push(Tag::new("text").inline(&escape_rich_text(&body)));
    }
    if let Some(label) = text_of(props, &["buttonLabel", "ctaLabel", "linkLabel"]) {
        let href = link(props, &["buttonHref", "ctaHref", "href", "link"], node, mapper, log);
        parts.push(
            Tag::new("button")
                .attr_opt("href", href)
                .inline(&escape_text(&label)),
        );
    }

    if parts.is_empty() {
        empty(node, "content", log);
        return None;
    }
    Some(Tag::new("box").attrs(attrs).block(&parts.join("\n")))
}

pub(crate) fn hero(
    node: &BlockNode,
    mapper: &PropertyMapper,
    log: &mut TranscodeLog,
) -> Option<String> {
    let attrs = mapper.attrs_for(node, log);
    let props = &node.props;
    let mut parts = Vec::new();

    if let Some(title) = text_of(props, &["title", "heading"]) {
        parts.push(
            Tag::new("heading")
                .attr("level", "1")
                .inline(&escape_text(&title)),
        );
    }
    if let Some(subtitle) = text_of(props, &["subtitle", "description", "text"]) {
        parts.push(Tag::new("text").inline(&escape_rich_text(&subtitle)));
    }
    if let Some(label) = text_of(props, &["ctaLabel", "buttonLabel"]) {
        let href = link(props, &["ctaHref", "buttonHref", "href"], node, mapper, log);
        parts.push(
            Tag::new("button")
                .attr_opt("href", href)
                .attr("style", "primary")
                .inline(&escape_text(&label)),
        );
    }

    if parts.is_empty() {
        empty(node, "content", log);
        return None;
    }
    Some(Tag::new("box").attrs(attrs).block(&parts.join("\n")))
}

pub(crate) fn feature_grid(
    node: &BlockNode,
    _mapper: &PropertyMapper,
    log: &mut TranscodeLog,
) -> Option<String> {
    let features = records(&node.props, &["features", "items"]);
    if features.is_empty() {
        empty(node, "features", log);
        return None;
    }
    let cells: Vec<String> = features
        .iter()
        .map(|feature| {
            Tag::new("blurb")
                .attr_opt("title", text_of(feature, &["title", "name"]))
                .attr_opt("icon", text_of(feature, &["icon"]))
                .inline(&escape_rich_text(
                    &text_of(feature, &["description", "text", "content"]).unwrap_or_default(),
                ))
        })
        .collect();
    let per_row = columns_per_row(&node.props, cells.len());

    let mut parts: Vec<String> = section_title(&node.props).into_iter().collect();
    parts.push(grid(cells, per_row));
    Some(parts.join("\n"))
}

fn plan_features(plan: &Props) -> Vec<String> {
    match value_of(plan, &["features", "items"]) {
        Some(PropValue::List(items)) => items
            .iter()
            .filter_map(|item| match item {
                PropValue::Map(map) => text_of(map, &["text", "label", "title"]),
                other => other.to_text(),
            })
            .collect(),
        Some(other) => other
            .to_text()
            .map(|text| {
                text.lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        None => Vec::new(),
    }
}

pub(crate) fn pricing_cards(
    node: &BlockNode,
    mapper: &PropertyMapper,
    log: &mut TranscodeLog,
) -> Option<String> {
    let plans = records(&node.props, &["plans", "tiers", "items"]);
    if plans.is_empty() {
        empty(node, "plans", log);
        return None;
    }
    let tables: Vec<String> = plans
        .iter()
        .map(|plan| {
            let featured = value_of(plan, &["highlighted", "featured"])
                .and_then(PropValue::as_bool)
                .unwrap_or(false);
            let lines: Vec<String> = plan_features(plan)
                .iter()
                .map(|feature| format!("+ {}", escape_text(feature)))
                .collect();
            Tag::new("pricing_table")
                .attr_opt("title", text_of(plan, &["name", "title"]))
                .attr_opt("price", text_of(plan, &["price"]))
                .attr_opt("period", text_of(plan, &["period", "interval"]))
                .attr_opt("featured", featured.then(|| "on".to_string()))
                .attr_opt("button_text", text_of(plan, &["ctaLabel", "buttonLabel"]))
                .attr_opt(
                    "button_url",
                    link(plan, &["ctaHref", "buttonHref", "href"], node, mapper, log),
                )
                .block(&lines.join("\n"))
        })
        .collect();

    let mut parts: Vec<String> = section_title(&node.props).into_iter().collect();
    parts.push(Tag::new("pricing_tables").block(&tables.join("\n")));
    Some(parts.join("\n"))
}

pub(crate) fn testimonial(
    node: &BlockNode,
    mapper: &PropertyMapper,
    log: &mut TranscodeLog,
) -> Option<String> {
    let props = &node.props;
    let Some(quote) = text_of(props, &["quote", "text", "content"]) else {
        empty(node, "quote", log);
        return None;
    };
    Some(
        Tag::new("testimonial")
            .attr_opt("author", text_of(props, &["author", "name"]))
            .attr_opt("job_title", text_of(props, &["role", "jobTitle", "company"]))
            .attr_opt(
                "portrait",
                media(props, &["avatar", "image", "portrait"], node, mapper, log),
            )
            .inline(&escape_text(&quote)),
    )
}

pub(crate) fn stats_row(
    node: &BlockNode,
    _mapper: &PropertyMapper,
    log: &mut TranscodeLog,
) -> Option<String> {
    let stats = records(&node.props, &["stats", "items"]);
    if stats.is_empty() {
        empty(node, "stats", log);
        return None;
    }
    let cells: Vec<String> = stats
        .iter()
        .map(|stat| {
            Tag::new("counter")
                .attr_opt("number", text_of(stat, &["value", "number"]))
                .attr_opt("title", text_of(stat, &["label", "title"]))
                .open()
        })
        .collect();
    let per_row = cells.len().min(6);
    Some(grid(cells, per_row))
}

pub(crate) fn faq(
    node: &BlockNode,
    _mapper: &PropertyMapper,
    log: &mut TranscodeLog,
) -> Option<String> {
    let items = records(&node.props, &["items", "questions", "faqs"]);
    if items.is_empty() {
        empty(node, "questions", log);
        return None;
    }
    let toggles: Vec<String> = items
        .iter()
        .filter_map(|item| {
            let question = text_of(item, &["question", "title"])?;
            let answer = text_of(item, &["answer", "content", "text"]).unwrap_or_default();
            Some(
                Tag::new("toggle")
                    .attr("title", question)
                    .inline(&escape_rich_text(&answer)),
            )
        })
        .collect();

    let mut parts: Vec<String> = section_title(&node.props).into_iter().collect();
    parts.push(Tag::new("accordion").block(&toggles.join("\n")));
    Some(parts.join("\n"))
}
