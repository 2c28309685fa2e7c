//! Dialect elements back to block nodes.

use crate::diagnostics::Phase;
use crate::model::{BlockKind, BlockNode, PropValue, Props};
use crate::sanitize::TargetProperty;

use super::Importer;
use super::dialect::{Element, Markup};

/// Text that went through attribute or text escaping on the way out.
fn plain(text: &str) -> String {
    html_escape::decode_html_entities(text.trim()).into_owned()
}

/// Rich text keeps its inline HTML; only the dialect's own brackets were
/// escaped.
fn rich(text: &str) -> String {
    text.trim().replace("&#91;", "[").replace("&#93;", "]")
}

fn record(fields: Vec<(&str, Option<PropValue>)>) -> PropValue {
    let props: Props = fields
        .into_iter()
        .filter_map(|(key, value)| value.map(|value| (key.to_string(), value)))
        .collect();
    PropValue::Map(props)
}

fn text_value(text: String) -> Option<PropValue> {
    (!text.is_empty()).then(|| PropValue::Text(text))
}

impl Importer<'_> {
    /// Rebuild a run of sibling markup. Consecutive `row_inner` rows form one
    /// grid; blank text between tags is layout whitespace.
    pub(super) fn dialect_children(&mut self, children: &[Markup]) -> Vec<BlockNode> {
        let mut nodes = Vec::new();
        let mut rows: Vec<&Element> = Vec::new();

        for child in children {
            match child {
                Markup::Element(el) if el.name == "row_inner" => {
                    rows.push(el);
                    continue;
                }
                Markup::Text(text) if text.trim().is_empty() => continue,
                _ => {}
            }
            if !rows.is_empty() {
                nodes.extend(self.grid(&rows));
                rows.clear();
            }
            match child {
                Markup::Element(el) => nodes.extend(self.element(el)),
                Markup::Text(text) => {
                    let node = self.node(BlockKind::Text).with_prop("text", rich(text));
                    nodes.push(node);
                }
            }
        }
        if !rows.is_empty() {
            nodes.extend(self.grid(&rows));
        }
        nodes
    }

    fn element(&mut self, el: &Element) -> Vec<BlockNode> {
        match el.name.as_str() {
            "section" => {
                self.log.push(
                    Phase::Warn,
                    "Section nested inside a section; children flattened",
                );
                self.dialect_children(&el.children)
            }
            "row" | "column" | "column_inner" => self.dialect_children(&el.children),
            "heading" => self.heading(el).into_iter().collect(),
            "text" => self.text(el).into_iter().collect(),
            "image" => self.image(el).into_iter().collect(),
            "button" => self.button(el).into_iter().collect(),
            "divider" => {
                let node = self.node(BlockKind::Divider);
                let node = self.styled(node, "color", TargetProperty::Color, el.attr("color"));
                vec![self.styled(node, "margin", TargetProperty::Margin, el.attr("margin"))]
            }
            "spacer" => {
                let node = self.node(BlockKind::Spacer);
                vec![self.styled(node, "height", TargetProperty::Height, el.attr("height"))]
            }
            "box" => vec![self.boxed(el)],
            "pricing_tables" => {
                let mut tables = Vec::new();
                el.find_all("pricing_table", &mut tables);
                self.pricing(&tables).into_iter().collect()
            }
            "pricing_table" => self.pricing(&[el]).into_iter().collect(),
            "testimonial" => self.testimonial(el).into_iter().collect(),
            "accordion" => {
                let mut toggles = Vec::new();
                el.find_all("toggle", &mut toggles);
                self.faq(&toggles).into_iter().collect()
            }
            "toggle" => self.faq(&[el]).into_iter().collect(),
            "blurb" => vec![self.features(&[el], 1)],
            "counter" => vec![self.stats(&[el])],
            _ => self.unrecognized(el).into_iter().collect(),
        }
    }

    fn skipped(&mut self, what: &str, reason: &str) {
        self.log
            .push(Phase::Warn, format!("[{what}] {reason}; skipped"));
    }

    fn heading(&mut self, el: &Element) -> Option<BlockNode> {
        let title = plain(&el.text());
        if title.is_empty() {
            self.skipped("heading", "has no text");
            return None;
        }
        let node = self.node(BlockKind::Heading).with_prop("title", title);
        let node = self.styled(node, "level", TargetProperty::Level, el.attr("level"));
        let node = self.styled(node, "align", TargetProperty::Align, el.attr("align"));
        Some(self.styled(node, "color", TargetProperty::Color, el.attr("color")))
    }

    fn text(&mut self, el: &Element) -> Option<BlockNode> {
        let body = rich(&el.text());
        if body.is_empty() {
            self.skipped("text", "is empty");
            return None;
        }
        let node = self.node(BlockKind::Text).with_prop("text", body);
        let node = self.styled(node, "align", TargetProperty::Align, el.attr("align"));
        Some(self.styled(node, "color", TargetProperty::Color, el.attr("color")))
    }

    fn image(&mut self, el: &Element) -> Option<BlockNode> {
        let mut node = self.node(BlockKind::Image);
        if let Some(alt) = el.attr("alt") {
            node = node.with_prop("alt", alt);
        }
        let node = self.styled(node, "src", TargetProperty::Src, el.attr("src"));
        if node.prop("src").is_none() {
            self.skipped("image", "has no usable src");
            return None;
        }
        Some(self.styled(node, "align", TargetProperty::Align, el.attr("align")))
    }

    fn button(&mut self, el: &Element) -> Option<BlockNode> {
        let label = plain(&el.text());
        if label.is_empty() {
            self.skipped("button", "has no label");
            return None;
        }
        let node = self.node(BlockKind::Button).with_prop("label", label);
        let node = self.styled(node, "href", TargetProperty::Href, el.attr("href"));
        let node = self.styled(node, "variant", TargetProperty::ButtonStyle, el.attr("style"));
        Some(self.styled(node, "align", TargetProperty::Align, el.attr("align")))
    }

    /// `[box]` is a hero when it leads with a level-1 heading, a card otherwise.
    fn boxed(&mut self, el: &Element) -> BlockNode {
        let heading = el.find("heading");
        let is_hero = heading.and_then(|h| h.attr("level")).as_deref() == Some("1");
        let (kind, body_key, label_key, href_key) = if is_hero {
            (BlockKind::Hero, "subtitle", "ctaLabel", "ctaHref")
        } else {
            (BlockKind::Card, "text", "buttonLabel", "buttonHref")
        };

        let mut node = self.node(kind);
        if let Some(title) = heading.map(|h| plain(&h.text())).filter(|t| !t.is_empty()) {
            node = node.with_prop("title", title);
        }
        if let Some(body) = el.find("text").map(|t| rich(&t.text())).filter(|t| !t.is_empty()) {
            node = node.with_prop(body_key, body);
        }
        if let Some(button) = el.find("button") {
            let label = plain(&button.text());
            if !label.is_empty() {
                node = node.with_prop(label_key, label);
            }
            node = self.styled(node, href_key, TargetProperty::Href, button.attr("href"));
        }
        if !is_hero && let Some(image) = el.find("image") {
            node = self.styled(node, "image", TargetProperty::Src, image.attr("src"));
        }

        let node = self.styled(
            node,
            "backgroundColor",
            TargetProperty::BgColor,
            el.attr("bg_color"),
        );
        let node = self.styled(
            node,
            "backgroundImage",
            TargetProperty::BgImage,
            el.attr("bg_image"),
        );
        let node = self.styled(node, "padding", TargetProperty::Padding, el.attr("padding"));
        self.styled(node, "align", TargetProperty::Align, el.attr("align"))
    }

    /// Inner rows become a feature grid, a stats row or plain columns,
    /// depending on what their cells hold.
    fn grid(&mut self, rows: &[&Element]) -> Vec<BlockNode> {
        let cell_rows: Vec<Vec<Vec<&Element>>> = rows
            .iter()
            .map(|row| {
                let columns: Vec<&Element> =
                    row.elements().filter(|el| el.name == "column_inner").collect();
                if columns.is_empty() {
                    row.elements().map(|el| vec![el]).collect()
                } else {
                    columns.iter().map(|col| col.elements().collect()).collect()
                }
            })
            .collect();
        let per_row = cell_rows.iter().map(Vec::len).max().unwrap_or(1).max(1);
        let cells: Vec<Vec<&Element>> = cell_rows.into_iter().flatten().collect();
        let contents: Vec<&Element> = cells.iter().flatten().copied().collect();

        if contents.is_empty() {
            self.skipped("row_inner", "has no content");
            return Vec::new();
        }
        if contents.iter().all(|el| el.name == "blurb") {
            return vec![self.features(&contents, per_row)];
        }
        if contents.iter().all(|el| el.name == "counter") {
            return vec![self.stats(&contents)];
        }

        let node = self.node(BlockKind::Columns);
        let mut columns = Vec::new();
        for cell in &cells {
            let title = cell
                .iter()
                .find(|el| el.name == "heading")
                .map(|el| plain(&el.text()));
            let content = cell
                .iter()
                .find(|el| el.name == "text")
                .map(|el| rich(&el.text()));
            let dropped = cell
                .iter()
                .filter(|el| el.name != "heading" && el.name != "text")
                .count();
            if dropped > 0 {
                self.log.push(
                    Phase::Warn,
                    format!("{} {}: {dropped} column items not kept", node.kind, node.id),
                );
            }
            columns.push(record(vec![
                ("title", title.and_then(text_value)),
                ("content", content.and_then(text_value)),
            ]));
        }
        vec![node.with_prop("columns", columns)]
    }

    fn features(&mut self, blurbs: &[&Element], per_row: usize) -> BlockNode {
        let features: Vec<PropValue> = blurbs
            .iter()
            .map(|blurb| {
                record(vec![
                    ("title", blurb.attr("title").map(PropValue::from)),
                    ("icon", blurb.attr("icon").map(PropValue::from)),
                    ("description", text_value(rich(&blurb.text()))),
                ])
            })
            .collect();
        self.node(BlockKind::FeatureGrid)
            .with_prop("features", features)
            .with_prop("columns", per_row as i64)
    }

    fn stats(&mut self, counters: &[&Element]) -> BlockNode {
        let stats: Vec<PropValue> = counters
            .iter()
            .map(|counter| {
                record(vec![
                    ("value", counter.attr("number").map(PropValue::from)),
                    ("label", counter.attr("title").map(PropValue::from)),
                ])
            })
            .collect();
        self.node(BlockKind::StatsRow).with_prop("stats", stats)
    }

    fn pricing(&mut self, tables: &[&Element]) -> Option<BlockNode> {
        if tables.is_empty() {
            self.skipped("pricing_tables", "has no plans");
            return None;
        }
        let node = self.node(BlockKind::PricingCards);
        let mut plans = Vec::new();
        for table in tables {
            let features: Vec<PropValue> = table
                .text()
                .lines()
                .map(str::trim)
                .map(|line| line.strip_prefix('+').unwrap_or(line).trim())
                .filter(|line| !line.is_empty())
                .map(|line| PropValue::from(plain(line)))
                .collect();
            let href = match table.attr("button_url") {
                Some(raw) => self
                    .mapper
                    .filter(TargetProperty::Href, &raw, Some(&node.id), self.log),
                None => None,
            };
            let featured = table.attr("featured").as_deref() == Some("on");
            plans.push(record(vec![
                ("name", table.attr("title").map(PropValue::from)),
                ("price", table.attr("price").map(PropValue::from)),
                ("period", table.attr("period").map(PropValue::from)),
                ("highlighted", featured.then_some(PropValue::Bool(true))),
                ("ctaLabel", table.attr("button_text").map(PropValue::from)),
                ("ctaHref", href.map(PropValue::from)),
                ("features", Some(PropValue::List(features))),
            ]));
        }
        Some(node.with_prop("plans", plans))
    }

    fn testimonial(&mut self, el: &Element) -> Option<BlockNode> {
        let quote = plain(&el.text());
        if quote.is_empty() {
            self.skipped("testimonial", "has no quote");
            return None;
        }
        let mut node = self.node(BlockKind::Testimonial).with_prop("quote", quote);
        if let Some(author) = el.attr("author") {
            node = node.with_prop("author", author);
        }
        if let Some(role) = el.attr("job_title") {
            node = node.with_prop("role", role);
        }
        Some(self.styled(node, "avatar", TargetProperty::Src, el.attr("portrait")))
    }

    fn faq(&mut self, toggles: &[&Element]) -> Option<BlockNode> {
        let items: Vec<PropValue> = toggles
            .iter()
            .filter_map(|toggle| {
                let question = toggle.attr("title")?;
                Some(record(vec![
                    ("question", Some(PropValue::from(question))),
                    ("answer", text_value(rich(&toggle.text()))),
                ]))
            })
            .collect();
        if items.is_empty() {
            self.skipped("accordion", "has no questions");
            return None;
        }
        Some(self.node(BlockKind::Faq).with_prop("items", items))
    }

    /// Unknown tags keep their inner text when they have any.
    fn unrecognized(&mut self, el: &Element) -> Option<BlockNode> {
        let inner = rich(&el.text());
        if inner.is_empty() {
            self.skipped(&el.name, "is not a known tag");
            return None;
        }
        self.log.push(
            Phase::Warn,
            format!("Unknown tag [{}] degraded to text", el.name),
        );
        Some(self.node(BlockKind::Text).with_prop("text", inner))
    }
}
