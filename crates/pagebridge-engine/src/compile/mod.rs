//! Block tree → theme dialect compiler.
//!
//! Every structural container renders as `section > row > column`, whatever
//! its zone holds. Top-level content outside any section is grouped into a
//! synthesized section so the grammar holds for the whole page.

mod composites;
mod leaves;
pub mod markup;

use serde_json::json;

use crate::diagnostics::{Phase, TranscodeLog};
use crate::model::{BlockKind, BlockNode, Document, ZoneKey};
use crate::sanitize::PropertyMapper;

pub use markup::{Tag, escape_attr, escape_rich_text, escape_text, structure};

/// Compile `doc` into dialect markup, recording every decision in `log`.
///
/// Pure over the document: the same input always yields the same string.
pub fn compile(doc: &Document, log: &mut TranscodeLog) -> String {
    Compiler::new(doc, log).run()
}

/// One compilation run over a single document.
pub struct Compiler<'a> {
    doc: &'a Document,
    mapper: PropertyMapper,
    log: &'a mut TranscodeLog,
    /// Zones currently being expanded, innermost last.
    active_zones: Vec<ZoneKey>,
    converted: usize,
}

impl<'a> Compiler<'a> {
    pub fn new(doc: &'a Document, log: &'a mut TranscodeLog) -> Self {
        Self {
            doc,
            mapper: PropertyMapper::new(),
            log,
            active_zones: Vec::new(),
            converted: 0,
        }
    }

    pub fn run(mut self) -> String {
        self.log.push(
            Phase::Init,
            format!(
                "Compiling document: {} top-level nodes, {} zones",
                self.doc.top_level.len(),
                self.doc.zones.len()
            ),
        );
        for issue in self.doc.validate() {
            self.log.push(Phase::Warn, issue.to_string());
        }

        let doc = self.doc;
        let mut sections = Vec::new();
        let mut loose = Vec::new();
        for node in &doc.top_level {
            if node.kind.is_structural() {
                self.wrap_loose(&mut loose, &mut sections);
                sections.push(self.section(node));
            } else if let Some(markup) = self.node(node) {
                loose.push(markup);
            }
        }
        self.wrap_loose(&mut loose, &mut sections);

        let markup = sections.join("\n");
        self.log.push(
            Phase::Success,
            format!(
                "Compiled {} nodes into {} bytes",
                self.converted,
                markup.len()
            ),
        );
        markup
    }

    /// Close a run of top-level non-section markup into its own section.
    fn wrap_loose(&mut self, loose: &mut Vec<String>, sections: &mut Vec<String>) {
        if loose.is_empty() {
            return;
        }
        self.log.push(
            Phase::Block,
            format!("Synthesized section around {} top-level nodes", loose.len()),
        );
        sections.push(structure(Vec::new(), &loose.join("\n")));
        loose.clear();
    }

    fn section(&mut self, node: &BlockNode) -> String {
        let attrs = self.mapper.attrs_for(node, self.log);
        let zone = node.content_zone();
        let content = self.zone(&zone);

        let background = attrs
            .iter()
            .find(|(name, _)| *name == "bg_color")
            .map(|(_, value)| value.clone());
        self.converted += 1;
        self.log.push_with(
            Phase::Block,
            format!("Section {} compiled", node.id),
            json!({
                "id": node.id,
                "type": node.kind.type_name(),
                "zone": zone.as_str(),
                "background": background,
            }),
        );
        structure(attrs, &content)
    }

    /// Compile a zone's children in list order, one per line. A zone that
    /// was never filled, or one already being expanded, yields nothing.
    fn zone(&mut self, key: &ZoneKey) -> String {
        if self.active_zones.contains(key) {
            self.log.push(
                Phase::Warn,
                format!("Zone {key} refers back to itself; left empty"),
            );
            return String::new();
        }
        let doc = self.doc;
        let Some(children) = doc.zone(key) else {
            self.log
                .push(Phase::Block, format!("Zone {key} unresolved; empty content"));
            return String::new();
        };

        self.active_zones.push(key.clone());
        let parts: Vec<String> = children
            .iter()
            .filter_map(|child| self.node(child))
            .collect();
        self.active_zones.pop();
        parts.join("\n")
    }

    fn node(&mut self, node: &BlockNode) -> Option<String> {
        let mapper = &self.mapper;
        let log = &mut *self.log;
        let out = match &node.kind {
            BlockKind::Section => {
                log.push(
                    Phase::Warn,
                    format!("Section {} nested inside a section; children flattened", node.id),
                );
                let content = self.zone(&node.content_zone());
                return (!content.is_empty()).then_some(content);
            }
            BlockKind::Heading => leaves::heading(node, mapper, log),
            BlockKind::Text => leaves::text(node, mapper, log),
            BlockKind::Image => leaves::image(node, mapper, log),
            BlockKind::Button => leaves::button(node, mapper, log),
            BlockKind::Divider => Some(leaves::divider(node, mapper, log)),
            BlockKind::Spacer => Some(leaves::spacer(node, mapper, log)),
            BlockKind::Columns => composites::columns(node, mapper, log),
            BlockKind::Card => composites::card(node, mapper, log),
            BlockKind::FeatureGrid => composites::feature_grid(node, mapper, log),
            BlockKind::PricingCards => composites::pricing_cards(node, mapper, log),
            BlockKind::Testimonial => composites::testimonial(node, mapper, log),
            BlockKind::StatsRow => composites::stats_row(node, mapper, log),
            BlockKind::Faq => composites::faq(node, mapper, log),
            BlockKind::Hero => composites::hero(node, mapper, log),
            BlockKind::Unknown(name) => leaves::unrecognized(node, name, log),
        };

        if out.is_some() {
            self.converted += 1;
            self.log.push_with(
                Phase::Block,
                format!("{} {} compiled", node.kind, node.id),
                json!({ "id": node.id, "type": node.kind.type_name() }),
            );
        }
        out
    }
}
