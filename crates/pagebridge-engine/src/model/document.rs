use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::block::BlockNode;
use super::props::Props;
use super::zone::ZoneKey;

/// Page-level properties (title, theme settings) carried by the editor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RootBlock {
    #[serde(default)]
    pub props: Props,
}

/// A page as the block editor sees it.
///
/// Two owned collections hold the whole tree: the ordered top level and a
/// flat registry of zones keyed by `"{owner_id}:{zone}"`. Nodes never point
/// at each other, so there is no ownership cycle to worry about however deep
/// the page nests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub root: RootBlock,
    #[serde(rename = "content", default)]
    pub top_level: Vec<BlockNode>,
    #[serde(default)]
    pub zones: BTreeMap<ZoneKey, Vec<BlockNode>>,
}

/// Structural problems found by [`Document::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    /// A node without an id cannot own a zone or be traced in the log.
    MissingId { kind: String },
    /// The same id is placed more than once across top level and zones.
    DuplicateId(String),
    /// A zone whose owner id appears nowhere in the document.
    DanglingZone(ZoneKey),
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationIssue::MissingId { kind } => write!(f, "{kind} node has no id"),
            ValidationIssue::DuplicateId(id) => {
                write!(f, "node id '{id}' is placed more than once")
            }
            ValidationIssue::DanglingZone(key) => {
                write!(f, "zone '{key}' belongs to no node in the document")
            }
        }
    }
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the editor's JSON form.
    pub fn from_json_bytes(bytes: &[u8]) -> anyhow::Result<Self> {
        let text = std::str::from_utf8(bytes)?;
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Children stored under `key`, or `None` when the zone was never filled.
    pub fn zone(&self, key: &ZoneKey) -> Option<&[BlockNode]> {
        self.zones.get(key).map(Vec::as_slice)
    }

    /// Children of `node`'s zone `zone`; an unresolved zone is simply empty.
    pub fn children<'a>(&'a self, node: &BlockNode, zone: &str) -> &'a [BlockNode] {
        self.zone(&node.zone_key(zone)).unwrap_or(&[])
    }

    pub fn push_top_level(&mut self, node: BlockNode) {
        self.top_level.push(node);
    }

    /// Append `node` to the zone `key`, creating the zone on first use.
    pub fn push_to_zone(&mut self, key: ZoneKey, node: BlockNode) {
        self.zones.entry(key).or_default().push(node);
    }

    /// All nodes, top level first then zones in key order.
    pub fn nodes(&self) -> impl Iterator<Item = &BlockNode> {
        self.top_level
            .iter()
            .chain(self.zones.values().flat_map(|nodes| nodes.iter()))
    }

    pub fn node_count(&self) -> usize {
        self.nodes().count()
    }

    pub fn find(&self, id: &str) -> Option<&BlockNode> {
        self.nodes().find(|node| node.id == id)
    }

    /// Report placement problems without failing.
    ///
    /// Compilation tolerates every issue listed here; callers surface them as
    /// warnings.
    pub fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        let mut seen = BTreeSet::new();

        for node in self.nodes() {
            if node.id.is_empty() {
                issues.push(ValidationIssue::MissingId {
                    kind: node.kind.type_name().to_string(),
                });
            } else if !seen.insert(node.id.as_str()) {
                issues.push(ValidationIssue::DuplicateId(node.id.clone()));
            }
        }

        for key in self.zones.keys() {
            if !seen.contains(key.owner_id()) {
                issues.push(ValidationIssue::DanglingZone(key.clone()));
            }
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BlockKind, PropValue};
    use pretty_assertions::assert_eq;

    const EDITOR_JSON: &str = r##"{
        "root": {"props": {"title": "Landing"}},
        "content": [
            {"type": "Section", "props": {"id": "s1", "backgroundColor": "#111"}}
        ],
        "zones": {
            "s1:content": [
                {"type": "Heading", "props": {"id": "h1", "title": "Hi", "align": "center"}}
            ]
        }
    }"##;

    #[test]
    fn test_parse_editor_json() {
        let doc = Document::from_json_bytes(EDITOR_JSON.as_bytes()).unwrap();

        assert_eq!(doc.root.props["title"], PropValue::Text("Landing".into()));
        assert_eq!(doc.top_level.len(), 1);
        assert_eq!(doc.top_level[0].kind, BlockKind::Section);

        let children = doc.children(&doc.top_level[0], "content");
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].id, "h1");
    }

    #[test]
    fn test_json_roundtrip_preserves_document() {
        let doc = Document::from_json_bytes(EDITOR_JSON.as_bytes()).unwrap();
        let json = doc.to_json_pretty().unwrap();
        let reparsed = Document::from_json_bytes(json.as_bytes()).unwrap();

        assert_eq!(doc, reparsed);
    }

    #[test]
    fn test_unresolved_zone_is_empty() {
        let doc = Document::new();
        let section = BlockNode::new(BlockKind::Section, "ghost");

        assert!(doc.zone(&section.content_zone()).is_none());
        assert!(doc.children(&section, "content").is_empty());
    }

    #[test]
    fn test_validate_reports_duplicates_and_dangling_zones() {
        let mut doc = Document::new();
        doc.push_top_level(BlockNode::new(BlockKind::Section, "s1"));
        doc.push_to_zone(
            ZoneKey::content("s1"),
            BlockNode::new(BlockKind::Heading, "s1"),
        );
        doc.push_to_zone(
            ZoneKey::content("missing"),
            BlockNode::new(BlockKind::Text, "t1"),
        );

        let issues = doc.validate();

        assert_eq!(
            issues,
            vec![
                ValidationIssue::DuplicateId("s1".into()),
                ValidationIssue::DanglingZone(ZoneKey::content("missing")),
            ]
        );
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        assert!(Document::from_json_bytes(b"{not json").is_err());
    }
}
