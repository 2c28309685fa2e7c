use serde::{Deserialize, Serialize};

use super::props::{PropValue, Props};
use super::zone::{CONTENT_ZONE, ZoneKey};

/// Broad shape of a block kind, which decides how the compiler treats it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockCategory {
    /// Owns a content zone and renders the section -> row -> column skeleton.
    Structural,
    /// Maps to exactly one markup primitive.
    Leaf,
    /// Expands to a fixed template of primitives driven by its props.
    Composite,
    /// Type tag outside the known vocabulary.
    Unrecognized,
}

/// The closed vocabulary of block kinds the editor can produce.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Section,
    Heading,
    Text,
    Image,
    Button,
    Divider,
    Spacer,
    Columns,
    Card,
    FeatureGrid,
    PricingCards,
    Testimonial,
    StatsRow,
    Faq,
    Hero,
    /// Anything else, keeping the original type tag for diagnostics.
    Unknown(String),
}

impl BlockKind {
    /// Parse an editor type tag. Unknown tags are preserved, never rejected.
    pub fn from_type_name(name: &str) -> Self {
        match name {
            "Section" => BlockKind::Section,
            "Heading" => BlockKind::Heading,
            "Text" | "Paragraph" => BlockKind::Text,
            "Image" => BlockKind::Image,
            "Button" => BlockKind::Button,
            "Divider" => BlockKind::Divider,
            "Spacer" => BlockKind::Spacer,
            "Columns" => BlockKind::Columns,
            "Card" => BlockKind::Card,
            "FeatureGrid" => BlockKind::FeatureGrid,
            "PricingCards" => BlockKind::PricingCards,
            "Testimonial" => BlockKind::Testimonial,
            "StatsRow" | "Stats" => BlockKind::StatsRow,
            "Faq" | "FAQ" => BlockKind::Faq,
            "Hero" => BlockKind::Hero,
            other => BlockKind::Unknown(other.to_string()),
        }
    }

    /// The canonical editor type tag.
    pub fn type_name(&self) -> &str {
        match self {
            BlockKind::Section => "Section",
            BlockKind::Heading => "Heading",
            BlockKind::Text => "Text",
            BlockKind::Image => "Image",
            BlockKind::Button => "Button",
            BlockKind::Divider => "Divider",
            BlockKind::Spacer => "Spacer",
            BlockKind::Columns => "Columns",
            BlockKind::Card => "Card",
            BlockKind::FeatureGrid => "FeatureGrid",
            BlockKind::PricingCards => "PricingCards",
            BlockKind::Testimonial => "Testimonial",
            BlockKind::StatsRow => "StatsRow",
            BlockKind::Faq => "Faq",
            BlockKind::Hero => "Hero",
            BlockKind::Unknown(name) => name,
        }
    }

    pub fn category(&self) -> BlockCategory {
        match self {
            BlockKind::Section => BlockCategory::Structural,
            BlockKind::Heading
            | BlockKind::Text
            | BlockKind::Image
            | BlockKind::Button
            | BlockKind::Divider
            | BlockKind::Spacer => BlockCategory::Leaf,
            BlockKind::Columns
            | BlockKind::Card
            | BlockKind::FeatureGrid
            | BlockKind::PricingCards
            | BlockKind::Testimonial
            | BlockKind::StatsRow
            | BlockKind::Faq
            | BlockKind::Hero => BlockCategory::Composite,
            BlockKind::Unknown(_) => BlockCategory::Unrecognized,
        }
    }

    pub fn is_structural(&self) -> bool {
        self.category() == BlockCategory::Structural
    }
}

impl std::fmt::Display for BlockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_name())
    }
}

/// A node in the block tree.
///
/// Children are never stored inline: a container's children live in the
/// owning [`Document`](super::Document) under the node's [`ZoneKey`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireBlock", into = "WireBlock")]
pub struct BlockNode {
    pub kind: BlockKind,
    pub id: String,
    pub props: Props,
}

impl BlockNode {
    pub fn new(kind: BlockKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            props: Props::new(),
        }
    }

    /// Builder-style property setter.
    pub fn with_prop(mut self, key: &str, value: impl Into<PropValue>) -> Self {
        self.props.insert(key.to_string(), value.into());
        self
    }

    pub fn prop(&self, key: &str) -> Option<&PropValue> {
        self.props.get(key)
    }

    /// Key of this node's zone named `zone`.
    pub fn zone_key(&self, zone: &str) -> ZoneKey {
        ZoneKey::new(&self.id, zone)
    }

    /// Key of this node's default `content` zone.
    pub fn content_zone(&self) -> ZoneKey {
        self.zone_key(CONTENT_ZONE)
    }
}

/// On-the-wire shape: `{"type": "...", "props": {"id": "...", ...}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    props: Props,
}

impl From<WireBlock> for BlockNode {
    fn from(mut wire: WireBlock) -> Self {
        let id = wire
            .props
            .remove("id")
            .and_then(|value| value.to_text())
            .unwrap_or_default();
        Self {
            kind: BlockKind::from_type_name(&wire.kind),
            id,
            props: wire.props,
        }
    }
}

impl From<BlockNode> for WireBlock {
    fn from(node: BlockNode) -> Self {
        let mut props = node.props;
        props.insert("id".to_string(), PropValue::Text(node.id));
        Self {
            kind: node.kind.type_name().to_string(),
            props,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("Section", BlockKind::Section, BlockCategory::Structural)]
    #[case("Paragraph", BlockKind::Text, BlockCategory::Leaf)]
    #[case("FAQ", BlockKind::Faq, BlockCategory::Composite)]
    #[case("Carousel", BlockKind::Unknown("Carousel".into()), BlockCategory::Unrecognized)]
    fn test_kind_from_type_name(
        #[case] name: &str,
        #[case] kind: BlockKind,
        #[case] category: BlockCategory,
    ) {
        let parsed = BlockKind::from_type_name(name);
        assert_eq!(parsed, kind);
        assert_eq!(parsed.category(), category);
    }

    #[test]
    fn test_unknown_kind_keeps_type_name() {
        let kind = BlockKind::from_type_name("Carousel");
        assert_eq!(kind.type_name(), "Carousel");
    }

    #[test]
    fn test_id_is_lifted_out_of_props() {
        let json = r#"{"type": "Heading", "props": {"id": "h1", "title": "Hi"}}"#;
        let node: BlockNode = serde_json::from_str(json).unwrap();

        assert_eq!(node.id, "h1");
        assert_eq!(node.kind, BlockKind::Heading);
        assert!(node.prop("id").is_none());
        assert_eq!(node.prop("title"), Some(&PropValue::Text("Hi".into())));
    }

    #[test]
    fn test_serialization_puts_id_back_into_props() {
        let node = BlockNode::new(BlockKind::Spacer, "sp-1").with_prop("height", 40i64);
        let value = serde_json::to_value(&node).unwrap();

        assert_eq!(value["type"], "Spacer");
        assert_eq!(value["props"]["id"], "sp-1");
        assert_eq!(value["props"]["height"], 40.0);
    }

    #[test]
    fn test_content_zone_key() {
        let node = BlockNode::new(BlockKind::Section, "s1");
        assert_eq!(node.content_zone().as_str(), "s1:content");
    }
}
