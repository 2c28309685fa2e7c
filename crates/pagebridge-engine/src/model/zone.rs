use serde::{Deserialize, Serialize};

/// Name of the zone almost every container uses.
pub const CONTENT_ZONE: &str = "content";

/// `"{node_id}:{zone_name}"` handle into [`Document::zones`](super::Document).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneKey(String);

impl ZoneKey {
    pub fn new(node_id: &str, zone: &str) -> Self {
        Self(format!("{node_id}:{zone}"))
    }

    pub fn content(node_id: &str) -> Self {
        Self::new(node_id, CONTENT_ZONE)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Id of the node owning this zone. Node ids may themselves contain `:`,
    /// so the split happens at the last separator.
    pub fn owner_id(&self) -> &str {
        self.0.rsplit_once(':').map_or(&self.0, |(owner, _)| owner)
    }

    pub fn zone_name(&self) -> &str {
        self.0.rsplit_once(':').map_or("", |(_, zone)| zone)
    }
}

impl std::fmt::Display for ZoneKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ZoneKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}
