//! In-memory block tree: typed nodes, their properties and the flat zone
//! registry that holds every container's children.

pub mod block;
pub mod document;
pub mod props;
pub mod zone;

pub use block::{BlockCategory, BlockKind, BlockNode};
pub use document::{Document, RootBlock, ValidationIssue};
pub use props::{PropValue, Props, text_of, value_of};
pub use zone::{CONTENT_ZONE, ZoneKey};
