//! Content transcoder between block-editor documents and a theme's shortcode
//! markup dialect.
//!
//! Export walks a [`Document`] and compiles it into `[section][row][column]…`
//! markup. Import acquires raw content from the remote site, mines it for
//! background styling and rebuilds a best-effort [`Document`]. Every decision
//! along the way lands in a per-run [`TranscodeLog`].

pub mod compile;
pub mod diagnostics;
pub mod import;
pub mod model;
pub mod remote;
pub mod sanitize;
pub mod source;
pub mod store;
pub mod style;
pub mod sync;

#[cfg(test)]
pub mod tests;

// Re-export key types for easier usage
pub use compile::{Compiler, compile};
pub use diagnostics::{LogEntry, Phase, TranscodeLog, TranscodeReport};
pub use import::{Importer, import_document};
pub use model::{BlockCategory, BlockKind, BlockNode, Document, PropValue, Props, ZoneKey};
pub use remote::{HttpTransport, SiteCredentials};
pub use sanitize::{PropertyMapper, TargetProperty};
pub use source::{
    PageRef, PostType, PublishError, PublishedPage, Publisher, ResolvedSource, SourceError,
    SourceResolver, SourceStrategy, Transport, TransportError,
};
pub use store::{DocumentStore, FileStore, StoreError};
pub use style::{
    StructuralBackground, StyleRule, extract_rules, extract_structural_backgrounds,
    resolve_background,
};
pub use sync::{ExportOutcome, ImportOutcome, SyncError, Transcoder};
