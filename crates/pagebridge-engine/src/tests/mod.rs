use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

use crate::model::{BlockKind, BlockNode, Document, ZoneKey};

/// Create a temporary store directory
pub fn create_test_store_dir() -> TempDir {
    tempfile::tempdir().unwrap()
}

/// Create a test file with content, creating parent directories
pub fn create_test_file(store_dir: &TempDir, filename: &str, content: &str) -> PathBuf {
    let file_path = store_dir.path().join(filename);
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&file_path, content).unwrap();
    file_path
}

/// One dark section holding a centered heading and a paragraph.
pub fn sample_document() -> Document {
    let mut doc = Document::new();
    doc.push_top_level(
        BlockNode::new(BlockKind::Section, "s1")
            .with_prop("backgroundColor", "#111")
            .with_prop("padding", "40px 0"),
    );
    doc.push_to_zone(
        ZoneKey::content("s1"),
        BlockNode::new(BlockKind::Heading, "h1")
            .with_prop("title", "Hi")
            .with_prop("align", "center"),
    );
    doc.push_to_zone(
        ZoneKey::content("s1"),
        BlockNode::new(BlockKind::Text, "t1").with_prop("text", "Welcome aboard"),
    );
    doc
}
