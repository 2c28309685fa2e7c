//! Compile fixture documents, publish them to an in-memory site and import
//! them back through the public API.

use std::cell::RefCell;

use pagebridge_engine::{
    BlockKind, Document, DocumentStore, FileStore, PageRef, Phase, PostType, PropValue,
    PublishError, PublishedPage, Publisher, SourceStrategy, TranscodeLog, Transcoder, Transport,
    TransportError, compile, import_document,
};
use pretty_assertions::assert_eq;
use regex::Regex;

fn load_fixture(name: &str) -> Document {
    let json = std::fs::read(format!(
        "{}/tests/fixtures/{name}.json",
        env!("CARGO_MANIFEST_DIR")
    ))
    .unwrap();
    Document::from_json_bytes(&json).unwrap()
}

fn child_kinds<'a>(doc: &'a Document, section: &'a pagebridge_engine::BlockNode) -> Vec<&'a str> {
    doc.children(section, "content")
        .iter()
        .map(|node| node.kind.type_name())
        .collect()
}

/// A site that serves back whatever was last published, over RPC only.
#[derive(Default)]
struct InMemorySite {
    body: RefCell<Option<String>>,
}

impl Transport for InMemorySite {
    fn fetch_raw_via_rpc(&self, _page: &PageRef) -> Result<String, TransportError> {
        self.body
            .borrow()
            .clone()
            .ok_or_else(|| TransportError::Malformed("nothing published".to_string()))
    }

    fn fetch_raw_via_rest_edit(&self, _page: &PageRef) -> Result<String, TransportError> {
        panic!("REST must not be tried after RPC succeeds")
    }

    fn fetch_rendered_html(&self, _page: &PageRef) -> Result<String, TransportError> {
        panic!("scrape must not be tried after RPC succeeds")
    }
}

impl Publisher for InMemorySite {
    fn publish_markup(
        &self,
        remote_id: Option<u64>,
        _title: &str,
        markup: &str,
    ) -> Result<PublishedPage, PublishError> {
        *self.body.borrow_mut() = Some(markup.to_string());
        Ok(PublishedPage {
            id: remote_id.unwrap_or(1),
            post_type: PostType::Page,
        })
    }
}

#[test]
fn landing_page_keeps_section_row_column_nesting() {
    let doc = load_fixture("landing");
    let mut log = TranscodeLog::new();

    let markup = compile(&doc, &mut log);

    let nested = Regex::new(r"\[section[^\]]*\]\[row[^\]]*\]\[column[^\]]*\]").unwrap();
    assert_eq!(markup.matches("[section").count(), 4);
    assert_eq!(nested.find_iter(&markup).count(), 4);
    assert_eq!(markup, compile(&doc, &mut TranscodeLog::new()));
}

#[test]
fn landing_page_hostile_values_are_filtered() {
    let doc = load_fixture("landing");
    let mut log = TranscodeLog::new();

    let markup = compile(&doc, &mut log);

    assert!(!markup.contains("position:fixed"));
    assert!(!markup.contains("javascript:"));
    assert!(log.count(Phase::Filter) >= 2);
    assert!(log.count(Phase::Warn) >= 1);
    assert_eq!(log.entries().last().unwrap().phase, Phase::Success);
}

#[test]
fn landing_page_imports_back_into_the_same_shape() {
    let doc = load_fixture("landing");
    let markup = compile(&doc, &mut TranscodeLog::new());

    let imported = import_document(&markup, &mut TranscodeLog::new());

    assert!(imported.validate().is_empty());
    let sections = &imported.top_level;
    assert_eq!(sections.len(), 4);
    assert!(sections.iter().all(|s| s.kind == BlockKind::Section));
    assert_eq!(child_kinds(&imported, &sections[0]), vec!["Hero"]);
    assert_eq!(
        child_kinds(&imported, &sections[1]),
        vec!["Heading", "FeatureGrid"]
    );
    assert_eq!(
        child_kinds(&imported, &sections[2]),
        vec!["PricingCards", "Text"]
    );
    assert!(child_kinds(&imported, &sections[3]).is_empty());

    assert_eq!(
        sections[1].prop("backgroundColor"),
        Some(&PropValue::from("#f5f5f5"))
    );
    assert_eq!(sections[2].prop("backgroundColor"), None);

    let hero = &imported.children(&sections[0], "content")[0];
    assert_eq!(hero.prop("ctaHref"), Some(&PropValue::from("/signup")));
    assert_eq!(
        hero.prop("backgroundColor"),
        Some(&PropValue::from("#0b1f3a"))
    );
}

#[test]
fn publish_then_import_through_the_transcoder() {
    let store_dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(store_dir.path());
    store.save_document("landing", &load_fixture("landing")).unwrap();
    let site = InMemorySite::default();
    let transcoder = Transcoder::new(&site, &site, store);
    let mut log = TranscodeLog::new();

    let exported = transcoder
        .export_page("landing", Some(77), "Landing", &mut log)
        .unwrap();
    let imported = transcoder
        .import_page(&PageRef::page(77), "landing-copy", &mut log)
        .unwrap();

    assert_eq!(exported.published.id, 77);
    assert_eq!(imported.strategy, SourceStrategy::Rpc);
    assert!(imported.has_dialect_markup);
    assert_eq!(log.count(Phase::Source), 1);

    let copy = transcoder.store().load_document("landing-copy").unwrap();
    assert_eq!(copy.node_count(), imported.node_count);

    let report = serde_json::to_value(log.export()).unwrap();
    assert_eq!(report["run_id"], log.run_id().to_string());
}
