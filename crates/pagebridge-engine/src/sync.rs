//! Whole transcode runs: a page out to the remote site, or back in.

use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::compile::compile;
use crate::diagnostics::{Phase, TranscodeLog};
use crate::import::Importer;
use crate::source::{
    PageRef, PublishError, PublishedPage, Publisher, SourceError, SourceResolver,
    SourceStrategy, Transport,
};
use crate::store::{DocumentStore, StoreError};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Publish(#[from] PublishError),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportOutcome {
    pub published: PublishedPage,
    pub markup_bytes: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportOutcome {
    pub strategy: SourceStrategy,
    pub has_dialect_markup: bool,
    pub node_count: usize,
}

/// Runs export and import against one site and one local store.
///
/// Each run resets the log it is handed, so a log holds exactly one run's
/// trace when the call returns, whether it succeeded or not.
pub struct Transcoder<T, P, S> {
    resolver: SourceResolver<T>,
    publisher: P,
    store: S,
}

impl<T, P, S> Transcoder<T, P, S>
where
    T: Transport,
    P: Publisher,
    S: DocumentStore,
{
    pub fn new(transport: T, publisher: P, store: S) -> Self {
        Self {
            resolver: SourceResolver::new(transport),
            publisher,
            store,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Load `page_id`, compile it and hand the markup to the publisher.
    pub fn export_page(
        &self,
        page_id: &str,
        remote_id: Option<u64>,
        title: &str,
        log: &mut TranscodeLog,
    ) -> Result<ExportOutcome, SyncError> {
        log.reset();
        let document = self.store.load_document(page_id).inspect_err(|err| {
            log.push(Phase::Error, format!("Cannot load page {page_id}: {err}"));
        })?;

        let markup = compile(&document, log);
        let published = self
            .publisher
            .publish_markup(remote_id, title, &markup)
            .inspect_err(|err| {
                log.push(Phase::Error, format!("Publishing page {page_id} failed: {err}"));
            })?;

        log.push_with(
            Phase::Success,
            format!("Published page {page_id} as {} {}", published.post_type, published.id),
            json!({ "id": published.id, "post_type": published.post_type, "bytes": markup.len() }),
        );
        Ok(ExportOutcome {
            published,
            markup_bytes: markup.len(),
        })
    }

    /// Resolve the remote page's content, rebuild a document and store it
    /// under `page_id`.
    pub fn import_page(
        &self,
        page: &PageRef,
        page_id: &str,
        log: &mut TranscodeLog,
    ) -> Result<ImportOutcome, SyncError> {
        log.reset();
        let source = self.resolver.resolve(page, log)?;
        let document = Importer::new(log).import_resolved(&source);

        self.store
            .save_document(page_id, &document)
            .inspect_err(|err| {
                log.push(Phase::Error, format!("Cannot save page {page_id}: {err}"));
            })?;

        Ok(ImportOutcome {
            strategy: source.strategy,
            has_dialect_markup: source.has_dialect_markup,
            node_count: document.node_count(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BlockKind;
    use crate::source::{PostType, TransportError};
    use crate::store::FileStore;
    use crate::tests::{create_test_store_dir, sample_document};
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;

    struct ScrapeOnly(&'static str);

    impl Transport for ScrapeOnly {
        fn fetch_raw_via_rpc(&self, _page: &PageRef) -> Result<String, TransportError> {
            Err(TransportError::Unsupported("XML-RPC"))
        }

        fn fetch_raw_via_rest_edit(&self, page: &PageRef) -> Result<String, TransportError> {
            Err(TransportError::Status {
                url: format!("/wp-json/wp/v2/pages/{}", page.id),
                status: 401,
            })
        }

        fn fetch_rendered_html(&self, _page: &PageRef) -> Result<String, TransportError> {
            Ok(self.0.to_string())
        }
    }

    /// Keeps every published body.
    #[derive(Default)]
    struct RecordingPublisher {
        published: RefCell<Vec<(Option<u64>, String, String)>>,
        reject: bool,
    }

    impl Publisher for RecordingPublisher {
        fn publish_markup(
            &self,
            remote_id: Option<u64>,
            title: &str,
            markup: &str,
        ) -> Result<PublishedPage, PublishError> {
            if self.reject {
                return Err(PublishError::Rejected {
                    status: 403,
                    message: "Sorry, you are not allowed to edit this post.".to_string(),
                });
            }
            self.published
                .borrow_mut()
                .push((remote_id, title.to_string(), markup.to_string()));
            Ok(PublishedPage {
                id: remote_id.unwrap_or(501),
                post_type: PostType::Page,
            })
        }
    }

    #[test]
    fn test_export_publishes_compiled_markup() {
        let dir = create_test_store_dir();
        let store = FileStore::new(dir.path());
        store.save_document("home", &sample_document()).unwrap();
        let publisher = RecordingPublisher::default();
        let transcoder = Transcoder::new(ScrapeOnly(""), &publisher, store);
        let mut log = TranscodeLog::new();

        let outcome = transcoder.export_page("home", None, "Home", &mut log).unwrap();

        assert_eq!(outcome.published.id, 501);
        let published = publisher.published.borrow();
        assert_eq!(published.len(), 1);
        let (remote_id, title, markup) = &published[0];
        assert_eq!(*remote_id, None);
        assert_eq!(title, "Home");
        assert!(markup.starts_with("[section bg_color=\"#111\""));
        assert_eq!(outcome.markup_bytes, markup.len());
        assert_eq!(log.entries().last().unwrap().phase, Phase::Success);
    }

    #[test]
    fn test_export_of_missing_page_fails_without_publishing() {
        let dir = create_test_store_dir();
        let publisher = RecordingPublisher::default();
        let transcoder = Transcoder::new(ScrapeOnly(""), &publisher, FileStore::new(dir.path()));
        let mut log = TranscodeLog::new();

        let err = transcoder.export_page("nope", Some(3), "x", &mut log).unwrap_err();

        assert!(matches!(err, SyncError::Store(StoreError::NotFound(_))));
        assert!(publisher.published.borrow().is_empty());
        assert!(log.has_errors());
    }

    #[test]
    fn test_rejected_publish_is_reported() {
        let dir = create_test_store_dir();
        let store = FileStore::new(dir.path());
        store.save_document("home", &sample_document()).unwrap();
        let publisher = RecordingPublisher {
            reject: true,
            ..Default::default()
        };
        let transcoder = Transcoder::new(ScrapeOnly(""), publisher, store);
        let mut log = TranscodeLog::new();

        let err = transcoder.export_page("home", Some(9), "Home", &mut log).unwrap_err();

        assert!(matches!(
            err,
            SyncError::Publish(PublishError::Rejected { status: 403, .. })
        ));
        assert_eq!(log.count(Phase::Error), 1);
    }

    #[test]
    fn test_import_saves_rebuilt_document() {
        let dir = create_test_store_dir();
        let html = r#"<section id="intro" style="background-color:#222"><h2>Hello</h2><p>Body</p></section>"#;
        let transcoder = Transcoder::new(
            ScrapeOnly(html),
            RecordingPublisher::default(),
            FileStore::new(dir.path()),
        );
        let mut log = TranscodeLog::new();

        let outcome = transcoder
            .import_page(&PageRef::page(12), "imported/12", &mut log)
            .unwrap();

        assert_eq!(outcome.strategy, SourceStrategy::Scrape);
        assert!(!outcome.has_dialect_markup);
        assert_eq!(outcome.node_count, 3);
        assert_eq!(log.count(Phase::Source), 3);

        let saved = transcoder.store().load_document("imported/12").unwrap();
        assert_eq!(saved.top_level[0].kind, BlockKind::Section);
        assert!(saved.validate().is_empty());
    }

    #[test]
    fn test_import_exhaustion_saves_nothing() {
        let dir = create_test_store_dir();
        let transcoder = Transcoder::new(
            ScrapeOnly("   "),
            RecordingPublisher::default(),
            FileStore::new(dir.path()),
        );
        let mut log = TranscodeLog::new();

        let err = transcoder
            .import_page(&PageRef::page(12), "12", &mut log)
            .unwrap_err();

        assert!(matches!(err, SyncError::Source(SourceError::Exhausted { page: 12 })));
        assert!(!dir.path().join("12.json").exists());
    }

    #[test]
    fn test_each_run_starts_a_fresh_trace() {
        let dir = create_test_store_dir();
        let transcoder = Transcoder::new(
            ScrapeOnly("<p>x</p>"),
            RecordingPublisher::default(),
            FileStore::new(dir.path()),
        );
        let mut log = TranscodeLog::new();

        transcoder.import_page(&PageRef::page(1), "1", &mut log).unwrap();
        let first_run = log.run_id();
        let first_len = log.entries().len();
        transcoder.import_page(&PageRef::page(1), "1", &mut log).unwrap();

        assert_ne!(log.run_id(), first_run);
        assert_eq!(log.entries().len(), first_len);
    }
}
