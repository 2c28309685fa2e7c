use serde_json::json;
use thiserror::Error;

use crate::diagnostics::{Phase, TranscodeLog};
use crate::import::contains_dialect_markup;

use super::{PageRef, SourceStrategy, Transport, TransportError};

/// Raw content chosen for one page, tagged with where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSource {
    pub content: String,
    pub strategy: SourceStrategy,
    /// The content uses the theme dialect's bracketed tags, so it can be
    /// parsed structurally rather than as rendered HTML.
    pub has_dialect_markup: bool,
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("cannot sync page {page}: no acquisition strategy returned content")]
    Exhausted { page: u64 },
}

/// Strict-priority fallback over the three acquisition strategies.
///
/// Attempts run one after another, never in parallel, and the first
/// non-empty answer wins. Nothing is retained between calls.
pub struct SourceResolver<T> {
    transport: T,
}

impl<T: Transport> SourceResolver<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn resolve(
        &self,
        page: &PageRef,
        log: &mut TranscodeLog,
    ) -> Result<ResolvedSource, SourceError> {
        log.push(
            Phase::Init,
            format!("Resolving source for {} {}", page.kind, page.id),
        );

        for strategy in SourceStrategy::ORDER {
            let Some(content) = self.attempt(strategy, page, log) else {
                continue;
            };
            let has_dialect_markup = contains_dialect_markup(&content);
            log.push_with(
                Phase::Parse,
                format!(
                    "Using {strategy} source for page {} (dialect markup: {})",
                    page.id,
                    if has_dialect_markup { "yes" } else { "no" }
                ),
                json!({
                    "strategy": strategy.as_str(),
                    "bytes": content.len(),
                    "has_dialect_markup": has_dialect_markup,
                }),
            );
            return Ok(ResolvedSource {
                content,
                strategy,
                has_dialect_markup,
            });
        }

        log.push(
            Phase::Error,
            format!("All acquisition strategies failed for page {}", page.id),
        );
        Err(SourceError::Exhausted { page: page.id })
    }

    /// Run one strategy and record its outcome before the next is tried.
    fn attempt(
        &self,
        strategy: SourceStrategy,
        page: &PageRef,
        log: &mut TranscodeLog,
    ) -> Option<String> {
        let result = match strategy {
            SourceStrategy::Rpc => self.transport.fetch_raw_via_rpc(page),
            SourceStrategy::RestEdit => self.transport.fetch_raw_via_rest_edit(page),
            SourceStrategy::Scrape => self.transport.fetch_rendered_html(page),
        }
        .and_then(|content| {
            if content.trim().is_empty() {
                Err(TransportError::Malformed("empty content".to_string()))
            } else {
                Ok(content)
            }
        });

        match result {
            Ok(content) => {
                log.push_with(
                    Phase::Source,
                    format!("{strategy} returned {} bytes", content.len()),
                    json!({ "strategy": strategy.as_str(), "ok": true, "bytes": content.len() }),
                );
                Some(content)
            }
            Err(err) => {
                log.push_with(
                    Phase::Source,
                    format!("{strategy} failed: {err}"),
                    json!({ "strategy": strategy.as_str(), "ok": false, "error": err.to_string() }),
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::Cell;

    /// Transport with canned answers that counts how often each strategy runs.
    struct FakeTransport {
        rpc: Result<String, TransportError>,
        rest: Result<String, TransportError>,
        scrape: Result<String, TransportError>,
        calls: Cell<[usize; 3]>,
    }

    impl FakeTransport {
        fn new(
            rpc: Result<String, TransportError>,
            rest: Result<String, TransportError>,
            scrape: Result<String, TransportError>,
        ) -> Self {
            Self {
                rpc,
                rest,
                scrape,
                calls: Cell::new([0; 3]),
            }
        }

        fn count(&self, slot: usize) {
            let mut calls = self.calls.get();
            calls[slot] += 1;
            self.calls.set(calls);
        }
    }

    impl Transport for FakeTransport {
        fn fetch_raw_via_rpc(&self, _page: &PageRef) -> Result<String, TransportError> {
            self.count(0);
            self.rpc.clone()
        }

        fn fetch_raw_via_rest_edit(&self, _page: &PageRef) -> Result<String, TransportError> {
            self.count(1);
            self.rest.clone()
        }

        fn fetch_rendered_html(&self, _page: &PageRef) -> Result<String, TransportError> {
            self.count(2);
            self.scrape.clone()
        }
    }

    fn down() -> Result<String, TransportError> {
        Err(TransportError::Network("connection refused".to_string()))
    }

    #[test]
    fn test_rpc_success_skips_other_strategies() {
        let transport = FakeTransport::new(
            Ok("[section][/section]".to_string()),
            Ok("rest".to_string()),
            Ok("html".to_string()),
        );
        let mut log = TranscodeLog::new();

        let resolved = SourceResolver::new(&transport)
            .resolve(&PageRef::page(1), &mut log)
            .unwrap();

        assert_eq!(resolved.strategy, SourceStrategy::Rpc);
        assert!(resolved.has_dialect_markup);
        assert_eq!(transport.calls.get(), [1, 0, 0]);
    }

    #[test]
    fn test_scrape_after_two_failures() {
        let body = format!("<html><body>{}</body></html>", "x".repeat(474));
        assert_eq!(body.len(), 500);
        let transport = FakeTransport::new(
            down(),
            Err(TransportError::Timeout {
                url: "https://example.com/wp-json".to_string(),
            }),
            Ok(body.clone()),
        );
        let mut log = TranscodeLog::new();

        let resolved = SourceResolver::new(&transport)
            .resolve(&PageRef::page(42), &mut log)
            .unwrap();

        assert_eq!(resolved.content, body);
        assert_eq!(resolved.strategy.as_str(), "scrape");
        assert!(!resolved.has_dialect_markup);
        assert_eq!(transport.calls.get(), [1, 1, 1]);

        let source: Vec<_> = log
            .entries()
            .iter()
            .filter(|e| e.phase == Phase::Source)
            .collect();
        assert_eq!(source.len(), 3);
        assert_eq!(source[0].data.as_ref().unwrap()["ok"], false);
        assert_eq!(source[1].data.as_ref().unwrap()["ok"], false);
        assert_eq!(source[2].data.as_ref().unwrap()["bytes"], 500);
        assert_eq!(log.count(Phase::Parse), 1);

        let last = log.entries().last().unwrap();
        assert_eq!(last.phase, Phase::Parse);
        assert_eq!(last.data.as_ref().unwrap()["strategy"], "scrape");
    }

    #[test]
    fn test_blank_content_counts_as_failure() {
        let transport = FakeTransport::new(
            Ok("   \n".to_string()),
            Ok("[text]raw[/text]".to_string()),
            down(),
        );
        let mut log = TranscodeLog::new();

        let resolved = SourceResolver::new(&transport)
            .resolve(&PageRef::page(3), &mut log)
            .unwrap();

        assert_eq!(resolved.strategy, SourceStrategy::RestEdit);
        assert_eq!(transport.calls.get(), [1, 1, 0]);
    }

    #[test]
    fn test_exhaustion_is_fatal_and_logged() {
        let transport = FakeTransport::new(down(), down(), down());
        let mut log = TranscodeLog::new();

        let err = SourceResolver::new(&transport)
            .resolve(&PageRef::page(9), &mut log)
            .unwrap_err();

        assert!(matches!(err, SourceError::Exhausted { page: 9 }));
        assert_eq!(log.count(Phase::Source), 3);
        assert_eq!(log.count(Phase::Parse), 0);
        assert!(log.has_errors());
    }
}
