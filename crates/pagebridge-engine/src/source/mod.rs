//! Raw-content acquisition from the remote publishing system.
//!
//! The engine never talks to the network directly: it consumes the
//! [`Transport`] and [`Publisher`] capabilities, and [`SourceResolver`] decides
//! which transport answer to trust.

mod resolver;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use resolver::{ResolvedSource, SourceError, SourceResolver};

/// Remote content type; decides the REST collection a page lives in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostType {
    #[default]
    Page,
    Post,
}

impl PostType {
    pub fn rest_collection(&self) -> &'static str {
        match self {
            PostType::Page => "pages",
            PostType::Post => "posts",
        }
    }
}

impl std::fmt::Display for PostType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PostType::Page => write!(f, "page"),
            PostType::Post => write!(f, "post"),
        }
    }
}

/// Identifies one remote page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRef {
    pub id: u64,
    #[serde(default)]
    pub kind: PostType,
    /// Public URL, when known; scraping falls back to a site-relative lookup.
    #[serde(default)]
    pub url: Option<String>,
}

impl PageRef {
    pub fn page(id: u64) -> Self {
        Self {
            id,
            kind: PostType::Page,
            url: None,
        }
    }

    pub fn post(id: u64) -> Self {
        Self {
            kind: PostType::Post,
            ..Self::page(id)
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// Acquisition strategies, cheapest and most faithful first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceStrategy {
    #[serde(rename = "rpc")]
    Rpc,
    #[serde(rename = "rest")]
    RestEdit,
    #[serde(rename = "scrape")]
    Scrape,
}

impl SourceStrategy {
    /// Priority order used by [`SourceResolver`].
    pub const ORDER: [SourceStrategy; 3] = [
        SourceStrategy::Rpc,
        SourceStrategy::RestEdit,
        SourceStrategy::Scrape,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceStrategy::Rpc => "rpc",
            SourceStrategy::RestEdit => "rest",
            SourceStrategy::Scrape => "scrape",
        }
    }

    /// Rendered pages have already been through the theme's templates.
    pub fn is_rendered(&self) -> bool {
        matches!(self, SourceStrategy::Scrape)
    }
}

impl std::fmt::Display for SourceStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of a single transport call. Timeouts are reported separately but
/// the resolver treats every variant the same way.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("{url} answered HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected response: {0}")]
    Malformed(String),

    #[error("{0} is not available on this site")]
    Unsupported(&'static str),
}

/// The three raw-content capabilities of the remote system.
pub trait Transport {
    /// Unrendered source exactly as authored.
    fn fetch_raw_via_rpc(&self, page: &PageRef) -> Result<String, TransportError>;

    /// Unrendered source from the REST API's edit context.
    fn fetch_raw_via_rest_edit(&self, page: &PageRef) -> Result<String, TransportError>;

    /// Live page HTML, after templating.
    fn fetch_rendered_html(&self, page: &PageRef) -> Result<String, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn fetch_raw_via_rpc(&self, page: &PageRef) -> Result<String, TransportError> {
        (**self).fetch_raw_via_rpc(page)
    }

    fn fetch_raw_via_rest_edit(&self, page: &PageRef) -> Result<String, TransportError> {
        (**self).fetch_raw_via_rest_edit(page)
    }

    fn fetch_rendered_html(&self, page: &PageRef) -> Result<String, TransportError> {
        (**self).fetch_rendered_html(page)
    }
}

/// Where a publish landed on the remote side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedPage {
    pub id: u64,
    pub post_type: PostType,
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("remote rejected the page (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },
}

/// Hands compiled markup to the remote system verbatim as page body.
pub trait Publisher {
    /// Update `remote_id` when the page is already linked, create it otherwise.
    fn publish_markup(
        &self,
        remote_id: Option<u64>,
        title: &str,
        markup: &str,
    ) -> Result<PublishedPage, PublishError>;
}

impl<P: Publisher + ?Sized> Publisher for &P {
    fn publish_markup(
        &self,
        remote_id: Option<u64>,
        title: &str,
        markup: &str,
    ) -> Result<PublishedPage, PublishError> {
        (**self).publish_markup(remote_id, title, markup)
    }
}
