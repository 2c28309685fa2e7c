//! HTTP implementation of the remote collaborators.
//!
//! One blocking reqwest client serves all three acquisition strategies and
//! publishing. Every request carries the client-wide timeout; a timed-out
//! request surfaces as [`TransportError::Timeout`].

mod xmlrpc;

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::json;

use crate::source::{
    PageRef, PostType, PublishError, PublishedPage, Publisher, Transport, TransportError,
};

/// Default timeout for a single remote request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

pub const USER_AGENT: &str = concat!("pagebridge/", env!("CARGO_PKG_VERSION"));

/// Application-password login for the remote site.
#[derive(Clone, PartialEq, Eq)]
pub struct SiteCredentials {
    pub username: String,
    pub app_password: String,
}

impl SiteCredentials {
    pub fn new(username: impl Into<String>, app_password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            app_password: app_password.into(),
        }
    }
}

impl std::fmt::Debug for SiteCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiteCredentials")
            .field("username", &self.username)
            .field("app_password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct RestPost {
    content: RestContent,
}

#[derive(Debug, Deserialize)]
struct RestContent {
    raw: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PublishResponse {
    id: u64,
    #[serde(rename = "type", default)]
    post_type: PostType,
}

#[derive(Debug, Deserialize)]
struct RestErrorBody {
    message: String,
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    credentials: Option<SiteCredentials>,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|err| TransportError::Network(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials: None,
        })
    }

    pub fn with_credentials(mut self, credentials: SiteCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Some(creds) => request.basic_auth(&creds.username, Some(&creds.app_password)),
            None => request,
        }
    }

    fn send(&self, url: &str, request: RequestBuilder) -> Result<Response, TransportError> {
        log::debug!("Requesting {url}");
        self.authorize(request)
            .send()
            .map_err(|err| request_error(url, err))
    }

    /// Send and require a 2xx answer, returning its body.
    fn body(&self, url: &str, request: RequestBuilder) -> Result<String, TransportError> {
        let response = self.send(url, request)?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        response.text().map_err(|err| request_error(url, err))
    }

    fn rest_url(&self, post_type: PostType, id: Option<u64>) -> String {
        let collection = format!("{}/wp-json/wp/v2/{}", self.base_url, post_type.rest_collection());
        match id {
            Some(id) => format!("{collection}/{id}"),
            None => collection,
        }
    }

    fn public_url(&self, page: &PageRef) -> String {
        match (&page.url, page.kind) {
            (Some(url), _) => url.clone(),
            (None, PostType::Page) => format!("{}/?page_id={}", self.base_url, page.id),
            (None, PostType::Post) => format!("{}/?p={}", self.base_url, page.id),
        }
    }
}

fn request_error(url: &str, err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout {
            url: url.to_string(),
        }
    } else {
        TransportError::Network(err.to_string())
    }
}

impl Transport for HttpTransport {
    fn fetch_raw_via_rpc(&self, page: &PageRef) -> Result<String, TransportError> {
        let creds = self
            .credentials
            .as_ref()
            .ok_or(TransportError::Unsupported("XML-RPC without credentials"))?;
        let url = format!("{}/xmlrpc.php", self.base_url);
        let call = xmlrpc::get_post_call(&creds.username, &creds.app_password, page.id);
        let request = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "text/xml")
            .body(call);
        let body = self.body(&url, request)?;
        xmlrpc::post_content(&body)
    }

    fn fetch_raw_via_rest_edit(&self, page: &PageRef) -> Result<String, TransportError> {
        let url = self.rest_url(page.kind, Some(page.id));
        let request = self.client.get(&url).query(&[("context", "edit")]);
        let body = self.body(&url, request)?;
        let post: RestPost = serde_json::from_str(&body)
            .map_err(|err| TransportError::Malformed(format!("REST response: {err}")))?;
        post.content.raw.ok_or_else(|| {
            TransportError::Malformed("REST response has no content.raw".to_string())
        })
    }

    fn fetch_rendered_html(&self, page: &PageRef) -> Result<String, TransportError> {
        let url = self.public_url(page);
        let request = self.client.get(&url);
        self.body(&url, request)
    }
}

impl Publisher for HttpTransport {
    fn publish_markup(
        &self,
        remote_id: Option<u64>,
        title: &str,
        markup: &str,
    ) -> Result<PublishedPage, PublishError> {
        let url = self.rest_url(PostType::Page, remote_id);
        let request = self
            .client
            .post(&url)
            .json(&json!({ "title": title, "content": markup }));
        let response = self.send(&url, request)?;

        let status = response.status();
        let body = response.text().map_err(|err| request_error(&url, err))?;
        if !status.is_success() {
            return Err(rejected(status, &body));
        }
        let published: PublishResponse = serde_json::from_str(&body)
            .map_err(|err| TransportError::Malformed(format!("publish response: {err}")))?;
        Ok(PublishedPage {
            id: published.id,
            post_type: published.post_type,
        })
    }
}

fn rejected(status: StatusCode, body: &str) -> PublishError {
    let message = serde_json::from_str::<RestErrorBody>(body)
        .map(|err| err.message)
        .unwrap_or_else(|_| body.chars().take(200).collect());
    PublishError::Rejected {
        status: status.as_u16(),
        message,
    }
}
