use chrono::Utc;
use reqwest::{Client, ClientBuilder, header};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use crate::fetcher::{
    decode::{decode_body, detect_charset},
    errors::FetchError,
    types::PageResponse,
};

pub const DEFAULT_MAX_BODY_BYTES: u64 = 5 * 1024 * 1024;
const USER_AGENT: &str = concat!("events-crawler/", env!("CARGO_PKG_VERSION"));
const ACCEPT_HTML: &str = "text/html,application/xhtml+xml;q=0.9,*/*;q=0.5";

/// HTML-only HTTP client with timeouts, a redirect limit and a body cap.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    max_body_bytes: u64,
}

impl Fetcher {
    pub fn new() -> Result<Self, FetchError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static(ACCEPT_HTML));

        let client = ClientBuilder::new()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(10))
            .default_headers(headers)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self {
            client,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        })
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: u64) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    #[instrument(skip_all, fields(url = %url))]
    pub async fn fetch(&self, url: &Url) -> Result<PageResponse, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(FetchError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        if let Some(length) = response.content_length()
            && length > self.max_body_bytes
        {
            return Err(FetchError::BodyTooLarge(length));
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        if let Some(content_type) = &content_type
            && !is_html(content_type)
        {
            return Err(FetchError::UnsupportedContentType(content_type.clone()));
        }

        let url_final = response.url().clone();
        let body = response.bytes().await.map_err(FetchError::from_reqwest)?;
        if body.len() as u64 > self.max_body_bytes {
            return Err(FetchError::BodyTooLarge(body.len() as u64));
        }

        let charset = detect_charset(content_type.as_deref(), &body);
        debug!("Fetched {} bytes as {}", body.len(), charset);

        Ok(PageResponse {
            url_final,
            status,
            body_utf8: decode_body(&body, charset),
            charset,
            fetched_at: Utc::now(),
        })
    }
}

fn is_html(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime == "text/html" || mime == "application/xhtml+xml"
}
