//! The seams between the extraction core and whatever loads pages.
//!
//! Extractors only ever see a [`PageHandle`] and a [`LinkEnqueuer`]; the
//! crawl runner supplies [`HtmlPage`] and its queue-backed enqueuer.

pub mod html;

pub use html::{Document, HtmlPage};

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

use crate::entities::UserData;

#[derive(Error, Debug)]
pub enum PageError {
    #[error("invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("selector '{0}' not found")]
    SelectorNotFound(String),

    #[error("page unavailable: {0}")]
    Unavailable(String),
}

/// DOM access to one loaded page.
///
/// Query methods return `Ok(None)` when nothing matches; `Err` is reserved
/// for failures of the page itself.
#[async_trait]
pub trait PageHandle: Send + Sync {
    /// URL of the loaded document, after redirects.
    fn url(&self) -> Option<&Url>;

    /// Resolve once `selector` matches. Callers bound the wait.
    async fn wait_for_selector(&self, selector: &str) -> Result<(), PageError>;

    /// Concatenated text of the first match, untouched.
    async fn text_content(&self, selector: &str) -> Result<Option<String>, PageError>;

    /// Text of the first match with one line per text block.
    async fn inner_text(&self, selector: &str) -> Result<Option<String>, PageError>;

    async fn attribute(&self, selector: &str, name: &str) -> Result<Option<String>, PageError>;

    /// Trimmed text node that directly follows the first match, if any.
    async fn next_text_sibling(&self, selector: &str) -> Result<Option<String>, PageError>;

    /// `href` of every match, in document order.
    async fn hrefs(&self, selector: &str) -> Result<Vec<String>, PageError>;

    /// Answer several queries against the same state of the page, in order.
    async fn query_many(&self, queries: &[Query<'_>]) -> Result<Vec<Option<String>>, PageError> {
        let mut answers = Vec::with_capacity(queries.len());
        for query in queries {
            let answer = match *query {
                Query::TextContent(selector) => self.text_content(selector).await?,
                Query::InnerText(selector) => self.inner_text(selector).await?,
                Query::Attribute(selector, name) => self.attribute(selector, name).await?,
                Query::NextTextSibling(selector) => self.next_text_sibling(selector).await?,
            };
            answers.push(answer);
        }
        Ok(answers)
    }
}

/// One single-valued lookup for [`PageHandle::query_many`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Query<'a> {
    TextContent(&'a str),
    InnerText(&'a str),
    /// Selector, attribute name.
    Attribute(&'a str, &'a str),
    NextTextSibling(&'a str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkSource {
    Selector(String),
    Urls(Vec<String>),
}

/// A request to schedule follow-up fetches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnqueueLinks {
    pub source: LinkSource,
    /// Only links matching one of these globs are scheduled.
    pub globs: Vec<String>,
    pub user_data: UserData,
}

#[derive(Error, Debug)]
pub enum EnqueueError {
    #[error(transparent)]
    Page(#[from] PageError),

    #[error("invalid url glob '{glob}': {reason}")]
    InvalidGlob { glob: String, reason: String },
}

#[async_trait]
pub trait LinkEnqueuer: Send + Sync {
    /// Schedule the links described by `request`, returning how many were
    /// newly queued.
    async fn enqueue_links(
        &self,
        page: &dyn PageHandle,
        request: EnqueueLinks,
    ) -> Result<usize, EnqueueError>;
}
