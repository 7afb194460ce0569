//! Per-site extraction.
//!
//! Every configured site is a [`Site`] variant with a [`SiteExtractor`].
//! List pages only enqueue detail links; detail pages produce one event or
//! abstain.

pub mod asia_society;
pub mod detail;
pub mod list;

#[cfg(test)]
mod tests;

pub use asia_society::AsiaSociety;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc, time::Duration};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::classify::{classify_category, classify_country};
use crate::entities::{EventRecord, NewEvent};
use crate::normalize::{collapse_whitespace, normalize};
use crate::page::{EnqueueError, LinkEnqueuer, PageError, PageHandle};
use crate::repositories::EventStore;

/// Sentences kept from a scraped description.
pub const DESCRIPTION_SENTENCES: usize = 3;

/// Bounded wait for list-page links to show up.
pub const DEFAULT_LIST_WAIT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Site {
    AsiaSociety,
}

impl Site {
    pub const ALL: &'static [Site] = &[Site::AsiaSociety];

    /// The `siteName` carried in crawl metadata.
    pub fn name(&self) -> &'static str {
        match self {
            Site::AsiaSociety => "asiaSociety",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|site| site.name() == name)
    }

    /// The production extractor for this site.
    pub fn extractor(&self) -> Arc<dyn SiteExtractor> {
        match self {
            Site::AsiaSociety => Arc::new(AsiaSociety::new()),
        }
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where each detail field lives on a site's event page.
#[derive(Debug, Clone)]
pub struct DetailSelectors {
    pub title: &'static str,
    pub description: &'static str,
    pub address: &'static str,
    pub date: &'static str,
    pub image: &'static str,
    pub price: &'static str,
}

#[derive(Debug, Clone)]
pub struct SiteConfig {
    pub site: Site,
    /// Relative image paths are resolved against this.
    pub base_url: String,
    pub city: &'static str,
    /// List page the crawl starts from.
    pub start_url: String,
    pub list_link_selector: &'static str,
    /// Discovered links must match one of these to be enqueued.
    pub link_globs: Vec<String>,
    pub list_wait: Duration,
    pub detail: DetailSelectors,
}

impl SiteConfig {
    /// Absolute URL for a scraped image path, `None` when the path is blank
    /// or cannot be resolved.
    pub fn resolve_image(&self, path: &str) -> Option<String> {
        let path = path.trim();
        if path.is_empty() {
            return None;
        }
        let base = Url::parse(&self.base_url).ok()?;
        base.join(path).ok().map(String::from)
    }
}

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("no links matched '{selector}' on {url}")]
    LinksNotFound { selector: String, url: String },

    #[error("page has no loaded url")]
    MissingLoadedUrl,

    #[error("no title found at {0}")]
    MissingTitle(String),

    #[error("failed to scrape {url}: {source}")]
    Page {
        url: String,
        #[source]
        source: PageError,
    },

    #[error("failed to enqueue links from {url}: {source}")]
    Enqueue {
        url: String,
        #[source]
        source: EnqueueError,
    },

    #[error("failed to save {url}: {source}")]
    Persist {
        url: String,
        #[source]
        source: anyhow::Error,
    },
}

impl ExtractError {
    /// Expected content was absent. The task is abandoned without anything
    /// having gone wrong.
    pub fn is_missing_content(&self) -> bool {
        matches!(
            self,
            Self::LinksNotFound { .. } | Self::MissingLoadedUrl | Self::MissingTitle(_)
        )
    }
}

/// Untyped scrape of one detail page. Any field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFields {
    pub title: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub image: Option<String>,
    pub price: Option<String>,
}

impl RawFields {
    /// A blank or missing title means there is nothing to persist.
    pub fn into_scraped(self) -> Option<ScrapedEvent> {
        let title = self
            .title
            .map(|title| title.trim().to_string())
            .filter(|title| !title.is_empty())?;

        Some(ScrapedEvent {
            title,
            description: self.description,
            address: self.address,
            date: self.date,
            time: self.time,
            image: self.image,
            price: self.price,
        })
    }
}

/// A detail scrape that has a title and can become an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapedEvent {
    pub title: String,
    pub description: Option<String>,
    pub address: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub image: Option<String>,
    pub price: Option<String>,
}

impl ScrapedEvent {
    /// Date and time joined by one space. Not parsed.
    pub fn date_text(&self) -> Option<String> {
        let parts: Vec<&str> = [self.date.as_deref(), self.time.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect();

        (!parts.is_empty()).then(|| parts.join(" "))
    }

    /// Normalize, classify and shape the scrape into a storable event.
    pub fn into_new_event(self, website_url: &Url, config: &SiteConfig) -> NewEvent {
        let raw_date = self.date_text();
        let description = normalize(self.description.as_deref(), DESCRIPTION_SENTENCES);
        let country = classify_country(&self.title, &description);
        let category = classify_category(&self.title, &description);

        debug!(
            url = %website_url,
            country,
            category = %category,
            "Classified event"
        );

        NewEvent {
            website_url: website_url.to_string(),
            title: self.title,
            city: config.city.to_string(),
            address: self
                .address
                .as_deref()
                .map(collapse_whitespace)
                .filter(|address| !address.is_empty()),
            description: Some(description).filter(|d| !d.is_empty()),
            image: self
                .image
                .as_deref()
                .and_then(|path| config.resolve_image(path)),
            ticket_price: self
                .price
                .map(|price| price.trim().to_string())
                .filter(|price| !price.is_empty()),
            raw_date,
            country: country.to_string(),
            category: category.as_str().to_string(),
        }
    }
}

/// Extraction logic for one site.
#[async_trait]
pub trait SiteExtractor: Send + Sync {
    fn config(&self) -> &SiteConfig;

    fn site(&self) -> Site {
        self.config().site
    }

    /// Read every detail field independently. `Err` only for page failures.
    async fn read_fields(&self, page: &dyn PageHandle) -> Result<RawFields, PageError>;

    /// Enqueue the detail links of a listing page.
    async fn handle_list(
        &self,
        page: &dyn PageHandle,
        enqueuer: &dyn LinkEnqueuer,
    ) -> Result<usize, ExtractError> {
        list::enqueue_detail_links(self.config(), page, enqueuer).await
    }

    /// Turn a detail page into a stored event.
    async fn handle_detail(
        &self,
        page: &dyn PageHandle,
        store: &dyn EventStore,
    ) -> Result<EventRecord, ExtractError> {
        detail::extract_and_store(self, page, store).await
    }
}
