use async_trait::async_trait;

use crate::page::{PageError, PageHandle, Query};
use crate::sites::{
    DEFAULT_LIST_WAIT, DetailSelectors, RawFields, Site, SiteConfig, SiteExtractor,
};

const BASE_URL: &str = "https://asiasociety.org";
const EVENTS_GLOB: &str = "https://asiasociety.org/new-york/events/*";

/// Asia Society New York listings.
#[derive(Debug, Clone)]
pub struct AsiaSociety {
    config: SiteConfig,
}

impl AsiaSociety {
    pub fn new() -> Self {
        Self::with_config(Self::default_config())
    }

    /// Same extraction against a different deployment (tests, mirrors).
    pub fn with_config(config: SiteConfig) -> Self {
        Self { config }
    }

    pub fn default_config() -> SiteConfig {
        SiteConfig {
            site: Site::AsiaSociety,
            base_url: BASE_URL.to_string(),
            city: "New York",
            start_url: format!("{BASE_URL}/new-york"),
            list_link_selector: "h4.card-title > a",
            link_globs: vec![EVENTS_GLOB.to_string()],
            list_wait: DEFAULT_LIST_WAIT,
            detail: DetailSelectors {
                title: "article.node--type-event h1",
                description: "article.node--type-event div.body > div",
                address: "div.event-details-wdgt div.address > div",
                date: "div.event-details-wdgt div.date",
                image: "article.node--type-event div.image img",
                price: "div.ticket-price > div",
            },
        }
    }
}

impl Default for AsiaSociety {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SiteExtractor for AsiaSociety {
    fn config(&self) -> &SiteConfig {
        &self.config
    }

    async fn read_fields(&self, page: &dyn PageHandle) -> Result<RawFields, PageError> {
        let selectors = &self.config.detail;

        let answers = page
            .query_many(&[
                Query::TextContent(selectors.title),
                Query::InnerText(selectors.description),
                Query::TextContent(selectors.address),
                Query::TextContent(selectors.date),
                // the time is a bare text node right after the date element
                Query::NextTextSibling(selectors.date),
                Query::Attribute(selectors.image, "src"),
                Query::TextContent(selectors.price),
            ])
            .await?;

        let [title, description, address, date, time, image, price] =
            <[Option<String>; 7]>::try_from(answers).map_err(|answers| {
                PageError::Unavailable(format!("expected 7 answers, got {}", answers.len()))
            })?;

        Ok(RawFields {
            title,
            description,
            address,
            date,
            time,
            image,
            price,
        })
    }
}
