use tracing::info;

use crate::entities::EventRecord;
use crate::page::PageHandle;
use crate::repositories::EventStore;
use crate::sites::{ExtractError, SiteExtractor};

/// Scrape a detail page and upsert the event it describes.
///
/// Nothing is written unless the page has a loaded URL and a title.
pub async fn extract_and_store<E>(
    extractor: &E,
    page: &dyn PageHandle,
    store: &dyn EventStore,
) -> Result<EventRecord, ExtractError>
where
    E: SiteExtractor + ?Sized,
{
    let config = extractor.config();
    let loaded_url = page.url().cloned().ok_or(ExtractError::MissingLoadedUrl)?;

    info!("[{} DETAIL] Scraping {}", config.site, loaded_url);

    let fields = extractor
        .read_fields(page)
        .await
        .map_err(|source| ExtractError::Page {
            url: loaded_url.to_string(),
            source,
        })?;

    let scraped = fields
        .into_scraped()
        .ok_or_else(|| ExtractError::MissingTitle(loaded_url.to_string()))?;

    let event = scraped.into_new_event(&loaded_url, config);

    let record = store
        .upsert(&event)
        .await
        .map_err(|source| ExtractError::Persist {
            url: loaded_url.to_string(),
            source,
        })?;

    info!("[{} SUCCESS] Saved event: {}", config.site, record.title);
    Ok(record)
}
