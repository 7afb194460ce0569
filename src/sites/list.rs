use tokio::time::timeout;
use tracing::info;

use crate::entities::{PageKind, UserData};
use crate::page::{EnqueueLinks, LinkEnqueuer, LinkSource, PageError, PageHandle};
use crate::sites::{ExtractError, SiteConfig};

/// Wait for the site's link selector, then hand the links to the enqueuer
/// tagged for detail handling.
pub async fn enqueue_detail_links(
    config: &SiteConfig,
    page: &dyn PageHandle,
    enqueuer: &dyn LinkEnqueuer,
) -> Result<usize, ExtractError> {
    let url = page
        .url()
        .map(|url| url.to_string())
        .unwrap_or_else(|| "<unknown>".to_string());
    let selector = config.list_link_selector;

    info!("[{} LIST] Processing {}", config.site, url);

    match timeout(config.list_wait, page.wait_for_selector(selector)).await {
        Ok(Ok(())) => {}
        Ok(Err(PageError::SelectorNotFound(_))) | Err(_) => {
            return Err(ExtractError::LinksNotFound {
                selector: selector.to_string(),
                url,
            });
        }
        Ok(Err(source)) => return Err(ExtractError::Page { url, source }),
    }

    let request = EnqueueLinks {
        source: LinkSource::Selector(selector.to_string()),
        globs: config.link_globs.clone(),
        user_data: UserData::new(config.site, PageKind::Detail),
    };

    let count = enqueuer
        .enqueue_links(page, request)
        .await
        .map_err(|source| ExtractError::Enqueue {
            url: url.clone(),
            source,
        })?;

    info!("[{} LIST] Enqueued {} links from {}", config.site, count, url);
    Ok(count)
}
