use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;
use url::Url;

use crate::crawl::{RequestQueue, UrlGlob};
use crate::entities::CrawlTask;
use crate::page::{EnqueueError, EnqueueLinks, LinkEnqueuer, LinkSource, PageHandle};

/// Feeds discovered links back into the crawl's [`RequestQueue`].
#[derive(Debug, Clone)]
pub struct QueueEnqueuer {
    queue: Arc<RequestQueue>,
}

impl QueueEnqueuer {
    pub fn new(queue: Arc<RequestQueue>) -> Self {
        Self { queue }
    }
}

#[async_trait]
impl LinkEnqueuer for QueueEnqueuer {
    /// Resolves each link against the page URL and enqueues the http(s) ones
    /// matching any glob. With no globs, only links on the page's own host are
    /// kept. Returns how many new tasks the queue accepted.
    async fn enqueue_links(
        &self,
        page: &dyn PageHandle,
        request: EnqueueLinks,
    ) -> Result<usize, EnqueueError> {
        let globs = request
            .globs
            .iter()
            .map(|glob| {
                UrlGlob::new(glob).map_err(|e| EnqueueError::InvalidGlob {
                    glob: glob.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let links = match request.source {
            LinkSource::Selector(selector) => page.hrefs(&selector).await?,
            LinkSource::Urls(urls) => urls,
        };

        let base = page.url();
        let mut enqueued = 0;

        for link in links {
            let Some(mut url) = resolve(base, &link) else {
                debug!("Ignoring unresolvable link {:?}", link);
                continue;
            };
            url.set_fragment(None);

            if !matches!(url.scheme(), "http" | "https") {
                continue;
            }

            let admitted = if globs.is_empty() {
                base.is_some_and(|base| base.host_str() == url.host_str())
            } else {
                globs.iter().any(|glob| glob.is_match(url.as_str()))
            };
            if !admitted {
                continue;
            }

            if self
                .queue
                .push(CrawlTask::new(url, request.user_data.clone()))
            {
                enqueued += 1;
            }
        }

        Ok(enqueued)
    }
}

fn resolve(base: Option<&Url>, link: &str) -> Option<Url> {
    let link = link.trim();
    if link.is_empty() {
        return None;
    }
    match base {
        Some(base) => base.join(link).ok(),
        None => Url::parse(link).ok(),
    }
}
