use std::{collections::HashMap, sync::Arc};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::entities::{CrawlTask, EventRecord, PageKind, UserData};
use crate::page::{LinkEnqueuer, PageHandle};
use crate::repositories::EventStore;
use crate::sites::{ExtractError, Site, SiteExtractor};

#[derive(Error, Debug)]
pub enum RouteError {
    #[error("unknown page kind '{0}'")]
    UnknownPageKind(String),

    #[error("unknown site '{0}'")]
    UnknownSite(String),

    #[error("no {kind} handler configured for site '{site}'")]
    SiteNotConfigured { site: String, kind: PageKind },
}

#[derive(Error, Debug)]
pub enum TaskError {
    #[error(transparent)]
    Route(#[from] RouteError),

    #[error(transparent)]
    Extract(#[from] ExtractError),
}

/// What handling one task amounted to.
#[derive(Debug)]
pub enum TaskOutcome {
    /// List page: this many new detail tasks were scheduled.
    Enqueued(usize),
    /// Detail page: the event was upserted.
    Saved(Box<EventRecord>),
    /// Expected content was missing; nothing was written.
    Skipped(ExtractError),
    /// Configuration, page or persistence failure; nothing was written.
    Failed(TaskError),
}

/// Two-level routing table: page kind, then site.
///
/// Built once at startup and shared read-only across concurrent tasks.
pub struct Router {
    list: HashMap<Site, Arc<dyn SiteExtractor>>,
    detail: HashMap<Site, Arc<dyn SiteExtractor>>,
    store: Arc<dyn EventStore>,
}

impl Router {
    /// An empty router; tasks fail as site-not-configured until extractors
    /// are registered.
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self {
            list: HashMap::new(),
            detail: HashMap::new(),
            store,
        }
    }

    /// A router with the production extractor of every [`Site`] registered
    /// for both page kinds.
    pub fn with_default_sites(store: Arc<dyn EventStore>) -> Self {
        let mut router = Self::new(store);
        for site in Site::ALL {
            router.register(site.extractor());
        }
        router
    }

    /// Register an extractor for both list and detail pages of its site.
    pub fn register(&mut self, extractor: Arc<dyn SiteExtractor>) {
        self.register_list(extractor.clone());
        self.register_detail(extractor);
    }

    pub fn register_list(&mut self, extractor: Arc<dyn SiteExtractor>) {
        self.list.insert(extractor.site(), extractor);
    }

    pub fn register_detail(&mut self, extractor: Arc<dyn SiteExtractor>) {
        self.detail.insert(extractor.site(), extractor);
    }

    /// Sites that have a handler for `kind`.
    pub fn registered_sites(&self, kind: PageKind) -> Vec<Site> {
        let table = match kind {
            PageKind::List => &self.list,
            PageKind::Detail => &self.detail,
        };
        let mut sites: Vec<Site> = table.keys().copied().collect();
        sites.sort_by_key(|site| site.name());
        sites
    }

    /// Pick the handler for a task's carried metadata.
    pub fn resolve(
        &self,
        user_data: &UserData,
    ) -> Result<(PageKind, Arc<dyn SiteExtractor>), RouteError> {
        let kind = PageKind::from_label(&user_data.page_kind)
            .ok_or_else(|| RouteError::UnknownPageKind(user_data.page_kind.clone()))?;

        let table = match kind {
            PageKind::List => &self.list,
            PageKind::Detail => &self.detail,
        };

        let site = Site::from_name(&user_data.site_name)
            .ok_or_else(|| RouteError::UnknownSite(user_data.site_name.clone()))?;

        table
            .get(&site)
            .map(|extractor| (kind, extractor.clone()))
            .ok_or_else(|| RouteError::SiteNotConfigured {
                site: user_data.site_name.clone(),
                kind,
            })
    }

    /// Handle one completed fetch. Never fails: every error is logged and
    /// folded into the returned outcome so the crawl can move on.
    pub async fn dispatch(
        &self,
        task: &CrawlTask,
        page: &dyn PageHandle,
        enqueuer: &dyn LinkEnqueuer,
    ) -> TaskOutcome {
        let (kind, extractor) = match self.resolve(&task.user_data) {
            Ok(route) => route,
            Err(e) => {
                error!("[ROUTER] {} ({})", e, task.url);
                return TaskOutcome::Failed(e.into());
            }
        };

        info!("[ROUTER {}] Routing {} to {}", kind, task.url, extractor.site());

        match kind {
            PageKind::List => match extractor.handle_list(page, enqueuer).await {
                Ok(count) => TaskOutcome::Enqueued(count),
                Err(e) => Self::report(extractor.site(), kind, e),
            },
            PageKind::Detail => match extractor.handle_detail(page, self.store.as_ref()).await {
                Ok(record) => TaskOutcome::Saved(Box::new(record)),
                Err(e) => Self::report(extractor.site(), kind, e),
            },
        }
    }

    fn report(site: Site, kind: PageKind, e: ExtractError) -> TaskOutcome {
        match &e {
            ExtractError::MissingTitle(_) => {
                warn!("[{} {}] {}. Skipping save.", site, kind, e);
            }
            _ => error!("[{} {}] {}", site, kind, e),
        }

        if e.is_missing_content() {
            TaskOutcome::Skipped(e)
        } else {
            TaskOutcome::Failed(e.into())
        }
    }
}
