use anyhow::Result;
use std::{fmt, sync::Arc, time::Duration};
use tokio::{sync::Semaphore, task::JoinSet, time::sleep};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info, info_span, warn};

use crate::config::Config;
use crate::crawl::{QueueEnqueuer, RequestQueue, Throttle, backoff_delay};
use crate::entities::CrawlTask;
use crate::fetcher::{FetchError, Fetcher, PageResponse};
use crate::page::HtmlPage;
use crate::router::{Router, TaskOutcome};

/// Crawl limits
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    pub max_concurrency: usize,
    /// Per host; 0 disables the throttle.
    pub max_requests_per_minute: u32,
    /// `None` means unlimited.
    pub max_requests: Option<usize>,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            max_requests_per_minute: 5,
            max_requests: Some(50),
            max_retries: 3,
            retry_base_delay: Duration::from_secs(1),
        }
    }
}

impl From<&Config> for CrawlerConfig {
    fn from(config: &Config) -> Self {
        Self {
            max_concurrency: config.max_concurrency(),
            max_requests_per_minute: config.max_requests_per_minute(),
            max_requests: config.max_requests(),
            max_retries: config.max_retries(),
            ..Self::default()
        }
    }
}

/// Tally of a finished crawl.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStats {
    /// Tasks taken off the queue.
    pub requests: usize,
    pub fetch_failures: usize,
    pub retries: usize,
    /// Detail tasks scheduled by list pages.
    pub enqueued: usize,
    pub saved: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl CrawlStats {
    fn record(&mut self, report: TaskReport) {
        self.requests += 1;
        self.retries += report.retries as usize;
        match report.result {
            Ok(TaskOutcome::Enqueued(count)) => self.enqueued += count,
            Ok(TaskOutcome::Saved(_)) => self.saved += 1,
            Ok(TaskOutcome::Skipped(_)) => self.skipped += 1,
            Ok(TaskOutcome::Failed(_)) => self.failed += 1,
            Err(_) => self.fetch_failures += 1,
        }
    }
}

impl fmt::Display for CrawlStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "requests={} saved={} enqueued={} skipped={} failed={} fetch_failures={} retries={}",
            self.requests,
            self.saved,
            self.enqueued,
            self.skipped,
            self.failed,
            self.fetch_failures,
            self.retries
        )
    }
}

struct TaskReport {
    retries: u32,
    result: Result<TaskOutcome, FetchError>,
}

/// Drives tasks from the queue through fetch and dispatch until the queue
/// drains or the crawl is cancelled.
pub struct Crawler {
    router: Arc<Router>,
    fetcher: Fetcher,
    config: CrawlerConfig,
    shutdown_token: CancellationToken,
}

impl Crawler {
    pub fn new(router: Router, fetcher: Fetcher, config: CrawlerConfig) -> Self {
        Self {
            router: Arc::new(router),
            fetcher,
            config,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Cancelling stops new fetches; in-flight tasks finish.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    pub async fn run(&self, seeds: Vec<CrawlTask>) -> Result<CrawlStats> {
        let concurrency = self.config.max_concurrency.max(1);
        info!(
            "Starting crawl - seeds: {}, concurrency: {}, per-minute: {}, max requests: {:?}",
            seeds.len(),
            concurrency,
            self.config.max_requests_per_minute,
            self.config.max_requests
        );

        let queue = Arc::new(RequestQueue::new(self.config.max_requests));
        for seed in seeds {
            if !queue.push(seed) {
                warn!("Dropping duplicate or over-limit seed");
            }
        }

        let throttle = Throttle::per_minute(self.config.max_requests_per_minute);
        let semaphore = Arc::new(Semaphore::new(concurrency));
        let mut tasks = JoinSet::new();
        let mut stats = CrawlStats::default();

        while !self.shutdown_token.is_cancelled() {
            let Some(task) = queue.pop() else {
                // running tasks may still enqueue more work
                match tasks.join_next().await {
                    Some(joined) => Self::collect(&mut stats, joined),
                    None => break,
                }
                continue;
            };

            let permit = tokio::select! {
                _ = self.shutdown_token.cancelled() => break,
                permit = semaphore.clone().acquire_owned() => permit?,
            };

            let span = info_span!(
                "task",
                url = %task.url,
                site = %task.user_data.site_name,
                kind = %task.user_data.page_kind
            );
            let worker = TaskWorker {
                router: self.router.clone(),
                fetcher: self.fetcher.clone(),
                throttle: throttle.clone(),
                queue: queue.clone(),
                config: self.config.clone(),
                shutdown_token: self.shutdown_token.clone(),
            };
            tasks.spawn(
                async move {
                    let _permit = permit;
                    worker.process(task).await
                }
                .instrument(span),
            );

            while let Some(joined) = tasks.try_join_next() {
                Self::collect(&mut stats, joined);
            }
        }

        if self.shutdown_token.is_cancelled() {
            info!(
                "Shutdown requested, waiting for {} in-flight tasks ({} left queued)",
                tasks.len(),
                queue.len()
            );
        }
        while let Some(joined) = tasks.join_next().await {
            Self::collect(&mut stats, joined);
        }

        info!("Crawl finished: {}", stats);
        Ok(stats)
    }

    fn collect(stats: &mut CrawlStats, joined: Result<TaskReport, tokio::task::JoinError>) {
        match joined {
            Ok(report) => stats.record(report),
            Err(e) => {
                error!("Crawl task panicked: {}", e);
                stats.requests += 1;
                stats.failed += 1;
            }
        }
    }
}

/// Everything one spawned task needs.
struct TaskWorker {
    router: Arc<Router>,
    fetcher: Fetcher,
    throttle: Throttle,
    queue: Arc<RequestQueue>,
    config: CrawlerConfig,
    shutdown_token: CancellationToken,
}

impl TaskWorker {
    async fn process(self, task: CrawlTask) -> TaskReport {
        let (fetched, retries) = self.fetch_with_retry(&task).await;

        let response = match fetched {
            Ok(response) => response,
            Err(e) => {
                error!("Fetch failed for {}: {}", task.url, e);
                return TaskReport {
                    retries,
                    result: Err(e),
                };
            }
        };

        let page = HtmlPage::new(response.url_final, response.body_utf8);
        let enqueuer = QueueEnqueuer::new(self.queue.clone());
        let outcome = self.router.dispatch(&task, &page, &enqueuer).await;

        TaskReport {
            retries,
            result: Ok(outcome),
        }
    }

    async fn fetch_with_retry(&self, task: &CrawlTask) -> (Result<PageResponse, FetchError>, u32) {
        let host = task.url.host_str().unwrap_or_default();
        let mut attempt = 0;

        loop {
            self.throttle.acquire(host).await;

            let error = match self.fetcher.fetch(&task.url).await {
                Ok(response) => return (Ok(response), attempt),
                Err(e) => e,
            };
            if !error.should_retry() || attempt >= self.config.max_retries {
                return (Err(error), attempt);
            }

            let delay = backoff_delay(attempt, self.config.retry_base_delay);
            warn!(
                "Fetch of {} failed ({}), retry {}/{} in {:?}",
                task.url,
                error,
                attempt + 1,
                self.config.max_retries,
                delay
            );

            tokio::select! {
                _ = self.shutdown_token.cancelled() => return (Err(error), attempt),
                _ = sleep(delay) => {}
            }
            attempt += 1;
        }
    }
}
