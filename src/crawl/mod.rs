//! Crawl loop around the router: queue, throttle, link discovery, fetch
//! retries.

pub mod backoff;
pub mod enqueuer;
pub mod glob;
pub mod queue;
pub mod runner;
pub mod seeds;
pub mod throttle;

pub use backoff::backoff_delay;
pub use enqueuer::QueueEnqueuer;
pub use glob::UrlGlob;
pub use queue::RequestQueue;
pub use runner::{CrawlStats, Crawler, CrawlerConfig};
pub use seeds::{default_seeds, load_seeds};
pub use throttle::Throttle;
