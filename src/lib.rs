pub mod classify;
pub mod config;
pub mod crawl;
pub mod entities;
pub mod fetcher;
pub mod normalize;
pub mod page;
pub mod repositories;
pub mod router;
pub mod sites;
