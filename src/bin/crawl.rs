use anyhow::Result;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

use events_crawler::{
    config::Config,
    crawl::{Crawler, CrawlerConfig, default_seeds, load_seeds},
    fetcher::Fetcher,
    repositories::{EventStore, MemoryEventStore, PgEventRepository},
    router::Router,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;

    let store: Arc<dyn EventStore> = if config.dry_run() {
        info!("Dry run: events are kept in memory");
        Arc::new(MemoryEventStore::new())
    } else {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(config.max_concurrency() as u32 + 1)
            .connect(config.database_url())
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Arc::new(PgEventRepository::new(pool))
    };

    let seeds = match config.seeds_file() {
        Some(path) => load_seeds(path)?,
        None => default_seeds()?,
    };

    let router = Router::with_default_sites(store.clone());
    let crawler = Crawler::new(router, Fetcher::new()?, CrawlerConfig::from(&config));

    let shutdown_token = crawler.shutdown_token();
    tokio::spawn(async move {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            return;
        }
        info!("Received shutdown signal, finishing in-flight pages...");
        shutdown_token.cancel();
    });

    let stats = crawler.run(seeds).await?;
    info!("{} events stored in total", store.count().await?);
    println!("{}", stats);

    Ok(())
}
