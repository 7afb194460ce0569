use anyhow::{Context, Result};
use std::path::Path;
use url::Url;

use crate::entities::{CrawlTask, PageKind, UserData};
use crate::sites::Site;

/// One list-page task per configured site.
pub fn default_seeds() -> Result<Vec<CrawlTask>> {
    Site::ALL
        .iter()
        .map(|site| {
            let extractor = site.extractor();
            let start = &extractor.config().start_url;
            let url = Url::parse(start)
                .with_context(|| format!("invalid start url for {}: {}", site, start))?;
            Ok(CrawlTask::new(url, UserData::new(*site, PageKind::List)))
        })
        .collect()
}

/// Read a JSON array of `{ "url", "userData": { "siteName", "pageKind" } }`.
/// Site names and page kinds are checked later, by the router.
pub fn load_seeds(path: &Path) -> Result<Vec<CrawlTask>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading seeds file {}", path.display()))?;
    let seeds: Vec<CrawlTask> = serde_json::from_str(&raw)
        .with_context(|| format!("parsing seeds file {}", path.display()))?;
    Ok(seeds)
}
