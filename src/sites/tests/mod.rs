use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

use crate::crawl::{QueueEnqueuer, RequestQueue};
use crate::entities::{PageKind, UserData};
use crate::page::{EnqueueError, EnqueueLinks, HtmlPage, LinkEnqueuer, LinkSource, PageError, PageHandle};
use crate::repositories::{EventStore, MemoryEventStore, MockEventStore};
use crate::sites::{AsiaSociety, ExtractError, Site, SiteExtractor};

const EVENT_HTML: &str = include_str!("fixtures/asia_society_event.html");
const SPARSE_EVENT_HTML: &str = include_str!("fixtures/asia_society_sparse_event.html");
const UNTITLED_EVENT_HTML: &str = include_str!("fixtures/asia_society_untitled_event.html");
const LIST_HTML: &str = include_str!("fixtures/asia_society_list.html");

const EVENT_URL: &str = "https://asiasociety.org/new-york/events/japanese-tea-ceremony";
const LIST_URL: &str = "https://asiasociety.org/new-york";

fn page(url: &str, html: &str) -> HtmlPage {
    HtmlPage::new(Url::parse(url).unwrap(), html)
}

#[derive(Default)]
struct RecordingEnqueuer {
    requests: Mutex<Vec<EnqueueLinks>>,
}

#[async_trait]
impl LinkEnqueuer for RecordingEnqueuer {
    async fn enqueue_links(
        &self,
        _page: &dyn PageHandle,
        request: EnqueueLinks,
    ) -> Result<usize, EnqueueError> {
        self.requests.lock().unwrap().push(request);
        Ok(1)
    }
}

/// A live page whose links never render.
struct StalledPage {
    url: Url,
}

#[async_trait]
impl PageHandle for StalledPage {
    fn url(&self) -> Option<&Url> {
        Some(&self.url)
    }

    async fn wait_for_selector(&self, _selector: &str) -> Result<(), PageError> {
        std::future::pending().await
    }

    async fn text_content(&self, _selector: &str) -> Result<Option<String>, PageError> {
        Ok(None)
    }

    async fn inner_text(&self, _selector: &str) -> Result<Option<String>, PageError> {
        Ok(None)
    }

    async fn attribute(&self, _selector: &str, _name: &str) -> Result<Option<String>, PageError> {
        Ok(None)
    }

    async fn next_text_sibling(&self, _selector: &str) -> Result<Option<String>, PageError> {
        Ok(None)
    }

    async fn hrefs(&self, _selector: &str) -> Result<Vec<String>, PageError> {
        Ok(Vec::new())
    }
}

/// A page that dies as soon as it is read.
struct CrashedPage {
    url: Url,
}

#[async_trait]
impl PageHandle for CrashedPage {
    fn url(&self) -> Option<&Url> {
        Some(&self.url)
    }

    async fn wait_for_selector(&self, _selector: &str) -> Result<(), PageError> {
        Err(PageError::Unavailable("target closed".to_string()))
    }

    async fn text_content(&self, _selector: &str) -> Result<Option<String>, PageError> {
        Err(PageError::Unavailable("target closed".to_string()))
    }

    async fn inner_text(&self, _selector: &str) -> Result<Option<String>, PageError> {
        Err(PageError::Unavailable("target closed".to_string()))
    }

    async fn attribute(&self, _selector: &str, _name: &str) -> Result<Option<String>, PageError> {
        Err(PageError::Unavailable("target closed".to_string()))
    }

    async fn next_text_sibling(&self, _selector: &str) -> Result<Option<String>, PageError> {
        Err(PageError::Unavailable("target closed".to_string()))
    }

    async fn hrefs(&self, _selector: &str) -> Result<Vec<String>, PageError> {
        Err(PageError::Unavailable("target closed".to_string()))
    }
}

#[tokio::test]
async fn test_detail_extracts_full_event() {
    let extractor = AsiaSociety::new();
    let store = MemoryEventStore::new();

    let record = extractor
        .handle_detail(&page(EVENT_URL, EVENT_HTML), &store)
        .await
        .unwrap();

    assert_eq!(record.website_url, EVENT_URL);
    assert_eq!(record.title, "Japanese Tea Ceremony");
    assert_eq!(record.city, "New York");
    assert_eq!(
        record.address.as_deref(),
        Some("725 Park Avenue New York, NY 10021")
    );
    assert_eq!(
        record.description.as_deref(),
        Some(
            "Join us for a traditional tea ceremony. \
             Learn the ritual from a master of the Urasenke school. \
             Sweets will be served."
        )
    );
    assert_eq!(
        record.image.as_deref(),
        Some("https://asiasociety.org/sites/default/files/tea.jpg")
    );
    assert_eq!(
        record.ticket_price.as_deref(),
        Some("$15 Members; $20 Nonmembers")
    );
    assert_eq!(record.raw_date.as_deref(), Some("Sat 15 Nov 2025 2 - 2:45 p.m."));
    assert_eq!(record.country, "Japan");
    assert_eq!(record.category, "Rituals");

    assert_eq!(store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_detail_missing_optional_fields_degrade_to_none() {
    let extractor = AsiaSociety::new();
    let store = MemoryEventStore::new();
    let url = "https://asiasociety.org/new-york/events/open-house";

    let record = extractor
        .handle_detail(&page(url, SPARSE_EVENT_HTML), &store)
        .await
        .unwrap();

    assert_eq!(record.title, "Members Open House");
    assert_eq!(record.address, None);
    assert_eq!(record.description, None);
    assert_eq!(record.image, None);
    assert_eq!(record.ticket_price, None);
    assert_eq!(record.raw_date.as_deref(), Some("Thu 4 Dec 2025"));
    assert_eq!(record.country, "United States");
    assert_eq!(record.category, "Uncategorized");
}

#[tokio::test]
async fn test_detail_without_title_abstains() {
    let extractor = AsiaSociety::new();
    let mut store = MockEventStore::new();
    store.expect_upsert().never();

    let result = extractor
        .handle_detail(&page(EVENT_URL, UNTITLED_EVENT_HTML), &store)
        .await;

    match result {
        Err(ExtractError::MissingTitle(url)) => assert_eq!(url, EVENT_URL),
        other => panic!("expected missing title, got {:?}", other),
    }
}

#[tokio::test]
async fn test_detail_without_loaded_url_abstains() {
    let extractor = AsiaSociety::new();
    let mut store = MockEventStore::new();
    store.expect_upsert().never();

    let result = extractor
        .handle_detail(&HtmlPage::detached(EVENT_HTML), &store)
        .await;

    assert!(matches!(result, Err(ExtractError::MissingLoadedUrl)));
}

#[tokio::test]
async fn test_detail_page_failure_abstains() {
    let extractor = AsiaSociety::new();
    let mut store = MockEventStore::new();
    store.expect_upsert().never();

    let page = CrashedPage {
        url: Url::parse(EVENT_URL).unwrap(),
    };
    let result = extractor.handle_detail(&page, &store).await;

    match result {
        Err(e @ ExtractError::Page { .. }) => {
            assert!(!e.is_missing_content());
            assert!(e.to_string().contains(EVENT_URL));
            assert!(e.to_string().contains("target closed"));
        }
        other => panic!("expected page error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_detail_upsert_failure_is_reported() {
    let extractor = AsiaSociety::new();
    let mut store = MockEventStore::new();
    store
        .expect_upsert()
        .times(1)
        .returning(|_| Err(anyhow::anyhow!("connection reset")));

    let result = extractor
        .handle_detail(&page(EVENT_URL, EVENT_HTML), &store)
        .await;

    match result {
        Err(ExtractError::Persist { url, source }) => {
            assert_eq!(url, EVENT_URL);
            assert_eq!(source.to_string(), "connection reset");
        }
        other => panic!("expected persist error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_detail_passes_normalized_event_to_store() {
    let extractor = AsiaSociety::new();
    let mut store = MockEventStore::new();
    store
        .expect_upsert()
        .withf(|event| {
            event.website_url == EVENT_URL
                && event.title == "Japanese Tea Ceremony"
                && event.country == "Japan"
                && event.category == "Rituals"
        })
        .times(1)
        .returning(|event| Ok(crate::entities::EventRecord::from_new(event, chrono::Utc::now())));

    let record = extractor
        .handle_detail(&page(EVENT_URL, EVENT_HTML), &store)
        .await
        .unwrap();

    assert_eq!(record.website_url, EVENT_URL);
}

#[tokio::test]
async fn test_rescrape_updates_single_record() {
    let extractor = AsiaSociety::new();
    let store = MemoryEventStore::new();

    let first = extractor
        .handle_detail(&page(EVENT_URL, EVENT_HTML), &store)
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(10)).await;
    let renamed = EVENT_HTML.replace("Japanese Tea Ceremony", "Chinese Tea Ceremony");
    let second = extractor
        .handle_detail(&page(EVENT_URL, &renamed), &store)
        .await
        .unwrap();

    assert_eq!(store.count().await.unwrap(), 1);
    assert_eq!(second.id, first.id);
    assert_eq!(second.title, "Chinese Tea Ceremony");
    assert_eq!(second.country, "China");
    assert!(second.updated_at > first.updated_at);
}

#[tokio::test]
async fn test_list_requests_detail_links() {
    let extractor = AsiaSociety::new();
    let enqueuer = RecordingEnqueuer::default();

    let count = extractor
        .handle_list(&page(LIST_URL, LIST_HTML), &enqueuer)
        .await
        .unwrap();
    assert_eq!(count, 1);

    let requests = enqueuer.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].source,
        LinkSource::Selector("h4.card-title > a".to_string())
    );
    assert_eq!(
        requests[0].globs,
        vec!["https://asiasociety.org/new-york/events/*".to_string()]
    );
    assert_eq!(
        requests[0].user_data,
        UserData::new(Site::AsiaSociety, PageKind::Detail)
    );
}

#[tokio::test]
async fn test_list_enqueues_only_matching_event_links() {
    let extractor = AsiaSociety::new();
    let queue = Arc::new(RequestQueue::new(None));
    let enqueuer = QueueEnqueuer::new(queue.clone());

    let count = extractor
        .handle_list(&page(LIST_URL, LIST_HTML), &enqueuer)
        .await
        .unwrap();

    assert_eq!(count, 2);
    let first = queue.pop().unwrap();
    let second = queue.pop().unwrap();
    assert!(queue.pop().is_none());

    assert_eq!(first.url.as_str(), EVENT_URL);
    assert_eq!(
        second.url.as_str(),
        "https://asiasociety.org/new-york/events/korean-film-night"
    );
    assert_eq!(first.user_data.site_name, "asiaSociety");
    assert_eq!(first.user_data.page_kind, "Detail");
}

#[tokio::test]
async fn test_list_without_links_enqueues_nothing() {
    let extractor = AsiaSociety::new();
    let enqueuer = RecordingEnqueuer::default();

    let result = extractor
        .handle_list(&page(LIST_URL, EVENT_HTML), &enqueuer)
        .await;

    match result {
        Err(e @ ExtractError::LinksNotFound { .. }) => {
            assert!(e.is_missing_content());
            assert!(e.to_string().contains("h4.card-title > a"));
            assert!(e.to_string().contains(LIST_URL));
        }
        other => panic!("expected links not found, got {:?}", other),
    }
    assert!(enqueuer.requests.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_list_wait_is_bounded() {
    let extractor = AsiaSociety::new();
    let enqueuer = RecordingEnqueuer::default();
    let page = StalledPage {
        url: Url::parse(LIST_URL).unwrap(),
    };

    let started = tokio::time::Instant::now();
    let result = extractor.handle_list(&page, &enqueuer).await;

    assert!(matches!(result, Err(ExtractError::LinksNotFound { .. })));
    assert!(started.elapsed() >= extractor.config().list_wait);
    assert!(enqueuer.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_list_page_failure_is_not_missing_content() {
    let extractor = AsiaSociety::new();
    let enqueuer = RecordingEnqueuer::default();
    let page = CrashedPage {
        url: Url::parse(LIST_URL).unwrap(),
    };

    let result = extractor.handle_list(&page, &enqueuer).await;

    assert!(matches!(result, Err(ExtractError::Page { .. })));
}

#[test]
fn test_image_resolution() {
    let config = AsiaSociety::default_config();
    assert_eq!(
        config.resolve_image("/files/a.jpg").as_deref(),
        Some("https://asiasociety.org/files/a.jpg")
    );
    assert_eq!(
        config.resolve_image("https://cdn.example.com/b.png").as_deref(),
        Some("https://cdn.example.com/b.png")
    );
    assert_eq!(config.resolve_image("  "), None);
}

#[test]
fn test_site_names_round_trip() {
    for site in Site::ALL {
        assert_eq!(Site::from_name(site.name()), Some(*site));
    }
    assert_eq!(Site::from_name("unknown"), None);
}

#[test]
fn test_every_site_variant_is_listed() {
    // A new variant stops this match compiling until it gets an arm here.
    fn listed(site: Site) -> bool {
        match site {
            Site::AsiaSociety => Site::ALL.contains(&Site::AsiaSociety),
        }
    }

    assert!(listed(Site::AsiaSociety));
    for site in Site::ALL {
        assert!(listed(*site));
        assert_eq!(Site::ALL.iter().filter(|s| *s == site).count(), 1);
    }
}

#[tokio::test]
async fn test_read_fields_through_per_field_queries() {
    let extractor = AsiaSociety::new();
    let page = StalledPage {
        url: Url::parse(EVENT_URL).unwrap(),
    };

    let fields = extractor.read_fields(&page).await.unwrap();

    assert_eq!(fields, crate::sites::RawFields::default());
}
