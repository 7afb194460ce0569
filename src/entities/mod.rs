use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use url::Url;
use uuid::Uuid;

use crate::sites::Site;

// --- Crawl metadata ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PageKind {
    List,
    Detail,
}

impl PageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageKind::List => "List",
            PageKind::Detail => "Detail",
        }
    }

    /// Parse a carried page-kind label. `DEFAULT` and `DETAIL` are the
    /// labels older seed files use.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "list" | "default" => Some(PageKind::List),
            "detail" => Some(PageKind::Detail),
            _ => None,
        }
    }
}

impl fmt::Display for PageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Routing metadata carried on every scheduled fetch. Values stay raw
/// strings until the router resolves them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserData {
    pub site_name: String,
    #[serde(alias = "label")]
    pub page_kind: String,
}

impl UserData {
    pub fn new(site: Site, page_kind: PageKind) -> Self {
        Self {
            site_name: site.name().to_string(),
            page_kind: page_kind.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlTask {
    pub url: Url,
    pub user_data: UserData,
}

impl CrawlTask {
    pub fn new(url: Url, user_data: UserData) -> Self {
        Self { url, user_data }
    }
}

// --- Tables ---

/// Normalized event ready to be upserted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
    pub website_url: String,
    pub title: String,
    pub city: String,
    pub address: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub ticket_price: Option<String>,
    pub raw_date: Option<String>, // free-form "date time" as shown on the page
    pub country: String,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct EventRecord {
    pub id: Uuid,
    pub website_url: String, // unique
    pub title: String,
    pub city: String,
    pub address: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub ticket_price: Option<String>,
    pub raw_date: Option<String>,
    pub country: String,
    pub category: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EventRecord {
    pub fn from_new(event: &NewEvent, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            website_url: event.website_url.clone(),
            title: event.title.clone(),
            city: event.city.clone(),
            address: event.address.clone(),
            description: event.description.clone(),
            image: event.image.clone(),
            ticket_price: event.ticket_price.clone(),
            raw_date: event.raw_date.clone(),
            country: event.country.clone(),
            category: event.category.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrite the mutable columns. `id`, `website_url` and `created_at`
    /// never change after insert.
    pub fn apply_update(&mut self, event: &NewEvent, now: DateTime<Utc>) {
        self.title = event.title.clone();
        self.city = event.city.clone();
        self.address = event.address.clone();
        self.description = event.description.clone();
        self.image = event.image.clone();
        self.ticket_price = event.ticket_price.clone();
        self.raw_date = event.raw_date.clone();
        self.country = event.country.clone();
        self.category = event.category.clone();
        self.updated_at = now;
    }
}
