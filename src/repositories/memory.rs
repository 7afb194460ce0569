use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use dashmap::{DashMap, mapref::entry::Entry};
use std::sync::Arc;

use crate::entities::{EventRecord, NewEvent};
use crate::repositories::EventStore;

/// Process-local store for dry runs. The shard lock held by `entry` makes
/// each upsert atomic per URL.
#[derive(Clone, Default)]
pub struct MemoryEventStore {
    events: Arc<DashMap<String, EventRecord>>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<EventRecord> {
        let mut events: Vec<EventRecord> =
            self.events.iter().map(|entry| entry.value().clone()).collect();
        events.sort_by(|a, b| a.website_url.cmp(&b.website_url));
        events
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn upsert(&self, event: &NewEvent) -> Result<EventRecord> {
        let now = Utc::now();

        let record = match self.events.entry(event.website_url.clone()) {
            Entry::Occupied(mut existing) => {
                let record = existing.get_mut();
                record.apply_update(event, now);
                record.clone()
            }
            Entry::Vacant(slot) => slot.insert(EventRecord::from_new(event, now)).clone(),
        };

        Ok(record)
    }

    async fn find_by_url(&self, website_url: &str) -> Result<Option<EventRecord>> {
        Ok(self
            .events
            .get(website_url)
            .map(|entry| entry.value().clone()))
    }

    async fn count(&self) -> Result<i64> {
        Ok(self.events.len() as i64)
    }
}
