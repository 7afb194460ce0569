use crate::entities::{EventRecord, NewEvent};
use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Pool, Postgres};

/// Storage for scraped events, keyed by `website_url`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Insert the event, or overwrite the mutable columns of the existing row
    /// with the same `website_url` and bump `updated_at`. One atomic write.
    async fn upsert(&self, event: &NewEvent) -> Result<EventRecord>;

    async fn find_by_url(&self, website_url: &str) -> Result<Option<EventRecord>>;

    async fn count(&self) -> Result<i64>;
}

#[derive(Clone)]
pub struct PgEventRepository {
    pool: Pool<Postgres>,
}

impl PgEventRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventStore for PgEventRepository {
    async fn upsert(&self, event: &NewEvent) -> Result<EventRecord> {
        let record = sqlx::query_as::<_, EventRecord>(
            r#"
            INSERT INTO events_crawler
                  (website_url, event_title, event_city, address, description,
                   image, ticket_price, raw_date, country, category)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (website_url) DO UPDATE
              SET event_title  = EXCLUDED.event_title,
                  event_city   = EXCLUDED.event_city,
                  address      = EXCLUDED.address,
                  description  = EXCLUDED.description,
                  image        = EXCLUDED.image,
                  ticket_price = EXCLUDED.ticket_price,
                  raw_date     = EXCLUDED.raw_date,
                  country      = EXCLUDED.country,
                  category     = EXCLUDED.category,
                  updated_at   = now()
            RETURNING id, website_url, event_title AS title, event_city AS city, address,
                      description, image, ticket_price, raw_date, country, category,
                      created_at, updated_at
            "#,
        )
        .bind(&event.website_url)
        .bind(&event.title)
        .bind(&event.city)
        .bind(&event.address)
        .bind(&event.description)
        .bind(&event.image)
        .bind(&event.ticket_price)
        .bind(&event.raw_date)
        .bind(&event.country)
        .bind(&event.category)
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    async fn find_by_url(&self, website_url: &str) -> Result<Option<EventRecord>> {
        let record = sqlx::query_as::<_, EventRecord>(
            r#"
            SELECT id, website_url, event_title AS title, event_city AS city, address,
                   description, image, ticket_price, raw_date, country, category,
                   created_at, updated_at
            FROM events_crawler
            WHERE website_url = $1
            "#,
        )
        .bind(website_url)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn count(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM events_crawler")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
