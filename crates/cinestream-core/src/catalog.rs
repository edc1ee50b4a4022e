//! Mock content catalog
//!
//! Stands in for a catalog backend: a fixed set of records served with an
//! artificial delay. Nothing here mutates shared state.

use crate::{CatalogConfig, ContentId, ContentRecord, ContentType, Error, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, instrument};

/// Read-only content catalog
#[async_trait]
pub trait ContentCatalog: Send + Sync {
    /// Every record in the catalog
    async fn fetch_all(&self) -> Result<Vec<ContentRecord>>;

    /// One record by id
    async fn fetch_by_id(&self, id: ContentId) -> Result<ContentRecord>;

    /// Records whose title or description contains `query`, ignoring case
    async fn search(&self, query: &str) -> Result<Vec<ContentRecord>>;

    /// Records promoted in the home carousel
    async fn fetch_featured(&self) -> Result<Vec<ContentRecord>>;

    /// Other records sharing the genre or language of `id`
    async fn related(&self, id: ContentId) -> Result<Vec<ContentRecord>> {
        let current = self.fetch_by_id(id).await?;
        let all = self.fetch_all().await?;

        Ok(all
            .into_iter()
            .filter(|r| r.id != current.id)
            .filter(|r| r.genre == current.genre || r.language == current.language)
            .collect())
    }
}

/// A titled group of records on the home screen
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HomeSection {
    pub title: &'static str,
    pub content_type: ContentType,
    pub records: Vec<ContentRecord>,
}

/// Group records into home sections in display order, keeping catalog order
/// within each section; empty sections are kept
pub fn group_by_type(records: &[ContentRecord]) -> Vec<HomeSection> {
    ContentType::ALL
        .iter()
        .map(|content_type| {
            let records: Vec<ContentRecord> = records
                .iter()
                .filter(|r| r.content_type == *content_type)
                .cloned()
                .collect();
            HomeSection {
                title: content_type.section_title(),
                content_type: *content_type,
                records,
            }
        })
        .collect()
}

/// In-memory catalog with artificial latency
#[derive(Debug, Clone)]
pub struct MockCatalog {
    records: Vec<ContentRecord>,
    latency: Duration,
    fail_with: Option<String>,
}

impl MockCatalog {
    /// Catalog seeded with the built-in titles
    pub fn new(config: &CatalogConfig) -> Self {
        Self::with_records(default_records(), config)
    }

    pub fn with_records(records: Vec<ContentRecord>, config: &CatalogConfig) -> Self {
        Self {
            records,
            latency: Duration::from_millis(config.latency_ms),
            fail_with: None,
        }
    }

    /// A catalog whose every call fails with `FetchFailed`
    pub fn failing(reason: impl Into<String>, config: &CatalogConfig) -> Self {
        Self {
            records: Vec::new(),
            latency: Duration::from_millis(config.latency_ms),
            fail_with: Some(reason.into()),
        }
    }

    async fn respond(&self) -> Result<&[ContentRecord]> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        match &self.fail_with {
            Some(reason) => Err(Error::FetchFailed(reason.clone())),
            None => Ok(&self.records),
        }
    }
}

impl Default for MockCatalog {
    fn default() -> Self {
        Self::new(&CatalogConfig::default())
    }
}

#[async_trait]
impl ContentCatalog for MockCatalog {
    #[instrument(skip(self))]
    async fn fetch_all(&self) -> Result<Vec<ContentRecord>> {
        let records = self.respond().await?;
        debug!(count = records.len(), "Catalog fetched");
        Ok(records.to_vec())
    }

    #[instrument(skip(self))]
    async fn fetch_by_id(&self, id: ContentId) -> Result<ContentRecord> {
        self.respond()
            .await?
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or(Error::NotFound { id })
    }

    #[instrument(skip(self))]
    async fn search(&self, query: &str) -> Result<Vec<ContentRecord>> {
        let matches: Vec<ContentRecord> = self
            .respond()
            .await?
            .iter()
            .filter(|r| r.matches(query))
            .cloned()
            .collect();
        debug!(count = matches.len(), "Search completed");
        Ok(matches)
    }

    #[instrument(skip(self))]
    async fn fetch_featured(&self) -> Result<Vec<ContentRecord>> {
        Ok(self.respond().await?.to_vec())
    }
}

/// Built-in catalog titles
pub fn default_records() -> Vec<ContentRecord> {
    const STREAM: &str = "https://test-streams.mux.dev/x36xhzz/x36xhzz.m3u8";
    const THUMBS: &str = "https://v3img.voot.com/resizeMedium,w_914,h_514/v3Storage/assets";

    vec![
        ContentRecord {
            id: 1,
            title: "Vivian Calls Karan NAKLI!".into(),
            description: "S1BE85 · Reality · Hindi".into(),
            thumbnail_url: format!("{}/vertical-tv-1735492048233.jpg", THUMBS),
            url: STREAM.into(),
            is_premium: true,
            duration: "1 hr 50 min".into(),
            language: "Hindi".into(),
            genre: "Reality".into(),
            rating: "U/A 16+".into(),
            release_date: "29 Dec 2024".into(),
            content_type: ContentType::Shows,
        },
        ContentRecord {
            id: 2,
            title: "AUS vs IND".into(),
            description: "Cricket · Live".into(),
            thumbnail_url: format!("{}/day_4_aus_vs_ind_highlights_clean_ctv-1735467837549.jpg", THUMBS),
            url: STREAM.into(),
            is_premium: false,
            duration: "Live".into(),
            language: "English".into(),
            genre: "Sports".into(),
            rating: "U".into(),
            release_date: "Live".into(),
            content_type: ContentType::Sports,
        },
        ContentRecord {
            id: 3,
            title: "007: Road to a Million".into(),
            description: "Action · English · U/A 16+".into(),
            thumbnail_url: format!("{}/vertical-carousel-tv-1732258356328.jpg", THUMBS),
            url: STREAM.into(),
            is_premium: true,
            duration: "2 hr 30 min".into(),
            language: "English".into(),
            genre: "Action".into(),
            rating: "U/A 16+".into(),
            release_date: "25 Dec 2024".into(),
            content_type: ContentType::Movies,
        },
    ]
}
