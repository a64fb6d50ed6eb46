//! Feed scraping for gator.
//!
//! This module fetches due feeds, normalizes their items and stores them
//! as posts, either once or on a fixed interval.

pub mod date;
pub mod fetcher;
pub mod ingest;
pub mod scheduler;
pub mod store;
pub mod types;

pub use date::{parse_publish_date, parse_publish_date_with_layout, DateLayout, DateParseError};
pub use fetcher::{parse_rss, validate_feed_url, FeedFetcher, FetchError, FetchFeed, USER_AGENT};
pub use ingest::{ingest_items, DatePolicy, IngestError, IngestReport};
pub use scheduler::{CycleReport, FeedErrorPolicy, FeedOutcome, FeedResult, ScrapeOptions, Scraper};
pub use store::ScrapeStore;
pub use types::{ParsedFeedItem, RawFeedDocument};
