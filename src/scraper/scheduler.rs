//! Periodic scraping of due feeds.
//!
//! A cycle takes the feeds that have waited longest, marks each one as
//! fetched before requesting it, then ingests its items. Cycles run back to
//! back on a fixed interval until the shutdown signal fires.

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::fetcher::FetchFeed;
use super::ingest::{ingest_items, DatePolicy, IngestReport};
use super::store::ScrapeStore;
use crate::config::ScraperConfig;
use crate::feed::Feed;
use crate::{GatorError, Result};

/// What a failing feed does to the rest of its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedErrorPolicy {
    /// The first failing feed ends the cycle with an error.
    Halt,
    /// A failing feed is logged and the cycle moves on.
    #[default]
    Isolate,
}

/// Tunables for a [`Scraper`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrapeOptions {
    /// Feeds taken per cycle.
    pub batch_size: u32,
    /// Failure handling between feeds.
    pub on_feed_error: FeedErrorPolicy,
    /// Failure handling for unparseable publish dates.
    pub on_bad_date: DatePolicy,
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        Self {
            batch_size: 3,
            on_feed_error: FeedErrorPolicy::default(),
            on_bad_date: DatePolicy::default(),
        }
    }
}

impl From<&ScraperConfig> for ScrapeOptions {
    fn from(config: &ScraperConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            on_feed_error: config.on_feed_error,
            on_bad_date: config.on_bad_date,
        }
    }
}

/// Result for one feed within a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedResult {
    Ingested(IngestReport),
    Failed(String),
}

/// One feed's entry in a [`CycleReport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedOutcome {
    pub feed_id: Uuid,
    pub url: String,
    pub result: FeedResult,
}

/// Summary of one scrape cycle, in the order feeds were attempted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub outcomes: Vec<FeedOutcome>,
}

impl CycleReport {
    /// Number of feeds attempted.
    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }

    /// Number of feeds that failed.
    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.result, FeedResult::Failed(_)))
            .count()
    }

    /// Posts stored across all feeds.
    pub fn posts_created(&self) -> usize {
        self.outcomes
            .iter()
            .map(|o| match &o.result {
                FeedResult::Ingested(report) => report.created,
                FeedResult::Failed(_) => 0,
            })
            .sum()
    }
}

/// Feed scraper.
///
/// Generic over its storage and fetch seams so cycles can run against an
/// in-memory store and canned documents.
pub struct Scraper<S: ?Sized, F: ?Sized> {
    store: Arc<S>,
    fetcher: Arc<F>,
    options: ScrapeOptions,
}

impl<S, F> Scraper<S, F>
where
    S: ScrapeStore + ?Sized,
    F: FetchFeed + ?Sized,
{
    /// Create a new scraper.
    pub fn new(store: Arc<S>, fetcher: Arc<F>, options: ScrapeOptions) -> Self {
        Self {
            store,
            fetcher,
            options,
        }
    }

    /// The options this scraper runs with.
    pub fn options(&self) -> &ScrapeOptions {
        &self.options
    }

    /// Run a single cycle.
    ///
    /// Storage failures while selecting or marking feeds always end the
    /// cycle. Fetch and ingest failures end it only under
    /// [`FeedErrorPolicy::Halt`]; feeds after the failing one are then
    /// left untouched.
    pub async fn run_once(&self) -> Result<CycleReport> {
        let mut report = CycleReport::default();

        let feeds = self.store.list_due_feeds(self.options.batch_size).await?;
        if feeds.is_empty() {
            debug!("No feeds to scrape");
            return Ok(report);
        }

        info!("Scraping {} feed(s)", feeds.len());

        for feed in feeds {
            self.store.mark_feed_fetched(feed.id, Utc::now()).await?;

            let result = match self.scrape_feed(&feed).await {
                Ok(ingested) => {
                    self.store.mark_feed_succeeded(feed.id, Utc::now()).await?;
                    if ingested.created > 0 {
                        info!(
                            "Feed {} ({}): {} new post(s)",
                            feed.name, feed.url, ingested.created
                        );
                    } else {
                        debug!("Feed {} ({}): no new posts", feed.name, feed.url);
                    }
                    FeedResult::Ingested(ingested)
                }
                Err(e) => match self.options.on_feed_error {
                    FeedErrorPolicy::Halt => return Err(e),
                    FeedErrorPolicy::Isolate => {
                        warn!("Feed {} ({}) failed: {}", feed.name, feed.url, e);
                        FeedResult::Failed(e.to_string())
                    }
                },
            };

            report.outcomes.push(FeedOutcome {
                feed_id: feed.id,
                url: feed.url,
                result,
            });
        }

        Ok(report)
    }

    async fn scrape_feed(&self, feed: &Feed) -> Result<IngestReport> {
        let document = self.fetcher.fetch(&feed.url).await?;
        debug!(
            "Fetched {} item(s) from {} ({})",
            document.items.len(),
            feed.url,
            document.title
        );
        let ingested =
            ingest_items(&*self.store, feed.id, &document.items, self.options.on_bad_date).await?;
        Ok(ingested)
    }

    /// Run cycles every `every` until `shutdown` completes.
    ///
    /// The first cycle starts immediately. Shutdown is observed between
    /// cycles, never in the middle of one. A cycle that errors stops the
    /// loop with that error.
    pub async fn run_forever<Fut>(&self, every: Duration, shutdown: Fut) -> Result<()>
    where
        Fut: Future<Output = ()>,
    {
        if every.is_zero() {
            return Err(GatorError::Validation(
                "scrape interval must be greater than zero".to_string(),
            ));
        }

        info!("Scraper started (interval: {:?})", every);

        let mut timer = interval(every);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Scraper stopped");
                    return Ok(());
                }
                _ = timer.tick() => {}
            }

            let report = self.run_once().await?;
            if report.failed() > 0 {
                warn!(
                    "Cycle finished: {} feed(s), {} failed, {} new post(s)",
                    report.attempted(),
                    report.failed(),
                    report.posts_created()
                );
            } else {
                debug!(
                    "Cycle finished: {} feed(s), {} new post(s)",
                    report.attempted(),
                    report.posts_created()
                );
            }
        }
    }
}
