//! Turning parsed feed items into stored posts.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use super::date::{parse_publish_date, DateParseError};
use super::store::ScrapeStore;
use super::types::ParsedFeedItem;
use crate::feed::{CreatePostError, NewPost};

/// What to do with an item whose `pubDate` cannot be normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DatePolicy {
    /// Skip the item and keep ingesting the rest of the feed.
    #[default]
    #[serde(rename = "skip")]
    SkipItem,
    /// Stop ingesting the feed at the offending item.
    #[serde(rename = "abort")]
    AbortBatch,
}

/// Counts for one feed's ingest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Posts newly stored.
    pub created: usize,
    /// Items whose URL was already stored.
    pub duplicates: usize,
    /// Items dropped for an unparseable date.
    pub skipped_bad_date: usize,
    /// Items dropped for having no link.
    pub skipped_no_link: usize,
}

/// Why ingesting a feed stopped early.
#[derive(Debug, Error)]
pub enum IngestError {
    /// An item's date could not be normalized under [`DatePolicy::AbortBatch`].
    #[error(transparent)]
    Date(#[from] DateParseError),

    /// Storing a post failed for a reason other than a duplicate URL.
    #[error("failed to store post {url}: {reason}")]
    Storage { url: String, reason: String },
}

/// Store the items of one feed as posts.
///
/// Items are handled in document order. A URL that is already stored is
/// counted and skipped, so ingesting the same items twice creates nothing
/// the second time. Posts stored before an error stay stored.
pub async fn ingest_items<S>(
    store: &S,
    feed_id: Uuid,
    items: &[ParsedFeedItem],
    policy: DatePolicy,
) -> Result<IngestReport, IngestError>
where
    S: ScrapeStore + ?Sized,
{
    let mut report = IngestReport::default();

    for item in items {
        if item.link.is_empty() {
            debug!(feed = %feed_id, title = %item.title, "Skipping item without link");
            report.skipped_no_link += 1;
            continue;
        }

        let mut post = NewPost::new(feed_id, &item.title, &item.link);
        if !item.description.is_empty() {
            post = post.with_description(&item.description);
        }

        if !item.pub_date.is_empty() {
            match parse_publish_date(&item.pub_date) {
                Ok(published) => post = post.with_published_at(published.with_timezone(&Utc)),
                Err(e) => match policy {
                    DatePolicy::SkipItem => {
                        warn!(feed = %feed_id, url = %item.link, "{}", e);
                        report.skipped_bad_date += 1;
                        continue;
                    }
                    DatePolicy::AbortBatch => return Err(e.into()),
                },
            }
        }

        match store.create_post(&post).await {
            Ok(_) => report.created += 1,
            Err(CreatePostError::DuplicateUrl { url }) => {
                debug!(feed = %feed_id, url = %url, "Post already stored");
                report.duplicates += 1;
            }
            Err(CreatePostError::Storage(e)) => {
                return Err(IngestError::Storage {
                    url: item.link.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    Ok(report)
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;
    use crate::db::{Database, NewUser, UserRepository};
    use crate::feed::{Feed, FeedRepository, NewFeed, PostRepository};
    use chrono::TimeZone;

    async fn setup() -> (Database, Feed) {
        let db = Database::open_in_memory().await.unwrap();
        let user = UserRepository::new(db.pool())
            .create(&NewUser::new("alice"))
            .await
            .unwrap();
        let feed = FeedRepository::new(db.pool())
            .create(&NewFeed::new("Blog", "https://example.com/feed.xml", user.id))
            .await
            .unwrap();
        (db, feed)
    }

    fn item(link: &str, pub_date: &str) -> ParsedFeedItem {
        ParsedFeedItem {
            title: format!("Title of {link}"),
            link: link.to_string(),
            description: String::new(),
            pub_date: pub_date.to_string(),
        }
    }

    #[tokio::test]
    async fn test_ingest_creates_posts() {
        let (db, feed) = setup().await;
        let items = vec![
            item("https://example.com/a", "Mon, 02 Jan 2006 15:04:05 -0700"),
            ParsedFeedItem {
                description: "Body".to_string(),
                ..item("https://example.com/b", "")
            },
        ];

        let report = ingest_items(&db, feed.id, &items, DatePolicy::SkipItem)
            .await
            .unwrap();
        assert_eq!(report.created, 2);

        let posts = PostRepository::new(db.pool());
        let a = posts.get_by_url("https://example.com/a").await.unwrap().unwrap();
        assert_eq!(
            a.published_at,
            Some(Utc.with_ymd_and_hms(2006, 1, 2, 22, 4, 5).unwrap())
        );
        assert!(a.description.is_none());

        let b = posts.get_by_url("https://example.com/b").await.unwrap().unwrap();
        assert!(b.published_at.is_none());
        assert_eq!(b.description.as_deref(), Some("Body"));
    }

    #[tokio::test]
    async fn test_ingest_is_idempotent() {
        let (db, feed) = setup().await;
        let items = vec![
            item("https://example.com/a", "2024-03-01T09:00:00Z"),
            item("https://example.com/b", "2024-03-02T09:00:00Z"),
        ];

        let first = ingest_items(&db, feed.id, &items, DatePolicy::SkipItem)
            .await
            .unwrap();
        let second = ingest_items(&db, feed.id, &items, DatePolicy::SkipItem)
            .await
            .unwrap();

        assert_eq!(first.created, 2);
        assert_eq!(second.created, 0);
        assert_eq!(second.duplicates, 2);
        assert_eq!(PostRepository::new(db.pool()).count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_within_batch_does_not_stop_ingest() {
        let (db, feed) = setup().await;
        let items = vec![
            ParsedFeedItem {
                title: "First".to_string(),
                ..item("https://example.com/a", "")
            },
            ParsedFeedItem {
                title: "Second".to_string(),
                ..item("https://example.com/a", "")
            },
            item("https://example.com/b", ""),
        ];

        let report = ingest_items(&db, feed.id, &items, DatePolicy::SkipItem)
            .await
            .unwrap();
        assert_eq!(report.created, 2);
        assert_eq!(report.duplicates, 1);

        let posts = PostRepository::new(db.pool());
        let stored = posts
            .get_by_url("https://example.com/a")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.title, "First");
        assert_eq!(posts.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_bad_date_skipped() {
        let (db, feed) = setup().await;
        let items = vec![
            item("https://example.com/a", "yesterday-ish"),
            item("https://example.com/b", "2024-03-02T09:00:00Z"),
        ];

        let report = ingest_items(&db, feed.id, &items, DatePolicy::SkipItem)
            .await
            .unwrap();
        assert_eq!(report.created, 1);
        assert_eq!(report.skipped_bad_date, 1);

        let posts = PostRepository::new(db.pool());
        assert!(posts.get_by_url("https://example.com/a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_bad_date_aborts_batch() {
        let (db, feed) = setup().await;
        let items = vec![
            item("https://example.com/a", "2024-03-01T09:00:00Z"),
            item("https://example.com/b", "yesterday-ish"),
            item("https://example.com/c", "2024-03-03T09:00:00Z"),
        ];

        let result = ingest_items(&db, feed.id, &items, DatePolicy::AbortBatch).await;
        match result {
            Err(IngestError::Date(e)) => assert_eq!(e.raw, "yesterday-ish"),
            other => panic!("expected date error, got {other:?}"),
        }

        // Items before the bad one stay stored.
        let posts = PostRepository::new(db.pool());
        assert!(posts.get_by_url("https://example.com/a").await.unwrap().is_some());
        assert!(posts.get_by_url("https://example.com/c").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_item_without_link_skipped() {
        let (db, feed) = setup().await;
        let items = vec![item("", ""), item("https://example.com/a", "")];

        let report = ingest_items(&db, feed.id, &items, DatePolicy::SkipItem)
            .await
            .unwrap();
        assert_eq!(report.created, 1);
        assert_eq!(report.skipped_no_link, 1);
    }

    #[tokio::test]
    async fn test_storage_failure_surfaces() {
        let (db, _feed) = setup().await;
        let items = vec![item("https://example.com/a", "")];

        // A feed id with no row violates the foreign key.
        let result = ingest_items(&db, Uuid::new_v4(), &items, DatePolicy::SkipItem).await;
        assert!(matches!(result, Err(IngestError::Storage { .. })));
    }

    #[test]
    fn test_date_policy_serde_names() {
        #[derive(Deserialize)]
        struct Wrapper {
            policy: DatePolicy,
        }

        let skip: Wrapper = toml::from_str("policy = \"skip\"").unwrap();
        assert_eq!(skip.policy, DatePolicy::SkipItem);
        let abort: Wrapper = toml::from_str("policy = \"abort\"").unwrap();
        assert_eq!(abort.policy, DatePolicy::AbortBatch);
        assert_eq!(DatePolicy::default(), DatePolicy::SkipItem);
    }
}
