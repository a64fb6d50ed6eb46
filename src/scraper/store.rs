//! Storage seam for the scraper.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::db::Database;
use crate::feed::{CreatePostError, Feed, FeedRepository, NewPost, Post, PostRepository};
use crate::Result;

/// The storage operations a scrape cycle needs.
#[async_trait]
pub trait ScrapeStore: Send + Sync {
    /// Up to `limit` feeds, never-fetched first, then least recently fetched.
    async fn list_due_feeds(&self, limit: u32) -> Result<Vec<Feed>>;

    /// Record that a feed was picked for fetching.
    async fn mark_feed_fetched(&self, feed_id: Uuid, at: DateTime<Utc>) -> Result<()>;

    /// Record that a feed was fetched and ingested.
    async fn mark_feed_succeeded(&self, feed_id: Uuid, at: DateTime<Utc>) -> Result<()>;

    /// Store a post, reporting an existing URL as a duplicate.
    async fn create_post(&self, post: &NewPost) -> std::result::Result<Post, CreatePostError>;
}

#[async_trait]
impl ScrapeStore for Database {
    async fn list_due_feeds(&self, limit: u32) -> Result<Vec<Feed>> {
        FeedRepository::new(self.pool()).list_due(limit).await
    }

    async fn mark_feed_fetched(&self, feed_id: Uuid, at: DateTime<Utc>) -> Result<()> {
        FeedRepository::new(self.pool())
            .mark_fetched(feed_id, at)
            .await?;
        Ok(())
    }

    async fn mark_feed_succeeded(&self, feed_id: Uuid, at: DateTime<Utc>) -> Result<()> {
        FeedRepository::new(self.pool())
            .mark_succeeded(feed_id, at)
            .await?;
        Ok(())
    }

    async fn create_post(&self, post: &NewPost) -> std::result::Result<Post, CreatePostError> {
        PostRepository::new(self.pool()).create(post).await
    }
}
