//! Feed, follow and post types for gator.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::GatorError;

/// An RSS feed registered by a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feed {
    /// Feed ID.
    pub id: Uuid,
    /// Display name given when the feed was added.
    pub name: String,
    /// Feed URL (unique across all feeds).
    pub url: String,
    /// User who added the feed.
    pub user_id: Uuid,
    /// Last time the scraper picked this feed, successful or not.
    pub last_fetched_at: Option<DateTime<Utc>>,
    /// Last time a fetch and ingest completed.
    pub last_succeeded_at: Option<DateTime<Utc>>,
    /// When the feed was created.
    pub created_at: DateTime<Utc>,
    /// When the feed was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Feed {
    /// Whether the most recent attempt did not complete.
    pub fn last_attempt_failed(&self) -> bool {
        match (self.last_fetched_at, self.last_succeeded_at) {
            (Some(fetched), Some(succeeded)) => succeeded < fetched,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }
}

/// New feed for creation.
#[derive(Debug, Clone)]
pub struct NewFeed {
    /// Display name.
    pub name: String,
    /// Feed URL.
    pub url: String,
    /// Owning user.
    pub user_id: Uuid,
}

impl NewFeed {
    /// Create a new feed.
    pub fn new(name: impl Into<String>, url: impl Into<String>, user_id: Uuid) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            user_id,
        }
    }
}

/// A feed together with the name of the user who added it.
#[derive(Debug, Clone)]
pub struct FeedWithOwner {
    pub feed: Feed,
    pub owner_name: String,
}

/// A follow relation between a user and a feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedFollow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub feed_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A follow with the names needed for display.
#[derive(Debug, Clone)]
pub struct FollowedFeed {
    pub follow: FeedFollow,
    pub feed_name: String,
    pub feed_url: String,
    pub user_name: String,
}

/// A stored post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    /// Post ID.
    pub id: Uuid,
    /// Item title.
    pub title: String,
    /// Link to the original article (unique across all posts).
    pub url: String,
    /// Item description, if the feed provided a non-empty one.
    pub description: Option<String>,
    /// Normalized publish time.
    pub published_at: Option<DateTime<Utc>>,
    /// Feed the post was collected from.
    pub feed_id: Uuid,
    /// When the post was stored.
    pub created_at: DateTime<Utc>,
    /// When the post was last updated.
    pub updated_at: DateTime<Utc>,
}

/// A post together with the name of its feed.
#[derive(Debug, Clone)]
pub struct PostWithFeed {
    pub post: Post,
    pub feed_name: String,
}

/// New post for creation.
#[derive(Debug, Clone)]
pub struct NewPost {
    /// Feed ID.
    pub feed_id: Uuid,
    /// Item title.
    pub title: String,
    /// Link to the original article.
    pub url: String,
    /// Item description.
    pub description: Option<String>,
    /// Publish time.
    pub published_at: Option<DateTime<Utc>>,
}

impl NewPost {
    /// Create a new post.
    pub fn new(feed_id: Uuid, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            feed_id,
            title: title.into(),
            url: url.into(),
            description: None,
            published_at: None,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the publish time.
    pub fn with_published_at(mut self, published_at: DateTime<Utc>) -> Self {
        self.published_at = Some(published_at);
        self
    }
}

/// Failure to store a post.
///
/// A duplicate URL is an expected outcome of re-scraping a feed and is
/// reported separately from genuine storage failures.
#[derive(Debug, Error)]
pub enum CreatePostError {
    /// A post with this URL already exists.
    #[error("post with url {url} already exists")]
    DuplicateUrl { url: String },

    /// Any other storage failure.
    #[error(transparent)]
    Storage(#[from] GatorError),
}
