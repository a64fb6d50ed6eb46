//! Feed, follow and post repositories for gator.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::types::{
    CreatePostError, Feed, FeedFollow, FeedWithOwner, FollowedFeed, NewFeed, NewPost, Post,
    PostWithFeed,
};
use crate::datetime::{parse_db_timestamp, to_db_timestamp};
use crate::db::{is_unique_violation, parse_id, DbPool};
use crate::{GatorError, Result};

const FEED_COLUMNS: &str = "f.id, f.name, f.url, f.user_id, f.last_fetched_at, \
                            f.last_succeeded_at, f.created_at, f.updated_at";

const FOLLOW_COLUMNS: &str = "ff.id, ff.user_id, ff.feed_id, ff.created_at, ff.updated_at";

const POST_COLUMNS: &str = "p.id, p.title, p.url, p.description, p.published_at, p.feed_id, \
                            p.created_at, p.updated_at";

fn parse_optional_timestamp(value: Option<String>) -> Result<Option<DateTime<Utc>>> {
    value.as_deref().map(parse_db_timestamp).transpose()
}

/// Row type for feeds from database.
#[derive(Debug, sqlx::FromRow)]
struct FeedRow {
    id: String,
    name: String,
    url: String,
    user_id: String,
    last_fetched_at: Option<String>,
    last_succeeded_at: Option<String>,
    created_at: String,
    updated_at: String,
}

impl TryFrom<FeedRow> for Feed {
    type Error = GatorError;

    fn try_from(row: FeedRow) -> Result<Self> {
        Ok(Feed {
            id: parse_id(&row.id)?,
            name: row.name,
            url: row.url,
            user_id: parse_id(&row.user_id)?,
            last_fetched_at: parse_optional_timestamp(row.last_fetched_at)?,
            last_succeeded_at: parse_optional_timestamp(row.last_succeeded_at)?,
            created_at: parse_db_timestamp(&row.created_at)?,
            updated_at: parse_db_timestamp(&row.updated_at)?,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct FeedWithOwnerRow {
    #[sqlx(flatten)]
    feed: FeedRow,
    owner_name: String,
}

impl TryFrom<FeedWithOwnerRow> for FeedWithOwner {
    type Error = GatorError;

    fn try_from(row: FeedWithOwnerRow) -> Result<Self> {
        Ok(FeedWithOwner {
            feed: row.feed.try_into()?,
            owner_name: row.owner_name,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct FeedFollowRow {
    id: String,
    user_id: String,
    feed_id: String,
    created_at: String,
    updated_at: String,
}

impl TryFrom<FeedFollowRow> for FeedFollow {
    type Error = GatorError;

    fn try_from(row: FeedFollowRow) -> Result<Self> {
        Ok(FeedFollow {
            id: parse_id(&row.id)?,
            user_id: parse_id(&row.user_id)?,
            feed_id: parse_id(&row.feed_id)?,
            created_at: parse_db_timestamp(&row.created_at)?,
            updated_at: parse_db_timestamp(&row.updated_at)?,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct FollowedFeedRow {
    #[sqlx(flatten)]
    follow: FeedFollowRow,
    feed_name: String,
    feed_url: String,
    user_name: String,
}

impl TryFrom<FollowedFeedRow> for FollowedFeed {
    type Error = GatorError;

    fn try_from(row: FollowedFeedRow) -> Result<Self> {
        Ok(FollowedFeed {
            follow: row.follow.try_into()?,
            feed_name: row.feed_name,
            feed_url: row.feed_url,
            user_name: row.user_name,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PostRow {
    id: String,
    title: String,
    url: String,
    description: Option<String>,
    published_at: Option<String>,
    feed_id: String,
    created_at: String,
    updated_at: String,
}

impl TryFrom<PostRow> for Post {
    type Error = GatorError;

    fn try_from(row: PostRow) -> Result<Self> {
        Ok(Post {
            id: parse_id(&row.id)?,
            title: row.title,
            url: row.url,
            description: row.description,
            published_at: parse_optional_timestamp(row.published_at)?,
            feed_id: parse_id(&row.feed_id)?,
            created_at: parse_db_timestamp(&row.created_at)?,
            updated_at: parse_db_timestamp(&row.updated_at)?,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PostWithFeedRow {
    #[sqlx(flatten)]
    post: PostRow,
    feed_name: String,
}

impl TryFrom<PostWithFeedRow> for PostWithFeed {
    type Error = GatorError;

    fn try_from(row: PostWithFeedRow) -> Result<Self> {
        Ok(PostWithFeed {
            post: row.post.try_into()?,
            feed_name: row.feed_name,
        })
    }
}

/// Repository for feed operations.
pub struct FeedRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> FeedRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create a new feed.
    ///
    /// Fails with a validation error when a feed with the same URL exists.
    pub async fn create(&self, feed: &NewFeed) -> Result<Feed> {
        let name = feed.name.trim();
        if name.is_empty() {
            return Err(GatorError::Validation("feed name cannot be empty".to_string()));
        }

        let id = Uuid::new_v4();
        let stamp = to_db_timestamp(&Utc::now());

        sqlx::query(
            "INSERT INTO feeds (id, name, url, user_id, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(id.to_string())
        .bind(name)
        .bind(&feed.url)
        .bind(feed.user_id.to_string())
        .bind(&stamp)
        .bind(&stamp)
        .execute(self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                GatorError::Validation(format!("feed with url {} already exists", feed.url))
            } else {
                e.into()
            }
        })?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| GatorError::NotFound(format!("feed {id}")))
    }

    /// Get a feed by ID.
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Feed>> {
        let sql = format!("SELECT {FEED_COLUMNS} FROM feeds f WHERE f.id = $1");
        let row = sqlx::query_as::<_, FeedRow>(&sql)
            .bind(id.to_string())
            .fetch_optional(self.pool)
            .await?;

        row.map(Feed::try_from).transpose()
    }

    /// Get a feed by URL.
    pub async fn get_by_url(&self, url: &str) -> Result<Option<Feed>> {
        let sql = format!("SELECT {FEED_COLUMNS} FROM feeds f WHERE f.url = $1");
        let row = sqlx::query_as::<_, FeedRow>(&sql)
            .bind(url)
            .fetch_optional(self.pool)
            .await?;

        row.map(Feed::try_from).transpose()
    }

    /// List every feed with the name of the user who added it.
    pub async fn list_with_owner(&self) -> Result<Vec<FeedWithOwner>> {
        let sql = format!(
            "SELECT {FEED_COLUMNS}, u.name AS owner_name
             FROM feeds f
             JOIN users u ON u.id = f.user_id
             ORDER BY f.created_at, f.name"
        );
        let rows = sqlx::query_as::<_, FeedWithOwnerRow>(&sql)
            .fetch_all(self.pool)
            .await?;

        rows.into_iter().map(FeedWithOwner::try_from).collect()
    }

    /// List the feeds to scrape next.
    ///
    /// Never-fetched feeds come first, then the least recently fetched.
    /// Ties are broken by creation order.
    pub async fn list_due(&self, limit: u32) -> Result<Vec<Feed>> {
        let sql = format!(
            "SELECT {FEED_COLUMNS}
             FROM feeds f
             ORDER BY f.last_fetched_at ASC NULLS FIRST, f.created_at ASC
             LIMIT $1"
        );
        let rows = sqlx::query_as::<_, FeedRow>(&sql)
            .bind(i64::from(limit))
            .fetch_all(self.pool)
            .await?;

        rows.into_iter().map(Feed::try_from).collect()
    }

    /// Record that the scraper picked this feed.
    pub async fn mark_fetched(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool> {
        let stamp = to_db_timestamp(&at);
        let result =
            sqlx::query("UPDATE feeds SET last_fetched_at = $1, updated_at = $2 WHERE id = $3")
                .bind(&stamp)
                .bind(&stamp)
                .bind(id.to_string())
                .execute(self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Record that a fetch and ingest of this feed completed.
    pub async fn mark_succeeded(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool> {
        let stamp = to_db_timestamp(&at);
        let result =
            sqlx::query("UPDATE feeds SET last_succeeded_at = $1, updated_at = $2 WHERE id = $3")
                .bind(&stamp)
                .bind(&stamp)
                .bind(id.to_string())
                .execute(self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Count all feeds.
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM feeds")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}

/// Repository for follow operations.
pub struct FeedFollowRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> FeedFollowRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Make a user follow a feed.
    ///
    /// Fails with a validation error when the user already follows it.
    pub async fn create(&self, user_id: Uuid, feed_id: Uuid) -> Result<FeedFollow> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let stamp = to_db_timestamp(&now);

        sqlx::query(
            "INSERT INTO feed_follows (id, user_id, feed_id, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(id.to_string())
        .bind(user_id.to_string())
        .bind(feed_id.to_string())
        .bind(&stamp)
        .bind(&stamp)
        .execute(self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                GatorError::Validation("already following this feed".to_string())
            } else {
                e.into()
            }
        })?;

        Ok(FeedFollow {
            id,
            user_id,
            feed_id,
            created_at: parse_db_timestamp(&stamp)?,
            updated_at: parse_db_timestamp(&stamp)?,
        })
    }

    /// List the feeds a user follows, oldest follow first.
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<FollowedFeed>> {
        let sql = format!(
            "SELECT {FOLLOW_COLUMNS}, f.name AS feed_name, f.url AS feed_url, u.name AS user_name
             FROM feed_follows ff
             JOIN feeds f ON f.id = ff.feed_id
             JOIN users u ON u.id = ff.user_id
             WHERE ff.user_id = $1
             ORDER BY ff.created_at, f.name"
        );
        let rows = sqlx::query_as::<_, FollowedFeedRow>(&sql)
            .bind(user_id.to_string())
            .fetch_all(self.pool)
            .await?;

        rows.into_iter().map(FollowedFeed::try_from).collect()
    }

    /// Remove a follow. Returns false when the user did not follow the feed.
    pub async fn delete(&self, user_id: Uuid, feed_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM feed_follows WHERE user_id = $1 AND feed_id = $2")
            .bind(user_id.to_string())
            .bind(feed_id.to_string())
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Repository for post operations.
pub struct PostRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> PostRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Store a new post.
    ///
    /// A post whose URL is already stored yields
    /// [`CreatePostError::DuplicateUrl`] and leaves the existing row as is.
    pub async fn create(&self, post: &NewPost) -> std::result::Result<Post, CreatePostError> {
        let id = Uuid::new_v4();
        let stamp = to_db_timestamp(&Utc::now());
        let published_at = post.published_at.as_ref().map(to_db_timestamp);

        let result = sqlx::query(
            "INSERT INTO posts (id, title, url, description, published_at, feed_id, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(id.to_string())
        .bind(&post.title)
        .bind(&post.url)
        .bind(&post.description)
        .bind(&published_at)
        .bind(post.feed_id.to_string())
        .bind(&stamp)
        .bind(&stamp)
        .execute(self.pool)
        .await;

        match result {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(CreatePostError::DuplicateUrl {
                    url: post.url.clone(),
                })
            }
            Err(e) => return Err(GatorError::from(e).into()),
        }

        Ok(Post {
            id,
            title: post.title.clone(),
            url: post.url.clone(),
            description: post.description.clone(),
            published_at: parse_optional_timestamp(published_at)?,
            feed_id: post.feed_id,
            created_at: parse_db_timestamp(&stamp)?,
            updated_at: parse_db_timestamp(&stamp)?,
        })
    }

    /// Get a post by URL.
    pub async fn get_by_url(&self, url: &str) -> Result<Option<Post>> {
        let sql = format!("SELECT {POST_COLUMNS} FROM posts p WHERE p.url = $1");
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(url)
            .fetch_optional(self.pool)
            .await?;

        row.map(Post::try_from).transpose()
    }

    /// List the newest posts from the feeds a user follows.
    ///
    /// Posts without a publish time sort after dated ones.
    pub async fn list_for_user(&self, user_id: Uuid, limit: u32) -> Result<Vec<PostWithFeed>> {
        let sql = format!(
            "SELECT {POST_COLUMNS}, f.name AS feed_name
             FROM posts p
             JOIN feeds f ON f.id = p.feed_id
             JOIN feed_follows ff ON ff.feed_id = p.feed_id
             WHERE ff.user_id = $1
             ORDER BY p.published_at DESC NULLS LAST, p.created_at DESC
             LIMIT $2"
        );
        let rows = sqlx::query_as::<_, PostWithFeedRow>(&sql)
            .bind(user_id.to_string())
            .bind(i64::from(limit))
            .fetch_all(self.pool)
            .await?;

        rows.into_iter().map(PostWithFeed::try_from).collect()
    }

    /// Count all posts.
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}
