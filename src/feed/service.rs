//! Feed service for gator.
//!
//! High-level feed operations used by the command handlers: adding feeds,
//! following and unfollowing them, and browsing collected posts.

use tracing::info;

use crate::db::{Database, User};
use crate::feed::repository::{FeedFollowRepository, FeedRepository, PostRepository};
use crate::feed::types::{Feed, FeedFollow, FeedWithOwner, FollowedFeed, NewFeed, PostWithFeed};
use crate::scraper::validate_feed_url;
use crate::{GatorError, Result};

/// Service for feed operations.
pub struct FeedService<'a> {
    db: &'a Database,
}

impl<'a> FeedService<'a> {
    /// Create a new FeedService with the given database reference.
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Register a new feed and make its creator follow it.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the URL is not an absolute http(s) URL
    /// - a feed with this URL already exists
    pub async fn add_feed(&self, user: &User, name: &str, url: &str) -> Result<(Feed, FeedFollow)> {
        let url = validate_feed_url(url)?;

        let feed = FeedRepository::new(self.db.pool())
            .create(&NewFeed::new(name, url.as_str(), user.id))
            .await?;
        let follow = FeedFollowRepository::new(self.db.pool())
            .create(user.id, feed.id)
            .await?;

        info!(feed = %feed.url, user = %user.name, "Feed added");
        Ok((feed, follow))
    }

    /// List every registered feed with its owner.
    pub async fn list_feeds(&self) -> Result<Vec<FeedWithOwner>> {
        FeedRepository::new(self.db.pool()).list_with_owner().await
    }

    /// Follow an existing feed by URL.
    pub async fn follow(&self, user: &User, url: &str) -> Result<(Feed, FeedFollow)> {
        let feed = self.require_feed(url).await?;
        let follow = FeedFollowRepository::new(self.db.pool())
            .create(user.id, feed.id)
            .await?;
        Ok((feed, follow))
    }

    /// Stop following a feed by URL.
    pub async fn unfollow(&self, user: &User, url: &str) -> Result<Feed> {
        let feed = self.require_feed(url).await?;
        let removed = FeedFollowRepository::new(self.db.pool())
            .delete(user.id, feed.id)
            .await?;
        if !removed {
            return Err(GatorError::NotFound(format!(
                "follow of {} by {}",
                feed.url, user.name
            )));
        }
        Ok(feed)
    }

    /// List the feeds a user follows.
    pub async fn following(&self, user: &User) -> Result<Vec<FollowedFeed>> {
        FeedFollowRepository::new(self.db.pool())
            .list_for_user(user.id)
            .await
    }

    /// Newest posts from the feeds a user follows.
    pub async fn browse(&self, user: &User, limit: u32) -> Result<Vec<PostWithFeed>> {
        if limit == 0 {
            return Err(GatorError::Validation("limit must be at least 1".to_string()));
        }
        PostRepository::new(self.db.pool())
            .list_for_user(user.id, limit)
            .await
    }

    async fn require_feed(&self, url: &str) -> Result<Feed> {
        FeedRepository::new(self.db.pool())
            .get_by_url(url.trim())
            .await?
            .ok_or_else(|| GatorError::NotFound(format!("feed {}", url.trim())))
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;
    use crate::db::{NewUser, UserRepository};
    use crate::feed::types::NewPost;

    async fn setup_db() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    async fn create_test_user(db: &Database, name: &str) -> User {
        UserRepository::new(db.pool())
            .create(&NewUser::new(name))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_add_feed_follows_automatically() {
        let db = setup_db().await;
        let alice = create_test_user(&db, "alice").await;
        let service = FeedService::new(&db);

        let (feed, follow) = service
            .add_feed(&alice, "Blog", "https://example.com/feed.xml")
            .await
            .unwrap();
        assert_eq!(follow.feed_id, feed.id);
        assert_eq!(follow.user_id, alice.id);

        let following = service.following(&alice).await.unwrap();
        assert_eq!(following.len(), 1);
        assert_eq!(following[0].feed_name, "Blog");
    }

    #[tokio::test]
    async fn test_add_feed_rejects_bad_url() {
        let db = setup_db().await;
        let alice = create_test_user(&db, "alice").await;
        let service = FeedService::new(&db);

        for url in ["ftp://example.com/feed", "not a url", "file:///etc/passwd"] {
            let result = service.add_feed(&alice, "Bad", url).await;
            assert!(
                matches!(result, Err(GatorError::Validation(_))),
                "{url} should be rejected"
            );
        }
        assert!(service.list_feeds().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_duplicate_feed() {
        let db = setup_db().await;
        let alice = create_test_user(&db, "alice").await;
        let service = FeedService::new(&db);

        service
            .add_feed(&alice, "Blog", "https://example.com/feed.xml")
            .await
            .unwrap();
        let result = service
            .add_feed(&alice, "Again", "https://example.com/feed.xml")
            .await;
        assert!(matches!(result, Err(GatorError::Validation(_))));
    }

    #[tokio::test]
    async fn test_follow_and_unfollow() {
        let db = setup_db().await;
        let alice = create_test_user(&db, "alice").await;
        let bob = create_test_user(&db, "bob").await;
        let service = FeedService::new(&db);

        service
            .add_feed(&alice, "Blog", "https://example.com/feed.xml")
            .await
            .unwrap();

        let (feed, _) = service
            .follow(&bob, "https://example.com/feed.xml")
            .await
            .unwrap();
        assert_eq!(feed.name, "Blog");
        assert_eq!(service.following(&bob).await.unwrap().len(), 1);

        service
            .unfollow(&bob, "https://example.com/feed.xml")
            .await
            .unwrap();
        assert!(service.following(&bob).await.unwrap().is_empty());

        let again = service.unfollow(&bob, "https://example.com/feed.xml").await;
        assert!(matches!(again, Err(GatorError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_follow_unknown_feed() {
        let db = setup_db().await;
        let alice = create_test_user(&db, "alice").await;
        let service = FeedService::new(&db);

        let result = service.follow(&alice, "https://missing.example/feed").await;
        match result {
            Err(GatorError::NotFound(what)) => assert!(what.contains("missing.example")),
            other => panic!("expected not found, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_browse() {
        let db = setup_db().await;
        let alice = create_test_user(&db, "alice").await;
        let service = FeedService::new(&db);
        let (feed, _) = service
            .add_feed(&alice, "Blog", "https://example.com/feed.xml")
            .await
            .unwrap();

        let posts = PostRepository::new(db.pool());
        for i in 0..3 {
            posts
                .create(&NewPost::new(feed.id, format!("Post {i}"), format!("https://example.com/{i}")))
                .await
                .unwrap();
        }

        assert_eq!(service.browse(&alice, 2).await.unwrap().len(), 2);
        assert_eq!(service.browse(&alice, 10).await.unwrap().len(), 3);
        assert!(matches!(
            service.browse(&alice, 0).await,
            Err(GatorError::Validation(_))
        ));
    }
}
