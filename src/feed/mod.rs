//! Feeds, follows and posts.
//!
//! This module owns the persistent side of the aggregator: the feeds users
//! register, who follows which feed, and the posts collected from them.

pub mod repository;
pub mod service;
pub mod types;

pub use repository::{FeedFollowRepository, FeedRepository, PostRepository};
pub use service::FeedService;
pub use types::{
    CreatePostError, Feed, FeedFollow, FeedWithOwner, FollowedFeed, NewFeed, NewPost, Post,
    PostWithFeed,
};
