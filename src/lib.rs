//! gator - a command-line RSS feed aggregator.
//!
//! Users register feeds, follow them, and browse the newest posts. The
//! `agg` command scrapes feeds in the background on a fixed interval.

pub mod cli;
pub mod config;
pub mod datetime;
pub mod db;
pub mod error;
pub mod feed;
pub mod logging;
pub mod scraper;

pub use config::Config;
pub use db::{Database, NewUser, User, UserRepository};
pub use error::{GatorError, Result};
pub use feed::{Feed, FeedService, Post};
pub use scraper::{FeedFetcher, Scraper};
