//! RSS feed fetcher.
//!
//! This module fetches RSS 2.0 documents over HTTP with timeouts, a redirect
//! cap and a response size limit, and decodes them into [`RawFeedDocument`].

use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use super::types::{ParsedFeedItem, RawFeedDocument};
use crate::config::ScraperConfig;
use crate::{GatorError, Result};

/// User agent string for feed fetching.
pub const USER_AGENT: &str = concat!("gator/", env!("CARGO_PKG_VERSION"));

/// Why a feed could not be fetched or decoded.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The HTTP client could not be configured.
    #[error("failed to create HTTP client: {0}")]
    Client(String),

    /// The request did not complete.
    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    /// The server answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// The body exceeded the configured size limit.
    #[error("feed too large: {size} bytes (max {max} bytes)")]
    TooLarge { size: u64, max: u64 },

    /// The body is not a usable RSS document.
    #[error("malformed feed: {0}")]
    Xml(String),
}

/// Source of feed documents.
#[async_trait]
pub trait FetchFeed: Send + Sync {
    /// Fetch and decode the feed at `url`.
    async fn fetch(&self, url: &str) -> std::result::Result<RawFeedDocument, FetchError>;
}

/// HTTP feed fetcher.
#[derive(Debug, Clone)]
pub struct FeedFetcher {
    client: Client,
    max_feed_size: u64,
}

impl FeedFetcher {
    /// Create a fetcher with the limits from the scraper configuration.
    pub fn new(config: &ScraperConfig) -> std::result::Result<Self, FetchError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .read_timeout(Duration::from_secs(config.read_timeout_secs))
            .timeout(Duration::from_secs(config.total_timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self {
            client,
            max_feed_size: config.max_feed_size_bytes,
        })
    }
}

#[async_trait]
impl FetchFeed for FeedFetcher {
    async fn fetch(&self, url: &str) -> std::result::Result<RawFeedDocument, FetchError> {
        debug!("Fetching feed {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        if let Some(content_length) = response.content_length() {
            if content_length > self.max_feed_size {
                return Err(FetchError::TooLarge {
                    size: content_length,
                    max: self.max_feed_size,
                });
            }
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::Transport {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        // Compressed or chunked bodies carry no usable Content-Length.
        if bytes.len() as u64 > self.max_feed_size {
            return Err(FetchError::TooLarge {
                size: bytes.len() as u64,
                max: self.max_feed_size,
            });
        }

        parse_rss(&bytes)
    }
}

/// Check that a user-supplied feed URL is an absolute http(s) URL.
///
/// Returns the trimmed URL unchanged so lookups by the same string match.
pub fn validate_feed_url(url: &str) -> Result<String> {
    let trimmed = url.trim();
    let parsed = url::Url::parse(trimmed)
        .map_err(|e| GatorError::Validation(format!("invalid feed url {trimmed:?}: {e}")))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(GatorError::Validation(format!(
                "unsupported URL scheme: {scheme}"
            )));
        }
    }

    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(GatorError::Validation(format!("feed url {trimmed:?} has no host")));
    }

    Ok(trimmed.to_string())
}

/// Decode an RSS 2.0 document.
///
/// Only `channel` fields and direct children of `channel/item` are read;
/// anything nested deeper (images, media extensions) is ignored. HTML
/// entities left in titles and descriptions after XML unescaping are
/// decoded as well.
pub fn parse_rss(bytes: &[u8]) -> std::result::Result<RawFeedDocument, FetchError> {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);

    let mut document = RawFeedDocument::default();
    let mut path: Vec<String> = Vec::new();
    let mut saw_channel = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                path.push(name);
                match path.as_slice() {
                    [_, channel] if channel == "channel" => saw_channel = true,
                    [_, channel, item] if channel == "channel" && item == "item" => {
                        document.items.push(ParsedFeedItem::default());
                    }
                    _ => {}
                }
            }
            Ok(Event::End(_)) => {
                path.pop();
            }
            Ok(Event::Text(e)) => {
                let text = match e.unescape() {
                    Ok(text) => text.into_owned(),
                    Err(_) => String::from_utf8_lossy(&e).into_owned(),
                };
                append_text(&mut document, &path, &text);
            }
            Ok(Event::CData(e)) => {
                let text = String::from_utf8_lossy(&e).into_owned();
                append_text(&mut document, &path, &text);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(FetchError::Xml(format!(
                    "error at position {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
            _ => {}
        }
        buf.clear();
    }

    if !path.is_empty() {
        return Err(FetchError::Xml(format!("unclosed element <{}>", path.join("/"))));
    }
    if !saw_channel {
        return Err(FetchError::Xml("no <channel> element".to_string()));
    }

    document.title = decode_text(&document.title);
    document.description = decode_text(&document.description);
    document.link = document.link.trim().to_string();
    for item in &mut document.items {
        item.title = decode_text(&item.title);
        item.description = decode_text(&item.description);
        item.link = item.link.trim().to_string();
        item.pub_date = item.pub_date.trim().to_string();
    }

    Ok(document)
}

fn append_text(document: &mut RawFeedDocument, path: &[String], text: &str) {
    match path {
        [_, channel, field] if channel == "channel" => {
            let target = match field.as_str() {
                "title" => &mut document.title,
                "link" => &mut document.link,
                "description" => &mut document.description,
                _ => return,
            };
            target.push_str(text);
        }
        [_, channel, item, field] if channel == "channel" && item == "item" => {
            let Some(current) = document.items.last_mut() else {
                return;
            };
            let target = match field.as_str() {
                "title" => &mut current.title,
                "link" => &mut current.link,
                "description" => &mut current.description,
                "pubDate" => &mut current.pub_date,
                _ => return,
            };
            target.push_str(text);
        }
        _ => {}
    }
}

fn decode_text(s: &str) -> String {
    html_escape::decode_html_entities(s.trim()).into_owned()
}
