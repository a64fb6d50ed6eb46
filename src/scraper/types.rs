//! Scraper types for gator.

/// An item as it appeared in a fetched feed.
///
/// Fields the feed left out are empty strings. `pub_date` is kept raw and
/// normalized at ingest time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFeedItem {
    /// Item title (HTML entities decoded).
    pub title: String,
    /// Link to the article.
    pub link: String,
    /// Item description (HTML entities decoded).
    pub description: String,
    /// Raw `pubDate` text.
    pub pub_date: String,
}

/// A fetched RSS document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFeedDocument {
    /// Channel title (HTML entities decoded).
    pub title: String,
    /// Channel link.
    pub link: String,
    /// Channel description.
    pub description: String,
    /// Items in document order.
    pub items: Vec<ParsedFeedItem>,
}
