//! # Syndication
//!
//! One ordered entry sequence feeds both output formats; the templates in
//! rf-ui only decide the XML dialect.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Post;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedFormat {
    Rss,
    Atom,
}

impl FeedFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            FeedFormat::Rss => "application/rss+xml; charset=utf-8",
            FeedFormat::Atom => "application/atom+xml; charset=utf-8",
        }
    }
}

/// Channel metadata, taken from configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedChannel {
    pub title: String,
    /// Site-relative link of the channel (e.g. "/forum/")
    pub link: String,
    pub description: String,
}

impl Default for FeedChannel {
    fn default() -> Self {
        Self {
            title: "Forum".into(),
            link: "/forum/".into(),
            description: "Forum".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntry {
    pub title: String,
    /// Absolute URL of the post
    pub link: String,
    pub description: String,
    pub author: String,
    pub published: DateTime<Utc>,
}

impl FeedEntry {
    /// RSS `pubDate`.
    pub fn rfc2822(&self) -> String {
        self.published.to_rfc2822()
    }

    /// Atom `updated`.
    pub fn rfc3339(&self) -> String {
        self.published.to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Feed {
    pub channel: FeedChannel,
    /// Absolute channel link, used as the Atom feed id
    pub link: String,
    pub entries: Vec<FeedEntry>,
}

impl Feed {
    /// Keeps the order of `posts`.
    pub fn from_posts(channel: FeedChannel, site_url: &str, posts: &[Post]) -> Self {
        let base = site_url.trim_end_matches('/');
        let entries = posts
            .iter()
            .map(|post| FeedEntry {
                title: post.title.clone(),
                link: format!("{}{}", base, post.url()),
                description: post.text.clone(),
                author: post.author.clone(),
                published: post.created_at,
            })
            .collect();
        Self {
            link: format!("{}{}", base, channel.link),
            channel,
            entries,
        }
    }

    /// Newest entry time, or the epoch for an empty feed.
    pub fn updated(&self) -> String {
        self.entries
            .iter()
            .map(|e| e.published)
            .max()
            .unwrap_or_default()
            .to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}
