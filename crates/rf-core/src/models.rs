//! # Domain Models
//!
//! Categories contain forums, forums contain topics, topics contain posts.
//! Ids are assigned by the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state::ContentState;

/// Top-level grouping of forums.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    /// Sort key among categories (ascending)
    pub order: u32,
    pub created_at: DateTime<Utc>,
}

/// A discussion board within a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forum {
    pub id: i64,
    pub category_id: i64,
    pub name: String,
    /// Globally unique URL slug (e.g. "general" for /forum/general/)
    pub slug: String,
    pub description: String,
    pub order: u32,
    pub created_at: DateTime<Utc>,
}

impl Forum {
    pub fn url(&self) -> String {
        format!("/forum/{}/", self.slug)
    }
}

/// A discussion thread within a forum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub id: i64,
    pub forum_id: i64,
    pub name: String,
    pub author: String,
    /// Pins the topic above non-sticky topics
    pub sticky: bool,
    /// Blocks new posts regardless of state
    pub locked: bool,
    pub created_at: DateTime<Utc>,
    pub ip_address: String,
    pub state: ContentState,
    pub slug: String,
}

impl Topic {
    pub fn url(&self) -> String {
        format!("/forum/topic/{}/", self.id)
    }
}

/// A single message within a topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub topic_id: i64,
    pub title: String,
    pub text: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
    /// Refreshed on every body edit or moderation change
    pub modified_at: DateTime<Utc>,
    pub ip_address: String,
    pub state: ContentState,
}

impl Post {
    pub fn url(&self) -> String {
        format!("/forum/topic/{}/#post_{}", self.topic_id, self.id)
    }
}

/// A category together with its forums, as shown on the forum index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryWithForums {
    pub category: Category,
    pub forums: Vec<Forum>,
}

/// Anything carrying a moderation state.
pub trait Stateful {
    fn state(&self) -> &ContentState;
}

impl Stateful for Topic {
    fn state(&self) -> &ContentState {
        &self.state
    }
}

impl Stateful for Post {
    fn state(&self) -> &ContentState {
        &self.state
    }
}

// Insert payloads. The store assigns `id`.

#[derive(Debug, Clone, PartialEq)]
pub struct NewCategory {
    pub name: String,
    pub order: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewForum {
    pub category_id: i64,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub order: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTopic {
    pub forum_id: i64,
    pub name: String,
    pub slug: String,
    pub author: String,
    pub sticky: bool,
    pub locked: bool,
    pub ip_address: String,
    pub state: ContentState,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPost {
    pub topic_id: i64,
    pub title: String,
    pub text: String,
    pub author: String,
    pub ip_address: String,
    pub state: ContentState,
    pub created_at: DateTime<Utc>,
}

/// Moderation edit of a topic; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TopicPatch {
    pub sticky: Option<bool>,
    pub locked: Option<bool>,
    pub state: Option<ContentState>,
}

/// Edit of a post body or state. `modified_at` is always written.
#[derive(Debug, Clone, PartialEq)]
pub struct PostPatch {
    pub text: Option<String>,
    pub state: Option<ContentState>,
    pub modified_at: DateTime<Utc>,
}
