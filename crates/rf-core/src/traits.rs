//! # Core Traits (Ports)
//!
//! Any storage plugin must implement these traits to be used by the binary.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{
    Category, CategoryWithForums, Forum, NewCategory, NewForum, NewPost, NewTopic, Post,
    PostPatch, Topic, TopicPatch,
};
use crate::ordering::OrderSpec;
use crate::pagination::{Page, PageRequest};
use crate::visibility::StateFilter;

/// Filter, order and window for a topic listing.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicQuery {
    pub state: StateFilter,
    pub forum_id: Option<i64>,
    pub author: Option<String>,
    pub order: OrderSpec,
    pub page: PageRequest,
}

/// Filter, order and window for a post listing or feed.
#[derive(Debug, Clone, PartialEq)]
pub struct PostQuery {
    pub state: StateFilter,
    pub topic_id: Option<i64>,
    pub author: Option<String>,
    pub order: OrderSpec,
    pub page: PageRequest,
}

/// Data persistence contract for categories, forums, topics, and posts.
///
/// Slug collisions must surface as `AppError::Conflict` with nothing written;
/// updates of missing rows as `AppError::NotFound`.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ForumRepo: Send + Sync {
    // Category / Forum Operations
    async fn create_category(&self, category: NewCategory) -> Result<Category>;
    /// Categories and their forums, both by `order` then creation time.
    async fn list_categories(&self) -> Result<Vec<CategoryWithForums>>;
    async fn create_forum(&self, forum: NewForum) -> Result<Forum>;
    async fn get_forum(&self, slug: &str) -> Result<Option<Forum>>;

    // Topic Operations
    async fn create_topic(&self, topic: NewTopic) -> Result<Topic>;
    async fn get_topic(&self, id: i64) -> Result<Option<Topic>>;
    async fn list_topics(&self, query: &TopicQuery) -> Result<Page<Topic>>;
    async fn update_topic(&self, id: i64, patch: TopicPatch) -> Result<Topic>;

    // Post Operations
    async fn create_post(&self, post: NewPost) -> Result<Post>;
    async fn get_post(&self, id: i64) -> Result<Option<Post>>;
    async fn list_posts(&self, query: &PostQuery) -> Result<Page<Post>>;
    async fn update_post(&self, id: i64, patch: PostPatch) -> Result<Post>;
}
