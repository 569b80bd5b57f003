//! # ForumService
//!
//! Orchestrates the repository port and the visibility engine. Handlers call
//! this instead of talking to storage, so every public read gets the same
//! published filter and every reply goes through the same gate.

use std::sync::Arc;

use chrono::Utc;

use crate::error::{AppError, Result};
use crate::feed::{Feed, FeedChannel};
use crate::models::{
    Category, CategoryWithForums, Forum, NewCategory, NewForum, NewPost, NewTopic, Post,
    PostPatch, Topic, TopicPatch,
};
use crate::ordering::{default_ordering, ListingKind, OrderSpec, FEED_LIMIT};
use crate::pagination::{Page, PageRequest};
use crate::slug::slug_for;
use crate::traits::{ForumRepo, PostQuery, TopicQuery};
use crate::visibility::{DenyReason, PostGate, Visibility};

const MAX_NAME_LEN: usize = 255;

/// Query-string controls shared by all listings.
#[derive(Debug, Clone, Default)]
pub struct Listing {
    /// 1-based; `None` means the first page
    pub page: Option<u32>,
    pub sort: Option<String>,
    pub author: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TopicSubmission {
    pub name: String,
    /// Overrides the slug derived from `name`
    pub slug: Option<String>,
    pub author: String,
    pub ip_address: String,
}

#[derive(Debug, Clone)]
pub struct PostSubmission {
    pub title: String,
    pub text: String,
    pub author: String,
    pub ip_address: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReplyOutcome {
    Created(Post),
    Denied(DenyReason),
}

#[derive(Debug, Clone)]
pub struct ForumDraft {
    pub category_id: i64,
    pub name: String,
    pub slug: Option<String>,
    pub description: String,
    pub order: u32,
}

/// Administrative topic edit; state is given as a configured code.
#[derive(Debug, Clone, Default)]
pub struct TopicModeration {
    pub sticky: Option<bool>,
    pub locked: Option<bool>,
    pub state: Option<String>,
}

pub struct ForumService {
    repo: Arc<dyn ForumRepo>,
    visibility: Visibility,
    paginate_by: u32,
}

impl ForumService {
    pub fn new(repo: Arc<dyn ForumRepo>, visibility: Visibility, paginate_by: u32) -> Self {
        Self {
            repo,
            visibility,
            paginate_by: paginate_by.max(1),
        }
    }

    pub fn visibility(&self) -> &Visibility {
        &self.visibility
    }

    pub async fn categories(&self) -> Result<Vec<CategoryWithForums>> {
        self.repo.list_categories().await
    }

    pub async fn forum(&self, slug: &str) -> Result<Forum> {
        self.repo
            .get_forum(slug)
            .await?
            .ok_or_else(|| AppError::not_found("Forum", slug))
    }

    pub async fn topic(&self, id: i64) -> Result<Topic> {
        self.repo
            .get_topic(id)
            .await?
            .ok_or_else(|| AppError::not_found("Topic", id))
    }

    /// Published topics, site-wide or of one forum.
    pub async fn topics(&self, forum: Option<&Forum>, listing: &Listing) -> Result<Page<Topic>> {
        let kind = match forum {
            Some(_) => ListingKind::ForumTopics,
            None => ListingKind::Topics,
        };
        let query = TopicQuery {
            state: self.visibility.public_filter(),
            forum_id: forum.map(|f| f.id),
            author: listing.author.clone(),
            order: self.order_for(kind, listing)?,
            page: self.page_for(listing)?,
        };
        in_range(self.repo.list_topics(&query).await?)
    }

    /// Published posts, site-wide or of one topic, oldest first by default.
    pub async fn posts(&self, topic: Option<&Topic>, listing: &Listing) -> Result<Page<Post>> {
        let query = PostQuery {
            state: self.visibility.public_filter(),
            topic_id: topic.map(|t| t.id),
            author: listing.author.clone(),
            order: self.order_for(ListingKind::Posts, listing)?,
            page: self.page_for(listing)?,
        };
        in_range(self.repo.list_posts(&query).await?)
    }

    /// The most recent published posts, newest first.
    pub async fn feed(&self, channel: &FeedChannel, site_url: &str) -> Result<Feed> {
        let query = PostQuery {
            state: self.visibility.public_filter(),
            topic_id: None,
            author: None,
            order: default_ordering(ListingKind::Feed),
            page: PageRequest::first(FEED_LIMIT),
        };
        let page = self.repo.list_posts(&query).await?;
        Ok(Feed::from_posts(channel.clone(), site_url, &page.items))
    }

    pub fn post_gate(&self, topic: &Topic) -> PostGate {
        self.visibility.can_accept_new_post(topic)
    }

    /// New topics start in the configured default state.
    pub async fn create_topic(&self, forum: &Forum, submission: TopicSubmission) -> Result<Topic> {
        let author = require_author(&submission.author)?;
        let name = required("name", &submission.name, MAX_NAME_LEN)?;
        let slug = slug_for(&name, submission.slug.as_deref())?;

        let topic = self
            .repo
            .create_topic(NewTopic {
                forum_id: forum.id,
                name,
                slug,
                author,
                sticky: false,
                locked: false,
                ip_address: submission.ip_address,
                state: self.visibility.initial_state(),
                created_at: Utc::now(),
            })
            .await?;
        log::info!("topic {} created in forum '{}' by {}", topic.id, forum.slug, topic.author);
        Ok(topic)
    }

    /// Adds a post unless the topic's gate refuses it.
    pub async fn reply(&self, topic_id: i64, submission: PostSubmission) -> Result<ReplyOutcome> {
        let topic = self.topic(topic_id).await?;
        if let PostGate::Denied(reason) = self.post_gate(&topic) {
            log::info!("reply to topic {} refused: {}", topic.id, reason);
            return Ok(ReplyOutcome::Denied(reason));
        }

        let author = require_author(&submission.author)?;
        let title = required("title", &submission.title, MAX_NAME_LEN)?;
        if submission.text.trim().is_empty() {
            return Err(AppError::invalid("text must not be empty"));
        }

        let post = self
            .repo
            .create_post(NewPost {
                topic_id: topic.id,
                title,
                text: submission.text,
                author,
                ip_address: submission.ip_address,
                state: self.visibility.initial_state(),
                created_at: Utc::now(),
            })
            .await?;
        log::info!("post {} added to topic {} by {}", post.id, topic.id, post.author);
        Ok(ReplyOutcome::Created(post))
    }

    // Administrative operations

    pub async fn create_category(&self, name: &str, order: u32) -> Result<Category> {
        let name = required("name", name, MAX_NAME_LEN)?;
        self.repo
            .create_category(NewCategory {
                name,
                order,
                created_at: Utc::now(),
            })
            .await
    }

    pub async fn create_forum(&self, draft: ForumDraft) -> Result<Forum> {
        let name = required("name", &draft.name, MAX_NAME_LEN)?;
        let slug = slug_for(&name, draft.slug.as_deref())?;
        if draft.description.chars().count() > MAX_NAME_LEN {
            return Err(AppError::invalid("description is longer than 255 characters"));
        }
        let forum = self
            .repo
            .create_forum(NewForum {
                category_id: draft.category_id,
                name,
                slug,
                description: draft.description,
                order: draft.order,
                created_at: Utc::now(),
            })
            .await?;
        log::info!("forum '{}' created", forum.slug);
        Ok(forum)
    }

    pub async fn moderate_topic(&self, id: i64, edit: TopicModeration) -> Result<Topic> {
        let state = edit
            .state
            .as_deref()
            .map(|code| self.visibility.states().resolve(code))
            .transpose()?;
        self.repo
            .update_topic(
                id,
                TopicPatch {
                    sticky: edit.sticky,
                    locked: edit.locked,
                    state,
                },
            )
            .await
    }

    pub async fn moderate_post(&self, id: i64, state_code: &str) -> Result<Post> {
        let state = self.visibility.states().resolve(state_code)?;
        self.repo
            .update_post(
                id,
                PostPatch {
                    text: None,
                    state: Some(state),
                    modified_at: Utc::now(),
                },
            )
            .await
    }

    /// Replaces a post body and refreshes its modification time.
    pub async fn edit_post(&self, id: i64, text: &str) -> Result<Post> {
        if text.trim().is_empty() {
            return Err(AppError::invalid("text must not be empty"));
        }
        self.repo
            .update_post(
                id,
                PostPatch {
                    text: Some(text.to_string()),
                    state: None,
                    modified_at: Utc::now(),
                },
            )
            .await
    }

    fn order_for(&self, kind: ListingKind, listing: &Listing) -> Result<OrderSpec> {
        match listing.sort.as_deref().filter(|s| !s.trim().is_empty()) {
            Some(raw) => OrderSpec::parse(kind, raw),
            None => Ok(default_ordering(kind)),
        }
    }

    fn page_for(&self, listing: &Listing) -> Result<PageRequest> {
        PageRequest::new(listing.page.unwrap_or(1), self.paginate_by)
    }
}

fn in_range<T>(page: Page<T>) -> Result<Page<T>> {
    if page.is_out_of_range() {
        return Err(AppError::not_found("Page", page.number));
    }
    Ok(page)
}

fn required(field: &str, value: &str, max: usize) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::invalid(format!("{} must not be empty", field)));
    }
    if value.chars().count() > max {
        return Err(AppError::invalid(format!(
            "{} is longer than {} characters",
            field, max
        )));
    }
    Ok(value.to_string())
}

fn require_author(author: &str) -> Result<String> {
    let author = author.trim();
    if author.is_empty() {
        return Err(AppError::Unauthorized("an author is required".into()));
    }
    Ok(author.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{ContentState, StateConfig};
    use crate::traits::MockForumRepo;
    use crate::visibility::StateFilter;
    use chrono::{TimeZone, Utc};
    use std::sync::Mutex;

    fn topic(id: i64, locked: bool, state: &str) -> Topic {
        Topic {
            id,
            forum_id: 1,
            name: "t".into(),
            author: "alice".into(),
            sticky: false,
            locked,
            created_at: Utc::now(),
            ip_address: "127.0.0.1".into(),
            state: ContentState::from_stored(state),
            slug: format!("t-{}", id),
        }
    }

    fn service(repo: MockForumRepo) -> ForumService {
        ForumService::new(Arc::new(repo), Visibility::new(StateConfig::default()), 10)
    }

    fn submission() -> PostSubmission {
        PostSubmission {
            title: "Re: t".into(),
            text: "hello".into(),
            author: "bob".into(),
            ip_address: "10.0.0.2".into(),
        }
    }

    #[tokio::test]
    async fn locked_topic_denies_without_writing() {
        let mut repo = MockForumRepo::new();
        repo.expect_get_topic()
            .returning(|id| Ok(Some(topic(id, true, "1"))));
        repo.expect_create_post().never();

        let outcome = service(repo).reply(5, submission()).await.unwrap();
        assert_eq!(outcome, ReplyOutcome::Denied(DenyReason::Locked));
    }

    #[tokio::test]
    async fn draft_topic_denies_without_writing() {
        let mut repo = MockForumRepo::new();
        repo.expect_get_topic()
            .returning(|id| Ok(Some(topic(id, false, "0"))));
        repo.expect_create_post().never();

        let outcome = service(repo).reply(5, submission()).await.unwrap();
        assert_eq!(outcome, ReplyOutcome::Denied(DenyReason::NotPublished));
    }

    #[tokio::test]
    async fn reply_uses_default_state() {
        let mut repo = MockForumRepo::new();
        repo.expect_get_topic()
            .returning(|id| Ok(Some(topic(id, false, "1"))));
        repo.expect_create_post()
            .withf(|p| p.topic_id == 5 && p.state.code() == "0" && p.author == "bob")
            .returning(|p| {
                Ok(Post {
                    id: 11,
                    topic_id: p.topic_id,
                    title: p.title,
                    text: p.text,
                    author: p.author,
                    created_at: p.created_at,
                    modified_at: p.created_at,
                    ip_address: p.ip_address,
                    state: p.state,
                })
            });

        match service(repo).reply(5, submission()).await.unwrap() {
            ReplyOutcome::Created(post) => assert_eq!(post.url(), "/forum/topic/5/#post_11"),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn missing_topic_is_not_found() {
        let mut repo = MockForumRepo::new();
        repo.expect_get_topic().returning(|_| Ok(None));
        let err = service(repo).reply(99, submission()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(..)));
    }

    #[tokio::test]
    async fn listings_and_feed_ask_for_published_only() {
        let mut repo = MockForumRepo::new();
        let published = StateFilter::Only(ContentState::from_stored("1"));
        let expected = published.clone();
        repo.expect_list_topics()
            .withf(move |q| q.state == expected && q.forum_id.is_none())
            .returning(|q| Ok(Page::new(vec![], q.page, 0)));
        let expected = published.clone();
        repo.expect_list_posts()
            .withf(move |q| q.state == expected && q.page.per_page == FEED_LIMIT)
            .returning(|q| Ok(Page::new(vec![], q.page, 0)));

        let svc = service(repo);
        svc.topics(None, &Listing::default()).await.unwrap();
        let feed = svc.feed(&FeedChannel::default(), "http://localhost").await.unwrap();
        assert!(feed.entries.is_empty());
    }

    #[tokio::test]
    async fn page_past_the_end_is_not_found() {
        let mut repo = MockForumRepo::new();
        repo.expect_list_posts()
            .returning(|q| Ok(Page::new(vec![], q.page, 3)));
        let listing = Listing { page: Some(2), ..Listing::default() };
        let err = service(repo).posts(None, &listing).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(..)));
    }

    #[tokio::test]
    async fn bad_sort_is_rejected_before_storage() {
        let mut repo = MockForumRepo::new();
        repo.expect_list_topics().never();
        let listing = Listing { sort: Some("title".into()), ..Listing::default() };
        let err = service(repo).topics(None, &listing).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn topic_slug_is_derived_and_author_required() {
        let mut repo = MockForumRepo::new();
        repo.expect_create_topic()
            .withf(|t| t.slug == "first-steps" && t.state.code() == "0" && !t.locked)
            .returning(|t| {
                Ok(Topic {
                    id: 1,
                    forum_id: t.forum_id,
                    name: t.name,
                    author: t.author,
                    sticky: t.sticky,
                    locked: t.locked,
                    created_at: t.created_at,
                    ip_address: t.ip_address,
                    state: t.state,
                    slug: t.slug,
                })
            });
        let svc = service(repo);
        let forum = Forum {
            id: 2,
            category_id: 1,
            name: "General".into(),
            slug: "general".into(),
            description: String::new(),
            order: 0,
            created_at: Utc::now(),
        };

        let mut sub = TopicSubmission {
            name: " First Steps ".into(),
            slug: None,
            author: "carol".into(),
            ip_address: "::1".into(),
        };
        let created = svc.create_topic(&forum, sub.clone()).await.unwrap();
        assert_eq!(created.name, "First Steps");

        sub.author = "  ".into();
        let err = svc.create_topic(&forum, sub).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn moderation_rejects_unknown_state_codes() {
        let mut repo = MockForumRepo::new();
        repo.expect_update_topic().never();
        let edit = TopicModeration {
            state: Some("published".into()),
            ..TopicModeration::default()
        };
        assert!(service(repo).moderate_topic(1, edit).await.is_err());
    }

    fn stored_post(id: i64, patch: &PostPatch) -> Post {
        let created = Utc.timestamp_opt(1_000, 0).unwrap();
        Post {
            id,
            topic_id: 5,
            title: "t".into(),
            text: patch.text.clone().unwrap_or_else(|| "old".into()),
            author: "bob".into(),
            created_at: created,
            modified_at: patch.modified_at,
            ip_address: "127.0.0.1".into(),
            state: patch.state.clone().unwrap_or_else(|| ContentState::from_stored("0")),
        }
    }

    #[tokio::test]
    async fn edit_post_replaces_text_and_touches_modified_at() {
        let before = Utc::now();
        let mut repo = MockForumRepo::new();
        repo.expect_update_post()
            .withf(move |id, patch| {
                *id == 7
                    && patch.text.as_deref() == Some("edited")
                    && patch.state.is_none()
                    && patch.modified_at >= before
            })
            .times(1)
            .returning(|id, patch| Ok(stored_post(id, &patch)));
        let svc = service(repo);

        let post = svc.edit_post(7, "edited").await.unwrap();
        assert_eq!(post.text, "edited");
        assert!(post.modified_at > post.created_at);

        let err = svc.edit_post(7, "  \n").await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn moderate_post_resolves_configured_codes() {
        let mut repo = MockForumRepo::new();
        repo.expect_update_post()
            .withf(|_, patch| {
                patch.text.is_none() && patch.state.as_ref().map(|s| s.code()) == Some("1")
            })
            .times(1)
            .returning(|id, patch| Ok(stored_post(id, &patch)));
        let svc = service(repo);

        let post = svc.moderate_post(3, "1").await.unwrap();
        assert_eq!(post.state.code(), "1");
        assert_eq!(post.text, "old");

        let err = svc.moderate_post(3, "live").await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn publishing_a_topic_opens_it_for_replies() {
        let current = Arc::new(Mutex::new(topic(5, false, "0")));
        let mut repo = MockForumRepo::new();

        let shared = current.clone();
        repo.expect_get_topic()
            .returning(move |_| Ok(Some(shared.lock().unwrap().clone())));
        let shared = current.clone();
        repo.expect_update_topic()
            .withf(|id, patch| *id == 5 && patch.sticky.is_none() && patch.locked.is_none())
            .returning(move |_, patch| {
                let mut topic = shared.lock().unwrap();
                if let Some(state) = patch.state {
                    topic.state = state;
                }
                Ok(topic.clone())
            });
        repo.expect_create_post()
            .times(1)
            .returning(|p| {
                let patch = PostPatch {
                    text: Some(p.text),
                    state: Some(p.state),
                    modified_at: p.created_at,
                };
                Ok(stored_post(12, &patch))
            });
        let svc = service(repo);

        let outcome = svc.reply(5, submission()).await.unwrap();
        assert_eq!(outcome, ReplyOutcome::Denied(DenyReason::NotPublished));

        let edit = TopicModeration {
            state: Some("1".into()),
            ..TopicModeration::default()
        };
        let topic = svc.moderate_topic(5, edit).await.unwrap();
        assert!(svc.visibility().is_published(&topic));

        let outcome = svc.reply(5, submission()).await.unwrap();
        assert!(matches!(outcome, ReplyOutcome::Created(_)));
    }
}
