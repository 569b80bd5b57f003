//! # rf-db-sqlite Implementation
//!
//! This module implements the data mapping between the SQLite relational model
//! and the `rf-core` domain models.

use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rf_core::error::{AppError, Result};
use rf_core::models::{
    Category, CategoryWithForums, Forum, NewCategory, NewForum, NewPost, NewTopic, Post,
    PostPatch, Topic, TopicPatch,
};
use rf_core::ordering::{Direction, OrderSpec, SortField};
use rf_core::pagination::Page;
use rf_core::state::ContentState;
use rf_core::traits::{ForumRepo, PostQuery, TopicQuery};
use rf_core::visibility::StateFilter;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite};

/// Applied statement by statement on startup; every statement is idempotent.
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS categories (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        name        TEXT    NOT NULL,
        sort_order  INTEGER NOT NULL DEFAULT 0,
        created_at  INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS forums (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        category_id INTEGER NOT NULL REFERENCES categories(id),
        name        TEXT    NOT NULL,
        slug        TEXT    NOT NULL UNIQUE,
        description TEXT    NOT NULL DEFAULT '',
        sort_order  INTEGER NOT NULL DEFAULT 0,
        created_at  INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS topics (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        forum_id    INTEGER NOT NULL REFERENCES forums(id),
        name        TEXT    NOT NULL,
        slug        TEXT    NOT NULL UNIQUE,
        author      TEXT    NOT NULL,
        sticky      INTEGER NOT NULL DEFAULT 0,
        locked      INTEGER NOT NULL DEFAULT 0,
        ip_address  TEXT    NOT NULL,
        state       TEXT    NOT NULL,
        created_at  INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS posts (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        topic_id    INTEGER NOT NULL REFERENCES topics(id),
        title       TEXT    NOT NULL,
        text        TEXT    NOT NULL,
        author      TEXT    NOT NULL,
        ip_address  TEXT    NOT NULL,
        state       TEXT    NOT NULL,
        created_at  INTEGER NOT NULL,
        modified_at INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_forums_category ON forums (category_id)",
    "CREATE INDEX IF NOT EXISTS idx_topics_forum_state ON topics (forum_id, state)",
    "CREATE INDEX IF NOT EXISTS idx_posts_topic_state ON posts (topic_id, state)",
    "CREATE INDEX IF NOT EXISTS idx_posts_state_created ON posts (state, created_at)",
];

const TOPIC_COLUMNS: &str =
    "id, forum_id, name, slug, author, sticky, locked, ip_address, state, created_at";
const POST_COLUMNS: &str =
    "id, topic_id, title, text, author, ip_address, state, created_at, modified_at";

pub struct SqliteForumRepo {
    pool: SqlitePool,
}

impl SqliteForumRepo {
    /// Connects and applies the schema.
    ///
    /// In-memory databases are private to a connection, so they get a pool
    /// of exactly one connection.
    pub async fn new(url: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let in_memory = url.contains(":memory:") || url.contains("mode=memory");
        let mut pool_options = SqlitePoolOptions::new().max_connections(if in_memory { 1 } else { 5 });
        if in_memory {
            // Closing the only connection would drop the database.
            pool_options = pool_options.idle_timeout(None).max_lifetime(None);
        }
        let pool = pool_options.connect_with(options).await?;

        let repo = Self { pool };
        repo.migrate().await?;
        log::info!("sqlite store ready at {}", url);
        Ok(repo)
    }

    async fn migrate(&self) -> anyhow::Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }
}

// Helpers for timestamp conversion; microseconds keep ORDER BY exact.
fn ts_to_db(at: DateTime<Utc>) -> i64 {
    at.timestamp_micros()
}

fn db_to_ts(micros: i64) -> std::result::Result<DateTime<Utc>, sqlx::Error> {
    DateTime::from_timestamp_micros(micros)
        .ok_or_else(|| sqlx::Error::Decode(format!("timestamp out of range: {}", micros).into()))
}

fn db_err(err: sqlx::Error) -> AppError {
    log::error!("database error: {}", err);
    AppError::Internal(err.to_string())
}

/// Maps constraint violations of an insert to domain errors.
fn insert_err(err: sqlx::Error, conflict: impl FnOnce() -> String, parent: (&str, i64)) -> AppError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return AppError::Conflict(conflict());
        }
        if db.is_foreign_key_violation() {
            return AppError::not_found(parent.0, parent.1);
        }
    }
    db_err(err)
}

fn order_clause(order: &OrderSpec) -> String {
    let mut parts: Vec<String> = order
        .keys()
        .iter()
        .map(|key| {
            let column = match key.field {
                SortField::Sticky => "sticky",
                SortField::Created => "created_at",
                SortField::Name => "name",
                SortField::Title => "title",
            };
            let direction = match key.direction {
                Direction::Asc => "ASC",
                Direction::Desc => "DESC",
            };
            format!("{} {}", column, direction)
        })
        .collect();
    parts.push("id ASC".to_string());
    parts.join(", ")
}

fn push_state_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &StateFilter) {
    if let StateFilter::Only(state) = filter {
        qb.push(" AND state = ").push_bind(state.code().to_string());
    }
}

fn push_topic_filters(qb: &mut QueryBuilder<'_, Sqlite>, query: &TopicQuery) {
    push_state_filter(qb, &query.state);
    if let Some(forum_id) = query.forum_id {
        qb.push(" AND forum_id = ").push_bind(forum_id);
    }
    if let Some(author) = &query.author {
        qb.push(" AND author = ").push_bind(author.clone());
    }
}

fn push_post_filters(qb: &mut QueryBuilder<'_, Sqlite>, query: &PostQuery) {
    push_state_filter(qb, &query.state);
    if let Some(topic_id) = query.topic_id {
        qb.push(" AND topic_id = ").push_bind(topic_id);
    }
    if let Some(author) = &query.author {
        qb.push(" AND author = ").push_bind(author.clone());
    }
}

fn row_to_category(row: &SqliteRow) -> std::result::Result<Category, sqlx::Error> {
    Ok(Category {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        order: row.try_get("sort_order")?,
        created_at: db_to_ts(row.try_get("created_at")?)?,
    })
}

fn row_to_forum(row: &SqliteRow) -> std::result::Result<Forum, sqlx::Error> {
    Ok(Forum {
        id: row.try_get("id")?,
        category_id: row.try_get("category_id")?,
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
        description: row.try_get("description")?,
        order: row.try_get("sort_order")?,
        created_at: db_to_ts(row.try_get("created_at")?)?,
    })
}

fn row_to_topic(row: &SqliteRow) -> std::result::Result<Topic, sqlx::Error> {
    Ok(Topic {
        id: row.try_get("id")?,
        forum_id: row.try_get("forum_id")?,
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
        author: row.try_get("author")?,
        sticky: row.try_get("sticky")?,
        locked: row.try_get("locked")?,
        ip_address: row.try_get("ip_address")?,
        state: ContentState::from_stored(row.try_get::<String, _>("state")?),
        created_at: db_to_ts(row.try_get("created_at")?)?,
    })
}

fn row_to_post(row: &SqliteRow) -> std::result::Result<Post, sqlx::Error> {
    Ok(Post {
        id: row.try_get("id")?,
        topic_id: row.try_get("topic_id")?,
        title: row.try_get("title")?,
        text: row.try_get("text")?,
        author: row.try_get("author")?,
        ip_address: row.try_get("ip_address")?,
        state: ContentState::from_stored(row.try_get::<String, _>("state")?),
        created_at: db_to_ts(row.try_get("created_at")?)?,
        modified_at: db_to_ts(row.try_get("modified_at")?)?,
    })
}

#[async_trait]
impl ForumRepo for SqliteForumRepo {
    async fn create_category(&self, category: NewCategory) -> Result<Category> {
        let result = sqlx::query("INSERT INTO categories (name, sort_order, created_at) VALUES (?, ?, ?)")
            .bind(&category.name)
            .bind(category.order)
            .bind(ts_to_db(category.created_at))
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(Category {
            id: result.last_insert_rowid(),
            name: category.name,
            order: category.order,
            created_at: category.created_at,
        })
    }

    /// Two queries, grouped in memory so both levels keep their order.
    async fn list_categories(&self) -> Result<Vec<CategoryWithForums>> {
        let categories = sqlx::query("SELECT * FROM categories ORDER BY sort_order ASC, created_at ASC, id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        let forums = sqlx::query("SELECT * FROM forums ORDER BY sort_order ASC, created_at ASC, id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        let mut by_category: HashMap<i64, Vec<Forum>> = HashMap::new();
        for row in &forums {
            let forum = row_to_forum(row).map_err(db_err)?;
            by_category.entry(forum.category_id).or_default().push(forum);
        }

        categories
            .iter()
            .map(|row| {
                let category = row_to_category(row).map_err(db_err)?;
                let forums = by_category.remove(&category.id).unwrap_or_default();
                Ok(CategoryWithForums { category, forums })
            })
            .collect()
    }

    async fn create_forum(&self, forum: NewForum) -> Result<Forum> {
        let result = sqlx::query(
            "INSERT INTO forums (category_id, name, slug, description, sort_order, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(forum.category_id)
        .bind(&forum.name)
        .bind(&forum.slug)
        .bind(&forum.description)
        .bind(forum.order)
        .bind(ts_to_db(forum.created_at))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            insert_err(
                e,
                || format!("a forum with slug '{}' already exists", forum.slug),
                ("Category", forum.category_id),
            )
        })?;

        Ok(Forum {
            id: result.last_insert_rowid(),
            category_id: forum.category_id,
            name: forum.name,
            slug: forum.slug,
            description: forum.description,
            order: forum.order,
            created_at: forum.created_at,
        })
    }

    async fn get_forum(&self, slug: &str) -> Result<Option<Forum>> {
        let row = sqlx::query("SELECT * FROM forums WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.as_ref().map(row_to_forum).transpose().map_err(db_err)
    }

    async fn create_topic(&self, topic: NewTopic) -> Result<Topic> {
        let result = sqlx::query(
            "INSERT INTO topics (forum_id, name, slug, author, sticky, locked, ip_address, state, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(topic.forum_id)
        .bind(&topic.name)
        .bind(&topic.slug)
        .bind(&topic.author)
        .bind(topic.sticky)
        .bind(topic.locked)
        .bind(&topic.ip_address)
        .bind(topic.state.code())
        .bind(ts_to_db(topic.created_at))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            insert_err(
                e,
                || format!("a topic with slug '{}' already exists", topic.slug),
                ("Forum", topic.forum_id),
            )
        })?;

        Ok(Topic {
            id: result.last_insert_rowid(),
            forum_id: topic.forum_id,
            name: topic.name,
            author: topic.author,
            sticky: topic.sticky,
            locked: topic.locked,
            created_at: topic.created_at,
            ip_address: topic.ip_address,
            state: topic.state,
            slug: topic.slug,
        })
    }

    async fn get_topic(&self, id: i64) -> Result<Option<Topic>> {
        let row = sqlx::query(&format!("SELECT {} FROM topics WHERE id = ?", TOPIC_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.as_ref().map(row_to_topic).transpose().map_err(db_err)
    }

    async fn list_topics(&self, query: &TopicQuery) -> Result<Page<Topic>> {
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM topics WHERE 1 = 1");
        push_topic_filters(&mut count, query);
        let total: i64 = count
            .build()
            .fetch_one(&self.pool)
            .await
            .and_then(|row| row.try_get(0))
            .map_err(db_err)?;

        let mut select = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM topics WHERE 1 = 1", TOPIC_COLUMNS));
        push_topic_filters(&mut select, query);
        select.push(format!(" ORDER BY {}", order_clause(&query.order)));
        select
            .push(" LIMIT ")
            .push_bind(query.page.limit())
            .push(" OFFSET ")
            .push_bind(query.page.offset());

        log::debug!("topic listing: {}", select.sql());
        let items = select
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?
            .iter()
            .map(row_to_topic)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(db_err)?;

        Ok(Page::new(items, query.page, total.max(0) as u64))
    }

    async fn update_topic(&self, id: i64, patch: TopicPatch) -> Result<Topic> {
        let result = sqlx::query(
            "UPDATE topics SET sticky = COALESCE(?, sticky), locked = COALESCE(?, locked), state = COALESCE(?, state) WHERE id = ?",
        )
        .bind(patch.sticky)
        .bind(patch.locked)
        .bind(patch.state.as_ref().map(|s| s.code().to_string()))
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Topic", id));
        }
        self.get_topic(id)
            .await?
            .ok_or_else(|| AppError::not_found("Topic", id))
    }

    async fn create_post(&self, post: NewPost) -> Result<Post> {
        let result = sqlx::query(
            "INSERT INTO posts (topic_id, title, text, author, ip_address, state, created_at, modified_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(post.topic_id)
        .bind(&post.title)
        .bind(&post.text)
        .bind(&post.author)
        .bind(&post.ip_address)
        .bind(post.state.code())
        .bind(ts_to_db(post.created_at))
        .bind(ts_to_db(post.created_at))
        .execute(&self.pool)
        .await
        .map_err(|e| insert_err(e, || "post already exists".to_string(), ("Topic", post.topic_id)))?;

        Ok(Post {
            id: result.last_insert_rowid(),
            topic_id: post.topic_id,
            title: post.title,
            text: post.text,
            author: post.author,
            created_at: post.created_at,
            modified_at: post.created_at,
            ip_address: post.ip_address,
            state: post.state,
        })
    }

    async fn get_post(&self, id: i64) -> Result<Option<Post>> {
        let row = sqlx::query(&format!("SELECT {} FROM posts WHERE id = ?", POST_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.as_ref().map(row_to_post).transpose().map_err(db_err)
    }

    async fn list_posts(&self, query: &PostQuery) -> Result<Page<Post>> {
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM posts WHERE 1 = 1");
        push_post_filters(&mut count, query);
        let total: i64 = count
            .build()
            .fetch_one(&self.pool)
            .await
            .and_then(|row| row.try_get(0))
            .map_err(db_err)?;

        let mut select = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM posts WHERE 1 = 1", POST_COLUMNS));
        push_post_filters(&mut select, query);
        select.push(format!(" ORDER BY {}", order_clause(&query.order)));
        select
            .push(" LIMIT ")
            .push_bind(query.page.limit())
            .push(" OFFSET ")
            .push_bind(query.page.offset());

        log::debug!("post listing: {}", select.sql());
        let items = select
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?
            .iter()
            .map(row_to_post)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(db_err)?;

        Ok(Page::new(items, query.page, total.max(0) as u64))
    }

    async fn update_post(&self, id: i64, patch: PostPatch) -> Result<Post> {
        let result = sqlx::query(
            "UPDATE posts SET text = COALESCE(?, text), state = COALESCE(?, state), modified_at = ? WHERE id = ?",
        )
        .bind(patch.text)
        .bind(patch.state.as_ref().map(|s| s.code().to_string()))
        .bind(ts_to_db(patch.modified_at))
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Post", id));
        }
        self.get_post(id)
            .await?
            .ok_or_else(|| AppError::not_found("Post", id))
    }
}
