//! # rf-api Handlers
//!
//! This module coordinates the flow between HTTP requests and the
//! `ForumService`. Decisions (visibility, reply gate, ordering) live in
//! rf-core; handlers only pick the response.

use actix_web::http::{header, StatusCode};
use actix_web::{web, HttpRequest, HttpResponse};
use askama::Template;
use rf_core::error::AppError;
use rf_core::feed::{FeedChannel, FeedFormat};
use rf_core::service::{ForumService, Listing, PostSubmission, ReplyOutcome, TopicSubmission};
use rf_core::visibility::PostGate;
use rf_ui::{
    AtomTemplate, CategoryListTemplate, PageLinks, PostFormTemplate, PostListTemplate, PostView,
    RssTemplate, TopicFormTemplate, TopicListTemplate,
};
use serde::Deserialize;

use crate::error::WebError;
use crate::identity::{client_ip, require, Author};

/// State shared across all Actix-web workers.
pub struct AppState {
    pub service: ForumService,
    pub feed: FeedChannel,
    /// Absolute base URL used in feed links (e.g. "https://example.org")
    pub site_url: String,
}

type HandlerResult = Result<HttpResponse, WebError>;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub sort: Option<String>,
    pub author: Option<String>,
}

impl ListParams {
    fn listing(&self) -> Listing {
        Listing {
            page: self.page,
            sort: self.sort.clone(),
            author: self.author.clone().filter(|a| !a.trim().is_empty()),
        }
    }

    /// Parameters carried over into pagination links.
    fn link_params(&self) -> Vec<(&str, &str)> {
        let mut params = Vec::new();
        if let Some(sort) = &self.sort {
            params.push(("sort", sort.as_str()));
        }
        if let Some(author) = &self.author {
            params.push(("author", author.as_str()));
        }
        params
    }
}

#[derive(Debug, Deserialize)]
pub struct TopicForm {
    pub name: String,
    #[serde(default)]
    pub slug: String,
}

#[derive(Debug, Deserialize)]
pub struct PostForm {
    pub title: String,
    pub text: String,
}

fn render_err(err: askama::Error) -> WebError {
    WebError(AppError::Internal(format!("template rendering failed: {}", err)))
}

fn html_with<T: Template>(status: StatusCode, template: T) -> HandlerResult {
    let body = template.render().map_err(render_err)?;
    Ok(HttpResponse::build(status)
        .content_type("text/html; charset=utf-8")
        .body(body))
}

fn html<T: Template>(template: T) -> HandlerResult {
    html_with(StatusCode::OK, template)
}

fn see_other(location: String) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location))
        .finish()
}

/// Label of the state new content starts in, for the forms.
fn initial_state_label(state: &AppState) -> String {
    let visibility = state.service.visibility();
    let initial = visibility.initial_state();
    visibility
        .states()
        .label(&initial)
        .unwrap_or(initial.code())
        .to_string()
}

/// Form errors are shown on the form; everything else is an error page.
fn form_status(err: &AppError) -> Option<StatusCode> {
    match err {
        AppError::ValidationError(_) => Some(StatusCode::BAD_REQUEST),
        AppError::Conflict(_) => Some(StatusCode::CONFLICT),
        _ => None,
    }
}

/// `/` just points at the forum index.
pub async fn index() -> HttpResponse {
    see_other("/forum/".to_string())
}

/// Renders the category index (`/forum/`).
pub async fn category_list(data: web::Data<AppState>) -> HandlerResult {
    let categories = data.service.categories().await?;
    html(CategoryListTemplate {
        title: "Forums",
        categories: &categories,
    })
}

/// All published topics (`/forum/topics/`).
pub async fn topic_list(data: web::Data<AppState>, query: web::Query<ListParams>) -> HandlerResult {
    let page = data.service.topics(None, &query.listing()).await?;
    let pages = PageLinks::new(&page, "/forum/topics/", &query.link_params());
    html(TopicListTemplate {
        title: "Topics",
        forum: None,
        topics: &page.items,
        pages,
    })
}

/// Published topics of one forum (`/forum/{slug}/`).
pub async fn forum_topic_list(
    data: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<ListParams>,
) -> HandlerResult {
    let forum = data.service.forum(&path.into_inner()).await?;
    let page = data.service.topics(Some(&forum), &query.listing()).await?;
    let pages = PageLinks::new(&page, &forum.url(), &query.link_params());
    html(TopicListTemplate {
        title: &forum.name,
        forum: Some(&forum),
        topics: &page.items,
        pages,
    })
}

/// All published posts (`/forum/posts/`).
pub async fn post_list(data: web::Data<AppState>, query: web::Query<ListParams>) -> HandlerResult {
    let page = data.service.posts(None, &query.listing()).await?;
    let pages = PageLinks::new(&page, "/forum/posts/", &query.link_params());
    html(PostListTemplate {
        title: "Posts",
        topic: None,
        posts: page.items.iter().map(PostView::new).collect(),
        pages,
        closed_reason: None,
    })
}

/// A topic with its published posts (`/forum/topic/{id}/`).
pub async fn topic_post_list(
    data: web::Data<AppState>,
    path: web::Path<i64>,
    query: web::Query<ListParams>,
) -> HandlerResult {
    let topic = data.service.topic(path.into_inner()).await?;
    let page = data.service.posts(Some(&topic), &query.listing()).await?;
    let pages = PageLinks::new(&page, &topic.url(), &query.link_params());
    let closed_reason = match data.service.post_gate(&topic) {
        PostGate::Allow => None,
        PostGate::Denied(reason) => Some(reason.as_str()),
    };
    html(PostListTemplate {
        title: &topic.name,
        topic: Some(&topic),
        posts: page.items.iter().map(PostView::new).collect(),
        pages,
        closed_reason,
    })
}

/// Reply form; closed topics send the visitor back to the topic.
pub async fn post_form(
    data: web::Data<AppState>,
    path: web::Path<i64>,
    author: Option<Author>,
) -> HandlerResult {
    let topic = data.service.topic(path.into_inner()).await?;
    if let PostGate::Denied(reason) = data.service.post_gate(&topic) {
        log::debug!("reply form for topic {} closed: {}", topic.id, reason);
        return Ok(see_other(topic.url()));
    }
    require(author)?;

    let initial_state = initial_state_label(&data);
    html(PostFormTemplate {
        title: &topic.name,
        topic: &topic,
        initial_state: &initial_state,
        error: None,
        post_title: "",
        text: "",
    })
}

/// Orchestrates the creation of a new post.
pub async fn create_post(
    data: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
    author: Option<Author>,
    form: Option<web::Form<PostForm>>,
) -> HandlerResult {
    let topic_id = path.into_inner();
    // A closed topic redirects even when the body is unreadable.
    let Some(form) = form.map(web::Form::into_inner) else {
        let topic = data.service.topic(topic_id).await?;
        if let PostGate::Denied(_) = data.service.post_gate(&topic) {
            return Ok(see_other(topic.url()));
        }
        return Err(AppError::invalid("title and text are required").into());
    };
    let submission = PostSubmission {
        title: form.title.clone(),
        text: form.text.clone(),
        author: author.map(|a| a.0).unwrap_or_default(),
        ip_address: client_ip(&req),
    };

    match data.service.reply(topic_id, submission).await {
        Ok(ReplyOutcome::Created(post)) => Ok(see_other(post.url())),
        Ok(ReplyOutcome::Denied(_)) => Ok(see_other(format!("/forum/topic/{}/", topic_id))),
        Err(err) => {
            let Some(status) = form_status(&err) else {
                return Err(err.into());
            };
            let topic = data.service.topic(topic_id).await?;
            let initial_state = initial_state_label(&data);
            html_with(
                status,
                PostFormTemplate {
                    title: &topic.name,
                    topic: &topic,
                    initial_state: &initial_state,
                    error: Some(err.to_string()),
                    post_title: &form.title,
                    text: &form.text,
                },
            )
        }
    }
}

/// New topic form for a forum.
pub async fn topic_form(
    data: web::Data<AppState>,
    path: web::Path<String>,
    author: Option<Author>,
) -> HandlerResult {
    let forum = data.service.forum(&path.into_inner()).await?;
    require(author)?;

    let initial_state = initial_state_label(&data);
    html(TopicFormTemplate {
        title: &forum.name,
        forum: &forum,
        initial_state: &initial_state,
        error: None,
        name: "",
        slug: "",
    })
}

/// Orchestrates the creation of a new topic.
pub async fn create_topic(
    data: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    author: Option<Author>,
    form: web::Form<TopicForm>,
) -> HandlerResult {
    let forum = data.service.forum(&path.into_inner()).await?;
    let author = require(author)?;
    let form = form.into_inner();
    let submission = TopicSubmission {
        name: form.name.clone(),
        slug: Some(form.slug.clone()).filter(|s| !s.trim().is_empty()),
        author: author.0,
        ip_address: client_ip(&req),
    };

    match data.service.create_topic(&forum, submission).await {
        Ok(topic) => Ok(see_other(topic.url())),
        Err(err) => {
            let Some(status) = form_status(&err) else {
                return Err(err.into());
            };
            let initial_state = initial_state_label(&data);
            html_with(
                status,
                TopicFormTemplate {
                    title: &forum.name,
                    forum: &forum,
                    initial_state: &initial_state,
                    error: Some(err.to_string()),
                    name: &form.name,
                    slug: &form.slug,
                },
            )
        }
    }
}

pub async fn rss_feed(data: web::Data<AppState>) -> HandlerResult {
    feed_response(&data, FeedFormat::Rss).await
}

pub async fn atom_feed(data: web::Data<AppState>) -> HandlerResult {
    feed_response(&data, FeedFormat::Atom).await
}

/// Both dialects render the same feed.
async fn feed_response(data: &AppState, format: FeedFormat) -> HandlerResult {
    let feed = data.service.feed(&data.feed, &data.site_url).await?;
    let body = match format {
        FeedFormat::Rss => RssTemplate { feed: &feed }.render(),
        FeedFormat::Atom => AtomTemplate { feed: &feed }.render(),
    }
    .map_err(render_err)?;

    Ok(HttpResponse::Ok()
        .content_type(format.content_type())
        .body(body))
}
