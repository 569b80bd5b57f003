//! # rf-ui
//!
//! askama templates for the forum pages and the two feed dialects.
//! Handlers build these structs and call `render()`.

use askama::Template;
use rf_core::feed::Feed;
use rf_core::models::{CategoryWithForums, Forum, Post, Topic};
use rf_core::pagination::Page;
use url::form_urlencoded;

#[derive(Template)]
#[template(path = "category_list.html")]
pub struct CategoryListTemplate<'a> {
    pub title: &'a str,
    pub categories: &'a [CategoryWithForums],
}

/// Site-wide topics, or the topics of `forum`.
#[derive(Template)]
#[template(path = "topic_list.html")]
pub struct TopicListTemplate<'a> {
    pub title: &'a str,
    pub forum: Option<&'a Forum>,
    pub topics: &'a [Topic],
    pub pages: PageLinks,
}

/// Site-wide posts, or the posts of `topic`.
#[derive(Template)]
#[template(path = "post_list.html")]
pub struct PostListTemplate<'a> {
    pub title: &'a str,
    pub topic: Option<&'a Topic>,
    pub posts: Vec<PostView<'a>>,
    pub pages: PageLinks,
    /// Why replies are closed, when they are
    pub closed_reason: Option<&'static str>,
}

#[derive(Template)]
#[template(path = "topic_form.html")]
pub struct TopicFormTemplate<'a> {
    pub title: &'a str,
    pub forum: &'a Forum,
    /// Label of the state new topics start in
    pub initial_state: &'a str,
    pub error: Option<String>,
    pub name: &'a str,
    pub slug: &'a str,
}

#[derive(Template)]
#[template(path = "post_form.html")]
pub struct PostFormTemplate<'a> {
    pub title: &'a str,
    pub topic: &'a Topic,
    pub initial_state: &'a str,
    pub error: Option<String>,
    pub post_title: &'a str,
    pub text: &'a str,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate<'a> {
    pub title: &'a str,
    pub status: u16,
    pub message: &'a str,
}

#[derive(Template)]
#[template(path = "rss.xml", escape = "html")]
pub struct RssTemplate<'a> {
    pub feed: &'a Feed,
}

#[derive(Template)]
#[template(path = "atom.xml", escape = "html")]
pub struct AtomTemplate<'a> {
    pub feed: &'a Feed,
}

/// A post with its body already turned into safe HTML.
pub struct PostView<'a> {
    pub post: &'a Post,
    pub body: String,
}

impl<'a> PostView<'a> {
    pub fn new(post: &'a Post) -> Self {
        Self {
            post,
            body: render_body(&post.text),
        }
    }
}

/// Previous/next links that keep the listing's other query parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct PageLinks {
    pub number: u32,
    pub num_pages: u32,
    pub previous: Option<String>,
    pub next: Option<String>,
}

impl PageLinks {
    pub fn new<T>(page: &Page<T>, base_url: &str, params: &[(&str, &str)]) -> Self {
        let link = |number: u32| {
            let mut query = form_urlencoded::Serializer::new(String::new());
            for (key, value) in params {
                query.append_pair(key, value);
            }
            query.append_pair("page", &number.to_string());
            format!("{}?{}", base_url, query.finish())
        };
        Self {
            number: page.number,
            num_pages: page.num_pages(),
            previous: page.has_previous().then(|| link(page.number - 1)),
            next: page.has_next().then(|| link(page.number + 1)),
        }
    }
}

/// Plain text to HTML: escape everything, keep line breaks.
pub fn render_body(raw: &str) -> String {
    raw.lines()
        .map(|line| html_escape::encode_text(line).into_owned())
        .collect::<Vec<_>>()
        .join("<br />")
}
