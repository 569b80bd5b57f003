//! # rf-api
//!
//! The web routing and orchestration layer for the forum.

pub mod error;
pub mod handlers;
pub mod identity;
pub mod middleware;

use actix_web::web;

pub use handlers::AppState;

/// Configures the routes for the forum.
///
/// # Developer Note
/// Fixed routes are registered before `/{slug}/` so a forum slug can never
/// shadow them; rf-core additionally refuses those words as slugs.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(handlers::index)).service(
        web::scope("/forum")
            // The category index
            .route("/", web::get().to(handlers::category_list))
            .route("/topics/", web::get().to(handlers::topic_list))
            .route("/posts/", web::get().to(handlers::post_list))
            .route("/rss/", web::get().to(handlers::rss_feed))
            .route("/atom/", web::get().to(handlers::atom_feed))
            // The "Topic View" (e.g., /forum/topic/12/)
            .route("/topic/{topic_id}/", web::get().to(handlers::topic_post_list))
            .service(
                web::resource("/topic/{topic_id}/create/")
                    .route(web::get().to(handlers::post_form))
                    .route(web::post().to(handlers::create_post)),
            )
            // The "Forum View" (e.g., /forum/general/)
            .route("/{slug}/", web::get().to(handlers::forum_topic_list))
            .service(
                web::resource("/{slug}/create/")
                    .route(web::get().to(handlers::topic_form))
                    .route(web::post().to(handlers::create_topic)),
            ),
    );
}
