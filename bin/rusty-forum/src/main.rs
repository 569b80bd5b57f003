//! # Rusty-Forum Binary
//!
//! The entry point that assembles the application based on compile-time features.

mod settings;

use std::sync::Arc;

use actix_web::middleware::{NormalizePath, TrailingSlash};
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use rf_api::middleware::{cors_policy, security_headers, standard_middleware};
use rf_api::{configure_routes, AppState};
use rf_core::service::ForumService;
use rf_core::traits::ForumRepo;
use rf_core::visibility::Visibility;

#[cfg(feature = "db-sqlite")]
use rf_db_sqlite::SqliteForumRepo;

use crate::settings::Settings;

#[cfg(not(feature = "db-sqlite"))]
compile_error!("rusty-forum needs a storage backend; enable the `db-sqlite` feature");

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let settings = Settings::load().context("invalid configuration")?;

    #[cfg(feature = "db-sqlite")]
    let repo: Arc<dyn ForumRepo> = Arc::new(
        SqliteForumRepo::new(&settings.database.url)
            .await
            .with_context(|| format!("failed to open {}", settings.database.url))?,
    );

    let service = ForumService::new(
        repo,
        Visibility::new(settings.states.clone()),
        settings.forum.paginate_by,
    );
    let state = web::Data::new(AppState {
        service,
        feed: settings.forum.feed.clone(),
        site_url: settings.forum.site_url.trim_end_matches('/').to_string(),
    });

    let (host, port) = settings.bind_addr();
    log::info!("Rusty-Forum starting on http://{}:{}", host, port);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(security_headers())
            .wrap(cors_policy())
            .wrap(NormalizePath::new(TrailingSlash::Always))
            .wrap(standard_middleware())
            .configure(configure_routes)
    })
    .bind((host.as_str(), port))?
    .run()
    .await?;

    Ok(())
}
