//! Runtime settings: optional `forum.toml`, overridden by `FORUM_*`
//! environment variables (`FORUM_SERVER__PORT=9000`, `FORUM_FORUM__PAGINATE_BY=25`).

use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use config::builder::DefaultState;
use rf_core::feed::FeedChannel;
use rf_core::state::StateConfig;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub forum: ForumSettings,
    pub states: StateConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub url: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: "sqlite:rusty_forum.db".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ForumSettings {
    pub paginate_by: u32,
    /// Absolute base for links in feeds
    pub site_url: String,
    pub feed: FeedChannel,
}

impl Default for ForumSettings {
    fn default() -> Self {
        Self {
            paginate_by: 10,
            site_url: "http://localhost:8080".into(),
            feed: FeedChannel::default(),
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        Self::build(
            Config::builder()
                .add_source(File::with_name("forum").required(false))
                .add_source(
                    Environment::with_prefix("FORUM")
                        .prefix_separator("_")
                        .separator("__")
                        .try_parsing(true),
                ),
        )
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let settings: Settings = builder.build()?.try_deserialize()?;
        if settings.forum.paginate_by == 0 {
            return Err(ConfigError::Message("forum.paginate_by must be at least 1".into()));
        }
        Ok(settings)
    }

    pub fn bind_addr(&self) -> (String, u16) {
        (self.server.host.clone(), self.server.port)
    }
}
