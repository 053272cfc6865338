//! Play service integrations - creating tables for started games.
//!
//! Each service is asked for a table through its HTTP API. A failed request
//! is retried a bounded number of times; when every attempt fails the game
//! still starts and the post tells players to create a table by hand.

pub mod convoke;
pub mod spelltable;
pub mod tablestream;

use crate::{
    config::Settings,
    entities::{GameModel, GameService},
    errors::Result,
};
use async_trait::async_trait;
use std::{future::Future, sync::Arc, time::Duration};
use tracing::{error, info, warn};

/// User agent sent to every play service.
pub const USER_AGENT: &str = concat!("spellbot/", env!("CARGO_PKG_VERSION"));

/// A table created for a game.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameLink {
    /// URL players use to join
    pub link: Option<String>,
    /// Password protecting the table
    pub password: Option<String>,
}

/// Something that can create a table for a game.
#[async_trait]
pub trait LinkGenerator: Send + Sync {
    /// Creates a table for the game; an empty link means none could be made.
    async fn generate(&self, game: &GameModel) -> GameLink;
}

/// Runs `attempt` up to `attempts` times, returning the first success.
pub async fn with_retries<F, Fut>(service: &'static str, attempts: u32, mut attempt: F) -> Option<GameLink>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<GameLink>>,
{
    let attempts = attempts.max(1);
    for n in 1..=attempts {
        match attempt().await {
            Ok(link) => return Some(link),
            Err(e) if n < attempts => warn!(service, attempt = n, "Link request failed: {e}"),
            Err(e) => error!(service, attempt = n, "Link request failed (final attempt): {e}"),
        }
    }
    None
}

/// Creates tables through the real play service APIs.
pub struct HttpLinks {
    client: reqwest::Client,
    settings: Arc<Settings>,
}

impl HttpLinks {
    /// Builds the HTTP client used for every link request.
    pub fn new(settings: Arc<Settings>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.link_timeout_s))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client, settings })
    }
}

#[async_trait]
impl LinkGenerator for HttpLinks {
    async fn generate(&self, game: &GameModel) -> GameLink {
        let settings = &self.settings;
        let attempts = settings.link_retry_attempts;

        let created = match game.service {
            GameService::NotAny => return GameLink::default(),
            GameService::SpellTable => {
                let Some(key) = settings.spelltable_auth_key.as_deref() else {
                    return GameLink::default();
                };
                with_retries("SpellTable", attempts, || {
                    spelltable::create_game(&self.client, &settings.spelltable_create, key)
                })
                .await
            }
            GameService::Convoke => {
                let Some(key) = settings.convoke_api_key.as_deref() else {
                    return GameLink::default();
                };
                let password = convoke::passphrase();
                with_retries("Convoke", attempts, || {
                    convoke::create_game(&self.client, &settings.convoke_root, key, game, &password)
                })
                .await
            }
            GameService::TableStream => {
                let Some(key) = settings.tablestream_auth_key.as_deref() else {
                    return GameLink::default();
                };
                with_retries("TableStream", attempts, || {
                    tablestream::create_room(&self.client, &settings.tablestream_create, key, game)
                })
                .await
            }
        };

        let link = created.unwrap_or_default();
        info!(game_id = game.id, service = %game.service, created = link.link.is_some(), "Generated game link");
        link
    }
}
