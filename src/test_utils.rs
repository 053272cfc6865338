//! Shared test utilities for `SpellBot`.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    core::{channels, guilds, users},
    entities::{self, GameModel},
    errors::Result,
    integrations::{GameLink, LinkGenerator},
};
use async_trait::async_trait;
use sea_orm::DatabaseConnection;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a test guild named `Guild {xid}`.
pub async fn create_test_guild(db: &DatabaseConnection, xid: i64) -> Result<entities::GuildModel> {
    guilds::upsert_guild(db, xid, Some(&format!("Guild {xid}"))).await
}

/// Creates a test channel with default settings.
///
/// # Defaults
/// * `default_seats`: 4
/// * `default_format`: Commander
/// * `default_service`: SpellTable
pub async fn create_test_channel(
    db: &DatabaseConnection,
    guild_xid: i64,
    xid: i64,
) -> Result<entities::ChannelModel> {
    channels::upsert_channel(db, xid, guild_xid, Some(&format!("channel-{xid}"))).await
}

/// Creates a test user named `User {xid}`.
pub async fn create_test_user(db: &DatabaseConnection, xid: i64) -> Result<entities::UserModel> {
    users::upsert_user(db, xid, &format!("User {xid}")).await
}

/// Link generator returning a fixed link without any network access.
#[derive(Debug, Clone, Default)]
pub struct StubLinks {
    /// Link handed to every game
    pub link: GameLink,
}

#[async_trait]
impl LinkGenerator for StubLinks {
    async fn generate(&self, _game: &GameModel) -> GameLink {
        self.link.clone()
    }
}
