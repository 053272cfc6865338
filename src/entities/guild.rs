//! Guild entity - A Discord server that has interacted with the bot.
//!
//! Holds server-wide configuration such as whether game links are posted
//! publicly and whether voice channels are created for started games.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Guild database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "guilds")]
pub struct Model {
    /// External Discord id of the guild
    #[sea_orm(primary_key, auto_increment = false)]
    pub xid: i64,
    /// When the guild was first seen
    pub created_at: DateTimeUtc,
    /// When the guild was last updated
    pub updated_at: DateTimeUtc,
    /// Most recently cached name of the guild
    pub name: Option<String>,
    /// Message of the day appended to every game post
    pub motd: Option<String>,
    /// Show game links publicly instead of only by DM
    pub show_links: bool,
    /// Create a voice channel for every started game
    pub voice_create: bool,
    /// Use the maximum bitrate for created voice channels
    pub use_max_bitrate: bool,
    /// Banned guilds are ignored entirely
    pub banned: bool,
    /// Notice shown to users of this guild
    pub notice: Option<String>,
    /// Category to suggest voice channels from
    pub suggest_voice_category: Option<String>,
}

/// Defines relationships between Guild and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One guild has many channels
    #[sea_orm(has_many = "super::channel::Entity")]
    Channels,
    /// One guild has many games
    #[sea_orm(has_many = "super::game::Entity")]
    Games,
    /// One guild has many awards
    #[sea_orm(has_many = "super::guild_award::Entity")]
    Awards,
}

impl Related<super::channel::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Channels.def()
    }
}

impl Related<super::game::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Games.def()
    }
}

impl Related<super::guild_award::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Awards.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
