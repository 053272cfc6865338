//! Post entity - A Discord message displaying a game's embed.
//!
//! A game has one post in its own channel plus one per mirror channel.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Post database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "posts")]
pub struct Model {
    /// Game shown by the post
    #[sea_orm(primary_key, auto_increment = false)]
    pub game_id: i32,
    /// Guild holding the message
    #[sea_orm(primary_key, auto_increment = false)]
    pub guild_xid: i64,
    /// Channel holding the message
    #[sea_orm(primary_key, auto_increment = false)]
    pub channel_xid: i64,
    /// The message itself
    #[sea_orm(indexed)]
    pub message_xid: i64,
    /// When the post was made
    pub created_at: DateTimeUtc,
}

impl Model {
    /// Discord link that jumps to this post.
    #[must_use]
    pub fn jump_link(&self) -> String {
        format!(
            "https://discordapp.com/channels/{}/{}/{}",
            self.guild_xid, self.channel_xid, self.message_xid
        )
    }
}

/// Defines relationships between Post and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each post belongs to one game
    #[sea_orm(
        belongs_to = "super::game::Entity",
        from = "Column::GameId",
        to = "super::game::Column::Id",
        on_delete = "Cascade"
    )]
    Game,
}

impl Related<super::game::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Game.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
