//! Game entity - A pending or started play session.
//!
//! A game is created pending in one channel, seats players through the
//! `queues` table and flips to started once every seat is filled. Expired
//! games are soft deleted through `deleted_at`.

use super::enums::{GameBracket, GameFormat, GameService, GameStatus};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Game database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "games")]
pub struct Model {
    /// SpellBot game reference id
    #[sea_orm(primary_key)]
    pub id: i32,
    /// When the game was created
    pub created_at: DateTimeUtc,
    /// When the game last changed; drives matching order and expiry
    #[sea_orm(indexed)]
    pub updated_at: DateTimeUtc,
    /// When the game started
    pub started_at: Option<DateTimeUtc>,
    /// When the game was expired or abandoned
    #[sea_orm(indexed)]
    pub deleted_at: Option<DateTimeUtc>,
    /// Guild the game was created in
    #[sea_orm(indexed)]
    pub guild_xid: i64,
    /// Channel the game was created in
    #[sea_orm(indexed)]
    pub channel_xid: i64,
    /// Voice channel created for the game
    #[sea_orm(indexed)]
    pub voice_xid: Option<i64>,
    /// Invite link to the game's voice channel
    pub voice_invite_link: Option<String>,
    /// Number of seats, open or occupied
    #[sea_orm(indexed)]
    pub seats: i32,
    /// Pending or started
    #[sea_orm(indexed)]
    pub status: GameStatus,
    /// Game format
    #[sea_orm(indexed)]
    pub format: GameFormat,
    /// Commander bracket
    pub bracket: GameBracket,
    /// Service hosting the table
    pub service: GameService,
    /// Generated table link
    pub game_link: Option<String>,
    /// Password for the generated table, if any
    pub password: Option<String>,
}

impl Model {
    /// Whether the game is still seating players.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == GameStatus::Pending && self.deleted_at.is_none()
    }

    /// Spectator link for SpellTable tables.
    #[must_use]
    pub fn spectate_link(&self) -> Option<String> {
        match (self.service, &self.game_link) {
            (GameService::SpellTable, Some(link)) => Some(format!("{link}?spectate=true")),
            _ => None,
        }
    }
}

/// Defines relationships between Game and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each game belongs to one guild
    #[sea_orm(
        belongs_to = "super::guild::Entity",
        from = "Column::GuildXid",
        to = "super::guild::Column::Xid",
        on_delete = "Cascade"
    )]
    Guild,
    /// One game has many queued players
    #[sea_orm(has_many = "super::queue::Entity")]
    Queues,
    /// One game has many plays once started
    #[sea_orm(has_many = "super::play::Entity")]
    Plays,
    /// One game has many posts
    #[sea_orm(has_many = "super::post::Entity")]
    Posts,
}

impl Related<super::guild::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Guild.def()
    }
}

impl Related<super::queue::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Queues.def()
    }
}

impl Related<super::play::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Plays.def()
    }
}

impl Related<super::post::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Posts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
