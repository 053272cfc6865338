//! Channel entity - A text channel where players look for games.
//!
//! Each channel carries the defaults used for new games (seats, format,
//! bracket, service) and presentation settings for its game posts.

use super::enums::{GameBracket, GameFormat, GameService};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Channel database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "channels")]
pub struct Model {
    /// External Discord id of the channel
    #[sea_orm(primary_key, auto_increment = false)]
    pub xid: i64,
    /// Guild the channel belongs to
    #[sea_orm(indexed)]
    pub guild_xid: i64,
    /// When the channel was first seen
    pub created_at: DateTimeUtc,
    /// When the channel was last updated
    pub updated_at: DateTimeUtc,
    /// Most recently cached name of the channel
    pub name: Option<String>,
    /// Seats for new games when none are requested
    pub default_seats: i32,
    /// Format for new games when none is requested
    pub default_format: GameFormat,
    /// Bracket for new games when none is requested
    pub default_bracket: GameBracket,
    /// Service used to create game links
    pub default_service: GameService,
    /// Message of the day appended to game posts
    pub motd: Option<String>,
    /// Extra content posted alongside game embeds
    pub extra: Option<String>,
    /// Name prefix of the category holding game voice channels
    pub voice_category: Option<String>,
    /// Create invites for game voice channels
    pub voice_invite: bool,
    /// Delete expired game posts instead of marking them expired
    pub delete_expired: bool,
    /// Allow players to report points on started games
    pub show_points: bool,
    /// Reported points are locked until every player confirms them
    pub require_confirmation: bool,
    /// Verify every user who plays here
    pub auto_verify: bool,
    /// Only verified users may play here
    pub verified_only: bool,
    /// Only unverified users may play here
    pub unverified_only: bool,
}

/// Defines relationships between Channel and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each channel belongs to one guild
    #[sea_orm(
        belongs_to = "super::guild::Entity",
        from = "Column::GuildXid",
        to = "super::guild::Column::Xid",
        on_delete = "Cascade"
    )]
    Guild,
}

impl Related<super::guild::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Guild.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
