//! Guild award entity - A role granted or removed at a play-count threshold.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Guild award database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "guild_awards")]
pub struct Model {
    /// Award id
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Guild offering the award
    #[sea_orm(indexed)]
    pub guild_xid: i64,
    /// Number of games required
    #[sea_orm(indexed)]
    pub count: i32,
    /// Grant again every `count` games
    pub repeating: bool,
    /// Take the role away instead of giving it
    pub remove: bool,
    /// Discord role name
    pub role: String,
    /// Direct message sent to the player
    pub message: String,
    /// Only verified players earn the award
    pub verified_only: bool,
    /// Only unverified players earn the award
    pub unverified_only: bool,
}

/// Defines relationships between `GuildAward` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each award belongs to one guild
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
