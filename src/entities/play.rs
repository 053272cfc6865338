//! Play entity - Record of a user having played a started game.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Play database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "plays")]
pub struct Model {
    /// Player
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_xid: i64,
    /// Started game
    #[sea_orm(primary_key, auto_increment = false)]
    pub game_id: i32,
    /// Points reported by the player
    pub points: Option<i32>,
    /// When the game started for this player
    pub created_at: DateTimeUtc,
    /// When the player confirmed every reported result
    pub confirmed_at: Option<DateTimeUtc>,
}

/// Defines relationships between Play and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each play belongs to one game
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
