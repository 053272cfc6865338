//! Queue entity - A user seated in a pending game.
//!
//! A user may sit in several pending games at once (bounded by the pending
//! game limit); once one of them starts the user leaves every queue.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Queue database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "queues")]
pub struct Model {
    /// Seated user
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_xid: i64,
    /// Pending game
    #[sea_orm(primary_key, auto_increment = false)]
    pub game_id: i32,
}

/// Defines relationships between Queue and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each queue row belongs to one game
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
