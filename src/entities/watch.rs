//! Watch entity - A user moderators want to hear about when they join a game.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Watch database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "watches")]
pub struct Model {
    /// Guild where the user is watched
    #[sea_orm(primary_key, auto_increment = false)]
    pub guild_xid: i64,
    /// Watched user
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_xid: i64,
    /// Note sent to moderators
    pub note: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
