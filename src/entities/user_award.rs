//! User award entity - The last award a user received in a guild.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User award database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_awards")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_xid: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub guild_xid: i64,
    /// Most recent award granted, if any
    pub guild_award_id: Option<i32>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
