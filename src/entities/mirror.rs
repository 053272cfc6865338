//! Mirror entity - Duplicates a channel's game posts into another channel.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Mirror database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "mirrors")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub from_guild_xid: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub from_channel_xid: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub to_guild_xid: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub to_channel_xid: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
