//! User entity - A Discord user known to the bot.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// External Discord id of the user
    #[sea_orm(primary_key, auto_increment = false)]
    pub xid: i64,
    /// When the user was first seen
    pub created_at: DateTimeUtc,
    /// When the user was last updated
    pub updated_at: DateTimeUtc,
    /// Most recently cached display name
    pub name: String,
    /// Banned users can not join games
    pub banned: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
