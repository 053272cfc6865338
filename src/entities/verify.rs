//! Verify entity - Whether a user is verified in a guild.
//!
//! Channels can restrict game play to verified or unverified users.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Verify database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "verify")]
pub struct Model {
    /// Guild the status applies to
    #[sea_orm(primary_key, auto_increment = false)]
    pub guild_xid: i64,
    /// User the status applies to
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_xid: i64,
    /// Verified by a moderator or by an auto verify channel
    pub verified: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
