//! Block entity - One user refusing to be matched with another.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Block database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "blocks")]
pub struct Model {
    /// User doing the blocking
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_xid: i64,
    /// User being blocked
    #[sea_orm(primary_key, auto_increment = false)]
    pub blocked_user_xid: i64,
    /// When the block was created
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
