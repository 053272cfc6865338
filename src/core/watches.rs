//! Watch list management - users moderators are notified about.

use crate::{
    entities::{Watch, watch},
    errors::Result,
};
use sea_orm::{QueryOrder, Set, prelude::*, sea_query::OnConflict};

const MAX_NOTE_LEN: usize = 1024;

/// Adds or replaces the watch entry for a user in a guild.
pub async fn watch<C>(db: &C, guild_xid: i64, user_xid: i64, note: Option<&str>) -> Result<()>
where
    C: ConnectionTrait,
{
    let model = watch::ActiveModel {
        guild_xid: Set(guild_xid),
        user_xid: Set(user_xid),
        note: Set(note.map(|n| n.chars().take(MAX_NOTE_LEN).collect())),
    };
    Watch::insert(model)
        .on_conflict(
            OnConflict::columns([watch::Column::GuildXid, watch::Column::UserXid])
                .update_column(watch::Column::Note)
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;
    Ok(())
}

/// Stops watching a user in a guild. Returns whether an entry was removed.
pub async fn unwatch(db: &DatabaseConnection, guild_xid: i64, user_xid: i64) -> Result<bool> {
    let result = Watch::delete_many()
        .filter(watch::Column::GuildXid.eq(guild_xid))
        .filter(watch::Column::UserXid.eq(user_xid))
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}

/// Every watch entry of a guild.
pub async fn fetch(db: &DatabaseConnection, guild_xid: i64) -> Result<Vec<watch::Model>> {
    Watch::find()
        .filter(watch::Column::GuildXid.eq(guild_xid))
        .order_by_asc(watch::Column::UserXid)
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_watch_replaces_note() -> Result<()> {
        let db = setup_test_db().await?;

        watch(&db, 1, 100, Some("first")).await?;
        watch(&db, 1, 100, Some(&"n".repeat(2000))).await?;
        watch(&db, 1, 101, None).await?;

        let watched = fetch(&db, 1).await?;
        assert_eq!(watched.len(), 2);
        assert_eq!(watched[0].note.as_ref().unwrap().len(), 1024);
        assert!(watched[1].note.is_none());
        assert!(fetch(&db, 2).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_unwatch() -> Result<()> {
        let db = setup_test_db().await?;
        watch(&db, 1, 100, None).await?;

        assert!(unwatch(&db, 1, 100).await?);
        assert!(!unwatch(&db, 1, 100).await?);
        assert!(fetch(&db, 1).await?.is_empty());
        Ok(())
    }
}
