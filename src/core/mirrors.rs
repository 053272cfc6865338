//! Mirror configuration - channels that receive copies of game posts.

use crate::{
    entities::{Mirror, mirror},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*, sea_query::OnConflict};

/// Mirrors game posts from one channel into another.
pub async fn add_mirror(
    db: &DatabaseConnection,
    from_guild_xid: i64,
    from_channel_xid: i64,
    to_guild_xid: i64,
    to_channel_xid: i64,
) -> Result<()> {
    if from_channel_xid == to_channel_xid {
        return Err(Error::InvalidInput {
            message: "A channel can not mirror itself".to_string(),
        });
    }
    let model = mirror::ActiveModel {
        from_guild_xid: Set(from_guild_xid),
        from_channel_xid: Set(from_channel_xid),
        to_guild_xid: Set(to_guild_xid),
        to_channel_xid: Set(to_channel_xid),
    };
    Mirror::insert(model)
        .on_conflict(
            OnConflict::columns([
                mirror::Column::FromGuildXid,
                mirror::Column::FromChannelXid,
                mirror::Column::ToGuildXid,
                mirror::Column::ToChannelXid,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(db)
        .await?;
    Ok(())
}

/// Destinations mirroring a source channel.
pub async fn get_mirrors<C>(
    db: &C,
    from_guild_xid: i64,
    from_channel_xid: i64,
) -> Result<Vec<mirror::Model>>
where
    C: ConnectionTrait,
{
    Mirror::find()
        .filter(mirror::Column::FromGuildXid.eq(from_guild_xid))
        .filter(mirror::Column::FromChannelXid.eq(from_channel_xid))
        .order_by_asc(mirror::Column::ToChannelXid)
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
    async fn test_add_and_get_mirrors() -> Result<()> {
        let db = setup_test_db().await?;

        add_mirror(&db, 1, 10, 2, 20).await?;
        add_mirror(&db, 1, 10, 1, 11).await?;
        add_mirror(&db, 1, 10, 2, 20).await?;

        let mirrors = get_mirrors(&db, 1, 10).await?;
        assert_eq!(mirrors.len(), 2);
        assert_eq!(mirrors[0].to_channel_xid, 11);
        assert_eq!(mirrors[1].to_guild_xid, 2);
        assert!(get_mirrors(&db, 2, 20).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_self_mirror_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        let result = add_mirror(&db, 1, 10, 1, 10).await;
        assert!(matches!(result, Err(Error::InvalidInput { .. })));
        Ok(())
    }
}
