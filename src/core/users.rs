//! User business logic - registration, bans, queue status and block lists.

use crate::{
    entities::{Block, Game, GameStatus, Queue, User, block, game, post, queue, user},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{
    Condition, JoinType, QueryOrder, QuerySelect, RelationTrait, Set, prelude::*,
    sea_query::OnConflict,
};

const MAX_NAME_LEN: usize = 100;

/// Placeholder name for users recorded before the bot has seen them speak.
pub const UNKNOWN_USER: &str = "Unknown User";

/// Records a user, refreshing the cached display name when it already exists.
pub async fn upsert_user<C>(db: &C, xid: i64, name: &str) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    let now = Utc::now();
    let name: String = name.chars().take(MAX_NAME_LEN).collect();
    let model = user::ActiveModel {
        xid: Set(xid),
        created_at: Set(now),
        updated_at: Set(now),
        name: Set(name),
        banned: Set(false),
    };

    User::insert(model)
        .on_conflict(
            OnConflict::column(user::Column::Xid)
                .update_columns([user::Column::Name, user::Column::UpdatedAt])
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    User::find_by_id(xid)
        .one(db)
        .await?
        .ok_or_else(|| Error::Config {
            message: format!("User {xid} vanished after upsert"),
        })
}

/// Finds a user by Discord id.
pub async fn get_user<C>(db: &C, xid: i64) -> Result<Option<user::Model>>
where
    C: ConnectionTrait,
{
    User::find_by_id(xid).one(db).await.map_err(Into::into)
}

/// Whether the user is banned from the bot.
pub async fn is_banned<C>(db: &C, xid: i64) -> Result<bool>
where
    C: ConnectionTrait,
{
    Ok(get_user(db, xid).await?.is_some_and(|u| u.banned))
}

/// Bans or unbans a user, recording them first if they are unknown.
pub async fn set_banned(db: &DatabaseConnection, xid: i64, banned: bool) -> Result<()> {
    if get_user(db, xid).await?.is_none() {
        upsert_user(db, xid, UNKNOWN_USER).await?;
    }
    User::update_many()
        .col_expr(user::Column::Banned, Expr::value(banned))
        .col_expr(user::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(user::Column::Xid.eq(xid))
        .exec(db)
        .await?;
    Ok(())
}

/// The pending game the user is waiting in for a channel, if any.
///
/// A game belongs to a channel when it was created there or when one of its
/// posts (for example a mirror) lives there.
pub async fn current_game<C>(db: &C, user_xid: i64, channel_xid: i64) -> Result<Option<game::Model>>
where
    C: ConnectionTrait,
{
    Game::find()
        .join(JoinType::InnerJoin, game::Relation::Queues.def())
        .join(JoinType::LeftJoin, game::Relation::Posts.def())
        .filter(queue::Column::UserXid.eq(user_xid))
        .filter(game::Column::Status.eq(GameStatus::Pending))
        .filter(game::Column::DeletedAt.is_null())
        .filter(
            Condition::any()
                .add(game::Column::ChannelXid.eq(channel_xid))
                .add(post::Column::ChannelXid.eq(channel_xid)),
        )
        .order_by_desc(game::Column::UpdatedAt)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Whether the user is already waiting in a game for this channel.
pub async fn is_waiting<C>(db: &C, user_xid: i64, channel_xid: i64) -> Result<bool>
where
    C: ConnectionTrait,
{
    Ok(current_game(db, user_xid, channel_xid).await?.is_some())
}

/// Number of pending games the user is queued in.
pub async fn pending_games<C>(db: &C, user_xid: i64) -> Result<u64>
where
    C: ConnectionTrait,
{
    Queue::find()
        .filter(queue::Column::UserXid.eq(user_xid))
        .count(db)
        .await
        .map_err(Into::into)
}

/// Whether the user is queued in a game belonging to a different guild.
pub async fn queued_in_another_guild<C>(db: &C, user_xid: i64, guild_xid: i64) -> Result<bool>
where
    C: ConnectionTrait,
{
    let count = Queue::find()
        .join(JoinType::InnerJoin, queue::Relation::Game.def())
        .filter(queue::Column::UserXid.eq(user_xid))
        .filter(game::Column::GuildXid.ne(guild_xid))
        .count(db)
        .await?;
    Ok(count > 0)
}

/// Blocks each of `others` for `user_xid`. Blocking yourself is ignored.
pub async fn block(db: &DatabaseConnection, user_xid: i64, others: &[i64]) -> Result<()> {
    let now = Utc::now();
    let rows: Vec<block::ActiveModel> = others
        .iter()
        .filter(|&&other| other != user_xid)
        .map(|&other| block::ActiveModel {
            user_xid: Set(user_xid),
            blocked_user_xid: Set(other),
            created_at: Set(now),
        })
        .collect();
    if rows.is_empty() {
        return Ok(());
    }

    Block::insert_many(rows)
        .on_conflict(
            OnConflict::columns([block::Column::UserXid, block::Column::BlockedUserXid])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;
    Ok(())
}

/// Removes blocks of each of `others` for `user_xid`.
pub async fn unblock(db: &DatabaseConnection, user_xid: i64, others: &[i64]) -> Result<()> {
    Block::delete_many()
        .filter(block::Column::UserXid.eq(user_xid))
        .filter(block::Column::BlockedUserXid.is_in(others.iter().copied()))
        .exec(db)
        .await?;
    Ok(())
}

/// Users blocked by `user_xid`, oldest block first.
pub async fn blocklist(db: &DatabaseConnection, user_xid: i64) -> Result<Vec<i64>> {
    Block::find()
        .select_only()
        .column(block::Column::BlockedUserXid)
        .filter(block::Column::UserXid.eq(user_xid))
        .order_by_asc(block::Column::CreatedAt)
        .into_tuple()
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::games::{self, JoinRequest};
    use crate::entities::{GameBracket, GameFormat, GameService};
    use crate::test_utils::*;

    fn request(guild: i64, channel: i64, author: i64) -> JoinRequest {
        JoinRequest {
            guild_xid: guild,
            channel_xid: channel,
            author_xid: author,
            friend_xids: vec![],
            seats: 4,
            format: GameFormat::Commander,
            bracket: GameBracket::None,
            service: GameService::SpellTable,
        }
    }

    #[tokio::test]
    async fn test_upsert_user_truncates_name() -> Result<()> {
        let db = setup_test_db().await?;
        let user = upsert_user(&db, 1, &"a".repeat(150)).await?;
        assert_eq!(user.name.chars().count(), 100);
        assert!(!user.banned);
        Ok(())
    }

    #[tokio::test]
    async fn test_ban_unknown_user() -> Result<()> {
        let db = setup_test_db().await?;
        assert!(!is_banned(&db, 7).await?);

        set_banned(&db, 7, true).await?;
        assert!(is_banned(&db, 7).await?);
        assert_eq!(get_user(&db, 7).await?.unwrap().name, UNKNOWN_USER);

        set_banned(&db, 7, false).await?;
        assert!(!is_banned(&db, 7).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_waiting_and_pending_counts() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_guild(&db, 1).await?;
        create_test_guild(&db, 2).await?;
        create_test_channel(&db, 1, 10).await?;
        create_test_channel(&db, 1, 11).await?;

        assert!(!is_waiting(&db, 100, 10).await?);
        games::upsert(&db, &request(1, 10, 100), false).await?;

        assert!(is_waiting(&db, 100, 10).await?);
        assert!(!is_waiting(&db, 100, 11).await?);
        assert_eq!(pending_games(&db, 100).await?, 1);
        assert!(!queued_in_another_guild(&db, 100, 1).await?);
        assert!(queued_in_another_guild(&db, 100, 2).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_block_and_unblock() -> Result<()> {
        let db = setup_test_db().await?;

        block(&db, 1, &[2, 3, 1]).await?;
        block(&db, 1, &[2]).await?;
        let mut blocked = blocklist(&db, 1).await?;
        blocked.sort_unstable();
        assert_eq!(blocked, vec![2, 3]);

        unblock(&db, 1, &[2]).await?;
        assert_eq!(blocklist(&db, 1).await?, vec![3]);
        assert!(blocklist(&db, 2).await?.is_empty());
        Ok(())
    }
}
