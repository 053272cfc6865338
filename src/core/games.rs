//! Game matching engine - finding, seating, starting and expiring games.
//!
//! A join request is matched against the pending games of its channel that
//! share the requested seats, format, bracket and service. Candidates are
//! tried oldest first; a candidate is taken when every joiner fits and no
//! block exists in either direction between joiners and occupants. When no
//! candidate fits a fresh pending game is created.
//!
//! Occupants of a pending game live in `queues`. Starting a game moves them
//! into `plays` and drops them from every other queue they were waiting in.

use crate::{
    core::channels::validate_seats,
    entities::{
        Block, Game, GameBracket, GameFormat, GameService, GameStatus, Play, Post, Queue,
        UserAward, Watch, block, game, play, post, queue, user_award, watch,
    },
    errors::{Error, Result},
};
use chrono::{Duration, Utc};
use sea_orm::{
    Condition, FromQueryResult, QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*,
    sea_query::{OnConflict, Query},
};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Everything needed to seat a group of players.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinRequest {
    /// Guild the request was made in
    pub guild_xid: i64,
    /// Channel the request was made in
    pub channel_xid: i64,
    /// User who asked for a game
    pub author_xid: i64,
    /// Friends joining together with the author
    pub friend_xids: Vec<i64>,
    /// Seats in the game
    pub seats: i32,
    /// Game format
    pub format: GameFormat,
    /// Commander bracket
    pub bracket: GameBracket,
    /// Service that will host the table
    pub service: GameService,
}

impl JoinRequest {
    /// Friends followed by the author, without duplicates.
    #[must_use]
    pub fn joiners(&self) -> Vec<i64> {
        let mut seen = HashSet::new();
        self.friend_xids
            .iter()
            .chain(std::iter::once(&self.author_xid))
            .copied()
            .filter(|xid| seen.insert(*xid))
            .collect()
    }
}

/// What happened when a user left their pending game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaveOutcome {
    /// Game the user left
    pub game_id: i32,
    /// Whether the game was emptied and therefore expired
    pub deleted: bool,
}

#[derive(Debug, FromQueryResult)]
struct Occupancy {
    game_id: i32,
    occupants: i64,
}

/// Occupant counts for the given games; games with nobody seated are absent.
async fn occupancy<C>(db: &C, game_ids: &[i32]) -> Result<HashMap<i32, i64>>
where
    C: ConnectionTrait,
{
    if game_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = Queue::find()
        .select_only()
        .column(queue::Column::GameId)
        .column_as(Expr::col(queue::Column::UserXid).count(), "occupants")
        .filter(queue::Column::GameId.is_in(game_ids.iter().copied()))
        .group_by(queue::Column::GameId)
        .into_model::<Occupancy>()
        .all(db)
        .await?;
    Ok(rows.into_iter().map(|r| (r.game_id, r.occupants)).collect())
}

/// Users seated in a pending game, by game.
async fn occupants_by_game<C>(db: &C, game_ids: &[i32]) -> Result<HashMap<i32, Vec<i64>>>
where
    C: ConnectionTrait,
{
    let mut seated: HashMap<i32, Vec<i64>> = HashMap::new();
    if game_ids.is_empty() {
        return Ok(seated);
    }
    let rows = Queue::find()
        .filter(queue::Column::GameId.is_in(game_ids.iter().copied()))
        .all(db)
        .await?;
    for row in rows {
        seated.entry(row.game_id).or_default().push(row.user_xid);
    }
    Ok(seated)
}

/// Everyone on either side of a block involving one of `xids`.
async fn block_partners<C>(db: &C, xids: &[i64]) -> Result<HashSet<i64>>
where
    C: ConnectionTrait,
{
    let wanted: HashSet<i64> = xids.iter().copied().collect();
    let rows = Block::find()
        .filter(
            Condition::any()
                .add(block::Column::UserXid.is_in(xids.iter().copied()))
                .add(block::Column::BlockedUserXid.is_in(xids.iter().copied())),
        )
        .all(db)
        .await?;

    let mut partners = HashSet::new();
    for row in rows {
        if wanted.contains(&row.user_xid) {
            partners.insert(row.blocked_user_xid);
        }
        if wanted.contains(&row.blocked_user_xid) {
            partners.insert(row.user_xid);
        }
    }
    Ok(partners)
}

async fn touch<C>(db: &C, game_id: i32) -> Result<()>
where
    C: ConnectionTrait,
{
    Game::update_many()
        .col_expr(game::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(game::Column::Id.eq(game_id))
        .exec(db)
        .await?;
    Ok(())
}

async fn enqueue<C>(db: &C, game_id: i32, user_xids: &[i64]) -> Result<()>
where
    C: ConnectionTrait,
{
    if user_xids.is_empty() {
        return Ok(());
    }
    let rows = user_xids.iter().map(|&xid| queue::ActiveModel {
        user_xid: Set(xid),
        game_id: Set(game_id),
    });
    Queue::insert_many(rows)
        .on_conflict(
            OnConflict::columns([queue::Column::UserXid, queue::Column::GameId])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;
    Ok(())
}

/// Finds the oldest pending game that can seat every joiner of the request.
pub async fn find_existing<C>(db: &C, request: &JoinRequest) -> Result<Option<game::Model>>
where
    C: ConnectionTrait,
{
    let candidates = Game::find()
        .filter(game::Column::GuildXid.eq(request.guild_xid))
        .filter(game::Column::ChannelXid.eq(request.channel_xid))
        .filter(game::Column::Seats.eq(request.seats))
        .filter(game::Column::Format.eq(request.format))
        .filter(game::Column::Bracket.eq(request.bracket))
        .filter(game::Column::Service.eq(request.service))
        .filter(game::Column::Status.eq(GameStatus::Pending))
        .filter(game::Column::DeletedAt.is_null())
        .order_by_asc(game::Column::UpdatedAt)
        .all(db)
        .await?;
    if candidates.is_empty() {
        return Ok(None);
    }

    let joiners = request.joiners();
    let required = i64::try_from(joiners.len()).unwrap_or(i64::MAX);
    let ids: Vec<i32> = candidates.iter().map(|g| g.id).collect();
    let counts = occupancy(db, &ids).await?;

    let roomy: Vec<game::Model> = candidates
        .into_iter()
        .filter(|g| counts.get(&g.id).copied().unwrap_or(0) + required <= i64::from(g.seats))
        .collect();
    if roomy.is_empty() {
        return Ok(None);
    }

    let partners = block_partners(db, &joiners).await?;
    let roomy_ids: Vec<i32> = roomy.iter().map(|g| g.id).collect();
    let seated = occupants_by_game(db, &roomy_ids).await?;

    Ok(roomy.into_iter().find(|g| {
        seated
            .get(&g.id)
            .is_none_or(|players| !players.iter().any(|xid| partners.contains(xid)))
    }))
}

/// Seats every joiner of the request, returning the game and whether it is new.
///
/// With `create_new` the matching step is skipped and a fresh game is made.
pub async fn upsert(
    db: &DatabaseConnection,
    request: &JoinRequest,
    create_new: bool,
) -> Result<(game::Model, bool)> {
    let seats = validate_seats(request.seats)?;
    let joiners = request.joiners();
    if joiners.len() > usize::try_from(seats).unwrap_or(0) {
        return Err(Error::TooManyPlayers {
            requested: joiners.len(),
            seats,
        });
    }

    let txn = db.begin().await?;

    let existing = if create_new {
        None
    } else {
        find_existing(&txn, request).await?
    };

    let (game_id, new) = match existing {
        Some(found) => (found.id, false),
        None => {
            let now = Utc::now();
            let created = game::ActiveModel {
                created_at: Set(now),
                updated_at: Set(now),
                guild_xid: Set(request.guild_xid),
                channel_xid: Set(request.channel_xid),
                seats: Set(seats),
                status: Set(GameStatus::Pending),
                format: Set(request.format),
                bracket: Set(request.bracket),
                service: Set(request.service),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
            (created.id, true)
        }
    };

    enqueue(&txn, game_id, &joiners).await?;
    touch(&txn, game_id).await?;
    let game = Game::find_by_id(game_id)
        .one(&txn)
        .await?
        .ok_or(Error::GameNotFound { id: game_id })?;

    txn.commit().await?;

    info!(game_id, new, players = joiners.len(), "Seated players");
    Ok((game, new))
}

/// Seats one user in a specific pending game.
pub async fn add_player(db: &DatabaseConnection, game_id: i32, user_xid: i64) -> Result<game::Model> {
    let txn = db.begin().await?;

    let game = select(&txn, game_id).await?.ok_or(Error::GameNotFound { id: game_id })?;
    if !game.is_pending() {
        return Err(Error::GameAlreadyStarted { id: game_id });
    }
    let seated = occupancy(&txn, &[game_id]).await?.get(&game_id).copied().unwrap_or(0);
    if seated + 1 > i64::from(game.seats) {
        return Err(Error::GameFull { id: game_id });
    }

    enqueue(&txn, game_id, &[user_xid]).await?;
    touch(&txn, game_id).await?;
    let game = select(&txn, game_id).await?.ok_or(Error::GameNotFound { id: game_id })?;

    txn.commit().await?;
    Ok(game)
}

/// Whether every seat of the game is taken.
pub async fn fully_seated<C>(db: &C, game_id: i32) -> Result<bool>
where
    C: ConnectionTrait,
{
    let game = select(db, game_id).await?.ok_or(Error::GameNotFound { id: game_id })?;
    let seated = occupancy(db, &[game_id]).await?.get(&game_id).copied().unwrap_or(0);
    Ok(seated == i64::from(game.seats))
}

/// Other games that share at least one occupant with this one.
pub async fn other_game_ids<C>(db: &C, game_id: i32) -> Result<Vec<i32>>
where
    C: ConnectionTrait,
{
    let occupants = Query::select()
        .column(queue::Column::UserXid)
        .from(queue::Entity)
        .and_where(queue::Column::GameId.eq(game_id))
        .to_owned();

    Queue::find()
        .select_only()
        .column(queue::Column::GameId)
        .filter(queue::Column::UserXid.in_subquery(occupants))
        .filter(queue::Column::GameId.ne(game_id))
        .distinct()
        .order_by_asc(queue::Column::GameId)
        .into_tuple()
        .all(db)
        .await
        .map_err(Into::into)
}

/// Starts a pending game with the given table link.
///
/// Occupants become plays, get a user award row for the guild and leave
/// every queue they were in. Returns the other games that lost players.
pub async fn make_ready(
    db: &DatabaseConnection,
    game_id: i32,
    game_link: Option<String>,
    password: Option<String>,
) -> Result<Vec<i32>> {
    let txn = db.begin().await?;

    let game = select(&txn, game_id).await?.ok_or(Error::GameNotFound { id: game_id })?;
    if !game.is_pending() {
        return Err(Error::GameAlreadyStarted { id: game_id });
    }
    let players = queued_xids(&txn, game_id).await?;
    let others = other_game_ids(&txn, game_id).await?;

    let now = Utc::now();
    let guild_xid = game.guild_xid;
    let mut started: game::ActiveModel = game.into();
    started.status = Set(GameStatus::Started);
    started.started_at = Set(Some(now));
    started.updated_at = Set(now);
    started.game_link = Set(game_link);
    started.password = Set(password);
    started.update(&txn).await?;

    if !players.is_empty() {
        let plays = players.iter().map(|&xid| play::ActiveModel {
            user_xid: Set(xid),
            game_id: Set(game_id),
            points: Set(None),
            created_at: Set(now),
            confirmed_at: Set(None),
        });
        Play::insert_many(plays)
            .on_conflict(
                OnConflict::columns([play::Column::UserXid, play::Column::GameId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;

        let awards = players.iter().map(|&xid| user_award::ActiveModel {
            user_xid: Set(xid),
            guild_xid: Set(guild_xid),
            guild_award_id: Set(None),
        });
        UserAward::insert_many(awards)
            .on_conflict(
                OnConflict::columns([user_award::Column::UserXid, user_award::Column::GuildXid])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;

        Queue::delete_many()
            .filter(queue::Column::UserXid.is_in(players.iter().copied()))
            .exec(&txn)
            .await?;
    }

    txn.commit().await?;

    info!(game_id, players = players.len(), "Game started");
    Ok(others)
}

/// Whether `user_xid` and any occupant of the game have blocked one another.
pub async fn blocked<C>(db: &C, game_id: i32, user_xid: i64) -> Result<bool>
where
    C: ConnectionTrait,
{
    let partners = block_partners(db, &[user_xid]).await?;
    if partners.is_empty() {
        return Ok(false);
    }
    let players = queued_xids(db, game_id).await?;
    Ok(players.iter().any(|xid| partners.contains(xid)))
}

/// Drops from `others` anyone the author blocked and anyone who blocked the
/// author or one of the others.
pub async fn filter_blocked_list<C>(db: &C, author_xid: i64, others: &[i64]) -> Result<Vec<i64>>
where
    C: ConnectionTrait,
{
    let blocked_by_author: HashSet<i64> = Block::find()
        .filter(block::Column::UserXid.eq(author_xid))
        .all(db)
        .await?
        .into_iter()
        .map(|b| b.blocked_user_xid)
        .collect();

    let involved = others.iter().copied().chain(std::iter::once(author_xid));
    let blockers: HashSet<i64> = Block::find()
        .filter(block::Column::BlockedUserXid.is_in(involved))
        .all(db)
        .await?
        .into_iter()
        .map(|b| b.user_xid)
        .collect();

    let mut kept = Vec::new();
    for &xid in others {
        if !blocked_by_author.contains(&xid) && !blockers.contains(&xid) && !kept.contains(&xid) {
            kept.push(xid);
        }
    }
    Ok(kept)
}

/// Keeps the users that may join one more game: within the pending game
/// limit and not queued in another guild.
pub async fn filter_pending_games<C>(
    db: &C,
    user_xids: &[i64],
    guild_xid: i64,
    max_pending: u64,
) -> Result<Vec<i64>>
where
    C: ConnectionTrait,
{
    let mut kept = Vec::new();
    for &xid in user_xids {
        let pending = crate::core::users::pending_games(db, xid).await?;
        if pending + 1 > max_pending {
            debug!(user_xid = xid, pending, "Dropping friend at pending game limit");
            continue;
        }
        if crate::core::users::queued_in_another_guild(db, xid, guild_xid).await? {
            debug!(user_xid = xid, "Dropping friend queued in another guild");
            continue;
        }
        kept.push(xid);
    }
    Ok(kept)
}

/// Finds a game by id.
pub async fn select<C>(db: &C, game_id: i32) -> Result<Option<game::Model>>
where
    C: ConnectionTrait,
{
    Game::find_by_id(game_id).one(db).await.map_err(Into::into)
}

/// Finds the game shown by a Discord message.
pub async fn select_by_message_xid<C>(db: &C, message_xid: i64) -> Result<Option<game::Model>>
where
    C: ConnectionTrait,
{
    let Some(found) = Post::find()
        .filter(post::Column::MessageXid.eq(message_xid))
        .one(db)
        .await?
    else {
        return Ok(None);
    };
    select(db, found.game_id).await
}

/// Finds the game that owns a voice channel.
pub async fn select_by_voice_xid<C>(db: &C, voice_xid: i64) -> Result<Option<game::Model>>
where
    C: ConnectionTrait,
{
    Game::find()
        .filter(game::Column::VoiceXid.eq(voice_xid))
        .one(db)
        .await
        .map_err(Into::into)
}

async fn queued_xids<C>(db: &C, game_id: i32) -> Result<Vec<i64>>
where
    C: ConnectionTrait,
{
    Queue::find()
        .select_only()
        .column(queue::Column::UserXid)
        .filter(queue::Column::GameId.eq(game_id))
        .order_by_asc(queue::Column::UserXid)
        .into_tuple()
        .all(db)
        .await
        .map_err(Into::into)
}

/// Players of a game: occupants while pending, recorded plays once started.
pub async fn player_xids<C>(db: &C, game: &game::Model) -> Result<Vec<i64>>
where
    C: ConnectionTrait,
{
    if game.status == GameStatus::Pending {
        return queued_xids(db, game.id).await;
    }
    Play::find()
        .select_only()
        .column(play::Column::UserXid)
        .filter(play::Column::GameId.eq(game.id))
        .order_by_asc(play::Column::UserXid)
        .into_tuple()
        .all(db)
        .await
        .map_err(Into::into)
}

/// Recorded plays of a started game.
pub async fn plays<C>(db: &C, game_id: i32) -> Result<Vec<play::Model>>
where
    C: ConnectionTrait,
{
    Play::find()
        .filter(play::Column::GameId.eq(game_id))
        .order_by_asc(play::Column::UserXid)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Every post showing the game, original channel first.
pub async fn posts<C>(db: &C, game_id: i32) -> Result<Vec<post::Model>>
where
    C: ConnectionTrait,
{
    Post::find()
        .filter(post::Column::GameId.eq(game_id))
        .order_by_asc(post::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Records the message showing a game in a channel.
pub async fn add_post<C>(
    db: &C,
    game_id: i32,
    guild_xid: i64,
    channel_xid: i64,
    message_xid: i64,
) -> Result<()>
where
    C: ConnectionTrait,
{
    let model = post::ActiveModel {
        game_id: Set(game_id),
        guild_xid: Set(guild_xid),
        channel_xid: Set(channel_xid),
        message_xid: Set(message_xid),
        created_at: Set(Utc::now()),
    };
    Post::insert(model)
        .on_conflict(
            OnConflict::columns([
                post::Column::GameId,
                post::Column::GuildXid,
                post::Column::ChannelXid,
            ])
            .update_column(post::Column::MessageXid)
            .to_owned(),
        )
        .exec_without_returning(db)
        .await?;
    Ok(())
}

/// Stores the voice channel created for a game.
pub async fn set_voice<C>(
    db: &C,
    game_id: i32,
    voice_xid: i64,
    invite_link: Option<String>,
) -> Result<()>
where
    C: ConnectionTrait,
{
    Game::update_many()
        .col_expr(game::Column::VoiceXid, Expr::value(voice_xid))
        .col_expr(game::Column::VoiceInviteLink, Expr::value(invite_link))
        .filter(game::Column::Id.eq(game_id))
        .exec(db)
        .await?;
    Ok(())
}

/// Moderator notes for any watched players, keyed by player.
pub async fn watch_notes<C>(
    db: &C,
    guild_xid: i64,
    player_xids: &[i64],
) -> Result<HashMap<i64, Option<String>>>
where
    C: ConnectionTrait,
{
    let rows: Vec<watch::Model> = Watch::find()
        .filter(watch::Column::GuildXid.eq(guild_xid))
        .filter(watch::Column::UserXid.is_in(player_xids.iter().copied()))
        .all(db)
        .await?;
    Ok(rows.into_iter().map(|w| (w.user_xid, w.note)).collect())
}

/// Pending games nobody has touched for `expire_minutes`.
pub async fn inactive_games<C>(db: &C, expire_minutes: i64) -> Result<Vec<game::Model>>
where
    C: ConnectionTrait,
{
    let limit = Utc::now() - Duration::minutes(expire_minutes);
    Game::find()
        .filter(game::Column::Status.eq(GameStatus::Pending))
        .filter(game::Column::UpdatedAt.lte(limit))
        .filter(game::Column::DeletedAt.is_null())
        .order_by_asc(game::Column::UpdatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Soft deletes the games and empties their queues.
///
/// Returns how many players were dequeued.
pub async fn delete_games(db: &DatabaseConnection, game_ids: &[i32]) -> Result<u64> {
    if game_ids.is_empty() {
        return Ok(0);
    }
    let txn = db.begin().await?;

    Game::update_many()
        .col_expr(game::Column::DeletedAt, Expr::value(Some(Utc::now())))
        .filter(game::Column::Id.is_in(game_ids.iter().copied()))
        .exec(&txn)
        .await?;
    let dequeued = Queue::delete_many()
        .filter(queue::Column::GameId.is_in(game_ids.iter().copied()))
        .exec(&txn)
        .await?
        .rows_affected;

    txn.commit().await?;

    info!(games = game_ids.len(), dequeued, "Deleted games");
    Ok(dequeued)
}

/// Removes the users from every queue, returning the games they left.
pub async fn dequeue_players<C>(db: &C, user_xids: &[i64]) -> Result<Vec<i32>>
where
    C: ConnectionTrait,
{
    if user_xids.is_empty() {
        return Ok(Vec::new());
    }
    let mut game_ids: Vec<i32> = Queue::find()
        .select_only()
        .column(queue::Column::GameId)
        .filter(queue::Column::UserXid.is_in(user_xids.iter().copied()))
        .distinct()
        .into_tuple()
        .all(db)
        .await?;
    game_ids.sort_unstable();

    Queue::delete_many()
        .filter(queue::Column::UserXid.is_in(user_xids.iter().copied()))
        .exec(db)
        .await?;
    Ok(game_ids)
}

/// Removes the users from every queue, expiring games nobody is left in.
///
/// Returns one outcome per game the users left, in game id order.
pub async fn remove_players(
    db: &DatabaseConnection,
    user_xids: &[i64],
) -> Result<Vec<LeaveOutcome>> {
    let txn = db.begin().await?;

    let game_ids = dequeue_players(&txn, user_xids).await?;
    let remaining = occupancy(&txn, &game_ids).await?;
    let emptied: Vec<i32> = game_ids
        .iter()
        .copied()
        .filter(|id| remaining.get(id).copied().unwrap_or(0) == 0)
        .collect();
    if !emptied.is_empty() {
        Game::update_many()
            .col_expr(game::Column::DeletedAt, Expr::value(Some(Utc::now())))
            .filter(game::Column::Id.is_in(emptied.iter().copied()))
            .exec(&txn)
            .await?;
    }

    txn.commit().await?;

    info!(games = game_ids.len(), emptied = emptied.len(), "Removed players from games");
    Ok(game_ids
        .into_iter()
        .map(|game_id| LeaveOutcome {
            game_id,
            deleted: emptied.contains(&game_id),
        })
        .collect())
}

/// Takes the user out of a pending game.
///
/// A game left without any occupant is expired. Returns `None` when the user
/// was not seated in the game.
pub async fn leave_game(
    db: &DatabaseConnection,
    game_id: i32,
    user_xid: i64,
) -> Result<Option<LeaveOutcome>> {
    let txn = db.begin().await?;

    let left = Queue::delete_many()
        .filter(queue::Column::UserXid.eq(user_xid))
        .filter(queue::Column::GameId.eq(game_id))
        .exec(&txn)
        .await?
        .rows_affected;
    if left == 0 {
        return Ok(None);
    }

    let remaining = occupancy(&txn, &[game_id]).await?.get(&game_id).copied().unwrap_or(0);
    let deleted = remaining == 0;
    if deleted {
        Game::update_many()
            .col_expr(game::Column::DeletedAt, Expr::value(Some(Utc::now())))
            .filter(game::Column::Id.eq(game_id))
            .exec(&txn)
            .await?;
    } else {
        touch(&txn, game_id).await?;
    }

    txn.commit().await?;

    info!(game_id, user_xid, deleted, "Player left game");
    Ok(Some(LeaveOutcome { game_id, deleted }))
}

/// Takes the user out of the pending game they wait in for a channel.
pub async fn leave_channel_game(
    db: &DatabaseConnection,
    user_xid: i64,
    channel_xid: i64,
) -> Result<Option<LeaveOutcome>> {
    let Some(game) = crate::core::users::current_game(db, user_xid, channel_xid).await? else {
        return Ok(None);
    };
    leave_game(db, game.id, user_xid).await
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::users;
    use crate::test_utils::*;

    fn request(author: i64, friends: &[i64]) -> JoinRequest {
        JoinRequest {
            guild_xid: 1,
            channel_xid: 10,
            author_xid: author,
            friend_xids: friends.to_vec(),
            seats: 4,
            format: GameFormat::Commander,
            bracket: GameBracket::None,
            service: GameService::SpellTable,
        }
    }

    async fn setup() -> Result<DatabaseConnection> {
        let db = setup_test_db().await?;
        create_test_guild(&db, 1).await?;
        create_test_channel(&db, 1, 10).await?;
        Ok(db)
    }

    #[test]
    fn test_joiners_dedup_and_order() {
        let req = request(1, &[2, 3, 2, 1]);
        assert_eq!(req.joiners(), vec![2, 3, 1]);
    }

    #[tokio::test]
    async fn test_upsert_creates_then_matches() -> Result<()> {
        let db = setup().await?;

        let (first, new) = upsert(&db, &request(100, &[]), false).await?;
        assert!(new);
        assert_eq!(first.status, GameStatus::Pending);

        let (second, new) = upsert(&db, &request(101, &[102]), false).await?;
        assert!(!new);
        assert_eq!(second.id, first.id);
        assert_eq!(player_xids(&db, &second).await?, vec![100, 101, 102]);
        assert!(!fully_seated(&db, first.id).await?);

        Ok(())
    }

    #[tokio::test]
    async fn test_upsert_respects_capacity() -> Result<()> {
        let db = setup().await?;

        let (first, _) = upsert(&db, &request(100, &[101, 102]), false).await?;
        // Two more joiners do not fit in the single open seat
        let (second, new) = upsert(&db, &request(200, &[201]), false).await?;
        assert!(new);
        assert_ne!(second.id, first.id);

        // A single joiner fills the first game
        let (third, new) = upsert(&db, &request(300, &[]), false).await?;
        assert!(!new);
        assert_eq!(third.id, first.id);
        assert!(fully_seated(&db, first.id).await?);

        Ok(())
    }

    #[tokio::test]
    async fn test_upsert_requires_matching_attributes() -> Result<()> {
        let db = setup().await?;
        let (first, _) = upsert(&db, &request(100, &[]), false).await?;

        let mut other_format = request(101, &[]);
        other_format.format = GameFormat::Modern;
        let (game, new) = upsert(&db, &other_format, false).await?;
        assert!(new);
        assert_ne!(game.id, first.id);

        let mut other_bracket = request(102, &[]);
        other_bracket.bracket = GameBracket::Core;
        assert!(upsert(&db, &other_bracket, false).await?.1);

        let mut other_service = request(103, &[]);
        other_service.service = GameService::Convoke;
        assert!(upsert(&db, &other_service, false).await?.1);

        let mut other_seats = request(104, &[]);
        other_seats.seats = 2;
        assert!(upsert(&db, &other_seats, false).await?.1);

        let mut other_channel = request(105, &[]);
        other_channel.channel_xid = 11;
        create_test_channel(&db, 1, 11).await?;
        assert!(upsert(&db, &other_channel, false).await?.1);

        Ok(())
    }

    #[tokio::test]
    async fn test_upsert_create_new_skips_matching() -> Result<()> {
        let db = setup().await?;
        let (first, _) = upsert(&db, &request(100, &[]), false).await?;
        let (second, new) = upsert(&db, &request(101, &[]), true).await?;
        assert!(new);
        assert_ne!(first.id, second.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_upsert_rejects_bad_requests() -> Result<()> {
        let db = setup().await?;

        let mut req = request(100, &[]);
        req.seats = 5;
        assert!(matches!(upsert(&db, &req, false).await, Err(Error::InvalidSeats { seats: 5 })));
        req.seats = 1;
        assert!(matches!(upsert(&db, &req, false).await, Err(Error::InvalidSeats { seats: 1 })));

        let mut req = request(100, &[101, 102]);
        req.seats = 2;
        assert!(matches!(
            upsert(&db, &req, false).await,
            Err(Error::TooManyPlayers { requested: 3, seats: 2 })
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_blocks_prevent_matching_both_ways() -> Result<()> {
        let db = setup().await?;
        let (first, _) = upsert(&db, &request(100, &[]), false).await?;

        // Joiner blocked an occupant
        users::block(&db, 200, &[100]).await?;
        let (game, new) = upsert(&db, &request(200, &[]), false).await?;
        assert!(new);
        assert_ne!(game.id, first.id);

        // Occupant blocked a joiner's friend
        users::block(&db, 100, &[301]).await?;
        let (game, _) = upsert(&db, &request(300, &[301]), false).await?;
        assert_ne!(game.id, first.id);

        assert!(blocked(&db, first.id, 301).await?);
        assert!(blocked(&db, first.id, 200).await?);
        assert!(!blocked(&db, first.id, 400).await?);

        Ok(())
    }

    #[tokio::test]
    async fn test_oldest_candidate_wins() -> Result<()> {
        let db = setup().await?;
        let (older, _) = upsert(&db, &request(100, &[]), true).await?;
        let (_newer, _) = upsert(&db, &request(101, &[]), true).await?;

        let (game, new) = upsert(&db, &request(102, &[]), false).await?;
        assert!(!new);
        assert_eq!(game.id, older.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_add_player_limits() -> Result<()> {
        let db = setup().await?;
        let mut req = request(100, &[]);
        req.seats = 2;
        let (game, _) = upsert(&db, &req, false).await?;

        add_player(&db, game.id, 101).await?;
        assert!(fully_seated(&db, game.id).await?);
        assert!(matches!(add_player(&db, game.id, 102).await, Err(Error::GameFull { .. })));

        make_ready(&db, game.id, None, None).await?;
        assert!(matches!(
            add_player(&db, game.id, 102).await,
            Err(Error::GameAlreadyStarted { .. })
        ));
        assert!(matches!(add_player(&db, 999, 102).await, Err(Error::GameNotFound { id: 999 })));

        Ok(())
    }

    #[tokio::test]
    async fn test_make_ready_moves_players() -> Result<()> {
        let db = setup().await?;
        let mut req = request(100, &[101]);
        req.seats = 2;
        let (game, _) = upsert(&db, &req, false).await?;

        // 101 also waits in a second game
        let (other, _) = upsert(&db, &request(101, &[]), true).await?;
        assert_eq!(other_game_ids(&db, game.id).await?, vec![other.id]);

        let others = make_ready(
            &db,
            game.id,
            Some("https://spelltable.wizards.com/game/abc".to_string()),
            None,
        )
        .await?;
        assert_eq!(others, vec![other.id]);

        let started = select(&db, game.id).await?.unwrap();
        assert_eq!(started.status, GameStatus::Started);
        assert!(started.started_at.is_some());
        assert_eq!(started.game_link.as_deref(), Some("https://spelltable.wizards.com/game/abc"));
        assert_eq!(player_xids(&db, &started).await?, vec![100, 101]);

        assert_eq!(users::pending_games(&db, 101).await?, 0);
        let other = select(&db, other.id).await?.unwrap();
        assert!(player_xids(&db, &other).await?.is_empty());

        let awards = UserAward::find().all(&db).await?;
        assert_eq!(awards.len(), 2);
        assert!(awards.iter().all(|a| a.guild_xid == 1 && a.guild_award_id.is_none()));

        assert!(matches!(
            make_ready(&db, game.id, None, None).await,
            Err(Error::GameAlreadyStarted { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_filter_blocked_list() -> Result<()> {
        let db = setup_test_db().await?;
        users::block(&db, 1, &[2]).await?;
        users::block(&db, 3, &[1]).await?;
        users::block(&db, 4, &[5]).await?;

        let kept = filter_blocked_list(&db, 1, &[2, 3, 4, 5, 6]).await?;
        assert_eq!(kept, vec![5, 6]);
        Ok(())
    }

    #[tokio::test]
    async fn test_filter_pending_games() -> Result<()> {
        let db = setup().await?;
        create_test_guild(&db, 2).await?;
        create_test_channel(&db, 2, 20).await?;

        upsert(&db, &request(100, &[]), true).await?;
        upsert(&db, &request(100, &[]), true).await?;
        let mut elsewhere = request(101, &[]);
        elsewhere.guild_xid = 2;
        elsewhere.channel_xid = 20;
        upsert(&db, &elsewhere, false).await?;

        let kept = filter_pending_games(&db, &[100, 101, 102], 1, 2).await?;
        assert_eq!(kept, vec![102]);
        let kept = filter_pending_games(&db, &[100, 101, 102], 1, 5).await?;
        assert_eq!(kept, vec![100, 102]);
        Ok(())
    }

    #[tokio::test]
    async fn test_posts_and_lookups() -> Result<()> {
        let db = setup().await?;
        let (game, _) = upsert(&db, &request(100, &[]), false).await?;

        add_post(&db, game.id, 1, 10, 5000).await?;
        add_post(&db, game.id, 1, 10, 5001).await?;
        let found = posts(&db, game.id).await?;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].message_xid, 5001);
        assert_eq!(select_by_message_xid(&db, 5001).await?.unwrap().id, game.id);
        assert!(select_by_message_xid(&db, 5000).await?.is_none());

        set_voice(&db, game.id, 777, Some("https://discord.gg/x".to_string())).await?;
        let voiced = select_by_voice_xid(&db, 777).await?.unwrap();
        assert_eq!(voiced.id, game.id);
        assert_eq!(voiced.voice_invite_link.as_deref(), Some("https://discord.gg/x"));
        Ok(())
    }

    #[tokio::test]
    async fn test_watch_notes() -> Result<()> {
        let db = setup().await?;
        crate::core::watches::watch(&db, 1, 100, Some("keep an eye out")).await?;
        crate::core::watches::watch(&db, 2, 101, None).await?;

        let notes = watch_notes(&db, 1, &[100, 101]).await?;
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[&100].as_deref(), Some("keep an eye out"));
        Ok(())
    }

    #[tokio::test]
    async fn test_inactive_and_delete_games() -> Result<()> {
        let db = setup().await?;
        let (stale, _) = upsert(&db, &request(100, &[101]), true).await?;
        let (fresh, _) = upsert(&db, &request(102, &[]), true).await?;

        let old = Utc::now() - Duration::minutes(60);
        Game::update_many()
            .col_expr(game::Column::UpdatedAt, Expr::value(old))
            .filter(game::Column::Id.eq(stale.id))
            .exec(&db)
            .await?;

        let inactive = inactive_games(&db, 45).await?;
        assert_eq!(inactive.iter().map(|g| g.id).collect::<Vec<_>>(), vec![stale.id]);

        assert_eq!(delete_games(&db, &[stale.id]).await?, 2);
        assert!(inactive_games(&db, 45).await?.is_empty());
        assert!(select(&db, stale.id).await?.unwrap().deleted_at.is_some());
        assert!(select(&db, fresh.id).await?.unwrap().deleted_at.is_none());
        assert_eq!(delete_games(&db, &[]).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_dequeue_players() -> Result<()> {
        let db = setup().await?;
        let (a, _) = upsert(&db, &request(100, &[]), true).await?;
        let (b, _) = upsert(&db, &request(100, &[101]), true).await?;

        assert_eq!(dequeue_players(&db, &[100]).await?, vec![a.id, b.id]);
        assert_eq!(users::pending_games(&db, 100).await?, 0);
        assert_eq!(users::pending_games(&db, 101).await?, 1);
        assert!(dequeue_players(&db, &[]).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_remove_players_expires_empty_games() -> Result<()> {
        let db = setup().await?;
        let (alone, _) = upsert(&db, &request(100, &[]), true).await?;
        let (shared, _) = upsert(&db, &request(100, &[101]), true).await?;

        let outcomes = remove_players(&db, &[100]).await?;
        assert_eq!(
            outcomes,
            vec![
                LeaveOutcome { game_id: alone.id, deleted: true },
                LeaveOutcome { game_id: shared.id, deleted: false },
            ]
        );
        assert!(select(&db, alone.id).await?.unwrap().deleted_at.is_some());
        assert!(select(&db, shared.id).await?.unwrap().deleted_at.is_none());
        assert_eq!(users::pending_games(&db, 101).await?, 1);
        assert!(remove_players(&db, &[100]).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_leave_channel_game() -> Result<()> {
        let db = setup().await?;
        let (game, _) = upsert(&db, &request(100, &[101]), false).await?;

        let outcome = leave_channel_game(&db, 100, 10).await?.unwrap();
        assert_eq!(outcome, LeaveOutcome { game_id: game.id, deleted: false });
        assert!(leave_channel_game(&db, 100, 10).await?.is_none());

        let outcome = leave_channel_game(&db, 101, 10).await?.unwrap();
        assert!(outcome.deleted);
        assert!(select(&db, game.id).await?.unwrap().deleted_at.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_leave_game_not_seated() -> Result<()> {
        let db = setup().await?;
        let (game, _) = upsert(&db, &request(100, &[]), false).await?;
        assert!(leave_game(&db, game.id, 555).await?.is_none());
        assert!(select(&db, game.id).await?.unwrap().deleted_at.is_none());
        Ok(())
    }
}
