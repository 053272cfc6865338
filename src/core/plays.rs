//! Play history - points reporting and paginated game records.

use crate::{
    entities::{Channel, Game, GameStatus, Guild, Play, Post, User, channel, game, play, post, user},
    errors::{Error, Result},
};
use sea_orm::{
    QueryOrder, QuerySelect, Set, prelude::*,
    sea_query::{OnConflict, Query},
};
use serde::Serialize;
use std::collections::HashMap;

/// Games per page of a user's records.
pub const USER_PAGE_SIZE: u64 = 25;
/// Games per page of a channel's records.
pub const CHANNEL_PAGE_SIZE: u64 = 10;
/// Players listed in a guild's analytics.
pub const TOP_PLAYERS: usize = 10;
/// Days of daily activity shown in a guild's analytics.
pub const ANALYTICS_DAYS: i64 = 30;

/// One player's result in a recorded game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Score {
    /// Discord user id
    pub user_xid: i64,
    /// Display name, when known
    pub name: Option<String>,
    /// Reported points
    pub points: Option<i32>,
    /// Whether the player confirmed the game's points
    pub confirmed: bool,
}

/// A started game as shown in play history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameRecord {
    /// SpellBot game id
    pub id: i32,
    /// Last update, in milliseconds since the epoch
    pub updated_at: i64,
    /// Guild id
    pub guild: i64,
    /// Channel id
    pub channel: i64,
    /// Message showing the game, when one was posted
    pub message: Option<i64>,
    /// Table link
    pub link: Option<String>,
    /// Format name
    pub format: String,
    /// Guild name
    pub guild_name: Option<String>,
    /// Channel name
    pub channel_name: Option<String>,
    /// Player results
    pub scores: Vec<Score>,
}

/// Games counted under one label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tally {
    /// Format name, channel name, user name or day
    pub label: String,
    /// Discord id behind the label, when there is one
    pub xid: Option<i64>,
    /// Started games
    pub games: u64,
}

/// Activity summary of one guild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuildAnalytics {
    /// Guild id
    pub guild_xid: i64,
    /// Guild name
    pub name: Option<String>,
    /// Started games
    pub started_games: u64,
    /// Games still seating players
    pub pending_games: u64,
    /// Pending games that expired or emptied out
    pub expired_games: u64,
    /// Distinct players over every started game
    pub unique_players: u64,
    /// Started games per format, busiest first
    pub formats: Vec<Tally>,
    /// Started games per channel, busiest first
    pub channels: Vec<Tally>,
    /// Most active players
    pub top_players: Vec<Tally>,
    /// Games started per day over the recent window, oldest first
    pub daily: Vec<Tally>,
}

/// Offset of a records page, or `None` when it lies past any possible row.
fn page_offset(page: u64, size: u64) -> Option<u64> {
    page.checked_mul(size).filter(|offset| i64::try_from(*offset).is_ok())
}

/// Records a player's points for a started game they played in.
///
/// In channels requiring confirmation, points stop changing once any player
/// has confirmed them.
pub async fn record_points(
    db: &DatabaseConnection,
    game_id: i32,
    user_xid: i64,
    points: i32,
) -> Result<()> {
    let played = Play::find_by_id((user_xid, game_id)).one(db).await?;
    let Some(existing) = played else {
        return Err(Error::NotAPlayer { game_id, user_xid });
    };
    if requires_confirmation(db, game_id).await? {
        if existing.confirmed_at.is_some() {
            return Err(Error::AlreadyConfirmed { game_id });
        }
        let confirmed = Play::find()
            .filter(play::Column::GameId.eq(game_id))
            .filter(play::Column::ConfirmedAt.is_not_null())
            .count(db)
            .await?;
        if confirmed > 0 {
            return Err(Error::PointsLocked { game_id });
        }
    }

    let model = play::ActiveModel {
        user_xid: Set(user_xid),
        game_id: Set(game_id),
        points: Set(Some(points)),
        created_at: Set(existing.created_at),
        confirmed_at: Set(existing.confirmed_at),
    };
    Play::insert(model)
        .on_conflict(
            OnConflict::columns([play::Column::UserXid, play::Column::GameId])
                .update_column(play::Column::Points)
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;
    Ok(())
}

/// Whether the channel a game was played in requires points confirmation.
pub async fn requires_confirmation(db: &DatabaseConnection, game_id: i32) -> Result<bool> {
    let Some(game) = Game::find_by_id(game_id).one(db).await? else {
        return Ok(false);
    };
    Ok(Channel::find_by_id(game.channel_xid)
        .one(db)
        .await?
        .is_some_and(|c| c.require_confirmation))
}

/// Confirms the reported points of a game for one of its players.
///
/// Every player must have reported first. Returns whether every player has
/// now confirmed.
#[tracing::instrument(skip(db))]
pub async fn confirm_points(db: &DatabaseConnection, game_id: i32, user_xid: i64) -> Result<bool> {
    let plays = Play::find()
        .filter(play::Column::GameId.eq(game_id))
        .all(db)
        .await?;
    let Some(mine) = plays.iter().find(|p| p.user_xid == user_xid) else {
        return Err(Error::NotAPlayer { game_id, user_xid });
    };
    if plays.iter().any(|p| p.points.is_none()) {
        return Err(Error::PointsMissing { game_id });
    }

    if mine.confirmed_at.is_none() {
        Play::update_many()
            .col_expr(play::Column::ConfirmedAt, Expr::value(Some(chrono::Utc::now())))
            .filter(play::Column::GameId.eq(game_id))
            .filter(play::Column::UserXid.eq(user_xid))
            .exec(db)
            .await?;
    }
    let others_confirmed = plays
        .iter()
        .filter(|p| p.user_xid != user_xid)
        .all(|p| p.confirmed_at.is_some());
    Ok(others_confirmed)
}

/// Started games in a guild that the user played, newest first.
///
/// Returns `None` when the guild is unknown.
pub async fn user_records(
    db: &DatabaseConnection,
    guild_xid: i64,
    user_xid: i64,
    page: u64,
) -> Result<Option<Vec<GameRecord>>> {
    let Some(guild) = Guild::find_by_id(guild_xid).one(db).await? else {
        return Ok(None);
    };
    let Some(offset) = page_offset(page, USER_PAGE_SIZE) else {
        return Ok(Some(Vec::new()));
    };

    let played = Query::select()
        .column(play::Column::GameId)
        .from(play::Entity)
        .and_where(play::Column::UserXid.eq(user_xid))
        .to_owned();
    let games = Game::find()
        .filter(game::Column::GuildXid.eq(guild_xid))
        .filter(game::Column::Status.eq(GameStatus::Started))
        .filter(game::Column::Id.in_subquery(played))
        .order_by_desc(game::Column::UpdatedAt)
        .offset(offset)
        .limit(USER_PAGE_SIZE)
        .all(db)
        .await?;

    build_records(db, guild.name, games).await.map(Some)
}

/// Started games of a channel, newest first.
///
/// Returns `None` when the guild or channel is unknown.
pub async fn channel_records(
    db: &DatabaseConnection,
    guild_xid: i64,
    channel_xid: i64,
    page: u64,
) -> Result<Option<Vec<GameRecord>>> {
    let Some(guild) = Guild::find_by_id(guild_xid).one(db).await? else {
        return Ok(None);
    };
    if Channel::find_by_id(channel_xid).one(db).await?.is_none() {
        return Ok(None);
    }
    let Some(offset) = page_offset(page, CHANNEL_PAGE_SIZE) else {
        return Ok(Some(Vec::new()));
    };

    let games = Game::find()
        .filter(game::Column::GuildXid.eq(guild_xid))
        .filter(game::Column::ChannelXid.eq(channel_xid))
        .filter(game::Column::Status.eq(GameStatus::Started))
        .order_by_desc(game::Column::UpdatedAt)
        .offset(offset)
        .limit(CHANNEL_PAGE_SIZE)
        .all(db)
        .await?;

    build_records(db, guild.name, games).await.map(Some)
}

/// Summarises a guild's game activity.
///
/// Returns `None` when the guild is unknown.
#[tracing::instrument(skip(db))]
pub async fn guild_analytics(
    db: &DatabaseConnection,
    guild_xid: i64,
) -> Result<Option<GuildAnalytics>> {
    let Some(guild) = Guild::find_by_id(guild_xid).one(db).await? else {
        return Ok(None);
    };

    let games = Game::find()
        .filter(game::Column::GuildXid.eq(guild_xid))
        .all(db)
        .await?;
    let (started, unstarted): (Vec<_>, Vec<_>) = games
        .into_iter()
        .partition(|g| g.status == GameStatus::Started);
    let expired_games = unstarted.iter().filter(|g| g.deleted_at.is_some()).count();
    let pending_games = unstarted.len() - expired_games;

    let mut formats: HashMap<String, u64> = HashMap::new();
    let mut channels: HashMap<i64, u64> = HashMap::new();
    let mut days: HashMap<String, u64> = HashMap::new();
    let window_start = chrono::Utc::now() - chrono::Duration::days(ANALYTICS_DAYS);
    for g in &started {
        *formats.entry(g.format.to_string()).or_default() += 1;
        *channels.entry(g.channel_xid).or_default() += 1;
        let at = g.started_at.unwrap_or(g.updated_at);
        if at >= window_start {
            *days.entry(at.format("%Y-%m-%d").to_string()).or_default() += 1;
        }
    }

    let game_ids: Vec<i32> = started.iter().map(|g| g.id).collect();
    let mut players: HashMap<i64, u64> = HashMap::new();
    if !game_ids.is_empty() {
        let user_xids: Vec<i64> = Play::find()
            .select_only()
            .column(play::Column::UserXid)
            .filter(play::Column::GameId.is_in(game_ids))
            .into_tuple()
            .all(db)
            .await?;
        for xid in user_xids {
            *players.entry(xid).or_default() += 1;
        }
    }

    let channel_names: HashMap<i64, Option<String>> = Channel::find()
        .filter(channel::Column::GuildXid.eq(guild_xid))
        .all(db)
        .await?
        .into_iter()
        .map(|c| (c.xid, c.name))
        .collect();
    let mut top_players: Vec<(i64, u64)> = players.iter().map(|(x, n)| (*x, *n)).collect();
    top_players.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    top_players.truncate(TOP_PLAYERS);
    let user_names: HashMap<i64, String> = User::find()
        .filter(user::Column::Xid.is_in(top_players.iter().map(|(x, _)| *x)))
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.xid, u.name))
        .collect();

    let mut daily: Vec<Tally> = days
        .into_iter()
        .map(|(day, games)| Tally { label: day, xid: None, games })
        .collect();
    daily.sort_by(|a, b| a.label.cmp(&b.label));

    Ok(Some(GuildAnalytics {
        guild_xid,
        name: guild.name,
        started_games: started.len() as u64,
        pending_games: pending_games as u64,
        expired_games: expired_games as u64,
        unique_players: players.len() as u64,
        formats: busiest(formats.into_iter().map(|(label, games)| Tally { label, xid: None, games })),
        channels: busiest(channels.into_iter().map(|(xid, games)| Tally {
            label: channel_names
                .get(&xid)
                .cloned()
                .flatten()
                .unwrap_or_else(|| xid.to_string()),
            xid: Some(xid),
            games,
        })),
        top_players: top_players
            .into_iter()
            .map(|(xid, games)| Tally {
                label: user_names.get(&xid).cloned().unwrap_or_else(|| xid.to_string()),
                xid: Some(xid),
                games,
            })
            .collect(),
        daily,
    }))
}

fn busiest(tallies: impl Iterator<Item = Tally>) -> Vec<Tally> {
    let mut tallies: Vec<Tally> = tallies.collect();
    tallies.sort_by(|a, b| b.games.cmp(&a.games).then_with(|| a.label.cmp(&b.label)));
    tallies
}

async fn build_records(
    db: &DatabaseConnection,
    guild_name: Option<String>,
    games: Vec<game::Model>,
) -> Result<Vec<GameRecord>> {
    if games.is_empty() {
        return Ok(Vec::new());
    }
    let game_ids: Vec<i32> = games.iter().map(|g| g.id).collect();
    let channel_ids: Vec<i64> = games.iter().map(|g| g.channel_xid).collect();

    let plays = Play::find()
        .filter(play::Column::GameId.is_in(game_ids.iter().copied()))
        .order_by_asc(play::Column::UserXid)
        .all(db)
        .await?;
    let user_ids: Vec<i64> = plays.iter().map(|p| p.user_xid).collect();
    let names: HashMap<i64, String> = User::find()
        .filter(user::Column::Xid.is_in(user_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.xid, u.name))
        .collect();
    let channel_names: HashMap<i64, Option<String>> = Channel::find()
        .filter(channel::Column::Xid.is_in(channel_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|c| (c.xid, c.name))
        .collect();
    let posts = Post::find()
        .filter(post::Column::GameId.is_in(game_ids.iter().copied()))
        .all(db)
        .await?;

    let mut scores: HashMap<i32, Vec<Score>> = HashMap::new();
    for p in plays {
        scores.entry(p.game_id).or_default().push(Score {
            user_xid: p.user_xid,
            name: names.get(&p.user_xid).cloned(),
            points: p.points,
            confirmed: p.confirmed_at.is_some(),
        });
    }

    Ok(games
        .into_iter()
        .map(|g| {
            let message = posts
                .iter()
                .find(|p| p.game_id == g.id && p.channel_xid == g.channel_xid)
                .map(|p| p.message_xid);
            GameRecord {
                id: g.id,
                updated_at: g.updated_at.timestamp_millis(),
                guild: g.guild_xid,
                channel: g.channel_xid,
                message,
                link: g.game_link.clone(),
                format: g.format.to_string(),
                guild_name: guild_name.clone(),
                channel_name: channel_names.get(&g.channel_xid).cloned().flatten(),
                scores: scores.remove(&g.id).unwrap_or_default(),
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::channels::{self, ChannelSetting};
    use crate::core::games::{self, JoinRequest};
    use crate::entities::{GameBracket, GameFormat, GameService};
    use crate::test_utils::*;

    async fn started_game(db: &DatabaseConnection, channel: i64, players: &[i64]) -> Result<i32> {
        let request = JoinRequest {
            guild_xid: 1,
            channel_xid: channel,
            author_xid: players[0],
            friend_xids: players[1..].to_vec(),
            seats: 2,
            format: GameFormat::Modern,
            bracket: GameBracket::None,
            service: GameService::SpellTable,
        };
        let (game, _) = games::upsert(db, &request, true).await?;
        games::add_post(db, game.id, 1, channel, 9000 + i64::from(game.id)).await?;
        games::make_ready(db, game.id, Some("https://example.com/t".to_string()), None).await?;
        Ok(game.id)
    }

    async fn setup() -> Result<DatabaseConnection> {
        let db = setup_test_db().await?;
        create_test_guild(&db, 1).await?;
        create_test_channel(&db, 1, 10).await?;
        create_test_channel(&db, 1, 11).await?;
        create_test_user(&db, 100).await?;
        create_test_user(&db, 101).await?;
        Ok(db)
    }

    #[tokio::test]
    async fn test_record_points_only_for_players() -> Result<()> {
        let db = setup().await?;
        let game_id = started_game(&db, 10, &[100, 101]).await?;

        record_points(&db, game_id, 100, 3).await?;
        record_points(&db, game_id, 100, 5).await?;
        let play = Play::find_by_id((100, game_id)).one(&db).await?.unwrap();
        assert_eq!(play.points, Some(5));

        assert!(matches!(
            record_points(&db, game_id, 999, 1).await,
            Err(Error::NotAPlayer { user_xid: 999, .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_confirm_points() -> Result<()> {
        let db = setup().await?;
        channels::update_channel_setting(&db, 10, ChannelSetting::RequireConfirmation(true))
            .await?;
        let game_id = started_game(&db, 10, &[100, 101]).await?;

        record_points(&db, game_id, 100, 3).await?;
        assert!(matches!(
            confirm_points(&db, game_id, 100).await,
            Err(Error::PointsMissing { .. })
        ));
        record_points(&db, game_id, 101, 0).await?;
        // Points can change until someone confirms
        record_points(&db, game_id, 101, 1).await?;

        assert!(!confirm_points(&db, game_id, 100).await?);
        assert!(matches!(
            record_points(&db, game_id, 100, 5).await,
            Err(Error::AlreadyConfirmed { .. })
        ));
        assert!(matches!(
            record_points(&db, game_id, 101, 5).await,
            Err(Error::PointsLocked { .. })
        ));
        assert!(confirm_points(&db, game_id, 101).await?);
        assert!(matches!(
            confirm_points(&db, game_id, 999).await,
            Err(Error::NotAPlayer { .. })
        ));

        let records = channel_records(&db, 1, 10, 0).await?.unwrap();
        assert!(records[0].scores.iter().all(|s| s.confirmed));
        assert_eq!(records[0].scores[1].points, Some(1));
        Ok(())
    }

    #[tokio::test]
    async fn test_points_stay_open_without_confirmation() -> Result<()> {
        let db = setup().await?;
        let game_id = started_game(&db, 10, &[100, 101]).await?;
        assert!(!requires_confirmation(&db, game_id).await?);
        record_points(&db, game_id, 100, 3).await?;
        record_points(&db, game_id, 101, 1).await?;
        confirm_points(&db, game_id, 100).await?;
        record_points(&db, game_id, 101, 2).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_user_records() -> Result<()> {
        let db = setup().await?;
        let first = started_game(&db, 10, &[100, 101]).await?;
        let second = started_game(&db, 11, &[100, 102]).await?;
        record_points(&db, first, 101, 2).await?;

        let records = user_records(&db, 1, 101, 0).await?.unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.id, first);
        assert_eq!(record.format, "Modern");
        assert_eq!(record.message, Some(9000 + i64::from(first)));
        assert_eq!(record.scores.len(), 2);
        assert_eq!(record.scores[1].points, Some(2));
        assert!(record.scores[0].name.is_some());

        let records = user_records(&db, 1, 100, 0).await?.unwrap();
        assert_eq!(records.iter().map(|r| r.id).collect::<Vec<_>>(), vec![second, first]);
        assert!(user_records(&db, 1, 100, 1).await?.unwrap().is_empty());
        assert!(user_records(&db, 404, 100, 0).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_records_past_last_page_are_empty() -> Result<()> {
        let db = setup().await?;
        started_game(&db, 10, &[100, 101]).await?;

        assert!(user_records(&db, 1, 100, u64::MAX).await?.unwrap().is_empty());
        assert!(channel_records(&db, 1, 10, u64::MAX).await?.unwrap().is_empty());
        assert!(user_records(&db, 1, 100, u64::MAX / USER_PAGE_SIZE).await?.unwrap().is_empty());
        assert_eq!(page_offset(2, CHANNEL_PAGE_SIZE), Some(20));
        assert_eq!(page_offset(u64::MAX, USER_PAGE_SIZE), None);
        Ok(())
    }

    #[tokio::test]
    async fn test_guild_analytics() -> Result<()> {
        let db = setup().await?;
        started_game(&db, 10, &[100, 101]).await?;
        started_game(&db, 10, &[100, 102]).await?;
        started_game(&db, 11, &[101, 102]).await?;
        let pending = JoinRequest {
            guild_xid: 1,
            channel_xid: 10,
            author_xid: 103,
            friend_xids: vec![],
            seats: 2,
            format: GameFormat::Commander,
            bracket: GameBracket::None,
            service: GameService::SpellTable,
        };
        games::upsert(&db, &pending, false).await?;

        let analytics = guild_analytics(&db, 1).await?.unwrap();
        assert_eq!(analytics.started_games, 3);
        assert_eq!(analytics.pending_games, 1);
        assert_eq!(analytics.expired_games, 0);
        assert_eq!(analytics.unique_players, 3);
        assert_eq!(analytics.formats.len(), 1);
        assert_eq!(analytics.formats[0].label, "Modern");
        assert_eq!(analytics.formats[0].games, 3);
        assert_eq!(analytics.channels[0].xid, Some(10));
        assert_eq!(analytics.channels[0].games, 2);
        assert_eq!(analytics.top_players.len(), 3);
        assert_eq!(analytics.top_players[0].xid, Some(100));
        assert_eq!(analytics.top_players[0].games, 2);
        assert_eq!(analytics.daily.iter().map(|d| d.games).sum::<u64>(), 3);

        assert!(guild_analytics(&db, 404).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_channel_records() -> Result<()> {
        let db = setup().await?;
        started_game(&db, 10, &[100, 101]).await?;
        started_game(&db, 11, &[100, 101]).await?;
        // Pending games are not records
        let pending = JoinRequest {
            guild_xid: 1,
            channel_xid: 10,
            author_xid: 103,
            friend_xids: vec![],
            seats: 2,
            format: GameFormat::Modern,
            bracket: GameBracket::None,
            service: GameService::SpellTable,
        };
        games::upsert(&db, &pending, false).await?;

        let records = channel_records(&db, 1, 10, 0).await?.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].channel, 10);
        assert!(channel_records(&db, 1, 404, 0).await?.is_none());
        Ok(())
    }
}
