//! Starting a fully seated game.

use super::{refresh_game_posts, render_game};
use crate::{
    bot::{BotData, ops, snowflake, xid},
    core::{
        awards,
        channels::{self, DEFAULT_VOICE_CATEGORY},
        games, guilds,
    },
    entities::GameModel,
    errors::Result,
    integrations::LinkGenerator,
};
use poise::serenity_prelude as serenity;
use sea_orm::DatabaseConnection;
use serenity::{ChannelId, CreateMessage, GuildId, UserId};
use std::{collections::HashMap, fmt::Write};
use tracing::{info, instrument, warn};

/// A game that just started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadyGame {
    /// The started game
    pub game: GameModel,
    /// Other pending games that lost players to it
    pub others: Vec<i32>,
}

/// Creates a table for a pending game and marks it started.
///
/// Returns `None` when the game does not exist or is no longer pending. A
/// game whose table could not be created still starts, without a link.
pub async fn ready_game(
    db: &DatabaseConnection,
    links: &dyn LinkGenerator,
    game_id: i32,
) -> Result<Option<ReadyGame>> {
    let Some(pending) = games::select(db, game_id).await? else {
        return Ok(None);
    };
    if !pending.is_pending() {
        return Ok(None);
    }

    let link = links.generate(&pending).await;
    if link.link.is_none() {
        warn!(game_id, service = %pending.service, "Starting game without a link");
    }
    let others = games::make_ready(db, game_id, link.link, link.password).await?;
    info!(game_id, "Game is ready");

    Ok(games::select(db, game_id)
        .await?
        .map(|game| ReadyGame { game, others }))
}

/// Moves a pending game to started and performs every side effect of starting it.
#[instrument(skip(ctx, data))]
pub async fn start_game(ctx: &serenity::Context, data: &BotData, game_id: i32) -> Result<()> {
    let db = &data.database;
    let Some(ReadyGame { game: started, others }) =
        ready_game(db, data.links.as_ref(), game_id).await?
    else {
        return Ok(());
    };

    create_voice(ctx, data, &started).await?;
    refresh_game_posts(ctx, data, game_id).await?;

    let Some(game) = games::select(db, game_id).await? else {
        return Ok(());
    };
    let players = games::player_xids(db, &game).await?;
    notify_players(ctx, data, &game, &players).await?;
    grant_awards(ctx, data, &game, &players).await?;
    notify_moderators(ctx, data, &game, &players).await?;

    for other in others {
        refresh_game_posts(ctx, data, other).await?;
    }
    Ok(())
}

async fn create_voice(ctx: &serenity::Context, data: &BotData, game: &GameModel) -> Result<()> {
    let db = &data.database;
    let Some(guild) = guilds::get_guild(db, game.guild_xid).await? else {
        return Ok(());
    };
    if !guild.voice_create {
        return Ok(());
    }
    let channel = channels::get_channel(db, game.channel_xid).await?;
    let prefix = channel
        .as_ref()
        .and_then(|c| c.voice_category.clone())
        .unwrap_or_else(|| DEFAULT_VOICE_CATEGORY.to_string());

    let guild_id = GuildId::new(snowflake(game.guild_xid));
    let name = format!("Game-SB{}", game.id);
    let Some(voice) =
        ops::safe_create_voice_channel(ctx, guild_id, &name, &prefix, guild.use_max_bitrate).await
    else {
        return Ok(());
    };

    let invite = if channel.as_ref().is_some_and(|c| c.voice_invite) {
        ops::safe_create_invite(ctx, voice.id, data.settings.voice_invite_expire_time_s).await
    } else {
        None
    };
    games::set_voice(db, game.id, xid(voice.id.get()), invite).await
}

/// Mentions joined with commas, in the form Discord renders as users.
fn mentions(xids: &[i64]) -> String {
    xids.iter()
        .map(|x| format!("<@{x}>"))
        .collect::<Vec<_>>()
        .join(", ")
}

async fn notify_players(
    ctx: &serenity::Context,
    data: &BotData,
    game: &GameModel,
    players: &[i64],
) -> Result<()> {
    let embed = ops::to_embed(&render_game(&data.database, &data.settings, game, true).await?);

    let mut failed = Vec::new();
    for &player in players {
        let message = CreateMessage::new().embed(embed.clone());
        if !ops::safe_send_user(ctx, UserId::new(snowflake(player)), message).await {
            failed.push(player);
        }
    }

    if !failed.is_empty() {
        let content = format!(
            "Unable to send Direct Messages to some players: {}",
            mentions(&failed)
        );
        let channel_id = ChannelId::new(snowflake(game.channel_xid));
        ops::safe_send_channel(ctx, channel_id, CreateMessage::new().content(content)).await;
    }
    Ok(())
}

async fn grant_awards(
    ctx: &serenity::Context,
    data: &BotData,
    game: &GameModel,
    players: &[i64],
) -> Result<()> {
    let given = awards::give_awards(&data.database, game.guild_xid, players).await?;
    let guild_id = GuildId::new(snowflake(game.guild_xid));

    for (player, award) in given {
        let user_id = UserId::new(snowflake(player));
        let message = CreateMessage::new().content(award.message.clone());
        ops::safe_send_user(ctx, user_id, message).await;
        ops::safe_set_role(ctx, guild_id, user_id, &award.role, award.remove).await;
    }
    Ok(())
}

/// Message telling moderators which watched users just started a game.
pub fn watch_report(
    game: &GameModel,
    notes: &HashMap<i64, Option<String>>,
    jump_link: Option<&str>,
) -> Result<String> {
    let mut watched: Vec<_> = notes.iter().collect();
    watched.sort_by_key(|(xid, _)| **xid);

    let mut report = format!("Watched user(s) joined up for game #SB{}:", game.id);
    for (xid, note) in watched {
        match note {
            Some(note) => write!(report, "\n• <@{xid}>: {note}")?,
            None => write!(report, "\n• <@{xid}>")?,
        }
    }
    if let Some(link) = jump_link {
        write!(report, "\n{link}")?;
    }
    Ok(report)
}

async fn notify_moderators(
    ctx: &serenity::Context,
    data: &BotData,
    game: &GameModel,
    players: &[i64],
) -> Result<()> {
    let db = &data.database;
    let notes = games::watch_notes(db, game.guild_xid, players).await?;
    if notes.is_empty() {
        return Ok(());
    }

    let jump_link = games::posts(db, game.id)
        .await?
        .into_iter()
        .find(|p| p.channel_xid == game.channel_xid)
        .map(|p| p.jump_link());
    let report = watch_report(game, &notes, jump_link.as_deref())?;

    let guild_id = GuildId::new(snowflake(game.guild_xid));
    let moderators =
        ops::safe_members_with_role_prefix(ctx, guild_id, &data.settings.mod_prefix).await;
    info!(game_id = game.id, moderators = moderators.len(), "Reporting watched players");
    for moderator in moderators {
        ops::safe_send_user(ctx, moderator, CreateMessage::new().content(report.clone())).await;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::games::JoinRequest;
    use crate::entities::{GameBracket, GameFormat, GameService};
    use crate::test_utils::*;

    #[test]
    fn test_mentions() {
        assert_eq!(mentions(&[1, 2]), "<@1>, <@2>");
        assert_eq!(mentions(&[]), "");
    }

    async fn seated_game(db: &DatabaseConnection, friends: Vec<i64>) -> Result<GameModel> {
        let request = JoinRequest {
            guild_xid: 1,
            channel_xid: 10,
            author_xid: 100,
            friend_xids: friends,
            seats: 2,
            format: GameFormat::Modern,
            bracket: GameBracket::None,
            service: GameService::SpellTable,
        };
        Ok(games::upsert(db, &request, true).await?.0)
    }

    #[tokio::test]
    async fn test_ready_game_without_link() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_guild(&db, 1).await?;
        create_test_channel(&db, 1, 10).await?;
        let game = seated_game(&db, vec![101]).await?;
        // 101 is also waiting in another game that loses them
        let other = JoinRequest {
            guild_xid: 1,
            channel_xid: 10,
            author_xid: 101,
            friend_xids: vec![],
            seats: 4,
            format: GameFormat::Commander,
            bracket: GameBracket::None,
            service: GameService::SpellTable,
        };
        let (other, _) = games::upsert(&db, &other, true).await?;

        let ready = ready_game(&db, &StubLinks::default(), game.id).await?.unwrap();
        assert_eq!(ready.game.id, game.id);
        assert!(!ready.game.is_pending());
        assert!(ready.game.started_at.is_some());
        assert_eq!(ready.game.game_link, None);
        assert_eq!(ready.others, vec![other.id]);
        assert_eq!(games::plays(&db, game.id).await?.len(), 2);

        // Already started
        assert!(ready_game(&db, &StubLinks::default(), game.id).await?.is_none());
        assert!(ready_game(&db, &StubLinks::default(), 404).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_ready_game_with_link() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_guild(&db, 1).await?;
        create_test_channel(&db, 1, 10).await?;
        let game = seated_game(&db, vec![101]).await?;
        let links = StubLinks {
            link: crate::integrations::GameLink {
                link: Some("https://spelltable.wizards.com/game/abc".to_string()),
                password: Some("hunter2".to_string()),
            },
        };

        let ready = ready_game(&db, &links, game.id).await?.unwrap();
        assert_eq!(ready.game.game_link.as_deref(), Some("https://spelltable.wizards.com/game/abc"));
        assert_eq!(ready.game.password.as_deref(), Some("hunter2"));
        assert!(ready.others.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_watch_report() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_guild(&db, 1).await?;
        create_test_channel(&db, 1, 10).await?;
        let request = JoinRequest {
            guild_xid: 1,
            channel_xid: 10,
            author_xid: 100,
            friend_xids: vec![],
            seats: 4,
            format: GameFormat::Commander,
            bracket: GameBracket::None,
            service: GameService::SpellTable,
        };
        let (game, _) = games::upsert(&db, &request, false).await?;

        let notes = HashMap::from([(7, Some("salty".to_string())), (3, None)]);
        let report = watch_report(&game, &notes, Some("https://discordapp.com/channels/1/10/5"))?;

        let expected = format!(
            "Watched user(s) joined up for game #SB{}:\n• <@3>\n• <@7>: salty\nhttps://discordapp.com/channels/1/10/5",
            game.id
        );
        assert_eq!(report, expected);
        Ok(())
    }
}
