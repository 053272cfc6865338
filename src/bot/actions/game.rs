//! Creating a started game for an exact set of players, from `/game`.

use super::{parse_mentions, render_game, start::start_game};
use crate::{
    bot::{Context, actions::lfg::register_command_context, ops, snowflake, xid},
    core::{
        channels,
        games::{self, JoinRequest},
        users,
    },
    entities::{GameBracket, GameFormat},
    errors::{Error, Result},
};
use poise::{CreateReply, serenity_prelude::UserId};
use sea_orm::DatabaseConnection;
use tracing::{info, instrument};

/// Why a game of this many players can not be created, if it can't.
#[must_use]
pub fn seats_refusal(players: usize, format: GameFormat) -> Option<String> {
    let fits = i32::try_from(players).is_ok_and(|n| (2..=format.players()).contains(&n));
    if fits {
        return None;
    }
    Some(format!("You can't create a {format} game with {players} players."))
}

/// Records players found on Discord, keeping the ones who are not banned.
pub async fn record_players(db: &DatabaseConnection, found: &[(i64, String)]) -> Result<Vec<i64>> {
    let mut allowed = Vec::with_capacity(found.len());
    for (player, name) in found {
        let user = users::upsert_user(db, *player, name).await?;
        if !user.banned {
            allowed.push(*player);
        }
    }
    Ok(allowed)
}

/// Mentioned players that can not be seated.
#[must_use]
pub fn missing_players(mentioned: &[i64], allowed: &[i64]) -> Vec<i64> {
    mentioned
        .iter()
        .copied()
        .filter(|x| !allowed.contains(x))
        .collect()
}

async fn reply_ephemeral(ctx: Context<'_>, content: impl Into<String>) -> Result<()> {
    ctx.send(CreateReply::default().content(content).ephemeral(true))
        .await?;
    Ok(())
}

/// Handles `/game`: seats exactly the mentioned players and starts the game.
#[instrument(skip(ctx, players), fields(user_xid = ctx.author().id.get()))]
pub async fn create_game(
    ctx: Context<'_>,
    players: &str,
    format: Option<GameFormat>,
    bracket: Option<GameBracket>,
) -> Result<()> {
    let Some((guild_xid, channel_xid)) = register_command_context(ctx).await? else {
        return Ok(());
    };
    let data = ctx.data();
    let db = &data.database;
    let channel = channels::get_channel(db, channel_xid)
        .await?
        .ok_or_else(|| Error::InvalidInput {
            message: format!("Channel {channel_xid} is not registered"),
        })?;
    let format = format.unwrap_or(channel.default_format);

    let mentioned = parse_mentions(players);
    if let Some(reason) = seats_refusal(mentioned.len(), format) {
        return reply_ephemeral(ctx, reason).await;
    }

    let mut found = Vec::with_capacity(mentioned.len());
    for &player in &mentioned {
        let user_id = UserId::new(snowflake(player));
        if let Some(user) = ops::safe_fetch_user(ctx.serenity_context(), user_id).await {
            found.push((player, user.name));
        }
    }
    let allowed = record_players(db, &found).await?;
    let missing = missing_players(&mentioned, &allowed);
    if !missing.is_empty() {
        let listed = missing
            .iter()
            .map(|x| format!("<@{x}>"))
            .collect::<Vec<_>>()
            .join(", ");
        return reply_ephemeral(
            ctx,
            format!("Some of the players you mentioned can not be added to a game: {listed}"),
        )
        .await;
    }
    let Some((&author, friends)) = allowed.split_first() else {
        return Ok(());
    };

    let request = JoinRequest {
        guild_xid,
        channel_xid,
        author_xid: author,
        friend_xids: friends.to_vec(),
        seats: i32::try_from(allowed.len()).unwrap_or(i32::MAX),
        format,
        bracket: bracket.unwrap_or(channel.default_bracket),
        service: channel.default_service,
    };
    let (game, _) = games::upsert(db, &request, true).await?;
    info!(game_id = game.id, players = allowed.len(), "Created game for players");

    let embed = ops::to_embed(&render_game(db, &data.settings, &game, false).await?);
    let mut reply = CreateReply::default().embed(embed);
    if let Some(extra) = channel.extra.clone() {
        reply = reply.content(extra);
    }
    let reply = ctx.send(reply).await?;
    let message = reply.message().await?;
    games::add_post(db, game.id, guild_xid, channel_xid, xid(message.id.get())).await?;

    start_game(ctx.serenity_context(), data, game.id).await
}
