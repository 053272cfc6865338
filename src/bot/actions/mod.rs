//! Game session flows - looking for games, starting them and leaving them.
//!
//! Flows combine the core matching engine with Discord side effects. Database
//! errors abort a flow; Discord errors are logged by the `ops` helpers and the
//! flow carries on.

pub mod game;
pub mod leave;
pub mod lfg;
pub mod start;

use crate::{
    bot::{BotData, ops, snowflake},
    config::Settings,
    core::{
        channels, games, guilds,
        render::{EmbedContext, GameEmbed, PlayerLine},
    },
    entities::{GameModel, GameStatus},
    errors::{Error, Result},
};
use poise::serenity_prelude as serenity;
use sea_orm::DatabaseConnection;
use serenity::{ChannelId, EditMessage, MessageId};

/// Extracts user ids from `<@id>` and `<@!id>` mentions, in order, without duplicates.
#[must_use]
pub fn parse_mentions(text: &str) -> Vec<i64> {
    let mut found = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find("<@") {
        rest = &rest[start + 2..];
        let body = rest.strip_prefix('!').unwrap_or(rest);
        let digits: String = body.chars().take_while(char::is_ascii_digit).collect();
        let closed = body[digits.len()..].starts_with('>');
        if closed {
            if let Ok(xid) = digits.parse::<i64>() {
                if !found.contains(&xid) {
                    found.push(xid);
                }
            }
        }
    }
    found
}

/// Renders the current state of a game.
pub async fn render_game(
    db: &DatabaseConnection,
    settings: &Settings,
    game: &GameModel,
    dm: bool,
) -> Result<GameEmbed> {
    let guild = guilds::get_guild(db, game.guild_xid)
        .await?
        .ok_or_else(|| Error::InvalidInput {
            message: format!("Guild {} is not registered", game.guild_xid),
        })?;
    let channel = channels::get_channel(db, game.channel_xid).await?;

    let players: Vec<PlayerLine> = if game.status == GameStatus::Pending {
        games::player_xids(db, game)
            .await?
            .into_iter()
            .map(|user_xid| PlayerLine { user_xid, points: None })
            .collect()
    } else {
        games::plays(db, game.id)
            .await?
            .into_iter()
            .map(|p| PlayerLine {
                user_xid: p.user_xid,
                points: p.points,
            })
            .collect()
    };

    let jump_link = games::posts(db, game.id)
        .await?
        .into_iter()
        .find(|p| p.channel_xid == game.channel_xid)
        .map(|p| p.jump_link());

    EmbedContext {
        game,
        guild: &guild,
        channel: channel.as_ref(),
        players: &players,
        jump_link: jump_link.as_deref(),
        dm,
        settings,
    }
    .render()
}

/// Redraws every post of a game. Pending games keep their buttons.
pub async fn refresh_game_posts(
    ctx: &serenity::Context,
    data: &BotData,
    game_id: i32,
) -> Result<()> {
    let db = &data.database;
    let Some(game) = games::select(db, game_id).await? else {
        return Ok(());
    };
    let embed = ops::to_embed(&render_game(db, &data.settings, &game, false).await?);
    let components = if game.is_pending() {
        ops::game_buttons(game.id)
    } else {
        Vec::new()
    };

    for post in games::posts(db, game_id).await? {
        let edit = EditMessage::new()
            .embed(embed.clone())
            .components(components.clone());
        ops::safe_update_message(
            ctx,
            ChannelId::new(snowflake(post.channel_xid)),
            MessageId::new(snowflake(post.message_xid)),
            edit,
        )
        .await;
    }
    Ok(())
}

/// Removes every post of a game that no longer exists.
pub async fn delete_game_posts(ctx: &serenity::Context, data: &BotData, game_id: i32) -> Result<()> {
    for post in games::posts(&data.database, game_id).await? {
        ops::safe_delete_message(
            ctx,
            ChannelId::new(snowflake(post.channel_xid)),
            MessageId::new(snowflake(post.message_xid)),
        )
        .await;
    }
    Ok(())
}
