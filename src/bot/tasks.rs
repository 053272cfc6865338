//! Background sweepers.
//!
//! Two loops run for the life of the bot: one expires pending games nobody
//! touched for a while, the other deletes voice channels left over from
//! finished games. A failed iteration is logged and the loop keeps going.

use super::{BotData, ops, snowflake, xid};
use crate::{
    core::{channels, games, guilds, render::EXPIRED_MESSAGE},
    entities::GameModel,
    errors::Result,
};
use chrono::{DateTime, Duration, Utc};
use poise::serenity_prelude as serenity;
use serenity::{ChannelId, ChannelType, EditMessage, GuildChannel, GuildId, MessageId};
use std::{collections::HashSet, time::Duration as StdDuration};
use tracing::{debug, error, info, instrument};

/// Games expired between the short and the long pause.
const EXPIRE_BATCH: usize = 5;

/// Starts both sweepers on the runtime.
pub fn spawn_sweepers(ctx: serenity::Context, data: BotData) {
    let expire_every = StdDuration::from_secs(data.settings.expire_games_loop_m * 60);
    let cleanup_every = StdDuration::from_secs(data.settings.voice_cleanup_loop_m * 60);

    let (expire_ctx, expire_data) = (ctx.clone(), data.clone());
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(expire_every);
        loop {
            interval.tick().await;
            if let Err(e) = expire_inactive_games(&expire_ctx, &expire_data).await {
                error!("Expiring inactive games failed: {e}");
            }
        }
    });

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(cleanup_every);
        loop {
            interval.tick().await;
            if let Err(e) = cleanup_old_voice_channels(&ctx, &data).await {
                error!("Cleaning up voice channels failed: {e}");
            }
        }
    });
}

/// Expires every pending game that has been idle past the expiry time.
#[instrument(skip_all)]
pub async fn expire_inactive_games(ctx: &serenity::Context, data: &BotData) -> Result<()> {
    let db = &data.database;
    let inactive = games::inactive_games(db, data.settings.expire_time_m).await?;
    if inactive.is_empty() {
        return Ok(());
    }
    info!(games = inactive.len(), "Expiring inactive games");

    for (n, game) in inactive.iter().enumerate() {
        expire_game(ctx, data, game).await?;

        let pause = if (n + 1) % EXPIRE_BATCH == 0 { 5 } else { 1 };
        tokio::time::sleep(StdDuration::from_secs(pause)).await;
    }
    Ok(())
}

/// What happens to a post of an expired game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiredPost {
    /// Delete the message
    Delete,
    /// Replace the embed with the expiry notice
    Replace,
}

/// Posts of games nobody was waiting in are deleted, as are posts in
/// channels that delete expired games.
#[must_use]
pub const fn expired_post(delete_expired: bool, dequeued: u64) -> ExpiredPost {
    if delete_expired || dequeued == 0 {
        ExpiredPost::Delete
    } else {
        ExpiredPost::Replace
    }
}

async fn expire_game(ctx: &serenity::Context, data: &BotData, game: &GameModel) -> Result<()> {
    let db = &data.database;
    let posts = games::posts(db, game.id).await?;
    let dequeued = games::delete_games(db, &[game.id]).await?;

    for post in posts {
        let channel_id = ChannelId::new(snowflake(post.channel_xid));
        let message_id = MessageId::new(snowflake(post.message_xid));
        let delete_expired = channels::get_channel(db, post.channel_xid)
            .await?
            .is_some_and(|c| c.delete_expired);

        match expired_post(delete_expired, dequeued) {
            ExpiredPost::Delete => {
                ops::safe_delete_message(ctx, channel_id, message_id).await;
            }
            ExpiredPost::Replace => {
                let edit = EditMessage::new()
                    .content(EXPIRED_MESSAGE)
                    .embeds(Vec::new())
                    .components(Vec::new());
                ops::safe_update_message(ctx, channel_id, message_id, edit).await;
            }
        }
    }
    Ok(())
}

/// Whether a channel name is one the bot gives game voice channels.
#[must_use]
pub fn is_game_voice_name(name: &str) -> bool {
    name.strip_prefix("Game-SB")
        .is_some_and(|id| !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()))
}

/// Whether a game voice channel is old enough to delete.
///
/// Channels younger than the grace period are always kept. Occupied channels
/// are kept until they pass the age limit.
#[must_use]
pub fn should_delete(age: Duration, occupied: bool, grace: Duration, age_limit: Duration) -> bool {
    if age < grace {
        return false;
    }
    !occupied || age >= age_limit
}

fn created_at(channel: &GuildChannel) -> DateTime<Utc> {
    DateTime::from_timestamp(channel.id.created_at().unix_timestamp(), 0).unwrap_or_else(Utc::now)
}

/// Deletes stale game voice channels in every guild with voice creation enabled.
#[instrument(skip_all)]
pub async fn cleanup_old_voice_channels(ctx: &serenity::Context, data: &BotData) -> Result<()> {
    let db = &data.database;
    let settings = &data.settings;
    let grace = Duration::minutes(settings.voice_grace_period_m);
    let age_limit = Duration::hours(settings.voice_age_limit_h);
    let joined: HashSet<GuildId> = ctx.cache.guilds().into_iter().collect();
    let now = Utc::now();

    let mut budget = settings.voice_cleanup_batch;
    for guild_xid in guilds::voiced_guild_xids(db).await? {
        if budget == 0 {
            break;
        }
        let guild_id = GuildId::new(snowflake(guild_xid));
        if !joined.contains(&guild_id) {
            continue;
        }
        let prefixes = guilds::voice_category_prefixes(db, guild_xid).await?;
        if prefixes.is_empty() {
            continue;
        }

        let occupied: HashSet<ChannelId> = ctx
            .cache
            .guild(guild_id)
            .map(|g| g.voice_states.values().filter_map(|v| v.channel_id).collect())
            .unwrap_or_default();
        let channels = match guild_id.channels(ctx).await {
            Ok(channels) => channels,
            Err(e) => {
                debug!(guild_xid, "Could not list channels: {e}");
                continue;
            }
        };
        let categories: HashSet<ChannelId> = channels
            .values()
            .filter(|c| c.kind == ChannelType::Category)
            .filter(|c| prefixes.iter().any(|p| c.name.starts_with(p.as_str())))
            .map(|c| c.id)
            .collect();

        let mut candidates: Vec<&GuildChannel> = channels
            .values()
            .filter(|c| c.kind == ChannelType::Voice)
            .filter(|c| c.parent_id.is_some_and(|p| categories.contains(&p)))
            .filter(|c| {
                let age = now - created_at(c);
                should_delete(age, occupied.contains(&c.id), grace, age_limit)
            })
            .collect();
        candidates.sort_by_key(|c| c.id);

        for channel in candidates {
            if budget == 0 {
                break;
            }
            let owned = is_game_voice_name(&channel.name)
                || games::select_by_voice_xid(db, xid(channel.id.get()))
                    .await?
                    .is_some();
            if !owned {
                continue;
            }
            if ops::safe_delete_channel(ctx, channel.id).await {
                info!(guild_xid, channel = %channel.name, "Deleted stale voice channel");
                budget -= 1;
            }
        }
    }
    Ok(())
}
