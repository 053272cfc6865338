//! Looking for a game, from the `/lfg` command or a Join button.

use super::{parse_mentions, refresh_game_posts, render_game, start::start_game};
use crate::{
    bot::{BotData, Context, ops, snowflake, xid},
    config::Settings,
    core::{
        channels,
        games::{self, JoinRequest},
        guilds, mirrors, users, verifies,
    },
    entities::{ChannelModel, GameBracket, GameFormat, GameService, User, user},
    errors::{Error, Result},
};
use poise::{CreateReply, serenity_prelude as serenity};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serenity::{
    ChannelId, ComponentInteraction, CreateInteractionResponse, CreateInteractionResponseFollowup,
    CreateMessage, GuildId, Member,
};
use tracing::{info, instrument};

/// Options of an `/lfg` request. Missing values fall back to channel defaults.
#[derive(Debug, Clone, Default)]
pub struct LfgOptions {
    /// Mentions of friends to bring along
    pub friends: Option<String>,
    /// Seats in the game
    pub seats: Option<i32>,
    /// Game format
    pub format: Option<GameFormat>,
    /// Commander bracket
    pub bracket: Option<GameBracket>,
    /// Service hosting the table
    pub service: Option<GameService>,
}

/// Seats for a new request: the requested count, else the format's player
/// count, else the channel default.
#[must_use]
pub const fn resolve_seats(
    seats: Option<i32>,
    format: Option<GameFormat>,
    default_seats: i32,
) -> i32 {
    match (seats, format) {
        (Some(seats), _) => seats,
        (None, Some(format)) => format.players(),
        (None, None) => default_seats,
    }
}

/// Whether `others` players besides the author can not fit in `seats`.
#[must_use]
pub fn exceeds_seats(others: usize, seats: i32) -> bool {
    !usize::try_from(seats).is_ok_and(|seats| others < seats)
}

/// Checks whether a user may look for another game, returning the reason when not.
pub async fn check_lfg(
    db: &DatabaseConnection,
    settings: &Settings,
    user_xid: i64,
    guild_xid: i64,
    channel_xid: i64,
) -> Result<Option<String>> {
    if users::is_banned(db, user_xid).await? {
        return Ok(Some("You have been banned from using SpellBot.".to_string()));
    }
    if users::is_waiting(db, user_xid, channel_xid).await? {
        return Ok(Some("You're already in a game in this channel.".to_string()));
    }
    if users::pending_games(db, user_xid).await? + 1 > settings.max_pending_games {
        return Ok(Some(
            "You're in too many pending games to join another one at this time.".to_string(),
        ));
    }
    if users::queued_in_another_guild(db, user_xid, guild_xid).await? {
        return Ok(Some(
            "You're already in a pending game in another server.".to_string(),
        ));
    }
    Ok(None)
}

/// Narrows mentioned friends to known, unbanned users who may join with the author.
pub async fn resolve_friends(
    db: &DatabaseConnection,
    settings: &Settings,
    author_xid: i64,
    guild_xid: i64,
    mentioned: &[i64],
) -> Result<Vec<i64>> {
    let candidates: Vec<i64> = mentioned.iter().copied().filter(|&x| x != author_xid).collect();
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let known: Vec<i64> = User::find()
        .filter(user::Column::Xid.is_in(candidates.iter().copied()))
        .filter(user::Column::Banned.eq(false))
        .all(db)
        .await?
        .into_iter()
        .map(|u| u.xid)
        .collect();
    let known: Vec<i64> = candidates.into_iter().filter(|x| known.contains(x)).collect();

    let unblocked = games::filter_blocked_list(db, author_xid, &known).await?;
    games::filter_pending_games(db, &unblocked, guild_xid, settings.max_pending_games).await
}

/// Records the guild, channel and author behind an interaction.
pub async fn register_context(
    db: &DatabaseConnection,
    guild_xid: i64,
    guild_name: Option<&str>,
    channel_xid: i64,
    channel_name: Option<&str>,
    user_xid: i64,
    user_name: &str,
) -> Result<()> {
    guilds::upsert_guild(db, guild_xid, guild_name).await?;
    channels::upsert_channel(db, channel_xid, guild_xid, channel_name).await?;
    users::upsert_user(db, user_xid, user_name).await?;
    Ok(())
}

/// Records the invoking guild, channel and author of a command.
pub async fn register_command_context(ctx: Context<'_>) -> Result<Option<(i64, i64)>> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(None);
    };
    let guild_name = ctx.guild().map(|g| g.name.clone());
    let channel_name = ctx.guild_channel().await.map(|c| c.name);
    let guild_xid = xid(guild_id.get());
    let channel_xid = xid(ctx.channel_id().get());

    register_context(
        &ctx.data().database,
        guild_xid,
        guild_name.as_deref(),
        channel_xid,
        channel_name.as_deref(),
        xid(ctx.author().id.get()),
        &ctx.author().name,
    )
    .await?;
    Ok(Some((guild_xid, channel_xid)))
}

/// Applies the channel's verification rules to a member about to play there.
pub async fn check_verification(
    ctx: &serenity::Context,
    data: &BotData,
    guild_id: GuildId,
    channel: &ChannelModel,
    member: Option<&Member>,
    user_xid: i64,
) -> Result<Option<&'static str>> {
    let moderator = match member {
        Some(member) => {
            ops::safe_can_moderate(ctx, guild_id, member, &data.settings.mod_prefix).await
        }
        None => false,
    };
    verifies::check_channel(&data.database, channel, user_xid, moderator).await
}

async fn reply_ephemeral(ctx: Context<'_>, content: impl Into<String>) -> Result<()> {
    ctx.send(CreateReply::default().content(content).ephemeral(true))
        .await?;
    Ok(())
}

/// Posts a newly created game into every mirror of its channel.
pub async fn post_mirrors(ctx: &serenity::Context, data: &BotData, game_id: i32) -> Result<()> {
    let db = &data.database;
    let Some(game) = games::select(db, game_id).await? else {
        return Ok(());
    };
    let destinations = mirrors::get_mirrors(db, game.guild_xid, game.channel_xid).await?;
    if destinations.is_empty() {
        return Ok(());
    }

    let embed = ops::to_embed(&render_game(db, &data.settings, &game, false).await?);
    for mirror in destinations {
        let message = CreateMessage::new()
            .embed(embed.clone())
            .components(ops::game_buttons(game.id));
        let channel_id = ChannelId::new(snowflake(mirror.to_channel_xid));
        if let Some(sent) = ops::safe_send_channel(ctx, channel_id, message).await {
            games::add_post(
                db,
                game.id,
                mirror.to_guild_xid,
                mirror.to_channel_xid,
                xid(sent.id.get()),
            )
            .await?;
        }
    }
    Ok(())
}

/// Handles `/lfg`: seats the author (and friends) and starts the game when full.
#[instrument(skip(ctx, options), fields(user_xid = ctx.author().id.get()))]
pub async fn lfg(ctx: Context<'_>, options: LfgOptions) -> Result<()> {
    let Some((guild_xid, channel_xid)) = register_command_context(ctx).await? else {
        return reply_ephemeral(ctx, "This command only works in a server.").await;
    };
    let data = ctx.data();
    let db = &data.database;
    let settings = &data.settings;
    let author_xid = xid(ctx.author().id.get());

    if let Some(reason) = check_lfg(db, settings, author_xid, guild_xid, channel_xid).await? {
        return reply_ephemeral(ctx, reason).await;
    }

    let channel = channels::get_channel(db, channel_xid)
        .await?
        .ok_or_else(|| Error::InvalidInput {
            message: format!("Channel {channel_xid} is not registered"),
        })?;
    if let Some(guild_id) = ctx.guild_id() {
        let member = ctx.author_member().await;
        let refusal = check_verification(
            ctx.serenity_context(),
            data,
            guild_id,
            &channel,
            member.as_deref(),
            author_xid,
        )
        .await?;
        if let Some(reason) = refusal {
            return reply_ephemeral(ctx, reason).await;
        }
    }

    let mentioned = options.friends.as_deref().map(parse_mentions).unwrap_or_default();
    let format = options.format.unwrap_or(channel.default_format);
    let seats = resolve_seats(options.seats, options.format, channel.default_seats);
    if exceeds_seats(mentioned.len(), seats) {
        return reply_ephemeral(ctx, "You mentioned too many players.").await;
    }
    let friends = resolve_friends(db, settings, author_xid, guild_xid, &mentioned).await?;

    let request = JoinRequest {
        guild_xid,
        channel_xid,
        author_xid,
        friend_xids: friends,
        seats,
        format,
        bracket: options.bracket.unwrap_or(channel.default_bracket),
        service: options.service.unwrap_or(channel.default_service),
    };
    let (game, new) = match games::upsert(db, &request, false).await {
        Ok(seated) => seated,
        Err(e @ (Error::InvalidSeats { .. } | Error::TooManyPlayers { .. })) => {
            return reply_ephemeral(ctx, e.to_string()).await;
        }
        Err(e) => return Err(e),
    };
    info!(game_id = game.id, new, "LFG handled");

    if new {
        let embed = ops::to_embed(&render_game(db, settings, &game, false).await?);
        let mut reply = CreateReply::default()
            .embed(embed)
            .components(ops::game_buttons(game.id));
        if let Some(extra) = channel.extra.clone() {
            reply = reply.content(extra);
        }
        let reply = ctx.send(reply).await?;
        let message = reply.message().await?;
        games::add_post(db, game.id, guild_xid, channel_xid, xid(message.id.get())).await?;
        post_mirrors(ctx.serenity_context(), data, game.id).await?;
    } else {
        let jump = games::posts(db, game.id)
            .await?
            .into_iter()
            .next()
            .map(|p| format!(": {}", p.jump_link()))
            .unwrap_or_default();
        reply_ephemeral(ctx, format!("You have joined game #SB{}{jump}", game.id)).await?;
        refresh_game_posts(ctx.serenity_context(), data, game.id).await?;
    }

    if games::fully_seated(db, game.id).await? {
        start_game(ctx.serenity_context(), data, game.id).await?;
    }
    Ok(())
}

async fn followup(ctx: &serenity::Context, component: &ComponentInteraction, content: &str) {
    let message = CreateInteractionResponseFollowup::new()
        .content(content)
        .ephemeral(true);
    if let Err(e) = component.create_followup(ctx, message).await {
        tracing::warn!("Could not send followup: {e}");
    }
}

/// Handles a Join button press on a game post.
#[instrument(skip(ctx, data, component), fields(user_xid = component.user.id.get()))]
pub async fn join_button(
    ctx: &serenity::Context,
    data: &BotData,
    component: &ComponentInteraction,
    game_id: i32,
) -> Result<()> {
    component
        .create_response(ctx, CreateInteractionResponse::Acknowledge)
        .await?;

    let Some(guild_id) = component.guild_id else {
        return Ok(());
    };
    let db = &data.database;
    let user = &component.user;
    let user_xid = xid(user.id.get());
    let guild_xid = xid(guild_id.get());
    let channel_xid = xid(component.channel_id.get());
    let guild_name = ctx.cache.guild(guild_id).map(|g| g.name.clone());
    register_context(db, guild_xid, guild_name.as_deref(), channel_xid, None, user_xid, &user.name)
        .await?;

    let game = games::select(db, game_id)
        .await?
        .filter(|g| g.deleted_at.is_none());
    let Some(game) = game else {
        followup(ctx, component, "Sorry, that game no longer exists.").await;
        return Ok(());
    };
    if !game.is_pending() {
        followup(ctx, component, "Sorry, that game has already started.").await;
        return Ok(());
    }
    if games::player_xids(db, &game).await?.contains(&user_xid) {
        followup(ctx, component, "You're already in this game.").await;
        return Ok(());
    }
    if let Some(reason) = check_lfg(db, &data.settings, user_xid, game.guild_xid, game.channel_xid).await? {
        followup(ctx, component, &reason).await;
        return Ok(());
    }
    if games::blocked(db, game_id, user_xid).await? {
        followup(ctx, component, "You can not join this game.").await;
        return Ok(());
    }
    if let Some(channel) = channels::get_channel(db, channel_xid).await? {
        let member = component.member.as_ref();
        let refusal =
            check_verification(ctx, data, guild_id, &channel, member, user_xid).await?;
        if let Some(reason) = refusal {
            followup(ctx, component, reason).await;
            return Ok(());
        }
    }

    match games::add_player(db, game_id, user_xid).await {
        Ok(_) => {}
        Err(Error::GameFull { .. }) => {
            followup(ctx, component, "Sorry, that game is full.").await;
            return Ok(());
        }
        Err(Error::GameAlreadyStarted { .. }) => {
            followup(ctx, component, "Sorry, that game has already started.").await;
            return Ok(());
        }
        Err(e) => return Err(e),
    }

    refresh_game_posts(ctx, data, game_id).await?;
    if games::fully_seated(db, game_id).await? {
        start_game(ctx, data, game_id).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
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

    #[test]
    fn test_resolve_seats() {
        assert_eq!(resolve_seats(Some(3), Some(GameFormat::Modern), 4), 3);
        assert_eq!(resolve_seats(None, Some(GameFormat::Modern), 4), 2);
        assert_eq!(resolve_seats(None, Some(GameFormat::Commander), 2), 4);
        assert_eq!(resolve_seats(None, None, 3), 3);
    }

    #[test]
    fn test_exceeds_seats() {
        assert!(!exceeds_seats(0, 2));
        assert!(!exceeds_seats(3, 4));
        assert!(exceeds_seats(4, 4));
        assert!(exceeds_seats(2, 2));
        assert!(exceeds_seats(0, -1));
    }

    #[tokio::test]
    async fn test_check_lfg_guards() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_guild(&db, 1).await?;
        create_test_guild(&db, 2).await?;
        create_test_channel(&db, 1, 10).await?;
        create_test_channel(&db, 1, 11).await?;
        create_test_channel(&db, 2, 20).await?;
        let settings = Settings {
            max_pending_games: 2,
            ..Settings::default()
        };

        assert!(check_lfg(&db, &settings, 100, 1, 10).await?.is_none());

        games::upsert(&db, &request(1, 10, 100), false).await?;
        let reason = check_lfg(&db, &settings, 100, 1, 10).await?.unwrap();
        assert!(reason.contains("already in a game in this channel"));

        // Waiting in another guild
        let reason = check_lfg(&db, &settings, 100, 2, 20).await?.unwrap();
        assert!(reason.contains("another server"));

        games::upsert(&db, &request(1, 11, 100), false).await?;
        let reason = check_lfg(&db, &settings, 100, 1, 12).await?.unwrap();
        assert!(reason.contains("too many pending games"));

        users::set_banned(&db, 100, true).await?;
        let reason = check_lfg(&db, &settings, 100, 1, 12).await?.unwrap();
        assert!(reason.contains("banned"));
        Ok(())
    }

    #[tokio::test]
    async fn test_resolve_friends() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_guild(&db, 1).await?;
        create_test_channel(&db, 1, 10).await?;
        for xid in [1, 2, 3, 4] {
            create_test_user(&db, xid).await?;
        }
        users::set_banned(&db, 3, true).await?;
        users::block(&db, 4, &[1]).await?;
        let settings = Settings::default();

        // 5 is unknown, 3 is banned, 4 blocked the author, 1 is the author
        let friends = resolve_friends(&db, &settings, 1, 1, &[5, 2, 3, 4, 1]).await?;
        assert_eq!(friends, vec![2]);
        Ok(())
    }

    #[tokio::test]
    async fn test_register_context() -> Result<()> {
        let db = setup_test_db().await?;
        register_context(&db, 1, Some("Guild"), 10, Some("lfg"), 100, "Alice").await?;

        assert_eq!(guilds::get_guild(&db, 1).await?.unwrap().name.as_deref(), Some("Guild"));
        assert_eq!(channels::get_channel(&db, 10).await?.unwrap().guild_xid, 1);
        assert_eq!(users::get_user(&db, 100).await?.unwrap().name, "Alice");
        Ok(())
    }
}
