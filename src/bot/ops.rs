//! Discord operations that never fail the surrounding flow.
//!
//! Every helper here logs a failed Discord call and reports it through its
//! return value. Game flows keep going when a message can not be edited or a
//! DM can not be delivered.

use crate::core::render::GameEmbed;
use poise::serenity_prelude as serenity;
use serenity::{
    ButtonStyle, ChannelId, ChannelType, CreateActionRow, CreateButton, CreateChannel,
    CreateEmbed, CreateEmbedFooter, CreateInvite, CreateMessage, EditMessage, GuildChannel,
    GuildId, Member, Message, MessageId, Permissions, PremiumTier, User, UserId,
};
use tracing::{debug, warn};

/// Discord allows at most this many channels in one category.
const MAX_CATEGORY_CHANNELS: usize = 50;

/// Custom id prefix of the Join button.
pub const JOIN_PREFIX: &str = "join:";
/// Custom id prefix of the Leave button.
pub const LEAVE_PREFIX: &str = "leave:";

/// A button press on a game post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameButton {
    /// Join the game
    Join(i32),
    /// Leave the game
    Leave(i32),
}

impl GameButton {
    /// Parses a component custom id.
    #[must_use]
    pub fn parse(custom_id: &str) -> Option<Self> {
        if let Some(id) = custom_id.strip_prefix(JOIN_PREFIX) {
            return id.parse().ok().map(Self::Join);
        }
        if let Some(id) = custom_id.strip_prefix(LEAVE_PREFIX) {
            return id.parse().ok().map(Self::Leave);
        }
        None
    }
}

/// Converts a rendered game into a Discord embed.
#[must_use]
pub fn to_embed(embed: &GameEmbed) -> CreateEmbed {
    CreateEmbed::new()
        .title(&embed.title)
        .description(&embed.description)
        .thumbnail(&embed.thumbnail)
        .color(embed.color)
        .fields(
            embed
                .fields
                .iter()
                .map(|f| (f.name.clone(), f.value.clone(), f.inline)),
        )
        .footer(CreateEmbedFooter::new(&embed.footer))
}

/// Join and Leave buttons for a pending game post.
#[must_use]
pub fn game_buttons(game_id: i32) -> Vec<CreateActionRow> {
    vec![CreateActionRow::Buttons(vec![
        CreateButton::new(format!("{JOIN_PREFIX}{game_id}"))
            .label("Join this game!")
            .style(ButtonStyle::Primary),
        CreateButton::new(format!("{LEAVE_PREFIX}{game_id}"))
            .label("Leave")
            .style(ButtonStyle::Secondary),
    ])]
}

/// Sends a message to a channel.
pub async fn safe_send_channel(
    ctx: &serenity::Context,
    channel_id: ChannelId,
    message: CreateMessage,
) -> Option<Message> {
    match channel_id.send_message(ctx, message).await {
        Ok(sent) => Some(sent),
        Err(e) => {
            warn!(channel_xid = channel_id.get(), "Could not send message: {e}");
            None
        }
    }
}

/// Edits a message. Returns whether the edit went through.
pub async fn safe_update_message(
    ctx: &serenity::Context,
    channel_id: ChannelId,
    message_id: MessageId,
    edit: EditMessage,
) -> bool {
    match channel_id.edit_message(ctx, message_id, edit).await {
        Ok(_) => true,
        Err(e) => {
            warn!(
                channel_xid = channel_id.get(),
                message_xid = message_id.get(),
                "Could not update message: {e}"
            );
            false
        }
    }
}

/// Deletes a message. Returns whether it was deleted.
pub async fn safe_delete_message(
    ctx: &serenity::Context,
    channel_id: ChannelId,
    message_id: MessageId,
) -> bool {
    match channel_id.delete_message(ctx, message_id).await {
        Ok(()) => true,
        Err(e) => {
            warn!(
                channel_xid = channel_id.get(),
                message_xid = message_id.get(),
                "Could not delete message: {e}"
            );
            false
        }
    }
}

/// Sends a direct message. Returns whether it was delivered.
pub async fn safe_send_user(ctx: &serenity::Context, user_id: UserId, message: CreateMessage) -> bool {
    match user_id.direct_message(ctx, message).await {
        Ok(_) => true,
        Err(e) => {
            debug!(user_xid = user_id.get(), "Could not DM user: {e}");
            false
        }
    }
}

/// Looks a user up on Discord.
pub async fn safe_fetch_user(ctx: &serenity::Context, user_id: UserId) -> Option<User> {
    match user_id.to_user(ctx).await {
        Ok(user) => Some(user),
        Err(e) => {
            debug!(user_xid = user_id.get(), "Could not fetch user: {e}");
            None
        }
    }
}

/// Adds or removes a role, looked up by name, on a guild member.
pub async fn safe_set_role(
    ctx: &serenity::Context,
    guild_id: GuildId,
    user_id: UserId,
    role_name: &str,
    remove: bool,
) -> bool {
    let roles = match guild_id.roles(ctx).await {
        Ok(roles) => roles,
        Err(e) => {
            warn!(guild_xid = guild_id.get(), "Could not fetch roles: {e}");
            return false;
        }
    };
    let Some(role_id) = roles.values().find(|r| r.name == role_name).map(|r| r.id) else {
        warn!(guild_xid = guild_id.get(), role_name, "Award role does not exist");
        return false;
    };

    let result = if remove {
        ctx.http.remove_member_role(guild_id, user_id, role_id, Some("SpellBot award")).await
    } else {
        ctx.http.add_member_role(guild_id, user_id, role_id, Some("SpellBot award")).await
    };
    if let Err(e) = result {
        warn!(guild_xid = guild_id.get(), user_xid = user_id.get(), role_name, "Could not change role: {e}");
        return false;
    }
    true
}

/// Members of the guild holding a role whose name starts with `prefix`.
pub async fn safe_members_with_role_prefix(
    ctx: &serenity::Context,
    guild_id: GuildId,
    prefix: &str,
) -> Vec<UserId> {
    let roles = match guild_id.roles(ctx).await {
        Ok(roles) => roles,
        Err(e) => {
            warn!(guild_xid = guild_id.get(), "Could not fetch roles: {e}");
            return Vec::new();
        }
    };
    let wanted: Vec<_> = roles
        .values()
        .filter(|r| r.name.starts_with(prefix))
        .map(|r| r.id)
        .collect();
    if wanted.is_empty() {
        return Vec::new();
    }

    match guild_id.members(ctx, None, None::<UserId>).await {
        Ok(members) => members
            .into_iter()
            .filter(|m| !m.user.bot && m.roles.iter().any(|r| wanted.contains(r)))
            .map(|m| m.user.id)
            .collect(),
        Err(e) => {
            warn!(guild_xid = guild_id.get(), "Could not fetch members: {e}");
            Vec::new()
        }
    }
}

/// Whether permissions and role names make a member a moderator.
pub fn can_moderate(permissions: Option<Permissions>, role_names: &[&str], prefix: &str) -> bool {
    permissions.is_some_and(Permissions::administrator)
        || role_names.iter().any(|name| name.starts_with(prefix))
}

/// Whether a member owns the guild, administers it or holds a moderator role.
pub async fn safe_can_moderate(
    ctx: &serenity::Context,
    guild_id: GuildId,
    member: &Member,
    prefix: &str,
) -> bool {
    let owner = ctx.cache.guild(guild_id).map(|g| g.owner_id);
    if owner == Some(member.user.id) {
        return true;
    }
    let roles = match guild_id.roles(ctx).await {
        Ok(roles) => roles,
        Err(e) => {
            warn!(guild_xid = guild_id.get(), "Could not fetch roles: {e}");
            return can_moderate(member.permissions, &[], prefix);
        }
    };
    let names: Vec<&str> = member
        .roles
        .iter()
        .filter_map(|id| roles.get(id).map(|r| r.name.as_str()))
        .collect();
    can_moderate(member.permissions, &names, prefix)
}

/// Highest voice bitrate the guild's boost level allows.
const fn max_bitrate(tier: PremiumTier) -> u32 {
    match tier {
        PremiumTier::Tier1 => 128_000,
        PremiumTier::Tier2 => 256_000,
        PremiumTier::Tier3 => 384_000,
        _ => 96_000,
    }
}

/// Picks the category for a new voice channel, creating one when every
/// category with the prefix is full.
async fn voice_category(
    ctx: &serenity::Context,
    guild_id: GuildId,
    prefix: &str,
) -> serenity::Result<ChannelId> {
    let channels = guild_id.channels(ctx).await?;
    let mut categories: Vec<&GuildChannel> = channels
        .values()
        .filter(|c| c.kind == ChannelType::Category && c.name.starts_with(prefix))
        .collect();
    categories.sort_by_key(|c| c.position);

    for category in &categories {
        let children = channels
            .values()
            .filter(|c| c.parent_id == Some(category.id))
            .count();
        if children < MAX_CATEGORY_CHANNELS {
            return Ok(category.id);
        }
    }

    let name = if categories.is_empty() {
        prefix.to_string()
    } else {
        format!("{prefix} {}", categories.len() + 1)
    };
    let created = guild_id
        .create_channel(ctx, CreateChannel::new(name).kind(ChannelType::Category))
        .await?;
    Ok(created.id)
}

/// Creates a voice channel inside a category whose name starts with `prefix`.
pub async fn safe_create_voice_channel(
    ctx: &serenity::Context,
    guild_id: GuildId,
    name: &str,
    prefix: &str,
    use_max_bitrate: bool,
) -> Option<GuildChannel> {
    let created = async {
        let category = voice_category(ctx, guild_id, prefix).await?;
        let mut builder = CreateChannel::new(name)
            .kind(ChannelType::Voice)
            .category(category);
        if use_max_bitrate {
            let guild = guild_id.to_partial_guild(ctx).await?;
            builder = builder.bitrate(max_bitrate(guild.premium_tier));
        }
        guild_id.create_channel(ctx, builder).await
    }
    .await;

    match created {
        Ok(channel) => Some(channel),
        Err(e) => {
            warn!(guild_xid = guild_id.get(), name, "Could not create voice channel: {e}");
            None
        }
    }
}

/// Creates an invite to a channel that expires after `max_age` seconds.
pub async fn safe_create_invite(ctx: &serenity::Context, channel_id: ChannelId, max_age: u32) -> Option<String> {
    match channel_id
        .create_invite(ctx, CreateInvite::new().max_age(max_age).max_uses(0))
        .await
    {
        Ok(invite) => Some(invite.url()),
        Err(e) => {
            warn!(channel_xid = channel_id.get(), "Could not create invite: {e}");
            None
        }
    }
}

/// Deletes a channel. Returns whether it was deleted.
pub async fn safe_delete_channel(ctx: &serenity::Context, channel_id: ChannelId) -> bool {
    match channel_id.delete(ctx).await {
        Ok(_) => true,
        Err(e) => {
            warn!(channel_xid = channel_id.get(), "Could not delete channel: {e}");
            false
        }
    }
}
