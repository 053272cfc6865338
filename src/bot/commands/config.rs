//! Configuration commands - channel defaults, server settings and mirrors.
//!
//! Every setting is a subcommand of `/set`. Channel settings apply to the
//! channel the command runs in; server settings apply guild-wide.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, actions::lfg::register_command_context, xid},
        core::{
            channels::{self, ChannelSetting},
            guilds::{self, GuildSetting},
            mirrors,
        },
        entities::{GameBracket, GameFormat, GameService},
        errors::{Error, Result},
    };
    use poise::{CreateReply, serenity_prelude as serenity};

    async fn confirm(ctx: poise::Context<'_, BotData, Error>, content: String) -> Result<()> {
        ctx.send(CreateReply::default().content(content).ephemeral(true))
            .await?;
        Ok(())
    }

    async fn apply_channel(
        ctx: poise::Context<'_, BotData, Error>,
        setting: ChannelSetting,
        done: String,
    ) -> Result<()> {
        let Some((_, channel_xid)) = register_command_context(ctx).await? else {
            return Ok(());
        };
        match channels::update_channel_setting(&ctx.data().database, channel_xid, setting).await {
            Ok(_) => confirm(ctx, done).await,
            Err(e @ (Error::InvalidSeats { .. } | Error::InvalidInput { .. })) => {
                confirm(ctx, e.to_string()).await
            }
            Err(e) => Err(e),
        }
    }

    async fn apply_guild(
        ctx: poise::Context<'_, BotData, Error>,
        setting: GuildSetting,
        done: String,
    ) -> Result<()> {
        let Some((guild_xid, _)) = register_command_context(ctx).await? else {
            return Ok(());
        };
        guilds::update_guild_setting(&ctx.data().database, guild_xid, setting).await?;
        confirm(ctx, done).await
    }

    fn on_off(value: bool) -> &'static str {
        if value { "on" } else { "off" }
    }

    /// Changes SpellBot settings for this channel or server.
    #[poise::command(
        slash_command,
        guild_only,
        default_member_permissions = "MANAGE_CHANNELS",
        subcommands(
            "set_seats",
            "set_format",
            "set_bracket",
            "set_service",
            "set_motd",
            "set_extra",
            "set_voice_category",
            "set_voice_invite",
            "set_delete_expired",
            "set_show_points",
            "set_require_confirmation",
            "set_auto_verify",
            "set_verified_only",
            "set_unverified_only",
            "set_server_motd",
            "set_show_links",
            "set_voice_create",
            "set_max_bitrate"
        ),
        subcommand_required
    )]
    pub async fn set(_ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        Ok(())
    }

    /// Sets the default number of seats for games in this channel.
    #[poise::command(slash_command, rename = "seats")]
    pub async fn set_seats(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Seats per game"]
        #[min = 1]
        #[max = 4]
        seats: i32,
    ) -> Result<()> {
        let done = format!("Default seats set to {seats} for this channel.");
        apply_channel(ctx, ChannelSetting::DefaultSeats(seats), done).await
    }

    /// Sets the default format for games in this channel.
    #[poise::command(slash_command, rename = "format")]
    pub async fn set_format(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Game format"] format: GameFormat,
    ) -> Result<()> {
        let done = format!("Default format set to {format} for this channel.");
        apply_channel(ctx, ChannelSetting::DefaultFormat(format), done).await
    }

    /// Sets the default commander bracket for games in this channel.
    #[poise::command(slash_command, rename = "bracket")]
    pub async fn set_bracket(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Commander bracket"] bracket: GameBracket,
    ) -> Result<()> {
        let done = format!("Default bracket set to {bracket} for this channel.");
        apply_channel(ctx, ChannelSetting::DefaultBracket(bracket), done).await
    }

    /// Sets the service used to create game links in this channel.
    #[poise::command(slash_command, rename = "service")]
    pub async fn set_service(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Play service"] service: GameService,
    ) -> Result<()> {
        let done = format!("Default service set to {service} for this channel.");
        apply_channel(ctx, ChannelSetting::DefaultService(service), done).await
    }

    /// Sets the message shown on game posts in this channel.
    #[poise::command(slash_command, rename = "motd")]
    pub async fn set_motd(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Message of the day, leave empty to clear"] message: Option<String>,
    ) -> Result<()> {
        let done = "Message of the day updated for this channel.".to_string();
        apply_channel(ctx, ChannelSetting::Motd(message), done).await
    }

    /// Sets extra content posted along with game embeds in this channel.
    #[poise::command(slash_command, rename = "extra")]
    pub async fn set_extra(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Extra content, leave empty to clear"] message: Option<String>,
    ) -> Result<()> {
        let done = "Extra content updated for this channel.".to_string();
        apply_channel(ctx, ChannelSetting::Extra(message), done).await
    }

    /// Sets the category name prefix for voice channels of games in this channel.
    #[poise::command(slash_command, rename = "voice_category")]
    pub async fn set_voice_category(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Category name prefix"] category: String,
    ) -> Result<()> {
        let done = format!("Voice category prefix set to {category} for this channel.");
        apply_channel(ctx, ChannelSetting::VoiceCategory(category), done).await
    }

    /// Toggles voice channel invites on game posts in this channel.
    #[poise::command(slash_command, rename = "voice_invite")]
    pub async fn set_voice_invite(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Create invites"] value: bool,
    ) -> Result<()> {
        let done = format!("Voice invites turned {} for this channel.", on_off(value));
        apply_channel(ctx, ChannelSetting::VoiceInvite(value), done).await
    }

    /// Toggles deleting expired game posts in this channel.
    #[poise::command(slash_command, rename = "delete_expired")]
    pub async fn set_delete_expired(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Delete expired posts"] value: bool,
    ) -> Result<()> {
        let done = format!("Deleting expired games turned {} for this channel.", on_off(value));
        apply_channel(ctx, ChannelSetting::DeleteExpired(value), done).await
    }

    /// Toggles points reporting for games in this channel.
    #[poise::command(slash_command, rename = "show_points")]
    pub async fn set_show_points(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Allow points reporting"] value: bool,
    ) -> Result<()> {
        let done = format!("Points reporting turned {} for this channel.", on_off(value));
        apply_channel(ctx, ChannelSetting::ShowPoints(value), done).await
    }

    /// Toggles locking reported points until every player confirms them.
    #[poise::command(slash_command, rename = "require_confirmation")]
    pub async fn set_require_confirmation(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Require points confirmation"] value: bool,
    ) -> Result<()> {
        let done = format!("Points confirmation turned {} for this channel.", on_off(value));
        apply_channel(ctx, ChannelSetting::RequireConfirmation(value), done).await
    }

    /// Toggles verifying every user who plays in this channel.
    #[poise::command(slash_command, rename = "auto_verify")]
    pub async fn set_auto_verify(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Verify players automatically"] value: bool,
    ) -> Result<()> {
        let done = format!("Auto verification set to {value} for this channel.");
        apply_channel(ctx, ChannelSetting::AutoVerify(value), done).await
    }

    /// Toggles restricting this channel to verified users.
    #[poise::command(slash_command, rename = "verified_only")]
    pub async fn set_verified_only(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Only allow verified users"] value: bool,
    ) -> Result<()> {
        let done = format!("Verified only set to {value} for this channel.");
        apply_channel(ctx, ChannelSetting::VerifiedOnly(value), done).await
    }

    /// Toggles restricting this channel to unverified users.
    #[poise::command(slash_command, rename = "unverified_only")]
    pub async fn set_unverified_only(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Only allow unverified users"] value: bool,
    ) -> Result<()> {
        let done = format!("Unverified only set to {value} for this channel.");
        apply_channel(ctx, ChannelSetting::UnverifiedOnly(value), done).await
    }

    /// Sets the message shown on every game post in this server.
    #[poise::command(slash_command, rename = "server_motd")]
    pub async fn set_server_motd(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Message of the day, leave empty to clear"] message: Option<String>,
    ) -> Result<()> {
        let done = "Message of the day updated for this server.".to_string();
        apply_guild(ctx, GuildSetting::Motd(message), done).await
    }

    /// Toggles showing game links publicly in this server.
    #[poise::command(slash_command, rename = "show_links")]
    pub async fn set_show_links(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Show links in channels"] value: bool,
    ) -> Result<()> {
        let done = format!("Public links turned {} for this server.", on_off(value));
        apply_guild(ctx, GuildSetting::ShowLinks(value), done).await
    }

    /// Toggles creating voice channels for started games in this server.
    #[poise::command(slash_command, rename = "voice_create")]
    pub async fn set_voice_create(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Create voice channels"] value: bool,
    ) -> Result<()> {
        let done = format!("Voice channel creation turned {} for this server.", on_off(value));
        apply_guild(ctx, GuildSetting::VoiceCreate(value), done).await
    }

    /// Toggles the maximum bitrate for created voice channels in this server.
    #[poise::command(slash_command, rename = "max_bitrate")]
    pub async fn set_max_bitrate(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Use maximum bitrate"] value: bool,
    ) -> Result<()> {
        let done = format!("Maximum bitrate turned {} for this server.", on_off(value));
        apply_guild(ctx, GuildSetting::UseMaxBitrate(value), done).await
    }

    /// Mirrors game posts from this channel into another channel.
    #[poise::command(
        slash_command,
        guild_only,
        default_member_permissions = "MANAGE_CHANNELS"
    )]
    pub async fn mirror(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Channel receiving copies of game posts"] target: serenity::GuildChannel,
    ) -> Result<()> {
        let Some((guild_xid, channel_xid)) = register_command_context(ctx).await? else {
            return Ok(());
        };
        let result = mirrors::add_mirror(
            &ctx.data().database,
            guild_xid,
            channel_xid,
            xid(target.guild_id.get()),
            xid(target.id.get()),
        )
        .await;
        match result {
            Ok(()) => confirm(ctx, format!("Game posts will be mirrored to <#{}>.", target.id)).await,
            Err(e @ Error::InvalidInput { .. }) => confirm(ctx, e.to_string()).await,
            Err(e) => Err(e),
        }
    }
}

pub use inner::*;
