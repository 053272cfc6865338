//! General Discord commands - ping, about, and bot owner moderation.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, actions::leave::settle, xid},
        core::{games, users},
        errors::{Error, Result},
    };
    use poise::{CreateReply, serenity_prelude as serenity};

    /// Responds with "Pong!" to test bot connectivity.
    #[poise::command(slash_command)]
    pub async fn ping(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        ctx.say("Pong!").await?;
        Ok(())
    }

    /// Describes SpellBot and how to use it.
    #[poise::command(slash_command)]
    pub async fn about(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let description = "_The Discord bot for SpellTable and friends._\n\n\
        Use `/lfg` in a channel to find a game. When every seat is filled SpellBot \
        creates a table on the channel's play service and sends everyone the link.\n\n\
        **Player Commands**\n\
        • `/lfg [friends] [seats] [format] [bracket] [service]` - Looks for a game.\n\
        • `/leave` - Leaves the game you are waiting in.\n\
        • `/points <game> <points>` - Reports your points for a game.\n\
        • `/confirm <game>` - Confirms every player's reported points.\n\
        • `/info <game>` - Shows a game.\n\
        • `/block <user>` and `/unblock <user>` - Manage who you play with.\n\n\
        **Moderator Commands**\n\
        • `/game <players>` - Starts a game for exactly these players.\n\
        • `/set <setting>` - Configures this channel or server.\n\
        • `/mirror <channel>` - Mirrors game posts into another channel.\n\
        • `/watch`, `/unwatch`, `/watched` - Manage the watch list.\n\
        • `/verify <user>` and `/unverify <user>` - Manage verified users.\n\
        • `/award add|list|delete` - Manage play-count awards.";

        let embed = serenity::CreateEmbed::new()
            .title("SpellBot")
            .url("https://spellbot.io/")
            .description(description)
            .color(ctx.data().settings.embed_color)
            .thumbnail(ctx.data().settings.thumb_url.clone())
            .footer(serenity::CreateEmbedFooter::new(format!(
                "Version {}",
                env!("CARGO_PKG_VERSION")
            )));
        ctx.send(CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Bans a user from SpellBot everywhere.
    #[poise::command(slash_command, owners_only, hide_in_help)]
    pub async fn ban(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "User to ban"] target: serenity::User,
    ) -> Result<()> {
        let db = &ctx.data().database;
        let target_xid = xid(target.id.get());
        users::upsert_user(db, target_xid, &target.name).await?;
        users::set_banned(db, target_xid, true).await?;
        for outcome in games::remove_players(db, &[target_xid]).await? {
            settle(ctx.serenity_context(), ctx.data(), outcome).await?;
        }

        ctx.send(
            CreateReply::default()
                .content(format!("<@{}> has been banned.", target.id))
                .ephemeral(true),
        )
        .await?;
        Ok(())
    }

    /// Lifts a SpellBot ban.
    #[poise::command(slash_command, owners_only, hide_in_help)]
    pub async fn unban(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "User to unban"] target: serenity::User,
    ) -> Result<()> {
        let db = &ctx.data().database;
        let target_xid = xid(target.id.get());
        users::upsert_user(db, target_xid, &target.name).await?;
        users::set_banned(db, target_xid, false).await?;

        ctx.send(
            CreateReply::default()
                .content(format!("<@{}> has been unbanned.", target.id))
                .ephemeral(true),
        )
        .await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
