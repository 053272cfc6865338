//! Moderator watch list commands.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, xid},
        core::{users, watches},
        errors::{Error, Result},
    };
    use poise::{CreateReply, serenity_prelude as serenity};
    use std::fmt::Write;

    const MAX_DESCRIPTION_LEN: usize = 4096;

    fn guild_xid(ctx: poise::Context<'_, BotData, Error>) -> Result<i64> {
        ctx.guild_id()
            .map(|g| xid(g.get()))
            .ok_or_else(|| Error::InvalidInput {
                message: "This command only works in a server.".to_string(),
            })
    }

    /// Notifies moderators whenever this user joins a game.
    #[poise::command(
        slash_command,
        guild_only,
        default_member_permissions = "MANAGE_CHANNELS"
    )]
    pub async fn watch(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "User to watch"] target: serenity::User,
        #[description = "Why this user is being watched"] note: Option<String>,
    ) -> Result<()> {
        let db = &ctx.data().database;
        let guild_xid = guild_xid(ctx)?;
        users::upsert_user(db, xid(target.id.get()), &target.name).await?;
        watches::watch(db, guild_xid, xid(target.id.get()), note.as_deref()).await?;

        ctx.send(
            CreateReply::default()
                .content(format!("Watching <@{}>.", target.id))
                .ephemeral(true),
        )
        .await?;
        Ok(())
    }

    /// Stops watching a user.
    #[poise::command(
        slash_command,
        guild_only,
        default_member_permissions = "MANAGE_CHANNELS"
    )]
    pub async fn unwatch(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "User to stop watching"] target: serenity::User,
    ) -> Result<()> {
        let removed =
            watches::unwatch(&ctx.data().database, guild_xid(ctx)?, xid(target.id.get())).await?;
        let content = if removed {
            format!("No longer watching <@{}>.", target.id)
        } else {
            format!("<@{}> was not being watched.", target.id)
        };
        ctx.send(CreateReply::default().content(content).ephemeral(true))
            .await?;
        Ok(())
    }

    /// Lists every watched user in this server.
    #[poise::command(
        slash_command,
        guild_only,
        default_member_permissions = "MANAGE_CHANNELS"
    )]
    pub async fn watched(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let entries = watches::fetch(&ctx.data().database, guild_xid(ctx)?).await?;

        let mut content = String::new();
        if entries.is_empty() {
            content.push_str("No users are being watched.");
        }
        for entry in entries {
            match entry.note {
                Some(note) => writeln!(content, "• <@{}>: {note}", entry.user_xid)?,
                None => writeln!(content, "• <@{}>", entry.user_xid)?,
            }
        }

        let embed = serenity::CreateEmbed::new()
            .title("Watched users")
            .description(content.chars().take(MAX_DESCRIPTION_LEN).collect::<String>());
        ctx.send(CreateReply::default().embed(embed).ephemeral(true))
            .await?;
        Ok(())
    }
}

pub use inner::*;
