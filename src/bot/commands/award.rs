//! Award commands - roles handed out at play-count milestones.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, actions::lfg::register_command_context},
        core::awards::{self, AwardSpec},
        errors::{Error, Result},
    };
    use poise::{CreateReply, serenity_prelude as serenity};
    use std::fmt::Write;

    async fn confirm(ctx: poise::Context<'_, BotData, Error>, content: String) -> Result<()> {
        ctx.send(CreateReply::default().content(content).ephemeral(true))
            .await?;
        Ok(())
    }

    /// Manages awards given out for playing games.
    #[poise::command(
        slash_command,
        guild_only,
        default_member_permissions = "MANAGE_ROLES",
        subcommands("award_add", "award_list", "award_delete"),
        subcommand_required
    )]
    pub async fn award(_ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        Ok(())
    }

    /// Adds an award.
    #[poise::command(slash_command, rename = "add")]
    pub async fn award_add(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Number of games played to earn this award"]
        #[min = 1]
        count: i32,
        #[description = "Role to give (or take away)"] role: String,
        #[description = "Message sent to the player"] message: String,
        #[description = "Give this award every time the count is reached again"] repeating: Option<
            bool,
        >,
        #[description = "Take the role away instead of giving it"] remove: Option<bool>,
        #[description = "Only give this award to verified players"] verified_only: Option<bool>,
        #[description = "Only give this award to unverified players"] unverified_only: Option<
            bool,
        >,
    ) -> Result<()> {
        let Some((guild_xid, _)) = register_command_context(ctx).await? else {
            return Ok(());
        };
        let spec = AwardSpec {
            count,
            role,
            message,
            repeating: repeating.unwrap_or(false),
            remove: remove.unwrap_or(false),
            verified_only: verified_only.unwrap_or(false),
            unverified_only: unverified_only.unwrap_or(false),
        };
        match awards::add_award(&ctx.data().database, guild_xid, spec).await {
            Ok(award) => {
                confirm(
                    ctx,
                    format!("Award #{} added for {} games played.", award.id, award.count),
                )
                .await
            }
            Err(e @ Error::InvalidInput { .. }) => confirm(ctx, e.to_string()).await,
            Err(e) => Err(e),
        }
    }

    /// Lists this server's awards.
    #[poise::command(slash_command, rename = "list")]
    pub async fn award_list(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let Some((guild_xid, _)) = register_command_context(ctx).await? else {
            return Ok(());
        };
        let list = awards::list_awards(&ctx.data().database, guild_xid).await?;
        if list.is_empty() {
            return confirm(ctx, "There are no awards in this server.".to_string()).await;
        }

        let mut content = String::new();
        for award in list {
            let every = if award.repeating { "every " } else { "" };
            let action = if award.remove { "take away" } else { "give" };
            let only = if award.verified_only {
                " (verified only)"
            } else if award.unverified_only {
                " (unverified only)"
            } else {
                ""
            };
            writeln!(
                content,
                "• **ID {}**: {every}{} games, {action} `@{}` with \"{}\"{only}",
                award.id, award.count, award.role, award.message
            )?;
        }

        let embed = serenity::CreateEmbed::new()
            .title("Awards")
            .description(content);
        ctx.send(CreateReply::default().embed(embed).ephemeral(true))
            .await?;
        Ok(())
    }

    /// Deletes an award.
    #[poise::command(slash_command, rename = "delete")]
    pub async fn award_delete(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "ID of the award to delete"] id: i32,
    ) -> Result<()> {
        let Some((guild_xid, _)) = register_command_context(ctx).await? else {
            return Ok(());
        };
        let content = if awards::delete_award(&ctx.data().database, guild_xid, id).await? {
            format!("Award #{id} deleted.")
        } else {
            format!("There is no award #{id} in this server.")
        };
        confirm(ctx, content).await
    }
}

pub use inner::*;
