//! Verification commands - marking users verified for a server.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, actions::lfg::register_command_context, xid},
        core::{users, verifies},
        errors::{Error, Result},
    };
    use poise::{CreateReply, serenity_prelude as serenity};

    async fn set_verified(
        ctx: poise::Context<'_, BotData, Error>,
        target: &serenity::User,
        verified: bool,
    ) -> Result<()> {
        let Some((guild_xid, _)) = register_command_context(ctx).await? else {
            return Ok(());
        };
        let db = &ctx.data().database;
        let target_xid = xid(target.id.get());
        users::upsert_user(db, target_xid, &target.name).await?;
        verifies::upsert_verify(db, guild_xid, target_xid, Some(verified)).await?;

        let verb = if verified { "Verified" } else { "Unverified" };
        ctx.send(
            CreateReply::default()
                .content(format!("{verb} <@{}>.", target.id))
                .ephemeral(true),
        )
        .await?;
        Ok(())
    }

    /// Verifies a user in this server.
    #[poise::command(slash_command, guild_only, default_member_permissions = "MANAGE_ROLES")]
    pub async fn verify(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "User to verify"] target: serenity::User,
    ) -> Result<()> {
        set_verified(ctx, &target, true).await
    }

    /// Removes a user's verification in this server.
    #[poise::command(slash_command, guild_only, default_member_permissions = "MANAGE_ROLES")]
    pub async fn unverify(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "User to unverify"] target: serenity::User,
    ) -> Result<()> {
        set_verified(ctx, &target, false).await
    }
}

pub use inner::*;
