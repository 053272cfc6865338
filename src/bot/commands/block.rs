//! Block list commands - keeping users out of each other's games.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, xid},
        core::users,
        errors::{Error, Result},
    };
    use poise::{CreateReply, serenity_prelude as serenity};

    /// Blocks a user so you are never matched into the same game.
    #[poise::command(slash_command)]
    pub async fn block(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "User to block"] target: serenity::User,
    ) -> Result<()> {
        let db = &ctx.data().database;
        let author_xid = xid(ctx.author().id.get());
        if target.id == ctx.author().id {
            ctx.send(
                CreateReply::default()
                    .content("You can not block yourself.")
                    .ephemeral(true),
            )
            .await?;
            return Ok(());
        }

        users::upsert_user(db, author_xid, &ctx.author().name).await?;
        users::upsert_user(db, xid(target.id.get()), &target.name).await?;
        users::block(db, author_xid, &[xid(target.id.get())]).await?;

        ctx.send(
            CreateReply::default()
                .content(format!("<@{}> has been blocked.", target.id))
                .ephemeral(true),
        )
        .await?;
        Ok(())
    }

    /// Unblocks a user you previously blocked.
    #[poise::command(slash_command)]
    pub async fn unblock(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "User to unblock"] target: serenity::User,
    ) -> Result<()> {
        let db = &ctx.data().database;
        users::unblock(db, xid(ctx.author().id.get()), &[xid(target.id.get())]).await?;

        ctx.send(
            CreateReply::default()
                .content(format!("<@{}> has been unblocked.", target.id))
                .ephemeral(true),
        )
        .await?;
        Ok(())
    }
}

pub use inner::*;
