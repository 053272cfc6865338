//! Leaving a pending game, from `/leave` or a Leave button.

use super::{delete_game_posts, lfg::register_context, refresh_game_posts};
use crate::{
    bot::{BotData, Context, xid},
    core::games::{self, LeaveOutcome},
    errors::Result,
};
use poise::{CreateReply, serenity_prelude as serenity};
use serenity::{ComponentInteraction, CreateInteractionResponse, CreateInteractionResponseFollowup};
use tracing::instrument;

const NOT_IN_GAME: &str = "You were not in a pending game in this channel.";

/// Redraws or removes the posts of a game someone left.
pub async fn settle(ctx: &serenity::Context, data: &BotData, outcome: LeaveOutcome) -> Result<()> {
    if outcome.deleted {
        delete_game_posts(ctx, data, outcome.game_id).await
    } else {
        refresh_game_posts(ctx, data, outcome.game_id).await
    }
}

/// Handles `/leave`: leaves the game the author waits in for this channel.
#[instrument(skip(ctx), fields(user_xid = ctx.author().id.get()))]
pub async fn leave(ctx: Context<'_>) -> Result<()> {
    let data = ctx.data();
    let user_xid = xid(ctx.author().id.get());
    let channel_xid = xid(ctx.channel_id().get());

    let Some(outcome) = games::leave_channel_game(&data.database, user_xid, channel_xid).await?
    else {
        ctx.send(CreateReply::default().content(NOT_IN_GAME).ephemeral(true))
            .await?;
        return Ok(());
    };

    ctx.send(
        CreateReply::default()
            .content(format!("You were removed from game #SB{}.", outcome.game_id))
            .ephemeral(true),
    )
    .await?;
    settle(ctx.serenity_context(), data, outcome).await
}

/// Handles a Leave button press on a game post.
#[instrument(skip(ctx, data, component), fields(user_xid = component.user.id.get()))]
pub async fn leave_button(
    ctx: &serenity::Context,
    data: &BotData,
    component: &ComponentInteraction,
    game_id: i32,
) -> Result<()> {
    component
        .create_response(ctx, CreateInteractionResponse::Acknowledge)
        .await?;
    let user = &component.user;
    let user_xid = xid(user.id.get());
    if let Some(guild_id) = component.guild_id {
        register_context(
            &data.database,
            xid(guild_id.get()),
            None,
            xid(component.channel_id.get()),
            None,
            user_xid,
            &user.name,
        )
        .await?;
    }

    match games::leave_game(&data.database, game_id, user_xid).await? {
        Some(outcome) => settle(ctx, data, outcome).await,
        None => {
            let message = CreateInteractionResponseFollowup::new()
                .content("You are not in this game.")
                .ephemeral(true);
            component.create_followup(ctx, message).await?;
            Ok(())
        }
    }
}
