//! Join and Leave buttons on game posts.

use crate::{
    bot::{
        BotData,
        actions::{leave::leave_button, lfg::join_button},
        ops::GameButton,
    },
    errors::{Error, Result},
};
use poise::serenity_prelude as serenity;
use tracing::{debug, error};

/// Routes gateway events the command framework does not handle itself.
pub async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, BotData, Error>,
    data: &BotData,
) -> Result<()> {
    match event {
        serenity::FullEvent::Ready { data_about_bot } => {
            debug!(guilds = data_about_bot.guilds.len(), "Gateway ready");
        }
        serenity::FullEvent::InteractionCreate {
            interaction: serenity::Interaction::Component(component),
        } => {
            if let Err(e) = handle_component(ctx, data, component).await {
                error!(custom_id = %component.data.custom_id, "Button handler failed: {e}");
            }
        }
        _ => {}
    }
    Ok(())
}

async fn handle_component(
    ctx: &serenity::Context,
    data: &BotData,
    component: &serenity::ComponentInteraction,
) -> Result<()> {
    match GameButton::parse(&component.data.custom_id) {
        Some(GameButton::Join(game_id)) => join_button(ctx, data, component, game_id).await,
        Some(GameButton::Leave(game_id)) => leave_button(ctx, data, component, game_id).await,
        None => {
            debug!(custom_id = %component.data.custom_id, "Ignoring unknown component");
            Ok(())
        }
    }
}
