//! Bot layer - Discord-specific interface and command handlers
//!
//! This module wires the matching engine to Discord: slash commands, button
//! handlers, the game session flows and the background sweepers.

/// Game session flows shared by commands and buttons
pub mod actions;
/// Discord command implementations (lfg, moderation, configuration, awards)
pub mod commands;
/// Discord interaction handlers (buttons)
pub mod handlers;
/// Discord calls that log failures instead of propagating them
pub mod ops;
/// Background sweepers for expired games and stale voice channels
pub mod tasks;

use crate::{
    config::Settings,
    errors::{Error, Result},
    integrations::LinkGenerator,
};
use poise::serenity_prelude as serenity;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tracing::{error, info, instrument};

/// Shared data available to all bot commands.
/// This structure holds the database connection, the settings and the link
/// generator used when games start.
#[derive(Clone)]
pub struct BotData {
    /// Database connection for all database operations
    pub database: DatabaseConnection,
    /// Settings loaded at startup
    pub settings: Arc<Settings>,
    /// Creates tables on the play services
    pub links: Arc<dyn LinkGenerator>,
}

impl BotData {
    /// Creates a new `BotData` instance.
    #[must_use]
    pub fn new(
        database: DatabaseConnection,
        settings: Arc<Settings>,
        links: Arc<dyn LinkGenerator>,
    ) -> Self {
        Self {
            database,
            settings,
            links,
        }
    }
}

/// Poise context carrying [`BotData`].
pub type Context<'a> = poise::Context<'a, BotData, Error>;

/// Converts a Discord snowflake into the signed id stored in the database.
#[allow(clippy::cast_possible_wrap)]
#[must_use]
pub const fn xid(id: u64) -> i64 {
    id as i64
}

/// Converts a stored id back into a Discord snowflake.
#[allow(clippy::cast_sign_loss)]
#[must_use]
pub const fn snowflake(xid: i64) -> u64 {
    xid as u64
}

async fn on_error(error: poise::FrameworkError<'_, BotData, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => {
            error!("Failed to start bot: {error:?}");
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!("Error in command `{}`: {:?}", ctx.command().name, error);
            let reply = poise::CreateReply::default()
                .content(format!("An error occurred: {error}"))
                .ephemeral(true);
            if let Err(e) = ctx.send(reply).await {
                error!("Failed to send error message: {e}");
            }
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                error!("Error while handling error: {e}");
            }
        }
    }
}

/// Every slash command the bot registers.
#[must_use]
pub fn all_commands() -> Vec<poise::Command<BotData, Error>> {
    vec![
        commands::lfg(),
        commands::leave(),
        commands::game(),
        commands::points(),
        commands::confirm(),
        commands::info(),
        commands::block(),
        commands::unblock(),
        commands::watch(),
        commands::unwatch(),
        commands::watched(),
        commands::set(),
        commands::mirror(),
        commands::award(),
        commands::verify(),
        commands::unverify(),
        commands::ping(),
        commands::about(),
        commands::ban(),
        commands::unban(),
    ]
}

/// Connects to Discord and serves commands until the gateway closes.
#[instrument(skip_all)]
pub async fn run_bot(token: String, data: BotData) -> Result<()> {
    let debug_guild = data.settings.debug_guild;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: all_commands(),
            on_error: |error| Box::pin(on_error(error)),
            event_handler: |ctx, event, framework, data| {
                Box::pin(handlers::event_handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Logged in as {}", ready.user.name);
                match debug_guild {
                    Some(guild) => {
                        info!(guild, "Registering commands in debug guild...");
                        let guild_id = serenity::GuildId::new(guild);
                        poise::builtins::register_in_guild(ctx, &framework.options().commands, guild_id)
                            .await?;
                    }
                    None => {
                        info!("Registering commands globally...");
                        poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                    }
                }
                tasks::spawn_sweepers(ctx.clone(), data.clone());
                Ok(data)
            })
        })
        .build();

    let intents = serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_MEMBERS
        | serenity::GatewayIntents::GUILD_VOICE_STATES;

    info!("Setting up Serenity client for Poise framework...");
    let mut client = serenity::Client::builder(&token, intents)
        .framework(framework)
        .await
        .inspect_err(|e| error!("Error creating client: {e:?}"))?;

    info!("Starting bot client...");
    client
        .start()
        .await
        .inspect_err(|e| error!("Client error: {e:?}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::games::{self, JoinRequest},
        entities::{GameBracket, GameFormat, GameService},
        integrations::GameLink,
        test_utils::*,
    };

    #[test]
    fn test_snowflake_round_trip() {
        let id = 1_234_567_890_123_456_789_u64;
        assert_eq!(snowflake(xid(id)), id);
        assert_eq!(snowflake(xid(u64::MAX)), u64::MAX);
    }

    #[test]
    fn test_command_names_are_unique() {
        let commands = all_commands();
        let mut names: Vec<_> = commands.iter().map(|c| c.name.clone()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), commands.len());
        assert!(names.contains(&"verify".to_string()));
        assert!(names.contains(&"confirm".to_string()));
    }

    #[test]
    fn test_set_subcommands_fit_discord_limit() {
        let set = commands::set();
        assert!(set.subcommands.len() <= 25);
        for name in ["auto_verify", "verified_only", "unverified_only", "require_confirmation"] {
            assert!(set.subcommands.iter().any(|c| c.name == name), "missing {name}");
        }
    }

    #[tokio::test]
    async fn test_bot_data_generates_links() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_guild(&db, 1).await?;
        create_test_channel(&db, 1, 10).await?;
        let links = StubLinks {
            link: GameLink {
                link: Some("https://spelltable.wizards.com/game/abc".to_string()),
                password: None,
            },
        };
        let data = BotData::new(db, Arc::new(Settings::default()), Arc::new(links));

        let request = JoinRequest {
            guild_xid: 1,
            channel_xid: 10,
            author_xid: 100,
            friend_xids: vec![],
            seats: 2,
            format: GameFormat::Modern,
            bracket: GameBracket::None,
            service: GameService::SpellTable,
        };
        let (game, _) = games::upsert(&data.database, &request, false).await?;
        let generated = data.links.generate(&game).await;
        assert_eq!(
            generated.link.as_deref(),
            Some("https://spelltable.wizards.com/game/abc")
        );
        Ok(())
    }
}
