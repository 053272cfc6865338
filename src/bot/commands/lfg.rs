//! Game commands - looking for games, leaving them and reporting results.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{
            BotData,
            actions::{
                self, game as game_action, leave as leave_action,
                lfg::{self as lfg_action, LfgOptions},
            },
            ops, xid,
        },
        core::{channels, games, plays},
        entities::{GameBracket, GameFormat, GameService},
        errors::{Error, Result},
    };
    use poise::CreateReply;

    async fn reply_ephemeral(
        ctx: poise::Context<'_, BotData, Error>,
        content: impl Into<String>,
    ) -> Result<()> {
        ctx.send(CreateReply::default().content(content).ephemeral(true))
            .await?;
        Ok(())
    }

    /// Looks for a game to join, or creates one.
    #[poise::command(slash_command, guild_only)]
    pub async fn lfg(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Mention friends to join this game with"] friends: Option<String>,
        #[description = "How many players will be seated at this game?"]
        #[min = 2]
        #[max = 4]
        seats: Option<i32>,
        #[description = "What game format do you want to play?"] format: Option<GameFormat>,
        #[description = "What commander bracket do you want to play?"] bracket: Option<GameBracket>,
        #[description = "What service do you want to play on?"] service: Option<GameService>,
    ) -> Result<()> {
        let options = LfgOptions {
            friends,
            seats,
            format,
            bracket,
            service,
        };
        lfg_action::lfg(ctx, options).await
    }

    /// Leaves the game you are waiting in for this channel.
    #[poise::command(slash_command, guild_only)]
    pub async fn leave(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        leave_action::leave(ctx).await
    }

    /// Creates and starts a game for exactly the mentioned players.
    #[poise::command(slash_command, guild_only, default_member_permissions = "MANAGE_CHANNELS")]
    pub async fn game(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Mention every player of this game"] players: String,
        #[description = "What game format are they playing?"] format: Option<GameFormat>,
        #[description = "What commander bracket are they playing?"] bracket: Option<GameBracket>,
    ) -> Result<()> {
        game_action::create_game(ctx, &players, format, bracket).await
    }

    /// Reports your points for a game you played.
    #[poise::command(slash_command, guild_only)]
    pub async fn points(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "SpellBot game ID, without the #SB prefix"] game_id: i32,
        #[description = "How many points did you get?"] points: i32,
    ) -> Result<()> {
        let data = ctx.data();
        let db = &data.database;
        let Some(game) = games::select(db, game_id).await? else {
            return reply_ephemeral(ctx, format!("There is no game with ID #SB{game_id}.")).await;
        };
        let show_points = channels::get_channel(db, game.channel_xid)
            .await?
            .is_some_and(|c| c.show_points);
        if !show_points {
            return reply_ephemeral(ctx, "Points are not tracked for this game.").await;
        }

        match plays::record_points(db, game_id, xid(ctx.author().id.get()), points).await {
            Ok(()) => {}
            Err(Error::NotAPlayer { .. }) => {
                return reply_ephemeral(ctx, format!("You did not play in game #SB{game_id}."))
                    .await;
            }
            Err(e @ (Error::AlreadyConfirmed { .. } | Error::PointsLocked { .. })) => {
                return reply_ephemeral(ctx, e.to_string()).await;
            }
            Err(e) => return Err(e),
        }
        reply_ephemeral(ctx, format!("Recorded {points} points for game #SB{game_id}.")).await?;
        actions::refresh_game_posts(ctx.serenity_context(), data, game_id).await
    }

    /// Confirms the reported points of a game you played.
    #[poise::command(slash_command, guild_only)]
    pub async fn confirm(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "SpellBot game ID, without the #SB prefix"] game_id: i32,
    ) -> Result<()> {
        let data = ctx.data();
        let db = &data.database;
        if games::select(db, game_id).await?.is_none() {
            return reply_ephemeral(ctx, format!("There is no game with ID #SB{game_id}.")).await;
        }
        if !plays::requires_confirmation(db, game_id).await? {
            return reply_ephemeral(ctx, "Points confirmation is not required for this game.")
                .await;
        }

        let all_confirmed = match plays::confirm_points(db, game_id, xid(ctx.author().id.get()))
            .await
        {
            Ok(all) => all,
            Err(Error::NotAPlayer { .. }) => {
                return reply_ephemeral(ctx, format!("You did not play in game #SB{game_id}."))
                    .await;
            }
            Err(e @ Error::PointsMissing { .. }) => {
                return reply_ephemeral(ctx, e.to_string()).await;
            }
            Err(e) => return Err(e),
        };
        let content = if all_confirmed {
            format!("Every player confirmed the points for game #SB{game_id}.")
        } else {
            format!("Confirmed your points for game #SB{game_id}.")
        };
        reply_ephemeral(ctx, content).await
    }

    /// Shows the current state of a game.
    #[poise::command(slash_command, guild_only)]
    pub async fn info(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "SpellBot game ID, without the #SB prefix"] game_id: i32,
    ) -> Result<()> {
        let data = ctx.data();
        let db = &data.database;
        let guild_xid = ctx.guild_id().map(|g| xid(g.get()));

        let game = games::select(db, game_id)
            .await?
            .filter(|g| Some(g.guild_xid) == guild_xid);
        let Some(game) = game else {
            return reply_ephemeral(ctx, format!("There is no game with ID #SB{game_id}.")).await;
        };

        let embed = ops::to_embed(&actions::render_game(db, &data.settings, &game, false).await?);
        ctx.send(CreateReply::default().embed(embed).ephemeral(true))
            .await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
