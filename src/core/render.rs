//! Game post rendering.
//!
//! Builds the embed shown for a game in channels and direct messages. The
//! result is a plain value; the bot layer converts it into a Discord embed.

use crate::{
    config::Settings,
    entities::{GameService, GameStatus, channel, game, guild},
    errors::Result,
};
use std::fmt::Write as _;

/// Text that replaces a post when its game expires.
pub const EXPIRED_MESSAGE: &str = "Sorry, this game was expired due to inactivity.";

/// One embed field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedField {
    /// Field title
    pub name: String,
    /// Field body
    pub value: String,
    /// Render beside the previous field
    pub inline: bool,
}

/// A rendered game post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameEmbed {
    /// Embed title
    pub title: String,
    /// Embed body
    pub description: String,
    /// Fields in display order
    pub fields: Vec<EmbedField>,
    /// Footer text
    pub footer: String,
    /// Sidebar colour
    pub color: u32,
    /// Thumbnail URL
    pub thumbnail: String,
}

/// A seated or finished player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerLine {
    /// Discord user id
    pub user_xid: i64,
    /// Reported points, once started
    pub points: Option<i32>,
}

/// Everything the embed depends on.
#[derive(Debug, Clone, Copy)]
pub struct EmbedContext<'a> {
    /// The game itself
    pub game: &'a game::Model,
    /// Guild the game was created in
    pub guild: &'a guild::Model,
    /// Channel the game was created in, when still known
    pub channel: Option<&'a channel::Model>,
    /// Players to list
    pub players: &'a [PlayerLine],
    /// Link to the original post
    pub jump_link: Option<&'a str>,
    /// Rendering for a direct message to a player
    pub dm: bool,
    /// Bot settings
    pub settings: &'a Settings,
}

impl EmbedContext<'_> {
    fn show_links(&self) -> bool {
        self.dm || self.guild.show_links
    }

    fn title(&self) -> String {
        if self.game.status == GameStatus::Started {
            return "**Your game is ready!**".to_string();
        }
        let seated = i32::try_from(self.players.len()).unwrap_or(i32::MAX);
        let remaining = (self.game.seats - seated).max(0);
        let plural = if remaining == 1 { "" } else { "s" };
        format!("**Waiting for {remaining} more player{plural} to join...**")
    }

    fn description(&self) -> Result<String> {
        let game = self.game;
        let service = game.service;
        let mut description = String::new();

        if game.status == GameStatus::Pending {
            if service == GameService::NotAny {
                description.push_str(
                    "_Please contact the players in your game to organize this game._",
                );
            } else {
                write!(
                    description,
                    "_A {service} link will be created when all players have joined._"
                )?;
            }
        } else {
            if self.show_links() {
                self.link_lines(&mut description)?;
            } else if service != GameService::NotAny {
                write!(
                    description,
                    "Please check your Direct Messages for your {service} link."
                )?;
            }
            if self.dm {
                if let Some(jump) = self.jump_link {
                    write!(
                        description,
                        "\n\nYou can also [jump to the original game post]({jump}) in <#{}>.",
                        game.channel_xid
                    )?;
                }
            } else if self.channel.is_some_and(|c| c.show_points) {
                description
                    .push_str("\n\nWhen your game is over use `/points` to report your points.");
            }
        }

        for motd in [self.guild.motd.as_deref(), self.channel.and_then(|c| c.motd.as_deref())]
            .into_iter()
            .flatten()
        {
            write!(description, "\n\n{motd}")?;
        }
        Ok(description.trim_start().to_string())
    }

    fn link_lines(&self, description: &mut String) -> Result<()> {
        let game = self.game;
        let service = game.service;
        match (&game.game_link, service) {
            (_, GameService::NotAny) => {
                description.push_str("Please contact the players in your game to organize this game.");
            }
            (Some(link), GameService::SpellTable) => {
                let spectate = game.spectate_link().unwrap_or_default();
                write!(
                    description,
                    "[Join your SpellTable game now!]({link}) (or [spectate this game]({spectate}))"
                )?;
            }
            (Some(link), _) => {
                write!(description, "[Join your {service} game now!]({link})")?;
            }
            (None, _) => {
                let url = service.fallback_url().unwrap_or_default();
                write!(
                    description,
                    "Sorry but SpellBot was unable to create a {service} link for this game. \
                     Please go to [{service}]({url}) to create one."
                )?;
            }
        }
        if let Some(password) = &game.password {
            write!(description, "\n\nPassword: `{password}`")?;
        }
        if let Some(invite) = &game.voice_invite_link {
            let minutes = self.settings.voice_invite_expire_time_s / 60;
            write!(
                description,
                "\n\n[Join your voice chat now!]({invite}) (invite will expire in {minutes} minutes)"
            )?;
        }
        Ok(())
    }

    fn players_field(&self) -> String {
        let started = self.game.status == GameStatus::Started;
        let mut lines: Vec<(i64, String)> = self
            .players
            .iter()
            .map(|p| {
                let points = match p.points {
                    Some(points) if started && points != 0 => {
                        let plural = if points.abs() == 1 { "" } else { "s" };
                        format!(" ({points} point{plural})")
                    }
                    _ => String::new(),
                };
                (p.user_xid, format!("<@{}>{points}", p.user_xid))
            })
            .collect();
        lines.sort_by_key(|(xid, _)| *xid);
        lines
            .into_iter()
            .map(|(_, line)| line)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Renders the embed.
    pub fn render(&self) -> Result<GameEmbed> {
        let game = self.game;
        let mut fields = Vec::new();

        if !self.players.is_empty() {
            fields.push(EmbedField {
                name: "Players".to_string(),
                value: self.players_field(),
                inline: false,
            });
        }
        fields.push(EmbedField {
            name: "Format".to_string(),
            value: game.format.to_string(),
            inline: true,
        });
        if game.bracket != crate::entities::GameBracket::None {
            fields.push(EmbedField {
                name: "Bracket".to_string(),
                value: game.bracket.to_string(),
                inline: true,
            });
        }
        if let Some(started_at) = game.started_at {
            fields.push(EmbedField {
                name: "Started at".to_string(),
                value: format!("<t:{}>", started_at.timestamp()),
                inline: true,
            });
        }
        if let Some(voice) = game.voice_xid {
            if self.show_links() {
                fields.push(EmbedField {
                    name: "Voice Channel".to_string(),
                    value: format!("<#{voice}>"),
                    inline: true,
                });
            }
        }

        Ok(GameEmbed {
            title: self.title(),
            description: self.description()?,
            fields,
            footer: format!("SpellBot Game ID: #SB{}", game.id),
            color: self.settings.embed_color,
            thumbnail: self.settings.thumb_url.clone(),
        })
    }
}
