//! Unified error type for the bot, the matching engine and the web surface.

use thiserror::Error;

/// Every failure the crate can surface.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be read or is invalid
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// A user supplied value was rejected
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// Human-readable reason
        message: String,
    },

    /// Seat counts must be between 2 and 4
    #[error("Invalid seat count: {seats}")]
    InvalidSeats {
        /// The rejected seat count
        seats: i32,
    },

    /// More joiners than seats were requested
    #[error("Too many players ({requested}) for a {seats} seat game")]
    TooManyPlayers {
        /// Number of joiners requested
        requested: usize,
        /// Seats available in the game
        seats: i32,
    },

    /// No game with this id exists
    #[error("Game #SB{id} not found")]
    GameNotFound {
        /// SpellBot game id
        id: i32,
    },

    /// The game has no open seat left
    #[error("Game #SB{id} is full")]
    GameFull {
        /// SpellBot game id
        id: i32,
    },

    /// The game is no longer pending
    #[error("Game #SB{id} has already started")]
    GameAlreadyStarted {
        /// SpellBot game id
        id: i32,
    },

    /// The user did not play in the game
    #[error("User {user_xid} did not play in game #SB{game_id}")]
    NotAPlayer {
        /// SpellBot game id
        game_id: i32,
        /// Discord user id
        user_xid: i64,
    },

    /// The player already confirmed the game's points
    #[error("You've already confirmed your points for game SB{game_id}.")]
    AlreadyConfirmed {
        /// SpellBot game id
        game_id: i32,
    },

    /// Someone confirmed the game's points, so they can no longer change
    #[error("Points for game SB{game_id} are locked in, please confirm them or contact a mod.")]
    PointsLocked {
        /// SpellBot game id
        game_id: i32,
    },

    /// Points can not be confirmed before every player reported
    #[error("You must wait until all players have reported their points.")]
    PointsMissing {
        /// SpellBot game id
        game_id: i32,
    },

    /// A play service answered with something unusable
    #[error("{service} API error: {message}")]
    LinkService {
        /// Service name
        service: &'static str,
        /// What was wrong with the response
        message: String,
    },

    /// JSON encoding or decoding failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Database failure
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Outbound HTTP failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Discord API or gateway failure
    #[error("Serenity/Poise framework error: {0}")]
    Discord(Box<poise::serenity_prelude::Error>),

    /// String formatting failure
    #[error("Formatting error: {0}")]
    Fmt(#[from] std::fmt::Error),

    /// I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<poise::serenity_prelude::Error> for Error {
    fn from(value: poise::serenity_prelude::Error) -> Self {
        Self::Discord(Box::new(value))
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
