//! Integer-backed enums shared by the game tables and the slash commands.
//!
//! Each enum is stored as an `INTEGER` column through `DeriveActiveEnum` and
//! offered as a choice list through `poise::ChoiceParameter`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "i32", db_type = "Integer")]
pub enum GameStatus {
    /// Seating players
    #[sea_orm(num_value = 1)]
    Pending,
    /// Every seat filled, link handed out
    #[sea_orm(num_value = 2)]
    Started,
}

/// A Magic: The Gathering game format.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    poise::ChoiceParameter,
)]
#[sea_orm(rs_type = "i32", db_type = "Integer")]
pub enum GameFormat {
    #[sea_orm(num_value = 1)]
    #[name = "Commander"]
    Commander,
    #[sea_orm(num_value = 2)]
    #[name = "Standard"]
    Standard,
    #[sea_orm(num_value = 3)]
    #[name = "Sealed"]
    Sealed,
    #[sea_orm(num_value = 4)]
    #[name = "Modern"]
    Modern,
    #[sea_orm(num_value = 5)]
    #[name = "Vintage"]
    Vintage,
    #[sea_orm(num_value = 6)]
    #[name = "Legacy"]
    Legacy,
    #[sea_orm(num_value = 7)]
    #[name = "Brawl Two Player"]
    BrawlTwoPlayer,
    #[sea_orm(num_value = 8)]
    #[name = "Brawl Multiplayer"]
    BrawlMultiplayer,
    #[sea_orm(num_value = 9)]
    #[name = "Two Headed Giant"]
    TwoHeadedGiant,
    #[sea_orm(num_value = 10)]
    #[name = "Pauper"]
    Pauper,
    #[sea_orm(num_value = 11)]
    #[name = "Pioneer"]
    Pioneer,
    #[sea_orm(num_value = 12)]
    #[name = "EDH Max"]
    EdhMax,
    #[sea_orm(num_value = 13)]
    #[name = "EDH High"]
    EdhHigh,
    #[sea_orm(num_value = 14)]
    #[name = "EDH Mid"]
    EdhMid,
    #[sea_orm(num_value = 15)]
    #[name = "EDH Low"]
    EdhLow,
    #[sea_orm(num_value = 16)]
    #[name = "EDH Battlecruiser"]
    EdhBattlecruiser,
    #[sea_orm(num_value = 17)]
    #[name = "Planechase"]
    Planechase,
    #[sea_orm(num_value = 18)]
    #[name = "Pre-Cons"]
    PreCons,
    #[sea_orm(num_value = 19)]
    #[name = "cEDH"]
    Cedh,
    #[sea_orm(num_value = 20)]
    #[name = "Pauper EDH"]
    PauperEdh,
    #[sea_orm(num_value = 21)]
    #[name = "Oathbreaker"]
    Oathbreaker,
    #[sea_orm(num_value = 22)]
    #[name = "Duel Commander"]
    DuelCommander,
    #[sea_orm(num_value = 23)]
    #[name = "Archenemy"]
    Archenemy,
}

impl GameFormat {
    /// Default number of players for a game in this format.
    #[must_use]
    pub const fn players(self) -> i32 {
        match self {
            Self::Standard
            | Self::Sealed
            | Self::Modern
            | Self::Vintage
            | Self::Legacy
            | Self::BrawlTwoPlayer
            | Self::Pauper
            | Self::Pioneer
            | Self::DuelCommander => 2,
            _ => 4,
        }
    }

    /// Whether this is one of the multiplayer commander variants.
    #[must_use]
    pub const fn is_commander(self) -> bool {
        matches!(
            self,
            Self::Commander
                | Self::EdhMax
                | Self::EdhHigh
                | Self::EdhMid
                | Self::EdhLow
                | Self::EdhBattlecruiser
                | Self::Planechase
                | Self::PreCons
                | Self::Cedh
                | Self::PauperEdh
        )
    }
}

impl fmt::Display for GameFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(poise::ChoiceParameter::name(self))
    }
}

/// Commander power bracket.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    poise::ChoiceParameter,
)]
#[sea_orm(rs_type = "i32", db_type = "Integer")]
pub enum GameBracket {
    #[sea_orm(num_value = 1)]
    #[name = "None"]
    None,
    #[sea_orm(num_value = 2)]
    #[name = "Bracket 1: Exhibition"]
    Exhibition,
    #[sea_orm(num_value = 3)]
    #[name = "Bracket 2: Core"]
    Core,
    #[sea_orm(num_value = 4)]
    #[name = "Bracket 3: Upgraded"]
    Upgraded,
    #[sea_orm(num_value = 5)]
    #[name = "Bracket 4: Optimized"]
    Optimized,
    #[sea_orm(num_value = 6)]
    #[name = "Bracket 5: cEDH"]
    Cedh,
}

impl fmt::Display for GameBracket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(poise::ChoiceParameter::name(self))
    }
}

/// Third-party service that hosts the table for a started game.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    poise::ChoiceParameter,
)]
#[sea_orm(rs_type = "i32", db_type = "Integer")]
pub enum GameService {
    #[sea_orm(num_value = 1)]
    #[name = "Not any"]
    NotAny,
    #[sea_orm(num_value = 2)]
    #[name = "SpellTable"]
    SpellTable,
    #[sea_orm(num_value = 3)]
    #[name = "Convoke"]
    Convoke,
    #[sea_orm(num_value = 4)]
    #[name = "TableStream"]
    TableStream,
}

impl GameService {
    /// Where players can create a table by hand when no link was generated.
    #[must_use]
    pub const fn fallback_url(self) -> Option<&'static str> {
        match self {
            Self::NotAny => None,
            Self::SpellTable => Some("https://spelltable.wizards.com/"),
            Self::Convoke => Some("https://www.convoke.games/"),
            Self::TableStream => Some("https://table-stream.com/"),
        }
    }
}

impl fmt::Display for GameService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(poise::ChoiceParameter::name(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_players() {
        assert_eq!(GameFormat::Commander.players(), 4);
        assert_eq!(GameFormat::Modern.players(), 2);
        assert_eq!(GameFormat::TwoHeadedGiant.players(), 4);
        assert_eq!(GameFormat::DuelCommander.players(), 2);
    }

    #[test]
    fn test_display_uses_choice_names() {
        assert_eq!(GameFormat::BrawlTwoPlayer.to_string(), "Brawl Two Player");
        assert_eq!(GameBracket::Core.to_string(), "Bracket 2: Core");
        assert_eq!(GameService::TableStream.to_string(), "TableStream");
    }

    #[test]
    fn test_integer_values() {
        assert_eq!(GameStatus::Pending.to_value(), 1);
        assert_eq!(GameStatus::Started.to_value(), 2);
        assert_eq!(GameFormat::Archenemy.to_value(), 23);
        assert_eq!(GameService::try_from_value(&3).ok(), Some(GameService::Convoke));
    }
}
