//! Convoke private game creation.

use super::GameLink;
use crate::{
    entities::{GameFormat, GameModel},
    errors::Result,
};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

const ADJECTIVES: &[&str] = &[
    "ancient", "angry", "arcane", "blazing", "cursed", "dark", "eternal", "fierce", "giant",
    "grim", "hidden", "lucky", "mighty", "mystic", "ominous", "sacred", "shiny", "swift",
    "twisted", "wild",
];

const NOUNS: &[&str] = &[
    "angel", "beast", "bolt", "counter", "dragon", "elf", "fetch", "goblin", "land", "mana",
    "merfolk", "sliver", "sorcery", "stack", "storm", "token", "wizard", "zombie",
];

/// Generates a two word table password such as `"mystic goblin"`.
#[must_use]
pub fn passphrase() -> String {
    let mut rng = rand::thread_rng();
    let adjective = ADJECTIVES.choose(&mut rng).copied().unwrap_or("mystic");
    let noun = NOUNS.choose(&mut rng).copied().unwrap_or("goblin");
    format!("{adjective} {noun}")
}

/// Convoke format name and seat limit for a game format.
#[must_use]
pub const fn game_type(format: GameFormat) -> (&'static str, i32) {
    if format.is_commander() {
        return ("commander", 4);
    }
    match format {
        GameFormat::Modern => ("modern", 2),
        GameFormat::Standard => ("standard", 2),
        _ => ("other", 4),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateGame<'a> {
    api_key: &'a str,
    name: String,
    is_public: bool,
    seat_limit: i32,
    password: &'a str,
    format: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreatedGame {
    id: String,
    password: Option<String>,
}

/// Asks Convoke for a private game protected by `password`.
pub async fn create_game(
    client: &reqwest::Client,
    root: &str,
    api_key: &str,
    game: &GameModel,
    password: &str,
) -> Result<GameLink> {
    let (format, seat_limit) = game_type(game.format);
    let payload = CreateGame {
        api_key,
        name: format!("SB{}", game.id),
        is_public: false,
        seat_limit,
        password,
        format,
    };
    let created: CreatedGame = client
        .post(format!("{root}/game/create-game"))
        .json(&payload)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    Ok(GameLink {
        link: Some(format!("https://www.convoke.games/en/play/private/{}", created.id)),
        password: created.password.or_else(|| Some(password.to_string())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passphrase_shape() {
        let phrase = passphrase();
        let words: Vec<&str> = phrase.split(' ').collect();
        assert_eq!(words.len(), 2);
        assert!(ADJECTIVES.contains(&words[0]));
        assert!(NOUNS.contains(&words[1]));
    }

    #[test]
    fn test_game_type_mapping() {
        assert_eq!(game_type(GameFormat::Cedh), ("commander", 4));
        assert_eq!(game_type(GameFormat::Modern), ("modern", 2));
        assert_eq!(game_type(GameFormat::Standard), ("standard", 2));
        assert_eq!(game_type(GameFormat::Legacy), ("other", 4));
    }

    #[test]
    fn test_payload_field_names() -> Result<()> {
        let payload = CreateGame {
            api_key: "k",
            name: "SB1".to_string(),
            is_public: false,
            seat_limit: 4,
            password: "wild elf",
            format: "commander",
        };
        let json = serde_json::to_value(&payload)?;
        assert_eq!(json["apiKey"], "k");
        assert_eq!(json["isPublic"], false);
        assert_eq!(json["seatLimit"], 4);
        Ok(())
    }
}
