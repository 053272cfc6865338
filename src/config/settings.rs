//! Application settings.
//!
//! Tunables are read from an optional TOML file (`SPELLBOT_CONFIG`, default
//! `spellbot.toml`) and then overridden by environment variables for secrets
//! and deployment values. A missing file means every default applies.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Every tunable the bot reads at startup.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Discord bot token
    pub bot_token: Option<String>,
    /// Guild to register commands in instead of globally
    pub debug_guild: Option<u64>,
    /// Host for the web API
    pub host: String,
    /// Port for the web API
    pub port: u16,

    /// SpellTable game creation endpoint
    pub spelltable_create: String,
    /// SpellTable API key
    pub spelltable_auth_key: Option<String>,
    /// Convoke API root
    pub convoke_root: String,
    /// Convoke API key
    pub convoke_api_key: Option<String>,
    /// TableStream room creation endpoint
    pub tablestream_create: String,
    /// TableStream API key
    pub tablestream_auth_key: Option<String>,
    /// Attempts per link request
    pub link_retry_attempts: u32,
    /// Timeout per link request, in seconds
    pub link_timeout_s: u64,

    /// Embed colour for game posts
    pub embed_color: u32,
    /// Thumbnail shown on game posts
    pub thumb_url: String,
    /// Role name prefix identifying moderators
    pub mod_prefix: String,
    /// Most pending games a user may sit in at once
    pub max_pending_games: u64,
    /// Lifetime of voice channel invites, in seconds
    pub voice_invite_expire_time_s: u32,

    /// Voice channels younger than this are never deleted, in minutes
    pub voice_grace_period_m: i64,
    /// Occupied voice channels older than this are deleted anyway, in hours
    pub voice_age_limit_h: i64,
    /// Interval between voice cleanup runs, in minutes
    pub voice_cleanup_loop_m: u64,
    /// Most voice channels deleted per cleanup run
    pub voice_cleanup_batch: usize,
    /// Interval between expiry runs, in minutes
    pub expire_games_loop_m: u64,
    /// Pending games untouched for this long expire, in minutes
    pub expire_time_m: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bot_token: None,
            debug_guild: None,
            host: "localhost".to_string(),
            port: 3008,
            spelltable_create:
                "https://us-central1-magic-night-30324.cloudfunctions.net/createGame".to_string(),
            spelltable_auth_key: None,
            convoke_root: "https://api.convoke.games/api".to_string(),
            convoke_api_key: None,
            tablestream_create: "https://api.table-stream.com/create-room".to_string(),
            tablestream_auth_key: None,
            link_retry_attempts: 2,
            link_timeout_s: 3,
            embed_color: 0x005A_3EFD,
            thumb_url: "https://raw.githubusercontent.com/lexicalunit/spellbot/main/spellbot.png"
                .to_string(),
            mod_prefix: "Moderator".to_string(),
            max_pending_games: 5,
            voice_invite_expire_time_s: 14_400,
            voice_grace_period_m: 10,
            voice_age_limit_h: 5,
            voice_cleanup_loop_m: 30,
            voice_cleanup_batch: 30,
            expire_games_loop_m: 10,
            expire_time_m: 45,
        }
    }
}

impl Settings {
    /// Parses settings from TOML text; absent keys keep their defaults.
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| Error::Config {
            message: format!("Failed to parse settings: {e}"),
        })
    }

    /// Reads settings from a TOML file, falling back to defaults when it does not exist.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!("No settings file at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("Failed to read settings file {path:?}: {e}"),
        })?;
        Self::from_toml(&contents)
    }

    /// Applies environment overrides on top of the current values.
    pub fn apply_env(mut self) -> Result<Self> {
        if let Some(token) = env_var("BOT_TOKEN").or_else(|| env_var("DISCORD_BOT_TOKEN")) {
            self.bot_token = Some(token);
        }
        if let Some(guild) = env_var("DEBUG_GUILD") {
            self.debug_guild = Some(guild.parse().map_err(|e| Error::Config {
                message: format!("DEBUG_GUILD is not a guild id: {e}"),
            })?);
        }
        if let Some(host) = env_var("HOST") {
            self.host = host;
        }
        if let Some(port) = env_var("PORT") {
            self.port = port.parse().map_err(|e| Error::Config {
                message: format!("PORT is not a port number: {e}"),
            })?;
        }
        if let Some(key) = env_var("SPELLTABLE_AUTH_KEY") {
            self.spelltable_auth_key = Some(key);
        }
        if let Some(key) = env_var("CONVOKE_API_KEY") {
            self.convoke_api_key = Some(key);
        }
        if let Some(key) = env_var("TABLESTREAM_AUTH_KEY") {
            self.tablestream_auth_key = Some(key);
        }
        Ok(self)
    }

    /// Loads the settings file named by `SPELLBOT_CONFIG` and applies environment overrides.
    pub fn load() -> Result<Self> {
        let path = env_var("SPELLBOT_CONFIG").unwrap_or_else(|| "spellbot.toml".to_string());
        Self::from_file(path)?.apply_env()
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.expire_time_m, 45);
        assert_eq!(settings.max_pending_games, 5);
        assert_eq!(settings.link_retry_attempts, 2);
        assert_eq!(settings.embed_color, 0x5A3EFD);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings = Settings::from_toml(
            r#"
            expire_time_m = 30
            mod_prefix = "Mods"
            "#,
        )
        .unwrap();
        assert_eq!(settings.expire_time_m, 30);
        assert_eq!(settings.mod_prefix, "Mods");
        assert_eq!(settings.voice_cleanup_batch, 30);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let result = Settings::from_toml("expire_time_m = \"soon\"");
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let settings = Settings::from_toml(
            r#"
            api_base_url = "https://example.com"
            port = 8080
            "#,
        )
        .unwrap();
        assert_eq!(settings.port, 8080);
        assert_eq!(settings.host, "localhost");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let settings = Settings::from_file("does/not/exist.toml").unwrap();
        assert_eq!(settings.port, 3008);
    }
}
