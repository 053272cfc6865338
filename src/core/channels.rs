//! Channel business logic - registration and per-channel game defaults.

use crate::{
    entities::{Channel, GameBracket, GameFormat, GameService, channel},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{Set, prelude::*, sea_query::OnConflict};

/// Default name prefix for game voice channel categories.
pub const DEFAULT_VOICE_CATEGORY: &str = "SpellBot Voice Channels";

const MAX_TEXT_LEN: usize = 255;
const MAX_CATEGORY_LEN: usize = 50;

/// A single channel setting change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelSetting {
    /// Seats for new games (2 to 4)
    DefaultSeats(i32),
    /// Format for new games
    DefaultFormat(GameFormat),
    /// Bracket for new games
    DefaultBracket(GameBracket),
    /// Service used for game links
    DefaultService(GameService),
    /// Message of the day for game posts
    Motd(Option<String>),
    /// Extra content posted with game embeds
    Extra(Option<String>),
    /// Voice category name prefix
    VoiceCategory(String),
    /// Create voice channel invites
    VoiceInvite(bool),
    /// Delete expired game posts
    DeleteExpired(bool),
    /// Allow points reporting
    ShowPoints(bool),
    /// Lock reported points until every player confirms them
    RequireConfirmation(bool),
    /// Verify every user who plays here
    AutoVerify(bool),
    /// Restrict play to verified users
    VerifiedOnly(bool),
    /// Restrict play to unverified users
    UnverifiedOnly(bool),
}

/// Validates a seat count for games and channel defaults.
pub const fn validate_seats(seats: i32) -> Result<i32> {
    if seats < 2 || seats > 4 {
        return Err(Error::InvalidSeats { seats });
    }
    Ok(seats)
}

/// Records a channel, refreshing its cached name when it already exists.
pub async fn upsert_channel<C>(
    db: &C,
    xid: i64,
    guild_xid: i64,
    name: Option<&str>,
) -> Result<channel::Model>
where
    C: ConnectionTrait,
{
    let now = Utc::now();
    let refreshed = if name.is_some() {
        vec![channel::Column::Name, channel::Column::UpdatedAt]
    } else {
        vec![channel::Column::UpdatedAt]
    };
    let model = channel::ActiveModel {
        xid: Set(xid),
        guild_xid: Set(guild_xid),
        created_at: Set(now),
        updated_at: Set(now),
        name: Set(name.map(|n| n.chars().take(100).collect())),
        default_seats: Set(4),
        default_format: Set(GameFormat::Commander),
        default_bracket: Set(GameBracket::None),
        default_service: Set(GameService::SpellTable),
        motd: Set(None),
        extra: Set(None),
        voice_category: Set(Some(DEFAULT_VOICE_CATEGORY.to_string())),
        voice_invite: Set(false),
        delete_expired: Set(false),
        show_points: Set(false),
        require_confirmation: Set(false),
        auto_verify: Set(false),
        verified_only: Set(false),
        unverified_only: Set(false),
    };

    Channel::insert(model)
        .on_conflict(
            OnConflict::column(channel::Column::Xid)
                .update_columns(refreshed)
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    Channel::find_by_id(xid)
        .one(db)
        .await?
        .ok_or_else(|| Error::Config {
            message: format!("Channel {xid} vanished after upsert"),
        })
}

/// Finds a channel by its Discord id.
pub async fn get_channel<C>(db: &C, xid: i64) -> Result<Option<channel::Model>>
where
    C: ConnectionTrait,
{
    Channel::find_by_id(xid).one(db).await.map_err(Into::into)
}

fn clip(text: Option<String>, len: usize) -> Option<String> {
    text.map(|t| t.chars().take(len).collect())
}

/// Applies one setting change to a channel.
pub async fn update_channel_setting(
    db: &DatabaseConnection,
    xid: i64,
    setting: ChannelSetting,
) -> Result<channel::Model> {
    let mut model: channel::ActiveModel = get_channel(db, xid)
        .await?
        .ok_or_else(|| Error::InvalidInput {
            message: format!("Channel {xid} is not registered"),
        })?
        .into();

    match setting {
        ChannelSetting::DefaultSeats(seats) => model.default_seats = Set(validate_seats(seats)?),
        ChannelSetting::DefaultFormat(format) => model.default_format = Set(format),
        ChannelSetting::DefaultBracket(bracket) => model.default_bracket = Set(bracket),
        ChannelSetting::DefaultService(service) => model.default_service = Set(service),
        ChannelSetting::Motd(motd) => model.motd = Set(clip(motd, MAX_TEXT_LEN)),
        ChannelSetting::Extra(extra) => model.extra = Set(clip(extra, MAX_TEXT_LEN)),
        ChannelSetting::VoiceCategory(category) => {
            if category.trim().is_empty() {
                return Err(Error::InvalidInput {
                    message: "Voice category can not be empty".to_string(),
                });
            }
            model.voice_category = Set(clip(Some(category.trim().to_string()), MAX_CATEGORY_LEN));
        }
        ChannelSetting::VoiceInvite(value) => model.voice_invite = Set(value),
        ChannelSetting::DeleteExpired(value) => model.delete_expired = Set(value),
        ChannelSetting::ShowPoints(value) => model.show_points = Set(value),
        ChannelSetting::RequireConfirmation(value) => model.require_confirmation = Set(value),
        ChannelSetting::AutoVerify(value) => model.auto_verify = Set(value),
        ChannelSetting::VerifiedOnly(value) => model.verified_only = Set(value),
        ChannelSetting::UnverifiedOnly(value) => model.unverified_only = Set(value),
    }
    model.updated_at = Set(Utc::now());

    model.update(db).await.map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_upsert_channel_defaults() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_guild(&db, 1).await?;

        let channel = upsert_channel(&db, 10, 1, Some("lfg")).await?;
        assert_eq!(channel.default_seats, 4);
        assert_eq!(channel.default_format, GameFormat::Commander);
        assert_eq!(channel.default_bracket, GameBracket::None);
        assert_eq!(channel.default_service, GameService::SpellTable);
        assert_eq!(channel.voice_category.as_deref(), Some(DEFAULT_VOICE_CATEGORY));

        Ok(())
    }

    #[tokio::test]
    async fn test_update_channel_settings() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_guild(&db, 1).await?;
        create_test_channel(&db, 1, 10).await?;

        let updated = update_channel_setting(&db, 10, ChannelSetting::DefaultSeats(2)).await?;
        assert_eq!(updated.default_seats, 2);

        let updated = update_channel_setting(
            &db,
            10,
            ChannelSetting::DefaultService(GameService::Convoke),
        )
        .await?;
        assert_eq!(updated.default_service, GameService::Convoke);
        assert_eq!(updated.default_seats, 2);

        let updated =
            update_channel_setting(&db, 10, ChannelSetting::Motd(Some("x".repeat(300)))).await?;
        assert_eq!(updated.motd.unwrap().len(), 255);

        let updated = update_channel_setting(&db, 10, ChannelSetting::VerifiedOnly(true)).await?;
        assert!(updated.verified_only);
        assert!(!updated.unverified_only);
        let updated = update_channel_setting(&db, 10, ChannelSetting::AutoVerify(true)).await?;
        assert!(updated.auto_verify);
        let updated =
            update_channel_setting(&db, 10, ChannelSetting::RequireConfirmation(true)).await?;
        assert!(updated.require_confirmation);

        Ok(())
    }

    #[test]
    fn test_validate_seats_bounds() {
        assert!(matches!(validate_seats(1), Err(Error::InvalidSeats { seats: 1 })));
        assert_eq!(validate_seats(2).unwrap(), 2);
        assert_eq!(validate_seats(4).unwrap(), 4);
        assert!(validate_seats(5).is_err());
    }

    #[tokio::test]
    async fn test_invalid_seats_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_guild(&db, 1).await?;
        create_test_channel(&db, 1, 10).await?;

        for seats in [0, 1, 5, -1] {
            let result = update_channel_setting(&db, 10, ChannelSetting::DefaultSeats(seats)).await;
            assert!(matches!(result, Err(Error::InvalidSeats { .. })));
        }

        let channel = get_channel(&db, 10).await?.unwrap();
        assert_eq!(channel.default_seats, 4);
        Ok(())
    }
}
