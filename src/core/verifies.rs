//! Verification - per guild user status gating verified and unverified channels.

use crate::{
    entities::{ChannelModel, Verify, verify},
    errors::Result,
};
use sea_orm::{Set, prelude::*, sea_query::OnConflict};

/// Refusal for a verified user in an unverified only channel.
pub const VERIFIED_IN_UNVERIFIED_ONLY: &str = "Verified user message in a unverified only channel.";
/// Refusal for an unverified user in a verified only channel.
pub const UNVERIFIED_IN_VERIFIED_ONLY: &str = "Unverified user message in a verified only channel.";

/// Records a user's status in a guild.
///
/// With `None` an unknown user is recorded as unverified and a known user
/// keeps their status.
pub async fn upsert_verify<C>(
    db: &C,
    guild_xid: i64,
    user_xid: i64,
    verified: Option<bool>,
) -> Result<()>
where
    C: ConnectionTrait,
{
    let model = verify::ActiveModel {
        guild_xid: Set(guild_xid),
        user_xid: Set(user_xid),
        verified: Set(verified.unwrap_or(false)),
    };
    let mut on_conflict = OnConflict::columns([verify::Column::GuildXid, verify::Column::UserXid]);
    let on_conflict = if verified.is_some() {
        on_conflict.update_column(verify::Column::Verified).to_owned()
    } else {
        on_conflict.do_nothing().to_owned()
    };
    Verify::insert(model)
        .on_conflict(on_conflict)
        .exec_without_returning(db)
        .await?;
    Ok(())
}

/// Whether the user is verified in the guild.
pub async fn is_verified<C>(db: &C, guild_xid: i64, user_xid: i64) -> Result<bool>
where
    C: ConnectionTrait,
{
    Ok(Verify::find_by_id((guild_xid, user_xid))
        .one(db)
        .await?
        .is_some_and(|v| v.verified))
}

/// The refusal a channel's verification rules give a user, if any.
#[must_use]
pub const fn channel_refusal(channel: &ChannelModel, verified: bool) -> Option<&'static str> {
    if verified && channel.unverified_only {
        return Some(VERIFIED_IN_UNVERIFIED_ONLY);
    }
    if !verified && channel.verified_only {
        return Some(UNVERIFIED_IN_VERIFIED_ONLY);
    }
    None
}

/// Applies a channel's verification rules to a user about to play there.
///
/// Auto verify channels verify the user first. Moderators are recorded but
/// never refused.
#[tracing::instrument(skip(db, channel), fields(channel_xid = channel.xid))]
pub async fn check_channel<C>(
    db: &C,
    channel: &ChannelModel,
    user_xid: i64,
    moderator: bool,
) -> Result<Option<&'static str>>
where
    C: ConnectionTrait,
{
    let update = channel.auto_verify.then_some(true);
    upsert_verify(db, channel.guild_xid, user_xid, update).await?;
    if moderator {
        return Ok(None);
    }
    let verified = is_verified(db, channel.guild_xid, user_xid).await?;
    Ok(channel_refusal(channel, verified))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::channels::{self, ChannelSetting};
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_upsert_verify() -> Result<()> {
        let db = setup_test_db().await?;

        upsert_verify(&db, 1, 100, None).await?;
        assert!(!is_verified(&db, 1, 100).await?);

        upsert_verify(&db, 1, 100, Some(true)).await?;
        assert!(is_verified(&db, 1, 100).await?);

        // An unknown status leaves a known one alone
        upsert_verify(&db, 1, 100, None).await?;
        assert!(is_verified(&db, 1, 100).await?);

        // Status is per guild
        assert!(!is_verified(&db, 2, 100).await?);

        upsert_verify(&db, 1, 100, Some(false)).await?;
        assert!(!is_verified(&db, 1, 100).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_channel_refusal() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_guild(&db, 1).await?;
        let open = create_test_channel(&db, 1, 10).await?;
        assert_eq!(channel_refusal(&open, true), None);
        assert_eq!(channel_refusal(&open, false), None);

        let verified_only =
            channels::update_channel_setting(&db, 10, ChannelSetting::VerifiedOnly(true)).await?;
        assert_eq!(channel_refusal(&verified_only, true), None);
        assert_eq!(channel_refusal(&verified_only, false), Some(UNVERIFIED_IN_VERIFIED_ONLY));

        create_test_channel(&db, 1, 11).await?;
        let unverified_only =
            channels::update_channel_setting(&db, 11, ChannelSetting::UnverifiedOnly(true)).await?;
        assert_eq!(channel_refusal(&unverified_only, true), Some(VERIFIED_IN_UNVERIFIED_ONLY));
        assert_eq!(channel_refusal(&unverified_only, false), None);
        Ok(())
    }

    #[tokio::test]
    async fn test_check_channel() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_guild(&db, 1).await?;
        create_test_channel(&db, 1, 10).await?;
        let channel =
            channels::update_channel_setting(&db, 10, ChannelSetting::VerifiedOnly(true)).await?;

        assert_eq!(
            check_channel(&db, &channel, 100, false).await?,
            Some(UNVERIFIED_IN_VERIFIED_ONLY)
        );
        assert_eq!(check_channel(&db, &channel, 100, true).await?, None);

        let channel =
            channels::update_channel_setting(&db, 10, ChannelSetting::AutoVerify(true)).await?;
        assert_eq!(check_channel(&db, &channel, 100, false).await?, None);
        assert!(is_verified(&db, 1, 100).await?);
        Ok(())
    }
}
