//! Guild business logic - registration and server-wide configuration.

use crate::{
    entities::{Channel, Guild, channel, guild},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QuerySelect, Set, prelude::*, sea_query::OnConflict};

const MAX_NAME_LEN: usize = 100;
const MAX_MOTD_LEN: usize = 255;

/// A single guild-wide setting change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuildSetting {
    /// Message of the day appended to every game post
    Motd(Option<String>),
    /// Show game links publicly
    ShowLinks(bool),
    /// Create voice channels for started games
    VoiceCreate(bool),
    /// Use the maximum bitrate for created voice channels
    UseMaxBitrate(bool),
}

/// Records a guild, refreshing its cached name when it already exists.
pub async fn upsert_guild<C>(db: &C, xid: i64, name: Option<&str>) -> Result<guild::Model>
where
    C: ConnectionTrait,
{
    let now = Utc::now();
    let name = name.map(|n| n.chars().take(MAX_NAME_LEN).collect::<String>());
    let refreshed = if name.is_some() {
        vec![guild::Column::Name, guild::Column::UpdatedAt]
    } else {
        vec![guild::Column::UpdatedAt]
    };
    let model = guild::ActiveModel {
        xid: Set(xid),
        created_at: Set(now),
        updated_at: Set(now),
        name: Set(name),
        motd: Set(None),
        show_links: Set(false),
        voice_create: Set(false),
        use_max_bitrate: Set(false),
        banned: Set(false),
        notice: Set(None),
        suggest_voice_category: Set(None),
    };

    Guild::insert(model)
        .on_conflict(
            OnConflict::column(guild::Column::Xid)
                .update_columns(refreshed)
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    Guild::find_by_id(xid)
        .one(db)
        .await?
        .ok_or_else(|| Error::Config {
            message: format!("Guild {xid} vanished after upsert"),
        })
}

/// Finds a guild by its Discord id.
pub async fn get_guild<C>(db: &C, xid: i64) -> Result<Option<guild::Model>>
where
    C: ConnectionTrait,
{
    Guild::find_by_id(xid).one(db).await.map_err(Into::into)
}

/// Applies one setting change to a guild.
pub async fn update_guild_setting(
    db: &DatabaseConnection,
    xid: i64,
    setting: GuildSetting,
) -> Result<guild::Model> {
    let mut model: guild::ActiveModel = get_guild(db, xid)
        .await?
        .ok_or_else(|| Error::InvalidInput {
            message: format!("Guild {xid} is not registered"),
        })?
        .into();

    match setting {
        GuildSetting::Motd(motd) => {
            model.motd = Set(motd.map(|m| m.chars().take(MAX_MOTD_LEN).collect()));
        }
        GuildSetting::ShowLinks(value) => model.show_links = Set(value),
        GuildSetting::VoiceCreate(value) => model.voice_create = Set(value),
        GuildSetting::UseMaxBitrate(value) => model.use_max_bitrate = Set(value),
    }
    model.updated_at = Set(Utc::now());

    model.update(db).await.map_err(Into::into)
}

/// Ids of every guild with voice channel creation enabled.
pub async fn voiced_guild_xids(db: &DatabaseConnection) -> Result<Vec<i64>> {
    Guild::find()
        .select_only()
        .column(guild::Column::Xid)
        .filter(guild::Column::VoiceCreate.eq(true))
        .into_tuple()
        .all(db)
        .await
        .map_err(Into::into)
}

/// Distinct voice category prefixes configured on a guild's channels.
pub async fn voice_category_prefixes(db: &DatabaseConnection, guild_xid: i64) -> Result<Vec<String>> {
    let prefixes: Vec<Option<String>> = Channel::find()
        .select_only()
        .column(channel::Column::VoiceCategory)
        .filter(channel::Column::GuildXid.eq(guild_xid))
        .distinct()
        .into_tuple()
        .all(db)
        .await?;

    let mut prefixes: Vec<String> = prefixes.into_iter().flatten().collect();
    prefixes.sort();
    prefixes.dedup();
    Ok(prefixes)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_upsert_guild_refreshes_name() -> Result<()> {
        let db = setup_test_db().await?;

        let created = upsert_guild(&db, 1, Some("Old Name")).await?;
        assert_eq!(created.name.as_deref(), Some("Old Name"));
        assert!(!created.show_links);

        update_guild_setting(&db, 1, GuildSetting::ShowLinks(true)).await?;
        let renamed = upsert_guild(&db, 1, Some("New Name")).await?;
        assert_eq!(renamed.name.as_deref(), Some("New Name"));
        // Settings survive a refresh
        assert!(renamed.show_links);

        // An unnamed refresh keeps the cached name
        let kept = upsert_guild(&db, 1, None).await?;
        assert_eq!(kept.name.as_deref(), Some("New Name"));

        Ok(())
    }

    #[tokio::test]
    async fn test_update_unknown_guild() -> Result<()> {
        let db = setup_test_db().await?;
        let result = update_guild_setting(&db, 404, GuildSetting::VoiceCreate(true)).await;
        assert!(matches!(result, Err(Error::InvalidInput { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_voiced_guilds_and_prefixes() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_guild(&db, 1).await?;
        create_test_guild(&db, 2).await?;
        update_guild_setting(&db, 2, GuildSetting::VoiceCreate(true)).await?;
        create_test_channel(&db, 2, 20).await?;
        create_test_channel(&db, 2, 21).await?;

        assert_eq!(voiced_guild_xids(&db).await?, vec![2]);
        assert_eq!(
            voice_category_prefixes(&db, 2).await?,
            vec!["SpellBot Voice Channels".to_string()]
        );
        assert!(voice_category_prefixes(&db, 1).await?.is_empty());

        Ok(())
    }
}
