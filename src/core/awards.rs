//! Guild awards - roles granted or taken away at play-count milestones.
//!
//! After a game starts each player's plays in the guild are counted. An award
//! triggers when its count equals the play count, or, for repeating awards,
//! when its count divides it. A non-repeating award is never given twice in a
//! row; the last award given is remembered per user and guild.

use crate::{
    core::verifies,
    entities::{GuildAward, Play, UserAward, game, guild_award, play, user_award},
    errors::{Error, Result},
};
use sea_orm::{JoinType, QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait, prelude::*};
use std::collections::HashMap;
use tracing::info;

const MAX_ROLE_LEN: usize = 60;
const MAX_MESSAGE_LEN: usize = 500;

/// An award to hand to a player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAward {
    /// Role to add or remove
    pub role: String,
    /// Message sent to the player
    pub message: String,
    /// Remove the role instead of adding it
    pub remove: bool,
}

/// Parameters of a new guild award.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwardSpec {
    /// Play count that triggers the award
    pub count: i32,
    /// Role to add or remove
    pub role: String,
    /// Message sent to the player
    pub message: String,
    /// Trigger on every multiple of `count`
    pub repeating: bool,
    /// Remove the role instead of adding it
    pub remove: bool,
    /// Only verified players earn the award
    pub verified_only: bool,
    /// Only unverified players earn the award
    pub unverified_only: bool,
}

/// Creates a guild award.
pub async fn add_award(
    db: &DatabaseConnection,
    guild_xid: i64,
    spec: AwardSpec,
) -> Result<guild_award::Model> {
    if spec.count < 1 {
        return Err(Error::InvalidInput {
            message: "You can't create an award for zero games played.".to_string(),
        });
    }
    let role = spec.role.trim().trim_start_matches('@').to_string();
    if role.is_empty() || spec.message.trim().is_empty() {
        return Err(Error::InvalidInput {
            message: "Awards need both a role and a message.".to_string(),
        });
    }
    if spec.verified_only && spec.unverified_only {
        return Err(Error::InvalidInput {
            message: "Your award can't be both verified and unverified only.".to_string(),
        });
    }

    let award = guild_award::ActiveModel {
        guild_xid: Set(guild_xid),
        count: Set(spec.count),
        repeating: Set(spec.repeating),
        remove: Set(spec.remove),
        role: Set(role.chars().take(MAX_ROLE_LEN).collect()),
        message: Set(spec.message.chars().take(MAX_MESSAGE_LEN).collect()),
        verified_only: Set(spec.verified_only),
        unverified_only: Set(spec.unverified_only),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(guild_xid, award_id = award.id, count = award.count, "Added award");
    Ok(award)
}

/// Awards of a guild, lowest count first.
pub async fn list_awards(db: &DatabaseConnection, guild_xid: i64) -> Result<Vec<guild_award::Model>> {
    GuildAward::find()
        .filter(guild_award::Column::GuildXid.eq(guild_xid))
        .order_by_asc(guild_award::Column::Count)
        .order_by_asc(guild_award::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Deletes one of a guild's awards. Returns whether it existed.
pub async fn delete_award(db: &DatabaseConnection, guild_xid: i64, award_id: i32) -> Result<bool> {
    let result = GuildAward::delete_many()
        .filter(guild_award::Column::GuildXid.eq(guild_xid))
        .filter(guild_award::Column::Id.eq(award_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}

/// Number of games a user played in a guild.
pub async fn play_count<C>(db: &C, user_xid: i64, guild_xid: i64) -> Result<u64>
where
    C: ConnectionTrait,
{
    Play::find()
        .join(JoinType::InnerJoin, play::Relation::Game.def())
        .filter(play::Column::UserXid.eq(user_xid))
        .filter(game::Column::GuildXid.eq(guild_xid))
        .count(db)
        .await
        .map_err(Into::into)
}

/// Whether a player with this verification status may earn the award.
const fn eligible(award: &guild_award::Model, verified: bool) -> bool {
    !((award.verified_only && !verified) || (award.unverified_only && verified))
}

/// Picks the award triggered by a play count, preferring an exact match.
fn triggered(
    awards: &[guild_award::Model],
    plays: u64,
    verified: bool,
) -> Option<&guild_award::Model> {
    if plays == 0 {
        return None;
    }
    let mut candidates = awards.iter().filter(|a| eligible(a, verified));
    candidates
        .clone()
        .find(|a| u64::try_from(a.count).is_ok_and(|c| c == plays))
        .or_else(|| {
            candidates.rfind(|a| {
                a.repeating && u64::try_from(a.count).is_ok_and(|c| c > 0 && plays % c == 0)
            })
        })
}

/// Works out which players earned an award, recording it against them.
pub async fn give_awards(
    db: &DatabaseConnection,
    guild_xid: i64,
    player_xids: &[i64],
) -> Result<HashMap<i64, NewAward>> {
    let awards = list_awards(db, guild_xid).await?;
    if awards.is_empty() {
        return Ok(HashMap::new());
    }

    let txn = db.begin().await?;
    let mut given = HashMap::new();

    for &player_xid in player_xids {
        let plays = play_count(&txn, player_xid, guild_xid).await?;
        let verified = verifies::is_verified(&txn, guild_xid, player_xid).await?;
        let Some(award) = triggered(&awards, plays, verified) else {
            continue;
        };

        let last = UserAward::find_by_id((player_xid, guild_xid)).one(&txn).await?;
        let last_award_id = last.as_ref().and_then(|ua| ua.guild_award_id);
        if last_award_id == Some(award.id) && !award.repeating {
            continue;
        }

        match last {
            Some(existing) => {
                let mut model: user_award::ActiveModel = existing.into();
                model.guild_award_id = Set(Some(award.id));
                model.update(&txn).await?;
            }
            None => {
                user_award::ActiveModel {
                    user_xid: Set(player_xid),
                    guild_xid: Set(guild_xid),
                    guild_award_id: Set(Some(award.id)),
                }
                .insert(&txn)
                .await?;
            }
        }

        given.insert(
            player_xid,
            NewAward {
                role: award.role.clone(),
                message: award.message.clone(),
                remove: award.remove,
            },
        );
    }

    txn.commit().await?;
    Ok(given)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::games::{self, JoinRequest};
    use crate::entities::{GameBracket, GameFormat, GameService};
    use crate::test_utils::*;

    fn spec(count: i32, role: &str, repeating: bool) -> AwardSpec {
        AwardSpec {
            count,
            role: role.to_string(),
            message: format!("You earned {role}!"),
            repeating,
            remove: false,
            verified_only: false,
            unverified_only: false,
        }
    }

    async fn play_game(db: &DatabaseConnection, players: &[i64]) -> Result<()> {
        let request = JoinRequest {
            guild_xid: 1,
            channel_xid: 10,
            author_xid: players[0],
            friend_xids: players[1..].to_vec(),
            seats: i32::try_from(players.len()).unwrap(),
            format: GameFormat::Commander,
            bracket: GameBracket::None,
            service: GameService::NotAny,
        };
        let (game, _) = games::upsert(db, &request, true).await?;
        games::make_ready(db, game.id, None, None).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_add_award_validation() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_guild(&db, 1).await?;

        assert!(matches!(
            add_award(&db, 1, spec(0, "Zero", false)).await,
            Err(Error::InvalidInput { .. })
        ));
        assert!(matches!(
            add_award(&db, 1, spec(1, "  ", false)).await,
            Err(Error::InvalidInput { .. })
        ));

        let award = add_award(&db, 1, spec(5, "@Regular", false)).await?;
        assert_eq!(award.role, "Regular");
        assert_eq!(list_awards(&db, 1).await?.len(), 1);

        let mut both = spec(3, "Confused", false);
        both.verified_only = true;
        both.unverified_only = true;
        assert!(matches!(add_award(&db, 1, both).await, Err(Error::InvalidInput { .. })));

        assert!(delete_award(&db, 1, award.id).await?);
        assert!(!delete_award(&db, 1, award.id).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_give_awards_once_at_threshold() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_guild(&db, 1).await?;
        create_test_channel(&db, 1, 10).await?;
        add_award(&db, 1, spec(2, "Veteran", false)).await?;

        play_game(&db, &[100, 101]).await?;
        assert!(give_awards(&db, 1, &[100, 101]).await?.is_empty());

        play_game(&db, &[100, 102]).await?;
        let given = give_awards(&db, 1, &[100, 102]).await?;
        assert_eq!(given.len(), 1);
        assert_eq!(given[&100].role, "Veteran");

        // Same play count again does not repeat a one-off award
        assert!(give_awards(&db, 1, &[100]).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_repeating_award() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_guild(&db, 1).await?;
        create_test_channel(&db, 1, 10).await?;
        add_award(&db, 1, spec(1, "Player", true)).await?;

        play_game(&db, &[100, 101]).await?;
        assert!(give_awards(&db, 1, &[100]).await?.contains_key(&100));
        play_game(&db, &[100, 101]).await?;
        assert!(give_awards(&db, 1, &[100]).await?.contains_key(&100));
        Ok(())
    }

    #[test]
    fn test_triggered_prefers_exact_match() {
        let award = |id, count, repeating| guild_award::Model {
            id,
            guild_xid: 1,
            count,
            repeating,
            remove: false,
            role: format!("r{id}"),
            message: String::new(),
            verified_only: false,
            unverified_only: false,
        };
        let awards = vec![award(1, 2, true), award(2, 4, false), award(3, 5, true)];

        assert_eq!(triggered(&awards, 4, false).map(|a| a.id), Some(2));
        assert_eq!(triggered(&awards, 6, false).map(|a| a.id), Some(1));
        assert_eq!(triggered(&awards, 10, false).map(|a| a.id), Some(3));
        assert_eq!(triggered(&awards, 3, false), None);
        assert_eq!(triggered(&awards, 0, false), None);
    }

    #[tokio::test]
    async fn test_verified_only_awards() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_guild(&db, 1).await?;
        create_test_channel(&db, 1, 10).await?;
        let mut verified = spec(1, "Trusted", false);
        verified.verified_only = true;
        add_award(&db, 1, verified).await?;
        let mut unverified = spec(1, "Newcomer", false);
        unverified.unverified_only = true;
        add_award(&db, 1, unverified).await?;
        verifies::upsert_verify(&db, 1, 100, Some(true)).await?;

        play_game(&db, &[100, 101]).await?;
        let given = give_awards(&db, 1, &[100, 101]).await?;
        assert_eq!(given[&100].role, "Trusted");
        assert_eq!(given[&101].role, "Newcomer");
        Ok(())
    }
}
