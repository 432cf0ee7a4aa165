//! Winner propagation from a decided match into the next round.
//!
//! Nothing about a winner is stored on the slots themselves; it is always
//! re-derived from the decided match, so `advance` can be called any number of
//! times for the same slot.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use super::config::BracketConfig;
use super::errors::{BracketError, BracketResult};
use super::models::{
    Advancement, BracketSlot, Match, MatchStatus, NewMatch, Side, SlotId, TeamId,
};
use crate::db::{BracketStore, MatchService};

/// Load a slot and the match it is linked to.
///
/// # Errors
///
/// * `BracketError::SlotNotFound` - no such slot
/// * `BracketError::NoMatch` - the slot's participants are not known yet
/// * `BracketError::MatchNotFound` - the linked match is gone
pub(crate) async fn load_slot_with_match(
    store: &dyn BracketStore,
    matches: &dyn MatchService,
    slot_id: SlotId,
) -> BracketResult<(BracketSlot, Match)> {
    let slot = store
        .get(slot_id)
        .await?
        .ok_or(BracketError::SlotNotFound(slot_id))?;
    let match_id = slot.match_id.ok_or(BracketError::NoMatch(slot_id))?;
    let game = matches
        .get(match_id)
        .await?
        .ok_or(BracketError::MatchNotFound(match_id))?;
    Ok((slot, game))
}

/// Advances winners through the bracket
#[derive(Clone)]
pub struct AdvancementEngine {
    store: Arc<dyn BracketStore>,
    matches: Arc<dyn MatchService>,
    match_type: String,
    schedule_offset_days: i64,
}

impl AdvancementEngine {
    pub fn new(
        store: Arc<dyn BracketStore>,
        matches: Arc<dyn MatchService>,
        config: &BracketConfig,
    ) -> Self {
        Self {
            store,
            matches,
            match_type: config.match_type.clone(),
            schedule_offset_days: config.advancement_offset_days,
        }
    }

    /// Advance the winner of the match in `slot_id`.
    ///
    /// Once both feeders of the next slot have a winner, the next-round match
    /// is created (winner of the home feeder at home) and linked to it. The
    /// caller must hold the competition's lock; see
    /// [`BracketManager::advance_winner`](super::BracketManager::advance_winner).
    ///
    /// # Errors
    ///
    /// * `BracketError::NotCompleted` - match not completed or forfeited
    /// * `BracketError::MissingScores` - a score is missing
    /// * `BracketError::TiedScore` - scores are level; ties are resolved manually
    /// * `BracketError::ScheduleOutOfRange` - the next-round date overflows
    pub async fn advance(&self, slot_id: SlotId) -> BracketResult<Advancement> {
        let (_, game) =
            load_slot_with_match(self.store.as_ref(), self.matches.as_ref(), slot_id).await?;
        let winner = game.winner()?;

        let Some(next) = self.store.find_feeding(slot_id).await? else {
            log::debug!("Slot {} is a final, team {} wins the tier", slot_id, winner);
            return Ok(Advancement::Terminal { winner });
        };

        if next.match_id.is_some() {
            return Ok(Advancement::AlreadyScheduled(next));
        }

        let (side, sibling_id) = match (next.side_fed_by(slot_id), next.sibling_of(slot_id)) {
            (Some(side), Some(sibling)) => (side, sibling),
            _ => {
                return Err(BracketError::Storage(format!(
                    "slot {} is not a feeder of slot {}",
                    slot_id, next.id
                )));
            }
        };

        let Some(opponent) = self.resolved_winner(sibling_id).await? else {
            log::debug!(
                "Team {} advances to slot {}, waiting on slot {}",
                winner,
                next.id,
                sibling_id
            );
            return Ok(Advancement::AwaitingOpponent(next));
        };

        let (home_team_id, away_team_id) = match side {
            Side::Home => (winner, opponent),
            Side::Away => (opponent, winner),
        };

        let scheduled_at = self.next_round_date()?;
        let match_id = self
            .matches
            .create(&NewMatch {
                home_team_id,
                away_team_id,
                scheduled_at,
                status: MatchStatus::Scheduled,
                match_type: self.match_type.clone(),
            })
            .await?;

        let linked = match self.store.link_match(next.id, match_id).await {
            Ok(linked) => linked,
            Err(e) => {
                // The match is unreachable without the link
                if let Err(cleanup) = self.matches.delete(match_id).await {
                    log::error!(
                        "Failed to delete unlinked match {} for slot {}: {}",
                        match_id,
                        next.id,
                        cleanup
                    );
                }
                return Err(e);
            }
        };

        if !linked {
            // Another writer linked a match first; keep theirs
            log::warn!(
                "Slot {} was linked concurrently, discarding match {}",
                next.id,
                match_id
            );
            self.matches.delete(match_id).await?;
            let current = self
                .store
                .get(next.id)
                .await?
                .ok_or(BracketError::SlotNotFound(next.id))?;
            return Ok(Advancement::AlreadyScheduled(current));
        }

        log::info!(
            "Scheduled {} match {} in slot {}: team {} vs team {}",
            next.round,
            match_id,
            next.id,
            home_team_id,
            away_team_id
        );

        Ok(Advancement::MatchCreated(BracketSlot {
            match_id: Some(match_id),
            ..next
        }))
    }

    fn next_round_date(&self) -> BracketResult<DateTime<Utc>> {
        Duration::try_days(self.schedule_offset_days)
            .and_then(|offset| Utc::now().checked_add_signed(offset))
            .ok_or(BracketError::ScheduleOutOfRange(self.schedule_offset_days))
    }

    /// Winner of a slot's match if it is decided, `None` if not yet.
    async fn resolved_winner(&self, slot_id: SlotId) -> BracketResult<Option<TeamId>> {
        let slot = self
            .store
            .get(slot_id)
            .await?
            .ok_or(BracketError::SlotNotFound(slot_id))?;

        let Some(match_id) = slot.match_id else {
            return Ok(None);
        };

        let game = self
            .matches
            .get(match_id)
            .await?
            .ok_or(BracketError::MatchNotFound(match_id))?;

        Ok(game.winner().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::models::{CompetitionKey, MatchId, NewBracketSlot, Round, SlotSource};
    use crate::db::{InMemoryBracketStore, InMemoryMatchService};
    use async_trait::async_trait;

    /// Store whose links always fail, as if the connection dropped mid-call
    struct LinkFailingStore(InMemoryBracketStore);

    #[async_trait]
    impl BracketStore for LinkFailingStore {
        async fn insert(&self, slot: &NewBracketSlot) -> BracketResult<SlotId> {
            self.0.insert(slot).await
        }

        async fn get(&self, slot_id: SlotId) -> BracketResult<Option<BracketSlot>> {
            self.0.get(slot_id).await
        }

        async fn find_feeding(&self, slot_id: SlotId) -> BracketResult<Option<BracketSlot>> {
            self.0.find_feeding(slot_id).await
        }

        async fn list_by_competition(
            &self,
            key: &CompetitionKey,
        ) -> BracketResult<Vec<BracketSlot>> {
            self.0.list_by_competition(key).await
        }

        async fn link_match(&self, _slot_id: SlotId, _match_id: MatchId) -> BracketResult<bool> {
            Err(BracketError::Storage("connection reset".to_string()))
        }

        async fn delete(&self, slot_id: SlotId) -> BracketResult<()> {
            self.0.delete(slot_id).await
        }
    }

    struct Fixture {
        store: InMemoryBracketStore,
        matches: InMemoryMatchService,
        engine: AdvancementEngine,
        qf: [SlotId; 2],
        semi: SlotId,
    }

    async fn quarterfinal(
        store: &InMemoryBracketStore,
        matches: &InMemoryMatchService,
        position: u8,
        teams: (TeamId, TeamId),
    ) -> SlotId {
        let match_id = matches
            .create(&NewMatch {
                home_team_id: teams.0,
                away_team_id: teams.1,
                scheduled_at: Utc::now(),
                status: MatchStatus::Scheduled,
                match_type: "playoff".to_string(),
            })
            .await
            .unwrap();
        store
            .insert(&NewBracketSlot {
                key: CompetitionKey::new("Metro", "2024", "U12"),
                tier: "Gold".to_string(),
                round: Round::Quarterfinal,
                position,
                source: SlotSource::Seeds { home: 1, away: 8 },
                match_id: Some(match_id),
            })
            .await
            .unwrap()
    }

    /// Two quarterfinals feeding one semifinal
    async fn fixture() -> Fixture {
        let store = InMemoryBracketStore::new();
        let matches = InMemoryMatchService::new();
        let qf1 = quarterfinal(&store, &matches, 1, (1, 8)).await;
        let qf2 = quarterfinal(&store, &matches, 2, (4, 5)).await;
        let semi = store
            .insert(&NewBracketSlot {
                key: CompetitionKey::new("Metro", "2024", "U12"),
                tier: "Gold".to_string(),
                round: Round::Semifinal,
                position: 1,
                source: SlotSource::Feeders {
                    home: qf1,
                    away: qf2,
                },
                match_id: None,
            })
            .await
            .unwrap();

        let engine = AdvancementEngine::new(
            Arc::new(store.clone()),
            Arc::new(matches.clone()),
            &BracketConfig::default(),
        );

        Fixture {
            store,
            matches,
            engine,
            qf: [qf1, qf2],
            semi,
        }
    }

    impl Fixture {
        async fn match_of(&self, slot_id: SlotId) -> i64 {
            self.store.get(slot_id).await.unwrap().unwrap().match_id.unwrap()
        }
    }

    #[tokio::test]
    async fn test_first_winner_waits_for_opponent() {
        let f = fixture().await;
        f.matches.record_result(f.match_of(f.qf[0]).await, 3, 1).unwrap();

        let outcome = f.engine.advance(f.qf[0]).await.unwrap();
        match outcome {
            Advancement::AwaitingOpponent(slot) => {
                assert_eq!(slot.id, f.semi);
                assert_eq!(slot.match_id, None);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(f.matches.len(), 2);
    }

    #[tokio::test]
    async fn test_second_winner_creates_match_in_feeder_order() {
        let f = fixture().await;
        f.matches.record_result(f.match_of(f.qf[0]).await, 3, 1).unwrap();
        f.matches.record_result(f.match_of(f.qf[1]).await, 0, 2).unwrap();

        f.engine.advance(f.qf[0]).await.unwrap();
        // Advancing from the away feeder still puts the home feeder's winner at home
        let outcome = f.engine.advance(f.qf[1]).await.unwrap();

        let Advancement::MatchCreated(slot) = outcome else {
            panic!("expected a created match");
        };
        let game = f.matches.get(slot.match_id.unwrap()).await.unwrap().unwrap();
        assert_eq!(game.home_team_id, 1);
        assert_eq!(game.away_team_id, 5);
        assert_eq!(game.status, MatchStatus::Scheduled);
        assert_eq!(game.match_type, "playoff");

        let hours = (game.scheduled_at - Utc::now()).num_hours();
        assert!((119..=120).contains(&hours), "scheduled ~5 days out, got {hours}h");
    }

    #[tokio::test]
    async fn test_repeat_advance_is_idempotent() {
        let f = fixture().await;
        f.matches.record_result(f.match_of(f.qf[0]).await, 3, 1).unwrap();
        f.matches.record_result(f.match_of(f.qf[1]).await, 2, 0).unwrap();

        let first = f.engine.advance(f.qf[0]).await.unwrap();
        let second = f.engine.advance(f.qf[0]).await.unwrap();
        let third = f.engine.advance(f.qf[1]).await.unwrap();

        assert_eq!(first.next_slot(), second.next_slot());
        assert_eq!(second.next_slot(), third.next_slot());
        assert!(matches!(second, Advancement::AlreadyScheduled(_)));
        assert_eq!(f.matches.len(), 3);
    }

    #[tokio::test]
    async fn test_undecided_match_errors() {
        let f = fixture().await;

        let err = f.engine.advance(f.qf[0]).await.unwrap_err();
        assert!(matches!(err, BracketError::NotCompleted { .. }));

        f.matches.record_result(f.match_of(f.qf[0]).await, 2, 2).unwrap();
        let err = f.engine.advance(f.qf[0]).await.unwrap_err();
        assert!(matches!(err, BracketError::TiedScore { score: 2, .. }));
    }

    #[tokio::test]
    async fn test_tied_sibling_blocks_next_match() {
        let f = fixture().await;
        f.matches.record_result(f.match_of(f.qf[0]).await, 1, 1).unwrap();
        f.matches.record_result(f.match_of(f.qf[1]).await, 4, 2).unwrap();

        let outcome = f.engine.advance(f.qf[1]).await.unwrap();
        assert!(matches!(outcome, Advancement::AwaitingOpponent(_)));
        assert_eq!(f.matches.len(), 2);
    }

    #[tokio::test]
    async fn test_slot_without_match() {
        let f = fixture().await;
        let err = f.engine.advance(f.semi).await.unwrap_err();
        assert!(matches!(err, BracketError::NoMatch(id) if id == f.semi));

        let err = f.engine.advance(999).await.unwrap_err();
        assert!(matches!(err, BracketError::SlotNotFound(999)));
    }

    #[tokio::test]
    async fn test_failed_link_removes_created_match() {
        let f = fixture().await;
        f.matches.record_result(f.match_of(f.qf[0]).await, 3, 1).unwrap();
        f.matches.record_result(f.match_of(f.qf[1]).await, 0, 2).unwrap();

        let engine = AdvancementEngine::new(
            Arc::new(LinkFailingStore(f.store.clone())),
            Arc::new(f.matches.clone()),
            &BracketConfig::default(),
        );

        engine.advance(f.qf[0]).await.unwrap();
        let err = engine.advance(f.qf[1]).await.unwrap_err();
        assert!(matches!(err, BracketError::Storage(ref msg) if msg == "connection reset"));

        // Only the two quarterfinal matches remain and the semifinal is unlinked
        assert_eq!(f.matches.len(), 2);
        assert_eq!(f.store.get(f.semi).await.unwrap().unwrap().match_id, None);
    }

    #[tokio::test]
    async fn test_unrepresentable_schedule_date_errors() {
        let f = fixture().await;
        f.matches.record_result(f.match_of(f.qf[0]).await, 3, 1).unwrap();
        f.matches.record_result(f.match_of(f.qf[1]).await, 0, 2).unwrap();

        let config = BracketConfig {
            advancement_offset_days: 100_000_000,
            ..BracketConfig::default()
        };
        let engine = AdvancementEngine::new(
            Arc::new(f.store.clone()),
            Arc::new(f.matches.clone()),
            &config,
        );

        engine.advance(f.qf[0]).await.unwrap();
        let err = engine.advance(f.qf[1]).await.unwrap_err();
        assert!(matches!(err, BracketError::ScheduleOutOfRange(100_000_000)));
        assert_eq!(f.matches.len(), 2);

        let err = AdvancementEngine::new(
            Arc::new(f.store.clone()),
            Arc::new(f.matches.clone()),
            &BracketConfig {
                advancement_offset_days: i64::MAX,
                ..BracketConfig::default()
            },
        )
        .advance(f.qf[1])
        .await
        .unwrap_err();
        assert!(matches!(err, BracketError::ScheduleOutOfRange(i64::MAX)));
    }
}
