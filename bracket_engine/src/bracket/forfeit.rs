//! Forfeits: record a fixed score against the forfeiting team, then advance.

use std::sync::Arc;

use super::advancement::{AdvancementEngine, load_slot_with_match};
use super::errors::{BracketError, BracketResult};
use super::models::{Advancement, MatchStatus, MatchUpdate, Round, SlotId, TeamId};
use crate::db::{BracketStore, MatchService};

/// Score recorded for the team that did not forfeit; the forfeiting team gets 0
pub const FORFEIT_WINNING_SCORE: i32 = 3;

/// Applies forfeits to bracket matches
#[derive(Clone)]
pub struct ForfeitHandler {
    store: Arc<dyn BracketStore>,
    matches: Arc<dyn MatchService>,
    engine: AdvancementEngine,
}

impl ForfeitHandler {
    pub fn new(
        store: Arc<dyn BracketStore>,
        matches: Arc<dyn MatchService>,
        engine: AdvancementEngine,
    ) -> Self {
        Self {
            store,
            matches,
            engine,
        }
    }

    /// Forfeit the match in `slot_id` on behalf of `forfeiting_team_id`.
    ///
    /// The match is marked forfeit with a [`FORFEIT_WINNING_SCORE`]-0 result
    /// against the forfeiting team. Outside the final the winner is then advanced.
    ///
    /// # Errors
    ///
    /// * `BracketError::InvalidStatus` - match already completed or forfeited
    /// * `BracketError::NotParticipant` - team is not playing in the match
    pub async fn forfeit_match(
        &self,
        slot_id: SlotId,
        forfeiting_team_id: TeamId,
    ) -> BracketResult<Advancement> {
        let (slot, game) =
            load_slot_with_match(self.store.as_ref(), self.matches.as_ref(), slot_id).await?;

        if !game.status.is_open() {
            return Err(BracketError::InvalidStatus {
                match_id: game.id,
                status: game.status,
            });
        }

        if !game.involves(forfeiting_team_id) {
            return Err(BracketError::NotParticipant {
                match_id: game.id,
                team_id: forfeiting_team_id,
            });
        }

        let (home_score, away_score, winner) = if forfeiting_team_id == game.home_team_id {
            (0, FORFEIT_WINNING_SCORE, game.away_team_id)
        } else {
            (FORFEIT_WINNING_SCORE, 0, game.home_team_id)
        };

        self.matches
            .update(
                game.id,
                &MatchUpdate {
                    status: Some(MatchStatus::Forfeit),
                    home_score: Some(home_score),
                    away_score: Some(away_score),
                    forfeit_team_id: Some(forfeiting_team_id),
                },
            )
            .await?;

        log::info!(
            "Team {} forfeited match {} in slot {} ({}-{})",
            forfeiting_team_id,
            game.id,
            slot_id,
            home_score,
            away_score
        );

        if slot.round == Round::Final {
            return Ok(Advancement::Terminal { winner });
        }

        self.engine.advance(slot_id).await
    }
}
