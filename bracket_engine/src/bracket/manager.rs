//! Bracket manager: the entry point for generating, advancing, forfeiting,
//! deleting and reading playoff brackets.

use std::sync::Arc;

use super::advancement::AdvancementEngine;
use super::builder::{BracketBuilder, DivisionStandings};
use super::config::BracketConfig;
use super::deleter::BracketDeleter;
use super::errors::{BracketError, BracketResult};
use super::forfeit::ForfeitHandler;
use super::locks::CompetitionLocks;
use super::models::{Advancement, BracketRequest, CompetitionKey, SlotId, Standing, TeamId};
use super::seeder::BracketSeeder;
use super::view::{BracketSlotView, BracketViewer};
use crate::db::{
    BracketStore, Database, MatchService, PgBracketStore, PgMatchService, PgStandingsProvider,
    PgTeamDirectory, StandingsProvider, TeamDirectory,
};

/// Bracket manager
///
/// Every mutating operation holds the competition's lock for its whole
/// duration, so generation, advancement, forfeits and deletion of the same
/// competition never interleave.
#[derive(Clone)]
pub struct BracketManager {
    store: Arc<dyn BracketStore>,
    standings: Arc<dyn StandingsProvider>,
    builder: BracketBuilder,
    engine: AdvancementEngine,
    forfeits: ForfeitHandler,
    deleter: BracketDeleter,
    viewer: BracketViewer,
    locks: CompetitionLocks,
}

impl BracketManager {
    /// Create a new bracket manager over the given collaborators
    pub fn new(
        store: Arc<dyn BracketStore>,
        matches: Arc<dyn MatchService>,
        standings: Arc<dyn StandingsProvider>,
        teams: Arc<dyn TeamDirectory>,
        config: BracketConfig,
    ) -> Self {
        let seeder = BracketSeeder::new(teams.clone());
        let builder = BracketBuilder::new(
            store.clone(),
            matches.clone(),
            seeder,
            config.match_type.clone(),
        );
        let engine = AdvancementEngine::new(store.clone(), matches.clone(), &config);
        let forfeits = ForfeitHandler::new(store.clone(), matches.clone(), engine.clone());
        let deleter = BracketDeleter::new(store.clone(), matches.clone());
        let viewer = BracketViewer::new(store.clone(), matches, teams);

        Self {
            store,
            standings,
            builder,
            engine,
            forfeits,
            deleter,
            viewer,
            locks: CompetitionLocks::new(),
        }
    }

    /// Create a manager backed by the Postgres adapters
    pub fn from_database(db: &Database, config: BracketConfig) -> Self {
        let pool = db.pool().clone();
        Self::new(
            Arc::new(PgBracketStore::new(pool.clone())),
            Arc::new(PgMatchService::new(pool.clone())),
            Arc::new(PgStandingsProvider::new(pool.clone())),
            Arc::new(PgTeamDirectory::new(pool)),
            config,
        )
    }

    /// Generate the bracket for every tier of the request.
    ///
    /// Returns the created slots as views, ordered by round, tier and
    /// position.
    ///
    /// # Errors
    ///
    /// * `BracketError::BracketExists` - the competition already has a bracket
    /// * `BracketError::InsufficientTeams` - a division is too short for a tier
    /// * `BracketError::UnknownTeam` - a standings entry has no team record
    /// * `BracketError::InvalidTierConfig` - tiers are empty, duplicated or mis-sized
    pub async fn generate_bracket(
        &self,
        request: &BracketRequest,
    ) -> BracketResult<Vec<BracketSlotView>> {
        let _guard = self.locks.acquire(&request.key).await;

        if !self.store.list_by_competition(&request.key).await?.is_empty() {
            return Err(BracketError::BracketExists(request.key.to_string()));
        }

        let division_a = self
            .ranked_standings(&request.season_id, &request.divisions.a)
            .await?;
        let division_b = self
            .ranked_standings(&request.season_id, &request.divisions.b)
            .await?;

        let mut slots = self
            .builder
            .build(
                &request.key,
                DivisionStandings {
                    division: &request.divisions.a,
                    standings: &division_a,
                },
                DivisionStandings {
                    division: &request.divisions.b,
                    standings: &division_b,
                },
                &request.tiers,
                request.start_date,
            )
            .await?;

        slots.sort_by(|a, b| {
            a.round
                .cmp(&b.round)
                .then_with(|| a.tier.cmp(&b.tier))
                .then_with(|| a.position.cmp(&b.position))
        });
        self.viewer.view_slots(&slots).await
    }

    /// Advance the winner of the decided match in `slot_id`
    pub async fn advance_winner(&self, slot_id: SlotId) -> BracketResult<Advancement> {
        let key = self.competition_of(slot_id).await?;
        let _guard = self.locks.acquire(&key).await;
        self.engine.advance(slot_id).await
    }

    /// Forfeit the match in `slot_id` for `team_id` and advance the other team
    pub async fn forfeit_match(
        &self,
        slot_id: SlotId,
        team_id: TeamId,
    ) -> BracketResult<Advancement> {
        let key = self.competition_of(slot_id).await?;
        let _guard = self.locks.acquire(&key).await;
        self.forfeits.forfeit_match(slot_id, team_id).await
    }

    /// Delete the competition's bracket and its matches; returns the number
    /// of slots removed
    pub async fn delete_bracket(&self, key: &CompetitionKey) -> BracketResult<usize> {
        let _guard = self.locks.acquire(key).await;
        self.deleter.delete_bracket(key).await
    }

    /// Read the competition's bracket
    pub async fn get_bracket(&self, key: &CompetitionKey) -> BracketResult<Vec<BracketSlotView>> {
        self.viewer.view(key).await
    }

    async fn ranked_standings(
        &self,
        season_id: &str,
        division_id: &str,
    ) -> BracketResult<Vec<Standing>> {
        let mut standings = self.standings.get_standings(season_id, division_id).await?;
        standings.sort_by_key(|s| s.rank);
        log::debug!(
            "Loaded {} standings for division {} in season {}",
            standings.len(),
            division_id,
            season_id
        );
        Ok(standings)
    }

    async fn competition_of(&self, slot_id: SlotId) -> BracketResult<CompetitionKey> {
        self.store
            .get(slot_id)
            .await?
            .map(|slot| slot.key)
            .ok_or(BracketError::SlotNotFound(slot_id))
    }
}
