//! Repository trait definitions for the bracket engine's collaborators.
//!
//! The engine only ever talks to storage through these traits, so the
//! Postgres adapters in [`postgres`](super::postgres) and the in-memory ones
//! in [`memory`](super::memory) are interchangeable.

use async_trait::async_trait;

use crate::bracket::{
    BracketResult, BracketSlot, CompetitionKey, Match, MatchId, MatchUpdate, NewBracketSlot,
    NewMatch, SlotId, Standing, TeamId,
};

/// Persistence for bracket slots
#[async_trait]
pub trait BracketStore: Send + Sync {
    /// Insert a slot and return its assigned ID
    async fn insert(&self, slot: &NewBracketSlot) -> BracketResult<SlotId>;

    /// Find slot by ID
    async fn get(&self, slot_id: SlotId) -> BracketResult<Option<BracketSlot>>;

    /// Find the slot that `slot_id` feeds into, if any
    async fn find_feeding(&self, slot_id: SlotId) -> BracketResult<Option<BracketSlot>>;

    /// All slots of a competition, ordered by round, tier, then position
    async fn list_by_competition(&self, key: &CompetitionKey) -> BracketResult<Vec<BracketSlot>>;

    /// Set the slot's match if it has none yet
    ///
    /// Returns `false` when the slot already had a match; the existing link is
    /// never overwritten.
    async fn link_match(&self, slot_id: SlotId, match_id: MatchId) -> BracketResult<bool>;

    /// Delete a slot. Slots still referenced as feeders must not be deleted.
    async fn delete(&self, slot_id: SlotId) -> BracketResult<()>;
}

/// Persistence for matches
#[async_trait]
pub trait MatchService: Send + Sync {
    /// Create a match and return its ID
    async fn create(&self, new_match: &NewMatch) -> BracketResult<MatchId>;

    /// Find match by ID
    async fn get(&self, match_id: MatchId) -> BracketResult<Option<Match>>;

    /// Apply a partial update
    async fn update(&self, match_id: MatchId, update: &MatchUpdate) -> BracketResult<()>;

    /// Delete a match
    async fn delete(&self, match_id: MatchId) -> BracketResult<()>;
}

/// Read-only source of division standings
#[async_trait]
pub trait StandingsProvider: Send + Sync {
    /// Standings of one division, ordered by ascending rank
    async fn get_standings(&self, season_id: &str, division_id: &str)
    -> BracketResult<Vec<Standing>>;
}

/// Team name and ID lookup
#[async_trait]
pub trait TeamDirectory: Send + Sync {
    /// Resolve a team name to its ID
    async fn resolve(&self, team_name: &str) -> BracketResult<Option<TeamId>>;

    /// Display name for a team ID
    async fn team_name(&self, team_id: TeamId) -> BracketResult<Option<String>>;
}
