//! In-memory implementations of the repository traits.
//!
//! Used by the test suites and benchmarks, and handy for embedding the engine
//! without a database. The bracket store rejects deleting a slot that another
//! slot still lists as a feeder, matching the foreign keys of the Postgres
//! schema.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use super::repository::{BracketStore, MatchService, StandingsProvider, TeamDirectory};
use crate::bracket::{
    BracketError, BracketResult, BracketSlot, CompetitionKey, Match, MatchId, MatchUpdate,
    NewBracketSlot, NewMatch, SlotId, SlotSource, Standing, TeamId,
};

fn lock<T>(mutex: &Mutex<T>) -> BracketResult<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| BracketError::Storage("in-memory store lock poisoned".to_string()))
}

#[derive(Default)]
struct SlotTable {
    slots: BTreeMap<SlotId, BracketSlot>,
    next_id: SlotId,
    writes: usize,
}

/// In-memory [`BracketStore`]
#[derive(Clone, Default)]
pub struct InMemoryBracketStore {
    inner: Arc<Mutex<SlotTable>>,
}

impl InMemoryBracketStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of slots currently stored
    pub fn len(&self) -> usize {
        self.inner.lock().map(|t| t.slots.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of successful inserts, links and deletes so far
    pub fn write_count(&self) -> usize {
        self.inner.lock().map(|t| t.writes).unwrap_or(0)
    }
}

#[async_trait]
impl BracketStore for InMemoryBracketStore {
    async fn insert(&self, slot: &NewBracketSlot) -> BracketResult<SlotId> {
        let mut table = lock(&self.inner)?;

        let duplicate = table.slots.values().any(|s| {
            s.key == slot.key
                && s.tier == slot.tier
                && s.round == slot.round
                && s.position == slot.position
        });
        if duplicate {
            return Err(BracketError::Storage(format!(
                "duplicate slot {} {} {} #{}",
                slot.key, slot.tier, slot.round, slot.position
            )));
        }

        if let SlotSource::Feeders { home, away } = slot.source {
            for feeder in [home, away] {
                if !table.slots.contains_key(&feeder) {
                    return Err(BracketError::Storage(format!(
                        "feeder slot {feeder} does not exist"
                    )));
                }
            }
        }

        table.next_id += 1;
        let id = table.next_id;
        table.slots.insert(id, slot.clone().with_id(id));
        table.writes += 1;
        Ok(id)
    }

    async fn get(&self, slot_id: SlotId) -> BracketResult<Option<BracketSlot>> {
        Ok(lock(&self.inner)?.slots.get(&slot_id).cloned())
    }

    async fn find_feeding(&self, slot_id: SlotId) -> BracketResult<Option<BracketSlot>> {
        let table = lock(&self.inner)?;
        Ok(table
            .slots
            .values()
            .find(|s| s.side_fed_by(slot_id).is_some())
            .cloned())
    }

    async fn list_by_competition(&self, key: &CompetitionKey) -> BracketResult<Vec<BracketSlot>> {
        let table = lock(&self.inner)?;
        let mut slots: Vec<BracketSlot> = table
            .slots
            .values()
            .filter(|s| &s.key == key)
            .cloned()
            .collect();
        slots.sort_by(|a, b| {
            (a.round, &a.tier, a.position).cmp(&(b.round, &b.tier, b.position))
        });
        Ok(slots)
    }

    async fn link_match(&self, slot_id: SlotId, match_id: MatchId) -> BracketResult<bool> {
        let mut table = lock(&self.inner)?;
        let slot = table
            .slots
            .get_mut(&slot_id)
            .ok_or(BracketError::SlotNotFound(slot_id))?;

        if slot.match_id.is_some() {
            return Ok(false);
        }
        slot.match_id = Some(match_id);
        table.writes += 1;
        Ok(true)
    }

    async fn delete(&self, slot_id: SlotId) -> BracketResult<()> {
        let mut table = lock(&self.inner)?;

        if let Some(dependent) = table.slots.values().find(|s| s.side_fed_by(slot_id).is_some()) {
            return Err(BracketError::Storage(format!(
                "slot {slot_id} is still referenced by slot {}",
                dependent.id
            )));
        }

        if table.slots.remove(&slot_id).is_some() {
            table.writes += 1;
        }
        Ok(())
    }
}

#[derive(Default)]
struct MatchTable {
    matches: BTreeMap<MatchId, Match>,
    next_id: MatchId,
    writes: usize,
    creates: usize,
    fail_creates_after: Option<usize>,
}

/// In-memory [`MatchService`]
#[derive(Clone, Default)]
pub struct InMemoryMatchService {
    inner: Arc<Mutex<MatchTable>>,
}

impl InMemoryMatchService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every `create` after the first `creates` succeed
    pub fn failing_after(creates: usize) -> Self {
        let service = Self::default();
        if let Ok(mut table) = service.inner.lock() {
            table.fail_creates_after = Some(creates);
        }
        service
    }

    /// Number of matches currently stored
    pub fn len(&self) -> usize {
        self.inner.lock().map(|t| t.matches.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of successful creates, updates and deletes so far
    pub fn write_count(&self) -> usize {
        self.inner.lock().map(|t| t.writes).unwrap_or(0)
    }

    /// Record a final score, as the scorekeeping side of the system would
    pub fn record_result(&self, match_id: MatchId, home: i32, away: i32) -> BracketResult<()> {
        let mut table = lock(&self.inner)?;
        let game = table
            .matches
            .get_mut(&match_id)
            .ok_or(BracketError::MatchNotFound(match_id))?;
        game.home_score = Some(home);
        game.away_score = Some(away);
        game.status = crate::bracket::MatchStatus::Completed;
        table.writes += 1;
        Ok(())
    }

    /// Snapshot of all stored matches
    pub fn all(&self) -> Vec<Match> {
        self.inner
            .lock()
            .map(|t| t.matches.values().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl MatchService for InMemoryMatchService {
    async fn create(&self, new_match: &NewMatch) -> BracketResult<MatchId> {
        let mut table = lock(&self.inner)?;

        if let Some(limit) = table.fail_creates_after {
            if table.creates >= limit {
                return Err(BracketError::Storage("match service unavailable".to_string()));
            }
        }

        table.next_id += 1;
        let id = table.next_id;
        table.matches.insert(
            id,
            Match {
                id,
                home_team_id: new_match.home_team_id,
                away_team_id: new_match.away_team_id,
                home_score: None,
                away_score: None,
                status: new_match.status,
                forfeit_team_id: None,
                match_type: new_match.match_type.clone(),
                scheduled_at: new_match.scheduled_at,
            },
        );
        table.creates += 1;
        table.writes += 1;
        Ok(id)
    }

    async fn get(&self, match_id: MatchId) -> BracketResult<Option<Match>> {
        Ok(lock(&self.inner)?.matches.get(&match_id).cloned())
    }

    async fn update(&self, match_id: MatchId, update: &MatchUpdate) -> BracketResult<()> {
        let mut table = lock(&self.inner)?;
        let game = table
            .matches
            .get_mut(&match_id)
            .ok_or(BracketError::MatchNotFound(match_id))?;

        if let Some(status) = update.status {
            game.status = status;
        }
        if let Some(score) = update.home_score {
            game.home_score = Some(score);
        }
        if let Some(score) = update.away_score {
            game.away_score = Some(score);
        }
        if let Some(team_id) = update.forfeit_team_id {
            game.forfeit_team_id = Some(team_id);
        }
        table.writes += 1;
        Ok(())
    }

    async fn delete(&self, match_id: MatchId) -> BracketResult<()> {
        let mut table = lock(&self.inner)?;
        if table.matches.remove(&match_id).is_some() {
            table.writes += 1;
        }
        Ok(())
    }
}

/// In-memory [`StandingsProvider`] keyed by (season, division)
#[derive(Clone, Default)]
pub struct InMemoryStandings {
    divisions: Arc<Mutex<HashMap<(String, String), Vec<Standing>>>>,
}

impl InMemoryStandings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a division's teams, ranked in the given order starting at 1
    pub fn with_division(self, season_id: &str, division_id: &str, teams: &[&str]) -> Self {
        let standings = teams
            .iter()
            .enumerate()
            .map(|(i, name)| Standing::new(*name, i as u32 + 1))
            .collect();
        if let Ok(mut divisions) = self.divisions.lock() {
            divisions.insert((season_id.to_string(), division_id.to_string()), standings);
        }
        self
    }
}

#[async_trait]
impl StandingsProvider for InMemoryStandings {
    async fn get_standings(
        &self,
        season_id: &str,
        division_id: &str,
    ) -> BracketResult<Vec<Standing>> {
        let divisions = lock(&self.divisions)?;
        let mut standings = divisions
            .get(&(season_id.to_string(), division_id.to_string()))
            .cloned()
            .unwrap_or_default();
        standings.sort_by_key(|s| s.rank);
        Ok(standings)
    }
}

/// In-memory [`TeamDirectory`]
#[derive(Clone, Default)]
pub struct InMemoryTeamDirectory {
    teams: Arc<Mutex<BTreeMap<TeamId, String>>>,
}

impl InMemoryTeamDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_team(self, team_id: TeamId, name: &str) -> Self {
        if let Ok(mut teams) = self.teams.lock() {
            teams.insert(team_id, name.to_string());
        }
        self
    }

    /// Register each name with sequential IDs starting at `first_id`
    pub fn with_teams(self, first_id: TeamId, names: &[&str]) -> Self {
        names
            .iter()
            .enumerate()
            .fold(self, |dir, (i, name)| dir.with_team(first_id + i as TeamId, name))
    }
}

#[async_trait]
impl TeamDirectory for InMemoryTeamDirectory {
    async fn resolve(&self, team_name: &str) -> BracketResult<Option<TeamId>> {
        let teams = lock(&self.teams)?;
        Ok(teams
            .iter()
            .find(|(_, name)| name.as_str() == team_name)
            .map(|(id, _)| *id))
    }

    async fn team_name(&self, team_id: TeamId) -> BracketResult<Option<String>> {
        Ok(lock(&self.teams)?.get(&team_id).cloned())
    }
}
