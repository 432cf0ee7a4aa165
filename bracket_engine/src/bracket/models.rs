//! Bracket data models.
//!
//! Slots form an arena keyed by [`SlotId`]; later-round slots point at their
//! feeders by id instead of owning them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::errors::{BracketError, BracketResult};

/// Bracket slot ID type
pub type SlotId = i64;

/// Match ID type
pub type MatchId = i64;

/// Team ID type
pub type TeamId = i64;

/// Number of seeds in the supported bracket shape
pub const SEEDS_PER_TIER: usize = 8;

/// Teams each division contributes to one tier
pub const TEAMS_PER_DIVISION: usize = SEEDS_PER_TIER / 2;

/// Identifies one bracket instance: league, season and age group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CompetitionKey {
    pub league: String,
    pub season: String,
    pub age_group: String,
}

impl CompetitionKey {
    /// Create a new competition key
    pub fn new(
        league: impl Into<String>,
        season: impl Into<String>,
        age_group: impl Into<String>,
    ) -> Self {
        Self {
            league: league.into(),
            season: season.into(),
            age_group: age_group.into(),
        }
    }
}

impl std::fmt::Display for CompetitionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.league, self.season, self.age_group)
    }
}

/// Bracket round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Round {
    Quarterfinal,
    Semifinal,
    Final,
}

impl Round {
    /// Rounds in creation order
    pub const ALL: [Round; 3] = [Round::Quarterfinal, Round::Semifinal, Round::Final];

    /// Number of slots this round has in one tier
    pub fn slot_count(self) -> u8 {
        match self {
            Round::Quarterfinal => 4,
            Round::Semifinal => 2,
            Round::Final => 1,
        }
    }

    /// Round fed by this one, `None` for the final
    pub fn next(self) -> Option<Round> {
        match self {
            Round::Quarterfinal => Some(Round::Semifinal),
            Round::Semifinal => Some(Round::Final),
            Round::Final => None,
        }
    }

    /// Parse the storage representation
    pub fn from_db_str(value: &str) -> BracketResult<Self> {
        match value {
            "quarterfinal" => Ok(Round::Quarterfinal),
            "semifinal" => Ok(Round::Semifinal),
            "final" => Ok(Round::Final),
            other => Err(BracketError::Storage(format!("unknown round '{other}'"))),
        }
    }
}

impl std::fmt::Display for Round {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Round::Quarterfinal => write!(f, "quarterfinal"),
            Round::Semifinal => write!(f, "semifinal"),
            Round::Final => write!(f, "final"),
        }
    }
}

/// Where a slot's two participants come from.
///
/// Quarterfinal slots are seeded directly; every later slot is fed by the
/// winners of two earlier slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SlotSource {
    Seeds { home: u8, away: u8 },
    Feeders { home: SlotId, away: SlotId },
}

/// Which side of a match a participant occupies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Home,
    Away,
}

/// A node in the elimination tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketSlot {
    pub id: SlotId,
    pub key: CompetitionKey,
    pub tier: String,
    pub round: Round,
    /// 1-based position within (tier, round)
    pub position: u8,
    pub source: SlotSource,
    /// Unset until both participants are known
    pub match_id: Option<MatchId>,
}

impl BracketSlot {
    pub fn home_seed(&self) -> Option<u8> {
        match self.source {
            SlotSource::Seeds { home, .. } => Some(home),
            SlotSource::Feeders { .. } => None,
        }
    }

    pub fn away_seed(&self) -> Option<u8> {
        match self.source {
            SlotSource::Seeds { away, .. } => Some(away),
            SlotSource::Feeders { .. } => None,
        }
    }

    pub fn home_source_slot_id(&self) -> Option<SlotId> {
        match self.source {
            SlotSource::Feeders { home, .. } => Some(home),
            SlotSource::Seeds { .. } => None,
        }
    }

    pub fn away_source_slot_id(&self) -> Option<SlotId> {
        match self.source {
            SlotSource::Feeders { away, .. } => Some(away),
            SlotSource::Seeds { .. } => None,
        }
    }

    /// Side of this slot that the winner of `feeder` fills
    pub fn side_fed_by(&self, feeder: SlotId) -> Option<Side> {
        match self.source {
            SlotSource::Feeders { home, .. } if home == feeder => Some(Side::Home),
            SlotSource::Feeders { away, .. } if away == feeder => Some(Side::Away),
            _ => None,
        }
    }

    /// The other feeder of this slot, given one of them
    pub fn sibling_of(&self, feeder: SlotId) -> Option<SlotId> {
        match self.side_fed_by(feeder)? {
            Side::Home => self.away_source_slot_id(),
            Side::Away => self.home_source_slot_id(),
        }
    }
}

/// Slot to be inserted into a [`BracketStore`](crate::db::BracketStore)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBracketSlot {
    pub key: CompetitionKey,
    pub tier: String,
    pub round: Round,
    pub position: u8,
    pub source: SlotSource,
    pub match_id: Option<MatchId>,
}

impl NewBracketSlot {
    /// Attach the id assigned by the store
    pub fn with_id(self, id: SlotId) -> BracketSlot {
        BracketSlot {
            id,
            key: self.key,
            tier: self.tier,
            round: self.round,
            position: self.position,
            source: self.source,
            match_id: self.match_id,
        }
    }
}

/// Match status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Scheduled,
    Live,
    Completed,
    Forfeit,
}

impl MatchStatus {
    /// Result is final and can be advanced from
    pub fn is_decided(self) -> bool {
        matches!(self, MatchStatus::Completed | MatchStatus::Forfeit)
    }

    /// Match can still be forfeited
    pub fn is_open(self) -> bool {
        matches!(self, MatchStatus::Scheduled | MatchStatus::Live)
    }

    pub fn from_db_str(value: &str) -> BracketResult<Self> {
        match value {
            "scheduled" => Ok(MatchStatus::Scheduled),
            "live" => Ok(MatchStatus::Live),
            "completed" => Ok(MatchStatus::Completed),
            "forfeit" => Ok(MatchStatus::Forfeit),
            other => Err(BracketError::Storage(format!("unknown match status '{other}'"))),
        }
    }
}

impl std::fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchStatus::Scheduled => write!(f, "scheduled"),
            MatchStatus::Live => write!(f, "live"),
            MatchStatus::Completed => write!(f, "completed"),
            MatchStatus::Forfeit => write!(f, "forfeit"),
        }
    }
}

/// Match as returned by a [`MatchService`](crate::db::MatchService)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub home_team_id: TeamId,
    pub away_team_id: TeamId,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
    pub status: MatchStatus,
    pub forfeit_team_id: Option<TeamId>,
    pub match_type: String,
    pub scheduled_at: DateTime<Utc>,
}

impl Match {
    pub fn involves(&self, team_id: TeamId) -> bool {
        self.home_team_id == team_id || self.away_team_id == team_id
    }

    /// Winner of a decided match, or the reason there is none yet.
    ///
    /// Ties are never broken here; they need a manual score correction.
    pub fn winner(&self) -> BracketResult<TeamId> {
        if !self.status.is_decided() {
            return Err(BracketError::NotCompleted {
                match_id: self.id,
                status: self.status,
            });
        }

        let (Some(home), Some(away)) = (self.home_score, self.away_score) else {
            return Err(BracketError::MissingScores(self.id));
        };

        if home == away {
            return Err(BracketError::TiedScore {
                match_id: self.id,
                score: home,
            });
        }

        Ok(if home > away {
            self.home_team_id
        } else {
            self.away_team_id
        })
    }
}

/// Match to be created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMatch {
    pub home_team_id: TeamId,
    pub away_team_id: TeamId,
    pub scheduled_at: DateTime<Utc>,
    pub status: MatchStatus,
    pub match_type: String,
}

/// Partial match update; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchUpdate {
    pub status: Option<MatchStatus>,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
    pub forfeit_team_id: Option<TeamId>,
}

/// One row of a division's standings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    pub team_name: String,
    pub rank: u32,
}

impl Standing {
    pub fn new(team_name: impl Into<String>, rank: u32) -> Self {
        Self {
            team_name: team_name.into(),
            rank,
        }
    }
}

/// A named parallel bracket over a slice of both divisions' standings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierConfig {
    pub name: String,
    /// First rank taken from each division (1-based, inclusive)
    pub start_rank: u32,
    /// Last rank taken from each division (inclusive)
    pub end_rank: u32,
}

impl TierConfig {
    pub fn new(name: impl Into<String>, start_rank: u32, end_rank: u32) -> Self {
        Self {
            name: name.into(),
            start_rank,
            end_rank,
        }
    }

    /// Ranks 1-4 of each division
    pub fn gold() -> Self {
        Self::new("Gold", 1, 4)
    }

    /// Ranks 5-8 of each division
    pub fn silver() -> Self {
        Self::new("Silver", 5, 8)
    }

    /// Teams taken from each division
    pub fn teams_per_division(&self) -> usize {
        if self.end_rank < self.start_rank {
            0
        } else {
            (self.end_rank - self.start_rank + 1) as usize
        }
    }

    /// Check the slice fits the 8-seed bracket shape
    pub fn validate(&self) -> BracketResult<()> {
        if self.name.trim().is_empty() {
            return Err(BracketError::InvalidTierConfig(
                "tier name must not be empty".to_string(),
            ));
        }
        if self.start_rank == 0 {
            return Err(BracketError::InvalidTierConfig(format!(
                "tier '{}': ranks are 1-based",
                self.name
            )));
        }
        if self.teams_per_division() != TEAMS_PER_DIVISION {
            return Err(BracketError::InvalidTierConfig(format!(
                "tier '{}': ranks {}..={} must cover exactly {} teams per division",
                self.name, self.start_rank, self.end_rank, TEAMS_PER_DIVISION
            )));
        }
        Ok(())
    }
}

/// Seed number to team mapping for one tier
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seeding {
    seeds: BTreeMap<u8, TeamId>,
}

impl Seeding {
    pub fn insert(&mut self, seed: u8, team_id: TeamId) {
        self.seeds.insert(seed, team_id);
    }

    pub fn team(&self, seed: u8) -> Option<TeamId> {
        self.seeds.get(&seed).copied()
    }

    pub fn len(&self) -> usize {
        self.seeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seeds.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, TeamId)> + '_ {
        self.seeds.iter().map(|(seed, team)| (*seed, *team))
    }
}

/// Division pair whose standings feed a bracket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DivisionPair {
    /// Supplies the odd seeds
    pub a: String,
    /// Supplies the even seeds
    pub b: String,
}

/// Everything needed to generate a bracket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketRequest {
    pub key: CompetitionKey,
    pub season_id: String,
    pub divisions: DivisionPair,
    pub tiers: Vec<TierConfig>,
    pub start_date: DateTime<Utc>,
}

/// Result of advancing from a slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Advancement {
    /// The slot was a final; nothing further to schedule
    Terminal { winner: TeamId },
    /// The other feeder has not produced a winner yet
    AwaitingOpponent(BracketSlot),
    /// Both feeders resolved and the next match was just created
    MatchCreated(BracketSlot),
    /// The next match already existed
    AlreadyScheduled(BracketSlot),
}

impl Advancement {
    /// Next-round slot, if any
    pub fn next_slot(&self) -> Option<&BracketSlot> {
        match self {
            Advancement::Terminal { .. } => None,
            Advancement::AwaitingOpponent(slot)
            | Advancement::MatchCreated(slot)
            | Advancement::AlreadyScheduled(slot) => Some(slot),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Advancement::Terminal { .. })
    }
}
