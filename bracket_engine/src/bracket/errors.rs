//! Bracket error types.

use thiserror::Error;

use super::models::{MatchId, MatchStatus, SlotId, TeamId};

/// Broad category of a [`BracketError`], used by callers to pick a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad caller input
    Validation,
    /// Bracket already exists
    Conflict,
    /// Match state must be fixed upstream first
    State,
    /// Slot or match absent
    NotFound,
    /// Collaborator failure, safe to retry
    Storage,
}

/// Bracket errors
#[derive(Debug, Error)]
pub enum BracketError {
    /// A division has fewer teams than the tier needs
    #[error("Insufficient teams in division {division}: need {needed}, have {available}")]
    InsufficientTeams {
        division: String,
        needed: usize,
        available: usize,
    },

    /// Standings name a team the directory does not know
    #[error("Unknown team: {0}")]
    UnknownTeam(String),

    /// Tier list does not describe a valid bracket
    #[error("Invalid tier configuration: {0}")]
    InvalidTierConfig(String),

    /// Slots already exist for the competition
    #[error("Bracket already exists for {0}")]
    BracketExists(String),

    /// Slot not found
    #[error("Bracket slot not found: {0}")]
    SlotNotFound(SlotId),

    /// Match not found
    #[error("Match not found: {0}")]
    MatchNotFound(MatchId),

    /// Slot has no match yet
    #[error("Bracket slot {0} has no match yet")]
    NoMatch(SlotId),

    /// Match has not finished
    #[error("Match {match_id} is not completed (status: {status})")]
    NotCompleted {
        match_id: MatchId,
        status: MatchStatus,
    },

    /// Completed match is missing a score
    #[error("Match {0} is missing scores")]
    MissingScores(MatchId),

    /// Completed match ended level
    #[error("Match {match_id} is tied {score}-{score}; enter a deciding score manually")]
    TiedScore { match_id: MatchId, score: i32 },

    /// Match can no longer be forfeited
    #[error("Match {match_id} cannot be forfeited in status {status}")]
    InvalidStatus {
        match_id: MatchId,
        status: MatchStatus,
    },

    /// Team does not play in the match
    #[error("Team {team_id} is not playing in match {match_id}")]
    NotParticipant { match_id: MatchId, team_id: TeamId },

    /// Next-round date cannot be represented
    #[error("Cannot schedule a match {0} days out")]
    ScheduleOutOfRange(i64),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Other storage backend failure
    #[error("Storage error: {0}")]
    Storage(String),
}

impl BracketError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BracketError::InsufficientTeams { .. }
            | BracketError::UnknownTeam(_)
            | BracketError::InvalidTierConfig(_)
            | BracketError::ScheduleOutOfRange(_) => ErrorKind::Validation,
            BracketError::BracketExists(_) => ErrorKind::Conflict,
            BracketError::NoMatch(_)
            | BracketError::NotCompleted { .. }
            | BracketError::MissingScores(_)
            | BracketError::TiedScore { .. }
            | BracketError::InvalidStatus { .. }
            | BracketError::NotParticipant { .. } => ErrorKind::State,
            BracketError::SlotNotFound(_) | BracketError::MatchNotFound(_) => ErrorKind::NotFound,
            BracketError::Database(_) | BracketError::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Storage failures are the only errors worth retrying
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Storage
    }

    /// Get a client-safe error message
    ///
    /// Storage errors are replaced with a generic message so backend details
    /// never reach API consumers.
    pub fn client_message(&self) -> String {
        match self {
            BracketError::Database(_) | BracketError::Storage(_) => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        }
    }
}

/// Result type for bracket operations
pub type BracketResult<T> = Result<T, BracketError>;
