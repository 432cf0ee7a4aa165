//! # Bracket Engine
//!
//! Single-elimination playoff brackets for youth sports leagues.
//!
//! Two divisions' final standings are seeded into one or more eight-team
//! tiers. Each tier is a seven-slot tree (four quarterfinals, two semifinals,
//! one final) whose later-round matches are created as winners advance.
//!
//! ## Core Modules
//!
//! - [`bracket`]: Seeding, generation, advancement, forfeits, deletion and views
//! - [`db`]: Storage seams plus Postgres and in-memory adapters
//!
//! ## Example
//!
//! ```
//! use bracket_engine::{BracketManager, BracketConfig};
//! use bracket_engine::db::{InMemoryBracketStore, InMemoryMatchService, InMemoryStandings, InMemoryTeamDirectory};
//! use std::sync::Arc;
//!
//! let manager = BracketManager::new(
//!     Arc::new(InMemoryBracketStore::new()),
//!     Arc::new(InMemoryMatchService::new()),
//!     Arc::new(InMemoryStandings::new()),
//!     Arc::new(InMemoryTeamDirectory::new()),
//!     BracketConfig::default(),
//! );
//! # let _ = manager;
//! ```

/// Playoff bracket domain logic.
pub mod bracket;
pub use bracket::{
    Advancement, BracketConfig, BracketError, BracketManager, BracketRequest, BracketResult,
    BracketSlot, BracketSlotView, CompetitionKey, DivisionPair, Round, TierConfig,
};

/// Persistence layer.
pub mod db;
