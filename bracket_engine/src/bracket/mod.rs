//! Single-elimination playoff brackets.
//!
//! A bracket belongs to one competition (league, season, age group) and holds
//! one or more tiers. Each tier seeds eight teams from two divisions and is a
//! fixed tree of seven slots:
//!
//! - **Quarterfinals**: four seeded slots, each with a scheduled match
//! - **Semifinals**: two slots fed by quarterfinal pairs (1, 2) and (3, 4)
//! - **Final**: one slot fed by both semifinals
//!
//! Later-round matches are created only when both feeders have a winner.
//!
//! ## Example
//!
//! ```no_run
//! use bracket_engine::bracket::{BracketConfig, BracketManager, BracketRequest, CompetitionKey, DivisionPair, TierConfig};
//! use bracket_engine::db::{Database, DatabaseConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::new(&DatabaseConfig::from_env()?).await?;
//!     let manager = BracketManager::from_database(&db, BracketConfig::from_env()?);
//!
//!     let request = BracketRequest {
//!         key: CompetitionKey::new("Metro", "2024", "U12"),
//!         season_id: "2024".to_string(),
//!         divisions: DivisionPair { a: "north".to_string(), b: "south".to_string() },
//!         tiers: vec![TierConfig::gold(), TierConfig::silver()],
//!         start_date: chrono::Utc::now(),
//!     };
//!     let bracket = manager.generate_bracket(&request).await?;
//!     println!("{} slots", bracket.len());
//!     Ok(())
//! }
//! ```

pub mod advancement;
pub mod builder;
pub mod config;
pub mod deleter;
pub mod errors;
pub mod forfeit;
pub mod locks;
pub mod manager;
pub mod models;
pub mod seeder;
pub mod view;

pub use advancement::AdvancementEngine;
pub use builder::{BracketBuilder, DivisionStandings, QUARTERFINAL_PAIRINGS, SEMIFINAL_FEEDERS};
pub use config::{BracketConfig, ConfigError, MAX_ADVANCEMENT_OFFSET_DAYS};
pub use deleter::{BracketDeleter, deletion_order};
pub use errors::{BracketError, BracketResult, ErrorKind};
pub use forfeit::{FORFEIT_WINNING_SCORE, ForfeitHandler};
pub use locks::CompetitionLocks;
pub use manager::BracketManager;
pub use models::{
    Advancement, BracketRequest, BracketSlot, CompetitionKey, DivisionPair, Match, MatchId,
    MatchStatus, MatchUpdate, NewBracketSlot, NewMatch, Round, SEEDS_PER_TIER, Seeding, Side,
    SlotId, SlotSource, Standing, TEAMS_PER_DIVISION, TeamId, TierConfig,
};
pub use seeder::{BracketSeeder, seeds_for_index};
pub use view::{BracketSlotView, BracketViewer, MatchSummary, TeamSummary};
