//! Seeding of two divisions' standings into one tier.

use std::sync::Arc;

use super::errors::{BracketError, BracketResult};
use super::models::{Seeding, Standing, TeamId, TierConfig};
use crate::db::TeamDirectory;

/// Seed numbers for slice index `i`: division A gets the odd seed, B the even one.
pub fn seeds_for_index(i: usize) -> (u8, u8) {
    let a = 2 * i as u8 + 1;
    (a, a + 1)
}

/// Maps ranked standings onto bracket seeds
#[derive(Clone)]
pub struct BracketSeeder {
    teams: Arc<dyn TeamDirectory>,
}

impl BracketSeeder {
    pub fn new(teams: Arc<dyn TeamDirectory>) -> Self {
        Self { teams }
    }

    /// Seed one tier from the two divisions' standings.
    ///
    /// Both lists must be sorted by ascending rank. The tier's rank slice is
    /// applied to each list; slice index `i` of division A becomes seed
    /// `2i + 1` and of division B seed `2i + 2`.
    ///
    /// # Errors
    ///
    /// * `BracketError::InsufficientTeams` - a division is shorter than the slice
    /// * `BracketError::UnknownTeam` - a team name has no directory entry
    pub async fn seed(
        &self,
        division_a: (&str, &[Standing]),
        division_b: (&str, &[Standing]),
        tier: &TierConfig,
    ) -> BracketResult<Seeding> {
        let a = slice(division_a, tier)?;
        let b = slice(division_b, tier)?;

        let mut seeding = Seeding::default();
        for (i, (from_a, from_b)) in a.iter().zip(b).enumerate() {
            let (seed_a, seed_b) = seeds_for_index(i);
            seeding.insert(seed_a, self.resolve(&from_a.team_name).await?);
            seeding.insert(seed_b, self.resolve(&from_b.team_name).await?);
        }

        Ok(seeding)
    }

    async fn resolve(&self, team_name: &str) -> BracketResult<TeamId> {
        self.teams
            .resolve(team_name)
            .await?
            .ok_or_else(|| BracketError::UnknownTeam(team_name.to_string()))
    }
}

fn slice<'a>(
    (division, standings): (&str, &'a [Standing]),
    tier: &TierConfig,
) -> BracketResult<&'a [Standing]> {
    tier.validate()?;

    let start = tier.start_rank as usize - 1;
    let end = tier.end_rank as usize;

    if standings.len() < end {
        return Err(BracketError::InsufficientTeams {
            division: division.to_string(),
            needed: end,
            available: standings.len(),
        });
    }

    Ok(&standings[start..end])
}
