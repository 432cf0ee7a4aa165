//! Bracket generation: seeded quarterfinals plus placeholder later rounds.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;

use super::errors::{BracketError, BracketResult};
use super::models::{
    BracketSlot, CompetitionKey, MatchId, MatchStatus, NewBracketSlot, NewMatch, Round,
    Seeding, SlotId, SlotSource, Standing, TierConfig,
};
use super::seeder::BracketSeeder;
use crate::db::{BracketStore, MatchService};

/// Quarterfinal pairings by position: (home seed, away seed).
///
/// Cross-seeded so seeds 1 and 2 can only meet in the final.
pub const QUARTERFINAL_PAIRINGS: [(u8, u8); 4] = [(1, 8), (4, 5), (3, 6), (2, 7)];

/// Semifinal feeders by position, as quarterfinal positions (home, away)
pub const SEMIFINAL_FEEDERS: [(u8, u8); 2] = [(1, 2), (3, 4)];

/// Ranked standings of one division
#[derive(Debug, Clone, Copy)]
pub struct DivisionStandings<'a> {
    pub division: &'a str,
    pub standings: &'a [Standing],
}

/// Writes made so far, kept so a failed generation can be undone
#[derive(Debug, Default)]
pub(crate) struct BuildLog {
    pub slots: Vec<SlotId>,
    pub matches: Vec<MatchId>,
}

/// Creates the slot tree for every tier of a competition
#[derive(Clone)]
pub struct BracketBuilder {
    store: Arc<dyn BracketStore>,
    matches: Arc<dyn MatchService>,
    seeder: BracketSeeder,
    match_type: String,
}

impl BracketBuilder {
    pub fn new(
        store: Arc<dyn BracketStore>,
        matches: Arc<dyn MatchService>,
        seeder: BracketSeeder,
        match_type: impl Into<String>,
    ) -> Self {
        Self {
            store,
            matches,
            seeder,
            match_type: match_type.into(),
        }
    }

    /// Build the bracket for every tier.
    ///
    /// Per tier this creates four scheduled quarterfinal matches on
    /// `start_date`, four seeded quarterfinal slots, two semifinal slots and
    /// one final slot. Later-round slots have no match yet.
    ///
    /// Validation (tiers, standings, team names) happens before anything is
    /// written. If a storage call fails part-way, everything written by this
    /// call is removed again before the error is returned.
    ///
    /// # Errors
    ///
    /// * `BracketError::BracketExists` - slots already exist for `key`
    /// * `BracketError::InvalidTierConfig` - empty, duplicate or mis-sized tiers
    /// * `BracketError::InsufficientTeams` / `UnknownTeam` - from seeding
    pub async fn build(
        &self,
        key: &CompetitionKey,
        division_a: DivisionStandings<'_>,
        division_b: DivisionStandings<'_>,
        tiers: &[TierConfig],
        start_date: DateTime<Utc>,
    ) -> BracketResult<Vec<BracketSlot>> {
        if !self.store.list_by_competition(key).await?.is_empty() {
            return Err(BracketError::BracketExists(key.to_string()));
        }

        validate_tiers(tiers)?;

        let mut seedings = Vec::with_capacity(tiers.len());
        for tier in tiers {
            let seeding = self
                .seeder
                .seed(
                    (division_a.division, division_a.standings),
                    (division_b.division, division_b.standings),
                    tier,
                )
                .await?;
            seedings.push((tier, seeding));
        }

        let mut written = BuildLog::default();
        let mut created = Vec::with_capacity(tiers.len() * 7);

        for (tier, seeding) in &seedings {
            match self
                .build_tier(key, &tier.name, seeding, start_date, &mut written)
                .await
            {
                Ok(slots) => created.extend(slots),
                Err(err) => {
                    self.undo(&written).await;
                    return Err(err);
                }
            }
        }

        log::info!(
            "Generated bracket {} with {} tier(s): {} slots, {} matches",
            key,
            tiers.len(),
            written.slots.len(),
            written.matches.len()
        );

        Ok(created)
    }

    async fn build_tier(
        &self,
        key: &CompetitionKey,
        tier: &str,
        seeding: &Seeding,
        start_date: DateTime<Utc>,
        written: &mut BuildLog,
    ) -> BracketResult<Vec<BracketSlot>> {
        let mut quarterfinals = Vec::with_capacity(QUARTERFINAL_PAIRINGS.len());

        for (index, (home_seed, away_seed)) in QUARTERFINAL_PAIRINGS.iter().copied().enumerate() {
            let (Some(home_team_id), Some(away_team_id)) =
                (seeding.team(home_seed), seeding.team(away_seed))
            else {
                return Err(BracketError::InvalidTierConfig(format!(
                    "tier '{tier}' is missing seed {home_seed} or {away_seed}"
                )));
            };

            let match_id = self
                .matches
                .create(&NewMatch {
                    home_team_id,
                    away_team_id,
                    scheduled_at: start_date,
                    status: MatchStatus::Scheduled,
                    match_type: self.match_type.clone(),
                })
                .await?;
            written.matches.push(match_id);

            let slot = self
                .insert_slot(
                    written,
                    NewBracketSlot {
                        key: key.clone(),
                        tier: tier.to_string(),
                        round: Round::Quarterfinal,
                        position: index as u8 + 1,
                        source: SlotSource::Seeds {
                            home: home_seed,
                            away: away_seed,
                        },
                        match_id: Some(match_id),
                    },
                )
                .await?;
            quarterfinals.push(slot);
        }

        let mut semifinals = Vec::with_capacity(SEMIFINAL_FEEDERS.len());
        for (index, (home_qf, away_qf)) in SEMIFINAL_FEEDERS.iter().copied().enumerate() {
            let slot = self
                .insert_slot(
                    written,
                    NewBracketSlot {
                        key: key.clone(),
                        tier: tier.to_string(),
                        round: Round::Semifinal,
                        position: index as u8 + 1,
                        source: SlotSource::Feeders {
                            home: quarterfinals[home_qf as usize - 1].id,
                            away: quarterfinals[away_qf as usize - 1].id,
                        },
                        match_id: None,
                    },
                )
                .await?;
            semifinals.push(slot);
        }

        let final_slot = self
            .insert_slot(
                written,
                NewBracketSlot {
                    key: key.clone(),
                    tier: tier.to_string(),
                    round: Round::Final,
                    position: 1,
                    source: SlotSource::Feeders {
                        home: semifinals[0].id,
                        away: semifinals[1].id,
                    },
                    match_id: None,
                },
            )
            .await?;

        log::debug!("Built tier '{}' of {}", tier, key);

        let mut slots = quarterfinals;
        slots.extend(semifinals);
        slots.push(final_slot);
        Ok(slots)
    }

    async fn insert_slot(
        &self,
        written: &mut BuildLog,
        slot: NewBracketSlot,
    ) -> BracketResult<BracketSlot> {
        let id = self.store.insert(&slot).await?;
        written.slots.push(id);
        Ok(slot.with_id(id))
    }

    /// Remove everything a failed build wrote, newest first.
    ///
    /// Failures here are logged and swallowed so the original error reaches
    /// the caller.
    async fn undo(&self, written: &BuildLog) {
        log::warn!(
            "Bracket generation failed, removing {} slots and {} matches",
            written.slots.len(),
            written.matches.len()
        );

        for slot_id in written.slots.iter().rev() {
            if let Err(e) = self.store.delete(*slot_id).await {
                log::error!("Failed to remove slot {} after aborted generation: {}", slot_id, e);
            }
        }
        for match_id in written.matches.iter().rev() {
            if let Err(e) = self.matches.delete(*match_id).await {
                log::error!("Failed to remove match {} after aborted generation: {}", match_id, e);
            }
        }
    }
}

fn validate_tiers(tiers: &[TierConfig]) -> BracketResult<()> {
    if tiers.is_empty() {
        return Err(BracketError::InvalidTierConfig(
            "at least one tier is required".to_string(),
        ));
    }

    let mut names = HashSet::new();
    for tier in tiers {
        tier.validate()?;
        if !names.insert(tier.name.as_str()) {
            return Err(BracketError::InvalidTierConfig(format!(
                "duplicate tier name '{}'",
                tier.name
            )));
        }
    }
    Ok(())
}
