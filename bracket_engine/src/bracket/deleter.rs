//! Bracket teardown in dependency order.

use std::collections::BTreeSet;
use std::sync::Arc;

use super::errors::BracketResult;
use super::models::{BracketSlot, CompetitionKey, MatchId};
use crate::db::{BracketStore, MatchService};

/// Order in which slots can be deleted: finals, then semifinals, then
/// quarterfinals, so no slot is removed while another still lists it as a
/// feeder.
pub fn deletion_order(slots: &[BracketSlot]) -> Vec<&BracketSlot> {
    let mut ordered: Vec<&BracketSlot> = slots.iter().collect();
    ordered.sort_by(|a, b| {
        b.round
            .cmp(&a.round)
            .then_with(|| a.tier.cmp(&b.tier))
            .then_with(|| a.position.cmp(&b.position))
    });
    ordered
}

/// Removes whole brackets
#[derive(Clone)]
pub struct BracketDeleter {
    store: Arc<dyn BracketStore>,
    matches: Arc<dyn MatchService>,
}

impl BracketDeleter {
    pub fn new(store: Arc<dyn BracketStore>, matches: Arc<dyn MatchService>) -> Self {
        Self { store, matches }
    }

    /// Delete every slot of `key` and the matches they reference.
    ///
    /// Returns the number of slots removed. Nothing is written when the
    /// competition has no bracket.
    pub async fn delete_bracket(&self, key: &CompetitionKey) -> BracketResult<usize> {
        let slots = self.store.list_by_competition(key).await?;
        if slots.is_empty() {
            return Ok(0);
        }

        for slot in deletion_order(&slots) {
            self.store.delete(slot.id).await?;
        }

        let match_ids: BTreeSet<MatchId> = slots.iter().filter_map(|s| s.match_id).collect();
        for match_id in &match_ids {
            self.matches.delete(*match_id).await?;
        }

        log::info!(
            "Deleted bracket {}: {} slots, {} matches",
            key,
            slots.len(),
            match_ids.len()
        );

        Ok(slots.len())
    }
}
