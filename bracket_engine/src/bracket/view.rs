//! Read model of a bracket: slots joined with their matches and team names.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use super::errors::{BracketError, BracketResult};
use super::models::{BracketSlot, CompetitionKey, Match, MatchId, MatchStatus, Round, SlotId, TeamId};
use crate::db::{BracketStore, MatchService, TeamDirectory};

/// Team reference with its display name, when the directory knows it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamSummary {
    pub id: TeamId,
    pub name: Option<String>,
}

/// Match as shown inside a bracket
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchSummary {
    pub id: MatchId,
    pub home: TeamSummary,
    pub away: TeamSummary,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
    pub status: MatchStatus,
    pub forfeit_team_id: Option<TeamId>,
    pub scheduled_at: DateTime<Utc>,
    pub match_type: String,
}

/// One slot of a bracket with its match attached.
///
/// `winner` is derived from the match on every read and is `None` while the
/// match is open, tied or not yet created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BracketSlotView {
    pub slot_id: SlotId,
    pub tier: String,
    pub round: Round,
    pub position: u8,
    pub home_seed: Option<u8>,
    pub away_seed: Option<u8>,
    pub home_source_slot_id: Option<SlotId>,
    pub away_source_slot_id: Option<SlotId>,
    pub game: Option<MatchSummary>,
    pub winner: Option<TeamSummary>,
}

/// Builds bracket views from storage
#[derive(Clone)]
pub struct BracketViewer {
    store: Arc<dyn BracketStore>,
    matches: Arc<dyn MatchService>,
    teams: Arc<dyn TeamDirectory>,
}

impl BracketViewer {
    pub fn new(
        store: Arc<dyn BracketStore>,
        matches: Arc<dyn MatchService>,
        teams: Arc<dyn TeamDirectory>,
    ) -> Self {
        Self {
            store,
            matches,
            teams,
        }
    }

    /// All slots of a competition ordered by round, tier and position.
    /// An unknown competition yields an empty list.
    pub async fn view(&self, key: &CompetitionKey) -> BracketResult<Vec<BracketSlotView>> {
        let slots = self.store.list_by_competition(key).await?;
        self.view_slots(&slots).await
    }

    /// Join already-loaded slots with their matches
    pub async fn view_slots(&self, slots: &[BracketSlot]) -> BracketResult<Vec<BracketSlotView>> {
        let mut names = NameCache::default();
        let mut views = Vec::with_capacity(slots.len());

        for slot in slots {
            let game = match slot.match_id {
                Some(match_id) => Some(
                    self.matches
                        .get(match_id)
                        .await?
                        .ok_or(BracketError::MatchNotFound(match_id))?,
                ),
                None => None,
            };

            let (summary, winner) = match game {
                Some(game) => {
                    let winner = match game.winner().ok() {
                        Some(team_id) => Some(self.summary(&mut names, team_id).await?),
                        None => None,
                    };
                    (Some(self.match_summary(&mut names, game).await?), winner)
                }
                None => (None, None),
            };

            views.push(BracketSlotView {
                slot_id: slot.id,
                tier: slot.tier.clone(),
                round: slot.round,
                position: slot.position,
                home_seed: slot.home_seed(),
                away_seed: slot.away_seed(),
                home_source_slot_id: slot.home_source_slot_id(),
                away_source_slot_id: slot.away_source_slot_id(),
                game: summary,
                winner,
            });
        }

        Ok(views)
    }

    async fn match_summary(&self, names: &mut NameCache, game: Match) -> BracketResult<MatchSummary> {
        Ok(MatchSummary {
            id: game.id,
            home: self.summary(names, game.home_team_id).await?,
            away: self.summary(names, game.away_team_id).await?,
            home_score: game.home_score,
            away_score: game.away_score,
            status: game.status,
            forfeit_team_id: game.forfeit_team_id,
            scheduled_at: game.scheduled_at,
            match_type: game.match_type,
        })
    }

    async fn summary(&self, names: &mut NameCache, team_id: TeamId) -> BracketResult<TeamSummary> {
        let name = match names.0.get(&team_id) {
            Some(name) => name.clone(),
            None => {
                let name = self.teams.team_name(team_id).await?;
                names.0.insert(team_id, name.clone());
                name
            }
        };
        Ok(TeamSummary { id: team_id, name })
    }
}

/// Team names looked up during one view call
#[derive(Default)]
struct NameCache(HashMap<TeamId, Option<String>>);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::models::{NewBracketSlot, NewMatch, SlotSource};
    use crate::db::{InMemoryBracketStore, InMemoryMatchService, InMemoryTeamDirectory};

    async fn setup() -> (InMemoryBracketStore, InMemoryMatchService, BracketViewer, CompetitionKey) {
        let key = CompetitionKey::new("Metro", "2024", "U12");
        let store = InMemoryBracketStore::new();
        let matches = InMemoryMatchService::new();
        let teams = InMemoryTeamDirectory::new()
            .with_team(1, "Rovers")
            .with_team(2, "United");

        let match_id = matches
            .create(&NewMatch {
                home_team_id: 1,
                away_team_id: 2,
                scheduled_at: Utc::now(),
                status: MatchStatus::Scheduled,
                match_type: "playoff".to_string(),
            })
            .await
            .unwrap();
        let qf1 = store
            .insert(&NewBracketSlot {
                key: key.clone(),
                tier: "Gold".to_string(),
                round: Round::Quarterfinal,
                position: 1,
                source: SlotSource::Seeds { home: 1, away: 8 },
                match_id: Some(match_id),
            })
            .await
            .unwrap();
        let qf2 = store
            .insert(&NewBracketSlot {
                key: key.clone(),
                tier: "Gold".to_string(),
                round: Round::Quarterfinal,
                position: 2,
                source: SlotSource::Seeds { home: 4, away: 5 },
                match_id: None,
            })
            .await
            .unwrap();
        store
            .insert(&NewBracketSlot {
                key: key.clone(),
                tier: "Gold".to_string(),
                round: Round::Semifinal,
                position: 1,
                source: SlotSource::Feeders {
                    home: qf1,
                    away: qf2,
                },
                match_id: None,
            })
            .await
            .unwrap();

        let viewer = BracketViewer::new(
            Arc::new(store.clone()),
            Arc::new(matches.clone()),
            Arc::new(teams),
        );
        (store, matches, viewer, key)
    }

    #[tokio::test]
    async fn test_view_joins_matches_and_names() {
        let (_, _, viewer, key) = setup().await;
        let views = viewer.view(&key).await.unwrap();

        assert_eq!(views.len(), 3);
        let qf = &views[0];
        assert_eq!(qf.round, Round::Quarterfinal);
        assert_eq!((qf.home_seed, qf.away_seed), (Some(1), Some(8)));
        let game = qf.game.as_ref().unwrap();
        assert_eq!(game.home.name.as_deref(), Some("Rovers"));
        assert_eq!(game.away.name.as_deref(), Some("United"));
        assert_eq!(qf.winner, None);

        let semi = &views[2];
        assert_eq!(semi.round, Round::Semifinal);
        assert_eq!(semi.home_seed, None);
        assert!(semi.home_source_slot_id.is_some());
        assert!(semi.game.is_none());
    }

    #[tokio::test]
    async fn test_winner_derived_from_result() {
        let (_, matches, viewer, key) = setup().await;
        let match_id = matches.all()[0].id;
        matches.record_result(match_id, 0, 2).unwrap();

        let views = viewer.view(&key).await.unwrap();
        let winner = views[0].winner.as_ref().unwrap();
        assert_eq!(winner.id, 2);
        assert_eq!(winner.name.as_deref(), Some("United"));
    }

    #[tokio::test]
    async fn test_unknown_competition_is_empty() {
        let (_, _, viewer, _) = setup().await;
        let views = viewer
            .view(&CompetitionKey::new("Metro", "2025", "U12"))
            .await
            .unwrap();
        assert!(views.is_empty());
    }

    #[tokio::test]
    async fn test_missing_match_is_reported() {
        let (_, matches, viewer, key) = setup().await;
        let match_id = matches.all()[0].id;
        matches.delete(match_id).await.unwrap();

        let err = viewer.view(&key).await.unwrap_err();
        assert!(matches!(err, BracketError::MatchNotFound(id) if id == match_id));
    }

    #[tokio::test]
    async fn test_view_serializes_to_json() {
        let (_, _, viewer, key) = setup().await;
        let views = viewer.view(&key).await.unwrap();

        let json = serde_json::to_value(&views[0]).unwrap();
        assert_eq!(json["round"], "quarterfinal");
        assert_eq!(json["tier"], "Gold");
        assert_eq!(json["game"]["status"], "scheduled");
        assert_eq!(json["game"]["home"]["name"], "Rovers");
        assert!(json["winner"].is_null());
    }
}
