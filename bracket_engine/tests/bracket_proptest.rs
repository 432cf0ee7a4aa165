/// Property-based tests for seeding and advancement using proptest
///
/// These tests check that seeding, deletion order and winner propagation
/// hold across randomly generated standings, scores and advancement orders.
use bracket_engine::bracket::{
    Advancement, BracketConfig, BracketError, BracketManager, BracketRequest, BracketSeeder,
    BracketSlot, CompetitionKey, DivisionPair, Round, SlotSource, Standing, TierConfig,
    deletion_order, seeds_for_index,
};
use bracket_engine::db::{
    InMemoryBracketStore, InMemoryMatchService, InMemoryStandings, InMemoryTeamDirectory,
};
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;

// Strategy for a decisive score line (no ties)
fn decisive_score() -> impl Strategy<Value = (i32, i32)> {
    (0i32..6, 0i32..6).prop_filter("Scores must differ", |(home, away)| home != away)
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn ranked(prefix: &str, count: usize) -> Vec<Standing> {
    (1..=count)
        .map(|rank| Standing::new(format!("{prefix}{rank}"), rank as u32))
        .collect()
}

fn winner_of(teams: (i64, i64), score: (i32, i32)) -> i64 {
    if score.0 > score.1 { teams.0 } else { teams.1 }
}

#[test]
fn test_seeds_cover_one_through_eight() {
    let seeds: BTreeSet<u8> = (0..4)
        .flat_map(|i| {
            let (a, b) = seeds_for_index(i);
            [a, b]
        })
        .collect();
    assert_eq!(seeds, (1..=8).collect::<BTreeSet<u8>>());
}

proptest! {
    #[test]
    fn test_seeding_respects_division_sizes(size_a in 0usize..12, size_b in 0usize..12, silver in any::<bool>()) {
        let tier = if silver { TierConfig::silver() } else { TierConfig::gold() };
        let mut directory = InMemoryTeamDirectory::new();
        for rank in 1..=12 {
            directory = directory
                .with_team(rank, &format!("A{rank}"))
                .with_team(100 + rank, &format!("B{rank}"));
        }
        let seeder = BracketSeeder::new(Arc::new(directory));
        let a = ranked("A", size_a);
        let b = ranked("B", size_b);

        let result = runtime().block_on(seeder.seed(("A", &a), ("B", &b), &tier));
        let needed = tier.end_rank as usize;

        if size_a >= needed && size_b >= needed {
            let seeding = result.unwrap();
            prop_assert_eq!(seeding.len(), 8);
            for (i, rank) in (tier.start_rank..=tier.end_rank).enumerate() {
                let (seed_a, seed_b) = seeds_for_index(i);
                prop_assert_eq!(seeding.team(seed_a), Some(rank as i64));
                prop_assert_eq!(seeding.team(seed_b), Some(100 + rank as i64));
            }
        } else {
            let is_insufficient = matches!(result, Err(BracketError::InsufficientTeams { .. }));
            prop_assert!(is_insufficient);
        }
    }

    #[test]
    fn test_deletion_order_never_orphans_a_feeder(
        order in Just((0..7usize).collect::<Vec<_>>()).prop_shuffle()
    ) {
        let key = CompetitionKey::new("Metro", "2024", "U12");
        let slot = |id: i64, round: Round, position: u8, source: SlotSource| BracketSlot {
            id,
            key: key.clone(),
            tier: "Gold".to_string(),
            round,
            position,
            source,
            match_id: None,
        };
        let tree = [
            slot(1, Round::Quarterfinal, 1, SlotSource::Seeds { home: 1, away: 8 }),
            slot(2, Round::Quarterfinal, 2, SlotSource::Seeds { home: 4, away: 5 }),
            slot(3, Round::Quarterfinal, 3, SlotSource::Seeds { home: 3, away: 6 }),
            slot(4, Round::Quarterfinal, 4, SlotSource::Seeds { home: 2, away: 7 }),
            slot(5, Round::Semifinal, 1, SlotSource::Feeders { home: 1, away: 2 }),
            slot(6, Round::Semifinal, 2, SlotSource::Feeders { home: 3, away: 4 }),
            slot(7, Round::Final, 1, SlotSource::Feeders { home: 5, away: 6 }),
        ];
        let shuffled: Vec<BracketSlot> = order.iter().map(|&i| tree[i].clone()).collect();

        let mut deleted = BTreeSet::new();
        for slot in deletion_order(&shuffled) {
            // Whatever this slot feeds must already be gone
            for parent in &tree {
                if parent.home_source_slot_id() == Some(slot.id)
                    || parent.away_source_slot_id() == Some(slot.id)
                {
                    prop_assert!(deleted.contains(&parent.id));
                }
            }
            deleted.insert(slot.id);
        }
        prop_assert_eq!(deleted.len(), 7);
    }

    #[test]
    fn test_any_advancement_order_crowns_one_champion(
        qf_scores in prop::collection::vec(decisive_score(), 4),
        sf_scores in prop::collection::vec(decisive_score(), 2),
        final_score in decisive_score(),
        qf_order in Just(vec![0usize, 1, 2, 3]).prop_shuffle(),
        sf_reversed in any::<bool>(),
    ) {
        let north: Vec<String> = (1..=4).map(|r| format!("N{r}")).collect();
        let south: Vec<String> = (1..=4).map(|r| format!("S{r}")).collect();
        let north: Vec<&str> = north.iter().map(String::as_str).collect();
        let south: Vec<&str> = south.iter().map(String::as_str).collect();

        let matches = InMemoryMatchService::new();
        let manager = BracketManager::new(
            Arc::new(InMemoryBracketStore::new()),
            Arc::new(matches.clone()),
            Arc::new(
                InMemoryStandings::new()
                    .with_division("2024", "north", &north)
                    .with_division("2024", "south", &south),
            ),
            Arc::new(InMemoryTeamDirectory::new().with_teams(1, &north).with_teams(11, &south)),
            BracketConfig::default(),
        );
        let request = BracketRequest {
            key: CompetitionKey::new("Metro", "2024", "U12"),
            season_id: "2024".to_string(),
            divisions: DivisionPair { a: "north".to_string(), b: "south".to_string() },
            tiers: vec![TierConfig::gold()],
            start_date: chrono::Utc::now(),
        };

        let rt = runtime();
        let champion = rt.block_on(async {
            let views = manager.generate_bracket(&request).await.unwrap();
            let qf_winners: Vec<i64> = views[..4]
                .iter()
                .zip(&qf_scores)
                .map(|(view, score)| {
                    let game = view.game.as_ref().unwrap();
                    matches.record_result(game.id, score.0, score.1).unwrap();
                    winner_of((game.home.id, game.away.id), *score)
                })
                .collect();
            for &i in &qf_order {
                manager.advance_winner(views[i].slot_id).await.unwrap();
            }

            let views = manager.get_bracket(&request.key).await.unwrap();
            let mut sf_winners = Vec::new();
            for (view, score) in views[4..6].iter().zip(&sf_scores) {
                let game = view.game.as_ref().unwrap();
                let first = 2 * (view.position as usize - 1);
                let expected = (qf_winners[first], qf_winners[first + 1]);
                assert_eq!((game.home.id, game.away.id), expected);
                matches.record_result(game.id, score.0, score.1).unwrap();
                sf_winners.push(winner_of(expected, *score));
            }
            let mut semis = [views[4].slot_id, views[5].slot_id];
            if sf_reversed {
                semis.reverse();
            }
            for slot_id in semis {
                manager.advance_winner(slot_id).await.unwrap();
            }

            let views = manager.get_bracket(&request.key).await.unwrap();
            let game = views[6].game.as_ref().unwrap();
            assert_eq!((game.home.id, game.away.id), (sf_winners[0], sf_winners[1]));
            matches.record_result(game.id, final_score.0, final_score.1).unwrap();

            let outcome = manager.advance_winner(views[6].slot_id).await.unwrap();
            (outcome, winner_of((sf_winners[0], sf_winners[1]), final_score))
        });

        prop_assert_eq!(champion.0, Advancement::Terminal { winner: champion.1 });
        prop_assert_eq!(matches.len(), 7);
    }
}
