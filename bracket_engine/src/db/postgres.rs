//! PostgreSQL implementations of the repository traits.
//!
//! Rows are mapped to typed models here, once, so nothing above this layer
//! sees raw columns. The schema lives in `migrations/`.
#![allow(clippy::needless_raw_string_hashes)]

use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};

use super::repository::{BracketStore, MatchService, StandingsProvider, TeamDirectory};
use crate::bracket::{
    BracketError, BracketResult, BracketSlot, CompetitionKey, Match, MatchId, MatchStatus,
    MatchUpdate, NewBracketSlot, NewMatch, Round, SlotId, SlotSource, Standing, TeamId,
};

const SLOT_COLUMNS: &str = "id, league, season, age_group, tier, round, position, \
     home_seed, away_seed, home_source_slot_id, away_source_slot_id, match_id";

fn slot_from_row(row: &PgRow) -> BracketResult<BracketSlot> {
    let id: SlotId = row.get("id");

    let seeds = (
        row.get::<Option<i16>, _>("home_seed"),
        row.get::<Option<i16>, _>("away_seed"),
    );
    let feeders = (
        row.get::<Option<i64>, _>("home_source_slot_id"),
        row.get::<Option<i64>, _>("away_source_slot_id"),
    );

    let source = match (seeds, feeders) {
        ((Some(home), Some(away)), (None, None)) => SlotSource::Seeds {
            home: home as u8,
            away: away as u8,
        },
        ((None, None), (Some(home), Some(away))) => SlotSource::Feeders { home, away },
        _ => {
            return Err(BracketError::Storage(format!(
                "slot {id} must have either both seeds or both source slots"
            )));
        }
    };

    Ok(BracketSlot {
        id,
        key: CompetitionKey {
            league: row.get("league"),
            season: row.get("season"),
            age_group: row.get("age_group"),
        },
        tier: row.get("tier"),
        round: Round::from_db_str(row.get::<&str, _>("round"))?,
        position: row.get::<i16, _>("position") as u8,
        source,
        match_id: row.get("match_id"),
    })
}

fn match_from_row(row: &PgRow) -> BracketResult<Match> {
    Ok(Match {
        id: row.get("id"),
        home_team_id: row.get("home_team_id"),
        away_team_id: row.get("away_team_id"),
        home_score: row.get("home_score"),
        away_score: row.get("away_score"),
        status: MatchStatus::from_db_str(row.get::<&str, _>("status"))?,
        forfeit_team_id: row.get("forfeit_team_id"),
        match_type: row.get("match_type"),
        scheduled_at: row
            .get::<chrono::NaiveDateTime, _>("scheduled_at")
            .and_utc(),
    })
}

/// PostgreSQL implementation of [`BracketStore`]
#[derive(Clone)]
pub struct PgBracketStore {
    pool: PgPool,
}

impl PgBracketStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BracketStore for PgBracketStore {
    async fn insert(&self, slot: &NewBracketSlot) -> BracketResult<SlotId> {
        let (home_seed, away_seed, home_source, away_source) = match slot.source {
            SlotSource::Seeds { home, away } => {
                (Some(home as i16), Some(away as i16), None, None)
            }
            SlotSource::Feeders { home, away } => (None, None, Some(home), Some(away)),
        };

        let row = sqlx::query(
            r#"
            INSERT INTO bracket_slots
                (league, season, age_group, tier, round, position,
                 home_seed, away_seed, home_source_slot_id, away_source_slot_id, match_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id
            "#,
        )
        .bind(&slot.key.league)
        .bind(&slot.key.season)
        .bind(&slot.key.age_group)
        .bind(&slot.tier)
        .bind(slot.round.to_string())
        .bind(slot.position as i16)
        .bind(home_seed)
        .bind(away_seed)
        .bind(home_source)
        .bind(away_source)
        .bind(slot.match_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get("id"))
    }

    async fn get(&self, slot_id: SlotId) -> BracketResult<Option<BracketSlot>> {
        let row = sqlx::query(&format!(
            "SELECT {SLOT_COLUMNS} FROM bracket_slots WHERE id = $1"
        ))
        .bind(slot_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(slot_from_row).transpose()
    }

    async fn find_feeding(&self, slot_id: SlotId) -> BracketResult<Option<BracketSlot>> {
        let row = sqlx::query(&format!(
            "SELECT {SLOT_COLUMNS} FROM bracket_slots
             WHERE home_source_slot_id = $1 OR away_source_slot_id = $1
             LIMIT 1"
        ))
        .bind(slot_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(slot_from_row).transpose()
    }

    async fn list_by_competition(&self, key: &CompetitionKey) -> BracketResult<Vec<BracketSlot>> {
        let rows = sqlx::query(&format!(
            "SELECT {SLOT_COLUMNS} FROM bracket_slots
             WHERE league = $1 AND season = $2 AND age_group = $3
             ORDER BY CASE round
                        WHEN 'quarterfinal' THEN 1
                        WHEN 'semifinal' THEN 2
                        ELSE 3
                      END,
                      tier, position"
        ))
        .bind(&key.league)
        .bind(&key.season)
        .bind(&key.age_group)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(slot_from_row).collect()
    }

    async fn link_match(&self, slot_id: SlotId, match_id: MatchId) -> BracketResult<bool> {
        let result = sqlx::query(
            "UPDATE bracket_slots SET match_id = $1 WHERE id = $2 AND match_id IS NULL",
        )
        .bind(match_id)
        .bind(slot_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(true);
        }

        // Distinguish "already linked" from "no such slot"
        match self.get(slot_id).await? {
            Some(_) => Ok(false),
            None => Err(BracketError::SlotNotFound(slot_id)),
        }
    }

    async fn delete(&self, slot_id: SlotId) -> BracketResult<()> {
        sqlx::query("DELETE FROM bracket_slots WHERE id = $1")
            .bind(slot_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// PostgreSQL implementation of [`MatchService`]
#[derive(Clone)]
pub struct PgMatchService {
    pool: PgPool,
}

impl PgMatchService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MatchService for PgMatchService {
    async fn create(&self, new_match: &NewMatch) -> BracketResult<MatchId> {
        let row = sqlx::query(
            r#"
            INSERT INTO matches (home_team_id, away_team_id, status, match_type, scheduled_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(new_match.home_team_id)
        .bind(new_match.away_team_id)
        .bind(new_match.status.to_string())
        .bind(&new_match.match_type)
        .bind(new_match.scheduled_at.naive_utc())
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get("id"))
    }

    async fn get(&self, match_id: MatchId) -> BracketResult<Option<Match>> {
        let row = sqlx::query(
            r#"
            SELECT id, home_team_id, away_team_id, home_score, away_score, status,
                   forfeit_team_id, match_type, scheduled_at
            FROM matches
            WHERE id = $1
            "#,
        )
        .bind(match_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(match_from_row).transpose()
    }

    async fn update(&self, match_id: MatchId, update: &MatchUpdate) -> BracketResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE matches
            SET status = COALESCE($1, status),
                home_score = COALESCE($2, home_score),
                away_score = COALESCE($3, away_score),
                forfeit_team_id = COALESCE($4, forfeit_team_id),
                updated_at = NOW()
            WHERE id = $5
            "#,
        )
        .bind(update.status.map(|s| s.to_string()))
        .bind(update.home_score)
        .bind(update.away_score)
        .bind(update.forfeit_team_id)
        .bind(match_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(BracketError::MatchNotFound(match_id));
        }
        Ok(())
    }

    async fn delete(&self, match_id: MatchId) -> BracketResult<()> {
        sqlx::query("DELETE FROM matches WHERE id = $1")
            .bind(match_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// PostgreSQL implementation of [`StandingsProvider`]
#[derive(Clone)]
pub struct PgStandingsProvider {
    pool: PgPool,
}

impl PgStandingsProvider {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StandingsProvider for PgStandingsProvider {
    async fn get_standings(
        &self,
        season_id: &str,
        division_id: &str,
    ) -> BracketResult<Vec<Standing>> {
        let rows = sqlx::query(
            r#"
            SELECT team_name, rank
            FROM standings
            WHERE season_id = $1 AND division_id = $2
            ORDER BY rank
            "#,
        )
        .bind(season_id)
        .bind(division_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| Standing {
                team_name: row.get("team_name"),
                rank: row.get::<i32, _>("rank") as u32,
            })
            .collect())
    }
}

/// PostgreSQL implementation of [`TeamDirectory`]
#[derive(Clone)]
pub struct PgTeamDirectory {
    pool: PgPool,
}

impl PgTeamDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TeamDirectory for PgTeamDirectory {
    async fn resolve(&self, team_name: &str) -> BracketResult<Option<TeamId>> {
        let row = sqlx::query("SELECT id FROM teams WHERE name = $1")
            .bind(team_name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get("id")))
    }

    async fn team_name(&self, team_id: TeamId) -> BracketResult<Option<String>> {
        let row = sqlx::query("SELECT name FROM teams WHERE id = $1")
            .bind(team_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get("name")))
    }
}
