//! Master game queries, cached through `core::cache`

use super::{schema::FantasyCriticDatabase, MasterGameRepo};
use crate::cli::types::ids::{MasterGameId, RequestId};
use crate::cli::types::time::Year;
use crate::core::cache::{MasterGameCacheKey, MasterGameYearsCacheKey};
use crate::domain::{
    MasterGame, MasterGameChangeLogEntry, MasterGameRequest, MasterGameTag, MasterGameYear, TagType,
};
use anyhow::Result;
use chrono::Datelike;
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};
use std::collections::HashMap;
use uuid::Uuid;

const MASTER_GAME_COLUMNS: &str = "id, name, estimated_release_date, minimum_release_date,
    maximum_release_date, early_access_release_date, international_release_date,
    announcement_date, release_date, open_critic_id, critic_score, has_any_reviews, notes,
    tags, first_critic_score_timestamp, delay_contention, eligibility_changed, added_timestamp";

const REQUEST_COLUMNS: &str = "id, user_id, request_timestamp, request_note, game_name,
    estimated_release_date, open_critic_id, answered, response_timestamp, response_note,
    master_game_id, hidden";

/// Read a JSON text column.
pub(crate) fn json_column<T: serde::de::DeserializeOwned>(
    row: &Row,
    index: usize,
) -> rusqlite::Result<T> {
    let text: String = row.get(index)?;
    serde_json::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(e)))
}

fn row_to_tag(row: &Row) -> rusqlite::Result<MasterGameTag> {
    let tag_type: String = row.get(3)?;
    Ok(MasterGameTag {
        name: row.get(0)?,
        readable_name: row.get(1)?,
        short_name: row.get(2)?,
        tag_type: if tag_type == "Base" {
            TagType::Base
        } else {
            TagType::Other
        },
        has_custom_code: row.get(4)?,
        description: row.get(5)?,
        examples: json_column(row, 6)?,
        badge_color: row.get(7)?,
    })
}

fn row_to_master_game(
    row: &Row,
    tags: &HashMap<String, MasterGameTag>,
) -> rusqlite::Result<MasterGame> {
    let tag_names: Vec<String> = json_column(row, 13)?;
    Ok(MasterGame {
        id: row.get(0)?,
        name: row.get(1)?,
        estimated_release_date: row.get(2)?,
        minimum_release_date: row.get(3)?,
        maximum_release_date: row.get(4)?,
        early_access_release_date: row.get(5)?,
        international_release_date: row.get(6)?,
        announcement_date: row.get(7)?,
        release_date: row.get(8)?,
        open_critic_id: row.get(9)?,
        critic_score: row.get(10)?,
        has_any_reviews: row.get(11)?,
        notes: row.get(12)?,
        tags: tag_names
            .iter()
            .map(|name| {
                tags.get(name)
                    .cloned()
                    .unwrap_or_else(|| MasterGameTag::named(name, name, TagType::Other))
            })
            .collect(),
        first_critic_score_timestamp: row.get(14)?,
        delay_contention: row.get(15)?,
        eligibility_changed: row.get(16)?,
        added_timestamp: row.get(17)?,
    })
}

/// Per-year statistics columns of `master_game_years`.
#[derive(Debug, Clone, Copy)]
struct YearStats {
    percent_standard_game: f64,
    percent_counter_pick: f64,
    eligible_percent_standard_game: f64,
    average_draft_position: Option<f64>,
    hype_factor: f64,
    date_adjusted_hype_factor: f64,
}

impl YearStats {
    /// Columns 1..=6 after the master game id.
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            percent_standard_game: row.get(1)?,
            percent_counter_pick: row.get(2)?,
            eligible_percent_standard_game: row.get(3)?,
            average_draft_position: row.get(4)?,
            hype_factor: row.get(5)?,
            date_adjusted_hype_factor: row.get(6)?,
        })
    }

    fn apply(&self, game_year: &mut MasterGameYear) {
        game_year.percent_standard_game = self.percent_standard_game;
        game_year.percent_counter_pick = self.percent_counter_pick;
        game_year.eligible_percent_standard_game = self.eligible_percent_standard_game;
        game_year.average_draft_position = self.average_draft_position;
        game_year.hype_factor = self.hype_factor;
        game_year.date_adjusted_hype_factor = self.date_adjusted_hype_factor;
    }
}

fn row_to_change(row: &Row) -> rusqlite::Result<MasterGameChangeLogEntry> {
    let id: String = row.get(0)?;
    Ok(MasterGameChangeLogEntry {
        id: Uuid::parse_str(&id)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?,
        master_game_id: row.get(1)?,
        changed_by: row.get(2)?,
        timestamp: row.get(3)?,
        description: row.get(4)?,
    })
}

fn row_to_request(row: &Row) -> rusqlite::Result<MasterGameRequest> {
    Ok(MasterGameRequest {
        id: row.get(0)?,
        user: row.get(1)?,
        request_timestamp: row.get(2)?,
        request_note: row.get(3)?,
        game_name: row.get(4)?,
        estimated_release_date: row.get(5)?,
        open_critic_id: row.get(6)?,
        answered: row.get(7)?,
        response_timestamp: row.get(8)?,
        response_note: row.get(9)?,
        master_game_id: row.get(10)?,
        hidden: row.get(11)?,
    })
}

impl FantasyCriticDatabase {
    fn tag_map(&self) -> Result<HashMap<String, MasterGameTag>> {
        Ok(self
            .get_master_game_tags()?
            .into_iter()
            .map(|t| (t.name.clone(), t))
            .collect())
    }

    fn known_years(&self) -> Result<Vec<Year>> {
        let mut stmt = self.conn.prepare(
            "SELECT year FROM supported_years
             UNION SELECT DISTINCT year FROM master_game_years
             UNION SELECT DISTINCT year FROM league_years
             UNION SELECT DISTINCT year FROM royale_quarters",
        )?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<Year>>>()?)
    }

    fn year_stats(&self, year: Year) -> Result<HashMap<MasterGameId, YearStats>> {
        let mut stmt = self.conn.prepare(
            "SELECT master_game_id, percent_standard_game, percent_counter_pick,
                    eligible_percent_standard_game, average_draft_position, hype_factor,
                    date_adjusted_hype_factor
             FROM master_game_years WHERE year = ?",
        )?;
        let rows =
            stmt.query_map(params![year], |row| Ok((row.get(0)?, YearStats::from_row(row)?)))?;
        Ok(rows.collect::<rusqlite::Result<HashMap<_, _>>>()?)
    }
}

impl MasterGameRepo for FantasyCriticDatabase {
    fn get_master_game_tags(&self) -> Result<Vec<MasterGameTag>> {
        let mut stmt = self.conn.prepare(
            "SELECT name, readable_name, short_name, tag_type, has_custom_code, description,
                    examples, badge_color
             FROM master_game_tags ORDER BY name",
        )?;
        let rows = stmt.query_map([], row_to_tag)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn save_master_game_tag(&mut self, tag: &MasterGameTag) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO master_game_tags
             (name, readable_name, short_name, tag_type, has_custom_code, description,
              examples, badge_color)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                tag.name,
                tag.readable_name,
                tag.short_name,
                format!("{:?}", tag.tag_type),
                tag.has_custom_code,
                tag.description,
                serde_json::to_string(&tag.examples)?,
                tag.badge_color
            ],
        )?;
        Ok(())
    }

    fn save_master_game(&mut self, game: &MasterGame) -> Result<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO master_games ({})
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    estimated_release_date = excluded.estimated_release_date,
                    minimum_release_date = excluded.minimum_release_date,
                    maximum_release_date = excluded.maximum_release_date,
                    early_access_release_date = excluded.early_access_release_date,
                    international_release_date = excluded.international_release_date,
                    announcement_date = excluded.announcement_date,
                    release_date = excluded.release_date,
                    open_critic_id = excluded.open_critic_id,
                    critic_score = excluded.critic_score,
                    has_any_reviews = excluded.has_any_reviews,
                    notes = excluded.notes,
                    tags = excluded.tags,
                    first_critic_score_timestamp = excluded.first_critic_score_timestamp,
                    delay_contention = excluded.delay_contention,
                    eligibility_changed = excluded.eligibility_changed",
                MASTER_GAME_COLUMNS
            ),
            params![
                game.id,
                game.name,
                game.estimated_release_date,
                game.minimum_release_date,
                game.maximum_release_date,
                game.early_access_release_date,
                game.international_release_date,
                game.announcement_date,
                game.release_date,
                game.open_critic_id,
                game.critic_score,
                game.has_any_reviews,
                game.notes,
                serde_json::to_string(&game.tag_names())?,
                game.first_critic_score_timestamp,
                game.delay_contention,
                game.eligibility_changed,
                game.added_timestamp
            ],
        )?;
        let mut years = self.known_years()?;
        let first = game.minimum_release_date.year();
        let last = game
            .release_date
            .or(game.maximum_release_date)
            .map_or(first + 1, |d| d.year());
        years.extend((first..=last.max(first)).filter_map(|y| u16::try_from(y).ok().map(Year)));
        self.cache.invalidate_game(game.id, &years);
        tracing::debug!(master_game = %game.name, "Saved master game");
        Ok(())
    }

    fn get_master_game(&self, id: MasterGameId) -> Result<Option<MasterGame>> {
        let cache_key = MasterGameCacheKey(id);
        if let Some(game) = self.cache.games.get(&cache_key) {
            return Ok(Some(game));
        }

        let tags = self.tag_map()?;
        let game = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM master_games WHERE id = ?",
                    MASTER_GAME_COLUMNS
                ),
                params![id],
                |row| row_to_master_game(row, &tags),
            )
            .optional()?;

        if let Some(game) = &game {
            self.cache.games.put(cache_key, game.clone());
        }
        Ok(game)
    }

    fn get_master_games(&self) -> Result<Vec<MasterGame>> {
        let tags = self.tag_map()?;
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM master_games ORDER BY name",
            MASTER_GAME_COLUMNS
        ))?;
        let rows = stmt.query_map([], |row| row_to_master_game(row, &tags))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn get_master_game_year(&self, id: MasterGameId, year: Year) -> Result<Option<MasterGameYear>> {
        let cache_key = MasterGameYearsCacheKey { year };
        if let Some(years) = self.cache.years.get(&cache_key) {
            if let Some(found) = years.into_iter().find(|g| g.id() == id) {
                return Ok(Some(found));
            }
        }

        let Some(game) = self.get_master_game(id)? else {
            return Ok(None);
        };
        let mut game_year = MasterGameYear::new(game, year);
        let stats = self
            .conn
            .query_row(
                "SELECT master_game_id, percent_standard_game, percent_counter_pick,
                        eligible_percent_standard_game, average_draft_position, hype_factor,
                        date_adjusted_hype_factor
                 FROM master_game_years WHERE master_game_id = ? AND year = ?",
                params![id, year],
                YearStats::from_row,
            )
            .optional()?;
        if let Some(stats) = stats {
            stats.apply(&mut game_year);
        }
        Ok(Some(game_year))
    }

    fn get_master_game_years(&self, year: Year) -> Result<Vec<MasterGameYear>> {
        let cache_key = MasterGameYearsCacheKey { year };
        if let Some(years) = self.cache.years.get(&cache_key) {
            return Ok(years);
        }

        let stats = self.year_stats(year)?;
        let game_years: Vec<MasterGameYear> = self
            .get_master_games()?
            .into_iter()
            .filter(|g| g.could_release_in_year(year))
            .map(|g| {
                let game_stats = stats.get(&g.id).copied();
                let mut game_year = MasterGameYear::new(g, year);
                if let Some(game_stats) = game_stats {
                    game_stats.apply(&mut game_year);
                }
                game_year
            })
            .collect();

        self.cache.years.put(cache_key, game_years.clone());
        Ok(game_years)
    }

    fn save_master_game_year_stats(&mut self, year: Year, stats: &[MasterGameYear]) -> Result<()> {
        let tx = self.conn.transaction()?;
        for game_year in stats {
            tx.execute(
                "INSERT OR REPLACE INTO master_game_years
                 (master_game_id, year, percent_standard_game, percent_counter_pick,
                  eligible_percent_standard_game, average_draft_position, hype_factor,
                  date_adjusted_hype_factor)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    game_year.id(),
                    year,
                    game_year.percent_standard_game,
                    game_year.percent_counter_pick,
                    game_year.eligible_percent_standard_game,
                    game_year.average_draft_position,
                    game_year.hype_factor,
                    game_year.date_adjusted_hype_factor
                ],
            )?;
        }
        tx.commit()?;
        self.cache.invalidate_year(year);
        Ok(())
    }

    fn add_change_log_entries(&mut self, entries: &[MasterGameChangeLogEntry]) -> Result<()> {
        let tx = self.conn.transaction()?;
        for entry in entries {
            tx.execute(
                "INSERT INTO master_game_change_log
                 (id, master_game_id, changed_by, timestamp, description)
                 VALUES (?, ?, ?, ?, ?)",
                params![
                    entry.id.to_string(),
                    entry.master_game_id,
                    entry.changed_by,
                    entry.timestamp,
                    entry.description
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn get_change_log(&self, id: MasterGameId) -> Result<Vec<MasterGameChangeLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, master_game_id, changed_by, timestamp, description
             FROM master_game_change_log
             WHERE master_game_id = ?
             ORDER BY timestamp",
        )?;
        let rows = stmt.query_map(params![id], row_to_change)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn get_recent_changes(&self, limit: usize) -> Result<Vec<MasterGameChangeLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, master_game_id, changed_by, timestamp, description
             FROM master_game_change_log
             ORDER BY timestamp DESC
             LIMIT ?",
        )?;
        let rows = stmt.query_map(params![limit as i64], row_to_change)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn save_master_game_request(&mut self, request: &MasterGameRequest) -> Result<()> {
        self.conn.execute(
            &format!(
                "INSERT OR REPLACE INTO master_game_requests ({})
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                REQUEST_COLUMNS
            ),
            params![
                request.id,
                request.user,
                request.request_timestamp,
                request.request_note,
                request.game_name,
                request.estimated_release_date,
                request.open_critic_id,
                request.answered,
                request.response_timestamp,
                request.response_note,
                request.master_game_id,
                request.hidden
            ],
        )?;
        Ok(())
    }

    fn get_master_game_request(&self, id: RequestId) -> Result<Option<MasterGameRequest>> {
        Ok(self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM master_game_requests WHERE id = ?",
                    REQUEST_COLUMNS
                ),
                params![id],
                row_to_request,
            )
            .optional()?)
    }

    fn get_master_game_requests(&self) -> Result<Vec<MasterGameRequest>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM master_game_requests ORDER BY request_timestamp",
            REQUEST_COLUMNS
        ))?;
        let rows = stmt.query_map([], row_to_request)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn delete_master_game_request(&mut self, id: RequestId) -> Result<()> {
        self.conn
            .execute("DELETE FROM master_game_requests WHERE id = ?", params![id])?;
        Ok(())
    }
}
