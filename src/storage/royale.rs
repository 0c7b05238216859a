//! Royale quarter and publisher queries

use super::{schema::FantasyCriticDatabase, MasterGameRepo, RoyaleRepo};
use crate::cli::types::ids::{MasterGameId, PublisherId, UserId};
use crate::cli::types::time::{Year, YearQuarter};
use crate::domain::{RoyalePublisher, RoyalePublisherGame, RoyaleYearQuarter};
use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};
use rust_decimal::Decimal;
use std::str::FromStr;

const ROYALE_PUBLISHER_COLUMNS: &str = "id, year, quarter, user_id, name, icon, slogan, budget";

/// Money is stored as decimal text so no precision is lost.
fn decimal_column(row: &Row, index: usize) -> rusqlite::Result<Decimal> {
    let text: String = row.get(index)?;
    Decimal::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(e)))
}

fn row_to_quarter(row: &Row) -> rusqlite::Result<RoyaleYearQuarter> {
    let year: Year = row.get(0)?;
    let quarter: u8 = row.get(1)?;
    Ok(RoyaleYearQuarter {
        year_quarter: YearQuarter { year, quarter },
        open_for_play: row.get(2)?,
        finished: row.get(3)?,
        has_release_date_limit: row.get(4)?,
        winning_user: row.get(5)?,
    })
}

fn row_to_publisher(row: &Row) -> rusqlite::Result<RoyalePublisher> {
    Ok(RoyalePublisher {
        id: row.get(0)?,
        year_quarter: YearQuarter {
            year: row.get(1)?,
            quarter: row.get(2)?,
        },
        user: row.get(3)?,
        name: row.get(4)?,
        icon: row.get(5)?,
        slogan: row.get(6)?,
        games: Vec::new(),
        budget: decimal_column(row, 7)?,
    })
}

/// A `royale_publisher_games` row without its master game.
struct GameRow {
    master_game_id: MasterGameId,
    timestamp: DateTime<Utc>,
    amount_spent: Decimal,
    advertising_money: Decimal,
    fantasy_points: Option<f64>,
}

impl FantasyCriticDatabase {
    fn attach_royale_games(&self, mut publisher: RoyalePublisher) -> Result<RoyalePublisher> {
        let mut stmt = self.conn.prepare(
            "SELECT master_game_id, timestamp, amount_spent, advertising_money, fantasy_points
             FROM royale_publisher_games WHERE publisher_id = ? ORDER BY timestamp",
        )?;
        let rows = stmt
            .query_map(params![publisher.id], |row| {
                Ok(GameRow {
                    master_game_id: row.get(0)?,
                    timestamp: row.get(1)?,
                    amount_spent: decimal_column(row, 2)?,
                    advertising_money: decimal_column(row, 3)?,
                    fantasy_points: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let year = publisher.year_quarter.year;
        for row in rows {
            let master_game = self
                .get_master_game_year(row.master_game_id, year)?
                .ok_or_else(|| anyhow!("Master game {} not found", row.master_game_id))?;
            publisher.games.push(RoyalePublisherGame {
                publisher_id: publisher.id,
                year_quarter: publisher.year_quarter,
                master_game,
                timestamp: row.timestamp,
                amount_spent: row.amount_spent,
                advertising_money: row.advertising_money,
                fantasy_points: row.fantasy_points,
            });
        }
        Ok(publisher)
    }
}

impl RoyaleRepo for FantasyCriticDatabase {
    fn get_royale_quarters(&self) -> Result<Vec<RoyaleYearQuarter>> {
        let mut stmt = self.conn.prepare(
            "SELECT year, quarter, open_for_play, finished, has_release_date_limit, winning_user
             FROM royale_quarters ORDER BY year, quarter",
        )?;
        let rows = stmt.query_map([], row_to_quarter)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn save_royale_quarter(&mut self, quarter: &RoyaleYearQuarter) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO royale_quarters
             (year, quarter, open_for_play, finished, has_release_date_limit, winning_user)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                quarter.year_quarter.year,
                quarter.year_quarter.quarter,
                quarter.open_for_play,
                quarter.finished,
                quarter.has_release_date_limit,
                quarter.winning_user
            ],
        )?;
        Ok(())
    }

    fn save_royale_publisher(&mut self, publisher: &RoyalePublisher) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            &format!(
                "INSERT INTO royale_publishers ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    icon = excluded.icon,
                    slogan = excluded.slogan,
                    budget = excluded.budget",
                ROYALE_PUBLISHER_COLUMNS
            ),
            params![
                publisher.id,
                publisher.year_quarter.year,
                publisher.year_quarter.quarter,
                publisher.user,
                publisher.name,
                publisher.icon,
                publisher.slogan,
                publisher.budget.to_string()
            ],
        )?;
        tx.execute(
            "DELETE FROM royale_publisher_games WHERE publisher_id = ?",
            params![publisher.id],
        )?;
        for game in &publisher.games {
            tx.execute(
                "INSERT INTO royale_publisher_games
                 (publisher_id, master_game_id, timestamp, amount_spent, advertising_money,
                  fantasy_points)
                 VALUES (?, ?, ?, ?, ?, ?)",
                params![
                    publisher.id,
                    game.master_game_id(),
                    game.timestamp,
                    game.amount_spent.to_string(),
                    game.advertising_money.to_string(),
                    game.fantasy_points
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn get_royale_publisher(&self, id: PublisherId) -> Result<Option<RoyalePublisher>> {
        let publisher = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM royale_publishers WHERE id = ?",
                    ROYALE_PUBLISHER_COLUMNS
                ),
                params![id],
                row_to_publisher,
            )
            .optional()?;
        publisher.map(|p| self.attach_royale_games(p)).transpose()
    }

    fn get_royale_publisher_for_user(
        &self,
        quarter: YearQuarter,
        user: UserId,
    ) -> Result<Option<RoyalePublisher>> {
        let publisher = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM royale_publishers \
                     WHERE year = ? AND quarter = ? AND user_id = ?",
                    ROYALE_PUBLISHER_COLUMNS
                ),
                params![quarter.year, quarter.quarter, user],
                row_to_publisher,
            )
            .optional()?;
        publisher.map(|p| self.attach_royale_games(p)).transpose()
    }

    fn get_royale_publishers(&self, quarter: YearQuarter) -> Result<Vec<RoyalePublisher>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM royale_publishers WHERE year = ? AND quarter = ? ORDER BY name",
            ROYALE_PUBLISHER_COLUMNS
        ))?;
        let publishers = stmt
            .query_map(params![quarter.year, quarter.quarter], row_to_publisher)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        publishers
            .into_iter()
            .map(|p| self.attach_royale_games(p))
            .collect()
    }

    fn save_royale_fantasy_points(&mut self, publishers: &[RoyalePublisher]) -> Result<()> {
        let tx = self.conn.transaction()?;
        for publisher in publishers {
            for game in &publisher.games {
                tx.execute(
                    "UPDATE royale_publisher_games SET fantasy_points = ?
                     WHERE publisher_id = ? AND master_game_id = ?",
                    params![game.fantasy_points, publisher.id, game.master_game_id()],
                )?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}
