//! League, publisher and processing queries

use super::master_games::json_column;
use super::{schema::FantasyCriticDatabase, FantasyCriticRepo, LeagueChanges, MasterGameRepo};
use crate::cli::types::ids::{
    AuctionId, BidId, DropId, LeagueId, MasterGameId, MessageId, ProcessSetId, PublisherGameId,
    PublisherId, TradeId, UserId,
};
use crate::cli::types::time::{LeagueYearKey, Year};
use crate::domain::{
    ActionProcessingResults, ActionProcessingSetMetadata, DropRequest, EligibilityOverride,
    FantasyCriticUser, FormerPublisherGame, League, LeagueAction, LeagueActionType, LeagueYear,
    ManagerMessage, MasterGameYear, PickupBid, PlayStatus, Publisher, PublisherGame, QueuedGame,
    SiteCounts, SpecialAuction, SupportedYear, SystemWideSettings, SystemWideValues, TagOverride,
    Trade, TradeStatus,
};
use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;

const PUBLISHER_COLUMNS: &str = "id, league_id, year, user_id, name, icon, draft_position, budget,
    free_games_dropped, will_not_release_games_dropped, will_release_games_dropped, auto_draft";

const PUBLISHER_GAME_COLUMNS: &str = "id, publisher_id, game_name, timestamp, counter_pick,
    manual_critic_score, manual_will_not_release, fantasy_points, master_game_id, slot_number,
    draft_position, overall_draft_position, bid_amount, acquired_in_trade_id, removed_timestamp,
    removed_note";

const BID_COLUMNS: &str = "id, publisher_id, league_id, year, master_game_id, conditional_drop,
    counter_pick, bid_amount, priority, timestamp, allow_ineligible_slot, successful, outcome";

const TRADE_COLUMNS: &str = "id, league_id, year, proposer, counter_party, proposer_games,
    counter_party_games, proposer_budget_send, counter_party_budget_send, message,
    proposed_timestamp, accepted_timestamp, completed_timestamp, status";

type MasterGameLookup = HashMap<MasterGameId, MasterGameYear>;

/// A `league_years` row before its publishers are attached.
struct LeagueYearRow {
    year: Year,
    options: String,
    play_status: String,
    draft_started_timestamp: Option<DateTime<Utc>>,
}

/// A `publisher_games` row; the master game is resolved afterwards.
struct PublisherGameRow {
    game: PublisherGame,
    master_game_id: Option<MasterGameId>,
    removed_timestamp: Option<DateTime<Utc>>,
    removed_note: Option<String>,
}

fn row_to_league(row: &Row) -> rusqlite::Result<League> {
    Ok(League {
        id: row.get(0)?,
        name: row.get(1)?,
        manager: row.get(2)?,
        public_league: row.get(3)?,
        test_league: row.get(4)?,
        archived: row.get(5)?,
        years: Vec::new(),
    })
}

fn row_to_publisher(row: &Row) -> rusqlite::Result<Publisher> {
    Ok(Publisher {
        id: row.get(0)?,
        league_year_key: LeagueYearKey::new(row.get(1)?, row.get(2)?),
        user: row.get(3)?,
        name: row.get(4)?,
        icon: row.get(5)?,
        draft_position: row.get(6)?,
        games: Vec::new(),
        former_games: Vec::new(),
        budget: row.get(7)?,
        free_games_dropped: row.get(8)?,
        will_not_release_games_dropped: row.get(9)?,
        will_release_games_dropped: row.get(10)?,
        auto_draft: row.get(11)?,
    })
}

fn row_to_publisher_game(row: &Row) -> rusqlite::Result<PublisherGameRow> {
    let slot_number: i64 = row.get(9)?;
    Ok(PublisherGameRow {
        game: PublisherGame {
            id: row.get(0)?,
            publisher_id: row.get(1)?,
            game_name: row.get(2)?,
            timestamp: row.get(3)?,
            counter_pick: row.get(4)?,
            manual_critic_score: row.get(5)?,
            manual_will_not_release: row.get(6)?,
            fantasy_points: row.get(7)?,
            master_game: None,
            slot_number: slot_number as usize,
            draft_position: row.get(10)?,
            overall_draft_position: row.get(11)?,
            bid_amount: row.get(12)?,
            acquired_in_trade_id: row.get(13)?,
        },
        master_game_id: row.get(8)?,
        removed_timestamp: row.get(14)?,
        removed_note: row.get(15)?,
    })
}

fn row_to_action(row: &Row) -> rusqlite::Result<LeagueAction> {
    let action_type: String = row.get(4)?;
    let action_type = LeagueActionType::parse(&action_type).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            Type::Text,
            format!("unknown league action type: {}", action_type).into(),
        )
    })?;
    Ok(LeagueAction {
        publisher_id: row.get(0)?,
        league_year_key: LeagueYearKey::new(row.get(1)?, row.get(2)?),
        timestamp: row.get(3)?,
        action_type,
        description: row.get(5)?,
        manager_action: row.get(6)?,
    })
}

fn row_to_trade(row: &Row) -> rusqlite::Result<Trade> {
    let status: String = row.get(13)?;
    let status: TradeStatus = status
        .parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(13, Type::Text, Box::new(e)))?;
    Ok(Trade {
        id: row.get(0)?,
        league_year_key: LeagueYearKey::new(row.get(1)?, row.get(2)?),
        proposer: row.get(3)?,
        counter_party: row.get(4)?,
        proposer_games: json_column(row, 5)?,
        counter_party_games: json_column(row, 6)?,
        proposer_budget_send: row.get(7)?,
        counter_party_budget_send: row.get(8)?,
        message: row.get(9)?,
        proposed_timestamp: row.get(10)?,
        accepted_timestamp: row.get(11)?,
        completed_timestamp: row.get(12)?,
        status,
    })
}

fn row_to_message(row: &Row) -> rusqlite::Result<ManagerMessage> {
    Ok(ManagerMessage {
        id: row.get(0)?,
        league_year_key: LeagueYearKey::new(row.get(1)?, row.get(2)?),
        text: row.get(3)?,
        is_public: row.get(4)?,
        timestamp: row.get(5)?,
        deleted: row.get(6)?,
    })
}

fn row_to_supported_year(row: &Row) -> rusqlite::Result<SupportedYear> {
    Ok(SupportedYear {
        year: row.get(0)?,
        open_for_creation: row.get(1)?,
        open_for_play: row.get(2)?,
        open_for_beta_users: row.get(3)?,
        finished: row.get(4)?,
    })
}

fn write_league_year(conn: &Connection, league_year: &LeagueYear) -> Result<()> {
    let league_id = league_year.league.id;
    let year = league_year.year;
    conn.execute(
        "INSERT INTO league_years (league_id, year, options, play_status, draft_started_timestamp)
         VALUES (?, ?, ?, ?, ?)
         ON CONFLICT(league_id, year) DO UPDATE SET
            options = excluded.options,
            play_status = excluded.play_status,
            draft_started_timestamp = excluded.draft_started_timestamp",
        params![
            league_id,
            year,
            serde_json::to_string(&league_year.options)?,
            league_year.play_status.as_str(),
            league_year.draft_started_timestamp
        ],
    )?;

    conn.execute(
        "DELETE FROM eligibility_overrides WHERE league_id = ? AND year = ?",
        params![league_id, year],
    )?;
    for o in &league_year.eligibility_overrides {
        conn.execute(
            "INSERT INTO eligibility_overrides (league_id, year, master_game_id, eligible)
             VALUES (?, ?, ?, ?)",
            params![league_id, year, o.master_game_id, o.eligible],
        )?;
    }

    conn.execute(
        "DELETE FROM tag_overrides WHERE league_id = ? AND year = ?",
        params![league_id, year],
    )?;
    for o in &league_year.tag_overrides {
        conn.execute(
            "INSERT INTO tag_overrides (league_id, year, master_game_id, tags) VALUES (?, ?, ?, ?)",
            params![league_id, year, o.master_game_id, serde_json::to_string(&o.tags)?],
        )?;
    }
    Ok(())
}

fn write_publisher_game(
    conn: &Connection,
    game: &PublisherGame,
    removed: Option<(&DateTime<Utc>, &str)>,
) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO publisher_games ({}) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            PUBLISHER_GAME_COLUMNS
        ),
        params![
            game.id,
            game.publisher_id,
            game.game_name,
            game.timestamp,
            game.counter_pick,
            game.manual_critic_score,
            game.manual_will_not_release,
            game.fantasy_points,
            game.master_game_id(),
            game.slot_number as i64,
            game.draft_position,
            game.overall_draft_position,
            game.bid_amount,
            game.acquired_in_trade_id,
            removed.map(|(timestamp, _)| *timestamp),
            removed.map(|(_, note)| note)
        ],
    )?;
    Ok(())
}

/// Upsert the publisher row and replace all of its games.
fn write_publisher(conn: &Connection, publisher: &Publisher) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO publishers ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                icon = excluded.icon,
                draft_position = excluded.draft_position,
                budget = excluded.budget,
                free_games_dropped = excluded.free_games_dropped,
                will_not_release_games_dropped = excluded.will_not_release_games_dropped,
                will_release_games_dropped = excluded.will_release_games_dropped,
                auto_draft = excluded.auto_draft",
            PUBLISHER_COLUMNS
        ),
        params![
            publisher.id,
            publisher.league_year_key.league_id,
            publisher.league_year_key.year,
            publisher.user,
            publisher.name,
            publisher.icon,
            publisher.draft_position,
            publisher.budget,
            publisher.free_games_dropped,
            publisher.will_not_release_games_dropped,
            publisher.will_release_games_dropped,
            publisher.auto_draft
        ],
    )?;

    conn.execute(
        "DELETE FROM publisher_games WHERE publisher_id = ?",
        params![publisher.id],
    )?;
    for game in &publisher.games {
        write_publisher_game(conn, game, None)?;
    }
    for former in &publisher.former_games {
        write_publisher_game(
            conn,
            &former.game,
            Some((&former.removed_timestamp, former.removed_note.as_str())),
        )?;
    }
    Ok(())
}

fn insert_action(
    conn: &Connection,
    action: &LeagueAction,
    process_set_id: Option<ProcessSetId>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO league_actions
         (publisher_id, league_id, year, timestamp, action_type, description, manager_action,
          process_set_id)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            action.publisher_id,
            action.league_year_key.league_id,
            action.league_year_key.year,
            action.timestamp,
            action.action_type.as_str(),
            action.description,
            action.manager_action,
            process_set_id
        ],
    )?;
    Ok(())
}

fn write_bid(
    conn: &Connection,
    bid: &PickupBid,
    process_set_id: Option<ProcessSetId>,
) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT OR REPLACE INTO pickup_bids ({}, process_set_id)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            BID_COLUMNS
        ),
        params![
            bid.id,
            bid.publisher_id,
            bid.league_year_key.league_id,
            bid.league_year_key.year,
            bid.master_game_id(),
            bid.conditional_drop,
            bid.counter_pick,
            bid.bid_amount,
            bid.priority,
            bid.timestamp,
            bid.allow_ineligible_slot,
            bid.successful,
            bid.outcome,
            process_set_id
        ],
    )?;
    Ok(())
}

fn write_drop(
    conn: &Connection,
    drop: &DropRequest,
    process_set_id: Option<ProcessSetId>,
) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO drop_requests
         (id, publisher_id, league_id, year, master_game_id, timestamp, successful, process_set_id)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            drop.id,
            drop.publisher_id,
            drop.league_year_key.league_id,
            drop.league_year_key.year,
            drop.master_game.id(),
            drop.timestamp,
            drop.successful,
            process_set_id
        ],
    )?;
    Ok(())
}

fn write_trade(conn: &Connection, trade: &Trade) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT OR REPLACE INTO trades ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            TRADE_COLUMNS
        ),
        params![
            trade.id,
            trade.league_year_key.league_id,
            trade.league_year_key.year,
            trade.proposer,
            trade.counter_party,
            serde_json::to_string(&trade.proposer_games)?,
            serde_json::to_string(&trade.counter_party_games)?,
            trade.proposer_budget_send,
            trade.counter_party_budget_send,
            trade.message,
            trade.proposed_timestamp,
            trade.accepted_timestamp,
            trade.completed_timestamp,
            trade.status.as_str()
        ],
    )?;
    Ok(())
}

impl FantasyCriticDatabase {
    fn master_game_lookup(&self, year: Year) -> Result<MasterGameLookup> {
        Ok(self
            .get_master_game_years(year)?
            .into_iter()
            .map(|g| (g.id(), g))
            .collect())
    }

    /// Games outside the season's release window are looked up one by one.
    fn resolve_master_game(
        &self,
        lookup: &MasterGameLookup,
        id: MasterGameId,
        year: Year,
    ) -> Result<MasterGameYear> {
        if let Some(game) = lookup.get(&id) {
            return Ok(game.clone());
        }
        self.get_master_game_year(id, year)?
            .ok_or_else(|| anyhow!("Master game {} not found", id))
    }

    fn league_years_of(&self, league_id: LeagueId) -> Result<Vec<Year>> {
        let mut stmt = self
            .conn
            .prepare("SELECT year FROM league_years WHERE league_id = ? ORDER BY year")?;
        let rows = stmt.query_map(params![league_id], |row| row.get(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<Year>>>()?)
    }

    fn load_publishers(
        &self,
        key: LeagueYearKey,
        lookup: &MasterGameLookup,
    ) -> Result<Vec<Publisher>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM publishers WHERE league_id = ? AND year = ? ORDER BY draft_position",
            PUBLISHER_COLUMNS
        ))?;
        let publishers = stmt
            .query_map(params![key.league_id, key.year], row_to_publisher)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        publishers
            .into_iter()
            .map(|p| self.attach_games(p, lookup))
            .collect()
    }

    fn attach_games(
        &self,
        mut publisher: Publisher,
        lookup: &MasterGameLookup,
    ) -> Result<Publisher> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM publisher_games WHERE publisher_id = ? ORDER BY timestamp, id",
            PUBLISHER_GAME_COLUMNS
        ))?;
        let rows = stmt
            .query_map(params![publisher.id], row_to_publisher_game)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let year = publisher.year();
        for row in rows {
            let mut game = row.game;
            if let Some(id) = row.master_game_id {
                game.master_game = Some(self.resolve_master_game(lookup, id, year)?);
            }
            match row.removed_timestamp {
                None => publisher.games.push(game),
                Some(removed_timestamp) => publisher.former_games.push(FormerPublisherGame {
                    game,
                    removed_timestamp,
                    removed_note: row.removed_note.unwrap_or_default(),
                }),
            }
        }
        Ok(publisher)
    }

    fn load_league_year(&self, league: League, row: LeagueYearRow) -> Result<LeagueYear> {
        let key = LeagueYearKey::new(league.id, row.year);

        let mut stmt = self.conn.prepare(
            "SELECT master_game_id, eligible FROM eligibility_overrides
             WHERE league_id = ? AND year = ?",
        )?;
        let eligibility_overrides = stmt
            .query_map(params![key.league_id, key.year], |row| {
                Ok(EligibilityOverride {
                    master_game_id: row.get(0)?,
                    eligible: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = self.conn.prepare(
            "SELECT master_game_id, tags FROM tag_overrides WHERE league_id = ? AND year = ?",
        )?;
        let tag_overrides = stmt
            .query_map(params![key.league_id, key.year], |row| {
                Ok(TagOverride {
                    master_game_id: row.get(0)?,
                    tags: json_column(row, 1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let lookup = self.master_game_lookup(row.year)?;
        let publishers = self.load_publishers(key, &lookup)?;
        let play_status: PlayStatus = row.play_status.parse()?;

        Ok(LeagueYear {
            league,
            year: row.year,
            options: serde_json::from_str(&row.options)?,
            play_status,
            eligibility_overrides,
            tag_overrides,
            draft_started_timestamp: row.draft_started_timestamp,
            publishers,
        })
    }

    fn load_bids(&self, sql: &str, key: LeagueYearKey) -> Result<Vec<PickupBid>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map(params![key.league_id, key.year], |row| {
                let master_game_id: MasterGameId = row.get(4)?;
                Ok((master_game_id, row_to_bid_parts(row)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let lookup = self.master_game_lookup(key.year)?;
        rows.into_iter()
            .map(|(id, parts)| {
                let master_game = self.resolve_master_game(&lookup, id, key.year)?;
                Ok(parts.into_bid(master_game))
            })
            .collect()
    }
}

/// Every bid column except the master game.
struct BidParts {
    id: BidId,
    publisher_id: PublisherId,
    league_year_key: LeagueYearKey,
    conditional_drop: Option<PublisherGameId>,
    counter_pick: bool,
    bid_amount: u32,
    priority: u32,
    timestamp: DateTime<Utc>,
    allow_ineligible_slot: bool,
    successful: Option<bool>,
    outcome: Option<String>,
}

impl BidParts {
    fn into_bid(self, master_game: MasterGameYear) -> PickupBid {
        PickupBid {
            id: self.id,
            publisher_id: self.publisher_id,
            league_year_key: self.league_year_key,
            master_game,
            conditional_drop: self.conditional_drop,
            counter_pick: self.counter_pick,
            bid_amount: self.bid_amount,
            priority: self.priority,
            timestamp: self.timestamp,
            allow_ineligible_slot: self.allow_ineligible_slot,
            successful: self.successful,
            outcome: self.outcome,
        }
    }
}

fn row_to_bid_parts(row: &Row) -> rusqlite::Result<BidParts> {
    Ok(BidParts {
        id: row.get(0)?,
        publisher_id: row.get(1)?,
        league_year_key: LeagueYearKey::new(row.get(2)?, row.get(3)?),
        conditional_drop: row.get(5)?,
        counter_pick: row.get(6)?,
        bid_amount: row.get(7)?,
        priority: row.get(8)?,
        timestamp: row.get(9)?,
        allow_ineligible_slot: row.get(10)?,
        successful: row.get(11)?,
        outcome: row.get(12)?,
    })
}

impl FantasyCriticRepo for FantasyCriticDatabase {
    fn save_user(&mut self, user: &FantasyCriticUser) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO users (id, display_name) VALUES (?, ?)",
            params![user.id, user.display_name],
        )?;
        Ok(())
    }

    fn get_user(&self, id: UserId) -> Result<Option<FantasyCriticUser>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, display_name FROM users WHERE id = ?",
                params![id],
                |row| {
                    Ok(FantasyCriticUser {
                        id: row.get(0)?,
                        display_name: row.get(1)?,
                    })
                },
            )
            .optional()?)
    }

    fn get_system_wide_settings(&self) -> Result<SystemWideSettings> {
        let action_processing_mode = self.conn.query_row(
            "SELECT action_processing_mode FROM system_settings WHERE id = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(SystemWideSettings {
            action_processing_mode,
        })
    }

    fn set_action_processing_mode(&mut self, enabled: bool) -> Result<()> {
        self.conn.execute(
            "UPDATE system_settings SET action_processing_mode = ? WHERE id = 1",
            params![enabled],
        )?;
        Ok(())
    }

    fn get_system_wide_values(&self) -> Result<SystemWideValues> {
        Ok(self.conn.query_row(
            "SELECT average_standard_game_points, average_pickup_only_standard_game_points,
                    average_counter_pick_points
             FROM system_settings WHERE id = 1",
            [],
            |row| {
                Ok(SystemWideValues {
                    average_standard_game_points: row.get(0)?,
                    average_pickup_only_standard_game_points: row.get(1)?,
                    average_counter_pick_points: row.get(2)?,
                })
            },
        )?)
    }

    fn save_system_wide_values(&mut self, values: &SystemWideValues) -> Result<()> {
        self.conn.execute(
            "UPDATE system_settings SET
                average_standard_game_points = ?,
                average_pickup_only_standard_game_points = ?,
                average_counter_pick_points = ?
             WHERE id = 1",
            params![
                values.average_standard_game_points,
                values.average_pickup_only_standard_game_points,
                values.average_counter_pick_points
            ],
        )?;
        Ok(())
    }

    fn get_supported_years(&self) -> Result<Vec<SupportedYear>> {
        let mut stmt = self.conn.prepare(
            "SELECT year, open_for_creation, open_for_play, open_for_beta_users, finished
             FROM supported_years ORDER BY year",
        )?;
        let rows = stmt.query_map([], row_to_supported_year)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn save_supported_year(&mut self, year: &SupportedYear) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO supported_years
             (year, open_for_creation, open_for_play, open_for_beta_users, finished)
             VALUES (?, ?, ?, ?, ?)",
            params![
                year.year,
                year.open_for_creation,
                year.open_for_play,
                year.open_for_beta_users,
                year.finished
            ],
        )?;
        Ok(())
    }

    fn get_site_counts(&self) -> Result<SiteCounts> {
        let count = |sql: &str| -> Result<u64> {
            let n: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
            Ok(n as u64)
        };
        Ok(SiteCounts {
            user_count: count("SELECT COUNT(*) FROM users")?,
            league_count: count("SELECT COUNT(*) FROM leagues")?,
            master_game_count: count("SELECT COUNT(*) FROM master_games")?,
            publisher_game_count: count(
                "SELECT COUNT(*) FROM publisher_games WHERE removed_timestamp IS NULL",
            )?,
        })
    }

    fn create_league(&mut self, league_year: &LeagueYear) -> Result<()> {
        let league = &league_year.league;
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO leagues (id, name, manager, public_league, test_league, archived)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                league.id,
                league.name,
                league.manager,
                league.public_league,
                league.test_league,
                league.archived
            ],
        )?;
        write_league_year(&tx, league_year)?;
        tx.execute(
            "INSERT OR IGNORE INTO league_members (league_id, user_id) VALUES (?, ?)",
            params![league.id, league.manager],
        )?;
        tx.execute(
            "INSERT OR IGNORE INTO league_active_players (league_id, year, user_id) \
             VALUES (?, ?, ?)",
            params![league.id, league_year.year, league.manager],
        )?;
        for publisher in &league_year.publishers {
            write_publisher(&tx, publisher)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn save_league(&mut self, league: &League) -> Result<()> {
        self.conn.execute(
            "UPDATE leagues SET name = ?, manager = ?, public_league = ?, test_league = ?,
                archived = ?
             WHERE id = ?",
            params![
                league.name,
                league.manager,
                league.public_league,
                league.test_league,
                league.archived,
                league.id
            ],
        )?;
        Ok(())
    }

    fn get_league(&self, id: LeagueId) -> Result<Option<League>> {
        let league = self
            .conn
            .query_row(
                "SELECT id, name, manager, public_league, test_league, archived
                 FROM leagues WHERE id = ?",
                params![id],
                row_to_league,
            )
            .optional()?;
        match league {
            Some(mut league) => {
                league.years = self.league_years_of(id)?;
                Ok(Some(league))
            }
            None => Ok(None),
        }
    }

    fn get_leagues_for_user(&self, user: UserId) -> Result<Vec<League>> {
        let mut stmt = self.conn.prepare(
            "SELECT l.id, l.name, l.manager, l.public_league, l.test_league, l.archived
             FROM leagues l
             JOIN league_members m ON m.league_id = l.id
             WHERE m.user_id = ?
             ORDER BY l.name",
        )?;
        let leagues = stmt
            .query_map(params![user], row_to_league)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        leagues
            .into_iter()
            .map(|mut league| {
                league.years = self.league_years_of(league.id)?;
                Ok(league)
            })
            .collect()
    }

    fn add_league_year(&mut self, league_year: &LeagueYear) -> Result<()> {
        let tx = self.conn.transaction()?;
        write_league_year(&tx, league_year)?;
        for publisher in &league_year.publishers {
            write_publisher(&tx, publisher)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn get_league_year(&self, key: LeagueYearKey) -> Result<Option<LeagueYear>> {
        let Some(league) = self.get_league(key.league_id)? else {
            return Ok(None);
        };
        let row = self
            .conn
            .query_row(
                "SELECT year, options, play_status, draft_started_timestamp
                 FROM league_years WHERE league_id = ? AND year = ?",
                params![key.league_id, key.year],
                |row| {
                    Ok(LeagueYearRow {
                        year: row.get(0)?,
                        options: row.get(1)?,
                        play_status: row.get(2)?,
                        draft_started_timestamp: row.get(3)?,
                    })
                },
            )
            .optional()?;
        match row {
            Some(row) => Ok(Some(self.load_league_year(league, row)?)),
            None => Ok(None),
        }
    }

    fn get_league_years(&self, year: Year) -> Result<Vec<LeagueYear>> {
        let mut stmt = self
            .conn
            .prepare("SELECT league_id FROM league_years WHERE year = ? ORDER BY league_id")?;
        let league_ids = stmt
            .query_map(params![year], |row| row.get::<_, LeagueId>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut league_years = Vec::with_capacity(league_ids.len());
        for league_id in league_ids {
            if let Some(league_year) = self.get_league_year(LeagueYearKey::new(league_id, year))? {
                league_years.push(league_year);
            }
        }
        Ok(league_years)
    }

    fn add_league_member(&mut self, league_id: LeagueId, user: UserId) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO league_members (league_id, user_id) VALUES (?, ?)",
            params![league_id, user],
        )?;
        Ok(())
    }

    fn remove_league_member(&mut self, league_id: LeagueId, user: UserId) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM league_members WHERE league_id = ? AND user_id = ?",
            params![league_id, user],
        )?;
        tx.execute(
            "DELETE FROM league_active_players WHERE league_id = ? AND user_id = ?",
            params![league_id, user],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn get_league_members(&self, league_id: LeagueId) -> Result<Vec<UserId>> {
        let mut stmt = self
            .conn
            .prepare("SELECT user_id FROM league_members WHERE league_id = ? ORDER BY user_id")?;
        let rows = stmt.query_map(params![league_id], |row| row.get(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn set_player_active(&mut self, key: LeagueYearKey, user: UserId, active: bool) -> Result<()> {
        if active {
            self.conn.execute(
                "INSERT OR IGNORE INTO league_active_players (league_id, year, user_id)
                 VALUES (?, ?, ?)",
                params![key.league_id, key.year, user],
            )?;
        } else {
            self.conn.execute(
                "DELETE FROM league_active_players \
                 WHERE league_id = ? AND year = ? AND user_id = ?",
                params![key.league_id, key.year, user],
            )?;
        }
        Ok(())
    }

    fn get_active_players(&self, key: LeagueYearKey) -> Result<Vec<UserId>> {
        let mut stmt = self.conn.prepare(
            "SELECT user_id FROM league_active_players WHERE league_id = ? AND year = ?
             ORDER BY user_id",
        )?;
        let rows = stmt.query_map(params![key.league_id, key.year], |row| row.get(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn commit_league_changes(&mut self, changes: &LeagueChanges) -> Result<()> {
        if changes.is_empty() {
            return Ok(());
        }
        let tx = self.conn.transaction()?;
        if let Some(league_year) = &changes.league_year {
            write_league_year(&tx, league_year)?;
        }
        for publisher in &changes.publishers {
            write_publisher(&tx, publisher)?;
        }
        for id in &changes.removed_publishers {
            tx.execute(
                "DELETE FROM queued_games WHERE publisher_id = ?",
                params![id],
            )?;
            tx.execute("DELETE FROM publishers WHERE id = ?", params![id])?;
        }
        for action in &changes.actions {
            insert_action(&tx, action, None)?;
        }
        for trade in &changes.trades {
            write_trade(&tx, trade)?;
        }
        for id in &changes.cancelled_bids {
            tx.execute("DELETE FROM pickup_bids WHERE id = ?", params![id])?;
        }
        for id in &changes.cancelled_drops {
            tx.execute("DELETE FROM drop_requests WHERE id = ?", params![id])?;
        }
        tx.commit()?;
        Ok(())
    }

    fn delete_publisher(&mut self, id: PublisherId) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM queued_games WHERE publisher_id = ?",
            params![id],
        )?;
        tx.execute(
            "DELETE FROM pickup_bids WHERE publisher_id = ? AND successful IS NULL",
            params![id],
        )?;
        tx.execute(
            "DELETE FROM drop_requests WHERE publisher_id = ? AND successful IS NULL",
            params![id],
        )?;
        tx.execute("DELETE FROM publishers WHERE id = ?", params![id])?;
        tx.commit()?;
        Ok(())
    }

    fn get_league_actions(&self, key: LeagueYearKey) -> Result<Vec<LeagueAction>> {
        let mut stmt = self.conn.prepare(
            "SELECT publisher_id, league_id, year, timestamp, action_type, description,
                    manager_action
             FROM league_actions WHERE league_id = ? AND year = ?
             ORDER BY timestamp, id",
        )?;
        let rows = stmt.query_map(params![key.league_id, key.year], row_to_action)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn save_pickup_bid(&mut self, bid: &PickupBid) -> Result<()> {
        write_bid(&self.conn, bid, None)
    }

    fn delete_pickup_bid(&mut self, id: BidId) -> Result<()> {
        self.conn
            .execute("DELETE FROM pickup_bids WHERE id = ?", params![id])?;
        Ok(())
    }

    fn get_active_pickup_bids(&self, key: LeagueYearKey) -> Result<Vec<PickupBid>> {
        self.load_bids(
            &format!(
                "SELECT {} FROM pickup_bids
                 WHERE league_id = ? AND year = ? AND successful IS NULL
                 ORDER BY timestamp, id",
                BID_COLUMNS
            ),
            key,
        )
    }

    fn save_drop_request(&mut self, drop: &DropRequest) -> Result<()> {
        write_drop(&self.conn, drop, None)
    }

    fn delete_drop_request(&mut self, id: DropId) -> Result<()> {
        self.conn
            .execute("DELETE FROM drop_requests WHERE id = ?", params![id])?;
        Ok(())
    }

    fn get_active_drop_requests(&self, key: LeagueYearKey) -> Result<Vec<DropRequest>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, publisher_id, master_game_id, timestamp, successful
             FROM drop_requests
             WHERE league_id = ? AND year = ? AND successful IS NULL
             ORDER BY timestamp, id",
        )?;
        let rows = stmt
            .query_map(params![key.league_id, key.year], |row| {
                Ok((
                    row.get::<_, DropId>(0)?,
                    row.get::<_, PublisherId>(1)?,
                    row.get::<_, MasterGameId>(2)?,
                    row.get::<_, DateTime<Utc>>(3)?,
                    row.get::<_, Option<bool>>(4)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let lookup = self.master_game_lookup(key.year)?;
        rows.into_iter()
            .map(|(id, publisher_id, master_game_id, timestamp, successful)| {
                Ok(DropRequest {
                    id,
                    publisher_id,
                    league_year_key: key,
                    master_game: self.resolve_master_game(&lookup, master_game_id, key.year)?,
                    timestamp,
                    successful,
                })
            })
            .collect()
    }

    fn get_queued_games(&self, publisher: PublisherId, year: Year) -> Result<Vec<QueuedGame>> {
        let mut stmt = self.conn.prepare(
            "SELECT master_game_id, rank FROM queued_games WHERE publisher_id = ? ORDER BY rank",
        )?;
        let rows = stmt
            .query_map(params![publisher], |row| {
                Ok((row.get::<_, MasterGameId>(0)?, row.get::<_, u32>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let lookup = self.master_game_lookup(year)?;
        rows.into_iter()
            .map(|(master_game_id, rank)| {
                Ok(QueuedGame {
                    publisher_id: publisher,
                    master_game: self.resolve_master_game(&lookup, master_game_id, year)?,
                    rank,
                })
            })
            .collect()
    }

    fn set_queued_games(&mut self, publisher: PublisherId, games: &[QueuedGame]) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM queued_games WHERE publisher_id = ?",
            params![publisher],
        )?;
        for game in games {
            tx.execute(
                "INSERT INTO queued_games (publisher_id, master_game_id, rank) VALUES (?, ?, ?)",
                params![publisher, game.master_game.id(), game.rank],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn save_trade(&mut self, trade: &Trade) -> Result<()> {
        write_trade(&self.conn, trade)
    }

    fn get_trade(&self, id: TradeId) -> Result<Option<Trade>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {} FROM trades WHERE id = ?", TRADE_COLUMNS),
                params![id],
                row_to_trade,
            )
            .optional()?)
    }

    fn get_trades(&self, key: LeagueYearKey) -> Result<Vec<Trade>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM trades WHERE league_id = ? AND year = ? ORDER BY proposed_timestamp",
            TRADE_COLUMNS
        ))?;
        let rows = stmt.query_map(params![key.league_id, key.year], row_to_trade)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn save_manager_message(&mut self, message: &ManagerMessage) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO manager_messages
             (id, league_id, year, text, is_public, timestamp, deleted)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                message.id,
                message.league_year_key.league_id,
                message.league_year_key.year,
                message.text,
                message.is_public,
                message.timestamp,
                message.deleted
            ],
        )?;
        Ok(())
    }

    fn get_manager_message(&self, id: MessageId) -> Result<Option<ManagerMessage>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, league_id, year, text, is_public, timestamp, deleted
                 FROM manager_messages WHERE id = ?",
                params![id],
                row_to_message,
            )
            .optional()?)
    }

    /// Deleted messages are left out.
    fn get_manager_messages(&self, key: LeagueYearKey) -> Result<Vec<ManagerMessage>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, league_id, year, text, is_public, timestamp, deleted
             FROM manager_messages
             WHERE league_id = ? AND year = ? AND deleted = 0
             ORDER BY timestamp DESC",
        )?;
        let rows = stmt.query_map(params![key.league_id, key.year], row_to_message)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn save_special_auction(&mut self, auction: &SpecialAuction) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO special_auctions
             (id, league_id, year, master_game_id, creation_time, scheduled_end_time, processed)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                auction.id,
                auction.league_year_key.league_id,
                auction.league_year_key.year,
                auction.master_game.id(),
                auction.creation_time,
                auction.scheduled_end_time,
                auction.processed
            ],
        )?;
        Ok(())
    }

    fn get_special_auction(&self, id: AuctionId) -> Result<Option<SpecialAuction>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, league_id, year, master_game_id, creation_time, scheduled_end_time,
                        processed
                 FROM special_auctions WHERE id = ?",
                params![id],
                row_to_auction_parts,
            )
            .optional()?;
        match row {
            Some(parts) => {
                let year = parts.league_year_key.year;
                let lookup = self.master_game_lookup(year)?;
                let master_game = self.resolve_master_game(&lookup, parts.master_game_id, year)?;
                Ok(Some(parts.into_auction(master_game)))
            }
            None => Ok(None),
        }
    }

    fn get_special_auctions(&self, year: Year) -> Result<Vec<SpecialAuction>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, league_id, year, master_game_id, creation_time, scheduled_end_time,
                    processed
             FROM special_auctions WHERE year = ? ORDER BY scheduled_end_time, id",
        )?;
        let rows = stmt
            .query_map(params![year], row_to_auction_parts)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let lookup = self.master_game_lookup(year)?;
        rows.into_iter()
            .map(|parts| {
                let master_game = self.resolve_master_game(&lookup, parts.master_game_id, year)?;
                Ok(parts.into_auction(master_game))
            })
            .collect()
    }

    fn save_processing_results(
        &mut self,
        metadata: &ActionProcessingSetMetadata,
        results: &ActionProcessingResults,
        processed_auctions: &[AuctionId],
    ) -> Result<()> {
        let set_id = Some(metadata.process_set_id);
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO action_processing_sets (process_set_id, process_time, process_name)
             VALUES (?, ?, ?)",
            params![
                metadata.process_set_id,
                metadata.process_time,
                metadata.process_name
            ],
        )?;
        for bid in results.success_bids.iter().chain(&results.failed_bids) {
            write_bid(&tx, bid, set_id)?;
        }
        for drop in results.success_drops.iter().chain(&results.failed_drops) {
            write_drop(&tx, drop, set_id)?;
        }
        for publisher in results.publishers_sorted() {
            write_publisher(&tx, publisher)?;
        }
        for action in &results.league_actions {
            insert_action(&tx, action, set_id)?;
        }
        for id in processed_auctions {
            tx.execute(
                "UPDATE special_auctions SET processed = 1 WHERE id = ?",
                params![id],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn get_action_processing_sets(&self) -> Result<Vec<ActionProcessingSetMetadata>> {
        let mut stmt = self.conn.prepare(
            "SELECT process_set_id, process_time, process_name
             FROM action_processing_sets ORDER BY process_time",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(ActionProcessingSetMetadata {
                process_set_id: row.get(0)?,
                process_time: row.get(1)?,
                process_name: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

struct AuctionParts {
    id: AuctionId,
    league_year_key: LeagueYearKey,
    master_game_id: MasterGameId,
    creation_time: DateTime<Utc>,
    scheduled_end_time: DateTime<Utc>,
    processed: bool,
}

impl AuctionParts {
    fn into_auction(self, master_game: MasterGameYear) -> SpecialAuction {
        SpecialAuction {
            id: self.id,
            league_year_key: self.league_year_key,
            master_game,
            creation_time: self.creation_time,
            scheduled_end_time: self.scheduled_end_time,
            processed: self.processed,
        }
    }
}

fn row_to_auction_parts(row: &Row) -> rusqlite::Result<AuctionParts> {
    Ok(AuctionParts {
        id: row.get(0)?,
        league_year_key: LeagueYearKey::new(row.get(1)?, row.get(2)?),
        master_game_id: row.get(3)?,
        creation_time: row.get(4)?,
        scheduled_end_time: row.get(5)?,
        processed: row.get(6)?,
    })
}
