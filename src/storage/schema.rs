//! Database schema and connection management

use crate::core::cache::MasterGameCache;
use crate::core::config::Config;
use crate::domain::MasterGameTag;
use anyhow::Result;
use rusqlite::{params, Connection};
use std::path::Path;

const DEFAULT_CACHE_CAPACITY: usize = 5000;

/// SQLite-backed store for every repository trait.
pub struct FantasyCriticDatabase {
    pub(crate) conn: Connection,
    pub(crate) cache: MasterGameCache,
}

impl FantasyCriticDatabase {
    /// Open (or create) the database file at `path` and ensure tables exist
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::with_connection(conn, MasterGameCache::in_memory(DEFAULT_CACHE_CAPACITY))
    }

    /// Fresh database that lives only as long as this handle.
    pub fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn, MasterGameCache::in_memory(DEFAULT_CACHE_CAPACITY))
    }

    /// Open the configured database with a disk-backed master game cache.
    pub fn from_config(config: &Config) -> Result<Self> {
        if let Some(parent) = config.database_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&config.database_path)?;
        let cache = MasterGameCache::with_disk(
            config.master_game_cache_capacity,
            config.cache_dir.clone(),
        );
        Self::with_connection(conn, cache)
    }

    fn with_connection(conn: Connection, cache: MasterGameCache) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let mut db = Self { conn, cache };
        db.initialize_schema()?;
        Ok(db)
    }

    pub fn cache(&self) -> &MasterGameCache {
        &self.cache
    }

    /// Initialize the database schema
    pub(crate) fn initialize_schema(&mut self) -> Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                display_name TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS system_settings (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                action_processing_mode INTEGER NOT NULL,
                average_standard_game_points REAL NOT NULL,
                average_pickup_only_standard_game_points REAL NOT NULL,
                average_counter_pick_points REAL NOT NULL
            );

            CREATE TABLE IF NOT EXISTS supported_years (
                year INTEGER PRIMARY KEY,
                open_for_creation INTEGER NOT NULL,
                open_for_play INTEGER NOT NULL,
                open_for_beta_users INTEGER NOT NULL,
                finished INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS master_game_tags (
                name TEXT PRIMARY KEY,
                readable_name TEXT NOT NULL,
                short_name TEXT NOT NULL,
                tag_type TEXT NOT NULL,
                has_custom_code INTEGER NOT NULL,
                description TEXT NOT NULL,
                examples TEXT NOT NULL,
                badge_color TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS master_games (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                estimated_release_date TEXT NOT NULL,
                minimum_release_date TEXT NOT NULL,
                maximum_release_date TEXT,
                early_access_release_date TEXT,
                international_release_date TEXT,
                announcement_date TEXT,
                release_date TEXT,
                open_critic_id INTEGER,
                critic_score REAL,
                has_any_reviews INTEGER NOT NULL,
                notes TEXT,
                tags TEXT NOT NULL,
                first_critic_score_timestamp TEXT,
                delay_contention INTEGER NOT NULL,
                eligibility_changed INTEGER NOT NULL,
                added_timestamp TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS master_game_years (
                master_game_id TEXT NOT NULL REFERENCES master_games(id),
                year INTEGER NOT NULL,
                percent_standard_game REAL NOT NULL,
                percent_counter_pick REAL NOT NULL,
                eligible_percent_standard_game REAL NOT NULL,
                average_draft_position REAL,
                hype_factor REAL NOT NULL,
                date_adjusted_hype_factor REAL NOT NULL,
                PRIMARY KEY (master_game_id, year)
            );

            CREATE TABLE IF NOT EXISTS master_game_change_log (
                id TEXT PRIMARY KEY,
                master_game_id TEXT NOT NULL REFERENCES master_games(id),
                changed_by TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                description TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS master_game_requests (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                request_timestamp TEXT NOT NULL,
                request_note TEXT NOT NULL,
                game_name TEXT NOT NULL,
                estimated_release_date TEXT,
                open_critic_id INTEGER,
                answered INTEGER NOT NULL,
                response_timestamp TEXT,
                response_note TEXT,
                master_game_id TEXT,
                hidden INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS leagues (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                manager TEXT NOT NULL,
                public_league INTEGER NOT NULL,
                test_league INTEGER NOT NULL,
                archived INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS league_years (
                league_id TEXT NOT NULL REFERENCES leagues(id),
                year INTEGER NOT NULL,
                options TEXT NOT NULL,
                play_status TEXT NOT NULL,
                draft_started_timestamp TEXT,
                PRIMARY KEY (league_id, year)
            );

            CREATE TABLE IF NOT EXISTS league_members (
                league_id TEXT NOT NULL REFERENCES leagues(id),
                user_id TEXT NOT NULL,
                PRIMARY KEY (league_id, user_id)
            );

            CREATE TABLE IF NOT EXISTS league_active_players (
                league_id TEXT NOT NULL,
                year INTEGER NOT NULL,
                user_id TEXT NOT NULL,
                PRIMARY KEY (league_id, year, user_id)
            );

            CREATE TABLE IF NOT EXISTS eligibility_overrides (
                league_id TEXT NOT NULL,
                year INTEGER NOT NULL,
                master_game_id TEXT NOT NULL,
                eligible INTEGER NOT NULL,
                PRIMARY KEY (league_id, year, master_game_id)
            );

            CREATE TABLE IF NOT EXISTS tag_overrides (
                league_id TEXT NOT NULL,
                year INTEGER NOT NULL,
                master_game_id TEXT NOT NULL,
                tags TEXT NOT NULL,
                PRIMARY KEY (league_id, year, master_game_id)
            );

            CREATE TABLE IF NOT EXISTS publishers (
                id TEXT PRIMARY KEY,
                league_id TEXT NOT NULL,
                year INTEGER NOT NULL,
                user_id TEXT NOT NULL,
                name TEXT NOT NULL,
                icon TEXT,
                draft_position INTEGER NOT NULL,
                budget INTEGER NOT NULL,
                free_games_dropped INTEGER NOT NULL,
                will_not_release_games_dropped INTEGER NOT NULL,
                will_release_games_dropped INTEGER NOT NULL,
                auto_draft INTEGER NOT NULL,
                FOREIGN KEY (league_id, year) REFERENCES league_years(league_id, year)
            );

            CREATE TABLE IF NOT EXISTS publisher_games (
                id TEXT PRIMARY KEY,
                publisher_id TEXT NOT NULL REFERENCES publishers(id) ON DELETE CASCADE,
                game_name TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                counter_pick INTEGER NOT NULL,
                manual_critic_score REAL,
                manual_will_not_release INTEGER NOT NULL,
                fantasy_points REAL,
                master_game_id TEXT,
                slot_number INTEGER NOT NULL,
                draft_position INTEGER,
                overall_draft_position INTEGER,
                bid_amount INTEGER,
                acquired_in_trade_id TEXT,
                removed_timestamp TEXT,
                removed_note TEXT
            );

            CREATE TABLE IF NOT EXISTS league_actions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                publisher_id TEXT NOT NULL,
                league_id TEXT NOT NULL,
                year INTEGER NOT NULL,
                timestamp TEXT NOT NULL,
                action_type TEXT NOT NULL,
                description TEXT NOT NULL,
                manager_action INTEGER NOT NULL,
                process_set_id TEXT
            );

            CREATE TABLE IF NOT EXISTS pickup_bids (
                id TEXT PRIMARY KEY,
                publisher_id TEXT NOT NULL,
                league_id TEXT NOT NULL,
                year INTEGER NOT NULL,
                master_game_id TEXT NOT NULL,
                conditional_drop TEXT,
                counter_pick INTEGER NOT NULL,
                bid_amount INTEGER NOT NULL,
                priority INTEGER NOT NULL,
                timestamp TEXT NOT NULL,
                allow_ineligible_slot INTEGER NOT NULL,
                successful INTEGER,
                outcome TEXT,
                process_set_id TEXT
            );

            CREATE TABLE IF NOT EXISTS drop_requests (
                id TEXT PRIMARY KEY,
                publisher_id TEXT NOT NULL,
                league_id TEXT NOT NULL,
                year INTEGER NOT NULL,
                master_game_id TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                successful INTEGER,
                process_set_id TEXT
            );

            CREATE TABLE IF NOT EXISTS queued_games (
                publisher_id TEXT NOT NULL,
                master_game_id TEXT NOT NULL,
                rank INTEGER NOT NULL,
                PRIMARY KEY (publisher_id, master_game_id)
            );

            CREATE TABLE IF NOT EXISTS trades (
                id TEXT PRIMARY KEY,
                league_id TEXT NOT NULL,
                year INTEGER NOT NULL,
                proposer TEXT NOT NULL,
                counter_party TEXT NOT NULL,
                proposer_games TEXT NOT NULL,
                counter_party_games TEXT NOT NULL,
                proposer_budget_send INTEGER NOT NULL,
                counter_party_budget_send INTEGER NOT NULL,
                message TEXT NOT NULL,
                proposed_timestamp TEXT NOT NULL,
                accepted_timestamp TEXT,
                completed_timestamp TEXT,
                status TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS manager_messages (
                id TEXT PRIMARY KEY,
                league_id TEXT NOT NULL,
                year INTEGER NOT NULL,
                text TEXT NOT NULL,
                is_public INTEGER NOT NULL,
                timestamp TEXT NOT NULL,
                deleted INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS special_auctions (
                id TEXT PRIMARY KEY,
                league_id TEXT NOT NULL,
                year INTEGER NOT NULL,
                master_game_id TEXT NOT NULL,
                creation_time TEXT NOT NULL,
                scheduled_end_time TEXT NOT NULL,
                processed INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS action_processing_sets (
                process_set_id TEXT PRIMARY KEY,
                process_time TEXT NOT NULL,
                process_name TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS royale_quarters (
                year INTEGER NOT NULL,
                quarter INTEGER NOT NULL,
                open_for_play INTEGER NOT NULL,
                finished INTEGER NOT NULL,
                has_release_date_limit INTEGER NOT NULL,
                winning_user TEXT,
                PRIMARY KEY (year, quarter)
            );

            CREATE TABLE IF NOT EXISTS royale_publishers (
                id TEXT PRIMARY KEY,
                year INTEGER NOT NULL,
                quarter INTEGER NOT NULL,
                user_id TEXT NOT NULL,
                name TEXT NOT NULL,
                icon TEXT,
                slogan TEXT,
                budget TEXT NOT NULL,
                UNIQUE (year, quarter, user_id)
            );

            CREATE TABLE IF NOT EXISTS royale_publisher_games (
                publisher_id TEXT NOT NULL REFERENCES royale_publishers(id) ON DELETE CASCADE,
                master_game_id TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                amount_spent TEXT NOT NULL,
                advertising_money TEXT NOT NULL,
                fantasy_points REAL,
                PRIMARY KEY (publisher_id, master_game_id)
            );

            CREATE INDEX IF NOT EXISTS idx_publishers_league_year
                ON publishers(league_id, year);
            CREATE INDEX IF NOT EXISTS idx_publisher_games_publisher
                ON publisher_games(publisher_id);
            CREATE INDEX IF NOT EXISTS idx_league_actions_league_year
                ON league_actions(league_id, year);
            CREATE INDEX IF NOT EXISTS idx_pickup_bids_active
                ON pickup_bids(league_id, year) WHERE successful IS NULL;",
        )?;

        self.conn.execute(
            "INSERT OR IGNORE INTO system_settings
             (id, action_processing_mode, average_standard_game_points,
              average_pickup_only_standard_game_points, average_counter_pick_points)
             VALUES (1, 0, 9.0, 6.0, -4.0)",
            [],
        )?;

        for tag in MasterGameTag::defaults() {
            self.conn.execute(
                "INSERT OR IGNORE INTO master_game_tags
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
        }

        Ok(())
    }
}
