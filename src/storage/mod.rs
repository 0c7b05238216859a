//! Storage layer for Fantasy Critic
//!
//! The repository traits are what services depend on; `FantasyCriticDatabase`
//! implements all three on top of SQLite:
//! - `models`: write batches and stored records
//! - `schema`: database connection and schema management
//! - `master_games`: master games, tags, change log and requests
//! - `leagues`: leagues, publishers, bids, trades and processing results
//! - `royale`: Royale quarters and publishers

pub mod leagues;
pub mod master_games;
pub mod models;
pub mod royale;
pub mod schema;


use crate::cli::types::ids::{
    AuctionId, BidId, DropId, LeagueId, MasterGameId, MessageId, PublisherId, RequestId, TradeId,
    UserId,
};
use crate::cli::types::time::{LeagueYearKey, Year, YearQuarter};
use crate::domain::{
    ActionProcessingResults, ActionProcessingSetMetadata, DropRequest, FantasyCriticUser, League,
    LeagueAction, LeagueYear, ManagerMessage, MasterGame, MasterGameChangeLogEntry,
    MasterGameRequest, MasterGameTag, MasterGameYear, PickupBid, QueuedGame, RoyalePublisher,
    RoyaleYearQuarter, SiteCounts, SpecialAuction, SupportedYear, SystemWideSettings,
    SystemWideValues, Trade,
};
use anyhow::Result;

pub use models::LeagueChanges;
pub use schema::FantasyCriticDatabase;

/// Master games and everything hanging off them.
pub trait MasterGameRepo {
    fn get_master_game_tags(&self) -> Result<Vec<MasterGameTag>>;
    fn save_master_game_tag(&mut self, tag: &MasterGameTag) -> Result<()>;

    /// Insert or replace; cached copies are invalidated.
    fn save_master_game(&mut self, game: &MasterGame) -> Result<()>;
    fn get_master_game(&self, id: MasterGameId) -> Result<Option<MasterGame>>;
    fn get_master_games(&self) -> Result<Vec<MasterGame>>;

    /// The game viewed in `year`, with zeroed statistics if none were computed yet.
    fn get_master_game_year(&self, id: MasterGameId, year: Year) -> Result<Option<MasterGameYear>>;
    /// Every game whose release window overlaps `year`.
    fn get_master_game_years(&self, year: Year) -> Result<Vec<MasterGameYear>>;
    fn save_master_game_year_stats(&mut self, year: Year, stats: &[MasterGameYear]) -> Result<()>;

    fn add_change_log_entries(&mut self, entries: &[MasterGameChangeLogEntry]) -> Result<()>;
    fn get_change_log(&self, id: MasterGameId) -> Result<Vec<MasterGameChangeLogEntry>>;
    fn get_recent_changes(&self, limit: usize) -> Result<Vec<MasterGameChangeLogEntry>>;

    fn save_master_game_request(&mut self, request: &MasterGameRequest) -> Result<()>;
    fn get_master_game_request(&self, id: RequestId) -> Result<Option<MasterGameRequest>>;
    fn get_master_game_requests(&self) -> Result<Vec<MasterGameRequest>>;
    fn delete_master_game_request(&mut self, id: RequestId) -> Result<()>;
}

/// Users, site settings, leagues and everything played inside them.
pub trait FantasyCriticRepo {
    fn save_user(&mut self, user: &FantasyCriticUser) -> Result<()>;
    fn get_user(&self, id: UserId) -> Result<Option<FantasyCriticUser>>;

    fn get_system_wide_settings(&self) -> Result<SystemWideSettings>;
    fn set_action_processing_mode(&mut self, enabled: bool) -> Result<()>;
    fn get_system_wide_values(&self) -> Result<SystemWideValues>;
    fn save_system_wide_values(&mut self, values: &SystemWideValues) -> Result<()>;
    fn get_supported_years(&self) -> Result<Vec<SupportedYear>>;
    fn save_supported_year(&mut self, year: &SupportedYear) -> Result<()>;
    fn get_site_counts(&self) -> Result<SiteCounts>;

    /// Insert the league, its first season and the manager's membership together.
    fn create_league(&mut self, league_year: &LeagueYear) -> Result<()>;
    fn save_league(&mut self, league: &League) -> Result<()>;
    fn get_league(&self, id: LeagueId) -> Result<Option<League>>;
    fn get_leagues_for_user(&self, user: UserId) -> Result<Vec<League>>;
    fn add_league_year(&mut self, league_year: &LeagueYear) -> Result<()>;
    fn get_league_year(&self, key: LeagueYearKey) -> Result<Option<LeagueYear>>;
    fn get_league_years(&self, year: Year) -> Result<Vec<LeagueYear>>;

    fn add_league_member(&mut self, league_id: LeagueId, user: UserId) -> Result<()>;
    fn remove_league_member(&mut self, league_id: LeagueId, user: UserId) -> Result<()>;
    fn get_league_members(&self, league_id: LeagueId) -> Result<Vec<UserId>>;
    fn set_player_active(&mut self, key: LeagueYearKey, user: UserId, active: bool) -> Result<()>;
    fn get_active_players(&self, key: LeagueYearKey) -> Result<Vec<UserId>>;

    /// Apply a batch of league changes in one transaction.
    fn commit_league_changes(&mut self, changes: &LeagueChanges) -> Result<()>;
    fn delete_publisher(&mut self, id: PublisherId) -> Result<()>;
    fn get_league_actions(&self, key: LeagueYearKey) -> Result<Vec<LeagueAction>>;

    fn save_pickup_bid(&mut self, bid: &PickupBid) -> Result<()>;
    fn delete_pickup_bid(&mut self, id: BidId) -> Result<()>;
    /// Unprocessed bids of one season.
    fn get_active_pickup_bids(&self, key: LeagueYearKey) -> Result<Vec<PickupBid>>;
    fn save_drop_request(&mut self, drop: &DropRequest) -> Result<()>;
    fn delete_drop_request(&mut self, id: DropId) -> Result<()>;
    fn get_active_drop_requests(&self, key: LeagueYearKey) -> Result<Vec<DropRequest>>;

    fn get_queued_games(&self, publisher: PublisherId, year: Year) -> Result<Vec<QueuedGame>>;
    fn set_queued_games(&mut self, publisher: PublisherId, games: &[QueuedGame]) -> Result<()>;

    fn save_trade(&mut self, trade: &Trade) -> Result<()>;
    fn get_trade(&self, id: TradeId) -> Result<Option<Trade>>;
    fn get_trades(&self, key: LeagueYearKey) -> Result<Vec<Trade>>;

    fn save_manager_message(&mut self, message: &ManagerMessage) -> Result<()>;
    fn get_manager_message(&self, id: MessageId) -> Result<Option<ManagerMessage>>;
    fn get_manager_messages(&self, key: LeagueYearKey) -> Result<Vec<ManagerMessage>>;

    fn save_special_auction(&mut self, auction: &SpecialAuction) -> Result<()>;
    fn get_special_auction(&self, id: AuctionId) -> Result<Option<SpecialAuction>>;
    fn get_special_auctions(&self, year: Year) -> Result<Vec<SpecialAuction>>;

    /// Persist one processing run: resolved bids and drops, publishers, actions,
    /// and the processed auctions, all tagged with the run's metadata.
    fn save_processing_results(
        &mut self,
        metadata: &ActionProcessingSetMetadata,
        results: &ActionProcessingResults,
        processed_auctions: &[AuctionId],
    ) -> Result<()>;
    fn get_action_processing_sets(&self) -> Result<Vec<ActionProcessingSetMetadata>>;
}

/// Royale quarters and publishers.
pub trait RoyaleRepo {
    fn get_royale_quarters(&self) -> Result<Vec<RoyaleYearQuarter>>;
    fn save_royale_quarter(&mut self, quarter: &RoyaleYearQuarter) -> Result<()>;

    /// Insert or replace the publisher together with its games.
    fn save_royale_publisher(&mut self, publisher: &RoyalePublisher) -> Result<()>;
    fn get_royale_publisher(&self, id: PublisherId) -> Result<Option<RoyalePublisher>>;
    fn get_royale_publisher_for_user(
        &self,
        quarter: YearQuarter,
        user: UserId,
    ) -> Result<Option<RoyalePublisher>>;
    fn get_royale_publishers(&self, quarter: YearQuarter) -> Result<Vec<RoyalePublisher>>;
    fn save_royale_fantasy_points(&mut self, publishers: &[RoyalePublisher]) -> Result<()>;
}
