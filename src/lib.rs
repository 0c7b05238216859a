//! Fantasy Critic Library
//!
//! A fantasy league for video games: players draft upcoming releases, bid on pickups,
//! trade, and score points from critic reviews. This crate holds the rules engine,
//! the services that enforce league rules, SQLite storage, and the CLI.
//!
//! ## Features
//!
//! - **Drafts**: snake drafts with counter picks, auto draft from a queue, pause and undo
//! - **Pickups**: blind bidding processed in batches, drop requests and special auctions
//! - **Trades**: proposal, acceptance and manager execution
//! - **Royale**: quarterly league-less play with a dollar budget
//! - **Critic Scores**: OpenCritic refresh and site-wide hype statistics
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fantasy_critic::{
//!     core::SystemClock, services::InterLeagueService, storage::FantasyCriticDatabase, Year,
//! };
//!
//! # fn example() -> fantasy_critic::Result<()> {
//! let mut db = FantasyCriticDatabase::new_in_memory()?;
//! let clock = SystemClock;
//! let mut site = InterLeagueService::new(&mut db, &clock);
//!
//! site.add_supported_year(Year::new(2026))?;
//! let user = site.add_user("Critic")?;
//! println!("Created user {}", user.id);
//! # Ok(())
//! # }
//! ```
//!
//! ## Environment Configuration
//!
//! Set your user ID to avoid passing `--user` to every command:
//! ```bash
//! export FANTASY_CRITIC_USER_ID=5f0c6f1e-0d3b-4a52-9a4e-0c7d6c1f2e3a
//! ```

pub mod cli;
pub mod commands;
pub mod core;
pub mod domain;
pub mod engine;
pub mod error;
pub mod opencritic;
pub mod services;
pub mod storage;

#[cfg(test)]
mod fixtures;

// Re-export commonly used types
pub use cli::types::ids::{
    AuctionId, BidId, DropId, LeagueId, MasterGameId, MessageId, PublisherGameId, PublisherId,
    RequestId, TradeId, UserId,
};
pub use cli::types::time::{LeagueYearKey, Year, YearQuarter};
pub use error::{FantasyCriticError, Result};

pub const USER_ID_ENV_VAR: &str = "FANTASY_CRITIC_USER_ID";
