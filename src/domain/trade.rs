//! Trades between two publishers in the same league season.

use crate::cli::types::ids::{PublisherGameId, PublisherId, TradeId};
use crate::cli::types::time::LeagueYearKey;
use crate::error::{FantasyCriticError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradeStatus {
    Proposed,
    Accepted,
    RejectedByCounterParty,
    RejectedByManager,
    Rescinded,
    Executed,
}

impl TradeStatus {
    /// Still open: proposed or accepted and waiting on the manager.
    pub fn is_active(&self) -> bool {
        matches!(self, TradeStatus::Proposed | TradeStatus::Accepted)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TradeStatus::Proposed => "Proposed",
            TradeStatus::Accepted => "Accepted",
            TradeStatus::RejectedByCounterParty => "RejectedByCounterParty",
            TradeStatus::RejectedByManager => "RejectedByManager",
            TradeStatus::Rescinded => "Rescinded",
            TradeStatus::Executed => "Executed",
        }
    }
}

impl fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TradeStatus {
    type Err = FantasyCriticError;

    fn from_str(s: &str) -> Result<Self> {
        [
            TradeStatus::Proposed,
            TradeStatus::Accepted,
            TradeStatus::RejectedByCounterParty,
            TradeStatus::RejectedByManager,
            TradeStatus::Rescinded,
            TradeStatus::Executed,
        ]
        .into_iter()
        .find(|status| status.as_str() == s)
        .ok_or_else(|| {
            FantasyCriticError::validation(format!("Unknown trade status: {}", s))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: TradeId,
    pub league_year_key: LeagueYearKey,
    pub proposer: PublisherId,
    pub counter_party: PublisherId,
    pub proposer_games: Vec<PublisherGameId>,
    pub counter_party_games: Vec<PublisherGameId>,
    pub proposer_budget_send: u32,
    pub counter_party_budget_send: u32,
    pub message: String,
    pub proposed_timestamp: DateTime<Utc>,
    pub accepted_timestamp: Option<DateTime<Utc>>,
    pub completed_timestamp: Option<DateTime<Utc>>,
    pub status: TradeStatus,
}

impl Trade {
    pub fn involves_game(&self, id: PublisherGameId) -> bool {
        self.proposer_games.contains(&id) || self.counter_party_games.contains(&id)
    }

    pub fn involves_publisher(&self, id: PublisherId) -> bool {
        self.proposer == id || self.counter_party == id
    }

    pub fn with_status(&self, status: TradeStatus, now: DateTime<Utc>) -> Trade {
        let mut trade = self.clone();
        match status {
            TradeStatus::Accepted => trade.accepted_timestamp = Some(now),
            TradeStatus::Proposed => {}
            _ => trade.completed_timestamp = Some(now),
        }
        trade.status = status;
        trade
    }
}
