//! Pending pickups, drops, queues and the records processing leaves behind.

use crate::cli::types::ids::{
    AuctionId, BidId, DropId, MasterGameId, ProcessSetId, PublisherGameId, PublisherId,
};
use crate::cli::types::time::LeagueYearKey;
use crate::domain::master_game::MasterGameYear;
use crate::domain::publisher::{Publisher, PublisherGame};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickupBid {
    pub id: BidId,
    pub publisher_id: PublisherId,
    pub league_year_key: LeagueYearKey,
    pub master_game: MasterGameYear,
    pub conditional_drop: Option<PublisherGameId>,
    pub counter_pick: bool,
    pub bid_amount: u32,
    pub priority: u32,
    pub timestamp: DateTime<Utc>,
    pub allow_ineligible_slot: bool,
    pub successful: Option<bool>,
    pub outcome: Option<String>,
}

impl PickupBid {
    pub fn master_game_id(&self) -> MasterGameId {
        self.master_game.id()
    }

    pub fn is_active(&self) -> bool {
        self.successful.is_none()
    }

    pub fn resolve(&self, successful: bool, outcome: &str) -> PickupBid {
        PickupBid {
            successful: Some(successful),
            outcome: Some(outcome.to_string()),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropRequest {
    pub id: DropId,
    pub publisher_id: PublisherId,
    pub league_year_key: LeagueYearKey,
    pub master_game: MasterGameYear,
    pub timestamp: DateTime<Utc>,
    pub successful: Option<bool>,
}

impl DropRequest {
    pub fn resolve(&self, successful: bool) -> DropRequest {
        DropRequest {
            successful: Some(successful),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedGame {
    pub publisher_id: PublisherId,
    pub master_game: MasterGameYear,
    pub rank: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeagueActionType {
    DraftGame,
    AutoDraftGame,
    ClaimGame,
    AssociateGame,
    PickupGame,
    PickupFailed,
    DropGame,
    DropFailed,
    RemoveGame,
    UndoDraft,
    TradeExecuted,
    PublisherEdited,
    ManualScore,
    EligibilityChanged,
}

impl LeagueActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeagueActionType::DraftGame => "Draft Game",
            LeagueActionType::AutoDraftGame => "Auto Draft Game",
            LeagueActionType::ClaimGame => "Claimed Game",
            LeagueActionType::AssociateGame => "Associated Game",
            LeagueActionType::PickupGame => "Pickup Game",
            LeagueActionType::PickupFailed => "Pickup Failed",
            LeagueActionType::DropGame => "Dropped Game",
            LeagueActionType::DropFailed => "Drop Failed",
            LeagueActionType::RemoveGame => "Removed Game",
            LeagueActionType::UndoDraft => "Undo Draft",
            LeagueActionType::TradeExecuted => "Trade Executed",
            LeagueActionType::PublisherEdited => "Publisher Edited",
            LeagueActionType::ManualScore => "Manual Score",
            LeagueActionType::EligibilityChanged => "Eligibility Changed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        use LeagueActionType::*;
        [
            DraftGame,
            AutoDraftGame,
            ClaimGame,
            AssociateGame,
            PickupGame,
            PickupFailed,
            DropGame,
            DropFailed,
            RemoveGame,
            UndoDraft,
            TradeExecuted,
            PublisherEdited,
            ManualScore,
            EligibilityChanged,
        ]
        .into_iter()
        .find(|t| t.as_str() == s)
    }
}

impl fmt::Display for LeagueActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeagueAction {
    pub publisher_id: PublisherId,
    pub league_year_key: LeagueYearKey,
    pub timestamp: DateTime<Utc>,
    pub action_type: LeagueActionType,
    pub description: String,
    pub manager_action: bool,
}

impl LeagueAction {
    pub fn new(
        publisher: &Publisher,
        timestamp: DateTime<Utc>,
        action_type: LeagueActionType,
        description: impl Into<String>,
        manager_action: bool,
    ) -> Self {
        Self {
            publisher_id: publisher.id,
            league_year_key: publisher.league_year_key,
            timestamp,
            action_type,
            description: description.into(),
            manager_action,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionProcessingSetMetadata {
    pub process_set_id: ProcessSetId,
    pub process_time: DateTime<Utc>,
    pub process_name: String,
}

impl ActionProcessingSetMetadata {
    pub fn new(process_time: DateTime<Utc>, process_name: &str) -> Self {
        Self {
            process_set_id: ProcessSetId::new_v4(),
            process_time,
            process_name: process_name.to_string(),
        }
    }
}

/// Everything one processing run changes.
#[derive(Debug, Clone, Default)]
pub struct ActionProcessingResults {
    pub success_bids: Vec<PickupBid>,
    pub failed_bids: Vec<PickupBid>,
    pub success_drops: Vec<DropRequest>,
    pub failed_drops: Vec<DropRequest>,
    pub league_actions: Vec<LeagueAction>,
    pub updated_publishers: HashMap<PublisherId, Publisher>,
    pub added_games: Vec<PublisherGame>,
    pub removed_games: Vec<PublisherGame>,
}

impl ActionProcessingResults {
    pub fn empty(publishers: &[Publisher]) -> Self {
        Self {
            updated_publishers: publishers.iter().map(|p| (p.id, p.clone())).collect(),
            ..Self::default()
        }
    }

    /// Append `other`; its publisher states replace ours.
    pub fn combine(mut self, other: ActionProcessingResults) -> Self {
        self.success_bids.extend(other.success_bids);
        self.failed_bids.extend(other.failed_bids);
        self.success_drops.extend(other.success_drops);
        self.failed_drops.extend(other.failed_drops);
        self.league_actions.extend(other.league_actions);
        self.updated_publishers.extend(other.updated_publishers);
        self.added_games.extend(other.added_games);
        self.removed_games.extend(other.removed_games);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.success_bids.is_empty()
            && self.failed_bids.is_empty()
            && self.success_drops.is_empty()
            && self.failed_drops.is_empty()
    }

    /// Publishers sorted by id so output is stable.
    pub fn publishers_sorted(&self) -> Vec<&Publisher> {
        let mut publishers: Vec<&Publisher> = self.updated_publishers.values().collect();
        publishers.sort_by_key(|p| p.id);
        publishers
    }
}

/// A single-game auction that processes on its own schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecialAuction {
    pub id: AuctionId,
    pub league_year_key: LeagueYearKey,
    pub master_game: MasterGameYear,
    pub creation_time: DateTime<Utc>,
    pub scheduled_end_time: DateTime<Utc>,
    pub processed: bool,
}

impl SpecialAuction {
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        now >= self.scheduled_end_time
    }
}
