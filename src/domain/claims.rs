//! Claim requests and their validation outcome.

use crate::cli::types::ids::PublisherId;
use crate::domain::master_game::MasterGameYear;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimError {
    pub error: String,
    pub overridable: bool,
}

impl ClaimError {
    pub fn new(error: impl Into<String>, overridable: bool) -> Self {
        Self {
            error: error.into(),
            overridable,
        }
    }
}

impl fmt::Display for ClaimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

/// Outcome of checking a claim. Failing is a value, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClaimResult {
    pub errors: Vec<ClaimError>,
    pub best_slot: Option<usize>,
    pub override_requested: bool,
}

impl ClaimResult {
    pub fn success(&self) -> bool {
        if self.errors.is_empty() {
            return true;
        }
        self.override_requested && self.errors.iter().all(|e| e.overridable)
    }

    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(|e| e.error.clone()).collect()
    }

    /// First message, used as the outcome text of failed bids.
    pub fn first_message(&self) -> String {
        self.errors
            .first()
            .map(|e| e.error.clone())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClaimGameRequest {
    pub publisher_id: PublisherId,
    pub game_name: String,
    pub counter_pick: bool,
    pub manager_action: bool,
    pub manager_override: bool,
    pub auto_draft: bool,
    pub master_game: Option<MasterGameYear>,
    pub draft_position: Option<u32>,
    pub overall_draft_position: Option<u32>,
    pub bid_amount: Option<u32>,
    /// The game is placed even if no slot it is eligible for is open.
    pub allow_ineligible_slot: bool,
}

impl ClaimGameRequest {
    pub fn new(publisher_id: PublisherId, master_game: MasterGameYear, counter_pick: bool) -> Self {
        Self {
            publisher_id,
            game_name: master_game.master_game.name.clone(),
            counter_pick,
            manager_action: false,
            manager_override: false,
            auto_draft: false,
            master_game: Some(master_game),
            draft_position: None,
            overall_draft_position: None,
            bid_amount: None,
            allow_ineligible_slot: false,
        }
    }

    pub fn is_draft_claim(&self) -> bool {
        self.draft_position.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DraftPhase {
    StandardGames,
    CounterPicks,
    Complete,
}

impl fmt::Display for DraftPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            DraftPhase::StandardGames => "Standard Games",
            DraftPhase::CounterPicks => "Counter Picks",
            DraftPhase::Complete => "Complete",
        };
        write!(f, "{}", text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftStatus {
    pub phase: DraftPhase,
    /// Pick number within the current phase, starting at 1.
    pub draft_position: u32,
    /// Pick number across both phases, starting at 1.
    pub overall_draft_position: u32,
}
