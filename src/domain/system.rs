//! Site-wide settings and reference values.

use crate::cli::types::ids::UserId;
use crate::cli::types::time::Year;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SystemWideSettings {
    /// While set, league mutations are refused.
    pub action_processing_mode: bool,
}

/// Averages used to project empty and unlinked slots.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SystemWideValues {
    pub average_standard_game_points: f64,
    pub average_pickup_only_standard_game_points: f64,
    pub average_counter_pick_points: f64,
}

impl Default for SystemWideValues {
    fn default() -> Self {
        Self {
            average_standard_game_points: 9.0,
            average_pickup_only_standard_game_points: 6.0,
            average_counter_pick_points: -4.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportedYear {
    pub year: Year,
    pub open_for_creation: bool,
    pub open_for_play: bool,
    pub open_for_beta_users: bool,
    pub finished: bool,
}

impl SupportedYear {
    pub fn open(year: Year) -> Self {
        Self {
            year,
            open_for_creation: true,
            open_for_play: true,
            open_for_beta_users: true,
            finished: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SiteCounts {
    pub user_count: u64,
    pub league_count: u64,
    pub master_game_count: u64,
    pub publisher_game_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FantasyCriticUser {
    pub id: UserId,
    pub display_name: String,
}
