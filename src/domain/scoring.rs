//! Critic score to fantasy point conversion.

use crate::cli::types::time::Year;
use crate::error::{FantasyCriticError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Points charged for every empty counter-pick slot once a 2022+ year is finished.
pub const EMPTY_COUNTER_PICK_PENALTY: f64 = -15.0;
/// Points charged for a counter pick on a game that did not release in the year.
pub const NON_RELEASING_COUNTER_PICK_PENALTY: f64 = -15.0;

const BASELINE_SCORE: f64 = 70.0;
const DIMINISHING_THRESHOLD: f64 = 90.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ScoringSystem {
    Standard,
    #[default]
    Diminishing,
}

impl ScoringSystem {
    pub fn default_for_year(year: Year) -> Self {
        if year.supports_2022_features() {
            ScoringSystem::Diminishing
        } else {
            ScoringSystem::Standard
        }
    }

    /// Fantasy points for a critic score. Counter picks score the negation.
    pub fn points_for_score(&self, critic_score: f64, counter_pick: bool) -> f64 {
        let points = match self {
            ScoringSystem::Standard => critic_score - BASELINE_SCORE,
            ScoringSystem::Diminishing => {
                if critic_score > DIMINISHING_THRESHOLD {
                    let excess = critic_score - DIMINISHING_THRESHOLD;
                    DIMINISHING_THRESHOLD - BASELINE_SCORE + excess / 2.0
                } else {
                    critic_score - BASELINE_SCORE
                }
            }
        };
        if counter_pick {
            -points
        } else {
            points
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScoringSystem::Standard => "Standard",
            ScoringSystem::Diminishing => "Diminishing",
        }
    }
}

impl fmt::Display for ScoringSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ScoringSystem {
    type Err = FantasyCriticError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "standard" => Ok(ScoringSystem::Standard),
            "diminishing" => Ok(ScoringSystem::Diminishing),
            _ => Err(FantasyCriticError::validation(format!(
                "Unknown scoring system: {}",
                s
            ))),
        }
    }
}
