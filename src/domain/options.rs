//! League rule configuration.

use crate::cli::types::time::Year;
use crate::domain::scoring::ScoringSystem;
use crate::error::{FantasyCriticError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Droppable-game counts use this to mean "no limit".
pub const UNLIMITED_DROPS: i32 = -1;

const MAX_STANDARD_GAMES: usize = 50;
const MAX_COUNTER_PICKS: usize = 20;

macro_rules! string_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = FantasyCriticError;

            fn from_str(s: &str) -> Result<Self> {
                $(if s.eq_ignore_ascii_case($text) {
                    return Ok($name::$variant);
                })+
                Err(FantasyCriticError::validation(format!(
                    "Unknown {}: {}",
                    stringify!($name),
                    s
                )))
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DraftSystem {
    #[default]
    Flexible,
}

string_enum!(DraftSystem { Flexible => "Flexible" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PickupSystem {
    SecretBidding,
    #[default]
    SemiPublicBidding,
    PublicBidding,
}

string_enum!(PickupSystem {
    SecretBidding => "SecretBidding",
    SemiPublicBidding => "SemiPublicBidding",
    PublicBidding => "PublicBidding",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TradingSystem {
    NoTrades,
    #[default]
    Standard,
}

string_enum!(TradingSystem {
    NoTrades => "NoTrades",
    Standard => "Standard",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeagueTagStatus {
    Banned,
    Required,
}

string_enum!(LeagueTagStatus {
    Banned => "Banned",
    Required => "Required",
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeagueTagOption {
    pub tag: String,
    pub status: LeagueTagStatus,
}

impl LeagueTagOption {
    pub fn banned(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            status: LeagueTagStatus::Banned,
        }
    }
}

/// A roster slot that only accepts games carrying one of `tags`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialGameSlot {
    pub overall_slot_number: usize,
    pub tags: Vec<String>,
}

impl SpecialGameSlot {
    pub fn game_fits(&self, game_tags: &[String]) -> bool {
        game_tags.iter().any(|t| self.tags.contains(t))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeagueOptions {
    pub standard_games: usize,
    pub games_to_draft: usize,
    pub counter_picks: usize,
    pub counter_picks_to_draft: usize,
    pub free_droppable_games: i32,
    pub will_not_release_droppable_games: i32,
    pub will_release_droppable_games: i32,
    pub drop_only_draft_games: bool,
    pub counter_picks_block_drops: bool,
    pub minimum_bid_amount: u32,
    pub league_tags: Vec<LeagueTagOption>,
    pub special_game_slots: Vec<SpecialGameSlot>,
    pub draft_system: DraftSystem,
    pub pickup_system: PickupSystem,
    pub scoring_system: ScoringSystem,
    pub trading_system: TradingSystem,
    pub public_league: bool,
}

impl Default for LeagueOptions {
    fn default() -> Self {
        Self {
            standard_games: 12,
            games_to_draft: 6,
            counter_picks: 1,
            counter_picks_to_draft: 1,
            free_droppable_games: 0,
            will_not_release_droppable_games: 1,
            will_release_droppable_games: 1,
            drop_only_draft_games: false,
            counter_picks_block_drops: true,
            minimum_bid_amount: 0,
            league_tags: Vec::new(),
            special_game_slots: Vec::new(),
            draft_system: DraftSystem::Flexible,
            pickup_system: PickupSystem::SemiPublicBidding,
            scoring_system: ScoringSystem::Diminishing,
            trading_system: TradingSystem::Standard,
            public_league: false,
        }
    }
}

impl LeagueOptions {
    pub fn validate(&self) -> Result<()> {
        let fail = |message: &str| Err(FantasyCriticError::validation(message));

        if self.standard_games < 1 {
            return fail("You must have at least one standard game.");
        }
        if self.standard_games > MAX_STANDARD_GAMES {
            return fail("You cannot have more than 50 standard games.");
        }
        if self.games_to_draft < 1 {
            return fail("You must draft at least one game.");
        }
        if self.games_to_draft > self.standard_games {
            return fail("You cannot draft more games than you have standard slots.");
        }
        if self.counter_picks > MAX_COUNTER_PICKS {
            return fail("You cannot have more than 20 counter picks.");
        }
        if self.counter_picks_to_draft > self.counter_picks {
            return fail("You cannot draft more counter picks than you have counter pick slots.");
        }
        if self.counter_picks > self.games_to_draft {
            return fail("You cannot have more counter picks than drafted games.");
        }
        let drop_counts = [
            self.free_droppable_games,
            self.will_not_release_droppable_games,
            self.will_release_droppable_games,
        ];
        if drop_counts.iter().any(|count| *count < UNLIMITED_DROPS) {
            return fail("Droppable game counts cannot be below -1 (unlimited).");
        }

        let mut seen_slots = Vec::with_capacity(self.special_game_slots.len());
        for slot in &self.special_game_slots {
            if slot.overall_slot_number >= self.standard_games {
                return fail("Special game slots must be within the standard game slots.");
            }
            if seen_slots.contains(&slot.overall_slot_number) {
                return fail("Special game slot numbers must be unique.");
            }
            if slot.tags.is_empty() {
                return fail("Special game slots must allow at least one tag.");
            }
            seen_slots.push(slot.overall_slot_number);
        }

        if self
            .league_tags
            .iter()
            .any(|t| t.status == LeagueTagStatus::Required)
        {
            return fail("Impossible options: required tags are not supported.");
        }

        Ok(())
    }

    pub fn banned_tags(&self) -> Vec<String> {
        self.league_tags
            .iter()
            .filter(|t| t.status == LeagueTagStatus::Banned)
            .map(|t| t.tag.clone())
            .collect()
    }

    pub fn has_special_slots(&self) -> bool {
        !self.special_game_slots.is_empty()
    }

    pub fn special_slot_for(&self, overall_slot_number: usize) -> Option<&SpecialGameSlot> {
        self.special_game_slots
            .iter()
            .find(|s| s.overall_slot_number == overall_slot_number)
    }

    /// Options carried into a new season.
    pub fn update_options_for_year(&self, year: Year) -> LeagueOptions {
        let mut options = self.clone();
        if year.supports_2022_features() {
            options.scoring_system = ScoringSystem::Diminishing;
        }
        options
    }

    pub fn unlimited_free_drops(&self) -> bool {
        self.free_droppable_games == UNLIMITED_DROPS
    }

    pub fn unlimited_will_not_release_drops(&self) -> bool {
        self.will_not_release_droppable_games == UNLIMITED_DROPS
    }

    pub fn unlimited_will_release_drops(&self) -> bool {
        self.will_release_droppable_games == UNLIMITED_DROPS
    }
}
