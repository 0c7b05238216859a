//! Royale: the league-less quarterly mode.

use crate::cli::types::ids::{MasterGameId, PublisherId, UserId};
use crate::cli::types::time::YearQuarter;
use crate::domain::master_game::{tag_names, MasterGameYear};
use crate::domain::scoring::ScoringSystem;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const ROYALE_STARTING_BUDGET: Decimal = Decimal::ONE_HUNDRED;
pub const MAX_GAMES: usize = 25;
pub const FUTURE_RELEASE_LIMIT_DAYS: i64 = 5;
pub const MAX_ADVERTISING_MONEY: Decimal = Decimal::TEN;

const ADVERTISING_BONUS_PER_DOLLAR: f64 = 0.05;

/// Games carrying any of these tags cannot be bought and score nothing.
pub const ROYALE_BANNED_TAGS: [&str; 10] = [
    tag_names::PORT,
    tag_names::REMASTER,
    tag_names::REIMAGINING,
    tag_names::DIRECTORS_CUT,
    tag_names::EXPANSION_PACK,
    tag_names::YEARLY_INSTALLMENT,
    tag_names::PARTIAL_REMAKE,
    tag_names::RELEASED_INTERNATIONALLY,
    tag_names::CURRENTLY_IN_EARLY_ACCESS,
    tag_names::FREE_TO_PLAY,
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoyaleYearQuarter {
    pub year_quarter: YearQuarter,
    pub open_for_play: bool,
    pub finished: bool,
    pub has_release_date_limit: bool,
    pub winning_user: Option<UserId>,
}

impl RoyaleYearQuarter {
    pub fn new(year_quarter: YearQuarter) -> Self {
        Self {
            year_quarter,
            open_for_play: true,
            finished: false,
            has_release_date_limit: true,
            winning_user: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoyalePublisherGame {
    pub publisher_id: PublisherId,
    pub year_quarter: YearQuarter,
    pub master_game: MasterGameYear,
    pub timestamp: DateTime<Utc>,
    pub amount_spent: Decimal,
    pub advertising_money: Decimal,
    pub fantasy_points: Option<f64>,
}

impl RoyalePublisherGame {
    pub fn master_game_id(&self) -> MasterGameId {
        self.master_game.id()
    }

    pub fn is_currently_ineligible(&self) -> bool {
        ROYALE_BANNED_TAGS
            .iter()
            .any(|tag| self.master_game.master_game.has_tag(tag))
    }

    pub fn calculate_fantasy_points(&self, today: NaiveDate) -> Option<f64> {
        if self.is_currently_ineligible() {
            return Some(0.0);
        }
        let game = &self.master_game.master_game;
        let release_date = game.release_date?;
        if !self.year_quarter.contains(release_date) {
            return Some(0.0);
        }
        if release_date > today {
            return None;
        }
        let score = game.critic_score?;

        let points = ScoringSystem::Diminishing.points_for_score(score, false);
        if points <= 0.0 {
            return Some(points);
        }
        let advertising = self.advertising_money.to_f64().unwrap_or(0.0);
        Some(points * (1.0 + ADVERTISING_BONUS_PER_DOLLAR * advertising))
    }

    /// Money returned on sale: everything when the game became ineligible, half otherwise.
    pub fn refund_amount(&self) -> Decimal {
        let spent = self.amount_spent + self.advertising_money;
        if self.is_currently_ineligible() {
            spent
        } else {
            (spent / Decimal::TWO).round_dp(2)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoyalePublisher {
    pub id: PublisherId,
    pub year_quarter: YearQuarter,
    pub user: UserId,
    pub name: String,
    pub icon: Option<String>,
    pub slogan: Option<String>,
    pub games: Vec<RoyalePublisherGame>,
    pub budget: Decimal,
}

impl RoyalePublisher {
    pub fn new(year_quarter: YearQuarter, user: UserId, name: &str) -> Self {
        Self {
            id: PublisherId::new_v4(),
            year_quarter,
            user,
            name: name.to_string(),
            icon: None,
            slogan: None,
            games: Vec::new(),
            budget: ROYALE_STARTING_BUDGET,
        }
    }

    pub fn total_fantasy_points(&self) -> f64 {
        self.games.iter().filter_map(|g| g.fantasy_points).sum()
    }

    pub fn game(&self, master_game_id: MasterGameId) -> Option<&RoyalePublisherGame> {
        self.games
            .iter()
            .find(|g| g.master_game_id() == master_game_id)
    }
}

/// One row of the quarter standings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoyaleStanding {
    pub ranking: Option<usize>,
    pub publisher_id: PublisherId,
    pub user: UserId,
    pub name: String,
    pub total_fantasy_points: f64,
}
