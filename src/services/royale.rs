//! Royale: quarterly, league-less play with a dollar budget.
//!
//! Purchases, sales and advertising changes run one at a time across the process so
//! two requests cannot spend the same budget.

use super::{require_master_game_year, require_non_blank, Repository};
use crate::cli::types::ids::{MasterGameId, PublisherId, UserId};
use crate::cli::types::time::YearQuarter;
use crate::core::Clock;
use crate::domain::royale::{
    FUTURE_RELEASE_LIMIT_DAYS, MAX_ADVERTISING_MONEY, MAX_GAMES,
};
use crate::domain::{
    MasterGameYear, RoyalePublisher, RoyalePublisherGame, RoyaleStanding, RoyaleYearQuarter,
    ScoringSystem,
};
use crate::engine::eligibility::royale_eligible;
use crate::error::{FantasyCriticError, Result};
use chrono::{Duration, NaiveDate};
use rayon::prelude::*;
use rust_decimal::{Decimal, RoundingStrategy};
use std::cmp::Ordering;
use std::sync::{Mutex, MutexGuard};

static ROYALE_LOCK: Mutex<()> = Mutex::new(());

fn royale_lock() -> MutexGuard<'static, ()> {
    ROYALE_LOCK
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn invalid(message: &str) -> FantasyCriticError {
    FantasyCriticError::validation(message)
}

pub struct RoyaleService<'a, R: Repository> {
    repo: &'a mut R,
    clock: &'a dyn Clock,
}

impl<'a, R: Repository> RoyaleService<'a, R> {
    pub fn new(repo: &'a mut R, clock: &'a dyn Clock) -> Self {
        Self { repo, clock }
    }

    pub fn quarters(&self) -> Result<Vec<RoyaleYearQuarter>> {
        Ok(self.repo.get_royale_quarters()?)
    }

    /// The latest quarter that is open and unfinished.
    pub fn active_quarter(&self) -> Result<RoyaleYearQuarter> {
        self.quarters()?
            .into_iter()
            .filter(|q| q.open_for_play && !q.finished)
            .max_by_key(|q| q.year_quarter)
            .ok_or_else(|| FantasyCriticError::not_found("Royale quarter", "active"))
    }

    fn require_quarter(&self, year_quarter: YearQuarter) -> Result<RoyaleYearQuarter> {
        self.quarters()?
            .into_iter()
            .find(|q| q.year_quarter == year_quarter)
            .ok_or_else(|| {
                FantasyCriticError::not_found("Royale quarter", year_quarter)
            })
    }

    fn require_playable_quarter(&self, year_quarter: YearQuarter) -> Result<RoyaleYearQuarter> {
        let quarter = self.require_quarter(year_quarter)?;
        if !quarter.open_for_play || quarter.finished {
            return Err(invalid("That quarter is not open for play."));
        }
        Ok(quarter)
    }

    fn require_owned(&self, user: UserId, publisher_id: PublisherId) -> Result<RoyalePublisher> {
        let publisher = self
            .repo
            .get_royale_publisher(publisher_id)?
            .ok_or_else(|| {
                FantasyCriticError::not_found("Royale publisher", publisher_id)
            })?;
        if publisher.user != user {
            return Err(FantasyCriticError::forbidden(
                "You do not own that publisher.",
            ));
        }
        Ok(publisher)
    }

    pub fn publisher(&self, publisher_id: PublisherId) -> Result<RoyalePublisher> {
        self.repo
            .get_royale_publisher(publisher_id)?
            .ok_or_else(|| {
                FantasyCriticError::not_found("Royale publisher", publisher_id)
            })
    }

    pub fn publisher_for_user(
        &self,
        year_quarter: YearQuarter,
        user: UserId,
    ) -> Result<Option<RoyalePublisher>> {
        Ok(self.repo.get_royale_publisher_for_user(year_quarter, user)?)
    }

    pub fn create_publisher(
        &mut self,
        user: UserId,
        year_quarter: YearQuarter,
        name: &str,
    ) -> Result<RoyalePublisher> {
        let name = require_non_blank(name, "You cannot have a blank publisher name.")?;
        self.require_playable_quarter(year_quarter)?;
        if self.repo.get_user(user)?.is_none() {
            return Err(FantasyCriticError::not_found("User", user));
        }
        if self.publisher_for_user(year_quarter, user)?.is_some() {
            return Err(invalid(
                "You already have a Royale publisher for this quarter.",
            ));
        }
        let publisher = RoyalePublisher::new(year_quarter, user, &name);
        self.repo.save_royale_publisher(&publisher)?;
        tracing::info!(
            publisher = %publisher.name,
            quarter = %year_quarter,
            "Created Royale publisher"
        );
        Ok(publisher)
    }

    fn update_owned(
        &mut self,
        user: UserId,
        publisher_id: PublisherId,
        update: impl FnOnce(&mut RoyalePublisher),
    ) -> Result<RoyalePublisher> {
        let mut publisher = self.require_owned(user, publisher_id)?;
        update(&mut publisher);
        self.repo.save_royale_publisher(&publisher)?;
        Ok(publisher)
    }

    pub fn change_publisher_name(
        &mut self,
        user: UserId,
        publisher_id: PublisherId,
        name: &str,
    ) -> Result<RoyalePublisher> {
        let name = require_non_blank(name, "You cannot have a blank publisher name.")?;
        self.update_owned(user, publisher_id, |p| p.name = name)
    }

    pub fn change_publisher_icon(
        &mut self,
        user: UserId,
        publisher_id: PublisherId,
        icon: Option<String>,
    ) -> Result<RoyalePublisher> {
        let icon = icon.filter(|i| !i.trim().is_empty());
        self.update_owned(user, publisher_id, |p| p.icon = icon)
    }

    pub fn change_publisher_slogan(
        &mut self,
        user: UserId,
        publisher_id: PublisherId,
        slogan: Option<String>,
    ) -> Result<RoyalePublisher> {
        let slogan = slogan
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        self.update_owned(user, publisher_id, |p| p.slogan = slogan)
    }

    pub fn purchase_game(
        &mut self,
        user: UserId,
        publisher_id: PublisherId,
        master_game_id: MasterGameId,
    ) -> Result<RoyalePublisher> {
        let _guard = royale_lock();
        let mut publisher = self.require_owned(user, publisher_id)?;
        let year_quarter = publisher.year_quarter;
        let quarter = self.require_playable_quarter(year_quarter)?;
        let master_game = require_master_game_year(&*self.repo, master_game_id, year_quarter.year)?;
        let today = self.clock.today();
        let game = &master_game.master_game;

        if publisher.games.len() >= MAX_GAMES {
            return Err(invalid("Roster is full."));
        }
        if publisher.game(master_game_id).is_some() {
            return Err(invalid("Publisher already has that game."));
        }
        if !master_game.will_release_in_quarter(year_quarter) {
            return Err(invalid("Game will not release this quarter."));
        }
        if game.is_released(today) {
            return Err(invalid("Game has been released."));
        }
        let limit = today + Duration::days(FUTURE_RELEASE_LIMIT_DAYS);
        if quarter.has_release_date_limit && game.release_date.is_some_and(|d| d <= limit) {
            return Err(invalid("Game will release within 5 days."));
        }
        if game.critic_score.is_some() {
            return Err(invalid("Game has a score."));
        }
        if game.has_any_reviews {
            return Err(invalid("That game already has reviews."));
        }
        if !royale_eligible(game) {
            return Err(invalid("Game is not eligible under Royale rules."));
        }
        let cost = master_game.royale_game_cost();
        if cost > publisher.budget {
            return Err(invalid("Not enough budget."));
        }

        let name = game.name.clone();
        publisher.budget -= cost;
        publisher.games.push(RoyalePublisherGame {
            publisher_id,
            year_quarter,
            master_game,
            timestamp: self.clock.now(),
            amount_spent: cost,
            advertising_money: Decimal::ZERO,
            fantasy_points: None,
        });
        self.repo.save_royale_publisher(&publisher)?;
        tracing::info!(publisher = %publisher.name, game = %name, %cost, "Royale purchase");
        Ok(publisher)
    }

    /// The publisher's copy of a game that can still be sold or advertised.
    fn unreleased_game<'p>(
        publisher: &'p mut RoyalePublisher,
        master_game_id: MasterGameId,
        today: NaiveDate,
    ) -> Result<&'p mut RoyalePublisherGame> {
        let game = publisher
            .games
            .iter_mut()
            .find(|g| g.master_game_id() == master_game_id)
            .ok_or_else(|| invalid("You don't have that game."))?;
        let master_game = &game.master_game.master_game;
        if master_game.is_released(today) {
            return Err(invalid("That game has already been released."));
        }
        if master_game.critic_score.is_some() {
            return Err(invalid("That game already has a score."));
        }
        Ok(game)
    }

    /// Sell back for half of what was spent, or all of it if the game became ineligible.
    pub fn sell_game(
        &mut self,
        user: UserId,
        publisher_id: PublisherId,
        master_game_id: MasterGameId,
    ) -> Result<RoyalePublisher> {
        let _guard = royale_lock();
        let mut publisher = self.require_owned(user, publisher_id)?;
        self.require_playable_quarter(publisher.year_quarter)?;
        let today = self.clock.today();
        let refund = Self::unreleased_game(&mut publisher, master_game_id, today)?.refund_amount();

        publisher.budget += refund;
        publisher.games.retain(|g| g.master_game_id() != master_game_id);
        self.repo.save_royale_publisher(&publisher)?;
        tracing::info!(publisher = %publisher.name, game = %master_game_id, %refund, "Royale sale");
        Ok(publisher)
    }

    /// Amounts are truncated to whole cents.
    pub fn set_advertising_money(
        &mut self,
        user: UserId,
        publisher_id: PublisherId,
        master_game_id: MasterGameId,
        amount: Decimal,
    ) -> Result<RoyalePublisher> {
        let _guard = royale_lock();
        let amount = amount.round_dp_with_strategy(2, RoundingStrategy::ToZero);
        let mut publisher = self.require_owned(user, publisher_id)?;
        self.require_playable_quarter(publisher.year_quarter)?;
        let today = self.clock.today();
        let budget = publisher.budget;

        let game = Self::unreleased_game(&mut publisher, master_game_id, today)?;
        let available = budget + game.advertising_money;
        if amount > available {
            return Err(invalid("You don't have enough money."));
        }
        if amount < Decimal::ZERO {
            return Err(invalid(
                "You can't allocate negative dollars in advertising money.",
            ));
        }
        if amount > MAX_ADVERTISING_MONEY {
            return Err(invalid(
                "You can't allocate more than 10 dollars in advertising money.",
            ));
        }
        game.advertising_money = amount;
        publisher.budget = available - amount;
        self.repo.save_royale_publisher(&publisher)?;
        Ok(publisher)
    }

    /// Games that can still be bought this quarter, best projection first.
    pub fn master_games_for_quarter(
        &self,
        year_quarter: YearQuarter,
    ) -> Result<Vec<MasterGameYear>> {
        let first = year_quarter.first_date();
        let mut games: Vec<MasterGameYear> = self
            .repo
            .get_master_game_years(year_quarter.year)?
            .into_iter()
            .filter(|g| g.will_release_in_quarter(year_quarter))
            .filter(|g| g.master_game.release_date.map_or(true, |d| d >= first))
            .collect();
        let projected =
            |g: &MasterGameYear| g.projected_fantasy_points(ScoringSystem::Diminishing, false);
        games.sort_by(|a, b| {
            projected(b)
                .partial_cmp(&projected(a))
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.master_game.name.cmp(&b.master_game.name))
        });
        Ok(games)
    }

    /// Recompute every game's points for the quarter. Returns the number of publishers updated.
    pub fn update_fantasy_points(&mut self, year_quarter: YearQuarter) -> Result<usize> {
        let today = self.clock.today();
        let mut publishers = self.repo.get_royale_publishers(year_quarter)?;
        publishers.par_iter_mut().for_each(|publisher| {
            for game in &mut publisher.games {
                game.fantasy_points = game.calculate_fantasy_points(today);
            }
        });
        self.repo.save_royale_fantasy_points(&publishers)?;
        tracing::info!(
            quarter = %year_quarter,
            publishers = publishers.len(),
            "Updated Royale fantasy points"
        );
        Ok(publishers.len())
    }

    /// Highest total first. Only publishers above zero are ranked.
    pub fn standings(&self, year_quarter: YearQuarter) -> Result<Vec<RoyaleStanding>> {
        let mut publishers = self.repo.get_royale_publishers(year_quarter)?;
        publishers.sort_by(|a, b| {
            b.total_fantasy_points()
                .partial_cmp(&a.total_fantasy_points())
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(publishers
            .into_iter()
            .enumerate()
            .map(|(index, p)| {
                let total = p.total_fantasy_points();
                RoyaleStanding {
                    ranking: (total > 0.0).then_some(index + 1),
                    publisher_id: p.id,
                    user: p.user,
                    name: p.name,
                    total_fantasy_points: total,
                }
            })
            .collect())
    }

    pub fn quarters_won_by_user(&self, user: UserId) -> Result<Vec<RoyaleYearQuarter>> {
        Ok(self
            .quarters()?
            .into_iter()
            .filter(|q| q.winning_user == Some(user))
            .collect())
    }

    pub fn winners(&self) -> Result<Vec<RoyaleYearQuarter>> {
        Ok(self
            .quarters()?
            .into_iter()
            .filter(|q| q.finished && q.winning_user.is_some())
            .collect())
    }

    pub fn start_new_quarter(&mut self, year_quarter: YearQuarter) -> Result<RoyaleYearQuarter> {
        if self.require_quarter(year_quarter).is_ok() {
            return Err(invalid("That quarter already exists."));
        }
        let quarter = RoyaleYearQuarter::new(year_quarter);
        self.repo.save_royale_quarter(&quarter)?;
        tracing::info!(quarter = %year_quarter, "Started Royale quarter");
        Ok(quarter)
    }

    /// Final points update, then record the top ranked publisher's user as the winner.
    pub fn finish_quarter(&mut self, year_quarter: YearQuarter) -> Result<RoyaleYearQuarter> {
        let mut quarter = self.require_quarter(year_quarter)?;
        if quarter.finished {
            return Err(invalid("That quarter is already finished."));
        }
        self.update_fantasy_points(year_quarter)?;
        quarter.winning_user = self
            .standings(year_quarter)?
            .into_iter()
            .find(|s| s.ranking == Some(1))
            .map(|s| s.user);
        quarter.finished = true;
        self.repo.save_royale_quarter(&quarter)?;
        tracing::info!(
            quarter = %year_quarter,
            winner = ?quarter.winning_user,
            "Finished Royale quarter"
        );
        Ok(quarter)
    }
}
