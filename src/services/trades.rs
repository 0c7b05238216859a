//! Trade lifecycle: propose, respond, rescind and manager decisions.

use super::{
    ensure_writable, finished_years, require_league_year, require_manager,
    require_owned_publisher, Repository,
};
use crate::cli::types::ids::{PublisherGameId, PublisherId, TradeId, UserId};
use crate::cli::types::time::LeagueYearKey;
use crate::core::Clock;
use crate::domain::{LeagueYear, Trade, TradeStatus};
use crate::engine::trades::{execute, validate_proposal};
use crate::error::{FantasyCriticError, Result};
use crate::storage::LeagueChanges;
use std::collections::HashSet;

/// The terms a proposer offers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeProposal {
    pub proposer: PublisherId,
    pub counter_party: PublisherId,
    pub proposer_games: Vec<PublisherGameId>,
    pub counter_party_games: Vec<PublisherGameId>,
    pub proposer_budget_send: u32,
    pub counter_party_budget_send: u32,
    pub message: String,
}

pub struct TradeService<'a, R: Repository> {
    repo: &'a mut R,
    clock: &'a dyn Clock,
}

impl<'a, R: Repository> TradeService<'a, R> {
    pub fn new(repo: &'a mut R, clock: &'a dyn Clock) -> Self {
        Self { repo, clock }
    }

    fn tradeable_league_year(&self, key: LeagueYearKey) -> Result<LeagueYear> {
        ensure_writable(&*self.repo)?;
        let league_year = require_league_year(&*self.repo, key)?;
        if !league_year.play_status.draft_finished() {
            return Err(FantasyCriticError::validation(
                "You can't trade until the draft is complete.",
            ));
        }
        if league_year.is_finished(&finished_years(&*self.repo)?) {
            return Err(FantasyCriticError::validation(
                "You cannot trade in a year that is finished.",
            ));
        }
        Ok(league_year)
    }

    fn require_trade(&self, key: LeagueYearKey, id: TradeId) -> Result<Trade> {
        self.repo
            .get_trade(id)?
            .filter(|t| t.league_year_key == key)
            .ok_or_else(|| FantasyCriticError::not_found("Trade", id))
    }

    pub fn propose_trade(
        &mut self,
        user: UserId,
        key: LeagueYearKey,
        proposal: &TradeProposal,
    ) -> Result<Trade> {
        let league_year = self.tradeable_league_year(key)?;
        let proposer = require_owned_publisher(&league_year, proposal.proposer, user)?;
        let trade = Trade {
            id: TradeId::new_v4(),
            league_year_key: key,
            proposer: proposer.id,
            counter_party: proposal.counter_party,
            proposer_games: proposal.proposer_games.clone(),
            counter_party_games: proposal.counter_party_games.clone(),
            proposer_budget_send: proposal.proposer_budget_send,
            counter_party_budget_send: proposal.counter_party_budget_send,
            message: proposal.message.trim().to_string(),
            proposed_timestamp: self.clock.now(),
            accepted_timestamp: None,
            completed_timestamp: None,
            status: TradeStatus::Proposed,
        };
        validate_proposal(&league_year, &trade, &self.active_trades(key)?)?;
        self.repo.save_trade(&trade)?;
        tracing::info!(trade = %trade.id, proposer = %proposer.name, "Trade proposed");
        Ok(trade)
    }

    fn respond(
        &mut self,
        key: LeagueYearKey,
        id: TradeId,
        status: TradeStatus,
        authorize: impl FnOnce(&LeagueYear, &Trade) -> Result<()>,
    ) -> Result<Trade> {
        let league_year = self.tradeable_league_year(key)?;
        let trade = self.require_trade(key, id)?;
        authorize(&league_year, &trade)?;
        let updated = trade.with_status(status, self.clock.now());
        self.repo.save_trade(&updated)?;
        tracing::info!(trade = %id, status = %status, "Trade updated");
        Ok(updated)
    }

    pub fn accept_trade(&mut self, user: UserId, key: LeagueYearKey, id: TradeId) -> Result<Trade> {
        self.respond(key, id, TradeStatus::Accepted, |league_year, trade| {
            require_owned_publisher(league_year, trade.counter_party, user)?;
            if trade.status != TradeStatus::Proposed {
                return Err(FantasyCriticError::validation(
                    "That trade is not waiting on your response.",
                ));
            }
            Ok(())
        })
    }

    pub fn reject_trade(&mut self, user: UserId, key: LeagueYearKey, id: TradeId) -> Result<Trade> {
        self.respond(key, id, TradeStatus::RejectedByCounterParty, |league_year, trade| {
            require_owned_publisher(league_year, trade.counter_party, user)?;
            require_active(trade)
        })
    }

    pub fn rescind_trade(
        &mut self,
        user: UserId,
        key: LeagueYearKey,
        id: TradeId,
    ) -> Result<Trade> {
        self.respond(key, id, TradeStatus::Rescinded, |league_year, trade| {
            require_owned_publisher(league_year, trade.proposer, user)?;
            require_active(trade)
        })
    }

    pub fn manager_reject_trade(
        &mut self,
        manager: UserId,
        key: LeagueYearKey,
        id: TradeId,
    ) -> Result<Trade> {
        self.respond(key, id, TradeStatus::RejectedByManager, |league_year, trade| {
            require_manager(&league_year.league, manager)?;
            require_active(trade)
        })
    }

    /// Apply an accepted trade. Other trades, bids and drops that depended on the moved
    /// games are cancelled with it.
    pub fn manager_execute_trade(
        &mut self,
        manager: UserId,
        key: LeagueYearKey,
        id: TradeId,
    ) -> Result<Trade> {
        let league_year = self.tradeable_league_year(key)?;
        require_manager(&league_year.league, manager)?;
        let trade = self.require_trade(key, id)?;
        if trade.status != TradeStatus::Accepted {
            return Err(FantasyCriticError::validation(
                "Only accepted trades can be executed.",
            ));
        }

        let now = self.clock.now();
        let execution = execute(&league_year, &trade, now)?;
        let executed = trade.with_status(TradeStatus::Executed, now);

        let moved: HashSet<PublisherGameId> = trade
            .proposer_games
            .iter()
            .chain(&trade.counter_party_games)
            .copied()
            .collect();
        let moved_master_games: HashSet<_> = execution
            .removed_games
            .iter()
            .filter_map(|g| g.master_game_id())
            .collect();

        let mut changes = LeagueChanges::new()
            .with_publishers(&execution.updated_publishers)
            .with_actions(execution.league_actions)
            .with_trade(&executed);
        for other in self.active_trades(key)? {
            if other.id != trade.id && moved.iter().any(|g| other.involves_game(*g)) {
                changes = changes.with_trade(&other.with_status(TradeStatus::Rescinded, now));
            }
        }
        changes.cancelled_bids = self
            .repo
            .get_active_pickup_bids(key)?
            .into_iter()
            .filter(|b| b.conditional_drop.is_some_and(|g| moved.contains(&g)))
            .map(|b| b.id)
            .collect();
        changes.cancelled_drops = self
            .repo
            .get_active_drop_requests(key)?
            .into_iter()
            .filter(|d| trade.involves_publisher(d.publisher_id))
            .filter(|d| moved_master_games.contains(&d.master_game.id()))
            .map(|d| d.id)
            .collect();

        self.repo.commit_league_changes(&changes)?;
        Ok(executed)
    }

    pub fn active_trades(&self, key: LeagueYearKey) -> Result<Vec<Trade>> {
        Ok(self
            .repo
            .get_trades(key)?
            .into_iter()
            .filter(|t| t.status.is_active())
            .collect())
    }

    pub fn trades(&self, key: LeagueYearKey) -> Result<Vec<Trade>> {
        Ok(self.repo.get_trades(key)?)
    }
}

fn require_active(trade: &Trade) -> Result<()> {
    if trade.status.is_active() {
        Ok(())
    } else {
        Err(FantasyCriticError::validation(
            "That trade is no longer active.",
        ))
    }
}
