//! Batch processing of pickup bids, drop requests and special auctions.

use super::{finished_years, Repository};
use crate::cli::types::ids::{AuctionId, MasterGameId};
use crate::cli::types::time::{LeagueYearKey, Year};
use crate::core::Clock;
use crate::domain::{
    ActionProcessingResults, ActionProcessingSetMetadata, DropRequest, LeagueYear, PickupBid,
    SpecialAuction,
};
use crate::engine::processing::{process_league_year, process_special_auction};
use crate::error::{FantasyCriticError, Result};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

pub const REGULAR_PROCESS_NAME: &str = "Regular Action Processing";
pub const SPECIAL_AUCTION_PROCESS_NAME: &str = "Special Auction Processing";

/// What one processing run did.
#[derive(Debug, Clone, Serialize)]
pub struct ActionProcessingSummary {
    pub metadata: ActionProcessingSetMetadata,
    pub league_years: usize,
    pub success_bids: usize,
    pub failed_bids: usize,
    pub success_drops: usize,
    pub failed_drops: usize,
}

impl ActionProcessingSummary {
    fn new(
        metadata: ActionProcessingSetMetadata,
        league_years: usize,
        results: &ActionProcessingResults,
    ) -> Self {
        Self {
            metadata,
            league_years,
            success_bids: results.success_bids.len(),
            failed_bids: results.failed_bids.len(),
            success_drops: results.success_drops.len(),
            failed_drops: results.failed_drops.len(),
        }
    }
}

/// One league season's pending actions.
struct ProcessingInput {
    league_year: LeagueYear,
    bids: Vec<PickupBid>,
    drops: Vec<DropRequest>,
}

pub struct ActionProcessingService<'a, R: Repository> {
    repo: &'a mut R,
    clock: &'a dyn Clock,
}

impl<'a, R: Repository> ActionProcessingService<'a, R> {
    pub fn new(repo: &'a mut R, clock: &'a dyn Clock) -> Self {
        Self { repo, clock }
    }

    /// Run `work` with the site read-only. The flag is cleared even when `work` fails.
    fn read_only<T>(&mut self, work: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.repo.get_system_wide_settings()?.action_processing_mode {
            return Err(FantasyCriticError::validation(
                "Action processing is already running.",
            ));
        }
        self.repo.set_action_processing_mode(true)?;
        let outcome = work(self);
        let reset = self.repo.set_action_processing_mode(false);
        let value = outcome?;
        reset?;
        Ok(value)
    }

    /// Process every league of `year`. The site is read-only for the duration.
    pub fn process_actions(&mut self, year: Year) -> Result<ActionProcessingSummary> {
        self.read_only(|service| service.run_processing(year))
    }

    fn run_processing(&mut self, year: Year) -> Result<ActionProcessingSummary> {
        if finished_years(&*self.repo)?.contains(&year) {
            return Err(FantasyCriticError::validation(
                "That year is already finished.",
            ));
        }
        let now = self.clock.now();
        let values = self.repo.get_system_wide_values()?;

        // Bids on a game with an open special auction wait for that auction.
        let auctioned: HashSet<(LeagueYearKey, MasterGameId)> = self
            .repo
            .get_special_auctions(year)?
            .into_iter()
            .filter(|a| !a.processed)
            .map(|a| (a.league_year_key, a.master_game.id()))
            .collect();

        let mut inputs = Vec::new();
        for league_year in self.repo.get_league_years(year)? {
            if !league_year.play_status.draft_finished() {
                continue;
            }
            let key = league_year.key();
            let bids = self
                .repo
                .get_active_pickup_bids(key)?
                .into_iter()
                .filter(|b| !auctioned.contains(&(key, b.master_game_id())))
                .collect();
            let drops = self.repo.get_active_drop_requests(key)?;
            inputs.push(ProcessingInput {
                league_year,
                bids,
                drops,
            });
        }

        let combined = inputs
            .par_iter()
            .map(|input| {
                process_league_year(&input.league_year, &input.bids, &input.drops, &values, now)
            })
            .reduce(
                ActionProcessingResults::default,
                ActionProcessingResults::combine,
            );

        let metadata = ActionProcessingSetMetadata::new(now, REGULAR_PROCESS_NAME);
        self.repo.save_processing_results(&metadata, &combined, &[])?;
        let summary = ActionProcessingSummary::new(metadata, inputs.len(), &combined);
        tracing::info!(
            %year,
            league_years = summary.league_years,
            success_bids = summary.success_bids,
            failed_bids = summary.failed_bids,
            success_drops = summary.success_drops,
            failed_drops = summary.failed_drops,
            "Action processing complete"
        );
        Ok(summary)
    }

    /// Settle every special auction whose end time has passed. `None` when nothing was due.
    ///
    /// Shares the read-only guard with [`Self::process_actions`], so the two never overlap.
    pub fn process_special_auctions(
        &mut self,
        year: Year,
    ) -> Result<Option<ActionProcessingSummary>> {
        self.read_only(|service| service.run_special_auctions(year))
    }

    fn run_special_auctions(&mut self, year: Year) -> Result<Option<ActionProcessingSummary>> {
        let now = self.clock.now();
        let mut due: BTreeMap<LeagueYearKey, Vec<SpecialAuction>> = BTreeMap::new();
        for auction in self.repo.get_special_auctions(year)? {
            if !auction.processed && auction.is_locked(now) {
                due.entry(auction.league_year_key).or_default().push(auction);
            }
        }
        if due.is_empty() {
            return Ok(None);
        }

        let values = self.repo.get_system_wide_values()?;
        let mut combined = ActionProcessingResults::default();
        let mut processed: Vec<AuctionId> = Vec::new();
        let league_years = due.len();
        for (key, mut auctions) in due {
            let Some(mut league_year) = self.repo.get_league_year(key)? else {
                tracing::warn!(%key, "Special auction for a missing league year");
                continue;
            };
            let bids = self.repo.get_active_pickup_bids(key)?;
            auctions.sort_by_key(|a| (a.scheduled_end_time, a.id));
            for auction in auctions {
                let results =
                    process_special_auction(&league_year, &auction, &bids, &values, now);
                for publisher in results.updated_publishers.values() {
                    if let Some(existing) = league_year.publisher_by_id_mut(publisher.id) {
                        *existing = publisher.clone();
                    }
                }
                tracing::info!(
                    auction = %auction.id,
                    game = %auction.master_game.master_game.name,
                    winners = results.success_bids.len(),
                    "Special auction processed"
                );
                processed.push(auction.id);
                combined = combined.combine(results);
            }
        }

        let metadata = ActionProcessingSetMetadata::new(now, SPECIAL_AUCTION_PROCESS_NAME);
        self.repo.save_processing_results(&metadata, &combined, &processed)?;
        Ok(Some(ActionProcessingSummary::new(
            metadata,
            league_years,
            &combined,
        )))
    }

    pub fn processing_sets(&self) -> Result<Vec<ActionProcessingSetMetadata>> {
        Ok(self.repo.get_action_processing_sets()?)
    }
}
