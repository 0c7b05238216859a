//! Manager claims, pickup bids, drop requests and special auctions.

use super::{
    ensure_writable, finished_years, require_league_year, require_manager,
    require_master_game_year, require_owned_publisher, Repository,
};
use crate::cli::types::ids::{
    AuctionId, BidId, DropId, MasterGameId, PublisherGameId, PublisherId, UserId,
};
use crate::cli::types::time::LeagueYearKey;
use crate::core::Clock;
use crate::domain::{
    ClaimError, ClaimGameRequest, ClaimResult, DropRequest, LeagueAction, LeagueActionType,
    LeagueYear, PickupBid, Publisher, SpecialAuction,
};
use crate::engine::claims::{apply_claim, claim_errors, drop_error_for_game};
use crate::error::{FantasyCriticError, Result};
use crate::storage::LeagueChanges;
use chrono::{DateTime, Utc};

/// A publisher's bid on a game at the next processing run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BidRequest {
    pub publisher_id: PublisherId,
    pub master_game_id: MasterGameId,
    pub bid_amount: u32,
    pub counter_pick: bool,
    pub conditional_drop: Option<PublisherGameId>,
    pub allow_ineligible_slot: bool,
}

/// A manager adding a game straight onto a roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerClaim {
    pub publisher_id: PublisherId,
    pub master_game_id: Option<MasterGameId>,
    pub game_name: String,
    pub counter_pick: bool,
    pub manager_override: bool,
}

fn require_draft_finished(league_year: &LeagueYear) -> Result<()> {
    if !league_year.play_status.draft_finished() {
        return Err(FantasyCriticError::validation(
            "You can't acquire games until the draft is complete.",
        ));
    }
    Ok(())
}

/// Why a conditional drop cannot back a bid, if anything.
fn conditional_drop_error(
    publisher: &Publisher,
    game_id: PublisherGameId,
    counter_pick: bool,
    league_year: &LeagueYear,
) -> Option<String> {
    if counter_pick {
        return Some("You cannot use a conditional drop with a counter pick bid.".to_string());
    }
    let Some(game) = publisher.game_by_id(game_id) else {
        return Some("That conditional drop game is not on your roster.".to_string());
    };
    drop_error_for_game(publisher, game, league_year)
        .map(|e| format!("Conditional drop error: {}", e))
}

/// The league as it would look with `dropped` gone from the publisher.
fn without_game(
    league_year: &LeagueYear,
    publisher_id: PublisherId,
    dropped: Option<PublisherGameId>,
) -> LeagueYear {
    let mut view = league_year.clone();
    if let Some(dropped) = dropped {
        if let Some(publisher) = view.publisher_by_id_mut(publisher_id) {
            publisher.games.retain(|g| g.id != dropped);
        }
    }
    view
}

pub struct GameAcquisitionService<'a, R: Repository> {
    repo: &'a mut R,
    clock: &'a dyn Clock,
}

impl<'a, R: Repository> GameAcquisitionService<'a, R> {
    pub fn new(repo: &'a mut R, clock: &'a dyn Clock) -> Self {
        Self { repo, clock }
    }

    fn playable_league_year(&self, key: LeagueYearKey) -> Result<LeagueYear> {
        ensure_writable(&*self.repo)?;
        let league_year = require_league_year(&*self.repo, key)?;
        require_draft_finished(&league_year)?;
        if league_year.is_finished(&finished_years(&*self.repo)?) {
            return Err(FantasyCriticError::validation(
                "That year is already finished.",
            ));
        }
        Ok(league_year)
    }

    pub fn claim_game(
        &mut self,
        manager: UserId,
        key: LeagueYearKey,
        claim: &ManagerClaim,
    ) -> Result<ClaimResult> {
        let mut league_year = self.playable_league_year(key)?;
        require_manager(&league_year.league, manager)?;
        let master_game = claim
            .master_game_id
            .map(|id| require_master_game_year(&*self.repo, id, key.year))
            .transpose()?;
        let game_name = match &master_game {
            Some(game) => game.master_game.name.clone(),
            None => claim.game_name.trim().to_string(),
        };
        let request = ClaimGameRequest {
            publisher_id: claim.publisher_id,
            game_name,
            counter_pick: claim.counter_pick,
            manager_action: true,
            manager_override: claim.manager_override,
            auto_draft: false,
            master_game,
            draft_position: None,
            overall_draft_position: None,
            bid_amount: None,
            allow_ineligible_slot: false,
        };

        let now = self.clock.now();
        let result = claim_errors(&request, &league_year, now.date_naive());
        if !result.success() {
            return Ok(result);
        }
        let slot = result
            .best_slot
            .ok_or_else(|| {
                FantasyCriticError::validation("There are no open slots for that game.")
            })?;
        apply_claim(&mut league_year, &request, slot, now);

        let publisher = league_year.require_publisher(claim.publisher_id)?;
        let action = LeagueAction::new(
            publisher,
            now,
            LeagueActionType::ClaimGame,
            format!("Claimed game: '{}'", request.game_name),
            true,
        );
        self.repo.commit_league_changes(
            &LeagueChanges::new().with_publisher(publisher).with_action(action),
        )?;
        tracing::info!(
            publisher = %publisher.name,
            game = %request.game_name,
            "Manager claimed game"
        );
        Ok(result)
    }

    /// Link a free-text publisher game to a master game.
    pub fn associate_game(
        &mut self,
        manager: UserId,
        key: LeagueYearKey,
        publisher_game_id: PublisherGameId,
        master_game_id: MasterGameId,
        manager_override: bool,
    ) -> Result<ClaimResult> {
        let mut league_year = self.playable_league_year(key)?;
        require_manager(&league_year.league, manager)?;
        let master_game = require_master_game_year(&*self.repo, master_game_id, key.year)?;

        let (publisher_id, game) = league_year
            .publishers
            .iter()
            .find_map(|p| p.game_by_id(publisher_game_id).map(|g| (p.id, g.clone())))
            .ok_or_else(|| {
                FantasyCriticError::not_found("Publisher game", publisher_game_id)
            })?;
        if game.master_game.is_some() {
            return Err(FantasyCriticError::validation(
                "That game is already associated with a master game.",
            ));
        }

        let mut request =
            ClaimGameRequest::new(publisher_id, master_game.clone(), game.counter_pick);
        request.manager_action = true;
        request.manager_override = manager_override;
        let view = without_game(&league_year, publisher_id, Some(publisher_game_id));
        let now = self.clock.now();
        let result = claim_errors(&request, &view, now.date_naive());
        if !result.success() {
            return Ok(result);
        }

        let publisher = league_year
            .publisher_by_id_mut(publisher_id)
            .ok_or_else(|| FantasyCriticError::not_found("Publisher", publisher_id))?;
        if let Some(game) = publisher.games.iter_mut().find(|g| g.id == publisher_game_id) {
            game.master_game = Some(master_game);
        }
        let action = LeagueAction::new(
            publisher,
            now,
            LeagueActionType::AssociateGame,
            format!(
                "Associated publisher game '{}' with master game '{}'",
                game.game_name, request.game_name
            ),
            true,
        );
        self.repo.commit_league_changes(
            &LeagueChanges::new().with_publisher(publisher).with_action(action),
        )?;
        Ok(result)
    }

    /// Validate and store a bid. A rejected bid is returned as a failed `ClaimResult`.
    pub fn make_pickup_bid(
        &mut self,
        user: UserId,
        key: LeagueYearKey,
        bid: &BidRequest,
    ) -> Result<ClaimResult> {
        let league_year = self.playable_league_year(key)?;
        let publisher = require_owned_publisher(&league_year, bid.publisher_id, user)?;
        let master_game = require_master_game_year(&*self.repo, bid.master_game_id, key.year)?;
        let active_bids: Vec<PickupBid> = self
            .repo
            .get_active_pickup_bids(key)?
            .into_iter()
            .filter(|b| b.publisher_id == publisher.id)
            .collect();

        let mut errors = Vec::new();
        if bid.bid_amount < league_year.options.minimum_bid_amount {
            errors.push(ClaimError::new(
                "That bid does not meet the league's minimum bid.",
                false,
            ));
        }
        if bid.bid_amount > publisher.budget {
            errors.push(ClaimError::new(
                "You do not have enough budget to make that bid.",
                false,
            ));
        }
        if active_bids
            .iter()
            .any(|b| b.master_game_id() == bid.master_game_id && b.counter_pick == bid.counter_pick)
        {
            errors.push(ClaimError::new(
                "You cannot have two active bids for the same game.",
                false,
            ));
        }
        if let Some(drop_id) = bid.conditional_drop {
            if let Some(reason) =
                conditional_drop_error(publisher, drop_id, bid.counter_pick, &league_year)
            {
                errors.push(ClaimError::new(reason, false));
            }
        }

        let mut request =
            ClaimGameRequest::new(publisher.id, master_game.clone(), bid.counter_pick);
        request.bid_amount = Some(bid.bid_amount);
        request.allow_ineligible_slot = bid.allow_ineligible_slot;
        let view = without_game(&league_year, publisher.id, bid.conditional_drop);
        let now = self.clock.now();
        let mut result = claim_errors(&request, &view, now.date_naive());
        errors.extend(result.errors);
        result.errors = errors;
        if !result.success() {
            return Ok(result);
        }

        let pickup = PickupBid {
            id: BidId::new_v4(),
            publisher_id: publisher.id,
            league_year_key: key,
            master_game,
            conditional_drop: bid.conditional_drop,
            counter_pick: bid.counter_pick,
            bid_amount: bid.bid_amount,
            priority: active_bids.len() as u32 + 1,
            timestamp: now,
            allow_ineligible_slot: bid.allow_ineligible_slot,
            successful: None,
            outcome: None,
        };
        self.repo.save_pickup_bid(&pickup)?;
        tracing::info!(
            publisher = %publisher.name,
            game = %request.game_name,
            amount = bid.bid_amount,
            "Pickup bid placed"
        );
        Ok(result)
    }

    fn owned_active_bid(
        &self,
        user: UserId,
        league_year: &LeagueYear,
        bid_id: BidId,
    ) -> Result<PickupBid> {
        let bid = self
            .repo
            .get_active_pickup_bids(league_year.key())?
            .into_iter()
            .find(|b| b.id == bid_id)
            .ok_or_else(|| FantasyCriticError::not_found("Pickup bid", bid_id))?;
        require_owned_publisher(league_year, bid.publisher_id, user)?;
        Ok(bid)
    }

    pub fn edit_pickup_bid(
        &mut self,
        user: UserId,
        key: LeagueYearKey,
        bid_id: BidId,
        bid_amount: u32,
        conditional_drop: Option<PublisherGameId>,
    ) -> Result<PickupBid> {
        let league_year = self.playable_league_year(key)?;
        let mut bid = self.owned_active_bid(user, &league_year, bid_id)?;
        let publisher = league_year.require_publisher(bid.publisher_id)?;
        if bid_amount < league_year.options.minimum_bid_amount {
            return Err(FantasyCriticError::validation(
                "That bid does not meet the league's minimum bid.",
            ));
        }
        if bid_amount > publisher.budget {
            return Err(FantasyCriticError::validation(
                "You do not have enough budget to make that bid.",
            ));
        }
        if let Some(drop_id) = conditional_drop {
            if let Some(reason) =
                conditional_drop_error(publisher, drop_id, bid.counter_pick, &league_year)
            {
                return Err(FantasyCriticError::validation(reason));
            }
        }
        bid.bid_amount = bid_amount;
        bid.conditional_drop = conditional_drop;
        self.repo.save_pickup_bid(&bid)?;
        Ok(bid)
    }

    /// Delete a bid and close the gap in the publisher's priorities.
    pub fn remove_pickup_bid(
        &mut self,
        user: UserId,
        key: LeagueYearKey,
        bid_id: BidId,
    ) -> Result<()> {
        ensure_writable(&*self.repo)?;
        let league_year = require_league_year(&*self.repo, key)?;
        let bid = self.owned_active_bid(user, &league_year, bid_id)?;
        self.repo.delete_pickup_bid(bid.id)?;

        let mut remaining = self.current_bids(key, bid.publisher_id)?;
        remaining.sort_by_key(|b| (b.priority, b.timestamp));
        for (index, mut other) in remaining.into_iter().enumerate() {
            let priority = index as u32 + 1;
            if other.priority != priority {
                other.priority = priority;
                self.repo.save_pickup_bid(&other)?;
            }
        }
        Ok(())
    }

    pub fn make_drop_request(
        &mut self,
        user: UserId,
        key: LeagueYearKey,
        publisher_id: PublisherId,
        publisher_game_id: PublisherGameId,
    ) -> Result<DropRequest> {
        let league_year = self.playable_league_year(key)?;
        let publisher = require_owned_publisher(&league_year, publisher_id, user)?;
        let game = publisher
            .game_by_id(publisher_game_id)
            .ok_or_else(|| {
                FantasyCriticError::not_found("Publisher game", publisher_game_id)
            })?;
        let Some(master_game) = game.master_game.clone() else {
            return Err(FantasyCriticError::validation(
                "You can't drop a game that is not linked to a master game.",
            ));
        };
        if let Some(reason) = drop_error_for_game(publisher, game, &league_year) {
            return Err(FantasyCriticError::validation(reason));
        }
        let existing = self.current_drops(key, publisher_id)?;
        if existing.iter().any(|d| d.master_game.id() == master_game.id()) {
            return Err(FantasyCriticError::validation(
                "You cannot have two active drop requests for the same game.",
            ));
        }

        let drop = DropRequest {
            id: DropId::new_v4(),
            publisher_id,
            league_year_key: key,
            master_game,
            timestamp: self.clock.now(),
            successful: None,
        };
        self.repo.save_drop_request(&drop)?;
        tracing::info!(publisher = %publisher.name, game = %game.name(), "Drop requested");
        Ok(drop)
    }

    pub fn remove_drop_request(
        &mut self,
        user: UserId,
        key: LeagueYearKey,
        drop_id: DropId,
    ) -> Result<()> {
        ensure_writable(&*self.repo)?;
        let league_year = require_league_year(&*self.repo, key)?;
        let drop = self
            .repo
            .get_active_drop_requests(key)?
            .into_iter()
            .find(|d| d.id == drop_id)
            .ok_or_else(|| FantasyCriticError::not_found("Drop request", drop_id))?;
        require_owned_publisher(&league_year, drop.publisher_id, user)?;
        self.repo.delete_drop_request(drop_id)?;
        Ok(())
    }

    pub fn current_bids(
        &self,
        key: LeagueYearKey,
        publisher_id: PublisherId,
    ) -> Result<Vec<PickupBid>> {
        let mut bids: Vec<PickupBid> = self
            .repo
            .get_active_pickup_bids(key)?
            .into_iter()
            .filter(|b| b.publisher_id == publisher_id)
            .collect();
        bids.sort_by_key(|b| b.priority);
        Ok(bids)
    }

    pub fn current_drops(
        &self,
        key: LeagueYearKey,
        publisher_id: PublisherId,
    ) -> Result<Vec<DropRequest>> {
        Ok(self
            .repo
            .get_active_drop_requests(key)?
            .into_iter()
            .filter(|d| d.publisher_id == publisher_id)
            .collect())
    }

    /// Open a single-game auction that processes once `scheduled_end_time` passes.
    pub fn create_special_auction(
        &mut self,
        manager: UserId,
        key: LeagueYearKey,
        master_game_id: MasterGameId,
        scheduled_end_time: DateTime<Utc>,
    ) -> Result<SpecialAuction> {
        let league_year = self.playable_league_year(key)?;
        require_manager(&league_year.league, manager)?;
        let master_game = require_master_game_year(&*self.repo, master_game_id, key.year)?;
        let now = self.clock.now();
        if scheduled_end_time <= now {
            return Err(FantasyCriticError::validation(
                "A special auction must end in the future.",
            ));
        }
        if !league_year.publisher_game_for(master_game_id).is_empty() {
            return Err(FantasyCriticError::validation(
                "That game is already on a publisher's roster.",
            ));
        }
        if self
            .special_auctions(key)?
            .iter()
            .any(|a| !a.processed && a.master_game.id() == master_game_id)
        {
            return Err(FantasyCriticError::validation(
                "There is already an active special auction for that game.",
            ));
        }

        let auction = SpecialAuction {
            id: AuctionId::new_v4(),
            league_year_key: key,
            master_game,
            creation_time: now,
            scheduled_end_time,
            processed: false,
        };
        self.repo.save_special_auction(&auction)?;
        tracing::info!(
            auction = %auction.id,
            game = %auction.master_game.master_game.name,
            "Special auction created"
        );
        Ok(auction)
    }

    pub fn special_auctions(&self, key: LeagueYearKey) -> Result<Vec<SpecialAuction>> {
        Ok(self
            .repo
            .get_special_auctions(key.year)?
            .into_iter()
            .filter(|a| a.league_year_key == key)
            .collect())
    }
}
