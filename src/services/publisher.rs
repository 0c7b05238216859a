//! Publisher lifecycle, queues, bid priority and roster order.

use super::{
    ensure_writable, require_league_year, require_manager, require_master_game_year,
    require_non_blank, require_owned_publisher, Repository,
};
use crate::cli::types::ids::{BidId, MasterGameId, PublisherGameId, PublisherId, UserId};
use crate::cli::types::time::LeagueYearKey;
use crate::core::Clock;
use crate::domain::publisher::STARTING_BUDGET;
use crate::domain::{
    LeagueAction, LeagueActionType, LeagueOptions, PickupBid, Publisher, QueuedGame,
};
use crate::error::{FantasyCriticError, Result};
use crate::storage::LeagueChanges;
use std::collections::{BTreeMap, HashSet};

const REMOVED_BY_MANAGER: &str = "Removed by league manager";

/// Manager edits to a publisher. Unset fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditPublisherRequest {
    pub name: Option<String>,
    pub budget: Option<i32>,
    pub free_games_dropped: Option<i32>,
    pub will_not_release_games_dropped: Option<i32>,
    pub will_release_games_dropped: Option<i32>,
}

impl EditPublisherRequest {
    pub fn some_changes(&self) -> bool {
        self.name.is_some()
            || self.budget.is_some()
            || self.free_games_dropped.is_some()
            || self.will_not_release_games_dropped.is_some()
            || self.will_release_games_dropped.is_some()
    }
}

/// Check one drop counter edit against its league allowance.
fn validate_drop_counter(
    value: i32,
    allowed: i32,
    unlimited: bool,
    label: &str,
    unlimited_label: &str,
) -> Result<()> {
    if unlimited {
        return Err(FantasyCriticError::validation(format!(
            "Your league allows unlimited {} drops, so there is no reason to edit this.",
            unlimited_label
        )));
    }
    if value < 0 {
        return Err(FantasyCriticError::validation(format!(
            "{} games dropped cannot be set to less than zero.",
            label
        )));
    }
    if value > allowed {
        return Err(FantasyCriticError::validation(format!(
            "{} games dropped cannot be set to more than is allowed in the league.",
            label
        )));
    }
    Ok(())
}

fn validate_edit(request: &EditPublisherRequest, options: &LeagueOptions) -> Result<()> {
    if !request.some_changes() {
        return Err(FantasyCriticError::validation(
            "You need to specify something to change.",
        ));
    }
    if let Some(budget) = request.budget {
        if budget > STARTING_BUDGET as i32 {
            return Err(FantasyCriticError::validation(
                "Budget cannot be set to over $100.",
            ));
        }
        if budget < 0 {
            return Err(FantasyCriticError::validation(
                "Budget cannot be set to under $0.",
            ));
        }
    }
    if let Some(value) = request.will_release_games_dropped {
        validate_drop_counter(
            value,
            options.will_release_droppable_games,
            options.unlimited_will_release_drops(),
            "Will release",
            "will release",
        )?;
    }
    if let Some(value) = request.will_not_release_games_dropped {
        validate_drop_counter(
            value,
            options.will_not_release_droppable_games,
            options.unlimited_will_not_release_drops(),
            "Will not release",
            "will not release",
        )?;
    }
    if let Some(value) = request.free_games_dropped {
        validate_drop_counter(
            value,
            options.free_droppable_games,
            options.unlimited_free_drops(),
            "Unrestricted",
            "unrestricted",
        )?;
    }
    Ok(())
}

pub struct PublisherService<'a, R: Repository> {
    repo: &'a mut R,
    clock: &'a dyn Clock,
}

impl<'a, R: Repository> PublisherService<'a, R> {
    pub fn new(repo: &'a mut R, clock: &'a dyn Clock) -> Self {
        Self { repo, clock }
    }

    /// New publishers draft last and start with the full budget.
    pub fn create_publisher(
        &mut self,
        user: UserId,
        key: LeagueYearKey,
        name: &str,
    ) -> Result<Publisher> {
        ensure_writable(&*self.repo)?;
        let league_year = require_league_year(&*self.repo, key)?;
        let name = require_non_blank(name, "You cannot have a blank publisher name.")?;
        if league_year.play_status.play_started() {
            return Err(FantasyCriticError::validation(
                "You cannot create a publisher after the draft has started.",
            ));
        }
        if !self.repo.get_league_members(key.league_id)?.contains(&user) {
            return Err(FantasyCriticError::forbidden("You are not in that league."));
        }
        if league_year.user_publisher(user).is_some() {
            return Err(FantasyCriticError::validation(
                "You already have a publisher for this league year.",
            ));
        }

        let draft_position = league_year
            .publishers
            .iter()
            .map(|p| p.draft_position)
            .max()
            .unwrap_or(0)
            + 1;
        let publisher = Publisher::new(key, user, &name, draft_position);
        self.repo
            .commit_league_changes(&LeagueChanges::new().with_publisher(&publisher))?;
        tracing::info!(
            publisher = %publisher.name,
            league = %league_year.league.name,
            "Created publisher"
        );
        Ok(publisher)
    }

    pub fn change_publisher_name(
        &mut self,
        user: UserId,
        key: LeagueYearKey,
        publisher_id: PublisherId,
        name: &str,
    ) -> Result<Publisher> {
        let name = require_non_blank(name, "You cannot have a blank publisher name.")?;
        self.update_owned(user, key, publisher_id, |p| p.name = name)
    }

    pub fn change_publisher_icon(
        &mut self,
        user: UserId,
        key: LeagueYearKey,
        publisher_id: PublisherId,
        icon: Option<String>,
    ) -> Result<Publisher> {
        let icon = icon.filter(|i| !i.trim().is_empty());
        self.update_owned(user, key, publisher_id, |p| p.icon = icon)
    }

    pub fn set_auto_draft(
        &mut self,
        user: UserId,
        key: LeagueYearKey,
        publisher_id: PublisherId,
        auto_draft: bool,
    ) -> Result<Publisher> {
        self.update_owned(user, key, publisher_id, |p| p.auto_draft = auto_draft)
    }

    fn update_owned(
        &mut self,
        user: UserId,
        key: LeagueYearKey,
        publisher_id: PublisherId,
        update: impl FnOnce(&mut Publisher),
    ) -> Result<Publisher> {
        ensure_writable(&*self.repo)?;
        let league_year = require_league_year(&*self.repo, key)?;
        let mut publisher = require_owned_publisher(&league_year, publisher_id, user)?.clone();
        update(&mut publisher);
        self.repo
            .commit_league_changes(&LeagueChanges::new().with_publisher(&publisher))?;
        Ok(publisher)
    }

    /// Manager removal of a game after the draft.
    /// Bids that would conditionally drop it are cancelled.
    pub fn remove_publisher_game(
        &mut self,
        manager: UserId,
        key: LeagueYearKey,
        publisher_game_id: PublisherGameId,
    ) -> Result<Publisher> {
        ensure_writable(&*self.repo)?;
        let mut league_year = require_league_year(&*self.repo, key)?;
        require_manager(&league_year.league, manager)?;
        if !league_year.play_status.draft_finished() {
            return Err(FantasyCriticError::validation(
                "You can't remove games until the draft is complete.",
            ));
        }
        let now = self.clock.now();
        let publisher = league_year
            .publishers
            .iter_mut()
            .find(|p| p.game_by_id(publisher_game_id).is_some())
            .ok_or_else(|| {
                FantasyCriticError::not_found("Publisher game", publisher_game_id)
            })?;
        let removed = publisher
            .remove_game(publisher_game_id, now, REMOVED_BY_MANAGER)
            .ok_or_else(|| {
                FantasyCriticError::not_found("Publisher game", publisher_game_id)
            })?;

        let action = LeagueAction::new(
            publisher,
            now,
            LeagueActionType::RemoveGame,
            format!("'{}' was removed by the league manager.", removed.name()),
            true,
        );
        let mut changes = LeagueChanges::new().with_publisher(publisher).with_action(action);
        changes.cancelled_bids = self
            .repo
            .get_active_pickup_bids(key)?
            .into_iter()
            .filter(|b| b.conditional_drop == Some(publisher_game_id))
            .map(|b| b.id)
            .collect();
        let publisher = publisher.clone();
        self.repo.commit_league_changes(&changes)?;
        tracing::info!(
            publisher = %publisher.name,
            game = %removed.name(),
            "Manager removed publisher game"
        );
        Ok(publisher)
    }

    pub fn edit_publisher(
        &mut self,
        manager: UserId,
        key: LeagueYearKey,
        publisher_id: PublisherId,
        request: &EditPublisherRequest,
    ) -> Result<Publisher> {
        ensure_writable(&*self.repo)?;
        let league_year = require_league_year(&*self.repo, key)?;
        require_manager(&league_year.league, manager)?;
        validate_edit(request, &league_year.options)?;
        let mut publisher = league_year.require_publisher(publisher_id)?.clone();

        let mut notes = Vec::new();
        if let Some(name) = &request.name {
            let name = require_non_blank(name, "You cannot have a blank publisher name.")?;
            notes.push(format!(
                "Publisher name changed from '{}' to '{}'.",
                publisher.name, name
            ));
            publisher.name = name;
        }
        if let Some(budget) = request.budget {
            let budget = budget as u32;
            notes.push(format!(
                "Budget changed from ${} to ${}.",
                publisher.budget, budget
            ));
            publisher.budget = budget;
        }
        if let Some(value) = request.will_release_games_dropped {
            notes.push(format!(
                "Will release games dropped changed from {} to {}.",
                publisher.will_release_games_dropped, value
            ));
            publisher.will_release_games_dropped = value;
        }
        if let Some(value) = request.will_not_release_games_dropped {
            notes.push(format!(
                "Will not release games dropped changed from {} to {}.",
                publisher.will_not_release_games_dropped, value
            ));
            publisher.will_not_release_games_dropped = value;
        }
        if let Some(value) = request.free_games_dropped {
            notes.push(format!(
                "Unrestricted games dropped changed from {} to {}.",
                publisher.free_games_dropped, value
            ));
            publisher.free_games_dropped = value;
        }

        let action = LeagueAction::new(
            &publisher,
            self.clock.now(),
            LeagueActionType::PublisherEdited,
            notes.join(" "),
            true,
        );
        self.repo.commit_league_changes(
            &LeagueChanges::new()
                .with_publisher(&publisher)
                .with_action(action),
        )?;
        Ok(publisher)
    }

    /// Delete a publisher outright, which is only possible before play starts.
    pub fn fully_remove_publisher(
        &mut self,
        manager: UserId,
        key: LeagueYearKey,
        publisher_id: PublisherId,
    ) -> Result<()> {
        ensure_writable(&*self.repo)?;
        let league_year = require_league_year(&*self.repo, key)?;
        require_manager(&league_year.league, manager)?;
        if league_year.play_status.play_started() {
            return Err(FantasyCriticError::validation(
                "You can't remove a publisher from a year that has already started.",
            ));
        }
        let publisher = league_year.require_publisher(publisher_id)?;
        self.repo.delete_publisher(publisher.id)?;
        tracing::info!(publisher = %publisher.name, "Removed publisher");
        Ok(())
    }

    /// `order` must name every active bid of the publisher once; priorities become 1..=n.
    pub fn set_bid_priority_order(
        &mut self,
        user: UserId,
        key: LeagueYearKey,
        publisher_id: PublisherId,
        order: &[BidId],
    ) -> Result<Vec<PickupBid>> {
        ensure_writable(&*self.repo)?;
        let league_year = require_league_year(&*self.repo, key)?;
        require_owned_publisher(&league_year, publisher_id, user)?;
        let bids: Vec<PickupBid> = self
            .repo
            .get_active_pickup_bids(key)?
            .into_iter()
            .filter(|b| b.publisher_id == publisher_id)
            .collect();

        let requested: HashSet<BidId> = order.iter().copied().collect();
        let existing: HashSet<BidId> = bids.iter().map(|b| b.id).collect();
        if requested.len() != order.len() || requested != existing {
            return Err(FantasyCriticError::validation(
                "Bid priority order must include every active bid exactly once.",
            ));
        }

        let mut reordered = Vec::with_capacity(bids.len());
        for (index, id) in order.iter().enumerate() {
            if let Some(bid) = bids.iter().find(|b| b.id == *id) {
                let mut bid = bid.clone();
                bid.priority = index as u32 + 1;
                self.repo.save_pickup_bid(&bid)?;
                reordered.push(bid);
            }
        }
        Ok(reordered)
    }

    /// Queued games ordered by rank.
    pub fn queued_games(
        &self,
        key: LeagueYearKey,
        publisher_id: PublisherId,
    ) -> Result<Vec<QueuedGame>> {
        let mut queue = self.repo.get_queued_games(publisher_id, key.year)?;
        queue.sort_by_key(|q| q.rank);
        Ok(queue)
    }

    pub fn queue_game(
        &mut self,
        user: UserId,
        key: LeagueYearKey,
        publisher_id: PublisherId,
        master_game_id: MasterGameId,
    ) -> Result<Vec<QueuedGame>> {
        ensure_writable(&*self.repo)?;
        let league_year = require_league_year(&*self.repo, key)?;
        require_owned_publisher(&league_year, publisher_id, user)?;
        let master_game = require_master_game_year(&*self.repo, master_game_id, key.year)?;
        let mut queue = self.queued_games(key, publisher_id)?;
        if queue.iter().any(|q| q.master_game.id() == master_game_id) {
            return Err(FantasyCriticError::validation(
                "You already have that game queued.",
            ));
        }
        let rank = queue.len() as u32 + 1;
        queue.push(QueuedGame {
            publisher_id,
            master_game,
            rank,
        });
        self.repo.set_queued_games(publisher_id, &queue)?;
        Ok(queue)
    }

    pub fn remove_queued_game(
        &mut self,
        user: UserId,
        key: LeagueYearKey,
        publisher_id: PublisherId,
        master_game_id: MasterGameId,
    ) -> Result<Vec<QueuedGame>> {
        ensure_writable(&*self.repo)?;
        let league_year = require_league_year(&*self.repo, key)?;
        require_owned_publisher(&league_year, publisher_id, user)?;
        let mut queue = self.queued_games(key, publisher_id)?;
        let before = queue.len();
        queue.retain(|q| q.master_game.id() != master_game_id);
        if queue.len() == before {
            return Err(FantasyCriticError::not_found("Queued game", master_game_id));
        }
        for (index, queued) in queue.iter_mut().enumerate() {
            queued.rank = index as u32 + 1;
        }
        self.repo.set_queued_games(publisher_id, &queue)?;
        Ok(queue)
    }

    /// `order` must name every queued game once; ranks become 1..=n.
    pub fn set_queue_rankings(
        &mut self,
        user: UserId,
        key: LeagueYearKey,
        publisher_id: PublisherId,
        order: &[MasterGameId],
    ) -> Result<Vec<QueuedGame>> {
        ensure_writable(&*self.repo)?;
        let league_year = require_league_year(&*self.repo, key)?;
        require_owned_publisher(&league_year, publisher_id, user)?;
        let queue = self.queued_games(key, publisher_id)?;

        let requested: HashSet<MasterGameId> = order.iter().copied().collect();
        let existing: HashSet<MasterGameId> = queue.iter().map(|q| q.master_game.id()).collect();
        if requested.len() != order.len() || requested != existing {
            return Err(FantasyCriticError::validation(
                "Queue rankings must include every queued game exactly once.",
            ));
        }
        let ranked: Vec<QueuedGame> = order
            .iter()
            .enumerate()
            .filter_map(|(index, id)| {
                queue.iter().find(|q| q.master_game.id() == *id).map(|q| QueuedGame {
                    rank: index as u32 + 1,
                    ..q.clone()
                })
            })
            .collect();
        self.repo.set_queued_games(publisher_id, &ranked)?;
        Ok(ranked)
    }

    /// Move standard games between slots.
    ///
    /// `slot_states` maps standard slot numbers to the game that should occupy them; the
    /// games named must be exactly the games currently in those slots. A game sitting in a
    /// slot it is valid for cannot be moved into one it is invalid for.
    pub fn reorder_publisher_games(
        &mut self,
        user: UserId,
        key: LeagueYearKey,
        publisher_id: PublisherId,
        slot_states: &BTreeMap<usize, Option<PublisherGameId>>,
    ) -> Result<Publisher> {
        ensure_writable(&*self.repo)?;
        let league_year = require_league_year(&*self.repo, key)?;
        let mut publisher = require_owned_publisher(&league_year, publisher_id, user)?.clone();
        let options = &league_year.options;

        if slot_states.keys().any(|slot| *slot >= options.standard_games) {
            return Err(FantasyCriticError::validation(
                "Some of the positions are not valid.",
            ));
        }
        let displaced: HashSet<PublisherGameId> = publisher
            .standard_games()
            .filter(|g| slot_states.contains_key(&g.slot_number))
            .map(|g| g.id)
            .collect();
        let placed: Vec<PublisherGameId> = slot_states.values().flatten().copied().collect();
        let placed_set: HashSet<PublisherGameId> = placed.iter().copied().collect();
        if placed.len() != placed_set.len() || placed_set != displaced {
            return Err(FantasyCriticError::validation("Invalid movement."));
        }

        let slots = publisher.publisher_slots(options);
        for (slot_number, game_id) in slot_states {
            let Some(game_id) = game_id else { continue };
            let Some(game) = publisher.game_by_id(*game_id) else { continue };
            let current = slots
                .iter()
                .find(|s| !s.counter_pick && s.slot_number == game.slot_number);
            let target = slots
                .iter()
                .find(|s| !s.counter_pick && s.slot_number == *slot_number);
            if let (Some(current), Some(target)) = (current, target) {
                let was_valid = current.slot_is_valid(&league_year);
                let now_valid = target
                    .with_replaced_game(Some(game.clone()))
                    .slot_is_valid(&league_year);
                if was_valid && !now_valid {
                    return Err(FantasyCriticError::validation(
                        "You cannot move a game into a slot that it is not eligible for.",
                    ));
                }
            }
        }

        for game in publisher.games.iter_mut().filter(|g| !g.counter_pick) {
            if let Some((slot_number, _)) = slot_states
                .iter()
                .find(|(_, id)| **id == Some(game.id))
            {
                game.slot_number = *slot_number;
            }
        }
        self.repo
            .commit_league_changes(&LeagueChanges::new().with_publisher(&publisher))?;
        Ok(publisher)
    }
}
