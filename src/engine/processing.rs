//! Batch processing of drop requests and pickup bids for one league season.
//!
//! Processing works on a clone of the league year and returns everything that
//! changed; nothing here touches storage. Identical input gives identical output.

use crate::cli::types::ids::{MasterGameId, PublisherGameId, PublisherId};
use crate::domain::actions::{
    ActionProcessingResults, DropRequest, LeagueAction, LeagueActionType, PickupBid,
    SpecialAuction,
};
use crate::domain::claims::ClaimGameRequest;
use crate::domain::league::LeagueYear;
use crate::domain::publisher::PublisherGame;
use crate::domain::system::SystemWideValues;
use crate::engine::claims::{best_slot, claim_errors, drop_error, drop_error_for_game};
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

pub const LOST_BID_OUTCOME: &str = "Another publisher won the bid.";
pub const WON_BID_OUTCOME: &str = "Success";

/// Drops first, then bids in priority rounds.
pub fn process_league_year(
    league_year: &LeagueYear,
    bids: &[PickupBid],
    drops: &[DropRequest],
    values: &SystemWideValues,
    now: DateTime<Utc>,
) -> ActionProcessingResults {
    let mut working = league_year.clone();
    let mut results = ActionProcessingResults::default();

    process_drops(&mut working, drops, now, &mut results);
    process_bids(&mut working, bids, values, now, &mut results);

    results.updated_publishers = working
        .publishers
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    tracing::info!(
        league = %league_year.league.name,
        year = %league_year.year,
        success_bids = results.success_bids.len(),
        failed_bids = results.failed_bids.len(),
        success_drops = results.success_drops.len(),
        failed_drops = results.failed_drops.len(),
        "Processed league actions"
    );
    results
}

/// Only bids on the auctioned game count, and only once the auction has ended.
pub fn process_special_auction(
    league_year: &LeagueYear,
    auction: &SpecialAuction,
    bids: &[PickupBid],
    values: &SystemWideValues,
    now: DateTime<Utc>,
) -> ActionProcessingResults {
    if auction.processed || !auction.is_locked(now) {
        return ActionProcessingResults::empty(&league_year.publishers);
    }

    let auction_bids: Vec<PickupBid> = bids
        .iter()
        .filter(|b| b.master_game_id() == auction.master_game.id())
        .cloned()
        .collect();
    process_league_year(league_year, &auction_bids, &[], values, now)
}

fn process_drops(
    working: &mut LeagueYear,
    drops: &[DropRequest],
    now: DateTime<Utc>,
    results: &mut ActionProcessingResults,
) {
    let mut ordered: Vec<&DropRequest> = drops.iter().filter(|d| d.successful.is_none()).collect();
    ordered.sort_by_key(|d| (d.timestamp, d.id));

    for drop in ordered {
        let game_name = drop.master_game.master_game.name.clone();
        let Some(publisher) = working.publisher_by_id(drop.publisher_id) else {
            results.failed_drops.push(drop.resolve(false));
            continue;
        };

        if let Some(reason) = drop_error(publisher, drop.master_game.id(), working) {
            results.league_actions.push(LeagueAction::new(
                publisher,
                now,
                LeagueActionType::DropFailed,
                format!(
                    "Attempted to drop game: '{}'. Failure reason: {}",
                    game_name, reason
                ),
                false,
            ));
            results.failed_drops.push(drop.resolve(false));
            continue;
        }

        if let Some(removed) =
            execute_drop_by_master_game(working, drop.publisher_id, drop.master_game.id(), now)
        {
            results.removed_games.push(removed);
        }
        if let Some(publisher) = working.publisher_by_id(drop.publisher_id) {
            results.league_actions.push(LeagueAction::new(
                publisher,
                now,
                LeagueActionType::DropGame,
                format!("Dropped game: '{}'", game_name),
                false,
            ));
        }
        results.success_drops.push(drop.resolve(true));
    }
}

fn execute_drop_by_master_game(
    working: &mut LeagueYear,
    publisher_id: PublisherId,
    master_game_id: MasterGameId,
    now: DateTime<Utc>,
) -> Option<PublisherGame> {
    let game_id = working
        .publisher_by_id(publisher_id)?
        .standard_games()
        .find(|g| g.master_game_id() == Some(master_game_id))?
        .id;
    execute_drop(working, publisher_id, game_id, now)
}

fn execute_drop(
    working: &mut LeagueYear,
    publisher_id: PublisherId,
    game_id: PublisherGameId,
    now: DateTime<Utc>,
) -> Option<PublisherGame> {
    let options = working.options.clone();
    let publisher = working.publisher_by_id_mut(publisher_id)?;
    let will_release = publisher.game_by_id(game_id)?.will_release();
    publisher.record_drop(will_release, &options);
    publisher.remove_game(game_id, now, "Dropped")
}

fn process_bids(
    working: &mut LeagueYear,
    bids: &[PickupBid],
    values: &SystemWideValues,
    now: DateTime<Utc>,
    results: &mut ActionProcessingResults,
) {
    let mut pending: Vec<PickupBid> = bids.iter().filter(|b| b.is_active()).cloned().collect();

    while !pending.is_empty() {
        pending.sort_by_key(|b| (b.publisher_id, b.priority, b.timestamp, b.id));
        let mut seen = HashSet::new();
        let (round, rest): (Vec<PickupBid>, Vec<PickupBid>) =
            pending.into_iter().partition(|b| seen.insert(b.publisher_id));
        pending = rest;
        process_round(working, round, values, now, results);
    }
}

/// Higher bid, then the publisher further behind, then the earlier bid, then publisher id.
fn compare_bids(a: &PickupBid, b: &PickupBid, projections: &HashMap<PublisherId, f64>) -> Ordering {
    let projected = |bid: &PickupBid| projections.get(&bid.publisher_id).copied().unwrap_or(0.0);
    b.bid_amount
        .cmp(&a.bid_amount)
        .then_with(|| {
            projected(a)
                .partial_cmp(&projected(b))
                .unwrap_or(Ordering::Equal)
        })
        .then_with(|| a.timestamp.cmp(&b.timestamp))
        .then_with(|| a.publisher_id.cmp(&b.publisher_id))
}

fn process_round(
    working: &mut LeagueYear,
    round: Vec<PickupBid>,
    values: &SystemWideValues,
    now: DateTime<Utc>,
    results: &mut ActionProcessingResults,
) {
    let today = now.date_naive();
    let view: &LeagueYear = working;
    let projections: HashMap<PublisherId, f64> = view
        .publishers
        .iter()
        .map(|p| (p.id, p.projected_fantasy_points(view, values, today)))
        .collect();

    // Standard pickups settle before counter picks on the same game.
    let mut groups: BTreeMap<(bool, MasterGameId), Vec<PickupBid>> = BTreeMap::new();
    for bid in round {
        groups
            .entry((bid.counter_pick, bid.master_game_id()))
            .or_default()
            .push(bid);
    }

    for (_, mut contenders) in groups {
        contenders.sort_by(|a, b| compare_bids(a, b, &projections));
        let mut won = false;
        for bid in contenders {
            if won {
                fail_bid(working, bid, LOST_BID_OUTCOME, now, results);
                continue;
            }
            match bid_error(working, &bid, now) {
                Some(reason) => fail_bid(working, bid, &reason, now, results),
                None => won = award_bid(working, bid, now, results),
            }
        }
    }
}

/// Why `bid` cannot be granted against the current state.
pub fn bid_error(working: &LeagueYear, bid: &PickupBid, now: DateTime<Utc>) -> Option<String> {
    let Some(publisher) = working.publisher_by_id(bid.publisher_id) else {
        return Some("That publisher is not in this league.".to_string());
    };
    if bid.bid_amount > publisher.budget {
        return Some("Not enough budget.".to_string());
    }
    if bid.bid_amount < working.options.minimum_bid_amount {
        return Some("That bid does not meet the league's minimum bid.".to_string());
    }

    let hypothetical: LeagueYear;
    let view = match bid.conditional_drop {
        Some(drop_id) => {
            let Some(game) = publisher.game_by_id(drop_id) else {
                return Some(
                    "Conditional drop failed: that game is no longer on the roster.".to_string(),
                );
            };
            if let Some(reason) = drop_error_for_game(publisher, game, working) {
                return Some(format!("Conditional drop failed: {}", reason));
            }
            let mut without_drop = working.clone();
            if let Some(p) = without_drop.publisher_by_id_mut(bid.publisher_id) {
                p.games.retain(|g| g.id != drop_id);
            }
            hypothetical = without_drop;
            &hypothetical
        }
        None => working,
    };

    let mut request =
        ClaimGameRequest::new(bid.publisher_id, bid.master_game.clone(), bid.counter_pick);
    request.bid_amount = Some(bid.bid_amount);
    request.allow_ineligible_slot = bid.allow_ineligible_slot;
    let claim = claim_errors(&request, view, now.date_naive());
    if claim.success() {
        None
    } else {
        Some(claim.first_message())
    }
}

fn fail_bid(
    working: &LeagueYear,
    bid: PickupBid,
    reason: &str,
    now: DateTime<Utc>,
    results: &mut ActionProcessingResults,
) {
    if let Some(publisher) = working.publisher_by_id(bid.publisher_id) {
        results.league_actions.push(LeagueAction::new(
            publisher,
            now,
            LeagueActionType::PickupFailed,
            format!(
                "Tried to acquire game: '{}' with a bid of ${}. Failure reason: {}",
                bid.master_game.master_game.name, bid.bid_amount, reason
            ),
            false,
        ));
    }
    results.failed_bids.push(bid.resolve(false, reason));
}

/// Apply a winning bid. Returns false if the game could not be placed after all.
fn award_bid(
    working: &mut LeagueYear,
    bid: PickupBid,
    now: DateTime<Utc>,
    results: &mut ActionProcessingResults,
) -> bool {
    let game_name = bid.master_game.master_game.name.clone();

    if let Some(drop_id) = bid.conditional_drop {
        if let Some(removed) = execute_drop(working, bid.publisher_id, drop_id, now) {
            if let Some(publisher) = working.publisher_by_id(bid.publisher_id) {
                results.league_actions.push(LeagueAction::new(
                    publisher,
                    now,
                    LeagueActionType::DropGame,
                    format!("Dropped game: '{}' (conditional drop)", removed.name()),
                    false,
                ));
            }
            results.removed_games.push(removed);
        }
    }

    let view: &LeagueYear = working;
    let slot = view.publisher_by_id(bid.publisher_id).and_then(|publisher| {
        best_slot(
            publisher,
            Some(&bid.master_game),
            bid.counter_pick,
            view,
            bid.allow_ineligible_slot,
        )
    });
    let Some(slot) = slot else {
        fail_bid(
            working,
            bid,
            "There are no open slots that this game is eligible for.",
            now,
            results,
        );
        return false;
    };

    let Some(publisher) = working.publisher_by_id_mut(bid.publisher_id) else {
        return false;
    };
    publisher.budget -= bid.bid_amount;
    let mut game = PublisherGame::new(
        publisher.id,
        &game_name,
        Some(bid.master_game.clone()),
        bid.counter_pick,
        slot,
        now,
    );
    game.bid_amount = Some(bid.bid_amount);
    publisher.games.push(game.clone());

    let kind = if bid.counter_pick { " as a counter pick" } else { "" };
    let description = format!(
        "Acquired game: '{}'{} with a bid of ${}",
        game_name, kind, bid.bid_amount
    );
    results.league_actions.push(LeagueAction::new(
        publisher,
        now,
        LeagueActionType::PickupGame,
        description,
        false,
    ));
    results.added_games.push(game);
    results.success_bids.push(bid.resolve(true, WON_BID_OUTCOME));
    true
}
