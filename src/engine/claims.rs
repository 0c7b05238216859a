//! Claim validation and slot selection.

use crate::cli::types::ids::MasterGameId;
use crate::domain::claims::{ClaimError, ClaimGameRequest, ClaimResult};
use crate::domain::league::LeagueYear;
use crate::domain::master_game::MasterGameYear;
use crate::domain::publisher::{Publisher, PublisherGame};
use crate::engine::eligibility::{game_fits_slot, game_is_eligible};
use chrono::{DateTime, NaiveDate, Utc};

/// Every reason `request` cannot be applied to `league_year` as of `today`.
pub fn claim_errors(
    request: &ClaimGameRequest,
    league_year: &LeagueYear,
    today: NaiveDate,
) -> ClaimResult {
    let mut result = ClaimResult {
        override_requested: request.manager_override,
        ..ClaimResult::default()
    };

    let Some(publisher) = league_year.publisher_by_id(request.publisher_id) else {
        result
            .errors
            .push(ClaimError::new(
                "That publisher is not in this league.",
                false,
            ));
        return result;
    };

    if request.master_game.is_none() {
        result.errors.push(ClaimError::new(
            "You must pick a game from the master list.",
            request.manager_action,
        ));
    }

    let errors = if request.counter_pick {
        counter_pick_errors(request, publisher, league_year)
    } else {
        standard_game_errors(request, publisher, league_year, today)
    };
    result.errors.extend(errors);

    let has_open_slot = !publisher
        .open_slot_numbers(&league_year.options, request.counter_pick)
        .is_empty();
    if has_open_slot {
        let allow_ineligible = request.manager_override || request.allow_ineligible_slot;
        result.best_slot = best_slot(
            publisher,
            request.master_game.as_ref(),
            request.counter_pick,
            league_year,
            allow_ineligible,
        );
        if result.best_slot.is_none() {
            result.errors.push(ClaimError::new(
                "There are no open slots that this game is eligible for.",
                true,
            ));
        }
    }

    if !result.success() {
        tracing::debug!(
            publisher = %publisher.name,
            game = %request.game_name,
            errors = ?result.messages(),
            "Claim rejected"
        );
    }
    result
}

fn standard_game_errors(
    request: &ClaimGameRequest,
    publisher: &Publisher,
    league_year: &LeagueYear,
    today: NaiveDate,
) -> Vec<ClaimError> {
    let mut errors = Vec::new();
    let options = &league_year.options;

    if let Some(master_game_year) = &request.master_game {
        let game = &master_game_year.master_game;
        let holders = league_year.publisher_game_for(game.id);

        if holders.iter().any(|(_, g)| !g.counter_pick) {
            errors.push(ClaimError::new(
                "Cannot claim a game that someone already has.",
                false,
            ));
        }
        if holders
            .iter()
            .any(|(p, g)| g.counter_pick && p.id == publisher.id)
        {
            errors.push(ClaimError::new(
                "You cannot select a game that you have counter picked.",
                false,
            ));
        }

        let factors = league_year.eligibility_factors(game, today);
        if !game_is_eligible(&factors) {
            errors.push(ClaimError::new(
                "That game is not eligible under this league's settings.",
                true,
            ));
        }
        if game.released_before_year(league_year.year) {
            errors.push(ClaimError::new(
                "That game was released prior to the start of the year.",
                true,
            ));
        } else if !request.is_draft_claim() && factors.released {
            errors.push(ClaimError::new(
                "That game has already been released.",
                true,
            ));
        }
        if !request.is_draft_claim() && game.critic_score.is_some() {
            errors.push(ClaimError::new("That game already has a score.", true));
        }
        if !game.could_release_in_year(league_year.year) {
            errors.push(ClaimError::new(
                "That game is not scheduled to be released this year.",
                true,
            ));
        }
    }

    if publisher.open_slot_numbers(options, false).is_empty() {
        errors.push(ClaimError::new("User's game spaces are filled.", false));
    }
    if request.is_draft_claim() && publisher.standard_games().count() >= options.games_to_draft {
        errors.push(ClaimError::new(
            "User cannot draft any more standard games.",
            false,
        ));
    }
    errors
}

fn counter_pick_errors(
    request: &ClaimGameRequest,
    publisher: &Publisher,
    league_year: &LeagueYear,
) -> Vec<ClaimError> {
    let mut errors = Vec::new();
    let options = &league_year.options;

    if let Some(master_game_year) = &request.master_game {
        let holders = league_year.publisher_game_for(master_game_year.id());
        let published_by_other = holders
            .iter()
            .any(|(p, g)| !g.counter_pick && p.id != publisher.id);
        if !published_by_other {
            errors.push(ClaimError::new(
                "Cannot counter pick a game that no other player is publishing.",
                false,
            ));
        }
        if holders.iter().any(|(_, g)| g.counter_pick) {
            errors.push(ClaimError::new(
                "Cannot counter-pick a game that someone else has already counter picked.",
                false,
            ));
        }
        if publisher
            .game_by_master_game_id(master_game_year.id())
            .is_some()
        {
            errors.push(ClaimError::new(
                "You cannot counter pick a game that you already have.",
                false,
            ));
        }
    }

    if publisher.open_slot_numbers(options, true).is_empty() {
        errors.push(ClaimError::new(
            "User's counter pick spaces are filled.",
            false,
        ));
    }
    if request.is_draft_claim()
        && publisher.counter_picks().count() >= options.counter_picks_to_draft
    {
        errors.push(ClaimError::new(
            "User cannot draft any more counter picks.",
            false,
        ));
    }
    errors
}

/// Slot a claimed game lands in.
///
/// A special slot the game fits beats a regular slot. With `allow_ineligible` the
/// first open slot is used when nothing else fits.
pub fn best_slot(
    publisher: &Publisher,
    master_game: Option<&MasterGameYear>,
    counter_pick: bool,
    league_year: &LeagueYear,
    allow_ineligible: bool,
) -> Option<usize> {
    let open_slots: Vec<_> = publisher
        .publisher_slots(&league_year.options)
        .into_iter()
        .filter(|s| s.counter_pick == counter_pick && s.game.is_none())
        .collect();

    if counter_pick {
        return open_slots.first().map(|s| s.slot_number);
    }

    let Some(master_game_year) = master_game else {
        return open_slots
            .iter()
            .find(|s| s.special_slot.is_none())
            .or_else(|| open_slots.first())
            .map(|s| s.slot_number);
    };
    let game = &master_game_year.master_game;

    let special_fit = open_slots
        .iter()
        .filter(|s| s.special_slot.is_some())
        .find(|s| game_fits_slot(game, s, league_year));
    let regular_fit = open_slots
        .iter()
        .filter(|s| s.special_slot.is_none())
        .find(|s| game_fits_slot(game, s, league_year));

    special_fit
        .or(regular_fit)
        .or_else(|| {
            if allow_ineligible {
                open_slots
                    .iter()
                    .find(|s| s.special_slot.is_none())
                    .or_else(|| open_slots.first())
            } else {
                None
            }
        })
        .map(|s| s.slot_number)
}

/// Why `master_game_id` cannot be dropped by `publisher`, if anything.
pub fn drop_error(
    publisher: &Publisher,
    master_game_id: MasterGameId,
    league_year: &LeagueYear,
) -> Option<String> {
    match publisher
        .standard_games()
        .find(|g| g.master_game_id() == Some(master_game_id))
    {
        Some(game) => drop_error_for_game(publisher, game, league_year),
        None => Some("Cannot drop a game that you do not have.".to_string()),
    }
}

pub fn drop_error_for_game(
    publisher: &Publisher,
    game: &PublisherGame,
    league_year: &LeagueYear,
) -> Option<String> {
    let options = &league_year.options;
    if game.counter_pick {
        return Some("You cannot drop a counter pick.".to_string());
    }
    if options.drop_only_draft_games && !game.was_drafted() {
        return Some(
            "You can only drop games that you drafted due to your league settings.".to_string(),
        );
    }
    let counter_picked = game
        .master_game_id()
        .is_some_and(|id| league_year.is_counter_picked(id));
    if options.counter_picks_block_drops && counter_picked {
        return Some(
            "You cannot drop that game because it was counter picked, due to your league settings."
                .to_string(),
        );
    }
    if let Err(e) = publisher.can_drop_game(game.will_release(), options) {
        return Some(e.to_string());
    }
    None
}

/// Put the claimed game into `slot` on the requesting publisher. Returns the new game.
pub fn apply_claim(
    league_year: &mut LeagueYear,
    request: &ClaimGameRequest,
    slot: usize,
    now: DateTime<Utc>,
) -> Option<PublisherGame> {
    let publisher = league_year.publisher_by_id_mut(request.publisher_id)?;
    let mut game = PublisherGame::new(
        publisher.id,
        &request.game_name,
        request.master_game.clone(),
        request.counter_pick,
        slot,
        now,
    );
    game.draft_position = request.draft_position;
    game.overall_draft_position = request.overall_draft_position;
    game.bid_amount = request.bid_amount;
    publisher.games.push(game.clone());
    Some(game)
}
