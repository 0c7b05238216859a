//! Eligibility of games for leagues, slots and Royale.

use crate::domain::league::{EligibilityFactors, LeagueYear};
use crate::domain::master_game::MasterGame;
use crate::domain::publisher::PublisherSlot;
use crate::domain::royale::ROYALE_BANNED_TAGS;

/// An explicit override wins; otherwise no tag may be banned by the league.
pub fn game_is_eligible(factors: &EligibilityFactors) -> bool {
    if let Some(eligible) = factors.eligibility_override {
        return eligible;
    }
    !factors
        .tags
        .iter()
        .any(|tag| factors.banned_tags.contains(tag))
}

pub fn game_is_eligible_in_league(master_game: &MasterGame, league_year: &LeagueYear) -> bool {
    game_is_eligible(&league_year.eligibility_factors(master_game, league_year.year.last_date()))
}

/// Whether `master_game` may sit in `slot` (ignoring what currently occupies it).
pub fn game_fits_slot(
    master_game: &MasterGame,
    slot: &PublisherSlot,
    league_year: &LeagueYear,
) -> bool {
    if slot.counter_pick {
        return true;
    }
    match &slot.special_slot {
        Some(special) => special.game_fits(&league_year.tags_for(master_game)),
        None => game_is_eligible_in_league(master_game, league_year),
    }
}

/// Empty slots, counter-pick slots and games without a master game are always valid.
pub fn slot_is_valid(slot: &PublisherSlot, league_year: &LeagueYear) -> bool {
    let Some(game) = &slot.game else {
        return true;
    };
    match &game.master_game {
        Some(master_game_year) => game_fits_slot(&master_game_year.master_game, slot, league_year),
        None => true,
    }
}

pub fn royale_banned_tags(master_game: &MasterGame) -> Vec<&'static str> {
    ROYALE_BANNED_TAGS
        .iter()
        .copied()
        .filter(|tag| master_game.has_tag(tag))
        .collect()
}

pub fn royale_eligible(master_game: &MasterGame) -> bool {
    royale_banned_tags(master_game).is_empty()
}
