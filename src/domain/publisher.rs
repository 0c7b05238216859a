//! Publishers: a user's roster within one league season.

use crate::cli::types::ids::{MasterGameId, PublisherGameId, PublisherId, TradeId, UserId};
use crate::cli::types::time::{LeagueYearKey, Year};
use crate::domain::league::LeagueYear;
use crate::domain::master_game::MasterGameYear;
use crate::domain::options::{LeagueOptions, SpecialGameSlot};
use crate::domain::scoring::{
    ScoringSystem, EMPTY_COUNTER_PICK_PENALTY, NON_RELEASING_COUNTER_PICK_PENALTY,
};
use crate::domain::system::SystemWideValues;
use crate::error::{FantasyCriticError, Result};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const STARTING_BUDGET: u32 = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublisherGame {
    pub id: PublisherGameId,
    pub publisher_id: PublisherId,
    pub game_name: String,
    pub timestamp: DateTime<Utc>,
    pub counter_pick: bool,
    pub manual_critic_score: Option<f64>,
    pub manual_will_not_release: bool,
    pub fantasy_points: Option<f64>,
    pub master_game: Option<MasterGameYear>,
    pub slot_number: usize,
    pub draft_position: Option<u32>,
    pub overall_draft_position: Option<u32>,
    pub bid_amount: Option<u32>,
    pub acquired_in_trade_id: Option<TradeId>,
}

impl PublisherGame {
    pub fn new(
        publisher_id: PublisherId,
        game_name: &str,
        master_game: Option<MasterGameYear>,
        counter_pick: bool,
        slot_number: usize,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: PublisherGameId::new_v4(),
            publisher_id,
            game_name: game_name.to_string(),
            timestamp,
            counter_pick,
            manual_critic_score: None,
            manual_will_not_release: false,
            fantasy_points: None,
            master_game,
            slot_number,
            draft_position: None,
            overall_draft_position: None,
            bid_amount: None,
            acquired_in_trade_id: None,
        }
    }

    pub fn name(&self) -> &str {
        self.master_game
            .as_ref()
            .map(|m| m.master_game.name.as_str())
            .unwrap_or(&self.game_name)
    }

    pub fn master_game_id(&self) -> Option<MasterGameId> {
        self.master_game.as_ref().map(|m| m.id())
    }

    pub fn will_release(&self) -> bool {
        if self.manual_will_not_release {
            return false;
        }
        self.master_game.as_ref().is_some_and(|m| m.will_release())
    }

    pub fn critic_score(&self) -> Option<f64> {
        self.manual_critic_score.or_else(|| {
            self.master_game
                .as_ref()
                .and_then(|m| m.master_game.critic_score)
        })
    }

    pub fn was_drafted(&self) -> bool {
        self.draft_position.is_some()
    }

    /// Points this game is worth right now, or `None` while it is still pending.
    pub fn calculate_fantasy_points(
        &self,
        scoring: ScoringSystem,
        year: Year,
        year_finished: bool,
    ) -> Option<f64> {
        if let Some(score) = self.manual_critic_score {
            return Some(scoring.points_for_score(score, self.counter_pick));
        }

        if !self.manual_will_not_release {
            if let Some(master_game_year) = &self.master_game {
                let game = &master_game_year.master_game;
                let released_in_year = game
                    .release_date
                    .map_or(true, |release| release.year() == year.as_i32());
                if let (Some(score), true) = (game.critic_score, released_in_year) {
                    return Some(scoring.points_for_score(score, self.counter_pick));
                }
            }
        }

        if year_finished {
            if self.counter_pick && year.supports_2022_features() {
                return Some(NON_RELEASING_COUNTER_PICK_PENALTY);
            }
            return Some(0.0);
        }
        if self.manual_will_not_release {
            return Some(0.0);
        }
        None
    }

    pub fn into_former(
        self,
        removed_timestamp: DateTime<Utc>,
        removed_note: &str,
    ) -> FormerPublisherGame {
        FormerPublisherGame {
            game: self,
            removed_timestamp,
            removed_note: removed_note.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormerPublisherGame {
    pub game: PublisherGame,
    pub removed_timestamp: DateTime<Utc>,
    pub removed_note: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PublisherSlot {
    pub slot_number: usize,
    pub overall_slot_number: usize,
    pub counter_pick: bool,
    pub special_slot: Option<SpecialGameSlot>,
    pub game: Option<PublisherGame>,
}

impl PublisherSlot {
    pub fn slot_is_valid(&self, league_year: &LeagueYear) -> bool {
        crate::engine::eligibility::slot_is_valid(self, league_year)
    }

    pub fn with_replaced_game(&self, game: Option<PublisherGame>) -> PublisherSlot {
        PublisherSlot {
            game,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Publisher {
    pub id: PublisherId,
    pub league_year_key: LeagueYearKey,
    pub user: UserId,
    pub name: String,
    pub icon: Option<String>,
    pub draft_position: u32,
    pub games: Vec<PublisherGame>,
    pub former_games: Vec<FormerPublisherGame>,
    pub budget: u32,
    pub free_games_dropped: i32,
    pub will_not_release_games_dropped: i32,
    pub will_release_games_dropped: i32,
    pub auto_draft: bool,
}

impl PartialEq for Publisher {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Publisher {}

impl Publisher {
    pub fn new(
        league_year_key: LeagueYearKey,
        user: UserId,
        name: &str,
        draft_position: u32,
    ) -> Self {
        Self {
            id: PublisherId::new_v4(),
            league_year_key,
            user,
            name: name.to_string(),
            icon: None,
            draft_position,
            games: Vec::new(),
            former_games: Vec::new(),
            budget: STARTING_BUDGET,
            free_games_dropped: 0,
            will_not_release_games_dropped: 0,
            will_release_games_dropped: 0,
            auto_draft: false,
        }
    }

    pub fn year(&self) -> Year {
        self.league_year_key.year
    }

    pub fn standard_games(&self) -> impl Iterator<Item = &PublisherGame> {
        self.games.iter().filter(|g| !g.counter_pick)
    }

    pub fn counter_picks(&self) -> impl Iterator<Item = &PublisherGame> {
        self.games.iter().filter(|g| g.counter_pick)
    }

    /// Mean critic score of scored standard games.
    pub fn average_critic_score(&self) -> Option<f64> {
        let scores: Vec<f64> = self
            .standard_games()
            .filter_map(|g| g.critic_score())
            .collect();
        if scores.is_empty() {
            return None;
        }
        Some(scores.iter().sum::<f64>() / scores.len() as f64)
    }

    pub fn total_fantasy_points(&self, year_finished: bool, options: &LeagueOptions) -> f64 {
        let game_points: f64 = self.games.iter().filter_map(|g| g.fantasy_points).sum();
        if !(year_finished && self.year().supports_2022_features()) {
            return game_points;
        }
        let empty_counter_pick_slots = options
            .counter_picks
            .saturating_sub(self.counter_picks().count());
        game_points + EMPTY_COUNTER_PICK_PENALTY * empty_counter_pick_slots as f64
    }

    pub fn projected_fantasy_points(
        &self,
        league_year: &LeagueYear,
        values: &SystemWideValues,
        today: NaiveDate,
    ) -> f64 {
        let options = &league_year.options;
        let year_over = today > league_year.year.last_date();
        let ineligible_points_count = options.has_special_slots();

        self.publisher_slots(options)
            .iter()
            .map(|slot| match &slot.game {
                Some(game) => {
                    if !slot.counter_pick
                        && !ineligible_points_count
                        && !slot.slot_is_valid(league_year)
                    {
                        return 0.0;
                    }
                    if let Some(points) = game.fantasy_points {
                        return points;
                    }
                    match &game.master_game {
                        Some(master_game) => master_game
                            .projected_fantasy_points(options.scoring_system, game.counter_pick),
                        None if game.counter_pick => values.average_counter_pick_points,
                        None => values.average_standard_game_points,
                    }
                }
                None if year_over => {
                    if slot.counter_pick && league_year.year.supports_2022_features() {
                        EMPTY_COUNTER_PICK_PENALTY
                    } else {
                        0.0
                    }
                }
                None if slot.counter_pick => values.average_counter_pick_points,
                None => values.average_pickup_only_standard_game_points,
            })
            .sum()
    }

    /// Standard slots first, then counter-pick slots.
    pub fn publisher_slots(&self, options: &LeagueOptions) -> Vec<PublisherSlot> {
        let mut slots = Vec::with_capacity(options.standard_games + options.counter_picks);
        for slot_number in 0..options.standard_games {
            slots.push(PublisherSlot {
                slot_number,
                overall_slot_number: slot_number,
                counter_pick: false,
                special_slot: options.special_slot_for(slot_number).cloned(),
                game: self
                    .standard_games()
                    .find(|g| g.slot_number == slot_number)
                    .cloned(),
            });
        }
        for slot_number in 0..options.counter_picks {
            slots.push(PublisherSlot {
                slot_number,
                overall_slot_number: options.standard_games + slot_number,
                counter_pick: true,
                special_slot: None,
                game: self
                    .counter_picks()
                    .find(|g| g.slot_number == slot_number)
                    .cloned(),
            });
        }
        slots
    }

    pub fn open_slot_numbers(&self, options: &LeagueOptions, counter_pick: bool) -> Vec<usize> {
        self.publisher_slots(options)
            .into_iter()
            .filter(|s| s.counter_pick == counter_pick && s.game.is_none())
            .map(|s| s.slot_number)
            .collect()
    }

    pub fn game_by_master_game_id(&self, master_game_id: MasterGameId) -> Option<&PublisherGame> {
        self.games
            .iter()
            .find(|g| g.master_game_id() == Some(master_game_id))
    }

    pub fn game_by_id(&self, id: PublisherGameId) -> Option<&PublisherGame> {
        self.games.iter().find(|g| g.id == id)
    }

    pub fn my_master_games(&self) -> HashSet<MasterGameId> {
        self.games.iter().filter_map(|g| g.master_game_id()).collect()
    }

    /// The category allowance is used before the free one.
    pub fn can_drop_game(&self, will_release: bool, options: &LeagueOptions) -> Result<()> {
        if will_release {
            if options.unlimited_will_release_drops()
                || self.will_release_games_dropped < options.will_release_droppable_games
            {
                return Ok(());
            }
        } else if options.unlimited_will_not_release_drops()
            || self.will_not_release_games_dropped < options.will_not_release_droppable_games
        {
            return Ok(());
        }

        if options.unlimited_free_drops()
            || self.free_games_dropped < options.free_droppable_games
        {
            return Ok(());
        }

        let category = if will_release {
            "Will Release"
        } else {
            "Will Not Release"
        };
        Err(FantasyCriticError::validation(format!(
            "Publisher cannot drop any more '{}' games",
            category
        )))
    }

    /// Count a drop against whichever allowance `can_drop_game` would use.
    pub fn record_drop(&mut self, will_release: bool, options: &LeagueOptions) {
        if will_release {
            if options.unlimited_will_release_drops()
                || self.will_release_games_dropped < options.will_release_droppable_games
            {
                self.will_release_games_dropped += 1;
                return;
            }
        } else if options.unlimited_will_not_release_drops()
            || self.will_not_release_games_dropped < options.will_not_release_droppable_games
        {
            self.will_not_release_games_dropped += 1;
            return;
        }
        self.free_games_dropped += 1;
    }

    /// Move a game into former games. Returns the removed game.
    pub fn remove_game(
        &mut self,
        id: PublisherGameId,
        removed_timestamp: DateTime<Utc>,
        note: &str,
    ) -> Option<PublisherGame> {
        let index = self.games.iter().position(|g| g.id == id)?;
        let game = self.games.remove(index);
        self.former_games
            .push(game.clone().into_former(removed_timestamp, note));
        Some(game)
    }
}
