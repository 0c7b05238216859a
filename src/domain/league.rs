//! Leagues and their per-season state.

use crate::cli::types::ids::{LeagueId, MasterGameId, MessageId, PublisherId, UserId};
use crate::cli::types::time::{LeagueYearKey, Year};
use crate::domain::master_game::MasterGame;
use crate::domain::options::LeagueOptions;
use crate::domain::publisher::{Publisher, PublisherGame};
use crate::error::{FantasyCriticError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PlayStatus {
    #[default]
    NotStartedDraft,
    Drafting,
    DraftPaused,
    DraftFinal,
}

impl PlayStatus {
    pub fn play_started(&self) -> bool {
        *self != PlayStatus::NotStartedDraft
    }

    pub fn draft_is_active(&self) -> bool {
        *self == PlayStatus::Drafting
    }

    pub fn draft_is_paused(&self) -> bool {
        *self == PlayStatus::DraftPaused
    }

    pub fn draft_finished(&self) -> bool {
        *self == PlayStatus::DraftFinal
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlayStatus::NotStartedDraft => "NotStartedDraft",
            PlayStatus::Drafting => "Drafting",
            PlayStatus::DraftPaused => "DraftPaused",
            PlayStatus::DraftFinal => "DraftFinal",
        }
    }
}

impl fmt::Display for PlayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PlayStatus {
    type Err = FantasyCriticError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "NotStartedDraft" => Ok(PlayStatus::NotStartedDraft),
            "Drafting" => Ok(PlayStatus::Drafting),
            "DraftPaused" => Ok(PlayStatus::DraftPaused),
            "DraftFinal" => Ok(PlayStatus::DraftFinal),
            _ => Err(FantasyCriticError::validation(format!(
                "Unknown play status: {}",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct League {
    pub id: LeagueId,
    pub name: String,
    pub manager: UserId,
    pub public_league: bool,
    pub test_league: bool,
    pub archived: bool,
    pub years: Vec<Year>,
}

impl League {
    pub fn is_manager(&self, user: UserId) -> bool {
        self.manager == user
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityOverride {
    pub master_game_id: MasterGameId,
    pub eligible: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagOverride {
    pub master_game_id: MasterGameId,
    pub tags: Vec<String>,
}

/// A note the league manager posts to a season's page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerMessage {
    pub id: MessageId,
    pub league_year_key: LeagueYearKey,
    pub text: String,
    pub is_public: bool,
    pub timestamp: DateTime<Utc>,
    pub deleted: bool,
}

/// Everything the eligibility rules need to know about one game in one league.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibilityFactors {
    pub master_game_id: MasterGameId,
    pub eligibility_override: Option<bool>,
    pub tags: Vec<String>,
    pub banned_tags: Vec<String>,
    pub released: bool,
    pub will_release: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeagueYear {
    pub league: League,
    pub year: Year,
    pub options: LeagueOptions,
    pub play_status: PlayStatus,
    pub eligibility_overrides: Vec<EligibilityOverride>,
    pub tag_overrides: Vec<TagOverride>,
    pub draft_started_timestamp: Option<DateTime<Utc>>,
    pub publishers: Vec<Publisher>,
}

impl LeagueYear {
    pub fn key(&self) -> LeagueYearKey {
        LeagueYearKey::new(self.league.id, self.year)
    }

    pub fn publisher_by_id(&self, id: PublisherId) -> Option<&Publisher> {
        self.publishers.iter().find(|p| p.id == id)
    }

    pub fn publisher_by_id_mut(&mut self, id: PublisherId) -> Option<&mut Publisher> {
        self.publishers.iter_mut().find(|p| p.id == id)
    }

    pub fn require_publisher(&self, id: PublisherId) -> Result<&Publisher> {
        self.publisher_by_id(id)
            .ok_or_else(|| FantasyCriticError::not_found("Publisher", id))
    }

    pub fn user_publisher(&self, user: UserId) -> Option<&Publisher> {
        self.publishers.iter().find(|p| p.user == user)
    }

    /// Standard (non counter-pick) games held across the league.
    pub fn standard_games_taken(&self) -> usize {
        self.publishers
            .iter()
            .map(|p| p.games.iter().filter(|g| !g.counter_pick).count())
            .sum()
    }

    pub fn eligibility_override_for(&self, master_game_id: MasterGameId) -> Option<bool> {
        self.eligibility_overrides
            .iter()
            .find(|o| o.master_game_id == master_game_id)
            .map(|o| o.eligible)
    }

    pub fn tag_override_for(&self, master_game_id: MasterGameId) -> Option<&[String]> {
        self.tag_overrides
            .iter()
            .find(|o| o.master_game_id == master_game_id)
            .map(|o| o.tags.as_slice())
    }

    /// The game's tags as this league sees them.
    pub fn tags_for(&self, master_game: &MasterGame) -> Vec<String> {
        match self.tag_override_for(master_game.id) {
            Some(tags) => tags.to_vec(),
            None => master_game.tag_names(),
        }
    }

    pub fn eligibility_factors(
        &self,
        master_game: &MasterGame,
        today: NaiveDate,
    ) -> EligibilityFactors {
        EligibilityFactors {
            master_game_id: master_game.id,
            eligibility_override: self.eligibility_override_for(master_game.id),
            tags: self.tags_for(master_game),
            banned_tags: self.options.banned_tags(),
            released: master_game.is_released(today),
            will_release: master_game.releases_in_year(self.year),
        }
    }

    /// Every publisher holding the game, as a standard pick or a counter pick.
    pub fn publisher_game_for(
        &self,
        master_game_id: MasterGameId,
    ) -> Vec<(&Publisher, &PublisherGame)> {
        self.publishers
            .iter()
            .flat_map(|p| {
                p.games
                    .iter()
                    .filter(move |g| g.master_game_id() == Some(master_game_id))
                    .map(move |g| (p, g))
            })
            .collect()
    }

    /// A game is counter-picked when any publisher holds it in a counter-pick slot.
    pub fn is_counter_picked(&self, master_game_id: MasterGameId) -> bool {
        self.publisher_game_for(master_game_id)
            .iter()
            .any(|(_, g)| g.counter_pick)
    }

    pub fn is_finished(&self, finished_years: &[Year]) -> bool {
        finished_years.contains(&self.year)
    }
}
