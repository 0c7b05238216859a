//! Canonical real-world game records and their per-year statistics.

use crate::cli::types::ids::{MasterGameId, RequestId, UserId};
use crate::cli::types::time::{Year, YearQuarter};
use crate::domain::scoring::ScoringSystem;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use uuid::Uuid;

/// Tag names that carry rules in code.
pub mod tag_names {
    pub const PORT: &str = "Port";
    pub const REMASTER: &str = "Remaster";
    pub const REIMAGINING: &str = "Reimagining";
    pub const DIRECTORS_CUT: &str = "DirectorsCut";
    pub const EXPANSION_PACK: &str = "ExpansionPack";
    pub const YEARLY_INSTALLMENT: &str = "YearlyInstallment";
    pub const PARTIAL_REMAKE: &str = "PartialRemake";
    pub const RELEASED_INTERNATIONALLY: &str = "ReleasedInternationally";
    pub const CURRENTLY_IN_EARLY_ACCESS: &str = "CurrentlyInEarlyAccess";
    pub const FREE_TO_PLAY: &str = "FreeToPlay";
    pub const NEW_GAME: &str = "NewGame";
    pub const NEW_GAMING_IP: &str = "NewGamingIP";
}

/// Base projection for an unscored game before hype is applied.
pub const BASE_PROJECTED_POINTS: f64 = 5.0;
/// Projected points gained per point of date-adjusted hype.
pub const HYPE_PROJECTION_WEIGHT: f64 = 0.75;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TagType {
    Base,
    Other,
}

/// Eligibility tag attached to a master game.
///
/// Two tags are the same tag when their names match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterGameTag {
    pub name: String,
    pub readable_name: String,
    pub short_name: String,
    pub tag_type: TagType,
    pub has_custom_code: bool,
    pub description: String,
    pub examples: Vec<String>,
    pub badge_color: String,
}

impl MasterGameTag {
    /// A tag with only a name, readable name and type filled in.
    pub fn named(name: &str, readable_name: &str, tag_type: TagType) -> Self {
        Self {
            name: name.to_string(),
            readable_name: readable_name.to_string(),
            short_name: name.chars().filter(|c| c.is_uppercase()).collect(),
            tag_type,
            has_custom_code: false,
            description: String::new(),
            examples: Vec::new(),
            badge_color: "#555555".to_string(),
        }
    }

    /// The tags every new database starts with.
    pub fn defaults() -> Vec<MasterGameTag> {
        use tag_names::*;
        vec![
            MasterGameTag::named(NEW_GAME, "New Game", TagType::Base),
            MasterGameTag::named(NEW_GAMING_IP, "New Gaming IP", TagType::Other),
            MasterGameTag::named(PORT, "Port", TagType::Base),
            MasterGameTag::named(REMASTER, "Remaster", TagType::Base),
            MasterGameTag::named(REIMAGINING, "Reimagining", TagType::Base),
            MasterGameTag::named(DIRECTORS_CUT, "Director's Cut", TagType::Base),
            MasterGameTag::named(EXPANSION_PACK, "Expansion Pack", TagType::Base),
            MasterGameTag::named(PARTIAL_REMAKE, "Partial Remake", TagType::Base),
            MasterGameTag::named(YEARLY_INSTALLMENT, "Yearly Installment", TagType::Other),
            MasterGameTag::named(
                RELEASED_INTERNATIONALLY,
                "Released Internationally",
                TagType::Other,
            ),
            MasterGameTag::named(
                CURRENTLY_IN_EARLY_ACCESS,
                "Currently in Early Access",
                TagType::Other,
            ),
            MasterGameTag::named(FREE_TO_PLAY, "Free to Play", TagType::Other),
        ]
    }
}

impl PartialEq for MasterGameTag {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for MasterGameTag {}

impl Hash for MasterGameTag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

/// A real video game as tracked by the site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasterGame {
    pub id: MasterGameId,
    pub name: String,
    pub estimated_release_date: String,
    pub minimum_release_date: NaiveDate,
    pub maximum_release_date: Option<NaiveDate>,
    pub early_access_release_date: Option<NaiveDate>,
    pub international_release_date: Option<NaiveDate>,
    pub announcement_date: Option<NaiveDate>,
    pub release_date: Option<NaiveDate>,
    pub open_critic_id: Option<u32>,
    pub critic_score: Option<f64>,
    pub has_any_reviews: bool,
    pub notes: Option<String>,
    pub tags: Vec<MasterGameTag>,
    pub first_critic_score_timestamp: Option<DateTime<Utc>>,
    pub delay_contention: bool,
    pub eligibility_changed: bool,
    pub added_timestamp: DateTime<Utc>,
}

impl MasterGame {
    pub fn new(
        name: &str,
        minimum_release_date: NaiveDate,
        added_timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MasterGameId::new_v4(),
            name: name.to_string(),
            estimated_release_date: minimum_release_date.format("%Y-%m-%d").to_string(),
            minimum_release_date,
            maximum_release_date: None,
            early_access_release_date: None,
            international_release_date: None,
            announcement_date: None,
            release_date: None,
            open_critic_id: None,
            critic_score: None,
            has_any_reviews: false,
            notes: None,
            tags: Vec::new(),
            first_critic_score_timestamp: None,
            delay_contention: false,
            eligibility_changed: false,
            added_timestamp,
        }
    }

    pub fn is_released(&self, date: NaiveDate) -> bool {
        self.release_date.is_some_and(|release| release <= date)
    }

    /// True when the release window is bounded.
    pub fn will_release(&self) -> bool {
        self.release_date.is_some() || self.maximum_release_date.is_some()
    }

    /// Certain to release within `year` (known date, or a window that closes by year end).
    pub fn releases_in_year(&self, year: Year) -> bool {
        match (self.release_date, self.maximum_release_date) {
            (Some(release), _) => release.year() == year.as_i32(),
            (None, Some(max)) => {
                max.year() <= year.as_i32() && self.minimum_release_date.year() >= year.as_i32()
            }
            (None, None) => false,
        }
    }

    /// Its release window overlaps `year` at all.
    pub fn could_release_in_year(&self, year: Year) -> bool {
        if let Some(release) = self.release_date {
            return release.year() == year.as_i32();
        }
        let starts_in_time = self.minimum_release_date.year() <= year.as_i32();
        let not_over = self
            .maximum_release_date
            .map_or(true, |max| max.year() >= year.as_i32());
        starts_in_time && not_over
    }

    pub fn released_before_year(&self, year: Year) -> bool {
        self.release_date
            .is_some_and(|release| release.year() < year.as_i32())
    }

    pub fn has_tag(&self, tag_name: &str) -> bool {
        self.tags.iter().any(|t| t.name == tag_name)
    }

    pub fn tag_names(&self) -> Vec<String> {
        self.tags.iter().map(|t| t.name.clone()).collect()
    }

    /// Human-readable descriptions of every field `self` changes relative to `existing`.
    pub fn compare_to_existing(&self, existing: &MasterGame, today: NaiveDate) -> Vec<String> {
        fn date_text(date: Option<NaiveDate>) -> String {
            date.map(|d| d.to_string())
                .unwrap_or_else(|| "<Unknown>".to_string())
        }

        let mut changes = Vec::new();
        if self.name != existing.name {
            changes.push(format!(
                "Name changed from '{}' to '{}'",
                existing.name, self.name
            ));
        }
        if self.estimated_release_date != existing.estimated_release_date {
            changes.push(format!(
                "Estimated release date changed from '{}' to '{}'",
                existing.estimated_release_date, self.estimated_release_date
            ));
        }
        if self.minimum_release_date != existing.minimum_release_date {
            changes.push(format!(
                "Minimum release date changed from {} to {}",
                existing.minimum_release_date, self.minimum_release_date
            ));
        }
        if self.maximum_release_date != existing.maximum_release_date {
            changes.push(format!(
                "Maximum release date changed from {} to {}",
                date_text(existing.maximum_release_date),
                date_text(self.maximum_release_date)
            ));
        }
        if self.release_date != existing.release_date {
            let was_announced_late = existing
                .release_date
                .is_some_and(|release| release <= today);
            let note = if was_announced_late {
                " (game had already released)"
            } else {
                ""
            };
            changes.push(format!(
                "Release date changed from {} to {}{}",
                date_text(existing.release_date),
                date_text(self.release_date),
                note
            ));
        }
        if self.critic_score != existing.critic_score {
            let text = |score: Option<f64>| {
                score
                    .map(|s| format!("{:.2}", s))
                    .unwrap_or_else(|| "<None>".to_string())
            };
            changes.push(format!(
                "Critic score changed from {} to {}",
                text(existing.critic_score),
                text(self.critic_score)
            ));
        }
        if self.notes != existing.notes {
            changes.push("Notes changed".to_string());
        }

        let mut old_tags = existing.tag_names();
        let mut new_tags = self.tag_names();
        old_tags.sort();
        new_tags.sort();
        if old_tags != new_tags {
            changes.push(format!(
                "Tags changed from [{}] to [{}]",
                old_tags.join(", "),
                new_tags.join(", ")
            ));
        }
        changes
    }
}

/// A master game viewed within one season, carrying the site-wide draft statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasterGameYear {
    pub master_game: MasterGame,
    pub year: Year,
    pub percent_standard_game: f64,
    pub percent_counter_pick: f64,
    pub eligible_percent_standard_game: f64,
    pub average_draft_position: Option<f64>,
    pub hype_factor: f64,
    pub date_adjusted_hype_factor: f64,
}

impl MasterGameYear {
    pub fn new(master_game: MasterGame, year: Year) -> Self {
        Self {
            master_game,
            year,
            percent_standard_game: 0.0,
            percent_counter_pick: 0.0,
            eligible_percent_standard_game: 0.0,
            average_draft_position: None,
            hype_factor: 0.0,
            date_adjusted_hype_factor: 0.0,
        }
    }

    pub fn id(&self) -> MasterGameId {
        self.master_game.id
    }

    pub fn will_release(&self) -> bool {
        self.master_game.releases_in_year(self.year)
    }

    /// Real points once scored, otherwise a hype-based projection.
    pub fn projected_fantasy_points(&self, scoring: ScoringSystem, counter_pick: bool) -> f64 {
        if let Some(score) = self.master_game.critic_score {
            return scoring.points_for_score(score, counter_pick);
        }
        let projection =
            BASE_PROJECTED_POINTS + HYPE_PROJECTION_WEIGHT * self.date_adjusted_hype_factor;
        if counter_pick {
            -projection
        } else {
            projection
        }
    }

    pub fn will_release_in_quarter(&self, quarter: YearQuarter) -> bool {
        let game = &self.master_game;
        if let Some(release) = game.release_date {
            return quarter.contains(release);
        }
        let Some(max) = game.maximum_release_date else {
            return false;
        };
        game.minimum_release_date <= quarter.last_date()
            && max <= quarter.last_date()
            && max >= quarter.first_date()
    }

    /// Purchase price in Royale: one and a half times the projection, never below $2.
    pub fn royale_game_cost(&self) -> Decimal {
        let projected = self.projected_fantasy_points(ScoringSystem::Diminishing, false);
        let cost = Decimal::from_f64(projected * 1.5).unwrap_or(Decimal::TWO);
        cost.round_dp(2).max(Decimal::TWO)
    }
}

/// One recorded edit to a master game.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterGameChangeLogEntry {
    pub id: Uuid,
    pub master_game_id: MasterGameId,
    pub changed_by: UserId,
    pub timestamp: DateTime<Utc>,
    pub description: String,
}

/// A user's request to add a game to the master list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterGameRequest {
    pub id: RequestId,
    pub user: UserId,
    pub request_timestamp: DateTime<Utc>,
    pub request_note: String,
    pub game_name: String,
    pub estimated_release_date: Option<String>,
    pub open_critic_id: Option<u32>,
    pub answered: bool,
    pub response_timestamp: Option<DateTime<Utc>>,
    pub response_note: Option<String>,
    pub master_game_id: Option<MasterGameId>,
    pub hidden: bool,
}

impl MasterGameRequest {
    pub fn new(user: UserId, game_name: &str, request_note: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: RequestId::new_v4(),
            user,
            request_timestamp: now,
            request_note: request_note.to_string(),
            game_name: game_name.to_string(),
            estimated_release_date: None,
            open_critic_id: None,
            answered: false,
            response_timestamp: None,
            response_note: None,
            master_game_id: None,
            hidden: false,
        }
    }
}
