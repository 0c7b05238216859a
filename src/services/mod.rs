//! Services: validate a request against current state, then persist through the repositories.
//!
//! - `league`: league creation, options, overrides, manual scores and messages
//! - `members`: membership and active players
//! - `publisher`: publisher lifecycle, queues, bid priority and roster order
//! - `draft`: draft flow, auto draft and undo
//! - `acquisition`: manager claims, pickup bids, drop requests and special auctions
//! - `processing`: batch processing of bids and drops
//! - `trades`: trade lifecycle
//! - `royale`: the quarterly Royale mode
//! - `interleague`: site-wide data, master games and requests
//!
//! Every service borrows the repository mutably and reads time from a `Clock`.

pub mod acquisition;
pub mod draft;
pub mod interleague;
pub mod league;
pub mod members;
pub mod processing;
pub mod publisher;
pub mod royale;
pub mod trades;

#[cfg(test)]
mod tests;

pub use acquisition::GameAcquisitionService;
pub use draft::DraftService;
pub use interleague::InterLeagueService;
pub use league::LeagueService;
pub use members::LeagueMemberService;
pub use processing::ActionProcessingService;
pub use publisher::{EditPublisherRequest, PublisherService};
pub use royale::RoyaleService;
pub use trades::{TradeProposal, TradeService};

use crate::cli::types::ids::{LeagueId, MasterGameId, PublisherId, UserId};
use crate::cli::types::time::{LeagueYearKey, Year};
use crate::domain::{
    League, LeagueAction, LeagueActionType, LeagueYear, MasterGameYear, Publisher, SupportedYear,
};
use crate::error::{FantasyCriticError, Result};
use crate::storage::{FantasyCriticRepo, LeagueChanges, MasterGameRepo, RoyaleRepo};
use chrono::{DateTime, Utc};

/// Everything the services need from storage.
pub trait Repository: FantasyCriticRepo + MasterGameRepo + RoyaleRepo {}

impl<T: FantasyCriticRepo + MasterGameRepo + RoyaleRepo> Repository for T {}

/// League mutations are refused while action processing runs.
pub(crate) fn ensure_writable<R: FantasyCriticRepo + ?Sized>(repo: &R) -> Result<()> {
    if repo.get_system_wide_settings()?.action_processing_mode {
        return Err(FantasyCriticError::ReadOnly);
    }
    Ok(())
}

pub(crate) fn require_manager(league: &League, user: UserId) -> Result<()> {
    if league.is_manager(user) {
        Ok(())
    } else {
        Err(FantasyCriticError::forbidden(
            "Only the league manager can do that.",
        ))
    }
}

pub(crate) fn require_league<R: FantasyCriticRepo + ?Sized>(
    repo: &R,
    id: LeagueId,
) -> Result<League> {
    repo.get_league(id)?
        .ok_or_else(|| FantasyCriticError::not_found("League", id))
}

pub(crate) fn require_league_year<R: FantasyCriticRepo + ?Sized>(
    repo: &R,
    key: LeagueYearKey,
) -> Result<LeagueYear> {
    repo.get_league_year(key)?
        .ok_or_else(|| FantasyCriticError::not_found("League year", key))
}

/// The publisher `user` owns in `league_year`.
pub(crate) fn require_owned_publisher(
    league_year: &LeagueYear,
    publisher_id: PublisherId,
    user: UserId,
) -> Result<&Publisher> {
    let publisher = league_year.require_publisher(publisher_id)?;
    if publisher.user != user {
        return Err(FantasyCriticError::forbidden(
            "You do not own that publisher.",
        ));
    }
    Ok(publisher)
}

pub(crate) fn require_supported_year<R: FantasyCriticRepo + ?Sized>(
    repo: &R,
    year: Year,
) -> Result<SupportedYear> {
    repo.get_supported_years()?
        .into_iter()
        .find(|y| y.year == year)
        .ok_or_else(|| FantasyCriticError::not_found("Supported year", year))
}

pub(crate) fn finished_years<R: FantasyCriticRepo + ?Sized>(repo: &R) -> Result<Vec<Year>> {
    Ok(repo
        .get_supported_years()?
        .into_iter()
        .filter(|y| y.finished)
        .map(|y| y.year)
        .collect())
}

pub(crate) fn require_master_game_year<R: MasterGameRepo + ?Sized>(
    repo: &R,
    id: MasterGameId,
    year: Year,
) -> Result<MasterGameYear> {
    repo.get_master_game_year(id, year)?
        .ok_or_else(|| FantasyCriticError::not_found("Master game", id))
}

/// A manager action recorded against the manager's own publisher, if they have one.
pub(crate) fn manager_action(
    league_year: &LeagueYear,
    now: DateTime<Utc>,
    action_type: LeagueActionType,
    description: impl Into<String>,
) -> Option<LeagueAction> {
    league_year
        .user_publisher(league_year.league.manager)
        .map(|p| LeagueAction::new(p, now, action_type, description, true))
}

/// Recompute every publisher game's fantasy points for one year's leagues.
pub(crate) fn recalculate_fantasy_points<R: FantasyCriticRepo + ?Sized>(
    repo: &mut R,
    year: Year,
) -> Result<usize> {
    let finished = finished_years(repo)?.contains(&year);
    let mut updated = 0;
    for league_year in repo.get_league_years(year)? {
        let scoring = league_year.options.scoring_system;
        let mut publishers = league_year.publishers;
        for publisher in &mut publishers {
            for game in &mut publisher.games {
                game.fantasy_points = game.calculate_fantasy_points(scoring, year, finished);
            }
        }
        repo.commit_league_changes(&LeagueChanges::new().with_publishers(&publishers))?;
        updated += publishers.len();
    }
    tracing::info!(%year, finished, publishers = updated, "Recalculated fantasy points");
    Ok(updated)
}

pub(crate) fn require_non_blank(value: &str, message: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(FantasyCriticError::validation(message));
    }
    Ok(trimmed.to_string())
}
