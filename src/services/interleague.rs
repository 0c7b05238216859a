//! Site-wide data: users, supported years, master games and requests.

use super::{
    recalculate_fantasy_points, require_master_game_year, require_non_blank,
    require_supported_year, Repository,
};
use crate::cli::types::ids::{MasterGameId, RequestId, UserId};
use crate::cli::types::time::Year;
use crate::core::Clock;
use crate::domain::{
    ActionProcessingSetMetadata, FantasyCriticUser, LeagueYear, MasterGame,
    MasterGameChangeLogEntry, MasterGameRequest, MasterGameTag, MasterGameYear, SiteCounts,
    SupportedYear, SystemWideSettings, SystemWideValues,
};
use crate::engine::eligibility::game_is_eligible_in_league;
use crate::error::{FantasyCriticError, Result};
use crate::opencritic::OpenCriticGame;
use rayon::prelude::*;
use std::collections::BTreeSet;
use uuid::Uuid;

/// Upper bound of the hype factor, reached by a game every eligible league drafts
/// and nobody counter picks.
const MAX_HYPE: f64 = 10.0;

pub struct InterLeagueService<'a, R: Repository> {
    repo: &'a mut R,
    clock: &'a dyn Clock,
}

fn ratio(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

fn average(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}

/// Draft statistics for one game across every league of its year.
fn compute_year_stats(game_year: &mut MasterGameYear, league_years: &[LeagueYear]) {
    let id = game_year.id();
    let mut standard = 0;
    let mut counter_picked = 0;
    let mut eligible = 0;
    let mut draft_positions = Vec::new();

    for league_year in league_years {
        if game_is_eligible_in_league(&game_year.master_game, league_year) {
            eligible += 1;
        }
        for (_, game) in league_year.publisher_game_for(id) {
            if game.counter_pick {
                counter_picked += 1;
            } else {
                standard += 1;
                if let Some(position) = game.overall_draft_position {
                    draft_positions.push(f64::from(position));
                }
            }
        }
    }

    game_year.percent_standard_game = ratio(standard, league_years.len());
    game_year.percent_counter_pick = ratio(counter_picked, standard);
    game_year.eligible_percent_standard_game = ratio(standard, eligible);
    game_year.average_draft_position = average(&draft_positions);
    game_year.hype_factor = MAX_HYPE
        * game_year.eligible_percent_standard_game
        * (1.0 - game_year.percent_counter_pick);
    game_year.date_adjusted_hype_factor = game_year.hype_factor;
}

impl<'a, R: Repository> InterLeagueService<'a, R> {
    pub fn new(repo: &'a mut R, clock: &'a dyn Clock) -> Self {
        Self { repo, clock }
    }

    pub fn add_user(&mut self, display_name: &str) -> Result<FantasyCriticUser> {
        let display_name = require_non_blank(display_name, "Display name cannot be blank.")?;
        let user = FantasyCriticUser {
            id: UserId::new_v4(),
            display_name,
        };
        self.repo.save_user(&user)?;
        tracing::info!(user = %user.id, name = %user.display_name, "Added user");
        Ok(user)
    }

    pub fn get_user(&self, id: UserId) -> Result<FantasyCriticUser> {
        self.repo
            .get_user(id)?
            .ok_or_else(|| FantasyCriticError::not_found("User", id))
    }

    pub fn system_wide_settings(&self) -> Result<SystemWideSettings> {
        Ok(self.repo.get_system_wide_settings()?)
    }

    pub fn system_wide_values(&self) -> Result<SystemWideValues> {
        Ok(self.repo.get_system_wide_values()?)
    }

    pub fn site_counts(&self) -> Result<SiteCounts> {
        Ok(self.repo.get_site_counts()?)
    }

    pub fn supported_years(&self) -> Result<Vec<SupportedYear>> {
        Ok(self.repo.get_supported_years()?)
    }

    pub fn add_supported_year(&mut self, year: Year) -> Result<SupportedYear> {
        if require_supported_year(&*self.repo, year).is_ok() {
            return Err(FantasyCriticError::validation(
                "That year is already supported.",
            ));
        }
        let supported = SupportedYear::open(year);
        self.repo.save_supported_year(&supported)?;
        tracing::info!(%year, "Added supported year");
        Ok(supported)
    }

    pub fn tags(&self) -> Result<Vec<MasterGameTag>> {
        Ok(self.repo.get_master_game_tags()?)
    }

    pub fn get_master_game(&self, id: MasterGameId) -> Result<MasterGame> {
        self.repo
            .get_master_game(id)?
            .ok_or_else(|| FantasyCriticError::not_found("Master game", id))
    }

    pub fn master_games(&self) -> Result<Vec<MasterGame>> {
        Ok(self.repo.get_master_games()?)
    }

    pub fn master_game_year(&self, id: MasterGameId, year: Year) -> Result<MasterGameYear> {
        require_master_game_year(&*self.repo, id, year)
    }

    pub fn master_game_years(&self, year: Year) -> Result<Vec<MasterGameYear>> {
        Ok(self.repo.get_master_game_years(year)?)
    }

    fn validate_master_game(game: &MasterGame) -> Result<()> {
        require_non_blank(&game.name, "Master game name cannot be blank.")?;
        if game
            .maximum_release_date
            .is_some_and(|max| max < game.minimum_release_date)
        {
            return Err(FantasyCriticError::validation(
                "Minimum release date cannot be after maximum release date.",
            ));
        }
        Ok(())
    }

    fn log_changes(
        &mut self,
        id: MasterGameId,
        changed_by: UserId,
        descriptions: Vec<String>,
    ) -> Result<()> {
        let now = self.clock.now();
        let entries: Vec<MasterGameChangeLogEntry> = descriptions
            .into_iter()
            .map(|description| MasterGameChangeLogEntry {
                id: Uuid::new_v4(),
                master_game_id: id,
                changed_by,
                timestamp: now,
                description,
            })
            .collect();
        Ok(self.repo.add_change_log_entries(&entries)?)
    }

    pub fn create_master_game(
        &mut self,
        changed_by: UserId,
        game: MasterGame,
    ) -> Result<MasterGame> {
        Self::validate_master_game(&game)?;
        if self.repo.get_master_game(game.id)?.is_some() {
            return Err(FantasyCriticError::validation(
                "That master game already exists.",
            ));
        }
        self.repo.save_master_game(&game)?;
        self.log_changes(game.id, changed_by, vec!["Created game".to_string()])?;
        tracing::info!(game = %game.name, id = %game.id, "Created master game");
        Ok(game)
    }

    /// Saves the edit and records one change log entry per changed field.
    pub fn edit_master_game(
        &mut self,
        changed_by: UserId,
        mut game: MasterGame,
    ) -> Result<MasterGame> {
        Self::validate_master_game(&game)?;
        let existing = self.get_master_game(game.id)?;
        if existing.critic_score.is_none() && game.critic_score.is_some() {
            game.first_critic_score_timestamp.get_or_insert(self.clock.now());
        }
        let changes = game.compare_to_existing(&existing, self.clock.today());
        self.repo.save_master_game(&game)?;
        if !changes.is_empty() {
            self.log_changes(game.id, changed_by, changes)?;
        }
        Ok(game)
    }

    /// Copy the latest OpenCritic data onto a master game.
    pub fn update_critic_stats(
        &mut self,
        id: MasterGameId,
        stats: &OpenCriticGame,
    ) -> Result<MasterGame> {
        let mut game = self.get_master_game(id)?;
        let had_score = game.critic_score.is_some();
        if stats.release_date.is_some() {
            game.release_date = stats.release_date;
        }
        game.critic_score = stats.score;
        game.has_any_reviews = stats.has_any_reviews || stats.score.is_some();
        if !had_score
            && game.critic_score.is_some()
            && game.first_critic_score_timestamp.is_none()
        {
            game.first_critic_score_timestamp = Some(self.clock.now());
        }
        self.repo.save_master_game(&game)?;
        tracing::debug!(game = %game.name, score = ?game.critic_score, "Updated critic stats");
        Ok(game)
    }

    /// Master games picked by at least one publisher in `year`.
    pub fn selected_master_game_ids(&self, year: Year) -> Result<Vec<MasterGameId>> {
        let ids: BTreeSet<MasterGameId> = self
            .repo
            .get_league_years(year)?
            .iter()
            .flat_map(|ly| ly.publishers.iter())
            .flat_map(|p| p.games.iter())
            .filter_map(|g| g.master_game_id())
            .collect();
        Ok(ids.into_iter().collect())
    }

    /// Rebuild draft percentages and hype for every game of `year`, ignoring test leagues.
    pub fn refresh_master_game_year_stats(&mut self, year: Year) -> Result<usize> {
        let league_years: Vec<LeagueYear> = self
            .repo
            .get_league_years(year)?
            .into_iter()
            .filter(|ly| !ly.league.test_league)
            .collect();
        let mut game_years = self.repo.get_master_game_years(year)?;
        game_years
            .par_iter_mut()
            .for_each(|game_year| compute_year_stats(game_year, &league_years));
        self.repo.save_master_game_year_stats(year, &game_years)?;
        tracing::info!(
            %year,
            games = game_years.len(),
            leagues = league_years.len(),
            "Refreshed master game year stats"
        );
        Ok(game_years.len())
    }

    /// Recompute the site-wide point averages from every scored publisher game.
    pub fn update_system_wide_values(&mut self) -> Result<SystemWideValues> {
        let mut standard = Vec::new();
        let mut pickup_only = Vec::new();
        let mut counter_picks = Vec::new();
        for supported in self.repo.get_supported_years()? {
            for league_year in self.repo.get_league_years(supported.year)? {
                if league_year.league.test_league {
                    continue;
                }
                for game in league_year.publishers.iter().flat_map(|p| p.games.iter()) {
                    let Some(points) = game.fantasy_points else {
                        continue;
                    };
                    if game.counter_pick {
                        counter_picks.push(points);
                    } else {
                        standard.push(points);
                        if game.overall_draft_position.is_none() {
                            pickup_only.push(points);
                        }
                    }
                }
            }
        }

        let current = self.repo.get_system_wide_values()?;
        let values = SystemWideValues {
            average_standard_game_points: average(&standard)
                .unwrap_or(current.average_standard_game_points),
            average_pickup_only_standard_game_points: average(&pickup_only)
                .unwrap_or(current.average_pickup_only_standard_game_points),
            average_counter_pick_points: average(&counter_picks)
                .unwrap_or(current.average_counter_pick_points),
        };
        self.repo.save_system_wide_values(&values)?;
        Ok(values)
    }

    pub fn create_request(
        &mut self,
        user: UserId,
        game_name: &str,
        note: &str,
    ) -> Result<MasterGameRequest> {
        let game_name = require_non_blank(game_name, "You must provide a game name.")?;
        let request = MasterGameRequest::new(user, &game_name, note.trim(), self.clock.now());
        self.repo.save_master_game_request(&request)?;
        Ok(request)
    }

    fn require_request(&self, id: RequestId) -> Result<MasterGameRequest> {
        self.repo
            .get_master_game_request(id)?
            .ok_or_else(|| FantasyCriticError::not_found("Master game request", id))
    }

    /// Requests still waiting for an answer, oldest first.
    pub fn open_requests(&self) -> Result<Vec<MasterGameRequest>> {
        let mut requests: Vec<MasterGameRequest> = self
            .repo
            .get_master_game_requests()?
            .into_iter()
            .filter(|r| !r.answered)
            .collect();
        requests.sort_by_key(|r| r.request_timestamp);
        Ok(requests)
    }

    pub fn requests_for_user(&self, user: UserId) -> Result<Vec<MasterGameRequest>> {
        Ok(self
            .repo
            .get_master_game_requests()?
            .into_iter()
            .filter(|r| r.user == user && !r.hidden)
            .collect())
    }

    fn answer_request(
        &mut self,
        id: RequestId,
        response_note: &str,
        master_game_id: Option<MasterGameId>,
    ) -> Result<MasterGameRequest> {
        let mut request = self.require_request(id)?;
        if request.answered {
            return Err(FantasyCriticError::validation(
                "That request has already been answered.",
            ));
        }
        request.answered = true;
        request.response_timestamp = Some(self.clock.now());
        request.response_note = Some(response_note.trim().to_string()).filter(|n| !n.is_empty());
        request.master_game_id = master_game_id;
        self.repo.save_master_game_request(&request)?;
        Ok(request)
    }

    /// Answer a request with the master game that was created for it.
    pub fn complete_request(
        &mut self,
        id: RequestId,
        response_note: &str,
        master_game_id: MasterGameId,
    ) -> Result<MasterGameRequest> {
        self.get_master_game(master_game_id)?;
        self.answer_request(id, response_note, Some(master_game_id))
    }

    pub fn dismiss_request(
        &mut self,
        id: RequestId,
        response_note: &str,
    ) -> Result<MasterGameRequest> {
        self.answer_request(id, response_note, None)
    }

    pub fn delete_request(&mut self, user: UserId, id: RequestId) -> Result<()> {
        let request = self.require_request(id)?;
        if request.user != user {
            return Err(FantasyCriticError::forbidden(
                "You can't delete a request that isn't yours.",
            ));
        }
        Ok(self.repo.delete_master_game_request(id)?)
    }

    /// Close the year for play and lock in final fantasy points.
    pub fn finish_year(&mut self, year: Year) -> Result<SupportedYear> {
        let mut supported = require_supported_year(&*self.repo, year)?;
        if supported.finished {
            return Err(FantasyCriticError::validation(
                "That year is already finished.",
            ));
        }
        supported.finished = true;
        supported.open_for_creation = false;
        self.repo.save_supported_year(&supported)?;
        recalculate_fantasy_points(&mut *self.repo, year)?;
        tracing::info!(%year, "Finished year");
        Ok(supported)
    }

    pub fn action_processing_sets(&self) -> Result<Vec<ActionProcessingSetMetadata>> {
        Ok(self.repo.get_action_processing_sets()?)
    }

    pub fn recent_changes(&self, limit: usize) -> Result<Vec<MasterGameChangeLogEntry>> {
        Ok(self.repo.get_recent_changes(limit)?)
    }

    pub fn change_log(&self, id: MasterGameId) -> Result<Vec<MasterGameChangeLogEntry>> {
        Ok(self.repo.get_change_log(id)?)
    }
}
