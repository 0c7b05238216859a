//! League membership and per-season active players.

use super::{ensure_writable, require_league, require_league_year, require_manager, Repository};
use crate::cli::types::ids::{LeagueId, UserId};
use crate::cli::types::time::LeagueYearKey;
use crate::error::{FantasyCriticError, Result};

pub struct LeagueMemberService<'a, R: Repository> {
    repo: &'a mut R,
}

impl<'a, R: Repository> LeagueMemberService<'a, R> {
    pub fn new(repo: &'a mut R) -> Self {
        Self { repo }
    }

    pub fn add_user_to_league(&mut self, league_id: LeagueId, user: UserId) -> Result<()> {
        require_league(&*self.repo, league_id)?;
        if self.repo.get_user(user)?.is_none() {
            return Err(FantasyCriticError::not_found("User", user));
        }
        if self.repo.get_league_members(league_id)?.contains(&user) {
            return Err(FantasyCriticError::validation(
                "User is already in that league.",
            ));
        }
        self.repo.add_league_member(league_id, user)?;
        tracing::info!(league = %league_id, %user, "Added user to league");
        Ok(())
    }

    pub fn users_in_league(&self, league_id: LeagueId) -> Result<Vec<UserId>> {
        Ok(self.repo.get_league_members(league_id)?)
    }

    pub fn active_players(&self, key: LeagueYearKey) -> Result<Vec<UserId>> {
        Ok(self.repo.get_active_players(key)?)
    }

    /// Only before play starts; a player with a publisher stays active.
    pub fn set_player_active(
        &mut self,
        manager: UserId,
        key: LeagueYearKey,
        user: UserId,
        active: bool,
    ) -> Result<()> {
        ensure_writable(&*self.repo)?;
        let league_year = require_league_year(&*self.repo, key)?;
        require_manager(&league_year.league, manager)?;
        if league_year.play_status.play_started() {
            return Err(FantasyCriticError::validation(
                "You can't change which players are active after the draft has started.",
            ));
        }
        if !self.repo.get_league_members(key.league_id)?.contains(&user) {
            return Err(FantasyCriticError::validation(
                "That user is not in the league.",
            ));
        }
        if !active && league_year.user_publisher(user).is_some() {
            return Err(FantasyCriticError::validation(
                "You must remove a player's publisher before you can set them as inactive.",
            ));
        }
        self.repo.set_player_active(key, user, active)?;
        Ok(())
    }

    /// Remove a member. Their publishers go with them, which is only allowed before play starts.
    pub fn remove_player(
        &mut self,
        manager: UserId,
        league_id: LeagueId,
        user: UserId,
    ) -> Result<()> {
        ensure_writable(&*self.repo)?;
        let league = require_league(&*self.repo, league_id)?;
        require_manager(&league, manager)?;
        if user == league.manager {
            return Err(FantasyCriticError::validation(
                "You can't remove yourself from a league you manage.",
            ));
        }
        if !self.repo.get_league_members(league_id)?.contains(&user) {
            return Err(FantasyCriticError::validation(
                "That user is not in the league.",
            ));
        }

        let mut publishers = Vec::new();
        for year in &league.years {
            let league_year =
                require_league_year(&*self.repo, LeagueYearKey::new(league_id, *year))?;
            if let Some(publisher) = league_year.user_publisher(user) {
                if league_year.play_status.play_started() {
                    return Err(FantasyCriticError::validation(
                        "You can't remove a player who has a publisher \
                         in a year that has started play.",
                    ));
                }
                publishers.push(publisher.id);
            }
        }
        for publisher in publishers {
            self.repo.delete_publisher(publisher)?;
        }
        self.repo.remove_league_member(league_id, user)?;
        tracing::info!(league = %league.name, %user, "Removed player from league");
        Ok(())
    }

    pub fn transfer_manager(
        &mut self,
        manager: UserId,
        league_id: LeagueId,
        new_manager: UserId,
    ) -> Result<()> {
        let mut league = require_league(&*self.repo, league_id)?;
        require_manager(&league, manager)?;
        if !self.repo.get_league_members(league_id)?.contains(&new_manager) {
            return Err(FantasyCriticError::validation(
                "The new manager must be a member of the league.",
            ));
        }
        league.manager = new_manager;
        self.repo.save_league(&league)?;
        tracing::info!(league = %league.name, manager = %new_manager, "Transferred league manager");
        Ok(())
    }
}
