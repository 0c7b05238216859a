//! League creation, season options, overrides, manual scores and manager messages.

use super::{
    ensure_writable, finished_years, manager_action, recalculate_fantasy_points, require_league,
    require_league_year, require_manager, require_master_game_year, require_non_blank,
    require_supported_year, Repository,
};
use crate::cli::types::ids::{LeagueId, MasterGameId, MessageId, PublisherGameId, UserId};
use crate::cli::types::time::{LeagueYearKey, Year};
use crate::core::Clock;
use crate::domain::{
    EligibilityOverride, League, LeagueAction, LeagueActionType, LeagueOptions, LeagueYear,
    ManagerMessage, PlayStatus, PublisherGame, TagOverride,
};
use crate::error::{FantasyCriticError, Result};
use crate::storage::LeagueChanges;

pub struct LeagueService<'a, R: Repository> {
    repo: &'a mut R,
    clock: &'a dyn Clock,
}

impl<'a, R: Repository> LeagueService<'a, R> {
    pub fn new(repo: &'a mut R, clock: &'a dyn Clock) -> Self {
        Self { repo, clock }
    }

    /// Create a league with its first season. The creator becomes manager and a member.
    pub fn create_league(
        &mut self,
        manager: UserId,
        name: &str,
        year: Year,
        options: LeagueOptions,
        test_league: bool,
    ) -> Result<LeagueYear> {
        ensure_writable(&*self.repo)?;
        let name = require_non_blank(name, "You cannot have a blank league name.")?;
        if self.repo.get_user(manager)?.is_none() {
            return Err(FantasyCriticError::not_found("User", manager));
        }
        options.validate()?;
        let supported = require_supported_year(&*self.repo, year)?;
        if !supported.open_for_creation {
            return Err(FantasyCriticError::validation(
                "That year is not open for league creation.",
            ));
        }

        let league = League {
            id: LeagueId::new_v4(),
            name,
            manager,
            public_league: options.public_league,
            test_league,
            archived: false,
            years: vec![year],
        };
        let league_year = LeagueYear {
            league,
            year,
            options,
            play_status: PlayStatus::NotStartedDraft,
            eligibility_overrides: Vec::new(),
            tag_overrides: Vec::new(),
            draft_started_timestamp: None,
            publishers: Vec::new(),
        };
        self.repo.create_league(&league_year)?;
        tracing::info!(league = %league_year.league.name, %year, "Created league");
        Ok(league_year)
    }

    /// Start another season, carrying options and active players forward.
    pub fn add_new_league_year(
        &mut self,
        user: UserId,
        league_id: LeagueId,
        year: Year,
    ) -> Result<LeagueYear> {
        ensure_writable(&*self.repo)?;
        let mut league = require_league(&*self.repo, league_id)?;
        require_manager(&league, user)?;
        if league.years.contains(&year) {
            return Err(FantasyCriticError::validation(
                "That league already has that year.",
            ));
        }
        let supported = require_supported_year(&*self.repo, year)?;
        if !supported.open_for_creation {
            return Err(FantasyCriticError::validation(
                "That year is not open for league creation.",
            ));
        }
        let Some(previous_year) = league.years.iter().copied().filter(|y| *y < year).max() else {
            return Err(FantasyCriticError::validation(
                "A new year must come after the league's existing years.",
            ));
        };
        let previous =
            require_league_year(&*self.repo, LeagueYearKey::new(league_id, previous_year))?;

        league.years.push(year);
        league.years.sort();
        let league_year = LeagueYear {
            league: league.clone(),
            year,
            options: previous.options.update_options_for_year(year),
            play_status: PlayStatus::NotStartedDraft,
            eligibility_overrides: Vec::new(),
            tag_overrides: Vec::new(),
            draft_started_timestamp: None,
            publishers: Vec::new(),
        };
        self.repo.save_league(&league)?;
        self.repo.add_league_year(&league_year)?;
        let key = league_year.key();
        for player in self.repo.get_active_players(previous.key())? {
            self.repo.set_player_active(key, player, true)?;
        }
        tracing::info!(league = %league.name, %year, "Added league year");
        Ok(league_year)
    }

    /// Rename or change visibility. A test league stays a test league.
    pub fn change_league_options(
        &mut self,
        user: UserId,
        league_id: LeagueId,
        name: &str,
        public_league: bool,
        test_league: bool,
    ) -> Result<League> {
        let mut league = require_league(&*self.repo, league_id)?;
        require_manager(&league, user)?;
        league.name = require_non_blank(name, "You cannot have a blank league name.")?;
        league.public_league = public_league;
        league.test_league = league.test_league || test_league;
        self.repo.save_league(&league)?;
        Ok(league)
    }

    pub fn edit_league_year_options(
        &mut self,
        user: UserId,
        key: LeagueYearKey,
        options: LeagueOptions,
    ) -> Result<LeagueYear> {
        ensure_writable(&*self.repo)?;
        let mut league_year = require_league_year(&*self.repo, key)?;
        require_manager(&league_year.league, user)?;
        options.validate()?;

        let current = &league_year.options;
        if league_year.play_status.play_started()
            && (options.games_to_draft != current.games_to_draft
                || options.counter_picks_to_draft != current.counter_picks_to_draft)
        {
            return Err(FantasyCriticError::validation(
                "Cannot change the number of drafted games after the draft has started.",
            ));
        }
        for publisher in &league_year.publishers {
            if publisher.standard_games().count() > options.standard_games {
                return Err(FantasyCriticError::validation(
                    "Cannot reduce number of standard games to below what a player already has.",
                ));
            }
            if publisher.counter_picks().count() > options.counter_picks {
                return Err(FantasyCriticError::validation(
                    "Cannot reduce number of counter picks to below what a player already has.",
                ));
            }
        }

        let scoring_changed = options.scoring_system != current.scoring_system;
        league_year.options = options;
        let mut changes = LeagueChanges::new().with_league_year(&league_year);
        if scoring_changed {
            let finished = league_year.is_finished(&finished_years(&*self.repo)?);
            let scoring = league_year.options.scoring_system;
            for publisher in &mut league_year.publishers {
                for game in &mut publisher.games {
                    game.fantasy_points =
                        game.calculate_fantasy_points(scoring, key.year, finished);
                }
            }
            changes = changes.with_publishers(&league_year.publishers);
        }
        self.repo.commit_league_changes(&changes)?;
        tracing::info!(
            league = %league_year.league.name,
            year = %key.year,
            "Edited league options"
        );
        Ok(league_year)
    }

    /// `None` clears the override.
    pub fn set_eligibility_override(
        &mut self,
        user: UserId,
        key: LeagueYearKey,
        master_game_id: MasterGameId,
        eligible: Option<bool>,
    ) -> Result<LeagueYear> {
        ensure_writable(&*self.repo)?;
        let mut league_year = require_league_year(&*self.repo, key)?;
        require_manager(&league_year.league, user)?;
        let game = require_master_game_year(&*self.repo, master_game_id, key.year)?;

        if game.master_game.released_before_year(key.year) {
            return Err(FantasyCriticError::validation(
                "You can't change the override setting of a game that came out in a previous year.",
            ));
        }
        if league_year.eligibility_override_for(master_game_id) == eligible {
            return Err(FantasyCriticError::validation(
                "That game already has that override setting.",
            ));
        }
        let held = league_year
            .publisher_game_for(master_game_id)
            .iter()
            .any(|(_, g)| !g.counter_pick);
        if eligible == Some(false) && held {
            return Err(FantasyCriticError::validation(
                "You can't ban a game that a publisher already has.",
            ));
        }

        league_year
            .eligibility_overrides
            .retain(|o| o.master_game_id != master_game_id);
        if let Some(eligible) = eligible {
            league_year.eligibility_overrides.push(EligibilityOverride {
                master_game_id,
                eligible,
            });
        }

        let name = &game.master_game.name;
        let description = match eligible {
            Some(true) => format!("'{}' was manually set as eligible.", name),
            Some(false) => format!("'{}' was manually set as ineligible.", name),
            None => format!("Eligibility override for '{}' was removed.", name),
        };
        let now = self.clock.now();
        let mut changes = LeagueChanges::new().with_league_year(&league_year);
        if let Some(action) = manager_action(
            &league_year,
            now,
            LeagueActionType::EligibilityChanged,
            description,
        ) {
            changes = changes.with_action(action);
        }
        self.repo.commit_league_changes(&changes)?;
        Ok(league_year)
    }

    /// Replace the tags this league sees on a game.
    /// Setting the game's own tags clears the override.
    pub fn set_tag_override(
        &mut self,
        user: UserId,
        key: LeagueYearKey,
        master_game_id: MasterGameId,
        tags: Vec<String>,
    ) -> Result<LeagueYear> {
        ensure_writable(&*self.repo)?;
        let mut league_year = require_league_year(&*self.repo, key)?;
        require_manager(&league_year.league, user)?;
        let game = require_master_game_year(&*self.repo, master_game_id, key.year)?;

        let known: Vec<String> = self
            .repo
            .get_master_game_tags()?
            .into_iter()
            .map(|t| t.name)
            .collect();
        if let Some(unknown) = tags.iter().find(|t| !known.contains(t)) {
            return Err(FantasyCriticError::validation(format!(
                "Unknown tag: {}",
                unknown
            )));
        }

        let sorted = |mut tags: Vec<String>| {
            tags.sort();
            tags.dedup();
            tags
        };
        let requested = sorted(tags);
        if sorted(league_year.tags_for(&game.master_game)) == requested {
            return Err(FantasyCriticError::validation(
                "That game already has those tags in this league.",
            ));
        }

        league_year
            .tag_overrides
            .retain(|o| o.master_game_id != master_game_id);
        if sorted(game.master_game.tag_names()) != requested {
            league_year.tag_overrides.push(TagOverride {
                master_game_id,
                tags: requested,
            });
        }
        self.repo
            .commit_league_changes(&LeagueChanges::new().with_league_year(&league_year))?;
        Ok(league_year)
    }

    /// Set or clear a manual critic score on a publisher game.
    pub fn manually_score_game(
        &mut self,
        user: UserId,
        key: LeagueYearKey,
        publisher_game_id: PublisherGameId,
        score: Option<f64>,
    ) -> Result<LeagueYear> {
        if score.is_some_and(|s| !(0.0..=100.0).contains(&s)) {
            return Err(FantasyCriticError::validation(
                "A manual critic score must be between 0 and 100.",
            ));
        }
        self.edit_publisher_game(user, key, publisher_game_id, |game| {
            game.manual_critic_score = score;
            match score {
                Some(score) => format!("'{}' was manually scored as {:.2}.", game.name(), score),
                None => format!("Manual score for '{}' was removed.", game.name()),
            }
        })
    }

    pub fn manually_set_will_not_release(
        &mut self,
        user: UserId,
        key: LeagueYearKey,
        publisher_game_id: PublisherGameId,
        will_not_release: bool,
    ) -> Result<LeagueYear> {
        self.edit_publisher_game(user, key, publisher_game_id, |game| {
            game.manual_will_not_release = will_not_release;
            if will_not_release {
                format!("'{}' was manually set as 'Will not Release'.", game.name())
            } else {
                format!(
                    "'{}' is no longer manually set as 'Will not Release'.",
                    game.name()
                )
            }
        })
    }

    fn edit_publisher_game(
        &mut self,
        user: UserId,
        key: LeagueYearKey,
        publisher_game_id: PublisherGameId,
        edit: impl FnOnce(&mut PublisherGame) -> String,
    ) -> Result<LeagueYear> {
        ensure_writable(&*self.repo)?;
        let mut league_year = require_league_year(&*self.repo, key)?;
        require_manager(&league_year.league, user)?;
        let finished = league_year.is_finished(&finished_years(&*self.repo)?);
        let scoring = league_year.options.scoring_system;
        let now = self.clock.now();

        let publisher = league_year
            .publishers
            .iter_mut()
            .find(|p| p.game_by_id(publisher_game_id).is_some())
            .ok_or_else(|| {
                FantasyCriticError::not_found("Publisher game", publisher_game_id)
            })?;
        let game = publisher
            .games
            .iter_mut()
            .find(|g| g.id == publisher_game_id)
            .ok_or_else(|| {
                FantasyCriticError::not_found("Publisher game", publisher_game_id)
            })?;
        let description = edit(game);
        game.fantasy_points = game.calculate_fantasy_points(scoring, key.year, finished);

        let action = LeagueAction::new(
            publisher,
            now,
            LeagueActionType::ManualScore,
            description,
            true,
        );
        let changes = LeagueChanges::new()
            .with_publisher(publisher)
            .with_action(action);
        self.repo.commit_league_changes(&changes)?;
        Ok(league_year)
    }

    /// Refresh calculated fantasy points for every league of `year`.
    pub fn update_fantasy_points(&mut self, year: Year) -> Result<usize> {
        recalculate_fantasy_points(&mut *self.repo, year)
    }

    pub fn post_message(
        &mut self,
        user: UserId,
        key: LeagueYearKey,
        text: &str,
        is_public: bool,
    ) -> Result<ManagerMessage> {
        let league_year = require_league_year(&*self.repo, key)?;
        require_manager(&league_year.league, user)?;
        let message = ManagerMessage {
            id: MessageId::new_v4(),
            league_year_key: key,
            text: require_non_blank(text, "You cannot post a blank message.")?,
            is_public,
            timestamp: self.clock.now(),
            deleted: false,
        };
        self.repo.save_manager_message(&message)?;
        Ok(message)
    }

    pub fn delete_message(
        &mut self,
        user: UserId,
        key: LeagueYearKey,
        id: MessageId,
    ) -> Result<()> {
        let league_year = require_league_year(&*self.repo, key)?;
        require_manager(&league_year.league, user)?;
        let mut message = self
            .repo
            .get_manager_message(id)?
            .filter(|m| m.league_year_key == key && !m.deleted)
            .ok_or_else(|| FantasyCriticError::not_found("Manager message", id))?;
        message.deleted = true;
        self.repo.save_manager_message(&message)?;
        Ok(())
    }

    pub fn manager_messages(&self, key: LeagueYearKey) -> Result<Vec<ManagerMessage>> {
        Ok(self.repo.get_manager_messages(key)?)
    }

    pub fn league_actions(&self, key: LeagueYearKey) -> Result<Vec<LeagueAction>> {
        Ok(self.repo.get_league_actions(key)?)
    }

    pub fn league_year(&self, key: LeagueYearKey) -> Result<LeagueYear> {
        require_league_year(&*self.repo, key)
    }

    pub fn leagues_for_user(&self, user: UserId) -> Result<Vec<League>> {
        Ok(self.repo.get_leagues_for_user(user)?)
    }
}
