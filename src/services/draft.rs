//! Draft flow: order, picks, pause and resume, reset, undo and auto draft.

use super::{
    ensure_writable, require_league_year, require_manager, require_master_game_year,
    require_supported_year, Repository,
};
use crate::cli::types::ids::{MasterGameId, PublisherId, UserId};
use crate::cli::types::time::LeagueYearKey;
use crate::core::Clock;
use crate::domain::{
    ClaimGameRequest, ClaimResult, DraftPhase, DraftStatus, LeagueAction, LeagueActionType,
    LeagueYear, PlayStatus,
};
use crate::engine::claims::{apply_claim, claim_errors};
use crate::engine::draft::{
    auto_draft_pick, draft_phase, draft_status, league_is_ready_to_play,
    league_is_ready_to_set_draft_order, next_draft_publisher, set_draft_order,
    undo_last_draft_action,
};
use crate::error::{FantasyCriticError, Result};
use crate::storage::LeagueChanges;
use chrono::{DateTime, Utc};

/// A pick about to be made by a user or by the manager on someone's behalf.
struct DraftPick<'n> {
    publisher_id: PublisherId,
    master_game_id: Option<MasterGameId>,
    game_name: &'n str,
    counter_pick: bool,
    manager_action: bool,
    manager_override: bool,
}

fn draft_action(
    request: &ClaimGameRequest,
    league_year: &LeagueYear,
    now: DateTime<Utc>,
) -> Option<LeagueAction> {
    let publisher = league_year.publisher_by_id(request.publisher_id)?;
    let action_type = if request.auto_draft {
        LeagueActionType::AutoDraftGame
    } else {
        LeagueActionType::DraftGame
    };
    let kind = if request.counter_pick { " (Counter Pick)" } else { "" };
    Some(LeagueAction::new(
        publisher,
        now,
        action_type,
        format!("Drafted game: '{}'{}", request.game_name, kind),
        request.manager_action,
    ))
}

pub struct DraftService<'a, R: Repository> {
    repo: &'a mut R,
    clock: &'a dyn Clock,
}

impl<'a, R: Repository> DraftService<'a, R> {
    pub fn new(repo: &'a mut R, clock: &'a dyn Clock) -> Self {
        Self { repo, clock }
    }

    fn commit(&mut self, league_year: &LeagueYear, actions: Vec<LeagueAction>) -> Result<()> {
        let changes = LeagueChanges::new()
            .with_league_year(league_year)
            .with_publishers(&league_year.publishers)
            .with_actions(actions);
        self.repo.commit_league_changes(&changes)?;
        Ok(())
    }

    fn managed_league_year(&self, manager: UserId, key: LeagueYearKey) -> Result<LeagueYear> {
        ensure_writable(&*self.repo)?;
        let league_year = require_league_year(&*self.repo, key)?;
        require_manager(&league_year.league, manager)?;
        Ok(league_year)
    }

    pub fn set_draft_order(
        &mut self,
        manager: UserId,
        key: LeagueYearKey,
        order: &[PublisherId],
    ) -> Result<LeagueYear> {
        let mut league_year = self.managed_league_year(manager, key)?;
        if league_year.play_status.play_started() {
            return Err(FantasyCriticError::validation(
                "You can't change the draft order after the draft has started.",
            ));
        }
        let active = self.repo.get_active_players(key)?;
        if !league_is_ready_to_set_draft_order(&league_year.publishers, &active) {
            return Err(FantasyCriticError::validation(
                "Every active player must have a publisher before setting the draft order.",
            ));
        }
        set_draft_order(&mut league_year.publishers, order)?;
        self.repo
            .commit_league_changes(&LeagueChanges::new().with_publishers(&league_year.publishers))?;
        Ok(league_year)
    }

    pub fn start_draft(&mut self, manager: UserId, key: LeagueYearKey) -> Result<LeagueYear> {
        let mut league_year = self.managed_league_year(manager, key)?;
        if league_year.play_status != PlayStatus::NotStartedDraft {
            return Err(FantasyCriticError::validation(
                "The draft has already started.",
            ));
        }
        let supported = require_supported_year(&*self.repo, key.year)?;
        let active = self.repo.get_active_players(key)?;
        if !league_is_ready_to_play(&supported, &league_year.publishers, &active) {
            return Err(FantasyCriticError::validation(
                "The league is not ready to start the draft.",
            ));
        }

        league_year.play_status = PlayStatus::Drafting;
        league_year.draft_started_timestamp = Some(self.clock.now());
        tracing::info!(league = %league_year.league.name, year = %key.year, "Draft started");
        let mut actions = Vec::new();
        self.advance_draft(&mut league_year, &mut actions)?;
        self.commit(&league_year, actions)?;
        Ok(league_year)
    }

    /// Draft for the acting user's own publisher.
    pub fn draft_game(
        &mut self,
        user: UserId,
        key: LeagueYearKey,
        master_game_id: MasterGameId,
        counter_pick: bool,
    ) -> Result<ClaimResult> {
        ensure_writable(&*self.repo)?;
        let league_year = require_league_year(&*self.repo, key)?;
        let publisher_id = league_year
            .user_publisher(user)
            .map(|p| p.id)
            .ok_or_else(|| {
                FantasyCriticError::forbidden("You do not have a publisher in this league.")
            })?;
        let pick = DraftPick {
            publisher_id,
            master_game_id: Some(master_game_id),
            game_name: "",
            counter_pick,
            manager_action: false,
            manager_override: false,
        };
        self.make_pick(league_year, pick)
    }

    /// The manager drafts on behalf of whoever's turn it is, optionally overriding eligibility.
    #[allow(clippy::too_many_arguments)]
    pub fn manager_draft_game(
        &mut self,
        manager: UserId,
        key: LeagueYearKey,
        publisher_id: PublisherId,
        master_game_id: Option<MasterGameId>,
        game_name: &str,
        counter_pick: bool,
        manager_override: bool,
    ) -> Result<ClaimResult> {
        let league_year = self.managed_league_year(manager, key)?;
        let pick = DraftPick {
            publisher_id,
            master_game_id,
            game_name,
            counter_pick,
            manager_action: true,
            manager_override,
        };
        self.make_pick(league_year, pick)
    }

    fn make_pick(
        &mut self,
        mut league_year: LeagueYear,
        pick: DraftPick<'_>,
    ) -> Result<ClaimResult> {
        if !league_year.play_status.draft_is_active() {
            return Err(FantasyCriticError::validation("The draft is not active."));
        }
        let next = next_draft_publisher(&league_year)
            .map(|p| p.id)
            .ok_or_else(|| {
                FantasyCriticError::validation("The draft is already complete.")
            })?;
        if next != pick.publisher_id {
            return Err(FantasyCriticError::validation(
                "It is not that publisher's turn to draft.",
            ));
        }
        let status = draft_status(&league_year);
        match (status.phase, pick.counter_pick) {
            (DraftPhase::StandardGames, true) => {
                return Err(FantasyCriticError::validation(
                    "You cannot draft a counter pick during the standard game phase of the draft.",
                ))
            }
            (DraftPhase::CounterPicks, false) => {
                return Err(FantasyCriticError::validation(
                    "You cannot draft a standard game during the counter pick phase of the draft.",
                ))
            }
            _ => {}
        }

        let master_game = pick
            .master_game_id
            .map(|id| require_master_game_year(&*self.repo, id, league_year.year))
            .transpose()?;
        let game_name = match &master_game {
            Some(game) => game.master_game.name.clone(),
            None => pick.game_name.trim().to_string(),
        };
        let request = ClaimGameRequest {
            publisher_id: pick.publisher_id,
            game_name,
            counter_pick: pick.counter_pick,
            manager_action: pick.manager_action,
            manager_override: pick.manager_override,
            auto_draft: false,
            master_game,
            draft_position: Some(status.draft_position),
            overall_draft_position: Some(status.overall_draft_position),
            bid_amount: None,
            allow_ineligible_slot: false,
        };

        let now = self.clock.now();
        let result = claim_errors(&request, &league_year, now.date_naive());
        if !result.success() {
            return Ok(result);
        }
        let slot = result
            .best_slot
            .ok_or_else(|| {
                FantasyCriticError::validation("There are no open slots for that game.")
            })?;
        apply_claim(&mut league_year, &request, slot, now);

        let mut actions: Vec<LeagueAction> =
            draft_action(&request, &league_year, now).into_iter().collect();
        self.advance_draft(&mut league_year, &mut actions)?;
        self.commit(&league_year, actions)?;
        Ok(result)
    }

    /// Let auto-drafting publishers pick while it is their turn, then close a finished draft.
    fn advance_draft(
        &mut self,
        league_year: &mut LeagueYear,
        actions: &mut Vec<LeagueAction>,
    ) -> Result<()> {
        let now = self.clock.now();
        let today = now.date_naive();
        let mut available = None;

        loop {
            if draft_phase(league_year) == DraftPhase::Complete {
                league_year.play_status = PlayStatus::DraftFinal;
                tracing::info!(
                    league = %league_year.league.name,
                    year = %league_year.year,
                    "Draft complete"
                );
                return Ok(());
            }
            if !league_year.play_status.draft_is_active() {
                return Ok(());
            }
            let Some(next) = next_draft_publisher(league_year) else {
                return Ok(());
            };
            if !next.auto_draft {
                return Ok(());
            }

            if available.is_none() {
                available = Some(self.repo.get_master_game_years(league_year.year)?);
            }
            let queue = self.repo.get_queued_games(next.id, league_year.year)?;
            let candidates = available.as_deref().unwrap_or_default();
            let Some(request) = auto_draft_pick(league_year, next, &queue, candidates, today) else {
                tracing::warn!(publisher = %next.name, "Auto draft found no valid pick");
                return Ok(());
            };
            let Some(slot) = claim_errors(&request, league_year, today).best_slot else {
                return Ok(());
            };
            apply_claim(league_year, &request, slot, now);
            actions.extend(draft_action(&request, league_year, now));
            tracing::debug!(game = %request.game_name, "Auto drafted");
        }
    }

    /// Run any pending auto picks and finish the draft if it is complete.
    pub fn run_auto_draft_and_check_complete(&mut self, key: LeagueYearKey) -> Result<LeagueYear> {
        ensure_writable(&*self.repo)?;
        let mut league_year = require_league_year(&*self.repo, key)?;
        if !league_year.play_status.draft_is_active() {
            return Ok(league_year);
        }
        let mut actions = Vec::new();
        self.advance_draft(&mut league_year, &mut actions)?;
        self.commit(&league_year, actions)?;
        Ok(league_year)
    }

    pub fn pause_draft(&mut self, manager: UserId, key: LeagueYearKey) -> Result<LeagueYear> {
        let mut league_year = self.managed_league_year(manager, key)?;
        if !league_year.play_status.draft_is_active() {
            return Err(FantasyCriticError::validation("The draft is not active."));
        }
        league_year.play_status = PlayStatus::DraftPaused;
        self.commit(&league_year, Vec::new())?;
        tracing::info!(league = %league_year.league.name, "Draft paused");
        Ok(league_year)
    }

    pub fn resume_draft(&mut self, manager: UserId, key: LeagueYearKey) -> Result<LeagueYear> {
        let mut league_year = self.managed_league_year(manager, key)?;
        if !league_year.play_status.draft_is_paused() {
            return Err(FantasyCriticError::validation("The draft is not paused."));
        }
        league_year.play_status = PlayStatus::Drafting;
        let mut actions = Vec::new();
        self.advance_draft(&mut league_year, &mut actions)?;
        self.commit(&league_year, actions)?;
        tracing::info!(league = %league_year.league.name, "Draft resumed");
        Ok(league_year)
    }

    /// Throw away every pick and go back to before the draft.
    pub fn reset_draft(&mut self, manager: UserId, key: LeagueYearKey) -> Result<LeagueYear> {
        let mut league_year = self.managed_league_year(manager, key)?;
        if matches!(
            league_year.play_status,
            PlayStatus::NotStartedDraft | PlayStatus::DraftFinal
        ) {
            return Err(FantasyCriticError::validation(
                "You can only reset a draft that is in progress.",
            ));
        }
        for publisher in &mut league_year.publishers {
            publisher.games.clear();
        }
        league_year.play_status = PlayStatus::NotStartedDraft;
        league_year.draft_started_timestamp = None;
        self.commit(&league_year, Vec::new())?;
        tracing::info!(league = %league_year.league.name, "Draft reset");
        Ok(league_year)
    }

    pub fn undo_last_draft_action(
        &mut self,
        manager: UserId,
        key: LeagueYearKey,
    ) -> Result<LeagueYear> {
        let mut league_year = self.managed_league_year(manager, key)?;
        if !league_year.play_status.draft_is_paused() {
            return Err(FantasyCriticError::validation(
                "You can only undo a draft pick while the draft is paused.",
            ));
        }
        let game = undo_last_draft_action(&league_year)
            .ok_or_else(|| {
                FantasyCriticError::validation("There are no draft picks to undo.")
            })?;
        let publisher = league_year
            .publisher_by_id_mut(game.publisher_id)
            .ok_or_else(|| {
                FantasyCriticError::not_found("Publisher", game.publisher_id)
            })?;
        publisher.games.retain(|g| g.id != game.id);
        let action = LeagueAction::new(
            publisher,
            self.clock.now(),
            LeagueActionType::UndoDraft,
            format!("'{}' was undrafted.", game.name()),
            true,
        );
        self.commit(&league_year, vec![action])?;
        Ok(league_year)
    }

    pub fn draft_status(&self, key: LeagueYearKey) -> Result<DraftStatus> {
        Ok(draft_status(&require_league_year(&*self.repo, key)?))
    }

    pub fn next_publisher(&self, key: LeagueYearKey) -> Result<Option<PublisherId>> {
        let league_year = require_league_year(&*self.repo, key)?;
        Ok(next_draft_publisher(&league_year).map(|p| p.id))
    }
}
