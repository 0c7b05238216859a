//! Draft order, turn tracking, undo and auto-draft.

use crate::cli::types::ids::{PublisherId, UserId};
use crate::domain::actions::QueuedGame;
use crate::domain::claims::{ClaimGameRequest, DraftPhase, DraftStatus};
use crate::domain::league::LeagueYear;
use crate::domain::master_game::MasterGameYear;
use crate::domain::publisher::{Publisher, PublisherGame};
use crate::domain::scoring::ScoringSystem;
use crate::domain::system::SupportedYear;
use crate::engine::claims::claim_errors;
use crate::error::{FantasyCriticError, Result};
use chrono::NaiveDate;
use std::cmp::Ordering;
use std::collections::HashSet;

/// Publishers sorted by draft position.
pub fn draft_order(publishers: &[Publisher]) -> Vec<&Publisher> {
    let mut order: Vec<&Publisher> = publishers.iter().collect();
    order.sort_by_key(|p| (p.draft_position, p.id));
    order
}

pub fn draft_phase(league_year: &LeagueYear) -> DraftPhase {
    let options = &league_year.options;
    let publishers = &league_year.publishers;
    if publishers.is_empty() {
        return DraftPhase::Complete;
    }
    if publishers
        .iter()
        .any(|p| p.standard_games().count() < options.games_to_draft)
    {
        return DraftPhase::StandardGames;
    }
    if publishers
        .iter()
        .any(|p| p.counter_picks().count() < options.counter_picks_to_draft)
    {
        return DraftPhase::CounterPicks;
    }
    DraftPhase::Complete
}

fn picks_made(league_year: &LeagueYear, counter_pick: bool) -> usize {
    league_year
        .publishers
        .iter()
        .map(|p| p.games.iter().filter(|g| g.counter_pick == counter_pick).count())
        .sum()
}

/// Snake order: even rounds forward, odd rounds reversed. Counter picks start from the back.
fn snake_pick(order: &[&Publisher], pick: usize, start_reversed: bool) -> usize {
    let n = order.len();
    let round = pick / n;
    let index = pick % n;
    let reversed = (round % 2 == 1) != start_reversed;
    if reversed {
        n - 1 - index
    } else {
        index
    }
}

/// Whose turn it is, skipping publishers that are already full for the phase.
pub fn next_draft_publisher(league_year: &LeagueYear) -> Option<&Publisher> {
    let phase = draft_phase(league_year);
    let (counter_pick, limit) = match phase {
        DraftPhase::StandardGames => (false, league_year.options.games_to_draft),
        DraftPhase::CounterPicks => (true, league_year.options.counter_picks_to_draft),
        DraftPhase::Complete => return None,
    };

    let order = draft_order(&league_year.publishers);
    let made = picks_made(league_year, counter_pick);
    let horizon = order.len() * (limit + 1) * 2;
    (made..made + horizon)
        .map(|pick| order[snake_pick(&order, pick, counter_pick)])
        .find(|p| {
            let taken = p.games.iter().filter(|g| g.counter_pick == counter_pick).count();
            taken < limit
        })
}

pub fn draft_status(league_year: &LeagueYear) -> DraftStatus {
    let phase = draft_phase(league_year);
    let standard = picks_made(league_year, false) as u32;
    let counter = picks_made(league_year, true) as u32;
    let draft_position = match phase {
        DraftPhase::StandardGames => standard + 1,
        DraftPhase::CounterPicks => counter + 1,
        DraftPhase::Complete => 0,
    };
    DraftStatus {
        phase,
        draft_position,
        overall_draft_position: standard + counter + 1,
    }
}

/// Every active user has exactly one publisher and nobody else does.
pub fn league_is_ready_to_set_draft_order(
    publishers: &[Publisher],
    active_users: &[UserId],
) -> bool {
    let publisher_users: HashSet<UserId> = publishers.iter().map(|p| p.user).collect();
    let active: HashSet<UserId> = active_users.iter().copied().collect();
    publisher_users.len() == publishers.len() && publisher_users == active
}

pub fn league_is_ready_to_play(
    supported_year: &SupportedYear,
    publishers: &[Publisher],
    active_users: &[UserId],
) -> bool {
    supported_year.open_for_play
        && !publishers.is_empty()
        && league_is_ready_to_set_draft_order(publishers, active_users)
}

/// Assign draft positions 1..=n following `order`.
pub fn set_draft_order(publishers: &mut [Publisher], order: &[PublisherId]) -> Result<()> {
    let unique: HashSet<PublisherId> = order.iter().copied().collect();
    let complete = order.len() == publishers.len()
        && unique.len() == order.len()
        && publishers.iter().all(|p| unique.contains(&p.id));
    if !complete {
        return Err(FantasyCriticError::validation(
            "Draft order must contain every publisher exactly once.",
        ));
    }
    for publisher in publishers.iter_mut() {
        if let Some(index) = order.iter().position(|id| *id == publisher.id) {
            publisher.draft_position = index as u32 + 1;
        }
    }
    Ok(())
}

/// The most recently drafted game: counter picks are undone before standard games.
pub fn undo_last_draft_action(league_year: &LeagueYear) -> Option<PublisherGame> {
    let drafted = |counter_pick: bool| {
        league_year
            .publishers
            .iter()
            .flat_map(|p| p.games.iter())
            .filter(|g| g.counter_pick == counter_pick && g.overall_draft_position.is_some())
            .max_by_key(|g| g.overall_draft_position)
            .cloned()
    };
    drafted(true).or_else(|| drafted(false))
}

fn by_projection_desc(
    scoring: ScoringSystem,
) -> impl Fn(&&MasterGameYear, &&MasterGameYear) -> Ordering {
    move |a, b| {
        let pa = a.projected_fantasy_points(scoring, false);
        let pb = b.projected_fantasy_points(scoring, false);
        pb.partial_cmp(&pa)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.master_game.name.cmp(&b.master_game.name))
    }
}

fn first_valid_claim<'a>(
    candidates: impl IntoIterator<Item = &'a MasterGameYear>,
    publisher: &Publisher,
    counter_pick: bool,
    status: DraftStatus,
    league_year: &LeagueYear,
    today: NaiveDate,
) -> Option<ClaimGameRequest> {
    candidates
        .into_iter()
        .map(|game| {
            let mut request = ClaimGameRequest::new(publisher.id, game.clone(), counter_pick);
            request.auto_draft = true;
            request.draft_position = Some(status.draft_position);
            request.overall_draft_position = Some(status.overall_draft_position);
            request
        })
        .find(|request| claim_errors(request, league_year, today).success())
}

/// Pick for an auto-drafting publisher whose turn it is.
///
/// Queued games come first in rank order; after that the highest projected eligible
/// game. In the counter-pick phase the highest projected standard game of another
/// publisher is taken.
pub fn auto_draft_pick(
    league_year: &LeagueYear,
    publisher: &Publisher,
    queue: &[QueuedGame],
    available: &[MasterGameYear],
    today: NaiveDate,
) -> Option<ClaimGameRequest> {
    let status = draft_status(league_year);
    let counter_pick = match status.phase {
        DraftPhase::StandardGames => false,
        DraftPhase::CounterPicks => true,
        DraftPhase::Complete => return None,
    };
    let scoring = league_year.options.scoring_system;

    if counter_pick {
        let mut targets: Vec<&MasterGameYear> = league_year
            .publishers
            .iter()
            .filter(|p| p.id != publisher.id)
            .flat_map(|p| p.standard_games())
            .filter_map(|g| g.master_game.as_ref())
            .collect();
        targets.sort_by(by_projection_desc(scoring));
        return first_valid_claim(targets, publisher, true, status, league_year, today);
    }

    let mut queued: Vec<&QueuedGame> = queue
        .iter()
        .filter(|q| q.publisher_id == publisher.id)
        .collect();
    queued.sort_by_key(|q| q.rank);
    let from_queue = first_valid_claim(
        queued.into_iter().map(|q| &q.master_game),
        publisher,
        false,
        status,
        league_year,
        today,
    );
    if from_queue.is_some() {
        return from_queue;
    }

    let mut candidates: Vec<&MasterGameYear> = available.iter().collect();
    candidates.sort_by(by_projection_desc(scoring));
    first_valid_claim(candidates, publisher, false, status, league_year, today)
}
