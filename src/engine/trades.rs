//! Trade validation and execution.

use crate::cli::types::ids::PublisherGameId;
use crate::domain::actions::{LeagueAction, LeagueActionType};
use crate::domain::league::LeagueYear;
use crate::domain::options::TradingSystem;
use crate::domain::publisher::{Publisher, PublisherGame};
use crate::domain::trade::Trade;
use crate::engine::claims::best_slot;
use crate::error::{FantasyCriticError, Result};
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// What executing a trade changes.
#[derive(Debug, Clone)]
pub struct TradeExecution {
    pub updated_publishers: Vec<Publisher>,
    pub removed_games: Vec<PublisherGame>,
    pub added_games: Vec<PublisherGame>,
    pub league_actions: Vec<LeagueAction>,
}

fn invalid(message: &str) -> FantasyCriticError {
    FantasyCriticError::validation(message)
}

fn owned_games<'a>(
    publisher: &'a Publisher,
    ids: &[PublisherGameId],
) -> Result<Vec<&'a PublisherGame>> {
    ids.iter()
        .map(|id| {
            publisher.game_by_id(*id).ok_or_else(|| {
                invalid(
                    "One or more of the games in this trade is no longer owned \
                     by the sending publisher.",
                )
            })
        })
        .collect()
}

/// Every game id may appear once across both sides of a trade.
fn check_distinct_games(trade: &Trade) -> Result<()> {
    let mut seen = HashSet::new();
    let mut all = trade.proposer_games.iter().chain(&trade.counter_party_games);
    if all.all(|id| seen.insert(*id)) {
        Ok(())
    } else {
        Err(invalid("A game can only appear once in a trade."))
    }
}

/// Checks a new proposal against the league state and other active trades.
pub fn validate_proposal(
    league_year: &LeagueYear,
    trade: &Trade,
    active_trades: &[Trade],
) -> Result<()> {
    if league_year.options.trading_system == TradingSystem::NoTrades {
        return Err(invalid("Trades are not enabled in this league."));
    }
    if trade.proposer == trade.counter_party {
        return Err(invalid("You cannot trade with yourself."));
    }
    if trade.league_year_key != league_year.key() {
        return Err(invalid("Both publishers must be in the same league year."));
    }
    let proposer = league_year.require_publisher(trade.proposer)?;
    let counter_party = league_year.require_publisher(trade.counter_party)?;

    let offers_nothing = trade.proposer_games.is_empty() && trade.proposer_budget_send == 0;
    let asks_nothing =
        trade.counter_party_games.is_empty() && trade.counter_party_budget_send == 0;
    if offers_nothing && asks_nothing {
        return Err(invalid(
            "A trade must include at least one game or some budget.",
        ));
    }
    if trade.proposer_budget_send > 0 && trade.counter_party_budget_send > 0 {
        return Err(invalid("Only one side of a trade can send budget."));
    }
    check_distinct_games(trade)?;

    owned_games(proposer, &trade.proposer_games)?;
    owned_games(counter_party, &trade.counter_party_games)?;

    if trade.proposer_budget_send > proposer.budget {
        return Err(invalid("You do not have enough budget for this trade."));
    }
    if trade.counter_party_budget_send > counter_party.budget {
        return Err(invalid(
            "The counter party does not have enough budget for this trade.",
        ));
    }

    let games = trade.proposer_games.iter().chain(&trade.counter_party_games);
    for game_id in games {
        if active_trades
            .iter()
            .any(|t| t.id != trade.id && t.status.is_active() && t.involves_game(*game_id))
        {
            return Err(invalid(
                "One or more of the games in this trade is already part of an active trade.",
            ));
        }
    }
    Ok(())
}

struct Side<'a> {
    publisher: &'a Publisher,
    sending: Vec<&'a PublisherGame>,
    receiving: Vec<&'a PublisherGame>,
    budget_send: u32,
    budget_receive: u32,
}

fn check_roster_fit(side: &Side<'_>, league_year: &LeagueYear) -> Result<()> {
    let options = &league_year.options;
    let count = |games: &[&PublisherGame], counter_pick: bool| {
        games.iter().filter(|g| g.counter_pick == counter_pick).count()
    };

    let standard_after = (side.publisher.standard_games().count() + count(&side.receiving, false))
        .saturating_sub(count(&side.sending, false));
    let counter_after = (side.publisher.counter_picks().count() + count(&side.receiving, true))
        .saturating_sub(count(&side.sending, true));
    if standard_after > options.standard_games {
        return Err(FantasyCriticError::validation(format!(
            "{} does not have enough standard slots for this trade.",
            side.publisher.name
        )));
    }
    if counter_after > options.counter_picks {
        return Err(FantasyCriticError::validation(format!(
            "{} does not have enough counter pick slots for this trade.",
            side.publisher.name
        )));
    }

    let sending_ids: Vec<PublisherGameId> = side.sending.iter().map(|g| g.id).collect();
    for incoming in &side.receiving {
        let Some(master_game_id) = incoming.master_game_id() else {
            continue;
        };
        let conflict = side.publisher.games.iter().any(|kept| {
            !sending_ids.contains(&kept.id)
                && kept.master_game_id() == Some(master_game_id)
                && kept.counter_pick != incoming.counter_pick
        });
        if conflict {
            return Err(FantasyCriticError::validation(format!(
                "{} cannot hold '{}' as both a standard game and a counter pick.",
                side.publisher.name,
                incoming.name()
            )));
        }
    }
    Ok(())
}

fn receive(
    publisher: &Publisher,
    side: &Side<'_>,
    trade: &Trade,
    league_year: &LeagueYear,
    now: DateTime<Utc>,
    recipient_name: &str,
) -> Result<(Publisher, Vec<PublisherGame>, Vec<PublisherGame>)> {
    let mut updated = publisher.clone();
    let mut removed = Vec::new();
    let mut added = Vec::new();

    for game in &side.sending {
        let note = format!("Traded to {}", recipient_name);
        if let Some(game) = updated.remove_game(game.id, now, &note) {
            removed.push(game);
        }
    }

    for incoming in &side.receiving {
        let mut scratch = league_year.clone();
        if let Some(p) = scratch.publisher_by_id_mut(updated.id) {
            *p = updated.clone();
        }
        let slot = best_slot(
            &updated,
            incoming.master_game.as_ref(),
            incoming.counter_pick,
            &scratch,
            true,
        )
        .ok_or_else(|| invalid("There is no open slot for a traded game."))?;

        let mut game = (*incoming).clone();
        game.id = PublisherGameId::new_v4();
        game.publisher_id = updated.id;
        game.slot_number = slot;
        game.timestamp = now;
        game.acquired_in_trade_id = Some(trade.id);
        updated.games.push(game.clone());
        added.push(game);
    }

    updated.budget = updated.budget - side.budget_send + side.budget_receive;
    Ok((updated, removed, added))
}

/// Re-validate and apply an accepted trade.
pub fn execute(
    league_year: &LeagueYear,
    trade: &Trade,
    now: DateTime<Utc>,
) -> Result<TradeExecution> {
    check_distinct_games(trade)?;
    let proposer = league_year.require_publisher(trade.proposer)?;
    let counter_party = league_year.require_publisher(trade.counter_party)?;

    let proposer_games = owned_games(proposer, &trade.proposer_games)?;
    let counter_party_games = owned_games(counter_party, &trade.counter_party_games)?;
    if trade.proposer_budget_send > proposer.budget
        || trade.counter_party_budget_send > counter_party.budget
    {
        return Err(invalid(
            "One of the publishers no longer has enough budget for this trade.",
        ));
    }

    let proposer_side = Side {
        publisher: proposer,
        sending: proposer_games.clone(),
        receiving: counter_party_games.clone(),
        budget_send: trade.proposer_budget_send,
        budget_receive: trade.counter_party_budget_send,
    };
    let counter_party_side = Side {
        publisher: counter_party,
        sending: counter_party_games,
        receiving: proposer_games,
        budget_send: trade.counter_party_budget_send,
        budget_receive: trade.proposer_budget_send,
    };
    check_roster_fit(&proposer_side, league_year)?;
    check_roster_fit(&counter_party_side, league_year)?;

    let (new_proposer, mut removed, mut added) = receive(
        proposer,
        &proposer_side,
        trade,
        league_year,
        now,
        &counter_party.name,
    )?;
    let (new_counter_party, removed_cp, added_cp) = receive(
        counter_party,
        &counter_party_side,
        trade,
        league_year,
        now,
        &proposer.name,
    )?;
    removed.extend(removed_cp);
    added.extend(added_cp);

    let describe = |games: &[&PublisherGame], budget: u32| {
        let mut parts: Vec<String> = games.iter().map(|g| format!("'{}'", g.name())).collect();
        if budget > 0 {
            parts.push(format!("${} of budget", budget));
        }
        if parts.is_empty() {
            "nothing".to_string()
        } else {
            parts.join(", ")
        }
    };
    let description = format!(
        "Trade executed: {} sent {}; {} sent {}.",
        proposer.name,
        describe(&proposer_side.sending, trade.proposer_budget_send),
        counter_party.name,
        describe(&counter_party_side.sending, trade.counter_party_budget_send),
    );
    let league_actions = vec![
        LeagueAction::new(
            &new_proposer,
            now,
            LeagueActionType::TradeExecuted,
            description.clone(),
            true,
        ),
        LeagueAction::new(
            &new_counter_party,
            now,
            LeagueActionType::TradeExecuted,
            description,
            true,
        ),
    ];

    tracing::info!(
        trade = %trade.id,
        proposer = %proposer.name,
        counter_party = %counter_party.name,
        "Trade executed"
    );

    Ok(TradeExecution {
        updated_publishers: vec![new_proposer, new_counter_party],
        removed_games: removed,
        added_games: added,
        league_actions,
    })
}
