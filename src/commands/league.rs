//! League, publisher and standings commands

use serde::Serialize;

use super::common::{resolve_user_id, CommandContext};
use crate::{
    cli::{LeagueCmd, PublisherCmd, RosterArgs, UserArgs},
    domain::{LeagueOptions, LeagueYear, Publisher},
    services::EditPublisherRequest,
    LeagueYearKey, PublisherId, Result, UserId,
};

/// Overlay the flags that were given onto `options`.
pub fn apply_roster_args(options: &mut LeagueOptions, roster: &RosterArgs) {
    if let Some(n) = roster.standard_games {
        options.standard_games = n;
    }
    if let Some(n) = roster.games_to_draft {
        options.games_to_draft = n;
    }
    if let Some(n) = roster.counter_picks {
        options.counter_picks = n;
    }
    if let Some(n) = roster.counter_picks_to_draft {
        options.counter_picks_to_draft = n;
    }
    if let Some(n) = roster.minimum_bid {
        options.minimum_bid_amount = n;
    }
}

fn league_year_lines(league_year: &LeagueYear) -> Vec<String> {
    let mut lines = vec![format!(
        "{} {} ({}) {}",
        league_year.league.id,
        league_year.league.name,
        league_year.year,
        league_year.play_status.as_str()
    )];
    let mut publishers: Vec<&Publisher> = league_year.publishers.iter().collect();
    publishers.sort_by_key(|p| p.draft_position);
    for publisher in publishers {
        lines.push(format!(
            "  #{} {} {} budget ${} games {}",
            publisher.draft_position,
            publisher.id,
            publisher.name,
            publisher.budget,
            publisher.games.len()
        ));
    }
    lines
}

fn publisher_lines(publisher: &Publisher) -> Vec<String> {
    let mut lines = vec![format!(
        "{} {} budget ${}",
        publisher.id, publisher.name, publisher.budget
    )];
    let mut games: Vec<_> = publisher.games.iter().collect();
    games.sort_by_key(|g| (g.counter_pick, g.slot_number));
    for game in games {
        let kind = if game.counter_pick { "CP" } else { "  " };
        lines.push(format!(
            "  {} {} {} {}",
            kind, game.slot_number, game.id, game.name()
        ));
    }
    lines
}

pub fn handle_league(ctx: &mut CommandContext, cmd: LeagueCmd) -> Result<()> {
    match cmd {
        LeagueCmd::Create {
            name,
            year,
            test,
            public,
            roster,
            user: UserArgs { user },
        } => {
            let user = resolve_user_id(user)?;
            let mut options = LeagueOptions {
                public_league: public,
                ..LeagueOptions::default()
            };
            apply_roster_args(&mut options, &roster);
            let league_year = ctx.leagues().create_league(user, &name, year, options, test)?;
            ctx.emit(&league_year, league_year_lines)
        }

        LeagueCmd::AddYear {
            league,
            user: UserArgs { user },
        } => {
            let user = resolve_user_id(user)?;
            let league_year = ctx
                .leagues()
                .add_new_league_year(user, league.league_id, league.year)?;
            ctx.emit(&league_year, league_year_lines)
        }

        LeagueCmd::Join {
            league_id,
            user: UserArgs { user },
        } => {
            let user = resolve_user_id(user)?;
            ctx.members().add_user_to_league(league_id, user)?;
            let members = ctx.members().users_in_league(league_id)?;
            ctx.emit(&members, |m| {
                vec![format!("✓ Joined league {} ({} members)", league_id, m.len())]
            })
        }

        LeagueCmd::Activate {
            league,
            player,
            inactive,
            user: UserArgs { user },
        } => {
            let manager = resolve_user_id(user)?;
            ctx.members()
                .set_player_active(manager, league.key(), player, !inactive)?;
            let active = ctx.members().active_players(league.key())?;
            ctx.emit(&active, |a| a.iter().map(UserId::to_string).collect())
        }

        LeagueCmd::Options {
            league,
            roster,
            user: UserArgs { user },
        } => {
            let user = resolve_user_id(user)?;
            let mut options = ctx.leagues().league_year(league.key())?.options;
            apply_roster_args(&mut options, &roster);
            let league_year = ctx
                .leagues()
                .edit_league_year_options(user, league.key(), options)?;
            ctx.emit(&league_year.options, |o| {
                vec![format!(
                    "standard {} (draft {}), counter picks {} (draft {}), minimum bid ${}",
                    o.standard_games,
                    o.games_to_draft,
                    o.counter_picks,
                    o.counter_picks_to_draft,
                    o.minimum_bid_amount
                )]
            })
        }

        LeagueCmd::Show { league } => {
            let league_year = ctx.leagues().league_year(league.key())?;
            ctx.emit(&league_year, league_year_lines)
        }
    }
}

pub fn handle_publisher(ctx: &mut CommandContext, cmd: PublisherCmd) -> Result<()> {
    match cmd {
        PublisherCmd::Create {
            league,
            name,
            user: UserArgs { user },
        } => {
            let user = resolve_user_id(user)?;
            let publisher = ctx.publishers().create_publisher(user, league.key(), &name)?;
            ctx.emit(&publisher, publisher_lines)
        }

        PublisherCmd::Edit {
            league,
            publisher,
            name,
            budget,
            free_games_dropped,
            will_not_release_games_dropped,
            will_release_games_dropped,
            user: UserArgs { user },
        } => {
            let manager = resolve_user_id(user)?;
            let request = EditPublisherRequest {
                name,
                budget,
                free_games_dropped,
                will_not_release_games_dropped,
                will_release_games_dropped,
            };
            let publisher = ctx
                .publishers()
                .edit_publisher(manager, league.key(), publisher, &request)?;
            ctx.emit(&publisher, publisher_lines)
        }

        PublisherCmd::Remove {
            league,
            publisher_game,
            user: UserArgs { user },
        } => {
            let manager = resolve_user_id(user)?;
            let publisher = ctx
                .publishers()
                .remove_publisher_game(manager, league.key(), publisher_game)?;
            ctx.emit(&publisher, publisher_lines)
        }
    }
}

/// One row of league standings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StandingRow {
    pub rank: usize,
    pub publisher_id: PublisherId,
    pub name: String,
    pub fantasy_points: f64,
    pub projected_points: f64,
}

/// Publishers ordered by total fantasy points, best first.
pub fn league_standings(ctx: &mut CommandContext, key: LeagueYearKey) -> Result<Vec<StandingRow>> {
    let league_year = ctx.leagues().league_year(key)?;
    let finished: Vec<_> = ctx
        .inter_league()
        .supported_years()?
        .into_iter()
        .filter(|s| s.finished)
        .map(|s| s.year)
        .collect();
    let year_finished = league_year.is_finished(&finished);
    let values = ctx.inter_league().system_wide_values()?;
    let today = ctx.clock.today();

    let mut rows: Vec<StandingRow> = league_year
        .publishers
        .iter()
        .map(|p| StandingRow {
            rank: 0,
            publisher_id: p.id,
            name: p.name.clone(),
            fantasy_points: p.total_fantasy_points(year_finished, &league_year.options),
            projected_points: p.projected_fantasy_points(&league_year, &values, today),
        })
        .collect();
    rows.sort_by(|a, b| {
        b.fantasy_points
            .partial_cmp(&a.fantasy_points)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.name.cmp(&b.name))
    });
    for (i, row) in rows.iter_mut().enumerate() {
        row.rank = i + 1;
    }
    Ok(rows)
}

pub fn handle_standings(ctx: &mut CommandContext, key: LeagueYearKey) -> Result<()> {
    let rows = league_standings(ctx, key)?;
    ctx.emit(&rows, |rs| {
        rs.iter()
            .map(|r| {
                format!(
                    "{:>2}. {} {:.2} (projected {:.2})",
                    r.rank, r.name, r.fantasy_points, r.projected_points
                )
            })
            .collect()
    })
}
