//! Royale commands

use super::common::{resolve_user_id, score_text, CommandContext};
use crate::{
    cli::{RoyaleCmd, UserArgs},
    domain::{RoyalePublisher, RoyaleYearQuarter},
    Result, YearQuarter,
};

/// The given quarter, or the active one.
fn quarter_or_active(
    ctx: &mut CommandContext,
    quarter: Option<YearQuarter>,
) -> Result<YearQuarter> {
    match quarter {
        Some(q) => Ok(q),
        None => Ok(ctx.royale().active_quarter()?.year_quarter),
    }
}

fn quarter_line(quarter: &RoyaleYearQuarter) -> String {
    let winner = quarter
        .winning_user
        .map_or_else(|| "none".to_string(), |u| u.to_string());
    format!(
        "{} open={} finished={} winner={}",
        quarter.year_quarter, quarter.open_for_play, quarter.finished, winner
    )
}

fn publisher_lines(publisher: &RoyalePublisher) -> Vec<String> {
    let mut lines = vec![format!(
        "{} {} ({}) budget ${}",
        publisher.id, publisher.name, publisher.year_quarter, publisher.budget
    )];
    for game in &publisher.games {
        lines.push(format!(
            "  {} {} spent ${} ads ${} points {}",
            game.master_game_id(),
            game.master_game.master_game.name,
            game.amount_spent,
            game.advertising_money,
            score_text(game.fantasy_points)
        ));
    }
    lines
}

pub fn handle_royale(ctx: &mut CommandContext, cmd: RoyaleCmd) -> Result<()> {
    match cmd {
        RoyaleCmd::QuarterStart { quarter } => {
            let quarter = ctx.royale().start_new_quarter(quarter)?;
            ctx.emit(&quarter, |q| vec![quarter_line(q)])
        }

        RoyaleCmd::QuarterFinish { quarter } => {
            let quarter = ctx.royale().finish_quarter(quarter)?;
            ctx.emit(&quarter, |q| vec![quarter_line(q)])
        }

        RoyaleCmd::Join {
            name,
            quarter,
            user: UserArgs { user },
        } => {
            let user = resolve_user_id(user)?;
            let quarter = quarter_or_active(ctx, quarter)?;
            let publisher = ctx.royale().create_publisher(user, quarter, &name)?;
            ctx.emit(&publisher, publisher_lines)
        }

        RoyaleCmd::Purchase {
            publisher,
            game,
            user: UserArgs { user },
        } => {
            let user = resolve_user_id(user)?;
            let publisher = ctx.royale().purchase_game(user, publisher, game)?;
            ctx.emit(&publisher, publisher_lines)
        }

        RoyaleCmd::Sell {
            publisher,
            game,
            user: UserArgs { user },
        } => {
            let user = resolve_user_id(user)?;
            let publisher = ctx.royale().sell_game(user, publisher, game)?;
            ctx.emit(&publisher, publisher_lines)
        }

        RoyaleCmd::Advertise {
            publisher,
            game,
            amount,
            user: UserArgs { user },
        } => {
            let user = resolve_user_id(user)?;
            let publisher = ctx
                .royale()
                .set_advertising_money(user, publisher, game, amount)?;
            ctx.emit(&publisher, publisher_lines)
        }

        RoyaleCmd::Games { quarter } => {
            let quarter = quarter_or_active(ctx, quarter)?;
            let games = ctx.royale().master_games_for_quarter(quarter)?;
            ctx.emit(&games, |gs| {
                gs.iter()
                    .map(|g| {
                        format!(
                            "{} {} ${}",
                            g.id(),
                            g.master_game.name,
                            g.royale_game_cost()
                        )
                    })
                    .collect()
            })
        }

        RoyaleCmd::Standings { quarter } => {
            let quarter = quarter_or_active(ctx, quarter)?;
            let standings = ctx.royale().standings(quarter)?;
            ctx.emit(&standings, |ss| {
                ss.iter()
                    .map(|s| {
                        let rank = s.ranking.map_or_else(|| "--".to_string(), |r| r.to_string());
                        format!("{:>3}. {} {:.2}", rank, s.name, s.total_fantasy_points)
                    })
                    .collect()
            })
        }

        RoyaleCmd::UpdatePoints { quarter } => {
            let quarter = quarter_or_active(ctx, quarter)?;
            let updated = ctx.royale().update_fantasy_points(quarter)?;
            ctx.emit(&updated, |n| {
                vec![format!("✓ Updated {} Royale publishers for {}", n, quarter)]
            })
        }
    }
}
