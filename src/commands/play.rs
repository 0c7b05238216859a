//! Draft, pickup bids, drops, queues and special auctions

use serde::Serialize;

use super::common::{resolve_user_id, CommandContext};
use crate::{
    cli::{AuctionCmd, BidCmd, DraftCmd, DropCmd, QueueCmd, UserArgs},
    domain::{ClaimResult, DraftStatus, LeagueYear, PickupBid, QueuedGame},
    error::FantasyCriticError,
    services::acquisition::BidRequest,
    LeagueYearKey, PublisherId, Result,
};

/// Turn a failed claim into an error carrying every reason.
fn require_claim_success(result: ClaimResult) -> Result<ClaimResult> {
    if result.success() {
        return Ok(result);
    }
    Err(FantasyCriticError::validation(result.messages().join(" ")))
}

/// Draft phase plus whose turn it is.
#[derive(Debug, Clone, Serialize)]
pub struct DraftReport {
    pub play_status: String,
    pub status: DraftStatus,
    pub next_publisher: Option<PublisherId>,
}

fn draft_report(ctx: &mut CommandContext, key: LeagueYearKey) -> Result<DraftReport> {
    let league_year = ctx.leagues().league_year(key)?;
    let status = ctx.draft().draft_status(key)?;
    let next_publisher = ctx.draft().next_publisher(key)?;
    Ok(DraftReport {
        play_status: league_year.play_status.as_str().to_string(),
        status,
        next_publisher,
    })
}

fn report_lines(report: &DraftReport) -> Vec<String> {
    let mut lines = vec![format!(
        "{}: {} pick {} (overall {})",
        report.play_status,
        report.status.phase,
        report.status.draft_position,
        report.status.overall_draft_position
    )];
    if let Some(next) = report.next_publisher {
        lines.push(format!("Up next: {}", next));
    }
    lines
}

fn emit_draft(ctx: &mut CommandContext, league_year: &LeagueYear) -> Result<()> {
    let report = draft_report(ctx, league_year.key())?;
    ctx.emit(&report, report_lines)
}

pub fn handle_draft(ctx: &mut CommandContext, cmd: DraftCmd) -> Result<()> {
    match cmd {
        DraftCmd::Order {
            league,
            publishers,
            user: UserArgs { user },
        } => {
            let manager = resolve_user_id(user)?;
            let league_year = ctx.draft().set_draft_order(manager, league.key(), &publishers)?;
            emit_draft(ctx, &league_year)
        }

        DraftCmd::Start {
            league,
            user: UserArgs { user },
        } => {
            let manager = resolve_user_id(user)?;
            let league_year = ctx.draft().start_draft(manager, league.key())?;
            emit_draft(ctx, &league_year)
        }

        DraftCmd::Pick {
            league,
            game,
            counter_pick,
            user: UserArgs { user },
        } => {
            let user = resolve_user_id(user)?;
            let result = ctx
                .draft()
                .draft_game(user, league.key(), game, counter_pick)?;
            require_claim_success(result)?;
            let report = draft_report(ctx, league.key())?;
            ctx.emit(&report, report_lines)
        }

        DraftCmd::Pause {
            league,
            user: UserArgs { user },
        } => {
            let manager = resolve_user_id(user)?;
            let league_year = ctx.draft().pause_draft(manager, league.key())?;
            emit_draft(ctx, &league_year)
        }

        DraftCmd::Resume {
            league,
            user: UserArgs { user },
        } => {
            let manager = resolve_user_id(user)?;
            let league_year = ctx.draft().resume_draft(manager, league.key())?;
            emit_draft(ctx, &league_year)
        }

        DraftCmd::Undo {
            league,
            user: UserArgs { user },
        } => {
            let manager = resolve_user_id(user)?;
            let league_year = ctx.draft().undo_last_draft_action(manager, league.key())?;
            emit_draft(ctx, &league_year)
        }

        DraftCmd::Reset {
            league,
            user: UserArgs { user },
        } => {
            let manager = resolve_user_id(user)?;
            let league_year = ctx.draft().reset_draft(manager, league.key())?;
            emit_draft(ctx, &league_year)
        }

        DraftCmd::Auto { league } => {
            let league_year = ctx.draft().run_auto_draft_and_check_complete(league.key())?;
            emit_draft(ctx, &league_year)
        }

        DraftCmd::Status { league } => {
            let report = draft_report(ctx, league.key())?;
            ctx.emit(&report, report_lines)
        }
    }
}

fn bid_line(bid: &PickupBid) -> String {
    format!(
        "{} #{} {} ${}{}",
        bid.id,
        bid.priority,
        bid.master_game.master_game.name,
        bid.bid_amount,
        if bid.counter_pick { " (counter pick)" } else { "" }
    )
}

pub fn handle_bid(ctx: &mut CommandContext, cmd: BidCmd) -> Result<()> {
    match cmd {
        BidCmd::Place {
            league,
            publisher,
            game,
            amount,
            counter_pick,
            conditional_drop,
            allow_ineligible_slot,
            user: UserArgs { user },
        } => {
            let user = resolve_user_id(user)?;
            let request = BidRequest {
                publisher_id: publisher,
                master_game_id: game,
                bid_amount: amount,
                counter_pick,
                conditional_drop,
                allow_ineligible_slot,
            };
            let result = ctx.acquisitions().make_pickup_bid(user, league.key(), &request)?;
            require_claim_success(result)?;
            let bids = ctx.acquisitions().current_bids(league.key(), publisher)?;
            ctx.emit(&bids, |bs| bs.iter().map(bid_line).collect())
        }

        BidCmd::Remove {
            league,
            bid,
            user: UserArgs { user },
        } => {
            let user = resolve_user_id(user)?;
            ctx.acquisitions().remove_pickup_bid(user, league.key(), bid)?;
            ctx.emit(&bid, |id| vec![format!("✓ Removed bid {}", id)])
        }

        BidCmd::Priority {
            league,
            publisher,
            bids,
            user: UserArgs { user },
        } => {
            let user = resolve_user_id(user)?;
            let bids = ctx
                .publishers()
                .set_bid_priority_order(user, league.key(), publisher, &bids)?;
            ctx.emit(&bids, |bs| bs.iter().map(bid_line).collect())
        }

        BidCmd::List { league, publisher } => {
            let bids = ctx.acquisitions().current_bids(league.key(), publisher)?;
            ctx.emit(&bids, |bs| bs.iter().map(bid_line).collect())
        }
    }
}

pub fn handle_drop(ctx: &mut CommandContext, cmd: DropCmd) -> Result<()> {
    match cmd {
        DropCmd::Request {
            league,
            publisher,
            publisher_game,
            user: UserArgs { user },
        } => {
            let user = resolve_user_id(user)?;
            let drop = ctx
                .acquisitions()
                .make_drop_request(user, league.key(), publisher, publisher_game)?;
            ctx.emit(&drop, |d| {
                vec![format!("✓ Drop {} requested for {}", d.id, d.master_game.master_game.name)]
            })
        }

        DropCmd::Remove {
            league,
            drop,
            user: UserArgs { user },
        } => {
            let user = resolve_user_id(user)?;
            ctx.acquisitions().remove_drop_request(user, league.key(), drop)?;
            ctx.emit(&drop, |id| vec![format!("✓ Removed drop request {}", id)])
        }
    }
}

fn queue_lines(queue: &[QueuedGame]) -> Vec<String> {
    queue
        .iter()
        .map(|q| {
            format!(
                "{:>2}. {} {}",
                q.rank, q.master_game.id(), q.master_game.master_game.name
            )
        })
        .collect()
}

pub fn handle_queue(ctx: &mut CommandContext, cmd: QueueCmd) -> Result<()> {
    match cmd {
        QueueCmd::Add {
            league,
            publisher,
            game,
            user: UserArgs { user },
        } => {
            let user = resolve_user_id(user)?;
            let queue = ctx
                .publishers()
                .queue_game(user, league.key(), publisher, game)?;
            ctx.emit(queue.as_slice(), queue_lines)
        }

        QueueCmd::Rank {
            league,
            publisher,
            games,
            user: UserArgs { user },
        } => {
            let user = resolve_user_id(user)?;
            let queue = ctx
                .publishers()
                .set_queue_rankings(user, league.key(), publisher, &games)?;
            ctx.emit(queue.as_slice(), queue_lines)
        }
    }
}

pub fn handle_auction(ctx: &mut CommandContext, cmd: AuctionCmd) -> Result<()> {
    match cmd {
        AuctionCmd::Create {
            league,
            game,
            end_time,
            user: UserArgs { user },
        } => {
            let manager = resolve_user_id(user)?;
            let auction = ctx
                .acquisitions()
                .create_special_auction(manager, league.key(), game, end_time)?;
            ctx.emit(&auction, |a| {
                vec![format!(
                    "✓ Auction {} on {} closes {}",
                    a.id, a.master_game.master_game.name, a.scheduled_end_time
                )]
            })
        }

        AuctionCmd::List { league } => {
            let auctions = ctx.acquisitions().special_auctions(league.key())?;
            ctx.emit(&auctions, |auctions| {
                auctions
                    .iter()
                    .map(|a| {
                        format!(
                            "{} {} closes {}{}",
                            a.id,
                            a.master_game.master_game.name,
                            a.scheduled_end_time,
                            if a.processed { " (processed)" } else { "" }
                        )
                    })
                    .collect()
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ClaimError;

    #[test]
    fn test_require_claim_success_joins_messages() {
        let result = ClaimResult {
            errors: vec![
                ClaimError::new("That game is already on a roster.", false),
                ClaimError::new("No open slots.", true),
            ],
            best_slot: None,
            override_requested: false,
        };
        let err = require_claim_success(result).unwrap_err();
        assert_eq!(
            err.to_string(),
            "That game is already on a roster. No open slots."
        );
    }

    #[test]
    fn test_require_claim_success_passes_clean_result() {
        let result = ClaimResult {
            best_slot: Some(0),
            ..ClaimResult::default()
        };
        assert_eq!(require_claim_success(result).unwrap().best_slot, Some(0));
    }
}
