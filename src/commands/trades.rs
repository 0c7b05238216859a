//! Trade commands

use super::common::{resolve_user_id, CommandContext};
use crate::{
    cli::{TradeCmd, TradeRef, UserArgs},
    domain::Trade,
    services::TradeProposal,
    Result,
};

fn trade_line(trade: &Trade) -> String {
    format!(
        "{} {} {} -> {} ({} for {} games, ${} for ${})",
        trade.id,
        trade.status.as_str(),
        trade.proposer,
        trade.counter_party,
        trade.proposer_games.len(),
        trade.counter_party_games.len(),
        trade.proposer_budget_send,
        trade.counter_party_budget_send
    )
}

pub fn handle_trade(ctx: &mut CommandContext, cmd: TradeCmd) -> Result<()> {
    let trade = match cmd {
        TradeCmd::Propose {
            league,
            proposer,
            counter_party,
            give,
            receive,
            send_budget,
            receive_budget,
            message,
            user: UserArgs { user },
        } => {
            let user = resolve_user_id(user)?;
            let proposal = TradeProposal {
                proposer,
                counter_party,
                proposer_games: give,
                counter_party_games: receive,
                proposer_budget_send: send_budget,
                counter_party_budget_send: receive_budget,
                message,
            };
            ctx.trades().propose_trade(user, league.key(), &proposal)?
        }
        TradeCmd::Accept(TradeRef { league, trade, user }) => {
            let user = resolve_user_id(user.user)?;
            ctx.trades().accept_trade(user, league.key(), trade)?
        }
        TradeCmd::Reject(TradeRef { league, trade, user }) => {
            let user = resolve_user_id(user.user)?;
            ctx.trades().reject_trade(user, league.key(), trade)?
        }
        TradeCmd::Rescind(TradeRef { league, trade, user }) => {
            let user = resolve_user_id(user.user)?;
            ctx.trades().rescind_trade(user, league.key(), trade)?
        }
        TradeCmd::Execute(TradeRef { league, trade, user }) => {
            let manager = resolve_user_id(user.user)?;
            ctx.trades().manager_execute_trade(manager, league.key(), trade)?
        }
        TradeCmd::ManagerReject(TradeRef { league, trade, user }) => {
            let manager = resolve_user_id(user.user)?;
            ctx.trades().manager_reject_trade(manager, league.key(), trade)?
        }
        TradeCmd::List { league, active } => {
            let trades = if active {
                ctx.trades().active_trades(league.key())?
            } else {
                ctx.trades().trades(league.key())?
            };
            return ctx.emit(&trades, |ts| ts.iter().map(trade_line).collect());
        }
    };
    ctx.emit(&trade, |t| vec![trade_line(t)])
}
