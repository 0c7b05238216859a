//! Command implementations for the Fantasy Critic CLI

pub mod admin;
pub mod common;
pub mod league;
pub mod play;
pub mod royale;
pub mod schedule;
pub mod trades;

#[cfg(test)]
mod tests;

use crate::{cli::Commands, Result};
use common::CommandContext;

/// Route a parsed command to its handler.
pub async fn dispatch(ctx: &mut CommandContext, command: Commands) -> Result<()> {
    match command {
        Commands::Init { year } => admin::handle_init(ctx, year),
        Commands::User { cmd } => admin::handle_user(ctx, cmd),
        Commands::Year { cmd } => admin::handle_year(ctx, cmd),
        Commands::Game { cmd } => admin::handle_game(ctx, cmd).await,
        Commands::League { cmd } => league::handle_league(ctx, cmd),
        Commands::Publisher { cmd } => league::handle_publisher(ctx, cmd),
        Commands::Draft { cmd } => play::handle_draft(ctx, cmd),
        Commands::Bid { cmd } => play::handle_bid(ctx, cmd),
        Commands::Drop { cmd } => play::handle_drop(ctx, cmd),
        Commands::Queue { cmd } => play::handle_queue(ctx, cmd),
        Commands::Trade { cmd } => trades::handle_trade(ctx, cmd),
        Commands::Auction { cmd } => play::handle_auction(ctx, cmd),
        Commands::Process { cmd } => admin::handle_process(ctx, cmd),
        Commands::Royale { cmd } => royale::handle_royale(ctx, cmd),
        Commands::Standings { league } => league::handle_standings(ctx, league.key()),
        Commands::Schedule { once } => schedule::handle_schedule(ctx, once).await,
    }
}
