//! Entry point: parse CLI and dispatch to command handlers.

use clap::Parser;
use fantasy_critic::{
    cli::FantasyCritic,
    commands::{common::CommandContext, dispatch},
    core::{logging, Config},
    Result,
};

/// Run the CLI.
#[tokio::main]
async fn main() -> Result<()> {
    let app = FantasyCritic::parse();

    let config = Config::load()?;
    logging::init(&config.log_level);

    let mut ctx = CommandContext::open(config, app.json)?;
    if let Err(e) = dispatch(&mut ctx, app.command).await {
        if e.is_client_error() {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
        return Err(e);
    }

    Ok(())
}
