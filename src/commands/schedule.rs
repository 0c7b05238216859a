//! Timed background work: special auctions and Royale point updates.

use std::time::Duration;

use serde::Serialize;

use super::common::CommandContext;
use crate::{error::FantasyCriticError, Result, Year, YearQuarter};

/// What one scheduled pass did
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SchedulePass {
    /// Years whose closed special auctions were processed.
    pub auction_years: Vec<Year>,
    pub royale_quarter: Option<YearQuarter>,
    pub royale_publishers_updated: usize,
}

/// Process closed special auctions for every year in play, then refresh Royale points.
pub fn run_scheduled_pass(ctx: &mut CommandContext) -> Result<SchedulePass> {
    let mut pass = SchedulePass::default();

    let years: Vec<Year> = ctx
        .inter_league()
        .supported_years()?
        .into_iter()
        .filter(|s| s.open_for_play && !s.finished)
        .map(|s| s.year)
        .collect();
    for year in years {
        if ctx.processing().process_special_auctions(year)?.is_some() {
            pass.auction_years.push(year);
        }
    }

    match ctx.royale().active_quarter() {
        Ok(quarter) => {
            let quarter = quarter.year_quarter;
            pass.royale_publishers_updated = ctx.royale().update_fantasy_points(quarter)?;
            pass.royale_quarter = Some(quarter);
        }
        Err(FantasyCriticError::NotFound { .. }) => {
            tracing::debug!("No active Royale quarter");
        }
        Err(e) => return Err(e),
    }
    Ok(pass)
}

fn pass_lines(pass: &SchedulePass) -> Vec<String> {
    let mut lines = Vec::new();
    if pass.auction_years.is_empty() {
        lines.push("No special auctions were ready".to_string());
    }
    for year in &pass.auction_years {
        lines.push(format!("✓ Processed special auctions for {}", year));
    }
    if let Some(quarter) = pass.royale_quarter {
        lines.push(format!(
            "✓ Updated {} Royale publishers for {}",
            pass.royale_publishers_updated, quarter
        ));
    }
    lines
}

/// Run passes every `schedule_interval_secs` until Ctrl-C.
/// A failed pass is logged and retried next tick.
pub async fn handle_schedule(ctx: &mut CommandContext, once: bool) -> Result<()> {
    if once {
        let pass = run_scheduled_pass(ctx)?;
        return ctx.emit(&pass, pass_lines);
    }

    let period = Duration::from_secs(ctx.config.schedule_interval_secs);
    tracing::info!(interval_secs = period.as_secs(), "Scheduler started");
    let mut ticker = tokio::time::interval(period);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match run_scheduled_pass(ctx) {
                    Ok(pass) => tracing::info!(
                        auction_years = pass.auction_years.len(),
                        royale_publishers = pass.royale_publishers_updated,
                        "Scheduled pass complete"
                    ),
                    Err(e) => tracing::error!(error = %e, "Scheduled pass failed"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Scheduler stopped");
                return Ok(());
            }
        }
    }
}
