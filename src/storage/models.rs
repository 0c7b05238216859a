//! Write batches for the storage layer

use crate::cli::types::ids::{BidId, DropId, PublisherId};
use crate::domain::{LeagueAction, LeagueYear, Publisher, Trade};

/// Changes to one league season that must land together.
///
/// Publishers are written whole: the row, current games and former games are
/// replaced by what is in the struct.
#[derive(Debug, Clone, Default)]
pub struct LeagueChanges {
    /// Options, play status, overrides and draft start; publishers are not written from here.
    pub league_year: Option<LeagueYear>,
    pub publishers: Vec<Publisher>,
    pub removed_publishers: Vec<PublisherId>,
    pub actions: Vec<LeagueAction>,
    pub trades: Vec<Trade>,
    pub cancelled_bids: Vec<BidId>,
    pub cancelled_drops: Vec<DropId>,
}

impl LeagueChanges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_league_year(mut self, league_year: &LeagueYear) -> Self {
        self.league_year = Some(league_year.clone());
        self
    }

    pub fn with_publisher(mut self, publisher: &Publisher) -> Self {
        self.publishers.push(publisher.clone());
        self
    }

    pub fn with_publishers<'a>(
        mut self,
        publishers: impl IntoIterator<Item = &'a Publisher>,
    ) -> Self {
        self.publishers.extend(publishers.into_iter().cloned());
        self
    }

    pub fn with_action(mut self, action: LeagueAction) -> Self {
        self.actions.push(action);
        self
    }

    pub fn with_actions(mut self, actions: impl IntoIterator<Item = LeagueAction>) -> Self {
        self.actions.extend(actions);
        self
    }

    pub fn with_trade(mut self, trade: &Trade) -> Self {
        self.trades.push(trade.clone());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.league_year.is_none()
            && self.publishers.is_empty()
            && self.removed_publishers.is_empty()
            && self.actions.is_empty()
            && self.trades.is_empty()
            && self.cancelled_bids.is_empty()
            && self.cancelled_drops.is_empty()
    }
}
