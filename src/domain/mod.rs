//! Domain model: plain data with light computed properties.

pub mod actions;
pub mod claims;
pub mod league;
pub mod master_game;
pub mod options;
pub mod publisher;
pub mod royale;
pub mod scoring;
pub mod system;
pub mod trade;


pub use actions::{
    ActionProcessingResults, ActionProcessingSetMetadata, DropRequest, LeagueAction,
    LeagueActionType, PickupBid, QueuedGame, SpecialAuction,
};
pub use claims::{ClaimError, ClaimGameRequest, ClaimResult, DraftPhase, DraftStatus};
pub use league::{
    EligibilityFactors, EligibilityOverride, League, LeagueYear, ManagerMessage, PlayStatus,
    TagOverride,
};
pub use master_game::{
    MasterGame, MasterGameChangeLogEntry, MasterGameRequest, MasterGameTag, MasterGameYear, TagType,
};
pub use options::{
    DraftSystem, LeagueOptions, LeagueTagOption, LeagueTagStatus, PickupSystem, SpecialGameSlot,
    TradingSystem,
};
pub use publisher::{FormerPublisherGame, Publisher, PublisherGame, PublisherSlot};
pub use royale::{RoyalePublisher, RoyalePublisherGame, RoyaleStanding, RoyaleYearQuarter};
pub use scoring::ScoringSystem;
pub use system::{
    FantasyCriticUser, SiteCounts, SupportedYear, SystemWideSettings, SystemWideValues,
};
pub use trade::{Trade, TradeStatus};
