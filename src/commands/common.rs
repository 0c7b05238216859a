//! Shared command plumbing: the open database, the clock and output formatting.

use serde::Serialize;

use crate::{
    cli::types::ids::UserId,
    core::{Clock, Config, SystemClock},
    error::FantasyCriticError,
    services::{
        ActionProcessingService, DraftService, GameAcquisitionService, InterLeagueService,
        LeagueMemberService, LeagueService, PublisherService, RoyaleService, TradeService,
    },
    storage::FantasyCriticDatabase,
    Result, USER_ID_ENV_VAR,
};

/// Resources every command needs
pub struct CommandContext {
    pub db: FantasyCriticDatabase,
    pub clock: Box<dyn Clock>,
    pub config: Config,
    pub as_json: bool,
}

impl CommandContext {
    /// Open the configured database with the system clock
    pub fn open(config: Config, as_json: bool) -> Result<Self> {
        tracing::debug!(path = %config.database_path.display(), "Opening database");
        let db = FantasyCriticDatabase::from_config(&config)?;
        Ok(Self::with_database(
            db,
            Box::new(SystemClock),
            config,
            as_json,
        ))
    }

    pub fn with_database(
        db: FantasyCriticDatabase,
        clock: Box<dyn Clock>,
        config: Config,
        as_json: bool,
    ) -> Self {
        Self {
            db,
            clock,
            config,
            as_json,
        }
    }

    pub fn leagues(&mut self) -> LeagueService<'_, FantasyCriticDatabase> {
        LeagueService::new(&mut self.db, &*self.clock)
    }

    pub fn members(&mut self) -> LeagueMemberService<'_, FantasyCriticDatabase> {
        LeagueMemberService::new(&mut self.db)
    }

    pub fn publishers(&mut self) -> PublisherService<'_, FantasyCriticDatabase> {
        PublisherService::new(&mut self.db, &*self.clock)
    }

    pub fn draft(&mut self) -> DraftService<'_, FantasyCriticDatabase> {
        DraftService::new(&mut self.db, &*self.clock)
    }

    pub fn acquisitions(&mut self) -> GameAcquisitionService<'_, FantasyCriticDatabase> {
        GameAcquisitionService::new(&mut self.db, &*self.clock)
    }

    pub fn processing(&mut self) -> ActionProcessingService<'_, FantasyCriticDatabase> {
        ActionProcessingService::new(&mut self.db, &*self.clock)
    }

    pub fn trades(&mut self) -> TradeService<'_, FantasyCriticDatabase> {
        TradeService::new(&mut self.db, &*self.clock)
    }

    pub fn royale(&mut self) -> RoyaleService<'_, FantasyCriticDatabase> {
        RoyaleService::new(&mut self.db, &*self.clock)
    }

    pub fn inter_league(&mut self) -> InterLeagueService<'_, FantasyCriticDatabase> {
        InterLeagueService::new(&mut self.db, &*self.clock)
    }

    /// Print `value` as pretty JSON, or as the text lines `render` produces.
    pub fn emit<T, F>(&self, value: &T, render: F) -> Result<()>
    where
        T: Serialize + ?Sized,
        F: FnOnce(&T) -> Vec<String>,
    {
        if self.as_json {
            println!("{}", serde_json::to_string_pretty(value)?); // tarpaulin::skip
        } else {
            for line in render(value) {
                println!("{}", line); // tarpaulin::skip
            }
        }
        Ok(())
    }
}

/// Resolve the acting user from the flag or environment variable
pub fn resolve_user_id(user: Option<UserId>) -> Result<UserId> {
    user.or_else(|| {
        std::env::var(USER_ID_ENV_VAR)
            .ok()
            .and_then(|s| s.trim().parse::<UserId>().ok())
    })
    .ok_or_else(|| FantasyCriticError::MissingUserId {
        env_var: USER_ID_ENV_VAR.to_string(),
    })
}

/// Format an optional critic score for text output.
pub fn score_text(score: Option<f64>) -> String {
    score.map_or_else(|| "--".to_string(), |s| format!("{:.2}", s))
}
