//! Tests for command plumbing and handlers

use super::common::{resolve_user_id, CommandContext};
use super::*;
use crate::{
    cli::{Commands, FantasyCritic, LeagueCmd, RoyaleCmd, TradeCmd},
    core::{Config, FixedClock},
    error::FantasyCriticError,
    fixtures::{now, YEAR},
    storage::FantasyCriticDatabase,
    UserId, YearQuarter, USER_ID_ENV_VAR,
};
use clap::{CommandFactory, Parser};

fn test_context() -> CommandContext {
    let db = FantasyCriticDatabase::new_in_memory().unwrap();
    CommandContext::with_database(
        db,
        Box::new(FixedClock::new(now())),
        Config::default(),
        false,
    )
}

#[cfg(test)]
mod command_tests {
    use super::*;

    #[test]
    fn test_resolve_user_id_from_option() {
        let user = UserId::new_v4();
        assert_eq!(resolve_user_id(Some(user)).unwrap(), user);
    }

    #[test]
    fn test_resolve_user_id_from_env() {
        let user = UserId::new_v4();
        std::env::set_var(USER_ID_ENV_VAR, user.to_string());
        assert_eq!(resolve_user_id(None).unwrap(), user);

        std::env::set_var(USER_ID_ENV_VAR, "not_a_uuid");
        assert!(resolve_user_id(None).is_err());

        std::env::remove_var(USER_ID_ENV_VAR);
        match resolve_user_id(None).unwrap_err() {
            FantasyCriticError::MissingUserId { env_var } => {
                assert_eq!(env_var, USER_ID_ENV_VAR);
            }
            other => panic!("Expected MissingUserId error, got {:?}", other),
        }
    }
}

#[cfg(test)]
mod parse_tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        FantasyCritic::command().debug_assert();
    }

    #[test]
    fn test_league_show_defaults_year() {
        let league_id = crate::LeagueId::new_v4();
        let app = FantasyCritic::try_parse_from([
            "fantasy-critic",
            "--json",
            "league",
            "show",
            "--league-id",
            &league_id.to_string(),
        ])
        .unwrap();

        assert!(app.json);
        match app.command {
            Commands::League {
                cmd: LeagueCmd::Show { league },
            } => {
                assert_eq!(league.league_id, league_id);
                assert_eq!(league.year, crate::Year::default());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_trade_accept_parses_ids() {
        let league_id = crate::LeagueId::new_v4();
        let trade_id = crate::TradeId::new_v4();
        let app = FantasyCritic::try_parse_from([
            "fantasy-critic",
            "trade",
            "accept",
            "-l",
            &league_id.to_string(),
            "-y",
            "2025",
            &trade_id.to_string(),
        ])
        .unwrap();

        match app.command {
            Commands::Trade {
                cmd: TradeCmd::Accept(trade),
            } => {
                assert_eq!(trade.trade, trade_id);
                assert_eq!(trade.league.year, crate::Year::new(2025));
                assert!(trade.user.user.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_royale_quarter_parses() {
        let app =
            FantasyCritic::try_parse_from(["fantasy-critic", "royale", "quarter-start", "2026-Q2"])
                .unwrap();
        match app.command {
            Commands::Royale {
                cmd: RoyaleCmd::QuarterStart { quarter },
            } => assert_eq!(quarter, YearQuarter::new(YEAR, 2).unwrap()),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_id_is_rejected() {
        let result = FantasyCritic::try_parse_from([
            "fantasy-critic",
            "league",
            "show",
            "--league-id",
            "12345",
        ]);
        assert!(result.is_err());
    }
}

#[cfg(test)]
mod handler_tests {
    use super::*;
    use crate::domain::LeagueOptions;

    #[test]
    fn test_init_opens_year_once() {
        let mut ctx = test_context();
        admin::handle_init(&mut ctx, YEAR).unwrap();
        admin::handle_init(&mut ctx, YEAR).unwrap();

        let years = ctx.inter_league().supported_years().unwrap();
        assert_eq!(years.len(), 1);
        assert!(years[0].open_for_play);
    }

    #[test]
    fn test_league_standings_ranks_every_publisher() {
        let mut ctx = test_context();
        admin::handle_init(&mut ctx, YEAR).unwrap();
        let manager = ctx.inter_league().add_user("Manager").unwrap().id;
        let player = ctx.inter_league().add_user("Player").unwrap().id;
        let key = ctx
            .leagues()
            .create_league(manager, "Critics", YEAR, LeagueOptions::default(), false)
            .unwrap()
            .key();
        ctx.members().add_user_to_league(key.league_id, player).unwrap();
        ctx.members().set_player_active(manager, key, player, true).unwrap();
        ctx.publishers().create_publisher(manager, key, "Zeta").unwrap();
        ctx.publishers().create_publisher(player, key, "Alpha").unwrap();

        let rows = league::league_standings(&mut ctx, key).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].rank, 1);
        assert_eq!(rows[0].name, "Alpha");
        assert_eq!(rows[1].rank, 2);
        assert_eq!(rows[1].fantasy_points, 0.0);
    }

    #[test]
    fn test_scheduled_pass_without_work() {
        let mut ctx = test_context();
        admin::handle_init(&mut ctx, YEAR).unwrap();

        let pass = schedule::run_scheduled_pass(&mut ctx).unwrap();
        assert!(pass.auction_years.is_empty());
        assert_eq!(pass.royale_quarter, None);
    }

    #[test]
    fn test_scheduled_pass_updates_active_quarter() {
        let mut ctx = test_context();
        admin::handle_init(&mut ctx, YEAR).unwrap();
        let quarter = YearQuarter::for_date(now().date_naive());
        ctx.royale().start_new_quarter(quarter).unwrap();
        let user = ctx.inter_league().add_user("Royale Player").unwrap().id;
        ctx.royale().create_publisher(user, quarter, "Royale Games").unwrap();

        let pass = schedule::run_scheduled_pass(&mut ctx).unwrap();
        assert_eq!(pass.royale_quarter, Some(quarter));
        assert_eq!(pass.royale_publishers_updated, 1);
    }
}
