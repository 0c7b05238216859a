//! Integration tests for configuration and command handlers

use fantasy_critic::{
    commands::{admin::handle_init, common::CommandContext, schedule::run_scheduled_pass},
    core::Config,
    domain::MasterGame,
    FantasyCriticError, Year, YearQuarter,
};
use tempfile::tempdir;

fn temp_config(dir: &std::path::Path) -> Config {
    let toml = format!(
        r#"
database_path = "{}"
cache_dir = "{}"
log_level = "debug"
schedule_interval_secs = 60
"#,
        dir.join("fc.db").display(),
        dir.join("cache").display()
    );
    let path = dir.join("config.toml");
    std::fs::write(&path, toml).unwrap();
    Config::from_path(&path).unwrap()
}

#[test]
fn test_config_file_overrides_defaults() {
    let dir = tempdir().unwrap();
    let config = temp_config(dir.path());

    assert_eq!(config.database_path, dir.path().join("fc.db"));
    assert_eq!(config.log_level, "debug");
    assert_eq!(config.schedule_interval_secs, 60);
    assert_eq!(
        config.master_game_cache_capacity,
        Config::default().master_game_cache_capacity
    );
}

#[test]
fn test_init_creates_database_file() {
    let dir = tempdir().unwrap();
    let config = temp_config(dir.path());
    let db_path = config.database_path.clone();

    let mut ctx = CommandContext::open(config, true).unwrap();
    handle_init(&mut ctx, Year::new(2026)).unwrap();

    assert!(db_path.exists());
    let years = ctx.inter_league().supported_years().unwrap();
    assert_eq!(years.len(), 1);
    assert_eq!(years[0].year, Year::new(2026));
}

#[test]
fn test_master_game_years_snapshot_to_cache_dir() {
    let dir = tempdir().unwrap();
    let config = temp_config(dir.path());
    let cache_dir = config.cache_dir.clone();

    let mut ctx = CommandContext::open(config, false).unwrap();
    handle_init(&mut ctx, Year::new(2026)).unwrap();
    let user = ctx.inter_league().add_user("Admin").unwrap().id;
    let min_release = chrono::NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();
    let game = MasterGame::new("Snapshot", min_release, ctx.clock.now());
    ctx.inter_league().create_master_game(user, game).unwrap();

    let games = ctx.inter_league().master_game_years(Year::new(2026)).unwrap();
    assert_eq!(games.len(), 1);
    assert!(cache_dir.join("master_game_years_2026.json").exists());
}

#[test]
fn test_scheduled_pass_finds_no_quarter() {
    let dir = tempdir().unwrap();
    let mut ctx = CommandContext::open(temp_config(dir.path()), false).unwrap();
    handle_init(&mut ctx, Year::new(2026)).unwrap();

    let pass = run_scheduled_pass(&mut ctx).unwrap();
    assert!(pass.royale_quarter.is_none());

    let err = ctx.royale().active_quarter().unwrap_err();
    assert!(matches!(err, FantasyCriticError::NotFound { .. }));
}

#[test]
fn test_royale_quarter_lifecycle() {
    let dir = tempdir().unwrap();
    let mut ctx = CommandContext::open(temp_config(dir.path()), false).unwrap();
    let quarter: YearQuarter = "2026-Q1".parse().unwrap();

    ctx.royale().start_new_quarter(quarter).unwrap();
    assert_eq!(ctx.royale().active_quarter().unwrap().year_quarter, quarter);

    let finished = ctx.royale().finish_quarter(quarter).unwrap();
    assert!(finished.finished);
    assert_eq!(finished.winning_user, None);
    assert!(ctx.royale().active_quarter().is_err());
}
