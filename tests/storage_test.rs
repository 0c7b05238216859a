//! Integration tests for SQLite storage

use chrono::{NaiveDate, TimeZone, Utc};
use fantasy_critic::{
    domain::{FantasyCriticUser, MasterGame, SupportedYear},
    storage::*,
    UserId, Year,
};
use tempfile::tempdir;

fn create_test_db() -> FantasyCriticDatabase {
    FantasyCriticDatabase::new_in_memory().unwrap()
}

fn test_user(name: &str) -> FantasyCriticUser {
    FantasyCriticUser {
        id: UserId::new_v4(),
        display_name: name.to_string(),
    }
}

fn test_game(name: &str) -> MasterGame {
    let added = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    let mut game = MasterGame::new(name, NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(), added);
    game.maximum_release_date = NaiveDate::from_ymd_opt(2026, 9, 30);
    game
}

#[test]
fn test_database_creation() {
    let db = create_test_db();
    assert!(db.get_supported_years().unwrap().is_empty());
}

#[test]
fn test_user_round_trip() {
    let mut db = create_test_db();
    let user = test_user("Critic");
    db.save_user(&user).unwrap();

    assert_eq!(db.get_user(user.id).unwrap(), Some(user));
    assert_eq!(db.get_user(UserId::new_v4()).unwrap(), None);
}

#[test]
fn test_supported_year_round_trip() {
    let mut db = create_test_db();
    let mut year = SupportedYear::open(Year::new(2026));
    db.save_supported_year(&year).unwrap();

    year.finished = true;
    year.open_for_creation = false;
    db.save_supported_year(&year).unwrap();

    let years = db.get_supported_years().unwrap();
    assert_eq!(years, vec![year]);
}

#[test]
fn test_action_processing_mode_toggles() {
    let mut db = create_test_db();
    assert!(!db.get_system_wide_settings().unwrap().action_processing_mode);

    db.set_action_processing_mode(true).unwrap();
    assert!(db.get_system_wide_settings().unwrap().action_processing_mode);
}

#[test]
fn test_database_file_persists_between_handles() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("fantasy-critic.db");
    let user = test_user("Persistent");

    {
        let mut db = FantasyCriticDatabase::new(&path).unwrap();
        db.save_user(&user).unwrap();
        db.save_master_game(&test_game("Saved Game")).unwrap();
    }

    let db = FantasyCriticDatabase::new(&path).unwrap();
    assert_eq!(db.get_user(user.id).unwrap(), Some(user));
    assert_eq!(db.get_master_games().unwrap().len(), 1);
}

#[test]
fn test_master_game_edit_replaces_cached_copy() {
    let mut db = create_test_db();
    let mut game = test_game("Cached");
    db.save_master_game(&game).unwrap();
    assert_eq!(
        db.get_master_game(game.id).unwrap().unwrap().critic_score,
        None
    );

    game.critic_score = Some(88.0);
    db.save_master_game(&game).unwrap();

    let reloaded = db.get_master_game(game.id).unwrap().unwrap();
    assert_eq!(reloaded.critic_score, Some(88.0));
}

#[test]
fn test_master_game_years_follow_release_window() {
    let mut db = create_test_db();
    let game = test_game("Windowed");
    db.save_master_game(&game).unwrap();

    let in_year = db.get_master_game_years(Year::new(2026)).unwrap();
    assert_eq!(in_year.len(), 1);
    assert_eq!(in_year[0].id(), game.id);
    assert!(db.get_master_game_years(Year::new(2027)).unwrap().is_empty());
}
