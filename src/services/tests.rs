//! Service tests against an in-memory database

use super::*;
use crate::cli::types::ids::{MasterGameId, PublisherGameId, PublisherId, UserId};
use crate::cli::types::time::{LeagueYearKey, YearQuarter};
use crate::core::FixedClock;
use crate::domain::master_game::tag_names;
use crate::domain::{LeagueOptions, PlayStatus, SupportedYear, TradeStatus};
use crate::error::FantasyCriticError;
use crate::fixtures::{self, date, now, YEAR};
use crate::opencritic::OpenCriticGame;
use crate::storage::{FantasyCriticDatabase, FantasyCriticRepo, MasterGameRepo};
use chrono::{Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::str::FromStr;

struct TestLeague {
    key: LeagueYearKey,
    manager: UserId,
    player: UserId,
    manager_publisher: PublisherId,
    player_publisher: PublisherId,
}

impl TestLeague {
    fn owner_of(&self, publisher: PublisherId) -> UserId {
        if publisher == self.manager_publisher {
            self.manager
        } else {
            self.player
        }
    }
}

fn setup() -> (FantasyCriticDatabase, FixedClock) {
    let mut db = FantasyCriticDatabase::new_in_memory().unwrap();
    db.save_supported_year(&SupportedYear::open(YEAR)).unwrap();
    (db, FixedClock::new(now()))
}

fn add_user(db: &mut FantasyCriticDatabase, clock: &FixedClock, name: &str) -> UserId {
    InterLeagueService::new(db, clock).add_user(name).unwrap().id
}

fn add_game(db: &mut FantasyCriticDatabase, name: &str) -> MasterGameId {
    let game = fixtures::master_game(name, None);
    db.save_master_game(&game).unwrap();
    game.id
}

/// One drafted standard game each and no counter picks.
fn small_options() -> LeagueOptions {
    LeagueOptions {
        standard_games: 3,
        games_to_draft: 1,
        counter_picks: 1,
        counter_picks_to_draft: 0,
        ..LeagueOptions::default()
    }
}

fn create_league(db: &mut FantasyCriticDatabase, clock: &FixedClock) -> TestLeague {
    let manager = add_user(db, clock, "Manager");
    let player = add_user(db, clock, "Player");
    let league_year = LeagueService::new(db, clock)
        .create_league(manager, "Critics", YEAR, small_options(), false)
        .unwrap();
    let key = league_year.key();

    let mut members = LeagueMemberService::new(db);
    members.add_user_to_league(key.league_id, player).unwrap();
    members.set_player_active(manager, key, player, true).unwrap();

    let mut publishers = PublisherService::new(db, clock);
    let manager_publisher = publishers
        .create_publisher(manager, key, "Manager Games")
        .unwrap()
        .id;
    let player_publisher = publishers
        .create_publisher(player, key, "Player Games")
        .unwrap()
        .id;
    TestLeague {
        key,
        manager,
        player,
        manager_publisher,
        player_publisher,
    }
}

/// Start the draft and let whoever is up take each game in turn.
fn run_draft(
    db: &mut FantasyCriticDatabase,
    clock: &FixedClock,
    league: &TestLeague,
    games: &[MasterGameId],
) {
    let mut draft = DraftService::new(db, clock);
    draft.start_draft(league.manager, league.key).unwrap();
    for game in games {
        let next = draft.next_publisher(league.key).unwrap().unwrap();
        let result = draft
            .draft_game(league.owner_of(next), league.key, *game, false)
            .unwrap();
        assert!(result.success(), "{:?}", result.messages());
    }
}

fn drafted_league(
    db: &mut FantasyCriticDatabase,
    clock: &FixedClock,
) -> (TestLeague, MasterGameId, MasterGameId) {
    let league = create_league(db, clock);
    let alpha = add_game(db, "Alpha");
    let beta = add_game(db, "Beta");
    run_draft(db, clock, &league, &[alpha, beta]);
    (league, alpha, beta)
}

fn only_game(
    db: &FantasyCriticDatabase,
    key: LeagueYearKey,
    publisher: PublisherId,
) -> PublisherGameId {
    let league_year = db.get_league_year(key).unwrap().unwrap();
    league_year.publisher_by_id(publisher).unwrap().games[0].id
}

fn validation_message(error: FantasyCriticError) -> String {
    match error {
        FantasyCriticError::Validation(message) => message,
        other => panic!("expected a validation error, got {:?}", other),
    }
}

mod league_tests {
    use super::*;

    #[test]
    fn test_create_league_requires_known_user() {
        let (mut db, clock) = setup();
        let err = LeagueService::new(&mut db, &clock)
            .create_league(
                UserId::new_v4(),
                "Nobody's League",
                YEAR,
                LeagueOptions::default(),
                false,
            )
            .unwrap_err();
        assert!(matches!(err, FantasyCriticError::NotFound { .. }));
    }

    #[test]
    fn test_create_league_rejects_blank_name() {
        let (mut db, clock) = setup();
        let manager = add_user(&mut db, &clock, "Manager");
        let err = LeagueService::new(&mut db, &clock)
            .create_league(manager, "   ", YEAR, LeagueOptions::default(), false)
            .unwrap_err();
        assert_eq!(
            validation_message(err),
            "You cannot have a blank league name."
        );
    }

    #[test]
    fn test_read_only_mode_blocks_league_changes() {
        let (mut db, clock) = setup();
        let manager = add_user(&mut db, &clock, "Manager");
        db.set_action_processing_mode(true).unwrap();
        let err = LeagueService::new(&mut db, &clock)
            .create_league(manager, "Blocked", YEAR, LeagueOptions::default(), false)
            .unwrap_err();
        assert!(matches!(err, FantasyCriticError::ReadOnly));
    }

    #[test]
    fn test_test_league_cannot_be_unmarked() {
        let (mut db, clock) = setup();
        let manager = add_user(&mut db, &clock, "Manager");
        let mut service = LeagueService::new(&mut db, &clock);
        let league_year = service
            .create_league(manager, "Sandbox", YEAR, LeagueOptions::default(), true)
            .unwrap();
        let league = service
            .change_league_options(manager, league_year.league.id, "Renamed", true, false)
            .unwrap();
        assert_eq!(league.name, "Renamed");
        assert!(league.public_league);
        assert!(league.test_league);
    }

    #[test]
    fn test_only_manager_edits_options() {
        let (mut db, clock) = setup();
        let league = create_league(&mut db, &clock);
        let err = LeagueService::new(&mut db, &clock)
            .edit_league_year_options(league.player, league.key, LeagueOptions::default())
            .unwrap_err();
        assert!(matches!(err, FantasyCriticError::Forbidden(_)));
    }

    #[test]
    fn test_tag_override_matching_game_tags_is_removed() {
        let (mut db, clock) = setup();
        let league = create_league(&mut db, &clock);
        let game = add_game(&mut db, "Untagged");
        let mut service = LeagueService::new(&mut db, &clock);

        let league_year = service
            .set_tag_override(
                league.manager,
                league.key,
                game,
                vec![tag_names::PORT.to_string()],
            )
            .unwrap();
        assert_eq!(league_year.tag_overrides.len(), 1);

        let league_year = service
            .set_tag_override(league.manager, league.key, game, Vec::new())
            .unwrap();
        assert!(league_year.tag_overrides.is_empty());
        assert!(service.league_year(league.key).unwrap().tag_overrides.is_empty());
    }

    #[test]
    fn test_unknown_tag_override_rejected() {
        let (mut db, clock) = setup();
        let league = create_league(&mut db, &clock);
        let game = add_game(&mut db, "Untagged");
        let err = LeagueService::new(&mut db, &clock)
            .set_tag_override(
                league.manager,
                league.key,
                game,
                vec!["NotATag".to_string()],
            )
            .unwrap_err();
        assert_eq!(validation_message(err), "Unknown tag: NotATag");
    }

    #[test]
    fn test_eligibility_override_cannot_repeat() {
        let (mut db, clock) = setup();
        let league = create_league(&mut db, &clock);
        let game = add_game(&mut db, "Contested");
        let mut service = LeagueService::new(&mut db, &clock);
        service
            .set_eligibility_override(league.manager, league.key, game, Some(false))
            .unwrap();
        let err = service
            .set_eligibility_override(league.manager, league.key, game, Some(false))
            .unwrap_err();
        assert_eq!(
            validation_message(err),
            "That game already has that override setting."
        );
    }

    #[test]
    fn test_manual_score_sets_points() {
        let (mut db, clock) = setup();
        let (league, _, _) = drafted_league(&mut db, &clock);
        let game = only_game(&db, league.key, league.player_publisher);
        let mut service = LeagueService::new(&mut db, &clock);

        let league_year = service
            .manually_score_game(league.manager, league.key, game, Some(85.0))
            .unwrap();
        let scored = league_year
            .publisher_by_id(league.player_publisher)
            .unwrap()
            .game_by_id(game)
            .unwrap();
        assert_eq!(scored.manual_critic_score, Some(85.0));
        assert_eq!(scored.fantasy_points, Some(15.0));

        let league_year = service
            .manually_score_game(league.manager, league.key, game, None)
            .unwrap();
        let unscored = league_year
            .publisher_by_id(league.player_publisher)
            .unwrap()
            .game_by_id(game)
            .unwrap();
        assert_eq!(unscored.manual_critic_score, None);
        assert_eq!(unscored.fantasy_points, None);

        let stored = service.league_year(league.key).unwrap();
        let stored = stored.publisher_by_id(league.player_publisher).unwrap();
        assert_eq!(stored.game_by_id(game).unwrap().manual_critic_score, None);
    }

    #[test]
    fn test_manual_score_validated() {
        let (mut db, clock) = setup();
        let (league, _, _) = drafted_league(&mut db, &clock);
        let game = only_game(&db, league.key, league.player_publisher);
        let mut service = LeagueService::new(&mut db, &clock);

        let err = service
            .manually_score_game(league.manager, league.key, game, Some(101.0))
            .unwrap_err();
        assert_eq!(
            validation_message(err),
            "A manual critic score must be between 0 and 100."
        );

        let err = service
            .manually_score_game(league.player, league.key, game, Some(80.0))
            .unwrap_err();
        assert!(matches!(err, FantasyCriticError::Forbidden(_)));
    }

    #[test]
    fn test_manual_will_not_release() {
        let (mut db, clock) = setup();
        let (league, _, _) = drafted_league(&mut db, &clock);
        let game = only_game(&db, league.key, league.manager_publisher);
        let league_year = LeagueService::new(&mut db, &clock)
            .manually_set_will_not_release(league.manager, league.key, game, true)
            .unwrap();

        let flagged = league_year
            .publisher_by_id(league.manager_publisher)
            .unwrap()
            .game_by_id(game)
            .unwrap();
        assert!(flagged.manual_will_not_release);
        assert!(!flagged.will_release());
        assert_eq!(flagged.fantasy_points, Some(0.0));

        let actions = db.get_league_actions(league.key).unwrap();
        assert!(actions
            .iter()
            .any(|a| a.description.ends_with("was manually set as 'Will not Release'.")));
    }

    #[test]
    fn test_manager_messages() {
        let (mut db, clock) = setup();
        let league = create_league(&mut db, &clock);
        let mut service = LeagueService::new(&mut db, &clock);

        let message = service
            .post_message(league.manager, league.key, "  Draft is Sunday  ", true)
            .unwrap();
        assert_eq!(message.text, "Draft is Sunday");
        assert_eq!(
            service.manager_messages(league.key).unwrap(),
            vec![message.clone()]
        );

        let err = service
            .post_message(league.manager, league.key, "   ", true)
            .unwrap_err();
        assert_eq!(validation_message(err), "You cannot post a blank message.");
        let err = service
            .post_message(league.player, league.key, "Not the manager", true)
            .unwrap_err();
        assert!(matches!(err, FantasyCriticError::Forbidden(_)));

        service.delete_message(league.manager, league.key, message.id).unwrap();
        assert!(service.manager_messages(league.key).unwrap().is_empty());
        assert!(service.delete_message(league.manager, league.key, message.id).is_err());
    }
}

mod member_tests {
    use super::*;

    #[test]
    fn test_add_member_twice_rejected() {
        let (mut db, clock) = setup();
        let league = create_league(&mut db, &clock);
        let err = LeagueMemberService::new(&mut db)
            .add_user_to_league(league.key.league_id, league.player)
            .unwrap_err();
        assert_eq!(validation_message(err), "User is already in that league.");
    }

    #[test]
    fn test_remove_player_before_draft_deletes_publisher() {
        let (mut db, clock) = setup();
        let league = create_league(&mut db, &clock);
        LeagueMemberService::new(&mut db)
            .remove_player(league.manager, league.key.league_id, league.player)
            .unwrap();

        let league_year = db.get_league_year(league.key).unwrap().unwrap();
        assert!(league_year.publisher_by_id(league.player_publisher).is_none());
        assert!(!db.get_league_members(league.key.league_id).unwrap().contains(&league.player));
    }

    #[test]
    fn test_player_with_publisher_stays_active() {
        let (mut db, clock) = setup();
        let league = create_league(&mut db, &clock);
        let err = LeagueMemberService::new(&mut db)
            .set_player_active(league.manager, league.key, league.player, false)
            .unwrap_err();
        assert!(validation_message(err).contains("remove a player's publisher"));
    }

    #[test]
    fn test_transfer_manager() {
        let (mut db, clock) = setup();
        let league = create_league(&mut db, &clock);
        let outsider = add_user(&mut db, &clock, "Outsider");
        let mut members = LeagueMemberService::new(&mut db);

        let err = members
            .transfer_manager(league.manager, league.key.league_id, outsider)
            .unwrap_err();
        assert_eq!(
            validation_message(err),
            "The new manager must be a member of the league."
        );

        members
            .transfer_manager(league.manager, league.key.league_id, league.player)
            .unwrap();
        let err = members
            .transfer_manager(league.manager, league.key.league_id, league.manager)
            .unwrap_err();
        assert!(matches!(err, FantasyCriticError::Forbidden(_)));

        let stored = db.get_league(league.key.league_id).unwrap().unwrap();
        assert_eq!(stored.manager, league.player);
    }
}

mod publisher_tests {
    use super::*;

    #[test]
    fn test_second_publisher_rejected() {
        let (mut db, clock) = setup();
        let league = create_league(&mut db, &clock);
        let err = PublisherService::new(&mut db, &clock)
            .create_publisher(league.player, league.key, "Another")
            .unwrap_err();
        assert_eq!(
            validation_message(err),
            "You already have a publisher for this league year."
        );
    }

    #[test]
    fn test_edit_publisher_rejects_negative_drop_counter() {
        let (mut db, clock) = setup();
        let league = create_league(&mut db, &clock);
        let request = EditPublisherRequest {
            will_release_games_dropped: Some(-1),
            ..EditPublisherRequest::default()
        };
        let err = PublisherService::new(&mut db, &clock)
            .edit_publisher(
                league.manager,
                league.key,
                league.player_publisher,
                &request,
            )
            .unwrap_err();
        assert_eq!(
            validation_message(err),
            "Will release games dropped cannot be set to less than zero."
        );
    }

    #[test]
    fn test_edit_publisher_updates_budget() {
        let (mut db, clock) = setup();
        let league = create_league(&mut db, &clock);
        let request = EditPublisherRequest {
            budget: Some(55),
            ..EditPublisherRequest::default()
        };
        let publisher = PublisherService::new(&mut db, &clock)
            .edit_publisher(
                league.manager,
                league.key,
                league.player_publisher,
                &request,
            )
            .unwrap();
        assert_eq!(publisher.budget, 55);
        let league_year = db.get_league_year(league.key).unwrap().unwrap();
        assert_eq!(
            league_year.publisher_by_id(league.player_publisher).unwrap().budget,
            55
        );
    }

    #[test]
    fn test_rename_requires_ownership() {
        let (mut db, clock) = setup();
        let league = create_league(&mut db, &clock);
        let err = PublisherService::new(&mut db, &clock)
            .change_publisher_name(
                league.player,
                league.key,
                league.manager_publisher,
                "Stolen",
            )
            .unwrap_err();
        assert!(matches!(err, FantasyCriticError::Forbidden(_)));
    }

    #[test]
    fn test_fully_remove_publisher_before_draft() {
        let (mut db, clock) = setup();
        let league = create_league(&mut db, &clock);
        let mut publishers = PublisherService::new(&mut db, &clock);

        let err = publishers
            .fully_remove_publisher(league.player, league.key, league.manager_publisher)
            .unwrap_err();
        assert!(matches!(err, FantasyCriticError::Forbidden(_)));

        publishers
            .fully_remove_publisher(league.manager, league.key, league.player_publisher)
            .unwrap();
        let league_year = db.get_league_year(league.key).unwrap().unwrap();
        assert_eq!(league_year.publishers.len(), 1);
        assert!(league_year.publisher_by_id(league.player_publisher).is_none());
    }

    #[test]
    fn test_fully_remove_publisher_after_draft_rejected() {
        let (mut db, clock) = setup();
        let (league, _, _) = drafted_league(&mut db, &clock);
        let err = PublisherService::new(&mut db, &clock)
            .fully_remove_publisher(league.manager, league.key, league.player_publisher)
            .unwrap_err();
        assert_eq!(
            validation_message(err),
            "You can't remove a publisher from a year that has already started."
        );
    }

    #[test]
    fn test_queue_ranking_and_removal() {
        let (mut db, clock) = setup();
        let league = create_league(&mut db, &clock);
        let alpha = add_game(&mut db, "Alpha");
        let beta = add_game(&mut db, "Beta");
        let (user, publisher) = (league.player, league.player_publisher);
        let mut service = PublisherService::new(&mut db, &clock);

        service.queue_game(user, league.key, publisher, alpha).unwrap();
        let queue = service.queue_game(user, league.key, publisher, beta).unwrap();
        assert_eq!(queue.iter().map(|q| q.rank).collect::<Vec<_>>(), vec![1, 2]);

        let err = service.queue_game(user, league.key, publisher, alpha).unwrap_err();
        assert_eq!(
            validation_message(err),
            "You already have that game queued."
        );

        let ranked = service
            .set_queue_rankings(user, league.key, publisher, &[beta, alpha])
            .unwrap();
        assert_eq!(ranked[0].master_game.id(), beta);
        assert_eq!(ranked[0].rank, 1);
        let stored = service.queued_games(league.key, publisher).unwrap();
        assert_eq!(stored[0].master_game.id(), beta);
        assert_eq!(stored[1].master_game.id(), alpha);

        let err = service
            .set_queue_rankings(user, league.key, publisher, &[beta])
            .unwrap_err();
        assert_eq!(
            validation_message(err),
            "Queue rankings must include every queued game exactly once."
        );

        let remaining = service
            .remove_queued_game(user, league.key, publisher, beta)
            .unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].master_game.id(), alpha);
        assert_eq!(remaining[0].rank, 1);
    }

    #[test]
    fn test_queue_changes_blocked_while_read_only() {
        let (mut db, clock) = setup();
        let league = create_league(&mut db, &clock);
        let alpha = add_game(&mut db, "Alpha");
        db.set_action_processing_mode(true).unwrap();

        let mut service = PublisherService::new(&mut db, &clock);
        let err = service
            .queue_game(league.player, league.key, league.player_publisher, alpha)
            .unwrap_err();
        assert!(matches!(err, FantasyCriticError::ReadOnly));
        let err = service
            .set_queue_rankings(league.player, league.key, league.player_publisher, &[])
            .unwrap_err();
        assert!(matches!(err, FantasyCriticError::ReadOnly));
        let err = service
            .remove_queued_game(league.player, league.key, league.player_publisher, alpha)
            .unwrap_err();
        assert!(matches!(err, FantasyCriticError::ReadOnly));
    }

    #[test]
    fn test_reorder_publisher_games() {
        let (mut db, clock) = setup();
        let (league, _, _) = drafted_league(&mut db, &clock);
        let game = only_game(&db, league.key, league.player_publisher);
        let mut service = PublisherService::new(&mut db, &clock);

        let bad: BTreeMap<usize, Option<PublisherGameId>> = BTreeMap::from([(5, Some(game))]);
        let err = service
            .reorder_publisher_games(league.player, league.key, league.player_publisher, &bad)
            .unwrap_err();
        assert_eq!(
            validation_message(err),
            "Some of the positions are not valid."
        );

        let moves: BTreeMap<usize, Option<PublisherGameId>> =
            BTreeMap::from([(0, None), (2, Some(game))]);
        let publisher = service
            .reorder_publisher_games(league.player, league.key, league.player_publisher, &moves)
            .unwrap();
        assert_eq!(publisher.game_by_id(game).unwrap().slot_number, 2);

        let league_year = db.get_league_year(league.key).unwrap().unwrap();
        let stored = league_year.publisher_by_id(league.player_publisher).unwrap();
        assert_eq!(stored.game_by_id(game).unwrap().slot_number, 2);
    }
}

mod draft_tests {
    use super::*;

    #[test]
    fn test_full_draft_finishes() {
        let (mut db, clock) = setup();
        let (league, _, _) = drafted_league(&mut db, &clock);

        let league_year = db.get_league_year(league.key).unwrap().unwrap();
        assert_eq!(league_year.play_status, PlayStatus::DraftFinal);
        for publisher in &league_year.publishers {
            assert_eq!(publisher.games.len(), 1);
            assert!(publisher.games[0].overall_draft_position.is_some());
        }
        let actions = db.get_league_actions(league.key).unwrap();
        assert_eq!(actions.len(), 2);
    }

    #[test]
    fn test_draft_out_of_turn_rejected() {
        let (mut db, clock) = setup();
        let league = create_league(&mut db, &clock);
        let game = add_game(&mut db, "Alpha");
        let mut draft = DraftService::new(&mut db, &clock);
        draft.start_draft(league.manager, league.key).unwrap();

        let next = draft.next_publisher(league.key).unwrap().unwrap();
        let waiting = if next == league.manager_publisher {
            league.player
        } else {
            league.manager
        };
        let err = draft.draft_game(waiting, league.key, game, false).unwrap_err();
        assert_eq!(
            validation_message(err),
            "It is not that publisher's turn to draft."
        );
    }

    #[test]
    fn test_start_draft_twice_rejected() {
        let (mut db, clock) = setup();
        let league = create_league(&mut db, &clock);
        let mut draft = DraftService::new(&mut db, &clock);
        draft.start_draft(league.manager, league.key).unwrap();
        let err = draft.start_draft(league.manager, league.key).unwrap_err();
        assert_eq!(validation_message(err), "The draft has already started.");
    }

    #[test]
    fn test_pause_and_resume() {
        let (mut db, clock) = setup();
        let league = create_league(&mut db, &clock);
        let mut draft = DraftService::new(&mut db, &clock);
        draft.start_draft(league.manager, league.key).unwrap();
        let paused = draft.pause_draft(league.manager, league.key).unwrap();
        assert_eq!(paused.play_status, PlayStatus::DraftPaused);
        let resumed = draft.resume_draft(league.manager, league.key).unwrap();
        assert_eq!(resumed.play_status, PlayStatus::Drafting);
    }

    #[test]
    fn test_publisher_cannot_join_after_draft_starts() {
        let (mut db, clock) = setup();
        let league = create_league(&mut db, &clock);
        let latecomer = add_user(&mut db, &clock, "Latecomer");
        LeagueMemberService::new(&mut db)
            .add_user_to_league(league.key.league_id, latecomer)
            .unwrap();
        DraftService::new(&mut db, &clock)
            .start_draft(league.manager, league.key)
            .unwrap();
        let err = PublisherService::new(&mut db, &clock)
            .create_publisher(latecomer, league.key, "Too Late")
            .unwrap_err();
        assert_eq!(
            validation_message(err),
            "You cannot create a publisher after the draft has started."
        );
    }

    #[test]
    fn test_set_draft_order() {
        let (mut db, clock) = setup();
        let league = create_league(&mut db, &clock);
        let mut draft = DraftService::new(&mut db, &clock);

        let err = draft
            .set_draft_order(league.manager, league.key, &[league.player_publisher])
            .unwrap_err();
        assert_eq!(
            validation_message(err),
            "Draft order must contain every publisher exactly once."
        );

        let order = [league.player_publisher, league.manager_publisher];
        let league_year = draft.set_draft_order(league.manager, league.key, &order).unwrap();
        assert_eq!(
            league_year.publisher_by_id(league.player_publisher).unwrap().draft_position,
            1
        );

        draft.start_draft(league.manager, league.key).unwrap();
        assert_eq!(
            draft.next_publisher(league.key).unwrap(),
            Some(league.player_publisher)
        );
        let err = draft
            .set_draft_order(league.manager, league.key, &order)
            .unwrap_err();
        assert_eq!(
            validation_message(err),
            "You can't change the draft order after the draft has started."
        );
    }

    #[test]
    fn test_undo_requires_pause() {
        let (mut db, clock) = setup();
        let league = create_league(&mut db, &clock);
        let game = add_game(&mut db, "Alpha");
        let mut draft = DraftService::new(&mut db, &clock);
        draft.start_draft(league.manager, league.key).unwrap();
        let first = draft.next_publisher(league.key).unwrap().unwrap();
        draft
            .draft_game(league.owner_of(first), league.key, game, false)
            .unwrap();

        let err = draft
            .undo_last_draft_action(league.manager, league.key)
            .unwrap_err();
        assert_eq!(
            validation_message(err),
            "You can only undo a draft pick while the draft is paused."
        );

        draft.pause_draft(league.manager, league.key).unwrap();
        let league_year = draft
            .undo_last_draft_action(league.manager, league.key)
            .unwrap();
        assert!(league_year.publisher_by_id(first).unwrap().games.is_empty());
        assert_eq!(draft.next_publisher(league.key).unwrap(), Some(first));

        let err = draft
            .undo_last_draft_action(league.manager, league.key)
            .unwrap_err();
        assert_eq!(validation_message(err), "There are no draft picks to undo.");

        let actions = db.get_league_actions(league.key).unwrap();
        assert!(actions.iter().any(|a| a.description == "'Alpha' was undrafted."));
    }

    #[test]
    fn test_reset_draft() {
        let (mut db, clock) = setup();
        let league = create_league(&mut db, &clock);
        let game = add_game(&mut db, "Alpha");
        let mut draft = DraftService::new(&mut db, &clock);

        let err = draft.reset_draft(league.manager, league.key).unwrap_err();
        assert_eq!(
            validation_message(err),
            "You can only reset a draft that is in progress."
        );

        draft.start_draft(league.manager, league.key).unwrap();
        let first = draft.next_publisher(league.key).unwrap().unwrap();
        draft
            .draft_game(league.owner_of(first), league.key, game, false)
            .unwrap();
        let league_year = draft.reset_draft(league.manager, league.key).unwrap();
        assert_eq!(league_year.play_status, PlayStatus::NotStartedDraft);
        assert!(league_year.draft_started_timestamp.is_none());

        let stored = db.get_league_year(league.key).unwrap().unwrap();
        assert_eq!(stored.play_status, PlayStatus::NotStartedDraft);
        assert!(stored.publishers.iter().all(|p| p.games.is_empty()));
    }

    #[test]
    fn test_manager_draft_with_override() {
        let (mut db, clock) = setup();
        let league = create_league(&mut db, &clock);
        let mut draft = DraftService::new(&mut db, &clock);
        draft.start_draft(league.manager, league.key).unwrap();
        let next = draft.next_publisher(league.key).unwrap().unwrap();

        let refused = draft
            .manager_draft_game(
                league.manager,
                league.key,
                next,
                None,
                "Secret Project",
                false,
                false,
            )
            .unwrap();
        assert!(!refused.success());
        assert!(refused
            .messages()
            .contains(&"You must pick a game from the master list.".to_string()));

        let err = draft
            .manager_draft_game(
                league.player,
                league.key,
                next,
                None,
                "Secret Project",
                false,
                true,
            )
            .unwrap_err();
        assert!(matches!(err, FantasyCriticError::Forbidden(_)));

        let forced = draft
            .manager_draft_game(
                league.manager,
                league.key,
                next,
                None,
                "Secret Project",
                false,
                true,
            )
            .unwrap();
        assert!(forced.success());
        let league_year = db.get_league_year(league.key).unwrap().unwrap();
        let publisher = league_year.publisher_by_id(next).unwrap();
        assert_eq!(publisher.games.len(), 1);
        assert_eq!(publisher.games[0].name(), "Secret Project");
        assert!(publisher.games[0].master_game.is_none());
    }

    #[test]
    fn test_auto_draft_takes_queued_game() {
        let (mut db, clock) = setup();
        let league = create_league(&mut db, &clock);
        let alpha = add_game(&mut db, "Alpha");
        let beta = add_game(&mut db, "Beta");
        DraftService::new(&mut db, &clock)
            .start_draft(league.manager, league.key)
            .unwrap();

        let mut publishers = PublisherService::new(&mut db, &clock);
        publishers
            .queue_game(league.manager, league.key, league.manager_publisher, beta)
            .unwrap();
        publishers
            .set_auto_draft(league.manager, league.key, league.manager_publisher, true)
            .unwrap();

        let mut draft = DraftService::new(&mut db, &clock);
        let league_year = draft.run_auto_draft_and_check_complete(league.key).unwrap();
        let manager = league_year.publisher_by_id(league.manager_publisher).unwrap();
        assert_eq!(manager.games.len(), 1);
        assert_eq!(manager.games[0].master_game_id(), Some(beta));
        assert_eq!(league_year.play_status, PlayStatus::Drafting);
        assert_eq!(
            draft.next_publisher(league.key).unwrap(),
            Some(league.player_publisher)
        );

        draft.draft_game(league.player, league.key, alpha, false).unwrap();
        let finished = draft.run_auto_draft_and_check_complete(league.key).unwrap();
        assert_eq!(finished.play_status, PlayStatus::DraftFinal);
    }
}

mod acquisition_tests {
    use super::*;
    use crate::services::acquisition::{BidRequest, ManagerClaim};

    fn bid(publisher_id: PublisherId, master_game_id: MasterGameId, bid_amount: u32) -> BidRequest {
        BidRequest {
            publisher_id,
            master_game_id,
            bid_amount,
            counter_pick: false,
            conditional_drop: None,
            allow_ineligible_slot: false,
        }
    }

    #[test]
    fn test_bids_wait_for_the_draft() {
        let (mut db, clock) = setup();
        let league = create_league(&mut db, &clock);
        let game = add_game(&mut db, "Gamma");
        let err = GameAcquisitionService::new(&mut db, &clock)
            .make_pickup_bid(
                league.player,
                league.key,
                &bid(league.player_publisher, game, 5),
            )
            .unwrap_err();
        assert_eq!(
            validation_message(err),
            "You can't acquire games until the draft is complete."
        );
    }

    #[test]
    fn test_bid_over_budget_fails() {
        let (mut db, clock) = setup();
        let (league, _, _) = drafted_league(&mut db, &clock);
        let game = add_game(&mut db, "Gamma");
        let result = GameAcquisitionService::new(&mut db, &clock)
            .make_pickup_bid(
                league.player,
                league.key,
                &bid(league.player_publisher, game, 500),
            )
            .unwrap();
        assert!(!result.success());
        assert!(result
            .messages()
            .contains(&"You do not have enough budget to make that bid.".to_string()));
    }

    #[test]
    fn test_processing_awards_bid_and_resets_mode() {
        let (mut db, clock) = setup();
        let (league, _, _) = drafted_league(&mut db, &clock);
        let game = add_game(&mut db, "Gamma");
        let result = GameAcquisitionService::new(&mut db, &clock)
            .make_pickup_bid(
                league.player,
                league.key,
                &bid(league.player_publisher, game, 10),
            )
            .unwrap();
        assert!(result.success(), "{:?}", result.messages());

        let summary = ActionProcessingService::new(&mut db, &clock)
            .process_actions(YEAR)
            .unwrap();
        assert_eq!(summary.success_bids, 1);
        assert_eq!(summary.failed_bids, 0);
        assert!(!db.get_system_wide_settings().unwrap().action_processing_mode);

        let league_year = db.get_league_year(league.key).unwrap().unwrap();
        let publisher = league_year.publisher_by_id(league.player_publisher).unwrap();
        assert_eq!(publisher.budget, 90);
        assert!(publisher.game_by_master_game_id(game).is_some());
        assert!(db.get_active_pickup_bids(league.key).unwrap().is_empty());
    }

    #[test]
    fn test_processing_refuses_when_already_running() {
        let (mut db, clock) = setup();
        db.set_action_processing_mode(true).unwrap();
        let err = ActionProcessingService::new(&mut db, &clock)
            .process_actions(YEAR)
            .unwrap_err();
        assert_eq!(
            validation_message(err),
            "Action processing is already running."
        );
    }

    #[test]
    fn test_drop_request_listed_for_publisher() {
        let (mut db, clock) = setup();
        let (league, _, _) = drafted_league(&mut db, &clock);
        let game = only_game(&db, league.key, league.player_publisher);
        let mut service = GameAcquisitionService::new(&mut db, &clock);
        service
            .make_drop_request(league.player, league.key, league.player_publisher, game)
            .unwrap();
        let drops = service.current_drops(league.key, league.player_publisher).unwrap();
        assert_eq!(drops.len(), 1);
    }

    #[test]
    fn test_manager_claim() {
        let (mut db, clock) = setup();
        let (league, _, _) = drafted_league(&mut db, &clock);
        let gamma = add_game(&mut db, "Gamma");
        let claim = ManagerClaim {
            publisher_id: league.player_publisher,
            master_game_id: Some(gamma),
            game_name: String::new(),
            counter_pick: false,
            manager_override: false,
        };
        let mut service = GameAcquisitionService::new(&mut db, &clock);

        let err = service.claim_game(league.player, league.key, &claim).unwrap_err();
        assert!(matches!(err, FantasyCriticError::Forbidden(_)));

        let result = service.claim_game(league.manager, league.key, &claim).unwrap();
        assert!(result.success(), "{:?}", result.messages());
        let again = service.claim_game(league.manager, league.key, &claim).unwrap();
        assert!(!again.success());

        let league_year = db.get_league_year(league.key).unwrap().unwrap();
        let publisher = league_year.publisher_by_id(league.player_publisher).unwrap();
        assert!(publisher.game_by_master_game_id(gamma).is_some());
        let actions = db.get_league_actions(league.key).unwrap();
        assert!(actions.iter().any(|a| a.description == "Claimed game: 'Gamma'"));
    }

    #[test]
    fn test_associate_free_text_game() {
        let (mut db, clock) = setup();
        let (league, _, _) = drafted_league(&mut db, &clock);
        let gamma = add_game(&mut db, "Gamma");
        let claim = ManagerClaim {
            publisher_id: league.player_publisher,
            master_game_id: None,
            game_name: "Untitled Sequel".to_string(),
            counter_pick: false,
            manager_override: true,
        };
        let mut service = GameAcquisitionService::new(&mut db, &clock);
        let result = service.claim_game(league.manager, league.key, &claim).unwrap();
        assert!(result.success(), "{:?}", result.messages());

        let league_year = db.get_league_year(league.key).unwrap().unwrap();
        let free_text = league_year
            .publisher_by_id(league.player_publisher)
            .unwrap()
            .games
            .iter()
            .find(|g| g.master_game.is_none())
            .unwrap()
            .id;

        let mut service = GameAcquisitionService::new(&mut db, &clock);
        let result = service
            .associate_game(league.manager, league.key, free_text, gamma, false)
            .unwrap();
        assert!(result.success(), "{:?}", result.messages());
        let err = service
            .associate_game(league.manager, league.key, free_text, gamma, false)
            .unwrap_err();
        assert_eq!(
            validation_message(err),
            "That game is already associated with a master game."
        );

        let league_year = db.get_league_year(league.key).unwrap().unwrap();
        let publisher = league_year.publisher_by_id(league.player_publisher).unwrap();
        assert_eq!(
            publisher.game_by_id(free_text).unwrap().master_game_id(),
            Some(gamma)
        );
    }

    #[test]
    fn test_edit_pickup_bid() {
        let (mut db, clock) = setup();
        let (league, _, _) = drafted_league(&mut db, &clock);
        let gamma = add_game(&mut db, "Gamma");
        let mut service = GameAcquisitionService::new(&mut db, &clock);
        service
            .make_pickup_bid(
                league.player,
                league.key,
                &bid(league.player_publisher, gamma, 5),
            )
            .unwrap();
        let placed = service.current_bids(league.key, league.player_publisher).unwrap()[0].id;

        let edited = service
            .edit_pickup_bid(league.player, league.key, placed, 20, None)
            .unwrap();
        assert_eq!(edited.bid_amount, 20);
        let err = service
            .edit_pickup_bid(league.player, league.key, placed, 150, None)
            .unwrap_err();
        assert_eq!(
            validation_message(err),
            "You do not have enough budget to make that bid."
        );
        let err = service
            .edit_pickup_bid(league.manager, league.key, placed, 10, None)
            .unwrap_err();
        assert!(matches!(err, FantasyCriticError::Forbidden(_)));

        let stored = service.current_bids(league.key, league.player_publisher).unwrap();
        assert_eq!(stored[0].bid_amount, 20);
    }

    #[test]
    fn test_bid_priorities_stay_contiguous() {
        let (mut db, clock) = setup();
        let (league, _, _) = drafted_league(&mut db, &clock);
        let games = [
            add_game(&mut db, "Gamma"),
            add_game(&mut db, "Delta"),
            add_game(&mut db, "Epsilon"),
        ];
        let mut service = GameAcquisitionService::new(&mut db, &clock);
        for game in games {
            let result = service
                .make_pickup_bid(
                    league.player,
                    league.key,
                    &bid(league.player_publisher, game, 5),
                )
                .unwrap();
            assert!(result.success(), "{:?}", result.messages());
        }
        let bids = service.current_bids(league.key, league.player_publisher).unwrap();
        assert_eq!(
            bids.iter().map(|b| b.priority).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );

        service
            .remove_pickup_bid(league.player, league.key, bids[0].id)
            .unwrap();
        let remaining = service.current_bids(league.key, league.player_publisher).unwrap();
        assert_eq!(
            remaining.iter().map(|b| b.priority).collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert_eq!(remaining[0].id, bids[1].id);
        assert_eq!(remaining[1].id, bids[2].id);

        let reversed = [remaining[1].id, remaining[0].id];
        let reordered = PublisherService::new(&mut db, &clock)
            .set_bid_priority_order(
                league.player,
                league.key,
                league.player_publisher,
                &reversed,
            )
            .unwrap();
        assert_eq!(reordered[0].id, bids[2].id);
        assert_eq!(reordered[0].priority, 1);

        let err = PublisherService::new(&mut db, &clock)
            .set_bid_priority_order(
                league.player,
                league.key,
                league.player_publisher,
                &reversed[..1],
            )
            .unwrap_err();
        assert_eq!(
            validation_message(err),
            "Bid priority order must include every active bid exactly once."
        );
        let stored = GameAcquisitionService::new(&mut db, &clock)
            .current_bids(league.key, league.player_publisher)
            .unwrap();
        assert_eq!(stored[0].id, bids[2].id);
    }

    #[test]
    fn test_special_auction_validation() {
        let (mut db, clock) = setup();
        let (league, alpha, _) = drafted_league(&mut db, &clock);
        let gamma = add_game(&mut db, "Gamma");
        let tomorrow = now() + Duration::days(1);
        let mut service = GameAcquisitionService::new(&mut db, &clock);

        let err = service
            .create_special_auction(league.manager, league.key, gamma, now())
            .unwrap_err();
        assert_eq!(
            validation_message(err),
            "A special auction must end in the future."
        );
        let err = service
            .create_special_auction(league.manager, league.key, alpha, tomorrow)
            .unwrap_err();
        assert_eq!(
            validation_message(err),
            "That game is already on a publisher's roster."
        );
        let err = service
            .create_special_auction(league.player, league.key, gamma, tomorrow)
            .unwrap_err();
        assert!(matches!(err, FantasyCriticError::Forbidden(_)));

        service
            .create_special_auction(league.manager, league.key, gamma, tomorrow)
            .unwrap();
        let err = service
            .create_special_auction(league.manager, league.key, gamma, tomorrow)
            .unwrap_err();
        assert_eq!(
            validation_message(err),
            "There is already an active special auction for that game."
        );
    }

    /// A drafted league with a closed auction on "Gamma" and a $10 bid from the player.
    fn closed_auction(
        db: &mut FantasyCriticDatabase,
        clock: &FixedClock,
    ) -> (TestLeague, MasterGameId) {
        let (league, _, _) = drafted_league(db, clock);
        let gamma = add_game(db, "Gamma");
        let mut service = GameAcquisitionService::new(db, clock);
        service
            .create_special_auction(league.manager, league.key, gamma, now() + Duration::days(1))
            .unwrap();
        let result = service
            .make_pickup_bid(
                league.player,
                league.key,
                &bid(league.player_publisher, gamma, 10),
            )
            .unwrap();
        assert!(result.success(), "{:?}", result.messages());

        let summary = ActionProcessingService::new(db, clock)
            .process_actions(YEAR)
            .unwrap();
        assert_eq!(summary.success_bids, 0);

        clock.set(now() + Duration::days(2));
        (league, gamma)
    }

    #[test]
    fn test_special_auction_processed_after_end_time() {
        let (mut db, clock) = setup();
        let (league, gamma) = closed_auction(&mut db, &clock);

        let summary = ActionProcessingService::new(&mut db, &clock)
            .process_special_auctions(YEAR)
            .unwrap()
            .unwrap();
        assert_eq!(summary.success_bids, 1);
        assert!(!db.get_system_wide_settings().unwrap().action_processing_mode);

        let league_year = db.get_league_year(league.key).unwrap().unwrap();
        let publisher = league_year.publisher_by_id(league.player_publisher).unwrap();
        assert!(publisher.game_by_master_game_id(gamma).is_some());
        assert_eq!(publisher.budget, 90);

        let auctions = GameAcquisitionService::new(&mut db, &clock)
            .special_auctions(league.key)
            .unwrap();
        assert!(auctions[0].processed);
        assert!(ActionProcessingService::new(&mut db, &clock)
            .process_special_auctions(YEAR)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_special_auctions_wait_for_read_only_mode() {
        let (mut db, clock) = setup();
        let (league, gamma) = closed_auction(&mut db, &clock);
        db.set_action_processing_mode(true).unwrap();

        let err = ActionProcessingService::new(&mut db, &clock)
            .process_special_auctions(YEAR)
            .unwrap_err();
        assert_eq!(
            validation_message(err),
            "Action processing is already running."
        );

        let league_year = db.get_league_year(league.key).unwrap().unwrap();
        let publisher = league_year.publisher_by_id(league.player_publisher).unwrap();
        assert!(publisher.game_by_master_game_id(gamma).is_none());
        let auctions = GameAcquisitionService::new(&mut db, &clock)
            .special_auctions(league.key)
            .unwrap();
        assert!(!auctions[0].processed);
    }
}

mod trade_tests {
    use super::*;

    fn swap(db: &FantasyCriticDatabase, league: &TestLeague) -> TradeProposal {
        TradeProposal {
            proposer: league.manager_publisher,
            counter_party: league.player_publisher,
            proposer_games: vec![only_game(db, league.key, league.manager_publisher)],
            counter_party_games: vec![only_game(db, league.key, league.player_publisher)],
            proposer_budget_send: 0,
            counter_party_budget_send: 0,
            message: "Straight swap".to_string(),
        }
    }

    #[test]
    fn test_executed_trade_swaps_games() {
        let (mut db, clock) = setup();
        let (league, alpha, beta) = drafted_league(&mut db, &clock);
        let proposal = swap(&db, &league);
        let before = db.get_league_year(league.key).unwrap().unwrap();
        let manager_had = before
            .publisher_by_id(league.manager_publisher)
            .unwrap()
            .games[0]
            .master_game_id()
            .unwrap();

        let mut trades = TradeService::new(&mut db, &clock);
        let trade = trades.propose_trade(league.manager, league.key, &proposal).unwrap();
        assert_eq!(trades.active_trades(league.key).unwrap().len(), 1);
        trades.accept_trade(league.player, league.key, trade.id).unwrap();
        let executed = trades
            .manager_execute_trade(league.manager, league.key, trade.id)
            .unwrap();
        assert_eq!(executed.status, TradeStatus::Executed);
        assert!(trades.active_trades(league.key).unwrap().is_empty());

        let after = db.get_league_year(league.key).unwrap().unwrap();
        let manager_now = after
            .publisher_by_id(league.manager_publisher)
            .unwrap()
            .games[0]
            .master_game_id()
            .unwrap();
        assert_ne!(manager_had, manager_now);
        assert!([alpha, beta].contains(&manager_now));
    }

    #[test]
    fn test_trade_budget_can_exceed_starting_budget() {
        let (mut db, clock) = setup();
        let (league, _, _) = drafted_league(&mut db, &clock);
        let proposal = TradeProposal {
            proposer: league.player_publisher,
            counter_party: league.manager_publisher,
            proposer_games: vec![only_game(&db, league.key, league.player_publisher)],
            counter_party_games: Vec::new(),
            proposer_budget_send: 0,
            counter_party_budget_send: 5,
            message: String::new(),
        };
        let mut trades = TradeService::new(&mut db, &clock);
        let trade = trades.propose_trade(league.player, league.key, &proposal).unwrap();
        trades.accept_trade(league.manager, league.key, trade.id).unwrap();
        trades
            .manager_execute_trade(league.manager, league.key, trade.id)
            .unwrap();

        let league_year = db.get_league_year(league.key).unwrap().unwrap();
        let player = league_year.publisher_by_id(league.player_publisher).unwrap();
        assert_eq!(player.budget, 105);

        let request = EditPublisherRequest {
            budget: Some(101),
            ..EditPublisherRequest::default()
        };
        let err = PublisherService::new(&mut db, &clock)
            .edit_publisher(
                league.manager,
                league.key,
                league.player_publisher,
                &request,
            )
            .unwrap_err();
        assert_eq!(
            validation_message(err),
            "Budget cannot be set to over $100."
        );
    }

    #[test]
    fn test_only_counter_party_accepts() {
        let (mut db, clock) = setup();
        let (league, _, _) = drafted_league(&mut db, &clock);
        let proposal = swap(&db, &league);
        let mut trades = TradeService::new(&mut db, &clock);
        let trade = trades.propose_trade(league.manager, league.key, &proposal).unwrap();
        let err = trades.accept_trade(league.manager, league.key, trade.id).unwrap_err();
        assert!(matches!(err, FantasyCriticError::Forbidden(_)));
    }

    #[test]
    fn test_proposed_trade_cannot_be_executed() {
        let (mut db, clock) = setup();
        let (league, _, _) = drafted_league(&mut db, &clock);
        let proposal = swap(&db, &league);
        let mut trades = TradeService::new(&mut db, &clock);
        let trade = trades.propose_trade(league.manager, league.key, &proposal).unwrap();
        let err = trades
            .manager_execute_trade(league.manager, league.key, trade.id)
            .unwrap_err();
        assert_eq!(
            validation_message(err),
            "Only accepted trades can be executed."
        );
    }

    #[test]
    fn test_rescind_by_proposer() {
        let (mut db, clock) = setup();
        let (league, _, _) = drafted_league(&mut db, &clock);
        let proposal = swap(&db, &league);
        let mut trades = TradeService::new(&mut db, &clock);
        let trade = trades.propose_trade(league.manager, league.key, &proposal).unwrap();
        let rescinded = trades.rescind_trade(league.manager, league.key, trade.id).unwrap();
        assert_eq!(rescinded.status, TradeStatus::Rescinded);
    }

    #[test]
    fn test_counter_party_rejects() {
        let (mut db, clock) = setup();
        let (league, _, _) = drafted_league(&mut db, &clock);
        let proposal = swap(&db, &league);
        let mut trades = TradeService::new(&mut db, &clock);
        let trade = trades.propose_trade(league.manager, league.key, &proposal).unwrap();

        let err = trades.reject_trade(league.manager, league.key, trade.id).unwrap_err();
        assert!(matches!(err, FantasyCriticError::Forbidden(_)));

        let rejected = trades.reject_trade(league.player, league.key, trade.id).unwrap();
        assert_eq!(rejected.status, TradeStatus::RejectedByCounterParty);
        assert!(trades.active_trades(league.key).unwrap().is_empty());
        let err = trades.reject_trade(league.player, league.key, trade.id).unwrap_err();
        assert_eq!(validation_message(err), "That trade is no longer active.");
    }

    #[test]
    fn test_manager_rejects_accepted_trade() {
        let (mut db, clock) = setup();
        let (league, _, _) = drafted_league(&mut db, &clock);
        let proposal = TradeProposal {
            proposer: league.player_publisher,
            counter_party: league.manager_publisher,
            proposer_games: vec![only_game(&db, league.key, league.player_publisher)],
            counter_party_games: Vec::new(),
            proposer_budget_send: 0,
            counter_party_budget_send: 5,
            message: String::new(),
        };
        let mut trades = TradeService::new(&mut db, &clock);
        let trade = trades.propose_trade(league.player, league.key, &proposal).unwrap();
        trades.accept_trade(league.manager, league.key, trade.id).unwrap();

        let err = trades
            .manager_reject_trade(league.player, league.key, trade.id)
            .unwrap_err();
        assert!(matches!(err, FantasyCriticError::Forbidden(_)));

        let rejected = trades
            .manager_reject_trade(league.manager, league.key, trade.id)
            .unwrap();
        assert_eq!(rejected.status, TradeStatus::RejectedByManager);
        assert!(trades
            .manager_execute_trade(league.manager, league.key, trade.id)
            .is_err());
    }

    #[test]
    fn test_proposal_with_repeated_game_rejected() {
        let (mut db, clock) = setup();
        let (league, _, _) = drafted_league(&mut db, &clock);
        let mut proposal = swap(&db, &league);
        proposal.proposer_games.push(proposal.proposer_games[0]);
        let err = TradeService::new(&mut db, &clock)
            .propose_trade(league.manager, league.key, &proposal)
            .unwrap_err();
        assert_eq!(
            validation_message(err),
            "A game can only appear once in a trade."
        );
    }
}

mod royale_tests {
    use super::*;

    fn q1() -> YearQuarter {
        YearQuarter::new(YEAR, 1).unwrap()
    }

    fn royale_game(
        db: &mut FantasyCriticDatabase,
        name: &str,
        release: chrono::NaiveDate,
    ) -> MasterGameId {
        let game = fixtures::master_game(name, Some(release));
        db.save_master_game(&game).unwrap();
        game.id
    }

    fn royale_setup() -> (FantasyCriticDatabase, FixedClock, UserId, PublisherId) {
        let (mut db, clock) = setup();
        let user = add_user(&mut db, &clock, "Royale Player");
        let mut service = RoyaleService::new(&mut db, &clock);
        service.start_new_quarter(q1()).unwrap();
        let publisher = service.create_publisher(user, q1(), "Quarterly").unwrap().id;
        (db, clock, user, publisher)
    }

    fn dollars(text: &str) -> Decimal {
        Decimal::from_str(text).unwrap()
    }

    #[test]
    fn test_purchase_then_sell_refunds_half() {
        let (mut db, clock, user, publisher) = royale_setup();
        let game = royale_game(&mut db, "Spring Release", date(2026, 3, 20));
        let mut service = RoyaleService::new(&mut db, &clock);

        let bought = service.purchase_game(user, publisher, game).unwrap();
        assert_eq!(bought.budget, dollars("92.50"));
        assert_eq!(bought.games[0].amount_spent, dollars("7.50"));

        let sold = service.sell_game(user, publisher, game).unwrap();
        assert_eq!(sold.budget, dollars("96.25"));
        assert!(sold.games.is_empty());
    }

    #[test]
    fn test_purchase_rejects_game_releasing_within_limit() {
        let (mut db, clock, user, publisher) = royale_setup();
        let game = royale_game(&mut db, "Imminent", date(2026, 3, 4));
        let err = RoyaleService::new(&mut db, &clock)
            .purchase_game(user, publisher, game)
            .unwrap_err();
        assert_eq!(validation_message(err), "Game will release within 5 days.");
    }

    #[test]
    fn test_purchase_rejects_game_outside_quarter() {
        let (mut db, clock, user, publisher) = royale_setup();
        let game = royale_game(&mut db, "Summer Release", date(2026, 7, 10));
        let err = RoyaleService::new(&mut db, &clock)
            .purchase_game(user, publisher, game)
            .unwrap_err();
        assert_eq!(
            validation_message(err),
            "Game will not release this quarter."
        );
    }

    #[test]
    fn test_purchase_same_game_twice_rejected() {
        let (mut db, clock, user, publisher) = royale_setup();
        let game = royale_game(&mut db, "Spring Release", date(2026, 3, 20));
        let mut service = RoyaleService::new(&mut db, &clock);
        service.purchase_game(user, publisher, game).unwrap();
        let err = service.purchase_game(user, publisher, game).unwrap_err();
        assert_eq!(validation_message(err), "Publisher already has that game.");
    }

    #[test]
    fn test_advertising_limits_and_truncation() {
        let (mut db, clock, user, publisher) = royale_setup();
        let game = royale_game(&mut db, "Spring Release", date(2026, 3, 20));
        let mut service = RoyaleService::new(&mut db, &clock);
        service.purchase_game(user, publisher, game).unwrap();

        let updated = service
            .set_advertising_money(user, publisher, game, dollars("4.999"))
            .unwrap();
        assert_eq!(updated.games[0].advertising_money, dollars("4.99"));
        assert_eq!(updated.budget, dollars("87.51"));

        let err = service
            .set_advertising_money(user, publisher, game, dollars("11"))
            .unwrap_err();
        assert_eq!(
            validation_message(err),
            "You can't allocate more than 10 dollars in advertising money."
        );
        let err = service
            .set_advertising_money(user, publisher, game, dollars("-1"))
            .unwrap_err();
        assert_eq!(
            validation_message(err),
            "You can't allocate negative dollars in advertising money."
        );
    }

    #[test]
    fn test_one_publisher_per_quarter() {
        let (mut db, clock, user, _) = royale_setup();
        let err = RoyaleService::new(&mut db, &clock)
            .create_publisher(user, q1(), "Second")
            .unwrap_err();
        assert!(matches!(err, FantasyCriticError::Validation(_)));
    }

    #[test]
    fn test_finish_quarter_records_winner() {
        let (mut db, clock, user, publisher) = royale_setup();
        let game = royale_game(&mut db, "Spring Release", date(2026, 3, 20));
        RoyaleService::new(&mut db, &clock)
            .purchase_game(user, publisher, game)
            .unwrap();

        let reviewed = OpenCriticGame {
            id: 1,
            name: "Spring Release".to_string(),
            score: Some(90.0),
            release_date: Some(date(2026, 3, 20)),
            has_any_reviews: true,
        };
        InterLeagueService::new(&mut db, &clock)
            .update_critic_stats(game, &reviewed)
            .unwrap();
        clock.set(Utc.with_ymd_and_hms(2026, 3, 25, 12, 0, 0).unwrap());

        let mut service = RoyaleService::new(&mut db, &clock);
        assert_eq!(service.update_fantasy_points(q1()).unwrap(), 1);
        let standings = service.standings(q1()).unwrap();
        assert_eq!(standings[0].ranking, Some(1));
        assert!(standings[0].total_fantasy_points > 0.0);

        let finished = service.finish_quarter(q1()).unwrap();
        assert!(finished.finished);
        assert_eq!(finished.winning_user, Some(user));
        assert_eq!(service.quarters_won_by_user(user).unwrap().len(), 1);
        assert!(service.finish_quarter(q1()).is_err());
    }

    #[test]
    fn test_zero_point_publishers_unranked() {
        let (mut db, clock, _, _) = royale_setup();
        let standings = RoyaleService::new(&mut db, &clock).standings(q1()).unwrap();
        assert_eq!(standings.len(), 1);
        assert_eq!(standings[0].ranking, None);
    }

    #[test]
    fn test_master_games_for_quarter_filters_by_window() {
        let (mut db, clock, _, _) = royale_setup();
        royale_game(&mut db, "In Quarter", date(2026, 3, 20));
        royale_game(&mut db, "Later", date(2026, 8, 1));
        let games = RoyaleService::new(&mut db, &clock)
            .master_games_for_quarter(q1())
            .unwrap();
        let names: Vec<&str> = games.iter().map(|g| g.master_game.name.as_str()).collect();
        assert_eq!(names, vec!["In Quarter"]);
    }
}

mod interleague_tests {
    use super::*;

    #[test]
    fn test_supported_year_added_once() {
        let (mut db, clock) = setup();
        let mut service = InterLeagueService::new(&mut db, &clock);
        let next = crate::cli::types::time::Year(2027);
        service.add_supported_year(next).unwrap();
        let err = service.add_supported_year(next).unwrap_err();
        assert_eq!(validation_message(err), "That year is already supported.");
        assert_eq!(service.supported_years().unwrap().len(), 2);
    }

    #[test]
    fn test_edit_master_game_logs_changes() {
        let (mut db, clock) = setup();
        let admin = add_user(&mut db, &clock, "Admin");
        let mut service = InterLeagueService::new(&mut db, &clock);
        let game = service
            .create_master_game(admin, fixtures::master_game("Working Title", None))
            .unwrap();

        let mut renamed = game.clone();
        renamed.name = "Final Title".to_string();
        service.edit_master_game(admin, renamed).unwrap();

        let log = service.change_log(game.id).unwrap();
        assert_eq!(log.len(), 2);
        assert!(log
            .iter()
            .any(|e| e.description == "Name changed from 'Working Title' to 'Final Title'"));
        assert_eq!(
            service.get_master_game(game.id).unwrap().name,
            "Final Title"
        );
    }

    #[test]
    fn test_master_game_date_window_validated() {
        let (mut db, clock) = setup();
        let admin = add_user(&mut db, &clock, "Admin");
        let mut game = fixtures::master_game("Backwards", None);
        game.maximum_release_date = Some(date(2026, 1, 1));
        let err = InterLeagueService::new(&mut db, &clock)
            .create_master_game(admin, game)
            .unwrap_err();
        assert!(matches!(err, FantasyCriticError::Validation(_)));
    }

    #[test]
    fn test_first_critic_score_timestamp_kept() {
        let (mut db, clock) = setup();
        let game = add_game(&mut db, "Scored");
        let stats = OpenCriticGame {
            id: 7,
            name: "Scored".to_string(),
            score: Some(84.0),
            release_date: Some(date(2026, 2, 20)),
            has_any_reviews: true,
        };
        let first = InterLeagueService::new(&mut db, &clock)
            .update_critic_stats(game, &stats)
            .unwrap();
        assert_eq!(first.first_critic_score_timestamp, Some(now()));
        assert_eq!(first.release_date, Some(date(2026, 2, 20)));

        clock.set(now() + Duration::days(3));
        let second = InterLeagueService::new(&mut db, &clock)
            .update_critic_stats(game, &OpenCriticGame { score: Some(86.0), ..stats })
            .unwrap();
        assert_eq!(second.critic_score, Some(86.0));
        assert_eq!(second.first_critic_score_timestamp, Some(now()));
    }

    #[test]
    fn test_request_lifecycle() {
        let (mut db, clock) = setup();
        let requester = add_user(&mut db, &clock, "Requester");
        let stranger = add_user(&mut db, &clock, "Stranger");
        let mut service = InterLeagueService::new(&mut db, &clock);

        let request = service
            .create_request(requester, "Obscure Indie", "Coming this fall")
            .unwrap();
        assert_eq!(service.open_requests().unwrap().len(), 1);

        let err = service.delete_request(stranger, request.id).unwrap_err();
        assert!(matches!(err, FantasyCriticError::Forbidden(_)));

        let answered = service.dismiss_request(request.id, "Not eligible").unwrap();
        assert!(answered.answered);
        assert_eq!(answered.response_note.as_deref(), Some("Not eligible"));
        assert!(service.open_requests().unwrap().is_empty());
        assert!(service.dismiss_request(request.id, "Again").is_err());

        service.delete_request(requester, request.id).unwrap();
        assert!(service.requests_for_user(requester).unwrap().is_empty());
    }

    #[test]
    fn test_refresh_stats_marks_drafted_game_hyped() {
        let (mut db, clock) = setup();
        let (_, alpha, _) = drafted_league(&mut db, &clock);
        let undrafted = add_game(&mut db, "Undrafted");

        InterLeagueService::new(&mut db, &clock)
            .refresh_master_game_year_stats(YEAR)
            .unwrap();

        let drafted = db.get_master_game_year(alpha, YEAR).unwrap().unwrap();
        assert_eq!(drafted.percent_standard_game, 1.0);
        assert_eq!(drafted.eligible_percent_standard_game, 1.0);
        assert_eq!(drafted.hype_factor, 10.0);
        assert!(drafted.average_draft_position.is_some());

        let ignored = db.get_master_game_year(undrafted, YEAR).unwrap().unwrap();
        assert_eq!(ignored.hype_factor, 0.0);
    }

    #[test]
    fn test_selected_master_game_ids() {
        let (mut db, clock) = setup();
        let (_, alpha, beta) = drafted_league(&mut db, &clock);
        add_game(&mut db, "Unpicked");
        let mut expected = vec![alpha, beta];
        expected.sort();
        let selected = InterLeagueService::new(&mut db, &clock)
            .selected_master_game_ids(YEAR)
            .unwrap();
        assert_eq!(selected, expected);
    }

    #[test]
    fn test_finish_year_once() {
        let (mut db, clock) = setup();
        let mut service = InterLeagueService::new(&mut db, &clock);
        let finished = service.finish_year(YEAR).unwrap();
        assert!(finished.finished);
        let err = service.finish_year(YEAR).unwrap_err();
        assert_eq!(validation_message(err), "That year is already finished.");
    }
}
