//! A league season end to end: draft, pickups, scoring and the year-end penalty

use chrono::{NaiveDate, TimeZone, Utc};
use fantasy_critic::{
    commands::{common::CommandContext, league::league_standings},
    core::{Clock, Config, FixedClock},
    domain::{LeagueOptions, MasterGame, PlayStatus, SupportedYear},
    services::{
        acquisition::BidRequest, ActionProcessingService, DraftService, GameAcquisitionService,
        InterLeagueService, LeagueMemberService, LeagueService, PublisherService,
    },
    storage::*,
    LeagueYearKey, MasterGameId, PublisherId, UserId, Year,
};

const YEAR: Year = Year(2026);

struct Season {
    key: LeagueYearKey,
    manager: UserId,
    player: UserId,
    manager_publisher: PublisherId,
    player_publisher: PublisherId,
}

fn date(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, month, day).unwrap()
}

fn add_game(
    db: &mut FantasyCriticDatabase,
    clock: &FixedClock,
    by: UserId,
    name: &str,
) -> MasterGameId {
    let mut game = MasterGame::new(name, date(7, 1), clock.now());
    game.maximum_release_date = Some(date(12, 31));
    InterLeagueService::new(db, clock)
        .create_master_game(by, game)
        .unwrap()
        .id
}

fn start_season(db: &mut FantasyCriticDatabase, clock: &FixedClock) -> Season {
    db.save_supported_year(&SupportedYear::open(YEAR)).unwrap();
    let manager = InterLeagueService::new(db, clock).add_user("Manager").unwrap().id;
    let player = InterLeagueService::new(db, clock).add_user("Player").unwrap().id;

    let options = LeagueOptions {
        standard_games: 3,
        games_to_draft: 1,
        counter_picks: 1,
        counter_picks_to_draft: 0,
        ..LeagueOptions::default()
    };
    let key = LeagueService::new(db, clock)
        .create_league(manager, "Season League", YEAR, options, false)
        .unwrap()
        .key();
    let mut members = LeagueMemberService::new(db);
    members.add_user_to_league(key.league_id, player).unwrap();
    members.set_player_active(manager, key, player, true).unwrap();

    let mut publishers = PublisherService::new(db, clock);
    let manager_publisher = publishers.create_publisher(manager, key, "Manager Games").unwrap().id;
    let player_publisher = publishers.create_publisher(player, key, "Player Games").unwrap().id;

    Season {
        key,
        manager,
        player,
        manager_publisher,
        player_publisher,
    }
}

#[test]
fn test_full_season() {
    let mut db = FantasyCriticDatabase::new_in_memory().unwrap();
    let clock = FixedClock::new(Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap());
    let season = start_season(&mut db, &clock);
    let first = add_game(&mut db, &clock, season.manager, "First Light");
    let second = add_game(&mut db, &clock, season.manager, "Second Wind");
    let pickup = add_game(&mut db, &clock, season.manager, "Third Act");

    // Draft: one standard game each, no counter picks.
    {
        let mut draft = DraftService::new(&mut db, &clock);
        draft.start_draft(season.manager, season.key).unwrap();
        for game in [first, second] {
            let next = draft.next_publisher(season.key).unwrap().unwrap();
            let owner = if next == season.manager_publisher {
                season.manager
            } else {
                season.player
            };
            let result = draft.draft_game(owner, season.key, game, false).unwrap();
            assert!(result.success(), "{:?}", result.messages());
        }
    }
    let league_year = db.get_league_year(season.key).unwrap().unwrap();
    assert_eq!(league_year.play_status, PlayStatus::DraftFinal);

    // Pickup bid processed in the next batch.
    let bid = BidRequest {
        publisher_id: season.player_publisher,
        master_game_id: pickup,
        bid_amount: 10,
        counter_pick: false,
        conditional_drop: None,
        allow_ineligible_slot: false,
    };
    let result = GameAcquisitionService::new(&mut db, &clock)
        .make_pickup_bid(season.player, season.key, &bid)
        .unwrap();
    assert!(result.success(), "{:?}", result.messages());
    let summary = ActionProcessingService::new(&mut db, &clock)
        .process_actions(YEAR)
        .unwrap();
    assert_eq!(summary.success_bids, 1);

    // The manager's game releases and reviews at 85.
    clock.set(Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap());
    let league_year = db.get_league_year(season.key).unwrap().unwrap();
    let manager_game = league_year
        .publisher_by_id(season.manager_publisher)
        .unwrap()
        .games[0]
        .master_game_id()
        .unwrap();
    {
        let mut site = InterLeagueService::new(&mut db, &clock);
        let mut game = site.get_master_game(manager_game).unwrap();
        game.release_date = Some(date(7, 15));
        game.critic_score = Some(85.0);
        let edited = site.edit_master_game(season.manager, game).unwrap();
        assert!(edited.first_critic_score_timestamp.is_some());
        assert!(!site.change_log(manager_game).unwrap().is_empty());
    }
    LeagueService::new(&mut db, &clock)
        .update_fantasy_points(YEAR)
        .unwrap();

    let mut ctx = CommandContext::with_database(
        db,
        Box::new(FixedClock::new(clock.now())),
        Config::default(),
        false,
    );
    let rows = league_standings(&mut ctx, season.key).unwrap();
    assert_eq!(rows[0].publisher_id, season.manager_publisher);
    assert_eq!(rows[0].fantasy_points, 15.0);
    assert_eq!(rows[1].fantasy_points, 0.0);

    // Finishing the year charges each publisher for its empty counter pick slot.
    ctx.inter_league().finish_year(YEAR).unwrap();
    let rows = league_standings(&mut ctx, season.key).unwrap();
    assert_eq!(rows[0].publisher_id, season.manager_publisher);
    assert_eq!(rows[0].fantasy_points, 0.0);
    assert_eq!(rows[1].publisher_id, season.player_publisher);
    assert_eq!(rows[1].fantasy_points, -15.0);

    let player = ctx.leagues().league_year(season.key).unwrap();
    let player = player.publisher_by_id(season.player_publisher).unwrap();
    assert_eq!(player.budget, 90);
    assert_eq!(player.games.len(), 2);
}
