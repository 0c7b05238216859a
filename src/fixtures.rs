//! Builders shared by unit tests.

use crate::cli::types::ids::{LeagueId, UserId};
use crate::cli::types::time::{LeagueYearKey, Year};
use crate::domain::{
    League, LeagueOptions, LeagueYear, MasterGame, MasterGameYear, PlayStatus, Publisher,
    PublisherGame,
};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};

pub const YEAR: Year = Year(2026);

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

pub fn today() -> NaiveDate {
    now().date_naive()
}

/// A game due out in 2026: on `release` if given, otherwise somewhere in the second half.
pub fn master_game(name: &str, release: Option<NaiveDate>) -> MasterGame {
    let minimum = release.unwrap_or_else(|| date(2026, 7, 1));
    let mut game = MasterGame::new(name, minimum, now());
    game.release_date = release;
    game.maximum_release_date = Some(release.unwrap_or_else(|| date(2026, 12, 31)));
    game
}

pub fn game_year(name: &str) -> MasterGameYear {
    MasterGameYear::new(master_game(name, None), YEAR)
}

pub fn scored_game_year(name: &str, release: NaiveDate, score: f64) -> MasterGameYear {
    let mut game = master_game(name, Some(release));
    game.critic_score = Some(score);
    game.has_any_reviews = true;
    MasterGameYear::new(game, YEAR)
}

pub fn hyped_game_year(name: &str, hype: f64) -> MasterGameYear {
    let mut year = game_year(name);
    year.hype_factor = hype;
    year.date_adjusted_hype_factor = hype;
    year
}

/// A league season with `publisher_count` publishers at draft positions 1..=n.
pub fn league_year(publisher_count: usize) -> LeagueYear {
    league_year_with_options(publisher_count, LeagueOptions::default())
}

pub fn league_year_with_options(publisher_count: usize, options: LeagueOptions) -> LeagueYear {
    let manager = UserId::new_v4();
    let league = League {
        id: LeagueId::new_v4(),
        name: "Test League".to_string(),
        manager,
        public_league: false,
        test_league: false,
        archived: false,
        years: vec![YEAR],
    };
    let key = LeagueYearKey::new(league.id, YEAR);
    let publishers = (0..publisher_count)
        .map(|i| {
            let user = if i == 0 { manager } else { UserId::new_v4() };
            Publisher::new(key, user, &format!("Publisher {}", i + 1), i as u32 + 1)
        })
        .collect();
    LeagueYear {
        league,
        year: YEAR,
        options,
        play_status: PlayStatus::NotStartedDraft,
        eligibility_overrides: Vec::new(),
        tag_overrides: Vec::new(),
        draft_started_timestamp: None,
        publishers,
    }
}

/// Put a game straight onto a publisher, bypassing claim rules.
pub fn give_game(
    league_year: &mut LeagueYear,
    publisher_index: usize,
    game: MasterGameYear,
    counter_pick: bool,
) -> PublisherGame {
    let options = league_year.options.clone();
    let publisher = &mut league_year.publishers[publisher_index];
    let slot = publisher.open_slot_numbers(&options, counter_pick)[0];
    let name = game.master_game.name.clone();
    let publisher_game = PublisherGame::new(
        publisher.id,
        &name,
        Some(game),
        counter_pick,
        slot,
        now(),
    );
    publisher.games.push(publisher_game.clone());
    publisher_game
}
